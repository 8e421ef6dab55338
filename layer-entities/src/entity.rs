//! The entity model: [`EntityType`], [`MessageEntity`] and [`FormattedText`].
//!
//! Offsets and lengths are measured in UTF-16 code units, the convention of
//! the Telegram API. Internally the matchers work with UTF-8 byte offsets and
//! convert before handing entities out.

use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ─── Identifiers ──────────────────────────────────────────────────────────────

/// Identifier of a user referenced by a [`EntityType::MentionName`] entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UserId(pub i64);

impl UserId {
    const MAX: i64 = (1 << 40) - 1;

    pub fn is_valid(self) -> bool {
        0 < self.0 && self.0 <= Self::MAX
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user {}", self.0)
    }
}

/// Identifier of a custom emoji sticker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CustomEmojiId(pub i64);

impl CustomEmojiId {
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for CustomEmojiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "custom emoji {}", self.0)
    }
}

// ─── EntityType ───────────────────────────────────────────────────────────────

/// Kind of a [`MessageEntity`].
///
/// The declaration order is significant: it is the ordinal used for the
/// type-class bit masks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntityType {
    Mention,
    Hashtag,
    BotCommand,
    Url,
    EmailAddress,
    Bold,
    Italic,
    Code,
    Pre,
    PreCode,
    TextUrl,
    MentionName,
    Cashtag,
    PhoneNumber,
    Underline,
    Strikethrough,
    BlockQuote,
    BankCardNumber,
    MediaTimestamp,
    Spoiler,
    CustomEmoji,
    ExpandableBlockQuote,
}

const fn mask_of(ty: EntityType) -> u32 {
    1 << ty as u32
}

pub(crate) const SPLITTABLE_MASK: u32 = mask_of(EntityType::Bold)
    | mask_of(EntityType::Italic)
    | mask_of(EntityType::Underline)
    | mask_of(EntityType::Strikethrough)
    | mask_of(EntityType::Spoiler);

pub(crate) const BLOCKQUOTE_MASK: u32 =
    mask_of(EntityType::BlockQuote) | mask_of(EntityType::ExpandableBlockQuote);

pub(crate) const CONTINUOUS_MASK: u32 = mask_of(EntityType::Mention)
    | mask_of(EntityType::Hashtag)
    | mask_of(EntityType::BotCommand)
    | mask_of(EntityType::Url)
    | mask_of(EntityType::EmailAddress)
    | mask_of(EntityType::TextUrl)
    | mask_of(EntityType::MentionName)
    | mask_of(EntityType::Cashtag)
    | mask_of(EntityType::PhoneNumber)
    | mask_of(EntityType::BankCardNumber)
    | mask_of(EntityType::MediaTimestamp)
    | mask_of(EntityType::CustomEmoji);

pub(crate) const PRE_MASK: u32 =
    mask_of(EntityType::Pre) | mask_of(EntityType::Code) | mask_of(EntityType::PreCode);

pub(crate) const USER_MASK: u32 = SPLITTABLE_MASK
    | BLOCKQUOTE_MASK
    | mask_of(EntityType::TextUrl)
    | mask_of(EntityType::MentionName)
    | mask_of(EntityType::CustomEmoji)
    | PRE_MASK;

/// Number of splittable kinds, see [`EntityType::splittable_index`].
pub(crate) const SPLITTABLE_TYPE_COUNT: usize = 5;

impl EntityType {
    /// Tie-breaker used when two entities share offset and length; lower
    /// values sort first and therefore become the outer entity.
    pub fn priority(self) -> i32 {
        match self {
            Self::Mention
            | Self::Hashtag
            | Self::BotCommand
            | Self::Url
            | Self::EmailAddress
            | Self::Cashtag
            | Self::PhoneNumber
            | Self::BankCardNumber
            | Self::MediaTimestamp => 50,
            Self::Bold => 90,
            Self::Italic => 91,
            Self::Code => 20,
            Self::Pre => 11,
            Self::PreCode => 10,
            Self::TextUrl | Self::MentionName => 49,
            Self::Underline => 92,
            Self::Strikethrough => 93,
            Self::BlockQuote | Self::ExpandableBlockQuote => 0,
            Self::Spoiler => 94,
            Self::CustomEmoji => 99,
        }
    }

    pub(crate) fn mask(self) -> u32 {
        mask_of(self)
    }

    /// Bold, Italic, Underline, Strikethrough and Spoiler.
    pub fn is_splittable(self) -> bool {
        self.mask() & SPLITTABLE_MASK != 0
    }

    pub fn is_blockquote(self) -> bool {
        self.mask() & BLOCKQUOTE_MASK != 0
    }

    /// Semantic kinds that can be neither split nor nested into each other.
    pub fn is_continuous(self) -> bool {
        self.mask() & CONTINUOUS_MASK != 0
    }

    /// Pre, Code and PreCode.
    pub fn is_pre(self) -> bool {
        self.mask() & PRE_MASK != 0
    }

    /// Kinds a client may set explicitly, as opposed to auto-detected ones.
    pub fn is_user(self) -> bool {
        self.mask() & USER_MASK != 0
    }

    /// Slot of a splittable kind in per-kind bookkeeping arrays.
    pub(crate) fn splittable_index(self) -> usize {
        match self {
            Self::Bold => 0,
            Self::Italic => 1,
            Self::Underline => 2,
            Self::Strikethrough => 3,
            _ => 4,
        }
    }

    pub(crate) fn from_splittable_index(index: usize) -> Self {
        match index {
            0 => Self::Bold,
            1 => Self::Italic,
            2 => Self::Underline,
            3 => Self::Strikethrough,
            _ => Self::Spoiler,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Mention => "Mention",
            Self::Hashtag => "Hashtag",
            Self::BotCommand => "BotCommand",
            Self::Url => "Url",
            Self::EmailAddress => "EmailAddress",
            Self::Bold => "Bold",
            Self::Italic => "Italic",
            Self::Code => "Code",
            Self::Pre => "Pre",
            Self::PreCode => "PreCode",
            Self::TextUrl => "TextUrl",
            Self::MentionName => "MentionName",
            Self::Cashtag => "Cashtag",
            Self::PhoneNumber => "PhoneNumber",
            Self::Underline => "Underline",
            Self::Strikethrough => "Strikethrough",
            Self::BlockQuote => "BlockQuote",
            Self::BankCardNumber => "BankCardNumber",
            Self::MediaTimestamp => "MediaTimestamp",
            Self::Spoiler => "Spoiler",
            Self::CustomEmoji => "CustomEmoji",
            Self::ExpandableBlockQuote => "ExpandableBlockQuote",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── MessageEntity ────────────────────────────────────────────────────────────

/// A tagged span of formatting or semantic annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageEntity {
    pub kind:            EntityType,
    pub offset:          i32,
    pub length:          i32,
    /// Seconds for [`EntityType::MediaTimestamp`], `-1` otherwise.
    pub media_timestamp: i32,
    /// Language of a PreCode block or target of a TextUrl.
    pub argument:        String,
    pub user_id:         UserId,
    pub custom_emoji_id: CustomEmojiId,
}

impl MessageEntity {
    pub fn new(kind: EntityType, offset: i32, length: i32) -> Self {
        Self {
            kind,
            offset,
            length,
            media_timestamp: -1,
            argument: String::new(),
            user_id: UserId::default(),
            custom_emoji_id: CustomEmojiId::default(),
        }
    }

    pub fn with_argument(kind: EntityType, offset: i32, length: i32, argument: impl Into<String>) -> Self {
        Self { argument: argument.into(), ..Self::new(kind, offset, length) }
    }

    pub fn mention_name(offset: i32, length: i32, user_id: UserId) -> Self {
        Self { user_id, ..Self::new(EntityType::MentionName, offset, length) }
    }

    pub fn custom_emoji(offset: i32, length: i32, custom_emoji_id: CustomEmojiId) -> Self {
        Self { custom_emoji_id, ..Self::new(EntityType::CustomEmoji, offset, length) }
    }

    pub fn media_timestamp(offset: i32, length: i32, media_timestamp: i32) -> Self {
        Self { media_timestamp, ..Self::new(EntityType::MediaTimestamp, offset, length) }
    }

    /// First UTF-16 position after the entity.
    pub fn end(&self) -> i32 {
        self.offset + self.length
    }
}

impl fmt::Display for MessageEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, offset = {}, length = {}", self.kind, self.offset, self.length)?;
        if self.media_timestamp >= 0 {
            write!(f, ", media_timestamp = \"{}\"", self.media_timestamp)?;
        }
        if !self.argument.is_empty() {
            write!(f, ", argument = \"{}\"", self.argument)?;
        }
        if self.user_id.is_valid() {
            write!(f, ", {}", self.user_id)?;
        }
        if self.custom_emoji_id.is_valid() {
            write!(f, ", {}", self.custom_emoji_id)?;
        }
        f.write_str("]")
    }
}

/// Canonical entity order: by offset, longer first, then by type priority.
pub fn compare_entities(a: &MessageEntity, b: &MessageEntity) -> Ordering {
    a.offset
        .cmp(&b.offset)
        .then_with(|| b.length.cmp(&a.length))
        .then_with(|| a.kind.priority().cmp(&b.kind.priority()))
}

pub(crate) fn is_sorted(entities: &[MessageEntity]) -> bool {
    entities.windows(2).all(|w| compare_entities(&w[0], &w[1]) != Ordering::Greater)
}

/// Sorts entities into canonical order.
pub fn sort_entities(entities: &mut [MessageEntity]) {
    if !is_sorted(entities) {
        entities.sort_by(compare_entities);
    }
}

// ─── FormattedText ────────────────────────────────────────────────────────────

/// UTF-8 text paired with its entities.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormattedText {
    pub text:     String,
    pub entities: Vec<MessageEntity>,
}

impl FormattedText {
    pub fn new(text: impl Into<String>, entities: Vec<MessageEntity>) -> Self {
        Self { text: text.into(), entities }
    }

    /// Builds a text from raw bytes, rejecting invalid UTF-8.
    pub fn from_utf8(bytes: Vec<u8>, entities: Vec<MessageEntity>) -> crate::Result<Self> {
        let text = String::from_utf8(bytes).map_err(|_| crate::Error::InvalidUtf8)?;
        Ok(Self { text, entities })
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }
}

impl fmt::Display for FormattedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" with entities [", self.text)?;
        for (i, entity) in self.entities.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{entity}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_classes_do_not_overlap() {
        assert_eq!(SPLITTABLE_MASK & BLOCKQUOTE_MASK, 0);
        assert_eq!(SPLITTABLE_MASK & CONTINUOUS_MASK, 0);
        assert_eq!(CONTINUOUS_MASK & PRE_MASK, 0);
        assert_eq!(BLOCKQUOTE_MASK & PRE_MASK, 0);
        assert!(EntityType::CustomEmoji.is_continuous());
        assert!(EntityType::CustomEmoji.is_user());
        assert!(!EntityType::Url.is_user());
    }

    #[test]
    fn splittable_index_round_trips() {
        for index in 0..SPLITTABLE_TYPE_COUNT {
            let ty = EntityType::from_splittable_index(index);
            assert!(ty.is_splittable());
            assert_eq!(ty.splittable_index(), index);
        }
    }

    #[test]
    fn sort_order() {
        let mut entities = vec![
            MessageEntity::new(EntityType::Bold, 0, 3),
            MessageEntity::new(EntityType::BlockQuote, 0, 3),
            MessageEntity::new(EntityType::Italic, 0, 5),
            MessageEntity::new(EntityType::Url, 1, 1),
        ];
        sort_entities(&mut entities);
        let kinds: Vec<_> = entities.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [EntityType::Italic, EntityType::BlockQuote, EntityType::Bold, EntityType::Url]
        );
    }

    #[test]
    fn display() {
        let e = MessageEntity::with_argument(EntityType::TextUrl, 1, 2, "http://a.b/");
        assert_eq!(e.to_string(), "[TextUrl, offset = 1, length = 2, argument = \"http://a.b/\"]");
        let m = MessageEntity::media_timestamp(0, 4, 61);
        assert_eq!(m.to_string(), "[MediaTimestamp, offset = 0, length = 4, media_timestamp = \"61\"]");
    }

    #[test]
    fn invalid_utf8_rejected() {
        let err = FormattedText::from_utf8(vec![0xff, 0x41], Vec::new()).unwrap_err();
        assert_eq!(err, crate::Error::InvalidUtf8);
    }
}
