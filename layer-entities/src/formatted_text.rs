//! The gate every text passes before it is stored or sent.
//!
//! [`fix_formatted_text`] cleans the text, repairs the entities, trims
//! surrounding whitespace and adds automatically detected entities. The rest
//! of this module holds the smaller operations performed on an already fixed
//! [`FormattedText`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::algebra::{
    find_entities, find_media_timestamp_entities, fix_entities, merge_new_entities, remove_empty_entities,
    remove_intersecting_entities, split_entities,
};
use crate::clean::{clean_input_string, clean_input_string_with_entities, is_empty_string};
use crate::context::{Context, PeerPolicy, SecretChatLayer, StickerPolicy};
use crate::entity::{EntityType, FormattedText, MessageEntity, UserId, sort_entities};
use crate::errors::{Error, Result};
use crate::limits::{MAX_ENTITY_VALUE, MAX_TEXT_LENGTH};
use crate::unicode::{prefix_bytes, split_utf16, to_lower, utf16_len};

// ─── Options ──────────────────────────────────────────────────────────────────

/// Switches of [`fix_formatted_text`].
///
/// ```rust
/// use layer_entities::FixOptions;
///
/// let options = FixOptions::new().allow_empty(true).skip_bot_commands(true);
/// assert_eq!(options.max_length, 35_000);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FixOptions {
    pub allow_empty:           bool,
    pub skip_new_entities:     bool,
    pub skip_bot_commands:     bool,
    pub skip_media_timestamps: bool,
    pub skip_trim:             bool,
    /// Byte limit of the resulting text.
    pub max_length:            usize,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            allow_empty:           false,
            skip_new_entities:     false,
            skip_bot_commands:     false,
            skip_media_timestamps: false,
            skip_trim:             false,
            max_length:            MAX_TEXT_LENGTH,
        }
    }
}

impl FixOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept text that is empty after cleaning instead of failing.
    pub fn allow_empty(mut self, v: bool) -> Self {
        self.allow_empty = v; self
    }

    /// Do not look for mentions, hashtags, URLs and the like.
    pub fn skip_new_entities(mut self, v: bool) -> Self {
        self.skip_new_entities = v; self
    }

    pub fn skip_bot_commands(mut self, v: bool) -> Self {
        self.skip_bot_commands = v; self
    }

    pub fn skip_media_timestamps(mut self, v: bool) -> Self {
        self.skip_media_timestamps = v; self
    }

    /// Keep leading and trailing whitespace.
    pub fn skip_trim(mut self, v: bool) -> Self {
        self.skip_trim = v; self
    }

    pub fn max_length(mut self, v: usize) -> Self {
        self.max_length = v; self
    }
}

// ─── fix_formatted_text ───────────────────────────────────────────────────────

/// Byte position and UTF-16 offset of the last character that is neither a
/// space nor a newline, after dropping empty entities.
fn last_non_whitespace(text: &str, entities: &mut Vec<MessageEntity>) -> Option<(usize, i32)> {
    remove_empty_entities(entities);

    let mut utf16_offset = 0i32;
    let mut last = None;
    for (pos, c) in text.char_indices() {
        let units = c.len_utf16() as i32;
        if c != ' ' && c != '\n' {
            last = Some((pos + c.len_utf8() - 1, utf16_offset + units - 1));
        }
        utf16_offset += units;
    }
    last
}

fn check_bounds(entities: &[MessageEntity]) -> Result<()> {
    for entity in entities {
        if !(0..=MAX_ENTITY_VALUE).contains(&entity.offset) {
            return Err(Error::InvalidOffset { value: entity.offset });
        }
        if !(0..=MAX_ENTITY_VALUE).contains(&entity.length) {
            return Err(Error::InvalidLength { value: entity.length });
        }
    }
    Ok(())
}

/// Cleans `text`, repairs `entities` and adds detected ones.
///
/// On success the entities are sorted and valid, and the return value is
/// the number of bytes trimmed from the start of the text. On error both
/// arguments are left untouched.
///
/// ```rust
/// use layer_entities::{EntityType, FixOptions, MessageEntity, fix_formatted_text};
///
/// let mut text = String::from("  hi @durov\r ");
/// let mut entities = vec![MessageEntity::new(EntityType::Bold, 2, 2)];
/// let trimmed = fix_formatted_text(&mut text, &mut entities, &FixOptions::default()).unwrap();
/// assert_eq!(trimmed, 2);
/// assert_eq!(text, "hi @durov");
/// assert_eq!(entities, [
///     MessageEntity::new(EntityType::Bold, 0, 2),
///     MessageEntity::new(EntityType::Mention, 3, 6),
/// ]);
/// ```
pub fn fix_formatted_text(text: &mut String, entities: &mut Vec<MessageEntity>, options: &FixOptions) -> Result<usize> {
    let (mut result, mut fixed) = if entities.is_empty() {
        (clean_input_string(text.as_bytes())?, Vec::new())
    } else {
        check_bounds(entities)?;
        let mut fixed = entities.clone();
        remove_empty_entities(&mut fixed);
        fix_entities(&mut fixed);
        let result = clean_input_string_with_entities(text, &mut fixed)?;
        (result, fixed)
    };

    // Sorted by offset and length here, but removed characters may have
    // made entities of different kinds end together.
    let Some((last_pos, last_utf16_offset)) = last_non_whitespace(&result, &mut fixed) else {
        if options.allow_empty {
            text.clear();
            entities.clear();
            return Ok(0);
        }
        return Err(Error::EmptyText);
    };
    fix_entities(&mut fixed);

    let mut ltrim_count = 0;
    if !options.skip_trim {
        result.truncate(last_pos + 1);
        let end = last_utf16_offset + 1;
        let count = fixed.len();
        fixed.retain(|entity| entity.offset < end);
        let mut need_sort = false;
        for entity in &mut fixed {
            if entity.end() > end {
                entity.length = end - entity.offset;
                need_sort = true;
            }
        }
        if need_sort {
            sort_entities(&mut fixed);
        }
        if need_sort || fixed.len() != count {
            tracing::debug!("[layer-entities] Trailing whitespace cut {} entities", count - fixed.len());
        }

        let first_entity_begin = fixed.first().map_or(result.len(), |entity| entity.offset as usize);
        let bytes = result.as_bytes();
        let mut first = 0;
        while first < first_entity_begin && matches!(bytes.get(first), Some(b' ' | b'\n')) {
            first += 1;
        }
        if first > 0 {
            result.drain(..first);
            for entity in &mut fixed {
                entity.offset -= first as i32;
            }
            ltrim_count = first;
        }
    }

    if is_empty_string(&result) {
        if !options.allow_empty {
            return Err(Error::EmptyText);
        }
        result.clear();
        fixed.clear();
    }

    if result.len() > options.max_length {
        let mut new_size = options.max_length;
        while !result.is_char_boundary(new_size) {
            new_size -= 1;
        }
        result.truncate(new_size);
        let utf16_length = utf16_len(&result) as i32;
        let count = fixed.len();
        fixed.retain(|entity| entity.end() <= utf16_length);
        tracing::debug!(
            "[layer-entities] Text cut to {new_size} bytes, {} entities dropped",
            count - fixed.len()
        );
    }

    if !options.skip_new_entities {
        let found = find_entities(&result, options.skip_bot_commands, options.skip_media_timestamps);
        merge_new_entities(&mut fixed, found);
    } else if !options.skip_media_timestamps {
        merge_new_entities(&mut fixed, find_media_timestamp_entities(&result));
    }

    *text = result;
    *entities = fixed;
    Ok(ltrim_count)
}

impl FormattedText {
    /// [`fix_formatted_text`] applied to both halves of `self`.
    pub fn fix(&mut self, options: &FixOptions) -> Result<usize> {
        fix_formatted_text(&mut self.text, &mut self.entities, options)
    }
}

// ─── Client and server entities ───────────────────────────────────────────────

fn check_user(ctx: &Context<'_>, user_id: UserId) -> bool {
    if !user_id.is_valid() {
        tracing::warn!("[layer-entities] Dropping mention of invalid user {user_id}");
        return false;
    }
    match ctx.users.map(|users| users.get_input_user(user_id)) {
        Some(Err(err)) => {
            tracing::warn!("[layer-entities] Dropping mention of user {user_id}: {err}");
            false
        }
        _ => true,
    }
}

/// Checks entities supplied from outside against the collaborators.
///
/// Links are normalized, `tg://user` links become MentionName entities and
/// users are resolved. An entity that fails a check is dropped with a
/// warning. Unless `allow_all` is set, kinds that are detected
/// automatically are dropped too.
pub fn validate_user_entities(
    ctx: &Context<'_>,
    entities: Vec<MessageEntity>,
    allow_all: bool,
) -> Vec<MessageEntity> {
    entities
        .into_iter()
        .filter_map(|mut entity| {
            match entity.kind {
                EntityType::TextUrl => {
                    let user_id = ctx.links.get_link_user_id(&entity.argument);
                    if user_id.is_valid() {
                        if !check_user(ctx, user_id) {
                            return None;
                        }
                        entity = MessageEntity::mention_name(entity.offset, entity.length, user_id);
                    } else {
                        let url = ctx.links.get_checked_link(&entity.argument);
                        if url.is_empty() {
                            tracing::warn!("[layer-entities] Dropping {entity}: invalid URL");
                            return None;
                        }
                        entity.argument = url;
                    }
                }
                EntityType::MentionName => {
                    if !check_user(ctx, entity.user_id) {
                        return None;
                    }
                }
                EntityType::MediaTimestamp if entity.media_timestamp < 0 => {
                    tracing::warn!("[layer-entities] Dropping {entity}: invalid media timestamp specified");
                    return None;
                }
                EntityType::CustomEmoji if !entity.custom_emoji_id.is_valid() => {
                    tracing::warn!("[layer-entities] Dropping {entity}: invalid custom emoji identifier specified");
                    return None;
                }
                EntityType::PreCode => match clean_input_string(entity.argument.as_bytes()) {
                    Ok(language) => entity.argument = language,
                    Err(_) => return None,
                },
                _ => {}
            }
            (allow_all || entity.kind.is_user()).then_some(entity)
        })
        .collect()
}

/// Builds the text of a received message.
///
/// Entities are validated and fixed; if fixing fails the text is cleaned on
/// its own and its entities are detected from scratch.
pub fn get_message_text(
    ctx: &Context<'_>,
    mut text: String,
    entities: Vec<MessageEntity>,
    skip_new_entities: bool,
    skip_media_timestamps: bool,
) -> FormattedText {
    let mut entities = validate_user_entities(ctx, entities, true);
    let options = FixOptions::new()
        .allow_empty(true)
        .skip_new_entities(skip_new_entities)
        .skip_bot_commands(true)
        .skip_media_timestamps(skip_media_timestamps);
    match fix_formatted_text(&mut text, &mut entities, &options) {
        Ok(_) => FormattedText::new(text, entities),
        Err(err) => {
            tracing::warn!("[layer-entities] Receive error \"{err}\" while fixing message text {text:?}");
            let text = clean_input_string(text.as_bytes()).unwrap_or_default();
            let entities = find_entities(&text, false, skip_media_timestamps);
            FormattedText::new(text, entities)
        }
    }
}

/// Entities in the form they are sent: user kinds only, splittable ones
/// re-split, at most `max` entities not counting custom emoji.
pub fn get_input_entities(entities: &[MessageEntity], max: usize) -> Vec<MessageEntity> {
    let mut result = Vec::new();
    let mut splittable = Vec::new();
    let mut count = 0;
    for entity in entities.iter().filter(|entity| entity.kind.is_user()) {
        if entity.kind.is_splittable() {
            splittable.push(entity.clone());
            continue;
        }
        if entity.kind == EntityType::CustomEmoji {
            result.push(entity.clone());
            continue;
        }
        if count >= max {
            continue;
        }
        count += 1;
        result.push(entity.clone());
    }

    split_entities(&mut splittable, &[]);
    result.extend(splittable.into_iter().take(max.saturating_sub(count)));
    result
}

// ─── Peer restrictions ────────────────────────────────────────────────────────

/// Drops custom emoji the policy marks as Premium.
pub fn remove_premium_custom_emoji_entities(
    stickers: &dyn StickerPolicy,
    entities: &mut Vec<MessageEntity>,
    remove_unknown: bool,
) {
    entities.retain(|entity| {
        entity.kind != EntityType::CustomEmoji
            || !stickers.is_premium_custom_emoji(entity.custom_emoji_id, remove_unknown)
    });
}

/// Drops the entities `peer` cannot display.
///
/// Older secret chat layers lose the kinds they predate. Without a
/// [`StickerPolicy`] in `ctx` custom emoji are kept.
pub fn remove_unallowed_entities(ctx: &Context<'_>, text: &mut FormattedText, peer: &PeerPolicy) {
    if text.entities.is_empty() {
        return;
    }

    if let Some(layer) = peer.secret_chat_layer {
        text.entities.retain(|entity| {
            if layer < SecretChatLayer::NEW_ENTITIES
                && matches!(
                    entity.kind,
                    EntityType::Underline
                        | EntityType::Strikethrough
                        | EntityType::BlockQuote
                        | EntityType::ExpandableBlockQuote
                )
            {
                return false;
            }
            !(layer < SecretChatLayer::SPOILER_AND_CUSTOM_EMOJI_ENTITIES
                && matches!(entity.kind, EntityType::Spoiler | EntityType::CustomEmoji))
        });

        if layer < SecretChatLayer::NEW_ENTITIES {
            sort_entities(&mut text.entities);
            remove_intersecting_entities(&mut text.entities);
        }
    }
    if !peer.can_use_premium_custom_emoji {
        if let Some(stickers) = ctx.stickers {
            remove_premium_custom_emoji_entities(stickers, &mut text.entities, true);
        }
    }
}

// ─── Queries ──────────────────────────────────────────────────────────────────

fn utf16_substr(text: &str, offset: i32, length: i32) -> &str {
    split_utf16(split_utf16(text, offset).1, length).0
}

fn is_plain_domain(url: &str) -> bool {
    !url.contains(['/', '?', '#'])
}

fn has_preview_less_scheme(url: &str) -> bool {
    let scheme = to_lower(&url[..prefix_bytes(url, 8)]);
    ["ton:", "tg:", "ftp:", "tonsite:"].iter().any(|prefix| scheme.starts_with(prefix))
}

/// The first link that can get a web page preview.
pub fn get_first_url(text: &FormattedText) -> Option<&str> {
    text.entities.iter().find_map(|entity| match entity.kind {
        EntityType::Url if entity.length > 4 => {
            let url = utf16_substr(&text.text, entity.offset, entity.length);
            (!has_preview_less_scheme(url) && !is_plain_domain(url)).then_some(url)
        }
        EntityType::TextUrl => (!has_preview_less_scheme(&entity.argument)).then_some(entity.argument.as_str()),
        _ => None,
    })
}

/// True if `url` appears in the text as a Url entity.
pub fn is_visible_url(text: &FormattedText, url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    let url_length = utf16_len(url) as i32;
    text.entities
        .iter()
        .filter(|entity| entity.kind == EntityType::Url && entity.length == url_length)
        .any(|entity| split_utf16(&text.text, entity.offset).1.starts_with(url))
}

/// True if some media timestamp lies in `min..=max` seconds.
pub fn has_media_timestamps(text: &FormattedText, min: i32, max: i32) -> bool {
    text.entities
        .iter()
        .any(|entity| entity.kind == EntityType::MediaTimestamp && (min..=max).contains(&entity.media_timestamp))
}

pub fn has_bot_commands(text: &FormattedText) -> bool {
    text.entities.iter().any(|entity| entity.kind == EntityType::BotCommand)
}

// ─── Truncation ───────────────────────────────────────────────────────────────

/// Cuts the text to `length` code points.
///
/// Entities reaching past the cut are shortened, except continuous ones,
/// which cannot be split and are dropped.
pub fn truncate_formatted_text(text: &mut FormattedText, length: usize) {
    let size = prefix_bytes(&text.text, length);
    if size == text.text.len() {
        return;
    }
    text.text.truncate(size);
    let utf16_length = utf16_len(&text.text) as i32;
    for entity in &mut text.entities {
        if entity.end() > utf16_length {
            entity.length = if entity.offset >= utf16_length || entity.kind.is_continuous() {
                0
            } else {
                utf16_length - entity.offset
            };
        }
    }
    remove_empty_entities(&mut text.entities);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InputUser;
    use crate::entity::CustomEmojiId;

    fn e(kind: EntityType, offset: i32, length: i32) -> MessageEntity {
        MessageEntity::new(kind, offset, length)
    }

    fn fix(text: &str, entities: Vec<MessageEntity>, options: FixOptions) -> Result<(String, Vec<MessageEntity>, usize)> {
        let mut text = text.to_owned();
        let mut entities = entities;
        let trimmed = fix_formatted_text(&mut text, &mut entities, &options)?;
        Ok((text, entities, trimmed))
    }

    #[test]
    fn trims_plain_text() {
        assert_eq!(fix("  hello \n", vec![], FixOptions::new()), Ok(("hello".into(), vec![], 2)));
        assert_eq!(
            fix("  hello \n", vec![], FixOptions::new().skip_trim(true)),
            Ok(("  hello \n".into(), vec![], 0))
        );
    }

    #[test]
    fn empty_text() {
        assert_eq!(fix(" \n ", vec![], FixOptions::new()), Err(Error::EmptyText));
        assert_eq!(fix("", vec![e(EntityType::Bold, 0, 0)], FixOptions::new()), Err(Error::EmptyText));
        assert_eq!(fix(" \n ", vec![], FixOptions::new().allow_empty(true)), Ok((String::new(), vec![], 0)));
        assert_eq!(fix("\u{200B}", vec![], FixOptions::new()), Err(Error::EmptyText));
    }

    #[test]
    fn entity_bounds() {
        assert_eq!(fix("ab", vec![e(EntityType::Bold, -1, 1)], FixOptions::new()), Err(Error::InvalidOffset { value: -1 }));
        assert_eq!(
            fix("ab", vec![e(EntityType::Bold, 0, 1_000_001)], FixOptions::new()),
            Err(Error::InvalidLength { value: 1_000_001 })
        );
        assert_eq!(
            fix("😀", vec![e(EntityType::Bold, 1, 1)], FixOptions::new()),
            Err(Error::SplitSymbol { offset: 1, byte: 4, at_end: false })
        );
    }

    #[test]
    fn entities_follow_trimming() {
        assert_eq!(
            fix("ab  ", vec![e(EntityType::Bold, 0, 4)], FixOptions::new()),
            Ok(("ab".into(), vec![e(EntityType::Bold, 0, 2)], 0))
        );
        assert_eq!(
            fix("  ab", vec![e(EntityType::Bold, 2, 2)], FixOptions::new()),
            Ok(("ab".into(), vec![e(EntityType::Bold, 0, 2)], 2))
        );
        assert_eq!(
            fix("ab \n", vec![e(EntityType::Italic, 3, 1)], FixOptions::new()),
            Ok(("ab".into(), vec![], 0))
        );
        assert_eq!(
            fix(" a", vec![e(EntityType::Code, 0, 2)], FixOptions::new()),
            Ok((" a".into(), vec![e(EntityType::Code, 0, 2)], 0))
        );
    }

    #[test]
    fn control_characters_move_entities() {
        assert_eq!(
            fix("a\rb\tc", vec![e(EntityType::Bold, 0, 5)], FixOptions::new()),
            Ok(("ab c".into(), vec![e(EntityType::Bold, 0, 4)], 0))
        );
    }

    #[test]
    fn detects_new_entities() {
        let options = FixOptions::new();
        assert_eq!(
            fix("see @durov /start 1:00", vec![], options),
            Ok((
                "see @durov /start 1:00".into(),
                vec![
                    e(EntityType::Mention, 4, 6),
                    e(EntityType::BotCommand, 11, 6),
                    MessageEntity::media_timestamp(18, 4, 60),
                ],
                0
            ))
        );
        assert_eq!(
            fix("see @durov /start", vec![], options.skip_bot_commands(true)),
            Ok(("see @durov /start".into(), vec![e(EntityType::Mention, 4, 6)], 0))
        );
        assert_eq!(
            fix("see @durov 1:00", vec![], options.skip_new_entities(true)),
            Ok(("see @durov 1:00".into(), vec![MessageEntity::media_timestamp(11, 4, 60)], 0))
        );
        assert_eq!(
            fix("see @durov 1:00", vec![], options.skip_new_entities(true).skip_media_timestamps(true)),
            Ok(("see @durov 1:00".into(), vec![], 0))
        );
    }

    #[test]
    fn length_limit() {
        let options = FixOptions::new().max_length(3);
        assert_eq!(fix("abcdef", vec![e(EntityType::Bold, 2, 3)], options), Ok(("abc".into(), vec![], 0)));
        assert_eq!(fix("abcdef", vec![e(EntityType::Bold, 0, 2)], options), Ok(("abc".into(), vec![e(EntityType::Bold, 0, 2)], 0)));
        assert_eq!(fix("ab€", vec![], options), Ok(("ab".into(), vec![], 0)));
    }

    #[test]
    fn fixed_text_is_stable() {
        let mut text = FormattedText::new(
            " *a* @durov https://telegram.org ",
            vec![e(EntityType::Bold, 0, 5), e(EntityType::Italic, 3, 10), e(EntityType::Code, 4, 2)],
        );
        text.fix(&FixOptions::new()).unwrap();
        let once = text.clone();
        text.fix(&FixOptions::new()).unwrap();
        assert_eq!(text, once);
    }

    struct Users;

    impl crate::context::UserResolver for Users {
        fn get_input_user(&self, user_id: UserId) -> Result<InputUser> {
            if user_id == UserId(7) {
                return Err(Error::rejected("USER_ID_INVALID"));
            }
            Ok(InputUser { user_id, access_hash: 1 })
        }
    }

    #[test]
    fn user_entities() {
        let users = Users;
        let ctx = Context::default().users(&users);
        let entities = vec![
            MessageEntity::with_argument(EntityType::TextUrl, 0, 1, "tg://user?id=5"),
            MessageEntity::with_argument(EntityType::TextUrl, 1, 1, "telegram.org"),
            MessageEntity::with_argument(EntityType::TextUrl, 2, 1, "bad url"),
            MessageEntity::mention_name(3, 1, UserId(7)),
            MessageEntity::media_timestamp(4, 1, -1),
            MessageEntity::custom_emoji(5, 1, CustomEmojiId(0)),
            e(EntityType::Mention, 6, 1),
            MessageEntity::with_argument(EntityType::PreCode, 7, 1, "r\ts"),
        ];
        let expected_user = vec![
            MessageEntity::mention_name(0, 1, UserId(5)),
            MessageEntity::with_argument(EntityType::TextUrl, 1, 1, "http://telegram.org/"),
            MessageEntity::with_argument(EntityType::PreCode, 7, 1, "r s"),
        ];
        assert_eq!(validate_user_entities(&ctx, entities.clone(), false), expected_user);

        let all = validate_user_entities(&ctx, entities, true);
        assert_eq!(all.len(), 4);
        assert_eq!(all[2], e(EntityType::Mention, 6, 1));
    }

    #[test]
    fn message_text_falls_back_to_detection() {
        let ctx = Context::default();
        let text = get_message_text(&ctx, "hi @durov".into(), vec![e(EntityType::Bold, 0, -1)], false, false);
        assert_eq!(text, FormattedText::new("hi @durov", vec![e(EntityType::Mention, 3, 6)]));

        let text = get_message_text(&ctx, "hi /start ".into(), vec![e(EntityType::Bold, 0, 2)], false, false);
        assert_eq!(text, FormattedText::new("hi /start", vec![e(EntityType::Bold, 0, 2)]));
    }

    #[test]
    fn input_entities() {
        let entities = vec![
            e(EntityType::Bold, 0, 8),
            e(EntityType::Code, 0, 1),
            e(EntityType::Mention, 1, 1),
            e(EntityType::Code, 2, 1),
            MessageEntity::custom_emoji(4, 1, CustomEmojiId(3)),
            e(EntityType::Code, 6, 1),
        ];
        assert_eq!(
            get_input_entities(&entities, 3),
            [
                e(EntityType::Code, 0, 1),
                e(EntityType::Code, 2, 1),
                MessageEntity::custom_emoji(4, 1, CustomEmojiId(3)),
                e(EntityType::Code, 6, 1),
            ]
        );
        assert_eq!(get_input_entities(&entities, 4).last(), Some(&e(EntityType::Bold, 0, 8)));

        let many: Vec<_> = (0..150).map(|i| e(EntityType::Code, i * 2, 1)).collect();
        assert_eq!(get_input_entities(&many, crate::limits::MAX_INPUT_ENTITIES).len(), 100);
    }

    struct PremiumOne;

    impl StickerPolicy for PremiumOne {
        fn is_premium_custom_emoji(&self, custom_emoji_id: CustomEmojiId, _: bool) -> bool {
            custom_emoji_id == CustomEmojiId(1)
        }
    }

    #[test]
    fn unallowed_entities() {
        let text = FormattedText::new(
            "abcdef",
            vec![
                e(EntityType::BlockQuote, 0, 6),
                e(EntityType::Bold, 0, 2),
                e(EntityType::Underline, 1, 2),
                e(EntityType::Spoiler, 3, 1),
                MessageEntity::custom_emoji(4, 1, CustomEmojiId(1)),
                MessageEntity::custom_emoji(5, 1, CustomEmojiId(2)),
            ],
        );
        let ctx = Context::default();

        let mut old = text.clone();
        remove_unallowed_entities(&ctx, &mut old, &PeerPolicy::secret_chat(73));
        assert_eq!(old.entities, [e(EntityType::Bold, 0, 2)]);

        let mut middle = text.clone();
        remove_unallowed_entities(&ctx, &mut middle, &PeerPolicy::secret_chat(101));
        assert_eq!(middle.entities.len(), 3);

        let stickers = PremiumOne;
        let ctx = ctx.stickers(&stickers);
        let mut cloud = text.clone();
        remove_unallowed_entities(&ctx, &mut cloud, &PeerPolicy::default().can_use_premium_custom_emoji(false));
        assert_eq!(cloud.entities.len(), 5);
        assert!(!cloud.entities.contains(&MessageEntity::custom_emoji(4, 1, CustomEmojiId(1))));

        let mut premium = text.clone();
        remove_unallowed_entities(&ctx, &mut premium, &PeerPolicy::default());
        assert_eq!(premium, text);
    }

    #[test]
    fn first_url() {
        let text = FormattedText::new(
            "a.org https://b.org/x",
            vec![e(EntityType::Url, 0, 5), e(EntityType::Url, 6, 15)],
        );
        assert_eq!(get_first_url(&text), Some("https://b.org/x"));

        let text = FormattedText::new(
            "ab",
            vec![
                MessageEntity::with_argument(EntityType::TextUrl, 0, 1, "tg://resolve?domain=a"),
                MessageEntity::with_argument(EntityType::TextUrl, 1, 1, "https://c.org/"),
            ],
        );
        assert_eq!(get_first_url(&text), Some("https://c.org/"));
        assert_eq!(get_first_url(&FormattedText::plain("x")), None);
    }

    #[test]
    fn visible_url() {
        let text = FormattedText::new("😀 https://a.org", vec![e(EntityType::Url, 3, 13)]);
        assert!(is_visible_url(&text, "https://a.org"));
        assert!(!is_visible_url(&text, "https://b.org"));
        assert!(!is_visible_url(&text, ""));
    }

    #[test]
    fn timestamps_and_commands() {
        let text = FormattedText::new(
            "1:00 /a",
            vec![MessageEntity::media_timestamp(0, 4, 60), e(EntityType::BotCommand, 5, 2)],
        );
        assert!(has_media_timestamps(&text, 0, 60));
        assert!(!has_media_timestamps(&text, 61, 100));
        assert!(has_bot_commands(&text));
        assert!(!has_bot_commands(&FormattedText::plain("/a")));
    }

    #[test]
    fn truncation() {
        let mut text = FormattedText::new(
            "abc@durov",
            vec![e(EntityType::Bold, 0, 9), e(EntityType::Mention, 3, 6), e(EntityType::Italic, 6, 2)],
        );
        truncate_formatted_text(&mut text, 5);
        assert_eq!(text, FormattedText::new("abc@d", vec![e(EntityType::Bold, 0, 5)]));

        let mut short = FormattedText::plain("ab");
        truncate_formatted_text(&mut short, 5);
        assert_eq!(short, FormattedText::plain("ab"));
    }
}
