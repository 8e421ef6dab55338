//! Entity set algebra: validation, overlap removal, splitting and merging.
//!
//! Entity kinds fall into four disjoint classes (see [`EntityType`]):
//! splittable formatting, blockquotes, pre-formatted blocks and continuous
//! semantic spans. A valid entity list is sorted and properly nested, with
//! the class rules checked by [`are_entities_valid`]. [`fix_entities`] repairs
//! any list without ever failing.

use crate::entity::{
    BLOCKQUOTE_MASK, CONTINUOUS_MASK, EntityType, MessageEntity, SPLITTABLE_MASK, SPLITTABLE_TYPE_COUNT,
    sort_entities,
};
use crate::matchers::{
    Span, find_bank_card_numbers, find_bot_commands, find_cashtags, find_hashtags, find_media_timestamps,
    find_mentions, find_tg_urls, find_urls,
};
use crate::unicode::next_code;

// ─── Validation ───────────────────────────────────────────────────────────────

/// Checks the nesting rules on a sorted entity list.
///
/// A `false` result is not an error, it only means [`fix_entities`] has
/// work to do.
pub fn are_entities_valid(entities: &[MessageEntity]) -> bool {
    let mut end_pos = [-1i32; SPLITTABLE_TYPE_COUNT];
    let mut stack: Vec<&MessageEntity> = Vec::new();
    let mut nested_mask = 0u32;
    for entity in entities {
        while let Some(&top) = stack.last() {
            if entity.offset < top.end() {
                break;
            }
            nested_mask &= !top.kind.mask();
            stack.pop();
        }

        if let Some(&parent) = stack.last() {
            if entity.end() > parent.end() {
                return false;
            }
            if nested_mask & entity.kind.mask() != 0 {
                return false;
            }
            if parent.kind.is_pre() {
                return false;
            }
            if entity.kind.is_pre() && nested_mask & !BLOCKQUOTE_MASK != 0 {
                return false;
            }
            if (entity.kind.is_continuous() || entity.kind.is_blockquote()) && nested_mask & CONTINUOUS_MASK != 0 {
                return false;
            }
            if entity.kind.is_blockquote() && nested_mask & BLOCKQUOTE_MASK != 0 {
                return false;
            }
            // an outer splittable entity may need to be split around this one
            if nested_mask & SPLITTABLE_MASK != 0 {
                return false;
            }
        }

        if entity.kind.is_splittable() {
            let index = entity.kind.splittable_index();
            // touching entities of one kind must be merged
            if end_pos[index] >= entity.offset {
                return false;
            }
            end_pos[index] = entity.end();
        }
        stack.push(entity);
        nested_mask |= entity.kind.mask();
    }
    true
}

// ─── Overlap removal ──────────────────────────────────────────────────────────

/// Keeps the first of every group of intersecting or nested entities.
pub(crate) fn remove_intersecting_entities(entities: &mut Vec<MessageEntity>) {
    let mut last_end = 0;
    entities.retain(|entity| {
        if entity.offset >= last_end {
            last_end = entity.end();
            true
        } else {
            false
        }
    });
}

/// Drops entities that cross a blockquote boundary. Both lists must be
/// sorted and free of intersections.
pub(crate) fn remove_entities_intersecting_blockquote(
    entities: &mut Vec<MessageEntity>,
    blockquotes: &[MessageEntity],
) {
    if blockquotes.is_empty() {
        return;
    }
    let mut quotes = blockquotes.iter().peekable();
    entities.retain(|entity| {
        while let Some(quote) = quotes.peek() {
            if quote.kind.is_blockquote() && quote.end() > entity.offset {
                break;
            }
            quotes.next();
        }
        match quotes.peek() {
            Some(quote) => {
                quote.end() >= entity.end() && !(entity.offset < quote.offset && quote.offset < entity.end())
            }
            None => true,
        }
    });
}

/// Removes zero-length entities and links, mentions and custom emoji
/// without a usable target.
pub fn remove_empty_entities(entities: &mut Vec<MessageEntity>) {
    entities.retain(|entity| {
        if entity.length <= 0 {
            return false;
        }
        match entity.kind {
            EntityType::TextUrl => !entity.argument.is_empty(),
            EntityType::MentionName => entity.user_id.is_valid(),
            EntityType::CustomEmoji => entity.custom_emoji_id.is_valid(),
            _ => true,
        }
    });
}

// ─── Detection ────────────────────────────────────────────────────────────────

fn byte_entity(kind: EntityType, span: &Span) -> MessageEntity {
    MessageEntity::new(kind, span.start as i32, (span.end - span.start) as i32)
}

/// Converts UTF-8 byte offsets into UTF-16 offsets, dropping intersecting
/// entities first.
pub(crate) fn fix_entity_offsets(text: &str, entities: &mut Vec<MessageEntity>) {
    if entities.is_empty() {
        return;
    }
    sort_entities(entities);
    remove_intersecting_entities(entities);

    let bytes = text.as_bytes();
    let mut pos = 0usize;
    let mut utf16_pos = 0i32;
    for entity in entities.iter_mut() {
        let mut boundaries_left = 2;
        let begin = entity.offset as usize;
        let end = entity.end() as usize;
        if begin == pos {
            boundaries_left -= 1;
            entity.offset = utf16_pos;
        }
        while pos < bytes.len() && boundaries_left > 0 {
            utf16_pos += 1 + i32::from(bytes[pos] >= 0xf0);
            pos = next_code(bytes, pos).1;
            if begin == pos {
                boundaries_left -= 1;
                entity.offset = utf16_pos;
            } else if end == pos {
                boundaries_left -= 1;
                entity.length = utf16_pos - entity.offset;
            }
        }
    }
}

/// Runs every matcher over `text` and returns the non-intersecting
/// entities found, with UTF-16 offsets.
pub fn find_entities(text: &str, skip_bot_commands: bool, skip_media_timestamps: bool) -> Vec<MessageEntity> {
    let mut entities = Vec::new();
    let mut add = |kind: EntityType, spans: Vec<Span>| {
        entities.extend(spans.iter().map(|span| byte_entity(kind, span)));
    };
    add(EntityType::Mention, find_mentions(text));
    if !skip_bot_commands {
        add(EntityType::BotCommand, find_bot_commands(text));
    }
    add(EntityType::Hashtag, find_hashtags(text));
    add(EntityType::Cashtag, find_cashtags(text));
    add(EntityType::BankCardNumber, find_bank_card_numbers(text));
    add(EntityType::Url, find_tg_urls(text));

    for (span, is_email) in find_urls(text) {
        let kind = if is_email { EntityType::EmailAddress } else { EntityType::Url };
        entities.push(byte_entity(kind, &span));
    }
    if !skip_media_timestamps {
        entities.extend(media_timestamp_entities(text));
    }

    fix_entity_offsets(text, &mut entities);
    entities
}

fn media_timestamp_entities(text: &str) -> impl Iterator<Item = MessageEntity> {
    find_media_timestamps(text).into_iter().map(|(span, seconds)| MessageEntity {
        media_timestamp: seconds,
        ..byte_entity(EntityType::MediaTimestamp, &span)
    })
}

pub(crate) fn find_media_timestamp_entities(text: &str) -> Vec<MessageEntity> {
    let mut entities: Vec<_> = media_timestamp_entities(text).collect();
    fix_entity_offsets(text, &mut entities);
    entities
}

// ─── Merging and splitting ────────────────────────────────────────────────────

/// Merges two sorted non-intersecting lists; on conflict the old entity wins.
fn merge_entities(old_entities: Vec<MessageEntity>, new_entities: Vec<MessageEntity>) -> Vec<MessageEntity> {
    if new_entities.is_empty() {
        return old_entities;
    }
    if old_entities.is_empty() {
        return new_entities;
    }

    let mut result = Vec::with_capacity(old_entities.len() + new_entities.len());
    let mut new_entities = new_entities.into_iter().peekable();
    for old in old_entities {
        while let Some(new) = new_entities.next_if(|new| new.end() <= old.offset) {
            result.push(new);
        }
        let old_end = old.end();
        result.push(old);
        while new_entities.next_if(|new| new.offset < old_end).is_some() {}
    }
    result.extend(new_entities);
    result
}

/// Coalesces splittable entities per kind and cuts them at the boundaries
/// of the other entities.
struct Splitter {
    pending: std::iter::Peekable<std::vec::IntoIter<MessageEntity>>,
    begin_pos: [i32; SPLITTABLE_TYPE_COUNT],
    end_pos: [i32; SPLITTABLE_TYPE_COUNT],
    result: Vec<MessageEntity>,
}

impl Splitter {
    fn flush(&mut self, offset: i32) {
        for index in 0..SPLITTABLE_TYPE_COUNT {
            if self.end_pos[index] == 0 || self.begin_pos[index] >= offset {
                continue;
            }
            let kind = EntityType::from_splittable_index(index);
            if self.end_pos[index] <= offset {
                let length = self.end_pos[index] - self.begin_pos[index];
                self.result.push(MessageEntity::new(kind, self.begin_pos[index], length));
                self.begin_pos[index] = 0;
                self.end_pos[index] = 0;
            } else {
                let length = offset - self.begin_pos[index];
                self.result.push(MessageEntity::new(kind, self.begin_pos[index], length));
                self.begin_pos[index] = offset;
            }
        }
    }

    fn add_until(&mut self, end_offset: i32) {
        while let Some(entity) = self.pending.next_if(|entity| entity.offset < end_offset) {
            let index = entity.kind.splittable_index();
            if self.end_pos[index] != 0 && entity.offset <= self.end_pos[index] {
                self.end_pos[index] = self.end_pos[index].max(entity.end());
            } else {
                self.flush(entity.offset);
                self.begin_pos[index] = entity.offset;
                self.end_pos[index] = entity.end();
            }
        }
        self.flush(end_offset);
    }

    fn add_offset<'a>(&mut self, open: &mut Vec<&'a MessageEntity>, offset: i32) {
        while let Some(&top) = open.last() {
            if offset < top.end() {
                break;
            }
            let old_len = self.result.len();
            self.add_until(top.end());
            // nothing may be nested into a pre-formatted block
            if top.kind.is_pre() {
                self.result.truncate(old_len);
            }
            open.pop();
        }
        self.add_until(offset);
    }
}

/// `entities` must contain only splittable kinds; both lists must be sorted.
pub(crate) fn split_entities(entities: &mut Vec<MessageEntity>, other_entities: &[MessageEntity]) {
    let mut splitter = Splitter {
        pending: std::mem::take(entities).into_iter().peekable(),
        begin_pos: [0; SPLITTABLE_TYPE_COUNT],
        end_pos: [0; SPLITTABLE_TYPE_COUNT],
        result: Vec::new(),
    };
    let mut open = Vec::new();
    for other in other_entities {
        splitter.add_offset(&mut open, other.offset);
        open.push(other);
    }
    splitter.add_offset(&mut open, i32::MAX);

    *entities = splitter.result;
    sort_entities(entities);
}

fn resplit_entities(mut splittable: Vec<MessageEntity>, mut entities: Vec<MessageEntity>) -> Vec<MessageEntity> {
    if !splittable.is_empty() {
        split_entities(&mut splittable, &entities);
        if entities.is_empty() {
            return splittable;
        }
        entities.append(&mut splittable);
        sort_entities(&mut entities);
    }
    entities
}

struct Buckets {
    continuous: Vec<MessageEntity>,
    blockquote: Vec<MessageEntity>,
    splittable: Vec<MessageEntity>,
}

fn into_buckets(entities: Vec<MessageEntity>) -> Buckets {
    let mut buckets = Buckets { continuous: Vec::new(), blockquote: Vec::new(), splittable: Vec::new() };
    for entity in entities {
        if entity.kind.is_splittable() {
            buckets.splittable.push(entity);
        } else if entity.kind.is_blockquote() {
            buckets.blockquote.push(entity);
        } else {
            buckets.continuous.push(entity);
        }
    }
    buckets
}

/// Repairs an arbitrary entity list into a sorted valid one.
///
/// Continuous and pre entities keep the earliest of any overlapping group,
/// blockquotes likewise; continuous entities crossing a blockquote boundary
/// are dropped and splittable entities are merged and re-cut around what
/// remains.
pub fn fix_entities(entities: &mut Vec<MessageEntity>) {
    sort_entities(entities);
    if are_entities_valid(entities) {
        return;
    }

    let Buckets { mut continuous, mut blockquote, splittable } = into_buckets(std::mem::take(entities));
    remove_intersecting_entities(&mut continuous);

    if !blockquote.is_empty() {
        remove_intersecting_entities(&mut blockquote);
        remove_entities_intersecting_blockquote(&mut continuous, &blockquote);
        continuous.append(&mut blockquote);
        sort_entities(&mut continuous);
    }

    *entities = resplit_entities(splittable, continuous);
}

/// Adds freshly detected, non-intersecting `new_entities` to a sorted list.
///
/// New entities never win over existing ones and never cross an existing
/// blockquote.
pub(crate) fn merge_new_entities(entities: &mut Vec<MessageEntity>, mut new_entities: Vec<MessageEntity>) {
    if new_entities.is_empty() {
        return;
    }

    let Buckets { continuous, mut blockquote, splittable } = into_buckets(std::mem::take(entities));
    remove_entities_intersecting_blockquote(&mut new_entities, &blockquote);

    let mut continuous = merge_entities(continuous, new_entities);
    if !blockquote.is_empty() {
        continuous.append(&mut blockquote);
        sort_entities(&mut continuous);
    }

    *entities = resplit_entities(splittable, continuous);
}

#[cfg(test)]
mod tests {
    use super::*;
    use EntityType::*;

    fn e(kind: EntityType, offset: i32, length: i32) -> MessageEntity {
        MessageEntity::new(kind, offset, length)
    }

    #[test]
    fn validity() {
        assert!(are_entities_valid(&[]));
        assert!(!are_entities_valid(&[e(Bold, 0, 5), e(Url, 1, 2)]));
        assert!(are_entities_valid(&[e(Url, 0, 5), e(Bold, 1, 2)]));
        assert!(are_entities_valid(&[e(BlockQuote, 0, 5), e(Pre, 1, 2)]));
        assert!(!are_entities_valid(&[e(Pre, 0, 5), e(Bold, 1, 2)]));
        assert!(!are_entities_valid(&[e(Url, 0, 5), e(Mention, 1, 2)]));
        assert!(!are_entities_valid(&[e(BlockQuote, 0, 5), e(ExpandableBlockQuote, 1, 2)]));
        assert!(!are_entities_valid(&[e(Bold, 0, 2), e(Bold, 2, 2)]));
        assert!(!are_entities_valid(&[e(Url, 0, 3), e(Bold, 1, 3)]));
    }

    #[test]
    fn intersecting_entities_are_removed() {
        let mut entities = vec![e(Url, 0, 3), e(Mention, 1, 1), e(Hashtag, 3, 2), e(Cashtag, 4, 4)];
        remove_intersecting_entities(&mut entities);
        assert_eq!(entities, [e(Url, 0, 3), e(Hashtag, 3, 2)]);
    }

    #[test]
    fn blockquote_boundaries() {
        let quotes = [e(BlockQuote, 2, 4)];
        let mut entities = vec![e(Url, 0, 1), e(Url, 1, 2), e(Url, 3, 2), e(Url, 5, 2), e(Url, 7, 1)];
        remove_entities_intersecting_blockquote(&mut entities, &quotes);
        assert_eq!(entities, [e(Url, 0, 1), e(Url, 3, 2), e(Url, 7, 1)]);
    }

    #[test]
    fn offsets_become_utf16() {
        // "😀 @abcd": the mention starts at byte 5, UTF-16 offset 3
        let entities = find_entities("😀 @abcd", false, false);
        assert_eq!(entities, [e(Mention, 3, 5)]);
    }

    #[test]
    fn splittable_entities_are_merged_and_cut() {
        let mut entities = vec![e(Italic, 0, 6), e(Bold, 0, 2), e(Bold, 1, 3)];
        split_entities(&mut entities, &[e(Url, 2, 2)]);
        assert_eq!(entities, [e(Bold, 0, 2), e(Italic, 0, 2), e(Bold, 2, 2), e(Italic, 2, 2), e(Italic, 4, 2)]);
    }

    #[test]
    fn nothing_survives_inside_pre() {
        let mut entities = vec![e(Bold, 0, 6)];
        split_entities(&mut entities, &[e(Pre, 2, 2)]);
        assert_eq!(entities, [e(Bold, 0, 2), e(Bold, 4, 2)]);
    }

    #[test]
    fn fix_is_idempotent() {
        let mut entities = vec![
            e(Italic, 0, 2),
            e(Bold, 1, 2),
            e(Url, 0, 4),
            e(Mention, 2, 3),
            e(BlockQuote, 1, 6),
            e(Code, 5, 3),
        ];
        fix_entities(&mut entities);
        assert_eq!(entities, [e(Italic, 0, 1), e(BlockQuote, 1, 6), e(Bold, 1, 2), e(Italic, 1, 1)]);
        let once = entities.clone();
        fix_entities(&mut entities);
        assert_eq!(entities, once);
    }

    #[test]
    fn merged_entities_prefer_old_ones() {
        let mut entities = vec![e(Bold, 0, 10), e(TextUrl, 2, 3)];
        entities[1].argument = "http://a.bc/".into();
        merge_new_entities(&mut entities, vec![e(Url, 0, 2), e(Url, 4, 2), e(Mention, 6, 2)]);
        let kinds: Vec<_> = entities.iter().map(|entity| (entity.kind, entity.offset, entity.length)).collect();
        assert_eq!(
            kinds,
            [
                (Url, 0, 2),
                (Bold, 0, 2),
                (TextUrl, 2, 3),
                (Bold, 2, 3),
                (Bold, 5, 1),
                (Mention, 6, 2),
                (Bold, 6, 2),
                (Bold, 8, 2)
            ]
        );
    }
}
