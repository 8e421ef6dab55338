//! Markdown that survives inside already-formatted text.
//!
//! [`parse_markdown_v3`] looks for `**bold**`, `__italic__`, `~~strike~~`,
//! `||spoiler||`, `` `code` ``, ```` ```pre``` ```` and `[text](url)` in the
//! plain parts of a text whose entities are already known, leaving existing
//! entities in place. [`get_markdown_v3`] is its inverse: it writes entities
//! back as markup wherever the result parses back to the same text.

use std::collections::HashSet;

use crate::algebra::{find_entities, remove_empty_entities};
use crate::entity::{EntityType, FormattedText, MessageEntity, sort_entities};
use crate::links::get_checked_link;
use crate::unicode::{is_first_byte, split_utf16, utf16_len};

fn text_length(text: &str) -> i32 {
    utf16_len(text) as i32
}

fn utf16_units(c: u8) -> i32 {
    if is_first_byte(c) { 1 + i32::from(c >= 0xf0) } else { 0 }
}

fn is_delimiter(c: u8) -> bool {
    matches!(c, b'_' | b'*' | b'~' | b'|')
}

/// Consumes `text` from the front in UTF-16 sized pieces.
struct Remainder<'a> {
    text: &'a str,
}

impl<'a> Remainder<'a> {
    fn take(&mut self, units: i32) -> &'a str {
        let (head, tail) = split_utf16(self.text, units);
        self.text = tail;
        head
    }
}

/// Output of a segmenting pass together with its UTF-16 length.
#[derive(Default)]
struct Output {
    text:     String,
    entities: Vec<MessageEntity>,
    length:   i32,
}

impl Output {
    fn push_str(&mut self, text: &str, length: i32) {
        self.text.push_str(text);
        self.length += length;
    }

    /// Appends a parsed piece, shifting its entities behind what is already there.
    fn append(&mut self, part: FormattedText) {
        let base = self.length;
        self.entities.extend(part.entities.into_iter().map(|mut entity| {
            entity.offset += base;
            entity
        }));
        self.length += text_length(&part.text);
        self.text.push_str(&part.text);
    }

    fn finish(self) -> FormattedText {
        FormattedText::new(self.text, self.entities)
    }
}

// ─── Text URLs ────────────────────────────────────────────────────────────────

/// Byte positions of `[`, `]` and `)` of every `[text](url)` with an
/// acceptable URL.
fn find_text_urls(text: &str) -> Vec<(usize, usize, usize)> {
    let bytes = text.as_bytes();
    let size = bytes.len();
    let mut result = Vec::new();
    let mut i = 0;
    while i < size {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        let text_begin = i;
        let mut text_end = text_begin + 1;
        while text_end < size && bytes[text_end] != b']' {
            text_end += 1;
        }
        i = text_end;
        if text_end == size || text_end == text_begin + 1 {
            i += 1;
            continue;
        }
        let url_begin = text_end + 1;
        if url_begin == size || bytes[url_begin] != b'(' {
            i += 1;
            continue;
        }
        let mut url_end = url_begin + 1;
        while url_end < size && bytes[url_end] != b')' {
            url_end += 1;
        }
        // [a](b[c](t.me) is not a link
        i = url_end;
        if url_end < size && !get_checked_link(&text[url_begin + 1..url_end]).is_empty() {
            result.push((text_begin, text_end, url_end));
        }
        i += 1;
    }
    result
}

/// State of [`parse_text_urls`]: continuous entities are kept as is and
/// links are searched for only in the gaps between them, while splittable
/// entities are cut around every removed piece of markup.
struct TextUrlParser<'a> {
    rest:       Remainder<'a>,
    out:        Output,
    kept:       Vec<MessageEntity>,
    splittable: [Vec<MessageEntity>; 5],
    part_begin: i32,
    max_end:    i32,
    skipped:    i32,
}

impl TextUrlParser<'_> {
    /// `[part_begin, max_end)` is kept, `[max_end, part_end)` is searched.
    fn add_part(&mut self, part_end: i32) {
        if self.max_end != self.part_begin {
            let kept_text = self.rest.take(self.max_end - self.part_begin);
            self.out.push_str(kept_text, self.max_end - self.part_begin);
            self.out.entities.append(&mut self.kept);
        }

        let mut positions = [0usize; 5];
        if part_end != self.max_end {
            let part = self.rest.take(part_end - self.max_end);
            let mut segment_offset = self.max_end;
            let mut prev_pos = 0;
            for (text_begin, text_end, url_end) in find_text_urls(part) {
                let before = &part[prev_pos..text_begin];
                let before_length = text_length(before);
                self.out.push_str(before, before_length);
                segment_offset += before_length;

                let link_text = &part[text_begin + 1..text_end];
                let link_text_length = text_length(link_text);
                let url = &part[text_end + 2..url_end];
                let url_length = text_length(url);
                self.out.entities.push(MessageEntity::with_argument(
                    EntityType::TextUrl,
                    self.out.length,
                    link_text_length,
                    get_checked_link(url),
                ));
                self.out.push_str(link_text, link_text_length);

                // the opening bracket and the trailing "](url)" disappear
                let initial_length = link_text_length + url_length + 4;
                let link_text_end = segment_offset + 1 + link_text_length;
                let segment_end = segment_offset + initial_length;
                for (index, entities) in self.splittable.iter_mut().enumerate() {
                    let pos = &mut positions[index];
                    while *pos < entities.len() && entities[*pos].offset < segment_end {
                        let entity = &mut entities[*pos];
                        let mut offset = entity.offset;
                        let mut length = entity.length.min(link_text_end - offset);
                        if offset > segment_offset {
                            offset -= 1;
                        } else if offset + length > segment_offset {
                            length -= 1;
                        }
                        if length > 0 {
                            if offset < segment_offset && offset + length > segment_offset {
                                self.out.entities.push(MessageEntity::new(
                                    entity.kind,
                                    offset - self.skipped,
                                    segment_offset - offset,
                                ));
                                length -= segment_offset - offset;
                                offset = segment_offset;
                            }
                            self.out.entities.push(MessageEntity::new(entity.kind, offset - self.skipped, length));
                        }
                        if entity.end() > segment_end {
                            entity.length = entity.end() - segment_end;
                            entity.offset = segment_end;
                        } else {
                            *pos += 1;
                        }
                    }
                }
                segment_offset = segment_end;
                self.skipped += 4 + url_length;
                prev_pos = url_end + 1;
            }
            self.out.text.push_str(&part[prev_pos..]);
            self.out.length += part_end - segment_offset;
        }

        for (index, entities) in self.splittable.iter_mut().enumerate() {
            let mut pos = positions[index];
            while pos < entities.len() && entities[pos].offset < part_end {
                let entity = &mut entities[pos];
                if entity.end() > part_end {
                    // at most one entity per kind can cross the part end
                    self.out.entities.push(MessageEntity::new(
                        entity.kind,
                        entity.offset - self.skipped,
                        part_end - entity.offset,
                    ));
                    entity.length = entity.end() - part_end;
                    entity.offset = part_end;
                } else {
                    self.out.entities.push(MessageEntity::new(entity.kind, entity.offset - self.skipped, entity.length));
                    pos += 1;
                }
            }
            entities.drain(..pos);
        }

        self.part_begin = part_end;
    }
}

/// `entities` must be valid for `text` and contain only splittable and
/// continuous entities.
fn parse_text_urls(text: &str, entities: &[MessageEntity]) -> FormattedText {
    let mut parser = TextUrlParser {
        rest:       Remainder { text },
        out:        Output::default(),
        kept:       Vec::new(),
        splittable: Default::default(),
        part_begin: 0,
        max_end:    0,
        skipped:    0,
    };
    for entity in entities {
        if entity.kind.is_splittable() {
            parser.splittable[entity.kind.splittable_index()].push(entity.clone());
            continue;
        }
        if entity.offset > parser.max_end {
            parser.add_part(entity.offset);
        }
        parser.max_end = entity.end();
        let mut kept = entity.clone();
        kept.offset -= parser.skipped;
        parser.kept.push(kept);
    }
    let end = parser.part_begin + text_length(parser.rest.text);
    parser.add_part(end);
    parser.out.finish()
}

// ─── Splittable markup ────────────────────────────────────────────────────────

/// Finds doubled delimiters that may open or close an entity; boundaries
/// inside existing or auto-detected entities are not allowed.
fn find_splittable_entities(text: &str, entities: &[MessageEntity]) -> Vec<MessageEntity> {
    let mut unallowed: HashSet<i32> = HashSet::new();
    for entity in entities {
        unallowed.insert(entity.offset + 1);
        unallowed.insert(entity.end() + 1);
        if matches!(
            entity.kind,
            EntityType::Mention
                | EntityType::Hashtag
                | EntityType::BotCommand
                | EntityType::Cashtag
                | EntityType::PhoneNumber
                | EntityType::BankCardNumber
        ) {
            unallowed.extend((1..entity.length).map(|i| entity.offset + i + 1));
        }
    }
    let found = find_entities(text, false, true);
    for entity in found.iter().filter(|e| !matches!(e.kind, EntityType::EmailAddress | EntityType::Url)) {
        unallowed.extend((0..=entity.length).map(|i| entity.offset + i + 1));
    }

    let bytes = text.as_bytes();
    let size = bytes.len();
    let mut result = Vec::new();
    let mut open_offsets = [0i32; 5];
    let mut utf16_offset = 0;
    let mut i = 0;
    while i + 1 < size {
        let c = bytes[i];
        utf16_offset += utf16_units(c);
        if is_delimiter(c) && bytes[i + 1] == c && !unallowed.contains(&(utf16_offset + 1)) {
            let mut j = i + 2;
            while j != size && bytes[j] == c && !unallowed.contains(&(utf16_offset + (j - i) as i32)) {
                j += 1;
            }
            if j == i + 2 {
                let kind = match c {
                    b'_' => EntityType::Italic,
                    b'*' => EntityType::Bold,
                    b'~' => EntityType::Strikethrough,
                    _ => EntityType::Spoiler,
                };
                let open = &mut open_offsets[kind.splittable_index()];
                if *open != 0 {
                    let length = utf16_offset - *open - 1;
                    if length > 0 {
                        result.push(MessageEntity::new(kind, *open, length));
                    }
                    *open = 0;
                } else {
                    *open = utf16_offset + 1;
                }
            }
            utf16_offset += (j - i - 1) as i32;
            i = j - 1;
        }
        i += 1;
    }
    result
}

/// Handles text urls and doubled delimiters; `entities` may contain only
/// splittable and continuous entities and must be sorted.
fn parse_markdown_v3_without_pre(text: &str, entities: Vec<MessageEntity>) -> FormattedText {
    let (text, mut entities) = if text.contains('[') {
        let parsed = parse_text_urls(text, &entities);
        (parsed.text, parsed.entities)
    } else {
        (text.to_string(), entities)
    };

    let has_markup = text.as_bytes().windows(2).any(|w| is_delimiter(w[0]) && w[0] == w[1]);
    if !has_markup {
        sort_entities(&mut entities);
        return FormattedText::new(text, entities);
    }

    let found = find_splittable_entities(&text, &entities);
    let mut removed: Vec<i32> = found.iter().flat_map(|e| [e.offset - 1, e.end() + 1]).collect();
    removed.sort_unstable();

    let bytes = text.as_bytes();
    let mut new_text = Vec::with_capacity(bytes.len().saturating_sub(2 * removed.len()));
    let mut next_removed = 0;
    let mut utf16_offset = 0;
    let mut i = 0;
    while i < bytes.len() {
        utf16_offset += utf16_units(bytes[i]);
        if removed.get(next_removed) == Some(&utf16_offset) {
            i += 1;
            utf16_offset += 1;
            next_removed += 1;
        } else {
            new_text.push(bytes[i]);
        }
        i += 1;
    }

    entities.extend(found);
    for entity in &mut entities {
        let before_begin = removed.partition_point(|&pos| pos <= entity.offset) as i32;
        let before_end = removed.partition_point(|&pos| pos <= entity.end()) as i32;
        entity.length -= 2 * (before_end - before_begin);
        entity.offset -= 2 * before_begin;
    }
    remove_empty_entities(&mut entities);
    sort_entities(&mut entities);

    // only ASCII delimiters were removed
    FormattedText::new(String::from_utf8_lossy(&new_text).into_owned(), entities)
}

// ─── Code and pre ─────────────────────────────────────────────────────────────

/// Finds `` `code` `` and ```` ```pre``` ```` in plain text. A pre block
/// whose first line is a single word gets that word as its language.
fn parse_pre_markup(text: &str) -> FormattedText {
    let bytes = text.as_bytes();
    let size = bytes.len();
    let mut result: Vec<u8> = Vec::with_capacity(size);
    let mut entities = Vec::new();
    let mut utf16_offset = 0;

    let mut i = 0;
    while i < size {
        let c = bytes[i];
        if c != b'`' {
            utf16_offset += utf16_units(c);
            result.push(c);
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < size && bytes[j] == b'`' {
            j += 1;
        }
        let tag_length = j - i;

        let mut found = false;
        if tag_length == 1 || tag_length == 3 {
            let mut entity_length = 0;
            let mut end_tag_begin = j;
            while end_tag_begin < size {
                let cur = bytes[end_tag_begin];
                if cur != b'`' {
                    entity_length += utf16_units(cur);
                    end_tag_begin += 1;
                    continue;
                }
                let mut end_tag_end = end_tag_begin + 1;
                while end_tag_end < size && bytes[end_tag_end] == b'`' {
                    end_tag_end += 1;
                }
                if end_tag_end - end_tag_begin != tag_length {
                    entity_length += (end_tag_end - end_tag_begin) as i32;
                    end_tag_begin = end_tag_end;
                    continue;
                }

                let mut entity_begin = j;
                let mut language = "";
                if tag_length == 3 {
                    let mut language_end = j;
                    while language_end + 1 < end_tag_begin && (33..=126).contains(&bytes[language_end]) {
                        language_end += 1;
                    }
                    if language_end + 1 < end_tag_begin && bytes[language_end] == b'\n' {
                        language = &text[j..language_end];
                        entity_begin = language_end + 1;
                        entity_length -= (entity_begin - j) as i32;
                    }
                }
                let entity = if !language.is_empty() {
                    MessageEntity::with_argument(EntityType::PreCode, utf16_offset, entity_length, language)
                } else if tag_length == 3 {
                    MessageEntity::new(EntityType::Pre, utf16_offset, entity_length)
                } else {
                    MessageEntity::new(EntityType::Code, utf16_offset, entity_length)
                };
                entities.push(entity);
                result.extend_from_slice(&bytes[entity_begin..end_tag_begin]);
                utf16_offset += entity_length;
                i = end_tag_end;
                found = true;
                break;
            }
        }
        if !found {
            result.extend_from_slice(&bytes[i..j]);
            utf16_offset += tag_length as i32;
            i = j;
        }
    }

    // backticks are ASCII, so every cut is on a character boundary
    FormattedText::new(String::from_utf8_lossy(&result).into_owned(), entities)
}

/// State of [`parse_pre_entities`]: nothing may intersect a pre entity,
/// so backticks are looked for only in the gaps between existing entities.
struct PreParser<'a> {
    rest:       Remainder<'a>,
    out:        Output,
    part_begin: i32,
    max_end:    i32,
    skipped:    i32,
}

impl PreParser<'_> {
    fn add_part(&mut self, part_end: i32) {
        if self.max_end != self.part_begin {
            let kept = self.rest.take(self.max_end - self.part_begin);
            self.out.push_str(kept, self.max_end - self.part_begin);
        }
        if part_end != self.max_end {
            let part = self.rest.take(part_end - self.max_end);
            if part.contains('`') {
                let parsed = parse_pre_markup(part);
                self.skipped += (part.len() - parsed.text.len()) as i32;
                self.out.append(parsed);
            } else {
                self.out.push_str(part, part_end - self.max_end);
            }
        }
        self.part_begin = part_end;
    }
}

fn parse_pre_entities(text: &str, entities: Vec<MessageEntity>) -> FormattedText {
    let mut parser = PreParser {
        rest:       Remainder { text },
        out:        Output::default(),
        part_begin: 0,
        max_end:    0,
        skipped:    0,
    };
    for mut entity in entities {
        if entity.offset > parser.max_end {
            parser.add_part(entity.offset);
        }
        parser.max_end = parser.max_end.max(entity.end());
        entity.offset -= parser.skipped;
        parser.out.entities.push(entity);
    }
    let end = parser.part_begin + text_length(parser.rest.text);
    parser.add_part(end);
    parser.out.finish()
}

/// Pieces of a text between barrier entities, each parsed separately.
struct Segments<'a> {
    rest:       Remainder<'a>,
    out:        Output,
    pending:    Vec<MessageEntity>,
    part_begin: i32,
}

impl Segments<'_> {
    fn add_part(&mut self, part_end: i32, parse: &impl Fn(&str, Vec<MessageEntity>) -> FormattedText) {
        let part_text = self.rest.take(part_end - self.part_begin);
        self.out.append(parse(part_text, std::mem::take(&mut self.pending)));
        self.part_begin = part_end;
    }

    fn push_pending(&mut self, entity: &MessageEntity) {
        let mut entity = entity.clone();
        entity.offset -= self.part_begin;
        self.pending.push(entity);
    }
}

/// Cuts `text` around the entities selected by `is_barrier` and parses the
/// pieces between them with `parse`. With `parse_inside` the contents of a
/// barrier are parsed too and the barrier is resized to the result;
/// otherwise they are copied verbatim.
fn parse_around(
    text: FormattedText,
    is_barrier: impl Fn(EntityType) -> bool,
    parse_inside: bool,
    parse: impl Fn(&str, Vec<MessageEntity>) -> FormattedText,
) -> FormattedText {
    let mut segments = Segments {
        rest:       Remainder { text: &text.text },
        out:        Output::default(),
        pending:    Vec::new(),
        part_begin: 0,
    };

    let mut entities = text.entities.iter().peekable();
    while let Some(entity) = entities.next() {
        if !is_barrier(entity.kind) {
            segments.push_pending(entity);
            continue;
        }

        segments.add_part(entity.offset, &parse);
        let mut barrier = entity.clone();
        barrier.offset = segments.out.length;
        let index = segments.out.entities.len();
        segments.out.entities.push(barrier);

        if parse_inside {
            while let Some(inner) = entities.next_if(|next| next.end() <= entity.end()) {
                segments.push_pending(inner);
            }
            segments.add_part(entity.end(), &parse);
            let barrier = &mut segments.out.entities[index];
            barrier.length = segments.out.length - barrier.offset;
        } else {
            let inside = segments.rest.take(entity.length);
            segments.out.push_str(inside, entity.length);
            segments.part_begin = entity.end();
        }
    }
    let end = segments.part_begin + text_length(segments.rest.text);
    segments.add_part(end, &parse);
    segments.out.finish()
}

fn parse_markdown_v3_without_blockquote(mut text: FormattedText) -> FormattedText {
    if text.text.contains('`') {
        text = parse_pre_entities(&text.text, text.entities);
    }
    if !text.entities.iter().any(|e| e.kind.is_pre()) {
        return parse_markdown_v3_without_pre(&text.text, text.entities);
    }
    parse_around(text, EntityType::is_pre, false, parse_markdown_v3_without_pre)
}

/// Parses markup in the plain parts of `text`.
///
/// The entities of `text` must be valid; the returned entities still need
/// to go through entity repair before use.
pub fn parse_markdown_v3(text: FormattedText) -> FormattedText {
    if !text.entities.iter().any(|e| e.kind.is_blockquote()) {
        return parse_markdown_v3_without_blockquote(text);
    }
    parse_around(text, EntityType::is_blockquote, true, |part, entities| {
        parse_markdown_v3_without_blockquote(FormattedText::new(part, entities))
    })
}

// ─── Serializing ──────────────────────────────────────────────────────────────

fn is_valid_language_code(code: &str) -> bool {
    code.bytes().all(|c| (33..=126).contains(&c))
}

/// Writes the user entities of `text` back as markup.
///
/// Entities without a markup form (underline, blockquotes, mentions by id,
/// custom emoji) stay entities. If `text` has an auto-detected entity, or
/// the markup would not parse back into exactly `text`, `text` is returned
/// unchanged. The entities of `text` must be valid and sorted.
pub fn get_markdown_v3(text: FormattedText) -> FormattedText {
    if text.entities.is_empty() || !text.entities.iter().all(|e| e.kind.is_user()) {
        return text;
    }

    let bytes = text.text.as_bytes();
    let mut out = String::with_capacity(bytes.len() + 8 * text.entities.len());
    let mut entities = Vec::new();
    // (index into text.entities, UTF-16 units added before its contents)
    let mut open: Vec<(usize, i32)> = Vec::new();
    let mut next_entity = 0;
    let mut utf16_offset = 0;
    let mut utf16_added = 0;

    let mut pos = 0;
    let mut chunk_start = 0;
    loop {
        let c = bytes.get(pos).copied().unwrap_or(0);
        if is_first_byte(c) {
            out.push_str(&text.text[chunk_start..pos]);
            chunk_start = pos;

            while let Some(&(index, added_before)) = open.last() {
                let entity = &text.entities[index];
                if utf16_offset < entity.end() {
                    break;
                }
                let closing = match entity.kind {
                    EntityType::Italic => Some("__"),
                    EntityType::Bold => Some("**"),
                    EntityType::Strikethrough => Some("~~"),
                    EntityType::Spoiler => Some("||"),
                    EntityType::Code => Some("`"),
                    EntityType::Pre => Some("```"),
                    EntityType::PreCode if is_valid_language_code(&entity.argument) => Some("```"),
                    EntityType::TextUrl => {
                        out.push_str("](");
                        out.push_str(&entity.argument);
                        out.push(')');
                        utf16_added += 3 + entity.argument.len() as i32;
                        Some("")
                    }
                    _ => None,
                };
                match closing {
                    Some(markup) => {
                        out.push_str(markup);
                        utf16_added += markup.len() as i32;
                    }
                    None => {
                        let mut kept = entity.clone();
                        kept.offset += added_before;
                        kept.length += utf16_added - added_before;
                        entities.push(kept);
                    }
                }
                open.pop();
            }

            while next_entity < text.entities.len() && utf16_offset >= text.entities[next_entity].offset {
                let entity = &text.entities[next_entity];
                let opening = match entity.kind {
                    EntityType::Italic => "__".to_string(),
                    EntityType::Bold => "**".to_string(),
                    EntityType::Strikethrough => "~~".to_string(),
                    EntityType::Spoiler => "||".to_string(),
                    EntityType::TextUrl => "[".to_string(),
                    EntityType::Code => "`".to_string(),
                    EntityType::Pre => {
                        if c == b'\n' { "```".to_string() } else { "```\n".to_string() }
                    }
                    EntityType::PreCode if is_valid_language_code(&entity.argument) => {
                        let newline = if c == b'\n' { "" } else { "\n" };
                        format!("```{}{newline}", entity.argument)
                    }
                    _ => String::new(),
                };
                out.push_str(&opening);
                utf16_added += opening.len() as i32;
                open.push((next_entity, utf16_added));
                next_entity += 1;
            }
            utf16_offset += utf16_units(c);
        }
        if pos == bytes.len() {
            break;
        }
        pos += 1;
    }
    out.push_str(&text.text[chunk_start..]);

    sort_entities(&mut entities);
    let result = FormattedText::new(out, entities);
    if parse_markdown_v3(result.clone()) != text {
        tracing::debug!("[layer-entities] markdown for {} does not parse back, keeping entities", text);
        return text;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use EntityType::*;

    fn parse(text: &str, entities: Vec<MessageEntity>) -> FormattedText {
        parse_markdown_v3(FormattedText::new(text, entities))
    }

    fn e(kind: EntityType, offset: i32, length: i32) -> MessageEntity {
        MessageEntity::new(kind, offset, length)
    }

    #[test]
    fn plain_markup() {
        assert_eq!(parse("a**b**c", vec![]), FormattedText::new("abc", vec![e(Bold, 1, 1)]));
        assert_eq!(parse("__a__ ~~b~~ ||c||", vec![]), FormattedText::new("a b c", vec![
            e(Italic, 0, 1),
            e(Strikethrough, 2, 1),
            e(Spoiler, 4, 1),
        ]));
        assert_eq!(parse("****", vec![]), FormattedText::plain("****"));
        assert_eq!(parse("***a***", vec![]), FormattedText::plain("***a***"));
        assert_eq!(parse("**a", vec![]), FormattedText::plain("**a"));
    }

    #[test]
    fn markup_next_to_existing_entities() {
        assert_eq!(parse("**a**b", vec![e(Italic, 5, 1)]), FormattedText::new("ab", vec![
            e(Bold, 0, 1),
            e(Italic, 1, 1)
        ]));
        assert_eq!(parse("a__b__", vec![e(Bold, 0, 6)]), FormattedText::new("ab", vec![
            e(Bold, 0, 2),
            e(Italic, 1, 1)
        ]));
    }

    #[test]
    fn text_urls() {
        assert_eq!(parse("[a](t.me) b", vec![]), FormattedText::new("a b", vec![
            MessageEntity::with_argument(TextUrl, 0, 1, "http://t.me/")
        ]));
        assert_eq!(parse("[a](bad url)", vec![]), FormattedText::plain("[a](bad url)"));
        assert_eq!(parse("[](t.me)", vec![]), FormattedText::plain("[](t.me)"));
    }

    #[test]
    fn code_and_pre() {
        assert_eq!(parse("`a` b", vec![]), FormattedText::new("a b", vec![e(Code, 0, 1)]));
        assert_eq!(parse("```rust\nfn```", vec![]), FormattedText::new("fn", vec![
            MessageEntity::with_argument(PreCode, 0, 2, "rust")
        ]));
        assert_eq!(parse("```\nx```", vec![]), FormattedText::new("x", vec![e(Pre, 0, 1)]));
        assert_eq!(parse("``a``", vec![]), FormattedText::plain("``a``"));
        assert_eq!(parse("`**a**`", vec![]), FormattedText::new("**a**", vec![e(Code, 0, 5)]));
    }

    #[test]
    fn markup_inside_blockquote() {
        assert_eq!(parse("x**a**", vec![e(BlockQuote, 0, 6)]), FormattedText::new("xa", vec![
            e(BlockQuote, 0, 2),
            e(Bold, 1, 1)
        ]));
    }

    #[test]
    fn serializes_markup() {
        let text = FormattedText::new("a b", vec![e(Bold, 0, 1), e(Italic, 2, 1)]);
        assert_eq!(get_markdown_v3(text.clone()), FormattedText::plain("**a** __b__"));
        assert_eq!(parse_markdown_v3(get_markdown_v3(text.clone())), text);

        let code = FormattedText::new("x", vec![MessageEntity::with_argument(PreCode, 0, 1, "rs")]);
        assert_eq!(get_markdown_v3(code), FormattedText::plain("```rs\nx```"));
    }

    #[test]
    fn keeps_entities_without_markup() {
        let text = FormattedText::new("ab", vec![e(Underline, 0, 2), e(Bold, 1, 1)]);
        assert_eq!(
            get_markdown_v3(text),
            FormattedText::new("a**b**", vec![e(Underline, 0, 6)])
        );
    }

    #[test]
    fn falls_back_to_entities() {
        let detected = FormattedText::new("@user", vec![e(Mention, 0, 5)]);
        assert_eq!(get_markdown_v3(detected.clone()), detected);

        // markup around text that already looks like markup does not parse back
        let ambiguous = FormattedText::new("_", vec![e(Italic, 0, 1)]);
        assert_eq!(get_markdown_v3(ambiguous.clone()), ambiguous);
    }
}
