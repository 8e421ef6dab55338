//! Legacy Markdown and MarkdownV2.
//!
//! Both parsers replace the input with its plain text and return the
//! entities found, or leave it untouched and return a parse error. Byte
//! offsets in error messages refer to the input.

use crate::entity::{CustomEmojiId, EntityType, MessageEntity, UserId, sort_entities};
use crate::errors::{Error, Result};
use crate::links::{get_checked_link, get_link_custom_emoji_id, get_link_user_id};
use crate::unicode::{is_first_byte, is_space};

fn at(bytes: &[u8], i: usize) -> u8 {
    bytes.get(i).copied().unwrap_or(0)
}

fn utf16_units(c: u8) -> i32 {
    if is_first_byte(c) { 1 + i32::from(c >= 0xf0) } else { 0 }
}

/// Skips one `\n`, `\r`, `\r\n` or `\n\r` at `i`.
fn skip_leading_newline(bytes: &[u8], i: usize) -> usize {
    let c = at(bytes, i);
    if c != b'\n' && c != b'\r' {
        return i;
    }
    let next = at(bytes, i + 1);
    if (next == b'\n' || next == b'\r') && next != c { i + 2 } else { i + 1 }
}

/// End of a pre block language tag starting at `i`, if there is one.
fn pre_language_end(bytes: &[u8], i: usize) -> Option<usize> {
    let mut end = i;
    while !is_space(at(bytes, end)) && at(bytes, end) != b'`' {
        end += 1;
    }
    (end != i && end < bytes.len() && at(bytes, end) != b'`').then_some(end)
}

fn into_text(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

/// TextUrl or MentionName for a link, `None` if the link is rejected.
fn link_entity(offset: i32, length: i32, url: &str) -> Option<MessageEntity> {
    let user_id = get_link_user_id(url);
    if user_id.is_valid() {
        return Some(MessageEntity::mention_name(offset, length, user_id));
    }
    let url = get_checked_link(url);
    (!url.is_empty()).then(|| MessageEntity::with_argument(EntityType::TextUrl, offset, length, url))
}

// ─── Legacy Markdown ──────────────────────────────────────────────────────────

/// Parses `_italic_`, `*bold*`, `` `code` ``, ```` ```pre``` ```` and
/// `[text](url)`. Nothing nests; entities come back unsorted.
pub fn parse_markdown(text: &mut String) -> Result<Vec<MessageEntity>> {
    let (plain, entities) = parse_markdown_v1_impl(text)?;
    *text = plain;
    Ok(entities)
}

fn parse_markdown_v1_impl(text: &str) -> Result<(String, Vec<MessageEntity>)> {
    let src = text.as_bytes();
    let size = src.len();
    let mut out = Vec::with_capacity(size);
    let mut entities = Vec::new();
    let mut utf16_offset = 0i32;

    let mut i = 0;
    while i < size {
        let c = src[i];
        if c == b'\\' && matches!(at(src, i + 1), b'_' | b'*' | b'`' | b'[') {
            out.push(src[i + 1]);
            utf16_offset += 1;
            i += 2;
            continue;
        }
        if !matches!(c, b'_' | b'*' | b'`' | b'[') {
            utf16_offset += utf16_units(c);
            out.push(c);
            i += 1;
            continue;
        }

        let begin_pos = i;
        let end_character = if c == b'[' { b']' } else { c };
        let mut is_pre = false;
        let mut language = "";
        i += 1;
        if c == b'`' && at(src, i) == b'`' && at(src, i + 1) == b'`' {
            i += 2;
            is_pre = true;
            if let Some(language_end) = pre_language_end(src, i) {
                language = &text[i..language_end];
                i = language_end;
            }
            i = skip_leading_newline(src, i);
        }

        let entity_offset = utf16_offset;
        while i < size && (src[i] != end_character || (is_pre && !(at(src, i + 1) == b'`' && at(src, i + 2) == b'`'))) {
            utf16_offset += utf16_units(src[i]);
            out.push(src[i]);
            i += 1;
        }
        if i == size {
            return Err(Error::parse(format!("Can't find end of the entity starting at byte offset {begin_pos}")));
        }

        if entity_offset != utf16_offset {
            let length = utf16_offset - entity_offset;
            match c {
                b'_' => entities.push(MessageEntity::new(EntityType::Italic, entity_offset, length)),
                b'*' => entities.push(MessageEntity::new(EntityType::Bold, entity_offset, length)),
                b'[' => {
                    let url = if at(src, i + 1) == b'(' {
                        i += 2;
                        let url_begin = i;
                        while i < size && src[i] != b')' {
                            i += 1;
                        }
                        &text[url_begin..i]
                    } else {
                        // the link text doubles as the URL
                        &text[begin_pos + 1..i]
                    };
                    entities.extend(link_entity(entity_offset, length, url));
                }
                _ if !is_pre => entities.push(MessageEntity::new(EntityType::Code, entity_offset, length)),
                _ if language.is_empty() => entities.push(MessageEntity::new(EntityType::Pre, entity_offset, length)),
                _ => entities.push(MessageEntity::with_argument(EntityType::PreCode, entity_offset, length, language)),
            }
        }
        if is_pre {
            i += 2;
        }
        i += 1;
    }

    Ok((into_text(out)?, entities))
}

// ─── MarkdownV2 ───────────────────────────────────────────────────────────────

const RESERVED_CHARACTERS: &[u8] = b"_*[]()~`>#+-=|{}.!\n";

struct OpenEntity {
    kind:        EntityType,
    argument:    String,
    /// UTF-16 offset of the entity in the output.
    offset:      i32,
    /// Byte offset of the opening delimiter in the input.
    byte_offset: usize,
    /// Byte offset of the entity in the output.
    begin_pos:   usize,
}

fn reserved_error(c: u8) -> Error {
    Error::parse(format!(
        "Character '{}' is reserved and must be escaped with the preceding '\\'",
        char::from(c)
    ))
}

fn unclosed_error(entity: &OpenEntity) -> Error {
    Error::parse(format!("Can't find end of {} entity at byte offset {}", entity.kind, entity.byte_offset))
}

fn is_escape(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'\\' && (1..=126).contains(&at(bytes, i + 1))
}

/// Reads an escaped URL up to the closing `)`; returns it with the
/// position of the `)` or the end of input.
fn read_url(bytes: &[u8], mut i: usize) -> (String, usize) {
    let mut url = Vec::new();
    while i < bytes.len() && bytes[i] != b')' {
        if is_escape(bytes, i) {
            url.push(bytes[i + 1]);
            i += 2;
            continue;
        }
        url.push(bytes[i]);
        i += 1;
    }
    (String::from_utf8_lossy(&url).into_owned(), i)
}

/// Parses MarkdownV2.
///
/// Every character of `_*[]()~`>#+-=|{}.!` outside of an entity delimiter
/// must be escaped with `\`. Inside code and pre blocks only `` ` `` and
/// `\` are special. Lines starting with `>` form a blockquote; a quote whose
/// last line ends with an empty `||` is expandable.
pub fn parse_markdown_v2(text: &mut String) -> Result<Vec<MessageEntity>> {
    let (plain, entities) = parse_markdown_v2_impl(text)?;
    *text = plain;
    Ok(entities)
}

fn parse_markdown_v2_impl(text: &str) -> Result<(String, Vec<MessageEntity>)> {
    use EntityType::*;

    let src = text.as_bytes();
    let size = src.len();
    let mut out: Vec<u8> = Vec::with_capacity(size);
    let mut entities = Vec::new();
    let mut utf16_offset = 0i32;
    let mut nested: Vec<OpenEntity> = Vec::new();

    let mut have_blockquote = false;
    let mut can_start_blockquote = true;

    let mut i = 0;
    while i < size {
        let c = src[i];
        if is_escape(src, i) {
            let escaped = src[i + 1];
            out.push(escaped);
            utf16_offset += 1;
            if escaped != b'\r' {
                can_start_blockquote = escaped == b'\n';
            }
            i += 2;
            continue;
        }

        let in_code = nested.last().is_some_and(|top| top.kind.is_pre());
        let reserved: &[u8] = if in_code { b"`" } else { RESERVED_CHARACTERS };
        if !reserved.contains(&c) {
            if is_first_byte(c) {
                utf16_offset += utf16_units(c);
                if c != b'\r' {
                    can_start_blockquote = false;
                }
            }
            out.push(c);
            i += 1;
            continue;
        }

        let is_end_of_entity = match nested.last() {
            None => false,
            Some(_) if have_blockquote && c == b'\n' && (i + 1 == size || src[i + 1] != b'>') => true,
            Some(top) => match top.kind {
                Bold => c == b'*',
                Italic => c == b'_' && at(src, i + 1) != b'_',
                Code => c == b'`',
                Pre | PreCode => c == b'`' && at(src, i + 1) == b'`' && at(src, i + 2) == b'`',
                TextUrl | CustomEmoji => c == b']',
                Underline => c == b'_' && at(src, i + 1) == b'_',
                Strikethrough => c == b'~',
                Spoiler => c == b'|' && at(src, i + 1) == b'|',
                _ => false,
            },
        };

        if !is_end_of_entity {
            let byte_offset = i;
            let mut argument = String::new();
            let kind = match c {
                b'_' if at(src, i + 1) == b'_' => {
                    i += 1;
                    Some(Underline)
                }
                b'_' => Some(Italic),
                b'*' => Some(Bold),
                b'~' => Some(Strikethrough),
                b'|' if at(src, i + 1) == b'|' => {
                    i += 1;
                    Some(Spoiler)
                }
                b'[' => Some(TextUrl),
                b'`' if at(src, i + 1) == b'`' && at(src, i + 2) == b'`' => {
                    i += 3;
                    let mut kind = Pre;
                    if let Some(language_end) = pre_language_end(src, i) {
                        kind = PreCode;
                        argument = text[i..language_end].to_string();
                        i = language_end;
                    }
                    i = skip_leading_newline(src, i) - 1;
                    Some(kind)
                }
                b'`' => Some(Code),
                b'!' if at(src, i + 1) == b'[' => {
                    i += 1;
                    Some(CustomEmoji)
                }
                b'\n' => {
                    utf16_offset += 1;
                    out.push(b'\n');
                    can_start_blockquote = true;
                    None
                }
                b'>' if can_start_blockquote => {
                    if have_blockquote {
                        None
                    } else {
                        have_blockquote = true;
                        Some(BlockQuote)
                    }
                }
                _ => return Err(reserved_error(c)),
            };
            if let Some(kind) = kind {
                nested.push(OpenEntity { kind, argument, offset: utf16_offset, byte_offset, begin_pos: out.len() });
            }
            i += 1;
            continue;
        }

        // end of an entity
        let Some(mut top) = nested.pop() else {
            return Err(reserved_error(c));
        };
        let mut kind = top.kind;
        if c == b'\n' && kind != BlockQuote {
            let is_expandable_mark = kind == Spoiler
                && (top.byte_offset + 2 == i || (top.byte_offset + 3 == i && out.last() == Some(&b'\r')));
            if !is_expandable_mark {
                return Err(unclosed_error(&top));
            }
            top = match nested.pop() {
                Some(quote) if quote.kind == BlockQuote => quote,
                Some(other) => return Err(unclosed_error(&other)),
                None => return Err(unclosed_error(&top)),
            };
            kind = ExpandableBlockQuote;
        }

        let mut user_id = UserId::default();
        let mut custom_emoji_id = CustomEmojiId::default();
        let mut skip_entity = utf16_offset == top.offset;
        match kind {
            Underline | Spoiler => i += 1,
            Pre | PreCode => i += 2,
            TextUrl => {
                let url = if at(src, i + 1) == b'(' {
                    let url_begin = i + 2;
                    let (url, url_end) = read_url(src, url_begin);
                    i = url_end;
                    if at(src, i) != b')' {
                        return Err(Error::parse(format!("Can't find end of a URL at byte offset {url_begin}")));
                    }
                    url
                } else {
                    String::from_utf8_lossy(&out[top.begin_pos..]).into_owned()
                };
                user_id = get_link_user_id(&url);
                if !user_id.is_valid() {
                    let url = get_checked_link(&url);
                    if url.is_empty() {
                        skip_entity = true;
                    } else {
                        top.argument = url;
                    }
                }
            }
            CustomEmoji => {
                if at(src, i + 1) != b'(' {
                    return Err(Error::parse("Custom emoji entity must contain a tg://emoji URL"));
                }
                let url_begin = i + 2;
                let (url, url_end) = read_url(src, url_begin);
                i = url_end;
                if at(src, i) != b')' {
                    return Err(Error::parse(format!(
                        "Can't find end of a custom emoji URL at byte offset {url_begin}"
                    )));
                }
                custom_emoji_id = get_link_custom_emoji_id(&url)?;
            }
            BlockQuote | ExpandableBlockQuote => {
                have_blockquote = false;
                out.push(c);
                can_start_blockquote = true;
                utf16_offset += 1;
                skip_entity = false;
            }
            _ => {}
        }

        if !skip_entity {
            let length = utf16_offset - top.offset;
            entities.push(if user_id.is_valid() {
                MessageEntity::mention_name(top.offset, length, user_id)
            } else if custom_emoji_id.is_valid() {
                MessageEntity::custom_emoji(top.offset, length, custom_emoji_id)
            } else {
                MessageEntity::with_argument(kind, top.offset, length, top.argument)
            });
        }
        i += 1;
    }

    if have_blockquote {
        let mut kind = BlockQuote;
        if nested.last().is_some_and(|top| top.kind == Spoiler && top.byte_offset + 2 == size) {
            nested.pop();
            kind = ExpandableBlockQuote;
        }
        if nested.last().is_some_and(|top| top.kind == BlockQuote) {
            if let Some(quote) = nested.pop() {
                let length = utf16_offset - quote.offset;
                if length != 0 {
                    entities.push(MessageEntity::new(kind, quote.offset, length));
                }
            }
        }
    }
    if let Some(top) = nested.last() {
        return Err(unclosed_error(top));
    }

    sort_entities(&mut entities);
    Ok((into_text(out)?, entities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use EntityType::*;

    fn v1(text: &str) -> (String, Vec<MessageEntity>) {
        let mut text = text.to_string();
        let entities = parse_markdown(&mut text).unwrap();
        (text, entities)
    }

    fn v2(text: &str) -> (String, Vec<MessageEntity>) {
        let mut text = text.to_string();
        let entities = parse_markdown_v2(&mut text).unwrap();
        (text, entities)
    }

    fn v2_error(text: &str) -> String {
        let mut text = text.to_string();
        parse_markdown_v2(&mut text).unwrap_err().to_string()
    }

    #[test]
    fn legacy_basics() {
        assert_eq!(v1("_a_ *b* `c`"), ("a b c".into(), vec![
            MessageEntity::new(Italic, 0, 1),
            MessageEntity::new(Bold, 2, 1),
            MessageEntity::new(Code, 4, 1),
        ]));
        assert_eq!(v1("\\_a\\*"), ("_a*".into(), vec![]));
        assert_eq!(v1("__"), ("".into(), vec![]));
        assert_eq!(v1("```rust\nfn```"), ("fn".into(), vec![MessageEntity::with_argument(PreCode, 0, 2, "rust")]));
        assert_eq!(v1("```\r\nx```"), ("x".into(), vec![MessageEntity::new(Pre, 0, 1)]));
    }

    #[test]
    fn legacy_links() {
        assert_eq!(v1("[telegram.org]"), ("telegram.org".into(), vec![
            MessageEntity::with_argument(TextUrl, 0, 12, "http://telegram.org/")
        ]));
        assert_eq!(v1("[a](tg://user?id=42)"), ("a".into(), vec![MessageEntity::mention_name(0, 1, UserId(42))]));
        assert_eq!(v1("[a](as)"), ("a".into(), vec![]));
    }

    #[test]
    fn legacy_errors() {
        let mut text = "🏟 🏟_abacaba".to_string();
        assert_eq!(
            parse_markdown(&mut text).unwrap_err().to_string(),
            "Can't find end of the entity starting at byte offset 9"
        );
        assert_eq!(text, "🏟 🏟_abacaba");
    }

    #[test]
    fn v2_scenario() {
        let (text, entities) = v2("*bold* __under__ ~strike~ ||spoiler||");
        assert_eq!(text, "bold under strike spoiler");
        assert_eq!(entities, [
            MessageEntity::new(Bold, 0, 4),
            MessageEntity::new(Underline, 5, 5),
            MessageEntity::new(Strikethrough, 11, 6),
            MessageEntity::new(Spoiler, 18, 7),
        ]);
    }

    #[test]
    fn v2_errors() {
        assert_eq!(v2_error("🏟 🏟_abacaba"), "Can't find end of Italic entity at byte offset 9");
        assert_eq!(v2_error("a.b"), "Character '.' is reserved and must be escaped with the preceding '\\'");
        assert_eq!(v2_error("[telegram\\.org](asd"), "Can't find end of a URL at byte offset 16");
        assert_eq!(v2_error("a|b"), "Character '|' is reserved and must be escaped with the preceding '\\'");
        assert_eq!(v2_error("![👍](tg://emoji?id=0)"), "Invalid custom emoji identifier specified");
        assert_eq!(v2_error("![👍]"), "Custom emoji entity must contain a tg://emoji URL");
        assert_eq!(v2_error("a > b"), "Character '>' is reserved and must be escaped with the preceding '\\'");
    }

    #[test]
    fn v2_links_and_emoji() {
        assert_eq!(v2("[telegram\\.org]"), ("telegram.org".into(), vec![
            MessageEntity::with_argument(TextUrl, 0, 12, "http://telegram.org/")
        ]));
        assert_eq!(v2("[a](https://t\\.me/)"), ("a".into(), vec![
            MessageEntity::with_argument(TextUrl, 0, 1, "https://t.me/")
        ]));
        assert_eq!(v2("![👍](tg://emoji?id=12345)"), ("👍".into(), vec![
            MessageEntity::custom_emoji(0, 2, CustomEmojiId(12345))
        ]));
        assert_eq!(v2("||test||"), ("test".into(), vec![MessageEntity::new(Spoiler, 0, 4)]));
    }

    #[test]
    fn v2_code_keeps_reserved() {
        assert_eq!(v2("`a.b_c`"), ("a.b_c".into(), vec![MessageEntity::new(Code, 0, 5)]));
        assert_eq!(v2("```py\nx = 1```"), ("x = 1".into(), vec![
            MessageEntity::with_argument(PreCode, 0, 5, "py")
        ]));
    }

    #[test]
    fn v2_blockquotes() {
        assert_eq!(v2("> \n> \n>"), (" \n \n".into(), vec![MessageEntity::new(BlockQuote, 0, 4)]));
        assert_eq!(v2(">a\n>b\nc"), ("a\nb\nc".into(), vec![MessageEntity::new(BlockQuote, 0, 4)]));
        assert_eq!(v2(">asd\n>q||e||w||\nasdad"), ("asd\nqew\nasdad".into(), vec![
            MessageEntity::new(ExpandableBlockQuote, 0, 8),
            MessageEntity::new(Spoiler, 5, 1),
        ]));
        assert_eq!(v2(">a||"), ("a".into(), vec![MessageEntity::new(ExpandableBlockQuote, 0, 1)]));
    }
}
