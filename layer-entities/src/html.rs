//! The HTML subset accepted for message formatting.

use crate::entity::{CustomEmojiId, EntityType, MessageEntity, sort_entities};
use crate::errors::{Error, Result};
use crate::links::{get_checked_link, get_link_user_id, to_integer_safe};
use crate::unicode::{is_first_byte, is_space};

const SUPPORTED_TAGS: &[&str] = &[
    "a", "b", "strong", "i", "em", "s", "strike", "del", "u", "ins", "tg-spoiler", "tg-emoji", "span", "pre", "code",
    "blockquote",
];

fn at(bytes: &[u8], i: usize) -> u8 {
    bytes.get(i).copied().unwrap_or(0)
}

/// Decodes the character reference starting at the `&` at `pos`.
///
/// Supports `&#N;`, `&#xH;` and the four named references `lt`, `gt`,
/// `amp` and `quot`; the trailing `;` is optional. Returns the code point
/// and the position after the reference.
fn decode_html_entity(bytes: &[u8], pos: usize) -> Option<(u32, usize)> {
    let mut end = pos + 1;
    let code = if at(bytes, end) == b'#' {
        end += 1;
        let mut code = 0u32;
        if at(bytes, end) == b'x' {
            end += 1;
            while let Some(digit) = char::from(at(bytes, end)).to_digit(16) {
                code = code.wrapping_mul(16).wrapping_add(digit);
                end += 1;
            }
        } else {
            while at(bytes, end).is_ascii_digit() {
                code = code.wrapping_mul(10).wrapping_add(u32::from(at(bytes, end) - b'0'));
                end += 1;
            }
        }
        if code == 0 || code >= 0x10ffff || end - pos >= 10 {
            return None;
        }
        code
    } else {
        while at(bytes, end).is_ascii_alphabetic() {
            end += 1;
        }
        match &bytes[pos + 1..end] {
            b"lt" => u32::from(b'<'),
            b"gt" => u32::from(b'>'),
            b"amp" => u32::from(b'&'),
            b"quot" => u32::from(b'"'),
            _ => return None,
        }
    };
    if at(bytes, end) == b';' {
        end += 1;
    }
    Some((code, end))
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

struct OpenTag {
    name:      String,
    argument:  String,
    /// UTF-16 offset of the contents in the output.
    offset:    i32,
    /// Byte offset of the contents in the output.
    begin_pos: usize,
}

/// Replaces `text` with the plain text of the HTML it contains and returns
/// the entities.
///
/// Supported tags are `b`/`strong`, `i`/`em`, `u`/`ins`,
/// `s`/`strike`/`del`, `tg-spoiler` or `span class="tg-spoiler"`,
/// `a href`, `tg-emoji emoji-id`, `code`, `pre`, `pre` with a nested
/// `code class="language-…"`, and `blockquote` with an optional
/// `expandable` attribute. On error `text` is left untouched.
pub fn parse_html(text: &mut String) -> Result<Vec<MessageEntity>> {
    let (plain, entities) = parse_html_impl(text)?;
    *text = plain;
    Ok(entities)
}

fn parse_html_impl(text: &str) -> Result<(String, Vec<MessageEntity>)> {
    let src = text.as_bytes();
    let size = src.len();
    let mut out: Vec<u8> = Vec::with_capacity(size);
    let mut entities: Vec<MessageEntity> = Vec::new();
    let mut nested: Vec<OpenTag> = Vec::new();
    let mut utf16_offset = 0i32;
    let mut has_surrogate = false;

    let mut i = 0;
    while i < size {
        let c = src[i];
        if c == b'&' {
            if let Some((code, end)) = decode_html_entity(src, i) {
                i = end;
                utf16_offset += 1 + i32::from(code > 0xffff);
                match char::from_u32(code) {
                    Some(decoded) => push_char(&mut out, decoded),
                    // half of a surrogate pair
                    None => has_surrogate = true,
                }
                continue;
            }
        }
        if c != b'<' {
            if is_first_byte(c) {
                utf16_offset += 1 + i32::from(c >= 0xf0);
            }
            out.push(c);
            i += 1;
            continue;
        }

        let begin_pos = i;
        i += 1;
        if at(src, i) != b'/' {
            while !is_space(at(src, i)) && at(src, i) != b'>' {
                i += 1;
            }
            if at(src, i) == 0 {
                return Err(Error::parse(format!("Unclosed start tag at byte offset {begin_pos}")));
            }

            let tag_name = text[begin_pos + 1..i].to_ascii_lowercase();
            if !SUPPORTED_TAGS.contains(&tag_name.as_str()) {
                return Err(Error::parse(format!(
                    "Unsupported start tag \"{tag_name}\" at byte offset {begin_pos}"
                )));
            }

            let mut argument = String::new();
            while at(src, i) != b'>' {
                while at(src, i) != 0 && is_space(at(src, i)) {
                    i += 1;
                }
                if at(src, i) == b'>' {
                    break;
                }
                let attribute_begin = i;
                while !is_space(at(src, i)) && !matches!(at(src, i), b'=' | b'>' | b'/' | b'"' | b'\'') {
                    i += 1;
                }
                let attribute_name = &text[attribute_begin..i];
                if attribute_name.is_empty() {
                    return Err(Error::parse(format!(
                        "Empty attribute name in the tag \"{tag_name}\" at byte offset {begin_pos}"
                    )));
                }
                while at(src, i) != 0 && is_space(at(src, i)) {
                    i += 1;
                }
                if at(src, i) != b'=' {
                    if at(src, i) == 0 {
                        return Err(Error::parse(format!(
                            "Unclosed start tag \"{tag_name}\" at byte offset {begin_pos}"
                        )));
                    }
                    if tag_name == "blockquote" && attribute_name == "expandable" {
                        argument = "1".into();
                    }
                    continue;
                }
                i += 1;
                while at(src, i) != 0 && is_space(at(src, i)) {
                    i += 1;
                }
                if at(src, i) == 0 {
                    return Err(Error::parse(format!(
                        "Unclosed start tag \"{tag_name}\" at byte offset {begin_pos}"
                    )));
                }

                let attribute_value = if at(src, i) != b'\'' && at(src, i) != b'"' {
                    // a name token, case-insensitive
                    let token_begin = i;
                    while at(src, i).is_ascii_alphanumeric() || matches!(at(src, i), b'.' | b'-') {
                        i += 1;
                    }
                    if !is_space(at(src, i)) && at(src, i) != b'>' {
                        return Err(Error::parse(format!(
                            "Unexpected end of name token at byte offset {token_begin}"
                        )));
                    }
                    text[token_begin..i].to_ascii_lowercase()
                } else {
                    let end_character = src[i];
                    i += 1;
                    let mut value = Vec::new();
                    while at(src, i) != end_character && at(src, i) != 0 {
                        if src[i] == b'&' {
                            if let Some((decoded, end)) =
                                decode_html_entity(src, i).and_then(|(code, end)| Some((char::from_u32(code)?, end)))
                            {
                                push_char(&mut value, decoded);
                                i = end;
                                continue;
                            }
                        }
                        value.push(src[i]);
                        i += 1;
                    }
                    if at(src, i) == end_character {
                        i += 1;
                    }
                    String::from_utf8(value).map_err(|_| Error::InvalidUtf8)?
                };
                if at(src, i) == 0 {
                    return Err(Error::parse(format!("Unclosed start tag at byte offset {begin_pos}")));
                }

                match (tag_name.as_str(), attribute_name) {
                    ("a", "href") | ("tg-emoji", "emoji-id") => argument = attribute_value,
                    ("code", "class") if attribute_value.starts_with("language-") => {
                        argument = attribute_value["language-".len()..].to_string();
                    }
                    ("span", "class") if attribute_value.starts_with("tg-") => {
                        argument = attribute_value["tg-".len()..].to_string();
                    }
                    ("blockquote", "expandable") => argument = "1".into(),
                    _ => {}
                }
            }

            if tag_name == "span" && argument != "spoiler" {
                return Err(Error::parse(format!(
                    "Tag \"span\" must have class \"tg-spoiler\" at byte offset {begin_pos}"
                )));
            }
            nested.push(OpenTag { name: tag_name, argument, offset: utf16_offset, begin_pos: out.len() });
            i += 1;
            continue;
        }

        // end tag
        let Some(open) = nested.pop() else {
            return Err(Error::parse(format!("Unexpected end tag at byte offset {begin_pos}")));
        };
        while !is_space(at(src, i)) && at(src, i) != b'>' {
            i += 1;
        }
        let end_tag_name = text[begin_pos + 2..i].to_ascii_lowercase();
        while is_space(at(src, i)) && at(src, i) != 0 {
            i += 1;
        }
        if at(src, i) != b'>' {
            return Err(Error::parse(format!("Unclosed end tag at byte offset {begin_pos}")));
        }
        if !end_tag_name.is_empty() && end_tag_name != open.name {
            return Err(Error::parse(format!(
                "Unmatched end tag at byte offset {begin_pos}, expected \"</{}>\", found \"</{end_tag_name}>\"",
                open.name
            )));
        }

        if utf16_offset > open.offset {
            close_tag(open, utf16_offset, &out, &mut entities)?;
        }
        i += 1;
    }

    if let Some(open) = nested.last() {
        return Err(Error::parse(format!(
            "Can't find end tag corresponding to start tag \"{}\"",
            open.name
        )));
    }

    for entity in &mut entities {
        if entity.kind == EntityType::Code {
            entity.argument.clear();
        }
    }
    sort_entities(&mut entities);

    if has_surrogate {
        return Err(Error::parse(
            "Text contains invalid Unicode characters after decoding HTML entities, check for unmatched surrogate code units",
        ));
    }
    let plain = String::from_utf8(out).map_err(|_| Error::InvalidUtf8)?;
    Ok((plain, entities))
}

/// Emits the entity for a non-empty closed tag.
fn close_tag(open: OpenTag, utf16_offset: i32, out: &[u8], entities: &mut Vec<MessageEntity>) -> Result<()> {
    let offset = open.offset;
    let length = utf16_offset - offset;
    let simple = |kind| MessageEntity::new(kind, offset, length);
    let same_span =
        |entity: &MessageEntity, kind: EntityType| entity.kind == kind && entity.offset == offset && entity.length == length;

    match open.name.as_str() {
        "i" | "em" => entities.push(simple(EntityType::Italic)),
        "b" | "strong" => entities.push(simple(EntityType::Bold)),
        "s" | "strike" | "del" => entities.push(simple(EntityType::Strikethrough)),
        "u" | "ins" => entities.push(simple(EntityType::Underline)),
        "tg-spoiler" | "span" => entities.push(simple(EntityType::Spoiler)),
        "tg-emoji" => {
            let id = to_integer_safe(&open.argument)
                .filter(|&id| id != 0)
                .ok_or_else(|| Error::parse("Invalid custom emoji identifier specified"))?;
            entities.push(MessageEntity::custom_emoji(offset, length, CustomEmojiId(id)));
        }
        "a" => {
            let url = if open.argument.is_empty() {
                String::from_utf8_lossy(&out[open.begin_pos..]).into_owned()
            } else {
                open.argument
            };
            let user_id = get_link_user_id(&url);
            if user_id.is_valid() {
                entities.push(MessageEntity::mention_name(offset, length, user_id));
            } else {
                let url = get_checked_link(&url);
                if !url.is_empty() {
                    entities.push(MessageEntity::with_argument(EntityType::TextUrl, offset, length, url));
                }
            }
        }
        "pre" => match entities.last_mut() {
            Some(code) if same_span(&*code, EntityType::Code) && !code.argument.is_empty() => {
                code.kind = EntityType::PreCode;
            }
            _ => entities.push(simple(EntityType::Pre)),
        },
        "code" => match entities.last_mut() {
            Some(pre) if same_span(&*pre, EntityType::Pre) && !open.argument.is_empty() => {
                pre.kind = EntityType::PreCode;
                pre.argument = open.argument;
            }
            // the language survives only if an enclosing pre claims it
            _ => entities.push(MessageEntity::with_argument(EntityType::Code, offset, length, open.argument)),
        },
        "blockquote" if !open.argument.is_empty() => entities.push(simple(EntityType::ExpandableBlockQuote)),
        _ => entities.push(simple(EntityType::BlockQuote)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use EntityType::*;

    fn parse(text: &str) -> (String, Vec<MessageEntity>) {
        let mut text = text.to_string();
        let entities = parse_html(&mut text).unwrap();
        (text, entities)
    }

    fn error(text: &str) -> String {
        let mut text = text.to_string();
        parse_html(&mut text).unwrap_err().to_string()
    }

    #[test]
    fn character_references() {
        assert_eq!(
            parse("&ge;&lt;&gt;&amp;&quot;&laquo;&raquo;&#12345678;").0,
            "&ge;<>&\"&laquo;&raquo;&#12345678;"
        );
        assert_eq!(parse("&Or;").0, "&Or;");
        assert_eq!(parse("&#x41;&#66&#0;").0, "AB&#0;");
        assert_eq!(parse("&#x1F600;x").0, "😀x");
    }

    #[test]
    fn surrogates_are_rejected() {
        let message =
            "Text contains invalid Unicode characters after decoding HTML entities, check for unmatched surrogate code units";
        assert_eq!(error("&#57311;"), message);
        assert_eq!(error("&#xDFDF;"), message);
        assert_eq!(error("&#xDFDF"), message);
    }

    #[test]
    fn tag_errors() {
        assert_eq!(error("🏟 🏟&lt;<abacaba"), "Unclosed start tag at byte offset 13");
        assert_eq!(error("🏟 🏟&lt;<abac aba>"), "Unsupported start tag \"abac\" at byte offset 13");
        assert_eq!(error("🏟 🏟&lt;<i   =aba>"), "Empty attribute name in the tag \"i\" at byte offset 13");
        assert_eq!(error("🏟 🏟&lt;<i    aba>"), "Can't find end tag corresponding to start tag \"i\"");
        assert_eq!(error("🏟 🏟&lt;<i    aba  =  "), "Unclosed start tag \"i\" at byte offset 13");
        assert_eq!(error("🏟 🏟&lt;<i    aba  =  190azAz-.,"), "Unexpected end of name token at byte offset 27");
        assert_eq!(error("🏟 🏟&lt;<i    aba  =  \"&lt;&gt;&quot;>"), "Unclosed start tag at byte offset 13");
        assert_eq!(error("🏟 🏟&lt;</"), "Unexpected end tag at byte offset 13");
        assert_eq!(error("🏟 🏟&lt;<b></b></"), "Unexpected end tag at byte offset 20");
        assert_eq!(error("🏟 🏟&lt;<i>a</i   "), "Unclosed end tag at byte offset 17");
        assert_eq!(
            error("🏟 🏟&lt;<i>a</em   >"),
            "Unmatched end tag at byte offset 17, expected \"</i>\", found \"</em>\""
        );
        assert_eq!(error("<span>a</span>"), "Tag \"span\" must have class \"tg-spoiler\" at byte offset 0");
        assert_eq!(error("<tg-emoji emoji-id=\"0\">a</tg-emoji>"), "Invalid custom emoji identifier specified");
    }

    #[test]
    fn formatting_tags() {
        assert_eq!(parse("➡️ ➡️<i>➡️ ➡️</i>"), ("➡️ ➡️➡️ ➡️".into(), vec![MessageEntity::new(Italic, 5, 5)]));
        assert_eq!(parse("🏟 🏟<i>🏟 &lt🏟</i>"), ("🏟 🏟🏟 <🏟".into(), vec![MessageEntity::new(Italic, 5, 6)]));
        assert_eq!(parse("🏟 🏟&lt;<i>a</    >"), ("🏟 🏟<a".into(), vec![MessageEntity::new(Italic, 6, 1)]));
        assert_eq!(parse("🏟 🏟&lt;<b></b>"), ("🏟 🏟<".into(), vec![]));
        assert_eq!(parse("<i><b> </b> <code> </code></i>"), ("   ".into(), vec![
            MessageEntity::new(Italic, 0, 3),
            MessageEntity::new(Bold, 0, 1),
            MessageEntity::new(Code, 2, 1),
        ]));
        assert_eq!(parse("<span class = \"tg-spoiler\">a</span>"), ("a".into(), vec![MessageEntity::new(Spoiler, 0, 1)]));
    }

    #[test]
    fn links_and_emoji() {
        let text_url = |length| MessageEntity::with_argument(TextUrl, 0, length, "http://telegram.org/");
        assert_eq!(parse("<a href=telegram.org>\t</a>"), ("\t".into(), vec![text_url(1)]));
        assert_eq!(parse("<a   href=  'telegram.org?&lt;'   > </a>"), (" ".into(), vec![
            MessageEntity::with_argument(TextUrl, 0, 1, "http://telegram.org/?<")
        ]));
        assert_eq!(parse("<a> </a>"), (" ".into(), vec![]));
        assert_eq!(parse("<a>telegram.org </a>"), ("telegram.org ".into(), vec![]));
        assert_eq!(parse("<a>telegram.org</a>"), ("telegram.org".into(), vec![text_url(12)]));
        assert_eq!(parse("<a href=\"tg://user?id=5\">x</a>"), ("x".into(), vec![
            MessageEntity::mention_name(0, 1, crate::entity::UserId(5))
        ]));
        assert_eq!(parse("🏟 🏟<b aba   =   caba><tg-emoji emoji-id=\"1\">🏟</tg-emoji>1</b>"), ("🏟 🏟🏟1".into(), vec![
            MessageEntity::new(Bold, 5, 3),
            MessageEntity::custom_emoji(5, 2, CustomEmojiId(1)),
        ]));
    }

    #[test]
    fn pre_and_code() {
        assert_eq!(parse("🏟 🏟&lt;<pre><code>🏟 🏟&lt;</code></>"), ("🏟 🏟<🏟 🏟<".into(), vec![
            MessageEntity::new(Pre, 6, 6),
            MessageEntity::new(Code, 6, 6),
        ]));
        assert_eq!(parse("🏟 🏟&lt;<pre><code class=\"language-fift\">🏟 🏟&lt;</></>"), ("🏟 🏟<🏟 🏟<".into(), vec![
            MessageEntity::with_argument(PreCode, 6, 6, "fift")
        ]));
        assert_eq!(parse("🏟 🏟&lt;<code class=\"language-fift\"><pre>🏟 🏟&lt;</></>"), ("🏟 🏟<🏟 🏟<".into(), vec![
            MessageEntity::with_argument(PreCode, 6, 6, "fift")
        ]));
        assert_eq!(parse("🏟 🏟&lt;<pre> <code class=\"language-fift\">🏟 🏟&lt;</></>"), ("🏟 🏟< 🏟 🏟<".into(), vec![
            MessageEntity::new(Pre, 6, 7),
            MessageEntity::new(Code, 7, 6),
        ]));
    }

    #[test]
    fn blockquotes() {
        assert_eq!(parse("<blockquote   cite=\"\" askdlbas nasjdbaj nj12b3>a&lt;<pre  >b;</></>"), ("a<b;".into(), vec![
            MessageEntity::new(BlockQuote, 0, 4),
            MessageEntity::new(Pre, 2, 2),
        ]));
        assert_eq!(parse("<blockquote   expandable=false>a&lt;<pre  >b;</></>"), ("a<b;".into(), vec![
            MessageEntity::new(ExpandableBlockQuote, 0, 4),
            MessageEntity::new(Pre, 2, 2),
        ]));
    }
}
