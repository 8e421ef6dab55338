//! Control-character stripping and invisible-character cleanup.
//!
//! Cleaning never changes visible text: C0 controls become plain spaces,
//! carriage returns disappear, and a handful of invisible code points that
//! are used to spoof text direction or draw vertical bars are removed.

use crate::entity::MessageEntity;
use crate::errors::{Error, Result};
use crate::limits::MAX_TEXT_LENGTH;
use crate::unicode::is_first_byte;

fn at(bytes: &[u8], i: usize) -> u8 {
    bytes.get(i).copied().unwrap_or(0)
}

/// Length of an invisible sequence starting at `pos` that must be dropped.
///
/// U+2028..U+202E (line/paragraph separators and direction overrides) and
/// the combining vertical lines U+0333, U+033F and U+030A.
fn removed_sequence_len(bytes: &[u8], pos: usize) -> Option<usize> {
    match bytes[pos] {
        0xe2 if pos + 2 < bytes.len()
            && bytes[pos + 1] == 0x80
            && (0xa8..=0xae).contains(&bytes[pos + 2]) =>
        {
            Some(3)
        }
        0xcc if pos + 1 < bytes.len() && matches!(bytes[pos + 1], 0xb3 | 0xbf | 0x8a) => Some(2),
        _ => None,
    }
}

fn is_direction_mark(bytes: &[u8], pos: usize) -> bool {
    at(bytes, pos) == 0xe2 && at(bytes, pos + 1) == 0x80 && matches!(at(bytes, pos + 2), 0x8e | 0x8f)
}

/// In every run of LRM/RLM marks all but the last one become ZWNJ.
pub fn replace_offending_characters(bytes: &mut [u8]) {
    let mut pos = 0;
    while pos < bytes.len() {
        if is_direction_mark(bytes, pos) {
            while is_direction_mark(bytes, pos + 3) {
                bytes[pos + 2] = 0x8c;
                pos += 3;
            }
            pos += 2;
        }
        pos += 1;
    }
}

/// Cleans text that carries no entities.
///
/// The output is cut at a character boundary a few bytes below
/// [`MAX_TEXT_LENGTH`].
pub fn clean_input_string(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;

    let mut result = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let c = bytes[pos];
        match c {
            b'\r' => {}
            0..=9 | 11 | 12 | 14..=32 => result.push(b' '),
            _ => {
                if let Some(skip) = removed_sequence_len(bytes, pos) {
                    pos += skip;
                    continue;
                }
                result.push(c);
            }
        }
        pos += 1;
        if result.len() >= MAX_TEXT_LENGTH - 3 && result.last().is_some_and(|&b| is_first_byte(b)) {
            result.pop();
            break;
        }
    }

    replace_offending_characters(&mut result);
    String::from_utf8(result).map_err(|_| Error::InvalidUtf8)
}

/// Cleans `text` and moves the sorted `entities` along with the removed
/// characters.
///
/// An entity whose boundary does not fall on a character boundary of the
/// source text, or that reaches past its end, is an error.
pub(crate) fn clean_input_string_with_entities(text: &str, entities: &mut [MessageEntity]) -> Result<String> {
    let bytes = text.as_bytes();
    let len = bytes.len();

    // (index into entities, UTF-16 units removed before the entity started)
    let mut open: Vec<(usize, i32)> = Vec::new();
    let mut next_entity = 0;

    let mut utf16_offset = 0i32;
    let mut utf16_skipped = 0i32;

    let mut result = Vec::with_capacity(len);
    let mut pos = 0;
    loop {
        let c = at(bytes, pos);
        let is_begin = is_first_byte(c);
        if is_begin {
            while let Some(&(index, skipped_before)) = open.last() {
                let entity = &mut entities[index];
                let entity_end = entity.end();
                if utf16_offset < entity_end {
                    break;
                }
                if utf16_offset != entity_end {
                    return Err(Error::SplitSymbol { offset: entity.offset, byte: pos, at_end: true });
                }
                entity.offset -= skipped_before;
                entity.length -= utf16_skipped - skipped_before;
                open.pop();
            }
            while next_entity < entities.len() && utf16_offset >= entities[next_entity].offset {
                if utf16_offset != entities[next_entity].offset {
                    return Err(Error::SplitSymbol {
                        offset: entities[next_entity].offset,
                        byte: pos,
                        at_end: false,
                    });
                }
                open.push((next_entity, utf16_skipped));
                next_entity += 1;
            }
        }
        if pos == len {
            break;
        }

        match c {
            b'\r' => {
                utf16_offset += 1;
                utf16_skipped += 1;
            }
            0..=9 | 11 | 12 | 14..=32 => {
                result.push(b' ');
                utf16_offset += 1;
            }
            _ => {
                if is_begin {
                    utf16_offset += 1 + i32::from(c >= 0xf0);
                }
                if let Some(skip) = removed_sequence_len(bytes, pos) {
                    pos += skip;
                    utf16_skipped += 1;
                    continue;
                }
                result.push(c);
            }
        }
        pos += 1;
    }

    if let Some(entity) = entities.get(next_entity) {
        return Err(Error::OutOfText { offset: entity.offset, end: None });
    }
    if let Some(&(index, _)) = open.last() {
        let entity = &entities[index];
        return Err(Error::OutOfText { offset: entity.offset, end: Some(entity.end()) });
    }

    replace_offending_characters(&mut result);
    String::from_utf8(result).map_err(|_| Error::InvalidUtf8)
}

const SPACE_CHARACTERS: &[char] = &[
    '\u{1680}', '\u{180E}', '\u{2000}', '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}', '\u{2005}',
    '\u{2006}', '\u{2007}', '\u{2008}', '\u{2009}', '\u{200A}', '\u{202F}', '\u{205F}', '\u{2800}',
    '\u{3000}', '\u{FFFC}',
];

fn is_td_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\0' | '\x0b')
}

fn is_invisible(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\u{200B}'..='\u{200F}' | '\u{202E}' | '\u{FEFF}' | '\u{A0}')
}

/// True if `text` shows nothing: it consists only of spaces, space-like
/// characters, zero-width characters, tag characters and direction marks.
pub fn is_empty_string(text: &str) -> bool {
    let spaced: String = text
        .chars()
        .map(|c| {
            if SPACE_CHARACTERS.contains(&c) || ('\u{E0000}'..='\u{E007F}').contains(&c) {
                ' '
            } else {
                c
            }
        })
        .collect();
    spaced.trim_matches(is_td_space).chars().all(is_invisible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;

    #[test]
    fn controls_become_spaces() {
        assert_eq!(clean_input_string(b"a\tb\x01c\r\nd").unwrap(), "a b c\nd");
        assert_eq!(clean_input_string("x\u{2028}y\u{202E}z".as_bytes()).unwrap(), "xyz");
        assert_eq!(clean_input_string("a\u{0333}b".as_bytes()).unwrap(), "ab");
        assert_eq!(clean_input_string(b"\xff"), Err(Error::InvalidUtf8));
    }

    #[test]
    fn direction_marks() {
        let cleaned = clean_input_string("\u{200E}\u{200F}\u{200E}a\u{200F}".as_bytes()).unwrap();
        assert_eq!(cleaned, "\u{200C}\u{200C}\u{200E}a\u{200F}");
    }

    #[test]
    fn long_text_is_cut() {
        let text = "a".repeat(MAX_TEXT_LENGTH + 10);
        assert_eq!(clean_input_string(text.as_bytes()).unwrap().len(), MAX_TEXT_LENGTH - 4);
    }

    #[test]
    fn entities_follow_removed_characters() {
        let mut entities = vec![
            MessageEntity::new(EntityType::Bold, 0, 5),
            MessageEntity::new(EntityType::Italic, 3, 2),
        ];
        let text = clean_input_string_with_entities("a\rb\rcd", &mut entities).unwrap();
        assert_eq!(text, "abcd");
        assert_eq!(entities[0], MessageEntity::new(EntityType::Bold, 0, 3));
        assert_eq!(entities[1], MessageEntity::new(EntityType::Italic, 2, 1));
    }

    #[test]
    fn entity_boundaries_are_checked() {
        let mut split = vec![MessageEntity::new(EntityType::Bold, 1, 1)];
        assert_eq!(
            clean_input_string_with_entities("😀", &mut split).unwrap_err().to_string(),
            "Entity begins in a middle of a UTF-16 symbol at byte offset 4"
        );
        let mut past = vec![MessageEntity::new(EntityType::Bold, 0, 5)];
        assert_eq!(
            clean_input_string_with_entities("abc", &mut past).unwrap_err().to_string(),
            "Entity beginning at UTF-16 offset 0 ends after the end of the text at UTF-16 offset 5"
        );
        let mut after = vec![MessageEntity::new(EntityType::Bold, 4, 1)];
        assert_eq!(
            clean_input_string_with_entities("abc", &mut after).unwrap_err(),
            Error::OutOfText { offset: 4, end: None }
        );
    }

    #[test]
    fn empty_strings() {
        assert!(is_empty_string(""));
        assert!(is_empty_string(" \n\u{200B}\u{A0}\u{2003}\u{FEFF}"));
        assert!(is_empty_string("\u{E0001}"));
        assert!(!is_empty_string(" a "));
    }
}
