//! UTF-8 / UTF-16 helpers and a coarse Unicode classifier.
//!
//! The scanners work on raw bytes of text that is already known to be valid
//! UTF-8, so decoding never fails; out-of-range positions decode as `0`.

// ─── Categories ───────────────────────────────────────────────────────────────

/// The five-way classification the matchers need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Category {
    Unknown,
    Letter,
    DecimalNumber,
    Number,
    Separator,
}

/// Code points of the `0` digit of every decimal digit block outside ASCII.
const DECIMAL_ZEROS: &[u32] = &[
    0x0660, 0x06f0, 0x07c0, 0x0966, 0x09e6, 0x0a66, 0x0ae6, 0x0b66, 0x0be6, 0x0c66, 0x0ce6,
    0x0d66, 0x0de6, 0x0e50, 0x0ed0, 0x0f20, 0x1040, 0x1090, 0x17e0, 0x1810, 0x1946, 0x19d0,
    0x1a80, 0x1a90, 0x1b50, 0x1bb0, 0x1c40, 0x1c50, 0xa620, 0xa8d0, 0xa900, 0xa9d0, 0xa9f0,
    0xaa50, 0xabf0, 0xff10, 0x104a0, 0x10d30, 0x11066, 0x110f0, 0x11136, 0x111d0, 0x112f0,
    0x11450, 0x114d0, 0x11650, 0x116c0, 0x11730, 0x118e0, 0x11950, 0x11c50, 0x11d50, 0x11da0,
    0x16a60, 0x16ac0, 0x16b50, 0x1e140, 0x1e2f0, 0x1e950, 0x1fbf0,
];

fn is_decimal_digit(code: u32) -> bool {
    if (u32::from(b'0')..=u32::from(b'9')).contains(&code) || (0x1d7ce..=0x1d7ff).contains(&code) {
        return true;
    }
    DECIMAL_ZEROS.iter().any(|&zero| zero <= code && code < zero + 10)
}

pub(crate) fn category(code: u32) -> Category {
    let Some(c) = char::from_u32(code) else {
        return Category::Unknown;
    };
    if c.is_alphabetic() {
        Category::Letter
    } else if c.is_numeric() {
        if is_decimal_digit(code) { Category::DecimalNumber } else { Category::Number }
    } else if c.is_whitespace() && !c.is_control() {
        Category::Separator
    } else {
        Category::Unknown
    }
}

/// Letters, digits and `_`.
pub(crate) fn is_word_character(code: u32) -> bool {
    match category(code) {
        Category::Letter | Category::DecimalNumber | Category::Number => true,
        _ => code == u32::from(b'_'),
    }
}

/// Characters allowed inside hashtags and next to cashtags, with the
/// category of `code` for callers that need to know about letters.
pub(crate) fn hashtag_letter(code: u32) -> (bool, Category) {
    let cat = category(code);
    if code == u32::from(b'_') || code == 0x200c || code == 0xb7 || (0xd80..=0xdff).contains(&code) {
        return (true, cat);
    }
    (matches!(cat, Category::DecimalNumber | Category::Letter), cat)
}

pub(crate) fn is_alpha_digit(code: u32) -> bool {
    code < 0x80 && (code as u8).is_ascii_alphanumeric()
}

pub(crate) fn is_alpha_digit_or_underscore(code: u32) -> bool {
    is_alpha_digit(code) || code == u32::from(b'_')
}

pub(crate) fn is_alpha_digit_or_underscore_or_minus(code: u32) -> bool {
    is_alpha_digit_or_underscore(code) || code == u32::from(b'-')
}

/// ASCII whitespace plus NUL, which terminates scans at the end of input.
pub(crate) fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\0' | 0x0b)
}

// ─── UTF-8 decoding ───────────────────────────────────────────────────────────

/// True for the first byte of an encoded code point.
pub(crate) fn is_first_byte(b: u8) -> bool {
    b & 0xc0 != 0x80
}

/// Decodes the code point starting at `pos`, returning it with the position
/// just after it.
pub(crate) fn next_code(bytes: &[u8], pos: usize) -> (u32, usize) {
    let Some(&first) = bytes.get(pos) else {
        return (0, pos);
    };
    let (len, init) = match first {
        0x00..=0x7f => return (u32::from(first), pos + 1),
        0xc0..=0xdf => (2, u32::from(first & 0x1f)),
        0xe0..=0xef => (3, u32::from(first & 0x0f)),
        _ => (4, u32::from(first & 0x07)),
    };
    let end = (pos + len).min(bytes.len());
    let code = bytes[pos + 1..end].iter().fold(init, |acc, &b| (acc << 6) | u32::from(b & 0x3f));
    (code, end)
}

/// Start of the code point that ends right before `pos`.
pub(crate) fn prev_start(bytes: &[u8], mut pos: usize) -> usize {
    while pos > 0 {
        pos -= 1;
        if is_first_byte(bytes[pos]) {
            break;
        }
    }
    pos
}

/// The code point that ends right before `pos`, or `0` at the start.
pub(crate) fn prev_code(bytes: &[u8], pos: usize) -> u32 {
    if pos == 0 {
        return 0;
    }
    next_code(bytes, prev_start(bytes, pos)).0
}

// ─── Lengths ──────────────────────────────────────────────────────────────────

/// Number of UTF-16 code units needed for `text`.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// UTF-16 length of a UTF-8 byte run; four-byte sequences count twice.
pub(crate) fn utf16_len_bytes(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| is_first_byte(b)).count() + bytes.iter().filter(|&&b| b >= 0xf0).count()
}

/// Number of code points in `text`.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte length of the first `n` code points of `text`.
pub(crate) fn prefix_bytes(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

/// Splits `text` after its first `units` UTF-16 code units. A surrogate
/// pair that would be cut goes entirely to the head.
pub(crate) fn split_utf16(text: &str, units: i32) -> (&str, &str) {
    let mut seen = 0i32;
    for (i, c) in text.char_indices() {
        if seen >= units {
            return text.split_at(i);
        }
        seen += c.len_utf16() as i32;
    }
    (text, "")
}

/// Lowercases ASCII and everything `char::to_lowercase` maps one-to-one.
pub(crate) fn to_lower(text: &str) -> String {
    text.chars()
        .map(|c| {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) => l,
                _ => c,
            }
        })
        .collect()
}
