//! Candidate scanners for auto-detected entities.
//!
//! Each `match_*` function is a hand-written equivalent of a regular
//! expression: it finds the anchor byte (`@`, `#`, `/`, `:` …), checks the
//! surrounding characters for a word boundary and returns byte ranges into
//! the input. The public `find_*` functions add the second-stage filtering.

use std::ops::Range;

use crate::limits::{
    MAX_BOT_COMMAND_LENGTH, MAX_HASHTAG_LENGTH, MAX_MENTION_LENGTH, MAX_USERNAME_LENGTH,
    MIN_BOT_COMMAND_LENGTH, MIN_MENTION_LENGTH, MIN_USERNAME_LENGTH,
};
use crate::unicode::{
    category, hashtag_letter, is_alpha_digit, is_alpha_digit_or_underscore,
    is_alpha_digit_or_underscore_or_minus, is_word_character, next_code, prev_code, prev_start,
    Category,
};
use crate::validators::{fix_url, is_bad_path_end, is_email_address, is_valid_bank_card};

/// Byte span of a match inside the scanned text.
pub type Span = Range<usize>;

const SHORT_USERNAMES: [&str; 3] = ["gif", "vid", "pic"];

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes.get(from..)?.iter().position(|&b| b == needle).map(|p| from + p)
}

fn ch(b: u8) -> u32 {
    u32::from(b)
}

// ─── Mentions and bot commands ───────────────────────────────────────────────

// (?<=\B)@([a-zA-Z0-9_]{2,32})(?=\b)
fn match_mentions(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let end = bytes.len();
    let mut result = Vec::new();
    let mut ptr = 0;

    while let Some(at) = find_byte(bytes, ptr, b'@') {
        ptr = at + 1;
        if at != 0 && is_word_character(prev_code(bytes, at)) {
            continue;
        }
        let mention_begin = ptr;
        while ptr != end && is_alpha_digit_or_underscore(ch(bytes[ptr])) {
            ptr += 1;
        }
        let size = ptr - mention_begin;
        if !(MIN_MENTION_LENGTH..=MAX_MENTION_LENGTH).contains(&size) {
            continue;
        }
        if is_word_character(next_code(bytes, ptr).0) {
            continue;
        }
        result.push(at..ptr);
    }
    result
}

fn is_command_boundary(code: u32) -> bool {
    is_word_character(code) || code == ch(b'/') || code == ch(b'<') || code == ch(b'>')
}

// (?<!\b|[\/<>])\/([a-zA-Z0-9_]{1,64})(?:@([a-zA-Z0-9_]{3,32}))?(?!\B|[\/<>])
fn match_bot_commands(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let end = bytes.len();
    let mut result = Vec::new();
    let mut ptr = 0;

    while let Some(slash) = find_byte(bytes, ptr, b'/') {
        ptr = slash + 1;
        if slash != 0 && is_command_boundary(prev_code(bytes, slash)) {
            continue;
        }
        let command_begin = ptr;
        while ptr != end && is_alpha_digit_or_underscore(ch(bytes[ptr])) {
            ptr += 1;
        }
        let mut command_end = ptr;
        if !(MIN_BOT_COMMAND_LENGTH..=MAX_BOT_COMMAND_LENGTH).contains(&(command_end - command_begin)) {
            continue;
        }

        if ptr != end && bytes[ptr] == b'@' {
            ptr += 1;
            let username_begin = ptr;
            while ptr != end && is_alpha_digit_or_underscore(ch(bytes[ptr])) {
                ptr += 1;
            }
            if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&(ptr - username_begin)) {
                continue;
            }
            command_end = ptr;
        }

        if is_command_boundary(next_code(bytes, ptr).0) {
            continue;
        }
        result.push(slash..command_end);
    }
    result
}

// ─── Hashtags and cashtags ───────────────────────────────────────────────────

// (?<=^|[^is_hashtag_letter])#([is_hashtag_letter]{1,256})(?:@([a-zA-Z0-9_]{3,32}))?(?![is_hashtag_letter]*#)
// with at least one letter
fn match_hashtags(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let end = bytes.len();
    let mut result = Vec::new();
    let mut ptr = 0;

    while let Some(hash) = find_byte(bytes, ptr, b'#') {
        ptr = hash + 1;
        if hash != 0 && hashtag_letter(prev_code(bytes, hash)).0 {
            continue;
        }

        let mut size = 0;
        let mut hashtag_end = None;
        let mut was_letter = false;
        while ptr != end {
            let (code, next) = next_code(bytes, ptr);
            let (is_letter, cat) = hashtag_letter(code);
            if !is_letter {
                break;
            }
            ptr = next;

            if size == MAX_HASHTAG_LENGTH - 1 {
                hashtag_end = Some(ptr);
            }
            if size != MAX_HASHTAG_LENGTH {
                was_letter |= cat == Category::Letter;
                size += 1;
            }
        }
        let mut hashtag_end = hashtag_end.unwrap_or(ptr);
        if size < 1 {
            continue;
        }
        if hashtag_end == ptr && ptr != end && bytes[ptr] == b'@' {
            let mut username_end = ptr + 1;
            while username_end != end
                && username_end - ptr < 33
                && is_alpha_digit_or_underscore(ch(bytes[username_end]))
            {
                username_end += 1;
            }
            if username_end - ptr - 1 >= 3 {
                ptr = username_end;
                hashtag_end = username_end;
            }
        }
        if ptr != end && bytes[ptr] == b'#' {
            continue;
        }
        if !was_letter {
            continue;
        }
        result.push(hash..hashtag_end);
    }
    result
}

fn is_cashtag_boundary(code: u32) -> bool {
    hashtag_letter(code).0 || code == ch(b'$')
}

// (?<=^|[^$is_hashtag_letter])\$(1INCH|[A-Z]{1,8})(?:@([a-zA-Z0-9_]{3,32}))?(?![$is_hashtag_letter])
fn match_cashtags(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let end = bytes.len();
    let mut result = Vec::new();
    let mut ptr = 0;

    while let Some(dollar) = find_byte(bytes, ptr, b'$') {
        ptr = dollar + 1;
        if dollar != 0 && is_cashtag_boundary(prev_code(bytes, dollar)) {
            continue;
        }

        let cashtag_begin = ptr;
        if bytes[ptr..].starts_with(b"1INCH") {
            ptr += 5;
        } else {
            while ptr != end && bytes[ptr].is_ascii_uppercase() {
                ptr += 1;
            }
        }
        let mut cashtag_end = ptr;
        if !(1..=8).contains(&(cashtag_end - cashtag_begin)) {
            continue;
        }
        if ptr != end && bytes[ptr] == b'@' {
            let mut username_end = ptr + 1;
            while username_end != end && is_alpha_digit_or_underscore(ch(bytes[username_end])) {
                username_end += 1;
            }
            if (MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&(username_end - ptr - 1)) {
                cashtag_end = username_end;
                ptr = username_end;
            }
        }
        if cashtag_end != end && is_cashtag_boundary(next_code(bytes, ptr).0) {
            continue;
        }
        result.push(dollar..cashtag_end);
    }
    result
}

// ─── Media timestamps ─────────────────────────────────────────────────────────

fn match_media_timestamps(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let end = bytes.len();
    let is_part = |b: u8| b == b':' || b.is_ascii_digit();
    let mut result = Vec::new();
    let mut ptr = 0;

    while let Some(colon) = find_byte(bytes, ptr, b':') {
        let mut begin = colon;
        while begin != 0 && is_part(bytes[begin - 1]) {
            begin -= 1;
        }
        let mut last = colon;
        while last + 1 != end && is_part(bytes[last + 1]) {
            last += 1;
        }
        let stop = last + 1;
        ptr = stop;

        if begin == colon || stop == colon + 1 || !bytes[colon + 1].is_ascii_digit() {
            continue;
        }
        if begin != 0 && is_word_character(prev_code(bytes, begin)) {
            continue;
        }
        if stop != end && is_word_character(next_code(bytes, stop).0) {
            continue;
        }
        result.push(begin..stop);
    }
    result
}

// ─── Bank cards ───────────────────────────────────────────────────────────────

// (?<=^|[^+_\pL\d-.,])[\d -]{13,}([^_\pL\d-]|$)
fn match_bank_card_numbers(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let end = bytes.len();
    let is_card_byte = |b: u8| b.is_ascii_digit() || b == b' ' || b == b'-';
    let mut result = Vec::new();
    let mut ptr = 0;

    loop {
        while ptr != end && !bytes[ptr].is_ascii_digit() {
            ptr += 1;
        }
        if ptr == end {
            break;
        }
        if ptr != 0 {
            let prev = prev_code(bytes, ptr);
            if b".,+-_".iter().any(|&b| ch(b) == prev) || category(prev) == Category::Letter {
                while ptr != end && is_card_byte(bytes[ptr]) {
                    ptr += 1;
                }
                continue;
            }
        }

        let begin = ptr;
        let mut digit_count = 0;
        while ptr != end && is_card_byte(bytes[ptr]) {
            if bytes[ptr] == b' ' && (16..=19).contains(&digit_count) && digit_count == ptr - begin {
                // continuous card number
                break;
            }
            digit_count += usize::from(bytes[ptr].is_ascii_digit());
            ptr += 1;
        }
        if !(13..=19).contains(&digit_count) {
            continue;
        }

        let mut card_end = ptr;
        while !bytes[card_end - 1].is_ascii_digit() {
            card_end -= 1;
        }
        if card_end - begin > 2 * digit_count - 1 {
            continue;
        }
        if card_end != end {
            let next = next_code(bytes, card_end).0;
            if next == ch(b'-') || next == ch(b'_') || category(next) == Category::Letter {
                continue;
            }
        }
        result.push(begin..card_end);
    }
    result
}

// ─── URLs ─────────────────────────────────────────────────────────────────────

fn is_url_unicode_symbol(code: u32) -> bool {
    if (0x2000..=0x206f).contains(&code) {
        // zero-width joiners and dashes from General Punctuation
        return code == 0x200c || code == 0x200d || (0x2010..=0x2015).contains(&code);
    }
    category(code) != Category::Separator
}

fn is_url_path_symbol(code: u32) -> bool {
    match code {
        0x0a | 0x3c | 0x3e | 0x22 | 0xab | 0xbb => false,
        _ => is_url_unicode_symbol(code),
    }
}

fn is_protocol_symbol(code: u32) -> bool {
    if code < 0x80 {
        return is_alpha_digit(code) || code == ch(b'+') || code == ch(b'-');
    }
    category(code) != Category::Separator
}

fn is_user_data_symbol(code: u32) -> bool {
    match char::from_u32(code) {
        Some('\n' | '/' | '[' | ']' | '{' | '}' | '(' | ')' | '\'' | '`' | '<' | '>' | '"' | '@' | '«' | '»') => {
            false
        }
        _ => is_url_unicode_symbol(code),
    }
}

fn is_domain_symbol(code: u32) -> bool {
    if code < 0xc0 {
        return code == ch(b'.') || is_alpha_digit_or_underscore_or_minus(code) || code == ch(b'~');
    }
    is_url_unicode_symbol(code)
}

/// Extends a path that starts at `start` (which holds `/`, `?` or `#`).
fn scan_path(bytes: &[u8], start: usize) -> usize {
    let mut path_end = start + 1;
    while path_end != bytes.len() {
        let (code, next) = next_code(bytes, path_end);
        if !is_url_path_symbol(code) {
            break;
        }
        path_end = next;
    }
    while path_end > start + 1 && is_bad_path_end(bytes[path_end - 1]) {
        path_end -= 1;
    }
    if bytes[start] == b'/' || path_end > start + 1 { path_end } else { start }
}

/// Walks backwards from `pos` while `accept` holds for each code point.
fn scan_back(bytes: &[u8], mut pos: usize, floor: usize, accept: impl Fn(u32) -> bool) -> usize {
    while pos != floor {
        let start = prev_start(bytes, pos);
        if !accept(next_code(bytes, start).0) {
            break;
        }
        pos = start;
    }
    pos
}

fn is_scheme_char(bytes: &[u8], pos: usize, lower: u8) -> bool {
    bytes[pos].to_ascii_lowercase() == lower
}

// (tg|ton|tonsite)://[a-z0-9_-]{1,253}([/?#][^\s\x{2000}-\x{200b}\x{200e}-\x{200f}\x{2016}-\x{206f}<>«»"]*)?
fn match_tg_urls(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let end = bytes.len();
    let mut result = Vec::new();
    let mut ptr = 0;

    while end - ptr > 5 {
        let Some(colon) = find_byte(bytes, ptr, b':') else {
            break;
        };
        ptr = colon;

        let mut url_begin = None;
        if end - ptr >= 3 && bytes[ptr + 1] == b'/' && bytes[ptr + 2] == b'/' {
            let has = |back: usize, scheme: &[u8]| {
                ptr >= back && scheme.iter().enumerate().all(|(i, &c)| is_scheme_char(bytes, ptr - back + i, c))
            };
            if has(2, b"tg") {
                url_begin = Some(ptr - 2);
            } else if has(3, b"ton") {
                url_begin = Some(ptr - 3);
            } else if has(7, b"tonsite") {
                url_begin = Some(ptr - 7);
            }
        }
        let Some(url_begin) = url_begin else {
            ptr += 1;
            continue;
        };

        ptr += 3;
        let domain_begin = ptr;
        while ptr != end && ptr - domain_begin != 253 && is_alpha_digit_or_underscore_or_minus(ch(bytes[ptr])) {
            ptr += 1;
        }
        if ptr == domain_begin {
            continue;
        }
        if ptr != end && matches!(bytes[ptr], b'/' | b'?' | b'#') {
            ptr = scan_path(bytes, ptr);
        }
        result.push(url_begin..ptr);
    }
    result
}

fn match_urls(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let end = bytes.len();
    let mut result = Vec::new();
    // start of the not yet scanned part of the text
    let mut begin = 0;

    loop {
        let Some(dot) = find_byte(bytes, begin, b'.') else {
            break;
        };
        if dot + 1 == end {
            break;
        }
        if bytes[dot + 1] == b' ' {
            // fast path
            begin = dot + 2;
            continue;
        }

        let mut domain_begin = scan_back(bytes, dot, begin, is_domain_symbol);

        let mut last_at = None;
        let mut domain_end = dot;
        while domain_end != end {
            let (code, next) = next_code(bytes, domain_end);
            if code == ch(b'@') {
                last_at = Some(domain_end);
            } else if !is_domain_symbol(code) {
                break;
            }
            domain_end = next;
        }

        if last_at.is_some() {
            domain_begin = scan_back(bytes, domain_begin, begin, is_user_data_symbol);
        }

        let mut url_end = domain_end;
        if url_end != end && bytes[url_end] == b':' {
            let mut port_end = url_end + 1;
            while port_end != end && bytes[port_end].is_ascii_digit() {
                port_end += 1;
            }
            let mut port_begin = url_end + 1;
            while port_begin != port_end && bytes[port_begin] == b'0' {
                port_begin += 1;
            }
            let port = &text[port_begin..port_end];
            if port_begin != port_end && port.len() <= 5 && port.parse::<u32>().is_ok_and(|p| p <= 65535) {
                url_end = port_end;
            }
        }

        if url_end != end && matches!(bytes[url_end], b'/' | b'?' | b'#') {
            url_end = scan_path(bytes, url_end);
        }
        while url_end > dot + 1 && bytes[url_end - 1] == b'.' {
            url_end -= 1;
        }

        let mut is_bad = false;
        let mut url_begin = domain_begin;
        if url_begin != begin && bytes[url_begin - 1] == b'@' {
            if last_at.is_some() {
                is_bad = true;
            }
            let user_data_begin = scan_back(bytes, url_begin - 1, begin, is_user_data_symbol);
            if user_data_begin == url_begin - 1 {
                is_bad = true;
            }
            url_begin = user_data_begin;
        }

        if url_begin != begin {
            let prefix = &bytes[begin..url_begin];
            if prefix.len() >= 6 && prefix.ends_with(b"://") {
                let protocol_begin = scan_back(bytes, url_begin - 3, begin, is_protocol_symbol);
                let protocol = text[protocol_begin..url_begin - 3].to_ascii_lowercase();
                if protocol.ends_with("http") && protocol != "shttp" {
                    url_begin -= 7;
                } else if protocol.ends_with("https") {
                    url_begin -= 8;
                } else if protocol.ends_with("ftp") && protocol != "tftp" && protocol != "sftp" {
                    url_begin -= 6;
                } else if protocol.ends_with("tonsite") {
                    url_begin -= 10;
                } else {
                    is_bad = true;
                }
            } else {
                let code = prev_code(bytes, url_begin);
                if is_word_character(code) || code == ch(b'/') || code == ch(b'#') || code == ch(b'@') {
                    is_bad = true;
                }
            }
        }

        if !is_bad {
            if url_end > dot + 1 {
                result.push(url_begin..url_end);
            }
            while url_end != end && bytes[url_end] == b'.' {
                url_end += 1;
            }
        } else {
            while bytes[url_end - 1] != b'.' {
                url_end -= 1;
            }
        }

        if url_end <= dot {
            url_end = dot + 1;
        }
        begin = url_end;
    }
    result
}

// ─── Public finders ───────────────────────────────────────────────────────────

/// `@username` mentions; 1–3 character names only for known inline bots.
pub fn find_mentions(text: &str) -> Vec<Span> {
    let mut mentions = match_mentions(text);
    mentions.retain(|span| {
        let name = &text[span.start + 1..span.end];
        name.len() >= 4 || SHORT_USERNAMES.contains(&name.to_ascii_lowercase().as_str())
    });
    mentions
}

/// `/command` and `/command@botname`.
pub fn find_bot_commands(text: &str) -> Vec<Span> {
    match_bot_commands(text)
}

pub fn find_hashtags(text: &str) -> Vec<Span> {
    match_hashtags(text)
}

pub fn find_cashtags(text: &str) -> Vec<Span> {
    match_cashtags(text)
}

/// Digit runs that pass the Luhn check and issuer length rules.
pub fn find_bank_card_numbers(text: &str) -> Vec<Span> {
    let mut cards = match_bank_card_numbers(text);
    cards.retain(|span| is_valid_bank_card(&text[span.clone()]));
    cards
}

/// `tg://`, `ton://` and `tonsite://` links.
pub fn find_tg_urls(text: &str) -> Vec<Span> {
    match_tg_urls(text)
}

/// URLs and email addresses; the flag is `true` for emails.
///
/// A `mailto:` prefix is dropped from the returned email span.
pub fn find_urls(text: &str) -> Vec<(Span, bool)> {
    let mut result = Vec::new();
    for span in match_urls(text) {
        let url = &text[span.clone()];
        if is_email_address(url) {
            result.push((span, true));
        } else if url.starts_with("mailto:") && is_email_address(&url[7..]) {
            result.push((span.start + 7..span.end, true));
        } else if let Some(fixed) = fix_url(url) {
            if !fixed.is_empty() {
                result.push((span.start..span.start + fixed.len(), false));
            }
        }
    }
    result
}

/// `M:SS` and `H:MM:SS` with the value in seconds.
pub fn find_media_timestamps(text: &str) -> Vec<(Span, i32)> {
    let mut result = Vec::new();
    for span in match_media_timestamps(text) {
        let parts: Vec<&str> = text[span.clone()].split(':').collect();
        let Some(last) = parts.last() else {
            continue;
        };
        if parts.len() > 3 || last.len() != 2 {
            continue;
        }
        let number = |s: &str| s.parse::<i32>().unwrap_or(0);
        let seconds = number(last);
        if seconds >= 60 {
            continue;
        }
        if parts.len() == 2 {
            if parts[0].is_empty() || parts[0].len() > 4 {
                continue;
            }
            result.push((span, number(parts[0]) * 60 + seconds));
        } else {
            if parts[0].is_empty() || parts[1].is_empty() || parts[0].len() > 2 || parts[1].len() > 2 {
                continue;
            }
            let minutes = number(parts[1]);
            if minutes >= 60 {
                continue;
            }
            result.push((span, number(parts[0]) * 3600 + minutes * 60 + seconds));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings<'a>(text: &'a str, spans: &[Span]) -> Vec<&'a str> {
        spans.iter().map(|s| &text[s.clone()]).collect()
    }

    fn urls(text: &str) -> Vec<&str> {
        find_urls(text).into_iter().filter(|(_, email)| !email).map(|(s, _)| &text[s]).collect()
    }

    fn emails(text: &str) -> Vec<&str> {
        find_urls(text).into_iter().filter(|(_, email)| *email).map(|(s, _)| &text[s]).collect()
    }

    #[test]
    fn mentions() {
        let check = |text: &str, expected: &[&str]| {
            assert_eq!(strings(text, &find_mentions(text)), expected, "{text}");
        };
        check("@mention", &["@mention"]);
        check("@mention ", &["@mention"]);
        check(" @mention", &["@mention"]);
        check("@abc", &[]);
        check("@gif @vid @pic @GIF", &["@gif", "@vid", "@pic", "@GIF"]);
        check("@a", &[]);
        check("a@mention", &[]);
        check("@mention@mention", &["@mention"]);
        check("@mention_", &["@mention_"]);
        check(&format!("@{}", "a".repeat(33)), &[]);
        check(&format!("@{}", "a".repeat(32)), &[&format!("@{}", "a".repeat(32))]);
        check("@ab1cd.", &["@ab1cd"]);
        check("@мения", &[]);
    }

    #[test]
    fn bot_commands() {
        let check = |text: &str, expected: &[&str]| {
            assert_eq!(strings(text, &find_bot_commands(text)), expected, "{text}");
        };
        check("/start", &["/start"]);
        check("/start@bot_name", &["/start@bot_name"]);
        check("/start@ab", &[]);
        check("a/start", &[]);
        check("/start/", &[]);
        check("</start>", &[]);
        check("/s /a1 /_", &["/s", "/a1", "/_"]);
        check(&format!("/{}", "a".repeat(65)), &[]);
    }

    #[test]
    fn hashtags() {
        let check = |text: &str, expected: &[&str]| {
            assert_eq!(strings(text, &find_hashtags(text)), expected, "{text}");
        };
        check("#hashtag", &["#hashtag"]);
        check("#123", &[]);
        check("#a1", &["#a1"]);
        check("a#hashtag", &[]);
        check("#hash#tag", &[]);
        check("#hash@bot", &["#hash@bot"]);
        check("#hash@bo", &["#hash"]);
        check("#тег #태그", &["#тег", "#태그"]);
        let long = "a".repeat(300);
        let text = format!("#{long}");
        assert_eq!(strings(&text, &find_hashtags(&text)), [&text[..257]]);
    }

    #[test]
    fn cashtags() {
        let check = |text: &str, expected: &[&str]| {
            assert_eq!(strings(text, &find_cashtags(text)), expected, "{text}");
        };
        check("$USD", &["$USD"]);
        check("$1INCH", &["$1INCH"]);
        check("$usd", &[]);
        check("$ABCDEFGHI", &[]);
        check("$USD@bot", &["$USD@bot"]);
        check("a$USD", &[]);
        check("$$USD", &[]);
        check("$USD$", &[]);
        check("($USD)", &["$USD"]);
    }

    #[test]
    fn media_timestamps() {
        let check = |text: &str, expected: &[(&str, i32)]| {
            let found: Vec<_> =
                find_media_timestamps(text).into_iter().map(|(s, v)| (&text[s], v)).collect();
            assert_eq!(found, expected, "{text}");
        };
        check("1:00", &[("1:00", 60)]);
        check("0:59 1:01:01", &[("0:59", 59), ("1:01:01", 3661)]);
        check("1:60", &[]);
        check("1:1", &[]);
        check("1:60:00", &[]);
        check("12345:00", &[]);
        check("1:2:3:45", &[]);
        check("a1:00", &[]);
        check("1:00a", &[]);
        check(":00", &[]);
    }

    #[test]
    fn bank_cards() {
        let check = |text: &str, expected: &[&str]| {
            assert_eq!(strings(text, &find_bank_card_numbers(text)), expected, "{text}");
        };
        check("4111111111111111", &["4111111111111111"]);
        check("4111 1111 1111 1111", &["4111 1111 1111 1111"]);
        check("4111-1111-1111-1111", &["4111-1111-1111-1111"]);
        check("4111111111111112", &[]);
        check("Call 123-456-7890 now", &[]);
        check("a4111111111111111", &[]);
        check("4111111111111111a", &[]);
        check("+4111111111111111", &[]);
        check("4111111111111111 4111111111111111", &["4111111111111111", "4111111111111111"]);
    }

    #[test]
    fn tg_urls() {
        let check = |text: &str, expected: &[&str]| {
            assert_eq!(strings(text, &find_tg_urls(text)), expected, "{text}");
        };
        check("tg://resolve?domain=x", &["tg://resolve?domain=x"]);
        check("TG://test", &["TG://test"]);
        check("ton://wallet/a.", &["ton://wallet/a"]);
        check("tonsite://a-b", &["tonsite://a-b"]);
        check("tg://", &[]);
        check("xtg://a", &["tg://a"]);
    }

    #[test]
    fn plain_urls() {
        assert_eq!(urls("https://telegram.org"), ["https://telegram.org"]);
        assert_eq!(urls("telegram.org/path?q=1#x"), ["telegram.org/path?q=1#x"]);
        assert_eq!(urls("see telegram.org."), ["telegram.org"]);
        assert_eq!(urls("(telegram.org)"), ["telegram.org"]);
        assert_eq!(urls("telegram.org:443/a"), ["telegram.org:443/a"]);
        assert_eq!(urls("sftp://telegram.org"), Vec::<&str>::new());
        assert_eq!(urls("ftp://telegram.org"), ["ftp://telegram.org"]);
        assert_eq!(urls("a.b"), Vec::<&str>::new());
        assert_eq!(urls("http://a.bc"), ["http://a.bc"]);
        assert_eq!(urls("http://a.a"), Vec::<&str>::new());
        assert_eq!(urls("teiegram.org"), Vec::<&str>::new());
        assert_eq!(urls("1.2.3.4"), ["1.2.3.4"]);
        assert_eq!(urls("user@telegram.org/"), ["user@telegram.org/"]);
        assert_eq!(urls("#telegram.org"), Vec::<&str>::new());
        assert_eq!(urls("Call 123-456-7890 now"), Vec::<&str>::new());
    }

    #[test]
    fn email_addresses() {
        assert_eq!(emails("email@example.com"), ["email@example.com"]);
        assert_eq!(emails("mailto:email@example.com"), ["email@example.com"]);
        assert_eq!(emails("a@b.c"), Vec::<&str>::new());
        assert!(find_mentions("email@example.com").is_empty());
    }
}
