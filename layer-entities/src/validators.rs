//! Second-stage checks applied to matcher candidates.
//!
//! A candidate that fails here is simply not an entity; none of these
//! functions report errors.

use crate::tld::COMMON_TLDS;
use crate::unicode::{char_len, is_alpha_digit, is_alpha_digit_or_underscore_or_minus, to_lower};

const MIN_CARD_LENGTH: usize = 13;
const MAX_CARD_LENGTH: usize = 19;

/// Luhn checksum followed by issuer-specific length rules.
///
/// Non-digit characters in `card` are ignored.
pub fn is_valid_bank_card(card: &str) -> bool {
    let digits: Vec<u32> = card
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| u32::from(b - b'0'))
        .collect();
    let count = digits.len();
    if !(MIN_CARD_LENGTH..=MAX_CARD_LENGTH).contains(&count) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d } else if d < 5 { 2 * d } else { 2 * d - 9 })
        .sum();
    if sum % 10 != 0 {
        return false;
    }

    let prefix1 = digits[0];
    let prefix2 = prefix1 * 10 + digits[1];
    let prefix4 = (prefix2 * 10 + digits[2]) * 10 + digits[3];
    if prefix1 == 4 {
        // Visa
        return matches!(count, 13 | 16 | 18 | 19);
    }
    if (51..=55).contains(&prefix2) || (2221..=2720).contains(&prefix4) {
        // Mastercard
        return count == 16;
    }
    if prefix2 == 34 || prefix2 == 37 {
        // American Express
        return count == 15;
    }
    if prefix2 == 62 || prefix2 == 81 {
        // UnionPay
        return count >= 16;
    }
    if (2200..=2204).contains(&prefix4) {
        // MIR
        return count == 16;
    }
    true
}

/// Checks `text` against the email grammar
/// `([a-z0-9_-]{0,26}[.+]){0,10}[a-z0-9_-]{1,35}@(([a-z0-9][a-z0-9_-]{0,28})?[a-z0-9][.]){1,6}[a-z]{2,8}`,
/// case-insensitively.
pub fn is_email_address(text: &str) -> bool {
    let (userdata, domain) = text.split_once('@').unwrap_or((text, ""));
    if domain.is_empty() {
        return false;
    }

    let userdata = userdata.as_bytes();
    let mut prev = 0;
    let mut part_count = 0;
    for (i, &c) in userdata.iter().enumerate() {
        if c == b'.' || c == b'+' {
            if i - prev >= 27 {
                return false;
            }
            part_count += 1;
            prev = i + 1;
        } else if !is_alpha_digit_or_underscore_or_minus(u32::from(c)) {
            return false;
        }
    }
    part_count += 1;
    if part_count >= 12 {
        return false;
    }
    let last_part_length = userdata.len() - prev;
    if last_part_length == 0 || last_part_length >= 36 {
        return false;
    }

    let mut parts: Vec<&[u8]> = domain.as_bytes().split(|&c| c == b'.').collect();
    if parts.len() <= 1 || parts.len() > 7 {
        return false;
    }
    let Some(tld) = parts.pop() else {
        return false;
    };
    if tld.len() <= 1 || tld.len() >= 9 || !tld.iter().all(u8::is_ascii_alphabetic) {
        return false;
    }
    parts.iter().all(|part| {
        !part.is_empty()
            && part.len() < 31
            && part.iter().all(|&c| is_alpha_digit_or_underscore_or_minus(u32::from(c)))
            && is_alpha_digit(u32::from(part[0]))
            && is_alpha_digit(u32::from(part[part.len() - 1]))
    })
}

/// True if `tld` is a known top-level domain.
///
/// Lowercase input is looked up directly. Mixed-case input is lowercased
/// first, but a TLD whose only uppercase letter is the first one is refused.
pub fn is_common_tld(tld: &str) -> bool {
    if tld.bytes().all(|b| b.is_ascii_lowercase()) {
        return COMMON_TLDS.binary_search(&tld).is_ok();
    }
    let lower = to_lower(tld);
    if lower != tld && lower.chars().skip(1).eq(tld.chars().skip(1)) {
        return false;
    }
    COMMON_TLDS.binary_search(&lower.as_str()).is_ok()
}

const BAD_PATH_END_CHARS: &[u8] = b".:;,('?!`";

pub(crate) fn is_bad_path_end(b: u8) -> bool {
    BAD_PATH_END_CHARS.contains(&b)
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len() && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Cleans up a URL candidate, returning the accepted prefix of `url`.
///
/// Rejects lookalike domains, labels that are empty, too long or end with
/// `-`, single-label and all-digit hosts, and TLDs that are neither known nor
/// backed by an explicit scheme. Unbalanced brackets and trailing
/// punctuation are cut from the path.
pub fn fix_url(url: &str) -> Option<&str> {
    let full_url = url;

    let mut rest = url;
    let mut has_protocol = false;
    if ["http://", "https://", "ftp://", "tonsite://"].iter().any(|p| starts_with_ignore_case(url, p)) {
        let colon = url.find(':')?;
        rest = &url[colon + 3..];
        has_protocol = true;
    }
    let domain_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (mut domain, path) = rest.split_at(domain_end);

    if let Some(at) = domain.find('@') {
        domain = &domain[at + 1..];
    }
    if let Some(colon) = domain.rfind(':') {
        domain = &domain[..colon];
    }

    if domain.len() == 12 && domain.eq_ignore_ascii_case("teiegram.org") {
        return None;
    }

    let path = path.as_bytes();
    let mut balance = [0i32; 3];
    let mut path_pos = 0;
    while path_pos < path.len() {
        match path[path_pos] {
            b'(' => balance[0] += 1,
            b'[' => balance[1] += 1,
            b'{' => balance[2] += 1,
            b')' => balance[0] -= 1,
            b']' => balance[1] -= 1,
            b'}' => balance[2] -= 1,
            _ => {}
        }
        if balance.iter().any(|&b| b < 0) {
            break;
        }
        path_pos += 1;
    }
    while path_pos > 0 && is_bad_path_end(path[path_pos - 1]) {
        path_pos -= 1;
    }
    let full_url = &full_url[..full_url.len() - (path.len() - path_pos)];

    let d = domain.as_bytes();
    let mut prev = 0;
    let mut part_count = 0;
    let mut has_non_digit = false;
    let mut is_ipv4 = true;
    for i in 0..=d.len() {
        if i == d.len() || d[i] == b'.' {
            let part_size = i - prev;
            if part_size == 0 || part_size >= 64 || d[i - 1] == b'-' {
                return None;
            }
            if is_ipv4 {
                if part_size > 3 {
                    is_ipv4 = false;
                }
                if part_size == 3
                    && (d[prev] >= b'3'
                        || (d[prev] == b'2' && (d[prev + 1] >= b'6' || (d[prev + 1] == b'5' && d[prev + 2] >= b'6'))))
                {
                    is_ipv4 = false;
                }
                if d[prev] == b'0' && part_size >= 2 {
                    is_ipv4 = false;
                }
            }
            part_count += 1;
            if i != d.len() {
                prev = i + 1;
            }
        } else if !d[i].is_ascii_digit() {
            is_ipv4 = false;
            has_non_digit = true;
        }
    }
    if part_count == 1 {
        return None;
    }
    if is_ipv4 && part_count == 4 {
        return Some(full_url);
    }
    if !has_non_digit {
        return None;
    }

    let tld = &domain[prev..];
    if char_len(tld) <= 1 {
        return None;
    }
    if let Some(punycode) = tld.strip_prefix("xn--") {
        if tld.len() <= 5 || !punycode.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
    } else if tld.contains(['_', '-']) || (!has_protocol && !is_common_tld(tld)) {
        return None;
    }

    // the second-level label must not contain '_'
    let mut i = prev - 1;
    while i > 0 {
        i -= 1;
        match d[i] {
            b'_' => return None,
            b'.' => break,
            _ => {}
        }
    }

    Some(full_url)
}
