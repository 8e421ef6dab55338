//! Link checking for TextUrl, MentionName and CustomEmoji targets.
//!
//! [`Links`] is the built-in [`LinkChecker`]; the markup parsers use it
//! directly, the façade accepts any implementation through
//! [`crate::Context`].

use crate::entity::{CustomEmojiId, UserId};
use crate::errors::{Error, Result};

// ─── Trait ────────────────────────────────────────────────────────────────────

/// Normalizes and classifies links found in markup or supplied by clients.
pub trait LinkChecker {
    /// Canonical form of `url`, or an empty string if it is not a valid
    /// HTTP(S), `tg:`, `ton:` or `tonsite:` link.
    fn get_checked_link(&self, url: &str) -> String;

    /// The user a `tg://user?id=N` link points to; an invalid id otherwise.
    fn get_link_user_id(&self, url: &str) -> UserId;

    /// The custom emoji a `tg://emoji?id=N` link points to.
    fn get_link_custom_emoji_id(&self, url: &str) -> Result<CustomEmojiId>;
}

/// The built-in link rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct Links;

impl LinkChecker for Links {
    fn get_checked_link(&self, url: &str) -> String {
        get_checked_link(url)
    }

    fn get_link_user_id(&self, url: &str) -> UserId {
        get_link_user_id(url)
    }

    fn get_link_custom_emoji_id(&self, url: &str) -> Result<CustomEmojiId> {
        get_link_custom_emoji_id(url)
    }
}

// ─── URL parsing ──────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
struct HttpUrl {
    is_https:  bool,
    userinfo:  String,
    host:      String,
    is_ipv6:   bool,
    port:      Option<u16>,
    /// Path, query and fragment; always starts with `/`.
    query:     String,
}

impl HttpUrl {
    fn get_url(&self) -> String {
        let mut url = String::from(if self.is_https { "https://" } else { "http://" });
        if !self.userinfo.is_empty() {
            url.push_str(&self.userinfo);
            url.push('@');
        }
        url.push_str(&self.host);
        if let Some(port) = self.port {
            url.push(':');
            url.push_str(&port.to_string());
        }
        url.push_str(&self.query);
        url
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn is_host_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') || b >= 0x80
}

fn parse_url(url: &str) -> Option<HttpUrl> {
    let (is_https, rest) = if let Some(rest) = strip_prefix_ignore_case(url, "http://") {
        (false, rest)
    } else if let Some(rest) = strip_prefix_ignore_case(url, "https://") {
        (true, rest)
    } else if url.contains("://") && url.find("://") < url.find(['/', '?', '#']) {
        return None;
    } else {
        (false, url)
    };

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, query) = rest.split_at(authority_end);

    let (userinfo, host_port) = match authority.rfind('@') {
        Some(at) => (&authority[..at], &authority[at + 1..]),
        None => ("", authority),
    };

    let (host, is_ipv6, port_text) = if host_port.starts_with('[') {
        let close = host_port.find(']')?;
        let tail = &host_port[close + 1..];
        let port_text = match tail.strip_prefix(':') {
            Some(port) => Some(port),
            None if tail.is_empty() => None,
            None => return None,
        };
        (host_port[..=close].to_string(), true, port_text)
    } else {
        match host_port.rfind(':') {
            Some(colon) => (host_port[..colon].to_ascii_lowercase(), false, Some(&host_port[colon + 1..])),
            None => (host_port.to_ascii_lowercase(), false, None),
        }
    };
    if host.is_empty() || (!is_ipv6 && !host.bytes().all(is_host_byte)) {
        return None;
    }

    let port = match port_text {
        Some(text) => {
            if text.is_empty() || text.len() > 5 || !text.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let port = text.parse::<u16>().ok().filter(|&port| port != 0)?;
            Some(port)
        }
        None => None,
    };

    if query.bytes().any(|b| b <= 0x20) {
        return None;
    }
    let query = if query.starts_with('/') { query.to_string() } else { format!("/{query}") };

    Some(HttpUrl { is_https, userinfo: userinfo.to_string(), host, is_ipv6, port, query })
}

// ─── Checks ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Tg,
    Ton,
    TonSite,
}

impl Scheme {
    fn name(self) -> &'static str {
        match self {
            Self::Tg => "tg",
            Self::Ton => "ton",
            Self::TonSite => "tonsite",
        }
    }
}

/// Canonical form of a link, or an empty string if it is rejected.
pub fn get_checked_link(link: &str) -> String {
    check_link(link).unwrap_or_default()
}

fn check_link(link: &str) -> Option<String> {
    let mut scheme = None;
    let mut rest = link;
    for (prefix, kind) in [("tg:", Scheme::Tg), ("ton:", Scheme::Ton), ("tonsite:", Scheme::TonSite)] {
        if let Some(stripped) = strip_prefix_ignore_case(link, prefix) {
            scheme = Some(kind);
            rest = stripped.strip_prefix("//").unwrap_or(stripped);
            break;
        }
    }

    let url = parse_url(rest)?;
    let Some(scheme) = scheme else {
        if !url.is_ipv6 && !url.host.contains('.') {
            return None;
        }
        return Some(url.get_url());
    };

    if strip_prefix_ignore_case(rest, "http://").is_some()
        || url.is_https
        || !url.userinfo.is_empty()
        || url.port.is_some()
        || url.is_ipv6
    {
        return None;
    }
    let allow_dot = scheme == Scheme::TonSite;
    if !url.host.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || (allow_dot && b == b'.')) {
        return None;
    }
    let query = match url.query.strip_prefix('/') {
        Some(tail) if tail.starts_with('?') => tail,
        _ => url.query.as_str(),
    };
    Some(format!("{}://{}{}", scheme.name(), url.host, query))
}

/// Value of the `id` query parameter in a lowercased `tg:host?…` link.
///
/// `Err` carries the step that failed: the scheme, the host, or the missing
/// parameter.
fn tg_link_parameter<'a>(url: &'a str, host: &str) -> std::result::Result<&'a str, TgLinkError> {
    let url = url.strip_prefix("tg:").ok_or(TgLinkError::Scheme)?;
    let url = url.strip_prefix("//").unwrap_or(url);

    let after_host = url.strip_prefix(host).ok_or(TgLinkError::Host)?;
    if after_host.bytes().next().is_some_and(|b| !matches!(b, b'/' | b'?' | b'#')) {
        return Err(TgLinkError::Host);
    }
    let after_host = after_host.strip_prefix('/').unwrap_or(after_host);
    let query = after_host.strip_prefix('?').ok_or(TgLinkError::Parameter)?;
    let query = query.split('#').next().unwrap_or_default();

    query
        .split('&')
        .map(|parameter| parameter.split_once('=').unwrap_or((parameter, "")))
        .find(|(key, _)| *key == "id")
        .map(|(_, value)| value)
        .ok_or(TgLinkError::Parameter)
}

enum TgLinkError {
    Scheme,
    Host,
    Parameter,
}

/// Strict decimal parse: no sign other than `-`, no leading zeros.
pub(crate) fn to_integer_safe(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().filter(|value| value.to_string() == text)
}

/// The user a `tg://user?id=N` link points to.
pub fn get_link_user_id(url: &str) -> UserId {
    let url = url.to_ascii_lowercase();
    match tg_link_parameter(&url, "user") {
        Ok(value) => to_integer_safe(value).map(UserId).unwrap_or_default(),
        Err(_) => UserId::default(),
    }
}

/// The custom emoji a `tg://emoji?id=N` link points to.
pub fn get_link_custom_emoji_id(url: &str) -> Result<CustomEmojiId> {
    let url = url.to_ascii_lowercase();
    let value = tg_link_parameter(&url, "emoji").map_err(|err| {
        Error::rejected(match err {
            TgLinkError::Scheme => "Custom emoji URL must have scheme tg",
            TgLinkError::Host => "Custom emoji URL must have host \"emoji\"",
            TgLinkError::Parameter => "Custom emoji URL must have an emoji identifier",
        })
    })?;
    to_integer_safe(value)
        .filter(|&id| id != 0)
        .map(CustomEmojiId)
        .ok_or_else(|| Error::rejected("Invalid custom emoji identifier specified"))
}
