//! # layer-entities
//!
//! Telegram message entities: the offset-addressed spans that make a plain
//! message text bold, linked, mentioned or quoted.
//!
//! ## Features
//! - Detection of mentions, hashtags, cashtags, bot commands, URLs, e-mail
//!   addresses, bank card numbers and media timestamps
//! - Markdown (legacy and V2), HTML and the round-trip-safe Markdown V3
//! - Validation and deterministic repair of overlapping or badly nested
//!   entities
//! - [`fix_formatted_text`], the gate every text passes before it is sent
//!
//! All offsets and lengths in the public API count UTF-16 code units.
//!
//! ```rust
//! use layer_entities::{EntityType, MessageEntity, parse_markdown_v2};
//!
//! let mut text = String::from("*bold* and __underline__");
//! let entities = parse_markdown_v2(&mut text).unwrap();
//! assert_eq!(text, "bold and underline");
//! assert_eq!(entities, [
//!     MessageEntity::new(EntityType::Bold, 0, 4),
//!     MessageEntity::new(EntityType::Underline, 9, 9),
//! ]);
//! ```

#![deny(unsafe_code)]

mod algebra;
mod clean;
mod context;
mod entity;
mod errors;
mod formatted_text;
mod html;
mod links;
mod markdown;
mod markdown_v3;
mod tld;
mod unicode;
pub mod limits;
pub mod matchers;
pub mod validators;

pub use algebra::{are_entities_valid, find_entities, fix_entities, remove_empty_entities};
pub use clean::{clean_input_string, is_empty_string, replace_offending_characters};
pub use context::{Context, InputUser, PeerPolicy, SecretChatLayer, StickerPolicy, UserResolver};
pub use entity::{
    CustomEmojiId, EntityType, FormattedText, MessageEntity, UserId, compare_entities, sort_entities,
};
pub use errors::{Error, Result};
pub use formatted_text::{
    FixOptions, fix_formatted_text, get_first_url, get_input_entities, get_message_text, has_bot_commands,
    has_media_timestamps, is_visible_url, remove_premium_custom_emoji_entities, remove_unallowed_entities,
    truncate_formatted_text, validate_user_entities,
};
pub use html::parse_html;
pub use links::{LinkChecker, Links, get_checked_link, get_link_custom_emoji_id, get_link_user_id};
pub use markdown::{parse_markdown, parse_markdown_v2};
pub use markdown_v3::{get_markdown_v3, parse_markdown_v3};
pub use unicode::utf16_len;
