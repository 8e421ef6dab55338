//! Server-side limits the client enforces before sending text.

/// Maximum size of a message text in bytes.
pub const MAX_TEXT_LENGTH: usize = 35_000;

/// Largest offset or length accepted from a caller-supplied entity.
pub const MAX_ENTITY_VALUE: i32 = 1_000_000;

/// Maximum number of formatting entities sent with one text; custom emoji
/// are not counted.
pub const MAX_INPUT_ENTITIES: usize = 100;

/// Maximum number of characters a hashtag may span.
pub const MAX_HASHTAG_LENGTH: usize = 256;

pub const MIN_MENTION_LENGTH: usize = 2;
pub const MAX_MENTION_LENGTH: usize = 32;

pub const MIN_BOT_COMMAND_LENGTH: usize = 1;
pub const MAX_BOT_COMMAND_LENGTH: usize = 64;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 32;
