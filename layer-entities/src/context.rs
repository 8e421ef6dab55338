//! Collaborators the façade consults while validating client entities.
//!
//! None of them is required: a [`Context::default`] checks links with the
//! built-in [`Links`] rules and trusts every user id and custom emoji.

use crate::entity::{CustomEmojiId, UserId};
use crate::errors::Result;
use crate::links::{LinkChecker, Links};

// ─── Users ────────────────────────────────────────────────────────────────────

/// What a MentionName entity carries on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputUser {
    pub user_id:     UserId,
    pub access_hash: i64,
}

/// Resolves users for MentionName entities.
pub trait UserResolver {
    /// Fails if the user is unknown or cannot be mentioned.
    fn get_input_user(&self, user_id: UserId) -> Result<InputUser>;
}

// ─── Stickers ─────────────────────────────────────────────────────────────────

/// Decides which custom emoji need Premium.
pub trait StickerPolicy {
    fn is_premium_custom_emoji(&self, custom_emoji_id: CustomEmojiId, treat_unknown_as_premium: bool) -> bool;
}

// ─── Peers ────────────────────────────────────────────────────────────────────

/// Secret chat protocol layers that changed the set of supported entities.
pub struct SecretChatLayer;

impl SecretChatLayer {
    /// Underline, strikethrough and blockquotes.
    pub const NEW_ENTITIES: i32 = 101;
    /// Spoilers and custom emoji.
    pub const SPOILER_AND_CUSTOM_EMOJI_ENTITIES: i32 = 144;
}

/// What the receiving chat can display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerPolicy {
    /// Layer of the secret chat, `None` for cloud chats.
    pub secret_chat_layer:            Option<i32>,
    pub can_use_premium_custom_emoji: bool,
}

impl Default for PeerPolicy {
    fn default() -> Self {
        Self { secret_chat_layer: None, can_use_premium_custom_emoji: true }
    }
}

impl PeerPolicy {
    pub fn secret_chat(layer: i32) -> Self {
        Self { secret_chat_layer: Some(layer), ..Self::default() }
    }

    pub fn can_use_premium_custom_emoji(mut self, v: bool) -> Self {
        self.can_use_premium_custom_emoji = v; self
    }
}

// ─── Context ──────────────────────────────────────────────────────────────────

static BUILT_IN_LINKS: Links = Links;

/// The capability set handed to the façade.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub links:    &'a dyn LinkChecker,
    pub users:    Option<&'a dyn UserResolver>,
    pub stickers: Option<&'a dyn StickerPolicy>,
}

impl Default for Context<'_> {
    fn default() -> Self {
        Self { links: &BUILT_IN_LINKS, users: None, stickers: None }
    }
}

impl<'a> Context<'a> {
    pub fn new(links: &'a dyn LinkChecker) -> Self {
        Self { links, users: None, stickers: None }
    }

    pub fn users(mut self, users: &'a dyn UserResolver) -> Self {
        self.users = Some(users); self
    }

    pub fn stickers(mut self, stickers: &'a dyn StickerPolicy) -> Self {
        self.stickers = Some(stickers); self
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("users", &self.users.is_some())
            .field("stickers", &self.stickers.is_some())
            .finish_non_exhaustive()
    }
}
