//! Event-bus protocol shared by all runtime components.
//!
//! This module defines the message payloads exchanged between the viewport
//! source, the carousel window controllers, and the favorites runtime.

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Viewport(ViewportMessage),
    Favorites(FavoritesMessage),
}

/// Viewport notifications. Carries no geometry; subscribers re-measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportMessage {
    Resized,
}

/// Favorites-domain notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoritesMessage {
    /// Membership of `id` changed after a user action.
    StateChanged {
        id: String,
        favorited: bool,
        /// Collection size after the change.
        count: usize,
    },
}
