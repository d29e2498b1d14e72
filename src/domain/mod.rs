//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod localization;
pub mod recommendation;
pub mod slug;
pub mod subscriptions;
pub mod types;
