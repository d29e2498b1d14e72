//! Application services layer.

pub mod admin;
pub mod auth;
pub mod content;
pub mod error;
pub mod notifications;
pub mod related;
pub mod render;
pub mod repos;
pub mod sitemap;
pub mod subscriptions;
