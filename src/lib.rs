//! Localized blog backend: content accessors, admin CRUD, related-post
//! recommendations and subscriber notifications.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
