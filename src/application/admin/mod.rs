//! Application services for the administrative surface.

pub mod activity;
pub mod posts;
pub mod taxonomy;
