//! Rendering of outbound content.

pub mod email;
