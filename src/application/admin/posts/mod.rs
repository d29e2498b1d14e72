mod commands;
mod service;
pub mod types;


pub use service::*;
pub use types::{
    AdminPostError, CreatePostCommand, PostSummarySnapshot, UpdatePostCommand, parse_post_id,
    should_notify,
};
