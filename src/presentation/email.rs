//! Transactional email templates.
//!
//! Each message is rendered twice from the same view: an HTML body with
//! auto-escaping and a plain-text alternative.

use askama::{Error as AskamaError, Template};
use thiserror::Error;

pub const SUMMARY_FALLBACK: &str = "Read the full article to learn more.";

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
#[error("failed to render `{template}` email")]
pub struct EmailRenderError {
    pub template: &'static str,
    #[source]
    pub error: AskamaError,
}

#[derive(Debug, Clone)]
pub struct NewArticleView {
    pub site_name: String,
    pub title: String,
    pub summary: String,
    pub post_url: String,
    pub unsubscribe_url: String,
}

#[derive(Debug, Clone)]
pub struct ConfirmationView {
    pub site_name: String,
    pub unsubscribe_url: String,
}

#[derive(Template)]
#[template(path = "email/new_article.html")]
struct NewArticleHtml<'a> {
    view: &'a NewArticleView,
}

#[derive(Template)]
#[template(path = "email/new_article.txt")]
struct NewArticleText<'a> {
    view: &'a NewArticleView,
}

#[derive(Template)]
#[template(path = "email/subscription_confirmation.html")]
struct ConfirmationHtml<'a> {
    view: &'a ConfirmationView,
}

#[derive(Template)]
#[template(path = "email/subscription_confirmation.txt")]
struct ConfirmationText<'a> {
    view: &'a ConfirmationView,
}

pub fn unsubscribe_url(base_url: &str, token: &str) -> String {
    format!("{}/unsubscribe?token={token}", base_url.trim_end_matches('/'))
}

pub fn post_url(base_url: &str, locale: &str, slug: &str) -> String {
    format!("{}/{locale}/posts/{slug}", base_url.trim_end_matches('/'))
}

pub fn render_new_article(view: &NewArticleView) -> Result<EmailMessage, EmailRenderError> {
    let wrap = |error| EmailRenderError {
        template: "new_article",
        error,
    };
    Ok(EmailMessage {
        subject: format!("New Article: {}", view.title),
        html: NewArticleHtml { view }.render().map_err(wrap)?,
        text: NewArticleText { view }.render().map_err(wrap)?.trim().to_string(),
    })
}

pub fn render_confirmation(view: &ConfirmationView) -> Result<EmailMessage, EmailRenderError> {
    let wrap = |error| EmailRenderError {
        template: "subscription_confirmation",
        error,
    };
    Ok(EmailMessage {
        subject: format!("Welcome to {} - Confirm Your Subscription", view.site_name),
        html: ConfirmationHtml { view }.render().map_err(wrap)?,
        text: ConfirmationText { view }
            .render()
            .map_err(wrap)?
            .trim()
            .to_string(),
    })
}
