//! Screen logic, independent of how the result is drawn.
//!
//! Each screen talks to the backend only through [`ApiClient`](crate::api::ApiClient) and returns
//! where the user should go next. Any `Auth` failure means the session is already gone and the
//! caller should show the sign-in screen.

mod auth;
mod comments;
mod posts;

pub use auth::AuthScreen;
pub use comments::CommentsScreen;
pub use posts::{CommentView, EditorScreen, HomeScreen, HomeView, PostDetailScreen, PostView};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Home,
    Post(i64),
    EditPost(i64),
    SignIn,
    Stay,
}

impl Navigation {
    /// Where to go after a failed action: sign-in for auth failures, otherwise stay and show
    /// the inline message.
    pub fn after_error(err: &AppError) -> Navigation {
        if err.requires_sign_in() { Navigation::SignIn } else { Navigation::Stay }
    }
}

/// Explicit user confirmation for destructive actions.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool { self(prompt) }
}

/// Blocks submission locally when a required field is blank.
pub(crate) fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::user("required_field".to_string(), format!("{} is required.", field)));
    }
    Ok(())
}
