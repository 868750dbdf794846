//! Allow-list sanitization of user-authored markup.
//!
//! Policies are immutable values; the two presets used by the screens are built once and shared.

mod policy;
mod sanitize;

pub use policy::{image_insert_policy, post_body_policy, SanitizationPolicy};
pub use sanitize::{image_tag, sanitize};
