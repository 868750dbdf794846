use crate::api::ApiClient;
use crate::error::AppResult;

use super::{require, Confirm};

#[derive(Debug, Clone)]
pub struct CommentsScreen {
    api: ApiClient,
}

impl CommentsScreen {
    pub fn new(api: ApiClient) -> Self { Self { api } }

    pub async fn create(&self, post_id: i64, content: &str) -> AppResult<()> {
        require("Comment", content)?;
        self.api.create_comment(post_id, content).await
    }

    pub async fn update(&self, comment_id: i64, content: &str) -> AppResult<()> {
        require("Comment", content)?;
        self.api.update_comment(comment_id, content).await
    }

    /// Returns false when the user declined and nothing was sent.
    pub async fn delete<C: Confirm>(&self, comment_id: i64, confirm: &mut C) -> AppResult<bool> {
        if !confirm.confirm("Delete this comment?") { return Ok(false); }
        self.api.delete_comment(comment_id).await?;
        Ok(true)
    }
}
