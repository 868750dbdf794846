use std::path::Path;

use crate::api::{ApiClient, Comment, Post, PostDraft};
use crate::content::{image_tag, post_body_policy, sanitize};
use crate::error::{AppError, AppResult};

use super::{require, Confirm, Navigation};

#[derive(Debug, Clone)]
pub struct HomeView {
    /// Pinned posts first, backend order otherwise.
    pub posts: Vec<Post>,
    /// Subject of the signed-in viewer, if any.
    pub viewer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HomeScreen {
    api: ApiClient,
}

impl HomeScreen {
    pub fn new(api: ApiClient) -> Self { Self { api } }

    pub async fn load(&self) -> AppResult<HomeView> {
        let mut posts = self.api.list_posts().await?;
        posts.sort_by_key(|p| !p.is_pinned);
        let viewer = self.api.session().current().map(|s| s.subject().to_string());
        Ok(HomeView { posts, viewer })
    }
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    /// Sanitized comment body.
    pub body: String,
    pub can_modify: bool,
}

#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    /// Sanitized post body; the only form of the content that may be rendered.
    pub body: String,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    /// Display hint only; the backend decides whether pinning is allowed.
    pub can_pin: bool,
    pub can_comment: bool,
}

#[derive(Debug, Clone)]
pub struct PostDetailScreen {
    api: ApiClient,
}

impl PostDetailScreen {
    pub fn new(api: ApiClient) -> Self { Self { api } }

    /// Post and comments are fetched concurrently; a failed comment fetch shows an empty list.
    pub async fn load(&self, id: i64) -> AppResult<PostView> {
        let (post, comments) = tokio::join!(self.api.get_post(id), self.api.list_comments(id));
        let post = post?;
        let comments = comments.unwrap_or_else(|e| {
            tracing::warn!(target: "postboard::cli", "comments for post {} unavailable: {}", id, e);
            Vec::new()
        });

        let viewer = self.api.session().current();
        let subject = viewer.as_ref().map(|s| s.subject().to_string());
        let is_owner = |author: &str| subject.as_deref() == Some(author);

        let comments = comments
            .into_iter()
            .map(|c| CommentView {
                body: sanitize(&c.content, post_body_policy()),
                can_modify: is_owner(&c.username),
                comment: c,
            })
            .collect();
        Ok(PostView {
            body: sanitize(&post.content, post_body_policy()),
            can_edit: is_owner(&post.username),
            can_pin: viewer.as_ref().map(|s| s.is_admin()).unwrap_or(false),
            can_comment: viewer.is_some(),
            comments,
            post,
        })
    }

    pub async fn delete<C: Confirm>(&self, id: i64, confirm: &mut C) -> AppResult<Navigation> {
        if !confirm.confirm("Delete this post?") { return Ok(Navigation::Stay); }
        self.api.delete_post(id).await?;
        Ok(Navigation::Home)
    }

    /// Flip the pinned flag; returns the new state.
    pub async fn toggle_pin(&self, id: i64, currently_pinned: bool) -> AppResult<bool> {
        let next = !currently_pinned;
        self.api.set_pinned(id, next).await?;
        Ok(next)
    }
}

#[derive(Debug, Clone)]
pub struct EditorScreen {
    api: ApiClient,
}

impl EditorScreen {
    pub fn new(api: ApiClient) -> Self { Self { api } }

    pub fn validate(draft: &PostDraft) -> AppResult<()> {
        require("Title", &draft.title)?;
        require("Content", &draft.content)
    }

    pub async fn create(&self, draft: &PostDraft) -> AppResult<Navigation> {
        Self::validate(draft)?;
        self.api.create_post(draft).await?;
        Ok(Navigation::Home)
    }

    /// The auth gate runs before the fetch; only the author gets a draft back.
    pub async fn load_for_edit(&self, id: i64) -> AppResult<PostDraft> {
        let sess = self.api.session().require_active()?;
        let post = self.api.get_post_authed(id).await?;
        if post.username != sess.subject() {
            return Err(AppError::user("not_owner", "You do not have permission to edit this post."));
        }
        Ok(PostDraft { title: post.title, content: post.content })
    }

    pub async fn update(&self, id: i64, draft: &PostDraft) -> AppResult<Navigation> {
        Self::validate(draft)?;
        self.api.update_post(id, draft).await?;
        Ok(Navigation::Post(id))
    }

    /// Upload `path` and return `content` with the image tag appended on its own line.
    pub async fn upload_image(&self, path: &Path, content: &str) -> AppResult<String> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::user("bad_file".to_string(), format!("not a file: {}", path.display())))?;
        let bytes = tokio::fs::read(path).await?;
        let url = self.api.upload_image(file_name, bytes).await?;
        let tag = image_tag(&url)?;
        Ok(format!("{}\n{}\n", content, tag))
    }
}
