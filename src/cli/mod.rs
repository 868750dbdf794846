//! Interactive shell over the screens.
//!
//! Lines are read with rustyline and each command runs to completion on the shell's runtime
//! before the next prompt. Post bodies are only ever printed in their sanitized form.

pub mod outputformatter;

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::api::{ApiClient, Credentials, PostDraft, SignUpForm};
use crate::error::{AppError, AppResult};
use crate::screens::{AuthScreen, CommentsScreen, Confirm, EditorScreen, HomeScreen, Navigation, PostDetailScreen};

pub const HELP: &str = "Commands:
  posts                      list posts (pinned first)
  show <id>                  show a post with its comments
  new                        write a new post
  edit <id>                  edit one of your posts
  delete <id>                delete one of your posts (asks first)
  pin <id>                   pin or unpin a post (administrators)
  comment <post_id> [text]   add a comment
  comment-edit <id> [text]   change one of your comments
  comment-delete <id>        delete one of your comments (asks first)
  signup                     create an account
  signin                     sign in
  signout                    sign out
  whoami                     show the signed-in user
  status                     show backend and session state
  help                       show this help
  quit | exit                leave the shell

While writing a post body, finish with a line containing only '.'.
Inside the body, 'upload <path>' uploads an image and inserts it.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Posts,
    Show(i64),
    New,
    Edit(i64),
    Delete(i64),
    Pin(i64),
    Comment(i64, Option<String>),
    CommentEdit(i64, Option<String>),
    CommentDelete(i64),
    SignUp,
    SignIn,
    SignOut,
    WhoAmI,
    Status,
    Help,
    Quit,
}

fn parse_id(cmd: &str, arg: Option<&str>) -> std::result::Result<i64, String> {
    let raw = arg.ok_or_else(|| format!("usage: {} <id>", cmd))?;
    raw.parse::<i64>().map_err(|_| format!("{}: '{}' is not a valid id", cmd, raw))
}

fn rest_text(rest: Option<&str>) -> Option<String> {
    rest.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Parse one input line. Command words are case-insensitive.
pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, Some(r.trim())),
        None => (line, None),
    };
    let word = word.to_ascii_lowercase();
    // first token of the remainder, with whatever follows it
    let (arg, tail) = match rest {
        Some(r) => match r.split_once(char::is_whitespace) {
            Some((a, t)) => (Some(a), Some(t)),
            None => (Some(r).filter(|s| !s.is_empty()), None),
        },
        None => (None, None),
    };
    Ok(match word.as_str() {
        "posts" | "home" | "ls" => Command::Posts,
        "show" => Command::Show(parse_id("show", arg)?),
        "new" => Command::New,
        "edit" => Command::Edit(parse_id("edit", arg)?),
        "delete" => Command::Delete(parse_id("delete", arg)?),
        "pin" => Command::Pin(parse_id("pin", arg)?),
        "comment" => Command::Comment(parse_id("comment", arg)?, rest_text(tail)),
        "comment-edit" => Command::CommentEdit(parse_id("comment-edit", arg)?, rest_text(tail)),
        "comment-delete" => Command::CommentDelete(parse_id("comment-delete", arg)?),
        "signup" => Command::SignUp,
        "signin" | "login" => Command::SignIn,
        "signout" | "logout" => Command::SignOut,
        "whoami" => Command::WhoAmI,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{}', type 'help'", other)),
    })
}

/// Confirmation read from the terminal; anything but y/yes declines.
struct PromptConfirm<'a>(&'a mut DefaultEditor);

impl Confirm for PromptConfirm<'_> {
    fn confirm(&mut self, prompt: &str) -> bool {
        match self.0.readline(&format!("{} [y/N] ", prompt)) {
            Ok(ans) => matches!(ans.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

pub struct Shell {
    rt: tokio::runtime::Runtime,
    editor: DefaultEditor,
    api: ApiClient,
    storage_path: PathBuf,
    auth: AuthScreen,
    home: HomeScreen,
    detail: PostDetailScreen,
    posts: EditorScreen,
    comments: CommentsScreen,
}

impl Shell {
    pub fn new(rt: tokio::runtime::Runtime, api: ApiClient, storage_path: PathBuf) -> Result<Self> {
        let editor = DefaultEditor::new().context("failed to open the terminal for line editing")?;
        Ok(Self {
            rt,
            editor,
            auth: AuthScreen::new(api.clone()),
            home: HomeScreen::new(api.clone()),
            detail: PostDetailScreen::new(api.clone()),
            posts: EditorScreen::new(api.clone()),
            comments: CommentsScreen::new(api.clone()),
            api,
            storage_path,
        })
    }

    /// Restore any stored session, then read commands until quit or end of input.
    pub fn run(&mut self) -> Result<()> {
        self.api.session().initialize()?;
        match self.api.session().current() {
            Some(s) => println!("postboard: signed in as {}. Type 'help' for commands.", s.subject()),
            None => println!("postboard: not signed in. Type 'help' for commands."),
        }
        self.navigate(Navigation::Home);
        loop {
            let line = match self.editor.readline("postboard> ") {
                Ok(l) => l,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            if line.trim().is_empty() { continue; }
            let _ = self.editor.add_history_entry(line.as_str());
            let cmd = match parse_command(&line) {
                Ok(c) => c,
                Err(msg) => { eprintln!("{}", msg); continue; }
            };
            if cmd == Command::Quit { break; }
            tracing::debug!(target: "postboard::cli", "command {:?}", cmd);
            match self.dispatch(cmd) {
                Ok(nav) => self.navigate(nav),
                Err(e) => self.report(&e),
            }
        }
        Ok(())
    }

    fn wait<F: Future>(&self, fut: F) -> F::Output {
        eprintln!("loading...");
        self.rt.block_on(fut)
    }

    fn report(&self, err: &AppError) {
        tracing::debug!(target: "postboard::cli", "action failed: {}", err);
        eprintln!("error: {}", err.inline_message());
        if Navigation::after_error(err) == Navigation::SignIn {
            println!("You are signed out. Run 'signin' to continue.");
        }
    }

    fn navigate(&mut self, nav: Navigation) {
        let shown = match nav {
            Navigation::Home => self.show_home(),
            Navigation::Post(id) => self.show_post(id),
            Navigation::EditPost(id) => self.edit_post(id).map(|next| self.navigate(next)),
            Navigation::SignIn => { println!("Run 'signin' to sign in."); Ok(()) }
            Navigation::Stay => Ok(()),
        };
        if let Err(e) = shown { self.report(&e); }
    }

    fn show_home(&self) -> AppResult<()> {
        let view = self.wait(self.home.load())?;
        println!("{}", outputformatter::render_home(&view));
        Ok(())
    }

    fn show_post(&self, id: i64) -> AppResult<()> {
        let view = self.wait(self.detail.load(id))?;
        println!("{}", outputformatter::render_post(&view));
        Ok(())
    }

    fn dispatch(&mut self, cmd: Command) -> AppResult<Navigation> {
        match cmd {
            Command::Posts => Ok(Navigation::Home),
            Command::Show(id) => Ok(Navigation::Post(id)),
            Command::New => {
                self.api.session().require_active()?;
                let draft = self.read_draft(&PostDraft::default())?;
                self.wait(self.posts.create(&draft))
            }
            Command::Edit(id) => Ok(Navigation::EditPost(id)),
            Command::Delete(id) => {
                let mut confirm = PromptConfirm(&mut self.editor);
                eprintln!("loading...");
                self.rt.block_on(self.detail.delete(id, &mut confirm))
            }
            Command::Pin(id) => {
                let post = self.wait(self.api.get_post(id))?;
                let pinned = self.wait(self.detail.toggle_pin(id, post.is_pinned))?;
                println!("post {} {}", id, if pinned { "pinned" } else { "unpinned" });
                Ok(Navigation::Post(id))
            }
            Command::Comment(post_id, text) => {
                self.api.session().require_active()?;
                let text = self.text_or_prompt(text, "comment: ")?;
                self.wait(self.comments.create(post_id, &text))?;
                Ok(Navigation::Post(post_id))
            }
            Command::CommentEdit(id, text) => {
                self.api.session().require_active()?;
                let text = self.text_or_prompt(text, "new text: ")?;
                self.wait(self.comments.update(id, &text))?;
                println!("comment {} updated", id);
                Ok(Navigation::Stay)
            }
            Command::CommentDelete(id) => {
                let mut confirm = PromptConfirm(&mut self.editor);
                eprintln!("loading...");
                if self.rt.block_on(self.comments.delete(id, &mut confirm))? {
                    println!("comment {} deleted", id);
                }
                Ok(Navigation::Stay)
            }
            Command::SignUp => {
                let username = self.prompt("username: ")?;
                let password = self.prompt("password: ")?;
                let email = self.prompt("email (optional): ")?;
                let form = SignUpForm { username, password, email: Some(email) };
                let nav = self.wait(self.auth.sign_up(form))?;
                println!("account created");
                Ok(nav)
            }
            Command::SignIn => {
                let username = self.prompt("username: ")?;
                let password = self.prompt("password: ")?;
                let nav = self.wait(self.auth.sign_in(&Credentials { username, password }))?;
                if let Some(s) = self.api.session().current() { println!("signed in as {}", s.subject()); }
                Ok(nav)
            }
            Command::SignOut => {
                let nav = self.auth.sign_out()?;
                println!("signed out");
                Ok(nav)
            }
            Command::WhoAmI => {
                match self.api.session().current() {
                    Some(s) => {
                        let role = if s.is_admin() { "administrator" } else { "user" };
                        println!("{} ({}), session expires {}", s.subject(), role, format_epoch(s.expires_at()));
                    }
                    None => println!("not signed in"),
                }
                Ok(Navigation::Stay)
            }
            Command::Status => {
                let session = self.api.session();
                let state = match session.current() {
                    Some(s) if session.is_expired(s.token()) => format!("{} (expired)", s.subject()),
                    Some(s) => s.subject().to_string(),
                    None => "signed out".to_string(),
                };
                println!("backend: {}\nstorage: {}\nsession: {}", self.api.base(), self.storage_path.display(), state);
                Ok(Navigation::Stay)
            }
            Command::Help => { println!("{}", HELP); Ok(Navigation::Stay) }
            Command::Quit => Ok(Navigation::Stay),
        }
    }

    fn edit_post(&mut self, id: i64) -> AppResult<Navigation> {
        let current = self.wait(self.posts.load_for_edit(id))?;
        let draft = self.read_draft(&current)?;
        self.wait(self.posts.update(id, &draft))
    }

    fn prompt(&mut self, label: &str) -> AppResult<String> {
        self.editor.readline(label).map_err(readline_error)
    }

    fn text_or_prompt(&mut self, text: Option<String>, label: &str) -> AppResult<String> {
        match text {
            Some(t) => Ok(t),
            None => self.prompt(label),
        }
    }

    /// Title, then body lines until a lone '.'. An untouched body keeps the existing one.
    fn read_draft(&mut self, existing: &PostDraft) -> AppResult<PostDraft> {
        let title = self.editor.readline_with_initial("title: ", (existing.title.as_str(), "")).map_err(readline_error)?;
        if !existing.content.is_empty() {
            println!("current body:\n{}\n(enter a new body, or '.' alone to keep it)", existing.content);
        }
        let mut content = String::new();
        loop {
            let line = self.prompt("| ")?;
            if line.trim() == "." { break; }
            if let Some(path) = line.trim().strip_prefix("upload ") {
                match self.wait(self.posts.upload_image(Path::new(path.trim()), &content)) {
                    Ok(next) => { content = next; println!("image inserted"); }
                    Err(e) => {
                        self.report(&e);
                        if e.requires_sign_in() { return Err(e); }
                    }
                }
                continue;
            }
            content.push_str(&line);
            content.push('\n');
        }
        if content.trim().is_empty() && !existing.content.is_empty() {
            content = existing.content.clone();
        }
        let draft = PostDraft { title, content };
        EditorScreen::validate(&draft)?;
        Ok(draft)
    }
}

fn readline_error(e: ReadlineError) -> AppError {
    match e {
        ReadlineError::Interrupted | ReadlineError::Eof => AppError::user("cancelled", "input cancelled"),
        other => AppError::io("terminal".to_string(), other.to_string()),
    }
}

fn format_epoch(secs: i64) -> String {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}
