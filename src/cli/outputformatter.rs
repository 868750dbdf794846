use crate::screens::{HomeView, PostView};

const MAX_COL_WIDTH: usize = 48;

// Render the home list as an ASCII table, pinned rows first as loaded.
pub fn render_home(view: &HomeView) -> String {
    if view.posts.is_empty() { return "no posts yet".to_string(); }
    let cols: Vec<String> = ["id", "title", "author", "pinned"].iter().map(|s| s.to_string()).collect();
    let rows: Vec<Vec<String>> = view
        .posts
        .iter()
        .map(|p| vec![p.id.to_string(), p.title.clone(), p.username.clone(), if p.is_pinned { "*".to_string() } else { String::new() }])
        .collect();

    let mut widths: Vec<usize> = cols.iter().map(|c| c.chars().count()).collect();
    for r in &rows {
        for (i, cell) in r.iter().enumerate() {
            let w = cell.chars().count();
            if w > widths[i] { widths[i] = w.min(MAX_COL_WIDTH); }
        }
    }

    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(sep.clone());
    out.push(build_row(&cols, &widths));
    out.push(sep.clone());
    for r in &rows { out.push(build_row(r, &widths)); }
    out.push(sep);
    out.join("\n")
}

// Post detail: sanitized body, then comments with their ids so they can be edited by id.
pub fn render_post(view: &PostView) -> String {
    let mut out = String::new();
    let pin = if view.post.is_pinned { " [pinned]" } else { "" };
    out.push_str(&format!("#{} {}{}\nby {}\n\n", view.post.id, view.post.title, pin, view.post.username));
    out.push_str(view.body.trim_end());
    out.push_str("\n\n");

    let mut actions = Vec::new();
    if view.can_edit { actions.push(format!("edit {0} | delete {0}", view.post.id)); }
    if view.can_pin { actions.push(format!("pin {}", view.post.id)); }
    if view.can_comment { actions.push(format!("comment {} <text>", view.post.id)); }
    if !actions.is_empty() {
        out.push_str(&format!("actions: {}\n", actions.join(" | ")));
    }

    out.push_str(&format!("-- comments ({}) --\n", view.comments.len()));
    for c in &view.comments {
        let mine = if c.can_modify { " (yours)" } else { "" };
        out.push_str(&format!("[{}] {}{}: {}\n", c.comment.id, c.comment.username, mine, c.body.trim()));
    }
    out
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        let pad = w.saturating_sub(text.chars().count());
        s.push(' ');
        if is_numeric_like(&cell) {
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(pad));
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Post;

    fn post(id: i64, title: &str, pinned: bool) -> Post {
        Post { id, title: title.to_string(), content: String::new(), username: "alice".to_string(), is_pinned: pinned }
    }

    #[test]
    fn table_has_header_and_rows() {
        let view = HomeView { posts: vec![post(2, "Pinned", true), post(10, "Hello", false)], viewer: None };
        let out = render_home(&view);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[1].contains("title"));
        assert!(lines[3].starts_with("|  2 | Pinned"));
        assert!(lines[3].contains('*'));
        assert!(lines[4].contains("Hello"));
    }

    #[test]
    fn long_titles_are_truncated() {
        let long = "x".repeat(100);
        let out = render_home(&HomeView { posts: vec![post(1, &long, false)], viewer: None });
        assert!(out.contains('…'));
        assert!(!out.contains(&long));
    }

    #[test]
    fn empty_list() {
        assert_eq!(render_home(&HomeView { posts: vec![], viewer: None }), "no posts yet");
    }
}
