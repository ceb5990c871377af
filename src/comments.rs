use std::collections::HashMap;

use crate::format::{escape_attr, escape_text, signed_score, Formatter};
use crate::reddit::Comment;
use crate::template;

/// Comments scoring below this start out collapsed.
pub const COLLAPSE_BELOW: i64 = -4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentClass {
    Comment,
    Reply,
}

impl CommentClass {
    fn as_str(self) -> &'static str {
        match self {
            CommentClass::Comment => "comment",
            CommentClass::Reply => "reply",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentNode {
    pub name: String,
    pub parent_id: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub created_utc: f64,
    pub class: CommentClass,
    pub collapsed: bool,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Comment thread of one link, flattened into an arena.
///
/// Nodes are appended in pre-order, so a parent always has a lower index than its
/// replies. Bodiless comments (deleted, removed, `more` stubs) never enter the arena
/// and neither do their replies.
#[derive(Debug, Clone, Default)]
pub struct CommentTree {
    op: String,
    nodes: Vec<CommentNode>,
    roots: Vec<usize>,
    by_name: HashMap<String, usize>,
}

impl CommentTree {
    pub fn new(op: &str) -> Self {
        Self {
            op: op.to_string(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn get(&self, name: &str) -> Option<&CommentNode> {
        self.by_name.get(name).map(|&idx| &self.nodes[idx])
    }

    pub fn node(&self, idx: usize) -> Option<&CommentNode> {
        self.nodes.get(idx)
    }

    /// Adds a top-level comment and its reply tree. Returns the new node's index, or
    /// `None` when the comment has no body.
    pub fn format_comment(&mut self, comment: &Comment) -> Option<usize> {
        let idx = self.insert(comment, CommentClass::Comment, None)?;
        self.roots.push(idx);
        self.append_replies(comment);
        Some(idx)
    }

    /// Attaches a single comment under the node named by its `parent_id`, or as a
    /// top-level comment when no such node exists.
    pub fn attach(&mut self, comment: &Comment) -> Option<usize> {
        match self.by_name.get(&comment.parent_id).copied() {
            Some(parent) => {
                let idx = self.insert(comment, CommentClass::Reply, Some(parent))?;
                self.nodes[parent].children.push(idx);
                Some(idx)
            }
            None => {
                let idx = self.insert(comment, CommentClass::Comment, None)?;
                self.roots.push(idx);
                Some(idx)
            }
        }
    }

    fn append_replies(&mut self, comment: &Comment) {
        let Some(replies) = comment.replies.as_ref() else {
            return;
        };
        for thing in &replies.children {
            let reply = &thing.data;
            if reply.body.is_none() {
                continue;
            }
            // replies are linked by parent_id; one whose parent never made it in is dropped
            let Some(parent) = self.by_name.get(&reply.parent_id).copied() else {
                continue;
            };
            let Some(idx) = self.insert(reply, CommentClass::Reply, Some(parent)) else {
                continue;
            };
            self.nodes[parent].children.push(idx);
            self.append_replies(reply);
        }
    }

    fn insert(
        &mut self,
        comment: &Comment,
        class: CommentClass,
        parent: Option<usize>,
    ) -> Option<usize> {
        let body = comment.body.as_ref()?;
        let score = comment.score();
        let idx = self.nodes.len();
        self.nodes.push(CommentNode {
            name: comment.name.clone(),
            parent_id: comment.parent_id.clone(),
            author: comment.author.clone(),
            body: body.clone(),
            score,
            created_utc: comment.created_utc,
            class,
            collapsed: score < COLLAPSE_BELOW,
            parent,
            children: Vec::new(),
        });
        self.by_name.insert(comment.name.clone(), idx);
        Some(idx)
    }

    /// Flips a comment between expanded and collapsed. Returns the new collapsed state.
    pub fn toggle(&mut self, name: &str) -> Option<bool> {
        let idx = *self.by_name.get(name)?;
        let node = &mut self.nodes[idx];
        node.collapsed = !node.collapsed;
        Some(node.collapsed)
    }

    /// Whether the node is shown, i.e. no ancestor is collapsed.
    pub fn is_visible(&self, name: &str) -> bool {
        let Some(&idx) = self.by_name.get(name) else {
            return false;
        };
        let mut current = self.nodes[idx].parent;
        while let Some(parent) = current {
            if self.nodes[parent].collapsed {
                return false;
            }
            current = self.nodes[parent].parent;
        }
        true
    }

    pub fn render(&self, formatter: &Formatter) -> String {
        let mut out = String::new();
        for &root in &self.roots {
            out.push_str(&self.render_node(root, formatter));
        }
        out
    }

    fn render_node(&self, idx: usize, formatter: &Formatter) -> String {
        let node = &self.nodes[idx];
        let replies: String = node
            .children
            .iter()
            .map(|&child| self.render_node(child, formatter))
            .collect();

        let author = escape_text(&node.author);
        let author = if node.author == self.op {
            format!(r#"<span class="op">{}</span>"#, author)
        } else {
            author
        };

        template::comment(&template::CommentView {
            name: &escape_attr(&node.name),
            class: node.class.as_str(),
            author: &author,
            score: &signed_score(node.score),
            time: &formatter.relative_time(node.created_utc),
            body: &formatter.markdown().render(&node.body),
            collapsed: node.collapsed,
            replies: &replies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reddit::{Listing, Thing};
    use chrono::{TimeZone, Utc};

    fn comment(name: &str, parent: &str, author: &str, ups: i64, downs: i64) -> Comment {
        Comment {
            name: name.into(),
            id: String::new(),
            parent_id: parent.into(),
            author: author.into(),
            body: Some(format!("body of {name}")),
            ups,
            downs,
            likes: None,
            created_utc: 0.0,
            replies: None,
        }
    }

    fn with_replies(mut parent: Comment, replies: Vec<Comment>) -> Comment {
        parent.replies = Some(Box::new(Listing {
            after: None,
            before: None,
            children: replies
                .into_iter()
                .map(|data| Thing {
                    kind: "t1".into(),
                    data,
                })
                .collect(),
        }));
        parent
    }

    fn formatter() -> Formatter {
        Formatter::at(Utc.timestamp_opt(3600, 0).unwrap())
    }

    #[test]
    fn bodiless_comment_renders_nothing_and_skips_replies() {
        let mut deleted = with_replies(
            comment("t1_a", "t3_x", "[deleted]", 1, 0),
            vec![comment("t1_b", "t1_a", "bob", 1, 0)],
        );
        deleted.body = None;

        let mut tree = CommentTree::new("alice");
        assert_eq!(tree.format_comment(&deleted), None);
        assert!(tree.is_empty());
        assert!(tree.get("t1_b").is_none());
        assert_eq!(tree.render(&formatter()), "");
    }

    #[test]
    fn bodiless_reply_drops_its_subtree() {
        let mut removed = with_replies(
            comment("t1_b", "t1_a", "bob", 1, 0),
            vec![comment("t1_c", "t1_b", "carol", 1, 0)],
        );
        removed.body = None;
        let root = with_replies(comment("t1_a", "t3_x", "alice", 1, 0), vec![removed]);

        let mut tree = CommentTree::new("alice");
        tree.format_comment(&root);
        assert_eq!(tree.len(), 1);
        assert!(tree.get("t1_c").is_none());
    }

    #[test]
    fn replies_attach_under_their_parent_in_preorder() {
        let root = with_replies(
            comment("t1_a", "t3_x", "alice", 1, 0),
            vec![
                with_replies(
                    comment("t1_b", "t1_a", "bob", 1, 0),
                    vec![comment("t1_c", "t1_b", "carol", 1, 0)],
                ),
                comment("t1_d", "t1_a", "dave", 1, 0),
            ],
        );

        let mut tree = CommentTree::new("alice");
        let idx = tree.format_comment(&root).unwrap();
        assert_eq!(tree.roots(), &[idx]);

        let order: Vec<&str> = (0..tree.len())
            .map(|i| tree.node(i).unwrap().name.as_str())
            .collect();
        assert_eq!(order, vec!["t1_a", "t1_b", "t1_c", "t1_d"]);

        let a = tree.get("t1_a").unwrap();
        assert_eq!(a.children, vec![1, 3]);
        assert_eq!(tree.get("t1_c").unwrap().parent, Some(1));
        assert_eq!(tree.get("t1_b").unwrap().class, CommentClass::Reply);

        let html = tree.render(&formatter());
        let pos = |needle: &str| html.find(needle).unwrap();
        assert!(pos(r#"id="t1_a""#) < pos(r#"id="t1_b""#));
        assert!(pos(r#"id="t1_b""#) < pos(r#"id="t1_c""#));
        assert!(pos(r#"id="t1_c""#) < pos(r#"id="t1_d""#));
        assert!(html.contains(r#"<div id="t1_a" class="comment">"#));
        assert!(html.contains(r#"<div id="t1_d" class="reply">"#));
    }

    #[test]
    fn reply_with_unknown_parent_is_dropped() {
        let root = with_replies(
            comment("t1_a", "t3_x", "alice", 1, 0),
            vec![comment("t1_b", "t1_zzz", "bob", 1, 0)],
        );
        let mut tree = CommentTree::new("alice");
        tree.format_comment(&root);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn score_sign_and_op_marker() {
        let mut tree = CommentTree::new("alice");
        tree.format_comment(&comment("t1_a", "t3_x", "alice", 5, 2));
        tree.format_comment(&comment("t1_b", "t3_x", "bob", 2, 2));
        tree.format_comment(&comment("t1_c", "t3_x", "carol", 0, 3));

        let html = tree.render(&formatter());
        assert!(html.contains(r#"<span class="author"><span class="op">alice</span></span> <span class="score">+3</span>"#));
        assert!(html.contains(r#"<span class="author">bob</span> <span class="score">0</span>"#));
        assert!(html.contains(r#"<span class="score">-3</span>"#));
        assert!(html.contains("<p>body of t1_a</p>"));
        assert!(html.contains("an hour ago"));
    }

    #[test]
    fn low_scores_start_collapsed() {
        let mut tree = CommentTree::new("op");
        tree.format_comment(&comment("t1_a", "t3_x", "bob", 0, 5));
        tree.format_comment(&comment("t1_b", "t3_x", "bob", 0, 4));

        assert!(tree.get("t1_a").unwrap().collapsed);
        assert!(!tree.get("t1_b").unwrap().collapsed);
        let html = tree.render(&formatter());
        assert!(html.contains(template::ICON_COLLAPSED));
        assert!(html.contains(template::ICON_EXPANDED));
    }

    #[test]
    fn toggle_hides_and_shows_the_subtree() {
        let root = with_replies(
            comment("t1_a", "t3_x", "alice", 1, 0),
            vec![comment("t1_b", "t1_a", "bob", 1, 0)],
        );
        let mut tree = CommentTree::new("alice");
        tree.format_comment(&root);
        assert!(tree.is_visible("t1_b"));

        assert_eq!(tree.toggle("t1_a"), Some(true));
        assert!(!tree.is_visible("t1_b"));
        assert!(tree.is_visible("t1_a"));

        assert_eq!(tree.toggle("t1_a"), Some(false));
        assert!(tree.is_visible("t1_b"));
        assert_eq!(tree.toggle("t1_missing"), None);
    }

    #[test]
    fn attach_places_local_comment_under_parent() {
        let mut tree = CommentTree::new("alice");
        tree.format_comment(&comment("t1_a", "t3_x", "alice", 1, 0));

        let reply = tree.attach(&comment("replyt1_a", "t1_a", "me", 1, 0)).unwrap();
        assert_eq!(tree.get("t1_a").unwrap().children, vec![reply]);

        let top = tree.attach(&comment("replyt3_x", "t3_x", "me", 1, 0)).unwrap();
        assert_eq!(tree.roots(), &[0, top]);
    }
}
