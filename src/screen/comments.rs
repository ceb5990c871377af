use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use super::{Event, Phase, Screen};
use crate::comments::CommentTree;
use crate::data::CommentService;
use crate::format::{escape_attr, escape_text, title_markup, Formatter};
use crate::navigator::{Action, ScreenRequest};
use crate::reddit::Link;
use crate::session::{ParentThing, SessionContext};
use crate::template;

pub struct CommentsScreen {
    request: ScreenRequest,
    link: Link,
    comments: Arc<dyn CommentService>,
    formatter: Formatter,
    header: String,
    tree: CommentTree,
    loading: bool,
    phase: Phase,
}

impl CommentsScreen {
    pub fn new(link: Link, comments: Arc<dyn CommentService>, formatter: Formatter) -> Self {
        let tree = CommentTree::new(&link.author);
        Self {
            request: ScreenRequest::Comments { link: link.clone() },
            link,
            comments,
            formatter,
            header: String::new(),
            tree,
            loading: false,
            phase: Phase::Created,
        }
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn tree(&self) -> &CommentTree {
        &self.tree
    }

    fn reply_to(&self, node: &str) -> Option<Action> {
        let parent = if node == self.link.name {
            ParentThing::Link(self.link.clone())
        } else {
            let comment = self.tree.get(node)?;
            ParentThing::Comment {
                name: comment.name.clone(),
                author: comment.author.clone(),
            }
        };
        Some(Action::PushScreen(ScreenRequest::Comment { parent }))
    }
}

impl Screen for CommentsScreen {
    fn request(&self) -> &ScreenRequest {
        &self.request
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn on_screen_ready(&mut self, session: &mut SessionContext) -> Result<()> {
        // the session copy carries locally added comments
        match session.comment.op.as_ref() {
            Some(op) if op.name == self.link.name => {
                self.link.num_comments = op.num_comments;
            }
            _ => session.comment.op = Some(self.link.clone()),
        }

        self.header = template::link_header(
            &escape_attr(&self.link.name),
            &title_markup(&self.link),
            &escape_text(&self.link.domain),
            self.link.num_comments,
        );
        self.phase = Phase::Ready;
        Ok(())
    }

    fn on_dom_ready(&mut self, session: &mut SessionContext) -> Result<()> {
        self.loading = true;
        info!(link = %self.link.name, "loading comments");
        let thread = match session.comment.thread.take() {
            Some(thread) if thread.link.name == self.link.name => {
                debug!(link = %self.link.name, "using prefetched thread");
                thread
            }
            _ => self.comments.load_comments(self.link.article_id())?,
        };

        self.tree = CommentTree::new(&self.link.author);
        for thing in &thread.comments.children {
            self.tree.format_comment(&thing.data);
        }
        if let Some(created) = session.comment.created.take() {
            debug!(name = %created.name, parent = %created.parent_id, "showing local comment");
            self.tree.attach(&created);
        }
        self.loading = false;
        self.phase = Phase::DomReady;
        Ok(())
    }

    fn on_unload(&mut self, _session: &mut SessionContext) {
        self.phase = Phase::Unloaded;
    }

    fn handle(&mut self, event: &Event, _session: &mut SessionContext) -> Result<Option<Action>> {
        let Event::Click { node, selector } = event else {
            return Ok(None);
        };
        match selector.as_str() {
            ".comment-header" => {
                self.tree.toggle(node);
                Ok(None)
            }
            ".reply" => Ok(self.reply_to(node)),
            _ => Ok(None),
        }
    }

    fn title(&self) -> String {
        html_escape::decode_html_entities(&self.link.title).into_owned()
    }

    fn render(&self) -> String {
        let loading = if self.loading {
            r#"<div id="loading">Loading...</div>"#
        } else {
            ""
        };
        format!(
            "{header}\n{loading}<div id=\"comments\">\n{comments}</div>",
            header = self.header,
            loading = loading,
            comments = self.tree.render(&self.formatter),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockCommentService;
    use crate::reddit::Comment;
    use crate::screen::testing;

    fn open(link: Link, session: &mut SessionContext) -> (CommentsScreen, Arc<MockCommentService>) {
        let service = Arc::new(MockCommentService::default());
        let mut screen = CommentsScreen::new(link, service.clone(), Formatter::default());
        screen.on_screen_ready(session).unwrap();
        screen.on_dom_ready(session).unwrap();
        (screen, service)
    }

    #[test]
    fn renders_header_and_thread() {
        let mut session = SessionContext::default();
        let link = testing::link("rustlang", "rust");
        let (screen, service) = open(link, &mut session);

        assert_eq!(service.loads(), 1);
        assert_eq!(session.comment.op.as_ref().unwrap().name, "t3_rustlang");
        let html = screen.render();
        assert!(html.contains(r#"<a href="http://example.com/rustlang">Post rustlang</a>"#));
        assert!(html.contains(r#"<span class="domain">example.com</span>"#));
        assert!(html.contains("2 comments"));
        assert!(html.contains(r#"id="t1_rustlang_c1""#));
        assert!(!html.contains("t1_rustlang_c2"));
        assert_eq!(screen.tree().len(), 3);
    }

    #[test]
    fn header_click_toggles_comment() {
        let mut session = SessionContext::default();
        let (mut screen, _) = open(testing::link("rustlang", "rust"), &mut session);

        let buried = "t1_rustlang_c3";
        assert!(screen.tree().get(buried).unwrap().collapsed);
        let action = screen
            .handle(&Event::click(buried, ".comment-header"), &mut session)
            .unwrap();
        assert!(action.is_none());
        assert!(!screen.tree().get(buried).unwrap().collapsed);
    }

    #[test]
    fn reply_clicks_open_the_composer() {
        let mut session = SessionContext::default();
        let link = testing::link("rustlang", "rust");
        let (mut screen, _) = open(link.clone(), &mut session);

        let on_link = screen
            .handle(&Event::click("t3_rustlang", ".reply"), &mut session)
            .unwrap();
        assert_eq!(
            on_link,
            Some(Action::PushScreen(ScreenRequest::Comment {
                parent: ParentThing::Link(link)
            }))
        );

        let on_comment = screen
            .handle(&Event::click("t1_rustlang_c1", ".reply"), &mut session)
            .unwrap();
        match on_comment {
            Some(Action::PushScreen(ScreenRequest::Comment {
                parent: ParentThing::Comment { name, .. },
            })) => assert_eq!(name, "t1_rustlang_c1"),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn locally_created_comment_is_attached_once() {
        let mut session = SessionContext::default();
        let mut op = testing::link("rustlang", "rust");
        op.num_comments = 3;
        session.comment.op = Some(op);
        session.comment.created = Some(Comment {
            name: "replyt1_rustlang_c1".into(),
            id: "replyt1_rustlang_c1".into(),
            parent_id: "t1_rustlang_c1".into(),
            author: "me".into(),
            body: Some("my reply".into()),
            ups: 1,
            downs: 0,
            likes: Some(true),
            created_utc: 0.0,
            replies: None,
        });

        let (screen, _) = open(testing::link("rustlang", "rust"), &mut session);
        assert!(session.comment.created.is_none());
        assert_eq!(screen.link().num_comments, 3);
        let created = screen.tree().get("replyt1_rustlang_c1").unwrap();
        let parent = screen.tree().get("t1_rustlang_c1").unwrap();
        assert_eq!(created.parent, Some(0));
        assert_eq!(parent.children.len(), 2);
        assert!(screen.render().contains("3 comments"));
    }
}
