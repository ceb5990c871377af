use anyhow::Result;
use tracing::info;

use super::{Event, Phase, Screen};
use crate::format::{escape_attr, escape_text, Formatter};
use crate::navigator::{Action, ScreenRequest};
use crate::reddit::Comment;
use crate::session::{ParentThing, SessionContext, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Editor,
    Preview,
}

/// Composer for a reply to a link or a comment.
pub struct CommentScreen {
    request: ScreenRequest,
    parent: ParentThing,
    formatter: Formatter,
    pane: Pane,
    draft: String,
    preview: String,
    phase: Phase,
}

impl CommentScreen {
    pub fn new(parent: ParentThing, formatter: Formatter) -> Self {
        Self {
            request: ScreenRequest::Comment {
                parent: parent.clone(),
            },
            parent,
            formatter,
            pane: Pane::Editor,
            draft: String::new(),
            preview: String::new(),
            phase: Phase::Created,
        }
    }

    pub fn pane(&self) -> Pane {
        self.pane
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn show_editor(&mut self) {
        self.pane = Pane::Editor;
    }

    pub fn show_preview(&mut self) {
        self.preview = self.formatter.markdown().render(&self.draft);
        self.pane = Pane::Preview;
    }

    /// Records the draft as a new comment in the session, bumps the comment counts of
    /// the thread and asks to return to the previous screen.
    pub fn save(&mut self, session: &mut SessionContext) -> Result<Action> {
        let username = session
            .user
            .as_ref()
            .map(|user| user.username.clone())
            .ok_or(SessionError::NotLoggedIn)?;
        let parent_name = session
            .comment
            .parent
            .as_ref()
            .map(|parent| parent.name().to_string())
            .ok_or(SessionError::NoParent)?;

        if let Some(ParentThing::Link(_)) = session.comment.parent {
            session.bump_comment_count(&parent_name);
        }
        let op_name = session
            .comment
            .op
            .as_ref()
            .map(|op| op.name.clone())
            .filter(|name| *name != parent_name);
        if let Some(op_name) = op_name {
            session.bump_comment_count(&op_name);
        }

        let id = format!("reply{}", parent_name);
        info!(parent = %parent_name, "saving comment");
        session.comment.created = Some(Comment {
            name: id.clone(),
            id,
            parent_id: parent_name,
            author: username,
            body: Some(self.draft.clone()),
            ups: 1,
            downs: 0,
            likes: Some(true),
            created_utc: self.formatter.now().timestamp() as f64,
            replies: None,
        });
        Ok(Action::PopScreen)
    }
}

impl Screen for CommentScreen {
    fn request(&self) -> &ScreenRequest {
        &self.request
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn on_screen_ready(&mut self, session: &mut SessionContext) -> Result<()> {
        session.comment.parent = Some(self.parent.clone());
        self.phase = Phase::Ready;
        Ok(())
    }

    fn on_dom_ready(&mut self, _session: &mut SessionContext) -> Result<()> {
        self.show_editor();
        self.phase = Phase::DomReady;
        Ok(())
    }

    fn on_unload(&mut self, _session: &mut SessionContext) {
        self.phase = Phase::Unloaded;
    }

    fn handle(&mut self, event: &Event, session: &mut SessionContext) -> Result<Option<Action>> {
        match event {
            Event::Input(text) => {
                self.draft = text.clone();
                Ok(None)
            }
            Event::Click { selector, .. } => match selector.as_str() {
                "#edit" => {
                    self.show_editor();
                    Ok(None)
                }
                "#preview" => {
                    self.show_preview();
                    Ok(None)
                }
                "#save" => self.save(session).map(Some),
                _ => Ok(None),
            },
            Event::Scroll(_) => Ok(None),
        }
    }

    fn title(&self) -> String {
        match &self.parent {
            ParentThing::Link(link) => format!(
                "Reply to {}",
                html_escape::decode_html_entities(&link.title)
            ),
            ParentThing::Comment { author, .. } => format!("Reply to {}", author),
        }
    }

    fn render(&self) -> String {
        let (editor, preview) = match self.pane {
            Pane::Editor => ("", r#" style="display: none""#),
            Pane::Preview => (r#" style="display: none""#, ""),
        };
        format!(
            r#"<div id="comment" data-parent="{parent}">
<div id="commentEditorPane"{editor}>
<textarea id="commentTextarea">{draft}</textarea>
<a id="preview">preview</a> <a id="save">save</a>
</div>
<div id="commentPreviewPane"{preview}>
{rendered}
<a id="edit">edit</a> <a id="save">save</a>
</div>
</div>"#,
            parent = escape_attr(self.parent.name()),
            editor = editor,
            draft = escape_text(&self.draft),
            preview = preview,
            rendered = self.preview,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reddit::User;
    use crate::screen::testing;

    fn user() -> User {
        User {
            username: "mrlamb".into(),
            modhash: "hash".into(),
            cookie: "cookie".into(),
        }
    }

    fn open(parent: ParentThing, session: &mut SessionContext) -> CommentScreen {
        let mut screen = CommentScreen::new(parent, Formatter::default());
        screen.on_screen_ready(session).unwrap();
        screen.on_dom_ready(session).unwrap();
        screen
    }

    #[test]
    fn preview_renders_markdown_and_editor_returns() {
        let mut session = SessionContext::new(Some(user()));
        let mut screen = open(ParentThing::Link(testing::link("a", "pics")), &mut session);
        assert_eq!(screen.pane(), Pane::Editor);

        screen
            .handle(&Event::Input("**bold** move".into()), &mut session)
            .unwrap();
        screen
            .handle(&Event::click("comment", "#preview"), &mut session)
            .unwrap();
        assert_eq!(screen.pane(), Pane::Preview);
        assert!(screen.render().contains("<strong>bold</strong>"));

        screen
            .handle(&Event::click("comment", "#edit"), &mut session)
            .unwrap();
        assert_eq!(screen.pane(), Pane::Editor);
        assert_eq!(screen.draft(), "**bold** move");
    }

    #[test]
    fn saving_a_link_reply_bumps_counts_once() {
        let mut session = SessionContext::new(Some(user()));
        let link = testing::link("a", "pics");
        session.store_listing("pics", testing::listing(&["a", "b"], "pics"));
        session.comment.op = Some(link.clone());
        let mut screen = open(ParentThing::Link(link), &mut session);

        screen.handle(&Event::Input("first!".into()), &mut session).unwrap();
        let action = screen
            .handle(&Event::click("comment", "#save"), &mut session)
            .unwrap();
        assert_eq!(action, Some(Action::PopScreen));

        assert_eq!(session.comment.op.as_ref().unwrap().num_comments, 3);
        let listing = session.subreddit.listing.as_ref().unwrap();
        assert_eq!(listing.children[0].data.num_comments, 3);
        assert_eq!(listing.children[1].data.num_comments, 2);

        let created = session.comment.created.as_ref().unwrap();
        assert_eq!(created.name, "replyt3_a");
        assert_eq!(created.parent_id, "t3_a");
        assert_eq!(created.author, "mrlamb");
        assert_eq!(created.body.as_deref(), Some("first!"));
        assert_eq!(created.score(), 1);
        assert_eq!(created.likes, Some(true));
    }

    #[test]
    fn saving_a_comment_reply_bumps_the_thread() {
        let mut session = SessionContext::new(Some(user()));
        session.comment.op = Some(testing::link("a", "pics"));
        let parent = ParentThing::Comment {
            name: "t1_c".into(),
            author: "bob".into(),
        };
        let mut screen = open(parent, &mut session);

        screen.save(&mut session).unwrap();
        assert_eq!(session.comment.op.as_ref().unwrap().num_comments, 3);
        assert_eq!(session.comment.created.as_ref().unwrap().parent_id, "t1_c");
    }

    #[test]
    fn parent_name_is_attribute_escaped() {
        let mut session = SessionContext::default();
        let parent = ParentThing::Comment {
            name: r#"t1_x" onclick="boom"#.into(),
            author: "bob".into(),
        };
        let screen = open(parent, &mut session);
        let html = screen.render();
        assert!(html.contains(r#"data-parent="t1_x&quot; onclick=&quot;boom""#));
        assert!(!html.contains(r#"onclick="boom""#));
    }

    #[test]
    fn saving_requires_a_user() {
        let mut session = SessionContext::default();
        let mut screen = open(ParentThing::Link(testing::link("a", "pics")), &mut session);
        let err = screen.save(&mut session).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SessionError>(),
            Some(SessionError::NotLoggedIn)
        ));
        assert!(session.comment.created.is_none());
    }
}
