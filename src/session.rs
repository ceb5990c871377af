use crate::reddit::{Comment, Link, LinkComments, Listing, User};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no user is logged in")]
    NotLoggedIn,
    #[error("no parent to reply to")]
    NoParent,
}

/// The thing a new comment replies to.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentThing {
    Link(Link),
    Comment { name: String, author: String },
}

impl ParentThing {
    pub fn name(&self) -> &str {
        match self {
            ParentThing::Link(link) => &link.name,
            ParentThing::Comment { name, .. } => name,
        }
    }
}

/// State shared by the screens of one navigation session.
#[derive(Debug, Default)]
pub struct SessionContext {
    pub subreddit: SubredditState,
    pub comment: CommentState,
    pub user: Option<User>,
}

#[derive(Debug, Default)]
pub struct SubredditState {
    pub visited: bool,
    pub dom_ready: bool,
    pub selected: String,
    pub scroll_top: u32,
    pub listing: Option<Listing<Link>>,
}

#[derive(Debug, Default)]
pub struct CommentState {
    pub parent: Option<ParentThing>,
    /// The link whose thread is open.
    pub op: Option<Link>,
    /// A comment composed locally, waiting to be shown in its thread.
    pub created: Option<Comment>,
    /// A thread fetched before its screen was shown.
    pub thread: Option<LinkComments>,
}

impl SessionContext {
    pub fn new(user: Option<User>) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }

    pub fn store_listing(&mut self, selected: &str, listing: Listing<Link>) {
        self.subreddit.selected = selected.to_string();
        self.subreddit.listing = Some(listing);
    }

    /// Bumps the comment count of the link named `name` wherever the session holds it.
    pub fn bump_comment_count(&mut self, name: &str) {
        if let Some(ParentThing::Link(link)) = self.comment.parent.as_mut() {
            if link.name == name {
                link.num_comments += 1;
            }
        }
        if let Some(op) = self.comment.op.as_mut() {
            if op.name == name {
                op.num_comments += 1;
            }
        }
        if let Some(listing) = self.subreddit.listing.as_mut() {
            for thing in listing.children.iter_mut() {
                if thing.data.name == name {
                    thing.data.num_comments += 1;
                }
            }
        }
    }
}
