//! Screen controllers. Each screen goes through `on_screen_ready` (parameters received,
//! chrome built), `on_dom_ready` (content fetched or restored) and `on_unload` (state
//! saved into the session before teardown).

pub mod comment;
pub mod comments;
pub mod subreddit;

use std::sync::Arc;

use anyhow::Result;

use crate::data::{
    AccountService, CommentService, FeedService, MockAccountService, MockCommentService,
    MockFeedService, MockSubredditService, RedditAccountService, RedditCommentService,
    RedditFeedService, RedditSubredditService, SubredditService,
};
use crate::format::Formatter;
use crate::navigator::{Action, ScreenRequest};
use crate::reddit;
use crate::session::SessionContext;

pub use comment::CommentScreen;
pub use comments::CommentsScreen;
pub use subreddit::SubredditScreen;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Ready,
    DomReady,
    Unloaded,
}

/// Input delivered to the visible screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A click on the element matching `selector` inside the node with id `node`.
    Click { node: String, selector: String },
    Input(String),
    Scroll(u32),
}

impl Event {
    pub fn click(node: &str, selector: &str) -> Self {
        Event::Click {
            node: node.to_string(),
            selector: selector.to_string(),
        }
    }
}

pub trait Screen {
    fn request(&self) -> &ScreenRequest;
    fn phase(&self) -> Phase;
    fn on_screen_ready(&mut self, session: &mut SessionContext) -> Result<()>;
    fn on_dom_ready(&mut self, session: &mut SessionContext) -> Result<()>;
    fn on_unload(&mut self, session: &mut SessionContext);
    fn handle(&mut self, event: &Event, session: &mut SessionContext) -> Result<Option<Action>>;
    fn title(&self) -> String;
    fn render(&self) -> String;
}

#[derive(Clone)]
pub struct Services {
    pub feed: Arc<dyn FeedService>,
    pub subreddits: Arc<dyn SubredditService>,
    pub comments: Arc<dyn CommentService>,
    pub accounts: Arc<dyn AccountService>,
    pub formatter: Formatter,
}

impl Services {
    pub fn reddit(client: Arc<reddit::Client>, formatter: Formatter) -> Self {
        Self {
            feed: Arc::new(RedditFeedService::new(client.clone())),
            subreddits: Arc::new(RedditSubredditService::new(client.clone())),
            comments: Arc::new(RedditCommentService::new(client.clone())),
            accounts: Arc::new(RedditAccountService::new(client)),
            formatter,
        }
    }

    pub fn offline(formatter: Formatter) -> Self {
        Self {
            feed: Arc::new(MockFeedService::default()),
            subreddits: Arc::new(MockSubredditService),
            comments: Arc::new(MockCommentService::default()),
            accounts: Arc::new(MockAccountService),
            formatter,
        }
    }
}

pub fn build(request: &ScreenRequest, services: &Services) -> Box<dyn Screen> {
    match request {
        ScreenRequest::Subreddit { subreddit } => Box::new(SubredditScreen::new(
            subreddit,
            services.feed.clone(),
            services.subreddits.clone(),
            services.formatter.clone(),
        )),
        ScreenRequest::Comments { link } => Box::new(CommentsScreen::new(
            link.clone(),
            services.comments.clone(),
            services.formatter.clone(),
        )),
        ScreenRequest::Comment { parent } => Box::new(CommentScreen::new(
            parent.clone(),
            services.formatter.clone(),
        )),
    }
}
