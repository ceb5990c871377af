use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::reddit::{self, Comment, Link, LinkComments, Listing, Subreddit, Thing, User};

pub trait FeedService: Send + Sync {
    fn listing(
        &self,
        subreddit: &str,
        on_item: &mut dyn FnMut(&Thing<Link>),
    ) -> Result<Listing<Link>>;
}

pub trait SubredditService: Send + Sync {
    fn subreddits(&self, on_item: &mut dyn FnMut(&Thing<Subreddit>)) -> Result<Listing<Subreddit>>;
}

pub trait CommentService: Send + Sync {
    fn load_comments(&self, article: &str) -> Result<LinkComments>;
}

pub trait AccountService: Send + Sync {
    fn login(&self, username: &str, password: &str) -> Result<User>;
    fn logout(&self, modhash: &str) -> Result<()>;
}

pub struct RedditFeedService {
    client: Arc<reddit::Client>,
}

impl RedditFeedService {
    pub fn new(client: Arc<reddit::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for RedditFeedService {
    fn listing(
        &self,
        subreddit: &str,
        on_item: &mut dyn FnMut(&Thing<Link>),
    ) -> Result<Listing<Link>> {
        self.client
            .listing(subreddit, on_item)
            .with_context(|| format!("fetch listing for {}", subreddit))
    }
}

pub struct RedditSubredditService {
    client: Arc<reddit::Client>,
}

impl RedditSubredditService {
    pub fn new(client: Arc<reddit::Client>) -> Self {
        Self { client }
    }
}

impl SubredditService for RedditSubredditService {
    fn subreddits(&self, on_item: &mut dyn FnMut(&Thing<Subreddit>)) -> Result<Listing<Subreddit>> {
        self.client
            .subreddits(on_item)
            .context("fetch subreddit listing")
    }
}

pub struct RedditCommentService {
    client: Arc<reddit::Client>,
}

impl RedditCommentService {
    pub fn new(client: Arc<reddit::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for RedditCommentService {
    fn load_comments(&self, article: &str) -> Result<LinkComments> {
        self.client.comments(article).context("fetch comments")
    }
}

pub struct RedditAccountService {
    client: Arc<reddit::Client>,
}

impl RedditAccountService {
    pub fn new(client: Arc<reddit::Client>) -> Self {
        Self { client }
    }
}

impl AccountService for RedditAccountService {
    fn login(&self, username: &str, password: &str) -> Result<User> {
        self.client
            .login(username, password)
            .context("log in")?
            .into_user(username)
    }

    fn logout(&self, modhash: &str) -> Result<()> {
        self.client.logout(modhash).context("log out")
    }
}

/// Canned front page for offline browsing. Counts fetches so callers can tell a
/// replayed listing from a fresh one.
#[derive(Default)]
pub struct MockFeedService {
    fetches: AtomicUsize,
}

impl MockFeedService {
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl FeedService for MockFeedService {
    fn listing(
        &self,
        subreddit: &str,
        on_item: &mut dyn FnMut(&Thing<Link>),
    ) -> Result<Listing<Link>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let listing = mock_listing(subreddit);
        for thing in &listing.children {
            on_item(thing);
        }
        Ok(listing)
    }
}

#[derive(Default)]
pub struct MockSubredditService;

impl SubredditService for MockSubredditService {
    fn subreddits(&self, on_item: &mut dyn FnMut(&Thing<Subreddit>)) -> Result<Listing<Subreddit>> {
        let listing = Listing {
            after: None,
            before: None,
            children: ["frontpage", "pics", "rust"]
                .into_iter()
                .enumerate()
                .map(|(idx, name)| Thing {
                    kind: "t5".into(),
                    data: Subreddit {
                        name: format!("t5_{}", idx),
                        display_name: name.into(),
                        title: name.into(),
                        subscribers: 0,
                        over_18: false,
                    },
                })
                .collect(),
        };
        for thing in &listing.children {
            on_item(thing);
        }
        Ok(listing)
    }
}

#[derive(Default)]
pub struct MockCommentService {
    loads: AtomicUsize,
}

impl MockCommentService {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl CommentService for MockCommentService {
    fn load_comments(&self, article: &str) -> Result<LinkComments> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let article = article.trim_start_matches("t3_");
        let link = mock_listing("frontpage")
            .children
            .into_iter()
            .map(|thing| thing.data)
            .find(|link| link.id == article)
            .unwrap_or_else(|| mock_link(article, "Offline thread", "self.snooby", "snooby"));
        let parent = link.name.clone();
        let op = link.author.clone();

        let reply = mock_comment(
            &format!("{}_r1", article),
            &format!("t1_{}_c1", article),
            "reader",
            3,
            0,
            None,
        );
        let buried = mock_comment(&format!("{}_c3", article), &parent, "troll", 0, 9, None);
        let mut removed =
            mock_comment(&format!("{}_c2", article), &parent, "[deleted]", 1, 0, None);
        removed.body = None;
        let first = mock_comment(
            &format!("{}_c1", article),
            &parent,
            &op,
            12,
            1,
            Some(vec![reply]),
        );

        Ok(LinkComments {
            link,
            comments: Listing {
                after: None,
                before: None,
                children: [first, removed, buried]
                    .into_iter()
                    .map(|data| Thing {
                        kind: "t1".into(),
                        data,
                    })
                    .collect(),
            },
        })
    }
}

#[derive(Default)]
pub struct MockAccountService;

impl AccountService for MockAccountService {
    fn login(&self, username: &str, _password: &str) -> Result<User> {
        Ok(User {
            username: username.into(),
            modhash: "offline".into(),
            cookie: "offline".into(),
        })
    }

    fn logout(&self, _modhash: &str) -> Result<()> {
        Ok(())
    }
}

fn mock_listing(subreddit: &str) -> Listing<Link> {
    let sub = if subreddit.is_empty() || subreddit == reddit::FRONT_PAGE {
        "snooby"
    } else {
        subreddit
    };
    let links = vec![
        mock_link("welcome", "Welcome to Snooby", &format!("self.{}", sub), sub),
        mock_link("rustlang", "The Rust Programming Language", "www.rust-lang.org", sub),
        mock_link("wiki", "Reddit on Wikipedia", "en.wikipedia.org", sub),
    ];
    Listing {
        after: None,
        before: None,
        children: links
            .into_iter()
            .map(|data| Thing {
                kind: "t3".into(),
                data,
            })
            .collect(),
    }
}

fn mock_link(id: &str, title: &str, domain: &str, subreddit: &str) -> Link {
    let is_self = domain.starts_with("self.");
    Link {
        name: format!("t3_{}", id),
        id: id.into(),
        title: title.into(),
        url: if is_self {
            format!("http://www.reddit.com/r/{}/comments/{}/", subreddit, id)
        } else {
            format!("http://{}/", domain)
        },
        domain: domain.into(),
        subreddit: subreddit.into(),
        author: "snooby".into(),
        score: 128,
        ups: 140,
        downs: 12,
        num_comments: 3,
        created_utc: 0.0,
        thumbnail: if is_self { "self".into() } else { "default".into() },
        over_18: false,
        is_self,
        permalink: format!("/r/{}/comments/{}/", subreddit, id),
    }
}

fn mock_comment(
    id: &str,
    parent_id: &str,
    author: &str,
    ups: i64,
    downs: i64,
    replies: Option<Vec<Comment>>,
) -> Comment {
    Comment {
        name: format!("t1_{}", id),
        id: id.into(),
        parent_id: parent_id.into(),
        author: author.into(),
        body: Some(format!("Comment by **{}**.", author)),
        ups,
        downs,
        likes: None,
        created_utc: 0.0,
        replies: replies.map(|children| {
            Box::new(Listing {
                after: None,
                before: None,
                children: children
                    .into_iter()
                    .map(|data| Thing {
                        kind: "t1".into(),
                        data,
                    })
                    .collect(),
            })
        }),
    }
}
