use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{COOKIE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://www.reddit.com/";
pub const DEFAULT_SSL_URL: &str = "https://ssl.reddit.com/";

/// Listing target that maps to the front page instead of a subreddit.
pub const FRONT_PAGE: &str = "frontpage";

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub ssl_url: Option<String>,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

/// Credentials kept between runs once a login succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub modhash: String,
    pub cookie: String,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
    ssl_url: Url,
    cookie: Option<String>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("reddit client user agent required");
        }
        let base_url = Url::parse(
            config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL),
        )
        .context("reddit: parse base url")?;
        let ssl_url = Url::parse(config.ssl_url.as_deref().unwrap_or(DEFAULT_SSL_URL))
            .context("reddit: parse ssl url")?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
            ssl_url,
            cookie: None,
        })
    }

    /// Sends the session cookie of `user` with every following request.
    pub fn with_user(mut self, user: &User) -> Self {
        self.cookie = Some(format!("reddit_session={}", user.cookie));
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookie.is_some()
    }

    pub fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let form = vec![
            ("user".to_string(), username.to_string()),
            ("passwd".to_string(), password.to_string()),
            ("rem".to_string(), "true".to_string()),
            ("api_type".to_string(), "json".to_string()),
        ];
        let url = self.ssl_url.join("/api/login")?;
        let resp = self.send(Method::POST, url, Some(form))?;
        resp.json().context("reddit: decode login response")
    }

    pub fn logout(&self, modhash: &str) -> Result<()> {
        let form = vec![
            ("uh".to_string(), modhash.to_string()),
            ("top".to_string(), "off".to_string()),
        ];
        let url = self.ssl_url.join("/logout")?;
        self.send(Method::POST, url, Some(form))?;
        Ok(())
    }

    /// Fetches a link listing and hands every child to `on_item` in the order received.
    pub fn listing<F>(&self, subreddit: &str, mut on_item: F) -> Result<Listing<Link>>
    where
        F: FnMut(&Thing<Link>),
    {
        let listing: Listing<Link> = self.fetch_listing(&listing_path(subreddit))?;
        for thing in &listing.children {
            on_item(thing);
        }
        Ok(listing)
    }

    pub fn subreddits<F>(&self, mut on_item: F) -> Result<Listing<Subreddit>>
    where
        F: FnMut(&Thing<Subreddit>),
    {
        let path = if self.is_authenticated() {
            "/subreddits/mine/subscriber.json"
        } else {
            "/subreddits/default.json"
        };
        let listing: Listing<Subreddit> = self.fetch_listing(path)?;
        for thing in &listing.children {
            on_item(thing);
        }
        Ok(listing)
    }

    pub fn comments(&self, article: &str) -> Result<LinkComments> {
        let article = article.trim_start_matches("t3_");
        if article.is_empty() {
            bail!("reddit: comments article id required");
        }
        let url = self.base_url.join(&format!("/comments/{}.json", article))?;
        let resp = self.send(Method::GET, url, None)?;
        let payload: Vec<Value> = resp.json().context("reddit: decode comments payload")?;
        let mut payload = payload.into_iter();
        let (Some(link_value), Some(comments_value)) = (payload.next(), payload.next()) else {
            bail!("reddit: comments payload missing elements");
        };
        let link_listing: ListingEnvelope<Link> =
            serde_json::from_value(link_value).context("reddit: decode link listing")?;
        let comments_listing: ListingEnvelope<Comment> =
            serde_json::from_value(comments_value).context("reddit: decode comment listing")?;
        let link = link_listing
            .data
            .children
            .into_iter()
            .next()
            .map(|thing| thing.data)
            .ok_or_else(|| anyhow!("reddit: link listing empty"))?;
        Ok(LinkComments {
            link,
            comments: comments_listing.data,
        })
    }

    fn fetch_listing<T>(&self, path: &str) -> Result<Listing<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        let resp = self.send(Method::GET, url, None)?;
        let listing: ListingEnvelope<T> = resp.json().context("reddit: decode listing")?;
        Ok(listing.data)
    }

    fn send(
        &self,
        method: Method,
        url: Url,
        form: Option<Vec<(String, String)>>,
    ) -> Result<Response> {
        debug!(%method, %url, "reddit request");
        let mut req = self.http.request(method, url);
        req = req.header(USER_AGENT, self.user_agent.clone());
        if let Some(cookie) = &self.cookie {
            req = req.header(COOKIE, cookie.clone());
        }
        if let Some(form_data) = form {
            req = req.form(&form_data);
        }

        let resp = req.send()?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            match status.as_u16() {
                401 => Err(anyhow!("reddit: unauthorized")),
                403 => Err(anyhow!("reddit: forbidden")),
                429 => Err(anyhow!("reddit: rate limited: {}", body)),
                _ => Err(anyhow!("reddit: api error {}: {}", status, body)),
            }
        }
    }
}

fn listing_path(subreddit: &str) -> String {
    let name = subreddit.trim().trim_start_matches("r/");
    if name.is_empty() || name == FRONT_PAGE {
        "/.json".to_string()
    } else {
        format!("/r/{}/.json", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing<T> {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    pub children: Vec<Thing<T>>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            after: None,
            before: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub downs: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub permalink: String,
}

impl Link {
    /// Self posts are recognised by their `self.<subreddit>` domain.
    pub fn is_self_post(&self) -> bool {
        self.domain == format!("self.{}", self.subreddit)
    }

    pub fn article_id(&self) -> &str {
        if self.id.is_empty() {
            self.name.trim_start_matches("t3_")
        } else {
            &self.id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub downs: i64,
    #[serde(default)]
    pub likes: Option<bool>,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default, deserialize_with = "deserialize_replies")]
    pub replies: Option<Box<Listing<Comment>>>,
}

impl Comment {
    pub fn score(&self) -> i64 {
        self.ups - self.downs
    }
}

// Reddit sends `""` instead of a listing when a comment has no replies.
fn deserialize_replies<'de, D>(deserializer: D) -> Result<Option<Box<Listing<Comment>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value::<ListingEnvelope<Comment>>(value)
        .ok()
        .map(|listing| Box::new(listing.data)))
}

#[derive(Debug, Clone)]
pub struct LinkComments {
    pub link: Link,
    pub comments: Listing<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subreddit {
    #[serde(default)]
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subscribers: i64,
    #[serde(default, rename = "over18")]
    pub over_18: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ListingEnvelope<T> {
    data: Listing<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub json: LoginBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub errors: Vec<Vec<Value>>,
    #[serde(default)]
    pub data: Option<LoginData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginData {
    pub modhash: String,
    pub cookie: String,
}

impl LoginResponse {
    pub fn into_user(self, username: &str) -> Result<User> {
        if let Some(err) = self.json.errors.first() {
            let joined = err
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            bail!("reddit: login error: {}", joined);
        }
        let data = self
            .json
            .data
            .ok_or_else(|| anyhow!("reddit: login response missing data"))?;
        Ok(User {
            username: username.to_string(),
            modhash: data.modhash,
            cookie: data.cookie,
        })
    }
}
