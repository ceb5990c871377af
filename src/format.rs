use chrono::{DateTime, TimeZone, Utc};

use crate::markdown;
use crate::navigator::{Action, ScreenRequest};
use crate::reddit::{Link, Subreddit};
use crate::template;

const THUMBNAIL_SENTINELS: [&str; 3] = ["nsfw", "self", "default"];

/// Rendered markup for one node plus the clicks it answers to.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub id: String,
    pub html: String,
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub selector: &'static str,
    pub action: Action,
}

impl Fragment {
    pub fn action(&self, selector: &str) -> Option<&Action> {
        self.bindings
            .iter()
            .find(|binding| binding.selector == selector)
            .map(|binding| &binding.action)
    }
}

/// Action-bar tab that switches the listing to `subreddit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub id: String,
    pub subreddit: String,
}

impl Tab {
    pub fn render(&self, selected: bool) -> String {
        template::tab(&self.id, &escape_text(&self.subreddit), selected)
    }
}

pub fn create_subreddit_tab(subreddit: &Subreddit) -> Tab {
    Tab {
        id: tab_id(&subreddit.display_name),
        subreddit: subreddit.display_name.clone(),
    }
}

pub fn tab_id(subreddit: &str) -> String {
    format!("tab-{}", subreddit)
}

/// Formats posts and comments against a fixed "now" so relative times are stable
/// for the lifetime of a screen.
#[derive(Clone)]
pub struct Formatter {
    markdown: markdown::Renderer,
    now: DateTime<Utc>,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            markdown: markdown::Renderer::new(),
            now,
        }
    }

    pub fn markdown(&self) -> &markdown::Renderer {
        &self.markdown
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn relative_time(&self, created_utc: f64) -> String {
        relative_time(created_utc, self.now)
    }

    pub fn format_post(&self, link: &Link) -> Fragment {
        let self_post = link.is_self_post();
        let domain = if self_post {
            link.domain.clone()
        } else {
            shorten_domain(&link.domain)
        };

        let mut title = title_markup(link);
        if link.over_18 {
            title.push_str(template::NSFW_BADGE);
        }

        let description = if has_thumbnail(&link.thumbnail) {
            template::title_with_thumbnail(&title, link.num_comments, &escape_attr(&link.thumbnail))
        } else {
            template::title_without_thumbnail(&title, link.num_comments)
        };

        let html = template::link(&template::LinkView {
            name: &escape_attr(&link.name),
            description: &description,
            subreddit: &escape_text(&link.subreddit),
            score: link.score,
            domain: &escape_text(&domain),
            time: &self.relative_time(link.created_utc),
            author: &escape_text(&link.author),
        });

        let open_comments = Action::PushScreen(ScreenRequest::Comments { link: link.clone() });
        let mut bindings = vec![Binding {
            selector: ".comments",
            action: open_comments.clone(),
        }];
        // self posts have nowhere else to go
        if self_post {
            bindings.push(Binding {
                selector: ".link-title",
                action: open_comments,
            });
        }

        Fragment {
            id: link.name.clone(),
            html,
            bindings,
        }
    }
}

/// Title as plain text for self posts, or as an anchor to the external URL.
pub fn title_markup(link: &Link) -> String {
    let title = escape_text(&link.title);
    if link.is_self_post() {
        title
    } else {
        format!(r#"<a href="{}">{}</a>"#, escape_attr(&link.url), title)
    }
}

/// Cosmetic display truncation of a link domain.
///
/// Longer than 20 characters: drop the last label, then keep only what follows the
/// next dot. Between 11 and 20: drop the last label. Otherwise unchanged. A domain
/// without dots is left alone.
pub fn shorten_domain(domain: &str) -> String {
    let len = domain.chars().count();
    if len > 20 {
        let trimmed = strip_last_label(domain);
        match trimmed.rfind('.') {
            Some(idx) => trimmed[idx + 1..].to_string(),
            None => trimmed.to_string(),
        }
    } else if len > 10 {
        strip_last_label(domain).to_string()
    } else {
        domain.to_string()
    }
}

fn strip_last_label(domain: &str) -> &str {
    domain.rfind('.').map_or(domain, |idx| &domain[..idx])
}

pub fn has_thumbnail(thumbnail: &str) -> bool {
    !thumbnail.is_empty() && !THUMBNAIL_SENTINELS.contains(&thumbnail)
}

/// Score label with an explicit `+` for positive values.
pub fn signed_score(score: i64) -> String {
    if score > 0 {
        format!("+{}", score)
    } else {
        score.to_string()
    }
}

/// Reddit entity-encodes titles; decode first so escaping does not double up.
pub fn escape_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    html_escape::encode_text(&decoded).into_owned()
}

pub fn escape_attr(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    html_escape::encode_double_quoted_attribute(&decoded).into_owned()
}

/// Relative phrase for a unix timestamp, using the usual "fromNow" thresholds.
pub fn relative_time(created_utc: f64, now: DateTime<Utc>) -> String {
    let created = Utc
        .timestamp_opt(created_utc.trunc() as i64, 0)
        .single()
        .unwrap_or(now);
    let seconds = (now - created).num_seconds().max(0) as f64;
    let minutes = (seconds / 60.0).round();
    let hours = (minutes / 60.0).round();
    let days = (hours / 24.0).round();
    let years = (days / 365.0).round();

    let phrase = if seconds < 45.0 {
        "a few seconds".to_string()
    } else if minutes <= 1.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{} minutes", minutes)
    } else if hours <= 1.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{} hours", hours)
    } else if days <= 1.0 {
        "a day".to_string()
    } else if days <= 25.0 {
        format!("{} days", days)
    } else if days <= 45.0 {
        "a month".to_string()
    } else if days < 345.0 {
        format!("{} months", (days / 30.0).round())
    } else if years <= 1.0 {
        "a year".to_string()
    } else {
        format!("{} years", years)
    };
    format!("{} ago", phrase)
}
