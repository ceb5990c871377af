use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::config::{self, Config};
use crate::format::{escape_text, Formatter};
use crate::navigator::{Action, Navigator, ScreenRequest};
use crate::reddit::{self, Link, User};
use crate::screen::{self, Event, Screen, Services};
use crate::session::SessionContext;
use crate::storage;
use crate::template;

/// Environment variable holding the password for `--login`.
pub const PASSWORD_ENV: &str = "SNOOBY_PASSWORD";

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub subreddit: Option<String>,
    pub comments: Option<String>,
    pub output: Option<PathBuf>,
    pub open: bool,
    pub offline: bool,
    pub login: Option<String>,
    pub logout: bool,
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .try_init();
}

/// Drives the screen stack: one screen is live at a time and the ones underneath are
/// rebuilt from the session when they come back.
pub struct App {
    services: Services,
    session: SessionContext,
    navigator: Navigator,
    screen: Option<Box<dyn Screen>>,
}

impl App {
    pub fn new(services: Services, session: SessionContext) -> Self {
        Self {
            services,
            session,
            navigator: Navigator::new(),
            screen: None,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn current(&self) -> Option<&dyn Screen> {
        self.screen.as_deref()
    }

    pub fn start(&mut self, request: ScreenRequest) -> Result<()> {
        self.dispatch(Action::PushScreen(request))
    }

    /// Readies the target screen before touching the stack, so a failed load leaves the
    /// current screen live.
    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        match action {
            Action::PushScreen(request) => {
                let screen = self.ready(&request)?;
                self.navigator.push_screen(request);
                self.replace(screen);
            }
            Action::PopScreen => {
                let previous = self.navigator.previous()?.clone();
                let screen = self.ready(&previous)?;
                self.navigator.pop_screen()?;
                self.replace(screen);
            }
        }
        Ok(())
    }

    /// Delivers `event` to the live screen and carries out the navigation it asks for.
    pub fn handle(&mut self, event: Event) -> Result<Option<Action>> {
        let screen = self
            .screen
            .as_mut()
            .ok_or_else(|| anyhow!("no screen is shown"))?;
        let action = screen.handle(&event, &mut self.session)?;
        if let Some(action) = action.clone() {
            self.dispatch(action)?;
        }
        Ok(action)
    }

    pub fn click(&mut self, node: &str, selector: &str) -> Result<Option<Action>> {
        self.handle(Event::click(node, selector))
    }

    pub fn render_page(&self) -> String {
        match self.screen.as_ref() {
            Some(screen) => template::page(&escape_text(&screen.title()), &screen.render()),
            None => template::page("Snooby", ""),
        }
    }

    /// Looks a link up in the loaded listing, falling back to its comment thread. A
    /// fetched thread is kept for the comments screen.
    pub fn find_link(&mut self, name: &str) -> Result<Link> {
        let id = name.trim_start_matches("t3_");
        let cached = self
            .session
            .subreddit
            .listing
            .as_ref()
            .and_then(|listing| listing.children.iter().find(|thing| thing.data.id == id));
        if let Some(thing) = cached {
            return Ok(thing.data.clone());
        }
        let thread = self
            .services
            .comments
            .load_comments(id)
            .with_context(|| format!("look up link {}", name))?;
        let link = thread.link.clone();
        self.session.comment.thread = Some(thread);
        Ok(link)
    }

    fn ready(&mut self, request: &ScreenRequest) -> Result<Box<dyn Screen>> {
        info!(
            screen = request.screen_name(),
            id = request.screen_id(),
            depth = self.navigator.depth(),
            "showing screen"
        );
        let mut screen = screen::build(request, &self.services);
        screen.on_screen_ready(&mut self.session)?;
        screen.on_dom_ready(&mut self.session)?;
        Ok(screen)
    }

    fn replace(&mut self, screen: Box<dyn Screen>) {
        if let Some(mut previous) = self.screen.replace(screen) {
            previous.on_unload(&mut self.session);
        }
    }
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let store = storage::Store::open(storage::Options {
        path: cfg.storage.path.clone(),
    })
    .context("open storage")?;

    let mut user: Option<User> = store
        .get_persisted_item(storage::USER_KEY)
        .context("load saved user")?;
    let anonymous = services(&cfg, None, opts.offline)?;

    if opts.logout {
        match user.take() {
            Some(current) => {
                anonymous.accounts.logout(&current.modhash)?;
                store.remove_persisted_item(storage::USER_KEY)?;
                info!(username = %current.username, "logged out");
            }
            None => warn!("logout requested without a saved user"),
        }
    }

    if let Some(username) = opts.login.as_deref() {
        let password = std::env::var(PASSWORD_ENV)
            .with_context(|| format!("{} must hold the password for {}", PASSWORD_ENV, username))?;
        let logged_in = anonymous.accounts.login(username, &password)?;
        store.set_persisted_item(storage::USER_KEY, &logged_in)?;
        info!(username = %logged_in.username, "logged in");
        user = Some(logged_in);
    }

    let services = match user.as_ref() {
        Some(current) => services(&cfg, Some(current), opts.offline)?,
        None => anonymous,
    };

    let mut app = App::new(services, SessionContext::new(user));
    let subreddit = opts
        .subreddit
        .clone()
        .unwrap_or_else(|| cfg.ui.default_subreddit.clone());
    app.start(ScreenRequest::Subreddit { subreddit })?;
    if let Some(name) = opts.comments.as_deref() {
        let link = app.find_link(name)?;
        app.dispatch(Action::PushScreen(ScreenRequest::Comments { link }))?;
    }

    let html = app.render_page();
    let open = opts.open || cfg.ui.open_browser;
    let screen_id = app
        .navigator()
        .current()
        .map(ScreenRequest::screen_id)
        .unwrap_or("subreddit.html");
    let path = match opts.output.clone() {
        Some(path) => Some(path),
        None if open => Some(page_cache_dir().join(screen_id)),
        None => None,
    };

    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create directory {}", parent.display()))?;
            }
            fs::write(&path, html).with_context(|| format!("write page to {}", path.display()))?;
            info!(path = %path.display(), "page written");
            if open {
                let target = path.display().to_string();
                if let Err(err) = webbrowser::open(&target) {
                    warn!(error = %err, "failed to open browser");
                }
            }
        }
        None => print!("{}", html),
    }

    store.close()?;
    Ok(())
}

fn services(cfg: &Config, user: Option<&User>, offline: bool) -> Result<Services> {
    let formatter = Formatter::new();
    if offline {
        return Ok(Services::offline(formatter));
    }
    let mut client = reddit::Client::new(reddit::ClientConfig {
        user_agent: cfg.reddit.user_agent.clone(),
        base_url: Some(cfg.reddit.base_url.clone()),
        ssl_url: Some(cfg.reddit.ssl_url.clone()),
        timeout: Some(cfg.reddit.timeout),
        http_client: None,
    })
    .context("create reddit client")?;
    if let Some(user) = user {
        client = client.with_user(user);
    }
    Ok(Services::reddit(Arc::new(client), formatter))
}

fn page_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("snooby")
}
