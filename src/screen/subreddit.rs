use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use super::{Event, Phase, Screen};
use crate::data::{FeedService, SubredditService};
use crate::format::{create_subreddit_tab, tab_id, Formatter, Fragment, Tab};
use crate::navigator::{Action, ScreenRequest};
use crate::session::SessionContext;

/// The listing container and its loading indicator.
#[derive(Debug, Default)]
pub struct ListingView {
    pub loading: bool,
    pub visible: bool,
    pub scroll_top: u32,
    pub nodes: Vec<Fragment>,
}

pub struct SubredditScreen {
    request: ScreenRequest,
    subreddit: String,
    feed: Arc<dyn FeedService>,
    subreddits: Arc<dyn SubredditService>,
    formatter: Formatter,
    tabs: Vec<Tab>,
    selected_tab: Option<String>,
    view: ListingView,
    phase: Phase,
}

impl SubredditScreen {
    pub fn new(
        subreddit: &str,
        feed: Arc<dyn FeedService>,
        subreddits: Arc<dyn SubredditService>,
        formatter: Formatter,
    ) -> Self {
        Self {
            request: ScreenRequest::Subreddit {
                subreddit: subreddit.to_string(),
            },
            subreddit: subreddit.to_string(),
            feed,
            subreddits,
            formatter,
            tabs: Vec::new(),
            selected_tab: None,
            view: ListingView::default(),
            phase: Phase::Created,
        }
    }

    pub fn view(&self) -> &ListingView {
        &self.view
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn selected_tab(&self) -> Option<&str> {
        self.selected_tab.as_deref()
    }

    /// Replaces the listing with `subreddit`, fetched fresh.
    pub fn switch_subreddit(
        &mut self,
        subreddit: &str,
        session: &mut SessionContext,
    ) -> Result<()> {
        info!(subreddit, "switching subreddit");
        self.select_tab(subreddit);
        self.load(subreddit, session)
    }

    fn load(&mut self, subreddit: &str, session: &mut SessionContext) -> Result<()> {
        self.view.loading = true;
        self.view.visible = false;
        self.view.nodes.clear();

        let formatter = &self.formatter;
        let view = &mut self.view;
        let fetched = self.feed.listing(subreddit, &mut |thing| {
            view.loading = false;
            view.visible = true;
            view.nodes.push(formatter.format_post(&thing.data));
        });
        self.view.loading = false;
        let listing = fetched?;
        debug!(subreddit, links = listing.children.len(), "listing loaded");
        session.store_listing(subreddit, listing);
        Ok(())
    }

    fn restore(&mut self, session: &SessionContext) {
        self.view.loading = false;
        self.view.nodes.clear();
        if let Some(listing) = session.subreddit.listing.as_ref() {
            for thing in &listing.children {
                self.view.nodes.push(self.formatter.format_post(&thing.data));
            }
        }
        self.scrollback(session);
    }

    fn scrollback(&mut self, session: &SessionContext) {
        self.view.scroll_top = session.subreddit.scroll_top;
        self.view.visible = true;
    }

    fn select_tab(&mut self, subreddit: &str) {
        self.selected_tab = Some(tab_id(subreddit));
    }
}

impl Screen for SubredditScreen {
    fn request(&self) -> &ScreenRequest {
        &self.request
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn on_screen_ready(&mut self, session: &mut SessionContext) -> Result<()> {
        if !session.subreddit.visited {
            session.subreddit.visited = true;
            session.subreddit.dom_ready = false;
            session.subreddit.selected = self.subreddit.clone();
            session.subreddit.scroll_top = 0;
        }

        let mut tabs = Vec::new();
        self.subreddits
            .subreddits(&mut |thing| tabs.push(create_subreddit_tab(&thing.data)))?;
        self.tabs = tabs;
        self.phase = Phase::Ready;
        Ok(())
    }

    fn on_dom_ready(&mut self, session: &mut SessionContext) -> Result<()> {
        if session.subreddit.dom_ready {
            info!("loading subreddit listings from memory");
            let selected = session.subreddit.selected.clone();
            self.select_tab(&selected);
            self.restore(session);
        } else {
            info!("loading subreddit listings from reddit");
            let subreddit = self.subreddit.clone();
            self.select_tab(&subreddit);
            self.load(&subreddit, session)?;
            session.subreddit.dom_ready = true;
        }
        self.phase = Phase::DomReady;
        Ok(())
    }

    fn on_unload(&mut self, session: &mut SessionContext) {
        session.subreddit.scroll_top = self.view.scroll_top;
        self.phase = Phase::Unloaded;
    }

    fn handle(&mut self, event: &Event, session: &mut SessionContext) -> Result<Option<Action>> {
        match event {
            Event::Scroll(offset) => {
                self.view.scroll_top = *offset;
                Ok(None)
            }
            Event::Click { node, selector } => {
                if let Some(tab) = self.tabs.iter().find(|tab| &tab.id == node) {
                    let subreddit = tab.subreddit.clone();
                    self.switch_subreddit(&subreddit, session)?;
                    return Ok(None);
                }
                Ok(self
                    .view
                    .nodes
                    .iter()
                    .find(|fragment| &fragment.id == node)
                    .and_then(|fragment| fragment.action(selector))
                    .cloned())
            }
            Event::Input(_) => Ok(None),
        }
    }

    fn title(&self) -> String {
        match self.selected_tab.as_deref().and_then(|id| id.strip_prefix("tab-")) {
            Some(subreddit) => format!("Snooby - {}", subreddit),
            None => "Snooby".to_string(),
        }
    }

    fn render(&self) -> String {
        let tabs: String = self
            .tabs
            .iter()
            .map(|tab| tab.render(self.selected_tab.as_deref() == Some(tab.id.as_str())))
            .collect();
        let nodes: String = self
            .view
            .nodes
            .iter()
            .map(|fragment| fragment.html.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let display = |shown: bool| if shown { "" } else { r#" style="display: none""# };
        format!(
            r#"<div id="subreddit" data-scroll-top="{scroll}">
<div id="actionBar" class="action-bar">{tabs}</div>
<div id="loading"{loading}>Loading...</div>
<div id="listing"{listing}>
{nodes}
</div>
</div>"#,
            scroll = self.view.scroll_top,
            tabs = tabs,
            loading = display(self.view.loading),
            listing = display(self.view.visible),
            nodes = nodes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockSubredditService;
    use crate::reddit::{Link, Listing, Thing};
    use crate::screen::testing;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingFeed {
        fetches: AtomicUsize,
        requested: parking_lot::Mutex<Vec<String>>,
    }

    impl FeedService for RecordingFeed {
        fn listing(
            &self,
            subreddit: &str,
            on_item: &mut dyn FnMut(&Thing<Link>),
        ) -> Result<Listing<Link>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().push(subreddit.to_string());
            let listing = testing::listing(&["a", "b", "c"], subreddit);
            for thing in &listing.children {
                on_item(thing);
            }
            Ok(listing)
        }
    }

    /// Fails the first fetch, then serves listings.
    #[derive(Default)]
    struct FlakyFeed {
        calls: AtomicUsize,
    }

    impl FeedService for FlakyFeed {
        fn listing(
            &self,
            subreddit: &str,
            on_item: &mut dyn FnMut(&Thing<Link>),
        ) -> Result<Listing<Link>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("connection reset");
            }
            let listing = testing::listing(&["a", "b"], subreddit);
            for thing in &listing.children {
                on_item(thing);
            }
            Ok(listing)
        }
    }

    fn screen(feed: Arc<RecordingFeed>, subreddit: &str) -> SubredditScreen {
        SubredditScreen::new(
            subreddit,
            feed,
            Arc::new(MockSubredditService),
            Formatter::default(),
        )
    }

    fn open(screen: &mut SubredditScreen, session: &mut SessionContext) {
        screen.on_screen_ready(session).unwrap();
        screen.on_dom_ready(session).unwrap();
    }

    #[test]
    fn first_visit_fetches_and_appends_in_order() {
        let feed = Arc::new(RecordingFeed::default());
        let mut session = SessionContext::default();
        let mut screen = screen(feed.clone(), "pics");
        open(&mut screen, &mut session);

        assert_eq!(feed.fetches.load(Ordering::SeqCst), 1);
        let ids: Vec<&str> = screen.view().nodes.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["t3_a", "t3_b", "t3_c"]);
        assert!(!screen.view().loading);
        assert!(screen.view().visible);
        assert!(session.subreddit.visited);
        assert!(session.subreddit.dom_ready);
        assert_eq!(session.subreddit.selected, "pics");
        assert_eq!(session.subreddit.listing.as_ref().unwrap().children.len(), 3);
        assert_eq!(screen.selected_tab(), Some("tab-pics"));
        assert_eq!(screen.tabs().len(), 3);
        assert_eq!(screen.phase(), Phase::DomReady);
    }

    #[test]
    fn second_visit_replays_listing_and_scroll_offset() {
        let feed = Arc::new(RecordingFeed::default());
        let mut session = SessionContext::default();

        let mut first = screen(feed.clone(), "pics");
        open(&mut first, &mut session);
        first.handle(&Event::Scroll(480), &mut session).unwrap();
        first.on_unload(&mut session);
        assert_eq!(session.subreddit.scroll_top, 480);

        let mut second = screen(feed.clone(), "pics");
        open(&mut second, &mut session);

        assert_eq!(feed.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(second.view().nodes.len(), 3);
        assert_eq!(second.view().scroll_top, 480);
        assert!(second.view().visible);
        assert!(second.render().contains(r#"data-scroll-top="480""#));
    }

    #[test]
    fn failed_first_fetch_is_retried_on_next_visit() {
        let feed = Arc::new(FlakyFeed::default());
        let mut session = SessionContext::default();
        let build = || {
            SubredditScreen::new(
                "pics",
                feed.clone(),
                Arc::new(MockSubredditService),
                Formatter::default(),
            )
        };

        let mut first = build();
        first.on_screen_ready(&mut session).unwrap();
        assert!(first.on_dom_ready(&mut session).is_err());
        assert!(!session.subreddit.dom_ready);
        assert!(session.subreddit.listing.is_none());
        assert!(!first.view().loading);

        let mut second = build();
        open(&mut second, &mut session);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.view().nodes.len(), 2);
        assert!(session.subreddit.dom_ready);
    }

    #[test]
    fn tab_click_switches_subreddit() {
        let feed = Arc::new(RecordingFeed::default());
        let mut session = SessionContext::default();
        let mut screen = screen(feed.clone(), "frontpage");
        open(&mut screen, &mut session);

        let action = screen
            .handle(&Event::click("tab-rust", ""), &mut session)
            .unwrap();
        assert!(action.is_none());
        assert_eq!(*feed.requested.lock(), vec!["frontpage", "rust"]);
        assert_eq!(session.subreddit.selected, "rust");
        assert_eq!(screen.selected_tab(), Some("tab-rust"));
        assert_eq!(screen.view().nodes.len(), 3);
        assert_eq!(screen.title(), "Snooby - rust");
    }

    #[test]
    fn comments_click_pushes_comments_screen() {
        let feed = Arc::new(RecordingFeed::default());
        let mut session = SessionContext::default();
        let mut screen = screen(feed, "pics");
        open(&mut screen, &mut session);

        let action = screen
            .handle(&Event::click("t3_b", ".comments"), &mut session)
            .unwrap();
        match action {
            Some(Action::PushScreen(ScreenRequest::Comments { link })) => {
                assert_eq!(link.name, "t3_b")
            }
            other => panic!("unexpected action {other:?}"),
        }
        let none = screen
            .handle(&Event::click("t3_b", ".link-title"), &mut session)
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn render_shows_tabs_and_listing() {
        let feed = Arc::new(RecordingFeed::default());
        let mut session = SessionContext::default();
        let mut screen = screen(feed, "pics");
        open(&mut screen, &mut session);

        let html = screen.render();
        assert!(html.contains(r#"id="tab-pics""#));
        assert!(html.contains(r#"<div id="loading" style="display: none">"#));
        assert!(html.contains(r#"<div id="listing">"#));
        assert!(html.contains(r#"id="t3_a""#));
    }
}
