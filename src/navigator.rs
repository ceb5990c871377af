use crate::reddit::Link;
use crate::session::ParentThing;

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("no screen to return to")]
    EmptyStack,
}

/// A screen to show, together with the parameters it was pushed with.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenRequest {
    Subreddit { subreddit: String },
    Comments { link: Link },
    Comment { parent: ParentThing },
}

impl ScreenRequest {
    pub fn screen_id(&self) -> &'static str {
        match self {
            ScreenRequest::Subreddit { .. } => "subreddit.html",
            ScreenRequest::Comments { .. } => "comments.html",
            ScreenRequest::Comment { .. } => "comment.html",
        }
    }

    pub fn screen_name(&self) -> &'static str {
        match self {
            ScreenRequest::Subreddit { .. } => "subreddit",
            ScreenRequest::Comments { .. } => "comments",
            ScreenRequest::Comment { .. } => "comment",
        }
    }
}

/// What a click asks the shell to do once a screen has handled it.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    PushScreen(ScreenRequest),
    PopScreen,
}

#[derive(Debug, Default)]
pub struct Navigator {
    stack: Vec<ScreenRequest>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_screen(&mut self, request: ScreenRequest) {
        self.stack.push(request);
    }

    /// Drops the top screen and returns the one underneath, which becomes current.
    /// The root screen is never popped.
    pub fn pop_screen(&mut self) -> Result<&ScreenRequest, NavigationError> {
        if self.stack.len() < 2 {
            return Err(NavigationError::EmptyStack);
        }
        self.stack.pop();
        self.stack.last().ok_or(NavigationError::EmptyStack)
    }

    /// The screen `pop_screen` would return to.
    pub fn previous(&self) -> Result<&ScreenRequest, NavigationError> {
        self.stack
            .len()
            .checked_sub(2)
            .and_then(|idx| self.stack.get(idx))
            .ok_or(NavigationError::EmptyStack)
    }

    pub fn current(&self) -> Option<&ScreenRequest> {
        self.stack.last()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
