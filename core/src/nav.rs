//! Screen navigation state for the presentation layer.
//!
//! The fetched profile list travels inside `Screen::Profiles`, so the screen
//! that renders it owns the data and no global state is involved.

use crate::session::SessionOutcome;
use crate::types::ProfileList;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Login,
    Signup,
    ResetPassword,
    ProfileUpdate,
    Profiles(ProfileList),
}

impl Screen {
    pub fn route(&self) -> &'static str {
        match self {
            Screen::Login => "login",
            Screen::Signup => "signup",
            Screen::ResetPassword => "reset_password",
            Screen::ProfileUpdate => "profile_update",
            Screen::Profiles(_) => "profiles",
        }
    }
}

/// State of the login form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginView {
    pub error_message: Option<String>,
}

/// Back stack rooted at `Screen::Login`.
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<Screen>,
    login: LoginView,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            stack: vec![Screen::Login],
            login: LoginView::default(),
        }
    }

    pub fn current(&self) -> &Screen {
        // The root is never popped.
        &self.stack[self.stack.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn login_view(&self) -> &LoginView {
        &self.login
    }

    pub fn navigate(&mut self, screen: Screen) {
        self.stack.push(screen);
    }

    /// Pop the current screen. Returns `false` when already at the root.
    pub fn back(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        self.stack.pop();
        true
    }

    /// Pop everything above the root login screen.
    pub fn reset_to_login(&mut self) {
        self.stack.truncate(1);
    }

    /// Route the result of a login attempt.
    ///
    /// Success clears the form error and opens the profiles screen with the
    /// fetched list; failures keep the user on the form with a message.
    pub fn apply_outcome(&mut self, outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Success(list) => {
                self.login.error_message = None;
                self.navigate(Screen::Profiles(list.clone()));
            }
            failure => {
                self.reset_to_login();
                self.login.error_message = failure.user_message();
            }
        }
    }
}
