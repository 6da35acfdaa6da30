//! Login orchestration: authenticate, then fetch profiles with the token.
//!
//! # Design
//! A `Session` is one UI instance's handle on the login flow. Its state lives
//! in a `watch` channel so a view can follow `Idle -> AuthInFlight ->
//! FetchInFlight -> Done` without polling. Only one sequence may run per
//! session; a second `login` while one is in flight is rejected rather than
//! queued. Credentials and the token are locals of a single `login` call and
//! are dropped when it returns.
//!
//! Dropping a `login` future (or cancelling a `LoginHandle`) drops the
//! in-flight request, delivers no outcome and puts the session back to
//! `Idle`. Whatever the server already did is left alone.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{AuthFailure, FetchFailure, LoginRejected, NetworkFailure, SessionError};
use crate::types::{Credentials, ProfileList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AuthInFlight,
    FetchInFlight,
    Done,
}

impl SessionState {
    pub fn is_in_flight(self) -> bool {
        matches!(self, SessionState::AuthInFlight | SessionState::FetchInFlight)
    }
}

/// Terminal result of one login sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Success(ProfileList),
    AuthFailure(AuthFailure),
    FetchFailure(FetchFailure),
    NetworkFailure(NetworkFailure),
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Success(_))
    }

    pub fn profiles(&self) -> Option<&ProfileList> {
        match self {
            SessionOutcome::Success(list) => Some(list),
            _ => None,
        }
    }

    /// Text to show the user for a failed attempt; `None` on success.
    pub fn user_message(&self) -> Option<String> {
        let message = match self {
            SessionOutcome::Success(_) => return None,
            SessionOutcome::AuthFailure(failure) => match failure {
                AuthFailure::NoToken => "Login failed: No token received.".to_string(),
                AuthFailure::BadRequest => {
                    "Login failed: Bad request. Please check your input.".to_string()
                }
                AuthFailure::Unauthorized => {
                    "Login failed: Unauthorized. Check your credentials.".to_string()
                }
                AuthFailure::EndpointNotFound => {
                    "Login failed: Endpoint not found. Contact support.".to_string()
                }
                other => format!("Login failed: {other}"),
            },
            SessionOutcome::FetchFailure(FetchFailure::Status { status, .. }) => {
                format!("Failed to fetch profiles: {status}")
            }
            SessionOutcome::FetchFailure(failure) => format!("Failed to fetch profiles: {failure}"),
            SessionOutcome::NetworkFailure(failure) => format!("Network error: {failure}"),
        };
        Some(message)
    }
}

impl From<Result<ProfileList, SessionError>> for SessionOutcome {
    fn from(result: Result<ProfileList, SessionError>) -> Self {
        match result {
            Ok(list) => SessionOutcome::Success(list),
            Err(SessionError::Auth(failure)) => SessionOutcome::AuthFailure(failure),
            Err(SessionError::Fetch(failure)) => SessionOutcome::FetchFailure(failure),
            Err(SessionError::Network(failure)) => SessionOutcome::NetworkFailure(failure),
        }
    }
}

pub struct Session {
    api: ApiClient,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self { api, state }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<SessionOutcome, LoginRejected> {
        self.login_with(Credentials::new(identifier, password)).await
    }

    /// Run one authenticate-then-fetch sequence.
    ///
    /// Never fails for network or HTTP reasons; those are folded into the
    /// returned `SessionOutcome`. The only error is a rejected duplicate.
    pub async fn login_with(
        &self,
        credentials: Credentials,
    ) -> Result<SessionOutcome, LoginRejected> {
        let attempt = Attempt::begin(&self.state)?;
        debug!(identifier = credentials.identifier.as_str(), "session: login started");

        let result = match self.api.authenticate(&credentials).await {
            Ok(token) => {
                drop(credentials);
                attempt.advance(SessionState::FetchInFlight);
                self.api.fetch_profiles(&token).await
            }
            Err(err) => Err(err),
        };
        let outcome = SessionOutcome::from(result);
        attempt.finish();

        match &outcome {
            SessionOutcome::Success(list) => info!(profiles = list.len(), "session: login complete"),
            failure => warn!(outcome = ?failure, "session: login failed"),
        }
        Ok(outcome)
    }

    /// Run `login_with` on the tokio runtime.
    pub fn spawn_login(self: &Arc<Self>, credentials: Credentials) -> LoginHandle {
        let session = Arc::clone(self);
        let task = tokio::spawn(async move { session.login_with(credentials).await });
        LoginHandle { task }
    }
}

/// A login running in the background.
pub struct LoginHandle {
    task: JoinHandle<Result<SessionOutcome, LoginRejected>>,
}

impl LoginHandle {
    /// Abort the sequence. The in-flight request is dropped and no outcome
    /// will be delivered.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Wait for the result; `None` if the attempt was cancelled.
    pub async fn outcome(self) -> Option<Result<SessionOutcome, LoginRejected>> {
        match self.task.await {
            Ok(result) => Some(result),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => None,
        }
    }
}

/// Marks a session busy for the lifetime of one sequence.
struct Attempt<'a> {
    state: &'a watch::Sender<SessionState>,
    finished: bool,
}

impl<'a> Attempt<'a> {
    fn begin(state: &'a watch::Sender<SessionState>) -> Result<Self, LoginRejected> {
        let started = state.send_if_modified(|current| {
            if current.is_in_flight() {
                return false;
            }
            *current = SessionState::AuthInFlight;
            true
        });
        if !started {
            warn!("session: login rejected, another attempt is in flight");
            return Err(LoginRejected::InFlight);
        }
        Ok(Self {
            state,
            finished: false,
        })
    }

    fn advance(&self, next: SessionState) {
        self.state.send_replace(next);
    }

    fn finish(mut self) {
        self.finished = true;
        self.state.send_replace(SessionState::Done);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("session: login abandoned before completion");
            self.state.send_replace(SessionState::Idle);
        }
    }
}
