//! Session-authenticated API client core for the school app.
//!
//! # Overview
//! Turns a username/email and password into a bearer token, uses the token
//! to fetch the user's child profiles, and hands the result to the
//! presentation layer as a `SessionOutcome`.
//!
//! # Design
//! - `SchoolClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`. No I/O happens there.
//! - `Transport` is the only I/O seam; `ReqwestTransport` is the production
//!   implementation and tests substitute scripted ones.
//! - `ApiClient` pairs the two into async operations; `Session` sequences
//!   login and profile fetch and owns the per-attempt state machine.
//! - `Navigator` threads the fetched list into screen state.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod nav;
pub mod session;
pub mod transport;
pub mod types;

pub use api::ApiClient;
pub use client::SchoolClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{
    ApiError, AuthFailure, ClientError, FetchFailure, LoginRejected, NetworkFailure, SessionError,
};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use nav::{LoginView, Navigator, Screen};
pub use session::{LoginHandle, Session, SessionOutcome, SessionState};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    AuthToken, Credentials, HealthStatus, LoginIdentifier, NewProfile, Profile, ProfileList,
    ProfileUpdate, RegisteredUser, Registration, User,
};
