//! Domain DTOs for the school API.
//!
//! # Design
//! These types mirror the server schema but are defined independently of the
//! mock-server crate; integration tests catch drift between the two.
//! Credentials and tokens redact themselves from `Debug` output so they never
//! reach a log line by accident.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a user identifies themselves at login.
///
/// Serialized as a single `email` or `username` field, so exactly one of the
/// two is ever present on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginIdentifier {
    #[serde(rename = "email")]
    ByEmail(String),
    #[serde(rename = "username")]
    ByUsername(String),
}

impl LoginIdentifier {
    /// Classify a raw identifier: anything containing `@` is an email.
    pub fn classify(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.contains('@') {
            LoginIdentifier::ByEmail(raw)
        } else {
            LoginIdentifier::ByUsername(raw)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LoginIdentifier::ByEmail(value) | LoginIdentifier::ByUsername(value) => value,
        }
    }
}

/// Credentials for one login attempt.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: LoginIdentifier,
    pub password: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: LoginIdentifier::classify(identifier),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Wire body of `POST /api/auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    #[serde(flatten)]
    pub identifier: &'a LoginIdentifier,
    pub password: &'a str,
}

impl<'a> From<&'a Credentials> for LoginRequest<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            identifier: &credentials.identifier,
            password: &credentials.password,
        }
    }
}

/// Opaque bearer token returned by a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Body returned by the login and register endpoints. Every field is
/// optional so a 200 without a token can be told apart from malformed JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// A child profile as listed by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub age: i64,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub learning_goals: String,
    /// Server-defined progress blob, usually a JSON object encoded as text.
    #[serde(default)]
    pub progress: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

impl Profile {
    /// First whitespace-separated token of the name, or the whole name.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// Body of `GET /api/profiles`.
///
/// `count` is whatever the server reported; `profiles` is authoritative and
/// the two are allowed to disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileList {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl ProfileList {
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Profile> {
        self.profiles.iter()
    }

    pub fn count_is_consistent(&self) -> bool {
        usize::try_from(self.count).is_ok_and(|count| count == self.profiles.len())
    }
}

impl<'a> IntoIterator for &'a ProfileList {
    type Item = &'a Profile;
    type IntoIter = std::slice::Iter<'a, Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Account details returned by the register and current-user endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

/// Request payload for creating an account.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("phone_number", &self.phone_number)
            .finish()
    }
}

/// A freshly registered account together with its session token.
#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub user: User,
    pub token: AuthToken,
}

/// Request payload for creating a child profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub age: i64,
    #[serde(default)]
    pub grade: String,
    /// Omitted means the server's `"default"` avatar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub learning_goals: String,
}

/// Request payload for updating a child profile. Only the fields present in
/// the JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_goals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileEnvelope {
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: User,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}
