//! Stateless HTTP request builder and response parser for the school API.
//!
//! # Design
//! `SchoolClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! A `Transport` executes the round-trip in between, so everything in this
//! module is deterministic and free of I/O.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{server_message, ApiError, AuthFailure, FetchFailure};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AuthToken, Credentials, HealthStatus, LoginRequest, NewProfile, Profile, ProfileEnvelope,
    ProfileList, ProfileUpdate, RegisteredUser, Registration, TokenResponse, User, UserEnvelope,
};

/// Synchronous, stateless client for the school API.
#[derive(Debug, Clone)]
pub struct SchoolClient {
    base_url: String,
}

impl SchoolClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Login sequence
    // -----------------------------------------------------------------------

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/auth/login", None, &LoginRequest::from(credentials))
    }

    pub fn build_list_profiles(&self, token: &AuthToken) -> HttpRequest {
        self.request(HttpMethod::Get, "/api/profiles", Some(token))
    }

    /// Classify a login response.
    ///
    /// A 200 only counts when its body carries a non-empty `token`; anything
    /// else at 200, including a body that is not JSON, is `NoToken`.
    pub fn parse_login(&self, response: HttpResponse) -> Result<AuthToken, AuthFailure> {
        match response.status {
            200 => serde_json::from_str::<TokenResponse>(&response.body)
                .ok()
                .and_then(|body| body.token)
                .filter(|token| !token.is_empty())
                .map(AuthToken::new)
                .ok_or(AuthFailure::NoToken),
            400 => Err(AuthFailure::BadRequest),
            401 => Err(AuthFailure::Unauthorized),
            404 => Err(AuthFailure::EndpointNotFound),
            status => Err(AuthFailure::Status {
                status,
                message: server_message(&response),
            }),
        }
    }

    pub fn parse_list_profiles(&self, response: HttpResponse) -> Result<ProfileList, FetchFailure> {
        if !response.is_success() {
            return Err(FetchFailure::Status {
                status: response.status,
                message: server_message(&response),
            });
        }
        serde_json::from_str(&response.body).map_err(|e| FetchFailure::MalformedBody(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Account
    // -----------------------------------------------------------------------

    pub fn build_register(&self, input: &Registration) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/auth/register", None, input)
    }

    pub fn build_current_user(&self, token: &AuthToken) -> HttpRequest {
        self.request(HttpMethod::Get, "/api/auth/user", Some(token))
    }

    pub fn build_logout(&self, token: &AuthToken) -> HttpRequest {
        self.request(HttpMethod::Post, "/api/auth/logout", Some(token))
    }

    pub fn build_health(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/api/health", None)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<RegisteredUser, ApiError> {
        check_status(&response, 201)?;
        let body: TokenResponse = decode(&response)?;
        let token = body
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::DeserializationError("missing token".to_string()))?;
        let user = body
            .user
            .ok_or_else(|| ApiError::DeserializationError("missing user".to_string()))?;
        Ok(RegisteredUser {
            user,
            token: AuthToken::new(token),
        })
    }

    pub fn parse_current_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        check_status(&response, 200)?;
        decode::<UserEnvelope>(&response).map(|envelope| envelope.user)
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 200)
    }

    pub fn parse_health(&self, response: HttpResponse) -> Result<HealthStatus, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    // -----------------------------------------------------------------------
    // Child profiles
    // -----------------------------------------------------------------------

    pub fn build_create_profile(
        &self,
        token: &AuthToken,
        input: &NewProfile,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/profiles", Some(token), input)
    }

    pub fn build_get_profile(&self, token: &AuthToken, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/api/profiles/{id}"), Some(token))
    }

    pub fn build_update_profile(
        &self,
        token: &AuthToken,
        id: &str,
        input: &ProfileUpdate,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/api/profiles/{id}"), Some(token), input)
    }

    pub fn build_delete_profile(&self, token: &AuthToken, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/api/profiles/{id}"), Some(token))
    }

    pub fn parse_create_profile(&self, response: HttpResponse) -> Result<Profile, ApiError> {
        check_status(&response, 201)?;
        decode::<ProfileEnvelope>(&response).map(|envelope| envelope.profile)
    }

    pub fn parse_get_profile(&self, response: HttpResponse) -> Result<Profile, ApiError> {
        check_status(&response, 200)?;
        decode::<ProfileEnvelope>(&response).map(|envelope| envelope.profile)
    }

    pub fn parse_update_profile(&self, response: HttpResponse) -> Result<Profile, ApiError> {
        check_status(&response, 200)?;
        decode::<ProfileEnvelope>(&response).map(|envelope| envelope.profile)
    }

    pub fn parse_delete_profile(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 200)
    }

    fn request(&self, method: HttpMethod, path: &str, token: Option<&AuthToken>) -> HttpRequest {
        let headers = token
            .map(|token| vec![("authorization".to_string(), token.bearer())])
            .unwrap_or_default();
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers,
            body: None,
        }
    }

    fn json_request<T: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        token: Option<&AuthToken>,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut req = self.request(method, path, token);
        req.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    match response.status {
        404 => Err(ApiError::NotFound),
        401 => Err(ApiError::Unauthorized(server_message(response))),
        409 => Err(ApiError::Conflict(server_message(response))),
        status => Err(ApiError::HttpError {
            status,
            message: server_message(response),
        }),
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}
