//! Async operations: one `SchoolClient` build, one transport round-trip, one
//! parse.

use std::sync::Arc;

use tracing::{info, warn};

use crate::client::SchoolClient;
use crate::config::ClientConfig;
use crate::error::{AuthFailure, ClientError, NetworkFailure, SessionError};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    AuthToken, Credentials, HealthStatus, NewProfile, Profile, ProfileList, ProfileUpdate,
    RegisteredUser, Registration, User,
};

/// Stateless async client. Clones share the transport.
#[derive(Clone)]
pub struct ApiClient {
    client: SchoolClient,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(client: SchoolClient, transport: Arc<dyn Transport>) -> Self {
        Self { client, transport }
    }

    /// Build a client backed by `ReqwestTransport`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, NetworkFailure> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::new(SchoolClient::new(&config.base_url), Arc::new(transport)))
    }

    pub fn client(&self) -> &SchoolClient {
        &self.client
    }

    /// Exchange credentials for a bearer token.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, SessionError> {
        let request = self
            .client
            .build_login(credentials)
            .map_err(|e| AuthFailure::InvalidRequest(e.to_string()))?;
        let response = self.transport.execute(request).await?;
        let status = response.status;
        match self.client.parse_login(response) {
            Ok(token) => {
                info!(status, "auth: token received");
                Ok(token)
            }
            Err(failure) => {
                warn!(status, %failure, "auth: login rejected");
                Err(failure.into())
            }
        }
    }

    /// List the child profiles visible to `token`.
    pub async fn fetch_profiles(&self, token: &AuthToken) -> Result<ProfileList, SessionError> {
        let request = self.client.build_list_profiles(token);
        let response = self.transport.execute(request).await?;
        let status = response.status;
        let list = self.client.parse_list_profiles(response).map_err(|failure| {
            warn!(status, %failure, "profiles: fetch failed");
            failure
        })?;
        if !list.count_is_consistent() {
            warn!(
                reported = list.count,
                actual = list.len(),
                "profiles: count disagrees with list length"
            );
        }
        info!(count = list.len(), "profiles: fetched");
        Ok(list)
    }

    pub async fn register(&self, input: &Registration) -> Result<RegisteredUser, ClientError> {
        let request = self.client.build_register(input)?;
        let response = self.transport.execute(request).await?;
        Ok(self.client.parse_register(response)?)
    }

    pub async fn current_user(&self, token: &AuthToken) -> Result<User, ClientError> {
        let response = self.transport.execute(self.client.build_current_user(token)).await?;
        Ok(self.client.parse_current_user(response)?)
    }

    pub async fn logout(&self, token: &AuthToken) -> Result<(), ClientError> {
        let response = self.transport.execute(self.client.build_logout(token)).await?;
        Ok(self.client.parse_logout(response)?)
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.transport.execute(self.client.build_health()).await?;
        Ok(self.client.parse_health(response)?)
    }

    pub async fn create_profile(
        &self,
        token: &AuthToken,
        input: &NewProfile,
    ) -> Result<Profile, ClientError> {
        let request = self.client.build_create_profile(token, input)?;
        let response = self.transport.execute(request).await?;
        Ok(self.client.parse_create_profile(response)?)
    }

    pub async fn get_profile(&self, token: &AuthToken, id: &str) -> Result<Profile, ClientError> {
        let response = self.transport.execute(self.client.build_get_profile(token, id)).await?;
        Ok(self.client.parse_get_profile(response)?)
    }

    pub async fn update_profile(
        &self,
        token: &AuthToken,
        id: &str,
        input: &ProfileUpdate,
    ) -> Result<Profile, ClientError> {
        let request = self.client.build_update_profile(token, id, input)?;
        let response = self.transport.execute(request).await?;
        Ok(self.client.parse_update_profile(response)?)
    }

    pub async fn delete_profile(&self, token: &AuthToken, id: &str) -> Result<(), ClientError> {
        let response = self
            .transport
            .execute(self.client.build_delete_profile(token, id))
            .await?;
        Ok(self.client.parse_delete_profile(response)?)
    }
}
