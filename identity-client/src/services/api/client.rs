//! # API Client
//!
//! Main HTTP client for the backend identity service.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::ErrorResponse;

use crate::config::ClientConfig;
use crate::core::error::ApiError;
use crate::core::service::IdentityApi;

/// HTTP client for communicating with the backend identity service.
///
/// Cheap to clone: the underlying `reqwest::Client` shares its connection pool.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with the default 10 second timeout.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_config(&ClientConfig {
            api_base_url: base_url.to_string(),
            ..ClientConfig::default()
        })
    }

    pub fn with_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/user/{id}{suffix}`
    pub(crate) fn user_url(&self, user_id: &str, suffix: &str) -> String {
        format!("{}/user/{}{}", self.base_url, user_id, suffix)
    }

    /// Send a request and decode a JSON body of type `T` on success.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Network(e.to_string()))?;
        let response = check_status(response).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Send a request whose success body is irrelevant.
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Network(e.to_string()))?;
        check_status(response).await.map(|_| ())
    }
}

/// Turn a non-2xx response into [`ApiError::Status`], reading `{ "error": ... }` when present.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait::async_trait]
impl IdentityApi for ApiClient {
    async fn fetch_user(&self, user_id: &str) -> Result<shared::UserIdentity, ApiError> {
        super::user::fetch_user(self, user_id).await
    }

    async fn connect_wallet(&self, user_id: &str, address: &str) -> Result<shared::ConnectWalletResponse, ApiError> {
        super::wallet::connect_wallet(self, user_id, address).await
    }

    async fn link_wallet(
        &self,
        user_id: &str,
        request: &shared::LinkWalletRequest,
    ) -> Result<shared::LinkWalletResponse, ApiError> {
        super::wallet::link_wallet(self, user_id, request).await
    }

    async fn unlink_wallet(
        &self,
        user_id: &str,
        address: &str,
        request: &shared::UnlinkWalletRequest,
    ) -> Result<shared::UserIdentity, ApiError> {
        super::wallet::unlink_wallet(self, user_id, address, request).await
    }

    async fn set_primary_wallet(&self, user_id: &str, address: &str) -> Result<shared::UserIdentity, ApiError> {
        super::wallet::set_primary_wallet(self, user_id, address).await
    }

    async fn login(&self, user_id: &str) -> Result<shared::UserIdentity, ApiError> {
        super::user::login(self, user_id).await
    }

    async fn logout(&self, user_id: &str) -> Result<shared::UserIdentity, ApiError> {
        super::user::logout(self, user_id).await
    }

    async fn start_session(
        &self,
        user_id: &str,
        request: &shared::SessionStartRequest,
    ) -> Result<shared::SessionSnapshot, ApiError> {
        super::session::start_session(self, user_id, request).await
    }

    async fn record_page(&self, user_id: &str, path: &str) -> Result<(), ApiError> {
        super::session::record_page(self, user_id, path).await
    }

    async fn heartbeat(&self, user_id: &str) -> Result<(), ApiError> {
        super::session::heartbeat(self, user_id).await
    }

    async fn end_session(&self, user_id: &str) -> Result<(), ApiError> {
        super::session::end_session(self, user_id).await
    }

    fn send_end_beacon(&self, user_id: &str) -> bool {
        super::session::send_end_beacon(self, user_id)
    }
}
