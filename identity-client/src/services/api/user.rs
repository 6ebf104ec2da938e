//! # User Endpoints
//!
//! Fetch-or-create of the identity record and the login gate.

use shared::{UserIdentity, UserResponse};

use super::client::ApiClient;
use crate::core::error::ApiError;

/// Fetch the identity record, creating it server-side when it does not exist.
#[tracing::instrument(skip(client))]
pub async fn fetch_user(client: &ApiClient, user_id: &str) -> Result<UserIdentity, ApiError> {
    let start = std::time::Instant::now();

    let response: UserResponse = client
        .send_json(client.client.get(client.user_url(user_id, "")))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Fetch user failed");
            e
        })?;

    tracing::debug!(
        wallets = response.user.wallets.len(),
        duration_ms = start.elapsed().as_millis(),
        "User record loaded"
    );
    Ok(response.user)
}

/// Mark the identity as logged in.
#[tracing::instrument(skip(client))]
pub async fn login(client: &ApiClient, user_id: &str) -> Result<UserIdentity, ApiError> {
    tracing::info!("Attempting login");

    let response: UserResponse = client
        .send_json(client.client.post(client.user_url(user_id, "/login")))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Login failed");
            e
        })?;

    Ok(response.user)
}

/// Clear the logged-in flag.
#[tracing::instrument(skip(client))]
pub async fn logout(client: &ApiClient, user_id: &str) -> Result<UserIdentity, ApiError> {
    let response: UserResponse = client
        .send_json(client.client.post(client.user_url(user_id, "/logout")))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Logout failed");
            e
        })?;

    Ok(response.user)
}
