//! # Wallet Endpoints
//!
//! Connect (unverified link), verify (signature-backed link), unlink, and
//! primary selection.

use shared::{
    ConnectWalletRequest, ConnectWalletResponse, LinkWalletRequest, LinkWalletResponse,
    UnlinkWalletRequest, UserIdentity, UserResponse,
};

use super::client::ApiClient;
use crate::core::error::ApiError;

/// Store an address as an unverified wallet of the identity.
///
/// A `409` answer carrying the `loginRequired` body is a valid outcome, not
/// an error: the address is already verified by another identity.
#[tracing::instrument(skip(client))]
pub async fn connect_wallet(
    client: &ApiClient,
    user_id: &str,
    address: &str,
) -> Result<ConnectWalletResponse, ApiError> {
    let request = ConnectWalletRequest {
        address: address.to_string(),
    };

    let response = client
        .client
        .post(client.user_url(user_id, "/wallet/connect"))
        .json(&request)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Wallet connect network error");
            ApiError::Network(e.to_string())
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    // Both the success body and the login-required conflict share one shape
    match serde_json::from_str::<ConnectWalletResponse>(&body) {
        Ok(parsed) if status.is_success() || parsed.login_required => {
            tracing::info!(
                success = parsed.success,
                login_required = parsed.login_required,
                "Wallet connect answered"
            );
            Ok(parsed)
        }
        Ok(parsed) => Err(ApiError::Status {
            status: status.as_u16(),
            message: parsed
                .message
                .unwrap_or_else(|| "Wallet connect rejected".to_string()),
        }),
        Err(_) if !status.is_success() => {
            let message = serde_json::from_str::<shared::ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("Wallet connect failed with status {}", status));
            tracing::warn!(status = status.as_u16(), error = %message, "Wallet connect failed");
            Err(ApiError::Status {
                status: status.as_u16(),
                message,
            })
        }
        Err(e) => Err(ApiError::Parse(e.to_string())),
    }
}

/// Submit a signed challenge for an address.
#[tracing::instrument(skip(client, request), fields(address = %request.address))]
pub async fn link_wallet(
    client: &ApiClient,
    user_id: &str,
    request: &LinkWalletRequest,
) -> Result<LinkWalletResponse, ApiError> {
    let start = std::time::Instant::now();

    let response: LinkWalletResponse = client
        .send_json(client.client.post(client.user_url(user_id, "/wallet")).json(request))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Wallet verification rejected");
            e
        })?;

    tracing::info!(
        identity_swapped = response.identity_swapped,
        duration_ms = start.elapsed().as_millis(),
        "Wallet verified"
    );
    Ok(response)
}

/// Remove a wallet; the backend requires a signature from the wallet itself.
#[tracing::instrument(skip(client, request))]
pub async fn unlink_wallet(
    client: &ApiClient,
    user_id: &str,
    address: &str,
    request: &UnlinkWalletRequest,
) -> Result<UserIdentity, ApiError> {
    let url = client.user_url(user_id, &format!("/wallet/{}", address));
    let response: UserResponse = client
        .send_json(client.client.delete(url).json(request))
        .await?;

    Ok(response.user)
}

#[tracing::instrument(skip(client))]
pub async fn set_primary_wallet(client: &ApiClient, user_id: &str, address: &str) -> Result<UserIdentity, ApiError> {
    let url = client.user_url(user_id, &format!("/wallet/{}/primary", address));
    let response: UserResponse = client.send_json(client.client.patch(url)).await?;

    Ok(response.user)
}
