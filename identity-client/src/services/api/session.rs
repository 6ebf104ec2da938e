//! # Session Endpoints
//!
//! Page-view session lifecycle. Callers treat every failure here as
//! non-critical.

use shared::{PageViewRequest, SessionSnapshot, SessionStartRequest};

use super::client::ApiClient;
use crate::core::error::ApiError;

#[tracing::instrument(skip(client, request))]
pub async fn start_session(
    client: &ApiClient,
    user_id: &str,
    request: &SessionStartRequest,
) -> Result<SessionSnapshot, ApiError> {
    client
        .send_json(client.client.post(client.user_url(user_id, "/session/start")).json(request))
        .await
}

#[tracing::instrument(skip(client))]
pub async fn record_page(client: &ApiClient, user_id: &str, path: &str) -> Result<(), ApiError> {
    let request = PageViewRequest {
        path: path.to_string(),
    };
    client
        .send_empty(client.client.post(client.user_url(user_id, "/session/page")).json(&request))
        .await
}

#[tracing::instrument(level = "debug", skip(client))]
pub async fn heartbeat(client: &ApiClient, user_id: &str) -> Result<(), ApiError> {
    client
        .send_empty(
            client
                .client
                .post(client.user_url(user_id, "/session/heartbeat"))
                .json(&serde_json::json!({})),
        )
        .await
}

#[tracing::instrument(skip(client))]
pub async fn end_session(client: &ApiClient, user_id: &str) -> Result<(), ApiError> {
    client
        .send_empty(
            client
                .client
                .post(client.user_url(user_id, "/session/end"))
                .json(&serde_json::json!({})),
        )
        .await
}

/// Detach the session-end request onto the runtime so it completes even if
/// the caller is torn down right after.
///
/// Returns `false` outside a tokio runtime.
pub fn send_end_beacon(client: &ApiClient, user_id: &str) -> bool {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return false;
    };

    let client = client.clone();
    let user_id = user_id.to_string();
    handle.spawn(async move {
        if let Err(e) = end_session(&client, &user_id).await {
            tracing::warn!(error = %e, "Session end beacon failed");
        }
    });

    true
}
