//! Drives one full identity session against a running backend, with a local
//! ed25519 key standing in for the browser wallet extension.
//!
//! ```text
//! IDENTITY_API_URL=http://127.0.0.1:3001/api cargo run -p identity-client
//! ```
//!
//! `IDENTITY_SIGNING_KEY` (base58, 32 bytes) pins the wallet; otherwise a
//! fresh key is generated on every run.

use std::sync::Arc;

use async_channel::Receiver;
use identity_client::app::{ClientEvent, IdentityClient, IdentityStore, SessionContext};
use identity_client::core::error::Result;
use identity_client::provider::LocalKeyGateway;
use identity_client::services::api::ApiClient;
use identity_client::{debug, ClientConfig};

#[tokio::main]
async fn main() -> Result<()> {
    debug::init();

    let config = ClientConfig::from_env()?;
    tracing::info!(api = %config.api_base_url, storage = %config.storage_dir.display(), "Starting identity client");

    let gateway = match std::env::var("IDENTITY_SIGNING_KEY") {
        Ok(secret) => LocalKeyGateway::from_base58_secret(&secret)?,
        Err(_) => LocalKeyGateway::generate(),
    };
    println!("Wallet address: {}", gateway.address());

    let api = Arc::new(ApiClient::with_config(&config)?);
    let identity = IdentityStore::in_dir(&config.storage_dir);
    let (client, events) = IdentityClient::new(&config, api, Arc::new(gateway), identity);

    let user = client.bootstrap().await?;
    println!("User id: {} ({} linked wallets)", user.id, user.wallets.len());

    let context = SessionContext::new("/").with_screen_width(1280);
    client.start_session(context.clone()).await;

    match client.connect_wallet().await {
        Ok(outcome) => println!("Connect: {:?}", outcome),
        Err(err) => println!("Connect failed: {}", err),
    }

    if client.store().connected_address().is_some() {
        match client.verify_wallet(context).await {
            Ok(outcome) => println!("Verify: {:?}", outcome),
            Err(err) => println!("Verify failed: {}", err),
        }
    }

    client.tracker().record_page("/wallet").await;

    let state = client.store().snapshot();
    println!(
        "Status: {} | phase: {:?} | primary: {}",
        state.connection.connection_status.as_str(),
        state.connection.link_phase(),
        client
            .store()
            .primary_wallet()
            .map(|w| shared::truncate_address(&w.address))
            .unwrap_or_else(|| "none".to_string()),
    );

    client.shutdown().await;
    drain_events(&events);
    Ok(())
}

fn drain_events(events: &Receiver<ClientEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            ClientEvent::Notice { level, message } => println!("[{:?}] {}", level, message),
            ClientEvent::IdentitySwapped { previous, current } => {
                println!("Signed in as {} (was {})", current, previous)
            }
            ClientEvent::LoginRequired { address, existing_owner } => {
                println!("{} belongs to {}; verify to sign in", address, existing_owner)
            }
        }
    }
}
