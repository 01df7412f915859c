//! Multi-user TCP chat server: a line-oriented protocol multiplexing a
//! single general channel and arbitrary named rooms, plus one-to-one DMs,
//! over many concurrent connections sharing one in-memory store.

pub mod chat;
pub mod codec;
pub mod command;
pub mod config;
pub mod delivery;
pub mod error;
pub mod session;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};

use chat::ChatState;
use codec::Wire;
use config::ServerConfig;
use error::ServeError;
use session::Session;

pub type SharedState = Arc<Mutex<ChatState>>;

pub fn init_state(config: &ServerConfig) -> SharedState {
    Arc::new(Mutex::new(ChatState::new(config.rate_cap)))
}

/// Binds the listening socket and accepts connections indefinitely, spawning
/// one session driver per accepted socket. Returns only on a fatal bind
/// failure; accept-time errors are logged and accepting continues.
pub async fn serve(config: ServerConfig, state: SharedState) -> Result<(), ServeError> {
    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr).await.map_err(|source| ServeError {
        addr: bind_addr.clone(),
        source,
    })?;
    info!(addr = %bind_addr, "listening");

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let address = peer.to_string();
                let wire = Wire::new(stream, config.buffer_size);
                let session = Session::new(wire, address.clone());
                let state = state.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    session.run(state, config).await;
                });
            }
            Err(e) => {
                error!(error = %e, "accept failed");
            }
        }
    }
}
