//! Strata Display Server
//!
//! The visibility-clipping and redraw-coordination core of a
//! client/server display compositor: a desktop arbiter owns global
//! z-order and clipping while one thread per window drains that
//! window's drawing commands and drives the asynchronous repaint
//! handshake with its client.

mod config;
mod decorator;
mod desktop;
mod error;
mod region;
mod session;
mod window;

use std::os::unix::net::UnixListener;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use desktop::Desktop;
use session::Session;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "strata=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Strata display server");

    let config = Config::load()?;
    let socket_path = config
        .ipc
        .socket_path
        .clone()
        .unwrap_or_else(strata_ipc::socket_path);

    let desktop = Arc::new(Desktop::new(&config));

    // Remove a stale socket from a previous run
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
    }

    let listener = UnixListener::bind(&socket_path).context("Failed to bind session socket")?;
    info!("Listening for client sessions on {:?}", socket_path);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                info!("client connected");
                let desktop = desktop.clone();
                thread::spawn(move || {
                    if let Err(e) = Session::run(desktop, stream) {
                        warn!("session ended with error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("accept error: {}", e);
            }
        }
    }

    Ok(())
}
