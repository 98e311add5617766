//! Stdio server: one connection, strictly sequential request handling.
//!
//! [`serve`] drives any reader/writer pair and is what the tests exercise.
//! [`serve_stdio`] wires it to the process streams together with the store,
//! the TTL sweeper and signal handling.

pub mod counters;
pub mod dispatch;
pub mod protocol;
pub mod wire;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::watch;

use crate::config::MemoryConfig;
use crate::db;
use crate::memory::{lifecycle, MemoryService};
use dispatch::Dispatcher;
use wire::{write_message, MessageReader, WireError, WireMode};

/// How a [`serve`] loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeExit {
    /// The peer closed the stream between messages.
    EndOfStream,
    /// The shutdown signal fired.
    Cancelled,
}

/// Read, dispatch and answer messages until end of stream or shutdown.
///
/// A broken frame or a failed write ends the loop with an error.
pub async fn serve<R, W>(
    dispatcher: &Dispatcher,
    reader: R,
    mut writer: W,
    mut shutdown: watch::Receiver<bool>,
) -> Result<ServeExit, WireError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = MessageReader::new(reader);
    let mut watching = true;

    loop {
        if *shutdown.borrow() {
            return Ok(ServeExit::Cancelled);
        }

        let payload = {
            let next = reader.next_message();
            tokio::pin!(next);
            loop {
                tokio::select! {
                    msg = &mut next => break msg?,
                    changed = shutdown.changed(), if watching => match changed {
                        Ok(()) if *shutdown.borrow() => return Ok(ServeExit::Cancelled),
                        Ok(()) => {}
                        // Sender gone: nobody can cancel us any more.
                        Err(_) => watching = false,
                    },
                }
            }
        };

        let Some(payload) = payload else {
            return Ok(ServeExit::EndOfStream);
        };
        let mode = reader.mode().unwrap_or(WireMode::Line);

        if let Some(response) = dispatcher.handle_payload(&payload).await {
            write_message(&mut writer, mode, &response).await?;
        }
    }
}

/// Start the server on stdin/stdout.
pub async fn serve_stdio(config: MemoryConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let store = db::open_database(&db_path)?;
    let sweep_interval = config.sweep_interval();
    let service = MemoryService::new(store, Arc::new(config))
        .context("failed to initialize memory service")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let sweeper = lifecycle::spawn_sweeper(service.clone(), sweep_interval, shutdown_rx.clone());
    let signals = {
        let tx = Arc::clone(&shutdown_tx);
        let signal = shutdown_signal()?;
        tokio::spawn(async move {
            signal.await;
            tracing::info!("shutdown signal received");
            let _ = tx.send(true);
        })
    };

    tracing::info!(db = %db_path.display(), "memory-mcp serving on stdio");

    let dispatcher = Dispatcher::new(service);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let outcome = serve(&dispatcher, stdin, stdout, shutdown_rx).await;

    let _ = shutdown_tx.send(true);
    signals.abort();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "ttl sweeper ended abnormally");
    }

    let totals = dispatcher.counters();
    match outcome {
        Ok(exit) => {
            tracing::info!(?exit, requests = totals.requests, errors = totals.errors, "server stopped");
            Ok(())
        }
        Err(e) => Err(e).context("stdio transport failed"),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
///
/// The SIGTERM handler is registered before this returns, so a signal that
/// arrives right after startup is not lost.
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to listen for SIGTERM")?;

    Ok(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            terminate.recv().await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
    })
}
