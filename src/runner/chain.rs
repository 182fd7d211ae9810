//! Deferred execution of a compiled chain.
//!
//! [`run`] composes the top-level units into one sequential pipeline and
//! parks it on the current tokio runtime. Nothing is invoked until
//! [`ChainTrigger::start`] is called; [`ChainCompletion`] resolves once the
//! last unit finished or with the first failure.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{BuildError, Result};

use super::compiler::CompiledChain;

/// Starts a chain returned by [`run`].
///
/// Consumed by [`start`](Self::start), so a chain can only be started once.
/// Dropping the trigger without starting makes the completion resolve with
/// [`BuildError::ChainNotStarted`].
#[derive(Debug)]
pub struct ChainTrigger {
    tx: oneshot::Sender<()>,
}

impl ChainTrigger {
    /// Begin executing the chain.
    pub fn start(self) {
        // The receiver only goes away if the runtime is shutting down.
        let _ = self.tx.send(());
    }
}

/// Awaitable outcome of a chain returned by [`run`].
#[derive(Debug)]
pub struct ChainCompletion {
    handle: JoinHandle<Result<()>>,
}

impl Future for ChainCompletion {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(err) => Err(anyhow::Error::new(err).context("chain task aborted").into()),
        })
    }
}

/// Compose a chain for deferred execution.
///
/// Must be called from within a tokio runtime.
pub fn run(chain: CompiledChain) -> (ChainTrigger, ChainCompletion) {
    run_with_handler(chain, |_| {})
}

/// Like [`run`], calling `on_error` exactly once if the chain fails.
///
/// The handler sees the same error that the completion resolves with.
pub fn run_with_handler<F>(chain: CompiledChain, on_error: F) -> (ChainTrigger, ChainCompletion)
where
    F: FnOnce(&BuildError) + Send + 'static,
{
    let (tx, rx) = oneshot::channel::<()>();
    let units = chain.into_units();

    let handle = tokio::spawn(async move {
        let outcome = async {
            rx.await.map_err(|_| BuildError::ChainNotStarted)?;
            debug!("chain started with {} entries", units.len());
            for unit in &units {
                unit.invoke().await?;
            }
            Ok::<(), BuildError>(())
        }
        .await;

        if let Err(err) = &outcome {
            on_error(err);
        }
        outcome
    });

    (ChainTrigger { tx }, ChainCompletion { handle })
}
