// Thin re-export of tokio with a named task spawner.
// Daemon code should spawn background work through `spawn_task` so
// every long-lived task announces its lifecycle in the logs.

pub use ::tokio::*;

use ::tokio::task::JoinHandle;
use log::debug;
use std::future::Future;

/// Spawn a named background task.
///
/// The name is only used for logging, tokio itself does not track it.
pub fn spawn_task<F>(name: impl Into<String>, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let name = name.into();
    debug!("Spawning task '{}'", name);
    spawn(async move {
        let output = future.await;
        debug!("Task '{}' has exited", name);
        output
    })
}
