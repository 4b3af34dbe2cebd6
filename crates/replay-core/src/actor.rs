//! Command/view plumbing shared by the controller tasks.
//!
//! Each controller runs as one task that exclusively owns its state. A
//! [`Handle`] sends commands over an `mpsc` channel and awaits a `oneshot`
//! reply carrying the view derived right after the command was applied.
//! Every transition, including timer ticks and fetch completions, is also
//! published on a `watch` channel for the presentation layer.

use std::future::Future;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ControllerError;

/// Commands buffered per controller before senders wait.
const MAILBOX_CAPACITY: usize = 32;

/// A command together with the channel its reply goes to.
#[derive(Debug)]
pub(crate) struct Envelope<C, V> {
    pub command: C,
    pub reply: Reply<V>,
}

/// One-shot reply slot for a single command.
#[derive(Debug)]
pub(crate) struct Reply<V>(oneshot::Sender<Result<V, ControllerError>>);

impl<V> Reply<V> {
    /// Send the reply. The caller may have stopped waiting; that is fine.
    pub fn send(self, outcome: Result<V, ControllerError>) {
        if self.0.send(outcome).is_err() {
            debug!("command reply dropped by caller");
        }
    }
}

/// Client side of a controller task.
#[derive(Debug)]
pub(crate) struct Handle<C, V> {
    commands: mpsc::Sender<Envelope<C, V>>,
    views: watch::Receiver<V>,
    task: JoinHandle<()>,
}

impl<C, V> Handle<C, V>
where
    C: Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Spawn the controller loop `run` with a fresh mailbox and view channel.
    pub fn spawn<F, Fut>(initial: V, run: F) -> Self
    where
        F: FnOnce(mpsc::Receiver<Envelope<C, V>>, watch::Sender<V>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (commands, mailbox) = mpsc::channel(MAILBOX_CAPACITY);
        let (publisher, views) = watch::channel(initial);
        let task = tokio::spawn(run(mailbox, publisher));
        Self {
            commands,
            views,
            task,
        }
    }

    /// Send a command and wait for the resulting view.
    pub async fn send(&self, command: C) -> Result<V, ControllerError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Envelope {
                command,
                reply: Reply(reply),
            })
            .await
            .map_err(|_closed| ControllerError::Closed)?;
        response.await.map_err(|_dropped| ControllerError::Closed)?
    }

    /// The most recently published view.
    pub fn view(&self) -> V {
        self.views.borrow().clone()
    }

    /// A receiver that observes every published view.
    pub fn subscribe(&self) -> watch::Receiver<V> {
        self.views.clone()
    }

    /// Close the mailbox and wait for the task to tear down.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(err) = task.await {
            debug!(error = %err, "controller task ended abnormally");
        }
    }
}
