//! Request dispatch over the shared monitor channel.
//!
//! [`Dispatcher::spawn`] hands the monitor stream to a background task
//! that owns the [`CorrelationTable`]. Callers register through an mpsc
//! command queue and then submit out of band; the task matches monitor
//! events against what has been registered and answers each caller on its
//! own oneshot.
//!
//! Commands are always drained before the next monitor frame is looked at.
//! Registration is queued before the submission is sent, so the identity
//! announcement for a request can never be processed ahead of it.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use tungstenite::Message;

use super::correlation::{CorrelationTable, Reply, RequestKey, Ticket};
use super::parse_frame;
use crate::models::{BookSnapshot, MonitorEvent, TaskBlueprint, Value};
use crate::submit::Submitter;
use crate::{Result, SweeperError};

/// Instructions from callers to the dispatch task.
#[derive(Debug)]
enum Command {
    Register {
        ticket: Ticket,
        key: RequestKey,
        reply: Reply,
    },
    Withdraw(Ticket),
}

/// Caller-side handle of the dispatch layer.
///
/// Many `submit` calls may be in flight at once from the same task; their
/// completions arrive in whatever order the engine finishes them.
pub struct Dispatcher<S> {
    commands: mpsc::UnboundedSender<Command>,
    submitter: S,
    next_ticket: AtomicU64,
}

impl<S: Submitter> Dispatcher<S> {
    /// Starts the dispatch task on `monitor` and returns the handle plus
    /// the task's join handle.
    ///
    /// The task runs until the monitor closes or errors (rejecting all
    /// outstanding requests) or until every handle has been dropped.
    pub fn spawn<St>(monitor: St, submitter: S) -> (Self, JoinHandle<()>)
    where
        St: Stream<Item = std::result::Result<Message, tungstenite::Error>>
            + Unpin
            + Send
            + 'static,
    {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = DispatchTask {
            monitor,
            commands: rx,
            table: CorrelationTable::new(),
        };
        let handle = tokio::spawn(task.run());

        (
            Self {
                commands,
                submitter,
                next_ticket: AtomicU64::new(0),
            },
            handle,
        )
    }

    /// Submits a request and waits for its `Finished` result.
    ///
    /// # Errors
    ///
    /// Returns the submitter's error if the request could not be sent, or
    /// [`SweeperError::ChannelClosed`] if the monitor went away first.
    pub async fn submit(&self, blueprint: TaskBlueprint) -> Result<serde_json::Value> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (reply, done) = oneshot::channel();

        self.commands
            .send(Command::Register {
                ticket,
                key: RequestKey::from(&blueprint),
                reply,
            })
            .map_err(|_| SweeperError::ChannelClosed)?;
        // From here on, leaving early (error or the caller dropping this
        // future) must withdraw the registration.
        let mut registration = Registration::new(self.commands.clone(), ticket);

        if let Err(e) = self.submitter.submit(&blueprint).await {
            warn!(
                function_key = %blueprint.function_key,
                "Submission failed: {e}"
            );
            return Err(e);
        }

        let outcome = done.await;
        registration.disarm();
        outcome.map_err(|_| SweeperError::ChannelClosed)?
    }

    /// Submits a request and decodes its result.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit), plus
    /// [`SweeperError::UnexpectedResult`] for an unfamiliar result shape.
    pub async fn request(&self, blueprint: TaskBlueprint) -> Result<Value> {
        let raw = self.submit(blueprint).await?;
        Value::from_raw(&raw)
    }

    /// Best bid price on the order-book fiber.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn best_bid(&self) -> Result<Option<u64>> {
        self.request(TaskBlueprint::order_book("best_bid", vec![]))
            .await?
            .into_option_u64()
    }

    /// Best ask price on the order-book fiber.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn best_ask(&self) -> Result<Option<u64>> {
        self.request(TaskBlueprint::order_book("best_ask", vec![]))
            .await?
            .into_option_u64()
    }

    /// Top `n` levels of each side of the book.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn top_n_depth(&self, n: u64) -> Result<BookSnapshot> {
        self.request(TaskBlueprint::order_book("top_n_depth", vec![Value::U64(n)]))
            .await?
            .into_snapshot()
    }

    /// `false` once the dispatch task has stopped.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.commands.is_closed()
    }
}

/// Withdraws a registered request when dropped, unless disarmed once the
/// request has been answered.
struct Registration {
    commands: mpsc::UnboundedSender<Command>,
    ticket: Ticket,
    armed: bool,
}

impl Registration {
    fn new(commands: mpsc::UnboundedSender<Command>, ticket: Ticket) -> Self {
        Self {
            commands,
            ticket,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.armed {
            trace!(ticket = self.ticket, "Withdrawing abandoned request");
            // A closed task has already rejected everything.
            let _ = self.commands.send(Command::Withdraw(self.ticket));
        }
    }
}

/// Background half: owns the monitor stream and the correlation table.
struct DispatchTask<St> {
    monitor: St,
    commands: mpsc::UnboundedReceiver<Command>,
    table: CorrelationTable,
}

impl<St> DispatchTask<St>
where
    St: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.apply(cmd),
                    None => {
                        debug!("All dispatcher handles dropped");
                        break;
                    }
                },

                frame = self.monitor.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(text.as_bytes()),
                    Some(Ok(Message::Binary(bytes))) => self.handle_frame(&bytes),
                    Some(Ok(Message::Close(frame))) => {
                        warn!(?frame, "Monitor closed by remote");
                        break;
                    }
                    Some(Ok(_)) => {} // Ping/Pong/raw frames
                    Some(Err(e)) => {
                        warn!("Monitor error: {e}");
                        break;
                    }
                    None => {
                        warn!("Monitor stream ended");
                        break;
                    }
                },
            }
        }

        // Stop accepting registrations before rejecting, so nothing new
        // can slip in after the table is cleared.
        self.commands.close();
        while let Ok(cmd) = self.commands.try_recv() {
            self.apply(cmd);
        }
        let rejected = self.table.close();
        info!(rejected, "Dispatcher stopped");
    }

    fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::Register { ticket, key, reply } => self.table.register(ticket, key, reply),
            Command::Withdraw(ticket) => {
                if self.table.withdraw(ticket) {
                    debug!(ticket, "Request withdrawn");
                }
            }
        }
    }

    fn handle_frame(&mut self, bytes: &[u8]) {
        let Some(event) = parse_frame::<MonitorEvent>(bytes) else {
            return;
        };
        match event {
            MonitorEvent::NewRequest {
                id,
                fiber_type,
                function_key,
                init_values,
            } => {
                let key = RequestKey {
                    fiber_type,
                    function_key,
                    init_values,
                };
                if self.table.assign(id, &key) {
                    debug!(id, function_key = %key.function_key, "Request identified");
                }
            }
            MonitorEvent::TxUpdate(reply) => {
                let id = reply.meta.id;
                if self.table.update(reply) {
                    debug!(id, "Request finished");
                }
            }
        }
    }
}
