use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::scheduler::order::OrderRef;
use crate::scheduler::queue::PriorityQueue;
use crate::status::BotInfo;
use crate::worker::event::{BotEvent, BotEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotState {
    Idle,
    Busy,
    /// Terminal. A stopped bot is never restarted.
    Stopped,
}

impl std::fmt::Display for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotState::Idle => write!(f, "IDLE"),
            BotState::Busy => write!(f, "BUSY"),
            BotState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// State private to one bot, read by the scheduler only through [`Bot::info`].
#[derive(Debug, Clone)]
struct BotSlot {
    state: BotState,
    current_order: Option<OrderRef>,
    busy_since: Option<DateTime<Utc>>,
}

impl BotSlot {
    fn idle() -> Self {
        Self {
            state: BotState::Idle,
            current_order: None,
            busy_since: None,
        }
    }
}

/// Everything the bot task needs, moved into the spawned future.
struct BotContext {
    id: u64,
    processing_time: Duration,
    slot: Arc<RwLock<BotSlot>>,
    cancel: CancellationToken,
    events: mpsc::Sender<BotEvent>,
    queue: Arc<PriorityQueue>,
}

/// A cooking bot: takes one order at a time from the shared queue and
/// holds it for a fixed processing time.
///
/// The bot never touches scheduler state. Everything it does is reported as a
/// [`BotEvent`] on the scheduler's event channel:
///
/// - `STARTED` once, when the task starts
/// - `IDLE` before every wait on the queue
/// - `ASSIGNED` after taking an order
/// - `COMPLETED` when the processing time elapses
/// - `INTERRUPTED` when cancelled while holding an order
/// - `STOPPED` once, when the loop ends for any reason
#[derive(Debug)]
pub struct Bot {
    id: u64,
    slot: Arc<RwLock<BotSlot>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Bot {
    /// Spawn a bot task that immediately starts competing for queued orders.
    ///
    /// `cancel` should be a child of the scheduler's run token so that a
    /// scheduler shutdown also stops the bot.
    pub fn spawn(
        id: u64,
        processing_time: Duration,
        cancel: CancellationToken,
        events: mpsc::Sender<BotEvent>,
        queue: Arc<PriorityQueue>,
    ) -> Self {
        let slot = Arc::new(RwLock::new(BotSlot::idle()));
        let ctx = BotContext {
            id,
            processing_time,
            slot: slot.clone(),
            cancel: cancel.clone(),
            events,
            queue,
        };
        let task = tokio::spawn(ctx.run());

        Self {
            id,
            slot,
            cancel,
            task,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request cancellation. Returns immediately; the outcome arrives as
    /// `INTERRUPTED` and/or `STOPPED` events.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once the bot task has returned.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn state(&self) -> BotState {
        self.slot.read().await.state
    }

    pub async fn current_order(&self) -> Option<OrderRef> {
        self.slot.read().await.current_order
    }

    pub async fn info(&self) -> BotInfo {
        let slot = self.slot.read().await;
        BotInfo {
            id: self.id,
            state: slot.state,
            current_order: slot.current_order,
            busy_since: slot.busy_since,
        }
    }

    /// Wait for the bot task to finish. Only useful after [`cancel`](Self::cancel).
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(bot_id = self.id, error = %e, "Bot task failed");
        }
    }
}

impl BotContext {
    async fn run(self) {
        self.emit(BotEvent::new(BotEventKind::Started, self.id)).await;

        loop {
            self.set_slot(BotSlot::idle()).await;
            self.emit(BotEvent::new(BotEventKind::Idle, self.id)).await;

            let order = match self.queue.wait_and_dequeue(&self.cancel).await {
                Ok(order) => order,
                Err(e) => {
                    // Cancelled or queue closed: both are normal exits
                    tracing::debug!(bot_id = self.id, reason = %e, "Bot stopped waiting for orders");
                    break;
                }
            };

            self.set_slot(BotSlot {
                state: BotState::Busy,
                current_order: Some(order),
                busy_since: Some(Utc::now()),
            })
            .await;
            self.emit(BotEvent::with_order(BotEventKind::Assigned, self.id, order))
                .await;

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.emit(BotEvent::with_order(BotEventKind::Interrupted, self.id, order)).await;
                    break;
                }
                _ = tokio::time::sleep(self.processing_time) => {
                    self.emit(BotEvent::with_order(BotEventKind::Completed, self.id, order)).await;
                }
            }
        }

        self.set_slot(BotSlot {
            state: BotState::Stopped,
            current_order: None,
            busy_since: None,
        })
        .await;
        self.emit(BotEvent::new(BotEventKind::Stopped, self.id)).await;
    }

    async fn set_slot(&self, slot: BotSlot) {
        *self.slot.write().await = slot;
    }

    async fn emit(&self, event: BotEvent) {
        if self.events.send(event).await.is_err() {
            // Event loop already gone (scheduler dropped); nothing left to report to
            tracing::trace!(bot_id = self.id, "Event receiver closed");
        }
    }
}
