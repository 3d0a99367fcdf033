use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::error::{OrderlineError, Result};
use crate::scheduler::assigner::OwnershipTable;
use crate::scheduler::order::{Order, OrderClass, OrderRef};
use crate::scheduler::queue::PriorityQueue;
use crate::status::StatusSnapshot;
use crate::worker::{Bot, BotEvent, BotEventKind};

const OBSERVER_CAPACITY: usize = 1024;

/// Cross-cutting state. Only [`Scheduler::on_event`] mutates orders,
/// ownership and the completed list after submission.
#[derive(Debug, Default)]
struct SchedulerState {
    next_order_id: u64,
    next_bot_id: u64,
    orders: BTreeMap<u64, Order>,
    ownership: OwnershipTable,
    completed: Vec<OrderRef>,
    /// Live bots, newest last (shrink pops from the end)
    bots: Vec<Bot>,
    /// Handed to every new bot. Taken on shutdown so the event loop ends
    /// once the last bot has reported `STOPPED`.
    events_tx: Option<mpsc::Sender<BotEvent>>,
}

/// Owns the bot pool and the order queue, and is the single writer of
/// order state.
///
/// Bots report through an mpsc channel consumed by [`run`](Self::run); every
/// state transition caused by a bot happens on that one task. Terminal events
/// are fenced on the ownership table, so a completion or interruption from a
/// bot that no longer owns the order is dropped.
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    queue: Arc<PriorityQueue>,
    state: RwLock<SchedulerState>,
    shutdown: CancellationToken,
    observers: broadcast::Sender<BotEvent>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> (Self, mpsc::Receiver<BotEvent>) {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        let (observers, _) = broadcast::channel(OBSERVER_CAPACITY);

        let scheduler = Self {
            config,
            queue: Arc::new(PriorityQueue::new()),
            state: RwLock::new(SchedulerState {
                events_tx: Some(events_tx),
                ..Default::default()
            }),
            shutdown: CancellationToken::new(),
            observers,
        };

        (scheduler, events_rx)
    }

    /// Create a scheduler and spawn its event loop.
    ///
    /// The returned handle resolves after [`shutdown`](Self::shutdown) once
    /// every bot has stopped and its final events have been applied.
    pub fn start(config: SchedulerConfig) -> (Arc<Self>, JoinHandle<()>) {
        let (scheduler, events_rx) = Self::new(config);
        let scheduler = Arc::new(scheduler);
        let event_loop = scheduler.clone();
        let handle = tokio::spawn(async move {
            event_loop.run(events_rx).await;
        });
        (scheduler, handle)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<PriorityQueue> {
        &self.queue
    }

    /// Observe bot events after they have been reconciled. Stale
    /// `COMPLETED`/`INTERRUPTED` reports are not published.
    pub fn subscribe(&self) -> broadcast::Receiver<BotEvent> {
        self.observers.subscribe()
    }

    /// Sender side of the bot event channel, `None` after shutdown.
    pub async fn event_sender(&self) -> Option<mpsc::Sender<BotEvent>> {
        self.state.read().await.events_tx.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Create a PENDING order and append it to the back of its lane.
    pub async fn submit(&self, class: OrderClass) -> Result<Order> {
        let mut state = self.state.write().await;
        let id = state.next_order_id + 1;
        let order = Order::new(id, class);

        self.queue.enqueue_back(order.order_ref())?;
        state.next_order_id = id;
        state.orders.insert(id, order.clone());

        tracing::info!(order_id = id, class = %class, "New order");
        Ok(order)
    }

    /// Add a bot. It starts competing for queued orders right away.
    pub async fn grow_pool(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        let events = match state.events_tx.clone() {
            Some(tx) if !self.queue.is_closed() => tx,
            _ => return Err(OrderlineError::QueueClosed),
        };

        state.next_bot_id += 1;
        let id = state.next_bot_id;
        let bot = Bot::spawn(
            id,
            self.config.processing_time,
            self.shutdown.child_token(),
            events,
            self.queue.clone(),
        );
        state.bots.push(bot);

        tracing::info!(bot_id = id, bots = state.bots.len(), "Bot added");
        Ok(id)
    }

    /// Remove the most recently added bot and request its cancellation.
    ///
    /// Does not wait for the bot. An order it was cooking is requeued when
    /// its `INTERRUPTED` report reaches the event loop.
    pub async fn shrink_pool(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        // Every bot is already stopping once the scheduler is shut down
        if self.is_shut_down() {
            return Err(OrderlineError::NoActiveBots);
        }
        let bot = state.bots.pop().ok_or(OrderlineError::NoActiveBots)?;
        bot.cancel();

        let held = state.ownership.orders_for_bot(bot.id());
        tracing::info!(
            bot_id = bot.id(),
            bots = state.bots.len(),
            held = ?held,
            "Bot removed"
        );
        Ok(bot.id())
    }

    /// Consume bot events until every sender is gone.
    pub async fn run(&self, mut events_rx: mpsc::Receiver<BotEvent>) {
        while let Some(event) = events_rx.recv().await {
            self.on_event(event).await;
        }
        tracing::info!("Scheduler event loop stopped");
    }

    /// Apply one bot event and publish it to observers.
    ///
    /// Terminal events that fail the ownership fence are dropped without
    /// being published.
    async fn on_event(&self, event: BotEvent) {
        let bot_id = event.bot_id;
        let mut state = self.state.write().await;
        let mut accepted = true;

        match (event.kind, event.order) {
            (BotEventKind::Started, _) => {
                tracing::info!(bot_id, "Bot started");
            }
            (BotEventKind::Stopped, _) => {
                tracing::info!(bot_id, "Bot stopped");
            }
            (BotEventKind::Idle, _) => {
                tracing::debug!(bot_id, "Bot idle");
            }
            (BotEventKind::Assigned, Some(order)) => {
                if let Some(record) = state.orders.get_mut(&order.id) {
                    record.mark_processing(bot_id);
                    state.ownership.assign(order.id, bot_id);
                    tracing::info!(bot_id, order_id = order.id, class = %order.class, "Order assigned");
                } else {
                    tracing::debug!(bot_id, order_id = order.id, "Assignment for unknown order ignored");
                }
            }
            (BotEventKind::Completed, Some(order)) => {
                if !state.ownership.release(order.id, bot_id) {
                    accepted = false;
                    tracing::debug!(bot_id, order_id = order.id, "Stale completion discarded");
                } else {
                    if let Some(record) = state.orders.get_mut(&order.id) {
                        record.mark_complete(event.timestamp);
                    }
                    state.completed.push(order);
                    tracing::info!(bot_id, order_id = order.id, class = %order.class, "Order complete");
                }
            }
            (BotEventKind::Interrupted, Some(order)) => {
                if !state.ownership.release(order.id, bot_id) {
                    accepted = false;
                    tracing::debug!(bot_id, order_id = order.id, "Stale interruption discarded");
                } else {
                    if let Some(record) = state.orders.get_mut(&order.id) {
                        record.mark_pending();
                    }
                    match self.queue.enqueue_front(order) {
                        Ok(()) => tracing::info!(
                            bot_id,
                            order_id = order.id,
                            class = %order.class,
                            "Order interrupted, requeued at front"
                        ),
                        Err(e) => tracing::debug!(
                            bot_id,
                            order_id = order.id,
                            reason = %e,
                            "Order interrupted during shutdown, left pending"
                        ),
                    }
                }
            }
            (kind, None) => {
                accepted = !kind.is_terminal();
                tracing::debug!(bot_id, kind = %kind, "Order event without an order ignored");
            }
        }
        drop(state);

        if !accepted {
            return;
        }
        // No subscribers is fine
        let _ = self.observers.send(event);
    }

    /// Consistent view of bots, both lanes and completions.
    pub async fn status(&self) -> StatusSnapshot {
        let state = self.state.read().await;

        let mut bots = Vec::with_capacity(state.bots.len());
        for bot in &state.bots {
            bots.push(bot.info().await);
        }
        let (pending_high, pending_normal) = self.queue.snapshot();
        let skip = state
            .completed
            .len()
            .saturating_sub(self.config.recent_completed_limit);

        StatusSnapshot {
            taken_at: Utc::now(),
            bots,
            pending_high,
            pending_normal,
            completed_count: state.completed.len(),
            recent_completed: state.completed[skip..].to_vec(),
        }
    }

    pub async fn order(&self, id: u64) -> Result<Order> {
        self.state
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or(OrderlineError::OrderNotFound(id))
    }

    /// All orders ever submitted, by id.
    pub async fn orders(&self) -> Vec<Order> {
        self.state.read().await.orders.values().cloned().collect()
    }

    /// Completed orders in completion order.
    pub async fn completed(&self) -> Vec<OrderRef> {
        self.state.read().await.completed.clone()
    }

    /// Bot currently recorded as owning `order_id`, if any.
    pub async fn owner_of(&self, order_id: u64) -> Option<u64> {
        self.state.read().await.ownership.owner_of(order_id)
    }

    pub async fn bot_ids(&self) -> Vec<u64> {
        self.state.read().await.bots.iter().map(Bot::id).collect()
    }

    /// Cancel every bot and close the queue. Idempotent.
    pub async fn shutdown(&self) {
        let mut state = self.state.write().await;
        if state.events_tx.take().is_none() {
            return;
        }
        self.shutdown.cancel();
        self.queue.close();
        tracing::info!(bots = state.bots.len(), "Scheduler shutting down");
    }
}
