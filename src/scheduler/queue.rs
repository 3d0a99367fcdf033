use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::{OrderlineError, Result};
use crate::scheduler::order::{OrderClass, OrderRef};

/// The two FIFO lanes, always locked together so a pop decision
/// ("HIGH front, else NORMAL front") is atomic.
#[derive(Debug, Default)]
struct Lanes {
    high: VecDeque<OrderRef>,
    normal: VecDeque<OrderRef>,
    closed: bool,
}

impl Lanes {
    fn lane_mut(&mut self, class: OrderClass) -> &mut VecDeque<OrderRef> {
        match class {
            OrderClass::High => &mut self.high,
            OrderClass::Normal => &mut self.normal,
        }
    }

    fn is_empty(&self) -> bool {
        self.high.is_empty() && self.normal.is_empty()
    }

    fn pop_priority(&mut self) -> Option<OrderRef> {
        self.high.pop_front().or_else(|| self.normal.pop_front())
    }
}

/// Priority double-ended queue shared by every bot.
///
/// - Two lanes, HIGH and NORMAL, both FIFO and both accepting front/back inserts.
/// - Dequeue always takes the HIGH front first and falls back to the NORMAL front.
/// - [`wait_and_dequeue`](Self::wait_and_dequeue) parks on a `Notify` until an item
///   shows up, the queue is closed, or the caller's token is cancelled.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    lanes: Mutex<Lanes>,
    not_empty: Notify,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Lanes> {
        // Lanes stay structurally valid even if a holder panicked
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append to the back of the order's lane (fresh submissions).
    pub fn enqueue_back(&self, order: OrderRef) -> Result<()> {
        self.enqueue(order, false)
    }

    /// Insert at the front of the order's lane (interrupted orders).
    pub fn enqueue_front(&self, order: OrderRef) -> Result<()> {
        self.enqueue(order, true)
    }

    fn enqueue(&self, order: OrderRef, front: bool) -> Result<()> {
        let mut lanes = self.lock();
        if lanes.closed {
            return Err(OrderlineError::QueueClosed);
        }
        let was_empty = lanes.is_empty();
        let lane = lanes.lane_mut(order.class);
        if front {
            lane.push_front(order);
        } else {
            lane.push_back(order);
        }
        drop(lanes);

        if was_empty {
            self.not_empty.notify_one();
        }
        Ok(())
    }

    /// Non-blocking priority dequeue. Returns `None` when both lanes are empty.
    pub fn try_dequeue(&self) -> Option<OrderRef> {
        self.lock().pop_priority()
    }

    /// Block until an order is available, the queue closes, or `cancel` fires.
    ///
    /// Cancellation never consumes an item. A waiter that takes an item while
    /// more remain passes the wakeup on, since enqueues only notify on the
    /// empty -> non-empty transition.
    pub async fn wait_and_dequeue(&self, cancel: &CancellationToken) -> Result<OrderRef> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            // Register before inspecting the lanes so no wakeup slips between the check and the await
            notified.as_mut().enable();

            if cancel.is_cancelled() {
                return Err(OrderlineError::Cancelled);
            }

            {
                let mut lanes = self.lock();
                if let Some(order) = lanes.pop_priority() {
                    let more = !lanes.is_empty();
                    drop(lanes);
                    if more {
                        self.not_empty.notify_one();
                    }
                    return Ok(order);
                }
                if lanes.closed {
                    return Err(OrderlineError::QueueClosed);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(OrderlineError::Cancelled),
                _ = &mut notified => {}
            }
        }
    }

    /// Copy both lanes, front first, under one lock acquisition.
    pub fn snapshot(&self) -> (Vec<OrderRef>, Vec<OrderRef>) {
        let lanes = self.lock();
        (
            lanes.high.iter().copied().collect(),
            lanes.normal.iter().copied().collect(),
        )
    }

    /// Close the queue and wake every waiter. Idempotent.
    pub fn close(&self) {
        let mut lanes = self.lock();
        if lanes.closed {
            return;
        }
        lanes.closed = true;
        drop(lanes);
        self.not_empty.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        let lanes = self.lock();
        lanes.high.len() + lanes.normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
