use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scheduler::order::OrderRef;
use crate::worker::BotState;

/// Observable state of one live bot.
#[derive(Debug, Clone, Serialize)]
pub struct BotInfo {
    pub id: u64,
    pub state: BotState,
    pub current_order: Option<OrderRef>,
    pub busy_since: Option<DateTime<Utc>>,
}

impl BotInfo {
    pub fn current_order_id(&self) -> Option<u64> {
        self.current_order.map(|o| o.id)
    }
}

/// Point-in-time view of the whole system, taken without interleaving
/// with event reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub taken_at: DateTime<Utc>,
    /// Live bots, oldest first
    pub bots: Vec<BotInfo>,
    pub pending_high: Vec<OrderRef>,
    pub pending_normal: Vec<OrderRef>,
    pub completed_count: usize,
    /// Most recently completed orders, newest last
    pub recent_completed: Vec<OrderRef>,
}

impl StatusSnapshot {
    /// Pending order ids in dequeue order: HIGH lane, then NORMAL lane.
    pub fn pending_ids(&self) -> Vec<u64> {
        self.pending_high
            .iter()
            .chain(self.pending_normal.iter())
            .map(|o| o.id)
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending_high.len() + self.pending_normal.len()
    }

    pub fn busy_bots(&self) -> usize {
        self.bots
            .iter()
            .filter(|b| b.state == BotState::Busy)
            .count()
    }

    /// `HIGH:<n> NORMAL:<n> COMPLETE:<n> BOTS:<n>`
    pub fn compact_line(&self) -> String {
        format!(
            "HIGH:{} NORMAL:{} COMPLETE:{} BOTS:{}",
            self.pending_high.len(),
            self.pending_normal.len(),
            self.completed_count,
            self.bots.len()
        )
    }
}

impl std::fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.compact_line())
    }
}
