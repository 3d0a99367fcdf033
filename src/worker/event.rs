use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scheduler::order::OrderRef;

/// Lifecycle events a bot reports to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotEventKind {
    Started,
    Stopped,
    Idle,
    Assigned,
    Completed,
    Interrupted,
}

impl BotEventKind {
    /// `Completed` and `Interrupted` end a bot's hold on an order.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BotEventKind::Completed | BotEventKind::Interrupted)
    }
}

impl std::fmt::Display for BotEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotEventKind::Started => write!(f, "started"),
            BotEventKind::Stopped => write!(f, "stopped"),
            BotEventKind::Idle => write!(f, "idle"),
            BotEventKind::Assigned => write!(f, "assigned"),
            BotEventKind::Completed => write!(f, "completed"),
            BotEventKind::Interrupted => write!(f, "interrupted"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BotEvent {
    pub kind: BotEventKind,
    pub bot_id: u64,
    pub order: Option<OrderRef>,
    pub timestamp: DateTime<Utc>,
}

impl BotEvent {
    pub fn new(kind: BotEventKind, bot_id: u64) -> Self {
        Self {
            kind,
            bot_id,
            order: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_order(kind: BotEventKind, bot_id: u64, order: OrderRef) -> Self {
        Self {
            order: Some(order),
            ..Self::new(kind, bot_id)
        }
    }
}

impl std::fmt::Display for BotEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.kind, self.order) {
            (BotEventKind::Assigned, Some(order)) => write!(
                f,
                "BOT #{} ASSIGNED ORDER #{} ({})",
                self.bot_id, order.id, order.class
            ),
            (BotEventKind::Completed, Some(order)) => write!(
                f,
                "ORDER #{} COMPLETE BY BOT #{} ({})",
                order.id, self.bot_id, order.class
            ),
            (BotEventKind::Interrupted, Some(order)) => write!(
                f,
                "ORDER #{} INTERRUPTED BY BOT #{}, REQUEUED FRONT ({})",
                order.id, self.bot_id, order.class
            ),
            (kind, _) => write!(
                f,
                "BOT #{} {}",
                self.bot_id,
                kind.to_string().to_ascii_uppercase()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::order::OrderClass;

    #[test]
    fn terminal_kinds() {
        assert!(BotEventKind::Completed.is_terminal());
        assert!(BotEventKind::Interrupted.is_terminal());
        assert!(!BotEventKind::Assigned.is_terminal());
        assert!(!BotEventKind::Stopped.is_terminal());
    }

    #[test]
    fn renders_journal_text() {
        let order = OrderRef::new(4, OrderClass::High);
        assert_eq!(
            BotEvent::with_order(BotEventKind::Assigned, 2, order).to_string(),
            "BOT #2 ASSIGNED ORDER #4 (HIGH)"
        );
        assert_eq!(
            BotEvent::with_order(BotEventKind::Completed, 2, order).to_string(),
            "ORDER #4 COMPLETE BY BOT #2 (HIGH)"
        );
        assert_eq!(
            BotEvent::with_order(BotEventKind::Interrupted, 2, order).to_string(),
            "ORDER #4 INTERRUPTED BY BOT #2, REQUEUED FRONT (HIGH)"
        );
        assert_eq!(BotEvent::new(BotEventKind::Stopped, 7).to_string(), "BOT #7 STOPPED");
    }
}
