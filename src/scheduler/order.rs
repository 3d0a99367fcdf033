use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrderlineError;

/// Priority class of an order. `High` (VIP) orders always drain first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderClass {
    High,
    Normal,
}

impl std::fmt::Display for OrderClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderClass::High => write!(f, "HIGH"),
            OrderClass::Normal => write!(f, "NORMAL"),
        }
    }
}

impl FromStr for OrderClass {
    type Err = OrderlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "vip" | "h" | "v" => Ok(OrderClass::High),
            "normal" | "n" => Ok(OrderClass::Normal),
            _ => Err(OrderlineError::InvalidOrderClass(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Complete,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Processing => write!(f, "PROCESSING"),
            OrderStatus::Complete => write!(f, "COMPLETE"),
        }
    }
}

/// Lightweight, immutable handle stored in the queue lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderRef {
    pub id: u64,
    pub class: OrderClass,
}

impl OrderRef {
    pub fn new(id: u64, class: OrderClass) -> Self {
        Self { id, class }
    }
}

/// The externally visible order record. Exactly one exists per id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub class: OrderClass,
    pub status: OrderStatus,
    pub processing_bot: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(id: u64, class: OrderClass) -> Self {
        Self {
            id,
            class,
            status: OrderStatus::Pending,
            processing_bot: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn order_ref(&self) -> OrderRef {
        OrderRef::new(self.id, self.class)
    }

    pub(crate) fn mark_processing(&mut self, bot_id: u64) {
        self.status = OrderStatus::Processing;
        self.processing_bot = Some(bot_id);
    }

    pub(crate) fn mark_complete(&mut self, at: DateTime<Utc>) {
        self.status = OrderStatus::Complete;
        self.processing_bot = None;
        self.completed_at = Some(at);
    }

    /// Roll back an interrupted order so it can be picked up again.
    pub(crate) fn mark_pending(&mut self) {
        self.status = OrderStatus::Pending;
        self.processing_bot = None;
    }
}
