use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrderlineError {
    #[error("Order queue is closed")]
    QueueClosed,

    #[error("Wait for an order was cancelled")]
    Cancelled,

    #[error("Unknown order class: {0:?} (expected normal or vip)")]
    InvalidOrderClass(String),

    #[error("No active bots to remove")]
    NoActiveBots,

    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OrderlineError>;
