//! Bots that cook orders.
//!
//! Each bot runs as its own tokio task:
//! - **Wait**: parks on the shared [`PriorityQueue`](crate::scheduler::PriorityQueue)
//!   until an order shows up or the bot is cancelled
//! - **Cook**: races the processing timer against its cancellation token
//! - **Report**: every transition is sent to the scheduler as a [`BotEvent`]
//!
//! # Components
//!
//! - [`Bot`]: handle to a running bot task (cancel, state reads)
//! - [`event`]: the event payloads bots emit
//!
//! # Cancellation
//!
//! Cancellation is cooperative and only observed while waiting on the queue
//! or waiting for the processing timer. A bot cancelled while cooking reports
//! `INTERRUPTED` with the order it held and then stops.

pub mod bot;
pub mod event;

pub use bot::{Bot, BotState};
pub use event::{BotEvent, BotEventKind};
