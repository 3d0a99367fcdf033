pub mod assigner;
pub mod coordinator;
pub mod order;
pub mod queue;

pub use assigner::OwnershipTable;
pub use coordinator::Scheduler;
pub use order::{Order, OrderClass, OrderRef, OrderStatus};
pub use queue::PriorityQueue;
