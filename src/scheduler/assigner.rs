use std::collections::HashMap;

/// Tracks which bot currently owns each in-flight order.
///
/// Terminal events are fenced on this table: a `COMPLETED` or `INTERRUPTED`
/// report is accepted only from the bot recorded as the order's owner, and
/// accepting it removes the entry. Late or duplicate reports therefore find
/// no matching entry and are dropped.
#[derive(Debug, Default)]
pub struct OwnershipTable {
    owners: HashMap<u64, u64>,
}

impl OwnershipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bot_id` as the owner of `order_id`, replacing any previous owner.
    pub fn assign(&mut self, order_id: u64, bot_id: u64) -> Option<u64> {
        self.owners.insert(order_id, bot_id)
    }

    /// Release the entry if `bot_id` is the current owner.
    /// Returns false for stale or duplicate reports.
    pub fn release(&mut self, order_id: u64, bot_id: u64) -> bool {
        if self.owners.get(&order_id) == Some(&bot_id) {
            self.owners.remove(&order_id);
            true
        } else {
            false
        }
    }

    pub fn owner_of(&self, order_id: u64) -> Option<u64> {
        self.owners.get(&order_id).copied()
    }

    /// Orders currently held by a bot
    pub fn orders_for_bot(&self, bot_id: u64) -> Vec<u64> {
        let mut orders: Vec<u64> = self
            .owners
            .iter()
            .filter(|(_, owner)| **owner == bot_id)
            .map(|(order_id, _)| *order_id)
            .collect();
        orders.sort_unstable();
        orders
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_requires_matching_owner() {
        let mut table = OwnershipTable::new();
        table.assign(1, 10);

        assert!(!table.release(1, 11));
        assert_eq!(table.owner_of(1), Some(10));

        assert!(table.release(1, 10));
        assert!(table.owner_of(1).is_none());
    }

    #[test]
    fn duplicate_release_is_rejected() {
        let mut table = OwnershipTable::new();
        table.assign(5, 2);
        assert!(table.release(5, 2));
        assert!(!table.release(5, 2));
        assert!(table.is_empty());
    }

    #[test]
    fn reassignment_fences_out_previous_owner() {
        let mut table = OwnershipTable::new();
        table.assign(3, 1);
        assert!(table.release(3, 1));
        assert_eq!(table.assign(3, 2), None);

        // Late report from the first bot must not touch the new assignment
        assert!(!table.release(3, 1));
        assert_eq!(table.owner_of(3), Some(2));
    }

    #[test]
    fn orders_for_bot_lists_held_orders() {
        let mut table = OwnershipTable::new();
        table.assign(4, 1);
        table.assign(2, 1);
        table.assign(3, 2);

        assert_eq!(table.orders_for_bot(1), vec![2, 4]);
        assert_eq!(table.orders_for_bot(2), vec![3]);
        assert!(table.orders_for_bot(9).is_empty());
        assert_eq!(table.len(), 3);
    }
}
