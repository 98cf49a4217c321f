use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};

use common_types::{LimitOrder, OrderId, Side};

pub type PriceLevel = VecDeque<LimitOrder>;

/// Per-pair book of resting limit orders.
///
/// Price priority comes from the map ordering (bids descending via
/// `Reverse`, asks ascending); time priority is FIFO within a level, so the
/// queue position is the monotonic insertion sequence. Order timestamps are
/// never consulted for ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    bids: BTreeMap<Reverse<u64>, PriceLevel>,
    asks: BTreeMap<u64, PriceLevel>,
}

/// Aggregated depth at one price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelAgg {
    pub price: u64,
    pub amount: u64,
}

impl OrderBook {
    pub fn new() -> Self {
        OrderBook::default()
    }

    /// Rests `order` behind everything already at its price.
    pub fn add(&mut self, order: LimitOrder) {
        debug_assert!(order.amount > 0, "resting orders must have remaining amount");
        let price = order.price();
        match order.order.side {
            Side::Buy => self.bids.entry(Reverse(price)).or_default().push_back(order),
            Side::Sell => self.asks.entry(price).or_default().push_back(order),
        }
    }

    /// The order first in line on `side`.
    pub fn best(&self, side: Side) -> Option<&LimitOrder> {
        match side {
            Side::Buy => self.bids.values().next().and_then(PriceLevel::front),
            Side::Sell => self.asks.values().next().and_then(PriceLevel::front),
        }
    }

    pub fn best_bid(&self) -> Option<u64> {
        self.bids.keys().next().map(|Reverse(price)| *price)
    }

    pub fn best_ask(&self) -> Option<u64> {
        self.asks.keys().next().copied()
    }

    /// Removes and returns the order first in line on `side`.
    pub fn pop_best(&mut self, side: Side) -> Option<LimitOrder> {
        match side {
            Side::Buy => {
                let mut entry = self.bids.first_entry()?;
                let order = entry.get_mut().pop_front();
                if entry.get().is_empty() {
                    entry.remove();
                }
                order
            }
            Side::Sell => {
                let mut entry = self.asks.first_entry()?;
                let order = entry.get_mut().pop_front();
                if entry.get().is_empty() {
                    entry.remove();
                }
                order
            }
        }
    }

    /// Swaps the order first in line for its reduced remainder, keeping its
    /// queue position.
    pub fn replace_best(&mut self, remainder: LimitOrder) {
        let front = match remainder.order.side {
            Side::Buy => self.bids.values_mut().next().and_then(|level| level.front_mut()),
            Side::Sell => self.asks.values_mut().next().and_then(|level| level.front_mut()),
        };
        if let Some(front) = front {
            debug_assert_eq!(front.id(), remainder.id(), "replace_best must keep the same order");
            *front = remainder;
        }
    }

    /// Removes the resting order with `order_id` from either side.
    pub fn cancel(&mut self, order_id: &OrderId) -> Option<LimitOrder> {
        fn remove_from<K: Ord + Copy>(
            levels: &mut BTreeMap<K, PriceLevel>,
            order_id: &OrderId,
        ) -> Option<LimitOrder> {
            let (key, position) = levels.iter().find_map(|(key, level)| {
                level
                    .iter()
                    .position(|resting| resting.id() == *order_id)
                    .map(|position| (*key, position))
            })?;
            let level = levels.get_mut(&key)?;
            let removed = level.remove(position);
            if level.is_empty() {
                levels.remove(&key);
            }
            removed
        }

        remove_from(&mut self.bids, order_id).or_else(|| remove_from(&mut self.asks, order_id))
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.bids
            .values()
            .chain(self.asks.values())
            .any(|level| level.iter().any(|resting| resting.id() == *order_id))
    }

    /// Aggregated depth of `side`, best price first.
    pub fn levels(&self, side: Side) -> Vec<LevelAgg> {
        let aggregate = |price: u64, level: &PriceLevel| LevelAgg {
            price,
            amount: level.iter().map(|resting| resting.amount).sum(),
        };
        match side {
            Side::Buy => self
                .bids
                .iter()
                .map(|(Reverse(price), level)| aggregate(*price, level))
                .collect(),
            Side::Sell => self
                .asks
                .iter()
                .map(|(price, level)| aggregate(*price, level))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Number of resting orders across both sides.
    pub fn len(&self) -> usize {
        self.bids
            .values()
            .chain(self.asks.values())
            .map(PriceLevel::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::test_support::{signed_order, OrderSpec};

    fn limit(seed: u8, side: Side, price: u64, amount: u64) -> LimitOrder {
        LimitOrder::new(signed_order(OrderSpec {
            sender_seed: seed,
            side,
            price,
            amount,
            ..OrderSpec::default()
        }))
    }

    #[test]
    fn bids_descend_and_asks_ascend() {
        let mut book = OrderBook::new();
        book.add(limit(1, Side::Buy, 900, 100_000));
        book.add(limit(2, Side::Buy, 950, 100_000));
        book.add(limit(3, Side::Sell, 1100, 100_000));
        book.add(limit(4, Side::Sell, 1050, 100_000));

        assert_eq!(book.best_bid(), Some(950));
        assert_eq!(book.best_ask(), Some(1050));
        assert_eq!(book.best(Side::Buy).unwrap().price(), 950);
        assert_eq!(book.best(Side::Sell).unwrap().price(), 1050);
    }

    #[test]
    fn fifo_within_a_price_level() {
        let mut book = OrderBook::new();
        let first = limit(1, Side::Sell, 1000, 100_000);
        let second = limit(2, Side::Sell, 1000, 200_000);
        book.add(first.clone());
        book.add(second.clone());

        assert_eq!(book.pop_best(Side::Sell).unwrap().id(), first.id());
        assert_eq!(book.pop_best(Side::Sell).unwrap().id(), second.id());
        assert!(book.is_empty());
    }

    #[test]
    fn pop_best_drops_empty_levels() {
        let mut book = OrderBook::new();
        book.add(limit(1, Side::Buy, 900, 100_000));
        book.add(limit(2, Side::Buy, 800, 100_000));
        book.pop_best(Side::Buy);
        assert_eq!(book.best_bid(), Some(800));
    }

    #[test]
    fn replace_best_keeps_queue_position() {
        let mut book = OrderBook::new();
        let first = limit(1, Side::Sell, 1000, 300_000);
        book.add(first.clone());
        book.add(limit(2, Side::Sell, 1000, 200_000));

        book.replace_best(first.partial(100_000, 10));
        let front = book.best(Side::Sell).unwrap();
        assert_eq!(front.id(), first.id());
        assert_eq!(front.amount, 100_000);
    }

    #[test]
    fn cancel_removes_from_either_side() {
        let mut book = OrderBook::new();
        let bid = limit(1, Side::Buy, 900, 100_000);
        let ask = limit(2, Side::Sell, 1100, 100_000);
        book.add(bid.clone());
        book.add(ask.clone());

        assert_eq!(book.cancel(&ask.id()).unwrap().id(), ask.id());
        assert!(!book.contains(&ask.id()));
        assert!(book.contains(&bid.id()));
        assert!(book.cancel(&ask.id()).is_none());
    }

    #[test]
    fn levels_aggregate_remaining_amounts() {
        let mut book = OrderBook::new();
        book.add(limit(1, Side::Sell, 1000, 100_000));
        book.add(limit(2, Side::Sell, 1000, 150_000));
        book.add(limit(3, Side::Sell, 1010, 50_000));

        let levels = book.levels(Side::Sell);
        assert_eq!(
            levels,
            vec![
                LevelAgg { price: 1000, amount: 250_000 },
                LevelAgg { price: 1010, amount: 50_000 },
            ]
        );
    }
}
