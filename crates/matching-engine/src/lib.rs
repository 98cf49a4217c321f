//! Matching engine library.
//!
//! This crate implements counter-price priority matching of accepted orders
//! over a per-pair [`OrderBook`]. It is intentionally minimal and free of
//! networking or persistence concerns.
//!
//! Key properties
//! - Deterministic: given the same input sequence, produces the same events
//! - Price-time priority: best price first; FIFO within each price level
//! - The trading price of a fill is always the resting order's price
//! - Never panics on arithmetic: overflow system-cancels the submission
//!
pub mod book;

pub use book::{LevelAgg, OrderBook, PriceLevel};

use common_types::numeric::min_amount_for_price;
use common_types::{
    AcceptedOrder, CancelReason, DomainError, LimitOrder, MatchEvent, OrderCanceled,
    OrderExecuted, OrderId, Side,
};

/// Core trait for processing submissions against an order book.
///
/// Implementations consume one [`AcceptedOrder`] at a time and return the
/// sequence of [`MatchEvent`]s generated (zero or more fills, then either a
/// placement or a cancel for whatever remains).
pub trait MatchingEngine {
    fn process_order(&mut self, submitted: AcceptedOrder, timestamp: u64) -> Vec<MatchEvent>;

    /// Client-initiated cancel; `None` when the book does not hold the order.
    fn cancel_order(&mut self, order_id: &OrderId, timestamp: u64) -> Option<MatchEvent>;
}

impl MatchingEngine for OrderBook {
    fn process_order(&mut self, submitted: AcceptedOrder, timestamp: u64) -> Vec<MatchEvent> {
        let mut events = Vec::new();

        if !submitted.is_valid(submitted.price()) {
            events.push(system_cancel(submitted, CancelReason::Unfillable, timestamp));
            return events;
        }

        let mut current = submitted;
        loop {
            let counter_side = current.side().opposite();
            let counter = match self.best(counter_side) {
                Some(counter) if prices_cross(&current, counter.price()) => counter.clone(),
                _ => {
                    rest_or_cancel(self, current, &mut events, timestamp);
                    return events;
                }
            };

            match execute_against(self, current, counter, timestamp, &mut events) {
                Ok(Some(remainder)) => current = remainder,
                Ok(None) => return events,
                Err(error) => {
                    events.push(system_cancel(
                        current,
                        CancelReason::Arithmetic(error),
                        timestamp,
                    ));
                    return events;
                }
            }
        }
    }

    fn cancel_order(&mut self, order_id: &OrderId, timestamp: u64) -> Option<MatchEvent> {
        let removed = self.cancel(order_id)?;
        Some(MatchEvent::OrderCanceled(OrderCanceled {
            order: AcceptedOrder::Limit(removed),
            reason: CancelReason::Requested,
            timestamp,
        }))
    }
}

fn prices_cross(submitted: &AcceptedOrder, counter_price: u64) -> bool {
    match submitted.side() {
        Side::Buy => submitted.price() >= counter_price,
        Side::Sell => submitted.price() <= counter_price,
    }
}

/// One fill of `current` against the best counter. Returns the remainder to
/// keep matching with, or `None` when the submission is finished (events for
/// the terminal outcome already emitted).
fn execute_against(
    book: &mut OrderBook,
    current: AcceptedOrder,
    counter: LimitOrder,
    timestamp: u64,
    events: &mut Vec<MatchEvent>,
) -> Result<Option<AcceptedOrder>, DomainError> {
    let counter_side = counter.order.side;
    let event = OrderExecuted::new(current, counter.clone(), timestamp)?;

    if event.executed_amount == 0 {
        // Equivalent to a non-crossing counter: the overlap is pure dust.
        rest_or_cancel(book, current, events, timestamp);
        return Ok(None);
    }

    let counter_remaining = event.counter_remaining()?;
    if counter_remaining.amount == 0
        || counter_remaining.amount < min_amount_for_price(counter.price())?
    {
        book.pop_best(counter_side);
    } else {
        book.replace_best(counter_remaining);
    }

    let submitted_remaining = event.submitted_remaining()?;
    events.push(MatchEvent::OrderExecuted(event));

    if submitted_remaining.amount() > 0
        && submitted_remaining.is_valid(submitted_remaining.price())
    {
        return Ok(Some(submitted_remaining));
    }

    if submitted_remaining.amount() > 0 {
        let reason = if submitted_remaining.is_market() {
            // Spending cap exhausted before the amount was.
            CancelReason::Unfillable
        } else {
            CancelReason::DustResidue
        };
        events.push(system_cancel(submitted_remaining, reason, timestamp));
    }
    Ok(None)
}

/// Step for a submission with no crossing counter: rest a viable limit
/// remainder, system-cancel everything else.
fn rest_or_cancel(
    book: &mut OrderBook,
    current: AcceptedOrder,
    events: &mut Vec<MatchEvent>,
    timestamp: u64,
) {
    match current {
        AcceptedOrder::Limit(limit) => {
            let floor = min_amount_for_price(limit.price()).unwrap_or(u64::MAX);
            if limit.amount >= floor {
                book.add(limit.clone());
                events.push(MatchEvent::OrderAdded { order: limit, timestamp });
            } else {
                events.push(system_cancel(
                    AcceptedOrder::Limit(limit),
                    CancelReason::DustResidue,
                    timestamp,
                ));
            }
        }
        AcceptedOrder::Market(_) => {
            events.push(system_cancel(current, CancelReason::Unfillable, timestamp));
        }
    }
}

fn system_cancel(order: AcceptedOrder, reason: CancelReason, timestamp: u64) -> MatchEvent {
    debug_assert!(!matches!(reason, CancelReason::Requested));
    MatchEvent::OrderCanceled(OrderCanceled { order, reason, timestamp })
}
