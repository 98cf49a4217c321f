use serde::Serialize;

use crate::accepted::{AcceptedOrder, LimitOrder};
use crate::error::{DomainError, OrderRejection};
use crate::numeric::{cost, partial_fee};
use crate::order::Side;

/// Why an order left the matcher without (fully) trading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CancelReason {
    /// Client-initiated cancel.
    Requested,
    /// Market order with no crossing counter or no fundable fill.
    Unfillable,
    /// Residue below the dust floor for its price.
    DustResidue,
    /// Refused at admission.
    Rejected(OrderRejection),
    /// Tradable balance cannot fund the order.
    BalanceInsufficient,
    /// Arithmetic failure while matching; the submission is aborted.
    Arithmetic(DomainError),
}

/// Events produced by the matching engine. Self-contained value records:
/// they carry copies of the orders involved, never references into the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MatchEvent {
    OrderAdded { order: LimitOrder, timestamp: u64 },
    OrderExecuted(OrderExecuted),
    OrderCanceled(OrderCanceled),
}

/// A single fill of `submitted` against the resting `counter`.
///
/// The trading price is the counter's price. The executed amount is fixed at
/// construction; remainders and fee shares derive from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderExecuted {
    pub submitted: AcceptedOrder,
    pub counter: LimitOrder,
    pub executed_amount: u64,
    pub timestamp: u64,
}

impl OrderExecuted {
    pub fn new(
        submitted: AcceptedOrder,
        counter: LimitOrder,
        timestamp: u64,
    ) -> Result<OrderExecuted, DomainError> {
        let executed_amount = submitted.executed_amount_against(&counter)?;
        Ok(OrderExecuted { submitted, counter, executed_amount, timestamp })
    }

    /// The settlement price: always the resting side's.
    pub fn price(&self) -> u64 {
        self.counter.price()
    }

    pub fn executed_amount_of_price_asset(&self) -> Result<u64, DomainError> {
        cost(self.executed_amount, self.price())
    }

    pub fn counter_executed_fee(&self) -> Result<u64, DomainError> {
        partial_fee(
            self.counter.order.matcher_fee,
            self.counter.order.amount,
            self.executed_amount,
        )
    }

    pub fn submitted_executed_fee(&self) -> Result<u64, DomainError> {
        let order = self.submitted.order();
        partial_fee(order.matcher_fee, order.amount, self.executed_amount)
    }

    /// The counter order after this fill; an empty remainder still carries
    /// the order for status bookkeeping.
    pub fn counter_remaining(&self) -> Result<LimitOrder, DomainError> {
        let amount = self.counter.amount - self.executed_amount;
        let fee = self.counter.fee.saturating_sub(self.counter_executed_fee()?);
        Ok(self.counter.partial(amount, fee))
    }

    /// The submitted order after this fill. Market remainders also shed the
    /// spent-asset units this fill consumed (and the fee share when the fee
    /// is charged in the spent asset).
    pub fn submitted_remaining(&self) -> Result<AcceptedOrder, DomainError> {
        let amount = self.submitted.amount() - self.executed_amount;
        let fee = self.submitted.fee().saturating_sub(self.submitted_executed_fee()?);
        match &self.submitted {
            AcceptedOrder::Limit(limit) => Ok(AcceptedOrder::Limit(limit.partial(amount, fee))),
            AcceptedOrder::Market(market) => {
                let spent = match market.order.side {
                    Side::Sell => self.executed_amount,
                    Side::Buy => self.executed_amount_of_price_asset()?,
                };
                let mut afs = market.available_for_spending.saturating_sub(spent);
                if market.order.fee_asset == market.order.spend_asset() {
                    afs = afs.saturating_sub(self.submitted_executed_fee()?);
                }
                Ok(AcceptedOrder::Market(market.partial(amount, fee, afs)))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderCanceled {
    pub order: AcceptedOrder,
    pub reason: CancelReason,
    pub timestamp: u64,
}

impl OrderCanceled {
    pub fn is_system_cancel(&self) -> bool {
        !matches!(self.reason, CancelReason::Requested)
    }
}
