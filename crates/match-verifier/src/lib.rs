//! Match validator.
//!
//! Re-checks a candidate [`ExchangeTransaction`] against its embedded orders
//! and the history of prior matches on those orders. Validation is all-or-
//! nothing: the first failed predicate is returned and nothing is accepted
//! partially.
//!
//! The crossing rule is uniform: `buy.price >= sell.price`, independent of
//! which asset either order owns.

use std::collections::HashMap;

use thiserror::Error;

use common_types::numeric::partial_fee;
use common_types::{
    DomainError, ExchangeTransaction, OrderRejection, Side, Signature,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("transaction fee must be positive")]
    NonPositiveFee,
    #[error("executed amount must be positive")]
    NonPositiveAmount,
    #[error("price must be positive")]
    NonPositivePrice,
    #[error("order1 must be a buy order and order2 a sell order")]
    SidesMismatch,
    #[error("orders name different matchers")]
    MatcherMismatch,
    #[error("order asset pairs do not mirror each other")]
    AssetMismatch,
    #[error("buy price {buy} is below sell price {sell}")]
    PricesNotCrossing { buy: u64, sell: u64 },
    #[error("trade price {price} belongs to neither embedded order")]
    PriceMismatch { price: u64 },
    #[error("embedded {side:?} order is invalid: {reason}")]
    OrderInvalid { side: Side, reason: OrderRejection },
    #[error("embedded {side:?} order carries an invalid signature")]
    OrderSignatureInvalid { side: Side },
    #[error("{side:?} order over-filled: {prior} already executed + {amount} exceeds {total}")]
    OverFill { side: Side, prior: u64, amount: u64, total: u64 },
    #[error("matcher fee {actual} differs from the proportional sum {expected}")]
    FeeMismatch { expected: u64, actual: u64 },
    #[error("matcher signature does not verify")]
    SignatureInvalid,
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Cumulative record of prior matches, keyed by the orders' canonical
/// signatures.
pub trait MatchHistory {
    /// Total amount already executed against the order with `signature`.
    fn executed_amount(&self, signature: &Signature) -> u64;
}

#[derive(Debug, Default)]
pub struct InMemoryMatchHistory {
    filled: HashMap<[u8; 64], u64>,
}

impl InMemoryMatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts an accepted transaction against both embedded orders.
    pub fn record(&mut self, tx: &ExchangeTransaction) {
        for order in [tx.buy_order(), tx.sell_order()] {
            *self.filled.entry(order.signature.to_bytes()).or_insert(0) += tx.amount;
        }
    }
}

impl MatchHistory for InMemoryMatchHistory {
    fn executed_amount(&self, signature: &Signature) -> u64 {
        self.filled.get(&signature.to_bytes()).copied().unwrap_or(0)
    }
}

/// Validates `tx` against its embedded orders and `history`.
pub fn validate(
    tx: &ExchangeTransaction,
    history: &dyn MatchHistory,
) -> Result<(), ValidationError> {
    if tx.fee == 0 {
        return Err(ValidationError::NonPositiveFee);
    }
    if tx.amount == 0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    if tx.price == 0 {
        return Err(ValidationError::NonPositivePrice);
    }

    let buy = tx.buy_order();
    let sell = tx.sell_order();
    if buy.side != Side::Buy || sell.side != Side::Sell {
        return Err(ValidationError::SidesMismatch);
    }
    if buy.matcher != sell.matcher {
        return Err(ValidationError::MatcherMismatch);
    }
    if buy.spend_asset() != sell.receive_asset() || sell.spend_asset() != buy.receive_asset() {
        return Err(ValidationError::AssetMismatch);
    }
    if buy.price < sell.price {
        return Err(ValidationError::PricesNotCrossing { buy: buy.price, sell: sell.price });
    }

    if tx.price != buy.price && tx.price != sell.price {
        return Err(ValidationError::PriceMismatch { price: tx.price });
    }

    for (side, order) in [(Side::Buy, buy), (Side::Sell, sell)] {
        order
            .validate(tx.timestamp)
            .map_err(|reason| ValidationError::OrderInvalid { side, reason })?;
        if !order.verify_signature() {
            return Err(ValidationError::OrderSignatureInvalid { side });
        }
    }

    for (side, order) in [(Side::Buy, buy), (Side::Sell, sell)] {
        let prior = history.executed_amount(&order.signature);
        match prior.checked_add(tx.amount) {
            Some(cumulative) if cumulative <= order.amount => {}
            _ => {
                return Err(ValidationError::OverFill {
                    side,
                    prior,
                    amount: tx.amount,
                    total: order.amount,
                })
            }
        }
    }

    let expected_fee = partial_fee(buy.matcher_fee, buy.amount, tx.amount)?
        .checked_add(partial_fee(sell.matcher_fee, sell.amount, tx.amount)?)
        .ok_or(DomainError::Overflow("validator fee sum"))?;
    if tx.matcher_fee != expected_fee {
        return Err(ValidationError::FeeMismatch {
            expected: expected_fee,
            actual: tx.matcher_fee,
        });
    }

    if !tx.verify_signature() {
        return Err(ValidationError::SignatureInvalid);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::asset::{Asset, AssetPair};
    use common_types::test_support::{signed_order, signing_key, OrderSpec};
    use common_types::Order;
    use ed25519_dalek::Signer;

    fn buy_order(amount: u64) -> Order {
        signed_order(OrderSpec {
            sender_seed: 1,
            side: Side::Buy,
            price: 1000,
            amount,
            ..OrderSpec::default()
        })
    }

    fn sell_order(amount: u64) -> Order {
        signed_order(OrderSpec {
            sender_seed: 2,
            side: Side::Sell,
            price: 1000,
            amount,
            ..OrderSpec::default()
        })
    }

    /// A correctly formed and signed transaction over `buy` and `sell`.
    fn make_tx(buy: Order, sell: Order, amount: u64) -> ExchangeTransaction {
        let matcher_fee = partial_fee(buy.matcher_fee, buy.amount, amount).unwrap()
            + partial_fee(sell.matcher_fee, sell.amount, amount).unwrap();
        let tx = ExchangeTransaction {
            order1: buy,
            order2: sell,
            price: sell.price,
            amount,
            matcher_fee,
            fee: 300_000,
            timestamp: buy.timestamp + 1,
            signature: Signature::from_bytes(&[0; 64]),
        };
        resign(tx)
    }

    fn resign(mut tx: ExchangeTransaction) -> ExchangeTransaction {
        tx.signature = Signature(signing_key(99).sign(&tx.to_sign_bytes()));
        tx
    }

    #[test]
    fn well_formed_transaction_is_accepted() {
        let tx = make_tx(buy_order(1_000_000), sell_order(1_000_000), 1_000_000);
        assert_eq!(validate(&tx, &InMemoryMatchHistory::new()), Ok(()));
    }

    #[test]
    fn either_embedded_price_is_acceptable() {
        let buy = signed_order(OrderSpec {
            sender_seed: 1,
            side: Side::Buy,
            price: 1100,
            amount: 1_000_000,
            ..OrderSpec::default()
        });
        let sell = sell_order(1_000_000);

        let mut at_sell_price = make_tx(buy, sell, 1_000_000);
        at_sell_price.price = sell.price;
        assert_eq!(
            validate(&resign(at_sell_price), &InMemoryMatchHistory::new()),
            Ok(())
        );

        let mut at_buy_price = make_tx(buy, sell, 1_000_000);
        at_buy_price.price = buy.price;
        assert_eq!(
            validate(&resign(at_buy_price), &InMemoryMatchHistory::new()),
            Ok(())
        );

        let mut in_between = make_tx(buy, sell, 1_000_000);
        in_between.price = 1050;
        assert_eq!(
            validate(&resign(in_between), &InMemoryMatchHistory::new()),
            Err(ValidationError::PriceMismatch { price: 1050 })
        );
    }

    #[test]
    fn zero_fee_amount_or_price_is_rejected() {
        let tx = make_tx(buy_order(1_000_000), sell_order(1_000_000), 1_000_000);

        let mut no_fee = tx;
        no_fee.fee = 0;
        assert_eq!(
            validate(&resign(no_fee), &InMemoryMatchHistory::new()),
            Err(ValidationError::NonPositiveFee)
        );

        let mut no_amount = tx;
        no_amount.amount = 0;
        assert_eq!(
            validate(&resign(no_amount), &InMemoryMatchHistory::new()),
            Err(ValidationError::NonPositiveAmount)
        );

        let mut no_price = tx;
        no_price.price = 0;
        assert_eq!(
            validate(&resign(no_price), &InMemoryMatchHistory::new()),
            Err(ValidationError::NonPositivePrice)
        );
    }

    #[test]
    fn mismatched_matchers_are_rejected() {
        let buy = buy_order(1_000_000);
        let sell = signed_order(OrderSpec {
            sender_seed: 2,
            matcher_seed: 55,
            side: Side::Sell,
            price: 1000,
            amount: 1_000_000,
            ..OrderSpec::default()
        });
        let tx = make_tx(buy, sell, 1_000_000);
        assert_eq!(
            validate(&tx, &InMemoryMatchHistory::new()),
            Err(ValidationError::MatcherMismatch)
        );
    }

    #[test]
    fn mismatched_pairs_are_rejected() {
        let buy = buy_order(1_000_000);
        let sell = signed_order(OrderSpec {
            sender_seed: 2,
            side: Side::Sell,
            price: 1000,
            amount: 1_000_000,
            pair: AssetPair { amount_asset: Asset::Issued([0xBB; 32]), price_asset: Asset::Native },
            ..OrderSpec::default()
        });
        let tx = make_tx(buy, sell, 1_000_000);
        assert_eq!(
            validate(&tx, &InMemoryMatchHistory::new()),
            Err(ValidationError::AssetMismatch)
        );
    }

    #[test]
    fn non_crossing_prices_are_rejected() {
        let buy = signed_order(OrderSpec {
            sender_seed: 1,
            side: Side::Buy,
            price: 990,
            amount: 1_000_000,
            ..OrderSpec::default()
        });
        let mut tx = make_tx(buy, sell_order(1_000_000), 1_000_000);
        tx.price = 990;
        assert_eq!(
            validate(&resign(tx), &InMemoryMatchHistory::new()),
            Err(ValidationError::PricesNotCrossing { buy: 990, sell: 1000 })
        );
    }

    #[test]
    fn expired_embedded_order_is_rejected() {
        let buy = buy_order(1_000_000);
        let mut tx = make_tx(buy, sell_order(1_000_000), 1_000_000);
        tx.timestamp = buy.expiration;
        assert!(matches!(
            validate(&resign(tx), &InMemoryMatchHistory::new()),
            Err(ValidationError::OrderInvalid {
                side: Side::Buy,
                reason: OrderRejection::Expired { .. }
            })
        ));
    }

    #[test]
    fn cumulative_fills_may_not_exceed_the_order_amount() {
        let buy = buy_order(1_000_000);
        let sell_a = sell_order(400_000);
        let sell_b = signed_order(OrderSpec {
            sender_seed: 3,
            side: Side::Sell,
            price: 1000,
            amount: 400_000,
            ..OrderSpec::default()
        });
        let sell_c = signed_order(OrderSpec {
            sender_seed: 4,
            side: Side::Sell,
            price: 1000,
            amount: 300_000,
            ..OrderSpec::default()
        });

        let mut history = InMemoryMatchHistory::new();
        let first = make_tx(buy, sell_a, 400_000);
        assert_eq!(validate(&first, &history), Ok(()));
        history.record(&first);

        let second = make_tx(buy, sell_b, 400_000);
        assert_eq!(validate(&second, &history), Ok(()));
        history.record(&second);

        // 800_000 of 1_000_000 consumed: a further 300_000 over-fills.
        let third = make_tx(buy, sell_c, 300_000);
        assert_eq!(
            validate(&third, &history),
            Err(ValidationError::OverFill {
                side: Side::Buy,
                prior: 800_000,
                amount: 300_000,
                total: 1_000_000,
            })
        );
    }

    #[test]
    fn fee_off_by_one_is_rejected() {
        let mut tx = make_tx(buy_order(1_000_000), sell_order(1_000_000), 1_000_000);
        let expected = tx.matcher_fee;
        tx.matcher_fee += 1;
        assert_eq!(
            validate(&resign(tx), &InMemoryMatchHistory::new()),
            Err(ValidationError::FeeMismatch { expected, actual: expected + 1 })
        );
    }

    #[test]
    fn foreign_matcher_signature_is_rejected() {
        let mut tx = make_tx(buy_order(1_000_000), sell_order(1_000_000), 1_000_000);
        tx.signature = Signature(signing_key(55).sign(&tx.to_sign_bytes()));
        assert_eq!(
            validate(&tx, &InMemoryMatchHistory::new()),
            Err(ValidationError::SignatureInvalid)
        );
    }

    #[test]
    fn tampered_embedded_order_is_rejected() {
        let mut buy = buy_order(1_000_000);
        buy.amount = 2_000_000;
        let tx = make_tx(buy, sell_order(2_000_000), 2_000_000);
        assert_eq!(
            validate(&tx, &InMemoryMatchHistory::new()),
            Err(ValidationError::OrderSignatureInvalid { side: Side::Buy })
        );
    }
}
