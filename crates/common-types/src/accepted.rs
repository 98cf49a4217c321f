//! Orders as the matcher holds them: the immutable signed [`Order`] plus the
//! remaining executable amount and the fee proportionate to it.
//!
//! Limit orders may rest on a book; market orders additionally carry the
//! available-for-spending cap and are never rested.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::asset::Asset;
use crate::error::DomainError;
use crate::numeric::{
    correct_amount, cost, min_amount_for_price, MAX_AMOUNT, PRICE_CONSTANT,
};
use crate::order::{Order, OrderId, Side};

/// A resting-capable order with its remaining amount and fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub amount: u64,
    pub fee: u64,
    pub order: Order,
}

impl LimitOrder {
    pub fn new(order: Order) -> Self {
        LimitOrder { amount: order.amount, fee: order.matcher_fee, order }
    }

    /// A copy with reduced remainders; `self` is untouched.
    pub fn partial(&self, new_amount: u64, new_fee: u64) -> LimitOrder {
        LimitOrder { amount: new_amount, fee: new_fee, order: self.order }
    }

    pub fn price(&self) -> u64 {
        self.order.price
    }

    pub fn id(&self) -> OrderId {
        self.order.id()
    }

    /// Remaining amount with dust at this order's own price stripped.
    pub fn amount_of_amount_asset(&self) -> Result<u64, DomainError> {
        correct_amount(self.amount, self.order.price)
    }
}

/// A fill-or-kill-style order capped by the spendable balance snapshot taken
/// at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub amount: u64,
    pub fee: u64,
    pub order: Order,
    /// Spent-asset units the matcher may consume for this order.
    pub available_for_spending: u64,
}

impl MarketOrder {
    pub fn new(order: Order, available_for_spending: u64) -> Self {
        MarketOrder {
            amount: order.amount,
            fee: order.matcher_fee,
            order,
            available_for_spending,
        }
    }

    /// Caps spending by the tradable balance of the spent asset: the order
    /// may consume at most what a limit order would require and at most what
    /// the balance snapshot holds.
    pub fn with_tradable_balance(
        order: Order,
        tradable_balance: impl FnOnce(Asset) -> u64,
    ) -> Result<MarketOrder, DomainError> {
        let spend_asset = order.spend_asset();
        let as_limit = AcceptedOrder::Limit(LimitOrder::new(order));
        let required = as_limit
            .required_balance()?
            .get(&spend_asset)
            .copied()
            .unwrap_or(0);
        let afs = tradable_balance(spend_asset).min(required);
        Ok(MarketOrder::new(order, afs))
    }

    pub fn partial(&self, new_amount: u64, new_fee: u64, new_afs: u64) -> MarketOrder {
        MarketOrder {
            amount: new_amount,
            fee: new_fee,
            order: self.order,
            available_for_spending: new_afs,
        }
    }
}

/// An order the matcher has accepted for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptedOrder {
    Limit(LimitOrder),
    Market(MarketOrder),
}

impl From<LimitOrder> for AcceptedOrder {
    fn from(limit: LimitOrder) -> Self {
        AcceptedOrder::Limit(limit)
    }
}

impl From<MarketOrder> for AcceptedOrder {
    fn from(market: MarketOrder) -> Self {
        AcceptedOrder::Market(market)
    }
}

impl AcceptedOrder {
    pub fn order(&self) -> &Order {
        match self {
            AcceptedOrder::Limit(limit) => &limit.order,
            AcceptedOrder::Market(market) => &market.order,
        }
    }

    /// Remaining executable amount in amount-asset units.
    pub fn amount(&self) -> u64 {
        match self {
            AcceptedOrder::Limit(limit) => limit.amount,
            AcceptedOrder::Market(market) => market.amount,
        }
    }

    /// Matcher fee remaining, proportionate to [`Self::amount`].
    pub fn fee(&self) -> u64 {
        match self {
            AcceptedOrder::Limit(limit) => limit.fee,
            AcceptedOrder::Market(market) => market.fee,
        }
    }

    pub fn is_market(&self) -> bool {
        matches!(self, AcceptedOrder::Market(_))
    }

    pub fn side(&self) -> Side {
        self.order().side
    }

    pub fn price(&self) -> u64 {
        self.order().price
    }

    pub fn id(&self) -> OrderId {
        self.order().id()
    }

    pub fn spend_asset(&self) -> Asset {
        self.order().spend_asset()
    }

    pub fn receive_asset(&self) -> Asset {
        self.order().receive_asset()
    }

    pub fn fee_asset(&self) -> Asset {
        self.order().fee_asset
    }

    pub fn amount_of_amount_asset(&self) -> Result<u64, DomainError> {
        correct_amount(self.amount(), self.price())
    }

    pub fn amount_of_price_asset(&self) -> Result<u64, DomainError> {
        cost(self.amount(), self.price())
    }

    /// Spent-asset units this remainder pays out at its own price.
    pub fn spend_amount(&self) -> Result<u64, DomainError> {
        match self.side() {
            Side::Buy => self.amount_of_price_asset(),
            Side::Sell => Ok(self.amount()),
        }
    }

    /// Received-asset units this remainder collects at its own price.
    pub fn receive_amount(&self) -> Result<u64, DomainError> {
        match self.side() {
            Side::Buy => self.amount_of_amount_asset(),
            Side::Sell => self.amount_of_price_asset(),
        }
    }

    /// Fee still owed after netting against the receive leg when the fee is
    /// charged in the received asset.
    pub fn required_fee(&self) -> Result<u64, DomainError> {
        let fee = self.fee();
        if self.fee_asset() == self.receive_asset() {
            Ok(fee.saturating_sub(self.receive_amount()?))
        } else {
            Ok(fee)
        }
    }

    /// Per-asset balance needed to fund this remainder in full.
    pub fn required_balance(&self) -> Result<BTreeMap<Asset, u64>, DomainError> {
        let mut required = BTreeMap::new();
        required.insert(self.spend_asset(), self.spend_amount()?);
        let fee = self.required_fee()?;
        let entry = required.entry(self.fee_asset()).or_insert(0);
        *entry = entry
            .checked_add(fee)
            .ok_or(DomainError::Overflow("required_balance"))?;
        Ok(required)
    }

    /// Like [`Self::required_balance`], but a market order reserves only its
    /// available-for-spending cap on the spent asset.
    pub fn reservable_balance(&self) -> Result<BTreeMap<Asset, u64>, DomainError> {
        let mut reservable = self.required_balance()?;
        if let AcceptedOrder::Market(market) = self {
            reservable.insert(self.spend_asset(), market.available_for_spending);
        }
        Ok(reservable)
    }

    /// Whether this remainder can still trade against a counter at
    /// `counter_price`: above the dust floor, below the maximum, and both
    /// legs non-zero at its own price.
    pub fn is_valid(&self, counter_price: u64) -> bool {
        let amount = self.amount();
        if amount == 0 || amount >= MAX_AMOUNT {
            return false;
        }
        let dust_floor = match min_amount_for_price(counter_price) {
            Ok(floor) => floor,
            Err(_) => return false,
        };
        if amount < dust_floor {
            return false;
        }
        let spend_ok = self.spend_amount().map(|v| v > 0).unwrap_or(false);
        let receive_ok = self.receive_amount().map(|v| v > 0).unwrap_or(false);
        spend_ok && receive_ok
    }

    /// The amount that executes when this order trades against `counter`.
    ///
    /// The trading price is always the counter's price. A limit order trades
    /// the dust-corrected overlap; a market order is further capped by what
    /// its available-for-spending can pay for, including the fee when the fee
    /// is charged in the spent asset. All divisions truncate toward zero.
    pub fn executed_amount_against(&self, counter: &LimitOrder) -> Result<u64, DomainError> {
        let counter_price = counter.price();
        let matched =
            correct_amount(self.amount(), counter_price)?.min(counter.amount_of_amount_asset()?);

        let market = match self {
            AcceptedOrder::Limit(_) => return Ok(matched),
            AcceptedOrder::Market(market) => market,
        };

        let afs = u128::from(market.available_for_spending);
        let total = u128::from(market.order.amount);
        let fee = u128::from(market.order.matcher_fee);
        let fee_in_spend_asset = market.order.fee_asset == market.order.spend_asset();

        let cap = match market.order.side {
            Side::Buy => {
                let affordable = if fee_in_spend_asset {
                    let denom = u128::from(cost(market.order.amount, counter_price)?) + fee;
                    if denom == 0 {
                        0
                    } else {
                        afs * total / denom
                    }
                } else {
                    afs * u128::from(PRICE_CONSTANT) / u128::from(counter_price)
                };
                let clamped = affordable.min(u128::from(MAX_AMOUNT)) as u64;
                correct_amount(clamped, counter_price)?
            }
            Side::Sell => {
                let sellable = if fee_in_spend_asset {
                    afs * total / (total + fee)
                } else {
                    afs
                };
                sellable.min(u128::from(MAX_AMOUNT)) as u64
            }
        };

        Ok(matched.min(cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{signed_order, OrderSpec, AMOUNT_ASSET, FEE_ASSET_ID};

    fn limit(side: Side, price: u64, amount: u64, fee: u64) -> LimitOrder {
        LimitOrder::new(signed_order(OrderSpec {
            side,
            price,
            amount,
            matcher_fee: fee,
            ..OrderSpec::default()
        }))
    }

    #[test]
    fn limit_constructor_takes_full_remainders() {
        let order = signed_order(OrderSpec { amount: 500, matcher_fee: 70, ..OrderSpec::default() });
        let accepted = LimitOrder::new(order);
        assert_eq!(accepted.amount, 500);
        assert_eq!(accepted.fee, 70);
    }

    #[test]
    fn partial_reduces_without_touching_the_original() {
        let original = limit(Side::Buy, 1000, 1_000_000, 300_000);
        let reduced = original.partial(600_000, 180_000);
        assert_eq!(reduced.amount, 600_000);
        assert_eq!(reduced.fee, 180_000);
        assert_eq!(original.amount, 1_000_000);
        assert_eq!(reduced.order, original.order);
    }

    #[test]
    fn required_balance_for_buy_covers_cost_and_fee() {
        // Buy 1_000_000 at price 1000: spends 10_000 of the price asset.
        let buy = AcceptedOrder::Limit(limit(Side::Buy, 1000, 1_000_000, 300_000));
        let required = buy.required_balance().unwrap();
        assert_eq!(required[&Asset::Native], 10_000 + 300_000);
        assert_eq!(required.len(), 1);
    }

    #[test]
    fn required_balance_merges_fee_with_spend_asset() {
        let sell = AcceptedOrder::Limit(LimitOrder::new(signed_order(OrderSpec {
            side: Side::Sell,
            price: 1000,
            amount: 1_000_000,
            matcher_fee: 300_000,
            fee_asset: AMOUNT_ASSET,
            ..OrderSpec::default()
        })));
        let required = sell.required_balance().unwrap();
        assert_eq!(required[&AMOUNT_ASSET], 1_000_000 + 300_000);
    }

    #[test]
    fn required_fee_nets_against_the_receive_leg() {
        // Buy receives the amount asset; fee charged in the amount asset is
        // covered by the receipt when it is large enough.
        let buy = AcceptedOrder::Limit(LimitOrder::new(signed_order(OrderSpec {
            side: Side::Buy,
            price: 1000,
            amount: 1_000_000,
            matcher_fee: 300_000,
            fee_asset: AMOUNT_ASSET,
            ..OrderSpec::default()
        })));
        assert_eq!(buy.required_fee().unwrap(), 0);
        assert_eq!(buy.required_balance().unwrap()[&AMOUNT_ASSET], 0);
    }

    #[test]
    fn reservable_balance_replaces_spend_entry_for_market_orders() {
        let order = signed_order(OrderSpec {
            side: Side::Buy,
            price: 1000,
            amount: 1_000_000,
            ..OrderSpec::default()
        });
        let market = AcceptedOrder::Market(MarketOrder::new(order, 4_000));
        let reservable = market.reservable_balance().unwrap();
        // The spend+fee entry is replaced wholesale by the AFS cap.
        assert_eq!(reservable[&Asset::Native], 4_000);
    }

    #[test]
    fn with_tradable_balance_caps_at_required() {
        let order = signed_order(OrderSpec {
            side: Side::Buy,
            price: 1000,
            amount: 1_000_000,
            ..OrderSpec::default()
        });
        // Plenty of balance: capped by the limit-order requirement.
        let rich = MarketOrder::with_tradable_balance(order, |_| u64::MAX).unwrap();
        assert_eq!(rich.available_for_spending, 10_000 + 300_000);
        // Thin balance: capped by the snapshot.
        let poor = MarketOrder::with_tradable_balance(order, |_| 2_500).unwrap();
        assert_eq!(poor.available_for_spending, 2_500);
    }

    #[test]
    fn validity_enforces_the_dust_floor() {
        let small = AcceptedOrder::Limit(limit(Side::Buy, 1_000_000, 99, 10));
        // 99 < min_amount_for_price(10^6) = 100.
        assert!(!small.is_valid(1_000_000));
        let enough = AcceptedOrder::Limit(limit(Side::Buy, 1_000_000, 100, 10));
        assert!(enough.is_valid(1_000_000));
    }

    #[test]
    fn limit_execution_takes_the_corrected_overlap() {
        let submitted = AcceptedOrder::Limit(limit(Side::Buy, 1000, 1_000_000, 300_000));
        let counter = limit(Side::Sell, 1000, 400_000, 300_000);
        assert_eq!(submitted.executed_amount_against(&counter).unwrap(), 400_000);

        let big_counter = limit(Side::Sell, 1000, 2_000_000, 300_000);
        assert_eq!(
            submitted.executed_amount_against(&big_counter).unwrap(),
            1_000_000
        );
    }

    #[test]
    fn market_buy_capped_by_afs_with_fee_in_spend_asset() {
        // Buy 1_000_000 at price 1000 costs 10_000 plus a 10_000 fee in the
        // spent asset; an AFS of 5_000 funds only a fifth of that.
        let order = signed_order(OrderSpec {
            side: Side::Buy,
            price: 1000,
            amount: 1_000_000,
            matcher_fee: 10_000,
            fee_asset: Asset::Native,
            ..OrderSpec::default()
        });
        let market = AcceptedOrder::Market(MarketOrder::new(order, 5_000));
        let counter = limit(Side::Sell, 1000, 1_000_000, 1);

        // AFS * a / (cost(a, price) + fee) = 5_000 * 1_000_000 / 20_000,
        // then dust-corrected at the counter price.
        let expected = correct_amount(250_000, 1000).unwrap();
        assert_eq!(expected, 200_000);
        assert_eq!(market.executed_amount_against(&counter).unwrap(), expected);

        // The executed cost plus the proportional fee stays within AFS.
        let spent = cost(expected, 1000).unwrap()
            + crate::numeric::partial_fee(10_000, 1_000_000, expected).unwrap();
        assert!(spent <= 5_000);
    }

    #[test]
    fn market_buy_capped_by_afs_with_external_fee_asset() {
        let order = signed_order(OrderSpec {
            side: Side::Buy,
            price: 1000,
            amount: 1_000_000,
            matcher_fee: 10_000,
            fee_asset: FEE_ASSET_ID,
            ..OrderSpec::default()
        });
        let market = AcceptedOrder::Market(MarketOrder::new(order, 5));
        let counter = limit(Side::Sell, 1000, 1_000_000, 1);

        // AFS * PRICE_CONSTANT / price = 5 * 10^8 / 1000 amount units.
        assert_eq!(market.executed_amount_against(&counter).unwrap(), 500_000);
        assert_eq!(cost(500_000, 1000).unwrap(), 5);
    }

    #[test]
    fn market_sell_capped_by_afs() {
        let order = signed_order(OrderSpec {
            side: Side::Sell,
            price: 1000,
            amount: 1_000_000,
            matcher_fee: 0,
            fee_asset: FEE_ASSET_ID,
            ..OrderSpec::default()
        });
        let market = AcceptedOrder::Market(MarketOrder::new(order, 250_000));
        let counter = limit(Side::Buy, 1000, 1_000_000, 300_000);
        assert_eq!(market.executed_amount_against(&counter).unwrap(), 250_000);
    }

    #[test]
    fn market_sell_reserves_fee_from_afs_when_fee_in_amount_asset() {
        let order = signed_order(OrderSpec {
            side: Side::Sell,
            price: 1000,
            amount: 1_000_000,
            matcher_fee: 100_000,
            fee_asset: AMOUNT_ASSET,
            ..OrderSpec::default()
        });
        let market = AcceptedOrder::Market(MarketOrder::new(order, 550_000));
        let counter = limit(Side::Buy, 1000, 1_000_000, 300_000);
        // AFS * a / (a + fee) = 550_000 * 1_000_000 / 1_100_000 = 500_000.
        assert_eq!(market.executed_amount_against(&counter).unwrap(), 500_000);
    }

    #[test]
    fn execution_against_a_dust_price_counter_is_zero() {
        // At price 10^6 an amount of 99 settles no price-asset units, so the
        // corrected overlap is zero and nothing executes.
        let submitted = AcceptedOrder::Limit(limit(Side::Buy, 1_000_000, 99, 10));
        let counter = limit(Side::Sell, 1_000_000, 99, 10);
        assert_eq!(submitted.executed_amount_against(&counter).unwrap(), 0);
    }
}
