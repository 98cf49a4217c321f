//! Settlement builder.
//!
//! Turns an [`OrderExecuted`] match event into a signed
//! [`ExchangeTransaction`] and projects the balance movements the
//! transaction implies. The transaction embeds both orders in full, so a
//! verifier can re-check every field against them without access to the
//! book that produced the match.

use std::collections::BTreeMap;

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use common_types::numeric::{cost, partial_fee};
use common_types::{
    Asset, DomainError, ExchangeTransaction, Order, OrderExecuted, PublicKey, Side, Signature,
};

pub mod merkle;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("a fill must pair one buy order with one sell order")]
    SidesNotOpposite,
    #[error("orders name different matchers")]
    MatcherMismatch,
}

/// Builds and signs exchange transactions on behalf of the matcher.
pub struct SettlementBuilder {
    matcher_key: SigningKey,
    /// Node-chosen fee attached to every produced transaction.
    fee: u64,
}

impl SettlementBuilder {
    pub fn new(matcher_key: SigningKey, fee: u64) -> Self {
        SettlementBuilder { matcher_key, fee }
    }

    pub fn matcher_public_key(&self) -> PublicKey {
        PublicKey(self.matcher_key.verifying_key())
    }

    /// Produces the settlement transaction for one fill. `order1` is the buy
    /// order, `order2` the sell order; the price is the counter's, the
    /// matcher fee is the sum of both sides' proportional shares.
    pub fn build(&self, event: &OrderExecuted) -> Result<ExchangeTransaction, SettlementError> {
        let submitted = *event.submitted.order();
        let counter = event.counter.order;
        let (buy, sell) = match (submitted.side, counter.side) {
            (Side::Buy, Side::Sell) => (submitted, counter),
            (Side::Sell, Side::Buy) => (counter, submitted),
            _ => return Err(SettlementError::SidesNotOpposite),
        };
        if buy.matcher != sell.matcher {
            return Err(SettlementError::MatcherMismatch);
        }

        let matcher_fee = event
            .counter_executed_fee()?
            .checked_add(event.submitted_executed_fee()?)
            .ok_or(DomainError::Overflow("settlement matcher_fee"))?;

        let mut tx = ExchangeTransaction {
            order1: buy,
            order2: sell,
            price: event.price(),
            amount: event.executed_amount,
            matcher_fee,
            fee: self.fee,
            timestamp: event.timestamp,
            signature: Signature::from_bytes(&[0; 64]),
        };
        tx.signature = Signature(self.matcher_key.sign(&tx.to_sign_bytes()));
        Ok(tx)
    }
}

/// Signed per-asset balance movement of one party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio(pub BTreeMap<Asset, i128>);

impl Portfolio {
    fn credit(&mut self, asset: Asset, amount: u64) {
        *self.0.entry(asset).or_insert(0) += i128::from(amount);
    }

    fn debit(&mut self, asset: Asset, amount: u64) {
        *self.0.entry(asset).or_insert(0) -= i128::from(amount);
    }

    pub fn get(&self, asset: Asset) -> i128 {
        self.0.get(&asset).copied().unwrap_or(0)
    }
}

/// Balance movements an exchange transaction settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChanges {
    pub buyer: Portfolio,
    pub seller: Portfolio,
    pub matcher: Portfolio,
}

/// Projects the balance deltas of `tx`, derived purely from its fields.
/// Independent of signing; a verifier applies the same projection.
pub fn balance_changes(tx: &ExchangeTransaction) -> Result<BalanceChanges, DomainError> {
    let buy: &Order = tx.buy_order();
    let sell: &Order = tx.sell_order();
    let pair = buy.pair;
    let price_total = cost(tx.amount, tx.price)?;
    let buy_fee = partial_fee(buy.matcher_fee, buy.amount, tx.amount)?;
    let sell_fee = partial_fee(sell.matcher_fee, sell.amount, tx.amount)?;

    let mut buyer = Portfolio::default();
    buyer.credit(pair.amount_asset, tx.amount);
    buyer.debit(pair.price_asset, price_total);
    buyer.debit(buy.fee_asset, buy_fee);

    let mut seller = Portfolio::default();
    seller.debit(pair.amount_asset, tx.amount);
    seller.credit(pair.price_asset, price_total);
    seller.debit(sell.fee_asset, sell_fee);

    let mut matcher = Portfolio::default();
    matcher.credit(buy.fee_asset, buy_fee);
    matcher.credit(sell.fee_asset, sell_fee);
    matcher.debit(Asset::Native, tx.fee);

    Ok(BalanceChanges { buyer, seller, matcher })
}
