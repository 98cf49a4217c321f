//! JSON projections of orders and exchange transactions.
//!
//! Monetary fields are integers internally; clients declare whether they want
//! them rendered as JSON numbers or as strings (large values lose precision
//! in environments with double-width JSON numbers). Both projections come
//! from the same integer representation.

use serde_json::{json, Value};

use crate::exchange::ExchangeTransaction;
use crate::order::{Order, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericFormat {
    Number,
    String,
}

fn money(value: u64, format: NumericFormat) -> Value {
    match format {
        NumericFormat::Number => json!(value),
        NumericFormat::String => json!(value.to_string()),
    }
}

pub fn order_to_json(order: &Order, format: NumericFormat) -> Value {
    json!({
        "version": order.version,
        "id": order.id().to_string(),
        "sender": order.sender.to_string(),
        "matcher": order.matcher.to_string(),
        "amountAsset": order.pair.amount_asset.to_string(),
        "priceAsset": order.pair.price_asset.to_string(),
        "side": match order.side { Side::Buy => "buy", Side::Sell => "sell" },
        "price": money(order.price, format),
        "amount": money(order.amount, format),
        "timestamp": order.timestamp,
        "expiration": order.expiration,
        "matcherFee": money(order.matcher_fee, format),
        "feeAsset": order.fee_asset.to_string(),
        "signature": order.signature.to_string(),
    })
}

pub fn exchange_to_json(tx: &ExchangeTransaction, format: NumericFormat) -> Value {
    json!({
        "id": tx.id().to_string(),
        "order1": order_to_json(&tx.order1, format),
        "order2": order_to_json(&tx.order2, format),
        "price": money(tx.price, format),
        "amount": money(tx.amount, format),
        "matcherFee": money(tx.matcher_fee, format),
        "fee": money(tx.fee, format),
        "timestamp": tx.timestamp,
        "signature": tx.signature.to_string(),
    })
}
