//! Order-building helpers shared by unit and integration tests.

use ed25519_dalek::{Signer, SigningKey};

use crate::asset::{Asset, AssetPair};
use crate::crypto::{PublicKey, Signature};
use crate::order::{Order, Side, ORDER_VERSION};

pub const AMOUNT_ASSET: Asset = Asset::Issued([0xAA; 32]);
pub const FEE_ASSET_ID: Asset = Asset::Issued([0xFE; 32]);

pub fn test_pair() -> AssetPair {
    AssetPair { amount_asset: AMOUNT_ASSET, price_asset: Asset::Native }
}

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

/// Template for a signed test order; unspecified fields get workable
/// defaults (issued/native pair, one-day lifetime, matcher seed 99).
pub struct OrderSpec {
    pub sender_seed: u8,
    pub matcher_seed: u8,
    pub pair: AssetPair,
    pub side: Side,
    pub price: u64,
    pub amount: u64,
    pub timestamp: u64,
    pub expiration: u64,
    pub matcher_fee: u64,
    pub fee_asset: Asset,
}

impl Default for OrderSpec {
    fn default() -> Self {
        OrderSpec {
            sender_seed: 1,
            matcher_seed: 99,
            pair: test_pair(),
            side: Side::Buy,
            price: 1000,
            amount: 1_000_000,
            timestamp: 1_700_000_000_000,
            expiration: 1_700_000_000_000 + 86_400_000,
            matcher_fee: 300_000,
            fee_asset: Asset::Native,
        }
    }
}

pub fn signed_order(spec: OrderSpec) -> Order {
    let sender_key = signing_key(spec.sender_seed);
    let matcher_key = signing_key(spec.matcher_seed);
    let mut order = Order {
        version: ORDER_VERSION,
        sender: PublicKey(sender_key.verifying_key()),
        matcher: PublicKey(matcher_key.verifying_key()),
        pair: spec.pair,
        side: spec.side,
        price: spec.price,
        amount: spec.amount,
        timestamp: spec.timestamp,
        expiration: spec.expiration,
        matcher_fee: spec.matcher_fee,
        fee_asset: spec.fee_asset,
        signature: Signature::from_bytes(&[0; 64]),
    };
    order.signature = Signature(sender_key.sign(&order.to_sign_bytes()));
    order
}
