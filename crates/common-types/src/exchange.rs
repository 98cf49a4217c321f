use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::ByteReader;
use crate::crypto::{base58_encode, sha256, DigestBytes, Signature};
use crate::order::Order;

/// SHA-256 of an exchange transaction's signing bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub DigestBytes);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58_encode(&self.0))
    }
}

/// The settlement record of one match: both embedded orders, the trading
/// price and amount, the matcher fee collected from both sides, and the node
/// fee, all signed by the matcher.
///
/// `order1` is always the buy order and `order2` the sell order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeTransaction {
    pub order1: Order,
    pub order2: Order,
    pub price: u64,
    pub amount: u64,
    pub matcher_fee: u64,
    pub fee: u64,
    pub timestamp: u64,
    pub signature: Signature,
}

impl ExchangeTransaction {
    pub fn buy_order(&self) -> &Order {
        &self.order1
    }

    pub fn sell_order(&self) -> &Order {
        &self.order2
    }

    /// Canonical byte encoding the matcher signs and the id derives from.
    pub fn to_sign_bytes(&self) -> Vec<u8> {
        let order1_bytes = self.order1.bytes();
        let order2_bytes = self.order2.bytes();
        let mut buf = Vec::with_capacity(8 + order1_bytes.len() + order2_bytes.len() + 40);
        buf.extend_from_slice(&(order1_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(&(order2_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(&order1_bytes);
        buf.extend_from_slice(&order2_bytes);
        buf.extend_from_slice(&self.price.to_be_bytes());
        buf.extend_from_slice(&self.amount.to_be_bytes());
        buf.extend_from_slice(&self.matcher_fee.to_be_bytes());
        buf.extend_from_slice(&self.fee.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut buf = self.to_sign_bytes();
        buf.extend_from_slice(&self.signature.to_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ExchangeTransaction, crate::error::CodecError> {
        let mut reader = ByteReader::new(bytes);
        let order1_len = reader.read_u32()? as usize;
        let order2_len = reader.read_u32()? as usize;
        let order1 = Order::from_bytes(reader.take(order1_len)?)?;
        let order2 = Order::from_bytes(reader.take(order2_len)?)?;
        let price = reader.read_u64()?;
        let amount = reader.read_u64()?;
        let matcher_fee = reader.read_u64()?;
        let fee = reader.read_u64()?;
        let timestamp = reader.read_u64()?;
        let signature = Signature::from_bytes(&reader.read_array()?);
        reader.finish()?;
        Ok(ExchangeTransaction {
            order1,
            order2,
            price,
            amount,
            matcher_fee,
            fee,
            timestamp,
            signature,
        })
    }

    pub fn id(&self) -> TransactionId {
        TransactionId(sha256(&self.to_sign_bytes()))
    }

    /// Checks the matcher's signature over the signing bytes. The matcher key
    /// is taken from the buy order; the validator separately requires both
    /// orders to name the same matcher.
    pub fn verify_signature(&self) -> bool {
        self.order1
            .matcher
            .verify(&self.to_sign_bytes(), &self.signature)
    }
}
