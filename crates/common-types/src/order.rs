use serde::{Deserialize, Serialize};
use std::fmt;

use crate::asset::{Asset, AssetPair, ASSET_ID_LENGTH};
use crate::codec::ByteReader;
use crate::crypto::{base58_encode, sha256, DigestBytes, PublicKey, Signature};
use crate::error::{CodecError, OrderRejection};
use crate::numeric::{MAX_AMOUNT, MAX_LIVE_TIME_MILLIS};

/// Order version understood by this node.
pub const ORDER_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Side, CodecError> {
        match byte {
            0 => Ok(Side::Buy),
            1 => Ok(Side::Sell),
            other => Err(CodecError::InvalidSide(other)),
        }
    }
}

/// SHA-256 of an order's canonical signing bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub DigestBytes);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58_encode(&self.0))
    }
}

/// A signed order as submitted to the matcher. Immutable; remaining
/// quantities live on [`crate::accepted::AcceptedOrder`], never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub version: u8,
    pub sender: PublicKey,
    pub matcher: PublicKey,
    pub pair: AssetPair,
    pub side: Side,
    /// Price-asset units per `PRICE_CONSTANT` amount-asset units.
    pub price: u64,
    pub amount: u64,
    pub timestamp: u64,
    pub expiration: u64,
    pub matcher_fee: u64,
    pub fee_asset: Asset,
    pub signature: Signature,
}

fn put_asset(buf: &mut Vec<u8>, asset: Asset) {
    match asset {
        Asset::Native => buf.push(0),
        Asset::Issued(id) => {
            buf.push(1);
            buf.extend_from_slice(&id);
        }
    }
}

fn read_asset(reader: &mut ByteReader<'_>) -> Result<Asset, CodecError> {
    match reader.read_u8()? {
        0 => Ok(Asset::Native),
        _ => Ok(Asset::Issued(reader.read_array::<ASSET_ID_LENGTH>()?)),
    }
}

impl Order {
    /// Canonical byte encoding the sender signs and the id is derived from.
    pub fn to_sign_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(192);
        buf.push(self.version);
        buf.extend_from_slice(&self.sender.to_bytes());
        buf.extend_from_slice(&self.matcher.to_bytes());
        put_asset(&mut buf, self.pair.amount_asset);
        put_asset(&mut buf, self.pair.price_asset);
        buf.push(self.side.as_byte());
        buf.extend_from_slice(&self.price.to_be_bytes());
        buf.extend_from_slice(&self.amount.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.expiration.to_be_bytes());
        buf.extend_from_slice(&self.matcher_fee.to_be_bytes());
        put_asset(&mut buf, self.fee_asset);
        buf
    }

    /// Signing bytes followed by the 64-byte signature; the form embedded in
    /// exchange transactions.
    pub fn bytes(&self) -> Vec<u8> {
        let mut buf = self.to_sign_bytes();
        buf.extend_from_slice(&self.signature.to_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Order, CodecError> {
        let mut reader = ByteReader::new(bytes);
        let order = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(order)
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Order, CodecError> {
        let version = reader.read_u8()?;
        if version != ORDER_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let sender = PublicKey::from_bytes(&reader.read_array()?)?;
        let matcher = PublicKey::from_bytes(&reader.read_array()?)?;
        let amount_asset = read_asset(reader)?;
        let price_asset = read_asset(reader)?;
        let side = Side::from_byte(reader.read_u8()?)?;
        let price = reader.read_u64()?;
        let amount = reader.read_u64()?;
        let timestamp = reader.read_u64()?;
        let expiration = reader.read_u64()?;
        let matcher_fee = reader.read_u64()?;
        let fee_asset = read_asset(reader)?;
        let signature = Signature::from_bytes(&reader.read_array()?);
        Ok(Order {
            version,
            sender,
            matcher,
            pair: AssetPair { amount_asset, price_asset },
            side,
            price,
            amount,
            timestamp,
            expiration,
            matcher_fee,
            fee_asset,
            signature,
        })
    }

    pub fn id(&self) -> OrderId {
        OrderId(sha256(&self.to_sign_bytes()))
    }

    /// Checks the sender's signature over the canonical signing bytes.
    pub fn verify_signature(&self) -> bool {
        self.sender.verify(&self.to_sign_bytes(), &self.signature)
    }

    /// Structural admission checks, evaluated against the matcher's clock.
    pub fn validate(&self, now: u64) -> Result<(), OrderRejection> {
        if self.amount == 0 {
            return Err(OrderRejection::ZeroAmount);
        }
        if self.price == 0 {
            return Err(OrderRejection::ZeroPrice);
        }
        if self.amount >= MAX_AMOUNT {
            return Err(OrderRejection::AmountTooLarge(self.amount));
        }
        if self.expiration <= self.timestamp {
            return Err(OrderRejection::ExpirationBeforeTimestamp {
                timestamp: self.timestamp,
                expiration: self.expiration,
            });
        }
        let lifetime = self.expiration - self.timestamp;
        if lifetime > MAX_LIVE_TIME_MILLIS {
            return Err(OrderRejection::LifetimeTooLong(lifetime));
        }
        if self.expiration <= now {
            return Err(OrderRejection::Expired { expiration: self.expiration, now });
        }
        Ok(())
    }

    /// The asset this order pays out when it trades.
    pub fn spend_asset(&self) -> Asset {
        match self.side {
            Side::Buy => self.pair.price_asset,
            Side::Sell => self.pair.amount_asset,
        }
    }

    /// The asset this order collects when it trades.
    pub fn receive_asset(&self) -> Asset {
        match self.side {
            Side::Buy => self.pair.amount_asset,
            Side::Sell => self.pair.price_asset,
        }
    }
}

/// Lifecycle of an order as observed through the matcher.
///
/// `Filled`, `Cancelled` and `NotFound` are terminal; queries for unknown
/// orders answer `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Accepted,
    PartiallyFilled { filled: u64 },
    Filled { filled: u64 },
    Cancelled { filled: u64 },
    NotFound,
}

impl OrderStatus {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled { .. } | OrderStatus::Cancelled { .. } | OrderStatus::NotFound
        )
    }

    pub fn filled(&self) -> u64 {
        match self {
            OrderStatus::Accepted | OrderStatus::NotFound => 0,
            OrderStatus::PartiallyFilled { filled }
            | OrderStatus::Filled { filled }
            | OrderStatus::Cancelled { filled } => *filled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{signed_order, OrderSpec};
    use crate::numeric::PRICE_CONSTANT;

    #[test]
    fn byte_round_trip_is_exact() {
        let order = signed_order(OrderSpec {
            side: Side::Sell,
            price: 1000,
            amount: 1_000_000,
            ..OrderSpec::default()
        });
        let decoded = Order::from_bytes(&order.bytes()).unwrap();
        assert_eq!(decoded, order);
    }

    #[test]
    fn decoding_rejects_truncated_and_padded_input() {
        let order = signed_order(OrderSpec::default());
        let bytes = order.bytes();
        assert!(matches!(
            Order::from_bytes(&bytes[..bytes.len() - 1]),
            Err(CodecError::UnexpectedEof(_))
        ));
        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(
            Order::from_bytes(&padded),
            Err(CodecError::TrailingBytes(1))
        ));
    }

    #[test]
    fn id_is_stable_for_fixed_bytes() {
        let order = signed_order(OrderSpec::default());
        assert_eq!(order.id(), Order::from_bytes(&order.bytes()).unwrap().id());
        // Id excludes the signature so re-signing does not change identity.
        assert_eq!(order.id().0, sha256(&order.to_sign_bytes()));
    }

    #[test]
    fn signature_verifies_and_detects_tampering() {
        let order = signed_order(OrderSpec::default());
        assert!(order.verify_signature());
        let mut tampered = order;
        tampered.amount += 1;
        assert!(!tampered.verify_signature());
    }

    #[test]
    fn validate_enforces_order_invariants() {
        let order = signed_order(OrderSpec::default());
        assert_eq!(order.validate(order.timestamp), Ok(()));

        let mut zero_amount = order;
        zero_amount.amount = 0;
        assert_eq!(zero_amount.validate(0), Err(OrderRejection::ZeroAmount));

        let mut too_large = order;
        too_large.amount = MAX_AMOUNT;
        assert!(matches!(
            too_large.validate(0),
            Err(OrderRejection::AmountTooLarge(_))
        ));

        let mut long_lived = order;
        long_lived.expiration = long_lived.timestamp + MAX_LIVE_TIME_MILLIS + 1;
        assert!(matches!(
            long_lived.validate(0),
            Err(OrderRejection::LifetimeTooLong(_))
        ));

        assert!(matches!(
            order.validate(order.expiration),
            Err(OrderRejection::Expired { .. })
        ));
    }

    #[test]
    fn spend_and_receive_assets_follow_the_side() {
        let buy = signed_order(OrderSpec { side: Side::Buy, ..OrderSpec::default() });
        assert_eq!(buy.spend_asset(), buy.pair.price_asset);
        assert_eq!(buy.receive_asset(), buy.pair.amount_asset);

        let sell = signed_order(OrderSpec { side: Side::Sell, ..OrderSpec::default() });
        assert_eq!(sell.spend_asset(), sell.pair.amount_asset);
        assert_eq!(sell.receive_asset(), sell.pair.price_asset);
    }

    #[test]
    fn status_terminality() {
        assert!(!OrderStatus::Accepted.is_final());
        assert!(!OrderStatus::PartiallyFilled { filled: 1 }.is_final());
        assert!(OrderStatus::Filled { filled: PRICE_CONSTANT }.is_final());
        assert!(OrderStatus::Cancelled { filled: 0 }.is_final());
        assert!(OrderStatus::NotFound.is_final());
    }
}
