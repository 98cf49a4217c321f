//! Shared value types of the matcher core.
//!
//! Everything here is a self-contained value record: assets and pairs, the
//! integer money arithmetic, signed orders and their accepted forms, match
//! events, exchange transactions, and the cryptographic primitives they are
//! built on. No I/O and no book state; those live in the engine and driver
//! crates.

pub mod accepted;
pub mod asset;
mod codec;
pub mod crypto;
pub mod error;
pub mod events;
pub mod exchange;
pub mod json;
pub mod numeric;
pub mod order;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use accepted::{AcceptedOrder, LimitOrder, MarketOrder};
pub use asset::{Asset, AssetDescription, AssetPair, AssetRegistry, NATIVE_DECIMALS};
pub use crypto::{DigestBytes, PublicKey, Signature};
pub use error::{CodecError, DomainError, OrderRejection};
pub use events::{CancelReason, MatchEvent, OrderCanceled, OrderExecuted};
pub use exchange::{ExchangeTransaction, TransactionId};
pub use numeric::{MAX_AMOUNT, MAX_LIVE_TIME_MILLIS, PRICE_CONSTANT};
pub use order::{Order, OrderId, OrderStatus, Side};
