use serde::Serialize;
use thiserror::Error;

/// Failures of the integer money arithmetic itself.
///
/// Matching never panics on extreme inputs; every narrowing multiplication or
/// division surfaces one of these instead of wrapping. Serialized (one way)
/// because cancel events carry them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DomainError {
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),
    #[error("asset decimals {0} exceed the supported maximum")]
    InvalidDecimals(u8),
    #[error("amount asset and price asset must differ")]
    InvalidAssetPair,
}

/// Failures while decoding canonical byte representations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),
    #[error("{0} trailing bytes after decoding")]
    TrailingBytes(usize),
    #[error("input length {len} exceeds the configured maximum {max}")]
    TooLong { len: usize, max: usize },
    #[error("invalid base58 input")]
    Base58,
    #[error("invalid base64 input")]
    Base64,
    #[error("byte {0} is not a valid order side")]
    InvalidSide(u8),
    #[error("bytes do not form a valid Ed25519 public key")]
    InvalidPublicKey,
    #[error("unsupported order version {0}")]
    UnsupportedVersion(u8),
    #[error("serialized merkle proof is malformed")]
    MalformedProof,
}

/// Reasons an order is refused at admission, before it ever reaches a book.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderRejection {
    #[error("order amount must be positive")]
    ZeroAmount,
    #[error("order price must be positive")]
    ZeroPrice,
    #[error("order amount {0} is not below the maximum")]
    AmountTooLarge(u64),
    #[error("order expiration {expiration} does not follow timestamp {timestamp}")]
    ExpirationBeforeTimestamp { timestamp: u64, expiration: u64 },
    #[error("order lifetime {0} ms exceeds the maximum")]
    LifetimeTooLong(u64),
    #[error("order expired at {expiration}, current time {now}")]
    Expired { expiration: u64, now: u64 },
}
