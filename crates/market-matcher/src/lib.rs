//! Per-pair matcher actor.
//!
//! Responsibilities
//! - Serializes `Place`/`Cancel` submissions through one queue per pair; a
//!   submission runs to completion (including cascading fills) before the
//!   next is taken
//! - Runs the admission pipeline: structural validation, signature check,
//!   duplicate detection, balance funding against a synchronous
//!   tradable-balance snapshot
//! - Tracks per-order statuses and forwards engine events into a bounded
//!   buffer; a full buffer stalls intake, never the book mid-match
//!
use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use common_types::{
    AcceptedOrder, Asset, AssetPair, AssetRegistry, CancelReason, DomainError, LimitOrder,
    MarketOrder, MatchEvent, Order, OrderCanceled, OrderId, OrderRejection, OrderStatus,
    PublicKey,
};
use matching_engine::{MatchingEngine, OrderBook};

pub mod registry;
pub use registry::InMemoryAssetRegistry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatcherError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Rejected(#[from] OrderRejection),
    #[error("order pair {actual} does not belong to this book ({expected})")]
    WrongPair { expected: AssetPair, actual: AssetPair },
    #[error("order names a different matcher")]
    WrongMatcher,
    #[error("asset {0} is not known to the registry")]
    UnknownAsset(Asset),
    #[error("order signature does not verify")]
    BadSignature,
    #[error("duplicate submission of an already known order")]
    Conflict,
    #[error("tradable balance of {asset} is {available}, {required} required")]
    BalanceInsufficient { asset: Asset, required: u64, available: u64 },
    #[error("order not found")]
    NotFound,
    #[error("matcher is shut down")]
    Shutdown,
}

/// Synchronous snapshot source for spendable balances. Captured once per
/// submission, at admission; the engine never consults it mid-match.
pub trait BalanceOracle: Send + Sync {
    fn tradable_balance(&self, owner: &PublicKey, asset: Asset) -> u64;
}

/// How the client asked for the order to be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug)]
enum Submission {
    Place {
        order: Order,
        order_type: OrderType,
        timestamp: u64,
        reply: oneshot::Sender<Result<(), MatcherError>>,
    },
    Cancel {
        order_id: OrderId,
        timestamp: u64,
        reply: oneshot::Sender<Result<(), MatcherError>>,
    },
}

type StatusMap = Arc<DashMap<OrderId, OrderStatus>>;

/// Client-side handle to one pair's matcher actor.
#[derive(Clone)]
pub struct MatcherHandle {
    submissions: mpsc::Sender<Submission>,
    statuses: StatusMap,
}

impl MatcherHandle {
    /// Submits an order; resolves once the submission has been fully
    /// processed. `Ok` means the order passed admission; its outcome is in
    /// the event stream and [`Self::status`].
    pub async fn place(
        &self,
        order: Order,
        order_type: OrderType,
        timestamp: u64,
    ) -> Result<(), MatcherError> {
        let (reply, response) = oneshot::channel();
        self.submissions
            .send(Submission::Place { order, order_type, timestamp, reply })
            .await
            .map_err(|_| MatcherError::Shutdown)?;
        response.await.map_err(|_| MatcherError::Shutdown)?
    }

    /// Cancels a resting order. Processed in the same serialized queue as
    /// placements; always succeeds if the order is still on the book.
    pub async fn cancel(&self, order_id: OrderId, timestamp: u64) -> Result<(), MatcherError> {
        let (reply, response) = oneshot::channel();
        self.submissions
            .send(Submission::Cancel { order_id, timestamp, reply })
            .await
            .map_err(|_| MatcherError::Shutdown)?;
        response.await.map_err(|_| MatcherError::Shutdown)?
    }

    pub fn status(&self, order_id: &OrderId) -> OrderStatus {
        self.statuses
            .get(order_id)
            .map(|status| *status)
            .unwrap_or(OrderStatus::NotFound)
    }
}

/// A spawned pair matcher: the client handle, the event stream, and the
/// actor task itself.
pub struct PairMatcherHandles {
    pub handle: MatcherHandle,
    pub events: mpsc::Receiver<MatchEvent>,
    pub actor_task: JoinHandle<()>,
}

/// Spawns the actor owning `pair`'s book.
pub fn spawn_pair_matcher(
    settings: &configuration::Matcher,
    pair: AssetPair,
    matcher_key: PublicKey,
    registry: Arc<dyn AssetRegistry>,
    oracle: Arc<dyn BalanceOracle>,
) -> PairMatcherHandles {
    let (submissions_tx, submissions_rx) = mpsc::channel(settings.submission_queue_depth);
    let (events_tx, events_rx) = mpsc::channel(settings.event_buffer_capacity);
    let statuses: StatusMap = Arc::new(DashMap::new());

    let actor = PairMatcher {
        pair,
        matcher_key,
        registry,
        oracle,
        book: OrderBook::new(),
        statuses: statuses.clone(),
        seen: HashSet::new(),
        events_tx,
    };
    let actor_task = tokio::spawn(actor.run(submissions_rx));

    PairMatcherHandles {
        handle: MatcherHandle { submissions: submissions_tx, statuses },
        events: events_rx,
        actor_task,
    }
}

struct PairMatcher {
    pair: AssetPair,
    matcher_key: PublicKey,
    registry: Arc<dyn AssetRegistry>,
    oracle: Arc<dyn BalanceOracle>,
    book: OrderBook,
    statuses: StatusMap,
    // Signatures of every admitted order, for duplicate detection.
    seen: HashSet<[u8; 64]>,
    events_tx: mpsc::Sender<MatchEvent>,
}

impl PairMatcher {
    #[instrument(skip_all, fields(pair = %self.pair))]
    async fn run(mut self, mut submissions: mpsc::Receiver<Submission>) {
        info!("pair matcher started");
        while let Some(submission) = submissions.recv().await {
            match submission {
                Submission::Place { order, order_type, timestamp, reply } => {
                    let result = self.handle_place(order, order_type, timestamp).await;
                    let _ = reply.send(result);
                }
                Submission::Cancel { order_id, timestamp, reply } => {
                    let result = self.handle_cancel(order_id, timestamp).await;
                    let _ = reply.send(result);
                }
            }
        }
        info!("pair matcher stopped");
    }

    async fn handle_place(
        &mut self,
        order: Order,
        order_type: OrderType,
        timestamp: u64,
    ) -> Result<(), MatcherError> {
        let accepted = match self.admit(order, order_type, timestamp) {
            Ok(accepted) => accepted,
            Err(error) => {
                warn!(order_id = %order.id(), error = %error, "order refused at admission");
                if let Some(reason) = admission_cancel_reason(&error) {
                    self.statuses
                        .insert(order.id(), OrderStatus::Cancelled { filled: 0 });
                    self.emit(MatchEvent::OrderCanceled(OrderCanceled {
                        order: AcceptedOrder::Limit(LimitOrder::new(order)),
                        reason,
                        timestamp,
                    }))
                    .await;
                }
                return Err(error);
            }
        };

        self.statuses.insert(order.id(), OrderStatus::Accepted);
        let events = self.book.process_order(accepted, timestamp);
        for event in events {
            self.track(&event);
            self.emit(event).await;
        }
        Ok(())
    }

    async fn handle_cancel(
        &mut self,
        order_id: OrderId,
        timestamp: u64,
    ) -> Result<(), MatcherError> {
        let event = self
            .book
            .cancel_order(&order_id, timestamp)
            .ok_or(MatcherError::NotFound)?;
        self.track(&event);
        self.emit(event).await;
        Ok(())
    }

    /// The admission pipeline. Nothing here touches the book; the balance
    /// and registry snapshots are taken synchronously before matching
    /// starts.
    fn admit(
        &mut self,
        order: Order,
        order_type: OrderType,
        now: u64,
    ) -> Result<AcceptedOrder, MatcherError> {
        if order.pair != self.pair {
            return Err(MatcherError::WrongPair { expected: self.pair, actual: order.pair });
        }
        if order.matcher != self.matcher_key {
            return Err(MatcherError::WrongMatcher);
        }
        for asset in [self.pair.amount_asset, self.pair.price_asset, order.fee_asset] {
            if self.registry.decimals(asset).is_none() {
                return Err(MatcherError::UnknownAsset(asset));
            }
        }
        order.validate(now)?;
        if !order.verify_signature() {
            return Err(MatcherError::BadSignature);
        }
        if self.seen.contains(&order.signature.to_bytes()) {
            return Err(MatcherError::Conflict);
        }

        let accepted = match order_type {
            OrderType::Limit => {
                let accepted = AcceptedOrder::Limit(LimitOrder::new(order));
                for (asset, required) in accepted.required_balance()? {
                    let available = self.oracle.tradable_balance(&order.sender, asset);
                    if available < required {
                        return Err(MatcherError::BalanceInsufficient {
                            asset,
                            required,
                            available,
                        });
                    }
                }
                accepted
            }
            OrderType::Market => {
                let market = MarketOrder::with_tradable_balance(order, |asset| {
                    self.oracle.tradable_balance(&order.sender, asset)
                })?;
                if market.available_for_spending == 0 {
                    let spend_asset = order.spend_asset();
                    let required = AcceptedOrder::Limit(LimitOrder::new(order))
                        .required_balance()?
                        .get(&spend_asset)
                        .copied()
                        .unwrap_or(0);
                    return Err(MatcherError::BalanceInsufficient {
                        asset: spend_asset,
                        required,
                        available: 0,
                    });
                }
                let accepted = AcceptedOrder::Market(market);
                if accepted.fee_asset() != accepted.spend_asset() {
                    let required = accepted.required_fee()?;
                    let available =
                        self.oracle.tradable_balance(&order.sender, accepted.fee_asset());
                    if available < required {
                        return Err(MatcherError::BalanceInsufficient {
                            asset: accepted.fee_asset(),
                            required,
                            available,
                        });
                    }
                }
                accepted
            }
        };

        self.seen.insert(order.signature.to_bytes());
        Ok(accepted)
    }

    /// Folds an engine event into the per-order status map.
    fn track(&self, event: &MatchEvent) {
        match event {
            MatchEvent::OrderAdded { order, .. } => {
                self.statuses.entry(order.id()).or_insert(OrderStatus::Accepted);
            }
            MatchEvent::OrderExecuted(executed) => {
                if let Ok(remaining) = executed.submitted_remaining() {
                    self.update_fill(executed.submitted.order(), remaining.amount());
                }
                if let Ok(remaining) = executed.counter_remaining() {
                    self.update_fill(&executed.counter.order, remaining.amount);
                }
            }
            MatchEvent::OrderCanceled(canceled) => {
                let filled = canceled.order.order().amount - canceled.order.amount();
                self.statuses
                    .insert(canceled.order.id(), OrderStatus::Cancelled { filled });
            }
        }
    }

    fn update_fill(&self, order: &Order, remaining: u64) {
        let filled = order.amount - remaining;
        let status = if remaining == 0 {
            OrderStatus::Filled { filled }
        } else {
            OrderStatus::PartiallyFilled { filled }
        };
        self.statuses.insert(order.id(), status);
    }

    /// Pushes into the bounded event buffer. Blocking here is the intake
    /// backpressure: the actor takes no further submission until the buffer
    /// drains.
    async fn emit(&self, event: MatchEvent) {
        if self.events_tx.send(event).await.is_err() {
            warn!("event consumer dropped, discarding event");
        }
    }
}

/// Admission failures that still produce a `Canceled` event so downstream
/// status consumers stay consistent. Failures that never identified a live
/// order (bad signature, duplicates, foreign pair) produce none.
fn admission_cancel_reason(error: &MatcherError) -> Option<CancelReason> {
    match error {
        MatcherError::Rejected(rejection) => Some(CancelReason::Rejected(*rejection)),
        MatcherError::BalanceInsufficient { .. } => Some(CancelReason::BalanceInsufficient),
        MatcherError::Domain(domain) => Some(CancelReason::Arithmetic(*domain)),
        _ => None,
    }
}
