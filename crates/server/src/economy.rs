//! Economy collaborators: the balance ledger, deposit verification and the
//! price quote cache.
//!
//! Balances are kept in USD. Held coins are worth `coin_value` each at
//! cash-out; deposits arrive in the payment network's native unit and are
//! converted with the cached price.

use crate::config::EconomyConfig;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EconomyError {
    #[error("Insufficient balance: have {balance:.2}, need {needed:.2}")]
    InsufficientFunds { balance: f64, needed: f64 },

    #[error("Transaction not found")]
    UnknownTransaction,

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Amount too low: received {received:.2}, expected at least {minimum:.2}")]
    AmountTooLow { received: f64, minimum: f64 },

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Account balances by user id. All operations are all-or-nothing.
pub trait Ledger: Send + Sync {
    fn balance(&self, user_id: &str) -> f64;
    fn debit(&self, user_id: &str, amount: f64) -> Result<(), EconomyError>;
    fn credit(&self, user_id: &str, amount: f64);
}

/// In-process ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: Mutex<HashMap<String, f64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for MemoryLedger {
    fn balance(&self, user_id: &str) -> f64 {
        lock(&self.balances).get(user_id).copied().unwrap_or(0.0)
    }

    fn debit(&self, user_id: &str, amount: f64) -> Result<(), EconomyError> {
        let mut balances = lock(&self.balances);
        let balance = balances.get(user_id).copied().unwrap_or(0.0);
        if balance < amount {
            return Err(EconomyError::InsufficientFunds {
                balance,
                needed: amount,
            });
        }
        balances.insert(user_id.to_string(), balance - amount);
        Ok(())
    }

    fn credit(&self, user_id: &str, amount: f64) {
        *lock(&self.balances).entry(user_id.to_string()).or_insert(0.0) += amount;
    }
}

/// Split of a cash-out between the player and the house.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cashout {
    pub payout: f64,
    pub fee: f64,
}

pub fn calculate_cashout(amount: f64, house_fee: f64) -> Cashout {
    let fee = amount * house_fee;
    Cashout {
        payout: amount - fee,
        fee,
    }
}

/// External payment network lookup.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    /// Native amount received by the house for `signature`.
    ///
    /// `Ok(None)` means the transaction is not visible yet and may be retried.
    async fn lookup(&self, signature: &str) -> Result<Option<f64>, EconomyError>;
}

/// External price quote: USD per native unit.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn usd_price(&self) -> Result<f64, EconomyError>;
}

/// Caches price quotes for `ttl`, falling back to the last quote, then to a
/// fixed price, when the source fails.
pub struct PriceCache {
    source: Arc<dyn PriceSource>,
    ttl: Duration,
    fallback: f64,
    cached: Mutex<Option<(f64, Instant)>>,
}

impl PriceCache {
    pub fn new(source: Arc<dyn PriceSource>, ttl: Duration, fallback: f64) -> Self {
        Self {
            source,
            ttl,
            fallback,
            cached: Mutex::new(None),
        }
    }

    pub async fn price(&self) -> f64 {
        let last = *lock(&self.cached);
        if let Some((price, at)) = last
            && at.elapsed() < self.ttl
        {
            return price;
        }
        match self.source.usd_price().await {
            Ok(price) if price.is_finite() && price > 0.0 => {
                *lock(&self.cached) = Some((price, Instant::now()));
                price
            }
            Ok(price) => {
                warn!("Ignoring invalid price quote {}", price);
                last.map_or(self.fallback, |(p, _)| p)
            }
            Err(e) => {
                warn!("Price lookup failed: {}", e);
                last.map_or(self.fallback, |(p, _)| p)
            }
        }
    }
}

/// Result of a deposit verification, reported back to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositOutcome {
    pub valid: bool,
    /// USD credited.
    pub amount: f64,
    pub reason: String,
}

impl DepositOutcome {
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            amount: 0.0,
            reason: reason.into(),
        }
    }
}

/// Verifies external deposits off the tick and credits the ledger.
pub struct DepositVerifier {
    verifier: Arc<dyn PaymentVerifier>,
    ledger: Arc<dyn Ledger>,
    prices: PriceCache,
    processed: Mutex<HashSet<String>>,
    max_attempts: u32,
    retry_delay: Duration,
    minimum_usd: f64,
}

impl DepositVerifier {
    pub fn new(
        verifier: Arc<dyn PaymentVerifier>,
        ledger: Arc<dyn Ledger>,
        prices: PriceCache,
        config: &EconomyConfig,
    ) -> Self {
        Self {
            verifier,
            ledger,
            prices,
            processed: Mutex::new(HashSet::new()),
            max_attempts: config.verify_max_attempts.max(1),
            retry_delay: Duration::from_millis(config.verify_retry_ms),
            minimum_usd: config.entry_fee * 0.9,
        }
    }

    /// Look up `signature`, retrying while it is not visible, and credit
    /// `user_id` once. A signature is never credited twice.
    pub async fn verify_deposit(&self, user_id: &str, signature: &str) -> DepositOutcome {
        if lock(&self.processed).contains(signature) {
            return DepositOutcome::rejected("Transaction already processed");
        }

        for attempt in 1..=self.max_attempts {
            let last = attempt == self.max_attempts;
            match self.verifier.lookup(signature).await {
                Ok(Some(native)) => return self.settle(user_id, signature, native).await,
                Ok(None) | Err(EconomyError::Unavailable(_)) if !last => {
                    debug!("Deposit {} not visible yet (attempt {})", signature, attempt);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Ok(None) => {
                    return DepositOutcome::rejected(
                        "Transaction not found after waiting. It may still be processing, try refreshing your balance in a minute.",
                    );
                }
                Err(e) => return DepositOutcome::rejected(e.to_string()),
            }
        }
        DepositOutcome::rejected("Verification timed out. Try refreshing your balance.")
    }

    async fn settle(&self, user_id: &str, signature: &str, native: f64) -> DepositOutcome {
        if native <= 0.0 {
            return DepositOutcome::rejected(EconomyError::UnknownTransaction.to_string());
        }
        let usd = native * self.prices.price().await;
        if usd < self.minimum_usd {
            return DepositOutcome::rejected(
                EconomyError::AmountTooLow {
                    received: usd,
                    minimum: self.minimum_usd,
                }
                .to_string(),
            );
        }
        if !lock(&self.processed).insert(signature.to_string()) {
            return DepositOutcome::rejected("Transaction already processed");
        }
        self.ledger.credit(user_id, usd);
        info!("Credited {:.2} to {} for deposit {}", usd, user_id, signature);
        DepositOutcome {
            valid: true,
            amount: usd,
            reason: String::new(),
        }
    }
}

/// Payment lookups answered from a fixed table. Stands in for the payment
/// network when none is configured.
#[derive(Debug, Default)]
pub struct MemoryVerifier {
    transfers: Mutex<HashMap<String, f64>>,
}

impl MemoryVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, signature: impl Into<String>, amount: f64) {
        lock(&self.transfers).insert(signature.into(), amount);
    }
}

#[async_trait]
impl PaymentVerifier for MemoryVerifier {
    async fn lookup(&self, signature: &str) -> Result<Option<f64>, EconomyError> {
        Ok(lock(&self.transfers).get(signature).copied())
    }
}

/// A price source that always quotes the same price.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrice(pub f64);

#[async_trait]
impl PriceSource for FixedPrice {
    async fn usd_price(&self) -> Result<f64, EconomyError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyPrice {
        calls: AtomicU32,
    }

    #[async_trait]
    impl PriceSource for FlakyPrice {
        async fn usd_price(&self) -> Result<f64, EconomyError> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(120.0),
                _ => Err(EconomyError::Unavailable("down".into())),
            }
        }
    }

    /// Transaction becomes visible on the third lookup.
    struct SlowChain {
        calls: AtomicU32,
    }

    #[async_trait]
    impl PaymentVerifier for SlowChain {
        async fn lookup(&self, _signature: &str) -> Result<Option<f64>, EconomyError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((n >= 2).then_some(0.05))
        }
    }

    fn config() -> EconomyConfig {
        EconomyConfig {
            verify_retry_ms: 1,
            ..Default::default()
        }
    }

    fn verifier(chain: Arc<dyn PaymentVerifier>, ledger: Arc<MemoryLedger>) -> DepositVerifier {
        let prices = PriceCache::new(Arc::new(FixedPrice(100.0)), Duration::from_secs(60), 150.0);
        DepositVerifier::new(chain, ledger, prices, &config())
    }

    #[test]
    fn test_debit_is_all_or_nothing() {
        let ledger = MemoryLedger::new();
        ledger.credit("u", 0.5);
        assert_eq!(
            ledger.debit("u", 1.0),
            Err(EconomyError::InsufficientFunds { balance: 0.5, needed: 1.0 })
        );
        assert_eq!(ledger.balance("u"), 0.5);
        ledger.credit("u", 1.0);
        assert_eq!(ledger.debit("u", 1.0), Ok(()));
        assert!((ledger.balance("u") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cashout_split() {
        let c = calculate_cashout(10.0, 0.15);
        assert!((c.payout - 8.5).abs() < 1e-9);
        assert!((c.fee - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_price_cache_falls_back_to_last_quote() {
        let source = Arc::new(FlakyPrice { calls: AtomicU32::new(0) });
        let cache = PriceCache::new(source.clone(), Duration::ZERO, 150.0);
        assert_eq!(cache.price().await, 120.0);
        assert_eq!(cache.price().await, 120.0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        let cold = PriceCache::new(source, Duration::ZERO, 150.0);
        assert_eq!(cold.price().await, 150.0);
    }

    #[tokio::test]
    async fn test_deposit_retries_then_credits_once() {
        let ledger = Arc::new(MemoryLedger::new());
        let chain = Arc::new(SlowChain { calls: AtomicU32::new(0) });
        let deposits = verifier(chain.clone(), ledger.clone());

        let outcome = deposits.verify_deposit("u", "sig").await;
        assert!(outcome.valid, "{}", outcome.reason);
        assert!((outcome.amount - 5.0).abs() < 1e-9);
        assert_eq!(chain.calls.load(Ordering::SeqCst), 3);
        assert!((ledger.balance("u") - 5.0).abs() < 1e-9);

        let again = deposits.verify_deposit("u", "sig").await;
        assert!(!again.valid);
        assert!((ledger.balance("u") - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_deposit_gives_up() {
        let ledger = Arc::new(MemoryLedger::new());
        let chain = Arc::new(MemoryVerifier::new());
        let deposits = verifier(chain, ledger.clone());
        let outcome = deposits.verify_deposit("u", "missing").await;
        assert!(!outcome.valid);
        assert!(outcome.reason.contains("not found"));
        assert_eq!(ledger.balance("u"), 0.0);
    }

    #[tokio::test]
    async fn test_small_deposit_rejected() {
        let ledger = Arc::new(MemoryLedger::new());
        let chain = Arc::new(MemoryVerifier::new());
        chain.insert("tiny", 0.001);
        let deposits = verifier(chain, ledger.clone());
        let outcome = deposits.verify_deposit("u", "tiny").await;
        assert!(!outcome.valid);
        assert!(outcome.reason.starts_with("Amount too low"));
        assert_eq!(ledger.balance("u"), 0.0);
    }
}
