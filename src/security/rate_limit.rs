//! Per-client token bucket rate limiting.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::client_ip::{resolve_client_ip, ClientAddr};

/// A token bucket with continuous refill.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn refill(&mut self, now: Instant, capacity: f64, refill_rate: f64) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        if now > self.last_update {
            self.last_update = now;
        }
    }

    fn try_acquire(&mut self, n: f64, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        self.refill(now, capacity, refill_rate);

        if self.tokens >= n {
            self.tokens -= n;
            true
        } else {
            false
        }
    }
}

/// Per-key token buckets behind a single lock.
///
/// Buckets are created full on a key's first request. The eviction sweep
/// drops any bucket that could hand out a whole burst at once; a key evicted
/// this way comes back with a fresh full bucket, so a client can briefly
/// exceed its long-run rate right after a sweep.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    refill_rate: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(refill_rate: f64, burst: u32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            refill_rate,
            burst: f64::from(burst),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size)
    }

    /// Consume one token for `key` if one is available.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.lock();
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst, now));

        bucket.try_acquire(1.0, now, self.burst, self.refill_rate)
    }

    /// Remove buckets that currently hold a full burst. Returns how many
    /// were removed.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let (burst, rate) = (self.burst, self.refill_rate);
        let mut buckets = self.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| !bucket.try_acquire(burst, now, burst, rate));
        let evicted = before - buckets.len();
        metrics::record_bucket_count(buckets.len());
        evicted
    }

    /// Number of live buckets.
    fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sweep idle buckets every `interval` until `shutdown` fires.
    pub async fn run_eviction_loop(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(interval_secs = interval.as_secs(), "Rate limit eviction starting");

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.evict_idle();
                    metrics::record_buckets_evicted(evicted);
                    tracing::debug!(evicted, remaining = self.len(), "Rate limit buckets swept");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit eviction received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves the client address and enforces the per-client limit.
///
/// The resolved address is attached to the request as [`ClientAddr`] for
/// the handler to log.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let client = resolve_client_ip(request.headers(), &addr.to_string(), &state.proxies);

    if let Some(limiter) = &state.limiter {
        if !limiter.allow(&client) {
            tracing::warn!(client = %client, "Rate limit exceeded");
            metrics::record_rate_limited();
            return ApiError::RateLimited.into_response();
        }
    }

    request.extensions_mut().insert(ClientAddr(client));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_reject() {
        let limiter = RateLimiter::new(1.0, 3);
        let now = Instant::now();

        assert!(limiter.allow_at("192.0.2.1", now));
        assert!(limiter.allow_at("192.0.2.1", now));
        assert!(limiter.allow_at("192.0.2.1", now));
        assert!(!limiter.allow_at("192.0.2.1", now));
    }

    #[test]
    fn test_one_token_per_refill_period() {
        let limiter = RateLimiter::new(10.0, 2);
        let start = Instant::now();

        assert!(limiter.allow_at("k", start));
        assert!(limiter.allow_at("k", start));
        assert!(!limiter.allow_at("k", start));

        let later = start + Duration::from_millis(150);
        assert!(limiter.allow_at("k", later));
        assert!(!limiter.allow_at("k", later));
    }

    #[test]
    fn test_tokens_never_exceed_burst() {
        let limiter = RateLimiter::new(100.0, 2);
        let start = Instant::now();
        assert!(limiter.allow_at("k", start));

        // A long idle period refills to the burst cap, not beyond it.
        let later = start + Duration::from_secs(60);
        assert!(limiter.allow_at("k", later));
        assert!(limiter.allow_at("k", later));
        assert!(!limiter.allow_at("k", later));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1.0, 1);
        let now = Instant::now();

        assert!(limiter.allow_at("192.0.2.1", now));
        assert!(!limiter.allow_at("192.0.2.1", now));
        assert!(limiter.allow_at("192.0.2.2", now));
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn test_eviction_removes_only_full_buckets() {
        let limiter = RateLimiter::new(1.0, 4);
        let now = Instant::now();

        assert!(limiter.allow_at("busy", now));
        assert!(limiter.allow_at("idle", now));

        // One second later "idle" has refilled to 4; "busy" takes another token.
        let later = now + Duration::from_secs(1);
        assert!(limiter.allow_at("busy", later));

        assert_eq!(limiter.evict_idle_at(later), 1);
        assert_eq!(limiter.len(), 1);

        // The surviving bucket (3 tokens) was not charged by the sweep.
        assert!(limiter.allow_at("busy", later));
        assert!(limiter.allow_at("busy", later));
        assert!(limiter.allow_at("busy", later));
        assert!(!limiter.allow_at("busy", later));
    }

    #[test]
    fn test_evicted_key_returns_with_full_burst() {
        let limiter = RateLimiter::new(1.0, 2);
        let now = Instant::now();
        assert!(limiter.allow_at("k", now));

        let later = now + Duration::from_secs(5);
        assert_eq!(limiter.evict_idle_at(later), 1);
        assert!(limiter.is_empty());

        assert!(limiter.allow_at("k", later));
        assert!(limiter.allow_at("k", later));
        assert!(!limiter.allow_at("k", later));
    }

    #[test]
    fn test_concurrent_first_access_creates_one_bucket() {
        let limiter = Arc::new(RateLimiter::new(0.001, 5));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.allow("203.0.113.5"))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(admitted, 5);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_allow_with_real_clock() {
        let limiter = RateLimiter::new(10.0, 1);
        assert!(limiter.allow("127.0.0.1"));
        assert!(!limiter.allow("127.0.0.1"));
        std::thread::sleep(Duration::from_millis(120));
        assert!(limiter.allow("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_eviction_loop_stops_on_shutdown() {
        let limiter = Arc::new(RateLimiter::new(1.0, 1));
        let (tx, rx) = broadcast::channel(1);

        let task = tokio::spawn(limiter.clone().run_eviction_loop(Duration::from_secs(3600), rx));
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("eviction loop did not stop")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_loop_sweeps_on_interval() {
        let limiter = Arc::new(RateLimiter::new(1e12, 1));
        assert!(limiter.allow("k"));
        let (tx, rx) = broadcast::channel(1);

        let task = tokio::spawn(limiter.clone().run_eviction_loop(Duration::from_secs(60), rx));
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        tx.send(()).unwrap();
        task.await.unwrap();
        assert!(limiter.is_empty());
    }
}
