use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::AppError;

/// Token bucket shared by the suggestion and program-search entry points.
#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    state: Arc<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    /// `RATE_LIMIT_RPS`; absent, zero or unparsable means unlimited.
    pub fn from_env() -> Option<Self> {
        std::env::var("RATE_LIMIT_RPS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .and_then(Self::new)
    }

    pub fn new(rps: u32) -> Option<Self> {
        if rps == 0 {
            return None;
        }
        Some(Self {
            rps,
            state: Arc::new(Mutex::new(Bucket {
                tokens: rps as f64,
                last: Instant::now(),
            })),
        })
    }

    pub async fn check(&self) -> Result<(), AppError> {
        let mut bucket = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last);
        bucket.last = now;

        let rate = self.rps as f64;
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * rate).min(rate);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / rate);
        Err(AppError::RateLimited(format!(
            "rate limit exceeded ({} requests/s): try again in ~{}ms",
            self.rps,
            wait.as_millis()
        )))
    }
}
