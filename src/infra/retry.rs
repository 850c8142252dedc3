//! Single-retry helper for idempotent reads.
//!
//! Transient database failures (connection drops, pool timeouts) are
//! retried exactly once, with a short jittered delay. Mutating operations
//! must never go through this helper: a blind retry of a checkout or stock
//! decrement risks double-applying if the first attempt committed before
//! the error surfaced.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::error::{CommerceError, Result};

/// Base delay before the single retry; actual delay is jittered 0..2x.
const RETRY_DELAY: Duration = Duration::from_millis(50);

/// Whether an error is worth one retry for a read-only operation.
pub fn is_transient(err: &CommerceError) -> bool {
    match err {
        CommerceError::Database(e) => matches!(
            e,
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
        ),
        _ => false,
    }
}

/// Run a read-only operation, retrying once on a transient failure.
pub async fn read_with_retry<T, F, Fut>(op_name: &'static str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match op().await {
        Ok(v) => Ok(v),
        Err(err) if is_transient(&err) => {
            let jitter: f64 = rand::thread_rng().gen_range(0.0..2.0);
            let delay = RETRY_DELAY.mul_f64(jitter);
            warn!(op = op_name, error = %err, delay_ms = delay.as_millis() as u64,
                "transient failure on read, retrying once");
            tokio::time::sleep(delay).await;
            op().await
        }
        Err(err) => Err(err),
    }
}
