//! Tokio runtime implementation.

use std::time::Duration;

/// Sleep for the specified duration using tokio.
pub async fn sleep_impl(duration: Duration) {
    tokio::time::sleep(duration).await
}
