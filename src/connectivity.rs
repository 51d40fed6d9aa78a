//! Cheap reachability probe used to decide between network resolution
//! and demanding a manual rate.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// True if a TCP connection to `addr` succeeds within `limit`. Any
/// failure, including DNS and timeout, reads as offline. Side-effect
/// free and safe to call repeatedly.
pub async fn is_online(addr: &str, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(addr = %addr, error = %e, "Connectivity probe failed");
            false
        }
        Err(_) => {
            debug!(addr = %addr, "Connectivity probe timed out");
            false
        }
    }
}
