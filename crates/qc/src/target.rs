//! Reachability check for the site under test

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{QcError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Poll `base_url` until it answers with a success status or `timeout` passes
pub async fn wait_until_reachable(base_url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Site reachable at {} ({} attempt(s))", base_url, attempts);
                return Ok(());
            }
            Ok(resp) => {
                warn!("Reachability check returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to respond...", base_url);
                }
                if !e.is_connect() {
                    warn!("Reachability check error: {}", e);
                }
            }
        }

        if start.elapsed() + POLL_INTERVAL >= timeout {
            break;
        }
        sleep(POLL_INTERVAL).await;
    }

    Err(QcError::SiteUnreachable {
        url: base_url.to_string(),
        attempts,
    })
}
