use crate::models::Platform;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Spaces out requests to the same platform, across every pass that shares it.
///
/// Each caller reserves the next free slot for its platform and sleeps until
/// then, so two requests to one platform never start less than `delay` apart.
pub struct Pacer {
    delay: Duration,
    next_slot: Mutex<HashMap<Platform, Instant>>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn reserve(&self, platform: Platform) -> Instant {
        let now = Instant::now();
        let mut slots = match self.next_slot.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };

        let slot = slots
            .get(&platform)
            .copied()
            .filter(|next| *next > now)
            .unwrap_or(now);
        slots.insert(platform, slot + self.delay);
        slot
    }

    /// Wait until this platform may be contacted again
    pub async fn wait_turn(&self, platform: Platform) {
        let slot = self.reserve(platform);
        if slot > Instant::now() {
            tracing::debug!(
                "Pacing {}: waiting {}ms before next request",
                platform,
                (slot - Instant::now()).as_millis()
            );
            tokio::time::sleep_until(slot).await;
        }
    }
}
