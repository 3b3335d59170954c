//! Per-platform cooldown after a quota rejection.

use std::{collections::HashMap, sync::Mutex, time::Duration};

use tracing::info;

use crate::types::Platform;

/// Whether a cooldown tripped at `tripped_at_ms` is still in effect at `now_ms`.
#[must_use]
pub fn cooldown_active(now_ms: u64, tripped_at_ms: Option<u64>, cooldown_ms: u64) -> bool {
    match tripped_at_ms {
        Some(at) => cooldown_ms > 0 && now_ms < at.saturating_add(cooldown_ms),
        None => false,
    }
}

/// Tracks when each platform last rejected a call for quota reasons.
pub struct QuotaGuard {
    cooldown_ms: u64,
    tripped: Mutex<HashMap<Platform, u64>>,
}

impl QuotaGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown_ms: cooldown.as_millis() as u64,
            tripped: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or restart) the cooldown for `platform`.
    pub fn trip(&self, platform: Platform, now_ms: u64) {
        if self.cooldown_ms == 0 {
            return;
        }
        let mut tripped = self.tripped.lock().unwrap_or_else(|e| e.into_inner());
        tripped.insert(platform, now_ms);
        info!(
            %platform,
            cooldown_secs = self.cooldown_ms / 1000,
            "quota exhausted, pausing platform"
        );
    }

    /// Whether `platform` is cooling down. Expired entries are cleared.
    pub fn is_cooling_down(&self, platform: Platform, now_ms: u64) -> bool {
        let mut tripped = self.tripped.lock().unwrap_or_else(|e| e.into_inner());
        let active = cooldown_active(now_ms, tripped.get(&platform).copied(), self.cooldown_ms);
        if !active && tripped.remove(&platform).is_some() {
            info!(%platform, "quota cooldown expired");
        }
        active
    }

    /// Milliseconds left in the cooldown, if any.
    pub fn remaining_ms(&self, platform: Platform, now_ms: u64) -> Option<u64> {
        let tripped = self.tripped.lock().unwrap_or_else(|e| e.into_inner());
        let at = *tripped.get(&platform)?;
        cooldown_active(now_ms, Some(at), self.cooldown_ms)
            .then(|| at.saturating_add(self.cooldown_ms) - now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_cooldown_window() {
        assert!(!cooldown_active(1_000, None, 500));
        assert!(cooldown_active(1_000, Some(900), 500));
        assert!(!cooldown_active(1_400, Some(900), 500));
        assert!(!cooldown_active(1_000, Some(900), 0));
    }

    #[test]
    fn guard_is_per_platform() {
        let guard = QuotaGuard::new(Duration::from_secs(60));
        guard.trip(Platform::Youtube, 0);
        assert!(guard.is_cooling_down(Platform::Youtube, 59_999));
        assert!(!guard.is_cooling_down(Platform::Tiktok, 1));
        assert_eq!(guard.remaining_ms(Platform::Youtube, 10_000), Some(50_000));
    }

    #[test]
    fn guard_expires() {
        let guard = QuotaGuard::new(Duration::from_secs(60));
        guard.trip(Platform::Tiktok, 0);
        assert!(!guard.is_cooling_down(Platform::Tiktok, 60_000));
        assert_eq!(guard.remaining_ms(Platform::Tiktok, 60_000), None);
    }

    #[test]
    fn zero_cooldown_never_trips() {
        let guard = QuotaGuard::new(Duration::ZERO);
        guard.trip(Platform::Youtube, 0);
        assert!(!guard.is_cooling_down(Platform::Youtube, 0));
    }
}
