use crate::route::Route;
use core::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use dashmap::DashMap;
use std::{net::IpAddr, time::Instant};

/// Expired windows are swept after this many checks.
const PURGE_EVERY: u64 = 1024;

struct Window {
    opened: Instant,
    count: u32,
}

/// Fixed-window request counter per route and client address.
#[derive(Default)]
pub struct RateLimiter {
    windows: DashMap<(Route, IpAddr), Window>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one request. On rejection, returns how long until the current window closes.
    pub fn check(&self, route: Route, peer: IpAddr, now: Instant) -> Result<(), Duration> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY == PURGE_EVERY - 1 {
            self.purge(now);
        }

        let limit = route.limit();
        let mut window = self.windows.entry((route, peer)).or_insert(Window { opened: now, count: 0 });
        if now.saturating_duration_since(window.opened) >= limit.window {
            *window = Window { opened: now, count: 0 };
        }

        if window.count >= limit.max {
            return Err(limit.window.saturating_sub(now.saturating_duration_since(window.opened)));
        }

        window.count += 1;
        Ok(())
    }

    /// Forgets every window that has already closed.
    pub fn purge(&self, now: Instant) {
        self.windows.retain(|(route, _), window| now.saturating_duration_since(window.opened) < route.limit().window);
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
