//! Round-robin proxy selection

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::ProxyConfig;

/// Pick the next proxy in stable config order
///
/// The cursor is monotonically increasing for the process lifetime; the
/// atomic increment keeps concurrent callers from drawing the same index,
/// though strict fairness under load is not guaranteed.
pub fn select<'a>(cursor: &AtomicUsize, eligible: &'a [ProxyConfig]) -> Option<&'a ProxyConfig> {
    if eligible.is_empty() {
        return None;
    }

    let idx = cursor.fetch_add(1, Ordering::Relaxed) % eligible.len();
    eligible.get(idx)
}
