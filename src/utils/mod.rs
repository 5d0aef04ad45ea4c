use std::time::Instant;
use tracing::{debug, info};

/// Logs how long a command took when dropped.
pub struct Timer {
    label: &'static str,
    started: Instant,
}

impl Timer {
    pub fn start(label: &'static str) -> Self {
        debug!("{} started", label);
        Self {
            label,
            started: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("{} done in {:.2?}", self.label, self.started.elapsed());
    }
}

// ── Formatting ───────────────────────────────────────────────────────────────

/// Format a non-negative integer with thousands separators.
pub fn fmt_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Currency amount in won, e.g. `₩1,200,000`.
pub fn fmt_amount(n: u64) -> String {
    format!("₩{}", fmt_number(n))
}

/// Compact millions, e.g. `₩120M`.
pub fn fmt_millions(n: u64) -> String {
    format!("₩{}M", fmt_number((n + 500_000) / 1_000_000))
}
