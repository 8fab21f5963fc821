//! Message-level protocol tracing on the `protocol_trace` target.
//!
//! Off unless `RFB_PROTOCOL_TRACE` is set to `1`/`true` or a session turns
//! it on through [`LoggingConfig::protocol_trace`](crate::config::LoggingConfig).

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};

pub const TRACE_ENV: &str = "RFB_PROTOCOL_TRACE";

static TRACE_ENABLED: Lazy<AtomicBool> = Lazy::new(|| {
    let on = std::env::var(TRACE_ENV)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
        .unwrap_or(false);
    AtomicBool::new(on)
});

#[inline]
pub fn enabled() -> bool {
    TRACE_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn set_enabled(on: bool) {
    TRACE_ENABLED.store(on, Ordering::Relaxed)
}

#[inline]
pub fn out_msg(name: &str, fields: std::fmt::Arguments<'_>) {
    if enabled() {
        tracing::info!(target: "protocol_trace", "OUT {} {}", name, fields);
    }
}

#[inline]
pub fn in_msg(name: &str, fields: std::fmt::Arguments<'_>) {
    if enabled() {
        tracing::info!(target: "protocol_trace", "IN  {} {}", name, fields);
    }
}

/// Logs up to `max` bytes of `data`, sixteen per line.
pub fn hexdump(prefix: &str, data: &[u8], max: usize) {
    if !enabled() || data.is_empty() {
        return;
    }
    for chunk in data[..max.min(data.len())].chunks(16) {
        let line: String = chunk.iter().map(|b| format!(" {:02X}", b)).collect();
        tracing::info!(target: "protocol_trace", "{}{}", prefix, line);
    }
}
