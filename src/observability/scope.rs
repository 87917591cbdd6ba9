//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` with elapsed time on `complete()`
//! - Logs `{name}_FAILED` on `fail()`
//! - Logs `{name}_INCOMPLETE` if dropped without either

use std::cell::Cell;
use std::time::Instant;

use tracing::{error, info, warn};

/// A scope that automatically logs begin and complete events
///
/// ```ignore
/// let scope = ObservationScope::new("TABLE_FETCH");
/// // ... do work ...
/// scope.complete(); // logs TABLE_FETCH_COMPLETE
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    timer: Timer,
}

impl<'a> ObservationScope<'a> {
    /// Create a new observation scope. Logs `{name}_BEGIN` immediately.
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a new observation scope carrying fields on every event
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let fields: Vec<(&'a str, String)> =
            fields.iter().map(|(k, v)| (*k, v.to_string())).collect();
        info!(
            event = %format!("{}_BEGIN", name),
            fields = %render_fields(&fields, &[]),
        );

        Self {
            name,
            completed: Cell::new(false),
            fields,
            timer: Timer::new(),
        }
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(self, extra_fields: &[(&str, &str)]) {
        self.completed.set(true);
        info!(
            event = %format!("{}_COMPLETE", self.name),
            elapsed_ms = self.timer.elapsed_ms(),
            fields = %render_fields(&self.fields, extra_fields),
        );
    }

    /// Mark the scope as failed with a reason
    pub fn fail(self, reason: &str) {
        self.completed.set(true);
        error!(
            event = %format!("{}_FAILED", self.name),
            elapsed_ms = self.timer.elapsed_ms(),
            reason = reason,
            fields = %render_fields(&self.fields, &[]),
        );
    }

    /// Check if the scope has been completed
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            warn!(
                event = %format!("{}_INCOMPLETE", self.name),
                reason = "scope dropped without completion",
            );
        }
    }
}

/// Fields rendered as `k=v` pairs, sorted by key for stable output
fn render_fields(fields: &[(&str, String)], extra: &[(&str, &str)]) -> String {
    let mut all: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    all.extend(extra.iter().copied());
    all.sort_by_key(|(k, _)| *k);
    all.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A simple duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds since creation
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
