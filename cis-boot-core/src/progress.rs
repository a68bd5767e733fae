//! C2 — Progress Tracker, grounded on
//! `original_source/CM7/Application/Src/progress.c`'s `ProgressManager`.
//!
//! Display updates are expensive relative to flash-chunk throughput, so the
//! tracker only forwards a value when the rounded-down overall percentage
//! actually changes.

/// Sink the tracker forwards deduplicated percentages to. The display
/// component owns the real one; tests use a `heapless::Vec`-backed fake.
pub trait ProgressSink {
    fn report(&mut self, percent: u32);
}

/// Tracks overall progress across a multi-phase run: total phase count and
/// the last percentage actually forwarded to the sink.
pub struct ProgressTracker {
    total_phases: u32,
    last_reported_percent: i64,
}

impl ProgressTracker {
    /// `last_reported_percent` starts below any real percentage so the
    /// first genuine update always fires.
    pub fn init(total_phases: u32) -> Self {
        Self {
            total_phases,
            last_reported_percent: -1,
        }
    }

    /// `overall = ((phase_number - 1) + current/total) * (100 / total_phases)`,
    /// truncated to an integer, forwarded only when it differs from the last
    /// reported value. Out-of-range phase numbers or `total == 0` are
    /// silently ignored — never fails the update.
    pub fn update(&mut self, sink: &mut impl ProgressSink, phase_number: u32, current: u64, total: u64) {
        if total == 0 || phase_number < 1 || phase_number > self.total_phases {
            return;
        }

        // Integer form of `(current * 100 + total/2) / total`, scaled further by the phase and phase count.
        let step_percent = (current * 100 + total / 2) / total; // 0..=100
        let overall = ((phase_number as u64 - 1) * 100 + step_percent) * 100 / (self.total_phases as u64 * 100);

        let overall = overall as i64;
        if overall != self.last_reported_percent {
            self.last_reported_percent = overall;
            sink.report(overall as u32);
        }
    }
}
