//! Per-operation latency tracking with HdrHistogram.
//!
//! Timing uses a `quanta` clock (TSC where available); values are
//! recorded in nanoseconds.

use core::fmt;

use hdrhistogram::Histogram;

/// Engine operations tracked by the replay tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    LevelUpdate = 0,
    TopOfBook = 1,
    TickBatch = 2,
    Ema = 3,
    Rsi = 4,
    Ohlc = 5,
    RiskBatch = 6,
    Var = 7,
}

impl Operation {
    pub const COUNT: usize = 8;

    pub const ALL: [Operation; Self::COUNT] = [
        Operation::LevelUpdate,
        Operation::TopOfBook,
        Operation::TickBatch,
        Operation::Ema,
        Operation::Rsi,
        Operation::Ohlc,
        Operation::RiskBatch,
        Operation::Var,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Operation::LevelUpdate => "level_update",
            Operation::TopOfBook => "top_of_book",
            Operation::TickBatch => "tick_batch",
            Operation::Ema => "ema",
            Operation::Rsi => "rsi",
            Operation::Ohlc => "ohlc",
            Operation::RiskBatch => "risk_batch",
            Operation::Var => "var",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Point-in-time view of one histogram.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} mean={} p50={} p90={} p99={} p99.9={} max={}",
            self.count,
            format_latency(self.mean as u64),
            format_latency(self.p50),
            format_latency(self.p90),
            format_latency(self.p99),
            format_latency(self.p999),
            format_latency(self.max),
        )
    }
}

/// High-precision latency histogram.
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create a new auto-resizing histogram with 3 significant digits.
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new(3).expect("3 significant digits is in range"),
        }
    }

    /// Record a latency value in nanoseconds.
    #[inline(always)]
    pub fn record(&mut self, nanos: u64) {
        self.histogram.saturating_record(nanos);
    }

    /// Get value at percentile (0.0 - 100.0).
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        self.histogram.value_at_quantile(percentile / 100.0)
    }

    /// Get total count of recorded values.
    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Reset the histogram.
    pub fn reset(&mut self) {
        self.histogram.reset();
    }

    pub fn summary(&self) -> LatencySummary {
        if self.is_empty() {
            return LatencySummary::default();
        }
        LatencySummary {
            count: self.count(),
            mean: self.histogram.mean(),
            p50: self.value_at_percentile(50.0),
            p90: self.value_at_percentile(90.0),
            p99: self.value_at_percentile(99.0),
            p999: self.value_at_percentile(99.9),
            max: self.histogram.max(),
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// One histogram per [`Operation`] plus a shared clock.
pub struct LatencyRecorder {
    clock: quanta::Clock,
    histograms: [LatencyHistogram; Operation::COUNT],
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self {
            clock: quanta::Clock::new(),
            histograms: core::array::from_fn(|_| LatencyHistogram::new()),
        }
    }

    /// Raw clock reading; pair with [`LatencyRecorder::record_since`].
    #[inline(always)]
    pub fn start(&self) -> u64 {
        self.clock.raw()
    }

    /// Record the time elapsed since `start` against `op`.
    #[inline(always)]
    pub fn record_since(&mut self, op: Operation, start: u64) {
        let end = self.clock.raw();
        let nanos = self.clock.delta_as_nanos(start, end);
        self.histograms[op as usize].record(nanos);
    }

    /// Run `f` and record its latency against `op`.
    #[inline(always)]
    pub fn time<R>(&mut self, op: Operation, f: impl FnOnce() -> R) -> R {
        let start = self.start();
        let result = f();
        self.record_since(op, start);
        result
    }

    /// Record an externally measured latency.
    #[inline(always)]
    pub fn record(&mut self, op: Operation, nanos: u64) {
        self.histograms[op as usize].record(nanos);
    }

    pub fn histogram(&self, op: Operation) -> &LatencyHistogram {
        &self.histograms[op as usize]
    }

    pub fn summary(&self, op: Operation) -> LatencySummary {
        self.histogram(op).summary()
    }

    /// Summaries of every operation with at least one sample.
    pub fn summaries(&self) -> impl Iterator<Item = (Operation, LatencySummary)> + '_ {
        Operation::ALL
            .into_iter()
            .filter(|&op| !self.histogram(op).is_empty())
            .map(|op| (op, self.summary(op)))
    }

    pub fn reset(&mut self) {
        for h in &mut self.histograms {
            h.reset();
        }
    }
}

impl Default for LatencyRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Format latency with appropriate units.
pub fn format_latency(nanos: u64) -> String {
    if nanos < 1_000 {
        format!("{} ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2} μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2} ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", nanos as f64 / 1_000_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_summary() {
        let mut h = LatencyHistogram::new();
        for i in 1..=100 {
            h.record(i * 100);
        }

        let s = h.summary();
        assert_eq!(s.count, 100);
        assert!(s.p50 >= 4900 && s.p50 <= 5100);
        // HdrHistogram may round max value slightly
        assert!(s.max >= 10000 && s.max <= 10100);
        assert!(s.p50 <= s.p90 && s.p90 <= s.p99 && s.p99 <= s.p999);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(LatencyHistogram::new().summary(), LatencySummary::default());
    }

    #[test]
    fn test_recorder_per_operation() {
        let mut rec = LatencyRecorder::new();
        rec.record(Operation::Ema, 250);
        rec.record(Operation::Ema, 350);
        let out = rec.time(Operation::Var, || 41 + 1);
        assert_eq!(out, 42);

        assert_eq!(rec.summary(Operation::Ema).count, 2);
        assert_eq!(rec.summary(Operation::Var).count, 1);
        assert_eq!(rec.summary(Operation::Rsi).count, 0);

        let ops: Vec<_> = rec.summaries().map(|(op, _)| op).collect();
        assert_eq!(ops, vec![Operation::Ema, Operation::Var]);

        rec.reset();
        assert_eq!(rec.summaries().count(), 0);
    }

    #[test]
    fn test_operation_indices() {
        for (i, op) in Operation::ALL.iter().enumerate() {
            assert_eq!(*op as usize, i);
        }
        assert_eq!(Operation::RiskBatch.to_string(), "risk_batch");
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(500), "500 ns");
        assert_eq!(format_latency(5000), "5.00 μs");
        assert_eq!(format_latency(5_000_000), "5.00 ms");
    }
}
