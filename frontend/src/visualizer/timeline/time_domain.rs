//! Time domain for timeline time representations and calculations
//!
//! Trace timestamps arrive as nanoseconds; the timeline axis is drawn in
//! milliseconds. TimeNs and DurationNs keep the two from being mixed up.

use std::fmt;

// Time conversion constants
pub const NS_PER_SECOND: f64 = 1_000_000_000.0;
pub const NS_PER_MILLISECOND: f64 = 1_000_000.0;
pub const NS_PER_MICROSECOND: f64 = 1_000.0;

/// A trace timestamp in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeNs(pub u64);

impl TimeNs {
    pub fn from_nanos(nanos: u64) -> Self {
        TimeNs(nanos)
    }

    /// Position on the timeline axis.
    pub fn display_millis(self) -> f64 {
        self.0 as f64 / NS_PER_MILLISECOND
    }

    pub fn duration_since(self, earlier: TimeNs) -> DurationNs {
        DurationNs(self.0.saturating_sub(earlier.0))
    }

    /// Midpoint between two timestamps, in axis units.
    pub fn midpoint_millis(self, other: TimeNs) -> f64 {
        (self.0 as f64 + other.0 as f64) / (2.0 * NS_PER_MILLISECOND)
    }
}

impl fmt::Display for TimeNs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_scaled(f, self.0)
    }
}

/// Represents a duration in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DurationNs(pub u64);

impl DurationNs {
    pub fn from_nanos(nanos: u64) -> Self {
        DurationNs(nanos)
    }

    pub fn display_millis(self) -> f64 {
        self.0 as f64 / NS_PER_MILLISECOND
    }
}

impl fmt::Display for DurationNs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_scaled(f, self.0)
    }
}

fn write_scaled(f: &mut fmt::Formatter<'_>, nanos: u64) -> fmt::Result {
    let seconds = nanos as f64 / NS_PER_SECOND;
    if seconds >= 1.0 {
        write!(f, "{:.3}s", seconds)
    } else if seconds >= 0.001 {
        write!(f, "{:.3}ms", nanos as f64 / NS_PER_MILLISECOND)
    } else if seconds >= 0.000001 {
        write!(f, "{:.3}μs", nanos as f64 / NS_PER_MICROSECOND)
    } else {
        write!(f, "{}ns", nanos)
    }
}

/// Closed time range covered by one epoch's activity edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub start: TimeNs,
    pub end: TimeNs,
}

impl TimeRange {
    pub fn new(start: TimeNs, end: TimeNs) -> Self {
        TimeRange { start, end }
    }

    pub fn duration(self) -> DurationNs {
        self.end.duration_since(self.start)
    }

    pub fn display_millis(self) -> (f64, f64) {
        (self.start.display_millis(), self.end.display_millis())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_units_are_milliseconds() {
        assert_eq!(TimeNs(2_500_000).display_millis(), 2.5);
        assert_eq!(TimeNs(10).midpoint_millis(TimeNs(30)), 20.0 / NS_PER_MILLISECOND);
    }

    #[test]
    fn durations_saturate() {
        assert_eq!(TimeNs(5).duration_since(TimeNs(9)), DurationNs(0));
        assert_eq!(TimeRange::new(TimeNs(9), TimeNs(5)).duration(), DurationNs(0));
    }

    #[test]
    fn displays_scaled_units() {
        assert_eq!(DurationNs(999).to_string(), "999ns");
        assert_eq!(DurationNs(1_500_000).to_string(), "1.500ms");
        assert_eq!(TimeNs(2_000_000_000).to_string(), "2.000s");
    }
}
