//! Metrics collection: atomic histograms labelled by `{app_id, story_name,
//! service}`, in the style of the agent runtime's `MetricsRegistry` but
//! keyed rather than flat, since every measurement here is per-service.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

type Label = (String, String, String);

/// A single labelled histogram bucketless accumulator: sum and count only,
/// since nothing downstream here renders bucket distributions, only
/// averages per label.
#[derive(Default)]
struct Accumulator {
    sum_bits: AtomicU64,
    count: AtomicU64,
}

impl Accumulator {
    fn observe(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let mut current = self.sum_bits.load(Ordering::Relaxed);
        loop {
            let next = f64::from_bits(current) + value;
            match self.sum_bits.compare_exchange_weak(
                current,
                next.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    fn sum(&self) -> f64 {
        f64::from_bits(self.sum_bits.load(Ordering::Relaxed))
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// A histogram keyed by `(app_id, story_name, service)`.
#[derive(Default)]
pub struct LabelledHistogram {
    series: DashMap<Label, Accumulator>,
}

impl LabelledHistogram {
    pub fn new() -> Self {
        LabelledHistogram { series: DashMap::new() }
    }

    pub fn observe(&self, app_id: &str, story_name: &str, service: &str, seconds: f64) {
        let key = (app_id.to_string(), story_name.to_string(), service.to_string());
        self.series.entry(key).or_default().observe(seconds);
    }

    pub fn count(&self, app_id: &str, story_name: &str, service: &str) -> u64 {
        let key = (app_id.to_string(), story_name.to_string(), service.to_string());
        self.series.get(&key).map(|a| a.count()).unwrap_or(0)
    }

    pub fn sum(&self, app_id: &str, story_name: &str, service: &str) -> f64 {
        let key = (app_id.to_string(), story_name.to_string(), service.to_string());
        self.series.get(&key).map(|a| a.sum()).unwrap_or(0.0)
    }
}

/// Registry of the engine's two labelled histograms, per spec.md §4.3.
#[derive(Default)]
pub struct MetricsRegistry {
    pub container_exec_seconds_total: LabelledHistogram,
    pub container_start_seconds_total: LabelledHistogram,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        MetricsRegistry::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observations_are_isolated_per_label() {
        let registry = MetricsRegistry::new();
        registry.container_exec_seconds_total.observe("app-1", "story-a", "alpine", 1.5);
        registry.container_exec_seconds_total.observe("app-1", "story-a", "slack", 9.0);

        assert_eq!(registry.container_exec_seconds_total.count("app-1", "story-a", "alpine"), 1);
        assert_eq!(registry.container_exec_seconds_total.sum("app-1", "story-a", "alpine"), 1.5);
        assert_eq!(registry.container_exec_seconds_total.sum("app-1", "story-a", "slack"), 9.0);
    }

    #[test]
    fn unobserved_label_reads_as_zero() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.container_start_seconds_total.count("app-x", "story-x", "none"), 0);
    }

    #[test]
    fn repeated_observations_accumulate() {
        let hist = LabelledHistogram::new();
        hist.observe("a", "s", "svc", 1.0);
        hist.observe("a", "s", "svc", 2.0);
        hist.observe("a", "s", "svc", 3.0);
        assert_eq!(hist.count("a", "s", "svc"), 3);
        assert_eq!(hist.sum("a", "s", "svc"), 6.0);
    }
}
