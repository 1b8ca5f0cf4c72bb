//! Counters reporting how well the call graph resolution went.
//!
//! Counters are atomics so that a single [`Metrics`] instance can be shared
//! by reference between resolvers running in parallel.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const NB_METRICS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MetricType {
    /// A referenced class is not defined in the repository.
    MissingClass,
    /// The target class is defined but does not provide the method.
    MissingMethod,
    IncompleteCallSkipped,
    SymbolicCall,
    ConcreteCall,
    /// A value analysis failed on a method, calls are reported with less information.
    AnalysisDegraded,
    EvaluationTooComplex,
    EmptyCode,
    MalformedInvocation,
    DominatorFailure,
}

impl MetricType {
    pub const ALL: [Self; NB_METRICS] = [
        Self::MissingClass,
        Self::MissingMethod,
        Self::IncompleteCallSkipped,
        Self::SymbolicCall,
        Self::ConcreteCall,
        Self::AnalysisDegraded,
        Self::EvaluationTooComplex,
        Self::EmptyCode,
        Self::MalformedInvocation,
        Self::DominatorFailure,
    ];

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::MissingClass => "missing classes",
            Self::MissingMethod => "missing methods",
            Self::IncompleteCallSkipped => "skipped incomplete calls",
            Self::SymbolicCall => "symbolic calls",
            Self::ConcreteCall => "concrete calls",
            Self::AnalysisDegraded => "degraded analyses",
            Self::EvaluationTooComplex => "too complex evaluations",
            Self::EmptyCode => "empty codes",
            Self::MalformedInvocation => "malformed invocations",
            Self::DominatorFailure => "dominators failures",
        };
        write!(f, "{name}")
    }
}

/// Values of every counter at a given time.
pub type MetricsSnapshot = BTreeMap<MetricType, u64>;

#[derive(Debug, Default)]
pub struct Metrics {
    counters: [AtomicU64; NB_METRICS],
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment(&self, metric: MetricType) {
        self.add(metric, 1);
    }

    #[inline]
    pub fn add(&self, metric: MetricType, n: u64) {
        self.counters[metric.index()].fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    pub fn get(&self, metric: MetricType) -> u64 {
        self.counters[metric.index()].load(Ordering::Relaxed)
    }

    /// Adds every counter of `other` to this instance.
    pub fn merge(&self, other: &Self) {
        for metric in MetricType::ALL {
            self.add(metric, other.get(metric));
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricType::ALL
            .into_iter()
            .map(|metric| (metric, self.get(metric)))
            .collect()
    }

    /// Returns the counters values and resets them.
    pub fn flush(&self) -> MetricsSnapshot {
        MetricType::ALL
            .into_iter()
            .map(|metric| {
                (
                    metric,
                    self.counters[metric.index()].swap(0, Ordering::Relaxed),
                )
            })
            .collect()
    }

    pub fn log_summary(&self) {
        log::info!("call graph resolution summary:");
        for (metric, value) in self.snapshot() {
            if value > 0 {
                log::info!("  {metric}: {value}");
            }
        }
    }
}
