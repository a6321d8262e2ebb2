//! Aggregated results of a load run.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Outcome counters and latency samples of one virtual user.
#[derive(Debug, Default)]
pub struct VuStats {
    pub ok: usize,
    /// Failed calls keyed by gRPC status code name.
    pub failures: BTreeMap<String, usize>,
    pub latencies: Vec<Duration>,
    /// Whether the user never got a channel and made no calls.
    pub connect_failed: bool,
}

impl VuStats {
    pub fn record_ok(&mut self, latency: Duration) {
        self.ok += 1;
        self.latencies.push(latency);
    }

    pub fn record_failure(&mut self, code: impl Into<String>, latency: Duration) {
        *self.failures.entry(code.into()).or_insert(0) += 1;
        self.latencies.push(latency);
    }
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct LoadReport {
    pub vus: usize,
    pub ok: usize,
    pub failures: BTreeMap<String, usize>,
    pub connect_failures: usize,
    pub elapsed: Duration,
    /// Latencies of every completed call, ascending.
    latencies: Vec<Duration>,
}

impl LoadReport {
    /// Merge per-user stats into one report.
    pub fn from_vus(stats: Vec<VuStats>, elapsed: Duration) -> Self {
        let vus = stats.len();
        let mut ok = 0;
        let mut failures = BTreeMap::new();
        let mut connect_failures = 0;
        let mut latencies = Vec::new();

        for vu in stats {
            ok += vu.ok;
            if vu.connect_failed {
                connect_failures += 1;
            }
            for (code, count) in vu.failures {
                *failures.entry(code).or_insert(0) += count;
            }
            latencies.extend(vu.latencies);
        }
        latencies.sort_unstable();

        Self {
            vus,
            ok,
            failures,
            connect_failures,
            elapsed,
            latencies,
        }
    }

    /// Calls that completed, successfully or not.
    pub fn total(&self) -> usize {
        self.ok + self.failures.values().sum::<usize>()
    }

    /// Share of calls that passed the `status is OK` check, in `0.0..=1.0`.
    pub fn ok_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.ok as f64 / total as f64,
        }
    }

    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total() as f64 / secs
        } else {
            0.0
        }
    }

    /// Nearest-rank percentile of call latency; `None` when nothing completed.
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let p = p.clamp(0.0, 100.0);
        let rank = ((p / 100.0) * self.latencies.len() as f64).ceil() as usize;
        self.latencies.get(rank.saturating_sub(1)).copied()
    }
}

fn millis(latency: Option<Duration>) -> String {
    latency.map_or_else(|| "-".to_string(), |d| format!("{:.2}ms", d.as_secs_f64() * 1000.0))
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vus..................: {}", self.vus)?;
        writeln!(f, "calls................: {}", self.total())?;
        writeln!(
            f,
            "status is OK.........: {:.2}% ({} / {})",
            self.ok_rate() * 100.0,
            self.ok,
            self.total()
        )?;
        for (code, count) in &self.failures {
            writeln!(f, "  failed {code:.<13}: {count}")?;
        }
        if self.connect_failures > 0 {
            writeln!(f, "connect failures.....: {}", self.connect_failures)?;
        }
        writeln!(f, "duration.............: {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "requests/sec.........: {:.1}", self.requests_per_second())?;
        write!(
            f,
            "latency..............: p50={} p95={} p99={}",
            millis(self.percentile(50.0)),
            millis(self.percentile(95.0)),
            millis(self.percentile(99.0))
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vu_with_latencies(ms: &[u64]) -> VuStats {
        let mut stats = VuStats::default();
        for &m in ms {
            stats.record_ok(Duration::from_millis(m));
        }
        stats
    }

    #[test]
    fn test_merges_users() {
        let mut failing = vu_with_latencies(&[5]);
        failing.record_failure("Unavailable", Duration::from_millis(1));
        failing.record_failure("Unavailable", Duration::from_millis(2));

        let report = LoadReport::from_vus(
            vec![vu_with_latencies(&[10, 20]), failing],
            Duration::from_secs(1),
        );

        assert_eq!(report.vus, 2);
        assert_eq!(report.ok, 3);
        assert_eq!(report.total(), 5);
        assert_eq!(report.failures.get("Unavailable"), Some(&2));
        assert!((report.ok_rate() - 0.6).abs() < f64::EPSILON);
        assert!((report.requests_per_second() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_nearest_rank_percentiles() {
        let ms: Vec<u64> = (1..=100).collect();
        let report =
            LoadReport::from_vus(vec![vu_with_latencies(&ms)], Duration::from_secs(1));

        assert_eq!(report.percentile(50.0), Some(Duration::from_millis(50)));
        assert_eq!(report.percentile(95.0), Some(Duration::from_millis(95)));
        assert_eq!(report.percentile(99.0), Some(Duration::from_millis(99)));
        assert_eq!(report.percentile(100.0), Some(Duration::from_millis(100)));
        assert_eq!(report.percentile(0.0), Some(Duration::from_millis(1)));
    }

    #[test]
    fn test_empty_run() {
        let mut stats = VuStats::default();
        stats.connect_failed = true;

        let report = LoadReport::from_vus(vec![stats], Duration::ZERO);

        assert_eq!(report.total(), 0);
        assert_eq!(report.ok_rate(), 0.0);
        assert_eq!(report.requests_per_second(), 0.0);
        assert_eq!(report.percentile(50.0), None);
        assert_eq!(report.connect_failures, 1);
        assert!(report.to_string().contains("p50=-"));
    }
}
