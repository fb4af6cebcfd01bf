use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Outcome tally for one workflow stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl StageCounts {
    /// True when nothing in the stage was skipped or failed.
    pub fn is_complete(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }
}

pub struct MetricsRecorder {
    inner: Mutex<BTreeMap<String, StageCounts>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn record_processed(&self, stage: &str) {
        self.update(stage, |counts| counts.processed += 1);
    }

    pub fn record_skipped(&self, stage: &str) {
        self.update(stage, |counts| counts.skipped += 1);
    }

    pub fn record_failed(&self, stage: &str) {
        self.update(stage, |counts| counts.failed += 1);
    }

    pub fn snapshot(&self, stage: &str) -> StageCounts {
        if let Ok(metrics) = self.inner.lock() {
            metrics.get(stage).copied().unwrap_or_default()
        } else {
            StageCounts::default()
        }
    }

    /// All stages seen so far, ordered by name.
    pub fn stages(&self) -> Vec<(String, StageCounts)> {
        if let Ok(metrics) = self.inner.lock() {
            metrics.iter().map(|(k, v)| (k.clone(), *v)).collect()
        } else {
            Vec::new()
        }
    }

    fn update(&self, stage: &str, apply: impl FnOnce(&mut StageCounts)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(metrics.entry(stage.to_string()).or_default());
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_tracks_each_stage_separately() {
        let recorder = MetricsRecorder::new();
        recorder.record_processed("time_series");
        recorder.record_processed("time_series");
        recorder.record_skipped("time_series");
        recorder.record_failed("station_maps");

        assert_eq!(
            recorder.snapshot("time_series"),
            StageCounts {
                processed: 2,
                skipped: 1,
                failed: 0
            }
        );
        assert!(!recorder.snapshot("station_maps").is_complete());
        assert!(recorder.snapshot("unknown").is_complete());
        assert_eq!(recorder.stages().len(), 2);
    }
}
