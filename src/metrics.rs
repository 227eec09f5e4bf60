use crate::model::{History, Opinion};
use serde::{Deserialize, Serialize};

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Every agent holds the same final opinion.
    pub consensus: bool,
    /// Population variance of the final opinions.
    pub final_variance: f64,
    /// Share of agents holding the less common final opinion.
    pub minority_share: f64,
    /// Mean opinion at every history index.
    pub avg_over_time: Vec<f64>,
}

impl RunMetrics {
    /// Reduce a history to its summary metrics.
    ///
    /// All quantities derive from integer counts of opinion `1`, so
    /// consensus is an exact test on the final count.
    pub fn from_history(history: &History) -> Self {
        let avg_over_time = history
            .iter()
            .map(|snapshot| count_ones(snapshot) as f64 / snapshot.len() as f64)
            .collect();

        let last = history.last();
        let n = last.len();
        let n_ones = count_ones(last);
        let n_minority = n_ones.min(n - n_ones);

        Self {
            consensus: n_minority == 0,
            final_variance: (n_ones * (n - n_ones)) as f64 / (n * n) as f64,
            minority_share: n_minority as f64 / n as f64,
            avg_over_time,
        }
    }

    /// Mean opinion of the final state.
    pub fn final_mean(&self) -> f64 {
        self.avg_over_time.last().copied().unwrap_or(f64::NAN)
    }
}

fn count_ones(snapshot: &[Opinion]) -> usize {
    snapshot.iter().filter(|&&o| o == 1).count()
}
