use crate::network::Network;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Binary opinion, `0` or `1`.
pub type Opinion = u8;

/// Rounding applied when exactly half of an agent's neighbours hold opinion `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieRule {
    /// Round 0.5 to the even value, i.e. to opinion `0`.
    #[default]
    HalfToEven,
    /// Round 0.5 up to opinion `1`.
    HalfUp,
}

/// Majority opinion of `n_nbrs` neighbours of which `n_ones` hold opinion `1`.
///
/// Equivalent to rounding the neighbourhood mean, decided on integers.
pub fn majority(n_ones: usize, n_nbrs: usize, tie_rule: TieRule) -> Opinion {
    match (2 * n_ones).cmp(&n_nbrs) {
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Less => 0,
        std::cmp::Ordering::Equal => match tie_rule {
            TieRule::HalfToEven => 0,
            TieRule::HalfUp => 1,
        },
    }
}

/// Probabilities of the per-agent update.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRule {
    pub influence: f64,
    pub noise: f64,
    pub tie_rule: TieRule,
}

impl UpdateRule {
    /// Next opinion of a free agent given a uniform draw `r` in `[0, 1)`.
    pub fn apply(&self, current: Opinion, majority: Opinion, r: f64) -> Opinion {
        if r < self.noise {
            1 - current
        } else if r < self.noise + self.influence {
            majority
        } else {
            current
        }
    }
}

/// Opinions of every agent plus their fixed zealot flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    opinions: Vec<Opinion>,
    zealot: Vec<bool>,
}

impl Population {
    /// Draw fair-coin opinions for all agents, then their zealot flags.
    pub fn generate<R: Rng + ?Sized>(n: usize, zealot_fraction: f64, rng: &mut R) -> Self {
        let opinions = (0..n).map(|_| Opinion::from(rng.random_bool(0.5))).collect();
        let zealot = (0..n).map(|_| rng.random::<f64>() < zealot_fraction).collect();
        Self { opinions, zealot }
    }

    pub fn opinions(&self) -> &[Opinion] {
        &self.opinions
    }

    pub fn zealot(&self) -> &[bool] {
        &self.zealot
    }

    /// Compute every agent's next opinion from the current snapshot.
    ///
    /// Zealots and isolated agents keep their opinion without consuming a draw.
    pub fn next_opinions<R: Rng + ?Sized>(
        &self,
        net: &Network,
        rule: &UpdateRule,
        rng: &mut R,
    ) -> Vec<Opinion> {
        let current = &self.opinions;
        let mut next = current.clone();

        for (i_agt, opinion) in next.iter_mut().enumerate() {
            if self.zealot[i_agt] {
                continue;
            }
            let nbrs = net.neighbors(i_agt);
            if nbrs.is_empty() {
                continue;
            }
            let n_ones = nbrs.iter().filter(|&&j| current[j] == 1).count();
            let majority = majority(n_ones, nbrs.len(), rule.tie_rule);
            *opinion = rule.apply(current[i_agt], majority, rng.random::<f64>());
        }

        next
    }

    /// Replace the whole opinion vector.
    pub fn set_opinions(&mut self, opinions: Vec<Opinion>) {
        debug_assert_eq!(opinions.len(), self.opinions.len());
        self.opinions = opinions;
    }
}

/// Append-only record of opinion snapshots.
///
/// Index 0 holds the initial state, index `k` the state after step `k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    snapshots: Vec<Vec<Opinion>>,
}

impl History {
    pub fn new(initial: &[Opinion]) -> Self {
        Self {
            snapshots: vec![initial.to_vec()],
        }
    }

    /// Append a copy of `snapshot`.
    pub fn record(&mut self, snapshot: &[Opinion]) {
        self.snapshots.push(snapshot.to_vec());
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn get(&self, idx: usize) -> Option<&[Opinion]> {
        self.snapshots.get(idx).map(Vec::as_slice)
    }

    pub fn initial(&self) -> &[Opinion] {
        &self.snapshots[0]
    }

    pub fn last(&self) -> &[Opinion] {
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Opinion]> {
        self.snapshots.iter().map(Vec::as_slice)
    }
}
