//! Interaction networks.

use crate::error::{Error, check_num};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// ChaCha stream reserved for network construction.
const NETWORK_STREAM: u64 = 1;

/// Rewiring probability of the small-world construction.
const REWIRE_PROB: f64 = 0.1;

/// Network generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Erdős–Rényi random graph.
    Erdos,
    /// Watts–Strogatz small-world graph.
    #[serde(alias = "ws")]
    WattsStrogatz,
    /// Barabási–Albert preferential-attachment graph.
    #[serde(alias = "ba")]
    BarabasiAlbert,
}

/// Undirected graph over agents `0..n`, fixed after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    adj: Vec<Vec<usize>>,
}

impl Network {
    /// Generate a network from the given parameters.
    ///
    /// The generator owns its RNG: it is seeded with `seed` on a dedicated
    /// ChaCha stream, so the same seed can drive the dynamics independently.
    pub fn generate(
        n: usize,
        edge_density: f64,
        topology: Topology,
        seed: u64,
    ) -> Result<Self, Error> {
        check_num("number of agents", n, 1..)?;
        check_num("edge density", edge_density, 0.0..=1.0)?;

        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        rng.set_stream(NETWORK_STREAM);

        let adj = match topology {
            Topology::Erdos => erdos_renyi(n, edge_density, &mut rng),
            Topology::WattsStrogatz => {
                let k = ((edge_density * n as f64).round() as usize).max(2);
                watts_strogatz(n, k, &mut rng)
            }
            Topology::BarabasiAlbert => {
                let m = ((edge_density * n as f64 / 2.0).floor() as usize).max(1);
                barabasi_albert(n, m, &mut rng)?
            }
        };

        Ok(Self {
            adj: adj.into_iter().map(|set| set.into_iter().collect()).collect(),
        })
    }

    pub fn n_nodes(&self) -> usize {
        self.adj.len()
    }

    /// Sorted neighbours of node `i`.
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.adj[i]
    }

    pub fn degree(&self, i: usize) -> usize {
        self.adj[i].len()
    }

    pub fn n_edges(&self) -> usize {
        self.adj.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Edges `(u, v)` with `u < v`, in lexicographic order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.adj
            .iter()
            .enumerate()
            .flat_map(|(u, nbrs)| {
                nbrs.iter()
                    .filter(move |&&v| u < v)
                    .map(move |&v| (u, v))
            })
            .collect()
    }
}

type AdjSets = Vec<BTreeSet<usize>>;

fn add_edge(adj: &mut AdjSets, u: usize, v: usize) {
    adj[u].insert(v);
    adj[v].insert(u);
}

fn remove_edge(adj: &mut AdjSets, u: usize, v: usize) {
    adj[u].remove(&v);
    adj[v].remove(&u);
}

fn complete(n: usize) -> AdjSets {
    let mut adj = vec![BTreeSet::new(); n];
    for u in 0..n {
        for v in (u + 1)..n {
            add_edge(&mut adj, u, v);
        }
    }
    adj
}

fn erdos_renyi(n: usize, prob: f64, rng: &mut ChaCha12Rng) -> AdjSets {
    let mut adj = vec![BTreeSet::new(); n];
    for u in 0..n {
        for v in (u + 1)..n {
            if rng.random::<f64>() < prob {
                add_edge(&mut adj, u, v);
            }
        }
    }
    adj
}

fn watts_strogatz(n: usize, k: usize, rng: &mut ChaCha12Rng) -> AdjSets {
    if k >= n {
        return complete(n);
    }

    // Ring lattice: each node linked to k / 2 neighbours on each side.
    let mut adj = vec![BTreeSet::new(); n];
    for j in 1..=k / 2 {
        for u in 0..n {
            add_edge(&mut adj, u, (u + j) % n);
        }
    }

    // Rewire each lattice edge (u, u + j) to (u, w) with probability REWIRE_PROB.
    for j in 1..=k / 2 {
        for u in 0..n {
            if rng.random::<f64>() >= REWIRE_PROB {
                continue;
            }
            // A node linked to everybody has no free endpoint.
            if adj[u].len() >= n - 1 {
                continue;
            }
            let mut w = rng.random_range(0..n);
            while w == u || adj[u].contains(&w) {
                w = rng.random_range(0..n);
            }
            remove_edge(&mut adj, u, (u + j) % n);
            add_edge(&mut adj, u, w);
        }
    }

    adj
}

fn barabasi_albert(n: usize, m: usize, rng: &mut ChaCha12Rng) -> Result<AdjSets, Error> {
    let n_seed = (m + 1).min(n);
    let mut adj = complete(n_seed);
    adj.resize(n, BTreeSet::new());

    let mut degrees: Vec<usize> = adj.iter().map(BTreeSet::len).collect();
    let mut targets = BTreeSet::new();
    for v in n_seed..n {
        // Sample distinct targets proportionally to their current degree.
        let degree_dist = WeightedIndex::new(&degrees[..v])?;
        targets.clear();
        while targets.len() < m.min(v) {
            targets.insert(degree_dist.sample(rng));
        }
        for &t in &targets {
            add_edge(&mut adj, v, t);
            degrees[t] += 1;
        }
        degrees[v] = targets.len();
    }

    Ok(adj)
}
