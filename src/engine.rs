use crate::config::SimConfig;
use crate::error::Error;
use crate::metrics::RunMetrics;
use crate::model::{History, Population, UpdateRule};
use crate::network::Network;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;

/// Lifecycle of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, no step taken yet.
    Initialized,
    /// Some but not all steps taken.
    Running,
    /// All steps taken; further steps fail.
    Completed,
}

/// Simulation engine.
///
/// Owns the network, the population, the history and the random number
/// generator of a single run.
pub struct Engine {
    cfg: SimConfig,
    net: Network,
    pop: Population,
    history: History,
    rng: ChaCha12Rng,
    phase: Phase,
}

impl Engine {
    /// Create a new `Engine` with the network and initial state drawn from `cfg.seed`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] before any random draw if a parameter is invalid.
    pub fn new(cfg: SimConfig) -> Result<Self, Error> {
        cfg.validate()?;

        let net = Network::generate(cfg.n, cfg.edge_density, cfg.topology, cfg.seed)?;

        let mut rng = ChaCha12Rng::seed_from_u64(cfg.seed);
        let pop = Population::generate(cfg.n, cfg.zealot_fraction, &mut rng);
        let history = History::new(pop.opinions());

        let phase = if cfg.steps == 0 {
            Phase::Completed
        } else {
            Phase::Initialized
        };

        log::debug!(
            "initialized run with seed {} ({} agents, {} edges)",
            cfg.seed,
            net.n_nodes(),
            net.n_edges()
        );

        Ok(Self {
            cfg,
            net,
            pop,
            history,
            rng,
            phase,
        })
    }

    pub fn cfg(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn network(&self) -> &Network {
        &self.net
    }

    pub fn population(&self) -> &Population {
        &self.pop
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of steps taken so far.
    pub fn steps_done(&self) -> usize {
        self.history.len() - 1
    }

    /// Advance the simulation by one synchronous step.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] once all configured steps have been taken.
    pub fn perform_step(&mut self) -> Result<(), Error> {
        if self.phase == Phase::Completed {
            return Err(Error::InvalidState {
                steps: self.cfg.steps,
            });
        }

        let rule = UpdateRule {
            influence: self.cfg.influence,
            noise: self.cfg.noise,
            tie_rule: self.cfg.tie_rule,
        };
        let next = self.pop.next_opinions(&self.net, &rule, &mut self.rng);
        self.pop.set_opinions(next);
        self.history.record(self.pop.opinions());

        self.phase = if self.steps_done() == self.cfg.steps {
            Phase::Completed
        } else {
            Phase::Running
        };

        Ok(())
    }

    /// Take every remaining step and return the run's metrics.
    pub fn perform_simulation(&mut self) -> Result<RunMetrics, Error> {
        while self.phase != Phase::Completed {
            self.perform_step()?;
        }
        self.metrics()
    }

    /// Metrics of the completed run.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] while steps remain.
    pub fn metrics(&self) -> Result<RunMetrics, Error> {
        if self.phase != Phase::Completed {
            return Err(Error::InvalidState {
                steps: self.steps_done(),
            });
        }
        Ok(RunMetrics::from_history(&self.history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::model::TieRule;
    use crate::network::Topology;

    fn run(cfg: SimConfig) -> Engine {
        let mut engine = Engine::new(cfg).unwrap();
        engine.perform_simulation().unwrap();
        engine
    }

    #[test]
    fn same_seed_gives_identical_history() {
        for topology in [Topology::Erdos, Topology::WattsStrogatz, Topology::BarabasiAlbert] {
            let cfg = test_config(60, topology);
            let a = run(cfg.clone());
            let b = run(cfg);
            assert_eq!(a.history(), b.history());
            assert_eq!(a.metrics().unwrap(), b.metrics().unwrap());
        }
    }

    #[test]
    fn history_has_steps_plus_one_binary_snapshots() {
        for steps in [0, 1, 7, 30] {
            let mut cfg = test_config(25, Topology::Erdos);
            cfg.steps = steps;
            let engine = run(cfg);
            assert_eq!(engine.history().len(), steps + 1);
            assert!(engine.history().iter().all(|s| s.len() == 25));
            assert!(engine.history().iter().flatten().all(|&o| o <= 1));
            assert_eq!(engine.metrics().unwrap().avg_over_time.len(), steps + 1);
        }
    }

    #[test]
    fn phases_follow_the_lifecycle() {
        let mut cfg = test_config(10, Topology::Erdos);
        cfg.steps = 2;
        let mut engine = Engine::new(cfg).unwrap();
        assert_eq!(engine.phase(), Phase::Initialized);
        assert!(matches!(engine.metrics(), Err(Error::InvalidState { .. })));

        engine.perform_step().unwrap();
        assert_eq!(engine.phase(), Phase::Running);
        engine.perform_step().unwrap();
        assert_eq!(engine.phase(), Phase::Completed);

        let history = engine.history().clone();
        assert!(matches!(
            engine.perform_step(),
            Err(Error::InvalidState { steps: 2 })
        ));
        assert_eq!(engine.history(), &history);
    }

    #[test]
    fn zero_steps_is_completed_at_construction() {
        let mut cfg = test_config(10, Topology::WattsStrogatz);
        cfg.steps = 0;
        let mut engine = Engine::new(cfg).unwrap();
        assert_eq!(engine.phase(), Phase::Completed);
        assert!(engine.perform_step().is_err());
        assert_eq!(engine.metrics().unwrap().avg_over_time.len(), 1);
    }

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = test_config(10, Topology::Erdos);
        cfg.n = 0;
        assert!(matches!(Engine::new(cfg), Err(Error::Config { .. })));

        let mut cfg = test_config(10, Topology::Erdos);
        cfg.influence = 1.1;
        assert!(matches!(Engine::new(cfg), Err(Error::Config { .. })));
    }

    #[test]
    fn zealots_never_change() {
        let mut cfg = test_config(80, Topology::BarabasiAlbert);
        cfg.zealot_fraction = 0.4;
        cfg.noise = 0.3;
        cfg.steps = 40;
        let engine = run(cfg);

        let zealot = engine.population().zealot();
        assert!(zealot.iter().any(|&z| z));
        let initial = engine.history().initial();
        for snapshot in engine.history().iter() {
            for (i_agt, &is_zealot) in zealot.iter().enumerate() {
                if is_zealot {
                    assert_eq!(snapshot[i_agt], initial[i_agt]);
                }
            }
        }
    }

    #[test]
    fn no_influence_no_noise_freezes_history() {
        let mut cfg = test_config(50, Topology::Erdos);
        cfg.influence = 0.0;
        cfg.noise = 0.0;
        let engine = run(cfg);
        let initial = engine.history().initial();
        assert!(engine.history().iter().all(|s| s == initial));
    }

    #[test]
    fn full_noise_flips_every_free_connected_agent() {
        let mut cfg = test_config(40, Topology::WattsStrogatz);
        cfg.noise = 1.0;
        cfg.influence = 0.0;
        cfg.zealot_fraction = 0.25;
        cfg.steps = 6;
        let engine = run(cfg);

        let zealot = engine.population().zealot();
        let net = engine.network();
        for k in 1..engine.history().len() {
            let prev = engine.history().get(k - 1).unwrap();
            let curr = engine.history().get(k).unwrap();
            for i_agt in 0..40 {
                if zealot[i_agt] || net.degree(i_agt) == 0 {
                    assert_eq!(curr[i_agt], prev[i_agt]);
                } else {
                    assert_eq!(curr[i_agt], 1 - prev[i_agt]);
                }
            }
        }
    }

    #[test]
    fn complete_graph_adopts_majority_after_one_step() {
        let cfg = SimConfig {
            n: 10,
            edge_density: 1.0,
            influence: 1.0,
            noise: 0.0,
            zealot_fraction: 0.0,
            steps: 5,
            topology: Topology::Erdos,
            seed: 0,
            tie_rule: TieRule::HalfToEven,
        };
        let engine = run(cfg);
        assert_eq!(engine.network().n_edges(), 45);

        let initial = engine.history().initial();
        let after = engine.history().get(1).unwrap();
        let n_ones: usize = initial.iter().map(|&o| o as usize).sum();
        for i_agt in 0..10 {
            let others_ones = n_ones - initial[i_agt] as usize;
            let expected = crate::model::majority(others_ones, 9, TieRule::HalfToEven);
            assert_eq!(after[i_agt], expected);
        }
    }

    #[test]
    fn metric_bounds_hold() {
        for seed in 0..10 {
            let mut cfg = test_config(30, Topology::Erdos);
            cfg.seed = seed;
            cfg.noise = 0.1;
            let metrics = run(cfg).metrics().unwrap();
            assert!((0.0..=0.25).contains(&metrics.final_variance));
            assert!((0.0..=0.5).contains(&metrics.minority_share));
            assert_eq!(
                metrics.consensus,
                metrics.minority_share == 0.0 && metrics.final_variance == 0.0
            );
        }
    }

    #[test]
    fn dynamics_do_not_change_the_network_or_initial_state() {
        let mut a = test_config(50, Topology::WattsStrogatz);
        let mut b = a.clone();
        a.influence = 0.1;
        a.noise = 0.0;
        b.influence = 0.9;
        b.noise = 0.3;
        let a = Engine::new(a).unwrap();
        let b = Engine::new(b).unwrap();
        assert_eq!(a.network(), b.network());
        assert_eq!(a.population(), b.population());
    }
}
