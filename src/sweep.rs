use crate::config::{SimConfig, SweepConfig};
use crate::engine::Engine;
use crate::error::Error;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Summary of one run of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub influence: f64,
    pub noise: f64,
    pub repeat: usize,
    pub consensus: bool,
    pub final_variance: f64,
    pub minority_share: f64,
}

/// Rows of a sweep, influence outermost, then noise, then repeat.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SweepTable {
    pub rows: Vec<SweepRow>,
}

impl SweepTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Write the table as comma-separated values with a header line.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "influence,noise,repeat,consensus,final_variance,minority_share"
        )?;
        for row in &self.rows {
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                row.influence,
                row.noise,
                row.repeat,
                u8::from(row.consensus),
                row.final_variance,
                row.minority_share
            )?;
        }
        Ok(())
    }
}

/// Configuration of the run at one grid cell.
///
/// The seed depends only on the repeat index, so every (influence, noise)
/// pair of a repeat shares its network and initial state.
pub fn cell_config(base: &SimConfig, influence: f64, noise: f64, repeat: usize) -> SimConfig {
    SimConfig {
        influence,
        noise,
        seed: base.seed.wrapping_add(repeat as u64),
        ..base.clone()
    }
}

/// Run every cell of the sweep grid.
///
/// Cells run in parallel on the current rayon pool; rows come back in
/// grid order regardless of completion order.
///
/// # Errors
/// Returns [`Error::Config`] before running anything if the base
/// configuration or the grid is invalid.
pub fn run_sweep(base: &SimConfig, grid: &SweepConfig) -> Result<SweepTable, Error> {
    base.validate()?;
    grid.validate()?;

    let mut cells = Vec::with_capacity(grid.n_cells());
    for &influence in &grid.influences {
        for &noise in &grid.noises {
            for repeat in 0..grid.repeats {
                cells.push((influence, noise, repeat));
            }
        }
    }

    let rows = cells
        .into_par_iter()
        .map(|(influence, noise, repeat)| -> Result<SweepRow, Error> {
            let mut engine = Engine::new(cell_config(base, influence, noise, repeat))?;
            let metrics = engine.perform_simulation()?;
            log::debug!(
                "completed influence={influence} noise={noise} repeat={repeat} consensus={}",
                metrics.consensus
            );
            Ok(SweepRow {
                influence,
                noise,
                repeat,
                consensus: metrics.consensus,
                final_variance: metrics.final_variance,
                minority_share: metrics.minority_share,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let n_consensus = rows.iter().filter(|row| row.consensus).count();
    log::info!(
        "completed sweep of {} runs ({n_consensus} reached consensus)",
        rows.len()
    );

    Ok(SweepTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::network::Topology;

    fn grid() -> SweepConfig {
        SweepConfig {
            influences: vec![0.2, 0.6, 1.0],
            noises: vec![0.0, 0.05],
            repeats: 3,
        }
    }

    #[test]
    fn table_has_one_row_per_cell_in_grid_order() {
        let base = test_config(30, Topology::WattsStrogatz);
        let grid = grid();
        let table = run_sweep(&base, &grid).unwrap();
        assert_eq!(table.len(), 3 * 2 * 3);

        let mut rows = table.rows.iter();
        for &influence in &grid.influences {
            for &noise in &grid.noises {
                for repeat in 0..grid.repeats {
                    let row = rows.next().unwrap();
                    assert_eq!(
                        (row.influence, row.noise, row.repeat),
                        (influence, noise, repeat)
                    );
                }
            }
        }
    }

    #[test]
    fn rows_match_individual_runs() {
        let base = test_config(30, Topology::Erdos);
        let table = run_sweep(&base, &grid()).unwrap();
        for row in &table.rows {
            let cfg = cell_config(&base, row.influence, row.noise, row.repeat);
            let metrics = Engine::new(cfg).unwrap().perform_simulation().unwrap();
            assert_eq!(row.consensus, metrics.consensus);
            assert_eq!(row.final_variance, metrics.final_variance);
            assert_eq!(row.minority_share, metrics.minority_share);
        }
    }

    #[test]
    fn single_thread_pool_gives_same_table() {
        let base = test_config(40, Topology::BarabasiAlbert);
        let parallel = run_sweep(&base, &grid()).unwrap();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let sequential = pool.install(|| run_sweep(&base, &grid())).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn repeat_index_fixes_network_and_initial_state() {
        let base = test_config(50, Topology::WattsStrogatz);
        for repeat in 0..3 {
            let a = Engine::new(cell_config(&base, 0.2, 0.0, repeat)).unwrap();
            let b = Engine::new(cell_config(&base, 1.0, 0.1, repeat)).unwrap();
            assert_eq!(a.cfg().seed, base.seed + repeat as u64);
            assert_eq!(a.network(), b.network());
            assert_eq!(a.history().initial(), b.history().initial());
            assert_eq!(a.population().zealot(), b.population().zealot());
        }
    }

    #[test]
    fn rejects_invalid_grid() {
        let base = test_config(10, Topology::Erdos);
        let mut bad = grid();
        bad.repeats = 0;
        assert!(matches!(run_sweep(&base, &bad), Err(Error::Config { .. })));

        let mut bad = grid();
        bad.influences.push(1.5);
        assert!(matches!(run_sweep(&base, &bad), Err(Error::Config { .. })));
    }

    #[test]
    fn csv_layout() {
        let table = SweepTable {
            rows: vec![SweepRow {
                influence: 0.5,
                noise: 0.1,
                repeat: 2,
                consensus: true,
                final_variance: 0.0,
                minority_share: 0.0,
            }],
        };
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "influence,noise,repeat,consensus,final_variance,minority_share\n0.5,0.1,2,1,0,0\n"
        );
    }
}
