use crate::analysis::{Heatmap, Metric};
use crate::config::{Config, SimConfig};
use crate::engine::Engine;
use crate::model::History;
use crate::sweep::run_sweep;
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::encode;
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Output patterns removed by [`Manager::clean_outputs`].
const OUTPUT_PATTERNS: [&str; 4] = [
    "metrics.json",
    "trajectory.msgpack",
    "sweep.csv",
    "heatmap-*.tsv",
];

/// Full record of a single run, written in MessagePack.
#[derive(Serialize)]
struct Trajectory<'a> {
    cfg: &'a SimConfig,
    edges: Vec<(usize, usize)>,
    zealot: &'a [bool],
    history: &'a History,
}

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Run one simulation and save its metrics and trajectory.
    pub fn run_single(&self, seed: Option<u64>) -> Result<()> {
        let mut sim_cfg = self.cfg.sim.clone();
        if let Some(seed) = seed {
            sim_cfg.seed = seed;
        }

        let mut engine = Engine::new(sim_cfg).context("failed to initialize engine")?;
        let metrics = engine
            .perform_simulation()
            .context("failed to perform simulation")?;
        log::info!(
            "consensus: {}, final mean: {}, minority share: {}",
            metrics.consensus,
            metrics.final_mean(),
            metrics.minority_share
        );

        let metrics_file = self.sim_dir.join("metrics.json");
        let writer = create_writer(&metrics_file)?;
        serde_json::to_writer_pretty(writer, &metrics)
            .with_context(|| format!("failed to write {metrics_file:?}"))?;

        let trajectory = Trajectory {
            cfg: engine.cfg(),
            edges: engine.network().edges(),
            zealot: engine.population().zealot(),
            history: engine.history(),
        };
        let trajectory_file = self.sim_dir.join("trajectory.msgpack");
        let mut writer = create_writer(&trajectory_file)?;
        encode::write(&mut writer, &trajectory).context("failed to serialize trajectory")?;
        writer.flush().context("failed to flush writer stream")?;

        log::info!("saved {metrics_file:?} and {trajectory_file:?}");
        Ok(())
    }

    /// Run the configured sweep and save the table and its heatmaps.
    pub fn run_sweep(&self, jobs: Option<usize>) -> Result<()> {
        let grid = self
            .cfg
            .sweep
            .as_ref()
            .context("config has no [sweep] table")?;
        log::info!("running {} simulations", grid.n_cells());

        let table = match jobs {
            Some(jobs) => rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .context("failed to build thread pool")?
                .install(|| run_sweep(&self.cfg.sim, grid)),
            None => run_sweep(&self.cfg.sim, grid),
        }
        .context("failed to run sweep")?;

        let sweep_file = self.sim_dir.join("sweep.csv");
        let mut writer = create_writer(&sweep_file)?;
        table
            .write_csv(&mut writer)
            .and_then(|()| writer.flush())
            .with_context(|| format!("failed to write {sweep_file:?}"))?;
        log::info!("saved {} rows to {sweep_file:?}", table.len());

        for metric in Metric::ALL {
            let heatmap = Heatmap::from_table(&table, metric);
            let heatmap_file = self.sim_dir.join(format!("heatmap-{}.tsv", metric.name()));
            let mut writer = create_writer(&heatmap_file)?;
            heatmap
                .write_tsv(&mut writer)
                .and_then(|()| writer.flush())
                .with_context(|| format!("failed to write {heatmap_file:?}"))?;
        }

        Ok(())
    }

    /// Remove every output file from the simulation directory.
    pub fn clean_outputs(&self) -> Result<()> {
        for pattern in OUTPUT_PATTERNS {
            let pattern = self.sim_dir.join(pattern);
            let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
            for file in glob(pattern).context("failed to glob output files")? {
                let file = file.context("failed to read glob entry")?;
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }
        Ok(())
    }
}

fn create_writer(file: &Path) -> Result<BufWriter<File>> {
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    Ok(BufWriter::new(file))
}
