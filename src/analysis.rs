//! Pivoting sweep tables into heatmap grids.

use crate::stats::{Accumulator, AccumulatorReport};
use crate::sweep::{SweepRow, SweepTable};
use std::io::{self, Write};

/// Per-run quantity that can be pivoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Consensus,
    FinalVariance,
    MinorityShare,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::Consensus,
        Metric::FinalVariance,
        Metric::MinorityShare,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Consensus => "consensus",
            Metric::FinalVariance => "final_variance",
            Metric::MinorityShare => "minority_share",
        }
    }

    fn value(self, row: &SweepRow) -> f64 {
        match self {
            Metric::Consensus => f64::from(u8::from(row.consensus)),
            Metric::FinalVariance => row.final_variance,
            Metric::MinorityShare => row.minority_share,
        }
    }
}

/// A metric averaged over repeats, noise along rows and influence along columns.
#[derive(Debug, Clone)]
pub struct Heatmap {
    pub metric: Metric,
    /// Column labels, ascending.
    pub influences: Vec<f64>,
    /// Row labels, ascending.
    pub noises: Vec<f64>,
    /// `cells[i_noise][i_influence]`.
    pub cells: Vec<Vec<AccumulatorReport>>,
}

impl Heatmap {
    pub fn from_table(table: &SweepTable, metric: Metric) -> Self {
        let influences = sorted_unique(table.rows.iter().map(|row| row.influence));
        let noises = sorted_unique(table.rows.iter().map(|row| row.noise));

        let mut accs = vec![vec![Accumulator::new(); influences.len()]; noises.len()];
        for row in &table.rows {
            let i_noise = position(&noises, row.noise);
            let i_influence = position(&influences, row.influence);
            accs[i_noise][i_influence].add(metric.value(row));
        }

        let cells = accs
            .iter()
            .map(|acc_row| acc_row.iter().map(Accumulator::report).collect())
            .collect();

        Self {
            metric,
            influences,
            noises,
            cells,
        }
    }

    /// Write the mean grid followed by the standard deviation grid, tab separated.
    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.write_grid(writer, "mean", |report| report.mean)?;
        writeln!(writer)?;
        self.write_grid(writer, "std_dev", |report| report.std_dev)
    }

    fn write_grid<W, F>(&self, writer: &mut W, label: &str, field: F) -> io::Result<()>
    where
        W: Write,
        F: Fn(&AccumulatorReport) -> f64,
    {
        writeln!(writer, "#{} {label}", self.metric.name())?;
        write!(writer, "noise\\influence")?;
        for influence in &self.influences {
            write!(writer, "\t{influence:.2}")?;
        }
        writeln!(writer)?;

        for (noise, cell_row) in self.noises.iter().zip(&self.cells) {
            write!(writer, "{noise:.2}")?;
            for report in cell_row {
                write!(writer, "\t{:.6}", field(report))?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

fn sorted_unique(vals: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut vals: Vec<f64> = vals.collect();
    vals.sort_by(f64::total_cmp);
    vals.dedup_by(|a, b| a.total_cmp(b).is_eq());
    vals
}

fn position(vals: &[f64], val: f64) -> usize {
    vals.binary_search_by(|probe| probe.total_cmp(&val))
        .unwrap_or_else(|idx| idx)
}
