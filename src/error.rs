use std::{fmt::Debug, ops::RangeBounds};
use thiserror::Error;

/// Errors raised by the simulation engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid {name}: {reason}")]
    Config { name: &'static str, reason: String },

    /// The simulation was driven past its final step.
    #[error("simulation already completed all {steps} steps")]
    InvalidState { steps: usize },

    #[error("failed to build sampling distribution")]
    Weights(#[from] rand_distr::weighted::Error),
}

impl Error {
    pub fn config(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            name,
            reason: reason.into(),
        }
    }
}

pub fn check_num<T, R>(name: &'static str, num: T, range: R) -> Result<(), Error>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        return Err(Error::config(
            name,
            format!("number must be in the range {range:?}, but is {num:?}"),
        ));
    }
    Ok(())
}
