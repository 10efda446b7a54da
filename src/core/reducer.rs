//! Column-wise reduction of a window into a feature vector.
//!
//! A window is a matrix with one row per sample and one column per sensor
//! axis. Each column is collapsed into a single value, e.g.
//! `[[x1, y1, z1], [x2, y2, z2]]` becomes `[min(x), min(y), min(z)]`.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use std::str::FromStr;

/// One value per configured sensor axis, in declaration order.
pub type FeatureVector = Vec<f64>;

/// Statistical reduction applied to every axis of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ReducerKind {
    Min,
    Max,
    Median,
    #[serde(rename = "stddev")]
    StdDev,
}

impl ReducerKind {
    /// Name used in configuration and training requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReducerKind::Min => "min",
            ReducerKind::Max => "max",
            ReducerKind::Median => "median",
            ReducerKind::StdDev => "stddev",
        }
    }
}

impl FromStr for ReducerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(ReducerKind::Min),
            "max" => Ok(ReducerKind::Max),
            "median" => Ok(ReducerKind::Median),
            "stddev" => Ok(ReducerKind::StdDev),
            other => Err(ConfigError::UnknownPreprocessor(other.to_string())),
        }
    }
}

impl TryFrom<String> for ReducerKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for ReducerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denominator used for the standard deviation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdDevConvention {
    /// Divide by n - 1 (unbiased estimator)
    #[default]
    Sample,
    /// Divide by n
    Population,
}

/// Errors raised for windows that cannot be reduced.
#[derive(Debug, Clone, PartialEq)]
pub enum ReduceError {
    EmptyWindow,
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl std::fmt::Display for ReduceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceError::EmptyWindow => write!(f, "cannot reduce an empty window"),
            ReduceError::RaggedRow {
                row,
                expected,
                found,
            } => write!(f, "row {row} has {found} values, expected {expected}"),
        }
    }
}

impl std::error::Error for ReduceError {}

/// Reduce a window column-wise.
pub fn reduce(
    rows: &[Vec<f64>],
    kind: ReducerKind,
    convention: StdDevConvention,
) -> Result<FeatureVector, ReduceError> {
    let columns = transpose(rows)?;
    Ok(columns
        .iter()
        .map(|column| reduce_column(column, kind, convention))
        .collect())
}

/// Turn `[[x1, y1], [x2, y2]]` into `[[x1, x2], [y1, y2]]`.
fn transpose(rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ReduceError> {
    let width = rows.first().map(Vec::len).ok_or(ReduceError::EmptyWindow)?;

    let mut columns = vec![Vec::with_capacity(rows.len()); width];
    for (index, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(ReduceError::RaggedRow {
                row: index,
                expected: width,
                found: row.len(),
            });
        }
        for (column, &value) in columns.iter_mut().zip(row) {
            column.push(value);
        }
    }

    Ok(columns)
}

fn reduce_column(column: &[f64], kind: ReducerKind, convention: StdDevConvention) -> f64 {
    match kind {
        ReducerKind::Min => Statistics::min(column.iter()),
        ReducerKind::Max => Statistics::max(column.iter()),
        ReducerKind::Median => Data::new(column.to_vec()).median(),
        ReducerKind::StdDev => match convention {
            // A single sample has no spread; statrs would yield NaN here.
            StdDevConvention::Sample if column.len() < 2 => 0.0,
            StdDevConvention::Sample => Statistics::std_dev(column.iter()),
            StdDevConvention::Population => Statistics::population_std_dev(column.iter()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 5.0, 3.0],
            vec![2.0, 1.0, 9.0],
            vec![0.0, 8.0, 8.0],
        ]
    }

    #[test]
    fn test_min_per_column() {
        let features = reduce(&window(), ReducerKind::Min, StdDevConvention::Sample).unwrap();
        assert_eq!(features, vec![0.0, 1.0, 3.0]);
    }

    #[test]
    fn test_max_per_column() {
        let features = reduce(&window(), ReducerKind::Max, StdDevConvention::Sample).unwrap();
        assert_eq!(features, vec![2.0, 8.0, 9.0]);
    }

    #[test]
    fn test_median_per_column() {
        let features = reduce(&window(), ReducerKind::Median, StdDevConvention::Sample).unwrap();
        assert_eq!(features, vec![1.0, 5.0, 8.0]);

        // Even-length columns average the two middle values.
        let rows = vec![vec![1.0], vec![4.0], vec![2.0], vec![3.0]];
        let features = reduce(&rows, ReducerKind::Median, StdDevConvention::Sample).unwrap();
        assert!((features[0] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_conventions() {
        let rows: Vec<Vec<f64>> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .map(|&v| vec![v])
            .collect();

        let population =
            reduce(&rows, ReducerKind::StdDev, StdDevConvention::Population).unwrap();
        assert!((population[0] - 2.0).abs() < 1e-9);

        let sample = reduce(&rows, ReducerKind::StdDev, StdDevConvention::Sample).unwrap();
        assert!((sample[0] - (32.0f64 / 7.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample_std_dev_is_zero() {
        let rows = vec![vec![3.0, -1.0]];
        let features = reduce(&rows, ReducerKind::StdDev, StdDevConvention::Sample).unwrap();
        assert_eq!(features, vec![0.0, 0.0]);
    }

    #[test]
    fn test_empty_and_ragged_windows() {
        assert_eq!(
            reduce(&[], ReducerKind::Min, StdDevConvention::Sample),
            Err(ReduceError::EmptyWindow)
        );

        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            reduce(&rows, ReducerKind::Max, StdDevConvention::Sample),
            Err(ReduceError::RaggedRow { row: 1, .. })
        ));
    }

    #[test]
    fn test_reducer_kind_parsing() {
        assert_eq!("stddev".parse::<ReducerKind>().unwrap(), ReducerKind::StdDev);
        assert_eq!(ReducerKind::Median.as_str(), "median");
        assert!(matches!(
            "fft".parse::<ReducerKind>(),
            Err(ConfigError::UnknownPreprocessor(_))
        ));
    }
}
