use std::collections::BTreeMap;

use super::normalize::CycleRow;
use super::record::{BinKey, Category, ScoreRecord};

/// Statistics of one physical bin over all the trials it was observed in
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedBin {
    pub key: BinKey,
    pub mean: f64,
    /// SEM / |mean|. None for a single trial: one trial cannot estimate its own spread,
    /// which is different from a spread of zero.
    pub rel_error: Option<f64>,
    pub samples: u32,
}

impl AggregatedBin {
    /// Compute the statistics of a group of observations. Returns None for an empty group.
    pub fn from_observations(key: BinKey, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let rel_error = if values.len() > 1 {
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            let sem = variance.sqrt() / n.sqrt();
            let rel = sem / mean.abs();
            // All-zero bins give 0/0
            rel.is_finite().then_some(rel)
        } else {
            None
        };
        Some(Self {
            key,
            mean,
            rel_error,
            samples: values.len() as u32,
        })
    }

    pub fn into_record(self) -> ScoreRecord {
        ScoreRecord {
            species: self.key.species,
            primary_energy: self.key.primary_energy,
            energy: self.key.energy,
            angle: self.key.angle,
            value: self.mean,
            rel_error: self.rel_error,
            samples: Some(self.samples),
            category: Category::CycleAveraged,
        }
    }
}

/// Combine per-trial rows into per-bin statistics, sorted by bin key.
///
/// Trials are never concatenated: each row is one observation of its bin.
pub fn aggregate_cycles(rows: Vec<CycleRow>) -> Vec<AggregatedBin> {
    let mut groups: BTreeMap<BinKey, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let key = BinKey {
            species: row.species,
            primary_energy: row.primary_energy,
            angle: Some(row.angle),
            energy: Some(row.energy),
        };
        groups.entry(key).or_default().push(row.value);
    }
    groups
        .into_iter()
        .filter_map(|(key, values)| AggregatedBin::from_observations(key, &values))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AngleBin, EnergyBin};

    fn row(species: &str, angle_lo: f64, e_lo: f64, value: f64) -> CycleRow {
        CycleRow {
            species: species.to_string(),
            primary_energy: 70.0,
            angle: AngleBin {
                low: angle_lo,
                high: angle_lo + 4.0,
            },
            energy: EnergyBin {
                low: e_lo,
                high: e_lo + 3.5,
            },
            value,
        }
    }

    #[test]
    fn test_single_trial_is_undefined() {
        let bins = aggregate_cycles(vec![row("proton", 0.0, 0.0, 2.0)]);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].mean, 2.0);
        assert_eq!(bins[0].samples, 1);
        assert_eq!(bins[0].rel_error, None);
    }

    #[test]
    fn test_two_trials() {
        let (a, b) = (2.0, 4.0);
        let bins = aggregate_cycles(vec![row("proton", 0.0, 0.0, a), row("proton", 0.0, 0.0, b)]);
        assert_eq!(bins.len(), 1);
        let bin = &bins[0];
        assert_eq!(bin.samples, 2);
        assert_eq!(bin.mean, (a + b) / 2.0);
        let mean = (a + b) / 2.0;
        let std = (((a - mean).powi(2) + (b - mean).powi(2)) / 1.0).sqrt();
        let expected = std / 2.0_f64.sqrt() / mean.abs();
        assert!((bin.rel_error.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_bins_have_undefined_error() {
        let bins = aggregate_cycles(vec![row("proton", 0.0, 0.0, 0.0), row("proton", 0.0, 0.0, 0.0)]);
        assert_eq!(bins[0].mean, 0.0);
        assert_eq!(bins[0].rel_error, None);
    }

    #[test]
    fn test_groups_are_sorted_and_distinct() {
        let bins = aggregate_cycles(vec![
            row("proton", 4.0, 0.0, 1.0),
            row("alpha", 0.0, 3.5, 1.0),
            row("proton", 0.0, 3.5, 1.0),
            row("proton", 0.0, 0.0, 1.0),
            row("proton", 4.0, 0.0, 3.0),
        ]);
        assert_eq!(bins.len(), 4);
        assert!(bins.windows(2).all(|w| w[0].key < w[1].key));
        assert_eq!(bins[0].key.species, "alpha");
        let last = bins.last().unwrap();
        assert_eq!(last.samples, 2);
        assert_eq!(last.mean, 2.0);

        let record = last.clone().into_record();
        assert_eq!(record.category, Category::CycleAveraged);
        assert_eq!(record.samples, Some(2));
    }
}
