//! Dose-averaged LET from a dose dataset and a track-length dataset.
//!
//! For every (secondary, primary energy) present in both datasets:
//!
//! ```text
//! E_dep = dose * V          (MeV)
//! L     = sum(yld) * V      (cm)
//! S     = E_dep / L         (MeV/cm)
//! LET   = S / rho           (MeV cm^2/g)
//! ```
//!
//! A pair with no track length has all of S and LET set to zero.
use std::collections::BTreeMap;

use super::dataset::Dataset;
use super::error::LetError;
use super::record::{Category, ScoreRecord};

/// Detector volume of the reference setup, (0.5e-3)^2 * 1e2 cm^3
pub const DEFAULT_VOLUME: f64 = 2.5e-5;
/// Detector density in g/cm^3
pub const DEFAULT_DENSITY: f64 = 1.4;

#[derive(Debug, Clone, PartialEq)]
pub struct LetParams {
    pub primary_energy: f64,
    /// Absolute tolerance on the primary energy. Zero requires an exact match.
    pub tolerance: f64,
    pub volume: f64,
    pub density: f64,
}

impl LetParams {
    pub fn new(primary_energy: f64) -> Self {
        Self {
            primary_energy,
            tolerance: 0.0,
            volume: DEFAULT_VOLUME,
            density: DEFAULT_DENSITY,
        }
    }

    fn selects(&self, energy: f64) -> bool {
        if self.tolerance > 0.0 {
            (energy - self.primary_energy).abs() <= self.tolerance
        } else {
            energy == self.primary_energy
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetResult {
    pub species: String,
    pub primary_energy: f64,
    pub energy_deposited: f64,
    pub track_length: f64,
    pub stopping_power: f64,
    pub let_value: f64,
}

fn check_category(dataset: &Dataset, expected: Category) -> Result<(), LetError> {
    if dataset.category() != expected {
        return Err(LetError::WrongCategory {
            expected: expected.as_str(),
            found: dataset.category().as_str(),
        });
    }
    Ok(())
}

// (species, primary energy bits) keeps float keys orderable without rounding them
type GroupKey = (String, u64);

fn group<'a>(dataset: &'a Dataset, params: &LetParams) -> BTreeMap<GroupKey, Vec<&'a ScoreRecord>> {
    let mut groups: BTreeMap<GroupKey, Vec<&ScoreRecord>> = BTreeMap::new();
    for row in dataset.rows().iter().filter(|r| params.selects(r.primary_energy)) {
        groups
            .entry((row.species.clone(), row.primary_energy.to_bits()))
            .or_default()
            .push(row);
    }
    groups
}

/// Compute the dose-averaged LET of every secondary scored in both datasets at the selected
/// primary energy. Results are ordered by secondary then primary energy.
pub fn dose_averaged_let(
    dose: &Dataset,
    track: &Dataset,
    params: &LetParams,
) -> Result<Vec<LetResult>, LetError> {
    check_category(dose, Category::Dose)?;
    check_category(track, Category::TrackLength)?;

    let dose_groups = group(dose, params);
    let track_groups = group(track, params);
    if dose_groups.is_empty() || track_groups.is_empty() {
        return Err(LetError::EmptySelection(
            params.primary_energy,
            params.tolerance,
        ));
    }

    let mut results = Vec::new();
    for (key, dose_rows) in dose_groups.iter() {
        let Some(track_rows) = track_groups.get(key) else {
            log::debug!("No track-length rows for {}; skipping", key.0);
            continue;
        };
        let Some(first) = dose_rows.first() else {
            continue;
        };
        if dose_rows.len() > 1 {
            log::warn!(
                "{} dose rows for {} at {} MeV; using the first",
                dose_rows.len(),
                first.species,
                first.primary_energy
            );
        }

        let energy_deposited = first.value * params.volume;
        let track_length = track_rows.iter().map(|r| r.value).sum::<f64>() * params.volume;
        let (stopping_power, let_value) = if track_length != 0.0 {
            let s = energy_deposited / track_length;
            (s, s / params.density)
        } else {
            (0.0, 0.0)
        };

        log::info!(
            "{}MeV,{}: E_dep:{:<10e}MeV, L_p:{:<10e}cm, LET_p:{:<10e}",
            first.primary_energy,
            first.species,
            energy_deposited,
            track_length,
            let_value
        );
        results.push(LetResult {
            species: first.species.clone(),
            primary_energy: first.primary_energy,
            energy_deposited,
            track_length,
            stopping_power,
            let_value,
        });
    }
    Ok(results)
}
