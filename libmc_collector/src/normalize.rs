use super::constants::*;
use super::filename::SourceName;
use super::record::{AngleBin, Category, EnergyBin, ScoreRecord};
use super::scanner::{CycleRawRow, RawRow};

/// Per-trial row of a SHIELD-HIT12A run, normalized and ready for aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRow {
    pub species: String,
    pub primary_energy: f64,
    pub angle: AngleBin,
    pub energy: EnergyBin,
    pub value: f64,
}

/// Unit rescaling and suppression of known artifacts.
///
/// Each code has its own set of edge species: secondaries whose tabulation near the kinematic
/// endpoint is unreliable. Their values there are forced to exactly zero.
#[derive(Debug, Clone)]
pub struct Normalizer {
    fluka_edge_species: Vec<String>,
    shieldhit_edge_species: Vec<String>,
    energy_bin_width: f64,
    angle_bin_width: f64,
}

/// Round half to even, matching how the relative error tags are conventionally compared
fn is_undefined_error_tag(tag: f64) -> bool {
    tag.round_ties_even() == UNDEFINED_ERROR_TAG
}

fn check_value(value: f64) -> Result<f64, String> {
    if !value.is_finite() {
        Err(format!("non-finite value {value}"))
    } else if value < 0.0 {
        Err(format!("negative value {value}"))
    } else {
        Ok(value)
    }
}

fn check_error(rel_error: f64) -> Result<f64, String> {
    if rel_error.is_finite() {
        Ok(rel_error)
    } else {
        Err(format!("non-finite relative error {rel_error}"))
    }
}

fn lowercase_all(species: &[String]) -> Vec<String> {
    species.iter().map(|s| s.to_lowercase()).collect()
}

impl Normalizer {
    /// `angle_bins` is the number of equal angular bins over [0, 180] used for the
    /// SHIELD-HIT12A scoring; the bin width is truncated to whole degrees.
    pub fn new(
        fluka_edge_species: &[String],
        shieldhit_edge_species: &[String],
        energy_bin_width: f64,
        angle_bins: u32,
    ) -> Self {
        let angle_bin_width = if angle_bins == 0 {
            ANGLE_MAX_DEG
        } else {
            (ANGLE_MAX_DEG / angle_bins as f64).trunc()
        };
        Self {
            fluka_edge_species: lowercase_all(fluka_edge_species),
            shieldhit_edge_species: lowercase_all(shieldhit_edge_species),
            energy_bin_width,
            angle_bin_width,
        }
    }

    /// Dose rows pass through unchanged
    pub fn dose(&self, source: &SourceName, dose: f64, rel_error: f64) -> Result<ScoreRecord, String> {
        Ok(ScoreRecord {
            species: source.species.clone(),
            primary_energy: source.primary_energy,
            energy: None,
            angle: None,
            value: check_value(dose)?,
            rel_error: Some(check_error(rel_error)?),
            samples: None,
            category: Category::Dose,
        })
    }

    /// Rescale and filter a tabulated (track-length or angular-yield) row
    pub fn tabulated(&self, source: &SourceName, raw: &RawRow) -> Result<ScoreRecord, String> {
        let energy = EnergyBin::new(
            raw.e_low * FLUKA_ENERGY_SCALE,
            raw.e_high * FLUKA_ENERGY_SCALE,
        )?;
        let error_tag = check_error(raw.error_tag)?;
        let near_edge = self.fluka_edge_species.contains(&source.species)
            && energy.high >= source.primary_energy * FLUKA_EDGE_FRACTION;
        let value = if is_undefined_error_tag(error_tag) || near_edge {
            0.0
        } else {
            check_value(raw.value)? * FLUKA_VALUE_SCALE
        };
        Ok(ScoreRecord {
            species: source.species.clone(),
            primary_energy: source.primary_energy,
            energy: Some(energy),
            angle: raw.angle,
            value,
            rel_error: Some(error_tag),
            samples: None,
            category: source.category,
        })
    }

    /// Bin and filter a single-cycle SHIELD-HIT12A row
    pub fn cycle(&self, source: &SourceName, raw: &CycleRawRow) -> Result<CycleRow, String> {
        let half_e = self.energy_bin_width / 2.0;
        let energy = EnergyBin::new((raw.energy - half_e).max(0.0), raw.energy + half_e)?;
        let half_a = self.angle_bin_width / 2.0;
        let angle = AngleBin::clamped(raw.angle - half_a, raw.angle + half_a)
            .ok_or_else(|| format!("angle {} is outside [0, 180]", raw.angle))?;
        let forward_edge = self.shieldhit_edge_species.contains(&source.species)
            && raw.energy >= source.primary_energy * SHIELDHIT_EDGE_FRACTION
            && raw.angle <= SHIELDHIT_FORWARD_CONE_DEG;
        let value = if forward_edge {
            0.0
        } else {
            check_value(raw.value)? * SHIELDHIT_VALUE_SCALE
        };
        Ok(CycleRow {
            species: source.species.clone(),
            primary_energy: source.primary_energy,
            angle,
            energy,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Trial;

    fn normalizer() -> Normalizer {
        Normalizer::new(
            &[String::from("aproton"), String::from("aprotons")],
            &[String::from("proton")],
            3.5,
            45,
        )
    }

    fn source(species: &str, primary_energy: f64, category: Category) -> SourceName {
        SourceName {
            species: species.to_string(),
            primary_energy,
            category,
            trial: Trial::Untagged,
        }
    }

    fn raw(e_low: f64, e_high: f64, value: f64, error_tag: f64) -> RawRow {
        RawRow {
            line: 1,
            detector: 1,
            angle: None,
            e_low,
            e_high,
            value,
            error_tag,
        }
    }

    fn cycle_raw(energy: f64, angle: f64, value: f64) -> CycleRawRow {
        CycleRawRow {
            line: 1,
            energy,
            angle,
            value,
        }
    }

    #[test]
    fn test_rescaling() {
        let norm = normalizer();
        let src = source("neutron", 100.0, Category::TrackLength);
        let rec = norm.tabulated(&src, &raw(0.001, 0.002, 4.0, 10.0)).unwrap();
        let energy = rec.energy.unwrap();
        assert!((energy.low - 1.0).abs() < 1e-12);
        assert!((energy.high - 2.0).abs() < 1e-12);
        assert!((rec.value - 4.0e-3).abs() < 1e-15);
        assert_eq!(rec.rel_error, Some(10.0));
    }

    #[test]
    fn test_undefined_error_tag_zeroes_value() {
        let norm = normalizer();
        let src = source("neutron", 100.0, Category::TrackLength);
        for tag in [99.0, 98.6, 99.4, 99.49] {
            let rec = norm.tabulated(&src, &raw(0.001, 0.002, 1.0e9, tag)).unwrap();
            assert_eq!(rec.value, 0.0, "tag {tag}");
        }
        // Ties round to even, away from 99 on both sides
        for tag in [98.5, 99.5] {
            let rec = norm.tabulated(&src, &raw(0.001, 0.002, 1.0, tag)).unwrap();
            assert!(rec.value > 0.0, "tag {tag}");
        }
    }

    #[test]
    fn test_fluka_endpoint_suppresses_antiprotons_only() {
        let norm = normalizer();
        for species in ["aproton", "aprotons"] {
            for category in [Category::AngularYield, Category::TrackLength] {
                let src = source(species, 10.0, category);
                let rec = norm.tabulated(&src, &raw(0.009, 0.0096, 2.0, 5.0)).unwrap();
                assert_eq!(rec.value, 0.0, "{species} {category}");
            }
        }
        let src = source("aproton", 10.0, Category::AngularYield);
        let rec = norm.tabulated(&src, &raw(0.008, 0.009, 2.0, 5.0)).unwrap();
        assert!(rec.value > 0.0);
        for species in ["proton", "alpha"] {
            let src = source(species, 10.0, Category::AngularYield);
            let rec = norm.tabulated(&src, &raw(0.009, 0.0096, 2.0, 5.0)).unwrap();
            assert!((rec.value - 2.0e-3).abs() < 1e-15, "{species}");
        }
    }

    #[test]
    fn test_fluka_endpoint_boundary_is_inclusive() {
        let norm = normalizer();
        let src = source("aproton", 20.0, Category::AngularYield);
        // Upper edge exactly 0.95 * 20 MeV
        let rec = norm.tabulated(&src, &raw(0.018, 0.019, 2.0, 5.0)).unwrap();
        assert_eq!(rec.energy.unwrap().high, 19.0);
        assert_eq!(rec.value, 0.0);
        let rec = norm.tabulated(&src, &raw(0.018, 0.0189, 2.0, 5.0)).unwrap();
        assert!(rec.value > 0.0);
    }

    #[test]
    fn test_bad_rows_rejected() {
        let norm = normalizer();
        let src = source("neutron", 100.0, Category::TrackLength);
        assert!(norm.tabulated(&src, &raw(0.002, 0.001, 1.0, 1.0)).is_err());
        assert!(norm.tabulated(&src, &raw(0.001, 0.002, f64::NAN, 1.0)).is_err());
        assert!(norm.tabulated(&src, &raw(0.001, 0.002, -1.0, 1.0)).is_err());
        assert!(norm.tabulated(&src, &raw(0.001, 0.002, 1.0, f64::INFINITY)).is_err());
    }

    #[test]
    fn test_dose_rejects_non_finite_error() {
        let norm = normalizer();
        let src = source("proton", 70.0, Category::Dose);
        let rec = norm.dose(&src, 1.5e-2, 3.0).unwrap();
        assert_eq!(rec.value, 1.5e-2);
        assert_eq!(rec.rel_error, Some(3.0));
        assert!(norm.dose(&src, 1.5e-2, f64::NAN).is_err());
        assert!(norm.dose(&src, 1.5e-2, f64::INFINITY).is_err());
        assert!(norm.dose(&src, f64::NAN, 3.0).is_err());
    }

    #[test]
    fn test_cycle_binning_and_suppression() {
        let norm = normalizer();
        let src = source("proton", 70.0, Category::CycleAveraged);
        let row = norm.cycle(&src, &cycle_raw(10.0, 10.0, 0.25)).unwrap();
        assert_eq!(row.energy, EnergyBin { low: 8.25, high: 11.75 });
        assert_eq!(row.angle, AngleBin { low: 8.0, high: 12.0 });
        assert_eq!(row.value, 2.5);

        let row = norm.cycle(&src, &cycle_raw(65.0, 2.0, 0.25)).unwrap();
        assert_eq!(row.value, 0.0);
        assert_eq!(row.angle.low, 0.0);

        let row = norm.cycle(&src, &cycle_raw(1.0, 6.0, 0.5)).unwrap();
        assert_eq!(row.energy.low, 0.0);
        assert_eq!(row.value, 5.0);
    }

    #[test]
    fn test_forward_cone_boundaries() {
        let norm = normalizer();
        let src = source("proton", 70.0, Category::CycleAveraged);
        // Energy exactly 0.90 * 70 MeV and angle exactly 4 degrees are both inside
        let row = norm.cycle(&src, &cycle_raw(63.0, 4.0, 0.25)).unwrap();
        assert_eq!(row.value, 0.0);
        let row = norm.cycle(&src, &cycle_raw(62.9, 4.0, 0.25)).unwrap();
        assert_eq!(row.value, 2.5);
        let row = norm.cycle(&src, &cycle_raw(63.0, 4.5, 0.25)).unwrap();
        assert_eq!(row.value, 2.5);
    }

    #[test]
    fn test_forward_cone_only_applies_to_edge_species() {
        let norm = normalizer();
        for species in ["alpha", "aproton"] {
            let src = source(species, 70.0, Category::CycleAveraged);
            let row = norm.cycle(&src, &cycle_raw(68.0, 2.0, 0.25)).unwrap();
            assert_eq!(row.value, 2.5, "{species}");
        }
    }
}
