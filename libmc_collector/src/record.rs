use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Display;

use super::constants::*;

/// The extraction category of a score. Each category is persisted to its own dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Dose,
    TrackLength,
    AngularYield,
    CycleAveraged,
}

impl Category {
    /// Route a FLUKA card number to a category. Cards outside the known ranges return None
    pub fn from_card(card: u32) -> Option<Self> {
        if DOSE_CARDS.contains(&card) {
            Some(Self::Dose)
        } else if TRACK_CARDS.contains(&card) {
            Some(Self::TrackLength)
        } else if YIELD_CARDS.contains(&card) {
            Some(Self::AngularYield)
        } else {
            None
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Dose => DOSE_SUFFIX,
            Self::TrackLength => TRACK_SUFFIX,
            Self::AngularYield => YIELD_SUFFIX,
            Self::CycleAveraged => CYCLE_SUFFIX,
        }
    }

    pub fn has_energy_bins(&self) -> bool {
        !matches!(self, Self::Dose)
    }

    pub fn has_angle_bins(&self) -> bool {
        matches!(self, Self::AngularYield | Self::CycleAveraged)
    }

    pub fn value_column(&self) -> &'static str {
        match self {
            Self::Dose => "dose",
            _ => "yld",
        }
    }

    pub fn error_column(&self) -> &'static str {
        match self {
            Self::Dose => "rel_error",
            _ => "rel_err",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dose => "dose",
            Self::TrackLength => "track-length",
            Self::AngularYield => "angular-yield",
            Self::CycleAveraged => "cycle-averaged",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trial (cycle) identifier of a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Trial {
    /// No distinguishable trial
    #[default]
    Untagged,
    Cycle(u32),
}

impl Display for Trial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Untagged => write!(f, "none"),
            Self::Cycle(c) => write!(f, "{c}"),
        }
    }
}

/// Half-open energy bin [low, high)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyBin {
    pub low: f64,
    pub high: f64,
}

impl EnergyBin {
    /// Edges must be finite, non-negative, and ordered
    pub fn new(low: f64, high: f64) -> Result<Self, String> {
        if !low.is_finite() || !high.is_finite() {
            return Err(format!("non-finite energy edge [{low}, {high})"));
        }
        if low < 0.0 || high <= low {
            return Err(format!("invalid energy bin [{low}, {high})"));
        }
        Ok(Self { low, high })
    }
}

/// Emission angle bin in degrees, always within [0, 180]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleBin {
    pub low: f64,
    pub high: f64,
}

impl AngleBin {
    /// Clamp [low, high] to [0, 180]. Returns None if nothing of the bin survives.
    pub fn clamped(low: f64, high: f64) -> Option<Self> {
        if !low.is_finite() || !high.is_finite() {
            return None;
        }
        let low = low.max(ANGLE_MIN_DEG);
        let high = high.min(ANGLE_MAX_DEG);
        if low > high {
            None
        } else {
            Some(Self { low, high })
        }
    }

    pub fn around_center(center: f64, half_width: f64) -> Option<Self> {
        Self::clamped(center - half_width, center + half_width)
    }
}

/// Composite key of a physical bin: (species, primary energy, angle bin, energy bin).
///
/// Ordering compares fields in that order with missing bins sorting first, and floats by
/// their total order.
#[derive(Debug, Clone)]
pub struct BinKey {
    pub species: String,
    pub primary_energy: f64,
    pub angle: Option<AngleBin>,
    pub energy: Option<EnergyBin>,
}

fn cmp_edges(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some((a_lo, a_hi)), Some((b_lo, b_hi))) => {
            a_lo.total_cmp(&b_lo).then_with(|| a_hi.total_cmp(&b_hi))
        }
    }
}

impl Ord for BinKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.species
            .cmp(&other.species)
            .then_with(|| self.primary_energy.total_cmp(&other.primary_energy))
            .then_with(|| {
                cmp_edges(
                    self.angle.map(|a| (a.low, a.high)),
                    other.angle.map(|a| (a.low, a.high)),
                )
            })
            .then_with(|| {
                cmp_edges(
                    self.energy.map(|e| (e.low, e.high)),
                    other.energy.map(|e| (e.low, e.high)),
                )
            })
    }
}

impl PartialOrd for BinKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BinKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BinKey {}

/// A single normalized score row
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub species: String,
    pub primary_energy: f64,
    pub energy: Option<EnergyBin>,
    pub angle: Option<AngleBin>,
    pub value: f64,
    /// Relative statistical error; None when statistically undefined
    pub rel_error: Option<f64>,
    /// Number of trials combined into this row (cycle-averaged rows only)
    pub samples: Option<u32>,
    pub category: Category,
}

impl ScoreRecord {
    pub fn key(&self) -> BinKey {
        BinKey {
            species: self.species.clone(),
            primary_energy: self.primary_energy,
            angle: self.angle,
            energy: self.energy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_ranges() {
        assert_eq!(Category::from_card(59), None);
        assert_eq!(Category::from_card(60), Some(Category::Dose));
        assert_eq!(Category::from_card(79), Some(Category::Dose));
        assert_eq!(Category::from_card(80), Some(Category::TrackLength));
        assert_eq!(Category::from_card(99), Some(Category::TrackLength));
        assert_eq!(Category::from_card(100), Some(Category::AngularYield));
        assert_eq!(Category::from_card(120), Some(Category::AngularYield));
        assert_eq!(Category::from_card(121), None);
    }

    #[test]
    fn test_angle_bin_clamping() {
        let bin = AngleBin::around_center(2.0, 5.0).unwrap();
        assert_eq!(bin.low, 0.0);
        assert_eq!(bin.high, 7.0);
        let bin = AngleBin::around_center(177.5, 5.0).unwrap();
        assert_eq!(bin.low, 172.5);
        assert_eq!(bin.high, 180.0);
        assert!(AngleBin::around_center(2401.0, 5.0).is_none());
    }

    #[test]
    fn test_energy_bin_rejects_inverted() {
        assert!(EnergyBin::new(1.0, 2.0).is_ok());
        assert!(EnergyBin::new(2.0, 1.0).is_err());
        assert!(EnergyBin::new(-1.0, 1.0).is_err());
        assert!(EnergyBin::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_key_ordering() {
        let key = |species: &str, pe: f64, angle: Option<(f64, f64)>, e_lo: f64| BinKey {
            species: species.to_string(),
            primary_energy: pe,
            angle: angle.and_then(|(lo, hi)| AngleBin::clamped(lo, hi)),
            energy: Some(EnergyBin::new(e_lo, e_lo + 1.0).unwrap()),
        };
        let mut keys = vec![
            key("proton", 10.0, Some((5.0, 15.0)), 0.0),
            key("alpha", 10.0, Some((5.0, 15.0)), 3.0),
            key("proton", 10.0, Some((0.0, 5.0)), 7.0),
            key("proton", 5.0, None, 1.0),
            key("proton", 10.0, Some((0.0, 5.0)), 2.0),
        ];
        keys.sort();
        let species: Vec<_> = keys.iter().map(|k| k.species.as_str()).collect();
        assert_eq!(species, ["alpha", "proton", "proton", "proton", "proton"]);
        assert_eq!(keys[1].primary_energy, 5.0);
        assert_eq!(keys[2].energy.unwrap().low, 2.0);
        assert_eq!(keys[3].energy.unwrap().low, 7.0);
        assert_eq!(keys[4].angle.unwrap().low, 5.0);
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    }
}
