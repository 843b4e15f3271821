//! Classification of simulation output files by their names alone.
//!
//! FLUKA output is expected to have been compiled (usbsuw/ustsuw/usysuw) into files named
//!
//! ```text
//! compiled_<secondary>_<EEEEEEEEEE>_<card>.ascii      (dose, USRBIN)
//! compiled_<secondary>_<EEEEEEEEEE>_<card>_tab.lis    (USRTRACK / USRYIELD tables)
//! ```
//!
//! where the energy tag is the primary energy in eV as a 10 digit integer. SHIELD-HIT12A
//! output converted by convertmc is expected as `<E>_<secondary>[_<cycle>].dat`, with `E` in MeV.
use fxhash::FxHashMap;
use regex::Regex;
use std::sync::LazyLock;

use super::constants::{ENERGY_TAG_DIGITS, ENERGY_TAG_SCALE};
use super::error::FilenameError;
use super::record::{Category, Trial};

const FLUKA_PREFIX: &str = "compiled_";
const FLUKA_DOSE_EXT: &str = ".ascii";
const FLUKA_TABLE_EXT: &str = "_tab.lis";
const SHIELDHIT_EXT: &str = ".dat";

static FLUKA_DOSE_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^compiled_(?P<secondary>.+?)_(?P<E>\d{{{ENERGY_TAG_DIGITS}}})_(?P<N>\d+)\.ascii$"
    ))
    .expect("FLUKA dose name pattern is valid")
});

static FLUKA_TABLE_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^compiled_(?P<secondary>.+?)_(?P<E>\d{{{ENERGY_TAG_DIGITS}}})_(?P<N>\d+)_tab\.lis$"
    ))
    .expect("FLUKA table name pattern is valid")
});

static SHIELDHIT_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<E>[^_]+)_(?P<secondary>.+?)(?:_(?P<cycle>\d+))?\.dat$")
        .expect("SHIELD-HIT name pattern is valid")
});

static FLUKA_REMAP: LazyLock<FxHashMap<&'static str, &'static str>> =
    LazyLock::new(|| FxHashMap::from_iter([("4-helium", "alpha")]));

static SHIELDHIT_REMAP: LazyLock<FxHashMap<&'static str, &'static str>> = LazyLock::new(|| {
    FxHashMap::from_iter([
        ("he4", "alpha"),
        ("pro", "proton"),
        ("deu", "deuteron"),
        ("tri", "triton"),
        ("neu", "neutron"),
        ("pho", "photon"),
    ])
});

/// The naming grammar a file is expected to follow, judged from its prefix and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grammar {
    FlukaDose,
    FlukaTable,
    ShieldHit,
}

impl Grammar {
    /// Coarse (glob-like) classification used during discovery. A file accepted here may
    /// still fail to decode.
    pub fn classify(file_name: &str) -> Option<Self> {
        if file_name.starts_with(FLUKA_PREFIX) {
            if file_name.ends_with(FLUKA_TABLE_EXT) {
                return Some(Self::FlukaTable);
            } else if file_name.ends_with(FLUKA_DOSE_EXT) {
                return Some(Self::FlukaDose);
            }
        }
        if file_name.ends_with(SHIELDHIT_EXT) {
            return Some(Self::ShieldHit);
        }
        None
    }
}

/// Everything that can be learned about a file from its name
#[derive(Debug, Clone, PartialEq)]
pub struct SourceName {
    pub species: String,
    pub primary_energy: f64,
    pub category: Category,
    pub trial: Trial,
}

fn remap_species(raw: &str, table: &FxHashMap<&'static str, &'static str>) -> String {
    let lower = raw.to_lowercase();
    match table.get(lower.as_str()) {
        Some(mapped) => mapped.to_string(),
        None => lower,
    }
}

/// Decode a compiled FLUKA file name.
///
/// Returns `Ok(None)` if the card number is outside the ranges of interest for this grammar;
/// such files are excluded from ingestion and are not errors.
pub fn decode_fluka(file_name: &str, grammar: Grammar) -> Result<Option<SourceName>, FilenameError> {
    let rx = match grammar {
        Grammar::FlukaDose => &FLUKA_DOSE_RX,
        Grammar::FlukaTable => &FLUKA_TABLE_RX,
        Grammar::ShieldHit => return Err(FilenameError::NoMatch(file_name.to_string())),
    };
    let caps = rx
        .captures(file_name)
        .ok_or_else(|| FilenameError::NoMatch(file_name.to_string()))?;

    let tag = &caps["E"];
    let energy_ev: u64 = tag
        .parse()
        .map_err(|_| FilenameError::BadEnergy(file_name.to_string(), tag.to_string()))?;
    let card_str = &caps["N"];
    let card: u32 = card_str
        .parse()
        .map_err(|_| FilenameError::BadCard(file_name.to_string(), card_str.to_string()))?;

    let category = match (Category::from_card(card), grammar) {
        (Some(Category::Dose), Grammar::FlukaDose) => Category::Dose,
        (Some(c @ (Category::TrackLength | Category::AngularYield)), Grammar::FlukaTable) => c,
        _ => return Ok(None),
    };

    Ok(Some(SourceName {
        species: remap_species(&caps["secondary"], &FLUKA_REMAP),
        primary_energy: energy_ev as f64 / ENERGY_TAG_SCALE,
        category,
        trial: Trial::Untagged,
    }))
}

/// Decode a converted SHIELD-HIT12A file name. A missing cycle decodes to [`Trial::Untagged`].
pub fn decode_shieldhit(file_name: &str) -> Result<SourceName, FilenameError> {
    let caps = SHIELDHIT_RX
        .captures(file_name)
        .ok_or_else(|| FilenameError::NoMatch(file_name.to_string()))?;

    let energy_str = &caps["E"];
    let primary_energy: f64 = energy_str
        .parse()
        .ok()
        .filter(|e: &f64| e.is_finite() && *e >= 0.0)
        .ok_or_else(|| FilenameError::BadEnergy(file_name.to_string(), energy_str.to_string()))?;

    let trial = match caps.name("cycle") {
        Some(c) => Trial::Cycle(c.as_str().parse().map_err(|_| {
            FilenameError::BadCycle(file_name.to_string(), c.as_str().to_string())
        })?),
        None => Trial::Untagged,
    };

    Ok(SourceName {
        species: remap_species(&caps["secondary"], &SHIELDHIT_REMAP),
        primary_energy,
        category: Category::CycleAveraged,
        trial,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            Grammar::classify("compiled_proton_0000500000_70.ascii"),
            Some(Grammar::FlukaDose)
        );
        assert_eq!(
            Grammar::classify("compiled_proton_0000500000_85_tab.lis"),
            Some(Grammar::FlukaTable)
        );
        assert_eq!(Grammar::classify("70_pro_2.dat"), Some(Grammar::ShieldHit));
        assert_eq!(Grammar::classify("compiled_proton_0000500000_85.lis"), None);
        assert_eq!(Grammar::classify("notes.txt"), None);
    }

    #[test]
    fn test_fluka_dose_name() {
        let name = decode_fluka("compiled_proton_0000500000_70.ascii", Grammar::FlukaDose)
            .unwrap()
            .unwrap();
        assert_eq!(name.species, "proton");
        assert_eq!(name.primary_energy, 0.5);
        assert_eq!(name.category, Category::Dose);
        assert_eq!(name.trial, Trial::Untagged);
    }

    #[test]
    fn test_fluka_table_name_remaps_species() {
        let name = decode_fluka("compiled_4-HELIUM_0070000000_105_tab.lis", Grammar::FlukaTable)
            .unwrap()
            .unwrap();
        assert_eq!(name.species, "alpha");
        assert_eq!(name.primary_energy, 70.0);
        assert_eq!(name.category, Category::AngularYield);

        let name = decode_fluka("compiled_proton_0000500000_85_tab.lis", Grammar::FlukaTable)
            .unwrap()
            .unwrap();
        assert_eq!(name.category, Category::TrackLength);
    }

    #[test]
    fn test_fluka_excluded_cards() {
        assert_eq!(
            decode_fluka("compiled_proton_0000500000_21.ascii", Grammar::FlukaDose),
            Ok(None)
        );
        assert_eq!(
            decode_fluka("compiled_proton_0000500000_130_tab.lis", Grammar::FlukaTable),
            Ok(None)
        );
        // A track-length card compiled as a dose file belongs to neither extraction
        assert_eq!(
            decode_fluka("compiled_proton_0000500000_85.ascii", Grammar::FlukaDose),
            Ok(None)
        );
    }

    #[test]
    fn test_fluka_mismatch() {
        assert!(matches!(
            decode_fluka("compiled_proton_500000_70.ascii", Grammar::FlukaDose),
            Err(FilenameError::NoMatch(_))
        ));
    }

    #[test]
    fn test_decoding_is_reproducible() {
        let first = decode_fluka("compiled_neutron_0150000000_101_tab.lis", Grammar::FlukaTable);
        let second = decode_fluka("compiled_neutron_0150000000_101_tab.lis", Grammar::FlukaTable);
        assert_eq!(first, second);
    }

    #[test]
    fn test_shieldhit_names() {
        let name = decode_shieldhit("70_pro_3.dat").unwrap();
        assert_eq!(name.species, "proton");
        assert_eq!(name.primary_energy, 70.0);
        assert_eq!(name.trial, Trial::Cycle(3));
        assert_eq!(name.category, Category::CycleAveraged);

        let name = decode_shieldhit("12.5_he4.dat").unwrap();
        assert_eq!(name.species, "alpha");
        assert_eq!(name.primary_energy, 12.5);
        assert_eq!(name.trial, Trial::Untagged);

        let name = decode_shieldhit("100_carbon_12.dat").unwrap();
        assert_eq!(name.species, "carbon");
        assert_eq!(name.trial, Trial::Cycle(12));
    }

    #[test]
    fn test_shieldhit_bad_energy() {
        assert!(matches!(
            decode_shieldhit("high_pro_1.dat"),
            Err(FilenameError::BadEnergy(_, _))
        ));
        assert!(matches!(
            decode_shieldhit("nounderscore.dat"),
            Err(FilenameError::NoMatch(_))
        ));
    }
}
