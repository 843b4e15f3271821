// FLUKA output units (card/fort numbers) are routed to a score category by range
pub const DOSE_CARDS: std::ops::Range<u32> = 60..80;
pub const TRACK_CARDS: std::ops::Range<u32> = 80..100;
pub const YIELD_CARDS: std::ops::RangeInclusive<u32> = 100..=120;

/// Primary energies are tagged in eV with a 10 digit field
pub const ENERGY_TAG_DIGITS: usize = 10;
pub const ENERGY_TAG_SCALE: f64 = 1.0e6;

// Dose files are read positionally (0-indexed line numbers)
pub const DOSE_VALUE_LINE: usize = 10;
pub const DOSE_ERROR_LINE: usize = 14;

/// Tabulated energies are in GeV, datasets are in MeV
pub const FLUKA_ENERGY_SCALE: f64 = 1.0e3;
pub const FLUKA_VALUE_SCALE: f64 = 1.0e-3;
/// Relative error codeword FLUKA uses for a statistically undefined bin
pub const UNDEFINED_ERROR_TAG: f64 = 99.0;
/// Upper edges at or above this fraction of the primary energy are endpoint artifacts
pub const FLUKA_EDGE_FRACTION: f64 = 0.95;

pub const ANGLE_HALF_WIDTH_DEG: f64 = 5.0;
pub const ANGLE_MIN_DEG: f64 = 0.0;
pub const ANGLE_MAX_DEG: f64 = 180.0;

pub const SHIELDHIT_VALUE_SCALE: f64 = 10.0;
pub const SHIELDHIT_EDGE_FRACTION: f64 = 0.90;
/// Forward cone (degrees off the beam axis) subject to edge suppression
pub const SHIELDHIT_FORWARD_CONE_DEG: f64 = 4.0;

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// Byte values Windows-1252 leaves unassigned
pub const WINDOWS_1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

// Output dataset suffixes
pub const DOSE_SUFFIX: &str = "usrbin";
pub const TRACK_SUFFIX: &str = "usrtrk";
pub const YIELD_SUFFIX: &str = "usryld";
pub const CYCLE_SUFFIX: &str = "shieldhit";
pub const ISSUES_SUFFIX: &str = "issues";
