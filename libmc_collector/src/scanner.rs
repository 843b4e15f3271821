//! Line scanners for the supported detector output conventions.
//!
//! FLUKA tabulated output (`*_tab.lis`) is a sequence of detector blocks:
//!
//! ```text
//!  # Detector n:   1  PROT172Yld
//!  # N. of x1 intervals  20
//!    1.000E-03   2.000E-03   4.213E-02   12.5
//!    ...
//! ```
//!
//! Each header opens a new [`DetectorContext`], which is bound to every data row until the
//! next header. Scanning is a fold over the lines with the context as accumulator, so a file
//! never leaks state into the next one.
use regex::Regex;
use std::sync::LazyLock;

use super::constants::{ANGLE_HALF_WIDTH_DEG, DOSE_ERROR_LINE, DOSE_VALUE_LINE};
use super::error::ScanError;
use super::ledger::IssueKind;
use super::record::AngleBin;

const MIN_BLOCK_TOKENS: usize = 4; // low edge, high edge, value, relative error
const MIN_CYCLE_TOKENS: usize = 3; // energy, angle, value

static DET_HEADER_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*Detector\s+n:\s*(?P<n>\d+)\s+(?P<name>\S+)")
        .expect("detector header pattern is valid")
});

static INTERVALS_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*N\.\s*of\s*x1\s*intervals\s*(?P<nint>\d+)")
        .expect("interval count pattern is valid")
});

// Detector name styles, tried in order: "4-H50Yld", "PROT172", then anything with a number
static ANGLE_AFFIXED_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<species>.{3})(?P<center>\d+(?:\.\d+)?)(?P<score>[A-Za-z]{3})$")
        .expect("affixed angle pattern is valid")
});
static ANGLE_SUFFIXED_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]+(?P<center>\d+(?:\.\d+)?)$").expect("suffixed angle pattern is valid")
});
static NUMBER_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid"));

impl ScanError {
    pub fn issue_kind(&self) -> IssueKind {
        match self {
            Self::HeaderAngleUnresolvable(_) => IssueKind::HeaderAngleUnresolvable,
            Self::MalformedRow { .. } | Self::MissingLine(_) => IssueKind::MalformedNumericRow,
        }
    }
}

/// Which tabulated convention a block file follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockVariant {
    /// USRTRACK: headers only name the detector
    TrackLength,
    /// USRYIELD: the detector name encodes the center of its angular bin
    AngularYield,
}

/// Per-detector state derived once from a header line
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorContext {
    pub index: u32,
    pub name: String,
    pub angle: Option<AngleBin>,
}

#[derive(Debug, Clone, Default)]
enum ScanState {
    #[default]
    NoContext,
    InContext(DetectorContext),
}

/// A tabulated row, before any unit conversion or filtering
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: usize,
    pub detector: u32,
    pub angle: Option<AngleBin>,
    pub e_low: f64,
    pub e_high: f64,
    pub value: f64,
    pub error_tag: f64,
}

/// Result of scanning one file
#[derive(Debug, Clone)]
pub struct ScanOutcome<T> {
    pub rows: Vec<T>,
    pub issues: Vec<ScanError>,
    /// Data lines dropped because no detector context was active
    pub contextless: usize,
}

impl<T> Default for ScanOutcome<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            issues: Vec::new(),
            contextless: 0,
        }
    }
}

enum Line<'a> {
    Header { index: u32, name: &'a str },
    Skip,
    Data(&'a str),
}

fn classify_line(line: &str) -> Line<'_> {
    if let Some(caps) = DET_HEADER_RX.captures(line) {
        // The pattern only admits digits, so this fails only on overflow
        if let Ok(index) = caps["n"].parse() {
            if let Some(name) = caps.name("name") {
                return Line::Header {
                    index,
                    name: name.as_str(),
                };
            }
        }
    }
    let trimmed = line.trim();
    if INTERVALS_RX.is_match(line) || trimmed.is_empty() || trimmed.starts_with('#') {
        Line::Skip
    } else {
        Line::Data(trimmed)
    }
}

/// Extract the center of an angular bin from a detector name
pub fn angle_center_from_name(name: &str) -> Option<f64> {
    let name = name.trim();
    if let Some(caps) = ANGLE_AFFIXED_RX.captures(name) {
        return caps["center"].parse().ok();
    }
    if let Some(caps) = ANGLE_SUFFIXED_RX.captures(name) {
        return caps["center"].parse().ok();
    }
    NUMBER_RX
        .find_iter(name)
        .last()
        .and_then(|m| m.as_str().parse().ok())
}

impl BlockVariant {
    fn open_context(&self, index: u32, name: &str) -> Result<DetectorContext, ScanError> {
        let angle = match self {
            Self::TrackLength => None,
            Self::AngularYield => Some(
                angle_center_from_name(name)
                    .and_then(|c| AngleBin::around_center(c, ANGLE_HALF_WIDTH_DEG))
                    .ok_or_else(|| ScanError::HeaderAngleUnresolvable(name.to_string()))?,
            ),
        };
        Ok(DetectorContext {
            index,
            name: name.to_string(),
            angle,
        })
    }
}

fn parse_tokens<const N: usize>(line_number: usize, tokens: &[&str]) -> Result<[f64; N], ScanError> {
    let mut values = [0.0; N];
    for (value, token) in values.iter_mut().zip(tokens.iter()) {
        *value = token.parse().map_err(|_| ScanError::MalformedRow {
            line: line_number,
            reason: format!("could not parse '{token}' as a number"),
        })?;
    }
    Ok(values)
}

fn step(
    state: ScanState,
    line_number: usize,
    line: &str,
    variant: BlockVariant,
    outcome: &mut ScanOutcome<RawRow>,
) -> ScanState {
    match classify_line(line) {
        Line::Header { index, name } => match variant.open_context(index, name) {
            Ok(ctx) => ScanState::InContext(ctx),
            Err(e) => {
                outcome.issues.push(e);
                ScanState::NoContext
            }
        },
        Line::Skip => state,
        Line::Data(data) => {
            let tokens: Vec<&str> = data.split_whitespace().collect();
            if tokens.len() < MIN_BLOCK_TOKENS {
                return state;
            }
            let ScanState::InContext(ctx) = &state else {
                outcome.contextless += 1;
                return state;
            };
            match parse_tokens::<MIN_BLOCK_TOKENS>(line_number, &tokens) {
                Ok([e_low, e_high, value, error_tag]) => outcome.rows.push(RawRow {
                    line: line_number,
                    detector: ctx.index,
                    angle: ctx.angle,
                    e_low,
                    e_high,
                    value,
                    error_tag,
                }),
                Err(e) => {
                    log::debug!("Row rejected under detector {} ({}): {e}", ctx.index, ctx.name);
                    outcome.issues.push(e);
                }
            }
            state
        }
    }
}

/// Scan a FLUKA tabulated (USRTRACK or USRYIELD) file
pub fn scan_blocks(text: &str, variant: BlockVariant) -> ScanOutcome<RawRow> {
    let (_final_state, outcome) = text.lines().enumerate().fold(
        (ScanState::default(), ScanOutcome::default()),
        |(state, mut outcome), (idx, line)| {
            let state = step(state, idx + 1, line, variant, &mut outcome);
            (state, outcome)
        },
    );
    outcome
}

/// Read a compiled USRBIN dose file. The layout is positional: the dose is on the 11th line and
/// its relative error on the 15th; nothing else in the file is used.
pub fn scan_dose(text: &str) -> Result<(f64, f64), ScanError> {
    let read_line = |idx: usize| -> Result<f64, ScanError> {
        let line = text
            .lines()
            .nth(idx)
            .ok_or(ScanError::MissingLine(idx + 1))?;
        line.trim().parse().map_err(|_| ScanError::MalformedRow {
            line: idx + 1,
            reason: format!("could not parse '{}' as a number", line.trim()),
        })
    };
    Ok((read_line(DOSE_VALUE_LINE)?, read_line(DOSE_ERROR_LINE)?))
}

/// A SHIELD-HIT12A row: secondary energy (bin center), emission angle (bin center), yield
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRawRow {
    pub line: usize,
    pub energy: f64,
    pub angle: f64,
    pub value: f64,
}

/// Scan a convertmc `.dat` table of a single cycle
pub fn scan_cycle_rows(text: &str) -> ScanOutcome<CycleRawRow> {
    let mut outcome = ScanOutcome::default();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() < MIN_CYCLE_TOKENS {
            outcome.issues.push(ScanError::MalformedRow {
                line: idx + 1,
                reason: format!("expected {MIN_CYCLE_TOKENS} columns, found {}", tokens.len()),
            });
            continue;
        }
        match parse_tokens::<MIN_CYCLE_TOKENS>(idx + 1, &tokens) {
            Ok([energy, angle, value]) => outcome.rows.push(CycleRawRow {
                line: idx + 1,
                energy,
                angle,
                value,
            }),
            Err(e) => outcome.issues.push(e),
        }
    }
    outcome
}
