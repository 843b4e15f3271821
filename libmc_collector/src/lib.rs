//! # mc_collector
//!
//! mc_collector gathers the ASCII output of FLUKA and SHIELD-HIT12A simulation campaigns
//! and converts it into normalized, sorted Parquet datasets keyed by physical coordinates
//! (secondary species, primary beam energy, emission angle bin, energy bin). Repeated
//! SHIELD-HIT12A cycles are combined into per-bin statistics.
//!
//! ## Installation
//!
//! The only method of install is from source. If you have not used Rust before, see the
//! [Rust docs](https://www.rust-lang.org/tools/install) for installing the tool chain.
//!
//! To build and install the CLI use `cargo install --path ./mc_collector_cli` from the top
//! level mc_collector repository. Arrow and Parquet are pure Rust, so no system libraries
//! are needed.
//!
//! ## Input
//!
//! The data directory is searched recursively. Files are recognized by name only:
//!
//! - `compiled_<secondary>_<EEEEEEEEEE>_<card>.ascii`: FLUKA USRBIN dose, card 60-79
//! - `compiled_<secondary>_<EEEEEEEEEE>_<card>_tab.lis`: FLUKA USRTRACK (card 80-99) or
//! USRYIELD (card 100-120) tables
//! - `<E>_<secondary>[_<cycle>].dat`: SHIELD-HIT12A tables converted by convertmc
//!
//! FLUKA energy tags are in eV, SHIELD-HIT12A energies in MeV. Any file may be gzip
//! compressed; compression is detected from the file contents, not its name.
//!
//! ## Configuration
//!
//! A template configuration can be made with `mc_collector_cli new -p config.yml`. The YAML
//! format of a configuration file is as follows:
//!
//! ```yml
//! data_path: /data/campaign
//! output_path: /data/campaign/parquet
//! run_name: po16
//! collect_fluka: true
//! collect_shieldhit: false
//! fluka_edge_species:
//! - aproton
//! - aprotons
//! shieldhit_edge_species:
//! - proton
//! energy_bin_width: 3.5
//! angle_bins: 45
//! text_codecs:
//! - utf8_sig
//! - windows1252
//! - lossy_utf8
//! write_issue_report: true
//! ```
//!
//! The edge species are the secondaries whose values near the kinematic endpoint are forced
//! to zero: FLUKA rows with an upper energy edge at or above 95% of the primary energy, and
//! SHIELD-HIT12A rows at or above 90% of it within 4 degrees of the beam axis.
//! `energy_bin_width` and `angle_bins` describe the SHIELD-HIT12A scoring mesh. Text codecs
//! are tried in order; `lossy_utf8` never fails but every file it decodes is reported.
//!
//! ## Output
//!
//! One Parquet file per extraction category is written to `output_path`, replacing any
//! previous file of the same name:
//!
//! ```text
//! <run_name>_usrbin.parquet     secondary, primary_energy, dose, rel_error
//! <run_name>_usrtrk.parquet     secondary, primary_energy, E_low, E_high, yld, rel_err
//! <run_name>_usryld.parquet     secondary, primary_energy, angle_lower_deg, angle_upper_deg, E_low, E_high, yld, rel_err
//! <run_name>_shieldhit.parquet  (as usryld), n_cycles
//! <run_name>_issues.yml
//! ```
//!
//! Energies are in MeV and angles in degrees. Rows are sorted by their key columns. Files
//! or rows that could not be used never stop a run; they are collected in the issue report
//! and printed at the end.
pub mod aggregate;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod discovery;
pub mod error;
pub mod filename;
pub mod ledger;
pub mod let_calc;
pub mod normalize;
pub mod process;
pub mod record;
pub mod scanner;
pub mod text;
pub mod worker_status;
