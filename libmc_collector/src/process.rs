use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc::Sender;

use super::aggregate::aggregate_cycles;
use super::config::Config;
use super::dataset::Dataset;
use super::discovery::{DiscoveredFile, Inventory};
use super::error::ProcessorError;
use super::filename::{decode_fluka, decode_shieldhit, Grammar, SourceName};
use super::ledger::{ErrorLedger, IssueKind};
use super::normalize::{CycleRow, Normalizer};
use super::record::{Category, ScoreRecord};
use super::scanner::{scan_blocks, scan_cycle_rows, scan_dose, BlockVariant};
use super::text::{read_text, TextCodec};
use super::worker_status::{Stage, WorkerStatus};

/// What a run produced
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub files_seen: usize,
    pub rows: BTreeMap<Category, usize>,
    pub outputs: Vec<PathBuf>,
    pub ledger: ErrorLedger,
}

impl RunSummary {
    pub fn total_rows(&self) -> usize {
        self.rows.values().sum()
    }
}

/// Accumulates the rows of every ingested file. Nothing here survives from one file's
/// parse to the next except finished rows and ledger entries.
struct Collector<'a> {
    normalizer: Normalizer,
    codecs: &'a [TextCodec],
    ledger: ErrorLedger,
    records: Vec<ScoreRecord>,
    cycles: Vec<CycleRow>,
}

impl<'a> Collector<'a> {
    fn new(config: &'a Config) -> Self {
        Self {
            normalizer: Normalizer::new(
                &config.fluka_edge_species,
                &config.shieldhit_edge_species,
                config.energy_bin_width,
                config.angle_bins,
            ),
            codecs: &config.text_codecs,
            ledger: ErrorLedger::new(),
            records: Vec::new(),
            cycles: Vec::new(),
        }
    }

    fn decode_name(&mut self, file: &DiscoveredFile) -> Option<SourceName> {
        let decoded = match file.grammar {
            Grammar::FlukaDose | Grammar::FlukaTable => decode_fluka(&file.file_name, file.grammar),
            Grammar::ShieldHit => decode_shieldhit(&file.file_name).map(Some),
        };
        match decoded {
            Ok(Some(source)) => Some(source),
            Ok(None) => {
                log::debug!("{} is not an extracted card; skipping", file.file_name);
                None
            }
            Err(e) => {
                self.ledger
                    .record(&file.file_name, IssueKind::NamingGrammarMismatch, e.to_string());
                None
            }
        }
    }

    fn ingest(&mut self, file: &DiscoveredFile) {
        let Some(source) = self.decode_name(file) else {
            return;
        };
        let decoded = match read_text(&file.path, self.codecs) {
            Ok(d) => d,
            Err(e) => {
                self.ledger
                    .record(&file.file_name, IssueKind::EncodingFailure, e.to_string());
                return;
            }
        };
        if decoded.is_lossy() {
            self.ledger.record(
                &file.file_name,
                IssueKind::EncodingFailure,
                format!("no strict codec matched; decoded with {:?}", decoded.codec),
            );
        }
        log::debug!(
            "{}: {} {} MeV trial {} ({:?}, {:?})",
            file.file_name,
            source.species,
            source.primary_energy,
            source.trial,
            decoded.compression,
            decoded.codec
        );

        match source.category {
            Category::Dose => self.ingest_dose(file, &source, &decoded.text),
            Category::TrackLength => {
                self.ingest_blocks(file, &source, &decoded.text, BlockVariant::TrackLength)
            }
            Category::AngularYield => {
                self.ingest_blocks(file, &source, &decoded.text, BlockVariant::AngularYield)
            }
            Category::CycleAveraged => self.ingest_cycle(file, &source, &decoded.text),
        }
    }

    fn ingest_dose(&mut self, file: &DiscoveredFile, source: &SourceName, text: &str) {
        let record = scan_dose(text)
            .map_err(|e| (e.issue_kind(), e.to_string()))
            .and_then(|(dose, rel_error)| {
                self.normalizer
                    .dose(source, dose, rel_error)
                    .map_err(|reason| (IssueKind::MalformedNumericRow, reason))
            });
        match record {
            Ok(record) => self.records.push(record),
            Err((kind, reason)) => self.ledger.record(&file.file_name, kind, reason),
        }
    }

    fn ingest_blocks(
        &mut self,
        file: &DiscoveredFile,
        source: &SourceName,
        text: &str,
        variant: BlockVariant,
    ) {
        let outcome = scan_blocks(text, variant);
        if outcome.contextless > 0 {
            log::debug!(
                "{}: dropped {} data lines outside any detector block",
                file.file_name,
                outcome.contextless
            );
        }
        for issue in outcome.issues {
            self.ledger
                .record(&file.file_name, issue.issue_kind(), issue.to_string());
        }
        for raw in outcome.rows.iter() {
            match self.normalizer.tabulated(source, raw) {
                Ok(record) => self.records.push(record),
                Err(reason) => self.ledger.record(
                    &file.file_name,
                    IssueKind::MalformedNumericRow,
                    format!("line {}: {reason}", raw.line),
                ),
            }
        }
    }

    fn ingest_cycle(&mut self, file: &DiscoveredFile, source: &SourceName, text: &str) {
        let outcome = scan_cycle_rows(text);
        for issue in outcome.issues {
            self.ledger
                .record(&file.file_name, issue.issue_kind(), issue.to_string());
        }
        for raw in outcome.rows.iter() {
            match self.normalizer.cycle(source, raw) {
                Ok(row) => self.cycles.push(row),
                Err(reason) => self.ledger.record(
                    &file.file_name,
                    IssueKind::MalformedNumericRow,
                    format!("line {}: {reason}", raw.line),
                ),
            }
        }
    }

    /// Build the dataset of a category from everything collected
    fn dataset(&self, category: Category) -> Dataset {
        match category {
            Category::CycleAveraged => Dataset::assemble(
                category,
                aggregate_cycles(self.cycles.clone())
                    .into_iter()
                    .map(|bin| bin.into_record())
                    .collect(),
            ),
            _ => Dataset::assemble(category, self.records.clone()),
        }
    }
}

fn wanted_grammar(config: &Config, grammar: Grammar) -> bool {
    match grammar {
        Grammar::FlukaDose | Grammar::FlukaTable => config.collect_fluka,
        Grammar::ShieldHit => config.collect_shieldhit,
    }
}

/// The main loop of mc_collector.
///
/// Discovers, decodes and parses every output file under the data directory, then writes one
/// dataset per extraction category. Per-file and per-row failures are recorded in the
/// ledger of the returned summary; the run only fails if nothing at all was extracted.
pub fn process_run(config: &Config, tx: &Sender<WorkerStatus>) -> Result<RunSummary, ProcessorError> {
    config.validate()?;
    let data_path = config.get_data_directory()?;
    let inventory = Inventory::discover(data_path, |g| wanted_grammar(config, g))?;
    log::info!(
        "Found {} FLUKA dose, {} FLUKA table and {} SHIELD-HIT12A files with total size: {}",
        inventory.count(Grammar::FlukaDose),
        inventory.count(Grammar::FlukaTable),
        inventory.count(Grammar::ShieldHit),
        human_bytes::human_bytes(inventory.get_total_data_size() as f64)
    );
    if inventory.skipped() > 0 {
        log::warn!(
            "{} directory entries could not be read and were skipped",
            inventory.skipped()
        );
    }

    let mut collector = Collector::new(config);
    let total = inventory.len();
    tx.send(WorkerStatus::new(Stage::Ingesting, 0, total))?;
    for (idx, file) in inventory.files().iter().enumerate() {
        collector.ingest(file);
        tx.send(WorkerStatus::new(Stage::Ingesting, idx + 1, total))?;
    }
    log::info!("Done ingesting files.");

    std::fs::create_dir_all(&config.output_path)?;
    let mut summary = RunSummary {
        files_seen: total,
        ..Default::default()
    };
    let categories = config.categories();
    tx.send(WorkerStatus::new(Stage::Writing, 0, categories.len()))?;
    for (idx, category) in categories.iter().enumerate() {
        let dataset = collector.dataset(*category);
        let path = config.get_dataset_path(*category);
        if dataset.is_empty() {
            log::warn!("No {category} rows were extracted; skipping its dataset.");
            // A dataset from an earlier run must not outlive this one
            match std::fs::remove_file(&path) {
                Ok(()) => log::info!("Removed stale dataset {}", path.to_string_lossy()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
                Err(e) => return Err(e.into()),
            }
        } else {
            dataset.write_parquet(&path)?;
            log::info!(
                "Wrote {} {category} rows to {}",
                dataset.len(),
                path.to_string_lossy()
            );
            log::info!(
                "    secondaries: {:?}",
                dataset.species().into_iter().collect::<Vec<_>>()
            );
            log::info!("    primary energies: {:?}", dataset.primary_energies());
            let duplicates = dataset.duplicate_keys();
            if duplicates > 0 {
                log::warn!("    {duplicates} rows repeat the key of the previous row");
            }
            summary.rows.insert(*category, dataset.len());
            summary.outputs.push(path);
        }
        tx.send(WorkerStatus::new(Stage::Writing, idx + 1, categories.len()))?;
    }

    collector.ledger.report();
    if config.write_issue_report {
        let issues_path = config.get_issues_path();
        collector.ledger.write_yaml(&issues_path)?;
        summary.outputs.push(issues_path);
    }
    summary.ledger = collector.ledger;

    if summary.total_rows() == 0 {
        return Err(ProcessorError::EmptyResultSet);
    }
    Ok(summary)
}

/// The function to be called by a separate thread (typically the UI).
pub fn process(config: Config, tx: Sender<WorkerStatus>) -> Result<RunSummary, ProcessorError> {
    log::info!("Processing {}...", config.data_path.to_string_lossy());
    let summary = process_run(&config, &tx)?;
    log::info!(
        "Finished processing {}: {} rows from {} files.",
        config.run_name,
        summary.total_rows(),
        summary.files_seen
    );
    Ok(summary)
}
