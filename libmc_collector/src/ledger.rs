use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;

use super::error::ProcessorError;

/// The kinds of recoverable failures the pipeline records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NamingGrammarMismatch,
    EncodingFailure,
    HeaderAngleUnresolvable,
    MalformedNumericRow,
}

impl Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NamingGrammarMismatch => "naming grammar mismatch",
            Self::EncodingFailure => "encoding failure",
            Self::HeaderAngleUnresolvable => "header angle unresolvable",
            Self::MalformedNumericRow => "malformed numeric row",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    /// Usually the file name
    pub source: String,
    pub kind: IssueKind,
    pub reason: String,
}

/// Collects every per-file and per-row failure of a run.
///
/// Nothing recorded here aborts processing. The full ledger is reported at the end of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorLedger {
    issues: Vec<Issue>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, source: &str, kind: IssueKind, reason: impl Into<String>) {
        self.issues.push(Issue {
            source: source.to_string(),
            kind,
            reason: reason.into(),
        });
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    pub fn counts_by_kind(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts = BTreeMap::new();
        for issue in self.issues.iter() {
            *counts.entry(issue.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Log every issue (never a truncated subset)
    pub fn report(&self) {
        if self.issues.is_empty() {
            log::info!("No issues encountered.");
            return;
        }
        log::warn!("Issues encountered: {}", self.issues.len());
        for issue in self.issues.iter() {
            log::warn!("    {} -> [{}] {}", issue.source, issue.kind, issue.reason);
        }
        for (kind, count) in self.counts_by_kind() {
            log::warn!("Total {kind}: {count}");
        }
    }

    /// Write the ledger as YAML
    pub fn write_yaml(&self, path: &Path) -> Result<(), ProcessorError> {
        let yaml_str = serde_yaml::to_string(&self.issues)?;
        std::fs::write(path, yaml_str)?;
        Ok(())
    }
}
