use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::error::ProcessorError;
use super::filename::Grammar;

/// A file found under the data directory whose name looks like simulation output
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub file_name: String,
    pub grammar: Grammar,
    pub size: u64,
}

/// The files of a run, in a stable order (grammar, then path)
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    files: Vec<DiscoveredFile>,
    skipped: usize,
}

impl Inventory {
    /// Recursively search a directory for files accepted by `wanted`.
    ///
    /// Only an unreadable root fails the discovery. Entries below it that cannot be read
    /// (permissions, broken links, link loops) are logged and skipped; files that merely do
    /// not look like output are ignored.
    pub fn discover(
        data_path: &Path,
        wanted: impl Fn(Grammar) -> bool,
    ) -> Result<Self, ProcessorError> {
        let mut files = Vec::new();
        let mut skipped = 0;
        for entry in WalkDir::new(data_path).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    log::warn!("Skipping unreadable entry during discovery: {e}");
                    skipped += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(grammar) = Grammar::classify(&file_name) else {
                continue;
            };
            if !wanted(grammar) {
                continue;
            }
            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    log::warn!("Skipping {}: {e}", entry.path().display());
                    skipped += 1;
                    continue;
                }
            };
            files.push(DiscoveredFile {
                path: entry.path().to_path_buf(),
                file_name,
                grammar,
                size,
            });
        }
        files.sort_by(|a, b| a.grammar.cmp(&b.grammar).then_with(|| a.path.cmp(&b.path)));
        Ok(Self { files, skipped })
    }

    pub fn files(&self) -> &[DiscoveredFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of entries that could not be read during discovery
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn get_total_data_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Number of files following a grammar
    pub fn count(&self, grammar: Grammar) -> usize {
        self.files.iter().filter(|f| f.grammar == grammar).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("run2").join("cycles");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("70_pro_2.dat"), "1 2 3\n").unwrap();
        std::fs::write(dir.path().join("compiled_proton_0000500000_85_tab.lis"), "x").unwrap();
        std::fs::write(dir.path().join("compiled_proton_0000500000_70.ascii"), "xy").unwrap();
        std::fs::write(dir.path().join("README.txt"), "ignored").unwrap();

        let inventory = Inventory::discover(dir.path(), |_| true).unwrap();
        assert_eq!(inventory.len(), 3);
        let grammars: Vec<Grammar> = inventory.files().iter().map(|f| f.grammar).collect();
        assert_eq!(
            grammars,
            vec![Grammar::FlukaDose, Grammar::FlukaTable, Grammar::ShieldHit]
        );
        assert_eq!(inventory.get_total_data_size(), 2 + 1 + 6);

        let fluka_only = Inventory::discover(dir.path(), |g| g != Grammar::ShieldHit).unwrap();
        assert_eq!(fluka_only.len(), 2);
        assert_eq!(fluka_only.count(Grammar::ShieldHit), 0);
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Inventory::discover(&dir.path().join("nope"), |_| true).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_link_loop_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("70_pro_1.dat"), "1 2 3\n").unwrap();
        std::os::unix::fs::symlink(".", dir.path().join("loop")).unwrap();

        let inventory = Inventory::discover(dir.path(), |_| true).unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.files()[0].file_name, "70_pro_1.dat");
        assert_eq!(inventory.skipped(), 1);
    }
}
