use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::ISSUES_SUFFIX;
use super::error::ConfigError;
use super::record::Category;
use super::text::TextCodec;

/// Structure representing the application configuration. Contains pathing and extraction settings.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory scanned recursively for simulation output
    pub data_path: PathBuf,
    /// Directory the datasets are written to
    pub output_path: PathBuf,
    /// Prefix of every output file
    pub run_name: String,
    pub collect_fluka: bool,
    pub collect_shieldhit: bool,
    /// FLUKA secondaries whose values near the kinematic endpoint are suppressed
    pub fluka_edge_species: Vec<String>,
    /// SHIELD-HIT12A secondaries whose forward values near the endpoint are suppressed
    pub shieldhit_edge_species: Vec<String>,
    /// SHIELD-HIT12A energy bin width in MeV
    pub energy_bin_width: f64,
    /// SHIELD-HIT12A number of angular bins over [0, 180] degrees
    pub angle_bins: u32,
    /// Text codecs tried in order when decoding input files
    pub text_codecs: Vec<TextCodec>,
    pub write_issue_report: bool,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            run_name: String::from("output"),
            collect_fluka: true,
            collect_shieldhit: false,
            fluka_edge_species: vec![String::from("aproton"), String::from("aprotons")],
            shieldhit_edge_species: vec![String::from("proton")],
            energy_bin_width: 3.5,
            angle_bins: 45,
            text_codecs: TextCodec::default_chain(),
            write_issue_report: true,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        std::fs::write(config_path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Check the values that cannot be expressed by the types alone
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_name.is_empty()
            || self
                .run_name
                .contains(|c: char| std::path::is_separator(c))
        {
            return Err(ConfigError::InvalidValue("run_name", self.run_name.clone()));
        }
        if !(self.energy_bin_width.is_finite() && self.energy_bin_width > 0.0) {
            return Err(ConfigError::InvalidValue(
                "energy_bin_width",
                self.energy_bin_width.to_string(),
            ));
        }
        if self.angle_bins == 0 || self.angle_bins > 180 {
            return Err(ConfigError::InvalidValue(
                "angle_bins",
                self.angle_bins.to_string(),
            ));
        }
        if self.text_codecs.is_empty() {
            return Err(ConfigError::InvalidValue(
                "text_codecs",
                String::from("at least one codec is required"),
            ));
        }
        Ok(())
    }

    /// Get the input directory, which must exist
    pub fn get_data_directory(&self) -> Result<&Path, ConfigError> {
        if self.data_path.is_dir() {
            Ok(&self.data_path)
        } else {
            Err(ConfigError::BadFilePath(self.data_path.clone()))
        }
    }

    /// Get the path to the output dataset of a category
    pub fn get_dataset_path(&self, category: Category) -> PathBuf {
        self.output_path
            .join(format!("{}_{}.parquet", self.run_name, category.suffix()))
    }

    /// Get the path to the issue report
    pub fn get_issues_path(&self) -> PathBuf {
        self.output_path
            .join(format!("{}_{}.yml", self.run_name, ISSUES_SUFFIX))
    }

    /// The categories this configuration extracts
    pub fn categories(&self) -> Vec<Category> {
        let mut categories = Vec::new();
        if self.collect_fluka {
            categories.extend([Category::Dose, Category::TrackLength, Category::AngularYield]);
        }
        if self.collect_shieldhit {
            categories.push(Category::CycleAveraged);
        }
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_round_trip_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let config = Config::default();
        config.write_config_file(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("utf8_sig"));
        assert_eq!(Config::read_config_file(&path).unwrap(), config);

        // Missing fields fall back to defaults
        std::fs::write(&path, "run_name: po16\ncollect_shieldhit: true\n").unwrap();
        let partial = Config::read_config_file(&path).unwrap();
        assert_eq!(partial.run_name, "po16");
        assert_eq!(partial.angle_bins, 45);
        assert_eq!(partial.fluka_edge_species, vec!["aproton", "aprotons"]);
        assert_eq!(partial.shieldhit_edge_species, vec!["proton"]);
        assert_eq!(
            partial.categories(),
            vec![
                Category::Dose,
                Category::TrackLength,
                Category::AngularYield,
                Category::CycleAveraged
            ]
        );
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.angle_bins = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue("angle_bins", _))
        ));
        let mut config = Config::default();
        config.run_name = String::from("a/b");
        assert!(config.validate().is_err());
        assert!(matches!(
            Config::read_config_file(Path::new("/does/not/exist.yml")),
            Err(ConfigError::BadFilePath(_))
        ));
    }

    #[test]
    fn test_output_paths() {
        let config = Config {
            output_path: PathBuf::from("/data/out"),
            run_name: String::from("po16"),
            ..Default::default()
        };
        assert_eq!(
            config.get_dataset_path(Category::Dose),
            PathBuf::from("/data/out/po16_usrbin.parquet")
        );
        assert_eq!(
            config.get_dataset_path(Category::CycleAveraged),
            PathBuf::from("/data/out/po16_shieldhit.parquet")
        );
        assert_eq!(
            config.get_issues_path(),
            PathBuf::from("/data/out/po16_issues.yml")
        );
    }
}
