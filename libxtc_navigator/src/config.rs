use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::data_source_spec::DataSourceSpec;
use super::datasource::DataSourceOptions;
use super::error::ConfigError;
use super::resolver::ResolveOptions;

/// Structure representing the application configuration. Contains the data source,
/// the run archive location and navigation options.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data source string, e.g. `exp=xpptut15:run=54:smd`
    pub data_source: String,
    pub archive_path: PathBuf,
    /// Load the run fully indexed regardless of the access flag in `data_source`
    pub force_indexed: bool,
    pub live_poll_ms: u64,
    /// Stop walking the data after this many events
    pub max_events: Option<usize>,
    pub build_scan_table: bool,
    /// Extra default aliases, keyed by source string
    #[serde(default)]
    pub alias_defaults: BTreeMap<String, String>,
}

impl Default for Config {
    /// Generate a new template Config. The data source and archive are placeholders
    fn default() -> Self {
        Self {
            data_source: String::from("exp=xpptut15:run=54:smd"),
            archive_path: PathBuf::from("None"),
            force_indexed: false,
            live_poll_ms: 100,
            max_events: None,
            build_scan_table: true,
            alias_defaults: BTreeMap::new(),
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

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Parse the data source string, applying `force_indexed`
    pub fn data_source_spec(&self) -> Result<DataSourceSpec, ConfigError> {
        let spec = DataSourceSpec::from_str(&self.data_source)?;
        Ok(DataSourceOptions::from(self).apply_to(spec))
    }

    pub fn does_archive_exist(&self) -> bool {
        self.archive_path.exists()
    }

    pub fn live_poll_interval(&self) -> Duration {
        Duration::from_millis(self.live_poll_ms)
    }

    pub fn resolve_options(&self, live: bool) -> ResolveOptions {
        DataSourceOptions::from(self).resolve_options(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source_spec::AccessMode;

    #[test]
    fn test_template_round_trip() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.data_source, "exp=xpptut15:run=54:smd");
        assert!(config.build_scan_table);
        assert_eq!(config.live_poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_force_indexed() {
        let mut config = Config::default();
        assert_eq!(config.data_source_spec().unwrap().mode, AccessMode::Stepped);
        config.force_indexed = true;
        assert_eq!(config.data_source_spec().unwrap().mode, AccessMode::Indexed);

        config.data_source = String::from("shmem=psana.0");
        assert_eq!(config.data_source_spec().unwrap().mode, AccessMode::Live);

        config.data_source = String::from("run=5");
        assert!(matches!(
            config.data_source_spec(),
            Err(ConfigError::SpecError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::read_config_file(Path::new("/no/such/config.yaml")),
            Err(ConfigError::BadFilePath(_))
        ));
    }

    #[test]
    fn test_alias_defaults_without_field() {
        let yaml = "data_source: exp=xpptut15:run=54:idx\narchive_path: /tmp/a.yaml\nforce_indexed: false\nlive_poll_ms: 50\nmax_events: 10\nbuild_scan_table: false\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.alias_defaults.is_empty());
        assert_eq!(config.max_events, Some(10));
        assert!(config.resolve_options(false).alias_defaults.contains_key("BldInfo(FEE-SPEC0)"));
    }
}
