use std::path::{Path, PathBuf};

use rust_cli_config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Supported extensions for settings files.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "FASTMERGE";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Separator for list elements in environment variables.
const LIST_SEPARATOR: &str = ",";

/// Trait implemented by configuration structures that require list parsing help.
pub trait Config {
    /// Keys whose values should be parsed as lists when loading the configuration.
    const LIST_PARSE_KEYS: &'static [&'static str];
}

/// Errors that can occur while loading configuration files and overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// The requested settings file does not exist.
    #[error("settings file `{0}` does not exist")]
    ConfigurationFileMissing(PathBuf),

    /// The settings file has an extension the loader cannot parse.
    #[error("settings file `{path}` has an unsupported extension; expected one of: {expected}")]
    UnsupportedExtension { path: PathBuf, expected: String },

    /// A settings file existed but could not be parsed.
    #[error("failed to load settings from `{path}`: {source}")]
    ConfigurationFileLoad {
        path: PathBuf,
        source: rust_cli_config::ConfigError,
    },

    /// The sources were parsed but deserialization failed.
    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] rust_cli_config::ConfigError),

    /// Failed to build the layered configuration.
    #[error("failed to initialize configuration builder: {0}")]
    Builder(#[source] rust_cli_config::ConfigError),
}

/// Loads layered configuration from an optional settings file and environment variables.
///
/// The file, when given, must exist and end in `.yaml`, `.yml` or `.json`. Overrides come from
/// `FASTMERGE_`-prefixed environment variables; nested keys use double underscores
/// (`FASTMERGE_SECTION__KEY`) and list values are comma-separated.
pub fn load_config<T>(file: Option<&Path>) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let mut builder = rust_cli_config::Config::builder();

    if let Some(path) = file {
        check_configuration_file(path)?;

        builder = builder.add_source(rust_cli_config::File::from(path.to_path_buf()));
        validate_configuration_source(&builder, path)?;
    }

    let mut environment_source = rust_cli_config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    if !T::LIST_PARSE_KEYS.is_empty() {
        environment_source = environment_source.list_separator(LIST_SEPARATOR);

        for key in <T as Config>::LIST_PARSE_KEYS {
            environment_source = environment_source.with_list_parse_key(key);
        }
    }

    let settings = builder
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::Builder)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

fn check_configuration_file(path: &Path) -> Result<(), LoadConfigError> {
    if !path.is_file() {
        return Err(LoadConfigError::ConfigurationFileMissing(
            path.to_path_buf(),
        ));
    }

    let supported = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| CONFIG_FILE_EXTENSIONS.contains(&extension));

    if !supported {
        return Err(LoadConfigError::UnsupportedExtension {
            path: path.to_path_buf(),
            expected: CONFIG_FILE_EXTENSIONS.join(", "),
        });
    }

    Ok(())
}

fn validate_configuration_source(
    builder: &ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<(), LoadConfigError> {
    builder
        .clone()
        .build()
        .map_err(|source| LoadConfigError::ConfigurationFileLoad {
            path: path.to_path_buf(),
            source,
        })
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::shared::MergeSettings;

    #[test]
    fn test_loads_settings_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(
            &path,
            "strict: false\nskip_missing: true\ninput_catalog: catalog.json\n",
        )
        .unwrap();

        let settings: MergeSettings = load_config(Some(&path)).unwrap();

        assert!(!settings.strict);
        assert!(settings.skip_missing);
        assert_eq!(settings.input_catalog.as_deref(), Some("catalog.json"));
        assert_eq!(settings.output_catalog, None);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let err = load_config::<MergeSettings>(Some(&path)).unwrap_err();

        assert!(matches!(err, LoadConfigError::ConfigurationFileMissing(p) if p == path));
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ini");
        fs::write(&path, "strict = true\n").unwrap();

        let err = load_config::<MergeSettings>(Some(&path)).unwrap_err();

        assert!(matches!(err, LoadConfigError::UnsupportedExtension { .. }));
    }

    #[test]
    fn test_unknown_fields_fail_deserialization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "strict: true\nstrictness: high\n").unwrap();

        let err = load_config::<MergeSettings>(Some(&path)).unwrap_err();

        assert!(matches!(err, LoadConfigError::Deserialization(_)));
    }

    #[test]
    fn test_malformed_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ \"strict\": ").unwrap();

        let err = load_config::<MergeSettings>(Some(&path)).unwrap_err();

        assert!(matches!(err, LoadConfigError::ConfigurationFileLoad { path: p, .. } if p == path));
    }
}
