use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_SCHEMA_VERSION: &str = "tagval.config@0.1.0";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown-directives mode must be `fail` or `skip`, got {0:?}")]
    InvalidUnknownMode(String),
    #[error("config schema_version mismatch: expected tagval.config@0.1.0 got {0:?}")]
    SchemaMismatch(String),
    #[error("output suffix {0:?} must be non-empty and contain only [A-Za-z0-9_]")]
    InvalidSuffix(String),
    #[error("numeric wrapper {path:?} needs a path type and a conversion method name")]
    InvalidWrapper { path: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// What to do with directive segments that name no known rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownDirectiveMode {
    #[default]
    Fail,
    Skip,
}

impl UnknownDirectiveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            UnknownDirectiveMode::Fail => "fail",
            UnknownDirectiveMode::Skip => "skip",
        }
    }
}

impl fmt::Display for UnknownDirectiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnknownDirectiveMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fail" => Ok(UnknownDirectiveMode::Fail),
            "skip" => Ok(UnknownDirectiveMode::Skip),
            other => Err(ConfigError::InvalidUnknownMode(other.to_string())),
        }
    }
}

/// A type that carries a number in textual or boxed form, such as `serde_json::Number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericWrapper {
    /// Fully qualified type path, e.g. `serde_json::Number`.
    pub path: String,
    /// Method returning `Option<f64>`.
    pub to_number: String,
}

impl NumericWrapper {
    pub fn new(path: impl Into<String>, to_number: impl Into<String>) -> Self {
        NumericWrapper {
            path: path.into(),
            to_number: to_number.into(),
        }
    }

    pub(crate) fn matches(&self, path: &str) -> bool {
        normalize_path(&self.path) == normalize_path(path)
    }

    pub(crate) fn name(&self) -> &str {
        let path = normalize_path(&self.path);
        path.rsplit("::").next().unwrap_or(path)
    }
}

fn normalize_path(path: &str) -> &str {
    path.trim().trim_start_matches("::")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    pub suffix: String,
    pub unknown_directives: UnknownDirectiveMode,
    pub numeric_wrappers: Vec<NumericWrapper>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            suffix: "_validation".to_string(),
            unknown_directives: UnknownDirectiveMode::Fail,
            numeric_wrappers: vec![NumericWrapper::new("serde_json::Number", "as_f64")],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    schema_version: String,
    #[serde(flatten)]
    options: GenerateOptions,
}

impl GenerateOptions {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_slice(bytes)?;
        if file.schema_version.trim() != CONFIG_SCHEMA_VERSION {
            return Err(ConfigError::SchemaMismatch(file.schema_version));
        }
        file.options.validate()?;
        Ok(file.options)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read config: {}", path.display()))?;
        GenerateOptions::from_json(&bytes)
            .with_context(|| format!("parse config: {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suffix.is_empty()
            || !self
                .suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidSuffix(self.suffix.clone()));
        }
        for wrapper in &self.numeric_wrappers {
            if !crate::util::is_path(normalize_path(&wrapper.path))
                || !crate::util::is_ident(&wrapper.to_number)
            {
                return Err(ConfigError::InvalidWrapper {
                    path: wrapper.path.clone(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn wrapper_for(&self, path: &str) -> Option<&NumericWrapper> {
        self.numeric_wrappers.iter().find(|w| w.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = GenerateOptions::default();
        assert_eq!(opts.suffix, "_validation");
        assert_eq!(opts.unknown_directives, UnknownDirectiveMode::Fail);
        assert!(opts.wrapper_for("::serde_json::Number").is_some());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn unknown_mode_parses_strictly() {
        assert_eq!(
            "skip".parse::<UnknownDirectiveMode>().expect("skip"),
            UnknownDirectiveMode::Skip
        );
        assert!(matches!(
            "ignore".parse::<UnknownDirectiveMode>(),
            Err(ConfigError::InvalidUnknownMode(_))
        ));
    }

    #[test]
    fn config_file_overrides_and_checks_schema() {
        let opts = GenerateOptions::from_json(
            br#"{
                "schema_version": "tagval.config@0.1.0",
                "suffix": "_checks",
                "unknown_directives": "skip"
            }"#,
        )
        .expect("config");
        assert_eq!(opts.suffix, "_checks");
        assert_eq!(opts.unknown_directives, UnknownDirectiveMode::Skip);
        assert_eq!(opts.numeric_wrappers.len(), 1);

        let err = GenerateOptions::from_json(br#"{"schema_version": "tagval.config@9"}"#)
            .expect_err("schema");
        assert!(matches!(err, ConfigError::SchemaMismatch(_)));

        let err = GenerateOptions::from_json(
            br#"{"schema_version": "tagval.config@0.1.0", "unknown_directives": "warn"}"#,
        )
        .expect_err("mode");
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn rejects_bad_suffix_and_wrappers() {
        let opts = GenerateOptions {
            suffix: "-gen".to_string(),
            ..GenerateOptions::default()
        };
        assert!(matches!(opts.validate(), Err(ConfigError::InvalidSuffix(_))));

        let opts = GenerateOptions {
            numeric_wrappers: vec![NumericWrapper::new("rust_decimal::Decimal", "to f64")],
            ..GenerateOptions::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(ConfigError::InvalidWrapper { .. })
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tagval.json");
        std::fs::write(
            &path,
            r#"{"schema_version":"tagval.config@0.1.0","numeric_wrappers":[{"path":"rust_decimal::Decimal","to_number":"to_f64"}]}"#,
        )
        .expect("write");
        let opts = GenerateOptions::load(&path).expect("load");
        assert_eq!(opts.numeric_wrappers[0].name(), "Decimal");
        assert!(GenerateOptions::load(&dir.path().join("missing.json")).is_err());
    }
}
