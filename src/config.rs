use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

pub const API_KEY_ENV: &str = "NCBI_API_KEY";
pub const DEFAULT_RUN_ACCESSION_FIELD: &str = "run_accession";
pub const DEFAULT_PROJECT_ACCESSION_FIELD: &str = "study_accession";

pub fn default_search_fields() -> Vec<String> {
    vec![
        "sample_attribute".to_string(),
        "experiment_title".to_string(),
        "sample_name".to_string(),
    ]
}

pub fn default_output_fields() -> Vec<String> {
    vec![
        "run_accession".to_string(),
        "sample_attribute".to_string(),
        "sample_name".to_string(),
        "experiment_title".to_string(),
        "study_accession".to_string(),
    ]
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub search_fields: Option<Vec<String>>,
    #[serde(default)]
    pub output_fields: Option<Vec<String>>,
    #[serde(default)]
    pub run_accession_field: Option<String>,
    #[serde(default)]
    pub project_accession_field: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub blacklist: PathBuf,
    pub keywords: PathBuf,
    pub config: Option<PathBuf>,
    pub search_fields: Vec<String>,
    pub output_fields: Vec<String>,
    pub ncbi_api_key: Option<String>,
    pub get_access_status: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verbosity(pub u8);

impl Verbosity {
    pub fn log_filter(&self) -> &'static str {
        match self.0 {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output_dir: Utf8PathBuf,
    pub blacklist: PathBuf,
    pub keywords: PathBuf,
    pub search_fields: Vec<String>,
    pub output_fields: Vec<String>,
    pub run_accession_field: String,
    pub project_accession_field: String,
    pub access: Option<AccessConfig>,
    pub dry_run: bool,
}

impl RunConfig {
    pub fn check_inputs(&self) -> Result<(), ClassifierError> {
        for path in [&self.input, &self.blacklist, &self.keywords] {
            if !path.exists() {
                return Err(ClassifierError::MissingInput(path.clone()));
            }
        }
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(args: RunArgs) -> Result<RunConfig, ClassifierError> {
        let file = match &args.config {
            Some(path) => Some(Self::read_file(path)?),
            None => None,
        };
        let env_api_key = std::env::var(API_KEY_ENV).ok();
        Self::resolve_with(args, file, env_api_key)
    }

    pub fn read_file(path: &Path) -> Result<Config, ClassifierError> {
        let content = fs::read_to_string(path)
            .map_err(|_| ClassifierError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| ClassifierError::ConfigParse(err.to_string()))
    }

    // The API key is checked here, before any input is read.
    pub fn resolve_with(
        args: RunArgs,
        file: Option<Config>,
        env_api_key: Option<String>,
    ) -> Result<RunConfig, ClassifierError> {
        let file = file.unwrap_or_default();

        let search_fields = if !args.search_fields.is_empty() {
            args.search_fields
        } else {
            file.search_fields.unwrap_or_else(default_search_fields)
        };
        let output_fields = if !args.output_fields.is_empty() {
            args.output_fields
        } else {
            file.output_fields.unwrap_or_else(default_output_fields)
        };

        let access = if args.get_access_status {
            let api_key = args
                .ncbi_api_key
                .into_iter()
                .chain(env_api_key)
                .map(|key| key.trim().to_string())
                .find(|key| !key.is_empty())
                .ok_or(ClassifierError::MissingApiKey)?;
            Some(AccessConfig { api_key })
        } else {
            None
        };

        let output_dir = Utf8PathBuf::from_path_buf(args.output_dir).map_err(|path| {
            ClassifierError::Filesystem(format!("non-utf8 output path: {}", path.display()))
        })?;

        Ok(RunConfig {
            input: args.input,
            output_dir,
            blacklist: args.blacklist,
            keywords: args.keywords,
            search_fields,
            output_fields,
            run_accession_field: file
                .run_accession_field
                .unwrap_or_else(|| DEFAULT_RUN_ACCESSION_FIELD.to_string()),
            project_accession_field: file
                .project_accession_field
                .unwrap_or_else(|| DEFAULT_PROJECT_ACCESSION_FIELD.to_string()),
            access,
            dry_run: args.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            input: PathBuf::from("sra.tsv"),
            output_dir: PathBuf::from("out"),
            blacklist: PathBuf::from("blacklist.txt"),
            keywords: PathBuf::from("keywords.json"),
            ..RunArgs::default()
        }
    }

    #[test]
    fn defaults_apply_without_config_file() {
        let resolved = ConfigLoader::resolve_with(args(), None, None).unwrap();
        assert_eq!(resolved.search_fields, default_search_fields());
        assert_eq!(resolved.output_fields, default_output_fields());
        assert_eq!(resolved.run_accession_field, "run_accession");
        assert_eq!(resolved.project_accession_field, "study_accession");
        assert!(resolved.access.is_none());
    }

    #[test]
    fn command_line_overrides_config_file() {
        let file: Config = serde_json::from_str(
            r#"{"search_fields": ["study_title"], "output_fields": ["run_accession"], "project_accession_field": "bioproject"}"#,
        )
        .unwrap();
        let mut args = args();
        args.search_fields = vec!["sample_name".to_string()];
        let resolved = ConfigLoader::resolve_with(args, Some(file), None).unwrap();
        assert_eq!(resolved.search_fields, vec!["sample_name"]);
        assert_eq!(resolved.output_fields, vec!["run_accession"]);
        assert_eq!(resolved.project_accession_field, "bioproject");
    }

    #[test]
    fn access_status_requires_api_key() {
        let mut args = args();
        args.get_access_status = true;
        let err = ConfigLoader::resolve_with(args.clone(), None, None).unwrap_err();
        assert_matches!(err, ClassifierError::MissingApiKey);

        let err = ConfigLoader::resolve_with(args.clone(), None, Some("  ".to_string())).unwrap_err();
        assert_matches!(err, ClassifierError::MissingApiKey);

        let resolved = ConfigLoader::resolve_with(args, None, Some("abc123".to_string())).unwrap();
        assert_eq!(
            resolved.access,
            Some(AccessConfig {
                api_key: "abc123".to_string()
            })
        );
    }

    #[test]
    fn cli_api_key_wins_over_environment() {
        let mut args = args();
        args.get_access_status = true;
        args.ncbi_api_key = Some("from-cli".to_string());
        let resolved = ConfigLoader::resolve_with(args, None, Some("from-env".to_string())).unwrap();
        assert_eq!(resolved.access.unwrap().api_key, "from-cli");
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let err = serde_json::from_str::<Config>(r#"{"fields": []}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn verbosity_filters() {
        assert_eq!(Verbosity(0).log_filter(), "info");
        assert_eq!(Verbosity(1).log_filter(), "debug");
        assert_eq!(Verbosity(9).log_filter(), "trace");
    }
}
