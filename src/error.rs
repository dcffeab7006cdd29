use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ClassifierError {
    #[error("column not found in relation header: {0}")]
    #[diagnostic(help("run `kira-rc columns <table>` to list the available columns"))]
    MissingColumn(String),

    #[error("duplicate column in relation header: {0}")]
    DuplicateColumn(String),

    #[error("relation has no header line: {0}")]
    EmptyRelation(PathBuf),

    #[error("line {line} has {found} fields, header has {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("failed to read relation at {path}: {message}")]
    RelationRead { path: PathBuf, message: String },

    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("failed to read keyword file at {0}")]
    KeywordRead(PathBuf),

    #[error("failed to parse class keyword mapping: {0}")]
    KeywordParse(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("access status requested but no NCBI API key was provided")]
    #[diagnostic(help("pass --ncbi-api-key or set NCBI_API_KEY"))]
    MissingApiKey,

    #[error("E-utilities request failed: {0}")]
    EutilsHttp(String),

    #[error("E-utilities returned status {status}: {message}")]
    EutilsStatus { status: u16, message: String },

    #[error("malformed E-utilities response: {0}")]
    MalformedResponse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
