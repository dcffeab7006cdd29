use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::ClassifierError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    names: Vec<String>,
}

impl ColumnSchema {
    pub fn new(names: Vec<String>) -> Result<Self, ClassifierError> {
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(ClassifierError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn resolve(&self, name: &str) -> Result<usize, ClassifierError> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .ok_or_else(|| ClassifierError::MissingColumn(name.to_string()))
    }

    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>, ClassifierError> {
        names.iter().map(|name| self.resolve(name.as_ref())).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifiedKeyword {
    pub class: String,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    fields: Vec<String>,
    identified: Vec<IdentifiedKeyword>,
}

impl RunRecord {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            identified: Vec::new(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    // Out-of-range indices read as empty.
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn identified_keywords(&self) -> &[IdentifiedKeyword] {
        &self.identified
    }

    pub fn identified_keyword(&self, class: &str) -> Option<&str> {
        self.identified
            .iter()
            .find(|entry| entry.class == class)
            .map(|entry| entry.keyword.as_str())
    }

    pub fn matched_classes(&self) -> impl Iterator<Item = &str> {
        self.identified
            .iter()
            .filter(|entry| !entry.keyword.is_empty())
            .map(|entry| entry.class.as_str())
    }

    pub(crate) fn push_identified(&mut self, class: &str, keyword: &str) {
        self.identified.push(IdentifiedKeyword {
            class: class.to_string(),
            keyword: keyword.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    name: String,
    runs: Vec<RunRecord>,
}

impl Partition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runs: Vec::new(),
        }
    }

    pub fn with_runs(name: impl Into<String>, runs: Vec<RunRecord>) -> Self {
        Self {
            name: name.into(),
            runs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn push(&mut self, run: RunRecord) {
        self.runs.push(run);
    }

    pub fn into_runs(self) -> Vec<RunRecord> {
        self.runs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Public,
    Controlled,
    Unknown,
}

impl AccessStatus {
    pub fn from_summary(summary: &str) -> Self {
        if summary.to_lowercase().contains("controlled") {
            AccessStatus::Controlled
        } else {
            AccessStatus::Public
        }
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessStatus::Public => write!(f, "public"),
            AccessStatus::Controlled => write!(f, "controlled"),
            AccessStatus::Unknown => write!(f, "unknown"),
        }
    }
}
