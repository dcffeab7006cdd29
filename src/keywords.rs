use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::domain::RunRecord;
use crate::error::ClassifierError;

pub const BLACKLIST_NAME: &str = "blacklist";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Keyword {
    text: String,
    needle: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    name: String,
    keywords: Vec<Keyword>,
}

impl KeywordSet {
    /// Empty keywords are dropped.
    pub fn new<I, S>(name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(Into::into)
            .filter(|text: &String| !text.is_empty())
            .map(|text| Keyword {
                needle: text.to_lowercase(),
                text,
            })
            .collect();
        Self {
            name: name.into(),
            keywords,
        }
    }

    pub fn blacklist<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(BLACKLIST_NAME, keywords)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|keyword| keyword.text.as_str())
    }

    pub fn find_in(&self, run: &RunRecord, fields: &[usize]) -> Option<&str> {
        if self.keywords.is_empty() {
            return None;
        }
        for &index in fields {
            let haystack = run.field(index).to_lowercase();
            for keyword in &self.keywords {
                if haystack.contains(&keyword.needle) {
                    return Some(&keyword.text);
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassKeywords {
    classes: Vec<KeywordSet>,
}

impl ClassKeywords {
    pub fn new(classes: Vec<KeywordSet>) -> Result<Self, ClassifierError> {
        let mut seen = HashSet::new();
        for class in &classes {
            if !seen.insert(class.name()) {
                return Err(ClassifierError::KeywordParse(format!(
                    "duplicate class `{}`",
                    class.name()
                )));
            }
        }
        Ok(Self { classes })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeywordSet> {
        self.classes.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.classes
            .iter()
            .map(|class| class.name().to_string())
            .collect()
    }
}

pub fn parse_blacklist(text: &str) -> KeywordSet {
    KeywordSet::blacklist(text.lines().filter(|line| !line.trim().is_empty()))
}

pub fn load_blacklist(path: &Path) -> Result<KeywordSet, ClassifierError> {
    if !path.exists() {
        return Err(ClassifierError::MissingInput(path.to_path_buf()));
    }
    let content =
        fs::read_to_string(path).map_err(|_| ClassifierError::KeywordRead(path.to_path_buf()))?;
    Ok(parse_blacklist(&content))
}

pub fn parse_class_keywords(text: &str) -> Result<ClassKeywords, ClassifierError> {
    if text.trim().is_empty() {
        return Ok(ClassKeywords::default());
    }
    let mapping: Map<String, Value> =
        serde_json::from_str(text).map_err(|err| ClassifierError::KeywordParse(err.to_string()))?;
    let classes = mapping
        .into_iter()
        .map(|(name, value)| {
            let keywords: Vec<String> = serde_json::from_value(value).map_err(|_| {
                ClassifierError::KeywordParse(format!(
                    "class `{name}` must map to an array of strings"
                ))
            })?;
            Ok(KeywordSet::new(name, keywords))
        })
        .collect::<Result<Vec<_>, ClassifierError>>()?;
    ClassKeywords::new(classes)
}

pub fn load_class_keywords(path: &Path) -> Result<ClassKeywords, ClassifierError> {
    if !path.exists() {
        return Err(ClassifierError::MissingInput(path.to_path_buf()));
    }
    let content =
        fs::read_to_string(path).map_err(|_| ClassifierError::KeywordRead(path.to_path_buf()))?;
    parse_class_keywords(&content)
}
