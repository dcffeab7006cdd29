use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::domain::{ColumnSchema, RunRecord};
use crate::error::ClassifierError;

#[derive(Debug, Clone)]
pub struct Relation {
    schema: ColumnSchema,
    rows: Vec<RunRecord>,
}

impl Relation {
    pub fn read(path: &Path) -> Result<Self, ClassifierError> {
        if !path.exists() {
            return Err(ClassifierError::MissingInput(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|err| ClassifierError::RelationRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::parse(BufReader::new(file), path)
    }

    pub fn parse<R: BufRead>(reader: R, source: &Path) -> Result<Self, ClassifierError> {
        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(line) => line.map_err(|err| ClassifierError::RelationRead {
                path: source.to_path_buf(),
                message: err.to_string(),
            })?,
            None => return Err(ClassifierError::EmptyRelation(source.to_path_buf())),
        };
        let schema = ColumnSchema::new(split_cells(&header))?;

        let mut rows = Vec::new();
        for (offset, line) in lines.enumerate() {
            let line = line.map_err(|err| ClassifierError::RelationRead {
                path: source.to_path_buf(),
                message: err.to_string(),
            })?;
            if line.trim_end_matches('\r').is_empty() {
                continue;
            }
            let cells = split_cells(&line);
            if cells.len() != schema.len() {
                return Err(ClassifierError::RaggedRow {
                    line: offset + 2,
                    expected: schema.len(),
                    found: cells.len(),
                });
            }
            rows.push(RunRecord::new(cells));
        }

        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[RunRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_parts(self) -> (ColumnSchema, Vec<RunRecord>) {
        (self.schema, self.rows)
    }
}

fn split_cells(line: &str) -> Vec<String> {
    line.trim_end_matches('\r')
        .split('\t')
        .map(|cell| cell.replace('"', ""))
        .collect()
}
