use std::collections::HashMap;
use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::classify::{UNDEFINED, UNRESOLVED};
use crate::domain::{ColumnSchema, Partition};
use crate::error::ClassifierError;

pub const SAMPLE_OVERVIEW_DIR: &str = "sample_overview";
pub const DOWNLOAD_LISTS_DIR: &str = "download_lists";
pub const SUMMARY_STATISTICS_DIR: &str = "summary_statistics";

#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: Utf8PathBuf,
}

impl OutputLayout {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn sample_table_path(&self, partition: &str) -> Utf8PathBuf {
        self.root
            .join(SAMPLE_OVERVIEW_DIR)
            .join(format!("{partition}_samples.tsv"))
    }

    pub fn download_list_path(&self, class: &str) -> Utf8PathBuf {
        self.root
            .join(DOWNLOAD_LISTS_DIR)
            .join(format!("{class}_dl_list.txt"))
    }

    pub fn summary_path(&self, class: &str) -> Utf8PathBuf {
        self.root
            .join(SUMMARY_STATISTICS_DIR)
            .join(format!("{class}_summary_samples.txt"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub runs: usize,
    pub projects: Vec<(String, usize)>,
}

impl ProjectSummary {
    pub fn from_partition(partition: &Partition, project_field: usize) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for run in partition.runs() {
            *counts.entry(run.field(project_field)).or_default() += 1;
        }
        let mut projects: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(project, count)| (project.to_string(), count))
            .collect();
        projects.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        Self {
            runs: partition.len(),
            projects,
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "# of runs:\t{}\n# of projects:\t{}\n\n",
            self.runs,
            self.projects.len()
        );
        for (project, count) in &self.projects {
            out.push_str(&format!("{project}\t{count}\n"));
        }
        out
    }
}

pub fn render_sample_table(
    partition: &Partition,
    schema: &ColumnSchema,
    columns: &[usize],
    class_names: &[String],
) -> String {
    let mut header: Vec<String> = columns
        .iter()
        .map(|&index| schema.name(index).unwrap_or_default().to_string())
        .collect();
    header.extend(class_names.iter().map(|name| format!("{name}_identified_keyword")));

    let mut out = header.join("\t");
    out.push('\n');
    for run in partition.runs() {
        let mut cells: Vec<&str> = columns.iter().map(|&index| run.field(index)).collect();
        cells.extend(
            class_names
                .iter()
                .map(|name| run.identified_keyword(name).unwrap_or("")),
        );
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

pub fn render_download_list(partition: &Partition, run_field: usize) -> String {
    let mut out = String::new();
    for run in partition.runs() {
        out.push_str(run.field(run_field));
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub schema: &'a ColumnSchema,
    pub output_fields: &'a [usize],
    pub run_field: usize,
    pub project_field: usize,
    pub class_names: &'a [String],
    pub classes: &'a [Partition],
    pub undefined: &'a Partition,
    pub unresolved: &'a Partition,
}

pub fn write_reports(
    layout: &OutputLayout,
    inputs: ReportInputs<'_>,
) -> Result<Vec<Utf8PathBuf>, ClassifierError> {
    let mut written = Vec::new();

    let sample_tables = inputs
        .classes
        .iter()
        .map(|partition| (partition.name(), partition))
        .chain([(UNDEFINED, inputs.undefined), (UNRESOLVED, inputs.unresolved)]);
    for (name, partition) in sample_tables {
        let path = layout.sample_table_path(name);
        let table = render_sample_table(
            partition,
            inputs.schema,
            inputs.output_fields,
            inputs.class_names,
        );
        write_atomic(&path, table.as_bytes())?;
        written.push(path);
    }

    for partition in inputs.classes {
        let path = layout.summary_path(partition.name());
        let summary = ProjectSummary::from_partition(partition, inputs.project_field);
        write_atomic(&path, summary.render().as_bytes())?;
        written.push(path);
    }

    for partition in inputs.classes {
        let path = layout.download_list_path(partition.name());
        write_atomic(
            &path,
            render_download_list(partition, inputs.run_field).as_bytes(),
        )?;
        written.push(path);
    }

    Ok(written)
}

pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ClassifierError> {
    let parent = path
        .parent()
        .ok_or_else(|| ClassifierError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ClassifierError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("kira-rc-report")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ClassifierError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| ClassifierError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| ClassifierError::Filesystem(err.to_string()))?;
    Ok(())
}
