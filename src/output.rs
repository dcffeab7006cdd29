use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{ProgressEvent, ProgressSink, RunReport};
use crate::domain::ColumnSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_run(result: &RunReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_columns(schema: &ColumnSchema, runs: usize) -> io::Result<()> {
        #[derive(Serialize)]
        struct Columns<'a> {
            columns: &'a [String],
            runs: usize,
        }
        Self::print_json(&Columns {
            columns: schema.names(),
            runs,
        })
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct HumanOutput;

impl HumanOutput {
    pub fn print_run(result: &RunReport) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(render_run(result).as_bytes())
    }

    pub fn print_columns(schema: &ColumnSchema, runs: usize) -> io::Result<()> {
        let mut stdout = io::stdout();
        for (index, name) in schema.names().iter().enumerate() {
            writeln!(stdout, "{index}\t{name}")?;
        }
        writeln!(stdout, "runs: {runs}")
    }
}

pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

pub fn render_run(result: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("runs in input:\t{}\n", result.input_runs));
    out.push_str(&format!("excluded:\t{}\n", result.excluded));
    for class in &result.classes {
        out.push_str(&format!(
            "{}:\t{} runs / {} projects\n",
            class.name, class.runs, class.projects
        ));
    }
    out.push_str(&format!("unresolved:\t{}\n", result.unresolved));
    out.push_str(&format!("undefined:\t{}\n", result.undefined));
    if let Some(access) = &result.access {
        out.push_str(&format!(
            "access status:\t{} projects, {} remote calls, {} runs dropped\n",
            access.projects.len(),
            access.remote_calls,
            access.dropped
        ));
    }
    match &result.output_root {
        Some(root) => out.push_str(&format!("reports:\t{root} ({} files)\n", result.written.len())),
        None => out.push_str("reports:\tnot written (dry run)\n"),
    }
    out.push_str(&format!(
        "finished in {:.2} sec\n",
        result.elapsed_ms as f64 / 1000.0
    ));
    out
}
