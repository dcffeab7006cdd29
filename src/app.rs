use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::access::{AccessClient, AccessEnricher, AccessFields, ProjectAccess};
use crate::classify::{Classification, classify_runs};
use crate::config::RunConfig;
use crate::domain::{ColumnSchema, Partition};
use crate::error::ClassifierError;
use crate::filter::filter_samples;
use crate::keywords::{ClassKeywords, KeywordSet, load_blacklist, load_class_keywords};
use crate::relation::Relation;
use crate::report::{OutputLayout, ProjectSummary, ReportInputs, write_reports};

#[derive(Debug, Clone, Serialize)]
pub struct PartitionCount {
    pub name: String,
    pub runs: usize,
    pub projects: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessReport {
    pub remote_calls: usize,
    pub dropped: usize,
    pub projects: Vec<ProjectAccess>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub input_runs: usize,
    pub excluded: usize,
    pub classes: Vec<PartitionCount>,
    pub unresolved: usize,
    pub undefined: usize,
    pub access: Option<AccessReport>,
    pub output_root: Option<String>,
    pub written: Vec<String>,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone)]
pub struct ClassifiedRelation {
    pub schema: ColumnSchema,
    pub excluded: Partition,
    pub classification: Classification,
}

#[derive(Clone)]
pub struct App<A: AccessClient> {
    access: A,
}

impl<A: AccessClient> App<A> {
    pub fn new(access: A) -> Self {
        Self { access }
    }

    pub fn classify_relation<S: AsRef<str>>(
        &self,
        relation: Relation,
        search_fields: &[S],
        blacklist: &KeywordSet,
        classes: &ClassKeywords,
    ) -> Result<ClassifiedRelation, ClassifierError> {
        let fields = relation.schema().resolve_all(search_fields)?;
        let (schema, rows) = relation.into_parts();
        let filtered = filter_samples(rows, &fields, blacklist);
        let classification = classify_runs(filtered.included, &fields, classes);
        Ok(ClassifiedRelation {
            schema,
            excluded: filtered.excluded,
            classification,
        })
    }

    pub fn run(
        &self,
        config: &RunConfig,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, ClassifierError> {
        let start = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        config.check_inputs()?;

        sink.event(ProgressEvent {
            message: format!("phase=Parse; reading {}", config.input.display()),
            elapsed: None,
        });
        let relation = Relation::read(&config.input)?;
        let blacklist = load_blacklist(&config.blacklist)?;
        let classes = load_class_keywords(&config.keywords)?;
        info!(
            runs = relation.len(),
            columns = relation.schema().len(),
            blacklist = blacklist.len(),
            classes = classes.len(),
            "parsed inputs"
        );

        let schema = relation.schema();
        let output_fields = schema.resolve_all(&config.output_fields)?;
        let access_fields = AccessFields {
            run_accession: schema.resolve(&config.run_accession_field)?,
            project_accession: schema.resolve(&config.project_accession_field)?,
        };
        let input_runs = relation.len();

        sink.event(ProgressEvent {
            message: "phase=Classify; filtering and classifying runs".to_string(),
            elapsed: Some(start.elapsed()),
        });
        let ClassifiedRelation {
            schema,
            excluded,
            mut classification,
        } = self.classify_relation(relation, &config.search_fields, &blacklist, &classes)?;
        info!(
            excluded = excluded.len(),
            classified = classification.classified_len(),
            unresolved = classification.unresolved.len(),
            undefined = classification.undefined.len(),
            "classified runs"
        );

        let access = if config.access.is_some() {
            sink.event(ProgressEvent {
                message: "phase=Access; querying E-utilities".to_string(),
                elapsed: Some(start.elapsed()),
            });
            let mut enricher = AccessEnricher::new(&self.access);
            let classes = std::mem::take(&mut classification.classes);
            let enrichment = enricher.enrich(classes, access_fields);
            classification.classes = enrichment.classes;
            info!(
                projects = enrichment.projects.len(),
                remote_calls = enricher.remote_calls(),
                dropped = enrichment.dropped,
                "access status resolved"
            );
            Some(AccessReport {
                remote_calls: enricher.remote_calls(),
                dropped: enrichment.dropped,
                projects: enrichment.projects,
            })
        } else {
            None
        };

        let mut written = Vec::new();
        if !config.dry_run {
            sink.event(ProgressEvent {
                message: format!("phase=Write; writing reports to {}", config.output_dir),
                elapsed: Some(start.elapsed()),
            });
            let layout = OutputLayout::new(config.output_dir.clone());
            written = write_reports(
                &layout,
                ReportInputs {
                    schema: &schema,
                    output_fields: &output_fields,
                    run_field: access_fields.run_accession,
                    project_field: access_fields.project_accession,
                    class_names: &classification.class_names,
                    classes: &classification.classes,
                    undefined: &classification.undefined,
                    unresolved: &classification.unresolved,
                },
            )?;
            info!(files = written.len(), root = %config.output_dir, "wrote reports");
        }

        let classes = classification
            .classes
            .iter()
            .map(|partition| PartitionCount {
                name: partition.name().to_string(),
                runs: partition.len(),
                projects: ProjectSummary::from_partition(
                    partition,
                    access_fields.project_accession,
                )
                .projects
                .len(),
            })
            .collect();

        let elapsed = start.elapsed();
        sink.event(ProgressEvent {
            message: "phase=Done".to_string(),
            elapsed: Some(elapsed),
        });

        Ok(RunReport {
            started_at,
            input_runs,
            excluded: excluded.len(),
            classes,
            unresolved: classification.unresolved.len(),
            undefined: classification.undefined.len(),
            access,
            output_root: (!config.dry_run).then(|| config.output_dir.to_string()),
            written: written.iter().map(|path| path.to_string()).collect(),
            elapsed_ms: elapsed.as_millis(),
        })
    }
}
