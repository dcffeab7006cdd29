use std::collections::HashMap;
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{AccessStatus, Partition};
use crate::error::ClassifierError;

pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdLookup {
    Found(String),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSummary {
    pub status: AccessStatus,
    pub cluster: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryLookup {
    Found(AccessSummary),
    NotFound,
}

pub trait AccessClient: Send + Sync {
    fn resolve_id(&self, accession: &str) -> Result<IdLookup, ClassifierError>;
    fn fetch_summary(&self, id: &str) -> Result<SummaryLookup, ClassifierError>;
}

#[derive(Debug, Clone)]
pub struct EutilsHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EutilsHttpClient {
    pub fn new(api_key: &str) -> Result<Self, ClassifierError> {
        Self::with_base_url(api_key, EUTILS_BASE)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, ClassifierError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ClassifierError::MissingApiKey);
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-rc/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ClassifierError::EutilsHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ClassifierError::EutilsHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, ClassifierError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self.send_with_retries(|| {
            self.client
                .get(&url)
                .query(params)
                .query(&[("retmode", "json"), ("api_key", self.api_key.as_str())])
        })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "E-utilities request failed".to_string());
            return Err(ClassifierError::EutilsStatus { status, message });
        }
        response
            .json::<Value>()
            .map_err(|err| ClassifierError::MalformedResponse(err.to_string()))
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, ClassifierError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(ClassifierError::EutilsHttp(err.to_string()));
                }
            }
        }
    }
}

impl AccessClient for EutilsHttpClient {
    fn resolve_id(&self, accession: &str) -> Result<IdLookup, ClassifierError> {
        let payload = self.get_json("esearch.fcgi", &[("db", "sra"), ("term", accession)])?;
        parse_esearch(&payload)
    }

    fn fetch_summary(&self, id: &str) -> Result<SummaryLookup, ClassifierError> {
        let payload = self.get_json("esummary.fcgi", &[("db", "sra"), ("id", id)])?;
        parse_esummary(&payload)
    }
}

pub fn parse_esearch(payload: &Value) -> Result<IdLookup, ClassifierError> {
    let ids = payload["esearchresult"]["idlist"].as_array().ok_or_else(|| {
        ClassifierError::MalformedResponse("esearch payload has no idlist".to_string())
    })?;
    match ids.first() {
        Some(Value::String(id)) => Ok(IdLookup::Found(id.clone())),
        Some(Value::Number(id)) => Ok(IdLookup::Found(id.to_string())),
        Some(other) => Err(ClassifierError::MalformedResponse(format!(
            "unexpected id in esearch payload: {other}"
        ))),
        None => Ok(IdLookup::NotFound),
    }
}

pub fn parse_esummary(payload: &Value) -> Result<SummaryLookup, ClassifierError> {
    let result = payload.get("result").ok_or_else(|| {
        ClassifierError::MalformedResponse("esummary payload has no result".to_string())
    })?;
    let uids = result["uids"].as_array().ok_or_else(|| {
        ClassifierError::MalformedResponse("esummary payload has no uids".to_string())
    })?;
    let Some(uid) = uids.first().and_then(Value::as_str) else {
        return Ok(SummaryLookup::NotFound);
    };
    let document = &result[uid];
    let expxml = document["expxml"].as_str().ok_or_else(|| {
        ClassifierError::MalformedResponse(format!("esummary document {uid} has no expxml"))
    })?;
    let cluster = document["runs"].as_str().and_then(extract_cluster_name);
    Ok(SummaryLookup::Found(AccessSummary {
        status: AccessStatus::from_summary(expxml),
        cluster,
    }))
}

static CLUSTER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"cluster_name="([^"]*)""#).expect("cluster_name pattern compiles")
});

pub fn extract_cluster_name(runs: &str) -> Option<String> {
    CLUSTER_NAME
        .captures(runs)
        .and_then(|cap| cap.get(1))
        .map(|value| value.as_str().to_string())
}

/// Outcome of resolving one project, before the undetermined fallback.
#[derive(Debug)]
pub enum ProjectLookup {
    Determined(AccessSummary),
    NotFound,
    Failed(ClassifierError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFields {
    pub run_accession: usize,
    pub project_accession: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectAccess {
    pub project: String,
    pub status: AccessStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub classes: Vec<Partition>,
    pub dropped: usize,
    pub projects: Vec<ProjectAccess>,
}

pub struct AccessEnricher<'a, C: AccessClient> {
    client: &'a C,
    cache: HashMap<String, AccessStatus>,
    remote_calls: usize,
}

impl<'a, C: AccessClient> AccessEnricher<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            cache: HashMap::new(),
            remote_calls: 0,
        }
    }

    pub fn remote_calls(&self) -> usize {
        self.remote_calls
    }

    pub fn cached_status(&self, project: &str) -> Option<AccessStatus> {
        self.cache.get(project).copied()
    }

    pub fn lookup(&mut self, accession: &str) -> ProjectLookup {
        self.remote_calls += 1;
        let id = match self.client.resolve_id(accession) {
            Ok(IdLookup::Found(id)) => id,
            Ok(IdLookup::NotFound) => return ProjectLookup::NotFound,
            Err(err) => return ProjectLookup::Failed(err),
        };
        self.remote_calls += 1;
        match self.client.fetch_summary(&id) {
            Ok(SummaryLookup::Found(summary)) => ProjectLookup::Determined(summary),
            Ok(SummaryLookup::NotFound) => ProjectLookup::NotFound,
            Err(err) => ProjectLookup::Failed(err),
        }
    }

    // Failed and not-found lookups are cached as `Unknown`.
    pub fn status_for(&mut self, project: &str, run_accession: &str) -> AccessStatus {
        if let Some(status) = self.cache.get(project) {
            return *status;
        }
        let status = match self.lookup(run_accession) {
            ProjectLookup::Determined(summary) => {
                debug!(
                    project,
                    run = run_accession,
                    status = %summary.status,
                    cluster = summary.cluster.as_deref().unwrap_or(""),
                    "access status resolved"
                );
                summary.status
            }
            ProjectLookup::NotFound => {
                warn!(project, run = run_accession, "no E-utilities record; access status undetermined");
                AccessStatus::Unknown
            }
            ProjectLookup::Failed(err) => {
                warn!(project, run = run_accession, error = %err, "access status undetermined");
                AccessStatus::Unknown
            }
        };
        self.cache.insert(project.to_string(), status);
        status
    }

    pub fn enrich(&mut self, classes: Vec<Partition>, fields: AccessFields) -> Enrichment {
        let mut projects = Vec::new();
        for partition in &classes {
            for run in partition.runs() {
                let project = run.field(fields.project_accession);
                if self.cache.contains_key(project) {
                    continue;
                }
                let status = self.status_for(project, run.field(fields.run_accession));
                projects.push(ProjectAccess {
                    project: project.to_string(),
                    status,
                });
            }
        }

        let mut enriched = Vec::with_capacity(classes.len() * 2);
        let mut dropped = 0usize;
        for partition in classes {
            let class = partition.name().to_string();
            let mut public = Partition::new(format!("{class}_public"));
            let mut controlled = Partition::new(format!("{class}_controlled_access"));
            for run in partition.into_runs() {
                let status = self
                    .cache
                    .get(run.field(fields.project_accession))
                    .copied()
                    .unwrap_or(AccessStatus::Unknown);
                match status {
                    AccessStatus::Public => public.push(run),
                    AccessStatus::Controlled => controlled.push(run),
                    AccessStatus::Unknown => dropped += 1,
                }
            }
            enriched.push(public);
            enriched.push(controlled);
        }

        if dropped > 0 {
            warn!(dropped, "runs dropped because their access status is undetermined");
        }

        Enrichment {
            classes: enriched,
            dropped,
            projects,
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
