use std::fs;
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;

use kira_run_classifier::access::{AccessClient, AccessSummary, IdLookup, SummaryLookup};
use kira_run_classifier::app::App;
use kira_run_classifier::config::{ConfigLoader, RunArgs, RunConfig};
use kira_run_classifier::domain::AccessStatus;
use kira_run_classifier::error::ClassifierError;
use kira_run_classifier::output::JsonOutput;

const RELATION: &str = "\
\"run_ID\"\t\"run_accession\"\t\"sample_name\"\t\"sample_attribute\"\t\"experiment_title\"\t\"study_accession\"
1\tSRR001\tliver\tdisease: hepatocellular carcinoma\tRNA-Seq of tumor\tSRP100
2\tSRR002\tliver\tdisease: carcinoma\tRNA-Seq\tSRP100
3\tSRR003\tblood\tsource: whole blood\tRNA-Seq\tSRP200
4\tSRR004\tblood\tdisease: carcinoma\tRNA-Seq\tSRP300
5\tSRR005\tHeLa\tcell line\tRNA-Seq\tSRP400
6\tSRR006\tliver\tqc_fail\ttumor\tSRP100
";

const KEYWORDS: &str = r#"{"cancer": ["carcinoma", "tumor"], "healthy": ["blood"]}"#;

/// Every run resolves to itself; only `SRR001` is controlled.
struct MockEutils;

impl AccessClient for MockEutils {
    fn resolve_id(&self, accession: &str) -> Result<IdLookup, ClassifierError> {
        Ok(IdLookup::Found(accession.to_string()))
    }

    fn fetch_summary(&self, id: &str) -> Result<SummaryLookup, ClassifierError> {
        let status = if id == "SRR001" {
            AccessStatus::Controlled
        } else {
            AccessStatus::Public
        };
        Ok(SummaryLookup::Found(AccessSummary {
            status,
            cluster: None,
        }))
    }
}

struct Fixture {
    _temp: tempfile::TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().to_path_buf();
        fs::write(root.join("sra.tsv"), RELATION).unwrap();
        fs::write(root.join("blacklist.txt"), "qc_fail\n\n").unwrap();
        fs::write(root.join("keywords.json"), KEYWORDS).unwrap();
        Self { _temp: temp, root }
    }

    fn args(&self) -> RunArgs {
        RunArgs {
            input: self.root.join("sra.tsv"),
            output_dir: self.root.join("out"),
            blacklist: self.root.join("blacklist.txt"),
            keywords: self.root.join("keywords.json"),
            ..RunArgs::default()
        }
    }

    fn config(&self) -> RunConfig {
        ConfigLoader::resolve_with(self.args(), None, None).unwrap()
    }

    fn output(&self, relative: &str) -> String {
        fs::read_to_string(self.root.join("out").join(relative)).unwrap()
    }
}

#[test]
fn writes_reports_for_every_partition() {
    let fixture = Fixture::new();
    let app = App::new(MockEutils);

    let report = app.run(&fixture.config(), &JsonOutput).unwrap();

    assert_eq!(report.input_runs, 6);
    assert_eq!(report.excluded, 1);
    assert_eq!(report.classes[0].name, "cancer");
    assert_eq!(report.classes[0].runs, 2);
    assert_eq!(report.classes[0].projects, 1);
    assert_eq!(report.classes[1].runs, 1);
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.undefined, 1);
    assert!(report.access.is_none());
    assert_eq!(report.written.len(), 8);

    assert_eq!(
        fixture.output("sample_overview/cancer_samples.tsv"),
        "run_accession\tsample_attribute\tsample_name\texperiment_title\tstudy_accession\t\
         cancer_identified_keyword\thealthy_identified_keyword\n\
         SRR001\tdisease: hepatocellular carcinoma\tliver\tRNA-Seq of tumor\tSRP100\tcarcinoma\t\n\
         SRR002\tdisease: carcinoma\tliver\tRNA-Seq\tSRP100\tcarcinoma\t\n"
    );
    assert!(
        fixture
            .output("sample_overview/unresolved_samples.tsv")
            .contains("SRR004\tdisease: carcinoma\tblood\tRNA-Seq\tSRP300\tcarcinoma\tblood\n")
    );
    assert!(
        fixture
            .output("sample_overview/undefined_samples.tsv")
            .ends_with("SRR005\tcell line\tHeLa\tRNA-Seq\tSRP400\t\t\n")
    );
    assert_eq!(
        fixture.output("download_lists/cancer_dl_list.txt"),
        "SRR001\nSRR002\n"
    );
    assert_eq!(
        fixture.output("summary_statistics/healthy_summary_samples.txt"),
        "# of runs:\t1\n# of projects:\t1\n\nSRP200\t1\n"
    );
}

#[test]
fn access_status_splits_reports() {
    let fixture = Fixture::new();
    let mut args = fixture.args();
    args.get_access_status = true;
    let config = ConfigLoader::resolve_with(args, None, Some("key".to_string())).unwrap();
    let app = App::new(MockEutils);

    let report = app.run(&config, &JsonOutput).unwrap();

    let names: Vec<_> = report.classes.iter().map(|class| class.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "cancer_public",
            "cancer_controlled_access",
            "healthy_public",
            "healthy_controlled_access"
        ]
    );
    assert_eq!(report.classes[1].runs, 2);
    let access = report.access.unwrap();
    assert_eq!(access.remote_calls, 4);
    assert_eq!(access.dropped, 0);

    assert_eq!(
        fixture.output("download_lists/cancer_controlled_access_dl_list.txt"),
        "SRR001\nSRR002\n"
    );
    assert_eq!(fixture.output("download_lists/cancer_public_dl_list.txt"), "");
    let header = fixture.output("sample_overview/cancer_controlled_access_samples.tsv");
    assert!(
        header
            .lines()
            .next()
            .unwrap()
            .ends_with("\tcancer_identified_keyword\thealthy_identified_keyword")
    );
}

#[test]
fn dry_run_writes_nothing() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.dry_run = true;

    let report = App::new(MockEutils)
        .run(&config, &JsonOutput)
        .unwrap();

    assert!(report.written.is_empty());
    assert!(report.output_root.is_none());
    assert!(!fixture.root.join("out").exists());
}

#[test]
fn missing_search_column_aborts_before_output() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.search_fields = vec!["sample_title".to_string()];

    let err = App::new(MockEutils)
        .run(&config, &JsonOutput)
        .unwrap_err();

    assert_matches!(err, ClassifierError::MissingColumn(name) if name == "sample_title");
    assert!(!fixture.root.join("out").exists());
}

#[test]
fn missing_project_column_aborts_before_output() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.project_accession_field = "bioproject".to_string();

    let err = App::new(MockEutils)
        .run(&config, &JsonOutput)
        .unwrap_err();

    assert_matches!(err, ClassifierError::MissingColumn(_));
    assert!(!fixture.root.join("out").exists());
}

#[test]
fn missing_input_is_reported() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.keywords = fixture.root.join("absent.json");

    let err = App::new(MockEutils)
        .run(&config, &JsonOutput)
        .unwrap_err();

    assert_matches!(err, ClassifierError::MissingInput(path) if path.ends_with("absent.json"));
}

#[test]
fn empty_keyword_files_leave_every_run_undefined() {
    let fixture = Fixture::new();
    fs::write(fixture.root.join("blacklist.txt"), "").unwrap();
    fs::write(fixture.root.join("keywords.json"), "\n").unwrap();

    let report = App::new(MockEutils)
        .run(&fixture.config(), &JsonOutput)
        .unwrap();

    assert_eq!(report.excluded, 0);
    assert!(report.classes.is_empty());
    assert_eq!(report.unresolved, 0);
    assert_eq!(report.undefined, 6);
    assert_eq!(
        fixture.output("sample_overview/undefined_samples.tsv").lines().count(),
        7
    );
}

#[test]
fn classify_relation_in_memory() {
    let relation = kira_run_classifier::relation::Relation::parse(
        RELATION.as_bytes(),
        Path::new("inline.tsv"),
    )
    .unwrap();
    let blacklist = kira_run_classifier::keywords::parse_blacklist("qc_fail\n");
    let classes = kira_run_classifier::keywords::parse_class_keywords(KEYWORDS).unwrap();

    let classified = App::new(MockEutils)
        .classify_relation(relation, &["sample_attribute", "experiment_title"], &blacklist, &classes)
        .unwrap();

    assert_eq!(classified.excluded.len(), 1);
    assert_eq!(classified.classification.class("cancer").unwrap().len(), 3);
    assert_eq!(classified.schema.len(), 6);
}
