use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_run_classifier::access::{AccessClient, EutilsHttpClient, IdLookup, SummaryLookup};
use kira_run_classifier::app::{App, RunReport};
use kira_run_classifier::config::{ConfigLoader, RunArgs, RunConfig, Verbosity};
use kira_run_classifier::error::ClassifierError;
use kira_run_classifier::output::{HumanOutput, JsonOutput, LogSink, OutputMode};
use kira_run_classifier::relation::Relation;

#[derive(Parser)]
#[command(name = "kira-rc")]
#[command(about = "Classify SRA run metadata into keyword-defined classes")]
#[command(version, author)]
struct Cli {
    #[arg(short, long, action = ArgAction::Count, global = true, help = "Increase log verbosity")]
    verbose: u8,

    #[arg(long, global = true, help = "Print results as JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Filter, classify and report runs of an SRA relation export")]
    Classify(ClassifyArgs),
    #[command(about = "List the columns of an SRA relation export")]
    Columns(ColumnsArgs),
}

#[derive(Args)]
struct ClassifyArgs {
    #[arg(short, long, value_name = "TSV", help = "Tab-separated export of the SRA relation")]
    input: PathBuf,

    #[arg(short = 'o', long = "outputdir", value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    #[arg(short, long, value_name = "PATH", help = "Keywords that exclude a run, one per line")]
    blacklist: PathBuf,

    #[arg(
        short = 'k',
        long = "keyword-list",
        value_name = "JSON",
        help = "JSON object mapping each class to its keywords"
    )]
    keywords: PathBuf,

    #[arg(short = 'n', long, value_name = "KEY", help = "NCBI API key (falls back to NCBI_API_KEY)")]
    ncbi_api_key: Option<String>,

    #[arg(long, help = "Split classes into public and controlled-access runs")]
    get_access_status: bool,

    #[arg(long = "search-field", value_name = "COLUMN", help = "Column to search for keywords (repeatable)")]
    search_fields: Vec<String>,

    #[arg(long = "output-field", value_name = "COLUMN", help = "Column to write to sample tables (repeatable)")]
    output_fields: Vec<String>,

    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    #[arg(long, help = "Classify without writing reports")]
    dry_run: bool,
}

#[derive(Args)]
struct ColumnsArgs {
    input: PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ClassifierError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ClassifierError) -> u8 {
    match error {
        ClassifierError::MissingApiKey
        | ClassifierError::MissingInput(_)
        | ClassifierError::ConfigRead(_)
        | ClassifierError::ConfigParse(_)
        | ClassifierError::KeywordRead(_)
        | ClassifierError::KeywordParse(_) => 2,
        ClassifierError::EutilsHttp(_)
        | ClassifierError::EutilsStatus { .. }
        | ClassifierError::MalformedResponse(_) => 3,
        ClassifierError::MissingColumn(_)
        | ClassifierError::DuplicateColumn(_)
        | ClassifierError::EmptyRelation(_)
        | ClassifierError::RaggedRow { .. }
        | ClassifierError::RelationRead { .. } => 4,
        ClassifierError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Verbosity(cli.verbose).log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Classify(args) => {
            let config = ConfigLoader::resolve(RunArgs {
                input: args.input,
                output_dir: args.output_dir,
                blacklist: args.blacklist,
                keywords: args.keywords,
                config: args.config,
                search_fields: args.search_fields,
                output_fields: args.output_fields,
                ncbi_api_key: args.ncbi_api_key,
                get_access_status: args.get_access_status,
                dry_run: args.dry_run,
            })?;
            match &config.access {
                Some(access) => {
                    let client = EutilsHttpClient::new(&access.api_key)?;
                    run_classify(App::new(client), &config, output_mode)
                }
                None => run_classify(App::new(NopAccess), &config, output_mode),
            }
        }
        Commands::Columns(args) => {
            let relation = Relation::read(&args.input)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_columns(relation.schema(), relation.len()),
                OutputMode::Human => HumanOutput::print_columns(relation.schema(), relation.len()),
            }
            .into_diagnostic()
        }
    }
}

fn run_classify<A: AccessClient>(
    app: App<A>,
    config: &RunConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let report: RunReport = match output_mode {
        OutputMode::Json => app.run(config, &JsonOutput)?,
        OutputMode::Human => app.run(config, &LogSink)?,
    };
    match output_mode {
        OutputMode::Json => JsonOutput::print_run(&report),
        OutputMode::Human => HumanOutput::print_run(&report),
    }
    .into_diagnostic()
}

struct NopAccess;

impl AccessClient for NopAccess {
    fn resolve_id(&self, _accession: &str) -> Result<IdLookup, ClassifierError> {
        Err(ClassifierError::EutilsHttp(
            "E-utilities client not configured".to_string(),
        ))
    }

    fn fetch_summary(&self, _id: &str) -> Result<SummaryLookup, ClassifierError> {
        Err(ClassifierError::EutilsHttp(
            "E-utilities client not configured".to_string(),
        ))
    }
}
