use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use job_autoapply::answer::OpenAiAnswerProvider;
use job_autoapply::config::{AppConfig, EngineConfig};
use job_autoapply::documents::ResumeDirectory;
use job_autoapply::form::{fields_from_scan, Classifier, Partition};
use job_autoapply::jobs::{load_jobs, JobFilter};
use job_autoapply::profile::CandidateProfile;
use job_autoapply::submit::SubmissionConfig;
use job_autoapply::surface::FormSurface;
use job_autoapply::telemetry;
use job_autoapply::tracking::CsvTrackingStore;
use job_autoapply::{ApplicationRunner, Collaborators, Engine};

#[derive(Parser, Debug)]
#[command(
    name = "autoapply",
    about = "Fill and submit job applications, verifying every submission",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply to the jobs in the intake CSV
    Run(RunArgs),
    /// Print how the form at URL would be interpreted, without touching it
    Inspect {
        url: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Override the configured intake CSV
    #[arg(long)]
    jobs: Option<PathBuf>,
    /// Override the configured application cap
    #[arg(long)]
    max: Option<usize>,
    /// Show the browser window
    #[arg(long)]
    headed: bool,
    /// Fill every form but never click submit
    #[arg(long)]
    dry_run: bool,
    /// Attempt every job regardless of role and location keywords
    #[arg(long)]
    no_filter: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load().context("invalid configuration")?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Run(args) => {
            if args.headed {
                config.headless = false;
            }
            run(config, args).await
        }
        Command::Inspect { url } => inspect(config, &url).await,
    }
}

async fn run(config: AppConfig, args: RunArgs) -> anyhow::Result<()> {
    let Some(api_key) = config.provider.api_key.clone() else {
        bail!("OPENAI_API_KEY is not set");
    };
    let profile = CandidateProfile::load(&config.run.profile_path)
        .with_context(|| format!("loading profile {}", config.run.profile_path.display()))?;
    let jobs_csv = args.jobs.unwrap_or_else(|| config.run.jobs_csv.clone());
    let jobs = load_jobs(&jobs_csv).with_context(|| format!("loading jobs {}", jobs_csv.display()))?;
    info!(jobs = jobs.len(), source = %jobs_csv.display(), "jobs loaded");

    let provider = OpenAiAnswerProvider::new(&config.provider, api_key, &profile)?;
    let tracker = CsvTrackingStore::new(&config.run.applications_csv);
    let documents = ResumeDirectory::new(&config.run.resume_dir, config.run.default_resume.clone());

    let submission = SubmissionConfig {
        artifact_dir: config.run.artifact_dir.clone(),
        ..SubmissionConfig::default()
    };
    let engine_config = EngineConfig::default();
    let label_depth = engine_config.label_depth;
    let engine = Engine::new(engine_config, submission);
    let deps = Collaborators {
        profile: &profile,
        provider: &provider,
        tracker: &tracker,
        documents: &documents,
    };
    let mut runner = ApplicationRunner::new(engine, deps, args.max.unwrap_or(config.run.max_applications))
        .dry_run(args.dry_run);
    if !args.no_filter {
        runner = runner.with_filter(JobFilter::default());
    }

    let browser = config.browser_builder().build().await?;
    let page = browser.open_page().await?.with_label_depth(label_depth);
    let summary = runner.run(&page, jobs).await;
    browser.close().await?;

    println!("{}", serde_json::to_string_pretty(&summary?)?);
    Ok(())
}

async fn inspect(config: AppConfig, url: &str) -> anyhow::Result<()> {
    let engine = EngineConfig::default();
    let browser = config.browser_builder().build().await?;
    let page = browser.open_page().await?.with_label_depth(engine.label_depth);
    page.navigate(url).await?;

    let fields = fields_from_scan(page.scan().await?, engine.label_depth);
    let partition = Partition::build(fields, &Classifier::default());
    let validation = page.read_validation_state().await?;
    browser.close().await?;

    let report = serde_json::json!({
        "url": url,
        "fields": partition.len(),
        "partition": partition,
        "validation_errors": validation,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
