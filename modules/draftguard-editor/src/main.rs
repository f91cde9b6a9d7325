use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use draftguard_common::{load_config, parse_catalog, CandidateSource, EditorialConfig, Secrets};
use draftguard_editor::checks::reachability::HttpProber;
use draftguard_editor::corpus::{load_published, PublishedDocument};
use draftguard_editor::notify::{NoopBackend, Notice, NoticeKind, NotifyBackend, NotifyRouter};
use draftguard_editor::pipeline::{DraftPipeline, PipelineOutcome, RunInput};
use draftguard_editor::prompt::{build_prompt, PromptContext};
use draftguard_editor::report::DiagnosticReport;
use draftguard_editor::sleep::TokioSleeper;

#[derive(Parser)]
#[command(name = "draftguard", about = "Reference reconciliation and quality guards for generated drafts")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile, verify and guard an existing draft.
    Verify {
        #[arg(long)]
        draft: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Generate a draft, then reconcile, verify and guard it.
    Generate {
        /// Prompt file; built from the catalog when omitted.
        #[arg(long)]
        prompt: Option<PathBuf>,
        /// Author keywords included in a built prompt.
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// JSON array of candidate sources.
    #[arg(long)]
    catalog: PathBuf,
    /// Directory of published `*.mdx` posts.
    #[arg(long)]
    published: PathBuf,
    /// Publish even when guards fail.
    #[arg(long)]
    force: bool,
    /// Where to write the repaired draft; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Where to write the report as JSON.
    #[arg(long)]
    report_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("draftguard=info".parse()?))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EditorialConfig::default(),
    };
    let secrets = Secrets::from_env();
    secrets.log_redacted();

    let notifier: Box<dyn NotifyBackend> = match NotifyRouter::from_secrets(&secrets) {
        Some(router) => {
            info!("Slack notifications enabled");
            Box::new(router)
        }
        None => {
            info!("No SLACK_WEBHOOK_URL set, notifications disabled");
            Box::new(NoopBackend)
        }
    };

    let prober = HttpProber::new(Duration::from_secs(config.guards.link_timeout_seconds))?;
    let sleeper = TokioSleeper;
    let pipeline = DraftPipeline::new(&config, &prober, &sleeper);

    let (outcome, run) = match &cli.command {
        Command::Verify { draft, run } => {
            let raw = std::fs::read_to_string(draft)
                .with_context(|| format!("Failed to read draft: {}", draft.display()))?;
            let (catalog, published) = load_inputs(run)?;
            let input = RunInput {
                catalog: &catalog,
                published: &published,
                force: run.force,
            };
            (pipeline.verify(&raw, &input).await, run)
        }
        Command::Generate {
            prompt,
            keywords,
            run,
        } => {
            let generator = OpenAi::from_env(config.llm.model.clone())
                .context("OPENAI_API_KEY is required for generate")?;

            let (catalog, published) = load_inputs(run)?;
            let prompt = match prompt {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read prompt: {}", path.display()))?,
                None => {
                    let today = Utc::now().format("%Y-%m-%d").to_string();
                    build_prompt(&PromptContext {
                        site_title: &config.site.title,
                        today: &today,
                        keywords,
                        sources: &catalog,
                        content: &config.content,
                        min_links: config.guards.min_reference_links,
                    })
                }
            };

            let input = RunInput {
                catalog: &catalog,
                published: &published,
                force: run.force,
            };
            match pipeline.generate(&generator, &prompt, &input).await {
                Ok(outcome) => (outcome, run),
                Err(failure) => {
                    info!("{}", failure.report.summary_text());
                    write_report_json(run.report_json.as_deref(), &failure.report)?;
                    let notice =
                        Notice::from_report(NoticeKind::Failed, "Draft generation failed", &failure.report);
                    notifier.send(&notice).await?;
                    return Err(failure.error.into());
                }
            }
        }
    };

    finish(outcome, run, notifier.as_ref()).await
}

fn load_inputs(run: &RunArgs) -> Result<(Vec<CandidateSource>, Vec<PublishedDocument>)> {
    let json = std::fs::read_to_string(&run.catalog)
        .with_context(|| format!("Failed to read catalog: {}", run.catalog.display()))?;
    let catalog = parse_catalog(&json)?;
    info!(sources = catalog.len(), "Loaded catalog");

    let published = load_published(&run.published)?;
    Ok((catalog, published))
}

fn write_report_json(path: Option<&Path>, report: &DiagnosticReport) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    std::fs::write(path, serde_json::to_string_pretty(&report.table())?)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    info!(path = %path.display(), "Report saved");
    Ok(())
}

async fn finish(outcome: PipelineOutcome, run: &RunArgs, notifier: &dyn NotifyBackend) -> Result<()> {
    info!("{}", outcome.report.summary_text());
    write_report_json(run.report_json.as_deref(), &outcome.report)?;

    match &run.output {
        Some(path) => {
            std::fs::write(path, outcome.document())
                .with_context(|| format!("Failed to write draft: {}", path.display()))?;
            info!(path = %path.display(), "Draft saved");
        }
        None => print!("{}", outcome.document()),
    }

    let (kind, headline) = if outcome.publishable {
        (NoticeKind::Ready, format!("Draft ready ({} references)", outcome.kept))
    } else {
        (NoticeKind::Blocked, "Draft blocked by quality guards".to_string())
    };
    notifier
        .send(&Notice::from_report(kind, headline, &outcome.report))
        .await?;

    if !outcome.publishable {
        for guard in outcome.guards.iter().filter(|g| !g.passed) {
            warn!(guard = guard.name.as_str(), detail = guard.detail.as_str(), "Blocking guard");
        }
        bail!("Publication blocked by failed quality guards (use --force to override)");
    }
    Ok(())
}
