use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use insightify_console::api::{AnalyticsApi, AnalyticsHttpClient};
use insightify_console::config::ConfigLoader;
use insightify_console::domain::Domain;
use insightify_console::error::ConsoleError;
use insightify_console::output::{render_dashboard, JsonOutput, OutputMode};
use insightify_console::session::DashboardSession;
use insightify_console::upload::UploadTracker;
use insightify_console::view::assemble;

#[derive(Parser)]
#[command(name = "insightify")]
#[command(about = "Console for the Insightify unified business-analytics backend")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Load KPIs and trend previews for every domain")]
    Dashboard,
    #[command(about = "Upload a CSV dataset for a domain")]
    Upload(UploadArgs),
    #[command(about = "Cluster analysis for the selected (or given) domain")]
    Segmentation(SegmentationArgs),
    #[command(about = "Generated insights for the selected (or given) domain")]
    Insights(InsightsArgs),
    #[command(about = "Summary statistics for a domain")]
    Stats(StatsArgs),
    #[command(about = "Obtain an access token from the backend")]
    Login(LoginArgs),
}

#[derive(Args)]
struct UploadArgs {
    domain: Domain,
    file: PathBuf,
}

#[derive(Args)]
struct SegmentationArgs {
    #[arg(long)]
    domain: Option<Domain>,

    #[arg(long)]
    clusters: Option<u32>,
}

#[derive(Args)]
struct InsightsArgs {
    #[arg(long)]
    domain: Option<Domain>,
}

#[derive(Args)]
struct StatsArgs {
    domain: Domain,
}

#[derive(Args)]
struct LoginArgs {
    username: String,

    #[arg(long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ConsoleError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ConsoleError) -> u8 {
    match error {
        ConsoleError::DataUnavailable { .. }
        | ConsoleError::NoDomainAvailable
        | ConsoleError::MissingConfig => 2,
        ConsoleError::ApiHttp(_)
        | ConsoleError::ApiStatus { .. }
        | ConsoleError::UploadFailed { .. }
        | ConsoleError::AuthFailed(_) => 3,
        _ => 1,
    }
}

async fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let client = AnalyticsHttpClient::new(&config)?;

    match cli.command {
        Commands::Dashboard => {
            let session = DashboardSession::new(client, config.n_clusters, config.priority.clone());
            let data = session.load().await;
            let view = assemble(&data, &config.currency_prefix);
            match output_mode {
                OutputMode::Interactive => print!("{}", render_dashboard(&view)),
                OutputMode::NonInteractive => JsonOutput::print_dashboard(&view).into_diagnostic()?,
            }
        }
        Commands::Upload(args) => {
            let tracker = UploadTracker::new(Arc::new(client));
            let handle = tracker.start_upload(args.domain, args.file);
            let mut progress = handle.progress.clone();

            let ticker = matches!(output_mode, OutputMode::Interactive).then(|| {
                let domain = handle.domain;
                tokio::spawn(async move {
                    while progress.changed().await.is_ok() {
                        let pct = *progress.borrow_and_update();
                        eprintln!("uploading {domain}: {pct}%");
                    }
                })
            });

            let result = handle.wait().await;
            if let Some(ticker) = ticker {
                ticker.abort();
            }

            let status = tracker.status(args.domain);
            match &result {
                Ok(summary) => match output_mode {
                    OutputMode::Interactive => println!(
                        "uploaded {} ({} rows, {} columns)",
                        summary.filename,
                        summary.rows,
                        summary.columns.len()
                    ),
                    OutputMode::NonInteractive => {
                        JsonOutput::print_upload(&status, Some(summary)).into_diagnostic()?
                    }
                },
                Err(_) => {
                    if matches!(output_mode, OutputMode::NonInteractive) {
                        JsonOutput::print_upload(&status, None).into_diagnostic()?;
                    }
                }
            }
            result?;
        }
        Commands::Segmentation(args) => {
            let n_clusters = args.clusters.unwrap_or(config.n_clusters);
            let session = DashboardSession::new(client, n_clusters, config.priority.clone());
            let domain = resolve_target(&session, args.domain).await?;
            let segmentation = session.segmentation(domain).await?;
            JsonOutput::print_segmentation(&segmentation).into_diagnostic()?;
        }
        Commands::Insights(args) => {
            let session = DashboardSession::new(client, config.n_clusters, config.priority.clone());
            let domain = resolve_target(&session, args.domain).await?;
            let insights = session.insights(domain).await?;
            JsonOutput::print_insights(&insights).into_diagnostic()?;
        }
        Commands::Stats(args) => {
            let stats = client.fetch_stats(args.domain).await?;
            JsonOutput::print_stats(&stats).into_diagnostic()?;
        }
        Commands::Login(args) => {
            let password = match args.password {
                Some(password) => password,
                None => read_password()?,
            };
            let session = client.login(&args.username, &password).await?;
            JsonOutput::print_login(&session).into_diagnostic()?;
        }
    }

    Ok(())
}

/// The cross-cutting commands act on exactly one domain: the one given
/// explicitly, or the first available one in configured priority order.
async fn resolve_target<A: AnalyticsApi>(
    session: &DashboardSession<A>,
    explicit: Option<Domain>,
) -> Result<Domain, ConsoleError> {
    if let Some(domain) = explicit {
        return Ok(domain);
    }
    session
        .probe_selection()
        .await
        .ok_or(ConsoleError::NoDomainAvailable)
}

fn read_password() -> miette::Result<String> {
    if std::io::stdin().is_terminal() {
        eprint!("password: ");
    }
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).into_diagnostic()?;
    Ok(line.trim_end().to_string())
}
