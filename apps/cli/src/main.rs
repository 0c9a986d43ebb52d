use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ideapress_core::{pipeline, render_pages, Config, HttpFetcher, Registry, RepoError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ideapress", version, about)]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(short, long, env = "IDEAPRESS_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve every plugin, update the registry file and render pages.
    Update {
        /// Skip rendering the content templates.
        #[arg(long)]
        no_render: bool,
    },
    /// Print the records in the current registry file.
    Show,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "ideapress=debug,ideapress_core=debug"
    } else {
        "ideapress=info,ideapress_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn update(config: &Config, no_render: bool) -> Result<()> {
    let fetch = HttpFetcher::new().context("creating HTTP client")?;
    let report = pipeline::run(config, &fetch).await?;
    for (id, change) in &report.changes {
        debug!(%id, ?change, "registry change");
    }

    let updated: Vec<&str> = report.updated_ids().collect();
    if updated.is_empty() {
        println!("registry unchanged ({} plugins)", report.plugins.len());
    } else {
        println!("updated: {}", updated.join(", "));
    }
    println!("wrote {}", config.repo_config.display());

    if !no_render {
        for page in render_pages(config, &report.plugins).context("rendering pages")? {
            println!("wrote {}", page.display());
        }
    }
    Ok(())
}

fn show(config: &Config) -> Result<()> {
    let registry = Registry::load(&config.repo_config)
        .with_context(|| format!("loading {}", config.repo_config.display()))?;
    debug!(records = registry.len(), "loaded registry");
    for record in registry.records() {
        println!("{} {} {}", record.id, record.version, record.source_url);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    info!(
        path = %cli.config.display(),
        user = %config.user,
        plugins = config.plugins.len(),
        "loaded config"
    );
    match cli.command {
        Command::Update { no_render } => update(&config, no_render).await,
        Command::Show => show(&config),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &anyhow::Error) {
    if let Some(RepoError::PartialResolutionFailure(failures)) = err.downcast_ref::<RepoError>() {
        eprintln!("error: {} plugin(s) failed, registry not written", failures.len());
        for failure in failures {
            eprintln!("  {failure}");
        }
        return;
    }
    eprintln!("error: {err:#}");
}
