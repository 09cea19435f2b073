//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use drivesite_core::pipeline::{self, ProgressReporter, RunContext, RunReport};
use drivesite_remote::DriveClient;
use drivesite_shared::{
    AppConfig, SiteConfig, init_config, load_config, load_config_from, load_drive_inputs,
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// drivesite: turn a cloud folder of documents into a crosslinked static site.
#[derive(Parser)]
#[command(
    name = "drivesite",
    version,
    about = "Pull documents from Drive folders and publish them as a crosslinked static site.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.drivesite/drivesite.toml).
    #[arg(long, global = true, env = "DRIVESITE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch new documents, then rebuild the index and footers.
    Run {
        /// Output directory for the site.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Maximum documents to convert in this run.
        #[arg(long)]
        max_items: Option<usize>,

        /// Ignore the listing cache and re-list every folder.
        #[arg(long)]
        refresh: bool,
    },

    /// Rebuild the index and footers from local documents only.
    Rebuild {
        /// Output directory for the site.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show processed items, remaining keywords and cache age.
    Status {
        /// Output directory for the site.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "drivesite=info",
        1 => "drivesite=debug",
        _ => "drivesite=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so the summary on stdout stays clean.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            out,
            max_items,
            refresh,
        } => cmd_run(config_path, out, max_items, refresh).await,
        Command::Rebuild { out } => cmd_rebuild(config_path, out),
        Command::Status { out } => cmd_status(config_path, out),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    out: Option<PathBuf>,
    max_items: Option<usize>,
    refresh: bool,
) -> Result<()> {
    // Everything that can be misconfigured is checked before any I/O.
    let app = resolve_config(config_path)?;
    let mut config = SiteConfig::from_app(&app, out);
    if let Some(max_items) = max_items {
        config.max_items = max_items;
    }
    config.force_refresh = refresh;
    config.validate()?;

    let inputs = load_drive_inputs(&app.drive)?;
    let store = DriveClient::new(&app.drive, &inputs.credentials)?;

    info!(
        out = %config.output_dir.display(),
        folders = inputs.folder_ids.len(),
        max_items = config.max_items,
        refresh,
        "starting drivesite run"
    );

    let ctx = RunContext {
        config: &config,
        folder_ids: &inputs.folder_ids,
        store: &store,
    };
    let mut rng = StdRng::from_entropy();
    let reporter = CliProgress::new();

    let report = pipeline::run(&ctx, &mut rng, &reporter).await?;
    print_run_summary(&config, &report);

    Ok(())
}

fn cmd_rebuild(config_path: Option<&Path>, out: Option<PathBuf>) -> Result<()> {
    let app = resolve_config(config_path)?;
    let config = SiteConfig::from_app(&app, out);
    config.validate()?;

    let mut rng = StdRng::from_entropy();
    let report = pipeline::rebuild_site(&config, &mut rng)?;

    println!();
    println!("  Site rebuilt.");
    println!("  Documents: {}", report.documents);
    println!("  Links:     {}", report.footers.links);
    if !report.footers.failed.is_empty() {
        println!("  Failed:    {}", report.footers.failed.len());
    }
    println!("  Index:     {}", config.output_dir.join("index.html").display());
    println!();

    Ok(())
}

fn cmd_status(config_path: Option<&Path>, out: Option<PathBuf>) -> Result<()> {
    let app = resolve_config(config_path)?;
    let config = SiteConfig::from_app(&app, out);
    let status = pipeline::site_status(&config)?;

    println!();
    println!("  Output:    {}", config.output_dir.display());
    println!("  Documents: {}", status.documents);
    println!("  Processed: {}", status.processed);
    println!("  Keywords:  {}", status.keywords_remaining);
    match status.cache {
        Some((age, items, folders)) => {
            let state = if age < config.cache_ttl { "fresh" } else { "expired" };
            println!(
                "  Cache:     {items} items from {} folder(s), {}h{:02}m old ({state})",
                folders.len(),
                age.num_hours(),
                age.num_minutes() % 60
            );
        }
        None => println!("  Cache:     none"),
    }
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_run_summary(config: &SiteConfig, report: &RunReport) {
    println!();
    if report.written.is_empty() {
        println!("  Nothing new to convert; site rebuilt.");
    } else {
        println!("  Run complete.");
    }
    println!("  Run:         {}", report.run_id);
    println!(
        "  Listed:      {}{}",
        report.listed,
        if report.from_cache { " (cached)" } else { "" }
    );
    if !report.folders_failed.is_empty() {
        println!("  Folders failed: {}", report.folders_failed.join(", "));
    }
    println!("  Candidates:  {}", report.candidates);
    println!(
        "  Written:     {} ({} reprocessed)",
        report.written.len(),
        report.reprocessed
    );
    for item in &report.skipped {
        println!("  Skipped:     {} ({}): {}", item.name, item.id, item.error);
    }
    println!("  Documents:   {}", report.site.documents);
    println!("  Keywords:    {} left", report.keywords_remaining);
    println!("  Output:      {}", config.output_dir.display());
    println!("  Time:        {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_done(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Converting [{current}/{total}] {name}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "drivesite", "-vv", "run", "--out", "site", "--max-items", "5", "--refresh",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run {
                out,
                max_items,
                refresh,
            } => {
                assert_eq!(out, Some(PathBuf::from("site")));
                assert_eq!(max_items, Some(5));
                assert!(refresh);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let path = std::env::temp_dir().join("drivesite-absent-config.toml");
        assert!(resolve_config(Some(&path)).is_err());
    }
}
