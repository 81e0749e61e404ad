use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::auth::Token;
use crate::config::{Config, OutputFormat};
use crate::flakes::{FlakeCollector, IssueTextParser, LinkSummary};
use crate::logging::{self, Diagnostics};
use crate::output::{export_report, print_summary, PhaseProgress};
use crate::providers::{GitHubProvider, TestGridProvider};
use crate::status::StatusSnapshot;

#[derive(Parser)]
#[command(name = "flake-tracker")]
#[command(author, version, about = "Links reported flakes to TestGrid test results", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write the report to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Configuration file (defaults to ./flake-tracker.toml and friends)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Append logs to this file; `auto` picks a dated file name
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect a dashboard, link the board's reported flakes and report
    Collect(CollectArgs),

    /// Parse a saved issue body and print what would be linked
    Parse {
        /// File holding the issue body
        file: PathBuf,

        /// Host of the dashboard links in the body
        #[arg(long)]
        link_host: Option<String>,
    },

    /// Write the default configuration to a file
    Init {
        #[arg(default_value = "flake-tracker.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Args, Default)]
struct CollectArgs {
    /// TestGrid dashboard to collect
    #[arg(short, long)]
    dashboard: Option<String>,

    #[arg(long)]
    testgrid_url: Option<String>,

    #[arg(long)]
    github_url: Option<String>,

    #[arg(short, long, env = "GITHUB_AUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Project board holding the reported flakes
    #[arg(short, long)]
    board_id: Option<u64>,

    /// Only read these board columns (repeatable)
    #[arg(long = "column")]
    columns: Vec<u64>,

    /// Host of the dashboard links in issue bodies
    #[arg(long)]
    link_host: Option<String>,

    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

/// Command line flags layered over the configuration file.
#[derive(Debug)]
struct CollectSettings {
    dashboard: String,
    testgrid_url: String,
    github_url: String,
    token: Option<Token>,
    board_id: u64,
    columns: Vec<u64>,
    link_host: String,
    format: OutputFormat,
    pretty: bool,
}

impl CollectSettings {
    fn resolve(args: &CollectArgs, pretty: bool, config: Config) -> Self {
        Self {
            dashboard: args.dashboard.clone().unwrap_or(config.testgrid.dashboard),
            testgrid_url: args.testgrid_url.clone().unwrap_or(config.testgrid.base_url),
            github_url: args.github_url.clone().unwrap_or(config.github.base_url),
            token: args.token.clone().or(config.github.token).map(Token::from),
            board_id: args.board_id.unwrap_or(config.github.board_id),
            columns: if args.columns.is_empty() {
                config.github.columns
            } else {
                args.columns.clone()
            },
            link_host: args.link_host.clone().unwrap_or(config.issues.link_host),
            format: args.format.unwrap_or(config.output.format),
            pretty: pretty || config.output.pretty,
        }
    }
}

impl Cli {
    /// Log file requested on the command line, with `auto` resolved.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file.as_ref().map(|path| {
            if path.as_os_str() == "auto" {
                logging::default_log_file(Utc::now())
            } else {
                path.clone()
            }
        })
    }

    async fn collect(settings: &CollectSettings) -> Result<(StatusSnapshot, LinkSummary)> {
        let testgrid = TestGridProvider::new(&settings.testgrid_url)?;
        let github = GitHubProvider::new(&settings.github_url, settings.token.clone())?;
        let collector = FlakeCollector::new(
            &settings.link_host,
            Diagnostics::global("flake_tracker::flakes"),
        )?;

        let progress = PhaseProgress::start_phase_1(&settings.dashboard);
        let mut snapshot = testgrid
            .collect_status(&settings.dashboard)
            .await
            .inspect_err(|_| progress.abandon())
            .with_context(|| format!("Failed to collect dashboard {}", settings.dashboard))?;

        let progress = progress.finish_phase_1_start_phase_2(snapshot.job_count());
        let issues = github
            .collect_board_issues(settings.board_id, &settings.columns)
            .await
            .inspect_err(|_| progress.abandon())
            .with_context(|| format!("Failed to read project board {}", settings.board_id))?;

        let progress = progress.finish_phase_2_start_phase_3(issues.len());
        let links = collector.link_all(&mut snapshot, &issues);
        progress.finish_phase_3(links.links_appended);

        Ok((snapshot, links))
    }

    async fn execute_collect(&self, args: &CollectArgs) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let settings = CollectSettings::resolve(args, self.pretty, config);
        info!(
            "Collecting dashboard {} and board {}",
            settings.dashboard, settings.board_id
        );

        let (snapshot, links) = Self::collect(&settings).await?;

        if let Some(output_path) = &self.output {
            let mut file = std::fs::File::create(output_path)
                .with_context(|| format!("Failed to create {}", output_path.display()))?;
            export_report(&snapshot, &links, settings.format, settings.pretty, &mut file)?;
            info!("Report written to: {}", output_path.display());
        } else if settings.format == OutputFormat::Summary {
            print_summary(&snapshot, &links);
        } else {
            let mut stdout = std::io::stdout().lock();
            export_report(&snapshot, &links, settings.format, settings.pretty, &mut stdout)?;
            stdout.flush()?;
        }

        Ok(())
    }

    fn execute_parse(&self, file: &Path, link_host: Option<&str>) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let link_host = link_host.map_or(config.issues.link_host, str::to_string);

        let body = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read issue body: {}", file.display()))?;
        let parser = IssueTextParser::new(&link_host, Diagnostics::global("flake_tracker::parser"))?;
        let report = parser
            .parse(&body)
            .with_context(|| format!("{} is not a usable flake report", file.display()))?;

        let mut out: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(
                std::fs::File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?,
            ),
            None => Box::new(std::io::stdout().lock()),
        };
        writeln!(out, "dashboard: {}", report.dashboard)?;
        writeln!(out, "job: {}", report.job)?;
        writeln!(out, "tests:")?;
        for test in &report.tests {
            writeln!(out, "  - {test}")?;
        }
        out.flush()?;

        Ok(())
    }

    fn execute_init(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!("{} already exists, pass --force to overwrite it", path.display());
        }
        Config::default().save(path)?;
        info!("Default configuration written to: {}", path.display());
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Collect(args) => self.execute_collect(args).await,
            Commands::Parse { file, link_host } => self.execute_parse(file, link_host.as_deref()),
            Commands::Init { path, force } => Self::execute_init(path, *force),
        }
    }
}
