use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::future::join_all;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Token;
use crate::config::{Config, OutputFormat};
use crate::console::{LogOutputTransformer, Node};
use crate::error::ConsoleError;
use crate::output::{export_console, export_consoles, terminal, FoldedConsole, WatchProgress};
use crate::poller::PollerRegistry;
use crate::server::{links, BuildingInfo, ConsoleCache, GoClient, JobLocator};

const MIN_INTERVAL_MS: u64 = 100;

/// Polls skipped after the server reports an internal error.
const SERVER_ERROR_BACKOFF: u32 = 3;

#[derive(Parser)]
#[command(name = "consolefold")]
#[command(author, version, about = "CI Console Folding Tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format [default: text]
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Show the bodies of collapsed sections
    #[arg(short, long, global = true, default_value_t = false)]
    expand_all: bool,

    /// Configuration file (defaults to ./consolefold.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Do not read or write the console cache
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold a console log read from a file or stdin
    Render {
        /// Log file, `-` or nothing for stdin
        file: Option<PathBuf>,

        /// Title of the rendered document
        #[arg(long)]
        title: Option<String>,
    },
    /// Fetch and fold the consoles of one or more jobs
    Fetch {
        /// Jobs as pipeline/counter/stage/counter/job
        #[arg(required = true)]
        locators: Vec<JobLocator>,

        #[command(flatten)]
        server: ServerArgs,
    },
    /// Follow a running job's console until it completes
    Watch {
        locator: JobLocator,

        #[command(flatten)]
        server: ServerArgs,

        /// Delay between polls in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },
    /// Write a configuration file with default values
    Init {
        #[arg(default_value = "consolefold.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Args)]
struct ServerArgs {
    #[arg(short, long, env = "CONSOLEFOLD_URL")]
    url: Option<String>,

    #[arg(short, long, env = "CONSOLEFOLD_TOKEN")]
    token: Option<String>,
}

/// Effective settings after merging flags over the configuration file.
struct Settings {
    format: OutputFormat,
    pretty: bool,
    expand_all: bool,
    cache: bool,
    base_url: String,
    token: Option<Token>,
    interval: Duration,
}

impl Cli {
    fn settings(&self, config: Config, server: Option<&ServerArgs>, interval_ms: Option<u64>) -> Settings {
        let url = server.and_then(|s| s.url.clone());
        let token = server.and_then(|s| s.token.clone()).or(config.server.token);
        let interval_ms = interval_ms.unwrap_or(config.poll.interval_ms).max(MIN_INTERVAL_MS);

        Settings {
            format: self.format.unwrap_or(config.output.format),
            pretty: self.pretty || config.output.pretty,
            expand_all: self.expand_all || config.output.expand_all,
            cache: !self.no_cache && config.cache.enabled,
            base_url: url.unwrap_or(config.server.base_url),
            token: token.map(Token::from),
            interval: Duration::from_millis(interval_ms),
        }
    }

    fn open_output(&self) -> Result<Box<dyn Write>> {
        match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                Ok(Box::new(BufWriter::new(file)))
            }
            None => Ok(Box::new(io::stdout().lock())),
        }
    }

    fn write_nodes(&self, source: &str, nodes: &[Node], settings: &Settings, output: &mut dyn Write) -> Result<()> {
        export_console(
            source,
            nodes,
            settings.format,
            settings.pretty,
            settings.expand_all,
            output,
        )?;
        output.flush()?;
        Ok(())
    }

    fn finish_output(&self) {
        if let Some(path) = &self.output {
            info!("Console written to: {}", path.display());
        }
    }

    async fn execute_render(&self, file: Option<&Path>, title: Option<&str>, settings: &Settings) -> Result<()> {
        let (source, nodes) = match file.filter(|path| path.as_os_str() != "-") {
            Some(path) => {
                info!("Folding console log: {}", path.display());
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read log file: {}", path.display()))?;
                (path.display().to_string(), LogOutputTransformer::transform(contents.lines()))
            }
            None => {
                info!("Folding console log from stdin");
                let mut contents = String::new();
                io::stdin()
                    .read_to_string(&mut contents)
                    .context("Failed to read log from stdin")?;
                let mut transformer = LogOutputTransformer::new();
                transformer.push_chunk(&contents);
                ("stdin".to_string(), transformer.finish())
            }
        };

        let source = title.map_or(source, str::to_string);
        let mut output = self.open_output()?;
        self.write_nodes(&source, &nodes, settings, &mut output)?;
        self.finish_output();
        Ok(())
    }

    async fn execute_fetch(&self, locators: &[JobLocator], settings: &Settings) -> Result<()> {
        info!("Fetching {} job console(s) from {}", locators.len(), settings.base_url);

        let client = GoClient::new(&settings.base_url, settings.token.clone())?;
        let cache = ConsoleCache::new(settings.cache)?;

        let results = join_all(
            locators
                .iter()
                .map(|locator| fetch_job_console(&client, &cache, locator)),
        )
        .await;

        let mut fetched = Vec::new();
        let mut failed = 0;
        for (locator, result) in locators.iter().zip(results) {
            match result {
                Ok(lines) => {
                    let source = links::job_details_url(client.base_url(), locator)?;
                    fetched.push((source.to_string(), LogOutputTransformer::transform(&lines)));
                }
                Err(e) => {
                    warn!("{locator}: {e}");
                    eprintln!("{locator}: {}", e.flash_message());
                    failed += 1;
                }
            }
        }

        if !fetched.is_empty() {
            let consoles: Vec<_> = fetched
                .iter()
                .map(|(source, nodes)| FoldedConsole::new(source, nodes))
                .collect();
            let mut output = self.open_output()?;
            export_consoles(
                &consoles,
                settings.format,
                settings.pretty,
                settings.expand_all,
                &mut output,
            )?;
            output.flush()?;
        }

        self.finish_output();
        if failed > 0 {
            bail!("{failed} of {} job console(s) could not be fetched", locators.len());
        }
        Ok(())
    }

    async fn execute_watch(&self, locator: &JobLocator, settings: &Settings) -> Result<()> {
        let client = GoClient::new(&settings.base_url, settings.token.clone())?;
        let cache = ConsoleCache::new(settings.cache)?;
        let source = links::job_details_url(client.base_url(), locator)?;

        if let Some((lines, result)) = cache.get(locator) {
            info!("{locator} already completed ({result}), using cached console");
            let nodes = LogOutputTransformer::transform(&lines);
            let mut output = self.open_output()?;
            self.write_nodes(source.as_str(), &nodes, settings, &mut output)?;
            self.finish_output();
            return Ok(());
        }

        let registry = PollerRegistry::new();
        let mut poller = registry.register(locator.to_string(), settings.interval);
        info!("Watching {} every {:?}", poller.name(), settings.interval);
        debug!("Active pollers: {:?}", registry.active());

        let stopper = registry.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stopper.stop_all();
            }
        });

        // Text to stdout is streamed section by section as sections close.
        let streaming = settings.format == OutputFormat::Text && self.output.is_none();
        let progress = WatchProgress::start(&locator.to_string());
        let mut transformer = LogOutputTransformer::new();
        let mut raw_lines = Vec::new();
        let mut printed = 0;
        let mut completed_status = None;

        while poller.next_tick().await {
            match poll_console(&client, locator, &mut transformer, &mut raw_lines).await {
                Ok(status) => {
                    let section = transformer
                        .current()
                        .map_or(String::new(), |s| format!(", in {} section", s.kind()));
                    progress.update(
                        transformer.lines_seen(),
                        &format!("{}{section}", status.current_status.to_lowercase()),
                    );

                    if streaming {
                        let completed = transformer.completed();
                        if completed.len() > printed {
                            let text = terminal::render_console(&completed[printed..], settings.expand_all)?;
                            progress.suspend(|| print!("{text}"));
                            printed = completed.len();
                        }
                    }

                    if status.is_completed() {
                        completed_status = Some(status);
                        registry.stop_all();
                    }
                }
                Err(e) if e.is_fatal() => {
                    progress.abandon(&e.flash_message());
                    return Err(e).with_context(|| format!("Stopped watching {locator}"));
                }
                Err(e) => {
                    progress.suspend(|| warn!("{locator}: {}", e.flash_message()));
                    if matches!(e, ConsoleError::Server { .. }) && !registry.is_paused() {
                        back_off(&registry, settings.interval * SERVER_ERROR_BACKOFF);
                        progress.paused();
                    }
                }
            }
        }
        drop(poller);

        let nodes = match &completed_status {
            Some(status) => {
                if let Err(e) = cache.store(locator, status, &raw_lines) {
                    warn!("Failed to cache console of {locator}: {e}");
                }
                progress.finish(transformer.lines_seen(), &status.result);
                transformer.finish()
            }
            None => {
                progress.abandon("Watch interrupted");
                transformer.snapshot()
            }
        };

        if streaming {
            let remaining = nodes.get(printed..).unwrap_or_default();
            print!("{}", terminal::render_console(remaining, settings.expand_all)?);
            return Ok(());
        }

        let mut output = self.open_output()?;
        self.write_nodes(source.as_str(), &nodes, settings, &mut output)?;
        self.finish_output();
        Ok(())
    }

    fn execute_init(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!("{} already exists, use --force to overwrite it", path.display());
        }
        Config::default().save(path)?;
        info!("Configuration written to: {}", path.display());
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        if let Commands::Init { path, force } = &self.command {
            return self.execute_init(path, *force);
        }

        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Render { file, title } => {
                let settings = self.settings(config, None, None);
                self.execute_render(file.as_deref(), title.as_deref(), &settings)
                    .await
            }
            Commands::Fetch { locators, server } => {
                let settings = self.settings(config, Some(server), None);
                self.execute_fetch(locators, &settings).await
            }
            Commands::Watch {
                locator,
                server,
                interval_ms,
            } => {
                let settings = self.settings(config, Some(server), *interval_ms);
                self.execute_watch(locator, &settings).await
            }
            Commands::Init { .. } => Ok(()),
        }
    }
}

/// Fetches a job's full console, from the cache when the job has completed.
async fn fetch_job_console(
    client: &GoClient,
    cache: &ConsoleCache,
    locator: &JobLocator,
) -> Result<Vec<String>, ConsoleError> {
    if let Some((lines, result)) = cache.get(locator) {
        info!("Using cached console of {locator} ({result})");
        return Ok(lines);
    }

    // Status first: if the job was already complete, the console is too.
    let status = client.fetch_job_status(locator).await?;
    let chunk = client.fetch_console(locator, 0).await?;
    info!(
        "Fetched {} lines of {locator}, job is {}",
        chunk.lines.len(),
        status.current_status
    );

    if let Err(e) = cache.store(locator, &status, &chunk.lines) {
        warn!("Failed to cache console of {locator}: {e}");
    }
    Ok(chunk.lines)
}

/// Runs one poll: appends new console lines and returns the job status.
async fn poll_console(
    client: &GoClient,
    locator: &JobLocator,
    transformer: &mut LogOutputTransformer,
    raw_lines: &mut Vec<String>,
) -> Result<BuildingInfo, ConsoleError> {
    let status = client.fetch_job_status(locator).await?;
    let chunk = client.fetch_console(locator, transformer.lines_seen()).await?;

    for line in &chunk.lines {
        transformer.push_line(line);
    }
    debug!(
        "{locator}: status {}, next poll from line {}",
        status.current_status,
        chunk.next_line()
    );
    if let Some(agent) = &status.agent {
        debug!("{locator} is running on {agent}");
    }
    raw_lines.extend(chunk.lines);
    Ok(status)
}

/// Pauses every poller of `registry` for `delay`.
fn back_off(registry: &PollerRegistry, delay: Duration) {
    registry.pause_all();
    let registry = registry.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        registry.resume_all();
    });
}
