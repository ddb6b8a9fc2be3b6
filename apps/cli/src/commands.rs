//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write as _};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use chatdesk_client::{AdminClient, UploadFile, WidgetClient};
use chatdesk_ingest::Ingestor;
use chatdesk_session::SessionManager;
use chatdesk_shared::{
    AppConfig, Department, DepartmentDirectory, SessionState, init_config, load_config,
    resolve_credential,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// chatdesk — support chat sessions and knowledge-base administration.
#[derive(Parser)]
#[command(
    name = "chatdesk",
    version,
    about = "Chat with the support backend and administer department knowledge bases.",
    long_about = None,
)]
pub(crate) struct Cli {
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
    /// Start an interactive visitor chat session.
    Chat,

    /// Department administration.
    Dept {
        /// Department subcommand.
        #[command(subcommand)]
        action: DeptAction,
    },

    /// Stage scraped pages and uploaded documents, review, and commit them
    /// into a department's knowledge base.
    Ingest {
        /// Target department name.
        #[arg(long)]
        dept: String,

        /// Newline/comma-delimited URL list to scrape.
        #[arg(long)]
        urls: Option<String>,

        /// Document files to upload for text extraction.
        #[arg(long)]
        files: Vec<PathBuf>,

        /// Staged item indexes to drop before committing (repeatable).
        #[arg(long = "drop")]
        drops: Vec<usize>,

        /// Review only: stage and list, but do not commit.
        #[arg(long)]
        dry_run: bool,
    },

    /// List the provenance sources recorded in a department's knowledge base.
    Sources {
        /// Department name.
        #[arg(long)]
        dept: String,
    },

    /// Probe whether the backend is reachable.
    Health,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Department CRUD subcommands.
#[derive(Subcommand)]
pub(crate) enum DeptAction {
    /// List all departments.
    List,
    /// Create a department.
    Create {
        /// Department name (e.g. SALES).
        #[arg(long)]
        name: String,
        /// Comma-separated routing keywords.
        #[arg(long, default_value = "")]
        keywords: String,
        /// Fallback response text.
        #[arg(long, default_value = "")]
        canned_response: String,
        /// Alert email recipient.
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Update a department's routing fields.
    Update {
        /// Department id.
        #[arg(long)]
        id: i64,
        /// New name.
        #[arg(long)]
        name: Option<String>,
        /// New comma-separated keywords.
        #[arg(long)]
        keywords: Option<String>,
        /// New fallback response.
        #[arg(long)]
        canned_response: Option<String>,
        /// New alert email recipient.
        #[arg(long)]
        email: Option<String>,
    },
    /// Delete a department by id.
    Delete {
        /// Department id.
        id: i64,
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
        0 => "chatdesk=info",
        1 => "chatdesk=debug",
        _ => "chatdesk=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Chat => cmd_chat().await,
        Command::Dept { action } => match action {
            DeptAction::List => cmd_dept_list().await,
            DeptAction::Create {
                name,
                keywords,
                canned_response,
                email,
            } => cmd_dept_create(&name, &keywords, &canned_response, &email).await,
            DeptAction::Update {
                id,
                name,
                keywords,
                canned_response,
                email,
            } => {
                cmd_dept_update(
                    id,
                    name.as_deref(),
                    keywords.as_deref(),
                    canned_response.as_deref(),
                    email.as_deref(),
                )
                .await
            }
            DeptAction::Delete { id } => cmd_dept_delete(id).await,
        },
        Command::Ingest {
            dept,
            urls,
            files,
            drops,
            dry_run,
        } => cmd_ingest(&dept, urls.as_deref(), &files, &drops, dry_run).await,
        Command::Sources { dept } => cmd_sources(&dept).await,
        Command::Health => cmd_health().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Client construction
// ---------------------------------------------------------------------------

fn admin_client(config: &AppConfig) -> Result<AdminClient> {
    let token = resolve_credential(&config.backend.bearer_token_env)?;
    let timeout = config.ingestion.timeout_secs.map(Duration::from_secs);
    Ok(AdminClient::new(&config.backend.base_url, token, timeout)?)
}

fn widget_client(config: &AppConfig) -> Result<WidgetClient> {
    let api_key = resolve_credential(&config.backend.api_key_env)?;
    Ok(WidgetClient::new(&config.backend.base_url, api_key)?)
}

/// Fetch the department directory from the store; fall back to the reserved
/// GENERAL-only directory when the admin credential or listing is missing.
async fn load_directory(config: &AppConfig) -> DepartmentDirectory {
    match admin_client(config) {
        Ok(client) => match client.list_departments().await {
            Ok(listing) => DepartmentDirectory::from_store(&listing),
            Err(e) => {
                warn!(error = %e, "department listing failed, using GENERAL only");
                DepartmentDirectory::default()
            }
        },
        Err(e) => {
            warn!(error = %e, "no admin credential, using GENERAL only");
            DepartmentDirectory::default()
        }
    }
}

async fn find_department(client: &AdminClient, name: &str) -> Result<Department> {
    let listing = client.list_departments().await?;
    listing
        .into_iter()
        .find(|d| d.name == name)
        .ok_or_else(|| eyre!("no department named '{name}'; try `chatdesk dept list`"))
}

// ---------------------------------------------------------------------------
// chat
// ---------------------------------------------------------------------------

async fn cmd_chat() -> Result<()> {
    let config = load_config()?;
    let widget = widget_client(&config)?;
    let directory = load_directory(&config).await;

    let mut manager = SessionManager::connect(
        Arc::new(widget),
        directory,
        Duration::from_millis(config.session.greeting_delay_ms),
    );

    println!("Connected. Session {}", manager.session().session_id);
    println!("Departments: {}", manager.directory().names().join(", "));
    println!("Commands: /dept <NAME>, /menu, /quit");
    println!();

    let stdin = std::io::stdin();
    loop {
        print!("[{}] > ", manager.state());
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        if line.is_empty() {
            continue;
        } else if line == "/quit" {
            break;
        } else if line == "/menu" {
            manager.reset_to_menu();
            println!("Back at the department menu.");
        } else if let Some(name) = line.strip_prefix("/dept ") {
            match manager.select_department(name.trim()).await {
                Ok(()) => {
                    if let Some(entry) = manager.log().last() {
                        println!("bot: {}", entry.text);
                    }
                }
                Err(e) => println!("{e}"),
            }
        } else {
            let before = manager.state().clone();
            manager.send_message(line).await?;
            if let Some(entry) = manager.log().last() {
                println!("bot: {}", entry.text);
            }
            // Surface backend-driven transfers to the visitor
            if *manager.state() != before {
                if let SessionState::Department(name) = manager.state() {
                    println!("(transferred to {name})");
                }
            }
        }
    }

    manager.close();
    println!("Session ended.");
    Ok(())
}

// ---------------------------------------------------------------------------
// dept
// ---------------------------------------------------------------------------

async fn cmd_dept_list() -> Result<()> {
    let config = load_config()?;
    let client = admin_client(&config)?;
    let listing = client.list_departments().await?;

    if listing.is_empty() {
        println!("No departments configured.");
        return Ok(());
    }

    for dept in listing {
        println!(
            "  [{}] {}  keywords: {}  kb: {} chars  alerts: {}",
            dept.id.map_or("-".to_string(), |id| id.to_string()),
            dept.name,
            if dept.keywords.is_empty() {
                "(none)"
            } else {
                &dept.keywords
            },
            dept.knowledge_base.len(),
            dept.email_recipient,
        );
    }
    Ok(())
}

async fn cmd_dept_create(
    name: &str,
    keywords: &str,
    canned_response: &str,
    email: &str,
) -> Result<()> {
    let config = load_config()?;
    let client = admin_client(&config)?;

    let created = client
        .create_department(&Department {
            id: None,
            name: name.to_string(),
            keywords: keywords.to_string(),
            canned_response: canned_response.to_string(),
            knowledge_base: String::new(),
            email_recipient: email.to_string(),
        })
        .await?;

    println!(
        "Created department {} (id {})",
        created.name,
        created.id.unwrap_or(-1)
    );
    Ok(())
}

async fn cmd_dept_update(
    id: i64,
    name: Option<&str>,
    keywords: Option<&str>,
    canned_response: Option<&str>,
    email: Option<&str>,
) -> Result<()> {
    let config = load_config()?;
    let client = admin_client(&config)?;

    let listing = client.list_departments().await?;
    let mut dept = listing
        .into_iter()
        .find(|d| d.id == Some(id))
        .ok_or_else(|| eyre!("no department with id {id}"))?;

    if let Some(v) = name {
        dept.name = v.to_string();
    }
    if let Some(v) = keywords {
        dept.keywords = v.to_string();
    }
    if let Some(v) = canned_response {
        dept.canned_response = v.to_string();
    }
    if let Some(v) = email {
        dept.email_recipient = v.to_string();
    }

    let updated = client.update_department(&dept).await?;
    println!("Updated department {} (id {id})", updated.name);
    Ok(())
}

async fn cmd_dept_delete(id: i64) -> Result<()> {
    let config = load_config()?;
    let client = admin_client(&config)?;
    client.delete_department(id).await?;
    println!("Deleted department {id}");
    Ok(())
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

async fn cmd_ingest(
    dept_name: &str,
    urls: Option<&str>,
    files: &[PathBuf],
    drops: &[usize],
    dry_run: bool,
) -> Result<()> {
    if urls.is_none() && files.is_empty() {
        return Err(eyre!("nothing to ingest: pass --urls and/or --files"));
    }

    let config = load_config()?;
    let client = admin_client(&config)?;
    let dept = find_department(&client, dept_name).await?;

    let ingestor = Ingestor::new(client.clone());
    let spinner = batch_spinner();

    if let Some(raw) = urls {
        spinner.set_message("Scraping URLs...");
        ingestor.scrape_urls(raw).await?;
    }

    if !files.is_empty() {
        spinner.set_message(format!("Uploading {} document(s)...", files.len()));
        let uploads: Vec<UploadFile> = files
            .iter()
            .map(|path| {
                let bytes = std::fs::read(path)
                    .map_err(|e| eyre!("cannot read {}: {e}", path.display()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                Ok(UploadFile { name, bytes })
            })
            .collect::<Result<_>>()?;
        ingestor.upload_files(&uploads).await?;
    }

    spinner.finish_and_clear();

    // Review removals, highest index first so earlier drops don't shift later ones
    let mut drops = drops.to_vec();
    drops.sort_unstable_by(|a, b| b.cmp(a));
    drops.dedup();
    for index in drops {
        let removed = ingestor.remove(index).await?;
        println!("  dropped [{index}] {}", removed.source);
    }

    let staged = ingestor.buffer().snapshot().await;
    println!();
    println!("  Staged for {dept_name}: {} item(s)", staged.len());
    for (i, item) in staged.iter().enumerate() {
        println!("    [{i}] {:?} {} ({} chars)", item.kind, item.source, item.text.len());
    }

    if dry_run {
        println!();
        println!("  Dry run: nothing committed.");
        return Ok(());
    }

    let composed = ingestor.commit(&dept.knowledge_base).await?;
    let updated = Department {
        knowledge_base: composed.clone(),
        ..dept
    };

    if let Err(e) = client.update_department(&updated).await {
        // Keep the administrator's work recoverable: nothing was persisted,
        // so dump the composed text for a manual retry.
        eprintln!("Save failed: {e}");
        eprintln!("--- composed knowledge base (not saved) ---");
        eprintln!("{composed}");
        return Err(e.into());
    }

    println!();
    println!("  Knowledge base updated!");
    println!("  Department: {dept_name}");
    println!("  Sources:    {}", chatdesk_compose::list_sources(&composed).len());
    println!("  Length:     {} chars", composed.len());
    println!();

    Ok(())
}

/// Spinner shown while a producer batch is in flight.
fn batch_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

// ---------------------------------------------------------------------------
// sources
// ---------------------------------------------------------------------------

async fn cmd_sources(dept_name: &str) -> Result<()> {
    let config = load_config()?;
    let client = admin_client(&config)?;
    let dept = find_department(&client, dept_name).await?;

    let sources = chatdesk_compose::list_sources(&dept.knowledge_base);
    if sources.is_empty() {
        println!("No external documents or websites linked.");
        return Ok(());
    }

    for source in sources {
        let kind = if source.contains("http") { "web" } else { "file" };
        println!("  [{kind}] {source}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// health
// ---------------------------------------------------------------------------

async fn cmd_health() -> Result<()> {
    let config = load_config()?;
    let client = admin_client(&config)?;
    if client.health().await? {
        println!("Backend reachable at {}", config.backend.base_url);
        Ok(())
    } else {
        Err(eyre!("backend at {} is not healthy", config.backend.base_url))
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
