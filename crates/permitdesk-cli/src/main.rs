mod display;
mod intake;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use permitdesk_core::wizard::business_intake_prompts;
use permitdesk_core::{
    BusinessDetails, Catalog, Category, Frequency, Jurisdiction, Prompt, SortDirection, SortKey,
    Status, Wizard, build_rows, completion_by_frequency, compute_progress, fill_business_form,
    read_fields, select_due_soon, sort_rows,
};
use permitdesk_gateway::analytics::{DEFAULT_ANALYTICS_URL, DEFAULT_PREDICTION_MODEL};
use permitdesk_gateway::extraction::DEFAULT_EXTRACTION_URL;
use permitdesk_gateway::llm::{DEFAULT_LLM_MODEL, DEFAULT_LLM_URL};
use permitdesk_gateway::{AnalyticsClient, ChatQnaClient, ExtractionClient};
use permitdesk_server::{AppState, Clock, ServerConfig};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "permitdesk", version)]
#[command(about = "Track the regulatory forms a small business has to file")]
struct Cli {
    /// Print JSON instead of tables.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    /// Evaluate dates as of this day instead of today (YYYY-MM-DD).
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, env = "PERMITDESK_BIND", default_value = "127.0.0.1:3000")]
        bind: String,
        #[command(flatten)]
        services: ServiceArgs,
    },
    /// List catalog forms.
    Forms {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        jurisdiction: Option<Jurisdiction>,
        #[arg(long)]
        status: Option<Status>,
        #[arg(long)]
        frequency: Option<Frequency>,
        #[command(flatten)]
        sort: SortArgs,
    },
    /// Show one form.
    Show { id: u32 },
    /// Forms due within the next 30 days.
    DueSoon {
        /// Ask the analytics service for predicted due dates instead of
        /// reading the catalog.
        #[arg(long, default_value_t = false)]
        predicted: bool,
        #[command(flatten)]
        services: ServiceArgs,
    },
    /// Completion summary, due-soon list and the full table.
    Dashboard {
        #[command(flatten)]
        sort: SortArgs,
    },
    /// Answer the intake questions and submit them for extraction.
    Intake {
        /// JSON file with a list of prompts to ask instead of the built-in ones.
        #[arg(long)]
        prompts: Option<PathBuf>,
        /// Submit through a running permitdesk server instead of calling the
        /// extraction endpoint directly.
        #[arg(long)]
        server: Option<String>,
        #[arg(long, env = "PERMITDESK_EXTRACTION_URL", default_value = DEFAULT_EXTRACTION_URL)]
        extraction_url: String,
    },
    /// List the fillable fields of a PDF form.
    Fields { template: PathBuf },
    /// Fill a business application PDF from extracted business details.
    Fill {
        template: PathBuf,
        out: PathBuf,
        /// JSON file with the details, either bare or as returned by
        /// `/api/extract-info` (wrapped in `extracted_info`).
        #[arg(long)]
        details: PathBuf,
    },
    /// Create the due-date prediction model in the analytics service.
    Provision {
        #[arg(long, default_value = DEFAULT_PREDICTION_MODEL)]
        model: String,
        #[command(flatten)]
        services: ServiceArgs,
    },
}

#[derive(Args)]
struct SortArgs {
    /// Column to sort by (e.g. name, dueDate, progress).
    #[arg(long)]
    sort: Option<SortKey>,
    #[arg(long, default_value_t = false)]
    desc: bool,
}

impl SortArgs {
    fn direction(&self) -> SortDirection {
        if self.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }
}

/// Endpoints and credentials for the external services.
#[derive(Args)]
struct ServiceArgs {
    #[arg(long, env = "PERMITDESK_ANALYTICS_URL", default_value = DEFAULT_ANALYTICS_URL)]
    analytics_url: String,
    #[arg(long, env = "PERMITDESK_ANALYTICS_KEY", hide_env_values = true)]
    analytics_key: Option<String>,
    #[arg(long, env = "PERMITDESK_EXTRACTION_URL", default_value = DEFAULT_EXTRACTION_URL)]
    extraction_url: String,
    #[arg(long, env = "PERMITDESK_LLM_URL", default_value = DEFAULT_LLM_URL)]
    llm_url: String,
    #[arg(long, env = "PERMITDESK_LLM_KEY", hide_env_values = true)]
    llm_key: Option<String>,
    #[arg(long, env = "PERMITDESK_LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    llm_model: String,
    /// Seconds to wait for the extraction service or the LLM.
    #[arg(long, env = "PERMITDESK_UPSTREAM_TIMEOUT_SECS", default_value_t = 50)]
    upstream_timeout_secs: u64,
}

impl ServiceArgs {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            analytics_url: self.analytics_url,
            analytics_key: self.analytics_key,
            extraction_url: self.extraction_url,
            llm_url: self.llm_url,
            llm_key: self.llm_key,
            llm_model: self.llm_model,
            upstream_timeout: Duration::from_secs(self.upstream_timeout_secs),
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `--json` output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    info!("permitdesk v{}", env!("CARGO_PKG_VERSION"));
    let today = cli.today.unwrap_or_else(|| Utc::now().date_naive());
    let catalog = Catalog::builtin().context("loading built-in form catalog")?;

    match cli.command {
        Command::Serve { bind, services } => {
            let mut state = AppState::new(catalog, services.into_config());
            if let Some(day) = cli.today {
                state = state.with_clock(Clock::Fixed(day));
            }
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            permitdesk_server::serve(listener, state).await?;
        }

        Command::Forms {
            category,
            jurisdiction,
            status,
            frequency,
            sort,
        } => {
            let matching = catalog.filter_matching(category, jurisdiction, status, frequency);
            let mut rows = build_rows(matching, today);
            if let Some(key) = sort.sort {
                rows = sort_rows(&rows, key, sort.direction());
            }
            info!(count = rows.len(), %today, "listing forms");
            if cli.json {
                print_json(&rows)?;
            } else {
                display::print_form_table(&rows);
            }
        }

        Command::Show { id } => {
            let record = catalog
                .get_by_id(id)
                .with_context(|| format!("no form with id {id}"))?;
            if cli.json {
                print_json(record)?;
            } else {
                display::print_form_card(record, compute_progress(record, today));
            }
        }

        Command::DueSoon { predicted, services } => {
            let config = services.into_config();
            info!(predicted, window_days = config.due_soon_window_days, "selecting due-soon forms");
            let entries = if predicted {
                let analytics = AnalyticsClient::from_key(&config.analytics_url, config.analytics_key)?;
                let predictions = analytics
                    .due_predictions(config.due_soon_window_days, config.due_soon_limit)
                    .await?;
                select_due_soon(&predictions, today, config.due_soon_window_days)
            } else {
                select_due_soon(catalog.list_all(), today, config.due_soon_window_days)
            };
            let entries: Vec<_> = entries.into_iter().take(config.due_soon_limit).collect();
            info!(count = entries.len(), "due-soon forms selected");
            if cli.json {
                print_json(&entries)?;
            } else {
                display::print_due_soon(&entries);
            }
        }

        Command::Dashboard { sort } => {
            let mut rows = build_rows(catalog.list_all(), today);
            if let Some(key) = sort.sort {
                rows = sort_rows(&rows, key, sort.direction());
            }
            let completion = completion_by_frequency(&rows);
            let defaults = ServerConfig::default();
            let mut due_soon = select_due_soon(catalog.list_all(), today, defaults.due_soon_window_days);
            due_soon.truncate(defaults.due_soon_limit);

            if cli.json {
                print_json(&serde_json::json!({
                    "rows": rows,
                    "completion": completion,
                    "dueSoon": due_soon,
                }))?;
            } else {
                display::print_completion(&completion);
                println!("Due soon");
                display::print_due_soon(&due_soon);
                println!();
                display::print_form_table(&rows);
            }
        }

        Command::Intake {
            prompts,
            server,
            extraction_url,
        } => {
            let prompts = match prompts {
                Some(path) => load_prompts(&path)?,
                None => business_intake_prompts(),
            };
            let mut wizard = Wizard::new(prompts)?;
            info!(prompts = wizard.prompt_count(), via_server = server.is_some(), "starting intake");
            let stdin = io::stdin().lock();
            let stdout = io::stdout();
            match server {
                Some(url) => {
                    let sink = ChatQnaClient::new(url);
                    let reply = intake::run(&mut wizard, &sink, stdin, stdout).await?;
                    info!(message = %reply.message, "intake submitted");
                    print_json(&reply)?;
                }
                None => {
                    let sink = ExtractionClient::new(extraction_url);
                    let reply = intake::run(&mut wizard, &sink, stdin, stdout).await?;
                    info!("intake submitted");
                    print_json(&reply)?;
                }
            }
        }

        Command::Provision { model, services } => {
            let config = services.into_config();
            let llm_key = config
                .llm_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .context("PERMITDESK_LLM_KEY is required to provision the prediction model")?;
            let analytics = AnalyticsClient::from_key(&config.analytics_url, config.analytics_key.clone())?;
            info!(%model, "provisioning prediction model");
            let steps = analytics.provision_due_date_model(llm_key, &model).await?;
            println!("Ran {steps} provisioning statements; training started for {model}.");
        }

        Command::Fields { template } => {
            let bytes = read_file(&template)?;
            let fields = read_fields(&bytes).with_context(|| format!("reading fields of {}", template.display()))?;
            info!(count = fields.len(), template = %template.display(), "listed form fields");
            if cli.json {
                print_json(&fields)?;
            } else {
                display::print_fields(&fields);
            }
        }

        Command::Fill {
            template,
            out,
            details: details_path,
        } => {
            let text = std::fs::read_to_string(&details_path)
                .with_context(|| format!("reading {}", details_path.display()))?;
            let details = parse_details(&text).with_context(|| format!("parsing {}", details_path.display()))?;
            let bytes = read_file(&template)?;
            let (filled_pdf, filled) =
                fill_business_form(&bytes, &details).with_context(|| format!("filling {}", template.display()))?;
            if filled == 0 {
                warn!(template = %template.display(), "no fields matched the business details");
            }
            std::fs::write(&out, filled_pdf).with_context(|| format!("writing {}", out.display()))?;
            info!(filled, out = %out.display(), "wrote filled form");
            println!("Filled {filled} fields; wrote {}.", out.display());
        }
    }

    Ok(())
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

/// Accept either bare details or an `/api/extract-info` reply.
fn parse_details(text: &str) -> anyhow::Result<BusinessDetails> {
    let mut value: Value = serde_json::from_str(text)?;
    if let Some(inner) = value.get_mut("extracted_info") {
        value = inner.take();
    }
    Ok(serde_json::from_value(value)?)
}

fn load_prompts(path: &Path) -> anyhow::Result<Vec<Prompt>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing prompts from {}", path.display()))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
