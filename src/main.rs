use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tax_query_agent::config::AgentConfig;
use tax_query_agent::observability::AuditLogger;
use tax_query_agent::schema::SchemaCatalog;
use tax_query_agent::security::SecurityGate;
use tax_query_agent::{QueryAgent, QueryRequest, QueryResponse};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tax-query-agent")]
#[command(about = "Answer natural-language questions about tax data")]
struct Args {
    /// Schema catalog JSON (overrides SCHEMA_CATALOG_PATH)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// JSON-lines audit file (overrides AUDIT_LOG_PATH)
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question
    Ask {
        question: String,

        #[arg(long)]
        taxpayer_id: Option<Uuid>,

        #[arg(long)]
        session_id: Option<Uuid>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the schema catalog
    Schema {
        /// Print the prompt summary instead of the full document
        #[arg(long)]
        summary: bool,
    },
    /// Run only the question security gate
    Check { question: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Ask {
            question,
            taxpayer_id,
            session_id,
            json,
        } => {
            let mut config = AgentConfig::from_env().context("Failed to load configuration")?;
            if args.catalog.is_some() {
                config.schema_catalog_path = args.catalog;
            }
            if args.audit_log.is_some() {
                config.audit.log_path = args.audit_log;
            }

            let audit = Arc::new(AuditLogger::from_config(&config.audit));
            let agent = QueryAgent::from_config(&config, audit).await?;

            let mut request = QueryRequest::new(question);
            if let Some(id) = session_id {
                request = request.with_session(id);
            }
            if let Some(id) = taxpayer_id {
                request = request.with_taxpayer(id);
            }

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling request");
                    ctrl_c.cancel();
                }
            });

            let response = agent.process_with_cancel(&request, &cancel).await;
            print_response(&response, json)?;
        }
        Command::Schema { summary } => {
            let catalog = load_catalog(args.catalog)?;
            if summary {
                println!("{}", catalog.summary());
            } else {
                println!("{}", catalog.document()?);
            }
        }
        Command::Check { question } => {
            let decision = SecurityGate::default().check(&question);
            match decision.violation {
                None => println!("allowed"),
                Some(violation) => println!("denied: {}", violation),
            }
        }
    }

    Ok(())
}

fn load_catalog(path: Option<PathBuf>) -> Result<SchemaCatalog> {
    let path = path.or_else(|| std::env::var("SCHEMA_CATALOG_PATH").ok().map(PathBuf::from));
    match path {
        Some(path) => {
            info!("Loading schema catalog from {}", path.display());
            Ok(SchemaCatalog::load(&path)?)
        }
        None => Ok(SchemaCatalog::tax_default()),
    }
}

fn print_response(response: &QueryResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!("{}", response.answer_text);
    if let Some(sql) = &response.sql {
        println!("\nSQL: {}", sql);
    }
    if let Some(confidence) = response.confidence {
        println!("Confidence: {:.2}", confidence);
    }
    if let Some(ms) = response.execution_time_ms {
        println!("Time: {} ms", ms);
    }
    if let Some(error) = &response.error_message {
        println!("Error: {}", error);
    }
    Ok(())
}
