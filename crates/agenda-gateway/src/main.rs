//! agenda-gateway: scheduling assistant entry point
//!
//! Sends one message to the scheduling assistant and either prints the
//! calendar function outputs directly or the whole conversation.
//!
//! Usage:
//!   agenda-gateway [message...]                   - Direct mode: print function outputs
//!   agenda-gateway --conversational [message...]  - Print the assistant's reply
//!   agenda-gateway --help                         - Show help

use std::sync::Arc;

use agenda_calendar::{function_contract, register_calendar_tools, CalendarBackend, CalendarService};
use agenda_core::assistant::{ensure_assistant, AssistantProfile};
use agenda_core::{
    AssistantClient, Config, DispatchMode, DispatchOutcome, Dispatcher, JsonFileStore,
    KeyValueStore, SqliteStore, StoreBackend, TextFileStore, ToolManager,
};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Message sent when none is given on the command line
const DEFAULT_MESSAGE: &str = "Quais são meus proximos 7 eventos?";

/// Namespace for credentials in the SQLite store
const CREDENTIALS_NAMESPACE: &str = "credentials";

/// Run mode
enum RunMode {
    /// Run one message
    Run { mode: DispatchMode, message: String },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (mode, message) = match parse_args(std::env::args().skip(1)) {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("agenda-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Run { mode, message } => (mode, message),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    if config.calendar.user_id.is_empty() {
        anyhow::bail!("Config error: CALENDAR_USER_ID (calendar.user_id) is required");
    }

    tracing::info!("Starting agenda-gateway...");
    tracing::info!("Model: {}", config.assistant.model);

    let dispatcher = build_dispatcher(&config).await?;

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(());
        }
    });

    let thread = dispatcher.start_conversation().await?;
    let run = dispatcher.submit_message(&thread, &message).await?;
    let outcome = dispatcher.await_actionable(&run, mode, &mut shutdown_rx).await?;

    match (mode, outcome) {
        (DispatchMode::Direct, DispatchOutcome::ToolOutputs(results)) => {
            for result in results {
                println!("{}", result.output);
            }
        }
        (_, DispatchOutcome::Finished(run)) => {
            tracing::info!(status = ?run.status, "Run finished");
            dispatcher.display_transcript(&thread).await?;
        }
        (DispatchMode::Conversational, DispatchOutcome::ToolOutputs(_)) => {
            // outputs are submitted in conversational mode
            dispatcher.display_transcript(&thread).await?;
        }
    }

    Ok(())
}

/// Wire the assistant client, calendar tools and stored identities together
async fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let api = Arc::new(
        AssistantClient::new(&config.assistant)
            .map_err(|e| anyhow::anyhow!("Failed to create assistant client: {}", e))?,
    );

    let credential_store = open_credential_store(config)?;
    let calendar: Arc<dyn CalendarBackend> =
        Arc::new(CalendarService::from_config(&config.calendar, credential_store)?);

    let mut tools = ToolManager::new();
    register_calendar_tools(&mut tools, calendar);
    tools.validate_against(&function_contract())?;
    tracing::info!("Registered {} tools: {:?}", tools.len(), tools.tool_names());

    let identity_store = TextFileStore::new(&config.data_dir);
    let profile = AssistantProfile::scheduling(&config.assistant.model, function_contract());
    let assistant_id = ensure_assistant(api.as_ref(), &identity_store, &profile).await?;
    tracing::info!("Assistant: {}", assistant_id);

    Ok(Dispatcher::new(api, assistant_id, Arc::new(tools))
        .with_poll_policy(config.polling.policy())
        .with_unknown_function_policy(config.dispatch.unknown_function))
}

fn open_credential_store(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.calendar.store_backend {
        StoreBackend::Json => Arc::new(JsonFileStore::new(&config.calendar.token_store_path)),
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(
            &config.calendar.db_path,
            CREDENTIALS_NAMESPACE,
        )?),
    };
    Ok(store)
}

/// Parse command line arguments
fn parse_args(args: impl Iterator<Item = String>) -> RunMode {
    let mut mode = DispatchMode::Direct;
    let mut words = Vec::new();

    for arg in args {
        match arg.as_str() {
            "--conversational" | "-c" => mode = DispatchMode::Conversational,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => words.push(arg),
        }
    }

    let message = if words.is_empty() {
        DEFAULT_MESSAGE.to_string()
    } else {
        words.join(" ")
    };

    RunMode::Run { mode, message }
}

/// Print help message
fn print_help() {
    println!("agenda-gateway - Scheduling assistant backed by Google Calendar");
    println!();
    println!("Usage:");
    println!("  agenda-gateway [message...]                   Print calendar function outputs");
    println!("  agenda-gateway --conversational [message...]  Print the assistant's reply");
    println!("  agenda-gateway --help                         Show this help message");
    println!("  agenda-gateway --version                      Show version");
    println!();
    println!("Environment Variables:");
    println!("  OPENAI_API_KEY           API key (required)");
    println!("  ASSISTANT_MODEL          Model name (default: gpt-3.5-turbo-1106)");
    println!("  CALENDAR_USER_ID         User whose credentials are used (required)");
    println!("  CALENDAR_STORE_BACKEND   Credential store: json or sqlite (default: json)");
    println!("  DATA_DIR                 Directory holding assistant_id.txt (default: data)");
    println!("  POLL_INTERVAL_MS         Run polling interval (default: 2000)");
    println!("  UNKNOWN_FUNCTION_POLICY  fail_fast or report_error (default: fail_fast)");
}
