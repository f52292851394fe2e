use std::path::{Path, PathBuf};
use std::sync::Arc;

use boardgraph::config::{ApiConfig, ApiTimeouts, ConfigError, DEFAULT_API_CONNECT_TIMEOUT_SECS};
use boardgraph::error::ErrorCode;
use boardgraph::model::OwnerContext;
use boardgraph::remote::{HttpBoardClient, OfflineClient, RemoteBoardClient, RemoteError};
use boardgraph::services::{communicator, controller, copy, resolver};
use boardgraph::state::AppState;
use boardgraph::store::{BoardStore, StoreError};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Edit(#[from] controller::ControllerError),
    #[error("board not found: {0}")]
    BoardNotFound(String),
    #[error("--user-name and --user-email must be given together")]
    PartialIdentity,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "boardgraph", about = "Resolve, copy and sync communication boards")]
struct Cli {
    /// Local store file; created on first save.
    #[arg(long, env = "BOARDGRAPH_STATE", default_value = "boards.json")]
    state: PathBuf,

    /// Board API base URL. Without it the `BOARD_API_*` env vars are used,
    /// and with no `BOARD_API_URL` either the store runs offline.
    #[arg(long)]
    api_url: Option<String>,

    #[arg(long)]
    api_token: Option<String>,

    /// No request timeout unless given.
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_API_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    #[arg(long)]
    user_name: Option<String>,

    #[arg(long)]
    user_email: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Boards of the active communicator.
    List,
    /// Board to display for a request (active board when omitted).
    Resolve { board_id: Option<String> },
    /// Deep-copy a board and its owned sub-boards.
    Copy { board_id: String },
    Rename { board_id: String, name: String },
    Publish { board_id: String },
    Delete { board_id: String },
    Search { query: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        let code = error_code(&e);
        eprintln!("error [{code}]: {e}");
        std::process::exit(1);
    }
}

fn error_code(error: &CliError) -> &'static str {
    match error {
        CliError::Config(e) => e.error_code(),
        CliError::Remote(e) => e.error_code(),
        CliError::Store(e) => e.error_code(),
        CliError::Edit(e) => e.error_code(),
        CliError::BoardNotFound(_) => "E_BOARD_NOT_FOUND",
        CliError::PartialIdentity => "E_CLI_IDENTITY",
        CliError::Json(_) => "E_CLI_JSON",
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let owner = match (cli.user_name.clone(), cli.user_email.clone()) {
        (Some(name), Some(email)) => OwnerContext::authenticated(name, email),
        (None, None) => OwnerContext::Anonymous,
        _ => return Err(CliError::PartialIdentity),
    };

    let remote: Arc<dyn RemoteBoardClient> = match api_config(&cli)? {
        Some(config) => Arc::new(HttpBoardClient::new(config)?),
        None => Arc::new(OfflineClient),
    };
    let state = AppState::new(open_store(&cli.state).await?, remote);

    let output = match cli.command {
        Command::List => json!(communicator::communicator_boards(&state).await),
        Command::Resolve { board_id } => {
            let resolution = resolver::resolve_board_for_request(&state, board_id.as_deref(), &owner).await;
            json!({
                "board": resolution.board,
                "promptCopy": resolution.prompt_copy.map(|b| b.id),
                "promptBlocked": resolution.prompt_blocked,
            })
        }
        Command::Copy { board_id } => copy_output(&controller::copy_board_by_id(&state, &board_id, &owner).await?),
        Command::Rename { board_id, name } => {
            let outcome = controller::rename_board(&state, &board_id, &name, &owner).await?;
            let failures: Vec<String> = outcome.failures.iter().map(ToString::to_string).collect();
            json!({ "boardId": outcome.board_id, "copiedFrom": outcome.copied_from, "synced": failures.is_empty(), "failures": failures })
        }
        Command::Publish { board_id } => {
            let board = communicator::publish_board(&state, &board_id, &owner)
                .await
                .ok_or(CliError::BoardNotFound(board_id))?;
            json!(board)
        }
        Command::Delete { board_id } => {
            let outcome = communicator::delete_board(&state, &board_id, &owner).await;
            json!({ "removed": outcome.removed, "communicators": outcome.communicators })
        }
        Command::Search { query } => json!(communicator::search_local_boards(&state, &query).await),
    };

    state.store.save_json(&cli.state).await?;
    print_json(&output)
}

/// Explicit flags win; otherwise the environment, and offline when no URL
/// is configured anywhere.
fn api_config(cli: &Cli) -> Result<Option<ApiConfig>, ConfigError> {
    if let Some(url) = &cli.api_url {
        let timeouts = ApiTimeouts { request_secs: cli.request_timeout_secs, connect_secs: cli.connect_timeout_secs };
        return ApiConfig::new(url, cli.api_token.clone(), timeouts).map(Some);
    }
    match ApiConfig::from_env() {
        Ok(config) => Ok(Some(config)),
        Err(ConfigError::Missing { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

async fn open_store(path: &Path) -> Result<BoardStore, CliError> {
    if tokio::fs::try_exists(path).await.map_err(StoreError::from)? {
        Ok(BoardStore::load_json(path).await?)
    } else {
        Ok(BoardStore::new())
    }
}

fn copy_output(outcome: &copy::CopyOutcome) -> Value {
    let failures: Vec<Value> = outcome
        .failures
        .iter()
        .map(|f| json!({ "boardId": f.board_id, "stage": format!("{:?}", f.stage), "error": f.error.to_string() }))
        .collect();
    json!({ "newRootId": outcome.new_root_id, "records": outcome.records, "failures": failures })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
