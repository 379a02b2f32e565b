//! # shipdesk: Maintenance CLI
//!
//! Drives the reconciliation engine from the shell. Results go to stdout
//! as JSON; logs go to stderr.
//!
//! ## Usage
//! ```bash
//! shipdesk [--config PATH] status
//! shipdesk [--config PATH] list [--remote]
//! shipdesk [--config PATH] show INVOICE [--remote]
//! shipdesk [--config PATH] pull | push | login
//! shipdesk [--config PATH] sweep [local|remote|both]
//! shipdesk [--config PATH] set-status INVOICE STATUS
//! shipdesk [--config PATH] delete INVOICE
//! shipdesk [--config PATH] migrate-remote
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Initialize logging (RUST_LOG, default info,shipdesk=debug)          │
//! │  2. Load SyncConfig (file → env overrides → validate)                   │
//! │  3. Open the local database (migrations + orphan sweep on open)         │
//! │  4. If a remote URL is set: lazy pool, ping → connectivity flag,        │
//! │     sign in the configured user                                         │
//! │  5. Run the command, print JSON                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod error;

use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shipdesk_core::{InvoiceNumber, OrphanCounts, ShipmentStatus, ShipmentTotals, ShipmentTree};
use shipdesk_db::{Database, DbConfig};
use shipdesk_sync::{
    Collection, ConnectivityFlag, ConnectivityOracle, LocalStore, OrphanSweeper, PgRemoteStore,
    ReadMode, ReconciliationExecutor, RemoteStore, ShipmentReader, SweepScope, SyncConfig,
    SyncCoordinator, SyncDirection, SyncError, SyncProgressSink,
};

use error::{CliError, ErrorCode};

const USAGE: &str = "usage: shipdesk [--config PATH] <status|list|show|pull|push|login|sweep|set-status|delete|migrate-remote> [args]";

// =============================================================================
// Command Line
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Status,
    List { mode: ReadMode },
    Show { invoice: InvoiceNumber, mode: ReadMode },
    Pull,
    Push,
    Login,
    Sweep { scope: SweepScope },
    SetStatus { invoice: InvoiceNumber, status: ShipmentStatus },
    Delete { invoice: InvoiceNumber },
    MigrateRemote,
}

#[derive(Debug)]
struct Invocation {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Invocation, CliError> {
    let mut config_path = None;
    let mut remote = false;
    let mut positional: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let path = args
                    .get(i + 1)
                    .ok_or_else(|| CliError::usage("--config needs a path"))?;
                config_path = Some(PathBuf::from(path));
                i += 1;
            }
            "--remote" => remote = true,
            flag if flag.starts_with('-') => {
                return Err(CliError::usage(format!("unknown flag {flag}\n{USAGE}")));
            }
            word => positional.push(word),
        }
        i += 1;
    }

    let mode = if remote {
        ReadMode::PreferRemote
    } else {
        ReadMode::LocalOnly
    };

    let invoice_at = |index: usize| -> Result<InvoiceNumber, CliError> {
        let raw = positional
            .get(index)
            .ok_or_else(|| CliError::usage(format!("missing invoice number\n{USAGE}")))?;
        InvoiceNumber::parse(raw).map_err(|e| CliError::new(ErrorCode::ValidationError, e.to_string()))
    };

    let command = match positional.first().copied() {
        None => return Err(CliError::usage(USAGE)),
        Some("status") => Command::Status,
        Some("list") => Command::List { mode },
        Some("show") => Command::Show {
            invoice: invoice_at(1)?,
            mode,
        },
        Some("pull") => Command::Pull,
        Some("push") => Command::Push,
        Some("login") => Command::Login,
        Some("sweep") => Command::Sweep {
            scope: match positional.get(1) {
                Some(raw) => raw.parse()?,
                None => SweepScope::default(),
            },
        },
        Some("set-status") => {
            let raw = positional
                .get(2)
                .ok_or_else(|| CliError::usage(format!("missing status\n{USAGE}")))?;
            Command::SetStatus {
                invoice: invoice_at(1)?,
                status: raw.parse()?,
            }
        }
        Some("delete") => Command::Delete {
            invoice: invoice_at(1)?,
        },
        Some("migrate-remote") => Command::MigrateRemote,
        Some(other) => return Err(CliError::usage(format!("unknown command {other}\n{USAGE}"))),
    };

    Ok(Invocation {
        config_path,
        command,
    })
}

// =============================================================================
// Engine Wiring
// =============================================================================

struct Engine {
    config: SyncConfig,
    db: Arc<Database>,
    remote: Option<Arc<PgRemoteStore>>,
    oracle: Arc<ConnectivityFlag>,
}

impl Engine {
    async fn open(config: SyncConfig) -> Result<Self, CliError> {
        let path = config.database_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CliError::new(ErrorCode::LocalStore, format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        info!(?path, "Opening local database");
        let db = Database::new(
            DbConfig::new(&path).sweep_orphans_on_open(config.local.sweep_on_open),
        )
        .await?;

        let oracle = Arc::new(ConnectivityFlag::offline());
        let remote = match config.remote_url() {
            Some(url) => {
                let store = PgRemoteStore::connect(url, config.connect_timeout())?;
                match tokio::time::timeout(config.connect_timeout(), store.ping()).await {
                    Ok(Ok(())) => oracle.set(true),
                    Ok(Err(e)) => warn!(error = %e, "Remote store not reachable, working offline"),
                    Err(_) => warn!("Remote ping timed out, working offline"),
                }
                if let Some(user) = &config.remote.user {
                    store.sign_in(user.clone());
                }
                Some(Arc::new(store))
            }
            None => None,
        };

        Ok(Engine {
            config,
            db: Arc::new(db),
            remote,
            oracle,
        })
    }

    fn local(&self) -> Arc<dyn LocalStore> {
        self.db.clone()
    }

    fn remote(&self) -> Option<Arc<dyn RemoteStore>> {
        self.remote
            .clone()
            .map(|store| store as Arc<dyn RemoteStore>)
    }

    fn oracle(&self) -> Arc<dyn ConnectivityOracle> {
        self.oracle.clone()
    }

    fn executor(&self) -> ReconciliationExecutor {
        ReconciliationExecutor::from_config(self.local(), self.remote(), self.oracle(), &self.config)
    }

    fn reader(&self) -> ShipmentReader {
        ShipmentReader::new(self.local(), self.remote(), self.oracle())
            .with_op_timeout(self.config.op_timeout())
    }

    fn coordinator(&self) -> SyncCoordinator {
        SyncCoordinator::from_config(self.local(), self.remote(), self.oracle(), &self.config)
    }

    fn sweeper(&self) -> OrphanSweeper {
        OrphanSweeper::new(
            self.local(),
            self.remote(),
            self.oracle(),
            self.config.op_timeout(),
        )
    }

    async fn close(&self) {
        if let Some(remote) = &self.remote {
            remote.close().await;
        }
        self.db.close().await;
    }
}

/// Logs bulk sync progress.
struct LogProgress;

impl SyncProgressSink for LogProgress {
    fn on_progress(&self, direction: SyncDirection, collection: Collection, percent: u8) {
        info!(%direction, %collection, percent, "Sync progress");
    }
}

// =============================================================================
// Output Shapes
// =============================================================================

#[derive(Serialize)]
struct StatusReport {
    device_id: String,
    database_path: PathBuf,
    shipments: i64,
    products: i64,
    orphans: OrphanCounts,
    remote: RemoteStatus,
}

#[derive(Serialize)]
struct RemoteStatus {
    configured: bool,
    reachable: bool,
    user: Option<String>,
}

#[derive(Serialize)]
struct TreeView {
    #[serde(flatten)]
    tree: ShipmentTree,
    totals: ShipmentTotals,
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(ErrorCode::Internal, e.to_string()))?;
    println!("{json}");
    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

async fn run(engine: &Engine, command: Command) -> Result<(), CliError> {
    match command {
        Command::Status => {
            let report = StatusReport {
                device_id: engine.config.device_id().to_string(),
                database_path: engine.config.database_path(),
                shipments: engine.db.shipments().count().await?,
                products: engine.db.products().count().await?,
                orphans: engine.db.maintenance().count_orphans().await?,
                remote: RemoteStatus {
                    configured: engine.remote.is_some(),
                    reachable: engine.oracle.is_reachable(),
                    user: engine.remote.as_ref().and_then(|r| r.current_user()),
                },
            };
            print_json(&report)
        }
        Command::List { mode } => print_json(&engine.reader().list_shipments(mode).await?),
        Command::Show { invoice, mode } => {
            let tree = engine
                .reader()
                .load_tree(&invoice, mode)
                .await?
                .ok_or_else(|| CliError::not_found("Shipment", invoice.as_str()))?;
            let totals = tree.totals();
            print_json(&TreeView { tree, totals })
        }
        Command::Pull => print_json(&engine.coordinator().pull_from_remote(&LogProgress).await?),
        Command::Push => print_json(&engine.coordinator().push_to_remote(&LogProgress).await?),
        Command::Login => print_json(&engine.coordinator().after_sign_in(&LogProgress).await?),
        Command::Sweep { scope } => print_json(&engine.sweeper().sweep(scope).await?),
        Command::SetStatus { invoice, status } => {
            let result = engine
                .executor()
                .update_status(&invoice, status)
                .await?
                .ok_or_else(|| CliError::not_found("Shipment", invoice.as_str()))?;
            print_json(&result)
        }
        Command::Delete { invoice } => match engine.executor().delete_shipment(&invoice).await {
            Ok(result) => print_json(&result),
            // What did get deleted still goes to stdout
            Err(SyncError::DeleteIncomplete { failed, result }) => {
                print_json(&result)?;
                Err(SyncError::DeleteIncomplete { failed, result }.into())
            }
            Err(err) => Err(err.into()),
        },
        Command::MigrateRemote => {
            let remote = engine
                .remote
                .as_ref()
                .ok_or_else(|| CliError::new(ErrorCode::Config, "no remote database_url configured"))?;
            remote.run_migrations().await?;
            print_json(&serde_json::json!({ "migrated": true }))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shipdesk=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(args: &[String]) -> Result<(), CliError> {
    let invocation = parse_args(args)?;
    let config = SyncConfig::load(invocation.config_path)?;
    let engine = Engine::open(config).await?;

    let outcome = run(&engine, invocation.command).await;
    engine.close().await;
    outcome
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(err) = execute(&args).await {
        match serde_json::to_string(&err) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("{err}"),
        }
        std::process::exit(err.code.exit_status());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_show_with_remote_and_config() {
        let invocation =
            parse_args(&args(&["--config", "/tmp/s.toml", "show", "inv-7", "--remote"])).unwrap();
        assert_eq!(invocation.config_path, Some(PathBuf::from("/tmp/s.toml")));
        assert_eq!(
            invocation.command,
            Command::Show {
                invoice: InvoiceNumber::parse("INV-7").unwrap(),
                mode: ReadMode::PreferRemote,
            }
        );
    }

    #[test]
    fn test_parse_sweep_defaults_to_both() {
        let invocation = parse_args(&args(&["sweep"])).unwrap();
        assert_eq!(
            invocation.command,
            Command::Sweep {
                scope: SweepScope::Both
            }
        );
        let invocation = parse_args(&args(&["sweep", "local"])).unwrap();
        assert_eq!(
            invocation.command,
            Command::Sweep {
                scope: SweepScope::Local
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(parse_args(&[]).unwrap_err().code, ErrorCode::Usage);
        assert_eq!(parse_args(&args(&["frobnicate"])).unwrap_err().code, ErrorCode::Usage);
        assert_eq!(parse_args(&args(&["show"])).unwrap_err().code, ErrorCode::Usage);
        assert_eq!(
            parse_args(&args(&["set-status", "A-1", "lost"])).unwrap_err().code,
            ErrorCode::Usage
        );
        assert_eq!(parse_args(&args(&["--config"])).unwrap_err().code, ErrorCode::Usage);
    }
}
