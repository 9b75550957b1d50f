//! `htlnd`: process entry point for the Hotline protocol server.
//!
//! Parses CLI flags, loads (or scaffolds) the config root, wires up
//! logging, and spawns the control listener, transfer subserver, admin
//! HTTP endpoint, tracker announcer, and idle ticker as concurrent
//! tasks.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::ConfigRoot;
use htln_accounts::AccountStore;
use htln_news::{FlatNewsStore, ThreadedNews};
use htln_server::Server;

/// Run a Hotline-protocol chat and file server.
#[derive(Parser)]
#[command(name = "htlnd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config root directory (holds config.yaml and its sibling files).
    #[arg(short, long, default_value_os_t = ConfigRoot::default_path())]
    data_dir: PathBuf,

    /// Scaffold a fresh config root at `--data-dir` and exit.
    #[arg(long)]
    init: bool,

    /// Server name to use when scaffolding with `--init`.
    #[arg(long)]
    name: Option<String>,

    /// Override the configured log level (`trace`/`debug`/`info`/`warn`/`error`).
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let root = ConfigRoot::new(&cli.data_dir);

    if cli.init {
        tracing_subscriber::fmt().with_env_filter("info").init();
        let config = root.init(cli.name)?;
        info!(data_dir = %root.path().display(), name = %config.name, "scaffolded new config root");
        return Ok(());
    }

    if !root.exists() {
        anyhow::bail!(
            "{} does not exist; run with --init to create it",
            root.path().display()
        );
    }
    let config = root.load_config()?;

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _log_guard = init_logging(&config, filter);

    let accounts = AccountStore::open(root.users_dir())?;
    let news = if root.threaded_news_path().exists() {
        ThreadedNews::load(&root.threaded_news_path())?
    } else {
        ThreadedNews::new()
    };
    let flat_news = FlatNewsStore::open(root.message_board_path())?;

    let (outbox_tx, outbox_rx) = tokio::sync::mpsc::unbounded_channel();
    let server = Arc::new(Server::new(
        config,
        accounts,
        news,
        root.threaded_news_path(),
        flat_news,
        outbox_tx,
    )?);

    info!(
        control_addr = %server.config.control_listen_addr(),
        transfer_addr = %server.config.transfer_listen_addr(),
        "starting htlnd"
    );

    let sender = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.run_central_sender(outbox_rx).await })
    };
    let control = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { htln_server::connection::run(server).await })
    };
    let transfer = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { htln_server::transfer::subserver::run(server).await })
    };
    let idle = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { htln_server::connection::run_idle_ticker(server).await })
    };
    let admin = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { htln_server::admin_http::run(server).await })
    };
    let tracker = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { htln_server::tracker::run(server).await })
    };

    tokio::select! {
        res = control => res??,
        res = transfer => res??,
        _ = sender => {}
        _ = idle => {}
        _ = admin => {}
        _ = tracker => {}
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    Ok(())
}

fn init_logging(
    config: &htln_server::Config,
    filter: EnvFilter,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    match &config.log_file {
        Some(path) => {
            let file_appender = tracing_appender::rolling::never(
                path.parent().unwrap_or_else(|| std::path::Path::new(".")),
                path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("htlnd.log")),
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}
