use std::{path::{Path, PathBuf}, process::ExitCode, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use energy_client::ApiError;
use energy_dashboard::{
    config::AppConfig,
    dashboard::{CommandError, Dashboard},
    export, metrics_server, observability,
    session::SessionState,
    storage::FileStore,
    views::{render_rewards, render_tips},
};
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "energy-dashboard")]
#[command(about = "Household energy usage dashboard")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account (does not log in)
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show who is logged in
    Whoami,
    /// Submit a meter reading in kWh
    Submit { units: String },
    /// Totals, predicted bill, rewards, tip and alert
    Dashboard,
    History {
        /// Also write the table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    Rewards,
    Tips,
    /// Show the current energy alert
    Alert,
    /// Download the bill for a history record
    Bill {
        id: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Re-render the dashboard periodically until interrupted or logged out
    Watch {
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    observability::init_tracing();
    let cli = Cli::parse();

    // Load configuration
    let cfg = AppConfig::load()?;
    let store = Arc::new(FileStore::open(&cfg.session.store_path));
    let dashboard = Dashboard::new(&cfg, store)?;

    let mut session_rx = dashboard.session().subscribe();
    let was_authenticated = dashboard.session().state().is_authenticated();
    let outcome = run(&cli.command, &cfg, &dashboard, &mut session_rx).await;

    let still_authenticated = dashboard.session().state().is_authenticated();
    if expiry_notice_needed(&cli.command, was_authenticated, still_authenticated, &outcome) {
        eprintln!("Your session has expired. Please log in again with `energy-dashboard login`.");
    }

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// True when a rejected credential cleared the session during `command` and
/// nothing has told the user yet. `login` and `logout` replace the session on
/// purpose and report their own failures.
fn expiry_notice_needed(
    command: &Command,
    was_authenticated: bool,
    still_authenticated: bool,
    outcome: &Result<(), CommandError>,
) -> bool {
    if !was_authenticated || still_authenticated {
        return false;
    }
    if matches!(command, Command::Logout | Command::Login { .. }) {
        return false;
    }
    !matches!(
        outcome,
        Err(CommandError::SessionExpired) | Err(CommandError::Api(ApiError::Unauthorized))
    )
}

async fn run(
    command: &Command,
    cfg: &AppConfig,
    dashboard: &Dashboard,
    session_rx: &mut watch::Receiver<SessionState>,
) -> Result<(), CommandError> {
    match command {
        Command::Register { email, password } => {
            println!("{}", dashboard.register(email, password).await?);
        }
        Command::Login { email, password } => {
            dashboard.login(email, password).await?;
            println!("Logged in as {}", email.trim());
        }
        Command::Logout => {
            dashboard.logout().await;
            println!("Logged out.");
        }
        Command::Whoami => match dashboard.session().state().identity() {
            Some(identity) => println!("{identity}"),
            None => println!("Not logged in."),
        },
        Command::Submit { units } => {
            print!("{}", dashboard.submit_units(units).await?);
        }
        Command::Dashboard => {
            print!("{}", dashboard.load_overview().await?);
        }
        Command::History { csv } => {
            let view = dashboard.load_history().await?;
            print!("{view}");
            if let Some(path) = csv {
                write_csv(path, &view.rows);
            }
        }
        Command::Rewards => {
            let rewards = dashboard.load_rewards().await?;
            println!("{}", render_rewards(rewards.as_ref()));
        }
        Command::Tips => {
            print!("{}", render_tips(&dashboard.load_tips().await));
        }
        Command::Alert => {
            let identity = dashboard.session().state().identity().map(str::to_string);
            if identity.is_none() {
                return Err(CommandError::NotLoggedIn);
            }
            dashboard.alert().refresh(dashboard.client(), identity.as_deref()).await;
            if !dashboard.session().state().is_authenticated() {
                dashboard.logout().await;
                return Err(CommandError::SessionExpired);
            }
            match dashboard.alert().visible().await {
                Some(text) => println!("{text}"),
                None => println!("No alerts."),
            }
        }
        Command::Bill { id, out } => {
            let bytes = dashboard.download_bill(id).await?;
            let path = out.clone().unwrap_or_else(|| PathBuf::from(format!("bill-{id}.pdf")));
            match std::fs::write(&path, &bytes) {
                Ok(()) => println!("Saved {} bytes to {}", bytes.len(), path.display()),
                Err(e) => {
                    tracing::error!(error = %e, path = %path.display(), "failed to save bill");
                    eprintln!("Could not save the bill to {}", path.display());
                }
            }
        }
        Command::Watch { interval_secs } => {
            let interval = Duration::from_secs(interval_secs.unwrap_or(cfg.watch.interval_secs).max(1));
            watch_loop(cfg, dashboard, session_rx, interval).await?;
        }
    }
    Ok(())
}

fn write_csv(path: &Path, rows: &[energy_client::domain::UsageRecord]) {
    let result = std::fs::File::create(path)
        .map_err(anyhow::Error::from)
        .and_then(|file| export::write_history_csv(rows, file));
    match result {
        Ok(n) => println!("Exported {n} rows to {}", path.display()),
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "history export failed");
            eprintln!("Could not export history to {}", path.display());
        }
    }
}

/// Each tick is an explicit refresh signal for every widget, including the
/// alert banner. Stops on Ctrl-C or when the session is cleared.
async fn watch_loop(
    cfg: &AppConfig,
    dashboard: &Dashboard,
    session_rx: &mut watch::Receiver<SessionState>,
    interval: Duration,
) -> Result<(), CommandError> {
    if !dashboard.session().state().is_authenticated() {
        return Err(CommandError::NotLoggedIn);
    }

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        if let Err(e) = metrics_server::init(&metrics_cfg.bind_addr) {
            tracing::warn!(error = %e, "metrics endpoint disabled");
        }
    }

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match dashboard.load_overview().await {
                    Ok(view) => println!("{view}"),
                    Err(CommandError::NotLoggedIn | CommandError::SessionExpired) => return Ok(()),
                    Err(e) => eprintln!("{}", e.user_message()),
                }
            }
            changed = session_rx.changed() => {
                if changed.is_err() || !session_rx.borrow_and_update().is_authenticated() {
                    tracing::info!("session ended, leaving watch mode");
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                return Ok(());
            }
        }
    }
}
