use anyhow::{bail, Result};
use energy_dashboard::{config::AppConfig, export, observability, storage::FileStore, Dashboard};
use std::{env, fs::File, io, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        bail!("usage: export_history [output_csv_path]");
    }

    // Uses the session saved by `energy-dashboard login`.
    let cfg = AppConfig::load()?;
    let store = Arc::new(FileStore::open(&cfg.session.store_path));
    let dashboard = Dashboard::new(&cfg, store)?;

    let records = match dashboard.history_records().await {
        Ok(records) => records,
        Err(e) => bail!("{}", e.user_message()),
    };

    let written = match args.get(1) {
        Some(path) => export::write_history_csv(&records, File::create(path)?)?,
        None => export::write_history_csv(&records, io::stdout().lock())?,
    };

    tracing::info!(rows = written, "history export complete");
    Ok(())
}
