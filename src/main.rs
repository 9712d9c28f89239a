mod catalog;
mod config;
mod daterange;
mod extract;
mod normalize;
mod reconcile;
mod records;
mod sheets;

use config::Config;
use std::path::Path;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = "pod_reconcile.toml";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter("info")
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("run");

    match command {
        "extract" => {
            let cfg = load_config(args.get(2))?;
            run_extract(&cfg)?;
        }
        "reconcile" => {
            let cfg = load_config(args.get(2))?;
            run_reconcile(&cfg)?;
        }
        "run" => {
            let cfg = load_config(args.get(2))?;
            run_extract(&cfg)?;
            run_reconcile(&cfg)?;
        }
        "inspect" => {
            let path = args
                .get(2)
                .ok_or("usage: pod_reconcile inspect <pod.pdf>")?;
            inspect(Path::new(path))?;
        }
        other => {
            return Err(format!(
                "unknown command {other:?} — expected extract, reconcile, run, or inspect [config]"
            )
            .into());
        }
    }

    Ok(())
}

fn load_config(path: Option<&String>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Config::load(p),
        None => Config::load_or_default(DEFAULT_CONFIG),
    }
}

/// Stage 1: parse every POD in the configured folder and persist the
/// Delivered Items checkpoint.
fn run_extract(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let batch = extract::read_pods(&cfg.paths.pods_dir)?;

    for (file, reason) in &batch.skipped {
        warn!(file = %file, reason = %reason, "POD skipped");
    }

    sheets::write_delivered(&cfg.delivered_items_path(), &batch.rows())?;
    Ok(())
}

/// Stage 2: reconcile the checkpoint against the Open Orders export and
/// persist the Selectable Items table.
fn run_reconcile(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let report = sheets::find_report_file(
        &cfg.paths.downloads_dir,
        &cfg.report.open_orders_marker,
    )?;
    let raw_rows = sheets::read_open_orders(&report, &cfg.report.open_orders_sheet)?;
    let open_orders = normalize::normalize_open_orders(&raw_rows, &cfg.catalog)?;
    let (pap_pin, headgear) = normalize::filter_pap_pin(&open_orders, &cfg.catalog);
    info!(
        open_orders = open_orders.len(),
        pap_pin = pap_pin.len(),
        headgear = headgear.len(),
        "Open orders filtered"
    );

    // The POD search windows these pending lines would need, for the
    // operator running the vendor-portal download.
    let create_dates: Vec<_> = pap_pin.iter().map(|line| line.create_date).collect();
    for range in daterange::cluster(&create_dates) {
        info!(start = %range.start, end = %range.end, "POD query window");
    }

    let delivered_rows = sheets::read_delivered(&cfg.delivered_items_path())?;
    let delivered = normalize::normalize_delivered(&delivered_rows)?;

    let selectable = reconcile::select_items(&delivered, &pap_pin, &headgear, &cfg.catalog)?;
    sheets::write_selectables(&cfg.selectable_items_path(), &selectable)?;
    Ok(())
}

/// Parse a single POD and print the outcome, for poking at layout drift.
fn inspect(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match extract::extract_pod_file(path) {
        extract::PodOutcome::Order(order) => {
            info!(order = %order.order_number, items = order.items.len(), "Extracted");
            println!("{}", serde_json::to_string_pretty(&order)?);
        }
        extract::PodOutcome::Skipped(reason) => {
            warn!(reason = %reason, "Document would be skipped");
            println!("skipped: {reason}");
        }
    }
    Ok(())
}
