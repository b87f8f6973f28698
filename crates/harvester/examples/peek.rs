//! Example: show which events the next run would collect, without writing anything.
//!
//! Reads the stored watermark, reconciles against the live feed and prints each new event
//! as one JSON line, newest first.
//!
//! Usage: cargo run -p harvester --example peek -- --config config.json [--max-pages N]

use harvester::{logging, HarvestConfig, HttpPageFetcher, Reconciler, WatermarkStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_stderr();
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = String::from("config.json");
    let mut max_pages: Option<usize> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config_path = args.get(i).cloned().unwrap_or_default();
            }
            "--max-pages" => {
                i += 1;
                max_pages = args.get(i).and_then(|s| s.parse().ok());
            }
            _ => {}
        }
        i += 1;
    }
    if config_path.is_empty() {
        eprintln!("Usage: peek --config PATH [--max-pages N]");
        std::process::exit(1);
    }

    let config = HarvestConfig::load(&config_path)?;
    let watermark = WatermarkStore::new(config.state_path()).load();
    let fetcher = HttpPageFetcher::new(&config)?;
    let reconciler = Reconciler::new(fetcher, max_pages.unwrap_or(config.max_pages));

    let rt = tokio::runtime::Runtime::new()?;
    let found = rt.block_on(reconciler.reconcile(watermark.as_deref()));
    for ev in &found.events {
        println!("{}", serde_json::to_string(ev)?);
    }
    eprintln!(
        "{} new event(s) over {} page(s), stopped: {}",
        found.events.len(),
        found.pages_fetched,
        found.stop
    );
    Ok(())
}
