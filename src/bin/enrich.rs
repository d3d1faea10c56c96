use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use mapify_rs::poi::enrich;

#[derive(Parser, Debug)]
#[command(name = "enrich")]
#[command(about = "Classify and normalize a raw POI GeoJSON dataset", long_about = None)]
struct Args {
    /// Raw POI feature collection (.geojson or .geojson.gz)
    #[arg(long, default_value = "data/rawPois.geojson")]
    input: PathBuf,

    /// Where to write the enriched collection
    #[arg(long, default_value = "data/enrichedPois.geojson")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Enriching {:?} -> {:?}", args.input, args.output);

    let summary = enrich::run(&args.input, &args.output)
        .with_context(|| format!("Enrichment of {:?} failed", args.input))?;

    for (category, count) in &summary.categories {
        log::info!("  {:<12} {}", category, count);
    }
    if summary.invalid_coords > 0 {
        log::warn!(
            "{} of {} features have invalid coordinates",
            summary.invalid_coords,
            summary.features
        );
    }
    log::info!(
        "Enriched POIs saved to {:?} ({} features)",
        args.output,
        summary.features
    );
    Ok(())
}
