use anyhow::Result;
use clap::Parser;

use rankdb_cli::{init_tracing, load_settings};
use rankdb_hybrid::HybridSearchEngine;

/// Rank indexed documents against a free-text query.
#[derive(Parser)]
#[command(name = "rankdb-search", version, about)]
struct Cli {
    /// Search query
    query: String,

    /// Maximum number of results to return
    #[arg(short, long, default_value = "10")]
    k: usize,

    /// Output results as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing("warn");
    let cli = Cli::parse();
    let settings = load_settings()?;
    let engine = HybridSearchEngine::open(&settings)?;
    let results = engine.query(&cli.query, cli.k)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    println!("Found {} results for \"{}\"", results.len(), cli.query);
    for (i, hit) in results.iter().enumerate() {
        let name = hit.metadata.name.as_deref().unwrap_or("-");
        println!(
            "\n  {}. {:>6.2}%  {}  ({})",
            i + 1,
            hit.matching_rate_percent,
            hit.result.document,
            name
        );
        println!(
            "     vector={:.4} keyword={:.4} slot={}",
            hit.result.vector_score, hit.result.keyword_score, hit.result.slot
        );
    }
    Ok(())
}
