use anyhow::{Context, Result};
use subpolar::{init_tracing_once, CollectorOptions, Credentials, RedditClient, RedditCollector};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing_once();

    // Setup failures are the only thing that ends the run with a non-zero code.
    let creds = Credentials::from_env()?;
    let opts = CollectorOptions::default().with_env_overrides();
    let mut client = RedditClient::connect(creds).context("connect to Reddit API")?;

    let collector = RedditCollector::with_options(opts);
    let (report, merged) = collector.run(&mut client)?;

    println!(
        "Collected {} posts ({} political) in {} pairs; {} pairs incomplete.",
        report.total_raw(),
        report.total_political(),
        report.completed.len(),
        report.incomplete.len()
    );
    for miss in &report.incomplete {
        println!("  incomplete: {} {} – {}", miss.country, miss.phase, miss.reason);
    }
    println!("Raw data saved to: {}", collector.options().raw_dir.display());
    println!("Filtered data saved to: {}", collector.options().clean_dir.display());
    println!("Unified dataset ({} rows): {}", merged.rows, merged.output.display());
    for (path, reason) in &merged.unreadable {
        println!("  unreadable: {} – {}", path.display(), reason);
    }
    Ok(())
}
