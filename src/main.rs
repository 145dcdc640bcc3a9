use mangako::config::Config;
use mangako::hub::MangaHub;
use mangako::model::Provider;
use mangako::order;

use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let query = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: mangako <query>, searching for a default title");
        "Chainsaw Man".to_string()
    });

    let hub = MangaHub::new(&Config::from_env())?;

    let results = hub.search(&query, 10).await;
    if results.is_empty() {
        println!("no results for {query:?}");
        return Ok(());
    }

    println!("results for {query:?}:");
    for result in &results {
        println!(
            "  [{:?}] {} ({}) {}",
            result.tier,
            result.hit.title,
            result.hit.source,
            result.hit.identifier
        );
    }

    // Merged detail view for the best MangaDex hit, resolving the chapter
    // source by title.
    let top_mangadex = results
        .iter()
        .find(|r| r.hit.source == Provider::MangaDex)
        .map(|r| r.hit.identifier.clone());

    if let Some(id) = top_mangadex {
        if let Some(merged) = hub.merged_details(Some(&id), None).await {
            println!("\n{} ({:?} merge)", merged.title, merged.confidence);
            println!("  by {}", merged.authors.join(", "));
            println!("  tags: {}", merged.tags.join(", "));

            let ordered = order::order(merged.chapters, true);
            let page = order::paginate(&ordered, order::DEFAULT_PAGE_SIZE, 1);
            println!(
                "  {} chapters, page 1/{}:",
                page.total_items, page.total_pages
            );
            for chapter in page.items.iter().take(10) {
                println!("    {}", chapter.display_title());
            }
        }
    }

    Ok(())
}
