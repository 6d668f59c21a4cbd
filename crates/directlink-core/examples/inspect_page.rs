//! Debug script to inspect how a page's candidates are ranked
//!
//! Usage: cargo run -p directlink-core --example inspect_page -- <URL>

use directlink_core::{
    FetchRequest, MediaClient, MediaResolver, RankingContext, RawPage, Transport, ranking,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .ok_or("usage: inspect_page <URL>")?;

    let client = MediaClient::new()?;
    println!("Fetching {}...\n", url);

    let response = client
        .fetch(FetchRequest::new(url.clone(), Duration::from_secs(30)))
        .await?;
    println!("HTTP {} (final URL: {})", response.status, response.final_url);

    // Save HTML to file for inspection
    std::fs::write("debug_page.html", &response.body)?;
    println!("HTML saved to debug_page.html\n");

    let page = RawPage::new(response.final_url, response.body);
    let resolver = MediaResolver::new()?;
    let candidates = resolver.extract_candidates(&page);
    let context = RankingContext::new(page.host(), vec![]);

    println!("=== {} candidates ===\n", candidates.len());
    for candidate in &candidates {
        let features = ranking::score_candidate(candidate, &context);
        println!("{}\n    {:?}\n", candidate.url, features);
    }

    match ranking::select_best(&candidates, &context) {
        Some(best) => println!("Best: {}", best.url),
        None => println!("No candidates"),
    }

    Ok(())
}
