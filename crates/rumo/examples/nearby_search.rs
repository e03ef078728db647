//! Nearby search session against the public Nominatim service
//!
//! This example demonstrates:
//! - Detecting the user's location (a fixed position stands in for a device)
//! - Searching a catalog topic around the user
//! - Loading more pages without duplicates
//!
//! Set `RUMO_NOMINATIM_URL` to point at your own Nominatim instance.

use rumo::{
    ClientConfig, Coordinates, FixedPosition, SearchConfigBuilder, SearchInput, SmartTravelAgent,
    TopicId, init_logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(tracing::Level::INFO)?;

    // Avenida Paulista, São Paulo
    let position = FixedPosition(Coordinates::new(-23.5613, -46.6565));
    let mut agent = SmartTravelAgent::with_nominatim(
        position,
        &ClientConfig::from_env()?,
        SearchConfigBuilder::nearby().build(),
    )?;

    match agent.detect_location().await {
        Ok(location) => println!("You are in {} ({})", location.name, location.country),
        Err(e) => println!("Could not get your position: {e}"),
    }

    agent.search(SearchInput::Topic(TopicId::Nearby)).await;
    print_results(&agent.state().results);

    for _ in 0..2 {
        if let Some(report) = agent.load_more().await {
            println!(
                "\nPage {}: {} new, {} duplicates",
                agent.state().page,
                report.added,
                report.duplicates
            );
        }
    }
    print_results(&agent.state().results);

    println!("\nFree text search for 'museus perto de mim':");
    agent
        .search(SearchInput::FreeText("museus perto de mim".into()))
        .await;
    print_results(&agent.state().results);

    Ok(())
}

fn print_results(results: &[rumo::SearchResult]) {
    for (i, result) in results.iter().enumerate() {
        println!(
            "  {}. {} - {} [{}]",
            i + 1,
            result.name,
            result.description,
            if result.distance_km.is_empty() {
                "?"
            } else {
                &result.distance_km
            }
        );
    }
    if results.is_empty() {
        println!("  No results");
    }
}
