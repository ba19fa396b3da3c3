//! Points command - query the point API and print results.

use benchmap::api::{HttpPointClient, PointClient};
use benchmap::coord::LatLon;
use benchmap::model::strip_markup;
use benchmap::{Point, SessionConfig};

use crate::error::CliError;

/// List points near a coordinate.
pub async fn nearby(
    config: &SessionConfig,
    lat: f64,
    lon: f64,
    radius: Option<u32>,
) -> Result<(), CliError> {
    let client = HttpPointClient::new(config.api.base_url.as_str())?;
    let radius = radius.unwrap_or(config.api.nearby_radius_m);

    let points = client.nearby(LatLon::new(lat, lon), radius).await?;
    print_points(&points, &format!("within {radius} m of {lat},{lon}"));
    Ok(())
}

/// Search points by inscription text.
pub async fn search(config: &SessionConfig, query: &str) -> Result<(), CliError> {
    let client = HttpPointClient::new(config.api.base_url.as_str())?;

    let points = client.search(query).await?;
    print_points(&points, &format!("matching \"{query}\""));
    Ok(())
}

fn print_points(points: &[Point], scope: &str) {
    if points.is_empty() {
        println!("No benches found {scope}");
        return;
    }

    println!("{} benches {scope}", points.len());
    println!("{}", "=".repeat(40));
    for point in points {
        let label = strip_markup(&point.label);
        let label = label.trim();
        let short = if label.chars().count() > 60 {
            let truncated: String = label.chars().take(57).collect();
            format!("{truncated}...")
        } else {
            label.to_string()
        };
        println!(
            "#{:<8} {:>10.5},{:>11.5}  {}",
            point.id, point.latitude, point.longitude, short
        );
    }
}
