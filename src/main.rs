use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{debug, info};

use citydash::http::HttpClient;
use citydash::{
    DashboardConfig, DashboardSession, DashboardSnapshot, LocationResolver, ReqwestHttpClient,
    SessionController, SessionEvent, telemetry,
};

#[derive(Parser)]
#[command(name = "citydash")]
#[command(author, version, about = "Air quality, weather, traffic and energy dashboard for a city", long_about = None)]
struct Cli {
    /// City to show (defaults to the configured city)
    #[arg(short, long)]
    city: Option<String>,

    /// Load the dashboard once and exit
    #[arg(long)]
    once: bool,

    /// Disable periodic refresh
    #[arg(long)]
    no_auto_refresh: bool,

    /// Path to the configuration file
    #[arg(long, env = "CITYDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Print snapshots as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = DashboardConfig::load_from_path(cli.config.clone())?;
    telemetry::init(&config.logging, cli.verbose)?;
    debug!("Loaded configuration: {:?}", config.refresh);

    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::from_config(&config.providers)?);
    let session = DashboardSession::from_config(&config, Arc::clone(&http));
    let geocoder = Arc::new(LocationResolver::new(http));

    let auto_refresh = config.refresh.enabled && !cli.no_auto_refresh && !cli.once;
    let (controller, mut events) = SessionController::new(session, geocoder, auto_refresh);

    let city = cli
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&config.defaults.city)
        .to_string();
    info!("Starting dashboard for {}", city);

    controller.search(&city).await;

    if cli.once {
        let mut failure = None;
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::Failed { message, .. } = &event {
                failure = Some(message.clone());
            }
            print_event(&event, cli.json)?;
        }
        controller.shutdown();
        if let Some(message) = failure {
            bail!(message);
        }
        return Ok(());
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event, cli.json)?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    controller.shutdown();
    Ok(())
}

fn print_event(event: &SessionEvent, json: bool) -> Result<()> {
    match event {
        SessionEvent::Loading { city } => {
            if !json {
                println!("Fetching city coordinates and data for {city}...");
            }
        }
        SessionEvent::Updated(snapshot) => {
            if json {
                println!("{}", serde_json::to_string(snapshot.as_ref())?);
            } else {
                print_snapshot(snapshot);
            }
        }
        SessionEvent::Failed { message, panel } => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "error": message, "insights": panel })
                );
            } else {
                for insight in panel {
                    println!("{insight}");
                }
            }
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &DashboardSnapshot) {
    let location = &snapshot.location;
    println!();
    println!(
        "== {} ({}) ==",
        location.name,
        location.coordinates.format_coordinates()
    );
    println!(
        "AQI {} - {} [{}]",
        snapshot.aqi.value,
        snapshot.aqi.label,
        snapshot.provenance.map_or("Calculated", |p| p.display_name())
    );

    println!();
    println!("Air quality (µg/m³)");
    if snapshot.has_air_quality() {
        println!("  {:<6} {:>7} {:>7}", "Time", "PM2.5", "PM10");
        let series = &snapshot.air_quality;
        for ((label, pm25), pm10) in series.time_labels.iter().zip(&series.pm25).zip(&series.pm10) {
            println!("  {label:<6} {pm25:>7.1} {pm10:>7.1}");
        }
    } else {
        println!("  No Data");
    }

    println!();
    println!(
        "  {:<6} {:>6} {:>8} {:>7}",
        "Time", "Temp", "Traffic", "Energy"
    );
    for (i, label) in snapshot.hour_labels.iter().enumerate() {
        let temperature = snapshot
            .weather
            .as_ref()
            .and_then(|w| w.temperature_at(i))
            .map_or_else(|| "-".to_string(), |t| format!("{t:.1}"));
        let traffic = snapshot
            .traffic
            .get(i)
            .map_or_else(|| "-".to_string(), |t| format!("{t}%"));
        let energy = snapshot
            .energy
            .get(i)
            .map_or_else(|| "-".to_string(), ToString::to_string);
        println!("  {label:<6} {temperature:>6} {traffic:>8} {energy:>7}");
    }

    println!();
    println!("Insights");
    for insight in &snapshot.insights {
        println!("  - {insight}");
    }
    println!(
        "Last updated: {}",
        snapshot.generated_at.format("%H:%M:%S")
    );
}
