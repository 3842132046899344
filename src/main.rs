use crate::app_config::AppConfig;
use crate::domain::{GeoPoint, TravelMode};
use crate::geocoding::{AddressResolver, DebouncedAddressResolver, Geocoder, NominatimClient};
use crate::location::{LocationAcquirer, LocationError, LocationEvent, SimulatedPlatform};
use crate::routing::{PlannedRoute, RoutePlanner, RoutingClient};
use clap::{Parser, Subcommand};
use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};

mod app_config;
mod domain;
mod geocoding;
mod location;
mod polyline;
mod routing;

#[derive(Debug, Parser)]
#[command(name = "waypoint", version)]
#[command(about = "Routes, addresses and device location from the command line")]
struct Cli {
    /// Maximum level of the logs written to stderr.
    #[arg(long, env = "WAYPOINT_LOG_LEVEL", default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the points of an encoded polyline.
    Decode { polyline: String },
    /// Encode `latitude,longitude` points into a polyline.
    Encode {
        #[arg(required = true, allow_hyphen_values = true)]
        points: Vec<String>,
    },
    /// Print the address of a coordinate.
    Reverse {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Print the places matching a query.
    Search { query: String },
    /// Print the route between two coordinates.
    Route {
        #[arg(allow_negative_numbers = true)]
        from_latitude: f64,
        #[arg(allow_negative_numbers = true)]
        from_longitude: f64,
        #[arg(allow_negative_numbers = true)]
        to_latitude: f64,
        #[arg(allow_negative_numbers = true)]
        to_longitude: f64,
        /// walking, cycling or driving. Anything else routes on foot.
        #[arg(long, value_parser = TravelMode::from_str, default_value = "walking")]
        mode: TravelMode,
    },
    /// Acquire the device location and print it with its address.
    Locate,
    /// Read `latitude,longitude` lines from stdin and print the address once the input settles.
    Follow,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_max_level(cli.log_level).with_writer(std::io::stderr).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("✅  Loaded configuration");

    match cli.command {
        Command::Decode { polyline: encoded } => {
            for point in polyline::decode(&encoded)? {
                println!("{}", point);
            }
        }
        Command::Encode { points } => {
            let points = points.iter().map(|point| parse_point(point)).collect::<Result<Vec<_>, _>>()?;
            println!("{}", polyline::encode(&points));
        }
        Command::Reverse { latitude, longitude } => {
            let mut resolver = AddressResolver::new(Arc::new(NominatimClient::new(&config)?));
            let address = resolver.resolve(GeoPoint::try_new(latitude, longitude)?).await;
            debug!(source = ?address.source, "🗺️ Resolved address");
            println!("{}", address.text);
        }
        Command::Search { query } => {
            for place in NominatimClient::new(&config)?.search(&query).await? {
                println!("{}\t{}", place.point, place.display_name);
            }
        }
        Command::Route {
            from_latitude,
            from_longitude,
            to_latitude,
            to_longitude,
            mode,
        } => {
            let from = GeoPoint::try_new(from_latitude, from_longitude)?;
            let to = GeoPoint::try_new(to_latitude, to_longitude)?;
            route(&config, from, to, mode).await?;
        }
        Command::Locate => locate(&config).await?,
        Command::Follow => follow(&config).await?,
    }

    Ok(())
}

async fn route(config: &AppConfig, from: GeoPoint, to: GeoPoint, mode: TravelMode) -> Result<(), Box<dyn Error>> {
    let mut planner = RoutePlanner::new(RoutingClient::new(config)?);
    planner.set_mode(mode);
    planner.fetch_route(from, to).await?;

    if let Some(planned) = planner.route() {
        print!("{}", describe_route(planner.mode(), planned, config.routing().units()));
    }

    Ok(())
}

fn describe_route(mode: TravelMode, planned: &PlannedRoute, units: &str) -> String {
    let summary = &planned.route.summary;
    let mut description = format!(
        "{} route: {:.2} {}, {:.0} min, {} points\n",
        mode,
        summary.distance,
        units,
        summary.duration / 60.0,
        planned.points.len()
    );
    for step in planned.route.steps() {
        description.push_str(&format!("  {} ({:.2} {})\n", step.instruction, step.distance, units));
    }
    description
}

async fn locate(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let platform = Arc::new(SimulatedPlatform::new(config.location()));
    let (events_tx, mut events_rx) = mpsc::channel(4);
    let (_retry_tx, retry_rx) = watch::channel(0);

    let acquirer = LocationAcquirer::new(platform, config.location().request(), config.location().fetch_timeout(), events_tx);
    let handle = acquirer.spawn(retry_rx);

    let outcome = loop {
        match events_rx.recv().await {
            Some(LocationEvent::PermissionGranted) => continue,
            Some(LocationEvent::Resolved(point)) => break Ok(point),
            Some(LocationEvent::Failed(e)) => break Err(e),
            None => break Err(LocationError::Platform("location acquisition stopped".to_string())),
        }
    };
    handle.cancel().await;

    let point = outcome.inspect_err(|e| {
        if e.is_recoverable() {
            warn!("📍 Positioning is disabled, enable it and run again");
        }
    })?;

    let mut resolver = AddressResolver::new(Arc::new(NominatimClient::new(config)?));
    let address = resolver.resolve(point).await;
    println!("{}\t{}", point, address.text);

    Ok(())
}

async fn follow(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let geocoder = Arc::new(NominatimClient::new(config)?);
    let (updates_tx, mut updates_rx) = mpsc::channel(16);
    let (resolver, task) = DebouncedAddressResolver::spawn(geocoder, config.geocoding().debounce(), updates_tx);

    let printer = tokio::spawn(async move {
        while let Some(update) = updates_rx.recv().await {
            println!("{}\t{}", update.point, update.address.text);
        }
    });

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    while let Some(line) = lines.next().await {
        let line = line?;
        match parse_point(&line) {
            Ok(point) => resolver.on_coordinate_changed(point)?,
            Err(e) => warn!("⏱️ Skipping '{}': {}", line.trim(), e),
        }
    }

    drop(resolver);
    task.await?;
    printer.await?;

    Ok(())
}

fn parse_point(line: &str) -> Result<GeoPoint, Box<dyn Error>> {
    let (latitude, longitude) = line.split_once(',').ok_or("expected 'latitude,longitude'")?;
    Ok(GeoPoint::try_new(latitude.trim().parse()?, longitude.trim().parse()?)?)
}
