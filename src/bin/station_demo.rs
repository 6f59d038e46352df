//! Thin demo binary: loads a handful of station templates from a directory
//! and drives them concurrently. Reads configuration from TOML file at
//! `~/.config/ocpp-station-sim/config.toml`, falling back to defaults.
//!
//! This binary is not part of the session-engine core; it exists only to
//! exercise it end to end (§4.L).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use ocpp_station_sim::station::actor;
use ocpp_station_sim::station::template::StationTemplate;
use ocpp_station_sim::station::Station;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DemoConfig {
    /// Directory containing one JSON [StationTemplate] file per station.
    template_dir: PathBuf,
    #[serde(default = "DemoConfig::default_log_level")]
    log_level: String,
}

impl DemoConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_path() -> PathBuf {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ocpp-station-sim")
            .join("config.toml")
    }

    fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("./templates"),
            log_level: Self::default_log_level(),
        }
    }
}

fn load_templates(dir: &Path) -> Vec<StationTemplate> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not read template directory");
            return Vec::new();
        }
    };

    let mut templates = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match std::fs::read_to_string(&path).and_then(|text| {
            serde_json::from_str::<StationTemplate>(&text).map_err(std::io::Error::from)
        }) {
            Ok(template) => templates.push(template),
            Err(e) => warn!(file = %path.display(), error = %e, "skipping invalid station template"),
        }
    }
    templates
}

#[tokio::main]
async fn main() {
    let config_path = std::env::var("OCPP_STATION_SIM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| DemoConfig::default_path());

    let config = match DemoConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            warn!(path = %config_path.display(), error = %e, "using default demo configuration");
            return run(DemoConfig::default()).await;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    run(config).await;
}

async fn run(config: DemoConfig) {
    info!(dir = %config.template_dir.display(), "loading station templates");
    let templates = load_templates(&config.template_dir);
    if templates.is_empty() {
        error!("no station templates found, nothing to simulate");
        return;
    }

    let stations: Vec<Station> = templates.into_iter().map(Station::new).collect();
    info!(count = stations.len(), "stations constructed");

    let mut joins = Vec::new();
    for station in stations {
        let station_id = station.template.station_id.clone();
        let (_handle, join) = actor::spawn(station);
        info!(station = %station_id, "actor spawned");
        joins.push(join);
    }

    for join in joins {
        if let Err(e) = join.await {
            error!(error = %e, "station actor task panicked");
        }
    }
}
