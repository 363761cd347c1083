use crate::domains::auction::BidPolicy;
use crate::domains::fleet::EnergyProfile;
use crate::domains::grid::Axis;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "MEDIFLEET";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub robots: Vec<RobotConfig>,
    pub energy: EnergyProfile,
    pub auction: BidPolicy,
    pub pathfinding: PathfindingConfig,
    pub scheduler: SchedulerConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
    pub demo: DemoConfig,
}

/// A `[grid]` section describes a whole floor: anything it leaves out is
/// empty. Only a missing section falls back to the hospital floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,
    #[serde(default)]
    pub blocked: Vec<[usize; 2]>,
    #[serde(default)]
    pub waypoints: Vec<WaypointConfig>,
    /// Where robots park; never accepted as a destination.
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointConfig {
    pub name: String,
    pub cell: [usize; 2],
    #[serde(default)]
    pub default_priority: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleConfig {
    pub id: String,
    pub start: [usize; 2],
    pub end: [usize; 2],
    pub axis: Axis,
    pub ticks_per_step: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    pub id: String,
    pub cell: [usize; 2],
    #[serde(default = "full_energy")]
    pub energy: f64,
}

fn full_energy() -> f64 {
    100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    pub search_budget_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_rate_hz: u32,
    pub inbox_capacity: usize,
    /// `None` keeps failed robots parked for good.
    pub failed_robot_cooldown_ticks: Option<u64>,
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSink {
    Log,
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub sink: EventSink,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub seed: Option<u64>,
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults, overlaid by an optional TOML file, overlaid by
    /// `MEDIFLEET__SECTION__KEY` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let layered = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("building layered configuration")?;
        let config: Config = layered
            .try_deserialize()
            .context("deserializing configuration")?;
        Ok(config)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        let hz = self.scheduler.tick_rate_hz.max(1) as u64;
        std::time::Duration::from_micros((1_000_000 / hz).max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            robots: default_robots(),
            energy: EnergyProfile::default(),
            auction: BidPolicy::default(),
            pathfinding: PathfindingConfig::default(),
            scheduler: SchedulerConfig::default(),
            events: EventsConfig::default(),
            logging: LoggingConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        let waypoint = |name: &str, row, col, default_priority| WaypointConfig {
            name: name.to_string(),
            cell: [row, col],
            default_priority,
        };
        Self {
            rows: 12,
            cols: 7,
            blocked: Vec::new(),
            waypoints: vec![
                waypoint("ENT", 1, 3, None),
                waypoint("PHA", 4, 3, Some(2)),
                waypoint("ICU", 4, 1, Some(1)),
                waypoint("R101", 4, 5, Some(3)),
                waypoint("EMR", 7, 3, Some(4)),
                waypoint("STO", 10, 3, Some(5)),
            ],
            home: Some("ENT".to_string()),
            obstacles: vec![
                ObstacleConfig {
                    id: "cart-6".to_string(),
                    start: [6, 1],
                    end: [6, 5],
                    axis: Axis::Horizontal,
                    ticks_per_step: 5,
                },
                ObstacleConfig {
                    id: "cart-3".to_string(),
                    start: [3, 1],
                    end: [3, 5],
                    axis: Axis::Horizontal,
                    ticks_per_step: 2,
                },
                ObstacleConfig {
                    id: "gurney".to_string(),
                    start: [5, 4],
                    end: [9, 4],
                    axis: Axis::Vertical,
                    ticks_per_step: 5,
                },
            ],
        }
    }
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self { search_budget_ms: 250 }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 5,
            inbox_capacity: 64,
            failed_robot_cooldown_ticks: Some(20),
            max_ticks: None,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            sink: EventSink::Log,
            file_path: PathBuf::from("medifleet-events.jsonl"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 3_000,
            seed: None,
        }
    }
}

pub fn default_robots() -> Vec<RobotConfig> {
    [("R1", 1, 2), ("R2", 1, 3), ("R3", 1, 4)]
        .into_iter()
        .map(|(id, row, col)| RobotConfig {
            id: id.to_string(),
            cell: [row, col],
            energy: full_energy(),
        })
        .collect()
}
