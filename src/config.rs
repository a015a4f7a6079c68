use std::fs;
use std::path::Path;

use anyhow::Context;
use uom::si::{
    angle::degree,
    f64::{Angle, Ratio},
    ratio::ratio,
};

use crate::program::{BuildingProgram, ComplianceThresholds};
use crate::tools::sky::Location;

/// Model tolerance used when none is configured, in meters.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Settings of one compliance run.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub program: BuildingProgram,
    /// Rating system defaults of the program unless overridden.
    pub thresholds: ComplianceThresholds,
    pub tolerance: f64,
    /// Needed only to build simulation requests.
    pub location: Option<Location>,
    pub north_angle: Angle,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let string = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::from_json(&string)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let loaded: as_loaded::Config = json5::from_str(json)?;
        loaded.try_into()
    }

    /// Defaults for a program, without a location.
    pub fn for_program(program: BuildingProgram) -> anyhow::Result<Self> {
        Ok(Config {
            program,
            thresholds: program.thresholds()?,
            tolerance: DEFAULT_TOLERANCE,
            location: None,
            north_angle: Angle::new::<degree>(0.0),
        })
    }
}

impl TryFrom<as_loaded::Config> for Config {
    type Error = anyhow::Error;

    fn try_from(value: as_loaded::Config) -> Result<Self, Self::Error> {
        if !(value.tolerance > 0.0) {
            anyhow::bail!("Tolerance must be positive, got {}", value.tolerance);
        }
        if !(0.0..=360.0).contains(&value.north_angle) {
            anyhow::bail!(
                "North angle must be between 0 and 360 degrees, got {}",
                value.north_angle
            );
        }
        if let Some(location) = &value.location {
            if !(-12.0..=14.0).contains(&location.utc_offset) {
                anyhow::bail!(
                    "UTC offset must be between -12 and 14 hours, got {}",
                    location.utc_offset
                );
            }
            if !(-90.0..=90.0).contains(&location.latitude) {
                anyhow::bail!(
                    "Latitude must be between -90 and 90 degrees, got {}",
                    location.latitude
                );
            }
            if !(-180.0..=180.0).contains(&location.longitude) {
                anyhow::bail!(
                    "Longitude must be between -180 and 180 degrees, got {}",
                    location.longitude
                );
            }
        }

        let defaults = value.program.thresholds()?;
        let thresholds = match value.thresholds {
            None => defaults,
            Some(overrides) => ComplianceThresholds::new(
                value.program,
                overrides.min_illuminance_lux,
                Ratio::new::<ratio>(overrides.credit1_area_fraction),
                Ratio::new::<ratio>(overrides.credit2_area_fraction),
                overrides
                    .occupancy_sensor_note
                    .unwrap_or(defaults.occupancy_sensor_note),
            )?,
        };

        Ok(Config {
            program: value.program,
            thresholds,
            tolerance: value.tolerance,
            location: value.location,
            north_angle: Angle::new::<degree>(value.north_angle),
        })
    }
}

mod as_loaded {
    use serde::Deserialize;

    use crate::program::BuildingProgram;
    use crate::tools::sky::Location;

    #[derive(Deserialize, Debug)]
    #[serde(deny_unknown_fields)]
    pub struct Config {
        pub program: BuildingProgram,
        #[serde(default = "default_tolerance")]
        pub tolerance: f64,
        pub thresholds: Option<Thresholds>,
        pub location: Option<Location>,
        #[serde(default)]
        pub north_angle: f64,
    }

    fn default_tolerance() -> f64 {
        super::DEFAULT_TOLERANCE
    }

    #[derive(Deserialize, Debug)]
    #[serde(deny_unknown_fields)]
    pub struct Thresholds {
        pub min_illuminance_lux: u32,
        pub credit1_area_fraction: f64,
        pub credit2_area_fraction: f64,
        pub occupancy_sensor_note: Option<String>,
    }
}
