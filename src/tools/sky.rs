use std::collections::BTreeMap;

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, TimeZone, Utc};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use uom::si::{
    angle::degree,
    f64::{Angle, Length},
    length::meter,
};

use super::round_to_decimals;
use crate::program::ComplianceThresholds;
use crate::timepoint::SimulationTimepoint;

/// Non-leap year the timepoints are placed in.
pub const SIMULATION_YEAR: i32 = 2017;

/// Number of ambient bounces of the raytracing run.
pub const AMBIENT_BOUNCES: u32 = 7;

const GROUND_REFLECTANCE: f64 = 0.2;

/// Height of the sensor grid above the floor, in meters.
pub fn grid_offset() -> Length {
    Length::new::<meter>(0.762)
}

/// Site of the building.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees, north positive
    pub latitude: f64,
    /// Degrees, east positive
    pub longitude: f64,
    /// Hours from UTC of the local standard time
    #[serde(default)]
    pub utc_offset: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunPosition {
    /// Angle above the horizon
    pub altitude: Angle,
    /// Clockwise from the model north
    pub azimuth: Angle,
}

/// Convert a timepoint in local standard time of the location to UTC.
fn to_utc(location: &Location, timepoint: SimulationTimepoint) -> anyhow::Result<DateTime<Utc>> {
    let local = timepoint
        .local_datetime(SIMULATION_YEAR)
        .with_context(|| format!("Invalid timepoint {}", timepoint))?;
    if !location.utc_offset.is_finite() {
        bail!("UTC offset must be a finite number of hours");
    }
    let offset = Duration::try_seconds((location.utc_offset * 3600.0).round() as i64)
        .with_context(|| format!("UTC offset {} is out of range", location.utc_offset))?;
    let utc = local
        .checked_sub_signed(offset)
        .with_context(|| format!("UTC offset {} is out of range", location.utc_offset))?;
    Ok(Utc.from_utc_datetime(&utc))
}

/// Position of the sun at a timepoint, with the azimuth measured from the model north.
///
/// # Arguments
/// * `location` - site of the building
/// * `timepoint` - one of the simulated points in time
/// * `north_angle` - rotation of the model north from the true north, clockwise
pub fn sun_position(
    location: &Location,
    timepoint: SimulationTimepoint,
    north_angle: Angle,
) -> anyhow::Result<SunPosition> {
    let utc = to_utc(location, timepoint)?;
    let solar_position = spa::calc_solar_position(utc, location.latitude, location.longitude)?;

    let altitude = 90.0 - solar_position.zenith_angle;
    if altitude <= 0.0 {
        bail!(
            "The sun is below the horizon at {} ({} UTC)",
            timepoint.description(),
            utc
        );
    }
    let azimuth = (solar_position.azimuth - north_angle.get::<degree>()).rem_euclid(360.0);

    Ok(SunPosition {
        altitude: Angle::new::<degree>(altitude),
        azimuth: Angle::new::<degree>(azimuth),
    })
}

/// CIE clear sky description with sun for the raytracer.
pub fn cie_sky(sun: &SunPosition) -> String {
    format!(
        "cie -alt {:.2} -az {:.2} -type 0 -g {}",
        sun.altitude.get::<degree>(),
        sun.azimuth.get::<degree>(),
        GROUND_REFLECTANCE
    )
}

/// Arguments of one point-in-time grid illuminance run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationRequest {
    #[serde(skip)]
    pub timepoint: SimulationTimepoint,
    pub arguments: BTreeMap<String, String>,
}

impl SimulationRequest {
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }
}

/// Build the six illuminance runs of the daylight credit.
///
/// # Arguments
/// * `model` - reference to the uploaded model the runs use
/// * `location` - site of the building
/// * `north_angle` - rotation of the model north from the true north, clockwise
pub fn simulation_requests(
    model: &str,
    location: &Location,
    north_angle: Angle,
) -> anyhow::Result<Vec<SimulationRequest>> {
    let north = round_to_decimals(north_angle.get::<degree>(), 6);
    if !(0.0..=360.0).contains(&north) {
        bail!("North angle must be between 0 and 360 degrees, got {}", north);
    }

    SimulationTimepoint::ALL
        .into_iter()
        .map(|timepoint| -> anyhow::Result<SimulationRequest> {
            let sun = sun_position(location, timepoint, north_angle)?;
            let sky = cie_sky(&sun);
            debug!("{}: {}", timepoint.description(), sky);

            let arguments = BTreeMap::from([
                ("model".to_string(), model.to_string()),
                ("metric".to_string(), "illuminance".to_string()),
                (
                    "radiance-parameters".to_string(),
                    format!("-ab {}", AMBIENT_BOUNCES),
                ),
                ("sky".to_string(), sky),
                ("month_day_hour".to_string(), timepoint.key()),
            ]);
            Ok(SimulationRequest {
                timepoint,
                arguments,
            })
        })
        .collect()
}

/// Human readable summary of the fixed simulation settings.
pub fn simulation_parameters(thresholds: &ComplianceThresholds) -> Vec<String> {
    vec![
        "Sky: CIE clear sky".to_string(),
        format!("Ambient bounces: {}", AMBIENT_BOUNCES),
        format!(
            "Grid offset from floor: {} m",
            grid_offset().get::<meter>()
        ),
        format!(
            "Illuminance threshold: {} lux",
            thresholds.min_illuminance_lux
        ),
        format!("Simulated on {}", timepoint_list()),
    ]
}

fn timepoint_list() -> String {
    SimulationTimepoint::ALL
        .iter()
        .map(|t| t.description())
        .join(", ")
}
