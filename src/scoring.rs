use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;
use uom::si::{
    area::square_meter,
    f64::{Area, Ratio},
    ratio::{percent, ratio},
};

use crate::error::ComplianceError;
use crate::model::Space;
use crate::program::{BuildingProgram, ComplianceThresholds};
use crate::results::IlluminanceResults;
use crate::timepoint::SimulationTimepoint;

/// Compliant area of one occupied area.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpaceScore {
    pub name: String,
    pub floor_area: Area,
    pub compliant_area_by_timepoint: BTreeMap<SimulationTimepoint, Area>,
    /// Unweighted mean over the six timepoints.
    pub average_compliant_area: Area,
}

/// Outcome of the daylight credit for the selected occupied areas.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreReport {
    pub program: BuildingProgram,
    pub min_illuminance_lux: u32,
    pub spaces: Vec<SpaceScore>,
    pub total_floor_area: Area,
    pub total_average_compliant_area: Area,
    pub overall_compliant_fraction: Ratio,
    pub credit_award: u8,
}

/// Share of sensor points receiving at least `min_illuminance_lux`.
/// `None` for an empty grid.
pub fn fraction_compliant(samples: &[f64], min_illuminance_lux: u32) -> Option<Ratio> {
    if samples.is_empty() {
        return None;
    }
    let threshold = f64::from(min_illuminance_lux);
    let compliant = samples.iter().filter(|&&lux| lux >= threshold).count();
    Some(Ratio::new::<ratio>(compliant as f64 / samples.len() as f64))
}

fn score_space(
    space: &Space,
    thresholds: &ComplianceThresholds,
    results: &IlluminanceResults,
) -> Result<SpaceScore, ComplianceError> {
    let compliant_area_by_timepoint = SimulationTimepoint::ALL
        .into_iter()
        .map(|timepoint| -> Result<_, ComplianceError> {
            let samples = results.get(&space.display_name, timepoint)?;
            let fraction = fraction_compliant(samples, thresholds.min_illuminance_lux)
                .ok_or_else(|| ComplianceError::EmptyGrid {
                    space: space.display_name.clone(),
                    timepoint: timepoint.key(),
                })?;
            debug!(
                "{} at {}: {:.1} % of {} sensor points compliant",
                space.display_name,
                timepoint,
                fraction.get::<percent>(),
                samples.len()
            );
            Ok((timepoint, space.floor_area * fraction))
        })
        .collect::<Result<BTreeMap<SimulationTimepoint, Area>, _>>()?;

    let average_compliant_area = compliant_area_by_timepoint.values().copied().sum::<Area>()
        / compliant_area_by_timepoint.len() as f64;

    Ok(SpaceScore {
        name: space.display_name.clone(),
        floor_area: space.floor_area,
        compliant_area_by_timepoint,
        average_compliant_area,
    })
}

/// Aggregate simulated illuminance into the compliant area fraction and credit points.
///
/// Every space needs a non-empty result for all six timepoints; the first missing or
/// empty result aborts the run, naming the space and timepoint. Programs without
/// thresholds are rejected before any result is read.
pub fn score<'a, I>(
    program: BuildingProgram,
    thresholds: &ComplianceThresholds,
    spaces: I,
    results: &IlluminanceResults,
) -> Result<ScoreReport, ComplianceError>
where
    I: IntoIterator<Item = &'a Space>,
{
    program.thresholds()?;
    if thresholds.program != program {
        return Err(ComplianceError::InvalidThresholds {
            program,
            reason: format!("thresholds are defined for {}", thresholds.program),
        });
    }

    let spaces = spaces
        .into_iter()
        .map(|space| score_space(space, thresholds, results))
        .collect::<Result<Vec<_>, _>>()?;
    if spaces.is_empty() {
        return Err(ComplianceError::EmptySelection);
    }

    let total_floor_area: Area = spaces.iter().map(|s| s.floor_area).sum();
    let total_average_compliant_area: Area =
        spaces.iter().map(|s| s.average_compliant_area).sum();
    if !(total_floor_area > Area::new::<square_meter>(0.0)) {
        return Err(ComplianceError::ZeroFloorArea);
    }

    let overall_compliant_fraction: Ratio = total_average_compliant_area / total_floor_area;
    let credit_award = thresholds.credit_award(overall_compliant_fraction);

    info!(
        "{:.2} % of {:.2} m2 complies, {} credit point(s)",
        overall_compliant_fraction.get::<percent>(),
        total_floor_area.get::<square_meter>(),
        credit_award
    );

    Ok(ScoreReport {
        program,
        min_illuminance_lux: thresholds.min_illuminance_lux,
        spaces,
        total_floor_area,
        total_average_compliant_area,
        overall_compliant_fraction,
        credit_award,
    })
}

/// Requirements that go with a claimed credit but are not simulated.
pub fn additional_notes(thresholds: &ComplianceThresholds) -> Vec<String> {
    vec![
        "Install daylight sensors to light fittings that receive sufficient daylight illuminance."
            .into(),
        "If fixed glare control devices (shades) are not provided to any of the windows, \
         demonstrate that automated glare control devices are provided and connected to \
         the building management system."
            .into(),
        thresholds.occupancy_sensor_note.clone(),
    ]
}

impl ScoreReport {
    pub fn verdict(&self) -> String {
        let percentage = self.overall_compliant_fraction.get::<percent>();
        match self.credit_award {
            0 => format!(
                "Only {:.2}% area complies with the requirements. \
                 Hence, no credit point can be claimed.",
                percentage
            ),
            1 => format!(
                "{:.2}% area complies with the requirements. \
                 Therefore, 1 Credit point can be claimed.",
                percentage
            ),
            n => format!(
                "{:.2}% area complies with the requirements. \
                 Therefore, {} Credit points can be claimed.",
                percentage, n
            ),
        }
    }
}

/// Plain text table of compliant areas, one row per space plus a total row.
impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = std::iter::once("Occupied Area".to_string())
            .chain(std::iter::once("Total Area".to_string()))
            .chain(SimulationTimepoint::ALL.iter().map(|t| t.description()))
            .chain(std::iter::once("Average Compliant Area".to_string()))
            .join(" | ");
        writeln!(f, "{}", header)?;

        for space in &self.spaces {
            let areas = SimulationTimepoint::ALL
                .iter()
                .map(|t| match space.compliant_area_by_timepoint.get(t) {
                    Some(area) => format!("{:.2}", area.get::<square_meter>()),
                    None => "-".to_string(),
                })
                .join(" | ");
            writeln!(
                f,
                "{} | {:.2} | {} | {:.2}",
                space.name,
                space.floor_area.get::<square_meter>(),
                areas,
                space.average_compliant_area.get::<square_meter>()
            )?;
        }

        writeln!(
            f,
            "Total | {:.2} | {} | {:.2}",
            self.total_floor_area.get::<square_meter>(),
            SimulationTimepoint::ALL.iter().map(|_| "").join(" | "),
            self.total_average_compliant_area.get::<square_meter>()
        )?;
        write!(f, "{}", self.verdict())
    }
}
