use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uom::si::{f64::Ratio, ratio::ratio};

use crate::error::ComplianceError;

/// Building use category, selects the compliance thresholds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BuildingProgram {
    General,
    Retail,
    Residential,
    School,
}

impl BuildingProgram {
    pub const ALL: [BuildingProgram; 4] = [
        BuildingProgram::General,
        BuildingProgram::Retail,
        BuildingProgram::Residential,
        BuildingProgram::School,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuildingProgram::General => "General",
            BuildingProgram::Retail => "Retail",
            BuildingProgram::Residential => "Residential",
            BuildingProgram::School => "School",
        }
    }

    /// Schools are the only program where every window must carry a shading device.
    pub fn requires_shades(self) -> bool {
        self == BuildingProgram::School
    }

    /// Default thresholds of the rating system. Retail areas are excluded from the
    /// credit and have none.
    pub fn thresholds(self) -> Result<ComplianceThresholds, ComplianceError> {
        let (min_illuminance_lux, credit1, credit2, note) = match self {
            BuildingProgram::Retail => return Err(ComplianceError::Configuration(self)),
            BuildingProgram::General => (
                250,
                0.50,
                0.75,
                "Provide occupancy sensors to the lighting of all occupied areas.",
            ),
            BuildingProgram::Residential => (
                200,
                0.50,
                0.75,
                "Provide occupancy sensors to the lighting of common areas and corridors.",
            ),
            BuildingProgram::School => (
                300,
                0.75,
                0.90,
                "Provide occupancy sensors to the lighting of classrooms and all other occupied areas.",
            ),
        };
        ComplianceThresholds::new(
            self,
            min_illuminance_lux,
            Ratio::new::<ratio>(credit1),
            Ratio::new::<ratio>(credit2),
            note.into(),
        )
    }
}

impl fmt::Display for BuildingProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuildingProgram {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildingProgram::ALL
            .into_iter()
            .find(|program| program.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("Unknown building program {:?}", s))
    }
}

impl TryFrom<String> for BuildingProgram {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BuildingProgram> for String {
    fn from(program: BuildingProgram) -> Self {
        program.name().into()
    }
}

/// Minimum illuminance and the share of the occupied area that must reach it for one
/// or two credit points.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComplianceThresholds {
    pub program: BuildingProgram,
    pub min_illuminance_lux: u32,
    pub credit1_area_fraction: Ratio,
    pub credit2_area_fraction: Ratio,
    /// Advisory only, shown next to the result.
    pub occupancy_sensor_note: String,
}

impl ComplianceThresholds {
    pub fn new(
        program: BuildingProgram,
        min_illuminance_lux: u32,
        credit1_area_fraction: Ratio,
        credit2_area_fraction: Ratio,
        occupancy_sensor_note: String,
    ) -> Result<Self, ComplianceError> {
        if program == BuildingProgram::Retail {
            return Err(ComplianceError::Configuration(program));
        }
        let invalid = |reason: String| ComplianceError::InvalidThresholds { program, reason };

        if min_illuminance_lux == 0 {
            return Err(invalid("minimum illuminance must be positive".into()));
        }
        let credit1 = credit1_area_fraction.get::<ratio>();
        let credit2 = credit2_area_fraction.get::<ratio>();
        if !(credit1 > 0.0 && credit1 <= 1.0) || !(credit2 > 0.0 && credit2 <= 1.0) {
            return Err(invalid(format!(
                "area fractions must be in (0, 1], got {} and {}",
                credit1, credit2
            )));
        }
        if credit1 > credit2 {
            return Err(invalid(format!(
                "1 point area fraction {} exceeds 2 point area fraction {}",
                credit1, credit2
            )));
        }

        Ok(ComplianceThresholds {
            program,
            min_illuminance_lux,
            credit1_area_fraction,
            credit2_area_fraction,
            occupancy_sensor_note,
        })
    }

    /// Credit points for a compliant area fraction. Ties go to the higher band.
    pub fn credit_award(&self, compliant_fraction: Ratio) -> u8 {
        if compliant_fraction >= self.credit2_area_fraction {
            2
        } else if compliant_fraction >= self.credit1_area_fraction {
            1
        } else {
            0
        }
    }
}
