use thiserror::Error;

use crate::program::BuildingProgram;
use crate::session::Stage;

/// Failures that abort an evaluation or scoring run.
///
/// Geometry that cannot be validated and spaces with inconsistent aperture data are not
/// errors; they are reported as warnings on the owning space or window.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComplianceError {
    #[error("Program {0} is excluded from this credit and has no compliance thresholds")]
    Configuration(BuildingProgram),

    #[error("Invalid thresholds for program {program}: {reason}")]
    InvalidThresholds {
        program: BuildingProgram,
        reason: String,
    },

    #[error("Missing illuminance result for space {space:?} at {timepoint}")]
    MissingResult { space: String, timepoint: String },

    #[error("Sensor grid of space {space:?} at {timepoint} has no points")]
    EmptyGrid { space: String, timepoint: String },

    #[error("Malformed illuminance result for space {space:?} at {timepoint}: {reason}")]
    MalformedResult {
        space: String,
        timepoint: String,
        reason: String,
    },

    #[error("No occupied areas were selected")]
    EmptySelection,

    #[error("Selected occupied areas have zero total floor area")]
    ZeroFloorArea,

    #[error("Could not find space {0:?} in the model")]
    UnknownSpace(String),

    #[error("Cannot move from stage {from:?} to {to:?}")]
    InvalidTransition { from: Stage, to: Stage },
}
