use log::{debug, info, warn};
use serde::Serialize;
use uom::si::{area::square_meter, f64::Area};

use crate::error::ComplianceError;
use crate::model::{Aperture, Space};
use crate::program::BuildingProgram;
use crate::shading::check_shade_width;

pub const SCHOOL_SHADES_REQUIRED: &str = "For the program type of School shades are required.";

/// Anything that owns apertures and can be evaluated as an occupied area.
pub trait ApertureHost {
    fn name(&self) -> &str;
    fn exterior_aperture_area(&self) -> Area;
    /// Apertures in a stable order: bounding faces first, then apertures within a face.
    fn apertures(&self) -> impl Iterator<Item = &Aperture>;
}

impl ApertureHost for Space {
    fn name(&self) -> &str {
        &self.display_name
    }

    fn exterior_aperture_area(&self) -> Area {
        self.exterior_aperture_area
    }

    fn apertures(&self) -> impl Iterator<Item = &Aperture> {
        Space::apertures(self)
    }
}

/// Shading status of one aperture.
///
/// Serializes to the compact per-window record: warnings are left out when empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowEvaluation {
    pub name: String,
    pub has_external_shading: bool,
    pub has_internal_shading: bool,
    #[serde(skip)]
    pub is_compliant: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Evaluate the shades of a single aperture.
///
/// Any outdoor shade makes the window compliant. Indoor shades only count when every
/// one of them passes the width check; each failing shade adds its own warning.
pub fn evaluate_window(
    aperture: &Aperture,
    program: BuildingProgram,
    tolerance: f64,
) -> WindowEvaluation {
    let has_external_shading = !aperture.outdoor_shades.is_empty();

    let mut warnings = Vec::new();
    let mut has_internal_shading = false;
    if !aperture.indoor_shades.is_empty() {
        let checks: Vec<_> = aperture
            .indoor_shades
            .iter()
            .map(|shade| (shade, check_shade_width(shade, tolerance)))
            .collect();
        has_internal_shading = checks.iter().all(|(_, width)| width.passes());
        warnings.extend(
            checks
                .iter()
                .filter_map(|(shade, width)| width.warning(&shade.display_name)),
        );
    }

    let is_compliant = has_external_shading || has_internal_shading;
    if !is_compliant && program.requires_shades() {
        warnings.push(SCHOOL_SHADES_REQUIRED.into());
    }

    debug!(
        "Window {:?}: external {}, internal {}, {} warning(s)",
        aperture.display_name,
        has_external_shading,
        has_internal_shading,
        warnings.len()
    );

    WindowEvaluation {
        name: aperture.display_name.clone(),
        has_external_shading,
        has_internal_shading,
        is_compliant,
        warnings,
    }
}

/// Window and shading status of one occupied area.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpaceEvaluation {
    pub name: String,
    pub has_windows: bool,
    /// True only when the space has windows and all of them are compliant.
    pub all_windows_shaded: bool,
    pub warning_count: usize,
    pub warnings: Vec<String>,
    pub windows: Vec<WindowEvaluation>,
}

/// Evaluate every aperture of a space.
///
/// Spaces without exterior aperture area have no windows; their apertures are not
/// looked at. A space that reports exterior aperture area but has no apertures gets a
/// warning and is not considered shaded.
pub fn evaluate_space<S: ApertureHost>(
    space: &S,
    program: BuildingProgram,
    tolerance: f64,
) -> SpaceEvaluation {
    let name = space.name().to_string();

    if space.exterior_aperture_area() <= Area::new::<square_meter>(0.0) {
        debug!("Space {:?} has no exterior windows", name);
        return SpaceEvaluation {
            name,
            has_windows: false,
            all_windows_shaded: false,
            warning_count: 0,
            warnings: Vec::new(),
            windows: Vec::new(),
        };
    }

    let windows: Vec<_> = space
        .apertures()
        .map(|aperture| evaluate_window(aperture, program, tolerance))
        .collect();
    let mut warnings: Vec<String> = windows
        .iter()
        .flat_map(|window| window.warnings.iter().cloned())
        .collect();

    let all_windows_shaded = if windows.is_empty() {
        let message = format!(
            "Space {} reports exterior aperture area but no apertures were found.",
            name
        );
        debug!("{}", message);
        warnings.push(message);
        false
    } else {
        windows.iter().all(|window| window.is_compliant)
    };

    SpaceEvaluation {
        name,
        has_windows: true,
        all_windows_shaded,
        warning_count: warnings.len(),
        warnings,
        windows,
    }
}

/// Evaluate the selected occupied areas.
///
/// Fails up front for programs without thresholds, before any space is looked at.
pub fn evaluate_spaces<'a, S, I>(
    spaces: I,
    program: BuildingProgram,
    tolerance: f64,
) -> Result<Vec<SpaceEvaluation>, ComplianceError>
where
    S: ApertureHost + 'a,
    I: IntoIterator<Item = &'a S>,
{
    program.thresholds()?;

    let evaluations: Vec<_> = spaces
        .into_iter()
        .map(|space| evaluate_space(space, program, tolerance))
        .collect();

    info!(
        "Evaluated {} occupied area(s): {} with windows, {} fully shaded, {} warning(s)",
        evaluations.len(),
        evaluations.iter().filter(|e| e.has_windows).count(),
        evaluations.iter().filter(|e| e.all_windows_shaded).count(),
        evaluations.iter().map(|e| e.warning_count).sum::<usize>()
    );
    for warning in evaluations.iter().flat_map(|e| e.warnings.iter()) {
        warn!("{}", warning);
    }

    Ok(evaluations)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::geometry::tests::{horizontal_square, vertical_rectangle};
    use crate::model::{BoundaryCondition, Face, Model, Shade};
    use crate::shading::MAX_SHADE_WIDTH;
    use assert_matches::assert_matches;
    use test_case::test_case;
    use test_strategy::proptest;

    fn shade(name: &str, width: f64) -> Shade {
        Shade {
            display_name: name.into(),
            geometry: vertical_rectangle(width, 2.0),
        }
    }

    fn aperture(name: &str, outdoor: Vec<Shade>, indoor: Vec<Shade>) -> Aperture {
        Aperture {
            display_name: name.into(),
            geometry: None,
            outdoor_shades: outdoor,
            indoor_shades: indoor,
        }
    }

    fn space(name: &str, exterior_area: f64, apertures: Vec<Vec<Aperture>>) -> Space {
        Space {
            display_name: name.into(),
            floor_area: Area::new::<square_meter>(20.0),
            exterior_aperture_area: Area::new::<square_meter>(exterior_area),
            faces: apertures
                .into_iter()
                .map(|apertures| Face {
                    boundary_condition: BoundaryCondition::Outdoors,
                    apertures,
                })
                .collect(),
        }
    }

    /// Counts how often the apertures are asked for.
    struct SpySpace {
        inner: Space,
        aperture_calls: Cell<usize>,
    }

    impl ApertureHost for SpySpace {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn exterior_aperture_area(&self) -> Area {
            self.inner.exterior_aperture_area
        }

        fn apertures(&self) -> impl Iterator<Item = &Aperture> {
            self.aperture_calls.set(self.aperture_calls.get() + 1);
            self.inner.apertures()
        }
    }

    #[test]
    fn external_shade_only() {
        let window = evaluate_window(
            &aperture("w", vec![shade("fin", 10.0)], vec![]),
            BuildingProgram::General,
            0.01,
        );

        assert!(window.has_external_shading);
        assert!(!window.has_internal_shading);
        assert!(window.is_compliant);
        assert!(window.warnings.is_empty());
    }

    #[test_case(BuildingProgram::School, vec![SCHOOL_SHADES_REQUIRED.to_string()]; "school")]
    #[test_case(BuildingProgram::General, vec![]; "general")]
    #[test_case(BuildingProgram::Residential, vec![]; "residential")]
    fn unshaded_window(program: BuildingProgram, expected_warnings: Vec<String>) {
        let window = evaluate_window(&aperture("w", vec![], vec![]), program, 0.01);

        assert!(!window.has_external_shading);
        assert!(!window.has_internal_shading);
        assert!(!window.is_compliant);
        assert_eq!(window.warnings, expected_warnings);
    }

    #[test]
    fn narrow_internal_shades() {
        let window = evaluate_window(
            &aperture("w", vec![], vec![shade("a", 1.0), shade("b", 3.0)]),
            BuildingProgram::School,
            0.01,
        );

        assert!(window.has_internal_shading);
        assert!(window.is_compliant);
        assert!(window.warnings.is_empty());
    }

    #[test]
    fn one_wide_internal_shade_disqualifies_all() {
        let window = evaluate_window(
            &aperture(
                "w",
                vec![],
                vec![shade("a", 1.0), shade("b", 6.0), shade("c", 5.0)],
            ),
            BuildingProgram::School,
            0.01,
        );

        assert!(!window.has_internal_shading);
        assert!(!window.is_compliant);
        assert_eq!(
            window.warnings,
            vec![
                "Shade b is wider than 4 meters.".to_string(),
                "Shade c is wider than 4 meters.".to_string(),
                SCHOOL_SHADES_REQUIRED.to_string(),
            ]
        );
    }

    #[test]
    fn wide_internal_shade_with_external_shade() {
        let window = evaluate_window(
            &aperture("w", vec![shade("overhang", 8.0)], vec![shade("b", 6.0)]),
            BuildingProgram::School,
            0.01,
        );

        assert!(window.has_external_shading);
        assert!(!window.has_internal_shading);
        assert!(window.is_compliant);
        assert_eq!(window.warnings, vec!["Shade b is wider than 4 meters.".to_string()]);
    }

    #[test]
    fn duplicate_warnings_are_kept() {
        let window = evaluate_window(
            &aperture("w", vec![], vec![shade("b", 6.0), shade("b", 6.0)]),
            BuildingProgram::General,
            0.01,
        );

        assert_eq!(window.warnings.len(), 2);
        assert_eq!(window.warnings[0], window.warnings[1]);
    }

    #[test]
    fn space_without_exterior_area_is_not_traversed() {
        let spy = SpySpace {
            inner: space(
                "storage",
                0.0,
                vec![vec![aperture("w", vec![], vec![shade("b", 6.0)])]],
            ),
            aperture_calls: Cell::new(0),
        };

        let evaluation = evaluate_space(&spy, BuildingProgram::School, 0.01);

        assert_eq!(spy.aperture_calls.get(), 0);
        assert!(!evaluation.has_windows);
        assert!(!evaluation.all_windows_shaded);
        assert!(evaluation.warnings.is_empty());
        assert!(evaluation.windows.is_empty());
    }

    #[test]
    fn space_with_exterior_area_is_traversed_once() {
        let spy = SpySpace {
            inner: space("office", 2.0, vec![vec![aperture("w", vec![shade("fin", 1.0)], vec![])]]),
            aperture_calls: Cell::new(0),
        };

        let evaluation = evaluate_space(&spy, BuildingProgram::General, 0.01);

        assert_eq!(spy.aperture_calls.get(), 1);
        assert!(evaluation.has_windows);
        assert!(evaluation.all_windows_shaded);
    }

    #[test]
    fn space_collects_warnings_in_aperture_order() {
        let evaluation = evaluate_space(
            &space(
                "classroom",
                4.0,
                vec![
                    vec![aperture("w1", vec![], vec![shade("b1", 6.0)])],
                    vec![],
                    vec![
                        aperture("w2", vec![shade("fin", 1.0)], vec![]),
                        aperture("w3", vec![], vec![]),
                    ],
                ],
            ),
            BuildingProgram::School,
            0.01,
        );

        assert!(evaluation.has_windows);
        assert!(!evaluation.all_windows_shaded);
        assert_eq!(
            evaluation.windows.iter().map(|w| w.name.as_str()).collect::<Vec<_>>(),
            vec!["w1", "w2", "w3"]
        );
        assert_eq!(
            evaluation.warnings,
            vec![
                "Shade b1 is wider than 4 meters.".to_string(),
                SCHOOL_SHADES_REQUIRED.to_string(),
                SCHOOL_SHADES_REQUIRED.to_string(),
            ]
        );
        assert_eq!(evaluation.warning_count, 3);
    }

    #[test]
    fn exterior_area_without_apertures_is_flagged() {
        let evaluation = evaluate_space(
            &space("atrium", 5.0, vec![vec![]]),
            BuildingProgram::General,
            0.01,
        );

        assert!(evaluation.has_windows);
        assert!(!evaluation.all_windows_shaded);
        assert_eq!(evaluation.warning_count, 1);
        evaluation.warnings[0]
            .find("atrium")
            .expect("Warning should contain the name of the space");
    }

    #[test]
    fn compact_window_record() {
        let evaluation = evaluate_space(
            &space(
                "office",
                2.0,
                vec![vec![
                    aperture("clean", vec![shade("fin", 1.0)], vec![]),
                    aperture(
                        "dirty",
                        vec![],
                        vec![Shade {
                            display_name: "sheet".into(),
                            geometry: horizontal_square(MAX_SHADE_WIDTH + 1.0),
                        }],
                    ),
                ]],
            ),
            BuildingProgram::General,
            0.01,
        );

        let json = json5::to_string(&evaluation.windows).unwrap();

        assert_eq!(json.matches("warnings").count(), 1);
        assert_eq!(json.matches("is_compliant").count(), 0);
        json.find("Shade sheet is wider than 4 meters.")
            .expect("Record should carry the warning of the failing window");
        assert!(json.find("clean").unwrap() < json.find("warnings").unwrap());
    }

    #[test]
    fn retail_is_rejected_before_evaluation() {
        let spy = SpySpace {
            inner: space("shop", 2.0, vec![vec![aperture("w", vec![], vec![])]]),
            aperture_calls: Cell::new(0),
        };

        let result = evaluate_spaces([&spy], BuildingProgram::Retail, 0.01);

        assert_matches!(result, Err(ComplianceError::Configuration(BuildingProgram::Retail)));
        assert_eq!(spy.aperture_calls.get(), 0);
    }

    #[proptest]
    fn evaluation_is_idempotent(model: Model) {
        let first = evaluate_spaces(&model.spaces, BuildingProgram::School, 0.01).unwrap();
        let second = evaluate_spaces(&model.spaces, BuildingProgram::School, 0.01).unwrap();

        assert_eq!(
            json5::to_string(&first).unwrap(),
            json5::to_string(&second).unwrap()
        );
    }

    #[proptest]
    fn shaded_implies_windows(model: Model) {
        for evaluation in evaluate_spaces(&model.spaces, BuildingProgram::General, 0.01).unwrap() {
            assert!(!evaluation.all_windows_shaded || evaluation.has_windows);
            assert_eq!(evaluation.warning_count, evaluation.warnings.len());
        }
    }
}
