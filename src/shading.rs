use log::debug;

use crate::model::Shade;
use crate::tools::round_to_decimals;

/// Widest acceptable interior shade, in meters.
pub const MAX_SHADE_WIDTH: f64 = 4.0;

/// Largest center-to-edge distance of a simple shade, in meters.
const MAX_SHADE_RADIUS: f64 = MAX_SHADE_WIDTH / 2.0;

/// Polygons with more vertices than this are measured between their vertical edges.
const SIMPLE_SHADE_VERTICES: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShadeWidth {
    Compliant,
    TooWide,
    /// The geometry does not allow measuring the width. Treated as a violation.
    Unverifiable,
}

impl ShadeWidth {
    pub fn passes(self) -> bool {
        self == ShadeWidth::Compliant
    }

    /// Message shown to the user for a failing shade, `None` when it passes.
    pub fn warning(self, shade_name: &str) -> Option<String> {
        match self {
            ShadeWidth::Compliant => None,
            ShadeWidth::TooWide => Some(format!("Shade {} is wider than 4 meters.", shade_name)),
            ShadeWidth::Unverifiable => Some(format!(
                "The app could not validate shade {}. \
                 Make sure the width is less than 4 meters wide.",
                shade_name
            )),
        }
    }
}

/// Check that an interior shade is not wider than 4 meters.
///
/// Triangles and quads are measured radially: the distance from the polygon center to
/// the midpoint of every edge, rounded to one decimal, must not exceed 2 m.
/// More complex polygons must stand upright; their width is the distance between the
/// leftmost and the rightmost vertical edge. Horizontal complex polygons, and upright
/// ones without a usable pair of vertical edges, cannot be measured.
///
/// # Arguments
/// * `shade` - the shading device to check
/// * `tolerance` - model tolerance used for the horizontality and edge tests
pub fn check_shade_width(shade: &Shade, tolerance: f64) -> ShadeWidth {
    let geometry = &shade.geometry;

    let result = if geometry.vertices().len() <= SIMPLE_SHADE_VERTICES {
        let center = geometry.center();
        let too_wide = geometry.boundary_segments().iter().any(|segment| {
            round_to_decimals(nalgebra::distance(&center, &segment.midpoint()), 1)
                > MAX_SHADE_RADIUS
        });
        if too_wide {
            ShadeWidth::TooWide
        } else {
            ShadeWidth::Compliant
        }
    } else if geometry.is_horizontal(tolerance) {
        ShadeWidth::Unverifiable
    } else {
        match geometry.left_right_vertical_edges(tolerance) {
            None => ShadeWidth::Unverifiable,
            Some((left, right)) => {
                let left_mid = left.midpoint();
                let width = nalgebra::distance(&left_mid, &right.closest_point(&left_mid));
                if width > MAX_SHADE_WIDTH {
                    ShadeWidth::TooWide
                } else {
                    ShadeWidth::Compliant
                }
            }
        }
    };

    debug!("Shade {:?}: {:?}", shade.display_name, result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::tests::{horizontal_square, vertical_rectangle};
    use crate::geometry::Face3;
    use nalgebra::Point3;
    use test_case::test_case;

    fn shade(geometry: Face3) -> Shade {
        Shade {
            display_name: "blind".into(),
            geometry,
        }
    }

    /// Regular polygon in the XY plane.
    fn horizontal_polygon(vertex_count: usize, radius: f64) -> Face3 {
        Face3::new(
            (0..vertex_count)
                .map(|i| {
                    let angle = std::f64::consts::TAU * i as f64 / vertex_count as f64;
                    Point3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
                })
                .collect(),
        )
        .unwrap()
    }

    /// Upright wall-like polygon facing -y with `steps` extra vertices along the top edge.
    fn stepped_blind(width: f64, height: f64, steps: usize) -> Face3 {
        let mut vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(width, 0.0, 0.0),
            Point3::new(width, 0.0, height),
        ];
        vertices.extend((1..=steps).rev().map(|i| {
            Point3::new(width * i as f64 / (steps + 1) as f64, 0.0, height)
        }));
        vertices.push(Point3::new(0.0, 0.0, height));
        Face3::new(vertices).unwrap()
    }

    #[test]
    fn three_meter_square_passes() {
        let result = check_shade_width(&shade(horizontal_square(3.0)), 0.01);

        assert_eq!(result, ShadeWidth::Compliant);
        assert!(result.passes());
        assert_eq!(result.warning("blind"), None);
    }

    #[test]
    fn five_meter_square_fails() {
        let result = check_shade_width(&shade(horizontal_square(5.0)), 0.01);

        assert_eq!(result, ShadeWidth::TooWide);
        assert!(!result.passes());
        let warning = result.warning("blind").unwrap();
        warning
            .find("wider than 4 meters")
            .expect("Warning should say the shade is too wide");
        warning
            .find("blind")
            .expect("Warning should contain the name of the shade");
    }

    #[test_case(4.0, ShadeWidth::Compliant; "exactly four")]
    #[test_case(4.08, ShadeWidth::Compliant; "rounds down to two")]
    #[test_case(4.2, ShadeWidth::TooWide; "just over")]
    fn simple_shade_radius_is_rounded(side: f64, expected: ShadeWidth) {
        // 4.08 m gives 2.04 m to the side midpoints, which rounds to 2.0
        assert_eq!(check_shade_width(&shade(vertical_rectangle(side, 1.0)), 0.01), expected);
    }

    #[test]
    fn eight_vertex_horizontal_polygon_is_unverifiable() {
        for radius in [0.5, 10.0] {
            let result = check_shade_width(&shade(horizontal_polygon(8, radius)), 0.01);
            assert_eq!(result, ShadeWidth::Unverifiable);
            result
                .warning("blind")
                .unwrap()
                .find("could not validate")
                .expect("Warning should say the shade could not be validated");
        }
    }

    #[test_case(3.5, ShadeWidth::Compliant; "narrow")]
    #[test_case(4.0, ShadeWidth::Compliant; "exactly four")]
    #[test_case(4.5, ShadeWidth::TooWide; "wide")]
    fn complex_upright_shade_width(width: f64, expected: ShadeWidth) {
        let blind = stepped_blind(width, 2.0, 3);
        assert_eq!(blind.vertices().len(), 7);

        assert_eq!(check_shade_width(&shade(blind), 0.01), expected);
    }

    #[test]
    fn complex_upright_shade_without_vertical_edges() {
        // Pentagon standing in the XZ plane: no edge is vertical.
        let gable = Face3::new(vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 2.0),
            Point3::new(0.0, 0.0, 1.0),
        ])
        .unwrap();

        assert_eq!(
            check_shade_width(&shade(gable), 0.01),
            ShadeWidth::Unverifiable
        );
    }
}
