use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Planar polygon in model coordinates (meters).
///
/// Vertices are stored in boundary order; the last vertex connects back to the first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f64; 3]>", into = "Vec<[f64; 3]>")]
pub struct Face3 {
    vertices: Vec<Point3<f64>>,
}

impl Face3 {
    pub fn new(vertices: Vec<Point3<f64>>) -> anyhow::Result<Self> {
        if vertices.len() < 3 {
            anyhow::bail!(
                "A face needs at least 3 vertices, {} were given",
                vertices.len()
            );
        }
        Ok(Face3 { vertices })
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Edges of the polygon boundary, closing edge included.
    pub fn boundary_segments(&self) -> Vec<Segment3> {
        self.vertices
            .iter()
            .zip(self.vertices.iter().cycle().skip(1))
            .map(|(a, b)| Segment3::new(*a, *b))
            .collect()
    }

    /// Newell's method; the length of the result is twice the polygon area.
    fn newell(&self) -> Vector3<f64> {
        self.vertices
            .iter()
            .zip(self.vertices.iter().cycle().skip(1))
            .map(|(a, b)| a.coords.cross(&b.coords))
            .fold(Vector3::zeros(), |acc, v| acc + v)
    }

    pub fn area(&self) -> f64 {
        self.newell().norm() * 0.5
    }

    /// Unit normal following the right hand rule over the vertex order.
    /// `None` for degenerate (zero area) polygons.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        self.newell().try_normalize(f64::EPSILON)
    }

    /// Area centroid of the polygon.
    ///
    /// Computed from a triangle fan around the first vertex, so it is exact for convex
    /// and star-shaped polygons. Degenerate polygons fall back to the vertex average.
    pub fn center(&self) -> Point3<f64> {
        let vertex_average = Point3::from(
            self.vertices
                .iter()
                .fold(Vector3::zeros(), |acc, v| acc + v.coords)
                / self.vertices.len() as f64,
        );
        let normal = match self.normal() {
            Some(normal) => normal,
            None => return vertex_average,
        };

        let origin = self.vertices[0];
        let (weighted, total_area) = self.vertices[1..]
            .windows(2)
            .map(|pair| {
                let area = (pair[0] - origin).cross(&(pair[1] - origin)).dot(&normal) * 0.5;
                let centroid = (origin.coords + pair[0].coords + pair[1].coords) / 3.0;
                (centroid * area, area)
            })
            .fold((Vector3::zeros(), 0.0), |acc, (c, a)| (acc.0 + c, acc.1 + a));

        if total_area.abs() <= f64::EPSILON {
            vertex_average
        } else {
            Point3::from(weighted / total_area)
        }
    }

    /// The polygon is horizontal when its vertical extent is within `tolerance`.
    pub fn is_horizontal(&self, tolerance: f64) -> bool {
        let (min_z, max_z) = self
            .vertices
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v.z), hi.max(v.z))
            });
        max_z - min_z <= tolerance
    }

    /// Leftmost and rightmost vertical boundary edges, as seen when facing the polygon
    /// from the side its normal points to.
    ///
    /// Returns `None` when the polygon has fewer than two vertical edges or its plane has
    /// no horizontal in-plane direction (the polygon is horizontal or degenerate).
    pub fn left_right_vertical_edges(&self, tolerance: f64) -> Option<(Segment3, Segment3)> {
        let normal = self.normal()?;
        let right_axis = Vector3::z().cross(&normal).try_normalize(tolerance)?;

        let vertical: Vec<_> = self
            .boundary_segments()
            .into_iter()
            .filter(|segment| segment.is_vertical(tolerance))
            .collect();
        if vertical.len() < 2 {
            return None;
        }

        let position = |segment: &Segment3| segment.midpoint().coords.dot(&right_axis);
        let left = vertical
            .iter()
            .min_by(|a, b| position(a).total_cmp(&position(b)))?;
        let right = vertical
            .iter()
            .max_by(|a, b| position(a).total_cmp(&position(b)))?;
        if position(right) - position(left) <= tolerance {
            return None;
        }
        Some((*left, *right))
    }
}

impl TryFrom<Vec<[f64; 3]>> for Face3 {
    type Error = anyhow::Error;

    fn try_from(value: Vec<[f64; 3]>) -> Result<Self, Self::Error> {
        Face3::new(value.into_iter().map(Point3::from).collect())
    }
}

impl From<Face3> for Vec<[f64; 3]> {
    fn from(face: Face3) -> Self {
        face.vertices.iter().map(|v| [v.x, v.y, v.z]).collect()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Segment3 {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

impl Segment3 {
    pub fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        Segment3 { start, end }
    }

    pub fn midpoint(&self) -> Point3<f64> {
        nalgebra::center(&self.start, &self.end)
    }

    pub fn length(&self) -> f64 {
        nalgebra::distance(&self.start, &self.end)
    }

    /// Point on the segment closest to `point`.
    pub fn closest_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let direction = self.end - self.start;
        let length_squared = direction.norm_squared();
        if length_squared <= f64::EPSILON {
            return self.start;
        }
        let t = ((*point - self.start).dot(&direction) / length_squared).clamp(0.0, 1.0);
        self.start + direction * t
    }

    /// Segment runs along the z axis: horizontal offset within `tolerance`, height above it.
    pub fn is_vertical(&self, tolerance: f64) -> bool {
        let d = self.end - self.start;
        d.x.abs() <= tolerance && d.y.abs() <= tolerance && d.z.abs() > tolerance
    }
}
