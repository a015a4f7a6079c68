use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use uom::si::{area::square_meter, f64::Area};

use crate::geometry::Face3;

#[cfg(test)]
use proptest::{
    arbitrary::Arbitrary,
    prelude::prop,
    strategy::{BoxedStrategy, Strategy},
};

/// Building model, reduced to what the daylight credit looks at.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    /// Spaces in file order. Display names are unique, compared case-insensitively.
    pub spaces: Vec<Space>,
}

impl Model {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let string = fs::read_to_string(path)
            .with_context(|| format!("Could not read model file {}", path.display()))?;
        Self::from_json(&string)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let loaded: as_loaded::Model = json5::from_str(json)?;
        let converted = loaded.try_into()?;
        Ok(converted)
    }

    pub fn space(&self, name: &str) -> Option<&Space> {
        self.spaces
            .iter()
            .find(|space| space.display_name.eq_ignore_ascii_case(name))
    }
}

impl TryFrom<as_loaded::Model> for Model {
    type Error = anyhow::Error;
    fn try_from(value: as_loaded::Model) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        let spaces = value
            .spaces
            .into_iter()
            .map(|space| {
                if !seen.insert(space.display_name.to_lowercase()) {
                    anyhow::bail!("Space name {:?} is used more than once", space.display_name)
                }
                space.convert()
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Model { spaces })
    }
}

#[cfg(test)]
impl Arbitrary for Model {
    type Parameters = ();
    type Strategy = BoxedStrategy<Model>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(Space::arbitrary(), 1..8)
            .prop_map(|spaces| Model {
                spaces: spaces
                    .into_iter()
                    .enumerate()
                    .map(|(i, space)| Space {
                        display_name: format!("{}_{}", space.display_name, i),
                        ..space
                    })
                    .collect(),
            })
            .boxed()
    }
}

/// An occupied interior volume.
#[derive(Clone, Debug, PartialEq)]
pub struct Space {
    pub display_name: String,
    pub floor_area: Area,
    /// Area of apertures in faces exposed to the outdoors. Zero means no exterior windows.
    pub exterior_aperture_area: Area,
    pub faces: Vec<Face>,
}

impl Space {
    /// Apertures of all faces, in face order.
    pub fn apertures(&self) -> impl Iterator<Item = &Aperture> {
        self.faces.iter().flat_map(|face| face.apertures.iter())
    }
}

#[cfg(test)]
impl Arbitrary for Space {
    type Parameters = ();
    type Strategy = BoxedStrategy<Space>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (
            "[a-z]{1,8}",
            1.0f64..500f64,
            prop::option::weighted(0.8, 0.1f64..50f64),
            prop::collection::vec(Face::arbitrary(), 1..6),
        )
            .prop_map(|(display_name, floor_area, exterior, faces)| Space {
                display_name,
                floor_area: Area::new::<square_meter>(floor_area),
                exterior_aperture_area: Area::new::<square_meter>(exterior.unwrap_or(0.0)),
                faces,
            })
            .boxed()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCondition {
    #[default]
    Outdoors,
    Ground,
    Adiabatic,
    Surface,
}

/// Bounding face of a space.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub boundary_condition: BoundaryCondition,
    pub apertures: Vec<Aperture>,
}

#[cfg(test)]
impl Arbitrary for Face {
    type Parameters = ();
    type Strategy = BoxedStrategy<Face>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(Aperture::arbitrary(), 0..3)
            .prop_map(|apertures| Face {
                boundary_condition: BoundaryCondition::Outdoors,
                apertures,
            })
            .boxed()
    }
}

/// A window in a face.
#[derive(Clone, Debug, PartialEq)]
pub struct Aperture {
    pub display_name: String,
    pub geometry: Option<Face3>,
    pub outdoor_shades: Vec<Shade>,
    pub indoor_shades: Vec<Shade>,
}

#[cfg(test)]
impl Arbitrary for Aperture {
    type Parameters = ();
    type Strategy = BoxedStrategy<Aperture>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (
            "[a-z]{1,8}",
            prop::collection::vec(Shade::arbitrary(), 0..2),
            prop::collection::vec(Shade::arbitrary(), 0..3),
        )
            .prop_map(|(display_name, outdoor_shades, indoor_shades)| Aperture {
                display_name,
                geometry: None,
                outdoor_shades,
                indoor_shades,
            })
            .boxed()
    }
}

/// Shading device attached to an aperture.
#[derive(Clone, Debug, PartialEq)]
pub struct Shade {
    pub display_name: String,
    pub geometry: Face3,
}

#[cfg(test)]
impl Arbitrary for Shade {
    type Parameters = ();
    type Strategy = BoxedStrategy<Shade>;

    /// Vertical blinds and fins: rectangles in the XZ plane, up to 6 m wide.
    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        ("[a-z]{1,8}", 0.1f64..6f64, 0.1f64..3f64)
            .prop_map(|(display_name, width, height)| Shade {
                display_name,
                geometry: crate::geometry::tests::vertical_rectangle(width, height),
            })
            .boxed()
    }
}

mod as_loaded {
    use serde::Deserialize;
    use uom::si::{area::square_meter, f64::Area};

    use super::BoundaryCondition;
    use crate::geometry::Face3;

    #[derive(Clone, Debug, Deserialize)]
    pub struct Model {
        pub spaces: Vec<Space>,
    }

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    pub struct Space {
        pub display_name: String,
        pub floor_area: Area,
        /// Derived from the outdoor apertures when not given.
        #[serde(default)]
        pub exterior_aperture_area: Option<Area>,
        #[serde(default)]
        pub faces: Vec<Face>,
    }

    impl Space {
        pub fn convert(self) -> anyhow::Result<super::Space> {
            if !(self.floor_area > Area::new::<square_meter>(0.0)) {
                anyhow::bail!(
                    "Space {:?} must have a positive floor area",
                    self.display_name
                )
            }

            let exterior_aperture_area = match self.exterior_aperture_area {
                Some(area) if area < Area::new::<square_meter>(0.0) => anyhow::bail!(
                    "Space {:?} has negative exterior aperture area",
                    self.display_name
                ),
                Some(area) => area,
                None => self.derived_exterior_aperture_area()?,
            };

            Ok(super::Space {
                display_name: self.display_name,
                floor_area: self.floor_area,
                exterior_aperture_area,
                faces: self.faces.into_iter().map(Face::convert).collect(),
            })
        }

        fn derived_exterior_aperture_area(&self) -> anyhow::Result<Area> {
            self.faces
                .iter()
                .filter(|face| face.boundary_condition == BoundaryCondition::Outdoors)
                .flat_map(|face| face.apertures.iter())
                .map(|aperture| match &aperture.geometry {
                    Some(geometry) => Ok(Area::new::<square_meter>(geometry.area())),
                    None => anyhow::bail!(
                        "Aperture {:?} of space {:?} has no geometry; \
                         give exterior_aperture_area explicitly",
                        aperture.display_name,
                        self.display_name
                    ),
                })
                .sum()
        }
    }

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    pub struct Face {
        #[serde(default)]
        pub boundary_condition: BoundaryCondition,
        #[serde(default)]
        pub apertures: Vec<Aperture>,
    }

    impl Face {
        pub fn convert(self) -> super::Face {
            super::Face {
                boundary_condition: self.boundary_condition,
                apertures: self.apertures.into_iter().map(Aperture::convert).collect(),
            }
        }
    }

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    pub struct Aperture {
        pub display_name: String,
        #[serde(default)]
        pub geometry: Option<Face3>,
        #[serde(default)]
        pub outdoor_shades: Vec<Shade>,
        #[serde(default)]
        pub indoor_shades: Vec<Shade>,
    }

    impl Aperture {
        pub fn convert(self) -> super::Aperture {
            super::Aperture {
                display_name: self.display_name,
                geometry: self.geometry,
                outdoor_shades: self.outdoor_shades.into_iter().map(Shade::convert).collect(),
                indoor_shades: self.indoor_shades.into_iter().map(Shade::convert).collect(),
            }
        }
    }

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    pub struct Shade {
        pub display_name: String,
        pub geometry: Face3,
    }

    impl Shade {
        pub fn convert(self) -> super::Shade {
            super::Shade {
                display_name: self.display_name,
                geometry: self.geometry,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    #[test]
    fn convert_model_minimal() {
        let input = as_loaded::Model { spaces: vec![] };

        let output: Model = input.try_into().unwrap();

        assert!(output.spaces.is_empty());
    }

    #[test]
    fn convert_space_explicit_exterior_area() {
        let input = as_loaded::Space {
            display_name: "office".into(),
            floor_area: Area::new::<square_meter>(20.0),
            exterior_aperture_area: Some(Area::new::<square_meter>(0.0)),
            faces: vec![],
        };

        let output = input.convert().unwrap();

        assert_matches!(output, Space { display_name, floor_area, exterior_aperture_area, faces } => {
            assert_eq!(display_name, "office");
            assert_eq!(floor_area, Area::new::<square_meter>(20.0));
            assert_eq!(exterior_aperture_area, Area::new::<square_meter>(0.0));
            assert!(faces.is_empty());
        });
    }

    #[test]
    fn convert_space_bad_floor_area() {
        let input = as_loaded::Space {
            display_name: "cupboard".into(),
            floor_area: Area::new::<square_meter>(0.0),
            exterior_aperture_area: None,
            faces: vec![],
        };

        let message = format!("{}", input.convert().unwrap_err());
        message
            .find("cupboard")
            .expect("Error message should contain the name of the space");
        message
            .find("floor area")
            .expect("Error message should say what is wrong");
    }

    #[test]
    fn convert_space_negative_exterior_area() {
        let input = as_loaded::Space {
            display_name: "office".into(),
            floor_area: Area::new::<square_meter>(10.0),
            exterior_aperture_area: Some(Area::new::<square_meter>(-1.0)),
            faces: vec![],
        };

        let message = format!("{}", input.convert().unwrap_err());
        message
            .find("negative")
            .expect("Error message should say what is wrong");
    }

    #[test]
    fn derive_exterior_area_from_outdoor_apertures() {
        let model = Model::from_json(
            r#"{
            spaces: [
                {
                    display_name: "office",
                    floor_area: 20,
                    faces: [
                        {
                            apertures: [
                                {
                                    display_name: "w1",
                                    geometry: [[0, 0, 1], [2, 0, 1], [2, 0, 2], [0, 0, 2]],
                                },
                            ],
                        },
                        {
                            boundary_condition: "surface",
                            apertures: [
                                {
                                    display_name: "interior glazing",
                                    geometry: [[0, 5, 1], [3, 5, 1], [3, 5, 2], [0, 5, 2]],
                                },
                            ],
                        },
                        { boundary_condition: "ground" },
                    ],
                },
            ],
        }"#,
        )
        .unwrap();

        let office = &model.spaces[0];
        assert_abs_diff_eq!(
            office.exterior_aperture_area.get::<square_meter>(),
            2.0,
            epsilon = 1e-9
        );
        assert_eq!(office.faces[1].boundary_condition, BoundaryCondition::Surface);
        assert_eq!(office.apertures().count(), 2);
    }

    #[test]
    fn derive_exterior_area_without_geometry() {
        let result = Model::from_json(
            r#"{
            spaces: [
                {
                    display_name: "office",
                    floor_area: 20,
                    faces: [ { apertures: [ { display_name: "w1" } ] } ],
                },
            ],
        }"#,
        );

        let message = format!("{}", result.unwrap_err());
        message
            .find("w1")
            .expect("Error message should contain the name of the aperture");
    }

    #[test]
    fn duplicate_space_names() {
        let result = Model::from_json(
            r#"{
            spaces: [
                { display_name: "Office", floor_area: 20, exterior_aperture_area: 0 },
                { display_name: "office", floor_area: 10, exterior_aperture_area: 0 },
            ],
        }"#,
        );

        let message = format!("{}", result.unwrap_err());
        message
            .find("more than once")
            .expect("Error message should say that a name is duplicated");
    }

    #[test]
    fn load_model() {
        let mut f = tempfile::NamedTempFile::new().unwrap();

        use std::io::Write;
        write!(f, "{}", sample_model_json()).unwrap();

        let model = Model::load(f.path()).unwrap();

        check_sample_model(model);
    }

    #[test]
    fn load_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nothing.json5");

        let message = format!("{:#}", Model::load(&path).unwrap_err());
        message
            .find("nothing.json5")
            .expect("Error message should contain the file name");
    }

    #[test]
    fn model_from_json() {
        let model = Model::from_json(sample_model_json()).unwrap();
        check_sample_model(model);
    }

    #[test]
    fn space_lookup_ignores_case() {
        let model = Model::from_json(sample_model_json()).unwrap();

        assert_eq!(model.space("CLASSROOM 1").unwrap().display_name, "Classroom 1");
        assert!(model.space("gym").is_none());
    }

    /// Provide string with sample JSON5 model
    pub(crate) fn sample_model_json() -> &'static str {
        r#"{
            spaces: [
                {
                    display_name: "Classroom 1",
                    floor_area: 20,
                    exterior_aperture_area: 3,
                    faces: [
                        {
                            boundary_condition: "outdoors",
                            apertures: [
                                {
                                    display_name: "north window",
                                    outdoor_shades: [
                                        {
                                            display_name: "overhang",
                                            geometry: [[0, 0, 3], [3, 0, 3], [3, -1, 3], [0, -1, 3]],
                                        },
                                    ],
                                },
                                {
                                    display_name: "east window",
                                    indoor_shades: [
                                        {
                                            display_name: "blind",
                                            geometry: [[-1.5, 0, 0], [1.5, 0, 0], [1.5, 0, 3], [-1.5, 0, 3]],
                                        },
                                    ],
                                },
                            ],
                        },
                        { boundary_condition: "ground" },
                    ],
                },
                {
                    display_name: "Storage",
                    floor_area: 5,
                    exterior_aperture_area: 0,
                },
            ],
        }"#
    }

    /// Checks the loaded sample model.
    /// Separate so that both file loading and string loading are covered
    fn check_sample_model(model: Model) {
        assert_eq!(model.spaces.len(), 2);
        assert_matches!(&model.spaces[0], Space { display_name, floor_area, faces, .. } => {
            assert_eq!(display_name, "Classroom 1");
            assert_eq!(floor_area, &Area::new::<square_meter>(20.0));
            assert_eq!(faces.len(), 2);
        });

        let apertures: Vec<_> = model.spaces[0].apertures().collect();
        assert_eq!(apertures.len(), 2);
        assert_eq!(apertures[0].outdoor_shades[0].display_name, "overhang");
        assert_eq!(apertures[1].indoor_shades[0].geometry.vertices().len(), 4);
        assert!(model.spaces[1].faces.is_empty());
    }
}
