pub mod config;
pub mod error;
pub mod evaluation;
pub mod geometry;
pub mod model;
pub mod program;
pub mod results;
pub mod scoring;
pub mod session;
pub mod shading;
pub mod timepoint;
pub mod tools;
