pub mod analytic;
pub mod config;
pub mod error;
pub mod facet;
pub mod frequency;
pub mod geom;
pub mod normals;
pub mod output;
pub mod problem;
pub mod propagation;
pub mod result;
pub mod settings;
pub mod spectrum;
pub mod stats;
