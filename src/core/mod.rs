//! Pipeline stages: sensor classification, coordinate normalization, format
//! conversion, tile and thumbnail rendering, and record assembly. These are
//! the building blocks consumed by the high-level `api` module.
pub mod assemble;
pub mod bounds;
pub mod convert;
pub mod params;
pub mod render;
pub mod sensor;
pub mod stretch;
pub mod thumbnail;
pub mod tiles;
