//! IO module for format-specific reading and writing operations.
//!
//! - `csv` - delimited text input (read as text) and CSV output
//! - `geojson` / `shp` - boundary input; GeoJSON also for prediction output
//! - `svg` / `html` - choropleth rendering
//! - `manifest` - run manifest with output hashes

pub(crate) mod boundaries;
pub(crate) mod csv;
pub(crate) mod geojson;
pub(crate) mod html;
pub(crate) mod manifest;
pub(crate) mod shp;
pub(crate) mod svg;
