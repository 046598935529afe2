use std::path::Path;

use anyhow::{Result, bail};
use geo::MultiPolygon;

use crate::config::BoundarySource;

/// One boundary feature as read from disk, before its id is validated.
#[derive(Debug, Clone)]
pub(crate) struct BoundaryFeature {
    pub id: String,
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// Read boundaries from a `.geojson`/`.json` or `.shp` file.
pub(crate) fn read_boundaries(source: &BoundarySource) -> Result<Vec<BoundaryFeature>> {
    let path: &Path = &source.path;
    let ext = path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "geojson" | "json" => super::geojson::read_geojson(path, source.id_field(), source.name_field()),
        "shp" => super::shp::read_shapefile(path, source.id_field(), source.name_field()),
        _ => bail!("[io::boundaries] Unsupported boundary format: {}", path.display()),
    }
}
