//! GeoJSON boundary reading and prediction export.

use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow, bail, ensure};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{Value, json};

use super::boundaries::BoundaryFeature;

/// Read a FeatureCollection of Polygon/MultiPolygon features.
///
/// `id_field` is required on every feature (string or number); `name_field`
/// is optional. Features without geometry are an error.
pub(crate) fn read_geojson(path: &Path, id_field: &str, name_field: &str) -> Result<Vec<BoundaryFeature>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("[io::geojson] Failed to read {}", path.display()))?;
    let root: Value = serde_json::from_str(&text)
        .with_context(|| format!("[io::geojson] {} is not valid JSON", path.display()))?;

    let features = root.get("features").and_then(Value::as_array)
        .ok_or_else(|| anyhow!("[io::geojson] {} is not a FeatureCollection", path.display()))?;

    features.iter().enumerate()
        .map(|(i, feature)| {
            let props = feature.get("properties").unwrap_or(&Value::Null);
            let id = property_text(props, id_field)
                .ok_or_else(|| anyhow!("[io::geojson] Feature {i} in {} has no `{id_field}`", path.display()))?;
            let name = property_text(props, name_field);
            let geometry = feature.get("geometry")
                .filter(|g| !g.is_null())
                .ok_or_else(|| anyhow!("[io::geojson] Feature {id} in {} has no geometry", path.display()))
                .and_then(geojson_to_multipolygon)
                .with_context(|| format!("[io::geojson] Bad geometry for feature {id}"))?;
            Ok(BoundaryFeature { id, name, geometry })
        })
        .collect()
}

fn property_text(props: &Value, field: &str) -> Option<String> {
    match props.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn geojson_to_multipolygon(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let kind = geometry.get("type").and_then(Value::as_str).unwrap_or_default();
    let coords = geometry.get("coordinates")
        .ok_or_else(|| anyhow!("geometry has no coordinates"))?;
    match kind {
        "Polygon" => Ok(MultiPolygon(vec![polygon_from_json(coords)?])),
        "MultiPolygon" => {
            let polys = coords.as_array().ok_or_else(|| anyhow!("MultiPolygon coordinates are not an array"))?;
            Ok(MultiPolygon(polys.iter().map(polygon_from_json).collect::<Result<_>>()?))
        }
        other => bail!("unsupported geometry type `{other}`"),
    }
}

fn polygon_from_json(rings: &Value) -> Result<Polygon<f64>> {
    let rings = rings.as_array().ok_or_else(|| anyhow!("polygon rings are not an array"))?;
    let mut rings = rings.iter().map(ring_from_json);
    let exterior = rings.next().ok_or_else(|| anyhow!("polygon has no rings"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring_from_json(ring: &Value) -> Result<LineString<f64>> {
    let points = ring.as_array().ok_or_else(|| anyhow!("ring is not an array"))?;
    let coords = points.iter()
        .map(|p| {
            let x = p.get(0).and_then(Value::as_f64);
            let y = p.get(1).and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(anyhow!("position {p} is not [x, y]")),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    ensure!(coords.len() >= 3, "ring has {} positions", coords.len());
    Ok(LineString(coords))
}

/// Convert a MultiPolygon to a GeoJSON geometry value.
pub(crate) fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Value> = mp.0.iter()
        .map(|polygon| {
            let mut rings = vec![ring_to_json(polygon.exterior())];
            rings.extend(polygon.interiors().iter().map(ring_to_json));
            Value::Array(rings)
        })
        .collect();
    json!({ "type": "MultiPolygon", "coordinates": polygons })
}

fn ring_to_json(ring: &LineString<f64>) -> Value {
    ring.coords().map(|c| json!([c.x, c.y])).collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use geo::Area;

    use super::*;

    #[test]
    fn reads_polygon_and_multipolygon_features() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{
            "type": "FeatureCollection",
            "features": [
                {{ "type": "Feature", "properties": {{ "terc_code": "0201", "name": "bolesławiecki" }},
                   "geometry": {{ "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }} }},
                {{ "type": "Feature", "properties": {{ "terc_code": 202 }},
                   "geometry": {{ "type": "MultiPolygon", "coordinates": [[[[1,0],[2,0],[2,1],[1,1],[1,0]]], [[[5,5],[6,5],[6,6],[5,5]]]] }} }}
            ]
        }}"#).unwrap();

        let features = read_geojson(file.path(), "terc_code", "name").unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, "0201");
        assert_eq!(features[0].name.as_deref(), Some("bolesławiecki"));
        assert_eq!(features[1].id, "202");
        assert_eq!(features[1].name, None);
        assert_eq!(features[1].geometry.0.len(), 2);
        assert!((features[0].geometry.unsigned_area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_points() {
        let geometry = json!({ "type": "Point", "coordinates": [0, 0] });
        assert!(geojson_to_multipolygon(&geometry).is_err());
    }

    #[test]
    fn geometry_survives_export() {
        let geometry = json!({ "type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]] });
        let mp = geojson_to_multipolygon(&geometry).unwrap();
        let exported = multipolygon_to_geojson(&mp);
        assert_eq!(exported["type"], "MultiPolygon");
        assert_eq!(exported["coordinates"][0][0][2], json!([2.0, 2.0]));
    }
}
