//! Shapefile boundary reading (GUGiK PRG exports and similar).

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use shapefile::{self as shp, dbase::{FieldValue, Record}, Reader, Shape};

use super::boundaries::BoundaryFeature;

/// Read every polygon record of a shapefile, with its id and name attributes.
pub(crate) fn read_shapefile(path: &Path, id_field: &str, name_field: &str) -> Result<Vec<BoundaryFeature>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp] Failed to open shapefile: {}", path.display()))?;

    let mut features = Vec::with_capacity(reader.shape_count()?);
    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result
            .with_context(|| format!("[io::shp] Error reading record {i} of {}", path.display()))?;
        let id = field_text(&record, id_field)
            .ok_or_else(|| anyhow!("[io::shp] Record {i} of {} has no `{id_field}`", path.display()))?;
        let name = field_text(&record, name_field);
        let geometry = match shape {
            Shape::Polygon(p) => shp_to_geo(&p),
            Shape::PolygonZ(p) => shp_to_geo(&shp::Polygon::with_rings(
                p.rings().iter().map(|r| match r {
                    shp::PolygonRing::Outer(pts) => shp::PolygonRing::Outer(pts.iter().map(|pt| shp::Point { x: pt.x, y: pt.y }).collect()),
                    shp::PolygonRing::Inner(pts) => shp::PolygonRing::Inner(pts.iter().map(|pt| shp::Point { x: pt.x, y: pt.y }).collect()),
                }).collect(),
            )),
            other => anyhow::bail!("[io::shp] Record {id} of {} is a {:?}, not a polygon", path.display(), other.shapetype()),
        };
        features.push(BoundaryFeature { id, name, geometry });
    }
    Ok(features)
}

/// Text of an attribute, whatever its dBase type.
fn field_text(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        FieldValue::Character(Some(s)) => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(format!("{n}")),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Convert shapefile::Polygon to geo::MultiPolygon<f64>.
/// Rings are grouped as each clockwise exterior followed by its holes.
pub(crate) fn shp_to_geo(p: &shp::Polygon) -> geo::MultiPolygon<f64> {
    fn ensure_closed(coords: &mut Vec<geo::Coord<f64>>) {
        if !coords.is_empty() && coords[0] != coords[coords.len() - 1] {
            coords.push(coords[0])
        }
    }

    /// Shoelace area; negative for clockwise rings.
    fn signed_area(pts: &[geo::Coord<f64>]) -> f64 {
        pts.windows(2).map(|w| w[0].x * w[1].y - w[1].x * w[0].y).sum::<f64>() / 2.0
    }

    let mut polys: Vec<geo::Polygon<f64>> = Vec::new();
    let mut exterior: Option<geo::LineString<f64>> = None;
    let mut holes: Vec<geo::LineString<f64>> = Vec::new();

    for ring in p.rings() {
        let mut coords: Vec<geo::Coord<f64>> = ring.points().iter().map(|pt| geo::Coord { x: pt.x, y: pt.y }).collect();
        ensure_closed(&mut coords);
        let is_exterior = signed_area(&coords) < 0.0;
        let ls = geo::LineString(coords);
        if is_exterior {
            if let Some(ext) = exterior.take() {
                polys.push(geo::Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(ls);
        } else {
            holes.push(ls);
        }
    }
    if let Some(ext) = exterior {
        polys.push(geo::Polygon::new(ext, holes));
    }

    geo::MultiPolygon(polys)
}

#[cfg(test)]
mod tests {
    use geo::Area;

    use super::*;
    use crate::config::BoundarySource;
    use crate::io::boundaries::read_boundaries;

    fn pt(x: f64, y: f64) -> shp::Point { shp::Point { x, y } }

    #[test]
    fn exterior_with_hole_becomes_one_polygon() {
        let outer = vec![pt(0.0, 0.0), pt(0.0, 4.0), pt(4.0, 4.0), pt(4.0, 0.0), pt(0.0, 0.0)];
        let inner = vec![pt(1.0, 1.0), pt(2.0, 1.0), pt(2.0, 2.0), pt(1.0, 2.0), pt(1.0, 1.0)];
        let polygon = shp::Polygon::with_rings(vec![
            shp::PolygonRing::Outer(outer),
            shp::PolygonRing::Inner(inner),
        ]);

        let mp = shp_to_geo(&polygon);
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert!((mp.unsigned_area() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn reads_a_gugik_export_with_default_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("powiaty.shp");
        {
            let table = shp::dbase::TableWriterBuilder::new()
                .add_character_field("JPT_KOD_JE".try_into().unwrap(), 10)
                .add_character_field("JPT_NAZWA_".try_into().unwrap(), 40);
            let mut writer = shp::Writer::from_path(&path, table).unwrap();
            for (code, name, x) in [("0201", "powiat boleslawiecki", 0.0), ("0202", "powiat dzierzoniowski", 1.0)] {
                let ring = vec![pt(x, 0.0), pt(x + 1.0, 0.0), pt(x + 1.0, 1.0), pt(x, 1.0), pt(x, 0.0)];
                let mut record = Record::default();
                record.insert("JPT_KOD_JE".into(), FieldValue::Character(Some(code.into())));
                record.insert("JPT_NAZWA_".into(), FieldValue::Character(Some(name.into())));
                writer.write_shape_and_record(&shp::Polygon::new(shp::PolygonRing::Outer(ring)), &record).unwrap();
            }
        }

        let source = BoundarySource { path: path.clone(), id_field: None, name_field: None };
        let features = read_boundaries(&source).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[1].id, "0202");
        assert_eq!(features[1].name.as_deref(), Some("powiat dzierzoniowski"));
        assert!((features[0].geometry.unsigned_area() - 1.0).abs() < 1e-12);

        let err = read_shapefile(&path, "terc_code", "name").unwrap_err();
        assert!(err.to_string().contains("terc_code"), "{err}");
    }
}
