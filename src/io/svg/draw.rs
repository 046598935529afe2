//! Polygon drawing for SVG output.

use std::io::Write;

use anyhow::Result;
use geo::{CoordsIter, LineString, MultiPolygon};

use super::{Projection, Rgb, escape_xml};

/// Draw one county as a filled path carrying its id and a hover tooltip.
pub(crate) fn draw_county<W: Write + ?Sized>(
    writer: &mut W,
    id: &str,
    tooltip: &str,
    shape: &MultiPolygon<f64>,
    fill: Rgb,
    project: &Projection,
) -> Result<()> {
    writeln!(
        writer,
        r#"<path class="county" data-id="{}" d="{}" style="fill:{}"><title>{}</title></path>"#,
        escape_xml(id),
        multipolygon_to_path(shape, project),
        fill,
        escape_xml(tooltip),
    )?;
    Ok(())
}

/// Build a compact SVG path string for a MultiPolygon (exteriors + holes).
pub(crate) fn multipolygon_to_path(shape: &MultiPolygon<f64>, project: &Projection) -> String {
    let mut out = String::new();

    for polygon in &shape.0 {
        out.push_str(&ring_to_path(polygon.exterior(), project));
        for interior in polygon.interiors() {
            out.push_str(&ring_to_path(interior, project));
        }
    }

    out
}

/// Build a compact SVG path string for a LineString (ring).
fn ring_to_path(ring: &LineString<f64>, project: &Projection) -> String {
    let mut out = String::new();

    let mut coords = ring.coords_iter()
        .map(|coord| project(&coord));
    if let Some((x, y)) = coords.next() {
        out.push_str(&format!(" M{x:.3},{y:.3}"));
        for (x, y) in coords {
            out.push_str(&format!(" L{x:.3},{y:.3}"));
        }
        out.push('Z');
    }

    out
}
