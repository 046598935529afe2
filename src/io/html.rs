//! Self-contained HTML choropleth page with an inline SVG map.

use std::{io::Write, path::Path};

use anyhow::{Result, anyhow};
use geo::{BoundingRect, MultiPolygon, Rect};

use crate::common::write_atomic;

use super::svg::{self, Frame};

const WIDTH: f64 = 1000.0;
const MARGIN: f64 = 10.0;

/// One county to draw.
pub(crate) struct ChoroplethEntry<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub geometry: &'a MultiPolygon<f64>,
    /// Predicted turnout in [0, 1]; `None` is drawn grey.
    pub value: Option<f64>,
}

/// Write a choropleth of `entries` to `path` as a single HTML file.
/// Counties highlight on hover and show name and value as a tooltip.
pub(crate) fn write_choropleth(path: &Path, title: &str, entries: &[ChoroplethEntry]) -> Result<()> {
    let bounds = union_bounds(entries.iter().map(|e| e.geometry))
        .ok_or_else(|| anyhow!("[io::html] Could not determine bounds; nothing to draw."))?;
    let frame = Frame::fit(bounds, WIDTH, MARGIN)?;
    let project = frame.projection();

    write_atomic(path, |w| {
        write_page_open(w, title)?;
        svg::write_svg_open(w, &frame)?;
        for entry in entries {
            let (fill, label) = match entry.value {
                Some(v) => (svg::turnout_color(v), format!("{:.1}%", v * 100.0)),
                None => (svg::MISSING, "no prediction".to_string()),
            };
            let tooltip = format!("{} ({}): {label}", entry.name, entry.id);
            svg::draw_county(w, entry.id, &tooltip, entry.geometry, fill, &project)?;
        }
        svg::write_svg_close(w)?;
        write_legend(w)?;
        writeln!(w, "</body>\n</html>")?;
        Ok(())
    })
}

fn union_bounds<'a>(shapes: impl Iterator<Item = &'a MultiPolygon<f64>>) -> Option<Rect<f64>> {
    shapes.filter_map(|s| s.bounding_rect())
        .reduce(|a, b| {
            let min = geo::Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) };
            let max = geo::Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) };
            Rect::new(min, max)
        })
}

fn write_page_open(w: &mut dyn Write, title: &str) -> Result<()> {
    writeln!(w, r##"<!DOCTYPE html>
<html lang="pl">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
    body {{ font-family: sans-serif; margin: 1em; }}
    .county {{ stroke: #bbbbbb; stroke-width: 0.5; fill-rule: evenodd; }}
    .county:hover {{ fill: #ff0000 !important; stroke: #000000; stroke-width: 1.5; }}
    .legend {{ display: flex; flex-wrap: wrap; gap: 0.75em; margin-top: 0.5em; font-size: 0.85em; }}
    .legend span {{ display: inline-block; width: 1em; height: 1em; margin-right: 0.3em; vertical-align: middle; }}
</style>
</head>
<body>
<h1>{title}</h1>"##, title = svg::escape_xml(title))?;
    Ok(())
}

fn write_legend(w: &mut dyn Write) -> Result<()> {
    writeln!(w, r#"<div class="legend">"#)?;
    for (label, color) in svg::legend_entries() {
        writeln!(w, r#"<div><span style="background:{color}"></span>{label}</div>"#)?;
    }
    writeln!(w, r#"<div><span style="background:{}"></span>no prediction</div>"#, svg::MISSING)?;
    writeln!(w, "</div>")?;
    Ok(())
}
