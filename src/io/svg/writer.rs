//! SVG writing operations.

use std::io::Write;

use anyhow::{Result, bail};
use geo::{Coord, Rect};

/// Projection function: lon/lat -> SVG coords (x,y)
pub(crate) type Projection = dyn Fn(&Coord<f64>) -> (f64, f64);

/// Canvas fitted to a set of bounds, preserving aspect ratio.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame {
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) margin: f64,
    pub(crate) scale: f64,
    pub(crate) bounds: Rect<f64>,
}

impl Frame {
    /// Fit `bounds` into a canvas `width` pixels wide.
    pub(crate) fn fit(bounds: Rect<f64>, width: f64, margin: f64) -> Result<Self> {
        if !(bounds.width() > 0.0) || width <= 2.0 * margin {
            bail!("[io::svg] Cannot fit bounds {:?} into a {width}px canvas", bounds);
        }
        let scale = (width - 2.0 * margin) / bounds.width();
        let height = bounds.height() * scale + 2.0 * margin;
        Ok(Self { width, height, margin, scale, bounds })
    }

    /// Map lon/lat -> SVG coords (Y down).
    pub(crate) fn projection(self) -> impl Fn(&Coord<f64>) -> (f64, f64) {
        let Frame { margin, scale, bounds, .. } = self;
        move |coord: &Coord<f64>| {
            let x = margin + (coord.x - bounds.min().x) * scale;
            let y = margin + (bounds.max().y - coord.y) * scale;
            (x, y)
        }
    }
}

/// Write the opening <svg> tag (no XML declaration, for inline use in HTML).
pub(crate) fn write_svg_open<W: Write + ?Sized>(writer: &mut W, frame: &Frame) -> Result<()> {
    writeln!(writer, r##"<svg xmlns="http://www.w3.org/2000/svg"
    width="{width:.0}" height="{height:.0}"
    viewBox="0 0 {width:.3} {height:.3}"
    data-lon-min="{lon_min}" data-lon-max="{lon_max}"
    data-lat-min="{lat_min}" data-lat-max="{lat_max}"
    data-margin="{margin}" data-scale="{scale}">"##,
        width = frame.width,
        height = frame.height,
        margin = frame.margin,
        scale = frame.scale,
        lon_min = frame.bounds.min().x,
        lon_max = frame.bounds.max().x,
        lat_min = frame.bounds.min().y,
        lat_max = frame.bounds.max().y,
    )?;
    writeln!(writer, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##)?;
    Ok(())
}

/// Write the closing </svg> tag.
pub(crate) fn write_svg_close<W: Write + ?Sized>(writer: &mut W) -> Result<()> {
    writeln!(writer, "</svg>")?;
    Ok(())
}

/// Escape text for use in XML content and attribute values.
pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
