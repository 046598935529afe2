//! SVG output for choropleth maps.

mod color;
mod draw;
mod writer;

pub(crate) use color::*;
pub(crate) use draw::*;
pub(crate) use writer::*;
