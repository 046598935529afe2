use std::fmt;

use geo::{Area, BooleanOps, BoundingRect, MultiPolygon};

use crate::index::LayerIndex;

/// Errors that can occur when indexing a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// The shape at this index has no coordinates.
    EmptyGeometry(usize),
    /// The shape at this index encloses no area.
    ZeroArea(usize),
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGeometry(idx) => write!(f, "shape {idx} is empty"),
            Self::ZeroArea(idx) => write!(f, "shape {idx} has zero area"),
        }
    }
}

impl std::error::Error for OverlayError {}

/// Area shared between a source shape and one shape of an indexed layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    /// Index of the layer shape.
    pub target: usize,
    /// Intersection area, in the squared units of the input coordinates.
    pub area: f64,
    /// `area` divided by the area of the source shape.
    pub fraction: f64,
}

impl LayerIndex {
    /// Intersect `source` with every layer shape whose bounding box it touches.
    ///
    /// Only strictly positive intersections are returned (shared edges and
    /// corners contribute nothing), ordered by layer index. An empty or
    /// zero-area source yields no overlaps.
    pub fn overlaps(&self, source: &MultiPolygon<f64>) -> Vec<Overlap> {
        let Some(rect) = source.bounding_rect() else { return Vec::new() };
        let source_area = source.unsigned_area();
        if !(source_area > 0.0) { return Vec::new() }

        self.candidates(&rect).into_iter()
            .filter_map(|target| {
                let area = source.intersection(&self.shapes()[target]).unsigned_area();
                (area > 0.0).then(|| Overlap { target, area, fraction: area / source_area })
            })
            .collect()
    }
}
