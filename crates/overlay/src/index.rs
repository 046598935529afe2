use geo::{Area, BoundingRect, MultiPolygon, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::overlap::OverlayError;

#[derive(Debug, Clone)]
pub(crate) struct BoundingBox {
    idx: usize, // Index of corresponding MultiPolygon in shapes
    bbox: Rect<f64>,
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// A polygon layer (e.g. the current county set) indexed for overlap queries.
///
/// Shapes keep their input order; every index returned by a query refers to
/// a position in that order.
#[derive(Debug, Clone)]
pub struct LayerIndex {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl LayerIndex {
    /// Build an index over `shapes`. Fails on empty or zero-area shapes,
    /// since no overlap fraction can be attributed to them.
    pub fn new(shapes: Vec<MultiPolygon<f64>>) -> Result<Self, OverlayError> {
        let mut boxes = Vec::with_capacity(shapes.len());

        for (idx, shape) in shapes.iter().enumerate() {
            let bbox = shape.bounding_rect().ok_or(OverlayError::EmptyGeometry(idx))?;
            if !(shape.unsigned_area() > 0.0) { return Err(OverlayError::ZeroArea(idx)) }
            boxes.push(BoundingBox { idx, bbox });
        }

        Ok(Self { rtree: RTree::bulk_load(boxes), shapes })
    }

    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    #[inline] pub fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Indices of shapes whose bounding boxes intersect `rect`, ascending.
    pub fn candidates(&self, rect: &Rect<f64>) -> Vec<usize> {
        let search = AABB::from_corners(rect.min().into(), rect.max().into());
        let mut found = self.rtree
            .locate_in_envelope_intersecting(&search)
            .map(|bb| bb.idx)
            .collect::<Vec<_>>();
        found.sort_unstable();
        found
    }
}
