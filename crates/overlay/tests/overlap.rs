// Integration tests for LayerIndex::overlaps.

use geo::{polygon, MultiPolygon};
use overlay::LayerIndex;

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: x0, y: y0),
        (x: x1, y: y0),
        (x: x1, y: y1),
        (x: x0, y: y1),
        (x: x0, y: y0),
    ]])
}

/// Two current units side by side: [0,2]x[0,2] and [2,4]x[0,2].
fn two_units() -> LayerIndex {
    LayerIndex::new(vec![rect(0.0, 0.0, 2.0, 2.0), rect(2.0, 0.0, 4.0, 2.0)]).unwrap()
}

#[test]
fn contained_source_overlaps_single_target() {
    let index = two_units();
    let overlaps = index.overlaps(&rect(0.5, 0.5, 1.5, 1.5));

    assert_eq!(overlaps.len(), 1);
    assert_eq!(overlaps[0].target, 0);
    assert!((overlaps[0].fraction - 1.0).abs() < 1e-9);
    assert!((overlaps[0].area - 1.0).abs() < 1e-9);
}

#[test]
fn straddling_source_splits_by_area() {
    let index = two_units();
    let overlaps = index.overlaps(&rect(1.0, 0.0, 4.0, 2.0));

    assert_eq!(overlaps.len(), 2);
    assert_eq!(overlaps[0].target, 0);
    assert_eq!(overlaps[1].target, 1);
    assert!((overlaps[0].fraction - 1.0 / 3.0).abs() < 1e-9);
    assert!((overlaps[1].fraction - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn shared_edge_contributes_nothing() {
    let index = two_units();
    let overlaps = index.overlaps(&rect(0.0, 0.0, 2.0, 2.0));

    assert_eq!(overlaps.len(), 1);
    assert_eq!(overlaps[0].target, 0);
}

#[test]
fn disjoint_source_has_no_overlaps() {
    let index = two_units();
    assert!(index.overlaps(&rect(10.0, 10.0, 11.0, 11.0)).is_empty());
}

#[test]
fn fractions_count_only_the_covered_share() {
    let index = two_units();
    // Half of this source lies above the layer.
    let covered: f64 = index.overlaps(&rect(0.0, 1.0, 4.0, 3.0)).iter().map(|o| o.fraction).sum();
    assert!((covered - 0.5).abs() < 1e-9);
}
