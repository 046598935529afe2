pub mod index;
pub mod overlap;

pub use index::LayerIndex;
pub use overlap::{Overlap, OverlayError};
