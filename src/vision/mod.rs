pub mod binarize;
pub mod components;
pub mod raster;
pub mod segment;

pub use binarize::{BinaryMask, BinaryMaskExtractor};
pub use components::ComponentGeometryAnalyzer;
pub use raster::RasterDocument;
pub use segment::{Segmentation, StructuralSegmenter};
