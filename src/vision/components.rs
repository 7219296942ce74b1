use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::core::geometry::BBox;
use crate::core::model::{Component, GeometryFeatures, ProjectionProfile};
use crate::vision::binarize::BinaryMask;

/// Components smaller than this many pixels are treated as noise.
pub const DEFAULT_MIN_COMPONENT_AREA: u32 = 15;
/// Row-to-row change in normalized darkness counted as a layout transition.
pub const TRANSITION_DELTA: f64 = 0.1;
/// Normalized column darkness above which a column holds text.
pub const COLUMN_DENSITY_THRESHOLD: f64 = 0.03;
/// Narrowest background gutter that separates two text columns.
pub const MIN_COLUMN_GUTTER: usize = 20;

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u32,
    sum_x: u64,
    sum_y: u64,
}

impl Accumulator {
    fn new(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 0,
            sum_x: 0,
            sum_y: 0,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.area += 1;
        self.sum_x += x as u64;
        self.sum_y += y as u64;
    }

    fn finish(self) -> Component {
        Component {
            bbox: BBox::from_extent(self.min_x, self.min_y, self.max_x, self.max_y),
            area: self.area,
            centroid: (
                self.sum_x as f64 / self.area as f64,
                self.sum_y as f64 / self.area as f64,
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentGeometryAnalyzer {
    min_area: u32,
    detect_columns: bool,
}

impl ComponentGeometryAnalyzer {
    pub fn new() -> Self {
        Self {
            min_area: DEFAULT_MIN_COMPONENT_AREA,
            detect_columns: false,
        }
    }

    pub fn with_min_area(mut self, min_area: u32) -> Self {
        self.min_area = min_area;
        self
    }

    /// Column counting is only worth its cost for profiles that vote on it.
    pub fn with_column_detection(mut self, enabled: bool) -> Self {
        self.detect_columns = enabled;
        self
    }

    /// 8-connected components at or above the minimum area, in label order.
    pub fn components(&self, mask: &BinaryMask) -> Vec<Component> {
        if mask.is_empty() {
            return Vec::new();
        }
        let labels = connected_components(&mask.to_luma(), Connectivity::Eight, Luma([0u8]));

        let mut accumulators: Vec<Option<Accumulator>> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0] as usize;
            if label == 0 {
                continue;
            }
            if label >= accumulators.len() {
                accumulators.resize(label + 1, None);
            }
            accumulators[label]
                .get_or_insert_with(|| Accumulator::new(x, y))
                .add(x, y);
        }

        accumulators
            .into_iter()
            .flatten()
            .filter(|acc| acc.area >= self.min_area)
            .map(Accumulator::finish)
            .collect()
    }

    pub fn analyze(&self, mask: &BinaryMask) -> (GeometryFeatures, ProjectionProfile) {
        let rows = ProjectionProfile::from_counts(&mask.row_counts());
        let components = self.components(mask);
        if components.is_empty() {
            debug!("no components survived the area filter");
            return (GeometryFeatures::default(), rows);
        }

        let count = components.len() as f64;
        let heights: Vec<f64> = components.iter().map(|c| c.bbox.height as f64).collect();
        let avg_height = heights.iter().sum::<f64>() / count;
        let height_std =
            (heights.iter().map(|h| (h - avg_height).powi(2)).sum::<f64>() / count).sqrt();
        let avg_width = components.iter().map(|c| c.bbox.width as f64).sum::<f64>() / count;
        let avg_aspect_ratio =
            components.iter().map(|c| c.bbox.aspect_ratio()).sum::<f64>() / count;
        let ink: u64 = components.iter().map(|c| c.area as u64).sum();
        let text_density = ink as f64 / mask.area() as f64;

        let num_columns = self.detect_columns.then(|| count_columns(mask));

        let features = GeometryFeatures {
            num_components: components.len(),
            avg_height,
            height_std,
            avg_width,
            avg_aspect_ratio,
            text_density,
            layout_transitions: rows.transitions(TRANSITION_DELTA),
            num_columns,
        };
        debug!(?features, "geometry features");
        (features, rows)
    }
}

impl Default for ComponentGeometryAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Text columns are runs of the column projection; runs closer than
/// [`MIN_COLUMN_GUTTER`] belong to the same column.
pub fn count_columns(mask: &BinaryMask) -> usize {
    let profile = ProjectionProfile::from_counts(&mask.column_counts());
    let runs = profile.runs_above(COLUMN_DENSITY_THRESHOLD);
    let Some(first) = runs.first() else {
        return 0;
    };

    let mut columns = 1;
    let mut previous_end = first.1;
    for &(start, end) in &runs[1..] {
        if start - previous_end >= MIN_COLUMN_GUTTER {
            columns += 1;
        }
        previous_end = end;
    }
    columns
}
