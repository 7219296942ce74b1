//! Text line detection from the row projection and paragraph grouping by
//! indentation and vertical spacing.

use tracing::debug;

use crate::core::error::{ClassifyError, Result};
use crate::core::model::{Paragraph, ProjectionProfile, TextLine};
use crate::vision::binarize::BinaryMask;

pub const LINE_DENSITY_THRESHOLD: f64 = 0.03;
pub const MIN_LINE_HEIGHT: u32 = 5;
pub const INDENT_THRESHOLD_PX: f64 = 20.0;
pub const VERTICAL_SPACE_RATIO: f64 = 3.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    pub lines: Vec<TextLine>,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone)]
pub struct StructuralSegmenter {
    density_threshold: f64,
    min_line_height: u32,
    indent_threshold: f64,
    spacing_ratio: f64,
}

impl StructuralSegmenter {
    pub fn new() -> Self {
        Self {
            density_threshold: LINE_DENSITY_THRESHOLD,
            min_line_height: MIN_LINE_HEIGHT,
            indent_threshold: INDENT_THRESHOLD_PX,
            spacing_ratio: VERTICAL_SPACE_RATIO,
        }
    }

    pub fn segment(&self, mask: &BinaryMask) -> Result<Segmentation> {
        if mask.width() == 0 || mask.height() == 0 {
            return Err(ClassifyError::Segmentation(format!(
                "mask has no pixels ({}x{})",
                mask.width(),
                mask.height()
            )));
        }
        let lines = self.detect_lines(mask);
        let paragraphs = self.group_paragraphs(&lines);
        debug!(
            lines = lines.len(),
            paragraphs = paragraphs.len(),
            "structural segmentation"
        );
        Ok(Segmentation { lines, paragraphs })
    }

    pub fn detect_lines(&self, mask: &BinaryMask) -> Vec<TextLine> {
        let rows = ProjectionProfile::from_counts(&mask.row_counts());
        rows.runs_above(self.density_threshold)
            .into_iter()
            .filter_map(|(start, end)| {
                let (y_start, y_end) = (start as u32, end as u32);
                let height = y_end - y_start;
                if height < self.min_line_height {
                    return None;
                }
                let left = mask
                    .first_foreground_column(y_start, y_end)
                    .unwrap_or(mask.width());
                Some(TextLine {
                    y_start,
                    y_end,
                    height,
                    left,
                })
            })
            .collect()
    }

    /// A new paragraph starts on a large vertical gap OR an indented first
    /// line, measured against the median margin and mean line height.
    pub fn group_paragraphs(&self, lines: &[TextLine]) -> Vec<Paragraph> {
        if lines.len() <= 1 {
            return lines
                .iter()
                .map(|line| Paragraph { lines: vec![*line] })
                .collect();
        }

        let typical_left = median(lines.iter().map(|l| l.left as f64).collect());
        let avg_height = lines.iter().map(|l| l.height as f64).sum::<f64>() / lines.len() as f64;
        let max_gap = avg_height * self.spacing_ratio;

        let mut paragraphs = Vec::new();
        let mut current = vec![lines[0]];
        for pair in lines.windows(2) {
            let (prev, curr) = (pair[0], pair[1]);
            let gap = curr.y_start as f64 - prev.y_end as f64;
            let indent = curr.left as f64 - typical_left;

            if indent > self.indent_threshold || gap > max_gap {
                paragraphs.push(Paragraph {
                    lines: std::mem::take(&mut current),
                });
            }
            current.push(curr);
        }
        paragraphs.push(Paragraph { lines: current });
        paragraphs
    }
}

impl Default for StructuralSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Lines as (y_start, height, left, right).
    fn mask_with_lines(width: u32, height: u32, lines: &[(u32, u32, u32, u32)]) -> BinaryMask {
        BinaryMask::from_fn(width, height, |x, y| {
            lines
                .iter()
                .any(|&(top, h, left, right)| y >= top && y < top + h && x >= left && x < right)
        })
    }

    fn line(y_start: u32, height: u32, left: u32) -> TextLine {
        TextLine {
            y_start,
            y_end: y_start + height,
            height,
            left,
        }
    }

    #[test]
    fn detects_lines_and_margins() {
        let mask = mask_with_lines(200, 100, &[(10, 8, 30, 180), (30, 8, 50, 180), (60, 3, 30, 180)]);
        let lines = StructuralSegmenter::new().detect_lines(&mask);
        assert_eq!(lines, vec![line(10, 8, 30), line(30, 8, 50)]);
    }

    #[test]
    fn line_running_to_bottom_edge_is_kept() {
        let mask = mask_with_lines(50, 40, &[(32, 8, 4, 40)]);
        let lines = StructuralSegmenter::new().detect_lines(&mask);
        assert_eq!(lines, vec![line(32, 8, 4)]);
    }

    #[test]
    fn uniform_block_is_one_paragraph() {
        let lines: Vec<_> = (0..6).map(|i| line(10 + i * 14, 10, 20)).collect();
        let paragraphs = StructuralSegmenter::new().group_paragraphs(&lines);
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].line_count(), 6);
    }

    #[test]
    fn widely_spaced_lines_are_each_a_paragraph() {
        let lines: Vec<_> = (0..4).map(|i| line(10 + i * 50, 10, 20)).collect();
        let paragraphs = StructuralSegmenter::new().group_paragraphs(&lines);
        assert_eq!(paragraphs.len(), lines.len());
    }

    #[test]
    fn indentation_starts_paragraph() {
        let lines = vec![
            line(10, 10, 20),
            line(24, 10, 20),
            line(38, 10, 45),
            line(52, 10, 20),
            line(66, 10, 20),
        ];
        let paragraphs = StructuralSegmenter::new().group_paragraphs(&lines);
        let sizes: Vec<_> = paragraphs.iter().map(Paragraph::line_count).collect();
        assert_eq!(sizes, vec![2, 3]);
    }

    #[test]
    fn large_gap_starts_paragraph() {
        let lines = vec![line(10, 10, 20), line(24, 10, 20), line(80, 10, 20), line(94, 10, 20)];
        let paragraphs = StructuralSegmenter::new().group_paragraphs(&lines);
        let sizes: Vec<_> = paragraphs.iter().map(Paragraph::line_count).collect();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[test]
    fn paragraphs_partition_lines_in_order() {
        let lines = vec![
            line(0, 6, 10),
            line(40, 6, 40),
            line(48, 6, 10),
            line(120, 6, 10),
            line(128, 6, 35),
        ];
        let paragraphs = StructuralSegmenter::new().group_paragraphs(&lines);
        assert!(paragraphs.len() <= lines.len());
        let flattened: Vec<_> = paragraphs.iter().flat_map(|p| p.lines.clone()).collect();
        assert_eq!(flattened, lines);
    }

    #[test]
    fn degenerate_line_counts() {
        let segmenter = StructuralSegmenter::new();
        assert!(segmenter.group_paragraphs(&[]).is_empty());
        assert_eq!(segmenter.group_paragraphs(&[line(0, 8, 300)]).len(), 1);
    }

    #[test]
    fn empty_mask_fails_segmentation() {
        let mask = BinaryMask::new(0, 0, Vec::new());
        assert!(matches!(
            StructuralSegmenter::new().segment(&mask),
            Err(ClassifyError::Segmentation(_))
        ));
    }

    #[test]
    fn blank_page_has_no_lines() {
        let mask = BinaryMask::from_fn(30, 30, |_, _| false);
        let segmentation = StructuralSegmenter::new().segment(&mask).unwrap();
        assert_eq!(segmentation, Segmentation::default());
    }
}
