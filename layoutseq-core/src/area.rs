//! Main text area inference.
//!
//! Headers, footers and page numbers tend to be small blocks or blocks glued
//! to the page edge. Everything else is assumed to be real content, and the
//! bounding rectangle of that content, per page parity, is the main area.

use crate::config::AreaConfig;
use crate::types::{AreaRect, BoundingBox, LayoutDocument, MainAreas, Parity};
use log::{debug, warn};
use std::collections::BTreeSet;

#[derive(Debug, Default)]
struct EdgeSet {
    left: BTreeSet<i64>,
    right: BTreeSet<i64>,
}

impl EdgeSet {
    fn horizontal_extent(&self) -> Option<(i64, i64)> {
        let x = *self.left.first()?;
        let right = *self.right.last()?;
        Some((x, right - x + 1))
    }
}

pub struct AreaEstimator {
    config: AreaConfig,
}

impl AreaEstimator {
    pub fn new(config: AreaConfig) -> Self {
        Self { config }
    }

    /// True when a block looks like page furniture rather than content.
    pub fn is_noise(&self, bbox: &BoundingBox) -> bool {
        (self.config.discard_zero_left && bbox.x == 0.0)
            || bbox.height < self.config.min_height
            || bbox.width < self.config.min_width
            || bbox.area() < self.config.min_area
    }

    pub fn estimate(&self, doc: &LayoutDocument) -> MainAreas {
        let mut odd = EdgeSet::default();
        let mut even = EdgeSet::default();
        let mut top = BTreeSet::new();
        let mut bottom = BTreeSet::new();
        let mut survivors = 0usize;

        for (_, page, block) in doc.blocks() {
            let bbox = &block.bbox;
            if self.is_noise(bbox) {
                debug!("Ignoring block {} for main area estimation", block.id);
                continue;
            }
            survivors += 1;

            let edges = match page.parity() {
                Parity::Odd => &mut odd,
                Parity::Even => &mut even,
            };
            edges.left.insert(bbox.x as i64);
            edges.right.insert(bbox.right() as i64);
            top.insert(bbox.y as i64);
            bottom.insert(bbox.bottom() as i64);
        }

        let (y, height) = match (top.first(), bottom.last()) {
            (Some(&y), Some(&max_bottom)) => (y, max_bottom - y + 1),
            _ => {
                warn!(
                    "No block qualifies for main area estimation across {} pages; treating every block as main text",
                    doc.pages.len()
                );
                return MainAreas::default();
            }
        };

        let rect = |(x, width): (i64, i64)| AreaRect {
            x,
            y,
            width,
            height,
        };

        let odd_rect = odd.horizontal_extent().map(rect);
        let even_rect = if doc.pages.len() == 1 {
            Some(AreaRect {
                x: 0,
                y,
                width: 0,
                height,
            })
        } else {
            even.horizontal_extent().map(rect)
        };

        debug!(
            "Main areas from {} blocks: odd={:?} even={:?}",
            survivors, odd_rect, even_rect
        );

        MainAreas {
            odd: odd_rect,
            even: even_rect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, page};
    use crate::types::{Page, TextBlock};

    fn block(id: &str, x: f32, y: f32, width: f32, height: f32) -> TextBlock {
        testing::block(id, (x, y, width, height), vec![])
    }

    fn doc(pages: Vec<Page>) -> LayoutDocument {
        testing::doc(pages, testing::styles())
    }

    fn estimator() -> AreaEstimator {
        AreaEstimator::new(AreaConfig::default())
    }

    #[test]
    fn test_noise_criteria() {
        let estimator = estimator();
        assert!(estimator.is_noise(&BoundingBox::new(0.0, 100.0, 300.0, 100.0)));
        assert!(estimator.is_noise(&BoundingBox::new(50.0, 100.0, 300.0, 19.0)));
        assert!(estimator.is_noise(&BoundingBox::new(50.0, 100.0, 19.0, 300.0)));
        assert!(estimator.is_noise(&BoundingBox::new(50.0, 100.0, 50.0, 50.0)));
        assert!(!estimator.is_noise(&BoundingBox::new(50.0, 100.0, 100.0, 30.0)));
    }

    #[test]
    fn test_two_parities_get_their_own_rectangles() {
        let doc = doc(vec![
            page(
                1,
                vec![
                    block("b1", 72.0, 80.0, 400.0, 200.0),
                    block("b2", 80.0, 300.0, 420.5, 300.0),
                    block("pn", 300.0, 760.0, 10.0, 8.0),
                ],
            ),
            page(2, vec![block("b3", 90.0, 70.0, 380.0, 500.0)]),
        ]);
        let areas = estimator().estimate(&doc);

        let odd = areas.odd.unwrap();
        assert_eq!((odd.x, odd.width), (72, 500 - 72 + 1));
        let even = areas.even.unwrap();
        assert_eq!((even.x, even.width), (90, 470 - 90 + 1));

        for rect in [odd, even] {
            assert_eq!(rect.y, 70);
            assert_eq!(rect.height, 600 - 70 + 1);
            assert!(rect.x >= 0 && rect.y >= 0 && rect.width > 0 && rect.height > 0);
        }
    }

    #[test]
    fn test_single_page_even_rectangle_is_degenerate() {
        let doc = doc(vec![page(1, vec![block("b1", 72.0, 80.0, 400.0, 200.0)])]);
        let areas = estimator().estimate(&doc);
        let odd = areas.odd.unwrap();
        let even = areas.even.unwrap();
        assert_eq!(even.height, odd.height);
        assert_eq!(even.width, 0);
        assert_eq!(even.x, 0);
    }

    #[test]
    fn test_multi_page_without_even_observation() {
        let doc = doc(vec![
            page(1, vec![block("b1", 72.0, 80.0, 400.0, 200.0)]),
            page(2, vec![block("pn", 300.0, 760.0, 10.0, 8.0)]),
        ]);
        let areas = estimator().estimate(&doc);
        assert!(areas.odd.is_some());
        assert!(areas.even.is_none());
    }

    #[test]
    fn test_no_survivors_means_no_constraint() {
        let doc = doc(vec![page(1, vec![block("pn", 300.0, 760.0, 10.0, 8.0)])]);
        let areas = estimator().estimate(&doc);
        assert!(areas.is_empty());
        let page = &doc.pages[0];
        assert!(areas.contains_block(page, &BoundingBox::new(0.0, 0.0, 5.0, 5.0)));
    }
}
