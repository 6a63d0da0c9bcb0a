pub mod fulltext;
pub mod record;
pub mod segment;
pub mod text;
pub mod tracker;

pub use fulltext::{FulltextEncoder, FulltextMeta, FulltextRecord};
pub use record::{vectorize_all, FeatureKind, FeatureRecord, FeatureValue};
pub use segment::{SegmentEncoder, SegmentMeta, SegmentRecord};

/// START / IN / END marker triple for one boundary slot.
pub(crate) struct BoundaryMarkers {
    pub slot: &'static str,
    pub start: &'static str,
    pub inside: &'static str,
    pub end: &'static str,
}

pub(crate) const PAGE_MARKERS: BoundaryMarkers = BoundaryMarkers {
    slot: "page_info",
    start: "PAGESTART",
    inside: "PAGEIN",
    end: "PAGEEND",
};

pub(crate) const BLOCK_MARKERS: BoundaryMarkers = BoundaryMarkers {
    slot: "block_info",
    start: "BLOCKSTART",
    inside: "BLOCKIN",
    end: "BLOCKEND",
};

pub(crate) const LINE_MARKERS: BoundaryMarkers = BoundaryMarkers {
    slot: "line_info",
    start: "LINESTART",
    inside: "LINEIN",
    end: "LINEEND",
};

/// Stamp boundary markers over a buffered group of records.
///
/// The last record gets the END marker only when the group holds at least
/// `min_for_end` records; a single-record group otherwise stays START.
pub(crate) fn mark_boundaries<M>(
    records: &mut [FeatureRecord<M>],
    markers: &BoundaryMarkers,
    min_for_end: usize,
) {
    let len = records.len();
    for (i, record) in records.iter_mut().enumerate() {
        let marker = if i == 0 { markers.start } else { markers.inside };
        record.set(markers.slot, marker);
    }
    if len >= min_for_end {
        if let Some(last) = records.last_mut() {
            last.set(markers.slot, markers.end);
        }
    }
}
