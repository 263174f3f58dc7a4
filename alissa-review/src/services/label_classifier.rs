//! Manual review label counting
//!
//! A variant counts toward every bucket whose marker occurs in its labels
//! (case-insensitive); buckets are not mutually exclusive.

use crate::models::{LabelCounts, VariantRecord};

pub const MANUAL_REVIEW_Y: &str = "y,manual review";
pub const MANUAL_REVIEW_Y2: &str = "y2,manual review";
pub const MANUAL_REVIEW_Y3_RARE: &str = "y3 (rare),manual review";

/// Count manual review buckets over exported variants
pub fn classify(records: &[VariantRecord]) -> LabelCounts {
    classify_labels(records.iter().map(|record| record.labels_text()))
}

/// Count manual review buckets over raw label strings
pub fn classify_labels<I, S>(labels: I) -> LabelCounts
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .fold(LabelCounts::default(), |mut counts, label| {
            let label = label.as_ref().to_lowercase();

            if label.contains(MANUAL_REVIEW_Y) {
                counts.y += 1;
            }
            if label.contains(MANUAL_REVIEW_Y2) {
                counts.y2 += 1;
            }
            if label.contains(MANUAL_REVIEW_Y3_RARE) {
                counts.y3_rare += 1;
            }

            counts
        })
}
