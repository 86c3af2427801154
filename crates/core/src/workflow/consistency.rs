use crate::shared::image::{Dataset, ImageRecord};

/// Consistency partition of a dataset snapshot.
///
/// `total`/`labeled`/`unlabeled` look only at each image's current
/// label; the consistent/inconsistent buckets look only at the set of
/// distinct values in each image's history. Images with no history
/// belong to neither bucket.
#[derive(Debug, Default)]
pub struct DatasetBreakdown {
    pub total: usize,
    pub labeled: usize,
    pub unlabeled: usize,
    pub consistent: Vec<ImageRecord>,
    pub inconsistent: Vec<ImageRecord>,
}

/// Pure classification over a dataset snapshot; input order is irrelevant.
pub fn classify(dataset: &Dataset) -> DatasetBreakdown {
    let total = dataset.images.len();
    let labeled = dataset.images.iter().filter(|img| img.is_labeled()).count();

    let mut breakdown = DatasetBreakdown {
        total,
        labeled,
        unlabeled: total - labeled,
        ..DatasetBreakdown::default()
    };

    for image in &dataset.images {
        if image.history.is_empty() {
            continue;
        }
        if image.distinct_labels().len() == 1 {
            breakdown.consistent.push(image.clone());
        } else {
            breakdown.inconsistent.push(image.clone());
        }
    }

    breakdown
}
