use std::collections::HashMap;

use crate::shared::image::LabelCount;
use crate::store::domain::dataset_store::DatasetStore;

/// One label's share of an image's labeling events.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelShare {
    pub label: String,
    pub count: u64,
    /// `100 * count / total`, rounded to one decimal.
    pub percentage: f64,
}

/// Normalizes raw label counts into percentage shares.
///
/// Empty or all-zero input yields an empty distribution so the caller
/// can render a neutral "no statistics" state instead of an error.
pub fn distribution(counts: &[LabelCount]) -> Vec<LabelShare> {
    let total: u64 = counts.iter().map(|c| c.count).sum();
    if total == 0 {
        return Vec::new();
    }
    counts
        .iter()
        .map(|c| LabelShare {
            label: c.label.clone(),
            count: c.count,
            percentage: (c.count as f64 * 1000.0 / total as f64).round() / 10.0,
        })
        .collect()
}

/// Read-through cache of per-image label distributions.
///
/// A successful label write invalidates the written image's entry so
/// the next fetch reflects it; fetch failures are returned as an empty
/// distribution and never cached.
#[derive(Default)]
pub struct LabelStatsCache {
    cache: HashMap<String, Vec<LabelShare>>,
}

impl LabelStatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch(
        &mut self,
        store: &dyn DatasetStore,
        dataset_id: &str,
        image_id: &str,
    ) -> Vec<LabelShare> {
        if let Some(cached) = self.cache.get(image_id) {
            return cached.clone();
        }
        match store.label_stats(dataset_id, image_id) {
            Ok(counts) => {
                let shares = distribution(&counts);
                self.cache.insert(image_id.to_string(), shares.clone());
                shares
            }
            Err(e) => {
                log::warn!("label stats unavailable for image {image_id}: {e}");
                Vec::new()
            }
        }
    }

    pub fn invalidate(&mut self, image_id: &str) {
        self.cache.remove(image_id);
    }
}
