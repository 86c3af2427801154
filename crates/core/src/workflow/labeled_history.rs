use crate::shared::constants::HISTORY_PAGE_SIZE;
use crate::shared::image::{ImageRecord, LabeledPage};

/// Paged view of recently labeled images, independent of the live queue.
///
/// Holds exactly one server-fetched page in memory. Crop derivatives
/// sort ahead of whole-image labels regardless of recency, then newest
/// first. The head-of-list upsert keeps a just-labeled image visible
/// without a re-fetch.
#[derive(Debug, Default)]
pub struct LabeledHistory {
    entries: Vec<ImageRecord>,
    page: usize,
    total: usize,
}

impl LabeledHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the in-memory page with a fetched one.
    pub fn load(&mut self, page: usize, fetched: LabeledPage) {
        let mut entries = fetched.images;
        entries.sort_by(|a, b| {
            b.is_cropped
                .cmp(&a.is_cropped)
                .then(b.labeled_at.cmp(&a.labeled_at))
        });
        self.entries = entries;
        self.total = fetched.total;
        self.page = page;
    }

    pub fn entries(&self) -> &[ImageRecord] {
        &self.entries
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Total labeled images across all pages, as last reported.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        (self.page + 1) * HISTORY_PAGE_SIZE < self.total
    }

    /// Page index to fetch for backward paging, `None` at page 0.
    pub fn prev_page(&self) -> Option<usize> {
        self.has_prev().then(|| self.page - 1)
    }

    /// Page index to fetch for forward paging, `None` on the last page.
    pub fn next_page(&self) -> Option<usize> {
        self.has_next().then(|| self.page + 1)
    }

    /// Inserts at the front, deduplicated by id: an already-listed image
    /// moves to the front, a new one grows the total.
    pub fn upsert_front(&mut self, image: ImageRecord) {
        let existed = self.remove_entry(&image.id);
        self.entries.insert(0, image);
        if !existed {
            self.total += 1;
        }
    }

    /// Replaces a listed entry in place, keyed by id.
    pub fn update(&mut self, image: ImageRecord) -> bool {
        match self.entries.iter_mut().find(|img| img.id == image.id) {
            Some(slot) => {
                *slot = image;
                true
            }
            None => false,
        }
    }

    /// Drops an image from the view and the running total.
    pub fn remove(&mut self, image_id: &str) -> bool {
        if self.remove_entry(image_id) {
            self.total = self.total.saturating_sub(1);
            true
        } else {
            false
        }
    }

    fn remove_entry(&mut self, image_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|img| img.id != image_id);
        self.entries.len() != before
    }
}
