use crate::shared::image::ImageRecord;

/// Ordered, indexable view of a dataset's images with a navigation cursor.
///
/// Pure in-memory state: the caller feeds `load` with fetched data, so
/// navigation logic never touches the network. The cursor is only
/// meaningful while the queue is non-empty and always stays in bounds.
#[derive(Debug, Default)]
pub struct ImageQueue {
    images: Vec<ImageRecord>,
    cursor: usize,
}

impl ImageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the queue contents and resets the cursor to the front.
    pub fn load(&mut self, images: Vec<ImageRecord>) {
        self.images = images;
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    /// The image under the cursor, or `None` for an empty queue.
    pub fn current(&self) -> Option<&ImageRecord> {
        self.images.get(self.cursor)
    }

    pub fn current_index(&self) -> Option<usize> {
        if self.images.is_empty() {
            None
        } else {
            Some(self.cursor)
        }
    }

    /// Advances the cursor; a no-op at the end. Returns whether it moved.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.images.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Steps the cursor back; a no-op at the front. Returns whether it moved.
    pub fn prev(&mut self) -> bool {
        if self.cursor > 0 && !self.images.is_empty() {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Moves the cursor to the given image, falling back to the front
    /// when the id is not present. Returns whether the id was found.
    pub fn jump_to(&mut self, image_id: &str) -> bool {
        match self.images.iter().position(|img| img.id == image_id) {
            Some(index) => {
                self.cursor = index;
                true
            }
            None => {
                self.cursor = 0;
                false
            }
        }
    }

    /// Removes an image and repositions the cursor to
    /// `min(deleted index, new length - 1)`; an emptied queue has no
    /// cursor. Returns whether anything was removed.
    pub fn remove(&mut self, image_id: &str) -> bool {
        let Some(index) = self.images.iter().position(|img| img.id == image_id) else {
            return false;
        };
        self.images.remove(index);
        if self.images.is_empty() {
            self.cursor = 0;
        } else {
            // Keep the cursor at the deleted slot so the next image
            // slides into view; clamp at the new end.
            self.cursor = index.min(self.images.len() - 1);
        }
        true
    }

    /// Replaces the entry with the same id. Reconciliation is keyed by
    /// identifier so a late response for a no-longer-current image still
    /// lands on the right record. Returns whether a match was found.
    pub fn update(&mut self, image: ImageRecord) -> bool {
        match self.images.iter_mut().find(|img| img.id == image.id) {
            Some(slot) => {
                *slot = image;
                true
            }
            None => false,
        }
    }
}
