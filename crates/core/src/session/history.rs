//! Generated images and the in-memory session history.

use crate::options::{AspectRatio, ModelTier};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use uuid::Uuid;

/// An image produced by one successful generation.
///
/// Fields are private; once built the image cannot change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    id: Uuid,
    url: String,
    prompt: String,
    model: ModelTier,
    timestamp: DateTime<Utc>,
    aspect_ratio: Option<AspectRatio>,
}

impl GeneratedImage {
    /// Creates an image with a fresh v4 id stamped with the current time.
    pub fn new(
        url: impl Into<String>,
        prompt: impl Into<String>,
        model: ModelTier,
        aspect_ratio: Option<AspectRatio>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), Utc::now(), url, prompt, model, aspect_ratio)
    }

    pub fn with_id(
        id: Uuid,
        timestamp: DateTime<Utc>,
        url: impl Into<String>,
        prompt: impl Into<String>,
        model: ModelTier,
        aspect_ratio: Option<AspectRatio>,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            prompt: prompt.into(),
            model,
            timestamp,
            aspect_ratio,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The image as a `data:` URI.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model(&self) -> ModelTier {
        self.model
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        self.aspect_ratio
    }
}

/// Images generated this session, newest first.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<GeneratedImage>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `image` as the newest entry.
    ///
    /// Returns `false` and leaves the history untouched if the id is already present.
    pub fn push_front(&mut self, image: GeneratedImage) -> bool {
        if self.contains(image.id()) {
            return false;
        }
        self.entries.push_front(image);
        true
    }

    /// Removes the entry with `id`, if any.
    pub fn remove(&mut self, id: Uuid) -> Option<GeneratedImage> {
        let index = self.entries.iter().position(|image| image.id() == id)?;
        self.entries.remove(index)
    }

    pub fn get(&self, id: Uuid) -> Option<&GeneratedImage> {
        self.entries.iter().find(|image| image.id() == id)
    }

    /// Entry at `index`, where 0 is the newest.
    pub fn nth(&self, index: usize) -> Option<&GeneratedImage> {
        self.entries.get(index)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedImage> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(prompt: &str) -> GeneratedImage {
        GeneratedImage::new(
            "data:image/png;base64,AAAA",
            prompt,
            ModelTier::Flash,
            Some(AspectRatio::Square),
        )
    }

    #[test]
    fn newest_entry_comes_first() {
        let mut history = History::new();
        for prompt in ["one", "two", "three"] {
            assert!(history.push_front(image(prompt)));
        }
        let prompts: Vec<&str> = history.iter().map(|i| i.prompt()).collect();
        assert_eq!(prompts, ["three", "two", "one"]);
        assert_eq!(history.nth(0).unwrap().prompt(), "three");
    }

    #[test]
    fn duplicate_id_is_refused() {
        let mut history = History::new();
        let first = image("one");
        assert!(history.push_front(first.clone()));
        assert!(!history.push_front(first));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn remove_takes_out_only_that_entry() {
        let mut history = History::new();
        let images: Vec<_> = ["a", "b", "c", "d"].into_iter().map(image).collect();
        for img in &images {
            history.push_front(img.clone());
        }

        let removed = history.remove(images[1].id()).unwrap();
        assert_eq!(removed.prompt(), "b");
        assert!(history.remove(images[1].id()).is_none());

        let prompts: Vec<&str> = history.iter().map(|i| i.prompt()).collect();
        assert_eq!(prompts, ["d", "c", "a"]);
    }

    #[test]
    fn fresh_images_get_distinct_ids() {
        assert_ne!(image("x").id(), image("x").id());
    }
}
