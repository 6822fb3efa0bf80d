//! The fixed list of images discovered for one session.

use std::sync::Arc;

use crate::error::Error;
use crate::events::ImageId;

/// Immutable, non-empty list of discovered images. Cheap to clone; shared
/// read-only between the preloader and the foreground loop.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Arc<[ImageId]>,
}

impl Catalog {
    /// Construct a catalog from discovered identifiers.
    ///
    /// # Errors
    /// Returns [`Error::EmptyCatalog`] if `items` is empty.
    pub fn new(items: Vec<ImageId>) -> Result<Self, Error> {
        if items.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self {
            items: items.into(),
        })
    }

    /// Number of images in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no images. A constructed catalog never does.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageId> {
        self.items.iter()
    }

    #[must_use]
    pub fn contains(&self, id: &ImageId) -> bool {
        self.items.contains(id)
    }

    /// Borrow the underlying list.
    #[must_use]
    pub fn as_slice(&self) -> &[ImageId] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(Catalog::new(Vec::new()), Err(Error::EmptyCatalog)));
    }

    #[test]
    fn clones_share_storage() {
        let catalog = Catalog::new(vec![ImageId::from("/a.jpg"), ImageId::from("/b.jpg")]).unwrap();
        let other = catalog.clone();
        assert_eq!(other.len(), 2);
        assert!(other.contains(&ImageId::from("/b.jpg")));
        assert!(std::ptr::eq(catalog.as_slice(), other.as_slice()));
    }
}
