//! A [`TransformStore`] persisted as two JSON mappings in a key-value medium.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::{
    KeyValueMedium, MemoryMedium, SavedTransform, StoreError, TransformStore, CROP_HISTORY_KEY,
    IMAGE_ROTATIONS_KEY,
};
use crate::transform::Rotation;
use crate::ImageRef;

/// Write-through store over a [`KeyValueMedium`].
///
/// Both mappings are loaded once when the store is opened and kept in memory.
/// Every put serializes the whole affected mapping and writes it to the
/// medium before returning; if that write fails the in-memory entry is rolled
/// back so the cache never claims more than the medium holds.
#[derive(Debug)]
pub struct PersistedStore<M> {
    medium: M,
    transforms: BTreeMap<ImageRef, SavedTransform>,
    rotations: BTreeMap<ImageRef, Rotation>,
}

/// A store that lives only as long as the process.
pub type MemoryStore = PersistedStore<MemoryMedium>;

impl MemoryStore {
    pub fn in_memory() -> Self {
        Self {
            medium: MemoryMedium::new(),
            transforms: BTreeMap::new(),
            rotations: BTreeMap::new(),
        }
    }
}

impl<M: KeyValueMedium> PersistedStore<M> {
    /// Load both mappings from `medium`.
    ///
    /// A missing key is an empty mapping. A value that does not parse is
    /// logged and treated as empty; the next save replaces it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the medium cannot be read.
    pub fn open(medium: M) -> Result<Self, StoreError> {
        let transforms = load_mapping(&medium, CROP_HISTORY_KEY)?;
        let rotations = load_mapping(&medium, IMAGE_ROTATIONS_KEY)?;
        debug!(
            crops = transforms.len(),
            rotations = rotations.len(),
            "opened transform store"
        );
        Ok(Self {
            medium,
            transforms,
            rotations,
        })
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Every image with a saved crop or rotation, in order.
    pub fn images(&self) -> Vec<ImageRef> {
        let keys: BTreeSet<&ImageRef> = self.transforms.keys().chain(self.rotations.keys()).collect();
        keys.into_iter().cloned().collect()
    }
}

fn load_mapping<M, V>(medium: &M, key: &str) -> Result<BTreeMap<ImageRef, V>, StoreError>
where
    M: KeyValueMedium,
    V: DeserializeOwned,
{
    let Some(raw) = medium.read(key)? else {
        return Ok(BTreeMap::new());
    };
    match serde_json::from_str(&raw) {
        Ok(mapping) => Ok(mapping),
        Err(err) => {
            warn!(key, error = %err, "discarding unreadable store value");
            Ok(BTreeMap::new())
        }
    }
}

/// Insert, persist the whole mapping, and roll back the insert on failure.
fn put_through<M, V>(
    medium: &mut M,
    mapping: &mut BTreeMap<ImageRef, V>,
    key: &str,
    image: &ImageRef,
    value: V,
) -> Result<(), StoreError>
where
    M: KeyValueMedium,
    V: Serialize,
{
    let previous = mapping.insert(image.clone(), value);

    let written = serde_json::to_string(mapping)
        .map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })
        .and_then(|json| medium.write(key, &json));

    if written.is_err() {
        match previous {
            Some(old) => {
                mapping.insert(image.clone(), old);
            }
            None => {
                mapping.remove(image);
            }
        }
    }
    written
}

impl<M: KeyValueMedium> TransformStore for PersistedStore<M> {
    fn transform(&self, image: &ImageRef) -> Result<Option<SavedTransform>, StoreError> {
        Ok(self.transforms.get(image).copied())
    }

    fn put_transform(
        &mut self,
        image: &ImageRef,
        transform: SavedTransform,
    ) -> Result<(), StoreError> {
        put_through(
            &mut self.medium,
            &mut self.transforms,
            CROP_HISTORY_KEY,
            image,
            transform,
        )?;
        debug!(%image, "saved crop");
        Ok(())
    }

    fn rotation(&self, image: &ImageRef) -> Result<Option<Rotation>, StoreError> {
        Ok(self.rotations.get(image).copied())
    }

    fn put_rotation(&mut self, image: &ImageRef, rotation: Rotation) -> Result<(), StoreError> {
        put_through(
            &mut self.medium,
            &mut self.rotations,
            IMAGE_ROTATIONS_KEY,
            image,
            rotation,
        )?;
        debug!(%image, degrees = rotation.degrees(), "saved rotation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormalizedRect;
    use crate::store::DirectoryMedium;

    /// Accepts reads, refuses writes.
    struct ReadOnlyMedium;

    impl KeyValueMedium for ReadOnlyMedium {
        fn read(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn write(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io {
                key: key.to_string(),
                message: "read-only".to_string(),
            })
        }
    }

    fn saved(x: f64, zoom: f64) -> SavedTransform {
        SavedTransform::new(NormalizedRect::new(x, x, 0.5, 0.5).unwrap(), zoom)
    }

    #[test]
    fn test_get_put_independent_mappings() {
        let mut store = MemoryStore::in_memory();
        let image = ImageRef::from("frame_1.jpg");

        store.put_rotation(&image, Rotation::Deg90).unwrap();
        assert_eq!(store.rotation(&image).unwrap(), Some(Rotation::Deg90));
        assert_eq!(store.transform(&image).unwrap(), None);

        store.put_transform(&image, saved(0.1, 1.5)).unwrap();
        assert_eq!(store.transform(&image).unwrap(), Some(saved(0.1, 1.5)));
    }

    #[test]
    fn test_put_writes_through_to_medium() {
        let mut store = MemoryStore::in_memory();
        store
            .put_rotation(&ImageRef::from("a.jpg"), Rotation::Deg270)
            .unwrap();

        let raw = store.medium().read(IMAGE_ROTATIONS_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"a.jpg":270}"#);
        assert_eq!(store.medium().read(CROP_HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn test_reopen_directory_store_sees_saved_state() {
        let tmp = tempfile::tempdir().unwrap();
        let image = ImageRef::from("/media/highlight_images/v1/frame_3.jpg");

        {
            let mut store = PersistedStore::open(DirectoryMedium::new(tmp.path())).unwrap();
            store.put_transform(&image, saved(0.25, 2.0)).unwrap();
            store.put_rotation(&image, Rotation::Deg180).unwrap();
        }

        let store = PersistedStore::open(DirectoryMedium::new(tmp.path())).unwrap();
        assert_eq!(store.transform(&image).unwrap(), Some(saved(0.25, 2.0)));
        assert_eq!(store.rotation(&image).unwrap(), Some(Rotation::Deg180));
        assert_eq!(store.images(), vec![image]);
    }

    #[test]
    fn test_unreadable_value_treated_as_empty() {
        let medium = MemoryMedium::new()
            .with_entry(CROP_HISTORY_KEY, "{not json")
            .with_entry(IMAGE_ROTATIONS_KEY, r#"{"b.jpg":90}"#);
        let store = PersistedStore::open(medium).unwrap();

        assert_eq!(store.transform(&ImageRef::from("b.jpg")).unwrap(), None);
        assert_eq!(
            store.rotation(&ImageRef::from("b.jpg")).unwrap(),
            Some(Rotation::Deg90)
        );
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut store = PersistedStore::open(ReadOnlyMedium).unwrap();
        let image = ImageRef::from("c.jpg");

        assert!(store.put_rotation(&image, Rotation::Deg90).is_err());
        assert_eq!(store.rotation(&image).unwrap(), None);

        assert!(store.put_transform(&image, saved(0.0, 1.0)).is_err());
        assert_eq!(store.transform(&image).unwrap(), None);
    }

    #[test]
    fn test_images_lists_union_of_keys() {
        let mut store = MemoryStore::in_memory();
        store
            .put_transform(&ImageRef::from("b.jpg"), saved(0.0, 1.0))
            .unwrap();
        store
            .put_rotation(&ImageRef::from("a.jpg"), Rotation::Deg90)
            .unwrap();
        store
            .put_rotation(&ImageRef::from("b.jpg"), Rotation::Deg0)
            .unwrap();

        assert_eq!(
            store.images(),
            vec![ImageRef::from("a.jpg"), ImageRef::from("b.jpg")]
        );
    }
}
