use crate::storage::Store;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ops::Deref;

/// A value loaded from a store slot on construction and written back only
/// when the owner calls `save()`.
///
/// Mutating methods on the owning engine end with `save()`; there is no
/// implicit write on drop or on `get_mut`.
pub struct Persisted<T> {
    store: Store,
    key: &'static str,
    value: T,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn load(store: Store, key: &'static str, default: T) -> Self {
        let value = store.read(key, default);
        Self { store, key, value }
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn save(&self) {
        self.store.write(self.key, &self.value);
    }
}

impl<T> Deref for Persisted<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
