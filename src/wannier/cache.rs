/* ************************************************************************ **
** This file is part of wanbond, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::interp::Interpolated;
use crate::spectral::KMeshState;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Identifies a computation by its mesh and a fingerprint of its input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub mesh: [usize; 3],
    pub fingerprint: u64,
}

/// Results that are expensive to recompute, shared between threads.
#[derive(Debug)]
pub struct Cache<V> {
    map: Mutex<HashMap<CacheKey, Arc<V>>>,
}

pub type InterpolationCache = Cache<Interpolated>;
pub type SpectralCache = Cache<KMeshState>;

impl<V> Default for Cache<V> {
    fn default() -> Self { Cache { map: Mutex::new(HashMap::new()) } }
}

impl<V> Cache<V> {
    pub fn new() -> Self
    { Self::default() }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<V>>
    { self.lock().get(key).cloned() }

    /// Return the cached value, or compute and store it.
    ///
    /// The lock is not held during `compute`; if two threads race, both compute
    /// and the first value stored wins.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(value) = self.get(&key) {
            trace!("cache hit for {:?}", key);
            return Ok(value);
        }
        let value = Arc::new(compute()?);
        Ok(self.lock().entry(key).or_insert(value).clone())
    }

    pub fn len(&self) -> usize
    { self.lock().len() }

    pub fn is_empty(&self) -> bool
    { self.lock().is_empty() }

    pub fn clear(&self)
    { self.lock().clear() }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<V>>> {
        // a panic elsewhere cannot leave the map half-written
        self.map.lock().unwrap_or_else(|e| e.into_inner())
    }
}
