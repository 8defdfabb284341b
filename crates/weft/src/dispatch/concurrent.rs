//! Dispatcher shared across threads.

use std::sync::{PoisonError, RwLock};

use dashmap::DashMap;
use tracing::trace;
use weft_types::TypeId;

use super::{Matcher, OverloadSet};
use crate::config::DispatchConfig;
use crate::error::DispatchError;

/// Thread-safe dispatcher returning clones of the selected value.
///
/// The overload set sits behind a read-write lock and the memo cache in a
/// concurrent map. Readers fill the cache while holding the read lock and
/// writers clear it under the write lock, so a cached value never outlives
/// the overload set it was computed from.
pub struct ConcurrentDispatcher<T> {
    overloads: RwLock<OverloadSet<T>>,
    cache: DashMap<Box<[TypeId]>, T>,
    cache_capacity: usize,
}

impl<T: Clone> ConcurrentDispatcher<T> {
    pub fn new(cache_capacity: usize) -> Self {
        Self::with_matcher(cache_capacity, super::is_base)
    }

    pub fn with_matcher(cache_capacity: usize, matcher: Matcher) -> Self {
        Self {
            overloads: RwLock::new(OverloadSet::with_matcher(matcher)),
            cache: DashMap::new(),
            cache_capacity,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.cache_capacity)
    }

    pub fn len(&self) -> usize {
        self.overloads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries currently memoized.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn insert(&self, params: impl Into<Box<[TypeId]>>, value: T) -> Result<(), DispatchError> {
        let mut overloads = self
            .overloads
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        overloads.insert(params, value)?;
        self.cache.clear();
        Ok(())
    }

    /// The most specific overload entailed by `args`.
    pub fn resolve(&self, args: &[TypeId]) -> Result<T, DispatchError> {
        if let Some(hit) = self.cache.get(args) {
            trace!(?args, "dispatch cache hit");
            return Ok(hit.value().clone());
        }
        trace!(?args, "dispatch cache miss");

        let overloads = self
            .overloads
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let value = overloads
            .find(args)
            .and_then(|index| overloads.get(index))
            .cloned()
            .ok_or_else(|| DispatchError::NoApplicableOverload {
                args: args.to_vec(),
            })?;
        if self.cache_capacity > 0 {
            if self.cache.len() >= self.cache_capacity {
                self.cache.clear();
            }
            self.cache.insert(args.into(), value.clone());
        }
        Ok(value)
    }
}

impl<T: Clone> Default for ConcurrentDispatcher<T> {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use TypeId::*;

    #[test]
    fn shared_across_threads() {
        let d = Arc::new(ConcurrentDispatcher::new(16));
        d.insert([Scalar], 0u32).unwrap();
        d.insert([IntKind], 1).unwrap();
        d.insert([FloatKind], 2).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let d = Arc::clone(&d);
                thread::spawn(move || {
                    (0..100)
                        .map(|i| {
                            let arg = [Int8, Float32, Bool][i % 3];
                            d.resolve(&[arg]).unwrap()
                        })
                        .sum::<u32>()
                })
            })
            .collect();
        for handle in handles {
            // 34 ints, 33 floats, 33 bools per thread.
            assert_eq!(handle.join().unwrap(), 34 + 66);
        }
        assert_eq!(d.cached(), 3);
    }

    #[test]
    fn insert_invalidates_cache() {
        let d = ConcurrentDispatcher::new(16);
        d.insert([Any], "any").unwrap();
        assert_eq!(d.resolve(&[Int8]), Ok("any"));
        assert_eq!(d.cached(), 1);
        d.insert([Int8], "int8").unwrap();
        assert_eq!(d.cached(), 0);
        assert_eq!(d.resolve(&[Int8]), Ok("int8"));
        assert_eq!(d.len(), 2);
    }
}
