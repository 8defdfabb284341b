//! Single-owner dispatcher with a memo cache.

use std::collections::HashMap;

use tracing::trace;
use weft_types::TypeId;

use super::{Matcher, OverloadSet};
use crate::config::DispatchConfig;
use crate::error::DispatchError;

/// Resolves argument ids to the most specific overload, caching the answer
/// per argument tuple.
pub struct Dispatcher<T> {
    overloads: OverloadSet<T>,
    cache: HashMap<Box<[TypeId]>, usize>,
    cache_capacity: usize,
}

impl<T> Dispatcher<T> {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            overloads: OverloadSet::new(),
            cache: HashMap::new(),
            cache_capacity,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.cache_capacity)
    }

    /// Replaces the matcher; existing overloads are dropped.
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.overloads = OverloadSet::with_matcher(matcher);
        self.cache.clear();
        self
    }

    pub fn overloads(&self) -> &OverloadSet<T> {
        &self.overloads
    }

    /// Entries currently memoized.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn insert(&mut self, params: impl Into<Box<[TypeId]>>, value: T) -> Result<(), DispatchError> {
        self.overloads.insert(params, value)?;
        self.cache.clear();
        Ok(())
    }

    /// The most specific overload entailed by `args`.
    pub fn resolve(&mut self, args: &[TypeId]) -> Result<&T, DispatchError> {
        let cached = self.cache.get(args).copied();
        let index = match cached {
            Some(index) => {
                trace!(?args, "dispatch cache hit");
                index
            }
            None => {
                trace!(?args, "dispatch cache miss");
                let index = self.overloads.find(args).ok_or_else(|| {
                    DispatchError::NoApplicableOverload {
                        args: args.to_vec(),
                    }
                })?;
                if self.cache_capacity > 0 {
                    if self.cache.len() >= self.cache_capacity {
                        self.cache.clear();
                    }
                    self.cache.insert(args.into(), index);
                }
                index
            }
        };
        self.overloads
            .get(index)
            .ok_or_else(|| DispatchError::NoApplicableOverload {
                args: args.to_vec(),
            })
    }
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}
