//! Multiple dispatch over type ids.
//!
//! An [`OverloadSet`] keeps `(parameter ids, value)` entries sorted so that
//! more specific entries come first; resolving is then a first-match scan.
//! [`Dispatcher`] adds a memo cache for single-owner use and
//! [`ConcurrentDispatcher`] shares one set across threads.

mod concurrent;
mod dispatcher;
mod order;

pub use concurrent::ConcurrentDispatcher;
pub use dispatcher::Dispatcher;
pub use order::{Matcher, entails, is_base, supersedes};

use tracing::debug;
use weft_types::TypeId;

use crate::error::DispatchError;

struct Entry<T> {
    params: Box<[TypeId]>,
    value: T,
    seq: u64,
}

/// Overloads sorted most specific first.
pub struct OverloadSet<T> {
    entries: Vec<Entry<T>>,
    matcher: Matcher,
    next_seq: u64,
}

impl<T> Default for OverloadSet<T> {
    fn default() -> Self {
        Self::with_matcher(is_base)
    }
}

impl<T> OverloadSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matcher(matcher: Matcher) -> Self {
        Self {
            entries: Vec::new(),
            matcher,
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an overload, or replaces the value of an identical parameter
    /// list, then re-sorts. A failed sort leaves the set unchanged.
    pub fn insert(&mut self, params: impl Into<Box<[TypeId]>>, value: T) -> Result<(), DispatchError> {
        let params = params.into();
        if let Some(existing) = self.entries.iter_mut().find(|e| e.params == params) {
            existing.value = value;
            return Ok(());
        }
        self.entries.push(Entry {
            params,
            value,
            seq: self.next_seq,
        });

        let order = {
            let params: Vec<&[TypeId]> = self.entries.iter().map(|e| &*e.params).collect();
            let seq: Vec<u64> = self.entries.iter().map(|e| e.seq).collect();
            order::specificity_order(self.matcher, &params, &seq)
        };
        let order = match order {
            Ok(order) => order,
            Err(err) => {
                self.entries.pop();
                return Err(err);
            }
        };
        self.next_seq += 1;

        let mut slots: Vec<Option<Entry<T>>> = self.entries.drain(..).map(Some).collect();
        self.entries = order.into_iter().filter_map(|i| slots[i].take()).collect();
        debug!(overloads = self.entries.len(), "overloads re-sorted");
        Ok(())
    }

    /// Index of the first overload entailed by `args`.
    pub fn find(&self, args: &[TypeId]) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| entails(self.matcher, &e.params, args))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index).map(|e| &e.value)
    }

    /// Overloads in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = (&[TypeId], &T)> {
        self.entries.iter().map(|e| (&*e.params, &e.value))
    }
}
