//! Categorical assignment: lookups between category indices and strings,
//! and remapping between two category lists.

use std::collections::HashMap;
use std::sync::Arc;

use weft_types::{StringData, StringEncoding, category_storage_size};

use crate::codec::Codec;
use crate::error::KernelError;
use crate::mode::AssignErrorMode;
use crate::record::{Kernel, KernelRef};
use crate::string::{StringAssign, StringSlot};

/// Width of the stored category index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryStorage {
    U8,
    U16,
    U32,
}

impl CategoryStorage {
    pub fn for_count(count: usize) -> Self {
        match category_storage_size(count) {
            1 => CategoryStorage::U8,
            2 => CategoryStorage::U16,
            _ => CategoryStorage::U32,
        }
    }

    /// # Safety
    ///
    /// `ptr` must address one stored index of this width.
    #[inline]
    pub unsafe fn read(self, ptr: *const u8) -> u32 {
        unsafe {
            match self {
                CategoryStorage::U8 => ptr.read() as u32,
                CategoryStorage::U16 => ptr.cast::<u16>().read_unaligned() as u32,
                CategoryStorage::U32 => ptr.cast::<u32>().read_unaligned(),
            }
        }
    }

    /// # Safety
    ///
    /// `ptr` must address one writable index of this width, and `index`
    /// must fit it.
    #[inline]
    pub unsafe fn write(self, ptr: *mut u8, index: u32) {
        unsafe {
            match self {
                CategoryStorage::U8 => ptr.write(index as u8),
                CategoryStorage::U16 => ptr.cast::<u16>().write_unaligned(index as u16),
                CategoryStorage::U32 => ptr.cast::<u32>().write_unaligned(index),
            }
        }
    }
}

/// Looks the source text up in the category list.
pub struct StringToCategorical {
    src_slot: StringSlot,
    src_codec: Codec,
    lookup: HashMap<String, u32>,
    storage: CategoryStorage,
}

impl StringToCategorical {
    pub fn new(categories: &[String], src: (StringSlot, StringEncoding), mode: AssignErrorMode) -> Self {
        Self {
            src_slot: src.0,
            src_codec: Codec::new(src.1, mode.is_checked()),
            lookup: categories
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i as u32))
                .collect(),
            storage: CategoryStorage::for_count(categories.len()),
        }
    }
}

impl Kernel for StringToCategorical {
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let bytes = unsafe { self.src_slot.read(src[0], self.src_codec.unit_size()) };
        let text = self.src_codec.decode_all(bytes)?;
        let index = *self
            .lookup
            .get(&text)
            .ok_or(KernelError::UnknownCategory(text))?;
        unsafe { self.storage.write(dst, index) };
        Ok(())
    }
}

/// Writes the category name into a string destination.
pub struct CategoricalToString {
    categories: Arc<[StringData]>,
    storage: CategoryStorage,
    assign: StringAssign,
}

impl CategoricalToString {
    pub fn new(categories: &[String], dst: (StringSlot, StringEncoding), mode: AssignErrorMode) -> Self {
        Self {
            categories: categories.iter().map(|name| StringData::from_text(name)).collect(),
            storage: CategoryStorage::for_count(categories.len()),
            assign: StringAssign::new(dst, (StringSlot::Var, StringEncoding::Utf8), mode),
        }
    }
}

impl Kernel for CategoricalToString {
    unsafe fn single(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let index = unsafe { self.storage.read(src[0]) };
        let name = self
            .categories
            .get(index as usize)
            .ok_or_else(|| KernelError::UnknownCategory(format!("#{index}")))?;
        unsafe { self.assign.single(node, dst, &[(name as *const StringData).cast()]) }
    }
}

/// Maps indices of one category list onto another by name.
pub struct CategoricalRemap {
    table: Vec<Option<u32>>,
    src_categories: Arc<[String]>,
    src_storage: CategoryStorage,
    dst_storage: CategoryStorage,
}

impl CategoricalRemap {
    pub fn new(dst: &[String], src: Arc<[String]>) -> Self {
        let positions: HashMap<&str, u32> = dst
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i as u32))
            .collect();
        Self {
            table: src.iter().map(|name| positions.get(name.as_str()).copied()).collect(),
            src_storage: CategoryStorage::for_count(src.len()),
            dst_storage: CategoryStorage::for_count(dst.len()),
            src_categories: src,
        }
    }
}

impl Kernel for CategoricalRemap {
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let index = unsafe { self.src_storage.read(src[0]) } as usize;
        let mapped = self.table.get(index).copied().flatten().ok_or_else(|| {
            KernelError::UnknownCategory(
                self.src_categories
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| format!("#{index}")),
            )
        })?;
        unsafe { self.dst_storage.write(dst, mapped) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CallGraph, KernelBuilder, KernelRequest};
    use crate::chain::KernelChain;
    use weft_types::Arrmeta;

    fn chain_of<K: Kernel>(kernel: K) -> KernelChain {
        let mut graph = CallGraph::new();
        graph.push(move |kb, _, _, _| Ok(kb.emplace(kernel)));
        let mut kb = KernelBuilder::new(graph, 64);
        kb.instantiate_next(KernelRequest::Single, &Arrmeta::Empty, &[&Arrmeta::Empty])
            .unwrap();
        kb.finish(KernelRequest::Single).unwrap()
    }

    fn names(list: &[&str]) -> Arc<[String]> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const VAR8: (StringSlot, StringEncoding) = (StringSlot::Var, StringEncoding::Utf8);

    #[test]
    fn string_round_trip() {
        let categories = names(&["red", "green", "blue"]);
        let to_cat = chain_of(StringToCategorical::new(&categories, VAR8, AssignErrorMode::Fractional));
        let to_str = chain_of(CategoricalToString::new(&categories, VAR8, AssignErrorMode::Fractional));

        let src = StringData::from_text("blue");
        let mut index = 0u8;
        unsafe { to_cat.single(&mut index, &[(&raw const src).cast()]) }.unwrap();
        assert_eq!(index, 2);

        let mut out = StringData::default();
        unsafe { to_str.single((&raw mut out).cast(), &[&raw const index]) }.unwrap();
        assert_eq!(out.as_str(), Some("blue"));

        let unknown = StringData::from_text("mauve");
        let err = unsafe { to_cat.single(&mut index, &[(&raw const unknown).cast()]) };
        assert_eq!(err, Err(KernelError::UnknownCategory("mauve".to_string())));
    }

    #[test]
    fn remap_by_name() {
        let chain = chain_of(CategoricalRemap::new(
            &names(&["c", "b", "a"]),
            names(&["a", "b", "z"]),
        ));
        let mut out = 0u8;
        for (src, expected) in [(0u8, 2u8), (1, 1)] {
            unsafe { chain.single(&mut out, &[&raw const src]) }.unwrap();
            assert_eq!(out, expected);
        }
        let src = 2u8;
        let err = unsafe { chain.single(&mut out, &[&raw const src]) };
        assert_eq!(err, Err(KernelError::UnknownCategory("z".to_string())));
    }

    #[test]
    fn storage_width_follows_count() {
        assert_eq!(CategoryStorage::for_count(3), CategoryStorage::U8);
        assert_eq!(CategoryStorage::for_count(255), CategoryStorage::U16);
        assert_eq!(CategoryStorage::for_count(70_000), CategoryStorage::U32);
    }
}
