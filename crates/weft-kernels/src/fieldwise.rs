//! Field-by-field assignment of tuples and structs.

use weft_types::Arrmeta;

use crate::builder::{KernelBuilder, KernelRequest};
use crate::error::{BuildError, KernelError};
use crate::option::single_source;
use crate::record::{Kernel, KernelRef};

#[derive(Debug, Clone, Copy)]
struct FieldItem {
    child: usize,
    dst_offset: usize,
    src_offset: usize,
}

/// Assigns destination field `i` from source field `fields[i]`.
pub struct FieldwiseAssign {
    fields: Vec<FieldItem>,
}

fn field_meta<'a>(meta: &'a Arrmeta, index: usize, side: &str) -> Result<(usize, &'a Arrmeta), BuildError> {
    match (meta.data_offset(index), meta.field(index)) {
        (Some(offset), Some(field)) => Ok((offset, field)),
        _ => Err(BuildError::ArrmetaMismatch(format!(
            "{side} metadata has no field {index}"
        ))),
    }
}

impl FieldwiseAssign {
    /// Emplaces the composite, then one child per destination field from
    /// the call graph. `source_fields[i]` names the source field feeding
    /// destination field `i`.
    pub fn build(
        kb: &mut KernelBuilder,
        request: KernelRequest,
        source_fields: &[usize],
        dst: &Arrmeta,
        src: &[&Arrmeta],
    ) -> Result<usize, BuildError> {
        let src = single_source(src)?;
        if dst.field_count() != source_fields.len() {
            return Err(BuildError::ArrmetaMismatch(format!(
                "destination metadata has {} fields, expected {}",
                dst.field_count(),
                source_fields.len()
            )));
        }
        let mut fields = Vec::with_capacity(source_fields.len());
        for (i, &j) in source_fields.iter().enumerate() {
            fields.push(FieldItem {
                child: 0,
                dst_offset: field_meta(dst, i, "destination")?.0,
                src_offset: field_meta(src, j, "source")?.0,
            });
        }
        let me = kb.emplace(FieldwiseAssign { fields });
        for (i, &j) in source_fields.iter().enumerate() {
            let (_, dst_field) = field_meta(dst, i, "destination")?;
            let (_, src_field) = field_meta(src, j, "source")?;
            let child = kb.instantiate_next(request, dst_field, &[src_field])?;
            kb.get_at::<FieldwiseAssign>(me)?.fields[i].child = child - me;
        }
        Ok(me)
    }
}

impl Kernel for FieldwiseAssign {
    unsafe fn single(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        for field in &self.fields {
            unsafe {
                node.child(field.child).single(
                    dst.wrapping_add(field.dst_offset),
                    &[src[0].wrapping_add(field.src_offset)],
                )?;
            }
        }
        Ok(())
    }

    unsafe fn strided(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        dst_stride: isize,
        src: &[*const u8],
        src_stride: &[isize],
        count: usize,
    ) -> Result<(), KernelError> {
        for field in &self.fields {
            unsafe {
                node.child(field.child).strided(
                    dst.wrapping_add(field.dst_offset),
                    dst_stride,
                    &[src[0].wrapping_add(field.src_offset)],
                    src_stride,
                    count,
                )?;
            }
        }
        Ok(())
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(usize)) {
        for field in &self.fields {
            visit(field.child);
        }
    }
}
