//! Assignment through a pointer source.

use weft_types::Arrmeta;

use crate::builder::{KernelBuilder, KernelRequest};
use crate::error::{BuildError, KernelError};
use crate::option::single_source;
use crate::record::{Kernel, KernelRef};

/// Reads the source pointer and assigns from its target.
pub struct DerefAssign {
    child: usize,
}

impl DerefAssign {
    /// Emplaces the composite, then the target assignment from the call
    /// graph.
    pub fn build(
        kb: &mut KernelBuilder,
        request: KernelRequest,
        dst: &Arrmeta,
        src: &[&Arrmeta],
    ) -> Result<usize, BuildError> {
        let target = single_source(src)?
            .pointer_target()
            .ok_or_else(|| BuildError::ArrmetaMismatch("source is not a pointer".to_string()))?;
        let me = kb.emplace(DerefAssign { child: 0 });
        let child = kb.instantiate_next(request, dst, &[target])?;
        kb.get_at::<DerefAssign>(me)?.child = child - me;
        Ok(me)
    }
}

impl Kernel for DerefAssign {
    unsafe fn single(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        unsafe {
            let target = src[0].cast::<*const u8>().read_unaligned();
            node.child(self.child).single(dst, &[target])
        }
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(usize)) {
        visit(self.child);
    }
}
