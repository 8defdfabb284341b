//! Leaf kernels that call a plain Rust function once per element.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::KernelError;
use crate::numeric::{Element, ScalarKind};
use crate::record::{Kernel, KernelRef};

/// A function over [`Element`] arguments, callable through raw element
/// pointers.
///
/// Implemented for every `Fn(A1, .., An) -> R` with one to
/// [`MAX_ARITY`](crate::record::MAX_ARITY) arguments. `Args` is the tuple of
/// argument types and only serves to tell the arities apart.
pub trait ElementFn<Args>: Send + Sync + 'static {
    type Output: Element;

    /// Argument kinds, in order.
    fn param_kinds() -> Vec<ScalarKind>;

    /// Reads one element per argument, calls the function and writes the
    /// result.
    ///
    /// # Safety
    ///
    /// Each pointer in `src` must address a valid value of the matching
    /// argument type and `dst` must be writable for `Self::Output`.
    unsafe fn call_raw(&self, dst: *mut u8, src: &[*const u8]) -> Result<(), KernelError>;
}

macro_rules! element_fn {
    ($n:literal: $($arg:ident $ptr:ident),+) => {
        impl<F, R, $($arg),+> ElementFn<($($arg,)+)> for F
        where
            F: Fn($($arg),+) -> R + Send + Sync + 'static,
            R: Element,
            $($arg: Element,)+
        {
            type Output = R;

            fn param_kinds() -> Vec<ScalarKind> {
                vec![$($arg::KIND),+]
            }

            #[inline]
            unsafe fn call_raw(&self, dst: *mut u8, src: &[*const u8]) -> Result<(), KernelError> {
                let &[$($ptr),+] = src else {
                    return Err(KernelError::ArgumentCount {
                        expected: $n,
                        actual: src.len(),
                    });
                };
                let out = self($(unsafe { $ptr.cast::<$arg>().read_unaligned() }),+);
                unsafe { dst.cast::<R>().write_unaligned(out) };
                Ok(())
            }
        }
    };
}

element_fn!(1: A0 a0);
element_fn!(2: A0 a0, A1 a1);
element_fn!(3: A0 a0, A1 a1, A2 a2);
element_fn!(4: A0 a0, A1 a1, A2 a2, A3 a3);
element_fn!(5: A0 a0, A1 a1, A2 a2, A3 a3, A4 a4);
element_fn!(6: A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
element_fn!(7: A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
element_fn!(8: A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);

/// Calls a shared function on every element; strided execution loops over
/// `single`.
pub struct FunctionKernel<F, Args> {
    func: Arc<F>,
    _args: PhantomData<fn(Args)>,
}

impl<F, Args> FunctionKernel<F, Args>
where
    F: ElementFn<Args>,
{
    pub fn new(func: Arc<F>) -> Self {
        Self {
            func,
            _args: PhantomData,
        }
    }
}

impl<F, Args> Kernel for FunctionKernel<F, Args>
where
    F: ElementFn<Args>,
    Args: 'static,
{
    #[inline]
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        unsafe { self.func.call_raw(dst, src) }
    }
}

#[cfg(test)]
mod tests {
    use half::f16;
    use weft_types::Arrmeta;

    use super::*;
    use crate::builder::{CallGraph, KernelBuilder, KernelRequest};

    fn param_kinds<Args, F: ElementFn<Args>>(_: &F) -> Vec<ScalarKind> {
        F::param_kinds()
    }

    #[test]
    fn kinds_follow_the_argument_types() {
        let f = |a: i8, b: f16, c: bool| if c { a as f64 } else { b.to_f64() };
        assert_eq!(
            param_kinds(&f),
            [ScalarKind::Int8, ScalarKind::Float16, ScalarKind::Bool]
        );
    }

    #[test]
    fn kernel_calls_the_function() {
        fn clamp(value: i64, lo: i64, hi: i64) -> i64 {
            value.clamp(lo, hi)
        }
        let mut graph = CallGraph::new();
        let func = Arc::new(clamp);
        graph.push(move |kb, _, _, _| Ok(kb.emplace(FunctionKernel::new(func))));
        let mut kb = KernelBuilder::new(graph, 64);
        kb.instantiate_next(KernelRequest::Strided, &Arrmeta::Empty, &[&Arrmeta::Empty; 3])
            .unwrap();
        let chain = kb.finish(KernelRequest::Strided).unwrap();

        let values = [-5i64, 3, 99];
        let (lo, hi) = (0i64, 10i64);
        let mut out = [0i64; 3];
        unsafe {
            chain.strided(
                out.as_mut_ptr().cast(),
                8,
                &[values.as_ptr().cast(), (&raw const lo).cast(), (&raw const hi).cast()],
                &[8, 0, 0],
                3,
            )
        }
        .unwrap();
        assert_eq!(out, [0, 3, 10]);

        let err = unsafe { chain.single(out.as_mut_ptr().cast(), &[values.as_ptr().cast()]) };
        assert_eq!(
            err,
            Err(KernelError::ArgumentCount {
                expected: 3,
                actual: 1
            })
        );
    }
}
