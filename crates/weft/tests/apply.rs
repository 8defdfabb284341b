//! Wrapped Rust functions resolved and executed through the engine.

use weft::builtins::FunctionCallable;
use weft::{Arrmeta, Engine, Error, KernelChain, KernelRequest, Kwds, Type};

fn weighted(count: i32, weight: f64) -> f64 {
    count as f64 * weight
}

fn build(callable: &FunctionCallable<fn(i32, f64) -> f64, (i32, f64)>, request: KernelRequest) -> KernelChain {
    let engine = Engine::default();
    let src = [Type::int32(), Type::float64()];
    let resolved = engine.resolve(callable, &Type::any(), &src, &Kwds::new()).unwrap();
    assert_eq!(resolved.dst_type, Type::float64());
    engine
        .instantiate(
            resolved.graph,
            &Arrmeta::default_for(&resolved.dst_type),
            &[&Arrmeta::default_for(&src[0]), &Arrmeta::default_for(&src[1])],
            request,
        )
        .unwrap()
}

fn callable() -> FunctionCallable<fn(i32, f64) -> f64, (i32, f64)> {
    FunctionCallable::new("weighted", weighted as fn(i32, f64) -> f64)
}

#[test]
fn function_runs_per_element() {
    let callable = callable();
    let chain = build(&callable, KernelRequest::Single);
    assert_eq!(chain.record_count(), 1);

    let (count, weight) = (3i32, 0.5f64);
    let mut out = 0f64;
    unsafe {
        chain
            .single(
                (&raw mut out).cast(),
                &[(&raw const count).cast(), (&raw const weight).cast()],
            )
            .unwrap()
    };
    assert_eq!(out, 1.5);
}

#[test]
fn function_runs_strided() {
    let callable = callable();
    let chain = build(&callable, KernelRequest::Strided);

    let counts = [1i32, 2, 3, 4];
    // One weight broadcast across every element.
    let weight = 2.5f64;
    let mut out = [0f64; 4];
    unsafe {
        chain.strided(
            out.as_mut_ptr().cast(),
            8,
            &[counts.as_ptr().cast(), (&raw const weight).cast()],
            &[4, 0],
            counts.len(),
        )
    }
    .unwrap();
    assert_eq!(out, [2.5, 5.0, 7.5, 10.0]);
}

#[test]
fn closures_and_signature_checks() {
    let engine = Engine::default();
    let is_even = FunctionCallable::new("is_even", |x: u64| x % 2 == 0);
    let resolved = engine
        .resolve(&is_even, &Type::bool(), &[Type::uint64()], &Kwds::new())
        .unwrap();
    assert_eq!(resolved.dst_type, Type::bool());

    let err = engine
        .resolve(&is_even, &Type::any(), &[Type::int64()], &Kwds::new())
        .unwrap_err();
    assert!(matches!(err, Error::PatternMismatch { .. }), "{err}");

    let err = engine
        .resolve(&is_even, &Type::any(), &[Type::uint64(), Type::uint64()], &Kwds::new())
        .unwrap_err();
    assert!(matches!(err, Error::Arity { expected: 1, actual: 2, .. }), "{err}");
}
