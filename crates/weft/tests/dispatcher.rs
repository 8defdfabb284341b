//! Dispatcher ordering and selection.

use std::collections::HashSet;

use proptest::prelude::*;
use weft::{DispatchError, Dispatcher, TypeId};

const LEAVES: [TypeId; 17] = [
    TypeId::Bool,
    TypeId::Int8,
    TypeId::Int16,
    TypeId::Int32,
    TypeId::Int64,
    TypeId::UInt8,
    TypeId::UInt16,
    TypeId::UInt32,
    TypeId::UInt64,
    TypeId::Float16,
    TypeId::Float32,
    TypeId::Float64,
    TypeId::Complex64,
    TypeId::Complex128,
    TypeId::String,
    TypeId::FixedString,
    TypeId::Categorical,
];

const KINDS: [TypeId; 5] = [
    TypeId::Any,
    TypeId::Scalar,
    TypeId::IntKind,
    TypeId::FloatKind,
    TypeId::StringKind,
];

fn leaf() -> impl Strategy<Value = TypeId> {
    prop::sample::select(LEAVES.to_vec())
}

fn kind() -> impl Strategy<Value = TypeId> {
    prop::sample::select(KINDS.to_vec())
}

proptest! {
    #[test]
    fn exact_match_returns_the_inserted_value(
        exact in prop::collection::hash_set(prop::collection::vec(leaf(), 2), 1..24),
        general in prop::collection::vec(prop::collection::vec(kind(), 2), 0..6),
    ) {
        let mut d = Dispatcher::new(8);
        let mut inserted = HashSet::new();
        for params in &general {
            if inserted.insert(params.clone()) {
                d.insert(params.clone(), usize::MAX).unwrap();
            }
        }
        let exact: Vec<Vec<TypeId>> = exact.into_iter().collect();
        for (i, params) in exact.iter().enumerate() {
            d.insert(params.clone(), i).unwrap();
        }
        // Twice, so the second pass is served from the cache.
        for _ in 0..2 {
            for (i, params) in exact.iter().enumerate() {
                prop_assert_eq!(d.resolve(params), Ok(&i));
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(args in prop::collection::vec(leaf(), 2)) {
        let mut d = Dispatcher::new(0);
        d.insert([TypeId::Scalar, TypeId::Any], "left").unwrap();
        d.insert([TypeId::Any, TypeId::Scalar], "right").unwrap();
        d.insert([TypeId::Any, TypeId::Any], "any").unwrap();
        let first = d.resolve(&args).copied();
        prop_assert_eq!(d.resolve(&args).copied(), first.clone());
        prop_assert_eq!(first, Ok("left"));
    }
}

#[test]
fn incomparable_overloads_keep_insertion_order() {
    let mut d = Dispatcher::new(16);
    d.insert([TypeId::Option, TypeId::Any], "option-dst").unwrap();
    d.insert([TypeId::Any, TypeId::Option], "option-src").unwrap();
    assert_eq!(d.resolve(&[TypeId::Option, TypeId::Option]), Ok(&"option-dst"));

    let mut d = Dispatcher::new(16);
    d.insert([TypeId::Any, TypeId::Option], "option-src").unwrap();
    d.insert([TypeId::Option, TypeId::Any], "option-dst").unwrap();
    assert_eq!(d.resolve(&[TypeId::Option, TypeId::Option]), Ok(&"option-src"));

    d.insert([TypeId::Option, TypeId::Option], "both").unwrap();
    assert_eq!(d.resolve(&[TypeId::Option, TypeId::Option]), Ok(&"both"));
    let order: Vec<_> = d.overloads().iter().map(|(_, v)| *v).collect();
    assert_eq!(order, ["both", "option-src", "option-dst"]);
}

#[test]
fn cyclic_matcher_is_rejected() {
    fn rock_paper_scissors(param: TypeId, arg: TypeId) -> bool {
        param == arg
            || matches!(
                (param, arg),
                (TypeId::Int8, TypeId::Int16) | (TypeId::Int16, TypeId::Int32) | (TypeId::Int32, TypeId::Int8)
            )
    }

    let mut d = Dispatcher::new(16).with_matcher(rock_paper_scissors);
    d.insert([TypeId::Int8], 8).unwrap();
    d.insert([TypeId::Int16], 16).unwrap();
    let err = d.insert([TypeId::Int32], 32).unwrap_err();
    let DispatchError::NotWellFounded { involved } = &err else {
        panic!("expected NotWellFounded, got {err:?}");
    };
    assert_eq!(involved.len(), 3);

    // The failed insert is rolled back.
    assert_eq!(d.overloads().len(), 2);
    assert_eq!(d.resolve(&[TypeId::Int16]), Ok(&16));
    // The custom matcher lets an `Int16` parameter accept `Int32`.
    assert_eq!(d.resolve(&[TypeId::Int32]), Ok(&16));
    assert_eq!(
        d.resolve(&[TypeId::Int64]),
        Err(DispatchError::NoApplicableOverload {
            args: vec![TypeId::Int64]
        })
    );
}
