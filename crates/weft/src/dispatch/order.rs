//! Specificity ordering of overloads.

use std::collections::BTreeSet;

use weft_types::TypeId;

use crate::error::DispatchError;

/// Decides whether an argument id is accepted by a parameter id.
pub type Matcher = fn(param: TypeId, arg: TypeId) -> bool;

/// Default matcher: the parameter is the argument or one of its kinds.
pub fn is_base(param: TypeId, arg: TypeId) -> bool {
    param.is_base_id_of(arg)
}

/// Whether `a` is at least as specific as `b`.
pub fn supersedes(matcher: Matcher, a: &[TypeId], b: &[TypeId]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&a, &b)| matcher(b, a))
}

/// Whether every argument is accepted by the matching parameter.
pub fn entails(matcher: Matcher, params: &[TypeId], args: &[TypeId]) -> bool {
    params.len() == args.len() && params.iter().zip(args).all(|(&p, &a)| matcher(p, a))
}

/// Orders parameter lists most specific first using Kahn's algorithm.
///
/// `seq[i]` is the insertion sequence of `params[i]`; among entries that
/// are ready at the same time the earliest inserted comes first, so
/// incomparable overloads keep their insertion order.
pub(super) fn specificity_order(
    matcher: Matcher,
    params: &[&[TypeId]],
    seq: &[u64],
) -> Result<Vec<usize>, DispatchError> {
    let n = params.len();
    let mut in_degree = vec![0usize; n];
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    for u in 0..n {
        for v in 0..n {
            if u != v
                && supersedes(matcher, params[u], params[v])
                && !supersedes(matcher, params[v], params[u])
            {
                edges[u].push(v);
                in_degree[v] += 1;
            }
        }
    }

    let mut ready: BTreeSet<(u64, usize)> = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .map(|i| (seq[i], i))
        .collect();
    let mut order = Vec::with_capacity(n);
    while let Some((_, u)) = ready.pop_first() {
        order.push(u);
        for &v in &edges[u] {
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                ready.insert((seq[v], v));
            }
        }
    }

    if order.len() != n {
        let involved = (0..n)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| params[i].to_vec())
            .collect();
        return Err(DispatchError::NotWellFounded { involved });
    }
    Ok(order)
}
