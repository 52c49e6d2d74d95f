//! Deploy-order derivation from constructor references.
//!
//! Every `ref` argument contributes an edge "referenced component must
//! be deployed first". The resulting order is a pure function of the
//! descriptor set: ties are broken by declaration order, so repeated
//! runs of an unchanged manifest always produce the same sequence.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::error::ConfigError;
use crate::manifest::Manifest;

/// Compute the deployment order for the manifest's components.
///
/// Fails with [`ConfigError::Cycle`] naming every component that sits
/// on a reference cycle. A cycle is a descriptor bug, never retried.
pub fn deploy_order(manifest: &Manifest) -> Result<Vec<String>, ConfigError> {
    let index: BTreeMap<&str, usize> = manifest
        .components
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();

    let n = manifest.components.len();
    // dependents[d] = components whose constructors reference d
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree: Vec<usize> = vec![0; n];

    for (i, descriptor) in manifest.components.iter().enumerate() {
        let mut seen = std::collections::BTreeSet::new();
        for reference in descriptor.refs() {
            // A constructor may reference the same component twice;
            // that is still a single graph edge.
            if !seen.insert(reference) {
                continue;
            }
            let dep = *index.get(reference).ok_or_else(|| {
                ConfigError::DanglingReference {
                    component: descriptor.name.clone(),
                    reference: reference.to_string(),
                }
            })?;
            dependents[dep].push(i);
            indegree[i] += 1;
        }
    }

    // Kahn's algorithm; the min-heap keeps declaration order among the
    // components that are simultaneously ready.
    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(i)) = ready.pop() {
        order.push(manifest.components[i].name.clone());
        for &dependent in &dependents[i] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() < n {
        return Err(ConfigError::Cycle {
            participants: cycle_participants(manifest, &dependents, &indegree),
        });
    }

    Ok(order)
}

/// Narrow the leftover nodes of an aborted topological sort down to
/// the actual cycle members. Components that are merely blocked behind
/// a cycle (they depend on it but are not part of it) are pruned by
/// repeatedly discarding leftover nodes with no outgoing edge into the
/// leftover set.
fn cycle_participants(
    manifest: &Manifest,
    dependents: &[Vec<usize>],
    indegree: &[usize],
) -> Vec<String> {
    let mut leftover: std::collections::BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d > 0)
        .map(|(i, _)| i)
        .collect();

    loop {
        let prunable: Vec<usize> = leftover
            .iter()
            .copied()
            .filter(|&i| !dependents[i].iter().any(|d| leftover.contains(d)))
            .collect();
        if prunable.is_empty() {
            break;
        }
        for i in prunable {
            leftover.remove(&i);
        }
    }

    leftover
        .into_iter()
        .map(|i| manifest.components[i].name.clone())
        .collect()
}
