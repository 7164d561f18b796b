//! Merged values of extensible and composite contributions.
//!
//! Merges read registered values out of the dependency graph and only ever
//! write to fresh clones, so recomputing a merge without structural changes
//! always yields the same value.

use std::collections::HashSet;

use contrib_graph::DependencyGraph;

use crate::contribution::{Contribution, ContributionKind};
use crate::error::{Error, Result};
use crate::fragment::FragmentRegistry;

/// Graph type used by contribution managers.
pub type ContributionGraph<C> = DependencyGraph<String, C>;

/// Compute the value that gets installed for `id`.
///
/// - simple contributions: a clone of the registered value
/// - extensible contributions: the base chain merged root-first
/// - composite contributions: the composite root with all enabled fragments
///   applied (for a fragment, that is the merged value of its root)
pub fn merged<C: Contribution>(
    graph: &ContributionGraph<C>,
    fragments: &FragmentRegistry,
    id: &str,
) -> Result<C> {
    let contribution = lookup(graph, id)?;
    match contribution.kind() {
        ContributionKind::Simple => Ok(contribution.clone()),
        ContributionKind::Extensible => merge_extensible(graph, fragments, id),
        ContributionKind::Composite => {
            let root = root_of(graph, id)?;
            merge_composite(graph, fragments, &root)
        }
    }
}

/// Merge `id` over its base chain.
///
/// The merge starts from the nearest composite ancestor's merged value
/// (fragments included) or, without one, from a clone of the chain's root.
/// Every contribution below that point down to `id` then copies its own
/// fields over the accumulated value. Identity is re-stamped to `id` at the
/// end.
pub fn merge_extensible<C: Contribution>(
    graph: &ContributionGraph<C>,
    fragments: &FragmentRegistry,
    id: &str,
) -> Result<C> {
    let chain = base_chain(graph, id)?;
    let composite_ancestor = chain
        .iter()
        .skip(1)
        .position(|c| c.kind() == ContributionKind::Composite)
        .map(|i| i + 1);

    let (mut merged, overrides) = match composite_ancestor {
        Some(i) => (self::merged(graph, fragments, chain[i].id())?, &chain[..i]),
        None => match chain.split_last() {
            Some((root, overrides)) => ((*root).clone(), overrides),
            None => return Err(Error::NotRegistered { id: id.to_string() }),
        },
    };
    for contribution in overrides.iter().rev() {
        contribution.copy_over(&mut merged);
    }

    let this = chain[0];
    merged.set_identity(this.id(), this.base_id());
    Ok(merged)
}

/// Merge a composite root with its enabled fragments.
///
/// Fragments are applied in registration order; each fragment's own
/// fragments are applied right after it, depth-first.
pub fn merge_composite<C: Contribution>(
    graph: &ContributionGraph<C>,
    fragments: &FragmentRegistry,
    root: &str,
) -> Result<C> {
    let root_contribution = lookup(graph, root)?;
    let mut merged = merge_extensible(graph, fragments, root)?;
    let mut applied = vec![root.to_string()];
    apply_fragments(graph, fragments, root, &mut merged, &mut applied)?;
    merged.set_identity(root_contribution.id(), root_contribution.base_id());
    Ok(merged)
}

fn apply_fragments<C: Contribution>(
    graph: &ContributionGraph<C>,
    fragments: &FragmentRegistry,
    parent: &str,
    merged: &mut C,
    applied: &mut Vec<String>,
) -> Result<()> {
    for fragment in fragments.children(parent) {
        if !fragment.is_enabled() {
            continue;
        }
        if applied.contains(&fragment.id) {
            let mut chain = applied.clone();
            chain.push(fragment.id.clone());
            return Err(Error::CyclicBase {
                id: fragment.id.clone(),
                chain,
            });
        }
        lookup(graph, &fragment.id)?.copy_over(merged);
        applied.push(fragment.id.clone());
        apply_fragments(graph, fragments, &fragment.id, merged, applied)?;
    }
    Ok(())
}

/// The composite root `id` belongs to.
///
/// Walks base ids up from `id` while the base is itself composite. A
/// composite whose base is not composite (or that has no base) is a root.
pub fn root_of<C: Contribution>(graph: &ContributionGraph<C>, id: &str) -> Result<String> {
    let chain = base_chain(graph, id)?;
    let mut root = chain[0];
    for ancestor in &chain[1..] {
        if ancestor.kind() != ContributionKind::Composite {
            break;
        }
        root = ancestor;
    }
    Ok(root.id().to_string())
}

/// The base `id` attaches to as a fragment: set only when both `id` and its
/// registered base are composite.
pub fn fragment_parent<'g, C: Contribution>(
    graph: &'g ContributionGraph<C>,
    contribution: &'g C,
) -> Option<&'g str> {
    if contribution.kind() != ContributionKind::Composite {
        return None;
    }
    let base = contribution.base_id()?;
    graph
        .get(base)
        .filter(|b| b.kind() == ContributionKind::Composite)
        .map(|_| base)
}

/// Whether `ancestor` appears above `id` in its base chain.
pub fn inherits_from<C: Contribution>(graph: &ContributionGraph<C>, id: &str, ancestor: &str) -> bool {
    base_chain(graph, id)
        .map(|chain| chain.iter().skip(1).any(|c| c.id() == ancestor))
        .unwrap_or(false)
}

/// `id` followed by its base, its base's base, and so on.
fn base_chain<'g, C: Contribution>(graph: &'g ContributionGraph<C>, id: &str) -> Result<Vec<&'g C>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = lookup(graph, id)?;

    loop {
        if !seen.insert(current.id()) {
            let mut ids: Vec<String> = chain.iter().map(|c: &&C| c.id().to_string()).collect();
            ids.push(current.id().to_string());
            return Err(Error::CyclicBase {
                id: id.to_string(),
                chain: ids,
            });
        }
        chain.push(current);
        match current.base_id() {
            Some(base) => {
                current = graph.get(base).ok_or_else(|| Error::MissingBase {
                    id: current.id().to_string(),
                    base: base.to_string(),
                })?;
            }
            None => return Ok(chain),
        }
    }
}

fn lookup<'g, C: Contribution>(graph: &'g ContributionGraph<C>, id: &str) -> Result<&'g C> {
    graph
        .get(id)
        .ok_or_else(|| Error::NotRegistered { id: id.to_string() })
}
