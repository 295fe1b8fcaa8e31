use std::collections::{BTreeMap, BTreeSet, HashSet};

use anyhow::{anyhow, Result};
use pakt_core::PackageManifest;

/// Orders `selected` so every package follows the packages it depends on.
/// Among packages that are ready at the same time the name decides, which
/// keeps the order stable across runs.
pub fn order_packages(
    selected: &BTreeMap<String, PackageManifest>,
) -> Result<Vec<PackageManifest>> {
    let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for (name, manifest) in selected {
        let edges = manifest
            .dependencies
            .keys()
            .filter(|dep| selected.contains_key(*dep) && *dep != name)
            .collect::<BTreeSet<_>>();
        pending.insert(name.as_str(), edges.len());
        for dep in edges {
            dependents
                .entry(dep.as_str())
                .or_default()
                .insert(name.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter_map(|(name, count)| (*count == 0).then_some(*name))
        .collect();
    let mut ordered = Vec::with_capacity(selected.len());

    while let Some(next) = ready.pop_first() {
        if let Some(manifest) = selected.get(next) {
            ordered.push(manifest.clone());
        }
        let Some(children) = dependents.get(next) else {
            continue;
        };
        for child in children {
            if let Some(count) = pending.get_mut(child) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.insert(*child);
                }
            }
        }
    }

    if ordered.len() != selected.len() {
        let placed: HashSet<&str> = ordered.iter().map(|m| m.name.as_str()).collect();
        let cycle = selected
            .keys()
            .filter(|name| !placed.contains(name.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "dependency cycle detected involving: {}",
            cycle.join(", ")
        ));
    }

    Ok(ordered)
}
