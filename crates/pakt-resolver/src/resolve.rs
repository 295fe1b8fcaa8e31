use std::collections::{BTreeMap, HashMap, VecDeque};

use anyhow::Result;
use pakt_core::PackageManifest;
use semver::{Version, VersionReq};
use tracing::debug;

use crate::order::order_packages;
use crate::types::{MissingDependency, ResolveError, ResolvedPlan};

pub fn select_highest_compatible<'a>(
    candidates: &'a [PackageManifest],
    requirement: &VersionReq,
) -> Option<&'a PackageManifest> {
    candidates
        .iter()
        .filter(|m| requirement.matches(&m.version))
        .max_by(|a, b| a.version.cmp(&b.version))
}

/// Newest candidate strictly greater than `installed`, if any.
pub fn newer_version<'a>(
    installed: &Version,
    candidates: &'a [PackageManifest],
) -> Option<&'a PackageManifest> {
    candidates
        .iter()
        .filter(|m| m.version > *installed)
        .max_by(|a, b| a.version.cmp(&b.version))
}

/// Resolves `root` at its newest version plus every dependency that is not
/// installed yet. An installed dependency at a version outside the
/// requirement is reported as missing.
pub fn resolve_install<F>(
    root: &str,
    installed: &BTreeMap<String, Version>,
    mut load_versions: F,
) -> Result<ResolvedPlan, ResolveError>
where
    F: FnMut(&str) -> Result<Vec<PackageManifest>>,
{
    let candidates = load_versions(root)?;
    let Some(root_manifest) = select_highest_compatible(&candidates, &VersionReq::STAR) else {
        return Err(ResolveError::NotFound(root.to_string()));
    };

    let mut selected = BTreeMap::new();
    selected.insert(root.to_string(), root_manifest.clone());
    let missing = close_over_dependencies(
        &mut selected,
        vec![root_manifest.clone()],
        installed,
        &mut load_versions,
    )?;
    let ordered = order_packages(&selected)?;

    debug!(
        root,
        packages = ordered.len(),
        missing = missing.len(),
        "resolved install plan"
    );
    Ok(ResolvedPlan {
        origin: Some(root.to_string()),
        ordered,
        missing,
    })
}

/// Orders a set of package updates together with any dependency the new
/// versions need that is not installed yet. Installed dependencies outside
/// the update set must already satisfy their requirement.
pub fn resolve_updates<F>(
    updates: Vec<PackageManifest>,
    installed: &BTreeMap<String, Version>,
    mut load_versions: F,
) -> Result<ResolvedPlan, ResolveError>
where
    F: FnMut(&str) -> Result<Vec<PackageManifest>>,
{
    let mut selected = BTreeMap::new();
    for manifest in &updates {
        selected.insert(manifest.name.clone(), manifest.clone());
    }
    let missing = close_over_dependencies(&mut selected, updates, installed, &mut load_versions)?;
    let ordered = order_packages(&selected)?;

    Ok(ResolvedPlan {
        origin: None,
        ordered,
        missing,
    })
}

fn close_over_dependencies<F>(
    selected: &mut BTreeMap<String, PackageManifest>,
    seeds: Vec<PackageManifest>,
    installed: &BTreeMap<String, Version>,
    load_versions: &mut F,
) -> Result<Vec<MissingDependency>>
where
    F: FnMut(&str) -> Result<Vec<PackageManifest>>,
{
    let mut queue: VecDeque<PackageManifest> = seeds.into();
    let mut versions_cache: HashMap<String, Vec<PackageManifest>> = HashMap::new();
    let mut missing: Vec<MissingDependency> = Vec::new();

    while let Some(manifest) = queue.pop_front() {
        for (dep_name, requirement) in &manifest.dependencies {
            if let Some(chosen) = selected.get(dep_name) {
                if !requirement.matches(&chosen.version) {
                    push_missing(&mut missing, dep_name, requirement);
                }
                continue;
            }

            // An installed dependency is never replaced implicitly.
            if let Some(version) = installed.get(dep_name) {
                if !requirement.matches(version) {
                    debug!(
                        package = dep_name.as_str(),
                        installed = %version,
                        %requirement,
                        "installed version does not satisfy requirement"
                    );
                    push_missing(&mut missing, dep_name, requirement);
                }
                continue;
            }

            if !versions_cache.contains_key(dep_name) {
                let versions = load_versions(dep_name)?;
                versions_cache.insert(dep_name.clone(), versions);
            }
            let candidates = versions_cache
                .get(dep_name)
                .map(Vec::as_slice)
                .unwrap_or_default();

            match select_highest_compatible(candidates, requirement) {
                Some(found) => {
                    selected.insert(dep_name.clone(), found.clone());
                    queue.push_back(found.clone());
                }
                None => push_missing(&mut missing, dep_name, requirement),
            }
        }
    }

    Ok(missing)
}

fn push_missing(missing: &mut Vec<MissingDependency>, name: &str, requirement: &VersionReq) {
    if missing
        .iter()
        .any(|entry| entry.name == name && entry.requirement == *requirement)
    {
        return;
    }
    missing.push(MissingDependency {
        name: name.to_string(),
        requirement: requirement.clone(),
    });
}
