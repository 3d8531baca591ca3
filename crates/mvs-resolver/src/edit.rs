//! Editing a requirement snapshot: add requirements and pin versions.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use mvs_core::ModuleVersion;

use crate::conflict::{Conflict, ConstraintError};
use crate::error::ResolveError;
use crate::requirements::Requirements;
use crate::resolver::Resolver;

/// A successful edit.
pub struct EditOutcome {
    pub requirements: Requirements,
    /// Whether the build list differs from the one before the edit,
    /// including modules added or removed.
    pub changed: bool,
}

/// Drop unversioned leading modules (main modules without a version) from
/// a chain.
fn trim_chain(path: Vec<ModuleVersion>) -> Vec<ModuleVersion> {
    let skip = path.iter().take_while(|m| m.version.is_empty()).count();
    if skip == path.len() {
        return path;
    }
    path.into_iter().skip(skip).collect()
}

/// Apply `add` and `pins` to `rs`, returning a new snapshot in which every
/// pinned module is selected at exactly its pinned version (or absent, for
/// a `"none"` pin).
///
/// Pins replace any root of the same path. Added modules merge with the
/// existing roots by taking the higher version; an added module above a pin
/// for its path is a conflict. Nothing else is moved: when a root that is
/// not pinned pulls a pinned path above its pin, the chain proving it is
/// reported. `rs` is never modified; on conflict no snapshot is produced.
pub async fn edit_build_list(
    resolver: &Resolver,
    rs: &Requirements,
    add: &[ModuleVersion],
    pins: &[ModuleVersion],
) -> Result<EditOutcome, ResolveError> {
    let order = rs.order().clone();
    let greater = |m: &ModuleVersion, than: &str| {
        order.cmp_versions(&m.path, &m.version, than) == Ordering::Greater
    };
    let mut conflicts: Vec<Conflict> = Vec::new();

    let mut pinned: BTreeMap<String, ModuleVersion> = BTreeMap::new();
    for pin in pins {
        match pinned.get(&pin.path) {
            Some(prev) if prev != pin => {
                let (high, low) = if greater(pin, &prev.version) {
                    (pin.clone(), prev.clone())
                } else {
                    (prev.clone(), pin.clone())
                };
                conflicts.push(Conflict::constraint(vec![high], low));
            }
            Some(_) => {}
            None => {
                pinned.insert(pin.path.clone(), pin.clone());
            }
        }
    }
    for main in rs.main_modules() {
        if let Some(pin) = pinned.get(&main.path) {
            if pin.version != main.version {
                conflicts.push(Conflict::main_module(main.clone(), pin.clone()));
            }
        }
    }

    let mut roots: BTreeMap<String, ModuleVersion> = BTreeMap::new();
    let keep = |roots: &mut BTreeMap<String, ModuleVersion>, m: &ModuleVersion| {
        let higher = match roots.get(&m.path) {
            Some(cur) => greater(m, &cur.version),
            None => true,
        };
        if higher {
            roots.insert(m.path.clone(), m.clone());
        }
    };
    for m in rs.root_modules() {
        if !pinned.contains_key(&m.path) {
            keep(&mut roots, m);
        }
    }
    for m in add {
        if rs.is_main(&m.path) || m.is_none() {
            continue;
        }
        match pinned.get(&m.path) {
            Some(pin) if greater(m, &pin.version) => {
                conflicts.push(Conflict::constraint(vec![m.clone()], pin.clone()));
            }
            Some(_) => {}
            None => keep(&mut roots, m),
        }
    }
    for pin in pinned.values() {
        if !pin.is_none() && !rs.is_main(&pin.path) {
            roots.insert(pin.path.clone(), pin.clone());
        }
    }
    if !conflicts.is_empty() {
        return Err(ConstraintError { conflicts }.into());
    }

    let mut direct: BTreeSet<String> = rs.direct_paths().map(str::to_string).collect();
    direct.extend(
        add.iter()
            .chain(pinned.values())
            .filter(|m| !m.is_none())
            .map(|m| m.path.clone()),
    );
    for pin in pinned.values().filter(|p| p.is_none()) {
        direct.remove(&pin.path);
    }
    direct.retain(|p| !rs.is_main(p));

    let next = rs.with_roots(roots.into_values().collect(), direct);
    let graph = next.graph_best_effort(resolver).await?;

    if let Some(err) = graph.error() {
        let path = err.path();
        if path.iter().any(|m| pinned.get(&m.path) == Some(m)) {
            conflicts.push(Conflict::error(trim_chain(path), err.err().clone()));
        } else {
            return Err(err.clone().into());
        }
    }

    for pin in pinned.values() {
        if rs.is_main(&pin.path) {
            continue;
        }
        let selected = graph.selected(&pin.path);
        let path = if pin.is_none() {
            if selected == mvs_core::NONE {
                continue;
            }
            graph.find_path(|m| m.path == pin.path && !m.is_none())
        } else {
            if !greater(&ModuleVersion::new(pin.path.clone(), selected), &pin.version) {
                continue;
            }
            graph.find_path(|m| m.path == pin.path && greater(m, &pin.version))
        };
        let path = path.unwrap_or_else(|| vec![ModuleVersion::new(pin.path.clone(), selected)]);
        if let Some(blocker) = path.last() {
            tracing::debug!("{pin} cannot be selected: {blocker} is");
        }
        conflicts.push(Conflict::constraint(trim_chain(path), pin.clone()));
    }
    if !conflicts.is_empty() {
        return Err(ConstraintError { conflicts }.into());
    }

    let before = rs.graph_best_effort(resolver).await?;
    let changed = before.build_list() != graph.build_list();
    tracing::info!(
        "Edited requirements: {} roots, build list {}",
        next.root_modules().len(),
        if changed { "changed" } else { "unchanged" }
    );
    Ok(EditOutcome {
        requirements: next,
        changed,
    })
}

impl Requirements {
    /// See [`edit_build_list`].
    pub async fn edit(
        &self,
        resolver: &Resolver,
        add: &[ModuleVersion],
        pins: &[ModuleVersion],
    ) -> Result<EditOutcome, ResolveError> {
        edit_build_list(resolver, self, add, pins).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_unversioned_prefix() {
        let path = vec![
            ModuleVersion::new("main", ""),
            ModuleVersion::new("b", "1"),
        ];
        assert_eq!(trim_chain(path), vec![ModuleVersion::new("b", "1")]);
        let only_main = vec![ModuleVersion::new("main", "")];
        assert_eq!(trim_chain(only_main.clone()), only_main);
    }
}
