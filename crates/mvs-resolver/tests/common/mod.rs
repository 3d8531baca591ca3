#![allow(dead_code)]

use std::sync::Arc;

use mvs_core::order::SemverOrder;
use mvs_core::table::RequirementTable;
use mvs_core::{ModuleVersion, Pruning, VersionOrder};
use mvs_resolver::{Requirements, Resolver};

pub fn mv(s: &str) -> ModuleVersion {
    ModuleVersion::parse(s).unwrap()
}

pub fn mvs(list: &[&str]) -> Vec<ModuleVersion> {
    list.iter().map(|s| mv(s)).collect()
}

pub fn order() -> Arc<dyn VersionOrder> {
    Arc::new(SemverOrder)
}

pub fn table(doc: &str) -> Arc<RequirementTable> {
    Arc::new(RequirementTable::from_toml_str(doc, order()).unwrap())
}

pub fn resolver(table: &Arc<RequirementTable>) -> Resolver {
    Resolver::new(table.clone(), order())
}

/// A snapshot whose main module is `main` and whose roots are what the
/// table says `main` requires.
pub fn snapshot(table: &RequirementTable, main: &str) -> Requirements {
    let main = mv(main);
    let roots = table
        .modules()
        .find(|(m, _)| **m == main)
        .map(|(_, reqs)| reqs.to_vec())
        .unwrap_or_default();
    let direct: Vec<String> = roots.iter().map(|m| m.path.clone()).collect();
    Requirements::new(Pruning::Unpruned, order(), vec![main], roots, direct)
}

/// Graph B: A requires B@1 and C@1, B@1 requires C@2.
pub const GRAPH_B: &str = r#"
target = "A@1"
[modules]
"A@1" = ["B@1", "C@1"]
"B@1" = ["C@2"]
"B@2" = []
"C@1" = []
"C@2" = []
"#;
