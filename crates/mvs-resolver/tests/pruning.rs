mod common;

use common::*;
use mvs_core::{ModuleVersion, Pruning};
use mvs_resolver::Requirements;
use pretty_assertions::assert_eq;

const LAYERED: &str = r#"
pruned = ["A@1"]
[modules]
"A@1" = ["B@1"]
"B@1" = ["C@1"]
"C@1" = []
"D@1" = ["E@1"]
"E@1" = ["F@1"]
"F@1" = []
"#;

fn main_module() -> ModuleVersion {
    ModuleVersion::new("example.com/main", "")
}

fn requirements(pruning: Pruning) -> Requirements {
    Requirements::new(
        pruning,
        order(),
        vec![main_module()],
        mvs(&["A@1", "D@1"]),
        ["A".to_string(), "D".to_string()],
    )
}

#[tokio::test]
async fn pruned_module_requirements_are_not_expanded() {
    let t = table(LAYERED);
    let r = resolver(&t);
    let rs = requirements(Pruning::Pruned);

    let list = rs.build_list(&r).await.unwrap();
    assert_eq!(
        list,
        vec![main_module(), mv("A@1"), mv("B@1"), mv("D@1"), mv("E@1"), mv("F@1")]
    );
    // A@1 prunes: B@1 is recorded but never loaded.
    assert_eq!(t.fetch_count(&mv("B@1")), 0);
    assert_eq!(t.fetch_count(&mv("F@1")), 1);
}

#[tokio::test]
async fn unpruned_loads_everything() {
    let t = table(LAYERED);
    let r = resolver(&t);
    let rs = requirements(Pruning::Unpruned);

    let list = rs.build_list(&r).await.unwrap();
    assert_eq!(
        list,
        vec![main_module(), mv("A@1"), mv("B@1"), mv("C@1"), mv("D@1"), mv("E@1"), mv("F@1")]
    );
}

#[tokio::test]
async fn workspace_main_modules_all_dominate() {
    let t = table(
        r#"
        [modules]
        "A@1" = ["ws/two@5"]
        "ws/two@5" = []
        "B@1" = []
        "#,
    );
    let r = resolver(&t);
    let one = ModuleVersion::new("ws/one", "");
    let two = ModuleVersion::new("ws/two", "");
    let rs = Requirements::new(
        Pruning::Workspace,
        order(),
        vec![one.clone(), two.clone()],
        mvs(&["B@1", "A@1"]),
        Vec::new(),
    );

    let graph = rs.graph(&r).await.unwrap();
    assert_eq!(graph.selected("ws/two"), "");
    assert_eq!(graph.build_list(), &[one.clone(), two.clone(), mv("A@1"), mv("B@1")][..]);
    assert_eq!(graph.required_by(&one), Some(mvs(&["A@1", "B@1"])));
    assert_eq!(graph.required_by(&two), Some(mvs(&["A@1", "B@1"])));
    assert_eq!(rs.root_selected("ws/one"), Some(""));
    assert_eq!(rs.lock_summary().pruning, Pruning::Workspace);
}

#[tokio::test]
async fn tree_rendering_follows_requirements() {
    let t = table(LAYERED);
    let r = resolver(&t);
    let graph = requirements(Pruning::Pruned).graph(&r).await.unwrap();
    assert_eq!(
        graph.print_tree(None),
        "example.com/main\n├── A@1\n│   └── B@1\n└── D@1\n    └── E@1\n        └── F@1\n"
    );
}
