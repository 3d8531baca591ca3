//! The incremental requirement graph.
//!
//! Nodes are interned module versions stored in a petgraph arena; an edge
//! `m -> r` records that `m` directly requires `r`. Edge weights hold the
//! position of `r` in `m`'s requirement list so the declared order survives.
//! Alongside the edges the graph keeps the running per-path maximum over
//! every module version it has ever seen.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write as _;
use std::sync::Arc;

use mvs_core::{ModuleVersion, VersionOrder, NONE};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Push-style requirement graph with a running per-path selection.
///
/// Roots are dominant: the version of a root always stays selected for its
/// path, whatever other versions of that path are required.
pub struct RequirementGraph {
    order: Arc<dyn VersionOrder>,
    roots: Vec<ModuleVersion>,
    graph: DiGraph<ModuleVersion, usize>,
    index: HashMap<ModuleVersion, NodeIndex>,
    registered: HashSet<NodeIndex>,
    is_root: HashSet<ModuleVersion>,
    dominant: HashMap<String, String>,
    selected: HashMap<String, String>,
}

impl RequirementGraph {
    /// Create a graph over `roots`, which are marked and selected up front.
    pub fn new(order: Arc<dyn VersionOrder>, roots: Vec<ModuleVersion>) -> Self {
        let mut graph = Self {
            order,
            roots: Vec::with_capacity(roots.len()),
            graph: DiGraph::new(),
            index: HashMap::new(),
            registered: HashSet::new(),
            is_root: HashSet::new(),
            dominant: HashMap::new(),
            selected: HashMap::new(),
        };
        for root in &roots {
            graph.intern(root);
            graph.is_root.insert(root.clone());
            let v = match graph.dominant.get(&root.path) {
                Some(prev) => graph.order.max_version(&root.path, prev, &root.version).to_string(),
                None => root.version.clone(),
            };
            graph.dominant.insert(root.path.clone(), v.clone());
            graph.selected.insert(root.path.clone(), v);
        }
        graph.roots = roots;
        graph
    }

    fn intern(&mut self, m: &ModuleVersion) -> NodeIndex {
        if let Some(&idx) = self.index.get(m) {
            return idx;
        }
        let idx = self.graph.add_node(m.clone());
        self.index.insert(m.clone(), idx);
        idx
    }

    fn fold_selected(&mut self, m: &ModuleVersion) {
        if self.dominant.contains_key(&m.path) {
            return;
        }
        let next = match self.selected.get(&m.path) {
            Some(cur) => {
                if self.order.cmp_versions(&m.path, &m.version, cur) != Ordering::Greater {
                    return;
                }
                m.version.clone()
            }
            None => m.version.clone(),
        };
        self.selected.insert(m.path.clone(), next);
    }

    /// Record that `m` directly requires `reqs`, in that order.
    ///
    /// # Panics
    ///
    /// If `m` is not reachable (neither a root nor a requirement of a
    /// registered module) or was already registered.
    pub fn require(&mut self, m: &ModuleVersion, reqs: &[ModuleVersion]) {
        let Some(&from) = self.index.get(m) else {
            panic!("requirement graph: {m} registered before it is reachable");
        };
        if !self.registered.insert(from) {
            panic!("requirement graph: {m} registered twice");
        }
        for (pos, r) in reqs.iter().enumerate() {
            let to = self.intern(r);
            self.graph.add_edge(from, to, pos);
            self.fold_selected(r);
        }
    }

    /// The direct requirements of `m`, or `None` if `m` is not registered.
    pub fn required_by(&self, m: &ModuleVersion) -> Option<Vec<ModuleVersion>> {
        let idx = *self.index.get(m)?;
        if !self.registered.contains(&idx) {
            return None;
        }
        Some(
            self.children(idx)
                .into_iter()
                .map(|c| self.graph[c].clone())
                .collect(),
        )
    }

    fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(usize, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (*e.weight(), e.target()))
            .collect();
        edges.sort_unstable_by_key(|(pos, _)| *pos);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// The version selected for `path`, or `"none"` if it was never seen.
    pub fn selected(&self, path: &str) -> &str {
        self.selected.get(path).map(String::as_str).unwrap_or(NONE)
    }

    pub fn roots(&self) -> &[ModuleVersion] {
        &self.roots
    }

    pub fn is_root(&self, m: &ModuleVersion) -> bool {
        self.is_root.contains(m)
    }

    pub fn is_registered(&self, m: &ModuleVersion) -> bool {
        self.index
            .get(m)
            .is_some_and(|idx| self.registered.contains(idx))
    }

    /// Number of distinct module versions seen so far.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn order(&self) -> &Arc<dyn VersionOrder> {
        &self.order
    }

    /// Roots first, in root order, then one entry per other path with a
    /// selection other than `"none"`, sorted by path.
    pub fn build_list(&self) -> Vec<ModuleVersion> {
        let mut list: Vec<ModuleVersion> = Vec::with_capacity(self.selected.len());
        let mut seen: HashSet<&str> = HashSet::new();
        for root in &self.roots {
            if seen.insert(root.path.as_str()) {
                list.push(ModuleVersion::new(root.path.clone(), self.selected(&root.path)));
            }
        }
        let mut rest: Vec<(&String, &String)> = self
            .selected
            .iter()
            .filter(|(path, version)| !seen.contains(path.as_str()) && version.as_str() != NONE)
            .collect();
        rest.sort_unstable_by(|a, b| a.0.cmp(b.0));
        list.extend(rest.into_iter().map(|(p, v)| ModuleVersion::new(p.clone(), v.clone())));
        list
    }

    /// Call `f` once for every module version in the graph (roots and every
    /// requirement, selected or not), breadth first from the roots.
    /// `"none"` versions are skipped.
    pub fn walk_breadth_first(&self, mut f: impl FnMut(&ModuleVersion)) {
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        for root in &self.roots {
            if let Some(&idx) = self.index.get(root) {
                if seen.insert(idx) {
                    queue.push_back(idx);
                }
            }
        }
        while let Some(idx) = queue.pop_front() {
            let m = &self.graph[idx];
            if m.is_none() {
                continue;
            }
            f(m);
            for child in self.children(idx) {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
    }

    /// The shortest requirement chain from a root to the first module
    /// matching `pred`, root first.
    ///
    /// Breadth first from the roots in root order, children in declaration
    /// order; the first match wins.
    pub fn find_path(&self, pred: impl Fn(&ModuleVersion) -> bool) -> Option<Vec<ModuleVersion>> {
        let mut parent: HashMap<NodeIndex, Option<NodeIndex>> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        for root in &self.roots {
            if let Some(&idx) = self.index.get(root) {
                if !parent.contains_key(&idx) {
                    parent.insert(idx, None);
                    queue.push_back(idx);
                }
            }
        }
        while let Some(idx) = queue.pop_front() {
            if pred(&self.graph[idx]) {
                let mut path = vec![self.graph[idx].clone()];
                let mut cur = parent.get(&idx).copied().flatten();
                while let Some(p) = cur {
                    path.push(self.graph[p].clone());
                    cur = parent.get(&p).copied().flatten();
                }
                path.reverse();
                return Some(path);
            }
            for child in self.children(idx) {
                if let std::collections::hash_map::Entry::Vacant(e) = parent.entry(child) {
                    e.insert(Some(idx));
                    queue.push_back(child);
                }
            }
        }
        None
    }

    /// Modules that directly require `m`, sorted.
    pub fn required_by_reverse(&self, m: &ModuleVersion) -> Vec<ModuleVersion> {
        let Some(&idx) = self.index.get(m) else {
            return Vec::new();
        };
        let mut parents: Vec<ModuleVersion> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| self.graph[e.source()].clone())
            .collect();
        parents.sort();
        parents.dedup();
        parents
    }

    /// Render the graph as a tree rooted at each root.
    ///
    /// Versions that lost to a higher one are marked with the selected
    /// version; a module whose requirements were already printed is marked
    /// `(*)`.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let mut expanded: HashSet<NodeIndex> = HashSet::new();
        for root in &self.roots {
            let Some(&idx) = self.index.get(root) else {
                continue;
            };
            let _ = writeln!(output, "{root}");
            if !expanded.insert(idx) {
                continue;
            }
            let children = self.children(idx);
            let count = children.len();
            for (i, child) in children.into_iter().enumerate() {
                self.print_subtree(
                    &mut output,
                    child,
                    "",
                    i + 1 == count,
                    1,
                    max_depth,
                    &mut expanded,
                );
            }
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        expanded: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let m = &self.graph[idx];
        let selected = self.selected(&m.path);
        let children = self.children(idx);
        let _ = write!(output, "{prefix}{connector}{m}");
        if selected != m.version {
            let _ = write!(output, " -> {selected}");
        }
        if max_depth.is_some_and(|max| depth >= max) {
            output.push('\n');
            return;
        }
        if !expanded.insert(idx) {
            if !children.is_empty() {
                output.push_str(" (*)");
            }
            output.push('\n');
            return;
        }
        output.push('\n');

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.print_subtree(
                output,
                child,
                &child_prefix,
                i + 1 == count,
                depth + 1,
                max_depth,
                expanded,
            );
        }
    }
}
