//! In-memory adjacency view of a program tree.
//!
//! [`TreeGraph`] indexes links by parent and by child so that downward and
//! upward walks never go back to storage. Walks remember the links they have
//! expanded, so a corrupted graph containing a cycle still terminates.

use std::collections::{HashMap, HashSet, VecDeque};

use campus_models::{
    AdjacencyRow, EducationGroupYearId, LearningUnitYearId, Link, LinkChild, LinkId, LinkType,
    ReverseAdjacencyRow,
};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct TreeGraph {
    links: HashMap<LinkId, Link>,
    /// Sorted by `(order, id)`
    children: HashMap<EducationGroupYearId, Vec<LinkId>>,
    parents_of_branch: HashMap<EducationGroupYearId, Vec<LinkId>>,
    parents_of_leaf: HashMap<LearningUnitYearId, Vec<LinkId>>,
}

impl TreeGraph {
    pub fn from_links(links: impl IntoIterator<Item = Link>) -> Self {
        let mut graph = Self::default();

        for link in links {
            graph.children.entry(link.parent_id).or_default().push(link.id);
            match link.child {
                LinkChild::Branch(id) => graph.parents_of_branch.entry(id).or_default().push(link.id),
                LinkChild::Leaf(id) => graph.parents_of_leaf.entry(id).or_default().push(link.id),
            }
            graph.links.insert(link.id, link);
        }

        let links = &graph.links;
        let by_order = |a: &LinkId, b: &LinkId| {
            let (la, lb) = (&links[a], &links[b]);
            (la.order, la.id).cmp(&(lb.order, lb.id))
        };
        for ids in graph.children.values_mut() {
            ids.sort_by(by_order);
        }
        for ids in graph.parents_of_branch.values_mut() {
            ids.sort_by(by_order);
        }
        for ids in graph.parents_of_leaf.values_mut() {
            ids.sort_by(by_order);
        }

        graph
    }

    /// The same graph without one link, as seen while that link is being moved.
    pub fn without(&self, excluded: LinkId) -> Self {
        Self::from_links(
            self.links
                .values()
                .filter(|link| link.id != excluded)
                .cloned(),
        )
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Direct children of `parent`, ordered.
    pub fn children(&self, parent: EducationGroupYearId) -> impl Iterator<Item = &Link> {
        self.children
            .get(&parent)
            .into_iter()
            .flatten()
            .filter_map(|id| self.links.get(id))
    }

    fn parent_links(&self, child: LinkChild) -> impl Iterator<Item = &Link> {
        let ids = match child {
            LinkChild::Branch(id) => self.parents_of_branch.get(&id),
            LinkChild::Leaf(id) => self.parents_of_leaf.get(&id),
        };
        ids.into_iter().flatten().filter_map(|id| self.links.get(id))
    }

    /// The order a new last child of `parent` gets.
    pub fn next_order(&self, parent: EducationGroupYearId) -> i32 {
        self.children(parent)
            .map(|link| link.order)
            .max()
            .map_or(0, |order| order + 1)
    }

    /// Whether `target` is `from` itself or one of its branch descendants.
    pub fn is_reachable(&self, from: EducationGroupYearId, target: EducationGroupYearId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from];

        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            stack.extend(self.children(node).filter_map(|link| link.child.branch_id()));
        }

        false
    }

    /// Breadth-first walk below each root.
    ///
    /// Rows are grouped by root in input order, then sorted by level and
    /// order. Duplicate roots are walked once.
    pub fn adjacency_list(&self, root_ids: &[EducationGroupYearId]) -> Vec<AdjacencyRow> {
        let mut rows = Vec::new();
        let mut seen_roots = HashSet::new();

        for &root in root_ids {
            if !seen_roots.insert(root) {
                continue;
            }

            let mut root_rows = Vec::new();
            let mut visited: HashSet<LinkId> = HashSet::new();
            let mut queue = VecDeque::from([(root, 0_u32, root.to_string())]);

            while let Some((parent, level, parent_path)) = queue.pop_front() {
                for link in self.children(parent) {
                    if !visited.insert(link.id) {
                        continue;
                    }

                    let child_id = link.child.uuid();
                    let path = format!("{}|{}", parent_path, child_id);

                    if let LinkChild::Branch(branch) = link.child {
                        queue.push_back((branch, level + 1, path.clone()));
                    }

                    root_rows.push(AdjacencyRow {
                        starting_node_id: root,
                        id: link.id,
                        parent_id: link.parent_id,
                        child_id,
                        child_branch_id: link.child.branch_id(),
                        child_leaf_id: link.child.leaf_id(),
                        order: link.order,
                        level,
                        path,
                        link_type: link.link_type,
                        block: link.block,
                    });
                }
            }

            // stable: equal keys keep breadth-first order
            root_rows.sort_by_key(|row| (row.level, row.order));
            rows.extend(root_rows);
        }

        rows
    }

    /// Upward walk from each starting node, leaves first.
    ///
    /// With `link_type`, only links of that type are followed, at every level.
    pub fn reverse_adjacency_list(
        &self,
        child_leaf_ids: &[LearningUnitYearId],
        child_branch_ids: &[EducationGroupYearId],
        link_type: Option<LinkType>,
    ) -> Vec<ReverseAdjacencyRow> {
        let mut starts: Vec<LinkChild> = Vec::new();
        for &id in child_leaf_ids {
            let start = LinkChild::Leaf(id);
            if !starts.contains(&start) {
                starts.push(start);
            }
        }
        for &id in child_branch_ids {
            let start = LinkChild::Branch(id);
            if !starts.contains(&start) {
                starts.push(start);
            }
        }

        let mut rows = Vec::new();
        for start in starts {
            rows.extend(self.walk_up(start, link_type));
        }
        rows
    }

    fn walk_up(&self, start: LinkChild, link_type: Option<LinkType>) -> Vec<ReverseAdjacencyRow> {
        let starting_node_id: Uuid = start.uuid();
        let mut rows = Vec::new();
        let mut visited: HashSet<LinkId> = HashSet::new();
        let mut queue = VecDeque::from([(start, 0_u32)]);

        while let Some((child, level)) = queue.pop_front() {
            for link in self.parent_links(child) {
                if link_type.is_some_and(|wanted| link.link_type != Some(wanted)) {
                    continue;
                }
                if !visited.insert(link.id) {
                    continue;
                }

                queue.push_back((LinkChild::Branch(link.parent_id), level + 1));
                rows.push(ReverseAdjacencyRow {
                    starting_node_id,
                    id: link.id,
                    parent_id: link.parent_id,
                    child_id: link.child.uuid(),
                    child_branch_id: link.child.branch_id(),
                    child_leaf_id: link.child.leaf_id(),
                    order: link.order,
                    level,
                    link_type: link.link_type,
                });
            }
        }

        rows
    }
}
