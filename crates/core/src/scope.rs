//! Project scope hierarchy.
//!
//! Project paths are split into segments and merged into a trie rooted at a
//! synthetic "All" node. Nodes live in an arena in pre-order, so a subtree is
//! the contiguous id interval `[id, subtree_end]`.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::Project;

pub const ROOT_SCOPE: ScopeId = ScopeId(0);

const ROOT_SEGMENT: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeNode {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub segment: String,
    pub path: String,
    pub depth: usize,
    /// Projects whose path ends at this node.
    pub slugs: Vec<String>,
    pub children: Vec<ScopeId>,
    #[serde(skip)]
    subtree_end: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
    #[serde(skip)]
    by_slug: HashMap<String, ScopeId>,
}

#[derive(Default)]
struct Draft {
    segment: String,
    slugs: Vec<String>,
    children: BTreeMap<String, usize>,
}

/// Splits a filesystem-like path on `/` and `\`, dropping empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn join_segments(segments: &[&str]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

impl ScopeTree {
    pub fn build(projects: &[Project]) -> Self {
        let mut drafts = vec![Draft {
            segment: ROOT_SEGMENT.to_string(),
            ..Draft::default()
        }];
        for project in projects {
            let mut segments = split_path(&project.path);
            if segments.is_empty() {
                segments.push(project.slug.as_str());
            }
            let mut current = 0;
            for segment in segments {
                current = match drafts[current].children.get(segment) {
                    Some(&child) => child,
                    None => {
                        let child = drafts.len();
                        drafts.push(Draft {
                            segment: segment.to_string(),
                            ..Draft::default()
                        });
                        drafts[current].children.insert(segment.to_string(), child);
                        child
                    }
                };
            }
            if !drafts[current].slugs.contains(&project.slug) {
                drafts[current].slugs.push(project.slug.clone());
            }
        }

        let mut nodes = Vec::with_capacity(drafts.len());
        let mut stack: Vec<(usize, Option<ScopeId>, Vec<String>)> = vec![(0, None, Vec::new())];
        while let Some((draft_idx, parent, prefix)) = stack.pop() {
            let id = ScopeId(nodes.len());
            let draft = &drafts[draft_idx];
            let mut segments = prefix.clone();
            if parent.is_some() {
                segments.push(draft.segment.clone());
            }
            let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
            nodes.push(ScopeNode {
                id,
                parent,
                segment: draft.segment.clone(),
                path: join_segments(&refs),
                depth: segments.len(),
                slugs: draft.slugs.clone(),
                children: Vec::new(),
                subtree_end: id,
            });
            if let Some(parent) = parent {
                nodes[parent.0].children.push(id);
            }
            for &child in draft.children.values().rev() {
                stack.push((child, Some(id), segments.clone()));
            }
        }
        Self::finish(nodes)
    }

    fn finish(mut nodes: Vec<ScopeNode>) -> Self {
        for idx in (0..nodes.len()).rev() {
            let end = nodes[idx]
                .children
                .last()
                .map(|child| nodes[child.0].subtree_end)
                .unwrap_or(nodes[idx].id);
            nodes[idx].subtree_end = end;
        }
        let mut by_slug = HashMap::new();
        for node in &nodes {
            for slug in &node.slugs {
                by_slug.entry(slug.clone()).or_insert(node.id);
            }
        }
        Self { nodes, by_slug }
    }

    pub fn root(&self) -> &ScopeNode {
        &self.nodes[ROOT_SCOPE.0]
    }

    pub fn get(&self, id: ScopeId) -> Option<&ScopeNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[ScopeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Nodes other than the root that have no children.
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .skip(1)
            .filter(|node| node.children.is_empty())
            .count()
    }

    pub fn project_count(&self) -> usize {
        self.by_slug.len()
    }

    pub fn node_for_slug(&self, slug: &str) -> Option<ScopeId> {
        self.by_slug.get(slug).copied()
    }

    /// Looks a node up by its full path; `""` and `"/"` name the root.
    pub fn find_by_path(&self, path: &str) -> Option<ScopeId> {
        let segments = split_path(path);
        let mut current = ROOT_SCOPE;
        for segment in segments {
            current = self.child_by_segment(current, segment)?;
        }
        Some(current)
    }

    fn child_by_segment(&self, parent: ScopeId, segment: &str) -> Option<ScopeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].segment == segment)
    }

    /// True iff the project's node is `scope` or one of its descendants.
    /// The root matches every slug, including ones with no known project.
    pub fn matches(&self, scope: ScopeId, slug: &str) -> bool {
        if scope == ROOT_SCOPE {
            return true;
        }
        let Some(node) = self.nodes.get(scope.0) else {
            return false;
        };
        match self.by_slug.get(slug) {
            Some(leaf) => *leaf >= node.id && *leaf <= node.subtree_end,
            None => false,
        }
    }

    /// Deepest non-root node whose path is a prefix of `cwd`.
    pub fn deepest_prefix(&self, cwd: &str) -> Option<ScopeId> {
        let mut current = ROOT_SCOPE;
        for segment in split_path(cwd) {
            match self.child_by_segment(current, segment) {
                Some(child) => current = child,
                None => break,
            }
        }
        (current != ROOT_SCOPE).then_some(current)
    }

    /// Case-insensitive substring filter. Keeps nodes whose segment matches or
    /// whose projects' slug/path match, plus every ancestor of a kept node.
    pub fn filter(&self, query: &str) -> ScopeTree {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.clone();
        }
        let mut keep = vec![false; self.nodes.len()];
        keep[ROOT_SCOPE.0] = true;
        for node in self.nodes.iter().skip(1) {
            let segment_hit = node.segment.to_lowercase().contains(&query);
            let project_hit = node.slugs.iter().any(|slug| {
                slug.to_lowercase().contains(&query) || node.path.to_lowercase().contains(&query)
            });
            if segment_hit || project_hit {
                let mut cursor = Some(node.id);
                while let Some(id) = cursor {
                    if keep[id.0] && id != node.id {
                        break;
                    }
                    keep[id.0] = true;
                    cursor = self.nodes[id.0].parent;
                }
            }
        }

        let mut remap = vec![None; self.nodes.len()];
        let mut nodes: Vec<ScopeNode> = Vec::new();
        for node in &self.nodes {
            if !keep[node.id.0] {
                continue;
            }
            let id = ScopeId(nodes.len());
            remap[node.id.0] = Some(id);
            let parent = node.parent.and_then(|parent| remap[parent.0]);
            if let Some(parent) = parent {
                nodes[parent.0].children.push(id);
            }
            nodes.push(ScopeNode {
                id,
                parent,
                children: Vec::new(),
                subtree_end: id,
                ..node.clone()
            });
        }
        Self::finish(nodes)
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::build(&[])
    }
}
