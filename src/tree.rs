//! Guide trees for progressive alignment.
//!
//! Trees live in an arena and are immutable once built: alignment runs keep
//! their per-node working state in side tables indexed by [`NodeId`], so one
//! tree can be shared by every cognate class (and every worker thread).

use std::collections::HashMap;
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TreeError {
    #[error("Newick parse error at byte {position}: {message}")]
    Newick { position: usize, message: String },
    #[error("Duplicate leaf label: {0}")]
    DuplicateLeaf(String),
    #[error("Leaf without a label")]
    UnlabelledLeaf,
    #[error("Tree has no nodes")]
    Empty,
    #[error("Invalid distance matrix: {0}")]
    InvalidDistances(String),
    #[error("Expected {expected} names, got {actual}")]
    NameCount { expected: usize, actual: usize },
}

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub label: Option<String>,
    /// Length of the edge to the parent. Informational only.
    pub length: Option<f64>,
    pub children: Vec<NodeId>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A rooted guide tree whose leaves are language identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideTree {
    nodes: Vec<TreeNode>,
    root: NodeId,
    leaves: HashMap<String, NodeId>,
}

/// Incremental construction of a [`GuideTree`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<TreeNode>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(&mut self, label: impl Into<String>) -> NodeId {
        self.push(TreeNode {
            label: Some(label.into()),
            length: None,
            children: Vec::new(),
        })
    }

    pub fn internal(&mut self, children: Vec<NodeId>) -> NodeId {
        self.push(TreeNode {
            label: None,
            length: None,
            children,
        })
    }

    pub fn set_length(&mut self, node: NodeId, length: f64) {
        self.nodes[node.0].length = Some(length);
    }

    pub fn set_label(&mut self, node: NodeId, label: impl Into<String>) {
        self.nodes[node.0].label = Some(label.into());
    }

    /// Finish the tree rooted at `root`. Nodes unreachable from `root` are dropped.
    pub fn build(self, root: NodeId) -> Result<GuideTree, TreeError> {
        if root.0 >= self.nodes.len() {
            return Err(TreeError::Empty);
        }

        // Re-index the reachable part in pre-order so ids are dense
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(root, None::<usize>)];
        while let Some((old, parent)) = stack.pop() {
            let idx = nodes.len();
            let node = &self.nodes[old.0];
            nodes.push(TreeNode {
                label: node.label.clone(),
                length: node.length,
                children: Vec::with_capacity(node.children.len()),
            });
            if let Some(p) = parent {
                let parent_node: &mut TreeNode = &mut nodes[p];
                parent_node.children.push(NodeId(idx));
            }
            for &child in node.children.iter().rev() {
                stack.push((child, Some(idx)));
            }
        }

        let mut leaves = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            if !node.is_leaf() {
                continue;
            }
            let label = node.label.clone().ok_or(TreeError::UnlabelledLeaf)?;
            if leaves.insert(label.clone(), NodeId(idx)).is_some() {
                return Err(TreeError::DuplicateLeaf(label));
            }
        }

        Ok(GuideTree {
            nodes,
            root: NodeId(0),
            leaves,
        })
    }

    fn push(&mut self, node: TreeNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}

impl GuideTree {
    /// A tree with one leaf per label under a single root (a star).
    pub fn star<S: AsRef<str>>(labels: &[S]) -> Result<Self, TreeError> {
        let mut builder = TreeBuilder::new();
        let children = labels.iter().map(|l| builder.leaf(l.as_ref())).collect();
        let root = builder.internal(children);
        builder.build(root)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The leaf labelled `language`, if the tree has one.
    pub fn find_leaf(&self, language: &str) -> Option<NodeId> {
        self.leaves.get(language).copied()
    }

    /// Leaf labels in left-to-right order.
    pub fn leaf_labels(&self) -> Vec<&str> {
        self.post_order()
            .into_iter()
            .filter_map(|id| {
                let node = self.node(id);
                if node.is_leaf() {
                    node.label.as_deref()
                } else {
                    None
                }
            })
            .collect()
    }

    /// Children before parents, left to right.
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for &child in self.node(id).children.iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Parse a single tree in Newick notation, e.g. `((a:1,b:1):2,c:3);`.
    pub fn from_newick(text: &str) -> Result<Self, TreeError> {
        let mut parser = NewickParser {
            bytes: text.as_bytes(),
            text,
            pos: 0,
            builder: TreeBuilder::new(),
        };
        parser.skip_ws();
        let root = parser.subtree()?;
        parser.skip_ws();
        if parser.peek() == Some(b';') {
            parser.pos += 1;
        }
        parser.skip_ws();
        if parser.pos < parser.bytes.len() {
            return Err(parser.error("trailing characters after tree"));
        }
        parser.builder.build(root)
    }

    /// Serialize to Newick, terminated by `;`.
    pub fn to_newick(&self) -> String {
        let mut out = String::new();
        self.write_newick(self.root, &mut out);
        out.push(';');
        out
    }

    fn write_newick(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        if !node.is_leaf() {
            out.push('(');
            for (k, &child) in node.children.iter().enumerate() {
                if k > 0 {
                    out.push(',');
                }
                self.write_newick(child, out);
            }
            out.push(')');
        }
        if let Some(label) = &node.label {
            out.push_str(&quote_label(label));
        }
        if let Some(length) = node.length {
            let _ = write!(out, ":{}", length);
        }
    }
}

fn quote_label(label: &str) -> String {
    let needs_quotes = label
        .chars()
        .any(|c| matches!(c, '(' | ')' | ',' | ':' | ';' | '[' | ']' | '\'') || c.is_whitespace());
    if needs_quotes {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}

struct NewickParser<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
    builder: TreeBuilder,
}

impl NewickParser<'_> {
    fn error(&self, message: &str) -> TreeError {
        TreeError::Newick {
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Skip whitespace and `[...]` comments.
    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'[' {
                match self.text[self.pos..].find(']') {
                    Some(end) => self.pos += end + 1,
                    None => self.pos = self.bytes.len(),
                }
            } else {
                break;
            }
        }
    }

    fn subtree(&mut self) -> Result<NodeId, TreeError> {
        let mut children = Vec::new();
        if self.peek() == Some(b'(') {
            self.pos += 1;
            loop {
                self.skip_ws();
                children.push(self.subtree()?);
                self.skip_ws();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b')') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error("expected ',' or ')'")),
                }
            }
        }

        self.skip_ws();
        let label = self.label()?;
        let id = if children.is_empty() {
            match label {
                Some(label) => self.builder.leaf(label),
                None => return Err(self.error("leaf without a label")),
            }
        } else {
            let id = self.builder.internal(children);
            if let Some(label) = label {
                self.builder.set_label(id, label);
            }
            id
        };

        self.skip_ws();
        if self.peek() == Some(b':') {
            self.pos += 1;
            self.skip_ws();
            let length = self.length()?;
            self.builder.set_length(id, length);
        }
        Ok(id)
    }

    fn label(&mut self) -> Result<Option<String>, TreeError> {
        let text = self.text;
        if self.peek() == Some(b'\'') {
            self.pos += 1;
            let mut label = String::new();
            loop {
                let rest = &text[self.pos..];
                let Some(end) = rest.find('\'') else {
                    return Err(self.error("unterminated quoted label"));
                };
                label.push_str(&rest[..end]);
                self.pos += end + 1;
                // '' inside quotes is an escaped quote
                if self.peek() == Some(b'\'') {
                    label.push('\'');
                    self.pos += 1;
                } else {
                    break;
                }
            }
            return Ok(Some(label));
        }

        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'(' | b')' | b',' | b':' | b';' | b'[') || b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            Ok(None)
        } else {
            Ok(Some(self.text[start..self.pos].to_string()))
        }
    }

    fn length(&mut self) -> Result<f64, TreeError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.text[start..self.pos]
            .parse()
            .map_err(|_| self.error("invalid branch length"))
    }
}

/// A square, symmetric, non-negative distance matrix with zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Validate and wrap row-major `rows`.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, TreeError> {
        let size = rows.len();
        let mut values = Vec::with_capacity(size * size);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(TreeError::InvalidDistances(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    size
                )));
            }
            values.extend_from_slice(row);
        }
        let matrix = Self { size, values };
        matrix.validate()?;
        Ok(matrix)
    }

    /// All-zero matrix of the given size.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    /// Set `d(i, j)` and `d(j, i)`.
    pub fn set(&mut self, i: usize, j: usize, distance: f64) {
        self.values[i * self.size + j] = distance;
        self.values[j * self.size + i] = distance;
    }

    fn validate(&self) -> Result<(), TreeError> {
        for i in 0..self.size {
            if self.get(i, i) != 0.0 {
                return Err(TreeError::InvalidDistances(format!(
                    "non-zero diagonal at {}",
                    i
                )));
            }
            for j in (i + 1)..self.size {
                let d = self.get(i, j);
                if !d.is_finite() || d < 0.0 {
                    return Err(TreeError::InvalidDistances(format!(
                        "d({}, {}) = {} is not a finite non-negative number",
                        i, j, d
                    )));
                }
                if d != self.get(j, i) {
                    return Err(TreeError::InvalidDistances(format!(
                        "d({}, {}) != d({}, {})",
                        i, j, j, i
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Cluster `names` with UPGMA.
///
/// Each round merges the closest pair of active clusters, taking the first
/// pair in row-major scan order on ties. The merged cluster takes the lower
/// slot and its distances are the plain mean of the two merged rows, without
/// weighting by cluster size. Both children get half the merge distance as
/// edge length.
pub fn upgma<S: AsRef<str>>(distances: &DistanceMatrix, names: &[S]) -> Result<GuideTree, TreeError> {
    let size = distances.len();
    if names.len() != size {
        return Err(TreeError::NameCount {
            expected: size,
            actual: names.len(),
        });
    }
    if size == 0 {
        return Err(TreeError::Empty);
    }
    distances.validate()?;

    let mut builder = TreeBuilder::new();
    let mut active: Vec<NodeId> = names.iter().map(|n| builder.leaf(n.as_ref())).collect();
    let mut d: Vec<Vec<f64>> = (0..size)
        .map(|i| (0..size).map(|j| distances.get(i, j)).collect())
        .collect();

    while active.len() > 1 {
        let count = active.len();
        let (mut bi, mut bj) = (0, 1);
        for i in 0..count - 1 {
            for j in (i + 1)..count {
                if d[i][j] < d[bi][bj] {
                    bi = i;
                    bj = j;
                }
            }
        }

        let height = d[bi][bj] / 2.0;
        builder.set_length(active[bi], height);
        builder.set_length(active[bj], height);
        let merged = builder.internal(vec![active[bi], active[bj]]);
        log::debug!("UPGMA merge at distance {}", d[bi][bj]);

        for k in 0..count {
            let mean = 0.5 * d[bi][k] + 0.5 * d[bj][k];
            d[bi][k] = mean;
            d[k][bi] = mean;
        }
        d[bi][bi] = 0.0;
        d.remove(bj);
        for row in d.iter_mut() {
            row.remove(bj);
        }
        active[bi] = merged;
        active.remove(bj);
    }

    builder.build(active[0])
}
