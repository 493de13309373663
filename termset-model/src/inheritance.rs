//! Multi-parent profile inheritance.
//!
//! Profiles and their parents form a DAG stored in an arena. Each node holds
//! one layer of [`ProfileSettings`] and an ordered parent list; the first
//! parent that sets a field wins. A synthetic root whose parents are the
//! top-level profiles turns the forest into one traversable graph.
//!
//! [`InheritanceGraph::clone_graph`] deep-copies everything reachable from a
//! root exactly once, keeping shared ancestors shared, and rejects cycles.

use std::collections::{HashMap, HashSet};

use crate::error::SettingsLoadError;
use crate::profile_types::ProfileSettings;

/// Index of a node in an [`InheritanceGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One layer in the inheritance graph.
#[derive(Debug, Clone, Default)]
pub struct ProfileNode {
    pub settings: ProfileSettings,
    /// Parents in precedence order
    pub parents: Vec<NodeId>,
    /// Used in diagnostics
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct InheritanceGraph {
    nodes: Vec<ProfileNode>,
}

/// Result of [`InheritanceGraph::clone_graph`].
#[derive(Debug, Clone)]
pub struct ClonedGraph {
    pub graph: InheritanceGraph,
    pub root: NodeId,
    mapping: HashMap<NodeId, NodeId>,
}

impl ClonedGraph {
    /// Clone of a source node, if it was reachable.
    pub fn get(&self, source: NodeId) -> Option<NodeId> {
        self.mapping.get(&source).copied()
    }

    /// Parents of the cloned root: the flattened profile collection.
    pub fn top_level(&self) -> &[NodeId] {
        &self.graph.node(self.root).parents
    }
}

#[derive(Debug, Clone, Copy)]
enum VisitState {
    InProgress,
    Done(NodeId),
}

impl InheritanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(&mut self, settings: ProfileSettings, label: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ProfileNode {
            settings,
            parents: Vec::new(),
            label: label.into(),
        });
        id
    }

    /// Append `parent` to `child`'s parent list. Duplicate edges are ignored.
    pub fn add_parent(&mut self, child: NodeId, parent: NodeId) {
        let parents = &mut self.nodes[child.0].parents;
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    pub fn node(&self, id: NodeId) -> &ProfileNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ProfileNode {
        &mut self.nodes[id.0]
    }

    /// Deep-copy everything reachable from `root`.
    ///
    /// `pre_register` is cloned first even when `root` cannot reach it, so it
    /// is present in the result and shared by every path that does reach it.
    /// The clone is laid out parents-first.
    ///
    /// Fails with [`SettingsLoadError::CyclicInheritance`] when a node is
    /// reached again while it is still on the current path.
    pub fn clone_graph(
        &self,
        root: NodeId,
        pre_register: Option<NodeId>,
    ) -> Result<ClonedGraph, SettingsLoadError> {
        let mut cloner = Cloner {
            source: self,
            target: InheritanceGraph::new(),
            visited: HashMap::new(),
        };

        if let Some(extra) = pre_register {
            cloner.visit(extra)?;
        }
        let new_root = cloner.visit(root)?;

        let mapping = cloner
            .visited
            .into_iter()
            .filter_map(|(source, state)| match state {
                VisitState::Done(clone) => Some((source, clone)),
                VisitState::InProgress => None,
            })
            .collect();

        Ok(ClonedGraph {
            graph: cloner.target,
            root: new_root,
            mapping,
        })
    }

    /// Resolve a single node by folding its ancestors. Only call this on an
    /// acyclic graph, such as the output of [`Self::clone_graph`].
    pub fn resolve(&self, id: NodeId) -> ProfileSettings {
        let mut resolved: HashMap<NodeId, ProfileSettings> = HashMap::new();
        let mut expanded = HashSet::new();
        let mut stack = vec![(id, false)];

        // Post-order walk: a node is folded once all of its parents are.
        while let Some((current, parents_done)) = stack.pop() {
            if resolved.contains_key(&current) {
                continue;
            }
            let node = self.node(current);
            if parents_done {
                let mut merged = node.settings.clone();
                for parent in &node.parents {
                    if let Some(parent_settings) = resolved.get(parent) {
                        merged = merged.merged_over(parent_settings);
                    }
                }
                resolved.insert(current, merged);
            } else if expanded.insert(current) {
                stack.push((current, true));
                for parent in node.parents.iter().rev() {
                    if !resolved.contains_key(parent) {
                        stack.push((*parent, false));
                    }
                }
            }
        }

        resolved.remove(&id).unwrap_or_default()
    }

    /// Resolve every node. Requires a parents-first layout, which
    /// [`Self::clone_graph`] guarantees.
    pub fn resolve_all(&self) -> Vec<ProfileSettings> {
        let mut resolved: Vec<ProfileSettings> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let mut merged = node.settings.clone();
            for parent in &node.parents {
                merged = merged.merged_over(&resolved[parent.0]);
            }
            resolved.push(merged);
        }
        resolved
    }
}

struct Cloner<'a> {
    source: &'a InheritanceGraph,
    target: InheritanceGraph,
    visited: HashMap<NodeId, VisitState>,
}

/// A source node whose parents are still being cloned.
struct Frame {
    source: NodeId,
    next_parent: usize,
    parents: Vec<NodeId>,
}

impl Frame {
    fn new(source: NodeId) -> Self {
        Self {
            source,
            next_parent: 0,
            parents: Vec::new(),
        }
    }
}

impl Cloner<'_> {
    /// Clone `start` and its ancestors depth-first, parents in order. The walk
    /// keeps its own stack so chain depth is bounded by memory only.
    fn visit(&mut self, start: NodeId) -> Result<NodeId, SettingsLoadError> {
        match self.visited.get(&start) {
            Some(VisitState::Done(clone)) => return Ok(*clone),
            Some(VisitState::InProgress) => return Err(self.cycle_at(start)),
            None => {}
        }
        self.visited.insert(start, VisitState::InProgress);
        let source = self.source;
        let mut stack = vec![Frame::new(start)];

        while let Some(frame) = stack.last_mut() {
            let source_node = source.node(frame.source);
            if let Some(&parent) = source_node.parents.get(frame.next_parent) {
                frame.next_parent += 1;
                match self.visited.get(&parent) {
                    Some(VisitState::Done(clone)) => frame.parents.push(*clone),
                    Some(VisitState::InProgress) => return Err(self.cycle_at(parent)),
                    None => {
                        self.visited.insert(parent, VisitState::InProgress);
                        stack.push(Frame::new(parent));
                    }
                }
                continue;
            }

            let Some(finished) = stack.pop() else { break };
            let clone = self
                .target
                .add_node(source_node.settings.clone(), source_node.label.clone());
            self.target.node_mut(clone).parents = finished.parents;
            self.visited.insert(finished.source, VisitState::Done(clone));

            match stack.last_mut() {
                Some(child) => child.parents.push(clone),
                None => return Ok(clone),
            }
        }

        Err(self.cycle_at(start))
    }

    fn cycle_at(&self, id: NodeId) -> SettingsLoadError {
        let label = self.source.node(id).label.clone();
        log::warn!("Cyclic profile inheritance detected at '{label}'");
        SettingsLoadError::CyclicInheritance { profile: label }
    }
}
