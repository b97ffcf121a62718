// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Per-compilation-unit arena of nodes, variables and definitions

use crate::ir::error::{IrError, IrResult};
use crate::ir::literal::LiteralValue;
use crate::ir::marker::{DefId, DefinitionMarker, MarkerSet};
use crate::ir::node::{Modifiers, Node, NodeId, NodeKind, NodeTag};
use crate::ir::types::JType;
use crate::ir::variable::{VarId, Variable};
use jack_common::{Registry, SourceInfo, Symbol};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Materializes the members of a library class on first use
pub trait MemberLoader: Send {
    /// Add the fields and methods of `class` to the tree
    fn load(&self, tree: &mut Tree, class: NodeId) -> IrResult<()>;
}

/// IR of one compilation unit
///
/// Nodes are never freed: a detached node stays in the arena with its parent
/// link cleared, so handles held by a pass remain valid across commits.
pub struct Tree {
    nodes: Vec<Node>,
    variables: Vec<Variable>,
    pub(crate) definitions: Vec<DefinitionMarker>,
    registry: Arc<Registry>,
    root: NodeId,
    loaders: HashMap<NodeId, Box<dyn MemberLoader>>,
    /// Nodes holding a child whose parent link still names an earlier parent
    stale_links: HashSet<NodeId>,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.len())
            .field("variables", &self.variables.len())
            .field("definitions", &self.definitions.len())
            .field("pending_loaders", &self.loaders.len())
            .finish()
    }
}

impl Tree {
    /// Create a tree holding an empty program
    pub fn new(registry: Arc<Registry>) -> Self {
        let program = Node::new(NodeKind::Program { classes: Vec::new() }, SourceInfo::unknown());
        Self {
            nodes: vec![program],
            variables: Vec::new(),
            definitions: Vec::new(),
            registry,
            root: NodeId(0),
            loaders: HashMap::new(),
            stale_links: HashSet::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn intern(&self, name: &str) -> Symbol {
        self.registry.intern(name)
    }

    /// Display name of an interned symbol
    pub fn name(&self, symbol: Symbol) -> String {
        self.registry.display(symbol)
    }

    /// Number of nodes ever allocated, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a node. Children that have no parent yet are stamped with the
    /// new node; children moved from another parent keep their link until the
    /// commit fix-up, and the new node is recorded as holding stale links.
    pub fn add(&mut self, kind: NodeKind, source: SourceInfo) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut stale = false;
        for child in kind.children() {
            // A stale link anywhere below a child makes this node stale too.
            stale |= self.stale_links.contains(&child);
            let node = &mut self.nodes[child.index()];
            match node.parent {
                None => node.parent = Some(id),
                Some(_) => stale = true,
            }
        }
        self.nodes.push(Node::new(kind, source));
        if stale {
            self.stale_links.insert(id);
        }
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Checked access for handles coming from outside the tree
    pub fn try_node(&self, id: NodeId) -> IrResult<&Node> {
        self.get(id).ok_or(IrError::UnknownNode { node: id })
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn tag(&self, id: NodeId) -> NodeTag {
        self.kind(id).tag()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.nodes[id.index()].parent = parent;
    }

    /// Make the next fix-up walk descend from the ancestors of `id` down to it
    pub(crate) fn mark_stale_links(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node) = current {
            if !self.stale_links.insert(node) {
                break;
            }
            current = self.parent(node);
        }
    }

    pub fn source(&self, id: NodeId) -> &SourceInfo {
        &self.nodes[id.index()].source
    }

    pub fn set_source(&mut self, id: NodeId, source: SourceInfo) {
        self.nodes[id.index()].source = source;
    }

    pub fn markers(&self, id: NodeId) -> &MarkerSet {
        &self.nodes[id.index()].markers
    }

    pub fn markers_mut(&mut self, id: NodeId) -> &mut MarkerSet {
        &mut self.nodes[id.index()].markers
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Check whether `child` currently sits in one of the slots of `parent`
    pub fn contains_child(&self, parent: NodeId, child: NodeId) -> bool {
        let mut found = false;
        self.kind(parent).for_each_child(|id| found |= id == child);
        found
    }

    // Variables

    pub fn add_variable(&mut self, variable: Variable) -> VarId {
        let id = VarId(self.variables.len() as u32);
        self.variables.push(variable);
        id
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    /// Variable referenced by a local, parameter or `this` reference node
    pub fn referenced_variable(&self, id: NodeId) -> Option<VarId> {
        self.kind(id).variable()
    }

    pub fn literal(&self, id: NodeId) -> Option<&LiteralValue> {
        self.kind(id).literal()
    }

    pub fn definition(&self, id: DefId) -> &DefinitionMarker {
        &self.definitions[id.index()]
    }

    /// Every definition ever recorded, including killed ones
    pub fn definitions(&self) -> impl Iterator<Item = (DefId, &DefinitionMarker)> {
        self.definitions.iter().enumerate().map(|(index, def)| (DefId(index as u32), def))
    }

    // Parent management

    /// Stamp `parent` on `id` and fix up the links below it. Returns the
    /// previous parent of every node that changed.
    ///
    /// The walk stops below a node whose link was already correct, unless some
    /// node at or below it was built over children parented elsewhere.
    pub fn fix_parents(&mut self, id: NodeId, parent: Option<NodeId>) -> Vec<(NodeId, Option<NodeId>)> {
        let mut changed = Vec::new();
        let mut stack = vec![(id, parent)];
        while let Some((node, expected)) = stack.pop() {
            let previous = self.parent(node);
            let stale = self.stale_links.remove(&node);
            if previous == expected && !stale {
                continue;
            }
            if previous != expected {
                changed.push((node, previous));
                self.set_parent(node, expected);
            }
            for child in self.children(node) {
                stack.push((child, Some(node)));
            }
        }
        changed
    }

    /// Check parent links and slot validity of every node reachable from `root`
    pub fn validate(&self, root: NodeId) -> IrResult<()> {
        let parent_tag = self.parent(root).map(|parent| self.tag(parent));
        if !self.tag(root).check_validity(parent_tag) {
            return Err(self.invalid_parent(root, parent_tag.unwrap_or(NodeTag::Program)));
        }

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let tag = self.tag(node);
            self.check_required_children(node)?;
            for child in self.children(node) {
                if child.index() >= self.nodes.len() {
                    return Err(IrError::UnknownNode { node: child });
                }
                if self.parent(child) != Some(node) {
                    return Err(IrError::ParentMismatch {
                        node: child,
                        kind: self.tag(child),
                        expected: node,
                        found: self.parent(child),
                        location: self.source(child).clone(),
                    });
                }
                if !self.tag(child).check_validity(Some(tag)) {
                    return Err(self.invalid_parent(child, tag));
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    pub(crate) fn invalid_parent(&self, node: NodeId, parent: NodeTag) -> IrError {
        IrError::InvalidParent {
            node,
            kind: self.tag(node),
            parent,
            location: self.source(node).clone(),
        }
    }

    fn check_required_children(&self, node: NodeId) -> IrResult<()> {
        let missing = match self.kind(node) {
            NodeKind::Method { modifiers, body: None, .. } if !modifiers.intersects(Modifiers::ABSTRACT | Modifiers::NATIVE) => {
                let external = self.parent(node).is_some_and(|class| matches!(self.kind(class), NodeKind::Class { external: true, .. }));
                (!external).then_some("body")
            }
            NodeKind::Method { body: Some(body), .. } if self.tag(*body) != NodeTag::Block => Some("body"),
            NodeKind::Switch { body, .. } if self.tag(*body) != NodeTag::Block => Some("body"),
            NodeKind::Try { catches, finally: None, .. } if catches.is_empty() => Some("catch or finally"),
            _ => None,
        };
        match missing {
            Some(slot) => Err(IrError::missing_child(node, self.tag(node), slot, self.source(node).clone())),
            None => Ok(()),
        }
    }

    /// Deep copy of a subtree; the copy is detached and carries no markers
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        // Post-order over an explicit stack; copies of finished children wait
        // on `done` until their parent is rebuilt.
        let mut stack = vec![(id, false)];
        let mut done: Vec<NodeId> = Vec::new();
        while let Some((node, expanded)) = stack.pop() {
            if !expanded {
                stack.push((node, true));
                let children = self.children(node);
                stack.extend(children.into_iter().rev().map(|child| (child, false)));
                continue;
            }
            let mut kind = self.kind(node).clone();
            let copies = done.split_off(done.len() - kind.children().len());
            let mut copies = copies.into_iter();
            kind.for_each_child_mut(|slot| {
                if let Some(copy) = copies.next() {
                    *slot = copy;
                }
            });
            let source = self.source(node).clone();
            let copy = self.add(kind, source);
            done.push(copy);
        }
        done.pop().unwrap_or(id)
    }

    // Queries

    /// Static type of an expression node
    pub fn expression_type(&self, id: NodeId) -> Option<JType> {
        let ty = match self.kind(id) {
            NodeKind::Literal(LiteralValue::Null) => JType::Null,
            NodeKind::Literal(LiteralValue::String(_)) => JType::Class(self.registry.intern("java.lang.String")),
            NodeKind::Literal(value) => JType::Primitive(value.primitive_type()?),
            NodeKind::LocalRef(var) | NodeKind::ParameterRef(var) | NodeKind::ThisRef(var) => self.variable(*var).ty.clone(),
            NodeKind::Binary { ty, .. }
            | NodeKind::Prefix { ty, .. }
            | NodeKind::Cast { ty, .. }
            | NodeKind::Conditional { ty, .. }
            | NodeKind::ArrayRef { ty, .. }
            | NodeKind::FieldRef { ty, .. }
            | NodeKind::ExceptionRuntimeValue { ty } => ty.clone(),
            NodeKind::Assign { lhs, .. } => self.expression_type(*lhs)?,
            NodeKind::Postfix { operand, .. } => self.expression_type(*operand)?,
            NodeKind::InstanceOf { .. } => JType::BOOLEAN,
            NodeKind::MethodCall { return_type, .. } => return_type.clone(),
            NodeKind::NewInstance { class, .. } => JType::Class(*class),
            NodeKind::NewArray { element, dims, .. } => (0..dims.len().max(1)).fold(element.clone(), |ty, _| JType::array_of(ty)),
            NodeKind::ArrayLength { .. } => JType::INT,
            NodeKind::MultiExpression { exprs } => self.expression_type(*exprs.last()?)?,
            _ => return None,
        };
        Some(ty)
    }

    /// Nearest method declaration above `id`
    pub fn enclosing_method(&self, id: NodeId) -> Option<NodeId> {
        self.enclosing(id, NodeTag::Method)
    }

    pub fn enclosing_class(&self, id: NodeId) -> Option<NodeId> {
        self.enclosing(id, NodeTag::Class)
    }

    /// Nearest statement holding `id`, or `id` itself when it is a statement
    pub fn enclosing_statement(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.tag(node).is_statement() {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    fn enclosing(&self, id: NodeId, tag: NodeTag) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.tag(node) == tag {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn find_class(&self, name: &str) -> Option<NodeId> {
        let symbol = self.registry.find(name)?;
        let NodeKind::Program { classes } = self.kind(self.root) else {
            return None;
        };
        classes.iter().copied().find(|&class| matches!(self.kind(class), NodeKind::Class { name, .. } if *name == symbol))
    }

    pub fn find_method(&self, class: NodeId, name: &str) -> Option<NodeId> {
        let symbol = self.registry.find(name)?;
        let NodeKind::Class { methods, .. } = self.kind(class) else {
            return None;
        };
        methods.iter().copied().find(|&method| matches!(self.kind(method), NodeKind::Method { name, .. } if *name == symbol))
    }

    pub fn find_field(&self, class: NodeId, name: &str) -> Option<NodeId> {
        let symbol = self.registry.find(name)?;
        let NodeKind::Class { fields, .. } = self.kind(class) else {
            return None;
        };
        fields.iter().copied().find(|&field| matches!(self.kind(field), NodeKind::Field { name, .. } if *name == symbol))
    }

    /// Methods of every class in the program, in declaration order
    pub fn methods(&self) -> Vec<NodeId> {
        let NodeKind::Program { classes } = self.kind(self.root) else {
            return Vec::new();
        };
        classes
            .iter()
            .flat_map(|&class| match self.kind(class) {
                NodeKind::Class { methods, .. } => methods.clone(),
                _ => Vec::new(),
            })
            .collect()
    }

    // Lazy loading

    /// Defer member materialization of `class` to `loader`
    pub fn register_loader(&mut self, class: NodeId, loader: Box<dyn MemberLoader>) {
        self.loaders.insert(class, loader);
    }

    pub fn is_loaded(&self, class: NodeId) -> bool {
        !self.loaders.contains_key(&class)
    }

    /// Run the pending loader of `class`, if any; loading happens at most once
    pub fn ensure_loaded(&mut self, class: NodeId) -> IrResult<()> {
        let Some(loader) = self.loaders.remove(&class) else {
            return Ok(());
        };
        loader.load(self, class)?;
        self.validate(class)
    }
}
