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

//! IR node kinds
//!
//! A node is a [`NodeKind`] payload plus a common header (parent link, source
//! tag, dataflow markers). Children are referenced by [`NodeId`] and owned by
//! exactly one parent slot; the parent link is a non-owning back reference
//! restored by [`Tree::fix_parents`](crate::ir::Tree::fix_parents) after edits.

use crate::ir::literal::LiteralValue;
use crate::ir::marker::MarkerSet;
use crate::ir::operator::{AssignOperator, BinaryOperator, PostfixOperator, PrefixOperator};
use crate::ir::types::JType;
use crate::ir::variable::VarId;
use bitflags::bitflags;
use jack_common::{SourceInfo, Symbol};
use std::fmt;

/// Arena handle of a node; equality is node identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Access and property flags of classes, fields and methods
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        const PUBLIC = 1 << 0;
        const PRIVATE = 1 << 1;
        const PROTECTED = 1 << 2;
        const STATIC = 1 << 3;
        const FINAL = 1 << 4;
        const ABSTRACT = 1 << 5;
        const NATIVE = 1 << 6;
        const SYNCHRONIZED = 1 << 7;
        const SYNTHETIC = 1 << 8;
    }
}

/// A node of the IR tree
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Node whose slot currently holds this node
    pub parent: Option<NodeId>,
    pub source: SourceInfo,
    pub markers: MarkerSet,
}

impl Node {
    pub fn new(kind: NodeKind, source: SourceInfo) -> Self {
        Self {
            kind,
            parent: None,
            source,
            markers: MarkerSet::default(),
        }
    }

    pub fn tag(&self) -> NodeTag {
        self.kind.tag()
    }
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Declarations
    Program {
        classes: Vec<NodeId>,
    },
    Class {
        name: Symbol,
        modifiers: Modifiers,
        super_class: Option<Symbol>,
        fields: Vec<NodeId>,
        methods: Vec<NodeId>,
        /// Declared outside the compilation unit (library type)
        external: bool,
    },
    Field {
        name: Symbol,
        ty: JType,
        modifiers: Modifiers,
        initial_value: Option<NodeId>,
    },
    Method {
        name: Symbol,
        return_type: JType,
        modifiers: Modifiers,
        params: Vec<VarId>,
        this_var: Option<VarId>,
        locals: Vec<VarId>,
        body: Option<NodeId>,
    },

    // Statements
    Block {
        statements: Vec<NodeId>,
    },
    ExpressionStatement {
        expr: NodeId,
    },
    If {
        condition: NodeId,
        then_stmt: NodeId,
        else_stmt: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        condition: NodeId,
    },
    For {
        initializers: Vec<NodeId>,
        condition: Option<NodeId>,
        increments: Vec<NodeId>,
        body: NodeId,
    },
    Return {
        expr: Option<NodeId>,
    },
    Throw {
        expr: NodeId,
    },
    Break {
        label: Option<Symbol>,
    },
    Continue {
        label: Option<Symbol>,
    },
    Labeled {
        label: Symbol,
        body: NodeId,
    },
    Switch {
        selector: NodeId,
        body: NodeId,
    },
    /// Case label inside a switch body; `None` is `default:`
    Case {
        value: Option<NodeId>,
    },
    Try {
        body: NodeId,
        catches: Vec<NodeId>,
        finally: Option<NodeId>,
    },
    Catch {
        exception: VarId,
        catch_types: Vec<JType>,
        body: NodeId,
    },
    Synchronized {
        lock: NodeId,
        body: NodeId,
    },
    Nop,

    // Expressions
    Literal(LiteralValue),
    LocalRef(VarId),
    ParameterRef(VarId),
    ThisRef(VarId),
    Binary {
        op: BinaryOperator,
        lhs: NodeId,
        rhs: NodeId,
        ty: JType,
    },
    Assign {
        op: AssignOperator,
        lhs: NodeId,
        rhs: NodeId,
    },
    Prefix {
        op: PrefixOperator,
        operand: NodeId,
        ty: JType,
    },
    Postfix {
        op: PostfixOperator,
        operand: NodeId,
    },
    Cast {
        ty: JType,
        expr: NodeId,
    },
    Conditional {
        condition: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
        ty: JType,
    },
    InstanceOf {
        test_type: JType,
        expr: NodeId,
    },
    MethodCall {
        receiver: Option<NodeId>,
        class: Symbol,
        method: Symbol,
        args: Vec<NodeId>,
        return_type: JType,
        is_static: bool,
    },
    NewInstance {
        class: Symbol,
        args: Vec<NodeId>,
    },
    NewArray {
        element: JType,
        dims: Vec<NodeId>,
        initializers: Vec<NodeId>,
    },
    ArrayRef {
        array: NodeId,
        index: NodeId,
        ty: JType,
    },
    ArrayLength {
        array: NodeId,
    },
    FieldRef {
        receiver: Option<NodeId>,
        class: Symbol,
        field: Symbol,
        ty: JType,
    },
    /// Comma expression: evaluates every element, yields the last
    MultiExpression {
        exprs: Vec<NodeId>,
    },
    /// Placeholder for the exception value at the start of a catch block
    ExceptionRuntimeValue {
        ty: JType,
    },
}

/// Fieldless discriminant of [`NodeKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeTag {
    Program,
    Class,
    Field,
    Method,
    Block,
    ExpressionStatement,
    If,
    While,
    DoWhile,
    For,
    Return,
    Throw,
    Break,
    Continue,
    Labeled,
    Switch,
    Case,
    Try,
    Catch,
    Synchronized,
    Nop,
    Literal,
    LocalRef,
    ParameterRef,
    ThisRef,
    Binary,
    Assign,
    Prefix,
    Postfix,
    Cast,
    Conditional,
    InstanceOf,
    MethodCall,
    NewInstance,
    NewArray,
    ArrayRef,
    ArrayLength,
    FieldRef,
    MultiExpression,
    ExceptionRuntimeValue,
}

impl NodeTag {
    pub fn name(self) -> &'static str {
        match self {
            NodeTag::Program => "Program",
            NodeTag::Class => "Class",
            NodeTag::Field => "Field",
            NodeTag::Method => "Method",
            NodeTag::Block => "Block",
            NodeTag::ExpressionStatement => "ExpressionStatement",
            NodeTag::If => "If",
            NodeTag::While => "While",
            NodeTag::DoWhile => "DoWhile",
            NodeTag::For => "For",
            NodeTag::Return => "Return",
            NodeTag::Throw => "Throw",
            NodeTag::Break => "Break",
            NodeTag::Continue => "Continue",
            NodeTag::Labeled => "Labeled",
            NodeTag::Switch => "Switch",
            NodeTag::Case => "Case",
            NodeTag::Try => "Try",
            NodeTag::Catch => "Catch",
            NodeTag::Synchronized => "Synchronized",
            NodeTag::Nop => "Nop",
            NodeTag::Literal => "Literal",
            NodeTag::LocalRef => "LocalRef",
            NodeTag::ParameterRef => "ParameterRef",
            NodeTag::ThisRef => "ThisRef",
            NodeTag::Binary => "Binary",
            NodeTag::Assign => "Assign",
            NodeTag::Prefix => "Prefix",
            NodeTag::Postfix => "Postfix",
            NodeTag::Cast => "Cast",
            NodeTag::Conditional => "Conditional",
            NodeTag::InstanceOf => "InstanceOf",
            NodeTag::MethodCall => "MethodCall",
            NodeTag::NewInstance => "NewInstance",
            NodeTag::NewArray => "NewArray",
            NodeTag::ArrayRef => "ArrayRef",
            NodeTag::ArrayLength => "ArrayLength",
            NodeTag::FieldRef => "FieldRef",
            NodeTag::MultiExpression => "MultiExpression",
            NodeTag::ExceptionRuntimeValue => "ExceptionRuntimeValue",
        }
    }

    pub fn is_declaration(self) -> bool {
        matches!(self, NodeTag::Program | NodeTag::Class | NodeTag::Field | NodeTag::Method)
    }

    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeTag::Block
                | NodeTag::ExpressionStatement
                | NodeTag::If
                | NodeTag::While
                | NodeTag::DoWhile
                | NodeTag::For
                | NodeTag::Return
                | NodeTag::Throw
                | NodeTag::Break
                | NodeTag::Continue
                | NodeTag::Labeled
                | NodeTag::Switch
                | NodeTag::Case
                | NodeTag::Try
                | NodeTag::Catch
                | NodeTag::Synchronized
                | NodeTag::Nop
        )
    }

    pub fn is_expression(self) -> bool {
        !self.is_declaration() && !self.is_statement()
    }

    /// Local, parameter and `this` references
    pub fn is_variable_ref(self) -> bool {
        matches!(self, NodeTag::LocalRef | NodeTag::ParameterRef | NodeTag::ThisRef)
    }

    /// Check whether a node of this kind may sit in a slot of `parent`
    pub fn check_validity(self, parent: Option<NodeTag>) -> bool {
        let Some(parent) = parent else {
            return self == NodeTag::Program;
        };
        match self {
            NodeTag::Program => false,
            NodeTag::Class => parent == NodeTag::Program,
            NodeTag::Field | NodeTag::Method => parent == NodeTag::Class,
            NodeTag::Case => parent == NodeTag::Block,
            NodeTag::Catch => parent == NodeTag::Try,
            _ if self.is_statement() => parent == NodeTag::Method || (parent.is_statement() && parent.holds_statements()),
            _ => parent.is_expression() || parent == NodeTag::Field || parent.holds_expressions(),
        }
    }

    fn holds_statements(self) -> bool {
        matches!(
            self,
            NodeTag::Block
                | NodeTag::If
                | NodeTag::While
                | NodeTag::DoWhile
                | NodeTag::For
                | NodeTag::Labeled
                | NodeTag::Switch
                | NodeTag::Try
                | NodeTag::Catch
                | NodeTag::Synchronized
        )
    }

    fn holds_expressions(self) -> bool {
        matches!(
            self,
            NodeTag::ExpressionStatement
                | NodeTag::If
                | NodeTag::While
                | NodeTag::DoWhile
                | NodeTag::For
                | NodeTag::Return
                | NodeTag::Throw
                | NodeTag::Switch
                | NodeTag::Case
                | NodeTag::Synchronized
        )
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl NodeKind {
    pub fn tag(&self) -> NodeTag {
        match self {
            NodeKind::Program { .. } => NodeTag::Program,
            NodeKind::Class { .. } => NodeTag::Class,
            NodeKind::Field { .. } => NodeTag::Field,
            NodeKind::Method { .. } => NodeTag::Method,
            NodeKind::Block { .. } => NodeTag::Block,
            NodeKind::ExpressionStatement { .. } => NodeTag::ExpressionStatement,
            NodeKind::If { .. } => NodeTag::If,
            NodeKind::While { .. } => NodeTag::While,
            NodeKind::DoWhile { .. } => NodeTag::DoWhile,
            NodeKind::For { .. } => NodeTag::For,
            NodeKind::Return { .. } => NodeTag::Return,
            NodeKind::Throw { .. } => NodeTag::Throw,
            NodeKind::Break { .. } => NodeTag::Break,
            NodeKind::Continue { .. } => NodeTag::Continue,
            NodeKind::Labeled { .. } => NodeTag::Labeled,
            NodeKind::Switch { .. } => NodeTag::Switch,
            NodeKind::Case { .. } => NodeTag::Case,
            NodeKind::Try { .. } => NodeTag::Try,
            NodeKind::Catch { .. } => NodeTag::Catch,
            NodeKind::Synchronized { .. } => NodeTag::Synchronized,
            NodeKind::Nop => NodeTag::Nop,
            NodeKind::Literal(_) => NodeTag::Literal,
            NodeKind::LocalRef(_) => NodeTag::LocalRef,
            NodeKind::ParameterRef(_) => NodeTag::ParameterRef,
            NodeKind::ThisRef(_) => NodeTag::ThisRef,
            NodeKind::Binary { .. } => NodeTag::Binary,
            NodeKind::Assign { .. } => NodeTag::Assign,
            NodeKind::Prefix { .. } => NodeTag::Prefix,
            NodeKind::Postfix { .. } => NodeTag::Postfix,
            NodeKind::Cast { .. } => NodeTag::Cast,
            NodeKind::Conditional { .. } => NodeTag::Conditional,
            NodeKind::InstanceOf { .. } => NodeTag::InstanceOf,
            NodeKind::MethodCall { .. } => NodeTag::MethodCall,
            NodeKind::NewInstance { .. } => NodeTag::NewInstance,
            NodeKind::NewArray { .. } => NodeTag::NewArray,
            NodeKind::ArrayRef { .. } => NodeTag::ArrayRef,
            NodeKind::ArrayLength { .. } => NodeTag::ArrayLength,
            NodeKind::FieldRef { .. } => NodeTag::FieldRef,
            NodeKind::MultiExpression { .. } => NodeTag::MultiExpression,
            NodeKind::ExceptionRuntimeValue { .. } => NodeTag::ExceptionRuntimeValue,
        }
    }

    /// Variable behind a local, parameter or `this` reference
    pub fn variable(&self) -> Option<VarId> {
        match self {
            NodeKind::LocalRef(var) | NodeKind::ParameterRef(var) | NodeKind::ThisRef(var) => Some(*var),
            _ => None,
        }
    }

    pub fn literal(&self) -> Option<&LiteralValue> {
        match self {
            NodeKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Children in declared slot order
    pub fn children(&self) -> Vec<NodeId> {
        let mut children = Vec::new();
        self.for_each_child(|child| children.push(child));
        children
    }

    pub fn for_each_child(&self, mut f: impl FnMut(NodeId)) {
        match self {
            NodeKind::Program { classes } => classes.iter().copied().for_each(f),
            NodeKind::Class { fields, methods, .. } => fields.iter().chain(methods).copied().for_each(f),
            NodeKind::Field { initial_value, .. } => initial_value.iter().copied().for_each(f),
            NodeKind::Method { body, .. } => body.iter().copied().for_each(f),
            NodeKind::Block { statements } => statements.iter().copied().for_each(f),
            NodeKind::ExpressionStatement { expr } | NodeKind::Throw { expr } => f(*expr),
            NodeKind::If {
                condition,
                then_stmt,
                else_stmt,
            } => {
                f(*condition);
                f(*then_stmt);
                else_stmt.iter().copied().for_each(f);
            }
            NodeKind::While { condition, body } => {
                f(*condition);
                f(*body);
            }
            NodeKind::DoWhile { body, condition } => {
                f(*body);
                f(*condition);
            }
            NodeKind::For {
                initializers,
                condition,
                increments,
                body,
            } => {
                initializers.iter().copied().for_each(&mut f);
                condition.iter().copied().for_each(&mut f);
                increments.iter().copied().for_each(&mut f);
                f(*body);
            }
            NodeKind::Return { expr } => expr.iter().copied().for_each(f),
            NodeKind::Labeled { body, .. } => f(*body),
            NodeKind::Switch { selector, body } => {
                f(*selector);
                f(*body);
            }
            NodeKind::Case { value } => value.iter().copied().for_each(f),
            NodeKind::Try { body, catches, finally } => {
                f(*body);
                catches.iter().copied().for_each(&mut f);
                finally.iter().copied().for_each(f);
            }
            NodeKind::Catch { body, .. } => f(*body),
            NodeKind::Synchronized { lock, body } => {
                f(*lock);
                f(*body);
            }
            NodeKind::Binary { lhs, rhs, .. } | NodeKind::Assign { lhs, rhs, .. } => {
                f(*lhs);
                f(*rhs);
            }
            NodeKind::Prefix { operand, .. } | NodeKind::Postfix { operand, .. } => f(*operand),
            NodeKind::Cast { expr, .. } | NodeKind::InstanceOf { expr, .. } => f(*expr),
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                f(*condition);
                f(*then_expr);
                f(*else_expr);
            }
            NodeKind::MethodCall { receiver, args, .. } => receiver.iter().chain(args).copied().for_each(f),
            NodeKind::NewInstance { args, .. } => args.iter().copied().for_each(f),
            NodeKind::NewArray { dims, initializers, .. } => dims.iter().chain(initializers).copied().for_each(f),
            NodeKind::ArrayRef { array, index, .. } => {
                f(*array);
                f(*index);
            }
            NodeKind::ArrayLength { array } => f(*array),
            NodeKind::FieldRef { receiver, .. } => receiver.iter().copied().for_each(f),
            NodeKind::MultiExpression { exprs } => exprs.iter().copied().for_each(f),
            NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Nop
            | NodeKind::Literal(_)
            | NodeKind::LocalRef(_)
            | NodeKind::ParameterRef(_)
            | NodeKind::ThisRef(_)
            | NodeKind::ExceptionRuntimeValue { .. } => {}
        }
    }

    /// Visit every child slot mutably, in declared slot order
    pub fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut NodeId)) {
        match self {
            NodeKind::Program { classes } => classes.iter_mut().for_each(f),
            NodeKind::Class { fields, methods, .. } => fields.iter_mut().chain(methods.iter_mut()).for_each(f),
            NodeKind::Field { initial_value, .. } => initial_value.iter_mut().for_each(f),
            NodeKind::Method { body, .. } => body.iter_mut().for_each(f),
            NodeKind::Block { statements } => statements.iter_mut().for_each(f),
            NodeKind::ExpressionStatement { expr } | NodeKind::Throw { expr } => f(expr),
            NodeKind::If {
                condition,
                then_stmt,
                else_stmt,
            } => {
                f(condition);
                f(then_stmt);
                else_stmt.iter_mut().for_each(f);
            }
            NodeKind::While { condition, body } => {
                f(condition);
                f(body);
            }
            NodeKind::DoWhile { body, condition } => {
                f(body);
                f(condition);
            }
            NodeKind::For {
                initializers,
                condition,
                increments,
                body,
            } => {
                initializers.iter_mut().for_each(&mut f);
                condition.iter_mut().for_each(&mut f);
                increments.iter_mut().for_each(&mut f);
                f(body);
            }
            NodeKind::Return { expr } => expr.iter_mut().for_each(f),
            NodeKind::Labeled { body, .. } => f(body),
            NodeKind::Switch { selector, body } => {
                f(selector);
                f(body);
            }
            NodeKind::Case { value } => value.iter_mut().for_each(f),
            NodeKind::Try { body, catches, finally } => {
                f(body);
                catches.iter_mut().for_each(&mut f);
                finally.iter_mut().for_each(f);
            }
            NodeKind::Catch { body, .. } => f(body),
            NodeKind::Synchronized { lock, body } => {
                f(lock);
                f(body);
            }
            NodeKind::Binary { lhs, rhs, .. } | NodeKind::Assign { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            NodeKind::Prefix { operand, .. } | NodeKind::Postfix { operand, .. } => f(operand),
            NodeKind::Cast { expr, .. } | NodeKind::InstanceOf { expr, .. } => f(expr),
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                f(condition);
                f(then_expr);
                f(else_expr);
            }
            NodeKind::MethodCall { receiver, args, .. } => receiver.iter_mut().chain(args.iter_mut()).for_each(f),
            NodeKind::NewInstance { args, .. } => args.iter_mut().for_each(f),
            NodeKind::NewArray { dims, initializers, .. } => dims.iter_mut().chain(initializers.iter_mut()).for_each(f),
            NodeKind::ArrayRef { array, index, .. } => {
                f(array);
                f(index);
            }
            NodeKind::ArrayLength { array } => f(array),
            NodeKind::FieldRef { receiver, .. } => receiver.iter_mut().for_each(f),
            NodeKind::MultiExpression { exprs } => exprs.iter_mut().for_each(f),
            NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Nop
            | NodeKind::Literal(_)
            | NodeKind::LocalRef(_)
            | NodeKind::ParameterRef(_)
            | NodeKind::ThisRef(_)
            | NodeKind::ExceptionRuntimeValue { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_follow_slot_order() {
        let kind = NodeKind::For {
            initializers: vec![NodeId(1), NodeId(2)],
            condition: Some(NodeId(3)),
            increments: vec![NodeId(4)],
            body: NodeId(5),
        };
        assert_eq!(kind.children(), vec![NodeId(1), NodeId(2), NodeId(3), NodeId(4), NodeId(5)]);

        let kind = NodeKind::DoWhile {
            body: NodeId(7),
            condition: NodeId(6),
        };
        assert_eq!(kind.children(), vec![NodeId(7), NodeId(6)]);
    }

    #[test]
    fn test_for_each_child_mut_rewrites_slots() {
        let mut kind = NodeKind::Conditional {
            condition: NodeId(1),
            then_expr: NodeId(2),
            else_expr: NodeId(3),
            ty: JType::INT,
        };
        kind.for_each_child_mut(|child| child.0 += 10);
        assert_eq!(kind.children(), vec![NodeId(11), NodeId(12), NodeId(13)]);
    }

    #[test]
    fn test_tag_categories() {
        assert!(NodeTag::Method.is_declaration());
        assert!(NodeTag::Nop.is_statement());
        assert!(NodeTag::Assign.is_expression());
        assert!(NodeTag::ThisRef.is_variable_ref());
        assert!(!NodeTag::Literal.is_variable_ref());
    }

    #[test]
    fn test_check_validity() {
        assert!(NodeTag::Program.check_validity(None));
        assert!(!NodeTag::Block.check_validity(None));
        assert!(NodeTag::Block.check_validity(Some(NodeTag::Method)));
        assert!(NodeTag::Return.check_validity(Some(NodeTag::Block)));
        assert!(!NodeTag::Return.check_validity(Some(NodeTag::Binary)));
        assert!(NodeTag::Literal.check_validity(Some(NodeTag::Binary)));
        assert!(NodeTag::Literal.check_validity(Some(NodeTag::Return)));
        assert!(!NodeTag::Literal.check_validity(Some(NodeTag::Block)));
        assert!(NodeTag::Catch.check_validity(Some(NodeTag::Try)));
        assert!(!NodeTag::Method.check_validity(Some(NodeTag::Program)));
    }
}
