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

//! Construction helpers used by the front end and by tests
//!
//! Every helper allocates detached nodes with an unknown source tag; callers
//! attach them through a parent helper or through the mutation protocol.

use crate::ir::error::{IrError, IrResult};
use crate::ir::literal::LiteralValue;
use crate::ir::node::{Modifiers, NodeId, NodeKind, NodeTag};
use crate::ir::operator::{AssignOperator, BinaryOperator, PostfixOperator, PrefixOperator};
use crate::ir::tree::Tree;
use crate::ir::types::{JType, PrimitiveType};
use crate::ir::variable::{VarId, Variable, VariableKind};
use crate::mutation::EditKind;
use jack_common::SourceInfo;

impl Tree {
    fn leaf(&mut self, kind: NodeKind) -> NodeId {
        self.add(kind, SourceInfo::unknown())
    }

    // Declarations

    /// Declare a class in the program
    pub fn class(&mut self, name: &str, modifiers: Modifiers) -> NodeId {
        self.declare_class(name, modifiers, false)
    }

    /// Declare a library class whose members are loaded on demand
    pub fn external_class(&mut self, name: &str) -> NodeId {
        self.declare_class(name, Modifiers::PUBLIC, true)
    }

    fn declare_class(&mut self, name: &str, modifiers: Modifiers, external: bool) -> NodeId {
        let name = self.intern(name);
        let class = self.leaf(NodeKind::Class {
            name,
            modifiers,
            super_class: None,
            fields: Vec::new(),
            methods: Vec::new(),
            external,
        });
        let root = self.root();
        if let NodeKind::Program { classes } = self.kind_mut(root) {
            classes.push(class);
        }
        self.set_parent(class, Some(root));
        class
    }

    pub fn field(&mut self, class: NodeId, name: &str, ty: JType, modifiers: Modifiers) -> NodeId {
        let name = self.intern(name);
        let field = self.leaf(NodeKind::Field {
            name,
            ty,
            modifiers,
            initial_value: None,
        });
        if let NodeKind::Class { fields, .. } = self.kind_mut(class) {
            fields.push(field);
            self.set_parent(field, Some(class));
        }
        field
    }

    /// Declare a method; abstract and native methods get no body, instance
    /// methods get a `this` variable
    pub fn method(&mut self, class: NodeId, name: &str, return_type: JType, modifiers: Modifiers) -> NodeId {
        let name = self.intern(name);
        let body = (!modifiers.intersects(Modifiers::ABSTRACT | Modifiers::NATIVE)).then(|| self.block(Vec::new()));
        let class_name = match self.kind(class) {
            NodeKind::Class { name, .. } if !modifiers.contains(Modifiers::STATIC) => Some(*name),
            _ => None,
        };
        let this_var = class_name.map(|class_name| {
            let this = self.intern("this");
            self.add_variable(Variable::this(this, JType::Class(class_name)))
        });
        let method = self.leaf(NodeKind::Method {
            name,
            return_type,
            modifiers,
            params: Vec::new(),
            this_var,
            locals: Vec::new(),
            body,
        });
        if let NodeKind::Class { methods, .. } = self.kind_mut(class) {
            methods.push(method);
            self.set_parent(method, Some(class));
        }
        method
    }

    pub fn body(&self, method: NodeId) -> Option<NodeId> {
        match self.kind(method) {
            NodeKind::Method { body, .. } => *body,
            _ => None,
        }
    }

    pub fn this_var(&self, method: NodeId) -> Option<VarId> {
        match self.kind(method) {
            NodeKind::Method { this_var, .. } => *this_var,
            _ => None,
        }
    }

    pub fn parameter(&mut self, method: NodeId, name: &str, ty: JType) -> VarId {
        let var = self.add_variable(Variable::parameter(self.intern(name), ty));
        if let NodeKind::Method { params, .. } = self.kind_mut(method) {
            params.push(var);
        }
        var
    }

    pub fn local(&mut self, method: NodeId, name: &str, ty: JType) -> VarId {
        let var = self.add_variable(Variable::local(self.intern(name), ty));
        self.declare_local(method, var)
    }

    /// Compiler-introduced local
    pub fn synthetic_local(&mut self, method: NodeId, name: &str, ty: JType) -> VarId {
        let var = self.add_variable(Variable::synthetic(self.intern(name), ty));
        self.declare_local(method, var)
    }

    fn declare_local(&mut self, method: NodeId, var: VarId) -> VarId {
        if let NodeKind::Method { locals, .. } = self.kind_mut(method) {
            locals.push(var);
        }
        var
    }

    /// Append a statement to a block
    pub fn append(&mut self, block: NodeId, stmt: NodeId) -> IrResult<()> {
        if self.tag(block) != NodeTag::Block {
            return Err(IrError::UnsupportedOperation {
                operation: EditKind::InsertAfter,
                parent: self.tag(block),
                existing: self.tag(block),
                new: Some(self.tag(stmt)),
                location: self.source(block).clone(),
            });
        }
        if let NodeKind::Block { statements } = self.kind_mut(block) {
            statements.push(stmt);
        }
        self.fix_parents(stmt, Some(block));
        Ok(())
    }

    // Expressions

    pub fn new_literal(&mut self, value: LiteralValue) -> NodeId {
        self.leaf(NodeKind::Literal(value))
    }

    pub fn int(&mut self, value: i32) -> NodeId {
        self.new_literal(LiteralValue::Int(value))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.new_literal(LiteralValue::Boolean(value))
    }

    pub fn null(&mut self) -> NodeId {
        self.new_literal(LiteralValue::Null)
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        let symbol = self.intern(value);
        self.new_literal(LiteralValue::String(symbol))
    }

    /// Reference to `var`, of the kind matching the variable
    pub fn var_ref(&mut self, var: VarId) -> NodeId {
        let kind = match self.variable(var).kind {
            VariableKind::Local => NodeKind::LocalRef(var),
            VariableKind::Parameter => NodeKind::ParameterRef(var),
            VariableKind::This => NodeKind::ThisRef(var),
        };
        self.leaf(kind)
    }

    /// Binary expression typed by the usual promotion rules
    pub fn binary(&mut self, op: BinaryOperator, lhs: NodeId, rhs: NodeId) -> NodeId {
        let ty = self.binary_type(op, lhs, rhs);
        self.binary_typed(op, lhs, rhs, ty)
    }

    pub fn binary_typed(&mut self, op: BinaryOperator, lhs: NodeId, rhs: NodeId, ty: JType) -> NodeId {
        self.leaf(NodeKind::Binary { op, lhs, rhs, ty })
    }

    fn binary_type(&self, op: BinaryOperator, lhs: NodeId, rhs: NodeId) -> JType {
        if op.is_comparison() || op.is_conditional() {
            return JType::BOOLEAN;
        }
        let lhs = self.expression_type(lhs);
        let rhs = self.expression_type(rhs);
        if op.is_shift() {
            return lhs.and_then(|ty| ty.as_primitive()).map(|ty| JType::Primitive(ty.promoted())).unwrap_or(JType::INT);
        }
        match (lhs, rhs) {
            (Some(JType::Primitive(a)), Some(JType::Primitive(b))) => a.binary_promotion(b).map(JType::Primitive).unwrap_or(JType::INT),
            (Some(class @ JType::Class(_)), _) | (_, Some(class @ JType::Class(_))) => class,
            _ => JType::INT,
        }
    }

    pub fn assign(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.compound_assign(AssignOperator::Assign, lhs, rhs)
    }

    pub fn compound_assign(&mut self, op: AssignOperator, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.leaf(NodeKind::Assign { op, lhs, rhs })
    }

    pub fn prefix(&mut self, op: PrefixOperator, operand: NodeId) -> NodeId {
        let ty = match op {
            PrefixOperator::Not => JType::BOOLEAN,
            _ => match self.expression_type(operand) {
                Some(JType::Primitive(primitive)) if !op.is_increment() => JType::Primitive(primitive.promoted()),
                Some(ty) => ty,
                None => JType::INT,
            },
        };
        self.leaf(NodeKind::Prefix { op, operand, ty })
    }

    pub fn not(&mut self, operand: NodeId) -> NodeId {
        self.prefix(PrefixOperator::Not, operand)
    }

    pub fn postfix(&mut self, op: PostfixOperator, operand: NodeId) -> NodeId {
        self.leaf(NodeKind::Postfix { op, operand })
    }

    pub fn cast(&mut self, ty: JType, expr: NodeId) -> NodeId {
        self.leaf(NodeKind::Cast { ty, expr })
    }

    pub fn primitive_cast(&mut self, ty: PrimitiveType, expr: NodeId) -> NodeId {
        self.cast(JType::Primitive(ty), expr)
    }

    pub fn conditional(&mut self, condition: NodeId, then_expr: NodeId, else_expr: NodeId) -> NodeId {
        let ty = self.conditional_type(then_expr, else_expr);
        self.leaf(NodeKind::Conditional {
            condition,
            then_expr,
            else_expr,
            ty,
        })
    }

    /// Numeric branches are promoted; `null` takes the type of the other branch
    fn conditional_type(&self, then_expr: NodeId, else_expr: NodeId) -> JType {
        match (self.expression_type(then_expr), self.expression_type(else_expr)) {
            (Some(a), Some(b)) if a == b => a,
            (Some(JType::Primitive(a)), Some(JType::Primitive(b))) => {
                let narrowed = if b == PrimitiveType::Int && self.fits_int_constant(else_expr, a) {
                    a
                } else if a == PrimitiveType::Int && self.fits_int_constant(then_expr, b) {
                    b
                } else {
                    a.binary_promotion(b).unwrap_or(a)
                };
                JType::Primitive(narrowed)
            }
            (Some(JType::Null), Some(other)) | (Some(other), Some(JType::Null)) => other,
            (Some(ty), _) | (None, Some(ty)) => ty,
            (None, None) => JType::Null,
        }
    }

    /// Int literal representable in the byte, short or char type `small`
    fn fits_int_constant(&self, constant: NodeId, small: PrimitiveType) -> bool {
        let Some(value @ LiteralValue::Int(_)) = self.literal(constant) else {
            return false;
        };
        matches!(small, PrimitiveType::Byte | PrimitiveType::Short | PrimitiveType::Char)
            && value.coerce(small).and_then(|narrow| narrow.coerce(PrimitiveType::Int)).as_ref() == Some(value)
    }

    pub fn instance_of(&mut self, test_type: JType, expr: NodeId) -> NodeId {
        self.leaf(NodeKind::InstanceOf { test_type, expr })
    }

    /// Method call; a call without receiver is static
    pub fn call(&mut self, receiver: Option<NodeId>, class: &str, method: &str, args: Vec<NodeId>, return_type: JType) -> NodeId {
        let class = self.intern(class);
        let method = self.intern(method);
        self.leaf(NodeKind::MethodCall {
            is_static: receiver.is_none(),
            receiver,
            class,
            method,
            args,
            return_type,
        })
    }

    pub fn new_instance(&mut self, class: &str, args: Vec<NodeId>) -> NodeId {
        let class = self.intern(class);
        self.leaf(NodeKind::NewInstance { class, args })
    }

    pub fn new_array(&mut self, element: JType, dims: Vec<NodeId>) -> NodeId {
        self.leaf(NodeKind::NewArray {
            element,
            dims,
            initializers: Vec::new(),
        })
    }

    pub fn array_ref(&mut self, array: NodeId, index: NodeId) -> NodeId {
        let ty = match self.expression_type(array) {
            Some(JType::Array(element)) => *element,
            _ => JType::INT,
        };
        self.leaf(NodeKind::ArrayRef { array, index, ty })
    }

    pub fn array_length(&mut self, array: NodeId) -> NodeId {
        self.leaf(NodeKind::ArrayLength { array })
    }

    pub fn field_ref(&mut self, receiver: Option<NodeId>, class: &str, field: &str, ty: JType) -> NodeId {
        let class = self.intern(class);
        let field = self.intern(field);
        self.leaf(NodeKind::FieldRef { receiver, class, field, ty })
    }

    pub fn multi_expression(&mut self, exprs: Vec<NodeId>) -> NodeId {
        self.leaf(NodeKind::MultiExpression { exprs })
    }

    pub fn exception_value(&mut self, ty: JType) -> NodeId {
        self.leaf(NodeKind::ExceptionRuntimeValue { ty })
    }

    // Statements

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.leaf(NodeKind::ExpressionStatement { expr })
    }

    /// `var = value;`
    pub fn assign_stmt(&mut self, var: VarId, value: NodeId) -> NodeId {
        let target = self.var_ref(var);
        let assign = self.assign(target, value);
        self.expr_stmt(assign)
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.leaf(NodeKind::Block { statements })
    }

    pub fn if_stmt(&mut self, condition: NodeId, then_stmt: NodeId, else_stmt: Option<NodeId>) -> NodeId {
        self.leaf(NodeKind::If {
            condition,
            then_stmt,
            else_stmt,
        })
    }

    pub fn while_stmt(&mut self, condition: NodeId, body: NodeId) -> NodeId {
        self.leaf(NodeKind::While { condition, body })
    }

    pub fn do_while_stmt(&mut self, body: NodeId, condition: NodeId) -> NodeId {
        self.leaf(NodeKind::DoWhile { body, condition })
    }

    pub fn for_stmt(&mut self, initializers: Vec<NodeId>, condition: Option<NodeId>, increments: Vec<NodeId>, body: NodeId) -> NodeId {
        self.leaf(NodeKind::For {
            initializers,
            condition,
            increments,
            body,
        })
    }

    pub fn return_stmt(&mut self, expr: Option<NodeId>) -> NodeId {
        self.leaf(NodeKind::Return { expr })
    }

    pub fn throw_stmt(&mut self, expr: NodeId) -> NodeId {
        self.leaf(NodeKind::Throw { expr })
    }

    pub fn break_stmt(&mut self) -> NodeId {
        self.leaf(NodeKind::Break { label: None })
    }

    pub fn continue_stmt(&mut self) -> NodeId {
        self.leaf(NodeKind::Continue { label: None })
    }

    pub fn labeled(&mut self, label: &str, body: NodeId) -> NodeId {
        let label = self.intern(label);
        self.leaf(NodeKind::Labeled { label, body })
    }

    pub fn switch_stmt(&mut self, selector: NodeId, body: NodeId) -> NodeId {
        self.leaf(NodeKind::Switch { selector, body })
    }

    pub fn case(&mut self, value: Option<NodeId>) -> NodeId {
        self.leaf(NodeKind::Case { value })
    }

    pub fn try_stmt(&mut self, body: NodeId, catches: Vec<NodeId>, finally: Option<NodeId>) -> NodeId {
        self.leaf(NodeKind::Try { body, catches, finally })
    }

    pub fn catch(&mut self, exception: VarId, catch_types: Vec<JType>, body: NodeId) -> NodeId {
        self.leaf(NodeKind::Catch {
            exception,
            catch_types,
            body,
        })
    }

    pub fn synchronized(&mut self, lock: NodeId, body: NodeId) -> NodeId {
        self.leaf(NodeKind::Synchronized { lock, body })
    }

    pub fn nop(&mut self) -> NodeId {
        self.leaf(NodeKind::Nop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jack_common::Registry;
    use std::sync::Arc;

    #[test]
    fn test_method_declares_this_for_instance_methods() {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let instance = tree.method(class, "run", JType::VOID, Modifiers::PUBLIC);
        let stat = tree.method(class, "main", JType::VOID, Modifiers::STATIC);
        let native = tree.method(class, "peek", JType::INT, Modifiers::NATIVE);

        assert!(tree.this_var(instance).is_some());
        assert!(tree.this_var(stat).is_none());
        assert!(tree.body(native).is_none());
        assert!(tree.validate(tree.root()).is_ok());
    }

    #[test]
    fn test_expression_types() {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let class = tree.class("Demo", Modifiers::PUBLIC);
        let method = tree.method(class, "run", JType::VOID, Modifiers::STATIC);
        let b = tree.local(method, "b", JType::BYTE);
        let l = tree.parameter(method, "l", JType::LONG);

        let b_ref = tree.var_ref(b);
        let neg = tree.prefix(PrefixOperator::Neg, b_ref);
        assert_eq!(tree.expression_type(neg), Some(JType::INT));

        let b_ref = tree.var_ref(b);
        let l_ref = tree.var_ref(l);
        assert_eq!(tree.tag(l_ref), NodeTag::ParameterRef);
        let sum = tree.binary(BinaryOperator::Add, b_ref, l_ref);
        assert_eq!(tree.expression_type(sum), Some(JType::LONG));

        let one = tree.int(1);
        let two = tree.int(2);
        let lt = tree.binary(BinaryOperator::Lt, one, two);
        assert_eq!(tree.expression_type(lt), Some(JType::BOOLEAN));

        let text = tree.string("hi");
        let ty = tree.expression_type(text);
        assert_eq!(ty, Some(JType::Class(tree.intern("java.lang.String"))));
    }

    #[test]
    fn test_conditional_promotes_branch_types() {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let cond = tree.boolean(false);
        let one = tree.int(1);
        let two = tree.new_literal(LiteralValue::Long(2));
        let mixed = tree.conditional(cond, one, two);
        assert_eq!(tree.expression_type(mixed), Some(JType::LONG));

        let cond = tree.boolean(true);
        let nothing = tree.null();
        let text = tree.string("hi");
        let reference = tree.conditional(cond, nothing, text);
        assert_eq!(tree.expression_type(reference), Some(JType::Class(tree.intern("java.lang.String"))));

        // An int constant that fits keeps the narrow branch type.
        let cond = tree.boolean(true);
        let small = tree.new_literal(LiteralValue::Byte(3));
        let fits = tree.int(100);
        let narrow = tree.conditional(cond, small, fits);
        assert_eq!(tree.expression_type(narrow), Some(JType::BYTE));

        let cond = tree.boolean(true);
        let small = tree.new_literal(LiteralValue::Byte(3));
        let wide = tree.int(300);
        let promoted = tree.conditional(cond, small, wide);
        assert_eq!(tree.expression_type(promoted), Some(JType::INT));
    }

    #[test]
    fn test_append_rejects_non_blocks() {
        let mut tree = Tree::new(Arc::new(Registry::new()));
        let nop = tree.nop();
        let other = tree.nop();
        assert!(matches!(tree.append(nop, other), Err(IrError::UnsupportedOperation { .. })));
    }
}
