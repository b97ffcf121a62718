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

//! Double-dispatch traversal of the IR
//!
//! Every concrete kind has a `visit_*`/`end_visit_*` pair whose default
//! forwards to the handler of its immediate category, up to
//! [`Visitor::visit_node`]. Overriding `visit_expression` therefore intercepts
//! every expression kind that is not overridden more specifically.
//!
//! ```text
//! node
//! ├── declaration: program, class, field, method
//! ├── statement: block, expression_statement, if, while, ...
//! └── expression
//!     ├── literal
//!     ├── variable_ref: local_ref, parameter_ref, this_ref
//!     ├── binary_operation: binary, assign
//!     ├── unary_operation: prefix, postfix
//!     └── cast, conditional, instance_of, method_call, ...
//! ```

use crate::ir::{IrResult, NodeId, NodeTag, Tree};

macro_rules! forward_to {
    ($($visit:ident, $end:ident => $super_visit:ident, $super_end:ident;)*) => {
        $(
            fn $visit(&mut self, tree: &mut Tree, id: NodeId) -> bool {
                self.$super_visit(tree, id)
            }

            fn $end(&mut self, tree: &mut Tree, id: NodeId) {
                self.$super_end(tree, id)
            }
        )*
    };
}

/// Callbacks of a traversal; `visit_*` returns whether to descend into children
#[allow(unused_variables)]
pub trait Visitor {
    /// Force lazily-loaded class members to be materialized before a class is visited
    fn needs_loading(&self) -> bool {
        false
    }

    fn visit_node(&mut self, tree: &mut Tree, id: NodeId) -> bool {
        true
    }

    fn end_visit_node(&mut self, tree: &mut Tree, id: NodeId) {}

    forward_to! {
        visit_declaration, end_visit_declaration => visit_node, end_visit_node;
        visit_statement, end_visit_statement => visit_node, end_visit_node;
        visit_expression, end_visit_expression => visit_node, end_visit_node;

        visit_program, end_visit_program => visit_declaration, end_visit_declaration;
        visit_class, end_visit_class => visit_declaration, end_visit_declaration;
        visit_field, end_visit_field => visit_declaration, end_visit_declaration;
        visit_method, end_visit_method => visit_declaration, end_visit_declaration;

        visit_block, end_visit_block => visit_statement, end_visit_statement;
        visit_expression_statement, end_visit_expression_statement => visit_statement, end_visit_statement;
        visit_if, end_visit_if => visit_statement, end_visit_statement;
        visit_while, end_visit_while => visit_statement, end_visit_statement;
        visit_do_while, end_visit_do_while => visit_statement, end_visit_statement;
        visit_for, end_visit_for => visit_statement, end_visit_statement;
        visit_return, end_visit_return => visit_statement, end_visit_statement;
        visit_throw, end_visit_throw => visit_statement, end_visit_statement;
        visit_break, end_visit_break => visit_statement, end_visit_statement;
        visit_continue, end_visit_continue => visit_statement, end_visit_statement;
        visit_labeled, end_visit_labeled => visit_statement, end_visit_statement;
        visit_switch, end_visit_switch => visit_statement, end_visit_statement;
        visit_case, end_visit_case => visit_statement, end_visit_statement;
        visit_try, end_visit_try => visit_statement, end_visit_statement;
        visit_catch, end_visit_catch => visit_statement, end_visit_statement;
        visit_synchronized, end_visit_synchronized => visit_statement, end_visit_statement;
        visit_nop, end_visit_nop => visit_statement, end_visit_statement;

        visit_literal, end_visit_literal => visit_expression, end_visit_expression;
        visit_variable_ref, end_visit_variable_ref => visit_expression, end_visit_expression;
        visit_binary_operation, end_visit_binary_operation => visit_expression, end_visit_expression;
        visit_unary_operation, end_visit_unary_operation => visit_expression, end_visit_expression;

        visit_local_ref, end_visit_local_ref => visit_variable_ref, end_visit_variable_ref;
        visit_parameter_ref, end_visit_parameter_ref => visit_variable_ref, end_visit_variable_ref;
        visit_this_ref, end_visit_this_ref => visit_variable_ref, end_visit_variable_ref;

        visit_binary, end_visit_binary => visit_binary_operation, end_visit_binary_operation;
        visit_assign, end_visit_assign => visit_binary_operation, end_visit_binary_operation;

        visit_prefix, end_visit_prefix => visit_unary_operation, end_visit_unary_operation;
        visit_postfix, end_visit_postfix => visit_unary_operation, end_visit_unary_operation;

        visit_cast, end_visit_cast => visit_expression, end_visit_expression;
        visit_conditional, end_visit_conditional => visit_expression, end_visit_expression;
        visit_instance_of, end_visit_instance_of => visit_expression, end_visit_expression;
        visit_method_call, end_visit_method_call => visit_expression, end_visit_expression;
        visit_new_instance, end_visit_new_instance => visit_expression, end_visit_expression;
        visit_new_array, end_visit_new_array => visit_expression, end_visit_expression;
        visit_array_ref, end_visit_array_ref => visit_expression, end_visit_expression;
        visit_array_length, end_visit_array_length => visit_expression, end_visit_expression;
        visit_field_ref, end_visit_field_ref => visit_expression, end_visit_expression;
        visit_multi_expression, end_visit_multi_expression => visit_expression, end_visit_expression;
        visit_exception_runtime_value, end_visit_exception_runtime_value => visit_expression, end_visit_expression;
    }
}

fn dispatch_visit<V: Visitor + ?Sized>(visitor: &mut V, tree: &mut Tree, id: NodeId, tag: NodeTag) -> bool {
    match tag {
        NodeTag::Program => visitor.visit_program(tree, id),
        NodeTag::Class => visitor.visit_class(tree, id),
        NodeTag::Field => visitor.visit_field(tree, id),
        NodeTag::Method => visitor.visit_method(tree, id),
        NodeTag::Block => visitor.visit_block(tree, id),
        NodeTag::ExpressionStatement => visitor.visit_expression_statement(tree, id),
        NodeTag::If => visitor.visit_if(tree, id),
        NodeTag::While => visitor.visit_while(tree, id),
        NodeTag::DoWhile => visitor.visit_do_while(tree, id),
        NodeTag::For => visitor.visit_for(tree, id),
        NodeTag::Return => visitor.visit_return(tree, id),
        NodeTag::Throw => visitor.visit_throw(tree, id),
        NodeTag::Break => visitor.visit_break(tree, id),
        NodeTag::Continue => visitor.visit_continue(tree, id),
        NodeTag::Labeled => visitor.visit_labeled(tree, id),
        NodeTag::Switch => visitor.visit_switch(tree, id),
        NodeTag::Case => visitor.visit_case(tree, id),
        NodeTag::Try => visitor.visit_try(tree, id),
        NodeTag::Catch => visitor.visit_catch(tree, id),
        NodeTag::Synchronized => visitor.visit_synchronized(tree, id),
        NodeTag::Nop => visitor.visit_nop(tree, id),
        NodeTag::Literal => visitor.visit_literal(tree, id),
        NodeTag::LocalRef => visitor.visit_local_ref(tree, id),
        NodeTag::ParameterRef => visitor.visit_parameter_ref(tree, id),
        NodeTag::ThisRef => visitor.visit_this_ref(tree, id),
        NodeTag::Binary => visitor.visit_binary(tree, id),
        NodeTag::Assign => visitor.visit_assign(tree, id),
        NodeTag::Prefix => visitor.visit_prefix(tree, id),
        NodeTag::Postfix => visitor.visit_postfix(tree, id),
        NodeTag::Cast => visitor.visit_cast(tree, id),
        NodeTag::Conditional => visitor.visit_conditional(tree, id),
        NodeTag::InstanceOf => visitor.visit_instance_of(tree, id),
        NodeTag::MethodCall => visitor.visit_method_call(tree, id),
        NodeTag::NewInstance => visitor.visit_new_instance(tree, id),
        NodeTag::NewArray => visitor.visit_new_array(tree, id),
        NodeTag::ArrayRef => visitor.visit_array_ref(tree, id),
        NodeTag::ArrayLength => visitor.visit_array_length(tree, id),
        NodeTag::FieldRef => visitor.visit_field_ref(tree, id),
        NodeTag::MultiExpression => visitor.visit_multi_expression(tree, id),
        NodeTag::ExceptionRuntimeValue => visitor.visit_exception_runtime_value(tree, id),
    }
}

fn dispatch_end_visit<V: Visitor + ?Sized>(visitor: &mut V, tree: &mut Tree, id: NodeId, tag: NodeTag) {
    match tag {
        NodeTag::Program => visitor.end_visit_program(tree, id),
        NodeTag::Class => visitor.end_visit_class(tree, id),
        NodeTag::Field => visitor.end_visit_field(tree, id),
        NodeTag::Method => visitor.end_visit_method(tree, id),
        NodeTag::Block => visitor.end_visit_block(tree, id),
        NodeTag::ExpressionStatement => visitor.end_visit_expression_statement(tree, id),
        NodeTag::If => visitor.end_visit_if(tree, id),
        NodeTag::While => visitor.end_visit_while(tree, id),
        NodeTag::DoWhile => visitor.end_visit_do_while(tree, id),
        NodeTag::For => visitor.end_visit_for(tree, id),
        NodeTag::Return => visitor.end_visit_return(tree, id),
        NodeTag::Throw => visitor.end_visit_throw(tree, id),
        NodeTag::Break => visitor.end_visit_break(tree, id),
        NodeTag::Continue => visitor.end_visit_continue(tree, id),
        NodeTag::Labeled => visitor.end_visit_labeled(tree, id),
        NodeTag::Switch => visitor.end_visit_switch(tree, id),
        NodeTag::Case => visitor.end_visit_case(tree, id),
        NodeTag::Try => visitor.end_visit_try(tree, id),
        NodeTag::Catch => visitor.end_visit_catch(tree, id),
        NodeTag::Synchronized => visitor.end_visit_synchronized(tree, id),
        NodeTag::Nop => visitor.end_visit_nop(tree, id),
        NodeTag::Literal => visitor.end_visit_literal(tree, id),
        NodeTag::LocalRef => visitor.end_visit_local_ref(tree, id),
        NodeTag::ParameterRef => visitor.end_visit_parameter_ref(tree, id),
        NodeTag::ThisRef => visitor.end_visit_this_ref(tree, id),
        NodeTag::Binary => visitor.end_visit_binary(tree, id),
        NodeTag::Assign => visitor.end_visit_assign(tree, id),
        NodeTag::Prefix => visitor.end_visit_prefix(tree, id),
        NodeTag::Postfix => visitor.end_visit_postfix(tree, id),
        NodeTag::Cast => visitor.end_visit_cast(tree, id),
        NodeTag::Conditional => visitor.end_visit_conditional(tree, id),
        NodeTag::InstanceOf => visitor.end_visit_instance_of(tree, id),
        NodeTag::MethodCall => visitor.end_visit_method_call(tree, id),
        NodeTag::NewInstance => visitor.end_visit_new_instance(tree, id),
        NodeTag::NewArray => visitor.end_visit_new_array(tree, id),
        NodeTag::ArrayRef => visitor.end_visit_array_ref(tree, id),
        NodeTag::ArrayLength => visitor.end_visit_array_length(tree, id),
        NodeTag::FieldRef => visitor.end_visit_field_ref(tree, id),
        NodeTag::MultiExpression => visitor.end_visit_multi_expression(tree, id),
        NodeTag::ExceptionRuntimeValue => visitor.end_visit_exception_runtime_value(tree, id),
    }
}

/// Walk the subtree rooted at `id`: enter, children in slot order, leave.
///
/// Children are taken from a snapshot made after `visit_*` returns; a child
/// that a callback detached from `id` in the meantime is skipped.
pub fn accept<V: Visitor + ?Sized>(tree: &mut Tree, id: NodeId, visitor: &mut V) -> IrResult<()> {
    let tag = tree.try_node(id)?.tag();
    if tag == NodeTag::Class && visitor.needs_loading() {
        tree.ensure_loaded(id)?;
    }

    if dispatch_visit(visitor, tree, id, tag) {
        for child in tree.children(id) {
            if tree.parent(child) != Some(id) {
                continue;
            }
            accept(tree, child, visitor)?;
        }
    }

    dispatch_end_visit(visitor, tree, id, tag);
    Ok(())
}
