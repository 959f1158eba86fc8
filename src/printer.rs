//! Pretty-printer for the `parse` subcommand: renders the AST as an
//! indented tree, two spaces per level.

use std::fmt::Write;

use crate::ast::{DeclaredType, Expression, Program, Statement};

pub fn render_program(program: &Program) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Program ({} statements)", program.statements.len());
    for statement in &program.statements {
        render_statement(&mut out, statement, 1);
    }
    out
}

fn render_statement(out: &mut String, statement: &Statement, indent: usize) {
    let pad = "  ".repeat(indent);
    match statement {
        Statement::Print(expr) => {
            let _ = writeln!(out, "{pad}PrintStatement");
            render_expression(out, expr, indent + 1);
        }
        Statement::VarDeclaration {
            name,
            declared_type,
        } => {
            let rendered_type = match declared_type {
                DeclaredType::StringArray { size } if *size > 0 => {
                    format!("{declared_type}[{size}]")
                }
                other => other.to_string(),
            };
            let _ = writeln!(out, "{pad}VarDeclaration: {name} (type: {rendered_type})");
        }
        Statement::Assignment { name, index, value } => {
            let _ = writeln!(out, "{pad}Assignment: {name}");
            if let Some(index) = index {
                let _ = writeln!(out, "{pad}  Index:");
                render_expression(out, index, indent + 2);
            }
            let _ = writeln!(out, "{pad}  Value:");
            render_expression(out, value, indent + 2);
        }
        Statement::ForLoop { condition, body } => {
            let _ = writeln!(out, "{pad}ForLoop");
            render_loop_parts(out, condition, body, indent);
        }
        Statement::WhileLoop { condition, body } => {
            let _ = writeln!(out, "{pad}WhileLoop");
            render_loop_parts(out, condition, body, indent);
        }
        Statement::If {
            condition,
            then_branch,
            else_if_clauses,
            else_branch,
        } => {
            let _ = writeln!(out, "{pad}IfStatement");
            let _ = writeln!(out, "{pad}  Condition:");
            render_expression(out, condition, indent + 2);
            let _ = writeln!(out, "{pad}  Then ({} statements):", then_branch.len());
            for statement in then_branch {
                render_statement(out, statement, indent + 2);
            }
            if !else_if_clauses.is_empty() {
                let _ = writeln!(out, "{pad}  ElseIf clauses ({}):", else_if_clauses.len());
                for clause in else_if_clauses {
                    let _ = writeln!(out, "{pad}    Condition:");
                    render_expression(out, &clause.condition, indent + 3);
                    let _ = writeln!(out, "{pad}    Body ({} statements):", clause.body.len());
                    for statement in &clause.body {
                        render_statement(out, statement, indent + 3);
                    }
                }
            }
            if !else_branch.is_empty() {
                let _ = writeln!(out, "{pad}  Else ({} statements):", else_branch.len());
                for statement in else_branch {
                    render_statement(out, statement, indent + 2);
                }
            }
        }
        Statement::Increment { name, amount } => {
            let _ = writeln!(out, "{pad}IncrementStatement: {name} (amount: {amount})");
        }
        Statement::Read { name } => {
            let _ = writeln!(out, "{pad}ReadStatement: {name}");
        }
    }
}

fn render_loop_parts(
    out: &mut String,
    condition: &Expression,
    body: &[Statement],
    indent: usize,
) {
    let pad = "  ".repeat(indent);
    let _ = writeln!(out, "{pad}  Condition:");
    render_expression(out, condition, indent + 2);
    let _ = writeln!(out, "{pad}  Body ({} statements):", body.len());
    for statement in body {
        render_statement(out, statement, indent + 2);
    }
}

fn render_expression(out: &mut String, expression: &Expression, indent: usize) {
    let pad = "  ".repeat(indent);
    match expression {
        Expression::StringLiteral(value) => {
            let _ = writeln!(out, "{pad}StringLiteral: \"{value}\"");
        }
        Expression::IntegerLiteral(value) => {
            let _ = writeln!(out, "{pad}IntegerLiteral: {value}");
        }
        Expression::Identifier(name) => {
            let _ = writeln!(out, "{pad}Identifier: {name}");
        }
        Expression::ArrayAccess { array, index } => {
            let _ = writeln!(out, "{pad}ArrayAccess");
            let _ = writeln!(out, "{pad}  Array:");
            render_expression(out, array, indent + 2);
            let _ = writeln!(out, "{pad}  Index:");
            render_expression(out, index, indent + 2);
        }
        Expression::BinaryOp { left, op, right } => {
            let _ = writeln!(out, "{pad}BinaryOp ({})", op.symbol());
            let _ = writeln!(out, "{pad}  Left:");
            render_expression(out, left, indent + 2);
            let _ = writeln!(out, "{pad}  Right:");
            render_expression(out, right, indent + 2);
        }
    }
}
