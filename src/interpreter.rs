//! Tree-walking evaluator.
//!
//! Executes top-level statements in order, mutating a single flat variable
//! environment and doing line I/O through the console facade. Evaluation
//! never aborts: type mismatches degrade to default values and the only
//! runtime diagnostic is an undefined-variable lookup.

use std::collections::HashMap;

use thiserror::Error;

use crate::ast::{BinaryOperator, DeclaredType, Expression, Program, Statement};
use crate::console::Console;
use crate::diag::DiagnosticSink;

mod trace;
mod value;

pub use trace::TraceConfig;
pub use value::Value;

/// Runtime diagnostics. Reported to the sink, never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },
}

pub struct Interpreter<'io> {
    variables: HashMap<String, Value>,
    console: &'io mut dyn Console,
    diag: &'io mut dyn DiagnosticSink,
    trace: TraceConfig,
    current_statement: usize,
}

impl<'io> Interpreter<'io> {
    pub fn new(console: &'io mut dyn Console, diag: &'io mut dyn DiagnosticSink) -> Self {
        Self {
            variables: HashMap::new(),
            console,
            diag,
            trace: TraceConfig::default(),
            current_statement: 0,
        }
    }

    pub fn with_trace(mut self, trace: TraceConfig) -> Self {
        self.trace = trace;
        self
    }

    pub fn interpret(&mut self, program: &Program) {
        self.trace_message(1, "Starting program execution");
        self.trace_message(
            2,
            &format!("Total statements: {}", program.statements.len()),
        );

        self.current_statement = 0;
        for statement in &program.statements {
            self.current_statement += 1;

            if self.trace.enabled {
                self.trace_statement(statement);
                self.trace_variables();
                self.wait_for_step();
            }

            self.execute(statement);

            if self.trace.enabled && self.trace.level >= 3 {
                self.trace_message(3, "Statement completed");
                self.trace_variables();
            }
        }

        self.trace_message(1, "Program execution completed");
        if self.trace.enabled && self.trace.level >= 2 {
            self.trace_message(2, "Final state:");
            self.trace_variables();
        }
        tracing::debug!(
            statements = program.statements.len(),
            variables = self.variables.len(),
            "program executed"
        );
    }

    fn execute(&mut self, statement: &Statement) {
        match statement {
            Statement::Print(expr) => {
                let value = self.evaluate(expr);
                self.console.write_line(&value.to_output());
            }
            Statement::VarDeclaration {
                name,
                declared_type,
            } => {
                let initial = match declared_type {
                    DeclaredType::Integer => Value::Integer(0),
                    DeclaredType::String => Value::String(String::new()),
                    // Fresh array slots hold a single space, not an empty
                    // string.
                    DeclaredType::StringArray { size } => {
                        Value::StringArray(vec![" ".to_string(); *size])
                    }
                };
                self.variables.insert(name.clone(), initial);
            }
            Statement::Assignment { name, index, value } => {
                let value = self.evaluate(value);
                match index {
                    None => {
                        self.variables.insert(name.clone(), value);
                    }
                    Some(index_expr) => self.assign_element(name, index_expr, value),
                }
            }
            Statement::ForLoop { condition, body }
            | Statement::WhileLoop { condition, body } => {
                while self.evaluate(condition).is_truthy() {
                    for body_statement in body {
                        self.execute(body_statement);
                    }
                }
            }
            Statement::If {
                condition,
                then_branch,
                else_if_clauses,
                else_branch,
            } => {
                let branch = if self.evaluate(condition).is_truthy() {
                    Some(then_branch)
                } else {
                    else_if_clauses
                        .iter()
                        .find(|clause| self.evaluate(&clause.condition).is_truthy())
                        .map(|clause| &clause.body)
                };
                for branch_statement in branch.unwrap_or(else_branch) {
                    self.execute(branch_statement);
                }
            }
            Statement::Increment { name, amount } => {
                if let Some(Value::Integer(current)) = self.variables.get_mut(name) {
                    *current = current.wrapping_add(*amount);
                }
            }
            Statement::Read { name } => {
                let line = self.console.read_line();
                let value = match line.trim().parse::<i64>() {
                    Ok(number) => Value::Integer(number),
                    Err(_) => Value::String(line),
                };
                self.variables.insert(name.clone(), value);
            }
        }
    }

    /// Indexed assignment. Requires an existing array variable and an
    /// in-range integer index; every violation is silently ignored.
    fn assign_element(&mut self, name: &str, index_expr: &Expression, value: Value) {
        if !matches!(self.variables.get(name), Some(Value::StringArray(_))) {
            return;
        }
        let Value::Integer(index) = self.evaluate(index_expr) else {
            return;
        };
        if let Some(Value::StringArray(items)) = self.variables.get_mut(name) {
            if index >= 0 && (index as usize) < items.len() {
                items[index as usize] = value.to_output();
            }
        }
    }

    fn evaluate(&mut self, expression: &Expression) -> Value {
        match expression {
            Expression::StringLiteral(value) => Value::String(value.clone()),
            Expression::IntegerLiteral(value) => Value::Integer(*value),
            Expression::Identifier(name) => {
                if let Some(value) = self.variables.get(name) {
                    return value.clone();
                }
                self.diag.report(&RuntimeError::UndefinedVariable {
                    name: name.clone(),
                });
                Value::Integer(0)
            }
            Expression::ArrayAccess { array, index } => {
                let array_value = self.evaluate(array);
                let index_value = self.evaluate(index);
                if let (Value::StringArray(items), Value::Integer(index)) =
                    (&array_value, &index_value)
                {
                    if *index >= 0 && (*index as usize) < items.len() {
                        return Value::String(items[*index as usize].clone());
                    }
                }
                Value::String(String::new())
            }
            Expression::BinaryOp { left, op, right } => {
                // Both sides evaluate eagerly, left to right; AND/OR do not
                // short-circuit.
                let left = self.evaluate(left);
                let right = self.evaluate(right);
                binary_operation(left, *op, right)
            }
        }
    }
}

/// Operator semantics over the value tags. Mismatched operands degrade to
/// `Integer(0)` rather than failing.
fn binary_operation(left: Value, op: BinaryOperator, right: Value) -> Value {
    match op {
        BinaryOperator::Add => match (&left, &right) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Value::String(format!("{}{}", left.to_output(), right.to_output()))
            }
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(a.wrapping_add(*b)),
            _ => Value::Integer(0),
        },
        BinaryOperator::Subtract => match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(a.wrapping_sub(*b)),
            _ => Value::Integer(0),
        },
        BinaryOperator::Multiply => match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(a.wrapping_mul(*b)),
            _ => Value::Integer(0),
        },
        BinaryOperator::Divide => match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) if *b != 0 => {
                Value::Integer(a.wrapping_div(*b))
            }
            _ => Value::Integer(0),
        },
        BinaryOperator::Equals => {
            Value::Integer((left.to_output() == right.to_output()) as i64)
        }
        BinaryOperator::NotEquals => {
            Value::Integer((left.to_output() != right.to_output()) as i64)
        }
        BinaryOperator::LessThan => match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer((a < b) as i64),
            _ => Value::Integer(0),
        },
        BinaryOperator::And => Value::Integer((left.is_truthy() && right.is_truthy()) as i64),
        BinaryOperator::Or => Value::Integer((left.is_truthy() || right.is_truthy()) as i64),
    }
}
