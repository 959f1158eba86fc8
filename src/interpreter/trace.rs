//! Runtime trace output for the `debug` subcommand.
//!
//! Trace lines are program output: they go through the console facade so
//! step-driven sessions and tests see them interleaved with ordinary prints.

use crate::ast::Statement;

#[derive(Debug, Clone, Copy, Default)]
pub struct TraceConfig {
    pub enabled: bool,
    /// Verbosity, 0-3.
    pub level: u8,
    /// Prompt for a line of input before each top-level statement.
    pub step: bool,
}

impl<'io> super::Interpreter<'io> {
    pub(super) fn trace_message(&mut self, level: u8, message: &str) {
        if self.trace.enabled && self.trace.level >= level {
            self.console.write_line(&format!("[DEBUG] {message}"));
        }
    }

    pub(super) fn trace_statement(&mut self, statement: &Statement) {
        if !self.trace.enabled || self.trace.level < 1 {
            return;
        }
        let line = format!(
            "Executing statement #{}: {}",
            self.current_statement,
            statement_summary(statement)
        );
        self.trace_message(1, &line);
    }

    pub(super) fn trace_variables(&mut self) {
        if !self.trace.enabled || self.trace.level < 2 {
            return;
        }

        self.trace_message(2, "Variables:");
        if self.variables.is_empty() {
            self.trace_message(2, "  (none)");
            return;
        }

        let mut names: Vec<&String> = self.variables.keys().collect();
        names.sort();
        for name in names {
            let rendered = self.variables[name].to_output();
            self.console
                .write_line(&format!("[DEBUG]   {name} = {rendered}"));
        }
    }

    pub(super) fn wait_for_step(&mut self) {
        if self.trace.step {
            self.console.write_line("[DEBUG] Press Enter to continue...");
            self.console.read_line();
        }
    }
}

fn statement_summary(statement: &Statement) -> String {
    match statement {
        Statement::Print(_) => "PRINT".to_string(),
        Statement::VarDeclaration {
            name,
            declared_type,
        } => format!("VAR_DECLARATION ({name} : {declared_type})"),
        Statement::Assignment { name, .. } => format!("ASSIGNMENT ({name})"),
        Statement::ForLoop { .. } => "FOR_LOOP".to_string(),
        Statement::WhileLoop { .. } => "WHILE_LOOP".to_string(),
        Statement::If { .. } => "IF_STATEMENT".to_string(),
        Statement::Increment { name, amount } => format!("INCREMENT ({name} += {amount})"),
        Statement::Read { name } => format!("READ ({name})"),
    }
}
