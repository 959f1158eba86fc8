use thiserror::Error;

use crate::ast::{
    BinaryOperator, DeclaredType, ElseIfClause, Expression, Program, Statement,
};
use crate::diag::DiagnosticSink;
use crate::token::{Token, TokenKind};

/// The parser's only fatal condition: an integer lexeme that does not fit
/// `i64`. Everything else is reported as a [`SyntaxError`] diagnostic and
/// parsing continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid integer literal '{literal}' at line {line}")]
    InvalidIntegerLiteral { literal: String, line: u32 },
}

/// Non-fatal syntax problems, one line each on the diagnostic sink.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("Parse error: {message} at line {line}")]
    UnmetExpectation { message: &'static str, line: u32 },
    #[error("Expected expression at line {line}")]
    ExpectedExpression { line: u32 },
}

pub struct Parser<'a, 'd> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    diag: &'d mut dyn DiagnosticSink,
}

impl<'a, 'd> Parser<'a, 'd> {
    pub fn new(mut tokens: Vec<Token<'a>>, diag: &'d mut dyn DiagnosticSink) -> Self {
        if !matches!(tokens.last().map(|token| token.kind), Some(TokenKind::Eof)) {
            tokens.push(Token::new(TokenKind::Eof, "", 1, 1));
        }
        Self {
            tokens,
            pos: 0,
            diag,
        }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        // Optional program header.
        if self.matches(&[TokenKind::ILoveGovernment]) {
            self.skip_newlines();
        }

        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.statement()? {
                statements.push(statement);
            }
            self.skip_newlines();
        }

        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Option<Statement>, ParseError> {
        self.skip_newlines();

        if self.matches(&[TokenKind::PraiseLeader]) {
            return Ok(Some(self.print_statement()?));
        }

        if self.matches(&[TokenKind::Please]) {
            if self.matches(&[TokenKind::DeclareVariable]) {
                return self.var_declaration();
            }
            if self.matches(&[TokenKind::Set]) {
                return Ok(Some(self.assignment()?));
            }
            if self.matches(&[TokenKind::Increment]) {
                return Ok(Some(self.increment_statement()?));
            }
            if self.matches(&[TokenKind::Read]) {
                return Ok(Some(self.read_statement()));
            }
            // A lone PLEASE falls through; politeness is not itself a
            // statement.
        }

        if self.matches(&[TokenKind::ForThePeople]) {
            return Ok(Some(self.for_loop()?));
        }

        if self.matches(&[TokenKind::While]) {
            return Ok(Some(self.while_loop()?));
        }

        if self.matches(&[TokenKind::If]) {
            return Ok(Some(self.if_statement()?));
        }

        // Decorative comment keywords swallow the rest of the line.
        if self.matches(&[
            TokenKind::ObeyPartyLine,
            TokenKind::DenounceImperialistErrors,
        ]) {
            while !self.check(TokenKind::Newline) && !self.is_at_end() {
                self.advance();
            }
            return Ok(None);
        }

        if self.is_at_end() {
            return Ok(None);
        }

        // Nothing we recognize leads a statement here. Report once and step
        // over the token so the parse always makes progress.
        self.diag.report(&SyntaxError::UnmetExpectation {
            message: "Expected statement",
            line: self.current().line,
        });
        self.advance();
        Ok(None)
    }

    fn print_statement(&mut self) -> Result<Statement, ParseError> {
        Ok(Statement::Print(self.expression()?))
    }

    fn var_declaration(&mut self) -> Result<Option<Statement>, ParseError> {
        // The variable name arrives as a quoted string literal.
        let name = self
            .consume(TokenKind::String, "Expected variable name in quotes")
            .lexeme
            .to_string();

        self.consume(TokenKind::As, "Expected 'AS' after variable name");

        let declared_type = if self.matches(&[TokenKind::IntegerType]) {
            DeclaredType::Integer
        } else if self.matches(&[TokenKind::StringType]) {
            DeclaredType::String
        } else if self.matches(&[TokenKind::ArrayOfString]) {
            self.consume(TokenKind::Size, "Expected 'SIZE' after ARRAY_OF_STRING");
            let size_token = *self.consume(TokenKind::Integer, "Expected array size");
            let size = integer_value(&size_token)? as usize;
            DeclaredType::StringArray { size }
        } else {
            self.diag.report(&SyntaxError::UnmetExpectation {
                message: "Expected type after 'AS'",
                line: self.current().line,
            });
            return Ok(None);
        };

        Ok(Some(Statement::VarDeclaration {
            name,
            declared_type,
        }))
    }

    fn assignment(&mut self) -> Result<Statement, ParseError> {
        let name = self
            .consume(TokenKind::Identifier, "Expected variable name")
            .lexeme
            .to_string();

        let index = if self.matches(&[TokenKind::LeftBracket]) {
            let index = self.expression()?;
            self.consume(TokenKind::RightBracket, "Expected ']' after array index");
            Some(index)
        } else {
            None
        };

        self.consume(TokenKind::To, "Expected 'TO' in assignment");
        let value = self.expression()?;

        Ok(Statement::Assignment { name, index, value })
    }

    fn increment_statement(&mut self) -> Result<Statement, ParseError> {
        let name = self
            .consume(TokenKind::Identifier, "Expected variable name")
            .lexeme
            .to_string();
        self.consume(TokenKind::By, "Expected 'BY' after INCREMENT");
        let amount_token = *self.consume(TokenKind::Integer, "Expected increment amount");
        let amount = integer_value(&amount_token)?;
        Ok(Statement::Increment { name, amount })
    }

    fn read_statement(&mut self) -> Statement {
        let name = self
            .consume(TokenKind::Identifier, "Expected variable name")
            .lexeme
            .to_string();
        Statement::Read { name }
    }

    fn for_loop(&mut self) -> Result<Statement, ParseError> {
        let condition = self.expression()?;
        self.consume(TokenKind::Do, "Expected 'DO' after for condition");

        let body = self.block(&[TokenKind::EndForThePeople])?;
        self.consume(
            TokenKind::EndForThePeople,
            "Expected 'END_FOR_THE_PEOPLE'",
        );

        Ok(Statement::ForLoop { condition, body })
    }

    fn while_loop(&mut self) -> Result<Statement, ParseError> {
        let condition = self.expression()?;
        self.consume(TokenKind::Do, "Expected 'DO' after while condition");

        let body = self.block(&[TokenKind::EndWhile])?;
        self.consume(TokenKind::EndWhile, "Expected 'END_WHILE'");

        Ok(Statement::WhileLoop { condition, body })
    }

    fn if_statement(&mut self) -> Result<Statement, ParseError> {
        const BRANCH_ENDS: [TokenKind; 3] =
            [TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf];

        let condition = self.expression()?;
        self.consume(TokenKind::Then, "Expected 'THEN' after if condition");
        let then_branch = self.block(&BRANCH_ENDS)?;

        let mut else_if_clauses = Vec::new();
        while self.matches(&[TokenKind::ElseIf]) {
            let condition = self.expression()?;
            self.consume(TokenKind::Then, "Expected 'THEN' after else-if condition");
            let body = self.block(&BRANCH_ENDS)?;
            else_if_clauses.push(ElseIfClause { condition, body });
        }

        let else_branch = if self.matches(&[TokenKind::Else]) {
            self.block(&[TokenKind::EndIf])?
        } else {
            Vec::new()
        };

        self.consume(TokenKind::EndIf, "Expected 'END_IF'");

        Ok(Statement::If {
            condition,
            then_branch,
            else_if_clauses,
            else_branch,
        })
    }

    /// Parse statements until one of `terminators` (or end of input) is the
    /// current token. The terminator itself is left for the caller.
    fn block(&mut self, terminators: &[TokenKind]) -> Result<Vec<Statement>, ParseError> {
        let mut body = Vec::new();
        self.skip_newlines();
        while !terminators.iter().any(|&kind| self.check(kind)) && !self.is_at_end() {
            if let Some(statement) = self.statement()? {
                body.push(statement);
            }
            self.skip_newlines();
        }
        Ok(body)
    }

    // Expression grammar, lowest precedence first. All operators are
    // left-associative; LESS_THAN sits on the equality tier. A newline is
    // skipped only after an operator has been consumed, so expressions wrap
    // across lines exactly when an operator is pending.

    fn expression(&mut self) -> Result<Expression, ParseError> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.logical_and()?;
        while self.matches(&[TokenKind::Or]) {
            self.skip_newlines();
            let right = self.logical_and()?;
            expr = binary(expr, BinaryOperator::Or, right);
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.equality()?;
        while self.matches(&[TokenKind::And]) {
            self.skip_newlines();
            let right = self.equality()?;
            expr = binary(expr, BinaryOperator::And, right);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.addition()?;
        loop {
            let op = if self.matches(&[TokenKind::Equals]) {
                BinaryOperator::Equals
            } else if self.matches(&[TokenKind::NotEquals]) {
                BinaryOperator::NotEquals
            } else if self.matches(&[TokenKind::LessThan]) {
                BinaryOperator::LessThan
            } else {
                break;
            };
            self.skip_newlines();
            let right = self.addition()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn addition(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.multiplication()?;
        loop {
            let op = if self.matches(&[TokenKind::Plus]) {
                BinaryOperator::Add
            } else if self.matches(&[TokenKind::Minus]) {
                BinaryOperator::Subtract
            } else {
                break;
            };
            self.skip_newlines();
            let right = self.multiplication()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn multiplication(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.primary()?;
        loop {
            let op = if self.matches(&[TokenKind::Multiply]) {
                BinaryOperator::Multiply
            } else if self.matches(&[TokenKind::Divide]) {
                BinaryOperator::Divide
            } else {
                break;
            };
            self.skip_newlines();
            let right = self.primary()?;
            expr = binary(expr, op, right);
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expression, ParseError> {
        if self.matches(&[TokenKind::String]) {
            return Ok(Expression::StringLiteral(self.previous().lexeme.to_string()));
        }

        if self.matches(&[TokenKind::Integer]) {
            return Ok(Expression::IntegerLiteral(integer_value(self.previous())?));
        }

        if self.matches(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expected ')' after expression");
            return Ok(expr);
        }

        if self.matches(&[TokenKind::Identifier]) {
            let name = self.previous().lexeme.to_string();

            if self.matches(&[TokenKind::LeftBracket]) {
                let index = self.expression()?;
                self.consume(TokenKind::RightBracket, "Expected ']' after array index");
                return Ok(Expression::ArrayAccess {
                    array: Box::new(Expression::Identifier(name)),
                    index: Box::new(index),
                });
            }

            return Ok(Expression::Identifier(name));
        }

        // Recover with a harmless literal so every statement keeps a
        // complete expression tree.
        self.diag.report(&SyntaxError::ExpectedExpression {
            line: self.current().line,
        });
        Ok(Expression::IntegerLiteral(0))
    }

    fn skip_newlines(&mut self) {
        while self.matches(&[TokenKind::Newline]) {}
    }

    fn current(&self) -> &Token<'a> {
        &self.tokens[self.pos]
    }

    fn previous(&self) -> &Token<'a> {
        &self.tokens[self.pos - 1]
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.current().kind == kind
    }

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn advance(&mut self) -> &Token<'a> {
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    /// Advance past the expected token, or report the expectation and stay
    /// put, handing back the current token as a stand-in.
    fn consume(&mut self, kind: TokenKind, message: &'static str) -> &Token<'a> {
        if self.check(kind) {
            return self.advance();
        }

        self.diag.report(&SyntaxError::UnmetExpectation {
            message,
            line: self.current().line,
        });
        self.current()
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn integer_value(token: &Token<'_>) -> Result<i64, ParseError> {
    token
        .lexeme
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidIntegerLiteral {
            literal: token.lexeme.to_string(),
            line: token.line,
        })
}

/// Parse a full token sequence into a program. Syntax problems are reported
/// to `diag` and parsing continues; only an out-of-range integer literal
/// aborts.
pub fn parse_tokens<'a>(
    tokens: Vec<Token<'a>>,
    diag: &mut dyn DiagnosticSink,
) -> Result<Program, ParseError> {
    let program = Parser::new(tokens, diag).parse_program()?;
    tracing::debug!(statements = program.statements.len(), "parsed program");
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::CollectingSink;
    use crate::lexer;

    fn parse_source(source: &str) -> (Result<Program, ParseError>, Vec<String>) {
        let mut diag = CollectingSink::new();
        let tokens = lexer::tokenize(source, &mut diag);
        assert!(diag.messages.is_empty(), "lexer diagnostics: {:?}", diag.messages);
        let result = parse_tokens(tokens, &mut diag);
        (result, diag.messages)
    }

    fn parse_clean(source: &str) -> Program {
        let (result, diagnostics) = parse_source(source);
        assert_eq!(diagnostics, Vec::<String>::new());
        result.expect("parse failed")
    }

    fn int(value: i64) -> Expression {
        Expression::IntegerLiteral(value)
    }

    fn identifier(name: &str) -> Expression {
        Expression::Identifier(name.to_string())
    }

    fn binop(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
        binary(left, op, right)
    }

    #[test]
    fn header_is_optional() {
        assert_eq!(
            parse_clean("PRAISE_LEADER 1"),
            parse_clean("!I_LOVE_GOVERNMENT\nPRAISE_LEADER 1"),
        );
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let program = parse_clean("PRAISE_LEADER 2 + 3 * 4");
        assert_eq!(
            program.statements,
            vec![Statement::Print(binop(
                int(2),
                BinaryOperator::Add,
                binop(int(3), BinaryOperator::Multiply, int(4)),
            ))]
        );
    }

    #[test]
    fn parentheses_override_precedence() {
        let program = parse_clean("PRAISE_LEADER (2 + 3) * 4");
        assert_eq!(
            program.statements,
            vec![Statement::Print(binop(
                binop(int(2), BinaryOperator::Add, int(3)),
                BinaryOperator::Multiply,
                int(4),
            ))]
        );
    }

    #[test]
    fn less_than_shares_the_equality_tier() {
        // Left-associative chaining: (a EQUALS b) LESS_THAN c.
        let program = parse_clean("PRAISE_LEADER a EQUALS b LESS_THAN c");
        assert_eq!(
            program.statements,
            vec![Statement::Print(binop(
                binop(identifier("a"), BinaryOperator::Equals, identifier("b")),
                BinaryOperator::LessThan,
                identifier("c"),
            ))]
        );
    }

    #[test]
    fn logical_operators_nest_below_comparisons() {
        let program = parse_clean("PRAISE_LEADER a LESS_THAN 1 AND b OR c");
        assert_eq!(
            program.statements,
            vec![Statement::Print(binop(
                binop(
                    binop(identifier("a"), BinaryOperator::LessThan, int(1)),
                    BinaryOperator::And,
                    identifier("b"),
                ),
                BinaryOperator::Or,
                identifier("c"),
            ))]
        );
    }

    #[test]
    fn expression_wraps_after_a_pending_operator() {
        let program = parse_clean("PRAISE_LEADER 1 +\n2");
        assert_eq!(
            program.statements,
            vec![Statement::Print(binop(int(1), BinaryOperator::Add, int(2)))]
        );
    }

    #[test]
    fn expression_does_not_wrap_before_an_operator() {
        let (result, diagnostics) = parse_source("PRAISE_LEADER 1\n+ 2");
        let program = result.expect("parse failed");
        // The print ends at the newline; the dangling operator and operand
        // are reported and skipped.
        assert_eq!(program.statements, vec![Statement::Print(int(1))]);
        assert_eq!(
            diagnostics,
            vec![
                "Parse error: Expected statement at line 2",
                "Parse error: Expected statement at line 2",
            ]
        );
    }

    #[test]
    fn parses_all_three_declaration_types() {
        let program = parse_clean(
            "PLEASE DECLARE_VARIABLE \"x\" AS INTEGER\n\
             PLEASE DECLARE_VARIABLE \"s\" AS STRING\n\
             PLEASE DECLARE_VARIABLE \"names\" AS ARRAY_OF_STRING SIZE 2",
        );
        assert_eq!(
            program.statements,
            vec![
                Statement::VarDeclaration {
                    name: "x".to_string(),
                    declared_type: DeclaredType::Integer,
                },
                Statement::VarDeclaration {
                    name: "s".to_string(),
                    declared_type: DeclaredType::String,
                },
                Statement::VarDeclaration {
                    name: "names".to_string(),
                    declared_type: DeclaredType::StringArray { size: 2 },
                },
            ]
        );
    }

    #[test]
    fn parses_plain_and_indexed_assignment() {
        let program = parse_clean(
            "PLEASE SET x TO 5\n\
             PLEASE SET names[1] TO \"Bob\"",
        );
        assert_eq!(
            program.statements,
            vec![
                Statement::Assignment {
                    name: "x".to_string(),
                    index: None,
                    value: int(5),
                },
                Statement::Assignment {
                    name: "names".to_string(),
                    index: Some(int(1)),
                    value: Expression::StringLiteral("Bob".to_string()),
                },
            ]
        );
    }

    #[test]
    fn parses_increment_and_read() {
        let program = parse_clean("PLEASE INCREMENT i BY 2\nPLEASE READ x");
        assert_eq!(
            program.statements,
            vec![
                Statement::Increment {
                    name: "i".to_string(),
                    amount: 2,
                },
                Statement::Read {
                    name: "x".to_string(),
                },
            ]
        );
    }

    #[test]
    fn parses_array_access_expression() {
        let program = parse_clean("PRAISE_LEADER names[i + 1]");
        assert_eq!(
            program.statements,
            vec![Statement::Print(Expression::ArrayAccess {
                array: Box::new(identifier("names")),
                index: Box::new(binop(identifier("i"), BinaryOperator::Add, int(1))),
            })]
        );
    }

    #[test]
    fn parses_for_loop_body() {
        let program = parse_clean(
            "FOR_THE_PEOPLE i LESS_THAN 3 DO\n\
             PRAISE_LEADER i\n\
             PLEASE INCREMENT i BY 1\n\
             END_FOR_THE_PEOPLE",
        );
        assert_eq!(
            program.statements,
            vec![Statement::ForLoop {
                condition: binop(identifier("i"), BinaryOperator::LessThan, int(3)),
                body: vec![
                    Statement::Print(identifier("i")),
                    Statement::Increment {
                        name: "i".to_string(),
                        amount: 1,
                    },
                ],
            }]
        );
    }

    #[test]
    fn parses_while_loop_body() {
        let program = parse_clean(
            "WHILE n LESS_THAN 3 DO\n\
             PLEASE INCREMENT n BY 1\n\
             END_WHILE",
        );
        assert_eq!(
            program.statements,
            vec![Statement::WhileLoop {
                condition: binop(identifier("n"), BinaryOperator::LessThan, int(3)),
                body: vec![Statement::Increment {
                    name: "n".to_string(),
                    amount: 1,
                }],
            }]
        );
    }

    #[test]
    fn parses_if_with_else_if_chain_and_else() {
        let program = parse_clean(
            "IF n LESS_THAN 3 THEN\n\
             PRAISE_LEADER \"small\"\n\
             ELSE_IF n LESS_THAN 7 THEN\n\
             PRAISE_LEADER \"medium\"\n\
             ELSE\n\
             PRAISE_LEADER \"large\"\n\
             END_IF",
        );
        assert_eq!(
            program.statements,
            vec![Statement::If {
                condition: binop(identifier("n"), BinaryOperator::LessThan, int(3)),
                then_branch: vec![Statement::Print(Expression::StringLiteral(
                    "small".to_string()
                ))],
                else_if_clauses: vec![ElseIfClause {
                    condition: binop(identifier("n"), BinaryOperator::LessThan, int(7)),
                    body: vec![Statement::Print(Expression::StringLiteral(
                        "medium".to_string()
                    ))],
                }],
                else_branch: vec![Statement::Print(Expression::StringLiteral(
                    "large".to_string()
                ))],
            }]
        );
    }

    #[test]
    fn comment_keywords_consume_their_line() {
        let program = parse_clean(
            "OBEY_PARTY_LINE the party is always right\n\
             DENOUNCE_IMPERIALIST_ERRORS all of them\n\
             PRAISE_LEADER 1",
        );
        assert_eq!(program.statements, vec![Statement::Print(int(1))]);
    }

    #[test]
    fn missing_connective_reports_and_continues() {
        let (result, diagnostics) = parse_source("PLEASE SET x 5");
        let program = result.expect("parse failed");
        assert_eq!(
            diagnostics,
            vec!["Parse error: Expected 'TO' in assignment at line 1"]
        );
        // Best-effort: the assignment is still produced.
        assert_eq!(
            program.statements,
            vec![Statement::Assignment {
                name: "x".to_string(),
                index: None,
                value: int(5),
            }]
        );
    }

    #[test]
    fn missing_expression_recovers_with_zero_literal() {
        let (result, diagnostics) = parse_source("PRAISE_LEADER END_IF");
        let program = result.expect("parse failed");
        assert_eq!(
            diagnostics,
            vec![
                "Expected expression at line 1",
                "Parse error: Expected statement at line 1",
            ]
        );
        assert_eq!(program.statements, vec![Statement::Print(int(0))]);
    }

    #[test]
    fn missing_type_reports_and_yields_no_statement() {
        let (result, diagnostics) = parse_source("PLEASE DECLARE_VARIABLE \"x\" AS 5");
        let program = result.expect("parse failed");
        assert_eq!(
            diagnostics,
            vec![
                "Parse error: Expected type after 'AS' at line 1",
                "Parse error: Expected statement at line 1",
            ]
        );
        assert_eq!(program.statements, Vec::<Statement>::new());
    }

    #[test]
    fn out_of_range_integer_literal_is_fatal() {
        let (result, _) = parse_source("PRAISE_LEADER 99999999999999999999");
        assert_eq!(
            result,
            Err(ParseError::InvalidIntegerLiteral {
                literal: "99999999999999999999".to_string(),
                line: 1,
            })
        );
    }

    #[test]
    fn unclosed_block_reports_terminator_at_eof() {
        let (result, diagnostics) = parse_source("WHILE 1 DO\nPRAISE_LEADER 1");
        let program = result.expect("parse failed");
        assert_eq!(
            diagnostics,
            vec!["Parse error: Expected 'END_WHILE' at line 2"]
        );
        assert_eq!(program.statements.len(), 1);
    }
}
