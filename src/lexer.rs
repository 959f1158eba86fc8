use thiserror::Error;

use crate::diag::DiagnosticSink;
use crate::token::{Token, TokenKind};

/// Problems the scanner can run into. Both are reported to the diagnostic
/// sink and scanning continues; lexing never aborts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at line {line}")]
    UnexpectedCharacter { character: char, line: u32 },
    #[error("Unterminated string at line {line}")]
    UnterminatedString { line: u32 },
}

pub struct Lexer<'a, 'd> {
    input: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    diag: &'d mut dyn DiagnosticSink,
}

impl<'a, 'd> Lexer<'a, 'd> {
    pub fn new(input: &'a str, diag: &'d mut dyn DiagnosticSink) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            diag,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.skip_whitespace();

            let Some(ch) = self.peek_char() else {
                break;
            };

            match ch {
                '\n' => {
                    self.consume_char();
                    self.line += 1;
                    self.column = 1;
                    tokens.push(self.make_token(TokenKind::Newline, ""));
                }
                '"' => {
                    if let Some(token) = self.read_string() {
                        tokens.push(token);
                    }
                }
                '[' => tokens.push(self.single_char_token(TokenKind::LeftBracket)),
                ']' => tokens.push(self.single_char_token(TokenKind::RightBracket)),
                '(' => tokens.push(self.single_char_token(TokenKind::LeftParen)),
                ')' => tokens.push(self.single_char_token(TokenKind::RightParen)),
                '+' => tokens.push(self.single_char_token(TokenKind::Plus)),
                '-' => tokens.push(self.single_char_token(TokenKind::Minus)),
                '*' => tokens.push(self.single_char_token(TokenKind::Multiply)),
                '/' => tokens.push(self.single_char_token(TokenKind::Divide)),
                c if is_digit(c) => tokens.push(self.read_integer()),
                c if is_alpha(c) => tokens.push(self.read_identifier()),
                c => {
                    self.consume_char();
                    self.diag.report(&LexError::UnexpectedCharacter {
                        character: c,
                        line: self.line,
                    });
                }
            }
        }

        tokens.push(self.make_token(TokenKind::Eof, ""));
        tokens
    }

    /// Consume spaces, carriage returns, tabs, and `//` line comments. The
    /// comment's terminating newline is left in the input.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\r') | Some('\t') => {
                    self.consume_char();
                }
                Some('/') if self.peek_next_char() == Some('/') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.consume_char();
                    }
                }
                _ => break,
            }
        }
    }

    /// Scan a string literal; the opening quote is the current character.
    /// Content is kept verbatim (no escape processing), embedded newlines
    /// are allowed and tracked. At end of input the literal is reported as
    /// unterminated and no token is produced.
    fn read_string(&mut self) -> Option<Token<'a>> {
        self.consume_char(); // opening quote
        let content_start = self.pos;

        loop {
            match self.peek_char() {
                None => {
                    self.diag
                        .report(&LexError::UnterminatedString { line: self.line });
                    return None;
                }
                Some('"') => break,
                Some('\n') => {
                    self.line += 1;
                    self.column = 0;
                    self.consume_char();
                }
                Some(_) => {
                    self.consume_char();
                }
            }
        }

        let content = &self.input[content_start..self.pos];
        self.consume_char(); // closing quote
        Some(self.make_token(TokenKind::String, content))
    }

    fn read_integer(&mut self) -> Token<'a> {
        let start = self.pos;
        self.consume_while(is_digit);
        self.make_token(TokenKind::Integer, &self.input[start..self.pos])
    }

    fn read_identifier(&mut self) -> Token<'a> {
        let start = self.pos;
        self.consume_while(is_alphanumeric);
        let text = &self.input[start..self.pos];
        self.make_token(keyword_kind(text).unwrap_or(TokenKind::Identifier), text)
    }

    fn make_token(&self, kind: TokenKind, lexeme: &'a str) -> Token<'a> {
        Token::new(kind, lexeme, self.line, self.column)
    }

    fn single_char_token(&mut self, kind: TokenKind) -> Token<'a> {
        self.consume_char();
        self.make_token(kind, "")
    }

    fn consume_while<P>(&mut self, keep: P)
    where
        P: Fn(char) -> bool,
    {
        while let Some(c) = self.peek_char() {
            if !keep(c) {
                break;
            }
            self.consume_char();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        self.column += 1;
        Some(c)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '!'
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_alphanumeric(c: char) -> bool {
    is_alpha(c) || is_digit(c)
}

/// Case-sensitive keyword table.
fn keyword_kind(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "!I_LOVE_GOVERNMENT" => TokenKind::ILoveGovernment,
        "PRAISE_LEADER" => TokenKind::PraiseLeader,
        "OBEY_PARTY_LINE" => TokenKind::ObeyPartyLine,
        "DENOUNCE_IMPERIALIST_ERRORS" => TokenKind::DenounceImperialistErrors,
        "PLEASE" => TokenKind::Please,
        "DECLARE_VARIABLE" => TokenKind::DeclareVariable,
        "AS" => TokenKind::As,
        "INTEGER" => TokenKind::IntegerType,
        "STRING" => TokenKind::StringType,
        "ARRAY_OF_STRING" => TokenKind::ArrayOfString,
        "SIZE" => TokenKind::Size,
        "SET" => TokenKind::Set,
        "TO" => TokenKind::To,
        "INCREMENT" => TokenKind::Increment,
        "BY" => TokenKind::By,
        "READ" => TokenKind::Read,
        "FOR_THE_PEOPLE" => TokenKind::ForThePeople,
        "END_FOR_THE_PEOPLE" => TokenKind::EndForThePeople,
        "WHILE" => TokenKind::While,
        "END_WHILE" => TokenKind::EndWhile,
        "IF" => TokenKind::If,
        "THEN" => TokenKind::Then,
        "ELSE" => TokenKind::Else,
        "ELSE_IF" => TokenKind::ElseIf,
        "END_IF" => TokenKind::EndIf,
        "DO" => TokenKind::Do,
        "EQUALS" => TokenKind::Equals,
        "NOT_EQUALS" => TokenKind::NotEquals,
        "LESS_THAN" => TokenKind::LessThan,
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        _ => return None,
    };
    Some(kind)
}

/// Scan `input` into an `Eof`-terminated token sequence. Problems go to
/// `diag`; the scan itself always succeeds.
pub fn tokenize<'a>(input: &'a str, diag: &mut dyn DiagnosticSink) -> Vec<Token<'a>> {
    let tokens = Lexer::new(input, diag).tokenize();
    tracing::debug!(tokens = tokens.len(), "tokenized source");
    tokens
}
