//! Recursive-descent evaluator over the lexed token stream.
//!
//! This realizes "reduce innermost-first with an iteration cap" as a
//! depth-capped descent rather than literal textual rewriting: each
//! nested function call or parenthesized group
//! is evaluated bottom-up exactly once, and [`MAX_DEPTH`] bounds descent
//! the same way a rewrite loop's iteration cap bounds its cost on
//! adversarial nesting.

use crate::functions::{self, apply_binary_op};
use crate::lexer::Token;
use crate::value::Value;
use crate::FormulaError;

pub const MAX_DEPTH: usize = 50;

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    literals: &'a [String],
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], literals: &'a [String]) -> Self {
        Self { tokens, pos: 0, literals }
    }

    pub fn parse_expr_at_top(&mut self) -> Result<Value, FormulaError> {
        let value = self.expr(0)?;
        if self.pos != self.tokens.len() {
            return Err(FormulaError::TrailingTokens);
        }
        Ok(value)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn check_depth(depth: usize) -> Result<(), FormulaError> {
        if depth > MAX_DEPTH {
            Err(FormulaError::TooDeep)
        } else {
            Ok(())
        }
    }

    /// `expr:= term (('+' | '-') term)*`
    fn expr(&mut self, depth: usize) -> Result<Value, FormulaError> {
        Self::check_depth(depth)?;
        let mut lhs = self.term(depth + 1)?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    let rhs = self.term(depth + 1)?;
                    lhs = Value::Number(apply_binary_op('+', lhs.as_number(), rhs.as_number()));
                }
                Some(Token::Minus) => {
                    self.advance();
                    let rhs = self.term(depth + 1)?;
                    lhs = Value::Number(apply_binary_op('-', lhs.as_number(), rhs.as_number()));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    /// `term:= factor (('*' | '/') factor)*`
    fn term(&mut self, depth: usize) -> Result<Value, FormulaError> {
        Self::check_depth(depth)?;
        let mut lhs = self.factor(depth + 1)?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    let rhs = self.factor(depth + 1)?;
                    lhs = Value::Number(apply_binary_op('*', lhs.as_number(), rhs.as_number()));
                }
                Some(Token::Slash) => {
                    self.advance();
                    let rhs = self.factor(depth + 1)?;
                    lhs = Value::Number(apply_binary_op('/', lhs.as_number(), rhs.as_number()));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    /// `factor:= '(' expr ')' | func_call | literal`
    fn factor(&mut self, depth: usize) -> Result<Value, FormulaError> {
        Self::check_depth(depth)?;
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(Value::Number(n)),
            Some(Token::QuotedString(s)) => Ok(Value::Text(s)),
            Some(Token::Opaque(idx)) => {
                let text = self.literals.get(idx).cloned().unwrap_or_default();
                Ok(Value::Text(text))
            }
            Some(Token::LParen) => {
                let inner = self.expr(depth + 1)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Word(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) && functions::is_known_function(&name) {
                    self.advance();
                    let args = self.arg_list(depth + 1)?;
                    self.expect(Token::RParen)?;
                    functions::call(&name, args)
                } else if matches!(self.peek(), Some(Token::LParen)) {
                    Err(FormulaError::UnknownFunction(name))
                } else {
                    Ok(Value::Text(name))
                }
            }
            other => Err(FormulaError::UnexpectedToken(format!("{other:?}"))),
        }
    }

    fn arg_list(&mut self, depth: usize) -> Result<Vec<Value>, FormulaError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            return Ok(args);
        }
        loop {
            args.push(self.expr(depth + 1)?);
            match self.peek() {
                Some(Token::Comma) => {
                    self.advance();
                }
                _ => break,
            }
        }
        Ok(args)
    }

    fn expect(&mut self, want: Token) -> Result<(), FormulaError> {
        match self.advance() {
            Some(t) if *t == want => Ok(()),
            other => Err(FormulaError::UnexpectedToken(format!("{other:?}"))),
        }
    }
}
