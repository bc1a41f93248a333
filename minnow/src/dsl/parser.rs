// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::dsl::lexer::{SpannedToken, Token};
use crate::dsl::EvalError;

#[derive(Clone, Debug)]
pub(crate) enum Expr {
    Str(String),
    Int(i64),
    Bool(bool),
    None,
    Ident {
        line: usize,
        name: String,
    },
    List(Vec<Expr>),
    Dict {
        line: usize,
        entries: Vec<(Expr, Expr)>,
    },
    Call {
        line: usize,
        func: Box<Expr>,
        positional: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    Add {
        line: usize,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Clone, Debug)]
pub(crate) enum Stmt {
    Assign { name: String, expr: Expr },
    Expr(Expr),
}

pub(crate) fn parse(tokens: Vec<SpannedToken>) -> Result<Vec<Stmt>, EvalError> {
    Parser { tokens, pos: 0 }.program()
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn program(&mut self) -> Result<Vec<Stmt>, EvalError> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(&Token::Newline) {}
            if self.peek().is_none() {
                break;
            }
            stmts.push(self.statement()?);
            match self.peek() {
                None => break,
                Some(Token::Newline) => {
                    self.pos += 1;
                }
                Some(_) => {
                    let line = self.line();
                    return Err(EvalError::at(line, "expected end of statement"));
                }
            }
        }
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, EvalError> {
        // An identifier directly followed by `=` is an assignment into the
        // file-local environment; anything else is an expression statement.
        if let (Some(Token::Ident(name)), Some(Token::Equals)) =
            (self.peek(), self.peek_at(1))
        {
            let name = name.clone();
            self.pos += 2;
            let expr = self.expression()?;
            return Ok(Stmt::Assign { name, expr });
        }
        Ok(Stmt::Expr(self.expression()?))
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.term()?;
        while self.peek() == Some(&Token::Plus) {
            let line = self.line();
            self.pos += 1;
            let right = self.term()?;
            expr = Expr::Add {
                line,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        // Call postfix; chained calls are legal if a call returns a callable.
        while self.peek() == Some(&Token::LParen) {
            let line = self.line();
            self.pos += 1;
            let (positional, kwargs) = self.call_args(line)?;
            expr = Expr::Call {
                line,
                func: Box::new(expr),
                positional,
                kwargs,
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let line = self.line();
        let token = match self.next() {
            Some(token) => token,
            None => return Err(EvalError::at(line, "unexpected end of input")),
        };
        match token {
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Int(i) => Ok(Expr::Int(i)),
            Token::Ident(name) => match name.as_str() {
                "True" => Ok(Expr::Bool(true)),
                "False" => Ok(Expr::Bool(false)),
                "None" => Ok(Expr::None),
                _ => Ok(Expr::Ident { line, name }),
            },
            Token::LParen => {
                let expr = self.expression()?;
                self.expect(Token::RParen, "expected ')'")?;
                Ok(expr)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                loop {
                    if self.eat(&Token::RBracket) {
                        break;
                    }
                    items.push(self.expression()?);
                    if !self.eat(&Token::Comma) {
                        self.expect(Token::RBracket, "expected ',' or ']' in list")?;
                        break;
                    }
                }
                Ok(Expr::List(items))
            }
            Token::LBrace => {
                let mut entries = Vec::new();
                loop {
                    if self.eat(&Token::RBrace) {
                        break;
                    }
                    let key = self.expression()?;
                    self.expect(Token::Colon, "expected ':' in dict entry")?;
                    let value = self.expression()?;
                    entries.push((key, value));
                    if !self.eat(&Token::Comma) {
                        self.expect(Token::RBrace, "expected ',' or '}' in dict")?;
                        break;
                    }
                }
                Ok(Expr::Dict { line, entries })
            }
            other => Err(EvalError::at(
                line,
                format!("unexpected token {:?}", other),
            )),
        }
    }

    fn call_args(&mut self, line: usize) -> Result<(Vec<Expr>, Vec<(String, Expr)>), EvalError> {
        let mut positional = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        loop {
            if self.eat(&Token::RParen) {
                break;
            }
            if let (Some(Token::Ident(name)), Some(Token::Equals)) =
                (self.peek(), self.peek_at(1))
            {
                let name = name.clone();
                self.pos += 2;
                let expr = self.expression()?;
                if kwargs.iter().any(|(k, _)| *k == name) {
                    return Err(EvalError::at(
                        line,
                        format!("duplicate keyword argument '{}'", name),
                    ));
                }
                kwargs.push((name, expr));
            } else {
                if !kwargs.is_empty() {
                    return Err(EvalError::at(
                        line,
                        "positional argument follows keyword argument",
                    ));
                }
                positional.push(self.expression()?);
            }
            if !self.eat(&Token::Comma) {
                self.expect(Token::RParen, "expected ',' or ')' in call")?;
                break;
            }
        }
        Ok((positional, kwargs))
    }

    // ---
    // Token-stream helpers
    // ---

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, message: &str) -> Result<(), EvalError> {
        let line = self.line();
        if self.eat(&token) {
            Ok(())
        } else {
            Err(EvalError::at(line, message))
        }
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }
}
