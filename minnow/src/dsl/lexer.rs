// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::dsl::EvalError;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Str(String),
    Int(i64),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Equals,
    Plus,
    Newline,
}

#[derive(Clone, Debug)]
pub(crate) struct SpannedToken {
    pub(crate) token: Token,
    pub(crate) line: usize,
}

/// Splits BUILD-file source into tokens.
///
/// Newlines are statement separators at the top level only; inside brackets
/// of any sort they are ignored, so multi-line calls and lists read the way
/// they would in Python.
pub(crate) fn lex(source: &str) -> Result<Vec<SpannedToken>, EvalError> {
    let mut tokens: Vec<SpannedToken> = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1usize;
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\r' => {}
            '\n' => {
                if depth == 0 && !matches!(tokens.last(), None | Some(SpannedToken { token: Token::Newline, .. })) {
                    tokens.push(SpannedToken {
                        token: Token::Newline,
                        line,
                    });
                }
                line += 1;
            }
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        if depth == 0 && !matches!(tokens.last(), None | Some(SpannedToken { token: Token::Newline, .. })) {
                            tokens.push(SpannedToken {
                                token: Token::Newline,
                                line,
                            });
                        }
                        line += 1;
                        break;
                    }
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some('\\') => text.push('\\'),
                            Some('\'') => text.push('\''),
                            Some('"') => text.push('"'),
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(other) => {
                                return Err(EvalError::at(
                                    line,
                                    format!("unsupported escape sequence '\\{}'", other),
                                ))
                            }
                            None => {
                                return Err(EvalError::at(line, "unterminated string literal"))
                            }
                        },
                        Some('\n') => {
                            return Err(EvalError::at(line, "unterminated string literal"))
                        }
                        Some(c) if c == quote => break,
                        Some(c) => text.push(c),
                        None => return Err(EvalError::at(line, "unterminated string literal")),
                    }
                }
                tokens.push(SpannedToken {
                    token: Token::Str(text),
                    line,
                });
            }
            '0'..='9' => {
                let mut digits = String::from(c);
                while let Some(d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(*d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = digits.parse::<i64>().map_err(|_| {
                    EvalError::at(line, format!("integer literal '{}' out of range", digits))
                })?;
                tokens.push(SpannedToken {
                    token: Token::Int(value),
                    line,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some(d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || *d == '_' {
                        ident.push(*d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(SpannedToken {
                    token: Token::Ident(ident),
                    line,
                });
            }
            '(' | '[' | '{' => {
                depth += 1;
                let token = match c {
                    '(' => Token::LParen,
                    '[' => Token::LBracket,
                    _ => Token::LBrace,
                };
                tokens.push(SpannedToken { token, line });
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                let token = match c {
                    ')' => Token::RParen,
                    ']' => Token::RBracket,
                    _ => Token::RBrace,
                };
                tokens.push(SpannedToken { token, line });
            }
            ',' => tokens.push(SpannedToken {
                token: Token::Comma,
                line,
            }),
            ':' => tokens.push(SpannedToken {
                token: Token::Colon,
                line,
            }),
            '=' => tokens.push(SpannedToken {
                token: Token::Equals,
                line,
            }),
            '+' => tokens.push(SpannedToken {
                token: Token::Plus,
                line,
            }),
            other => {
                return Err(EvalError::at(
                    line,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(tokens)
}
