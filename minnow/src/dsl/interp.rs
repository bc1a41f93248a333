// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::dsl::lexer;
use crate::dsl::parser::{self, Expr, Stmt};
use crate::dsl::{CallArgs, EvalError, Value};
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// A single-use interpreter for one BUILD-file script.
///
/// The interpreter executes statements for their side effects; statement
/// values are discarded. Assignments extend the environment it was created
/// with.
pub struct Interpreter {
    env: IndexMap<String, Value>,
}

impl Interpreter {
    /// Creates an interpreter with the given binding environment.
    pub fn new(env: IndexMap<String, Value>) -> Self {
        Self { env }
    }

    /// Lexes, parses, and runs a script to completion.
    pub fn run(&mut self, source: &str) -> Result<(), EvalError> {
        let tokens = lexer::lex(source)?;
        let stmts = parser::parse(tokens)?;
        for stmt in stmts {
            match stmt {
                Stmt::Assign { name, expr } => {
                    let value = self.eval(&expr)?;
                    self.env.insert(name, value);
                }
                Stmt::Expr(expr) => {
                    self.eval(&expr)?;
                }
            }
        }
        Ok(())
    }

    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::None => Ok(Value::None),
            Expr::Ident { line, name } => match self.env.get(name) {
                Some(value) => Ok(value.clone()),
                None => Err(EvalError::at(
                    *line,
                    format!("name '{}' is not defined", name),
                )),
            },
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            }
            Expr::Dict { line, entries } => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = match self.eval(key)? {
                        Value::Str(s) => s,
                        other => {
                            return Err(EvalError::at(
                                *line,
                                format!("dict keys must be strings, not {}", other.type_name()),
                            ))
                        }
                    };
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Dict(map))
            }
            Expr::Add { line, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                match (left, right) {
                    (Value::Str(mut a), Value::Str(b)) => {
                        a.push_str(&b);
                        Ok(Value::Str(a))
                    }
                    (Value::List(mut a), Value::List(b)) => {
                        a.extend(b);
                        Ok(Value::List(a))
                    }
                    (a, b) => Err(EvalError::at(
                        *line,
                        format!("cannot add {} and {}", a.type_name(), b.type_name()),
                    )),
                }
            }
            Expr::Call {
                line,
                func,
                positional,
                kwargs,
            } => {
                let func = self.eval(func)?;
                let func = match func {
                    Value::Native(func) => func,
                    other => {
                        return Err(EvalError::at(
                            *line,
                            format!("{} object is not callable", other.type_name()),
                        ))
                    }
                };
                let positional = positional
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let kwargs = kwargs
                    .iter()
                    .map(|(name, arg)| Ok((name.clone(), self.eval(arg)?)))
                    .collect::<Result<Vec<_>, EvalError>>()?;
                func.call(CallArgs {
                    line: Some(*line),
                    positional,
                    kwargs,
                })
            }
        }
    }
}
