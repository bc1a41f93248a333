// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::dsl::{CallArgs, Interpreter, Value};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Runs a script in an environment with a `record` function that captures
/// the arguments of every call.
fn run_recording(source: &str) -> Result<Vec<CallArgs>, String> {
    let recorded: Rc<RefCell<Vec<CallArgs>>> = Rc::new(RefCell::new(Vec::new()));
    let mut env = IndexMap::new();
    let sink = recorded.clone();
    env.insert(
        "record".to_owned(),
        Value::native("record", move |args| {
            sink.borrow_mut().push(args);
            Ok(Value::None)
        }),
    );
    let result = Interpreter::new(env).run(source);
    match result {
        Ok(()) => Ok(recorded.take()),
        Err(err) => Err(err.to_string()),
    }
}

fn kwarg(args: &CallArgs, name: &str) -> Value {
    args.kwargs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| panic!("kwarg '{}' not found", name))
}

#[test]
fn literals_and_kwargs_reach_the_callee() {
    let calls = run_recording(
        "record(name='x', n=42, flag=True, off=False, nothing=None, xs=['a', 'b'], d={'k': 'v'})",
    )
    .expect("script should run");
    assert_eq!(calls.len(), 1);
    let args = &calls[0];
    assert!(args.positional.is_empty());
    assert_eq!(kwarg(args, "name"), Value::Str("x".to_owned()));
    assert_eq!(kwarg(args, "n"), Value::Int(42));
    assert_eq!(kwarg(args, "flag"), Value::Bool(true));
    assert_eq!(kwarg(args, "off"), Value::Bool(false));
    assert_eq!(kwarg(args, "nothing"), Value::None);
    assert_eq!(
        kwarg(args, "xs"),
        Value::List(vec![Value::Str("a".to_owned()), Value::Str("b".to_owned())])
    );
    let mut expected = BTreeMap::new();
    expected.insert("k".to_owned(), Value::Str("v".to_owned()));
    assert_eq!(kwarg(args, "d"), Value::Dict(expected));
}

#[test]
fn concatenation_of_strings_and_lists() {
    let calls = run_recording("record(s='a' + 'b' + 'c', xs=['a'] + ['b'])")
        .expect("script should run");
    assert_eq!(kwarg(&calls[0], "s"), Value::Str("abc".to_owned()));
    assert_eq!(
        kwarg(&calls[0], "xs"),
        Value::List(vec![Value::Str("a".to_owned()), Value::Str("b".to_owned())])
    );
}

#[test]
fn multi_line_calls_comments_and_escapes() {
    let source = r#"
# A leading comment.
record(
  name='multi',  # trailing comment
  text='tab\there \'quoted\'',
)

record(name="second")
"#;
    let calls = run_recording(source).expect("script should run");
    assert_eq!(calls.len(), 2);
    assert_eq!(
        kwarg(&calls[0], "text"),
        Value::Str("tab\there 'quoted'".to_owned())
    );
    assert_eq!(kwarg(&calls[1], "name"), Value::Str("second".to_owned()));
}

#[test]
fn assignments_extend_the_environment() {
    let source = "common = ['shared']\nrecord(xs=common + ['extra'])";
    let calls = run_recording(source).expect("script should run");
    assert_eq!(
        kwarg(&calls[0], "xs"),
        Value::List(vec![
            Value::Str("shared".to_owned()),
            Value::Str("extra".to_owned())
        ])
    );
}

#[test]
fn positional_arguments_are_passed_through() {
    let calls = run_recording("record('one', 'two')").expect("script should run");
    assert_eq!(
        calls[0].positional,
        vec![Value::Str("one".to_owned()), Value::Str("two".to_owned())]
    );
}

#[test]
fn unknown_name_reports_the_line() {
    let err = run_recording("record(name='ok')\nmystery(name='x')").unwrap_err();
    assert!(err.contains("line 2"), "unexpected error: {}", err);
    assert!(err.contains("'mystery' is not defined"), "unexpected error: {}", err);
}

#[test]
fn positional_after_keyword_is_rejected() {
    let err = run_recording("record(name='x', 'oops')").unwrap_err();
    assert!(
        err.contains("positional argument follows keyword argument"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn duplicate_keyword_is_rejected() {
    let err = run_recording("record(name='x', name='y')").unwrap_err();
    assert!(
        err.contains("duplicate keyword argument 'name'"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn calling_a_non_callable_is_an_error() {
    let err = run_recording("x = 'str'\nx()").unwrap_err();
    assert!(
        err.contains("string object is not callable"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn unterminated_string_is_an_error() {
    let err = run_recording("record(name='unclosed").unwrap_err();
    assert!(err.contains("unterminated string"), "unexpected error: {}", err);
}

#[test]
fn dict_keys_must_be_strings() {
    let err = run_recording("record(d={42: 'v'})").unwrap_err();
    assert!(
        err.contains("dict keys must be strings"),
        "unexpected error: {}",
        err
    );
}
