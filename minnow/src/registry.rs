// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The alias registry: the bindings BUILD files are evaluated against.

use crate::dsl::{CallArgs, EvalError, Value};
use crate::filesets::{self, GlobKind};
use crate::target::TargetKind;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// A factory invoked once per BUILD file with the file's spec path,
/// producing the value bound into that file's environment.
pub type ApplicativeUtil = Rc<dyn Fn(&Utf8Path) -> Value>;

/// A callable bound into every BUILD file's environment, receiving the
/// file's spec path as an implicit trailing argument.
pub type PartialUtil = Rc<dyn Fn(CallArgs, &Utf8Path) -> Result<Value, EvalError>>;

/// The registry of identifiers exposed to BUILD files.
///
/// The registry is an explicit value handed to the evaluator at construction
/// rather than process-wide state, so distinct evaluators (and distinct
/// tests) cannot contaminate each other. Four partitions:
///
/// * *target aliases* -- names that declare a new build target;
/// * *exposed objects* -- constants and helpers bound directly;
/// * *applicative path-relative utils* -- factories invoked per BUILD file
///   with that file's path;
/// * *partial path-relative utils* -- callables that receive the file's path
///   implicitly.
///
/// Registration is idempotent-with-warning: re-registering an alias
/// overwrites the previous binding and logs a warning, but never fails.
/// Plug-ins register additional aliases through the same interface.
#[derive(Clone)]
pub struct AliasRegistry {
    build_root: Utf8PathBuf,
    target_aliases: IndexMap<String, TargetKind>,
    exposed_objects: IndexMap<String, Value>,
    applicative_utils: IndexMap<String, ApplicativeUtil>,
    partial_utils: IndexMap<String, PartialUtil>,
    source_roots: Rc<RefCell<BTreeSet<Utf8PathBuf>>>,
}

impl AliasRegistry {
    /// Creates an empty registry anchored at the given build root.
    pub fn new(build_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            build_root: build_root.into(),
            target_aliases: IndexMap::new(),
            exposed_objects: IndexMap::new(),
            applicative_utils: IndexMap::new(),
            partial_utils: IndexMap::new(),
            source_roots: Rc::new(RefCell::new(BTreeSet::new())),
        }
    }

    /// Creates a registry with the standard alias set: every
    /// [`TargetKind`] alias, the `globs`/`rglobs`/`zglobs` helpers,
    /// `source_root`, and the `buildroot` constant.
    pub fn standard(build_root: impl Into<Utf8PathBuf>) -> Self {
        let mut registry = Self::new(build_root);

        for kind in TargetKind::ALL {
            registry.register_target_alias(kind.alias(), kind);
        }

        registry.register_exposed_object(
            "buildroot",
            Value::Str(registry.build_root.as_str().to_owned()),
        );

        for (alias, glob_kind) in [
            ("globs", GlobKind::Exact),
            ("rglobs", GlobKind::Recursive),
            ("zglobs", GlobKind::ZeroOrMore),
        ] {
            let build_root = registry.build_root.clone();
            registry.register_applicative_path_relative_util(alias, move |rel_path| {
                let dir = build_root.join(rel_path);
                Value::native(alias, move |args| {
                    let mut matches = Vec::new();
                    for pattern in &args.positional {
                        let pattern = pattern.as_str().ok_or_else(|| EvalError {
                            line: args.line,
                            message: format!(
                                "{} patterns must be strings, not {}",
                                alias,
                                pattern.type_name()
                            ),
                        })?;
                        let found = filesets::glob_files(&dir, pattern, glob_kind)
                            .map_err(|message| EvalError {
                                line: args.line,
                                message,
                            })?;
                        matches.extend(found);
                    }
                    matches.sort();
                    matches.dedup();
                    Ok(Value::List(matches.into_iter().map(Value::Str).collect()))
                })
            });
        }

        let source_roots = registry.source_roots.clone();
        registry.register_partial_path_relative_util("source_root", move |mut args, rel_path| {
            let root = match args.positional.first() {
                Some(Value::Str(root)) => root.clone(),
                Some(other) => {
                    return Err(EvalError {
                        line: args.line,
                        message: format!(
                            "source_root takes a path string, not {}",
                            other.type_name()
                        ),
                    })
                }
                None => match args.take_kwarg("path") {
                    Some(Value::Str(root)) => root,
                    _ => {
                        return Err(EvalError {
                            line: args.line,
                            message: "source_root requires a path".to_owned(),
                        })
                    }
                },
            };
            source_roots.borrow_mut().insert(rel_path.join(root));
            Ok(Value::None)
        });

        registry
    }

    /// Returns the build root this registry is anchored at.
    pub fn build_root(&self) -> &Utf8Path {
        &self.build_root
    }

    /// Registers a target alias. Calls of the alias in a BUILD file declare
    /// a target of the given kind.
    pub fn register_target_alias(&mut self, alias: impl Into<String>, kind: TargetKind) {
        let alias = alias.into();
        if self.target_aliases.insert(alias.clone(), kind).is_some() {
            warn!(alias = %alias, "target alias has already been registered, overwriting");
        }
    }

    /// Registers a value bound directly into every BUILD file's environment.
    pub fn register_exposed_object(&mut self, alias: impl Into<String>, value: Value) {
        let alias = alias.into();
        if self.exposed_objects.insert(alias.clone(), value).is_some() {
            warn!(alias = %alias, "exposed object alias has already been registered, overwriting");
        }
    }

    /// Registers a factory invoked once per BUILD file with the file's spec
    /// path; the returned value is bound under the alias.
    pub fn register_applicative_path_relative_util(
        &mut self,
        alias: impl Into<String>,
        factory: impl Fn(&Utf8Path) -> Value + 'static,
    ) {
        let alias = alias.into();
        if self
            .applicative_utils
            .insert(alias.clone(), Rc::new(factory))
            .is_some()
        {
            warn!(
                alias = %alias,
                "applicative path relative util alias has already been registered, overwriting"
            );
        }
    }

    /// Registers a callable that receives the enclosing BUILD file's spec
    /// path as an implicit trailing argument.
    pub fn register_partial_path_relative_util(
        &mut self,
        alias: impl Into<String>,
        util: impl Fn(CallArgs, &Utf8Path) -> Result<Value, EvalError> + 'static,
    ) {
        let alias = alias.into();
        if self
            .partial_utils
            .insert(alias.clone(), Rc::new(util))
            .is_some()
        {
            warn!(
                alias = %alias,
                "partial path relative util alias has already been registered, overwriting"
            );
        }
    }

    /// Returns the source roots registered so far by `source_root` calls,
    /// relative to the build root.
    pub fn source_roots(&self) -> Vec<Utf8PathBuf> {
        self.source_roots.borrow().iter().cloned().collect()
    }

    pub(crate) fn target_aliases(&self) -> impl Iterator<Item = (&str, TargetKind)> {
        self.target_aliases.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub(crate) fn exposed_objects(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.exposed_objects.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn applicative_utils(&self) -> impl Iterator<Item = (&str, &ApplicativeUtil)> {
        self.applicative_utils.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn partial_utils(&self) -> impl Iterator<Item = (&str, &PartialUtil)> {
        self.partial_utils.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Debug for AliasRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliasRegistry")
            .field("build_root", &self.build_root)
            .field(
                "target_aliases",
                &self.target_aliases.keys().collect::<Vec<_>>(),
            )
            .field(
                "exposed_objects",
                &self.exposed_objects.keys().collect::<Vec<_>>(),
            )
            .field(
                "applicative_utils",
                &self.applicative_utils.keys().collect::<Vec<_>>(),
            )
            .field(
                "partial_utils",
                &self.partial_utils.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}
