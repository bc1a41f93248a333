// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Target kinds, deferred target proxies, and materialized targets.

use crate::address::{parse_spec, Address};
use crate::build_file::BuildFile;
use crate::dsl::{CallArgs, Value};
use crate::errors::Error;
use crate::graph::BuildGraph;
use crate::payload::{FieldValue, Payload};
use once_cell::unsync::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The language/kind tag of a build target.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TargetKind {
    /// A library of Java sources.
    JavaLibrary,
    /// A library of Scala sources.
    ScalaLibrary,
    /// A library of Python sources.
    PythonLibrary,
    /// A collection of JUnit tests.
    JavaTests,
    /// A collection of Python tests.
    PythonTests,
    /// A runnable Java binary.
    JavaBinary,
    /// A runnable Python binary.
    PythonBinary,
    /// Java stubs generated from Thrift IDL.
    JavaThriftLibrary,
    /// Python stubs generated from Thrift IDL.
    PythonThriftLibrary,
    /// Java stubs generated from protobuf definitions.
    JavaProtobufLibrary,
    /// A parser generated from ANTLR grammars.
    JavaAntlrLibrary,
    /// A bundle of loose resource files.
    Resources,
    /// A library backed by pre-built jars rather than sources.
    JarLibrary,
    /// A documentation page.
    Page,
}

impl TargetKind {
    /// Every kind, in alias order.
    pub const ALL: [TargetKind; 14] = [
        TargetKind::JavaLibrary,
        TargetKind::ScalaLibrary,
        TargetKind::PythonLibrary,
        TargetKind::JavaTests,
        TargetKind::PythonTests,
        TargetKind::JavaBinary,
        TargetKind::PythonBinary,
        TargetKind::JavaThriftLibrary,
        TargetKind::PythonThriftLibrary,
        TargetKind::JavaProtobufLibrary,
        TargetKind::JavaAntlrLibrary,
        TargetKind::Resources,
        TargetKind::JarLibrary,
        TargetKind::Page,
    ];

    /// Returns the BUILD-file alias this kind is declared with.
    pub fn alias(self) -> &'static str {
        match self {
            TargetKind::JavaLibrary => "java_library",
            TargetKind::ScalaLibrary => "scala_library",
            TargetKind::PythonLibrary => "python_library",
            TargetKind::JavaTests => "java_tests",
            TargetKind::PythonTests => "python_tests",
            TargetKind::JavaBinary => "java_binary",
            TargetKind::PythonBinary => "python_binary",
            TargetKind::JavaThriftLibrary => "java_thrift_library",
            TargetKind::PythonThriftLibrary => "python_thrift_library",
            TargetKind::JavaProtobufLibrary => "java_protobuf_library",
            TargetKind::JavaAntlrLibrary => "java_antlr_library",
            TargetKind::Resources => "resources",
            TargetKind::JarLibrary => "jar_library",
            TargetKind::Page => "page",
        }
    }

    /// Parameters accepted by every kind.
    const COMMON_PARAMS: &'static [&'static str] = &[
        "sources",
        "labels",
        "description",
        "provides",
        "excludes",
        "configurations",
    ];

    /// Parameters accepted by this kind beyond the common set.
    fn extra_params(self) -> &'static [&'static str] {
        match self {
            TargetKind::JavaBinary | TargetKind::PythonBinary => &["main"],
            TargetKind::JavaThriftLibrary | TargetKind::PythonThriftLibrary => &["thrift_version"],
            TargetKind::JarLibrary => &["jars"],
            TargetKind::Page => &["source", "links"],
            _ => &[],
        }
    }

    /// Parameters this kind requires.
    fn required_params(self) -> &'static [&'static str] {
        match self {
            TargetKind::Page => &["source"],
            _ => &[],
        }
    }

    fn accepts_param(self, name: &str) -> bool {
        Self::COMMON_PARAMS.contains(&name) || self.extra_params().contains(&name)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alias())
    }
}

/// A deferred target record produced by evaluating a BUILD file.
///
/// Proxies exist because dependencies can only be resolved once the whole
/// BUILD-file family has been parsed; the proxy holds the declaration as
/// written and is materialized into a [`Target`] during graph injection.
#[derive(Debug)]
pub struct TargetProxy {
    kind: TargetKind,
    build_file: BuildFile,
    address: Address,
    name: String,
    dependencies: Vec<String>,
    kwargs: Vec<(String, Value)>,
    // Resolved once and cached; resolution failures are reported every time.
    dependency_addresses: OnceCell<Vec<Address>>,
}

impl TargetProxy {
    /// Validates one target-constructor call and records it as a proxy.
    pub(crate) fn from_call(
        kind: TargetKind,
        build_file: &BuildFile,
        mut args: CallArgs,
    ) -> Result<Self, Error> {
        let declaration_error = |message: String| Error::InvalidDeclaration {
            build_file: build_file.to_string(),
            target_type: kind.alias().to_owned(),
            message,
        };

        if !args.positional.is_empty() {
            return Err(declaration_error(format!(
                "all arguments must use explicit keyword syntax; {} positional argument(s) passed",
                args.positional.len()
            )));
        }
        if args.take_kwarg("build_file").is_some() {
            return Err(declaration_error(
                "build_file cannot be passed as an explicit argument".to_owned(),
            ));
        }

        let name = match args.take_kwarg("name") {
            Some(Value::Str(name)) => name,
            Some(other) => {
                return Err(declaration_error(format!(
                    "name must be a string, not {}",
                    other.type_name()
                )))
            }
            None => return Err(declaration_error("name is a required parameter".to_owned())),
        };
        if name.is_empty() || name.contains(':') || name.contains('/') {
            return Err(declaration_error(format!("invalid target name '{}'", name)));
        }

        let dependencies = match args.take_kwarg("dependencies") {
            None | Some(Value::None) => Vec::new(),
            Some(Value::List(items)) => {
                let mut specs = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Str(spec) => specs.push(spec),
                        other => {
                            return Err(declaration_error(format!(
                                "dependencies must be a list of spec strings, found {}",
                                other.type_name()
                            )))
                        }
                    }
                }
                specs
            }
            Some(other) => {
                return Err(declaration_error(format!(
                    "dependencies must be a list of spec strings, not {}",
                    other.type_name()
                )))
            }
        };

        let address = Address::build_file(build_file.spec_path(), &name);
        Ok(Self {
            kind,
            build_file: build_file.clone(),
            address,
            name,
            dependencies,
            kwargs: args.kwargs,
            dependency_addresses: OnceCell::new(),
        })
    }

    /// Returns the kind this proxy will materialize as.
    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Returns the BUILD file this proxy was declared in.
    pub fn build_file(&self) -> &BuildFile {
        &self.build_file
    }

    /// Returns the declared target name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the address this proxy will be injected at.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Returns the dependency specs exactly as declared.
    pub fn dependency_specs(&self) -> &[String] {
        &self.dependencies
    }

    /// Resolves the declared dependency specs against this proxy's BUILD
    /// file and returns the resulting addresses, in declaration order.
    ///
    /// Resolution happens once; the result is cached on the proxy.
    pub fn dependency_addresses(&self) -> Result<&[Address], Error> {
        self.dependency_addresses
            .get_or_try_init(|| {
                self.dependencies
                    .iter()
                    .map(|spec| {
                        let (spec_path, name) =
                            parse_spec(spec, Some(self.build_file.spec_path()))?;
                        Ok(Address::build_file(&spec_path, &name))
                    })
                    .collect::<Result<Vec<_>, Error>>()
            })
            .map(|addresses| addresses.as_slice())
    }

    /// Materializes this proxy into a [`Target`].
    ///
    /// The graph is supplied so that target construction can observe
    /// already-injected dependencies; the core kinds do not currently
    /// consult it.
    pub fn to_target(&self, _graph: &BuildGraph) -> Result<Target, Error> {
        let materialization_error = |message: String| Error::Materialization {
            address: self.address.clone(),
            message,
        };

        let mut sources = Vec::new();
        let mut labels = BTreeSet::new();
        let mut traversable_specs = Vec::new();
        let mut fields = BTreeMap::new();

        for (key, value) in &self.kwargs {
            if !self.kind.accepts_param(key) {
                return Err(materialization_error(format!(
                    "unknown parameter '{}' for {} target",
                    key, self.kind
                )));
            }
            match key.as_str() {
                "sources" => {
                    sources = string_list(value).ok_or_else(|| {
                        materialization_error(format!(
                            "sources must be a list of paths, not {}",
                            value.type_name()
                        ))
                    })?;
                }
                "labels" => {
                    let list = string_list(value).ok_or_else(|| {
                        materialization_error(format!(
                            "labels must be a list of strings, not {}",
                            value.type_name()
                        ))
                    })?;
                    labels.extend(list);
                }
                other => {
                    if other == "links" {
                        traversable_specs = string_list(value).ok_or_else(|| {
                            materialization_error(format!(
                                "links must be a list of specs, not {}",
                                value.type_name()
                            ))
                        })?;
                    }
                    let field = field_value(value).ok_or_else(|| {
                        materialization_error(format!(
                            "parameter '{}' holds a value that cannot be fingerprinted",
                            other
                        ))
                    })?;
                    fields.insert(other.to_owned(), field);
                }
            }
        }

        for required in self.kind.required_params() {
            if !fields.contains_key(*required) {
                return Err(materialization_error(format!(
                    "'{}' is a required parameter for {} targets",
                    required, self.kind
                )));
            }
        }

        let dependencies = self.dependency_addresses()?.to_vec();
        let payload = Payload::new(self.kind, sources, fields);
        Ok(Target {
            address: self.address.clone(),
            kind: self.kind,
            payload,
            dependencies,
            labels,
            traversable_specs,
        })
    }
}

impl fmt::Display for TargetProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(name='{}') at {}",
            self.kind, self.name, self.build_file
        )
    }
}

/// A materialized node in the build graph.
///
/// Targets are immutable once the graph records them, save for label
/// additions, which are idempotent.
#[derive(Clone, Debug)]
pub struct Target {
    address: Address,
    kind: TargetKind,
    payload: Payload,
    dependencies: Vec<Address>,
    labels: BTreeSet<String>,
    traversable_specs: Vec<String>,
}

impl Target {
    /// Returns this target's address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Returns this target's kind tag.
    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Returns this target's invalidation payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the resolved dependency addresses, in declaration order.
    pub fn dependencies(&self) -> &[Address] {
        &self.dependencies
    }

    /// Returns this target's labels, ordered.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|label| label.as_str())
    }

    /// Returns true if this target carries the given label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Adds a label. Returns false if the label was already present.
    pub(crate) fn add_label(&mut self, label: impl Into<String>) -> bool {
        self.labels.insert(label.into())
    }

    /// Returns specs this target discovered at construction time, beyond
    /// those declared by the author.
    pub fn traversable_specs(&self) -> &[String] {
        &self.traversable_specs
    }

    /// Returns a human-readable identifier for this target, safe to embed in
    /// cache-key ids.
    pub fn id(&self) -> String {
        self.address
            .as_str()
            .replace('/', ".")
            .replace(':', ".")
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::List(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect(),
        _ => None,
    }
}

fn field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::None => Some(FieldValue::None),
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Int(i) => Some(FieldValue::Int(*i)),
        Value::Str(s) => Some(FieldValue::Str(s.clone())),
        Value::List(items) => items
            .iter()
            .map(field_value)
            .collect::<Option<Vec<_>>>()
            .map(FieldValue::List),
        Value::Dict(entries) => entries
            .iter()
            .map(|(k, v)| field_value(v).map(|v| (k.clone(), v)))
            .collect::<Option<BTreeMap<_, _>>>()
            .map(FieldValue::Dict),
        Value::Native(_) => None,
    }
}
