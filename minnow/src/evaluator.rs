// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Evaluates BUILD files and harvests the target proxies they declare.

use crate::address::Address;
use crate::build_file::BuildFile;
use crate::dsl::{Interpreter, Value};
use crate::errors::Error;
use crate::registry::AliasRegistry;
use crate::target::TargetProxy;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::debug;

/// Evaluates BUILD files against an [`AliasRegistry`] and records the target
/// proxies they declare.
///
/// Evaluation is single-threaded and synchronous: each BUILD file runs to
/// completion before the next is touched, so the ordering of side effects
/// within a file is deterministic. Files are parsed at most once; a
/// BUILD-file *family* (all BUILD files in one directory) is evaluated as a
/// unit, with address uniqueness enforced across the family and against
/// every previously evaluated file.
#[derive(Debug)]
pub struct BuildFileEvaluator {
    root_dir: Utf8PathBuf,
    registry: AliasRegistry,
    parsed_files: HashSet<BuildFile>,
    parsed_families: HashSet<Utf8PathBuf>,
    proxies_by_address: HashMap<Address, Rc<TargetProxy>>,
    addresses_by_build_file: HashMap<BuildFile, Vec<Address>>,
}

impl BuildFileEvaluator {
    /// Creates an evaluator rooted at `root_dir`, using the given registry.
    pub fn new(root_dir: impl Into<Utf8PathBuf>, registry: AliasRegistry) -> Self {
        Self {
            root_dir: root_dir.into(),
            registry,
            parsed_files: HashSet::new(),
            parsed_families: HashSet::new(),
            proxies_by_address: HashMap::new(),
            addresses_by_build_file: HashMap::new(),
        }
    }

    /// Returns the build root this evaluator reads BUILD files under.
    pub fn root_dir(&self) -> &Utf8Path {
        &self.root_dir
    }

    /// Returns the registry this evaluator binds BUILD files against.
    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    /// Evaluates every not-yet-parsed member of the BUILD-file family in
    /// `spec_path`, atomically with respect to uniqueness checks: either the
    /// whole family is recorded or none of it is.
    pub fn parse_build_file_family(&mut self, spec_path: &Utf8Path) -> Result<(), Error> {
        if self.parsed_families.contains(spec_path) {
            return Ok(());
        }

        let head = BuildFile::new(self.root_dir.clone(), spec_path.to_owned())?;
        let mut staged = Vec::new();
        for member in head.family()? {
            if self.parsed_files.contains(&member) {
                debug!(build_file = %member, "BUILD file has already been parsed");
                continue;
            }
            let proxies = self.evaluate_file(&member)?;
            staged.push((member, proxies));
        }

        // Uniqueness across the staged family and against everything already
        // recorded, before anything is committed.
        let mut seen: HashSet<Address> = HashSet::new();
        for (member, proxies) in &staged {
            for proxy in proxies {
                let address = proxy.address();
                if self.proxies_by_address.contains_key(address) || !seen.insert(address.clone()) {
                    return Err(Error::DuplicateAddress {
                        address: address.clone(),
                        build_file: member.to_string(),
                    });
                }
            }
        }

        for (member, proxies) in staged {
            self.record(member, proxies);
        }
        self.parsed_families.insert(spec_path.to_owned());
        Ok(())
    }

    /// Evaluates a single BUILD file, if it has not been parsed already.
    ///
    /// Most callers should prefer [`parse_build_file_family`], which keeps a
    /// directory's BUILD files atomic with respect to uniqueness checks.
    ///
    /// [`parse_build_file_family`]: Self::parse_build_file_family
    pub fn parse_build_file(&mut self, build_file: &BuildFile) -> Result<(), Error> {
        if self.parsed_files.contains(build_file) {
            debug!(build_file = %build_file, "BUILD file has already been parsed");
            return Ok(());
        }
        let proxies = self.evaluate_file(build_file)?;

        let mut seen: HashSet<Address> = HashSet::new();
        for proxy in &proxies {
            let address = proxy.address();
            if self.proxies_by_address.contains_key(address) || !seen.insert(address.clone()) {
                return Err(Error::DuplicateAddress {
                    address: address.clone(),
                    build_file: build_file.to_string(),
                });
            }
        }

        self.record(build_file.clone(), proxies);
        Ok(())
    }

    /// Returns true if the given BUILD file has been parsed.
    pub fn is_parsed(&self, build_file: &BuildFile) -> bool {
        self.parsed_files.contains(build_file)
    }

    /// Returns the proxy recorded at `address`, if any.
    pub fn proxy(&self, address: &Address) -> Option<Rc<TargetProxy>> {
        self.proxies_by_address.get(address).cloned()
    }

    /// Returns the addresses declared by the given BUILD file, in
    /// declaration order.
    pub fn addresses_defined_by(&self, build_file: &BuildFile) -> &[Address] {
        self.addresses_by_build_file
            .get(build_file)
            .map(|addresses| addresses.as_slice())
            .unwrap_or(&[])
    }

    /// Returns every recorded address, in no particular order.
    pub fn all_addresses(&self) -> impl Iterator<Item = &Address> {
        self.proxies_by_address.keys()
    }

    // ---
    // Internal methods
    // ---

    /// Prepares a binding environment, executes the BUILD file's script, and
    /// harvests the target proxies it declared. Nothing is recorded on the
    /// evaluator.
    fn evaluate_file(&self, build_file: &BuildFile) -> Result<Vec<TargetProxy>, Error> {
        debug!(build_file = %build_file, "parsing BUILD file");
        let source = build_file.source()?;
        let spec_path = build_file.spec_path();

        let mut env: IndexMap<String, Value> = IndexMap::new();
        for (alias, value) in self.registry.exposed_objects() {
            env.insert(alias.to_owned(), value.clone());
        }
        for (alias, util) in self.registry.partial_utils() {
            let util = util.clone();
            let spec_path = spec_path.to_owned();
            env.insert(
                alias.to_owned(),
                Value::native(alias, move |args| util(args, &spec_path)),
            );
        }
        for (alias, factory) in self.registry.applicative_utils() {
            env.insert(alias.to_owned(), factory(spec_path));
        }

        // Target aliases are bound last: a target alias shadows any util or
        // exposed object registered under the same name.
        let collector: Rc<RefCell<Vec<TargetProxy>>> = Rc::new(RefCell::new(Vec::new()));
        let declaration_error: Rc<RefCell<Option<Error>>> = Rc::new(RefCell::new(None));
        for (alias, kind) in self.registry.target_aliases() {
            let build_file = build_file.clone();
            let collector = collector.clone();
            let declaration_error = declaration_error.clone();
            env.insert(
                alias.to_owned(),
                Value::native(alias, move |args| {
                    match TargetProxy::from_call(kind, &build_file, args) {
                        Ok(proxy) => {
                            collector.borrow_mut().push(proxy);
                            Ok(Value::None)
                        }
                        Err(err) => {
                            let message = err.to_string();
                            *declaration_error.borrow_mut() = Some(err);
                            Err(crate::dsl::EvalError::new(message))
                        }
                    }
                }),
            );
        }

        let mut interpreter = Interpreter::new(env);
        if let Err(eval_error) = interpreter.run(&source) {
            // A declaration failure surfaces with its own error type; any
            // other script failure is an evaluation error with file context.
            if let Some(err) = declaration_error.borrow_mut().take() {
                return Err(err);
            }
            return Err(Error::Evaluation {
                build_file: build_file.full_path().to_string(),
                message: eval_error.to_string(),
            });
        }
        drop(interpreter);

        let proxies = collector.take();
        debug!(
            build_file = %build_file,
            count = proxies.len(),
            "BUILD file produced target proxies"
        );
        Ok(proxies)
    }

    fn record(&mut self, build_file: BuildFile, proxies: Vec<TargetProxy>) {
        let mut addresses = Vec::with_capacity(proxies.len());
        for proxy in proxies {
            let address = proxy.address().clone();
            debug!(proxy = %proxy, address = %address, "recording target proxy");
            addresses.push(address.clone());
            self.proxies_by_address.insert(address, Rc::new(proxy));
        }
        self.addresses_by_build_file.insert(build_file.clone(), addresses);
        self.parsed_files.insert(build_file);
    }
}
