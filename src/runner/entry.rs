//! Step registry and chain entries.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};

use crate::error::Result;

/// Future returned by invoking a [`RunnableUnit`].
pub type UnitFuture = BoxFuture<'static, Result<()>>;

type UnitFn = dyn Fn() -> UnitFuture + Send + Sync;

/// A zero-argument unit of work that completes asynchronously or fails.
///
/// Units are cheap to clone; clones share the same underlying operation. The
/// registry may hand the same unit to several compiled occurrences, each of
/// which invokes it once.
#[derive(Clone)]
pub struct RunnableUnit {
    label: Arc<str>,
    op: Arc<UnitFn>,
}

impl RunnableUnit {
    /// Create a unit from a closure producing a future.
    pub fn new<F, Fut>(label: impl Into<String>, op: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            label: Arc::from(label.into()),
            op: Arc::new(move || op().boxed()),
        }
    }

    /// A unit that completes immediately.
    pub fn noop(label: impl Into<String>) -> Self {
        Self::new(label, || async { Ok(()) })
    }

    /// Diagnostic label of this unit.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Start the operation.
    pub fn invoke(&self) -> UnitFuture {
        (self.op)()
    }
}

impl fmt::Debug for RunnableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableUnit")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// One entry of a chain or of a registry group.
#[derive(Debug, Clone)]
pub enum StepEntry {
    /// An atomic operation.
    Direct(RunnableUnit),
    /// Reference to another registry step.
    Named(String),
    /// Entries that run strictly one after another.
    Sequential(Vec<StepEntry>),
    /// Entries started together and joined at completion, keyed by label.
    Parallel(Vec<(String, StepEntry)>),
}

impl StepEntry {
    /// Reference a registry step by name.
    pub fn named(name: impl Into<String>) -> Self {
        StepEntry::Named(name.into())
    }

    /// Sequential group of named steps.
    pub fn sequence<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StepEntry::Sequential(names.into_iter().map(StepEntry::named).collect())
    }

    /// Parallel group of named steps, each keyed by its own name.
    pub fn parallel<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StepEntry::Parallel(
            names
                .into_iter()
                .map(|name| {
                    let name = name.into();
                    (name.clone(), StepEntry::Named(name))
                })
                .collect(),
        )
    }

    /// JSON shape of this entry, used for logging and listings.
    ///
    /// Names render as strings, sequential groups as arrays, parallel groups
    /// as objects and direct units as `<label>`.
    pub fn describe(&self) -> Value {
        match self {
            StepEntry::Direct(unit) => Value::String(format!("<{}>", unit.label())),
            StepEntry::Named(name) => Value::String(name.clone()),
            StepEntry::Sequential(entries) => {
                Value::Array(entries.iter().map(StepEntry::describe).collect())
            }
            StepEntry::Parallel(entries) => {
                let mut map = Map::new();
                for (key, entry) in entries {
                    map.insert(key.clone(), entry.describe());
                }
                Value::Object(map)
            }
        }
    }
}

impl From<RunnableUnit> for StepEntry {
    fn from(unit: RunnableUnit) -> Self {
        StepEntry::Direct(unit)
    }
}

impl From<&str> for StepEntry {
    fn from(name: &str) -> Self {
        StepEntry::named(name)
    }
}

/// Render a chain as pretty JSON.
pub fn describe_chain(chain: &[StepEntry]) -> String {
    let shape = Value::Array(chain.iter().map(StepEntry::describe).collect());
    serde_json::to_string_pretty(&shape).unwrap_or_else(|_| shape.to_string())
}

/// Mapping from step name to its definition.
///
/// Keeps registration order so listings and meta groups are deterministic.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    entries: HashMap<String, StepEntry>,
    order: Vec<String>,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a step.
    pub fn insert(&mut self, name: impl Into<String>, entry: impl Into<StepEntry>) {
        let name = name.into();
        if self.entries.insert(name.clone(), entry.into()).is_none() {
            self.order.push(name);
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, entry: impl Into<StepEntry>) -> Self {
        self.insert(name, entry);
        self
    }

    /// Look up a step.
    pub fn get(&self, name: &str) -> Option<&StepEntry> {
        self.entries.get(name)
    }

    /// Check if a step exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Step names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Names registered under `<prefix>:`, in registration order.
    pub fn names_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.names().filter(move |name| {
            name.strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with(':'))
        })
    }

    /// Number of registered steps.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
