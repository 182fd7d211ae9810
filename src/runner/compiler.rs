//! Chain compilation.
//!
//! Turns a chain of [`StepEntry`] values into one [`RunnableUnit`] per
//! top-level entry. Names are resolved through the [`StepRegistry`] on every
//! occurrence; groups become composite units:
//!
//! - a sequential group runs its children in order and stops at the first
//!   failure
//! - a parallel group starts every child, waits for all of them and then
//!   reports the first failure in declaration order
//!
//! Compilation fails as a whole on the first unresolved name or on a step
//! that expands into itself.

use std::future::Future;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{BuildError, Result};

use super::entry::{RunnableUnit, StepEntry, StepRegistry};

/// Units produced by [`compile`], one per top-level chain entry.
#[derive(Debug, Clone, Default)]
pub struct CompiledChain {
    units: Vec<RunnableUnit>,
}

impl CompiledChain {
    /// Number of top-level units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the chain has no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Borrow the compiled units.
    pub fn units(&self) -> &[RunnableUnit] {
        &self.units
    }

    /// Take ownership of the compiled units.
    pub fn into_units(self) -> Vec<RunnableUnit> {
        self.units
    }
}

/// Compile a chain against a registry.
pub fn compile(registry: &StepRegistry, chain: &[StepEntry]) -> Result<CompiledChain> {
    let mut path = Vec::new();
    let units = chain
        .iter()
        .map(|entry| compile_entry(registry, entry, &mut path))
        .collect::<Result<Vec<_>>>()?;
    Ok(CompiledChain { units })
}

/// Compile a single entry. `path` holds the names currently being expanded.
fn compile_entry(
    registry: &StepRegistry,
    entry: &StepEntry,
    path: &mut Vec<String>,
) -> Result<RunnableUnit> {
    match entry {
        StepEntry::Direct(unit) => Ok(unit.clone()),
        StepEntry::Named(name) => {
            let Some(resolved) = registry.get(name) else {
                return Err(BuildError::InvalidStep { name: name.clone() });
            };

            if let Some(start) = path.iter().position(|p| p == name) {
                let mut cycle = path[start..].to_vec();
                cycle.push(name.clone());
                return Err(BuildError::CircularStep {
                    cycle: cycle.join(" -> "),
                });
            }

            path.push(name.clone());
            let unit = compile_entry(registry, resolved, path);
            path.pop();

            Ok(attribute(name, unit?))
        }
        StepEntry::Sequential(children) => {
            let shape = entry.describe();
            debug!("expand sequential sub chain: {}", shape);
            let units = children
                .iter()
                .map(|child| compile_entry(registry, child, path))
                .collect::<Result<Vec<_>>>()?;
            Ok(sequential(shape, units))
        }
        StepEntry::Parallel(children) => {
            let shape = entry.describe();
            debug!("expand parallel sub chain: {}", shape);
            let units = children
                .iter()
                .map(|(_, child)| compile_entry(registry, child, path))
                .collect::<Result<Vec<_>>>()?;
            Ok(parallel(shape, units))
        }
    }
}

/// Attribute failures of a resolved step to its name.
fn attribute(name: &str, unit: RunnableUnit) -> RunnableUnit {
    let step = name.to_string();
    RunnableUnit::new(name, move || {
        let step = step.clone();
        let fut = unit.invoke();
        async move { fut.await.map_err(|err| err.in_step(&step)) }
    })
}

/// Await every future, then report the first failure in iteration order.
///
/// Unlike `try_join_all`, a failing member does not drop its siblings.
pub async fn join_settled<I, F, T>(futures: I) -> Result<()>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T>>,
{
    join_all(futures)
        .await
        .into_iter()
        .collect::<Result<Vec<T>>>()
        .map(|_| ())
}

fn sequential(shape: Value, units: Vec<RunnableUnit>) -> RunnableUnit {
    let label = shape.to_string();
    RunnableUnit::new(label, move || {
        let units = units.clone();
        let shape = shape.clone();
        async move {
            info!("run sequential sub chain: {}", shape);
            for unit in &units {
                unit.invoke().await?;
            }
            Ok::<(), BuildError>(())
        }
    })
}

fn parallel(shape: Value, units: Vec<RunnableUnit>) -> RunnableUnit {
    let label = shape.to_string();
    RunnableUnit::new(label, move || {
        let units = units.clone();
        let shape = shape.clone();
        async move {
            info!("run parallel sub chain: {}", shape);
            join_settled(units.iter().map(RunnableUnit::invoke)).await
        }
    })
}
