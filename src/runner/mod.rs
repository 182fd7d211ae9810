//! Step-chain execution engine.
//!
//! - [`entry`] - Step registry, chain entries and runnable units
//! - [`compiler`] - Resolves a chain into runnable units
//! - [`chain`] - Deferred, sequential execution of a compiled chain
//! - [`isolate`] - Per-item failure isolation
//!
//! # Example
//!
//! ```
//! use phovea_build::runner::{compile, run, RunnableUnit, StepEntry, StepRegistry};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = StepRegistry::new()
//!     .with("fetch", RunnableUnit::noop("fetch"))
//!     .with("build", RunnableUnit::noop("build"))
//!     .with("all", StepEntry::sequence(["fetch", "build"]));
//!
//! let compiled = compile(&registry, &[StepEntry::named("all")]).unwrap();
//! let (trigger, completion) = run(compiled);
//! trigger.start();
//! completion.await.unwrap();
//! # });
//! ```

pub mod chain;
pub mod compiler;
pub mod entry;
pub mod isolate;

pub use chain::{run, run_with_handler, ChainCompletion, ChainTrigger};
pub use compiler::{compile, join_settled, CompiledChain};
pub use entry::{describe_chain, RunnableUnit, StepEntry, StepRegistry, UnitFuture};
pub use isolate::{isolate, FailureMarker};
