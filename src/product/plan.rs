//! The step registry and default chain of a product build.
//!
//! Every product `<name>` contributes `clone:<name>`, `prepare:<name>`,
//! `install:<name>`, `show:<name>`, `build:<name>`, `data:<name>`,
//! `postbuild:<name>`, `image:<name>`, `save:<name>` and the sequence
//! `product:<name>`. Meta steps such as `build` group all `build:` steps.

use std::sync::Arc;

use tracing::error;

use crate::config::{BuildContext, ComposePatch, ResolvedProduct};
use crate::error::{BuildError, Result};
use crate::runner::{StepEntry, StepRegistry};
use crate::ui::{BuildTheme, ProductOutcome};

use super::global;
use super::tasks;
use super::Product;

/// Meta steps grouping every `<meta>:` step.
pub const META_STEPS: [&str; 8] = [
    "clone",
    "prepare",
    "build",
    "postbuild",
    "image",
    "product",
    "install",
    "show",
];

/// Registry, default chain and the products they operate on.
#[derive(Debug)]
pub struct BuildPlan {
    /// All named steps.
    pub registry: StepRegistry,
    /// Chain executed when no explicit steps are given.
    pub chain: Vec<StepEntry>,
    /// Buildable products, in descriptor order.
    pub products: Vec<Arc<Product>>,
}

impl BuildPlan {
    /// Plan the build of `specs`.
    ///
    /// Products of unknown type are logged and left out.
    pub fn new(
        ctx: Arc<BuildContext>,
        specs: Vec<ResolvedProduct>,
        patch: ComposePatch,
        theme: BuildTheme,
    ) -> Self {
        let options = &ctx.options;
        let products: Vec<Arc<Product>> = specs
            .into_iter()
            .filter(|spec| match check_buildable(spec) {
                Ok(()) => true,
                Err(err) => {
                    error!("{}", err);
                    false
                }
            })
            .map(|spec| Arc::new(Product::new(spec)))
            .collect();

        let mut registry = StepRegistry::new();
        registry.insert("clean", global::clean(&ctx, &products));
        registry.insert("prune", global::prune(&ctx));
        registry.insert("compose", global::compose(&ctx, &products, Arc::new(patch)));
        registry.insert("push", global::push(&ctx, &products));
        registry.insert("summary", global::summary(&products, theme));

        let mut product_chains = Vec::with_capacity(products.len());
        for product in &products {
            let entry = register_product(&mut registry, &ctx, product);
            product_chains.push((format!("product:{}", product.name()), entry));
        }

        for meta in META_STEPS {
            let names: Vec<String> = registry
                .names_with_prefix(meta)
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                continue;
            }
            let group = if options.serial {
                StepEntry::sequence(names)
            } else {
                StepEntry::parallel(names)
            };
            registry.insert(meta, group);
        }

        let mut chain = vec![StepEntry::named("clean")];
        if !options.skip_clean_up {
            chain.push(StepEntry::named("prune"));
        }
        if options.serial {
            chain.extend(product_chains.into_iter().map(|(_, entry)| entry));
        } else {
            chain.push(StepEntry::Parallel(product_chains));
        }
        chain.push(StepEntry::named("compose"));
        if options.push_to.is_some() {
            chain.push(StepEntry::named("push"));
        }
        chain.push(StepEntry::named("summary"));

        Self {
            registry,
            chain,
            products,
        }
    }

    /// Replace the default chain with explicit step names.
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain = steps.into_iter().map(StepEntry::named).collect();
        self
    }

    /// Outcome of every product so far.
    pub fn outcomes(&self) -> Vec<ProductOutcome> {
        global::outcomes(&self.products)
    }

    /// Check whether any product recorded a failure.
    pub fn has_failures(&self) -> bool {
        self.products.iter().any(|p| p.is_failed())
    }
}

/// Check that `spec` is a web or server product.
pub fn check_buildable(spec: &ResolvedProduct) -> Result<()> {
    if spec.kind.is_web() || spec.kind.is_server() {
        Ok(())
    } else {
        Err(BuildError::UnknownProductType {
            kind: spec.kind.to_string(),
        })
    }
}

/// Register the steps of one product; returns its `product:<name>` sequence.
fn register_product(
    registry: &mut StepRegistry,
    ctx: &Arc<BuildContext>,
    product: &Arc<Product>,
) -> StepEntry {
    let suffix = product.name().to_string();
    let step = |name: &str| format!("{}:{}", name, suffix);
    let spec = &product.spec;

    registry.insert(step("clone"), tasks::clone(ctx, product));
    let mut sub = vec![StepEntry::named(step("clone"))];

    if !spec.additional.is_empty() {
        let keys: Vec<String> = spec
            .additional
            .iter()
            .enumerate()
            .map(|(i, extra)| {
                let key = format!("clone:{}:{}", suffix, extra.name);
                registry.insert(key.clone(), tasks::clone_additional(ctx, product, i));
                key
            })
            .collect();
        if ctx.options.serial {
            sub.extend(keys.into_iter().map(StepEntry::named));
        } else {
            sub.push(StepEntry::parallel(keys));
        }
    }

    registry.insert(step("prepare"), tasks::prepare(ctx, product));
    registry.insert(step("install"), tasks::install(ctx, product));
    registry.insert(step("show"), tasks::show(ctx, product));
    registry.insert(step("build"), tasks::build(ctx, product));
    registry.insert(step("data"), tasks::data(ctx, product));
    registry.insert(step("postbuild"), tasks::postbuild(ctx, product));
    registry.insert(step("image"), tasks::image(ctx, product));
    registry.insert(step("save"), tasks::save(ctx, product));

    for name in ["prepare", "install", "show", "build"] {
        sub.push(StepEntry::named(step(name)));
    }
    if spec.kind.is_server() && !spec.data.is_empty() {
        sub.push(StepEntry::named(step("data")));
    }
    if spec.kind.is_web() {
        sub.push(StepEntry::named(step("postbuild")));
    }
    sub.push(StepEntry::named(step("image")));
    if !ctx.options.skip_save_image {
        sub.push(StepEntry::named(step("save")));
    }

    let entry = StepEntry::Sequential(sub);
    registry.insert(step("product"), entry.clone());
    entry
}
