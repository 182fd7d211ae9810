//! Steps acting on the whole product rather than one of its parts.

use std::sync::Arc;

use tracing::info;

use crate::compose::{build_compose, product_partial, write_compose};
use crate::config::{BuildContext, ComposePatch, ResolvedProduct};
use crate::error::BuildError;
use crate::runner::{join_settled, RunnableUnit};
use crate::shell::{docker_args, docker_remove_images};
use crate::ui::{render_summary, BuildTheme, ProductOutcome};

use super::fs::empty_dir;
use super::image::push_tags;
use super::Product;

/// Generated compose file, relative to the build directory.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Empty `build/` and every product workspace.
pub fn clean(ctx: &Arc<BuildContext>, products: &[Arc<Product>]) -> RunnableUnit {
    let ctx = Arc::clone(ctx);
    let products = products.to_vec();
    RunnableUnit::new("clean", move || {
        let ctx = Arc::clone(&ctx);
        let products = products.clone();
        async move {
            info!("clean workspace");
            empty_dir(&ctx.build_dir())?;
            for product in &products {
                empty_dir(&product.workspace(&ctx))?;
            }
            Ok::<(), BuildError>(())
        }
    })
}

/// Remove old docker images of this product.
pub fn prune(ctx: &Arc<BuildContext>) -> RunnableUnit {
    let ctx = Arc::clone(ctx);
    RunnableUnit::new("prune", move || {
        let ctx = Arc::clone(&ctx);
        async move {
            docker_remove_images(&ctx, &ctx.product_name).await;
            Ok(())
        }
    })
}

/// Write `build/docker-compose.yml` from the products that built fine.
pub fn compose(
    ctx: &Arc<BuildContext>,
    products: &[Arc<Product>],
    patch: Arc<ComposePatch>,
) -> RunnableUnit {
    let ctx = Arc::clone(ctx);
    let products = products.to_vec();
    RunnableUnit::new("compose", move || {
        let ctx = Arc::clone(&ctx);
        let products = products.clone();
        let patch = Arc::clone(&patch);
        async move {
            info!("create {}", COMPOSE_FILE);
            let mut partials: Vec<(&ResolvedProduct, serde_yaml::Value)> = Vec::new();
            for product in products.iter().filter(|p| !p.is_failed()) {
                let partial = product_partial(&product.spec, &product.workspace(&ctx))?;
                partials.push((&product.spec, partial));
            }
            let compose = build_compose(&partials, &patch);
            write_compose(&ctx.build_dir().join(COMPOSE_FILE), &compose)
        }
    })
}

/// Tag and push the images of products that built fine to `--push-to`.
pub fn push(ctx: &Arc<BuildContext>, products: &[Arc<Product>]) -> RunnableUnit {
    let ctx = Arc::clone(ctx);
    let products = products.to_vec();
    RunnableUnit::new("push", move || {
        let ctx = Arc::clone(&ctx);
        let products = products.clone();
        async move {
            let Some(registry) = ctx.options.push_to.as_deref() else {
                return Ok(());
            };
            info!("push docker images");
            let images: Vec<String> = products
                .iter()
                .filter(|p| !p.is_failed())
                .map(|p| p.spec.image.clone())
                .collect();
            let tags = push_tags(
                &images,
                registry,
                !ctx.options.no_default_tags,
                ctx.options.push_extra.as_deref(),
            );
            if tags.is_empty() {
                return Ok(());
            }

            let root = &ctx.project_root;
            join_settled(tags.iter().map(|(image, tag)| {
                docker_args(&ctx, root, vec!["tag".to_string(), image.clone(), tag.clone()])
            }))
            .await?;
            join_settled(
                tags.iter()
                    .map(|(_, tag)| docker_args(&ctx, root, vec!["push".to_string(), tag.clone()])),
            )
            .await?;
            Ok::<(), BuildError>(())
        }
    })
}

/// Outcome of every product.
pub fn outcomes(products: &[Arc<Product>]) -> Vec<ProductOutcome> {
    products
        .iter()
        .map(|p| ProductOutcome {
            name: p.name().to_string(),
            failure: p.failure.failure(),
        })
        .collect()
}

/// Print the per-product summary.
pub fn summary(products: &[Arc<Product>], theme: BuildTheme) -> RunnableUnit {
    let products = products.to_vec();
    RunnableUnit::new("summary", move || {
        let report = render_summary(&outcomes(&products), &theme);
        async move {
            print!("{}", report);
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_products, BuildOptions, ProductDescriptor};
    use tempfile::TempDir;

    fn setup(json: &str, root: &std::path::Path) -> (Arc<BuildContext>, Vec<Arc<Product>>) {
        let descs: Vec<ProductDescriptor> = serde_json::from_str(json).unwrap();
        let specs =
            resolve_products(&descs, &mut ComposePatch::default(), "demo", "1.0.0", false).unwrap();
        let ctx = BuildContext::new(BuildOptions::default(), root, "demo", "1.0.0");
        (
            Arc::new(ctx),
            specs.into_iter().map(|s| Arc::new(Product::new(s))).collect(),
        )
    }

    #[tokio::test]
    async fn clean_empties_build_and_workspaces() {
        let temp = TempDir::new().unwrap();
        let (ctx, products) = setup(r#"[{"type": "web", "name": "app"}]"#, temp.path());
        let workspace = products[0].workspace(&ctx);
        std::fs::create_dir_all(workspace.join("app")).unwrap();
        std::fs::create_dir_all(ctx.build_dir()).unwrap();
        std::fs::write(ctx.build_dir().join("old.tar.gz"), "x").unwrap();

        clean(&ctx, &products).invoke().await.unwrap();

        assert_eq!(std::fs::read_dir(&workspace).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(ctx.build_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn compose_skips_failed_products() {
        let temp = TempDir::new().unwrap();
        let (ctx, products) = setup(
            r#"[
                {"type": "web", "label": "web", "name": "app"},
                {"type": "api", "label": "api", "name": "server"}
            ]"#,
            temp.path(),
        );
        products[1].failure.record("build:server: boom");

        compose(&ctx, &products, Arc::new(ComposePatch::default()))
            .invoke()
            .await
            .unwrap();

        let written: serde_yaml::Value = serde_yaml::from_str(
            &std::fs::read_to_string(ctx.build_dir().join(COMPOSE_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(written["services"]["web"]["image"], "demo/web:1.0.0");
        assert!(written["services"]["web"].get("links").is_none());
        assert!(written["services"].get("api").is_none());
    }

    #[tokio::test]
    async fn push_without_registry_does_nothing() {
        let temp = TempDir::new().unwrap();
        let (ctx, products) = setup(r#"[{"type": "web", "name": "app"}]"#, temp.path());
        push(&ctx, &products).invoke().await.unwrap();
    }

    #[test]
    fn outcomes_report_failures() {
        let temp = TempDir::new().unwrap();
        let (_, products) = setup(
            r#"[{"type": "web", "name": "app"}, {"type": "api", "name": "server"}]"#,
            temp.path(),
        );
        products[0].failure.record("image:app: boom");

        let outcomes = outcomes(&products);
        assert_eq!(outcomes[0].failure.as_deref(), Some("image:app: boom"));
        assert_eq!(outcomes[1].failure, None);
    }
}
