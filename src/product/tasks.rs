//! Per-product build tasks.
//!
//! Every constructor returns a [`RunnableUnit`] labelled `<step>:<product>`
//! and isolated on the product's failure marker, so a broken product never
//! stops its siblings.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{BuildContext, ProductType, RepoSpec};
use crate::error::{BuildError, Result};
use crate::repo::{process_env, to_repo_url_with_user};
use crate::runner::{isolate, RunnableUnit};
use crate::shell::{docker_args, docker_save, generator, git_clone, npm, pip};

use super::data::fetch_data;
use super::fs::{copy_dir, empty_dir, move_file};
use super::image::{dockerfile_for, patch_dockerfile, proxy_build_args, retag};
use super::workspace::{patch_workspace, resolve_plugin_type};
use super::Product;

/// Clone `repo` into `cwd/<repo.name>`.
pub async fn clone_repo(ctx: &BuildContext, cwd: &Path, repo: &RepoSpec) -> Result<()> {
    let url = to_repo_url_with_user(&repo.repo, ctx.options.use_ssh, process_env);
    git_clone(ctx, cwd, &url, &repo.branch, &repo.name)
        .await
        .map_err(|err| match err {
            // keep credentials out of error messages
            BuildError::CommandFailed { code, .. } => BuildError::CommandFailed {
                command: format!("git clone {} ({})", repo.repo, repo.branch),
                code,
            },
            other => other,
        })?;
    Ok(())
}

fn step_label(step: &str, product: &Product) -> String {
    format!("{}:{}", step, product.name())
}

fn product_unit<F, Fut>(
    ctx: &Arc<BuildContext>,
    product: &Arc<Product>,
    label: String,
    op: F,
) -> RunnableUnit
where
    F: Fn(Arc<BuildContext>, Arc<Product>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let shared_ctx = Arc::clone(ctx);
    let shared_product = Arc::clone(product);
    let unit = RunnableUnit::new(label, move || {
        op(Arc::clone(&shared_ctx), Arc::clone(&shared_product))
    });
    isolate(product.name(), unit, &product.failure)
}

/// Clone the product's main repository.
pub fn clone(ctx: &Arc<BuildContext>, product: &Arc<Product>) -> RunnableUnit {
    product_unit(ctx, product, step_label("clone", product), |ctx, p| async move {
        let workspace = p.workspace(&ctx);
        tokio::fs::create_dir_all(&workspace).await?;
        clone_repo(&ctx, &workspace, &p.spec.repo).await
    })
}

/// Clone the `index`-th additional repository.
pub fn clone_additional(ctx: &Arc<BuildContext>, product: &Arc<Product>, index: usize) -> RunnableUnit {
    let label = match product.spec.additional.get(index) {
        Some(extra) => format!("clone:{}:{}", product.name(), extra.name),
        None => step_label("clone", product),
    };
    product_unit(ctx, product, label, move |ctx, p| async move {
        let extra = p.spec.additional.get(index).ok_or_else(|| {
            anyhow::anyhow!("{} has no additional repository #{}", p.name(), index)
        })?;
        let workspace = p.workspace(&ctx);
        tokio::fs::create_dir_all(&workspace).await?;
        clone_repo(&ctx, &workspace, extra).await
    })
}

/// Generate the workspace and apply project-level patches.
pub fn prepare(ctx: &Arc<BuildContext>, product: &Arc<Product>) -> RunnableUnit {
    product_unit(ctx, product, step_label("prepare", product), |ctx, p| async move {
        let workspace = p.workspace(&ctx);
        let args = vec![
            "--noAdditionals".to_string(),
            format!("--defaultApp={}", p.spec.name),
            "--addWorkspaceRepos=false".to_string(),
        ];
        generator(&ctx, &workspace, "workspace", &args).await?;
        patch_workspace(&ctx, &p.spec)
    })
}

/// Install dependencies: npm for web products, pip test requirements for
/// servers. Servers skip this entirely with `--skip-tests`.
pub fn install(ctx: &Arc<BuildContext>, product: &Arc<Product>) -> RunnableUnit {
    if product.spec.kind.is_web() {
        return product_unit(ctx, product, step_label("install", product), |ctx, p| async move {
            npm(&ctx, &p.workspace(&ctx), "install").await?;
            Ok::<(), BuildError>(())
        });
    }
    if ctx.options.skip_tests {
        return RunnableUnit::noop(format!("install:{}", product.name()));
    }
    product_unit(ctx, product, step_label("install", product), |ctx, p| async move {
        info!("create test environment");
        let workspace = p.workspace(&ctx);
        pip(&ctx, &workspace, "install --no-cache-dir -r requirements.txt").await?;
        pip(&ctx, &workspace, "install --no-cache-dir -r requirements_dev.txt").await?;
        Ok::<(), BuildError>(())
    })
}

/// List installed dependencies. Failures are logged and ignored.
pub fn show(ctx: &Arc<BuildContext>, product: &Arc<Product>) -> RunnableUnit {
    product_unit(ctx, product, step_label("show", product), |ctx, p| async move {
        let workspace = p.workspace(&ctx);
        let listed = if p.spec.kind.is_web() {
            npm(&ctx, &workspace, "list --depth=1").await
        } else {
            pip(&ctx, &workspace, "list").await
        };
        if let Err(err) = listed {
            warn!("listing dependencies of {} failed: {}", p.name(), err);
        }
        Ok(())
    })
}

async fn build_web(ctx: Arc<BuildContext>, p: Arc<Product>) -> Result<()> {
    let workspace = p.workspace(&ctx);
    let plugin = resolve_plugin_type(&workspace.join(&p.spec.name))?;
    debug!("{} is a {} plugin", p.spec.name, plugin.name);

    npm(&ctx, &workspace, "run dist").await?;
    move_file(
        &workspace.join("dist/bundles.tar.gz"),
        &ctx.build_dir().join(format!("{}.tar.gz", p.spec.label)),
    )
}

async fn build_server(ctx: Arc<BuildContext>, p: Arc<Product>) -> Result<()> {
    let workspace = p.workspace(&ctx);
    let repos: Vec<&RepoSpec> = std::iter::once(&p.spec.repo)
        .chain(p.spec.additional.iter())
        .collect();

    for repo in &repos {
        let repo_dir = workspace.join(&repo.name);
        let plugin = resolve_plugin_type(&repo_dir)?;
        debug!("{} is a {} plugin", repo.name, plugin.name);
        npm(&ctx, &repo_dir, plugin.build_script()).await?;
    }

    let target = workspace.join("build/source");
    tokio::fs::create_dir_all(&target).await?;
    for repo in &repos {
        copy_dir(&workspace.join(&repo.name).join("build/source"), &target)?;
    }
    Ok(())
}

/// Build the product's bundle or server sources.
pub fn build(ctx: &Arc<BuildContext>, product: &Arc<Product>) -> RunnableUnit {
    if product.spec.kind.is_web() {
        product_unit(ctx, product, step_label("build", product), build_web)
    } else {
        product_unit(ctx, product, step_label("build", product), build_server)
    }
}

/// Download the product's data packages.
pub fn data(ctx: &Arc<BuildContext>, product: &Arc<Product>) -> RunnableUnit {
    product_unit(ctx, product, step_label("data", product), |ctx, p| async move {
        fetch_data(&ctx, &p.spec).await
    })
}

/// Drop web dependencies that are not needed in the image.
pub fn postbuild(ctx: &Arc<BuildContext>, product: &Arc<Product>) -> RunnableUnit {
    if !product.spec.kind.is_web() {
        return RunnableUnit::noop(format!("postbuild:{}", product.name()));
    }
    product_unit(ctx, product, step_label("postbuild", product), |ctx, p| async move {
        empty_dir(&p.workspace(&ctx).join("node_modules"))
    })
}

/// Build the docker image, optionally tagged with `--push-extra`.
pub fn image(ctx: &Arc<BuildContext>, product: &Arc<Product>) -> RunnableUnit {
    product_unit(ctx, product, step_label("image", product), |ctx, p| async move {
        let workspace = p.workspace(&ctx);
        let build_dir = if p.spec.kind == ProductType::Static {
            workspace.join(&p.spec.name)
        } else {
            workspace.clone()
        };
        let dockerfile = dockerfile_for(&ctx.project_root, &p.spec);
        info!("use dockerfile: {}", dockerfile);

        if let Some(base_image) = &p.spec.base_image {
            patch_dockerfile(&build_dir.join(&dockerfile), base_image)?;
        }

        let mut args = vec!["build".to_string(), "-t".to_string(), p.spec.image.clone()];
        args.extend(proxy_build_args(std::env::vars()));
        args.extend(["-f".to_string(), dockerfile, ".".to_string()]);
        docker_args(&ctx, &build_dir, args).await?;

        if let Some(extra) = &ctx.options.push_extra {
            let tag = retag(&p.spec.image, extra);
            docker_args(
                &ctx,
                &workspace,
                vec!["tag".to_string(), p.spec.image.clone(), tag],
            )
            .await?;
        }
        Ok::<(), BuildError>(())
    })
}

/// Save the image as `build/<label>_image.tar.gz`.
pub fn save(ctx: &Arc<BuildContext>, product: &Arc<Product>) -> RunnableUnit {
    product_unit(ctx, product, step_label("save", product), |ctx, p| async move {
        let target = ctx.build_dir().join(format!("{}_image.tar.gz", p.spec.label));
        docker_save(&ctx, &p.spec.image, &target).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_products, BuildOptions, ComposePatch, ProductDescriptor};
    use tempfile::TempDir;

    fn setup(json: &str, options: BuildOptions, root: &Path) -> (Arc<BuildContext>, Arc<Product>) {
        let descs: Vec<ProductDescriptor> = serde_json::from_str(json).unwrap();
        let spec = resolve_products(&descs, &mut ComposePatch::default(), "demo", "1.0.0", false)
            .unwrap()
            .remove(0);
        let ctx = BuildContext::new(options, root, "demo", "1.0.0")
            .with_generator("definitely-not-a-real-generator");
        (Arc::new(ctx), Arc::new(Product::new(spec)))
    }

    #[test]
    fn units_are_labelled_by_step_and_product() {
        let temp = TempDir::new().unwrap();
        let (ctx, p) = setup(
            r#"[{"type": "api", "name": "server", "additional": [{"name": "plugin"}]}]"#,
            BuildOptions::default(),
            temp.path(),
        );
        assert_eq!(clone(&ctx, &p).label(), "clone:server");
        assert_eq!(clone_additional(&ctx, &p, 0).label(), "clone:server:plugin");
        assert_eq!(build(&ctx, &p).label(), "build:server");
        assert_eq!(save(&ctx, &p).label(), "save:server");
    }

    #[tokio::test]
    async fn failing_task_marks_product_and_skips_the_rest() {
        let temp = TempDir::new().unwrap();
        let (ctx, p) = setup(
            r#"[{"type": "web", "name": "app"}]"#,
            BuildOptions {
                quiet: true,
                ..Default::default()
            },
            temp.path(),
        );

        prepare(&ctx, &p).invoke().await.unwrap();
        assert!(p.is_failed());
        let failure = p.failure.failure().unwrap();
        assert!(failure.starts_with("prepare:app"));

        // postbuild would create node_modules if it ran
        postbuild(&ctx, &p).invoke().await.unwrap();
        assert!(!p.workspace(&ctx).join("node_modules").exists());
    }

    #[tokio::test]
    async fn postbuild_empties_node_modules() {
        let temp = TempDir::new().unwrap();
        let (ctx, p) = setup(r#"[{"type": "web", "name": "app"}]"#, BuildOptions::default(), temp.path());
        let modules = p.workspace(&ctx).join("node_modules");
        std::fs::create_dir_all(modules.join("left-pad")).unwrap();

        postbuild(&ctx, &p).invoke().await.unwrap();

        assert!(!p.is_failed());
        assert!(modules.is_dir());
        assert_eq!(std::fs::read_dir(&modules).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn server_install_is_a_no_op_when_skipping_tests() {
        let temp = TempDir::new().unwrap();
        let options = BuildOptions {
            skip_tests: true,
            ..Default::default()
        };
        let (ctx, p) = setup(r#"[{"type": "api", "name": "server"}]"#, options, temp.path());

        install(&ctx, &p).invoke().await.unwrap();
        postbuild(&ctx, &p).invoke().await.unwrap();
        assert!(!p.is_failed());
    }
}
