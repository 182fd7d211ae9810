//! Docker image details: Dockerfile selection, base image patching, build
//! arguments and registry tags.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::config::{image_repository, ProductType, ResolvedProduct};
use crate::error::Result;

use super::workspace::label_template_dir;

static FROM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*FROM[ \t]+(\S.*?)[ \t]*$").expect("FROM regex must compile")
});

/// Proxy variables passed through to `docker build`.
pub const PROXY_VARS: [&str; 3] = ["http_proxy", "https_proxy", "no_proxy"];

/// Dockerfile used for `product`, relative to its build directory.
pub fn dockerfile_for(root: &Path, product: &ResolvedProduct) -> String {
    let typed = matches!(product.kind, ProductType::Web | ProductType::Api);
    if typed && label_template_dir(root, product.kind.as_str(), &product.label).is_dir() {
        format!("deploy/{}/Dockerfile", product.label)
    } else if typed {
        format!("deploy/{}/Dockerfile", product.kind)
    } else {
        "deploy/Dockerfile".to_string()
    }
}

/// Replace every `FROM` image in `content` with `base_image`.
///
/// Returns the first original image alongside the patched content.
pub fn replace_base_image(content: &str, base_image: &str) -> (Option<String>, String) {
    let original = FROM_REGEX
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let patched = FROM_REGEX
        .replace_all(content, format!("FROM {}", base_image).as_str())
        .into_owned();
    (original, patched)
}

/// Patch the Dockerfile at `path` to build on `base_image`.
pub fn patch_dockerfile(path: &Path, base_image: &str) -> Result<()> {
    let content = fs::read_to_string(path)?;
    let (original, patched) = replace_base_image(&content, base_image);
    info!(
        "patching {} change from {} -> {}",
        path.display(),
        original.as_deref().unwrap_or("?"),
        base_image
    );
    fs::write(path, patched)?;
    Ok(())
}

/// `--build-arg` pairs for proxy variables found in `vars`.
///
/// Keys are matched case-insensitively and passed lower-cased.
pub fn proxy_build_args<I>(vars: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut args = Vec::new();
    for (key, value) in vars {
        let key = key.to_lowercase();
        if PROXY_VARS.contains(&key.as_str()) {
            args.push("--build-arg".to_string());
            args.push(format!("{}={}", key, value));
        }
    }
    args
}

/// Image reference with its tag replaced by `tag`.
pub fn retag(image: &str, tag: &str) -> String {
    format!("{}:{}", image_repository(image), tag)
}

/// `(local image, registry tag)` pairs to push.
pub fn push_tags(
    images: &[String],
    registry: &str,
    default_tags: bool,
    extra_tag: Option<&str>,
) -> Vec<(String, String)> {
    let mut tags = Vec::new();
    if default_tags {
        tags.extend(
            images
                .iter()
                .map(|image| (image.clone(), format!("{}/{}", registry, image))),
        );
    }
    if let Some(extra) = extra_tag {
        tags.extend(
            images
                .iter()
                .map(|image| (image.clone(), format!("{}/{}", registry, retag(image, extra)))),
        );
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_products, ComposePatch, ProductDescriptor};
    use tempfile::TempDir;

    fn products(json: &str) -> Vec<ResolvedProduct> {
        let descs: Vec<ProductDescriptor> = serde_json::from_str(json).unwrap();
        resolve_products(&descs, &mut ComposePatch::default(), "demo", "1.0.0", false).unwrap()
    }

    #[test]
    fn dockerfile_by_label_type_or_default() {
        let temp = TempDir::new().unwrap();
        let products = products(
            r#"[
                {"type": "web", "label": "admin", "name": "app"},
                {"type": "api", "label": "api", "name": "server"},
                {"type": "static", "label": "docs", "name": "docs"}
            ]"#,
        );
        fs::create_dir_all(temp.path().join("templates/web/deploy/admin")).unwrap();

        assert_eq!(dockerfile_for(temp.path(), &products[0]), "deploy/admin/Dockerfile");
        assert_eq!(dockerfile_for(temp.path(), &products[1]), "deploy/api/Dockerfile");
        assert_eq!(dockerfile_for(temp.path(), &products[2]), "deploy/Dockerfile");
    }

    #[test]
    fn base_image_replaces_from() {
        let dockerfile = "# build\nFROM python:3.6 \nRUN pip install\n  from node AS builder\n";
        let (original, patched) = replace_base_image(dockerfile, "python:3.7");

        assert_eq!(original.as_deref(), Some("python:3.6"));
        assert_eq!(
            patched,
            "# build\nFROM python:3.7\nRUN pip install\nFROM python:3.7\n"
        );
    }

    #[test]
    fn patch_dockerfile_writes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Dockerfile");
        fs::write(&path, "FROM nginx:alpine\nCOPY . /app\n").unwrap();

        patch_dockerfile(&path, "nginx:1.19").unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "FROM nginx:1.19\nCOPY . /app\n"
        );
    }

    #[test]
    fn proxy_args_are_lower_cased() {
        let vars = vec![
            ("HTTP_PROXY".to_string(), "http://proxy:3128".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("no_proxy".to_string(), "localhost".to_string()),
        ];
        assert_eq!(
            proxy_build_args(vars),
            vec![
                "--build-arg",
                "http_proxy=http://proxy:3128",
                "--build-arg",
                "no_proxy=localhost"
            ]
        );
    }

    #[test]
    fn push_tags_default_and_extra() {
        let images = vec!["demo/web:1.0.0".to_string(), "demo/api:1.0.0".to_string()];

        let tags = push_tags(&images, "registry.io", true, Some("develop"));
        assert_eq!(
            tags,
            vec![
                ("demo/web:1.0.0".to_string(), "registry.io/demo/web:1.0.0".to_string()),
                ("demo/api:1.0.0".to_string(), "registry.io/demo/api:1.0.0".to_string()),
                ("demo/web:1.0.0".to_string(), "registry.io/demo/web:develop".to_string()),
                ("demo/api:1.0.0".to_string(), "registry.io/demo/api:develop".to_string()),
            ]
        );

        assert!(push_tags(&images, "registry.io", false, None).is_empty());
    }
}
