//! Assembly of the product's `docker-compose.yml`.
//!
//! Every repository may ship a `deploy/docker-compose.partial.yml`. The
//! first service of a product's own partial becomes the product's service;
//! partials of additional repositories are merged in unchanged. The merged
//! document is then wired up: web services link to every api, apis link to
//! every service, and a special `_host` service is inlined into every api.

use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::config::{ComposePatch, ProductType, ResolvedProduct};
use crate::error::Result;

use super::merge::{merge_all, merge_with};

/// Location of a repository's compose partial.
pub const PARTIAL_FILE: &str = "deploy/docker-compose.partial.yml";

/// Service inlined into every api service.
pub const HOST_SERVICE: &str = "_host";

/// Compose file format version written.
pub const COMPOSE_VERSION: &str = "2.0";

/// Load `<repo_dir>/deploy/docker-compose.partial.yml`, or an empty mapping.
pub fn load_partial(repo_dir: &Path) -> Result<Value> {
    let path = repo_dir.join(PARTIAL_FILE);
    if !path.exists() {
        return Ok(Value::Mapping(Mapping::new()));
    }
    let content = fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(Value::Mapping(Mapping::new()));
    }
    Ok(serde_yaml::from_str(&content)?)
}

/// Turn a repository partial into the compose document of `product`.
///
/// The first service of `template` is copied without its `build` section,
/// its `image` is set to the product image and web products publish port 80.
pub fn patch_compose_file(product: &ResolvedProduct, template: &Value) -> Value {
    let mut service = template
        .get("services")
        .and_then(Value::as_mapping)
        .and_then(|services| services.values().next())
        .and_then(Value::as_mapping)
        .cloned()
        .unwrap_or_default();

    service.remove("build");
    service.insert("image".into(), Value::String(product.image.clone()));
    if product.kind.is_web() {
        service.insert(
            "ports".into(),
            Value::Sequence(vec![Value::String("80:80".into())]),
        );
    }

    let mut services = Mapping::new();
    services.insert(Value::String(product.label.clone()), Value::Mapping(service));

    let mut doc = Mapping::new();
    doc.insert("version".into(), Value::String(COMPOSE_VERSION.into()));
    doc.insert("services".into(), Value::Mapping(services));
    Value::Mapping(doc)
}

/// Compose partial of one product built in `workspace`.
pub fn product_partial(product: &ResolvedProduct, workspace: &Path) -> Result<Value> {
    let own = load_partial(&workspace.join(&product.name))?;
    let mut partials = vec![patch_compose_file(product, &own)];
    for extra in &product.additional {
        partials.push(load_partial(&workspace.join(&extra.name))?);
    }
    Ok(merge_all(&partials))
}

fn add_link(services: &mut Mapping, service: &str, link: String) {
    let Some(entry) = services.get_mut(service).and_then(Value::as_mapping_mut) else {
        warn!("cannot link {} into missing service {}", link, service);
        return;
    };
    let links = entry
        .entry("links".into())
        .or_insert(Value::Sequence(Vec::new()));
    if let Value::Sequence(links) = links {
        links.push(Value::String(link));
    }
}

/// Merge the partials of all products and wire the services together.
///
/// `products` pairs each successfully built product with its partial.
pub fn build_compose(products: &[(&ResolvedProduct, Value)], patch: &ComposePatch) -> Value {
    let mut compose = merge_all(products.iter().map(|(_, partial)| partial));

    let of_kind = |kind: ProductType| -> Vec<&ResolvedProduct> {
        products
            .iter()
            .map(|(p, _)| *p)
            .filter(|p| p.kind == kind)
            .collect()
    };
    let webs = of_kind(ProductType::Web);
    let apis = of_kind(ProductType::Api);
    let backends = of_kind(ProductType::Service);

    let Some(services) = compose
        .get_mut("services")
        .and_then(Value::as_mapping_mut)
    else {
        return compose;
    };

    for api in &apis {
        for web in &webs {
            add_link(services, &web.label, format!("{}:api", api.label));
        }
    }
    for backend in &backends {
        for api in &apis {
            add_link(services, &api.label, format!("{}:{}", backend.label, backend.name));
        }
    }

    if let Some(host) = services.remove(HOST_SERVICE) {
        for api in &apis {
            let key = Value::String(api.label.clone());
            let mut inlined = host.clone();
            if let Some(own) = services.get(&key) {
                merge_with(&mut inlined, own);
            }
            services.insert(key, inlined);
        }
    }

    for (name, overlay) in patch.services() {
        if let Some(service) = services.get_mut(name) {
            info!("patch generated docker-compose file for {}", name.as_str().unwrap_or("?"));
            merge_with(service, overlay);
        }
    }

    compose
}

/// Write the compose document to `path`.
pub fn write_compose(path: &Path, compose: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_yaml::to_string(compose)?)?;
    Ok(())
}
