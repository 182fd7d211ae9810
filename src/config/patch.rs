//! The optional `docker-compose-patch.yaml` overlay.
//!
//! Services listed in the patch are merged into the generated compose file.
//! An `image` given for a product's label is not merged; it replaces the
//! base image of that product's Dockerfile instead.

use serde_yaml::{Mapping, Value};

use crate::error::Result;

/// Parsed compose patch document; only its `services` are used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposePatch {
    services: Mapping,
}

impl ComposePatch {
    /// Take the `services` mapping of a parsed document.
    pub fn from_value(doc: Value) -> Self {
        let services = match doc {
            Value::Mapping(mut map) => match map.remove("services") {
                Some(Value::Mapping(services)) => services,
                _ => Mapping::new(),
            },
            _ => Mapping::new(),
        };
        Self { services }
    }

    /// Parse a YAML document.
    pub fn parse(content: &str) -> Result<Self> {
        let doc: Value = serde_yaml::from_str(content)?;
        Ok(Self::from_value(doc))
    }

    /// Service overlays keyed by service label.
    pub fn services(&self) -> &Mapping {
        &self.services
    }

    /// Overlay for one service.
    pub fn service(&self, label: &str) -> Option<&Value> {
        self.services.get(label)
    }

    /// Remove and return the `image` of a service overlay.
    pub fn take_service_image(&mut self, label: &str) -> Option<String> {
        let service = self.services.get_mut(label)?.as_mapping_mut()?;
        let image = service.remove("image")?;
        image.as_str().map(str::to_string)
    }
}
