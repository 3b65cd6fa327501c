// Adapter registry: an immutable mapping from product type to registered
// adapters, built once at startup and injected wherever resolution is
// needed. Pure lookup, no network or cache access.

use crate::adapter::ProviderAdapter;
use crate::model::ProductType;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("provider {provider:?} is not registered for {product_type}")]
    ProviderNotFound {
        provider: String,
        product_type: ProductType,
    },

    #[error("no default adapter registered for {product_type}")]
    NoDefaultAdapter { product_type: ProductType },
}

pub struct AdapterRegistry {
    by_type: HashMap<ProductType, Vec<Arc<dyn ProviderAdapter>>>,
    default_provider: String,
    test_mode: bool,
}

pub struct RegistryBuilder {
    by_type: HashMap<ProductType, Vec<Arc<dyn ProviderAdapter>>>,
    default_provider: String,
    test_mode: bool,
}

impl RegistryBuilder {
    pub fn register(
        mut self,
        product_type: ProductType,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> Self {
        self.by_type.entry(product_type).or_default().push(adapter);
        self
    }

    // Name of the fallback adapter used for anonymous or unconfigured
    // callers. It must be registered for every product type it serves.
    pub fn default_provider(mut self, name: &str) -> Self {
        self.default_provider = name.to_string();
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn build(self) -> AdapterRegistry {
        AdapterRegistry {
            by_type: self.by_type,
            default_provider: self.default_provider,
            test_mode: self.test_mode,
        }
    }
}

impl AdapterRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            by_type: HashMap::new(),
            default_provider: "fallback".to_string(),
            test_mode: false,
        }
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    fn registered(&self, product_type: ProductType) -> &[Arc<dyn ProviderAdapter>] {
        self.by_type
            .get(&product_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn by_name(
        &self,
        product_type: ProductType,
        name: &str,
    ) -> Result<Arc<dyn ProviderAdapter>, RegistryError> {
        self.registered(product_type)
            .iter()
            .find(|adapter| adapter.name() == name)
            .cloned()
            .ok_or_else(|| RegistryError::ProviderNotFound {
                provider: name.to_string(),
                product_type,
            })
    }

    // Resolution order: explicit override, then the caller's org-enabled
    // set intersected with the registrations (registration order kept),
    // then the single default adapter.
    pub fn resolve(
        &self,
        product_type: ProductType,
        provider_override: Option<&str>,
        enabled_providers: &[String],
    ) -> Result<Vec<Arc<dyn ProviderAdapter>>, RegistryError> {
        if let Some(name) = provider_override {
            return Ok(vec![self.by_name(product_type, name)?]);
        }

        if !enabled_providers.is_empty() {
            return Ok(self
                .registered(product_type)
                .iter()
                .filter(|adapter| {
                    enabled_providers
                        .iter()
                        .any(|name| name.as_str() == adapter.name())
                })
                .cloned()
                .collect());
        }

        match self.by_name(product_type, &self.default_provider) {
            Ok(adapter) => Ok(vec![adapter]),
            Err(_) => Err(RegistryError::NoDefaultAdapter { product_type }),
        }
    }
}
