// Client-facing service. Search fans out through the orchestrator; every
// follow-up call resolves its opaque code through the cache before any
// adapter is touched, so provider identity stays behind the boundary.

use crate::adapter::AdapterError;
use crate::cache::{CacheError, CodeCache};
use crate::config::{CacheConfig, HubConfig};
use crate::context::RequestContext;
use crate::model::{
    BookingOrder, ClientDetail, Customer, DateRange, ProviderBookingRequest, Reservation,
    SearchRequest, SearchResponse, VariantView,
};
use crate::money::MoneyError;
use crate::normalize::Normalizer;
use crate::orchestrator;
use crate::registry::{AdapterRegistry, RegistryError};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Code(#[from] CacheError),

    #[error(transparent)]
    Provider(#[from] AdapterError),
}

impl ServiceError {
    fn malformed(err: MoneyError) -> Self {
        ServiceError::Provider(AdapterError::Malformed(format!("price: {err}")))
    }
}

pub struct InventoryService {
    registry: Arc<AdapterRegistry>,
    cache: Arc<CodeCache>,
    normalizer: Normalizer,
    config: HubConfig,
}

impl InventoryService {
    pub fn new(registry: AdapterRegistry, config: HubConfig, cache_config: CacheConfig) -> Self {
        let cache = Arc::new(CodeCache::new(cache_config));
        Self {
            registry: Arc::new(registry),
            normalizer: Normalizer::new(Arc::clone(&cache)),
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &CodeCache {
        &self.cache
    }

    // Immutable snapshot handed to every worker; the registry's test-mode
    // flag is authoritative over whatever the caller supplied.
    fn snapshot(&self, ctx: &RequestContext) -> Arc<RequestContext> {
        Arc::new(ctx.clone().with_test_mode(self.registry.test_mode()))
    }

    pub async fn search(
        &self,
        request: SearchRequest,
        ctx: &RequestContext,
    ) -> Result<SearchResponse, ServiceError> {
        let snapshot = self.snapshot(ctx);
        let response = orchestrator::run_search(
            &self.registry,
            self.normalizer.clone(),
            &self.config,
            request,
            snapshot,
        )
        .await?;
        Ok(response)
    }

    pub async fn details(
        &self,
        code: &str,
        range: &DateRange,
        ctx: &RequestContext,
    ) -> Result<ClientDetail, ServiceError> {
        let snapshot = self.snapshot(ctx);
        let entry = self.cache.resolve(code)?;
        let adapter = self
            .registry
            .by_name(entry.client_product.product_type, &entry.provider)?;

        let raw = adapter.details(&entry.native_id, range, &snapshot).await?;
        let detail = self
            .normalizer
            .normalize_detail(code, &entry, raw)
            .map_err(ServiceError::malformed)?;
        Ok(detail)
    }

    pub async fn variants(
        &self,
        code: &str,
        date: NaiveDate,
        ctx: &RequestContext,
    ) -> Result<BTreeMap<String, Vec<VariantView>>, ServiceError> {
        let snapshot = self.snapshot(ctx);
        let entry = self.cache.resolve(code)?;
        let adapter = self
            .registry
            .by_name(entry.client_product.product_type, &entry.provider)?;

        let buckets = adapter.variants(&entry.native_id, date, &snapshot).await?;
        let (view, cached) = self
            .normalizer
            .normalize_variants(code, entry.price.currency(), date, buckets)
            .map_err(ServiceError::malformed)?;
        debug!(code, %date, cached, "variant set refreshed");
        Ok(view)
    }

    pub async fn book(
        &self,
        order: BookingOrder,
        customer: &Customer,
        ctx: &RequestContext,
    ) -> Result<Reservation, ServiceError> {
        let snapshot = self.snapshot(ctx);
        let entry = self.cache.resolve(&order.code)?;
        // A named variant must come from the set cached for this code and
        // date; anything else is stale or fabricated.
        if let Some(variant_code) = &order.variant_code {
            self.cache
                .find_variant(&order.code, order.date, variant_code)?;
        }

        let adapter = self
            .registry
            .by_name(entry.client_product.product_type, &entry.provider)?;
        let request = ProviderBookingRequest {
            native_id: entry.native_id.clone(),
            date: order.date,
            variant_code: order.variant_code.clone(),
            party_size: order.party_size,
        };

        let ack = adapter.book(&request, customer, &snapshot).await?;
        let locator = match (ack.success, ack.locator) {
            (true, Some(locator)) if !locator.is_empty() => locator,
            _ => {
                return Err(ServiceError::Provider(AdapterError::BookingRejected {
                    reason: "provider returned an unusable confirmation".to_string(),
                }))
            }
        };

        info!(
            code = %order.code,
            locator = %locator,
            correlation_id = %snapshot.correlation_id,
            "booking confirmed"
        );
        Ok(Reservation {
            code: order.code,
            date: order.date,
            variant_code: order.variant_code,
            locator,
        })
    }

    pub async fn cancel(
        &self,
        code: &str,
        locator: &str,
        ctx: &RequestContext,
    ) -> Result<bool, ServiceError> {
        let snapshot = self.snapshot(ctx);
        let entry = self.cache.resolve(code)?;
        let adapter = self
            .registry
            .by_name(entry.client_product.product_type, &entry.provider)?;
        let cancelled = adapter.cancel(locator, &snapshot).await?;
        info!(code, locator, cancelled, "cancellation processed");
        Ok(cancelled)
    }
}
