// Federated search fan-out. One logical search becomes a flat list of
// (query, adapter) units executed on a fixed-size worker pool; each unit
// carries its own deadline and an immutable context snapshot, and a unit
// that fails or times out is logged and excluded without touching its
// siblings. The caller always gets a response, possibly partial.

use crate::adapter::{AdapterError, ProviderAdapter};
use crate::config::HubConfig;
use crate::context::RequestContext;
use crate::model::{
    ClientProduct, ProductType, ProductTypeOutcome, SearchCriteria, SearchRequest, SearchResponse,
};
use crate::normalize::Normalizer;
use crate::registry::{AdapterRegistry, RegistryError};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

struct Unit {
    product_type: ProductType,
    // Id-based search: at most one item per product type, first success wins.
    single: bool,
    provider: String,
    adapter: Arc<dyn ProviderAdapter>,
    criteria: SearchCriteria,
}

#[derive(Default)]
struct TypeAggregate {
    queried: usize,
    failed: usize,
    items: Vec<ClientProduct>,
    single_settled: bool,
}

pub(crate) async fn run_search(
    registry: &AdapterRegistry,
    normalizer: Normalizer,
    config: &HubConfig,
    request: SearchRequest,
    ctx: Arc<RequestContext>,
) -> Result<SearchResponse, RegistryError> {
    let mut aggregates: HashMap<ProductType, TypeAggregate> = HashMap::new();
    let mut units = Vec::new();

    // Resolve everything up front: an unknown explicit override fails the
    // request before any fan-out starts.
    for query in request.queries {
        let adapters = registry.resolve(
            query.product_type,
            query.provider.as_deref(),
            &ctx.enabled_providers,
        )?;
        let aggregate = aggregates.entry(query.product_type).or_default();
        aggregate.queried += adapters.len();

        let single = matches!(query.criteria, SearchCriteria::Id(_));
        for adapter in adapters {
            units.push(Unit {
                product_type: query.product_type,
                single,
                provider: adapter.name().to_string(),
                adapter,
                criteria: query.criteria.clone(),
            });
        }
    }

    info!(
        units = units.len(),
        correlation_id = %ctx.correlation_id,
        "federated search fan-out"
    );

    let deadline = config.unit_deadline;
    let mut completions = stream::iter(units.into_iter().map(|unit| {
        let ctx = Arc::clone(&ctx);
        let normalizer = normalizer.clone();
        async move {
            let result = match timeout(deadline, run_unit(&unit, &normalizer, &ctx)).await {
                Ok(Ok(items)) => Ok(items),
                Ok(Err(err)) => {
                    warn!(
                        provider = %unit.provider,
                        product_type = %unit.product_type,
                        error = %err,
                        "adapter excluded from federated search"
                    );
                    Err(())
                }
                Err(_) => {
                    warn!(
                        provider = %unit.provider,
                        product_type = %unit.product_type,
                        deadline_ms = deadline.as_millis() as u64,
                        "adapter deadline expired, result discarded"
                    );
                    Err(())
                }
            };
            (unit.product_type, unit.single, unit.provider, result)
        }
    }))
    .buffer_unordered(config.worker_count.max(1));

    // Completion-order assembly; no ordering guarantee across adapters of
    // the same product type.
    while let Some((product_type, single, provider, result)) = completions.next().await {
        let Some(aggregate) = aggregates.get_mut(&product_type) else {
            continue;
        };
        match result {
            Ok(items) => {
                if single {
                    if aggregate.single_settled {
                        debug!(
                            provider = %provider,
                            product_type = %product_type,
                            "dropping id result from slower adapter"
                        );
                    } else if let Some(item) = items.into_iter().next() {
                        aggregate.items.push(item);
                        aggregate.single_settled = true;
                    }
                } else {
                    aggregate.items.extend(items);
                }
            }
            Err(()) => aggregate.failed += 1,
        }
    }

    let mut response = SearchResponse::default();
    for (product_type, aggregate) in aggregates {
        *response.slot_mut(product_type) = Some(ProductTypeOutcome {
            items: aggregate.items,
            providers_queried: aggregate.queried,
            providers_failed: aggregate.failed,
        });
    }
    Ok(response)
}

async fn run_unit(
    unit: &Unit,
    normalizer: &Normalizer,
    ctx: &RequestContext,
) -> Result<Vec<ClientProduct>, AdapterError> {
    match &unit.criteria {
        SearchCriteria::Location(criteria) => {
            let raws = unit.adapter.search_by_location(criteria, ctx).await?;
            let mut items = Vec::with_capacity(raws.len());
            for raw in raws {
                // A single malformed product does not sink the whole unit.
                match normalizer.normalize(unit.product_type, &unit.provider, raw) {
                    Ok(item) => items.push(item),
                    Err(err) => warn!(
                        provider = %unit.provider,
                        error = %err,
                        "skipping product with malformed price"
                    ),
                }
            }
            Ok(items)
        }
        SearchCriteria::Id(criteria) => {
            let raw = unit.adapter.search_by_id(criteria, ctx).await?;
            let item = normalizer
                .normalize(unit.product_type, &unit.provider, raw)
                .map_err(|err| AdapterError::Malformed(format!("price: {err}")))?;
            Ok(vec![item])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::{self, MockAdapter};
    use crate::cache::CodeCache;
    use crate::config::CacheConfig;
    use crate::model::{IdCriteria, LocationCriteria, ProductQuery};
    use std::time::Duration;

    fn location_query(product_type: ProductType) -> ProductQuery {
        ProductQuery {
            product_type,
            criteria: SearchCriteria::Location(LocationCriteria {
                place: "BCN".to_string(),
                date: None,
                party_size: Some(2),
            }),
            provider: None,
        }
    }

    fn id_query(product_type: ProductType, native_id: &str) -> ProductQuery {
        ProductQuery {
            product_type,
            criteria: SearchCriteria::Id(IdCriteria {
                native_id: native_id.to_string(),
                date: None,
            }),
            provider: None,
        }
    }

    fn harness() -> (Normalizer, Arc<CodeCache>) {
        let cache = Arc::new(CodeCache::new(CacheConfig::default()));
        (Normalizer::new(Arc::clone(&cache)), cache)
    }

    fn enabled(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn one_failing_adapter_leaves_the_others_results_intact() {
        let registry = AdapterRegistry::builder()
            .register(
                ProductType::Activity,
                Arc::new(MockAdapter::new("alpha").with_products(vec![
                    mock::product("A-1", "Kayak", "25.00"),
                    mock::product("A-2", "Hike", "18.00"),
                ])),
            )
            .register(
                ProductType::Activity,
                Arc::new(MockAdapter::new("beta").failing()),
            )
            .register(
                ProductType::Activity,
                Arc::new(
                    MockAdapter::new("gamma")
                        .with_products(vec![mock::product("G-1", "Museum", "12.00")]),
                ),
            )
            .build();
        let (normalizer, _cache) = harness();

        let mut ctx = RequestContext::anonymous();
        ctx.enabled_providers = enabled(&["alpha", "beta", "gamma"]);

        let response = run_search(
            &registry,
            normalizer,
            &HubConfig::default(),
            SearchRequest {
                queries: vec![location_query(ProductType::Activity)],
            },
            Arc::new(ctx),
        )
        .await
        .unwrap();

        let outcome = response.outcome(ProductType::Activity).unwrap();
        assert_eq!(outcome.providers_queried, 3);
        assert_eq!(outcome.providers_failed, 1);
        assert_eq!(outcome.items.len(), 3);
        let names: Vec<&str> = outcome.items.iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"Kayak"));
        assert!(names.contains(&"Museum"));
    }

    #[tokio::test(start_paused = true)]
    async fn a_unit_past_its_deadline_is_discarded_not_awaited() {
        let registry = AdapterRegistry::builder()
            .register(
                ProductType::Activity,
                Arc::new(
                    MockAdapter::new("fast")
                        .with_products(vec![mock::product("F-1", "Kayak", "25.00")]),
                ),
            )
            .register(
                ProductType::Activity,
                Arc::new(
                    MockAdapter::new("slow")
                        .with_delay(Duration::from_secs(120))
                        .with_products(vec![mock::product("S-1", "Hike", "18.00")]),
                ),
            )
            .build();
        let (normalizer, _cache) = harness();

        let mut ctx = RequestContext::anonymous();
        ctx.enabled_providers = enabled(&["fast", "slow"]);

        let config = HubConfig {
            worker_count: 4,
            unit_deadline: Duration::from_secs(30),
        };
        let response = run_search(
            &registry,
            normalizer,
            &config,
            SearchRequest {
                queries: vec![location_query(ProductType::Activity)],
            },
            Arc::new(ctx),
        )
        .await
        .unwrap();

        let outcome = response.outcome(ProductType::Activity).unwrap();
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].name, "Kayak");
        assert_eq!(outcome.providers_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn id_search_keeps_the_first_successful_responder() {
        let shared = mock::product("X-1", "Kayak", "25.00");
        let registry = AdapterRegistry::builder()
            .register(
                ProductType::Activity,
                Arc::new(
                    MockAdapter::new("slow")
                        .with_delay(Duration::from_secs(5))
                        .with_products(vec![shared.clone()]),
                ),
            )
            .register(
                ProductType::Activity,
                Arc::new(MockAdapter::new("fast").with_products(vec![shared])),
            )
            .build();
        let (normalizer, cache) = harness();

        let mut ctx = RequestContext::anonymous();
        ctx.enabled_providers = enabled(&["slow", "fast"]);

        let response = run_search(
            &registry,
            normalizer,
            &HubConfig::default(),
            SearchRequest {
                queries: vec![id_query(ProductType::Activity, "X-1")],
            },
            Arc::new(ctx),
        )
        .await
        .unwrap();

        let outcome = response.outcome(ProductType::Activity).unwrap();
        assert_eq!(outcome.items.len(), 1);
        let entry = cache.resolve(&outcome.items[0].code).unwrap();
        assert_eq!(entry.provider, "fast");
    }

    #[tokio::test]
    async fn product_types_merge_into_separate_outcomes() {
        let registry = AdapterRegistry::builder()
            .register(
                ProductType::Activity,
                Arc::new(
                    MockAdapter::new("alpha")
                        .with_products(vec![mock::product("A-1", "Kayak", "25.00")]),
                ),
            )
            .register(
                ProductType::Hotel,
                Arc::new(
                    MockAdapter::new("alpha")
                        .with_products(vec![mock::product("H-1", "Grand Hotel", "120.00")]),
                ),
            )
            .build();
        let (normalizer, _cache) = harness();

        let mut ctx = RequestContext::anonymous();
        ctx.enabled_providers = enabled(&["alpha"]);

        let response = run_search(
            &registry,
            normalizer,
            &HubConfig::default(),
            SearchRequest {
                queries: vec![
                    location_query(ProductType::Activity),
                    location_query(ProductType::Hotel),
                ],
            },
            Arc::new(ctx),
        )
        .await
        .unwrap();

        assert_eq!(response.outcome(ProductType::Activity).unwrap().items.len(), 1);
        assert_eq!(response.outcome(ProductType::Hotel).unwrap().items.len(), 1);
        // Restaurants were never requested, so the slot stays empty.
        assert!(response.outcome(ProductType::Restaurant).is_none());
    }

    #[tokio::test]
    async fn unknown_override_fails_before_fan_out() {
        let registry = AdapterRegistry::builder()
            .register(
                ProductType::Activity,
                Arc::new(MockAdapter::new("alpha")),
            )
            .build();
        let (normalizer, _cache) = harness();

        let mut query = location_query(ProductType::Activity);
        query.provider = Some("ghost".to_string());

        let err = run_search(
            &registry,
            normalizer,
            &HubConfig::default(),
            SearchRequest {
                queries: vec![query],
            },
            Arc::new(RequestContext::anonymous()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RegistryError::ProviderNotFound { .. }));
    }

    #[tokio::test]
    async fn requested_type_with_no_eligible_adapters_is_still_reported() {
        let registry = AdapterRegistry::builder()
            .register(
                ProductType::Activity,
                Arc::new(MockAdapter::new("alpha")),
            )
            .build();
        let (normalizer, _cache) = harness();

        let mut ctx = RequestContext::anonymous();
        ctx.enabled_providers = enabled(&["ghost"]);

        let response = run_search(
            &registry,
            normalizer,
            &HubConfig::default(),
            SearchRequest {
                queries: vec![location_query(ProductType::Activity)],
            },
            Arc::new(ctx),
        )
        .await
        .unwrap();

        let outcome = response.outcome(ProductType::Activity).unwrap();
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.providers_queried, 0);
        assert_eq!(outcome.providers_failed, 0);
    }

    #[tokio::test]
    async fn malformed_products_are_skipped_without_failing_the_unit() {
        let registry = AdapterRegistry::builder()
            .register(
                ProductType::Activity,
                Arc::new(MockAdapter::new("alpha").with_products(vec![
                    mock::product("A-1", "Kayak", "25.00"),
                    mock::product("A-2", "Broken", "free!!"),
                ])),
            )
            .default_provider("alpha")
            .build();
        let (normalizer, _cache) = harness();

        let response = run_search(
            &registry,
            normalizer,
            &HubConfig::default(),
            SearchRequest {
                queries: vec![location_query(ProductType::Activity)],
            },
            Arc::new(RequestContext::anonymous()),
        )
        .await
        .unwrap();

        let outcome = response.outcome(ProductType::Activity).unwrap();
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].name, "Kayak");
        assert_eq!(outcome.providers_failed, 0);
    }
}
