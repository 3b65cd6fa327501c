// Product normalizer: deterministic conversion from a provider-shaped
// result to the client-facing model. Every successful normalization mints
// an opaque code and writes one cache entry as a side effect; the
// provider's native identifier never reaches a client-facing shape again
// after this point.

use crate::cache::{CacheEntry, CachedVariant, CodeCache};
use crate::model::{
    ClientDetail, ClientProduct, ProductType, ProviderDetail, ProviderProduct, VariantBuckets,
    VariantView,
};
use crate::money::{Money, MoneyError};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

#[derive(Clone)]
pub struct Normalizer {
    cache: Arc<CodeCache>,
}

impl Normalizer {
    pub fn new(cache: Arc<CodeCache>) -> Self {
        Self { cache }
    }

    pub fn normalize(
        &self,
        product_type: ProductType,
        provider: &str,
        raw: ProviderProduct,
    ) -> Result<ClientProduct, MoneyError> {
        let price = Money::parse(&raw.price, &raw.currency)?;
        let client = ClientProduct {
            code: String::new(),
            product_type,
            name: raw.name.clone(),
            description: raw.description.clone(),
            date: raw.date,
            price: price.clone(),
            location: raw.location.clone(),
            categories: raw.categories.clone(),
            images: raw.images.clone(),
            rating: raw.rating,
        };
        Ok(self.cache.register(provider, raw, client, price))
    }

    // Re-fetched details keep the opaque code they were resolved through;
    // the provider's native id must not leak back into the response.
    pub fn normalize_detail(
        &self,
        code: &str,
        entry: &CacheEntry,
        raw: ProviderDetail,
    ) -> Result<ClientDetail, MoneyError> {
        let price = Money::parse(&raw.product.price, &raw.product.currency)?;
        Ok(ClientDetail {
            product: ClientProduct {
                code: code.to_string(),
                product_type: entry.client_product.product_type,
                name: raw.product.name,
                description: raw.product.description,
                date: raw.product.date,
                price,
                location: raw.product.location,
                categories: raw.product.categories,
                images: raw.product.images,
                rating: raw.product.rating,
            },
            amenities: raw.amenities,
            schedule_notes: raw.schedule_notes,
        })
    }

    // The response keeps the provider's original time-bucket shape; the
    // flattened, structurally deduplicated set goes to the cache as a side
    // channel keyed by (opaque code, date). Returns the bucketed client
    // view and how many unique variants were persisted. Variants arrive
    // without their own currency and price in the product's currency.
    pub fn normalize_variants(
        &self,
        code: &str,
        currency: &str,
        date: NaiveDate,
        buckets: VariantBuckets,
    ) -> Result<(BTreeMap<String, Vec<VariantView>>, usize), MoneyError> {
        let mut view = BTreeMap::new();
        let mut seen: HashSet<(String, String, Money)> = HashSet::new();
        let mut unique = Vec::new();

        for (bucket, raw_variants) in buckets {
            let mut bucket_view = Vec::with_capacity(raw_variants.len());
            for raw in raw_variants {
                let price = Money::parse(&raw.price, currency)?;
                let cached = CachedVariant {
                    code: raw.code.clone(),
                    name: raw.name.clone(),
                    description: raw.description.clone(),
                    price: price.clone(),
                    capacity: raw.capacity,
                    extra: raw.extra.clone(),
                };
                if seen.insert((
                    cached.code.clone(),
                    cached.name.clone(),
                    cached.price.clone(),
                )) {
                    unique.push(cached);
                }
                bucket_view.push(VariantView {
                    code: raw.code,
                    name: raw.name,
                    description: raw.description,
                    price,
                    capacity: raw.capacity,
                    extra: raw.extra,
                });
            }
            view.insert(bucket, bucket_view);
        }

        let count = unique.len();
        self.cache.put_variants(code, date, unique);
        Ok((view, count))
    }
}
