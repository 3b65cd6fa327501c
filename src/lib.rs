// Federated inventory search hub: fans one logical search out to many
// provider adapters under a deadline, merges partial results, and hides
// provider identity behind short-lived opaque codes.

pub mod adapter;
pub mod cache;
pub mod config;
pub mod context;
pub mod model;
pub mod money;
pub mod normalize;
mod orchestrator;
pub mod registry;
pub mod service;

// Re-export key types for convenience
pub use adapter::{AdapterError, ProviderAdapter};
pub use cache::{CacheEntry, CacheError, CacheStatsReport, CachedVariant, CodeCache};
pub use config::{CacheConfig, HubConfig};
pub use context::RequestContext;
pub use model::{
    BookingOrder, ClientDetail, ClientProduct, Customer, DateRange, IdCriteria, LocationCriteria,
    ProductQuery, ProductType, ProductTypeOutcome, ProviderBookingAck, ProviderBookingRequest,
    ProviderDetail, ProviderProduct, ProviderVariant, Reservation, SearchCriteria, SearchRequest,
    SearchResponse, VariantBuckets, VariantView,
};
pub use money::{Money, MoneyError};
pub use normalize::Normalizer;
pub use registry::{AdapterRegistry, RegistryBuilder, RegistryError};
pub use service::{InventoryService, ServiceError};
