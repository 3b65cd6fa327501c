// Domain model. Provider-shaped structs are transient and never leave the
// crate; client-shaped structs carry an opaque code instead of any
// provider identity.

use crate::money::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Activity,
    Hotel,
    Restaurant,
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProductType::Activity => "activity",
            ProductType::Hotel => "hotel",
            ProductType::Restaurant => "restaurant",
        };
        f.write_str(name)
    }
}

// Search input

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationCriteria {
    pub place: String,
    pub date: Option<NaiveDate>,
    pub party_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdCriteria {
    pub native_id: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchCriteria {
    Location(LocationCriteria),
    Id(IdCriteria),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductQuery {
    pub product_type: ProductType,
    pub criteria: SearchCriteria,
    // Explicit provider override; resolution fails if it is unknown for
    // the product type.
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub queries: Vec<ProductQuery>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

// Provider-shaped results, owned transiently by the normalizer.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProduct {
    pub native_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub date: Option<NaiveDate>,
    // Raw decimal string as received from the provider.
    pub price: String,
    pub currency: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub rating: Option<f32>,
    #[serde(default)]
    pub extra: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderVariant {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    pub capacity: u32,
    #[serde(default)]
    pub extra: Value,
}

// Mapping from a provider's time-of-day bucket to the variants it offers
// in that bucket.
pub type VariantBuckets = BTreeMap<String, Vec<ProviderVariant>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDetail {
    pub product: ProviderProduct,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub schedule_notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderBookingRequest {
    pub native_id: String,
    pub date: NaiveDate,
    pub variant_code: Option<String>,
    pub party_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderBookingAck {
    pub success: bool,
    pub locator: Option<String>,
}

// Client-facing shapes, immutable once returned.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProduct {
    pub code: String,
    pub product_type: ProductType,
    pub name: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub price: Money,
    pub location: String,
    pub categories: Vec<String>,
    pub images: Vec<String>,
    pub rating: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientDetail {
    pub product: ClientProduct,
    pub amenities: Vec<String>,
    pub schedule_notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantView {
    pub code: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub capacity: u32,
    pub extra: Value,
}

// Per-product-type result. An absent outcome in the response means the
// type was never requested; a requested type whose adapters all failed
// shows up as zero items with a non-zero failure count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductTypeOutcome {
    pub items: Vec<ClientProduct>,
    pub providers_queried: usize,
    pub providers_failed: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub activities: Option<ProductTypeOutcome>,
    pub hotels: Option<ProductTypeOutcome>,
    pub restaurants: Option<ProductTypeOutcome>,
}

impl SearchResponse {
    pub fn outcome(&self, product_type: ProductType) -> Option<&ProductTypeOutcome> {
        match product_type {
            ProductType::Activity => self.activities.as_ref(),
            ProductType::Hotel => self.hotels.as_ref(),
            ProductType::Restaurant => self.restaurants.as_ref(),
        }
    }

    pub(crate) fn slot_mut(
        &mut self,
        product_type: ProductType,
    ) -> &mut Option<ProductTypeOutcome> {
        match product_type {
            ProductType::Activity => &mut self.activities,
            ProductType::Hotel => &mut self.hotels,
            ProductType::Restaurant => &mut self.restaurants,
        }
    }
}

// Booking

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingOrder {
    pub code: String,
    pub date: NaiveDate,
    pub variant_code: Option<String>,
    pub party_size: u32,
}

// Confirmed reservation, also what gets handed to the booking-persistence
// collaborator downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub code: String,
    pub date: NaiveDate,
    pub variant_code: Option<String>,
    pub locator: String,
}
