// Provider adapter capability contract. One implementation per external
// inventory provider; transport, auth and payload shaping live behind the
// trait. Legacy providers that cover only part of the capability set keep
// the default bodies, which fail explicitly instead of no-opping.

use crate::context::RequestContext;
use crate::model::{
    Customer, DateRange, IdCriteria, LocationCriteria, ProviderBookingAck,
    ProviderBookingRequest, ProviderDetail, ProviderProduct, VariantBuckets,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("provider does not support {operation}")]
    NotSupported { operation: &'static str },

    #[error("provider rejected the booking: {reason}")]
    BookingRejected { reason: String },

    #[error("provider transport error: {0}")]
    Network(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn search_by_location(
        &self,
        criteria: &LocationCriteria,
        ctx: &RequestContext,
    ) -> Result<Vec<ProviderProduct>, AdapterError> {
        let _ = (criteria, ctx);
        Err(AdapterError::NotSupported {
            operation: "search_by_location",
        })
    }

    async fn search_by_id(
        &self,
        criteria: &IdCriteria,
        ctx: &RequestContext,
    ) -> Result<ProviderProduct, AdapterError> {
        let _ = (criteria, ctx);
        Err(AdapterError::NotSupported {
            operation: "search_by_id",
        })
    }

    async fn details(
        &self,
        native_id: &str,
        range: &DateRange,
        ctx: &RequestContext,
    ) -> Result<ProviderDetail, AdapterError> {
        let _ = (native_id, range, ctx);
        Err(AdapterError::NotSupported {
            operation: "details",
        })
    }

    async fn variants(
        &self,
        native_id: &str,
        date: NaiveDate,
        ctx: &RequestContext,
    ) -> Result<VariantBuckets, AdapterError> {
        let _ = (native_id, date, ctx);
        Err(AdapterError::NotSupported {
            operation: "variants",
        })
    }

    async fn book(
        &self,
        request: &ProviderBookingRequest,
        customer: &Customer,
        ctx: &RequestContext,
    ) -> Result<ProviderBookingAck, AdapterError> {
        let _ = (request, customer, ctx);
        Err(AdapterError::NotSupported { operation: "book" })
    }

    async fn cancel(
        &self,
        locator: &str,
        ctx: &RequestContext,
    ) -> Result<bool, AdapterError> {
        let _ = (locator, ctx);
        Err(AdapterError::NotSupported { operation: "cancel" })
    }
}

impl std::fmt::Debug for dyn ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("name", &self.name())
            .finish()
    }
}
