//! Marketplace API
//!
//! Contracts for the listing services the cart and checkout read from, the wire records
//! they return and an HTTP client implementing all of them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mockall::automock;
use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    api::records::{ProductRecord, VoucherRecord},
    pricing::PricingError,
    uuids::ProductUuid,
    vouchers::Voucher,
};

mod client;
pub mod records;

pub use client::{MarketplaceClient, MarketplaceConfig};

/// Errors raised by the listing services.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx response or an unexpected body.
    #[error("unexpected response from marketplace API: {0}")]
    UnexpectedResponse(String),

    /// A record could not be turned into a domain value.
    #[error("invalid {kind} record {id}: {reason}")]
    InvalidRecord {
        /// Kind of record, e.g. `voucher`
        kind: &'static str,

        /// Identifier of the record
        id: String,

        /// What is wrong with it
        reason: String,
    },

    /// An amount in a record could not be represented.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Response envelope used by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Human readable message
    #[serde(default)]
    pub message: String,

    /// Payload, absent on errors
    pub data: Option<T>,

    /// Validation messages keyed by field
    #[serde(default)]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

/// Page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// One-based page number
    pub page: u32,

    /// Items per page
    pub per_page: u32,
}

impl PageRequest {
    /// First page of `per_page` items.
    pub fn first(per_page: u32) -> Self {
        Self { page: 1, per_page }
    }

    /// The page after this one.
    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            per_page: self.per_page,
        }
    }
}

/// Pagination metadata returned with a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Current one-based page
    pub page: u32,

    /// Items per page
    pub per_page: u32,

    /// Total number of items
    pub total: u64,

    /// Last page number
    pub last_page: u32,
}

impl Pagination {
    /// Whether there is a page after this one.
    pub fn has_next(&self) -> bool {
        self.page < self.last_page
    }
}

/// Items of one page plus where it sits in the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page, in server order
    pub items: Vec<T>,

    /// Pagination metadata
    pub pagination: Pagination,
}

/// Read-only product listing.
#[automock]
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// One page of products.
    async fn list_products(&self, page: PageRequest) -> Result<Page<ProductRecord>, ApiError>;

    /// A single product.
    async fn get_product(&self, product: ProductUuid) -> Result<ProductRecord, ApiError>;
}

/// Read-only voucher listing.
#[automock]
#[async_trait]
pub trait VoucherCatalog: Send + Sync {
    /// One page of vouchers, valid or not.
    async fn list_vouchers(&self, page: PageRequest) -> Result<Page<VoucherRecord>, ApiError>;
}

/// Walk every page of the voucher listing and convert the records.
///
/// Records that cannot be converted are skipped with a warning so one bad entry does not
/// hide the rest of the catalog. Paging stops at the last page the server reports, or
/// at the first empty page, whichever comes first.
///
/// # Errors
///
/// Returns the first [`ApiError`] from the listing.
pub async fn fetch_all_vouchers(
    catalog: &dyn VoucherCatalog,
    currency: &'static Currency,
    page_size: u32,
) -> Result<Vec<Voucher<'static>>, ApiError> {
    let mut request = PageRequest::first(page_size.max(1));
    let mut vouchers = Vec::new();

    loop {
        let page = catalog.list_vouchers(request.clone()).await?;

        debug!(page = request.page, count = page.items.len(), "fetched vouchers");

        let exhausted = page.items.is_empty() || request.page >= page.pagination.last_page;

        for record in page.items {
            let code = record.code.clone();

            match record.into_voucher(currency) {
                Ok(voucher) => vouchers.push(voucher),
                Err(error) => warn!(%code, %error, "skipping unreadable voucher"),
            }
        }

        if exhausted {
            return Ok(vouchers);
        }

        request = request.next();
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use mockall::predicate::eq;
    use rusty_money::iso::IDR;
    use testresult::TestResult;

    use crate::{api::records::VoucherType, uuids::VoucherUuid};

    use super::*;

    fn record(code: &str) -> VoucherRecord {
        VoucherRecord {
            id: VoucherUuid::now_v7(),
            code: code.to_string(),
            name: code.to_string(),
            description: None,
            kind: VoucherType::Fixed,
            fixed_amount: Some(5_000),
            percentage_amount: None,
            start_date: Timestamp::UNIX_EPOCH,
            end_date: Timestamp::MAX,
            status: true,
        }
    }

    fn page(codes: &[&str], page: u32, last_page: u32) -> Page<VoucherRecord> {
        Page {
            items: codes.iter().map(|code| record(code)).collect(),
            pagination: Pagination {
                page,
                per_page: 2,
                total: 3,
                last_page,
            },
        }
    }

    #[tokio::test]
    async fn fetch_all_walks_every_page() -> TestResult {
        let mut catalog = MockVoucherCatalog::new();
        catalog
            .expect_list_vouchers()
            .with(eq(PageRequest { page: 1, per_page: 2 }))
            .times(1)
            .returning(|_page| Ok(page(&["A", "B"], 1, 2)));
        catalog
            .expect_list_vouchers()
            .with(eq(PageRequest { page: 2, per_page: 2 }))
            .times(1)
            .returning(|_page| Ok(page(&["C"], 2, 2)));

        let vouchers = fetch_all_vouchers(&catalog, IDR, 2).await?;
        let codes: Vec<_> = vouchers.iter().map(|voucher| voucher.code.as_str()).collect();

        assert_eq!(codes, vec!["A", "B", "C"]);

        Ok(())
    }

    #[tokio::test]
    async fn fetch_all_skips_unreadable_records() -> TestResult {
        let mut broken = record("OLD");
        broken.fixed_amount = None;
        broken.status = false;

        let mut catalog = MockVoucherCatalog::new();
        catalog.expect_list_vouchers().times(1).returning(move |_page| {
            Ok(Page {
                items: vec![record("GOOD"), broken.clone()],
                pagination: Pagination {
                    page: 1,
                    per_page: 10,
                    total: 2,
                    last_page: 1,
                },
            })
        });

        let vouchers = fetch_all_vouchers(&catalog, IDR, 10).await?;
        let codes: Vec<_> = vouchers.iter().map(|voucher| voucher.code.as_str()).collect();

        assert_eq!(codes, vec!["GOOD"]);

        Ok(())
    }

    #[tokio::test]
    async fn fetch_all_stops_when_the_server_ignores_the_page() -> TestResult {
        let mut catalog = MockVoucherCatalog::new();
        catalog
            .expect_list_vouchers()
            .times(3)
            .returning(|_page| Ok(page(&["SAMA"], 1, 3)));

        let vouchers = fetch_all_vouchers(&catalog, IDR, 2).await?;

        assert_eq!(vouchers.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn fetch_all_stops_at_an_empty_page() -> TestResult {
        let mut catalog = MockVoucherCatalog::new();
        catalog
            .expect_list_vouchers()
            .with(eq(PageRequest { page: 1, per_page: 2 }))
            .times(1)
            .returning(|_page| Ok(page(&["A"], 1, 9)));
        catalog
            .expect_list_vouchers()
            .with(eq(PageRequest { page: 2, per_page: 2 }))
            .times(1)
            .returning(|_page| Ok(page(&[], 2, 9)));

        let vouchers = fetch_all_vouchers(&catalog, IDR, 2).await?;

        assert_eq!(vouchers.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn fetch_all_surfaces_listing_errors() {
        let mut catalog = MockVoucherCatalog::new();
        catalog
            .expect_list_vouchers()
            .returning(|_page| Err(ApiError::UnexpectedResponse("status 502".to_string())));

        let result = fetch_all_vouchers(&catalog, IDR, 10).await;

        assert!(matches!(result, Err(ApiError::UnexpectedResponse(_))));
    }

    #[test]
    fn pagination_knows_the_last_page() {
        let pagination = Pagination {
            page: 3,
            per_page: 10,
            total: 30,
            last_page: 3,
        };

        assert!(!pagination.has_next());
        assert_eq!(PageRequest::first(10).next(), PageRequest { page: 2, per_page: 10 });
    }
}
