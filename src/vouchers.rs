//! Vouchers
//!
//! A voucher may be applied only while it is active and the current time lies inside its
//! redemption window, bounds included.

use std::fmt::Display;

use jiff::Timestamp;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::debug;

use crate::{
    requests::{RequestTicket, RequestTracker},
    uuids::VoucherUuid,
};

/// How a voucher reduces the price.
#[derive(Debug, Clone, PartialEq)]
pub enum VoucherKind<'a> {
    /// A fixed amount off.
    Fixed(Money<'a, Currency>),

    /// A percentage off, `10` meaning 10%.
    Percentage(Decimal),
}

/// Voucher offered by the marketplace.
#[derive(Debug, Clone, PartialEq)]
pub struct Voucher<'a> {
    /// Voucher identity, sent with the transaction request.
    pub uuid: VoucherUuid,

    /// Unique code shown to the buyer.
    pub code: String,

    /// Display name
    pub name: String,

    /// Longer description
    pub description: Option<String>,

    /// Discount type and amount
    pub kind: VoucherKind<'a>,

    /// Start of the redemption window.
    pub starts_at: Timestamp,

    /// End of the redemption window.
    pub ends_at: Timestamp,

    /// Active flag set by the marketplace.
    pub active: bool,
}

impl Voucher<'_> {
    /// Whether the voucher can be applied at `now`.
    pub fn is_selectable(&self, now: Timestamp) -> bool {
        self.active && self.starts_at <= now && now <= self.ends_at
    }
}

/// Vouchers from `vouchers` that can be applied at `now`, in their original order.
pub fn selectable_vouchers<'a>(
    vouchers: impl IntoIterator<Item = Voucher<'a>>,
    now: Timestamp,
) -> Vec<Voucher<'a>> {
    vouchers
        .into_iter()
        .filter(|voucher| voucher.is_selectable(now))
        .collect()
}

/// Errors raised when selecting a voucher.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoucherError {
    /// The voucher list has not been fetched yet, is loading, or failed to load.
    #[error("vouchers are not loaded")]
    NotLoaded,

    /// The list is loaded but no voucher is currently valid.
    #[error("no active voucher")]
    NoneAvailable,

    /// No selectable voucher has this code.
    #[error("voucher {0} is not available")]
    UnknownVoucher(String),
}

/// Where the backing voucher list is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum VoucherCatalogState<'a> {
    /// Nothing fetched yet.
    #[default]
    NotLoaded,

    /// A fetch is in flight; the list from the previous successful fetch stays visible.
    Loading(Vec<Voucher<'a>>),

    /// The latest fetch failed.
    Failed(String),

    /// The selectable vouchers from the latest fetch, possibly empty.
    Loaded(Vec<Voucher<'a>>),
}

/// Holds the selectable vouchers and the buyer's choice of at most one.
#[derive(Debug, Default)]
pub struct VoucherSelector<'a> {
    state: VoucherCatalogState<'a>,
    selected: Option<String>,
    requests: RequestTracker,
}

impl<'a> VoucherSelector<'a> {
    /// Selector with nothing loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch of the voucher list.
    ///
    /// The returned ticket supersedes any fetch still in flight.
    pub fn begin_fetch(&mut self) -> RequestTicket {
        let previous = match std::mem::take(&mut self.state) {
            VoucherCatalogState::Loaded(vouchers) | VoucherCatalogState::Loading(vouchers) => {
                vouchers
            }
            VoucherCatalogState::NotLoaded | VoucherCatalogState::Failed(_) => Vec::new(),
        };

        self.state = VoucherCatalogState::Loading(previous);

        self.requests.issue()
    }

    /// Apply the result of the fetch identified by `ticket`.
    ///
    /// Returns `false`, changing nothing, when a newer fetch has been started since.
    pub fn finish_fetch<E: Display>(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<Voucher<'a>>, E>,
        now: Timestamp,
    ) -> bool {
        if !self.requests.is_latest(ticket) {
            debug!("discarding stale voucher response");
            return false;
        }

        match result {
            Ok(vouchers) => {
                let vouchers = selectable_vouchers(vouchers, now);

                let still_offered = self
                    .selected
                    .as_ref()
                    .is_none_or(|code| vouchers.iter().any(|voucher| &voucher.code == code));

                if !still_offered {
                    debug!("selected voucher no longer offered");
                    self.selected = None;
                }

                self.state = VoucherCatalogState::Loaded(vouchers);
            }
            Err(error) => {
                self.state = VoucherCatalogState::Failed(error.to_string());
                self.selected = None;
            }
        }

        true
    }

    /// Select the voucher with `code`, or clear the selection with `None`.
    ///
    /// # Errors
    ///
    /// - [`VoucherError::NotLoaded`]: the voucher list is not loaded.
    /// - [`VoucherError::NoneAvailable`]: no voucher is currently valid.
    /// - [`VoucherError::UnknownVoucher`]: no selectable voucher has `code`.
    pub fn select(
        &mut self,
        code: Option<&str>,
    ) -> Result<Option<&Voucher<'a>>, VoucherError> {
        let Some(code) = code else {
            self.selected = None;
            return Ok(None);
        };

        let VoucherCatalogState::Loaded(vouchers) = &self.state else {
            return Err(VoucherError::NotLoaded);
        };

        if vouchers.is_empty() {
            return Err(VoucherError::NoneAvailable);
        }

        let voucher = vouchers
            .iter()
            .find(|voucher| voucher.code == code)
            .ok_or_else(|| VoucherError::UnknownVoucher(code.to_string()))?;

        self.selected = Some(voucher.code.clone());

        Ok(Some(voucher))
    }

    /// Currently selected voucher.
    pub fn selected(&self) -> Option<&Voucher<'a>> {
        let code = self.selected.as_ref()?;

        self.vouchers().iter().find(|voucher| &voucher.code == code)
    }

    /// Selectable vouchers, including the previous list while a refresh is in flight.
    pub fn vouchers(&self) -> &[Voucher<'a>] {
        match &self.state {
            VoucherCatalogState::Loaded(vouchers) | VoucherCatalogState::Loading(vouchers) => {
                vouchers
            }
            VoucherCatalogState::NotLoaded | VoucherCatalogState::Failed(_) => &[],
        }
    }

    /// Lifecycle state of the voucher list.
    pub fn state(&self) -> &VoucherCatalogState<'a> {
        &self.state
    }

    /// Whether a fetch is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self.state, VoucherCatalogState::Loading(_))
    }

    /// Loaded, but nothing is currently valid.
    pub fn is_empty_catalog(&self) -> bool {
        matches!(&self.state, VoucherCatalogState::Loaded(vouchers) if vouchers.is_empty())
    }
}
