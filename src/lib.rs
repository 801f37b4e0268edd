//! Bazaar
//!
//! Bazaar is a multi-shop marketplace cart and checkout engine: a persistent cart, voucher
//! discounts, per-shop shipment quotes and order submission against a marketplace API.

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod discounts;
pub mod logging;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod receipt;
pub mod requests;
pub mod shipments;
pub mod transactions;
pub mod uuids;
pub mod vouchers;
