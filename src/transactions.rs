//! Transactions
//!
//! The order boundary accepts a [`TransactionRequest`] and creates one transaction per shop.

use std::collections::BTreeMap;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    checkout::{AccessToken, ShippingAddress, TransactionRequest},
    uuids::{ShopUuid, TransactionUuid, UserUuid},
};

/// Transaction as recorded by the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identity
    pub id: TransactionUuid,

    /// Human readable reference, e.g. `INV/20250301/0001`
    pub code: String,

    /// Shop fulfilling the order
    pub shop_id: ShopUuid,

    /// Sum of line totals, in whole currency units
    pub total: i64,

    /// Voucher discount, in whole currency units
    #[serde(default)]
    pub discount_total: i64,

    /// Shipping cost, in whole currency units
    #[serde(default)]
    pub shipment_cost: i64,

    /// Amount to pay, in whole currency units
    pub grand_total: i64,

    /// Where the buyer completes payment
    #[serde(default)]
    pub payment_link: Option<String>,

    /// Status code, e.g. `pending`, `paid`
    pub status: String,

    /// Registered buyer, absent for guest orders
    #[serde(default)]
    pub user_id: Option<UserUuid>,

    /// Guest buyer name
    #[serde(default)]
    pub guest_name: Option<String>,

    /// Guest buyer email
    #[serde(default)]
    pub guest_email: Option<String>,

    /// Guest buyer phone
    #[serde(default)]
    pub guest_phone: Option<String>,

    /// Delivery address
    #[serde(flatten)]
    pub address: ShippingAddress,

    /// When the transaction was created
    pub created_at: Timestamp,

    /// When the transaction last changed
    pub updated_at: Timestamp,
}

/// Result of a successful submission: one transaction, or one per shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatedTransactions {
    /// A single transaction was created.
    Single(Box<Transaction>),

    /// Several transactions were created, in partition order.
    Multiple(Vec<Transaction>),

    /// The server accepted the request but its answer could not be read. The orders
    /// exist, so the submission must not be retried.
    #[serde(skip)]
    Unreadable {
        /// Why the answer could not be read
        reason: String,
    },
}

impl CreatedTransactions {
    /// Created transactions in order.
    pub fn transactions(&self) -> &[Transaction] {
        match self {
            Self::Single(transaction) => std::slice::from_ref(transaction.as_ref()),
            Self::Multiple(transactions) => transactions,
            Self::Unreadable { .. } => &[],
        }
    }

    /// Consume into a list of transactions.
    pub fn into_vec(self) -> Vec<Transaction> {
        match self {
            Self::Single(transaction) => vec![*transaction],
            Self::Multiple(transactions) => transactions,
            Self::Unreadable { .. } => Vec::new(),
        }
    }

    /// Number of transactions created.
    pub fn len(&self) -> usize {
        self.transactions().len()
    }

    /// Whether nothing was created.
    pub fn is_empty(&self) -> bool {
        self.transactions().is_empty()
    }
}

/// Why a submission failed. The whole request is treated as failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// The order boundary refused the request.
    #[error("{message}")]
    Rejected {
        /// Message from the server
        message: String,

        /// Validation messages keyed by field
        field_errors: BTreeMap<String, Vec<String>>,
    },

    /// The request did not complete.
    #[error("transaction request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for SubmissionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// External order-creation boundary. One attempt per call, no retries.
#[automock]
#[async_trait]
pub trait TransactionGateway: Send + Sync {
    /// Create transactions for a registered buyer.
    async fn create_transaction(
        &self,
        token: AccessToken,
        request: TransactionRequest,
    ) -> Result<CreatedTransactions, SubmissionError>;

    /// Create transactions for a guest buyer.
    async fn create_guest_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<CreatedTransactions, SubmissionError>;
}
