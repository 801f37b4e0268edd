//! Session gate
//!
//! Whether the buyer is signed in decides, once per checkout, how the order is submitted.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use mockall::automock;
use tracing::info;

use crate::{
    checkout::{CheckoutDetails, CheckoutError, CheckoutField, GuestDetails, TransactionRequest},
    transactions::{CreatedTransactions, SubmissionError, TransactionGateway},
    uuids::UserUuid,
};

/// Bearer token of a signed-in buyer.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Who is checking out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// A registered, signed-in buyer.
    Member {
        /// Buyer identity
        user: UserUuid,

        /// Token authorising the buyer's requests
        access_token: AccessToken,
    },

    /// An anonymous buyer.
    Guest,
}

/// Supplies the current session.
#[automock]
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Session of the buyer at the time of the call.
    async fn current_session(&self) -> Session;
}

/// A session fixed up front, e.g. from configuration.
#[derive(Debug, Clone)]
pub struct StaticSessionProvider {
    session: Session,
}

impl StaticSessionProvider {
    /// Provider always returning `session`.
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current_session(&self) -> Session {
        self.session.clone()
    }
}

/// Which checkout flow a strategy implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutKind {
    /// Signed-in buyer
    Member,
    /// Anonymous buyer
    Guest,
}

/// How an order is validated and submitted for a kind of buyer.
#[async_trait]
pub trait CheckoutStrategy: fmt::Debug + Send + Sync {
    /// Kind of buyer this strategy serves.
    fn kind(&self) -> CheckoutKind;

    /// Check the buyer-specific parts of `details`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingFields`] naming every empty required field, or
    /// [`CheckoutError::InvalidEmail`].
    fn validate(&self, details: &CheckoutDetails) -> Result<(), CheckoutError>;

    /// Guest contact details to attach to the request, if any.
    fn guest_details(&self, details: &CheckoutDetails) -> Option<GuestDetails>;

    /// Send `request` to the order boundary.
    ///
    /// # Errors
    ///
    /// Returns the [`SubmissionError`] reported by the gateway.
    async fn submit(
        &self,
        gateway: &dyn TransactionGateway,
        request: TransactionRequest,
    ) -> Result<CreatedTransactions, SubmissionError>;
}

/// Checkout for a signed-in buyer.
#[derive(Debug, Clone)]
pub struct MemberCheckout {
    user: UserUuid,
    access_token: AccessToken,
}

impl MemberCheckout {
    /// Strategy submitting on behalf of `user`.
    pub fn new(user: UserUuid, access_token: AccessToken) -> Self {
        Self { user, access_token }
    }
}

#[async_trait]
impl CheckoutStrategy for MemberCheckout {
    fn kind(&self) -> CheckoutKind {
        CheckoutKind::Member
    }

    fn validate(&self, details: &CheckoutDetails) -> Result<(), CheckoutError> {
        let missing = details.address.missing_fields();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::MissingFields(missing))
        }
    }

    fn guest_details(&self, _details: &CheckoutDetails) -> Option<GuestDetails> {
        None
    }

    async fn submit(
        &self,
        gateway: &dyn TransactionGateway,
        request: TransactionRequest,
    ) -> Result<CreatedTransactions, SubmissionError> {
        info!(user = %self.user, drafts = request.transactions.len(), "submitting member order");

        gateway
            .create_transaction(self.access_token.clone(), request)
            .await
    }
}

/// Checkout for an anonymous buyer, who must leave contact details.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestCheckout;

#[async_trait]
impl CheckoutStrategy for GuestCheckout {
    fn kind(&self) -> CheckoutKind {
        CheckoutKind::Guest
    }

    fn validate(&self, details: &CheckoutDetails) -> Result<(), CheckoutError> {
        let missing: Vec<CheckoutField> = details
            .guest
            .missing_fields()
            .into_iter()
            .chain(details.address.missing_fields())
            .collect();

        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields(missing));
        }

        if !details.guest.has_valid_email() {
            return Err(CheckoutError::InvalidEmail(details.guest.email.clone()));
        }

        Ok(())
    }

    fn guest_details(&self, details: &CheckoutDetails) -> Option<GuestDetails> {
        Some(details.guest.clone())
    }

    async fn submit(
        &self,
        gateway: &dyn TransactionGateway,
        request: TransactionRequest,
    ) -> Result<CreatedTransactions, SubmissionError> {
        info!(drafts = request.transactions.len(), "submitting guest order");

        gateway.create_guest_transaction(request).await
    }
}

/// Picks the checkout strategy for the current session.
pub struct SessionGate {
    provider: Arc<dyn SessionProvider>,
}

impl fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGate").finish_non_exhaustive()
    }
}

impl SessionGate {
    /// Gate backed by `provider`.
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self { provider }
    }

    /// Ask the provider for the session and pick its strategy.
    pub async fn enter(&self) -> Box<dyn CheckoutStrategy> {
        Self::strategy(&self.provider.current_session().await)
    }

    /// Strategy for `session`.
    pub fn strategy(session: &Session) -> Box<dyn CheckoutStrategy> {
        match session {
            Session::Member { user, access_token } => {
                Box::new(MemberCheckout::new(*user, access_token.clone()))
            }
            Session::Guest => Box::new(GuestCheckout),
        }
    }
}
