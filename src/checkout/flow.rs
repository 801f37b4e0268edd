//! Checkout flow
//!
//! ```text
//! Idle -> Building -> Ready -> Submitting -> Succeeded -> Idle
//!                       ^                 \
//!                       +----------------- Failed
//! ```
//!
//! `Idle`, `Building` and `Ready` are derived from the cart and the checkout inputs; the
//! remaining states are driven by submissions.

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::{
    cart::{CartPersistence, CartStore},
    checkout::{
        CheckoutAggregator, CheckoutDetails, CheckoutError, CheckoutStrategy, CheckoutSummary,
        TransactionRequest,
    },
    requests::{RequestTicket, RequestTracker},
    shipments::ShipmentQuote,
    transactions::{CreatedTransactions, SubmissionError, TransactionGateway},
    uuids::ShopUuid,
    vouchers::Voucher,
};

/// Where the checkout interaction stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStatus {
    /// The cart is empty.
    Idle,

    /// The cart has items but quotes or buyer details are still missing.
    Building,

    /// Everything needed to submit is present.
    Ready,

    /// A submission is in flight.
    Submitting,

    /// The last submission created the transactions and the cart was cleared.
    Succeeded,

    /// The last submission failed; the cart is untouched.
    Failed,
}

/// A validated request waiting to be sent.
#[derive(Debug, Clone)]
pub struct PendingSubmission<'a> {
    /// Request body
    pub request: TransactionRequest,

    /// Figures the request was built from
    pub summary: CheckoutSummary<'a>,

    /// Ticket to hand back with the outcome
    pub ticket: RequestTicket,
}

/// What happened to a submission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionResolution {
    /// Transactions were created and the cart cleared.
    Succeeded,

    /// The submission failed and the cart was kept.
    Failed,

    /// The outcome belonged to a closed view or a superseded submission.
    Ignored,
}

#[derive(Debug)]
enum Phase {
    Editing,
    Submitting(RequestTicket),
    Succeeded(CreatedTransactions),
    Failed(SubmissionError),
}

/// One checkout interaction, from an open cart to created transactions.
#[derive(Debug)]
pub struct CheckoutFlow<'a> {
    strategy: Box<dyn CheckoutStrategy>,
    details: CheckoutDetails,
    voucher: Option<Voucher<'a>>,
    quotes: FxHashMap<ShopUuid, ShipmentQuote<'a>>,
    quote_requests: FxHashMap<ShopUuid, RequestTicket>,
    quote_tracker: RequestTracker,
    submissions: RequestTracker,
    phase: Phase,
    live: bool,
}

impl<'a> CheckoutFlow<'a> {
    /// Start a checkout using `strategy`, normally chosen by the session gate.
    pub fn new(strategy: Box<dyn CheckoutStrategy>) -> Self {
        Self {
            strategy,
            details: CheckoutDetails::default(),
            voucher: None,
            quotes: FxHashMap::default(),
            quote_requests: FxHashMap::default(),
            quote_tracker: RequestTracker::new(),
            submissions: RequestTracker::new(),
            phase: Phase::Editing,
            live: true,
        }
    }

    /// Strategy chosen for this checkout.
    pub fn strategy(&self) -> &dyn CheckoutStrategy {
        self.strategy.as_ref()
    }

    /// Buyer and delivery details.
    pub fn details(&self) -> &CheckoutDetails {
        &self.details
    }

    /// Mutable buyer and delivery details.
    pub fn details_mut(&mut self) -> &mut CheckoutDetails {
        &mut self.details
    }

    /// Selected voucher.
    pub fn voucher(&self) -> Option<&Voucher<'a>> {
        self.voucher.as_ref()
    }

    /// Apply `voucher`, or remove the current one with `None`.
    pub fn set_voucher(&mut self, voucher: Option<Voucher<'a>>) {
        self.voucher = voucher;
    }

    /// Quote chosen for `shop`.
    pub fn quote(&self, shop: ShopUuid) -> Option<&ShipmentQuote<'a>> {
        self.quotes.get(&shop)
    }

    /// Set the quote for `shop` directly, superseding any quote request in flight for it.
    pub fn set_quote(&mut self, shop: ShopUuid, quote: ShipmentQuote<'a>) {
        self.quote_requests.remove(&shop);
        self.quotes.insert(shop, quote);
    }

    /// Start a quote request for `shop`.
    pub fn begin_quote(&mut self, shop: ShopUuid) -> RequestTicket {
        let ticket = self.quote_tracker.issue();
        self.quote_requests.insert(shop, ticket);

        ticket
    }

    /// Apply the quote returned for `ticket`.
    ///
    /// Returns `false`, changing nothing, if the request was superseded.
    pub fn finish_quote(&mut self, ticket: RequestTicket, quote: ShipmentQuote<'a>) -> bool {
        let Some(shop) = self
            .quote_requests
            .iter()
            .find_map(|(shop, pending)| (*pending == ticket).then_some(*shop))
        else {
            debug!("discarding stale shipment quote");
            return false;
        };

        self.quote_requests.remove(&shop);
        self.quotes.insert(shop, quote);

        true
    }

    fn aggregator<'c, P: CartPersistence>(
        &'c self,
        cart: &'c CartStore<'a, P>,
    ) -> CheckoutAggregator<'c, 'a> {
        CheckoutAggregator::new(
            cart.items(),
            &self.quotes,
            self.voucher.as_ref(),
            cart.currency(),
        )
    }

    /// Price the current cart.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] if the cart is empty, a quote is missing or pricing fails.
    pub fn summary<P: CartPersistence>(
        &self,
        cart: &CartStore<'a, P>,
    ) -> Result<CheckoutSummary<'a>, CheckoutError> {
        self.aggregator(cart).summary()
    }

    /// Current state of the interaction.
    pub fn status<P: CartPersistence>(&self, cart: &CartStore<'a, P>) -> CheckoutStatus {
        match &self.phase {
            Phase::Submitting(_) => CheckoutStatus::Submitting,
            Phase::Succeeded(_) => CheckoutStatus::Succeeded,
            Phase::Failed(_) => CheckoutStatus::Failed,
            Phase::Editing if cart.is_empty() => CheckoutStatus::Idle,
            Phase::Editing => {
                let ready = self.summary(cart).is_ok()
                    && self.strategy.validate(&self.details).is_ok();

                if ready {
                    CheckoutStatus::Ready
                } else {
                    CheckoutStatus::Building
                }
            }
        }
    }

    /// Transactions created by the last successful submission.
    pub fn outcome(&self) -> Option<&CreatedTransactions> {
        match &self.phase {
            Phase::Succeeded(created) => Some(created),
            _ => None,
        }
    }

    /// Error from the last failed submission.
    pub fn failure(&self) -> Option<&SubmissionError> {
        match &self.phase {
            Phase::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Validate every precondition and enter `Submitting`.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::Closed`]: the view was closed.
    /// - [`CheckoutError::AlreadySubmitting`]: a submission is in flight.
    /// - [`CheckoutError::EmptyCart`] or [`CheckoutError::MissingShipmentQuote`].
    /// - [`CheckoutError::MissingFields`] or [`CheckoutError::InvalidEmail`].
    /// - [`CheckoutError::VoucherNoLongerValid`]: the voucher expired or was deactivated.
    pub fn begin_submission<P: CartPersistence>(
        &mut self,
        cart: &CartStore<'a, P>,
        now: Timestamp,
    ) -> Result<PendingSubmission<'a>, CheckoutError> {
        if !self.live {
            return Err(CheckoutError::Closed);
        }

        if matches!(self.phase, Phase::Submitting(_)) {
            return Err(CheckoutError::AlreadySubmitting);
        }

        let aggregator = self.aggregator(cart);
        let summary = aggregator.summary()?;

        self.strategy.validate(&self.details)?;

        if let Some(voucher) = self
            .voucher
            .as_ref()
            .filter(|voucher| !voucher.is_selectable(now))
        {
            return Err(CheckoutError::VoucherNoLongerValid(voucher.code.clone()));
        }

        let guest = self.strategy.guest_details(&self.details);
        let request = aggregator.request(&self.details, guest)?;
        let ticket = self.submissions.issue();

        info!(
            drafts = request.transactions.len(),
            grand_total = %summary.grand_total,
            "checkout submission started"
        );

        self.phase = Phase::Submitting(ticket);

        Ok(PendingSubmission {
            request,
            summary,
            ticket,
        })
    }

    /// Apply the outcome of the submission identified by `ticket`.
    ///
    /// Success clears the cart, the voucher and the quotes. Failure leaves the cart as it
    /// was.
    /// Outcomes for a closed view or a superseded ticket change nothing.
    pub fn complete_submission<P: CartPersistence>(
        &mut self,
        cart: &mut CartStore<'a, P>,
        ticket: RequestTicket,
        outcome: Result<CreatedTransactions, SubmissionError>,
    ) -> SubmissionResolution {
        let current = matches!(self.phase, Phase::Submitting(pending) if pending == ticket);

        if !self.live || !current || !self.submissions.is_latest(ticket) {
            debug!("ignoring outcome of a superseded checkout submission");
            return SubmissionResolution::Ignored;
        }

        match outcome {
            Ok(created) => {
                info!(transactions = created.len(), "checkout submission succeeded");

                cart.clear();
                self.voucher = None;
                self.quotes.clear();
                self.quote_requests.clear();
                self.phase = Phase::Succeeded(created);

                SubmissionResolution::Succeeded
            }
            Err(error) => {
                warn!(%error, "checkout submission failed");

                self.phase = Phase::Failed(error);

                SubmissionResolution::Failed
            }
        }
    }

    /// Dismiss the result of the last submission.
    ///
    /// After a failure the flow goes back to `Ready` (or `Building` if inputs changed); after
    /// a success it returns to `Idle`.
    pub fn acknowledge(&mut self) {
        if matches!(self.phase, Phase::Succeeded(_) | Phase::Failed(_)) {
            self.phase = Phase::Editing;
        }
    }

    /// Close the view. Any submission still in flight will be ignored when it completes.
    pub fn close(&mut self) {
        self.live = false;
        self.submissions.invalidate();

        if matches!(self.phase, Phase::Submitting(_)) {
            self.phase = Phase::Editing;
        }
    }

    /// Whether the view is still open.
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Validate, submit once through `gateway` and apply the outcome.
    ///
    /// # Errors
    ///
    /// Returns any precondition error from [`Self::begin_submission`], or
    /// [`CheckoutError::Submission`] if the gateway failed.
    pub async fn submit<P: CartPersistence>(
        &mut self,
        cart: &mut CartStore<'a, P>,
        gateway: &dyn TransactionGateway,
        now: Timestamp,
    ) -> Result<CreatedTransactions, CheckoutError> {
        let pending = self.begin_submission(cart, now)?;
        let outcome = self.strategy.submit(gateway, pending.request).await;

        self.complete_submission(cart, pending.ticket, outcome.clone());

        outcome.map_err(CheckoutError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use jiff::ToSpan;
    use rusty_money::{Money, iso::IDR};
    use testresult::TestResult;

    use crate::{
        cart::{CartItem, MemoryCartStorage},
        checkout::{GuestCheckout, GuestDetails, ShippingAddress},
        pricing::from_whole_units,
        products::Product,
        transactions::MockTransactionGateway,
        uuids::{ProductUuid, VoucherUuid},
        vouchers::VoucherKind,
    };

    use super::*;

    type Cart = CartStore<'static, MemoryCartStorage>;

    fn now() -> TestResult<Timestamp> {
        Ok("2025-03-01T12:00:00Z".parse()?)
    }

    fn cart_with(shop: ShopUuid) -> TestResult<Cart> {
        let mut cart = CartStore::restore(MemoryCartStorage::new(), IDR);
        cart.add_item(Product {
            uuid: ProductUuid::now_v7(),
            variant: None,
            name: "Kopi Arabika".to_string(),
            price: from_whole_units(50_000, IDR)?,
            image: None,
            shop,
            weight_grams: 250,
        });

        Ok(cart)
    }

    fn quote(cost: i64) -> TestResult<ShipmentQuote<'static>> {
        Ok(ShipmentQuote {
            courier: "sicepat".to_string(),
            service: "BEST".to_string(),
            cost: from_whole_units(cost, IDR)?,
            estimated_delivery: None,
            parameter: "{}".to_string(),
        })
    }

    fn guest_flow() -> CheckoutFlow<'static> {
        let mut flow = CheckoutFlow::new(Box::new(GuestCheckout));
        *flow.details_mut() = CheckoutDetails {
            address: ShippingAddress {
                recipient_name: "Sari".to_string(),
                phone: "081234567890".to_string(),
                address: "Jl. Melati No. 7".to_string(),
                province: "DKI Jakarta".to_string(),
                city: "Jakarta Selatan".to_string(),
                district: "Kebayoran Baru".to_string(),
                postal_code: "12110".to_string(),
            },
            guest: GuestDetails {
                name: "Sari".to_string(),
                email: "sari@example.test".to_string(),
                phone: "081234567890".to_string(),
            },
            note: None,
        };

        flow
    }

    fn ready_flow() -> TestResult<(CheckoutFlow<'static>, Cart)> {
        let shop = ShopUuid::now_v7();
        let cart = cart_with(shop)?;
        let mut flow = guest_flow();
        flow.set_quote(shop, quote(10_000)?);

        Ok((flow, cart))
    }

    #[test]
    fn status_is_derived_from_inputs() -> TestResult {
        let shop = ShopUuid::now_v7();
        let empty = CartStore::restore(MemoryCartStorage::new(), IDR);
        let cart = cart_with(shop)?;
        let mut flow = guest_flow();

        assert_eq!(flow.status(&empty), CheckoutStatus::Idle);
        assert_eq!(flow.status(&cart), CheckoutStatus::Building);

        flow.set_quote(shop, quote(10_000)?);

        assert_eq!(flow.status(&cart), CheckoutStatus::Ready);

        flow.details_mut().address.city.clear();

        assert_eq!(flow.status(&cart), CheckoutStatus::Building);

        Ok(())
    }

    #[test]
    fn stale_quotes_are_discarded() -> TestResult {
        let shop = ShopUuid::now_v7();
        let cart = cart_with(shop)?;
        let mut flow = guest_flow();

        let stale = flow.begin_quote(shop);
        let latest = flow.begin_quote(shop);

        assert!(flow.finish_quote(latest, quote(12_000)?));
        assert!(!flow.finish_quote(stale, quote(99_000)?));
        assert_eq!(
            flow.summary(&cart)?.shipment_cost,
            from_whole_units(12_000, IDR)?
        );

        Ok(())
    }

    #[test]
    fn second_submission_is_refused_while_one_is_in_flight() -> TestResult {
        let (mut flow, cart) = ready_flow()?;

        flow.begin_submission(&cart, now()?)?;

        assert!(matches!(
            flow.begin_submission(&cart, now()?),
            Err(CheckoutError::AlreadySubmitting)
        ));
        assert_eq!(flow.status(&cart), CheckoutStatus::Submitting);

        Ok(())
    }

    #[test]
    fn expired_voucher_is_rejected_at_submission() -> TestResult {
        let (mut flow, cart) = ready_flow()?;
        let now = now()?;

        flow.set_voucher(Some(Voucher {
            uuid: VoucherUuid::now_v7(),
            code: "KILAT".to_string(),
            name: "Flash sale".to_string(),
            description: None,
            kind: VoucherKind::Fixed(from_whole_units(5_000, IDR)?),
            starts_at: now.checked_sub(2.hours())?,
            ends_at: now.checked_sub(1.hour())?,
            active: true,
        }));

        assert!(matches!(
            flow.begin_submission(&cart, now),
            Err(CheckoutError::VoucherNoLongerValid(code)) if code == "KILAT"
        ));
        assert_eq!(flow.status(&cart), CheckoutStatus::Ready);

        Ok(())
    }

    #[test]
    fn failure_keeps_cart_and_acknowledge_returns_to_ready() -> TestResult {
        let (mut flow, mut cart) = ready_flow()?;
        let before = cart.state().clone();

        let pending = flow.begin_submission(&cart, now()?)?;
        let resolution = flow.complete_submission(
            &mut cart,
            pending.ticket,
            Err(SubmissionError::Transport("connection reset".to_string())),
        );

        assert_eq!(resolution, SubmissionResolution::Failed);
        assert_eq!(flow.status(&cart), CheckoutStatus::Failed);
        assert_eq!(cart.state(), &before);

        flow.acknowledge();

        assert_eq!(flow.status(&cart), CheckoutStatus::Ready);

        Ok(())
    }

    #[test]
    fn success_clears_cart_and_returns_to_idle() -> TestResult {
        let (mut flow, mut cart) = ready_flow()?;

        let pending = flow.begin_submission(&cart, now()?)?;
        let resolution = flow.complete_submission(
            &mut cart,
            pending.ticket,
            Ok(CreatedTransactions::Multiple(vec![])),
        );

        assert_eq!(resolution, SubmissionResolution::Succeeded);
        assert!(cart.is_empty());
        assert_eq!(flow.status(&cart), CheckoutStatus::Succeeded);
        assert!(flow.outcome().is_some());

        flow.acknowledge();

        assert_eq!(flow.status(&cart), CheckoutStatus::Idle);

        Ok(())
    }

    #[test]
    fn outcome_after_close_is_ignored() -> TestResult {
        let (mut flow, mut cart) = ready_flow()?;

        let pending = flow.begin_submission(&cart, now()?)?;
        flow.close();

        let resolution = flow.complete_submission(
            &mut cart,
            pending.ticket,
            Ok(CreatedTransactions::Multiple(vec![])),
        );

        assert_eq!(resolution, SubmissionResolution::Ignored);
        assert_eq!(cart.len(), 1);
        assert!(matches!(
            flow.begin_submission(&cart, now()?),
            Err(CheckoutError::Closed)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn submit_runs_one_attempt_through_the_strategy() -> TestResult {
        let (mut flow, mut cart) = ready_flow()?;
        let mut gateway = MockTransactionGateway::new();
        gateway.expect_create_transaction().never();
        gateway
            .expect_create_guest_transaction()
            .withf(|request| request.guest.is_some() && request.transactions.len() == 1)
            .times(1)
            .returning(|_request| Ok(CreatedTransactions::Multiple(vec![])));

        flow.submit(&mut cart, &gateway, now()?).await?;

        assert!(cart.is_empty());
        assert_eq!(cart.subtotal()?, Money::from_minor(0, IDR));

        Ok(())
    }

    #[test]
    fn quantity_changes_are_reflected_in_the_summary() -> TestResult {
        let (flow, mut cart) = ready_flow()?;
        let product = cart
            .items()
            .first()
            .map(CartItem::product_uuid)
            .ok_or("empty cart")?;

        cart.increase_item_quantity(product);

        let summary = flow.summary(&cart)?;

        assert_eq!(summary.subtotal, from_whole_units(100_000, IDR)?);
        assert_eq!(
            cart.get(product).map(CartItem::quantity),
            NonZeroU32::new(2)
        );

        Ok(())
    }
}
