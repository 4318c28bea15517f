//! Checkout
//!
//! Turns the session cart into a purchase: validate, charge, then record.
//! The charge is the only await point. [`Checkout::place_order`] holds
//! `&mut self` across it, so the cart cannot change while a payment is in
//! flight, and nothing is written to the store unless the charge succeeds.

use jiff::{Zoned, civil::Date};
use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::{Span, debug, info};

use crate::{
    cart::Cart,
    config::LedgerConfig,
    downloads::{entitlements_for, merge_entitlements},
    ledger::{LedgerError, Rates, apply_record, finalize_order, quote_in},
    payments::{CardDetails, DeclineCode, PaymentError, PaymentProcessor, PaymentRequest},
    receipt::{PurchaseRecord, PurchaseTotals},
    store::{Store, StoreError},
    users::{Customer, is_valid_email},
};

/// Checkout errors
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to buy.
    #[error("Your cart is empty")]
    EmptyCart,

    /// The customer's email cannot receive a receipt.
    #[error("Please enter a valid email address: {0:?}")]
    InvalidEmail(String),

    /// Card details failed validation before any charge was attempted.
    #[error(transparent)]
    Card(PaymentError),

    /// The gateway refused the charge. Nothing was recorded.
    #[error("Payment failed: {message}")]
    PaymentDeclined {
        /// Gateway error code
        code: DeclineCode,
        /// Customer-facing message
        message: String,
    },

    /// The cart could not be priced against the catalog.
    #[error(transparent)]
    Ledger(LedgerError),

    /// Reading or writing bookstore state failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for CheckoutError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::EmptyCart => Self::EmptyCart,
            error => Self::Ledger(error),
        }
    }
}

impl From<PaymentError> for CheckoutError {
    fn from(error: PaymentError) -> Self {
        match error {
            PaymentError::Declined { code, message } => Self::PaymentDeclined { code, message },
            error @ PaymentError::Validation(_) => Self::Card(error),
        }
    }
}

/// Places orders against a store through a payment processor.
#[derive(Debug)]
pub struct Checkout<S, P> {
    store: S,
    processor: P,
    rates: Rates,
    currency: &'static Currency,
}

impl<S: Store, P: PaymentProcessor> Checkout<S, P> {
    /// Checkout with explicit rates, selling only books priced in
    /// `currency`.
    pub fn new(store: S, processor: P, rates: Rates, currency: &'static Currency) -> Self {
        Self {
            store,
            processor,
            rates,
            currency,
        }
    }

    /// Checkout using the configured rates and currency.
    pub fn with_config(store: S, processor: P, config: &LedgerConfig) -> Self {
        Self::new(store, processor, config.rates, config.currency)
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The backing store, for cart edits between orders.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give back the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Rates applied to new orders
    pub fn rates(&self) -> &Rates {
        &self.rates
    }

    /// Currency orders are charged in
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// What the current cart would cost.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] for an empty cart, a ledger error
    /// if the cart cannot be priced in the checkout currency, or a store
    /// error.
    pub fn quote(&self) -> Result<PurchaseTotals, CheckoutError> {
        let cart = self.store.get_cart()?;
        let books = self.store.get_books()?;

        Ok(quote_in(cart.lines(), &books, &self.rates, self.currency)?)
    }

    /// Buy everything in the cart, checking card expiry against today's
    /// date.
    ///
    /// # Errors
    ///
    /// See [`Checkout::place_order_on`].
    pub async fn place_order(
        &mut self,
        customer: Customer,
        card: &CardDetails,
    ) -> Result<PurchaseRecord, CheckoutError> {
        let today = Zoned::now().date();

        self.place_order_on(customer, card, today).await
    }

    /// Buy everything in the cart.
    ///
    /// On success the sold books' counters are updated, download entitlements
    /// are granted, the cart is cleared and the purchase is appended. Every
    /// new document is computed before the first write. A failure writing the
    /// catalog leaves the store as it was, so the order can be retried.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`]: nothing in the cart.
    /// - [`CheckoutError::InvalidEmail`], [`CheckoutError::Card`] or
    ///   [`CheckoutError::Ledger`]: validation failed; no charge was made.
    /// - [`CheckoutError::PaymentDeclined`]: the charge was refused; the store
    ///   is unchanged.
    /// - [`CheckoutError::Store`]: state could not be read or written.
    #[tracing::instrument(
        name = "checkout.place_order",
        skip(self, customer, card, today),
        fields(
            user_id = %customer.user_id,
            purchase_id = tracing::field::Empty,
            total = tracing::field::Empty
        ),
        err
    )]
    pub async fn place_order_on(
        &mut self,
        customer: Customer,
        card: &CardDetails,
        today: Date,
    ) -> Result<PurchaseRecord, CheckoutError> {
        let cart = self.store.get_cart()?;

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        if !is_valid_email(&customer.email) {
            return Err(CheckoutError::InvalidEmail(customer.email));
        }

        card.validate(today)?;

        let books = self.store.get_books()?;
        let totals = quote_in(cart.lines(), &books, &self.rates, self.currency)?;

        let span = Span::current();

        span.record("total", tracing::field::display(totals.total));

        debug!(lines = cart.len(), copies = cart.total_copies(), "charging card");

        let confirmation = self
            .processor
            .charge(&PaymentRequest {
                amount: totals.total,
                card: card.clone(),
                receipt_email: customer.email.clone(),
                description: format!("Bookstore order ({} items)", cart.total_copies()),
            })
            .await?;

        let record = finalize_order(
            cart.lines(),
            &books,
            customer,
            &self.rates,
            confirmation.reference(),
        )?;

        span.record("purchase_id", tracing::field::display(record.id()));

        let updated = apply_record(&books, &record)?;
        let mut entitlements = self.store.get_entitlements()?;
        let granted = merge_entitlements(&mut entitlements, entitlements_for(&record));

        // The purchase goes in last; until it does, the order is not placed.
        self.store.save_books(&updated)?;
        self.store.save_entitlements(&entitlements)?;
        self.store.save_cart(&Cart::new())?;
        self.store.save_purchase(&record)?;

        info!(
            purchase_id = %record.id(),
            payment_id = %confirmation.payment_id,
            entitlements = granted,
            "order placed"
        );

        Ok(record)
    }
}
