//! Payments
//!
//! Card validation and the [`PaymentProcessor`] seam. [`SimulatedProcessor`]
//! stands in for a card gateway: it waits for a configurable latency, then
//! settles or declines based on well-known test card numbers.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use jiff::{Timestamp, civil::Date};
use mockall::automock;
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{pricing::Amount, receipt::PaymentReference};

/// Test card numbers recognised by [`SimulatedProcessor`].
pub mod test_cards {
    /// Always succeeds.
    pub const SUCCESS: &str = "4242424242424242";

    /// Declined with `card_requires_authentication`.
    pub const REQUIRES_AUTHENTICATION: &str = "4000002500003155";

    /// Declined with `card_declined`.
    pub const DECLINE: &str = "4000000000000002";

    /// Declined with `insufficient_funds`.
    pub const INSUFFICIENT_FUNDS: &str = "4000000000009995";
}

/// Default simulated gateway latency.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(2000);

/// One problem found while validating card details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CardIssue {
    /// Number is not 13 to 19 digits.
    #[error("Invalid card number")]
    Number,

    /// Expiry is malformed or in the past.
    #[error("Invalid or expired card")]
    Expiry,

    /// CVC is not 3 or 4 characters.
    #[error("Invalid CVC")]
    Cvc,
}

/// Why a gateway refused a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineCode {
    /// Generic decline
    CardDeclined,

    /// Not enough funds on the card
    InsufficientFunds,

    /// The issuer wants a challenge the simulator cannot perform
    CardRequiresAuthentication,
}

impl DeclineCode {
    /// Gateway error code, e.g. `card_declined`.
    pub fn as_str(self) -> &'static str {
        match self {
            DeclineCode::CardDeclined => "card_declined",
            DeclineCode::InsufficientFunds => "insufficient_funds",
            DeclineCode::CardRequiresAuthentication => "card_requires_authentication",
        }
    }

    /// Customer-facing message.
    pub fn message(self) -> &'static str {
        match self {
            DeclineCode::CardDeclined => "Your card was declined",
            DeclineCode::InsufficientFunds => "Insufficient funds",
            DeclineCode::CardRequiresAuthentication => "Card requires authentication",
        }
    }
}

impl fmt::Display for DeclineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// Card details failed validation; every issue found is listed.
    #[error("Please check your card details: {}", join_issues(.0))]
    Validation(Vec<CardIssue>),

    /// The gateway refused the charge.
    #[error("Payment failed: {message} ({code})")]
    Declined {
        /// Gateway error code
        code: DeclineCode,
        /// Customer-facing message
        message: String,
    },
}

fn join_issues(issues: &[CardIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Card details as entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDetails {
    /// Card number; spaces are ignored
    pub number: String,

    /// Expiry as `MM/YY`
    pub expiry: String,

    /// Card verification code
    pub cvc: String,
}

impl CardDetails {
    /// Create card details from form input.
    pub fn new(number: impl Into<String>, expiry: impl Into<String>, cvc: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            expiry: expiry.into(),
            cvc: cvc.into(),
        }
    }

    /// Card number with whitespace removed.
    pub fn normalized_number(&self) -> String {
        self.number.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Last four digits, for logs and receipts.
    pub fn last4(&self) -> String {
        let number = self.normalized_number();
        let skip = number.chars().count().saturating_sub(4);

        number.chars().skip(skip).collect()
    }

    /// Check the card against `today`, collecting every issue found.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Validation`] listing each failed check.
    pub fn validate(&self, today: Date) -> Result<(), PaymentError> {
        let mut issues = Vec::new();

        let number = self.normalized_number();

        if !(13..=19).contains(&number.len()) || !number.chars().all(|c| c.is_ascii_digit()) {
            issues.push(CardIssue::Number);
        }

        if !expiry_is_current(&self.expiry, today) {
            issues.push(CardIssue::Expiry);
        }

        if !(3..=4).contains(&self.cvc.trim().chars().count()) {
            issues.push(CardIssue::Cvc);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(PaymentError::Validation(issues))
        }
    }
}

/// `MM/YY` (or `MM/YYYY`) with a valid month that has not yet passed.
fn expiry_is_current(expiry: &str, today: Date) -> bool {
    let Some((month, year)) = expiry.split_once('/') else {
        return false;
    };

    let (Ok(month), Ok(year)) = (month.trim().parse::<i8>(), year.trim().parse::<i16>()) else {
        return false;
    };

    if !(1..=12).contains(&month) || year <= 0 {
        return false;
    }

    let current_year = if year >= 100 {
        today.year()
    } else {
        today.year() % 100
    };

    year > current_year || (year == current_year && month >= today.month())
}

/// A charge to submit to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    /// Amount to charge, tax included
    pub amount: Amount,

    /// Card to charge
    pub card: CardDetails,

    /// Where the gateway sends its receipt
    pub receipt_email: String,

    /// Statement description
    pub description: String,
}

/// A settled charge.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    /// Gateway payment id, `pi_...`
    pub payment_id: String,

    /// Gateway receipt URL
    pub receipt_url: String,

    /// Amount charged
    pub amount: Amount,

    /// When the charge settled
    pub processed_at: Timestamp,
}

impl PaymentConfirmation {
    /// The reference stored on a purchase record.
    pub fn reference(&self) -> PaymentReference {
        PaymentReference {
            payment_id: self.payment_id.clone(),
            receipt_url: self.receipt_url.clone(),
        }
    }
}

/// Something that can charge a card.
#[automock]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Charge the card in `request`.
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentConfirmation, PaymentError>;
}

/// Card gateway simulator.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    latency: Duration,
}

impl SimulatedProcessor {
    /// A simulator that waits `latency` before answering.
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    /// Configured latency
    pub fn latency(&self) -> Duration {
        self.latency
    }

    fn outcome(number: &str) -> Option<DeclineCode> {
        match number {
            test_cards::REQUIRES_AUTHENTICATION => Some(DeclineCode::CardRequiresAuthentication),
            test_cards::DECLINE => Some(DeclineCode::CardDeclined),
            test_cards::INSUFFICIENT_FUNDS => Some(DeclineCode::InsufficientFunds),
            _ => None,
        }
    }
}

impl Default for SimulatedProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedProcessor {
    #[tracing::instrument(
        name = "payments.simulated.charge",
        skip(self, request),
        fields(amount = %request.amount, card_last4 = %request.card.last4()),
        err
    )]
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentConfirmation, PaymentError> {
        tokio::time::sleep(self.latency).await;

        if let Some(code) = Self::outcome(&request.card.normalized_number()) {
            warn!(%code, "payment declined");

            return Err(PaymentError::Declined {
                code,
                message: code.message().to_string(),
            });
        }

        let payment_id = format!("pi_{}", random_token(14));

        info!(%payment_id, "payment succeeded");

        Ok(PaymentConfirmation {
            receipt_url: format!("https://dashboard.stripe.com/test/payments/{payment_id}"),
            payment_id,
            amount: request.amount,
            processed_at: Timestamp::now(),
        })
    }
}

/// Lowercase alphanumeric token of `len` characters.
fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}
