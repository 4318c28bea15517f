//! Receipt
//!
//! [`PurchaseRecord`] is the immutable record of a completed order. Line items
//! are frozen copies of the catalog at the time of sale, so later price or
//! title changes never reach an existing record.

use std::{fmt, io};

use jiff::Timestamp;
use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    books::BookId,
    cart::MAX_QUANTITY,
    ledger::LedgerError,
    pricing::{Amount, line_total, total_price},
    users::Customer,
};

/// Errors that can occur when writing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// IO error
    #[error("IO error")]
    IO,
}

/// Purchase identifier, displayed as `BK-<uuid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(Uuid);

impl PurchaseId {
    /// A fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub const fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for PurchaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BK-{}", self.0)
    }
}

/// Reference to the payment that settled a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReference {
    /// Processor payment id, e.g. `pi_3k2j...`
    pub payment_id: String,

    /// Where the processor's receipt can be viewed.
    pub receipt_url: String,
}

/// A frozen copy of one cart line at the time of sale.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    /// Book sold
    pub book_id: BookId,

    /// Title at time of sale
    pub title: String,

    /// Author at time of sale
    pub author: String,

    /// Unit price at time of sale
    pub unit_price: Amount,

    /// Copies sold
    pub quantity: u32,

    /// `unit_price * quantity`
    pub line_total: Amount,

    /// This line's share of the platform commission
    pub platform_commission: Amount,

    /// This line's share of the author earnings
    pub author_earnings: Amount,
}

impl LineItem {
    fn verify(&self) -> Result<(), LedgerError> {
        if !(1..=MAX_QUANTITY).contains(&self.quantity) {
            return Err(LedgerError::InconsistentRecord("line quantity out of range"));
        }

        if line_total(self.unit_price, self.quantity)? != self.line_total {
            return Err(LedgerError::InconsistentRecord(
                "line total is not unit price times quantity",
            ));
        }

        if self.platform_commission.add(self.author_earnings)? != self.line_total {
            return Err(LedgerError::InconsistentRecord(
                "line shares do not sum to the line total",
            ));
        }

        let amounts = [self.unit_price, self.platform_commission, self.author_earnings];

        if amounts.iter().any(|amount| amount.to_minor_units() < 0) {
            return Err(LedgerError::InconsistentRecord("negative amount on a line"));
        }

        Ok(())
    }
}

/// Money totals of a purchase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurchaseTotals {
    /// Sum of line totals before tax
    pub subtotal: Amount,

    /// `round2(subtotal * tax_rate)`
    pub tax: Amount,

    /// `subtotal + tax`
    pub total: Amount,

    /// `round2(subtotal * commission_rate)`
    pub platform_commission: Amount,

    /// `subtotal - platform_commission`
    pub author_earnings: Amount,
}

/// Immutable record of a completed order.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    id: PurchaseId,
    created_at: Timestamp,
    customer: Customer,
    lines: Vec<LineItem>,
    totals: PurchaseTotals,
    payment: PaymentReference,
}

impl PurchaseRecord {
    /// Assemble a record, checking the money invariants hold exactly.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EmptyCart`] for a record without lines and
    /// [`LedgerError::InconsistentRecord`] if any invariant fails.
    pub fn new(
        id: PurchaseId,
        created_at: Timestamp,
        customer: Customer,
        lines: Vec<LineItem>,
        totals: PurchaseTotals,
        payment: PaymentReference,
    ) -> Result<Self, LedgerError> {
        let record = Self {
            id,
            created_at,
            customer,
            lines,
            totals,
            payment,
        };

        record.verify()?;

        Ok(record)
    }

    fn verify(&self) -> Result<(), LedgerError> {
        let currency = self.currency();
        let totals = &self.totals;

        if self.lines.is_empty() {
            return Err(LedgerError::EmptyCart);
        }

        for line in &self.lines {
            line.verify()?;
        }

        if totals.tax.to_minor_units() < 0 {
            return Err(LedgerError::InconsistentRecord("negative tax"));
        }

        let line_sum = total_price(self.lines.iter().map(|line| line.line_total), currency)?;

        if line_sum != totals.subtotal {
            return Err(LedgerError::InconsistentRecord(
                "subtotal differs from the sum of line totals",
            ));
        }

        if totals.subtotal.add(totals.tax)? != totals.total {
            return Err(LedgerError::InconsistentRecord("total is not subtotal plus tax"));
        }

        if totals
            .platform_commission
            .add(totals.author_earnings)?
            != totals.subtotal
        {
            return Err(LedgerError::InconsistentRecord(
                "commission and author earnings do not sum to the subtotal",
            ));
        }

        let author_lines = total_price(self.lines.iter().map(|line| line.author_earnings), currency)?;
        let platform_lines =
            total_price(self.lines.iter().map(|line| line.platform_commission), currency)?;

        if author_lines != totals.author_earnings || platform_lines != totals.platform_commission {
            return Err(LedgerError::InconsistentRecord(
                "line shares do not sum to the record totals",
            ));
        }

        Ok(())
    }

    /// Purchase identifier
    pub fn id(&self) -> PurchaseId {
        self.id
    }

    /// When the purchase was completed
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Customer snapshot
    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    /// Line items in cart order
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// All money totals
    pub fn totals(&self) -> &PurchaseTotals {
        &self.totals
    }

    /// Total before tax
    pub fn subtotal(&self) -> Amount {
        self.totals.subtotal
    }

    /// Tax charged
    pub fn tax(&self) -> Amount {
        self.totals.tax
    }

    /// Amount charged to the customer
    pub fn total(&self) -> Amount {
        self.totals.total
    }

    /// Platform's cut of the subtotal
    pub fn platform_commission(&self) -> Amount {
        self.totals.platform_commission
    }

    /// Authors' cut of the subtotal
    pub fn author_earnings(&self) -> Amount {
        self.totals.author_earnings
    }

    /// Payment reference
    pub fn payment(&self) -> &PaymentReference {
        &self.payment
    }

    /// Currency used for all monetary values
    pub fn currency(&self) -> &'static Currency {
        self.totals.subtotal.currency()
    }

    /// Copies across all lines.
    pub fn total_copies(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Whether any line sold the given book.
    pub fn contains_book(&self, book_id: BookId) -> bool {
        self.lines.iter().any(|line| line.book_id == book_id)
    }

    /// Writes the receipt as a table followed by a totals summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Title", "Author", "Price", "Qty", "Line Total"]);

        for (idx, line) in self.lines.iter().enumerate() {
            builder.push_record([
                format!("#{:<3}", idx + 1),
                line.title.clone(),
                line.author.clone(),
                line.unit_price.to_string(),
                line.quantity.to_string(),
                line.line_total.to_string(),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Columns::new(3..6), Alignment::right());

        writeln!(out, "\nReceipt {}  {}", self.id, self.created_at).map_err(|_err| ReceiptError::IO)?;
        writeln!(out, "{} <{}>", self.customer.name, self.customer.email)
            .map_err(|_err| ReceiptError::IO)?;
        writeln!(out, "{table}").map_err(|_err| ReceiptError::IO)?;

        let summary = [
            ("Subtotal:", self.subtotal()),
            ("Tax:", self.tax()),
            ("Total:", self.total()),
            ("Platform Commission:", self.platform_commission()),
            ("Authors' Earnings:", self.author_earnings()),
        ];

        let label_width = summary.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

        let values: Vec<String> = summary.iter().map(|(_, amount)| amount.to_string()).collect();
        let value_width = values.iter().map(String::len).max().unwrap_or(0);

        for ((label, _), value) in summary.iter().zip(&values) {
            writeln!(out, " {label:>label_width$}  {value:>value_width$}")
                .map_err(|_err| ReceiptError::IO)?;
        }

        writeln!(out, " Payment: {}", self.payment.payment_id).map_err(|_err| ReceiptError::IO)
    }
}
