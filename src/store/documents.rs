//! Persisted document layout.
//!
//! Domain types hold `rusty_money` amounts, which borrow a static currency
//! table and so are not serialized directly. These documents are the JSON
//! shape written to disk; amounts are stored as integer minor units with an
//! ISO currency code.

use jiff::Timestamp;
use rusty_money::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    books::{Book, BookId, Category},
    ledger::LedgerError,
    pricing::{Amount, PricingError, ensure_non_negative, parse_currency},
    receipt::{LineItem, PaymentReference, PurchaseId, PurchaseRecord, PurchaseTotals},
    users::Customer,
};

/// A stored document could not be turned back into a domain value.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Unknown currency or malformed amount
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Stored purchase record violates its invariants
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// `{ "minor": 1299, "currency": "USD" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountDocument {
    /// Minor units, e.g. cents
    pub minor: i64,

    /// ISO 4217 code
    pub currency: String,
}

impl AmountDocument {
    /// Rebuild the amount.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Pricing`] for an unsupported currency.
    pub fn into_amount(self) -> Result<Amount, DocumentError> {
        Ok(Money::from_minor(self.minor, parse_currency(&self.currency)?))
    }
}

impl From<Amount> for AmountDocument {
    fn from(amount: Amount) -> Self {
        Self {
            minor: amount.to_minor_units(),
            currency: amount.currency().iso_alpha_code.to_string(),
        }
    }
}

/// Stored book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDocument {
    /// Book identifier
    pub id: BookId,

    /// Title
    pub title: String,

    /// Author display name
    pub author: String,

    /// Author contact email
    #[serde(default)]
    pub author_email: String,

    /// Blurb
    #[serde(default)]
    pub description: String,

    /// Category
    #[serde(default)]
    pub category: Category,

    /// Unit price
    pub price: AmountDocument,

    /// Copies sold
    #[serde(default)]
    pub sales: u64,

    /// Lifetime author earnings
    pub author_earnings: AmountDocument,

    /// Publish time
    pub published_at: Timestamp,

    /// Soft-delete flag
    #[serde(default)]
    pub retired: bool,
}

impl From<&Book> for BookDocument {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            author_email: book.author_email.clone(),
            description: book.description.clone(),
            category: book.category,
            price: book.price.into(),
            sales: book.sales,
            author_earnings: book.author_earnings.into(),
            published_at: book.published_at,
            retired: book.retired,
        }
    }
}

impl TryFrom<BookDocument> for Book {
    type Error = DocumentError;

    fn try_from(doc: BookDocument) -> Result<Self, Self::Error> {
        let price = doc.price.into_amount()?;
        let author_earnings = doc.author_earnings.into_amount()?;

        ensure_non_negative(&price)?;
        ensure_non_negative(&author_earnings)?;

        if author_earnings.currency() != price.currency() {
            return Err(LedgerError::CurrencyMismatch {
                book_id: doc.id,
                expected: price.currency().iso_alpha_code,
                found: author_earnings.currency().iso_alpha_code,
            }
            .into());
        }

        Ok(Book {
            id: doc.id,
            title: doc.title,
            author: doc.author,
            author_email: doc.author_email,
            description: doc.description,
            category: doc.category,
            price,
            sales: doc.sales,
            author_earnings,
            published_at: doc.published_at,
            retired: doc.retired,
        })
    }
}

/// Stored purchase line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDocument {
    /// Book sold
    pub book_id: BookId,

    /// Title at time of sale
    pub title: String,

    /// Author at time of sale
    pub author: String,

    /// Unit price at time of sale
    pub price: AmountDocument,

    /// Copies
    pub quantity: u32,

    /// Line total
    pub line_total: AmountDocument,

    /// Line share of platform commission
    pub platform_commission: AmountDocument,

    /// Line share of author earnings
    pub author_earnings: AmountDocument,
}

impl From<&LineItem> for LineItemDocument {
    fn from(line: &LineItem) -> Self {
        Self {
            book_id: line.book_id,
            title: line.title.clone(),
            author: line.author.clone(),
            price: line.unit_price.into(),
            quantity: line.quantity,
            line_total: line.line_total.into(),
            platform_commission: line.platform_commission.into(),
            author_earnings: line.author_earnings.into(),
        }
    }
}

impl TryFrom<LineItemDocument> for LineItem {
    type Error = DocumentError;

    fn try_from(doc: LineItemDocument) -> Result<Self, Self::Error> {
        Ok(LineItem {
            book_id: doc.book_id,
            title: doc.title,
            author: doc.author,
            unit_price: doc.price.into_amount()?,
            quantity: doc.quantity,
            line_total: doc.line_total.into_amount()?,
            platform_commission: doc.platform_commission.into_amount()?,
            author_earnings: doc.author_earnings.into_amount()?,
        })
    }
}

/// Stored purchase record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDocument {
    /// Purchase identifier
    pub id: PurchaseId,

    /// Completion time
    pub date: Timestamp,

    /// Customer snapshot
    pub customer: Customer,

    /// Lines in cart order
    pub items: Vec<LineItemDocument>,

    /// Subtotal
    pub subtotal: AmountDocument,

    /// Tax
    pub tax: AmountDocument,

    /// Total charged
    pub total: AmountDocument,

    /// Platform commission
    pub platform_commission: AmountDocument,

    /// Author earnings
    pub authors_earnings: AmountDocument,

    /// Gateway payment id
    pub payment_id: String,

    /// Gateway receipt URL
    pub receipt_url: String,
}

impl From<&PurchaseRecord> for PurchaseDocument {
    fn from(record: &PurchaseRecord) -> Self {
        Self {
            id: record.id(),
            date: record.created_at(),
            customer: record.customer().clone(),
            items: record.lines().iter().map(LineItemDocument::from).collect(),
            subtotal: record.subtotal().into(),
            tax: record.tax().into(),
            total: record.total().into(),
            platform_commission: record.platform_commission().into(),
            authors_earnings: record.author_earnings().into(),
            payment_id: record.payment().payment_id.clone(),
            receipt_url: record.payment().receipt_url.clone(),
        }
    }
}

impl TryFrom<PurchaseDocument> for PurchaseRecord {
    type Error = DocumentError;

    fn try_from(doc: PurchaseDocument) -> Result<Self, Self::Error> {
        let lines = doc
            .items
            .into_iter()
            .map(LineItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let totals = PurchaseTotals {
            subtotal: doc.subtotal.into_amount()?,
            tax: doc.tax.into_amount()?,
            total: doc.total.into_amount()?,
            platform_commission: doc.platform_commission.into_amount()?,
            author_earnings: doc.authors_earnings.into_amount()?,
        };

        let payment = PaymentReference {
            payment_id: doc.payment_id,
            receipt_url: doc.receipt_url,
        };

        Ok(PurchaseRecord::new(
            doc.id,
            doc.date,
            doc.customer,
            lines,
            totals,
            payment,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{EUR, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn amount_document_uses_minor_units() -> TestResult {
        let doc = AmountDocument::from(Money::from_minor(12_99, USD));

        assert_eq!(
            serde_json::to_string(&doc)?,
            r#"{"minor":1299,"currency":"USD"}"#
        );

        Ok(())
    }

    #[test]
    fn amount_document_restores_currency() -> TestResult {
        let doc = AmountDocument {
            minor: 5_00,
            currency: "EUR".to_string(),
        };

        assert_eq!(doc.into_amount()?, Money::from_minor(5_00, EUR));

        Ok(())
    }

    #[test]
    fn amount_document_rejects_unknown_currency() {
        let doc = AmountDocument {
            minor: 5_00,
            currency: "XYZ".to_string(),
        };

        assert!(matches!(
            doc.into_amount(),
            Err(DocumentError::Pricing(PricingError::UnknownCurrency(_)))
        ));
    }

    #[test]
    fn book_document_defaults_optional_fields() -> TestResult {
        let json = r#"{
            "id": 3,
            "title": "Legacy",
            "author": "Old Author",
            "category": "cookery",
            "price": { "minor": 999, "currency": "USD" },
            "authorEarnings": { "minor": 0, "currency": "USD" },
            "publishedAt": "2024-01-01T00:00:00Z"
        }"#;

        let doc: BookDocument = serde_json::from_str(json)?;
        let book = Book::try_from(doc)?;

        assert_eq!(book.category, Category::Uncategorized);
        assert_eq!(book.sales, 0);
        assert!(!book.retired);
        assert_eq!(book.price, Money::from_minor(9_99, USD));

        Ok(())
    }

    fn book_json(price: &str, earnings: &str) -> String {
        format!(
            r#"{{
            "id": 7,
            "title": "Stored",
            "author": "Ada Byron",
            "price": {price},
            "authorEarnings": {earnings},
            "publishedAt": "2024-01-01T00:00:00Z"
        }}"#
        )
    }

    #[test]
    fn book_document_rejects_negative_price() -> TestResult {
        let json = book_json(
            r#"{ "minor": -999, "currency": "USD" }"#,
            r#"{ "minor": 0, "currency": "USD" }"#,
        );
        let doc: BookDocument = serde_json::from_str(&json)?;

        assert!(matches!(
            Book::try_from(doc),
            Err(DocumentError::Pricing(PricingError::NegativeAmount(_)))
        ));

        Ok(())
    }

    #[test]
    fn book_document_rejects_earnings_in_another_currency() -> TestResult {
        let json = book_json(
            r#"{ "minor": 999, "currency": "USD" }"#,
            r#"{ "minor": 699, "currency": "EUR" }"#,
        );
        let doc: BookDocument = serde_json::from_str(&json)?;

        assert!(matches!(
            Book::try_from(doc),
            Err(DocumentError::Ledger(LedgerError::CurrencyMismatch {
                book_id: BookId(7),
                expected: "USD",
                found: "EUR",
            }))
        ));

        Ok(())
    }
}
