//! Order Ledger
//!
//! Pure functions over explicit inputs: commission splits, purchase record
//! construction, earnings application and aggregation. The ledger holds no
//! state; persistence belongs to the caller.

use jiff::Timestamp;
use rustc_hash::{FxHashMap, FxHashSet};
use rusty_money::{MoneyError, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    books::{Book, BookId},
    cart::{CartLine, MAX_QUANTITY},
    pricing::{Amount, PricingError, Rate, apply_rate, line_total, total_price, validate_rate},
    receipt::{LineItem, PaymentReference, PurchaseId, PurchaseRecord, PurchaseTotals},
    users::Customer,
};

/// Errors raised by ledger operations.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    /// A rate or amount was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] PricingError),

    /// An order needs at least one line.
    #[error("cannot finalize an order with an empty cart")]
    EmptyCart,

    /// A line's quantity was outside `1..=MAX_QUANTITY`.
    #[error("Book {book_id} has quantity {quantity}, expected 1..={MAX_QUANTITY}")]
    InvalidQuantity {
        /// Offending line
        book_id: BookId,
        /// Quantity given
        quantity: u32,
    },

    /// The book is missing from the catalog snapshot or has been retired.
    #[error("Book {0} is not available in the catalog")]
    UnknownBook(BookId),

    /// A book is priced in a different currency from the rest of the order.
    #[error("Book {book_id} is priced in {found}, expected {expected}")]
    CurrencyMismatch {
        /// Offending book
        book_id: BookId,
        /// Order currency
        expected: &'static str,
        /// Book currency
        found: &'static str,
    },

    /// A purchase record failed its money invariants.
    #[error("inconsistent purchase record: {0}")]
    InconsistentRecord(&'static str),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Tax and commission rates applied when finalizing an order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    /// Sales tax, `0.08` for 8%
    pub tax: Rate,

    /// Platform commission, `0.30` for 30%
    pub commission: Rate,
}

/// A subtotal divided between the platform and authors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    /// `round2(subtotal * commission_rate)`
    pub platform_commission: Amount,

    /// `subtotal - platform_commission`
    pub author_earnings: Amount,
}

/// Per-copy breakdown of a book's price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookPricing {
    /// Unit price
    pub price: Amount,

    /// Platform's cut of one copy
    pub platform_commission: Amount,

    /// Author's cut of one copy
    pub author_royalty: Amount,
}

/// A cart line priced against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    /// Book being bought
    pub book_id: BookId,

    /// Title at pricing time
    pub title: String,

    /// Author at pricing time
    pub author: String,

    /// Unit price at pricing time
    pub unit_price: Amount,

    /// Copies
    pub quantity: u32,

    /// `unit_price * quantity`
    pub line_total: Amount,
}

/// Cart lines priced against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    /// Priced lines, in cart order
    pub lines: SmallVec<[PricedLine; 8]>,

    /// Sum of line totals
    pub subtotal: Amount,
}

/// Totals across a set of purchase records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerSummary {
    /// Number of records folded
    pub order_count: usize,

    /// Sum of subtotals
    pub total_revenue: Amount,

    /// Sum of platform commissions
    pub total_platform_commission: Amount,

    /// Sum of author earnings
    pub total_author_earnings: Amount,

    /// Sum of tax
    pub total_tax: Amount,

    /// Sum of totals charged
    pub total_collected: Amount,
}

/// Divide a subtotal between the platform and authors.
///
/// The author share is derived by subtraction so the two always sum to the
/// subtotal exactly.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidArgument`] if the subtotal is negative or the
/// rate is outside `0..=1`.
pub fn compute_split(subtotal: Amount, commission_rate: &Rate) -> Result<Split, LedgerError> {
    let platform_commission = apply_rate(subtotal, commission_rate)?;
    let author_earnings = subtotal.sub(platform_commission)?;

    Ok(Split {
        platform_commission,
        author_earnings,
    })
}

/// What one copy of a book earns the platform and its author.
///
/// # Errors
///
/// See [`compute_split`].
pub fn price_book(book: &Book, commission_rate: &Rate) -> Result<BookPricing, LedgerError> {
    let split = compute_split(book.price, commission_rate)?;

    Ok(BookPricing {
        price: book.price,
        platform_commission: split.platform_commission,
        author_royalty: split.author_earnings,
    })
}

/// Price cart lines against a catalog snapshot.
///
/// # Errors
///
/// - [`LedgerError::EmptyCart`]: no lines.
/// - [`LedgerError::InvalidQuantity`]: a quantity outside `1..=MAX_QUANTITY`.
/// - [`LedgerError::UnknownBook`]: a book is missing or retired.
/// - [`LedgerError::CurrencyMismatch`]: a book is not priced in `currency`.
pub fn price_lines(
    lines: &[CartLine],
    catalog: &[Book],
    currency: &'static Currency,
) -> Result<PricedOrder, LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::EmptyCart);
    }

    let available: FxHashMap<BookId, &Book> = catalog
        .iter()
        .filter(|book| book.is_available())
        .map(|book| (book.id, book))
        .collect();

    let mut priced = SmallVec::with_capacity(lines.len());

    for line in lines {
        if !(1..=MAX_QUANTITY).contains(&line.quantity) {
            return Err(LedgerError::InvalidQuantity {
                book_id: line.book_id,
                quantity: line.quantity,
            });
        }

        let book = available
            .get(&line.book_id)
            .ok_or(LedgerError::UnknownBook(line.book_id))?;

        if book.currency() != currency {
            return Err(LedgerError::CurrencyMismatch {
                book_id: book.id,
                expected: currency.iso_alpha_code,
                found: book.currency().iso_alpha_code,
            });
        }

        priced.push(PricedLine {
            book_id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            unit_price: book.price,
            quantity: line.quantity,
            line_total: line_total(book.price, line.quantity)?,
        });
    }

    let subtotal = total_price(priced.iter().map(|line: &PricedLine| line.line_total), currency)?;

    Ok(PricedOrder {
        lines: priced,
        subtotal,
    })
}

/// Build a purchase record with a fresh id and the current time.
///
/// # Errors
///
/// See [`finalize_order_at`].
pub fn finalize_order(
    lines: &[CartLine],
    catalog: &[Book],
    customer: Customer,
    rates: &Rates,
    payment: PaymentReference,
) -> Result<PurchaseRecord, LedgerError> {
    finalize_order_at(
        lines,
        catalog,
        customer,
        rates,
        payment,
        PurchaseId::new(),
        Timestamp::now(),
    )
}

/// Build a purchase record with an explicit id and timestamp.
///
/// The order currency is the currency of the first line's book.
///
/// # Errors
///
/// - [`LedgerError::EmptyCart`]: no lines.
/// - [`LedgerError::InvalidQuantity`]: a quantity outside `1..=MAX_QUANTITY`.
/// - [`LedgerError::UnknownBook`]: a book is missing or retired.
/// - [`LedgerError::InvalidArgument`]: a rate is outside `0..=1`.
pub fn finalize_order_at(
    lines: &[CartLine],
    catalog: &[Book],
    customer: Customer,
    rates: &Rates,
    payment: PaymentReference,
    id: PurchaseId,
    created_at: Timestamp,
) -> Result<PurchaseRecord, LedgerError> {
    let currency = order_currency(lines, catalog)?;
    let order = price_lines(lines, catalog, currency)?;
    let totals = order_totals(order.subtotal, rates)?;

    let weights: SmallVec<[i64; 8]> = order
        .lines
        .iter()
        .map(|line| line.line_total.to_minor_units())
        .collect();

    let author_shares = allocate(totals.author_earnings.to_minor_units(), &weights)?;

    let mut items = Vec::with_capacity(order.lines.len());

    for (line, author_minor) in order.lines.into_iter().zip(author_shares) {
        let author_earnings = Amount::from_minor(author_minor, currency);
        let platform_commission = line.line_total.sub(author_earnings)?;

        items.push(LineItem {
            book_id: line.book_id,
            title: line.title,
            author: line.author,
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total,
            platform_commission,
            author_earnings,
        });
    }

    PurchaseRecord::new(id, created_at, customer, items, totals, payment)
}

/// Totals an order would have, without building a record.
///
/// Used to show the amount to charge before payment.
///
/// # Errors
///
/// Fails the same way as [`finalize_order_at`].
pub fn quote(
    lines: &[CartLine],
    catalog: &[Book],
    rates: &Rates,
) -> Result<PurchaseTotals, LedgerError> {
    let currency = order_currency(lines, catalog)?;

    quote_in(lines, catalog, rates, currency)
}

/// Like [`quote`], but every book must be priced in `currency`.
///
/// # Errors
///
/// Returns [`LedgerError::CurrencyMismatch`] for the first book priced in
/// another currency, otherwise fails the same way as [`quote`].
pub fn quote_in(
    lines: &[CartLine],
    catalog: &[Book],
    rates: &Rates,
    currency: &'static Currency,
) -> Result<PurchaseTotals, LedgerError> {
    let order = price_lines(lines, catalog, currency)?;

    order_totals(order.subtotal, rates)
}

/// Currency of the first line's book.
fn order_currency(lines: &[CartLine], catalog: &[Book]) -> Result<&'static Currency, LedgerError> {
    let first = lines.first().ok_or(LedgerError::EmptyCart)?;

    catalog
        .iter()
        .find(|book| book.id == first.book_id && book.is_available())
        .map(Book::currency)
        .ok_or(LedgerError::UnknownBook(first.book_id))
}

fn order_totals(subtotal: Amount, rates: &Rates) -> Result<PurchaseTotals, LedgerError> {
    validate_rate(&rates.tax)?;

    let tax = apply_rate(subtotal, &rates.tax)?;
    let total = subtotal.add(tax)?;
    let split = compute_split(subtotal, &rates.commission)?;

    Ok(PurchaseTotals {
        subtotal,
        tax,
        total,
        platform_commission: split.platform_commission,
        author_earnings: split.author_earnings,
    })
}

/// Distribute `total` minor units in proportion to `weights`.
///
/// Floors each share, then hands the leftover units to the largest
/// remainders, lowest index first on ties. The result always sums to `total`.
fn allocate(total: i64, weights: &[i64]) -> Result<SmallVec<[i64; 8]>, PricingError> {
    let sum: i128 = weights.iter().map(|weight| i128::from(*weight)).sum();

    if sum <= 0 {
        return Ok(weights.iter().map(|_| 0).collect());
    }

    // (index, share, remainder)
    let mut shares: SmallVec<[(usize, i128, i128); 8]> = weights
        .iter()
        .enumerate()
        .map(|(idx, weight)| {
            let scaled = i128::from(total) * i128::from(*weight);

            (idx, scaled / sum, scaled % sum)
        })
        .collect();

    let assigned: i128 = shares.iter().map(|(_, share, _)| share).sum();
    let leftover = usize::try_from(i128::from(total) - assigned).map_err(|_err| PricingError::Overflow)?;

    shares.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    for (_, share, _) in shares.iter_mut().take(leftover) {
        *share += 1;
    }

    shares.sort_by_key(|(idx, _, _)| *idx);

    shares
        .into_iter()
        .map(|(_, share, _)| i64::try_from(share).map_err(|_err| PricingError::Overflow))
        .collect()
}

/// A copy of the book with a completed sale applied.
///
/// # Errors
///
/// Returns [`LedgerError::Money`] if the amount is in a different currency,
/// or [`LedgerError::InvalidArgument`] if the sales counter would overflow.
pub fn apply_earnings(
    book: &Book,
    quantity: u32,
    author_earnings_for_line: Amount,
) -> Result<Book, LedgerError> {
    let mut updated = book.clone();

    updated.sales = book
        .sales
        .checked_add(u64::from(quantity))
        .ok_or(PricingError::Overflow)?;
    updated.author_earnings = book.author_earnings.add(author_earnings_for_line)?;

    Ok(updated)
}

/// A copy of the catalog with every line of a record applied.
///
/// Books not referenced by the record are returned unchanged.
///
/// # Errors
///
/// Returns [`LedgerError::UnknownBook`] if a line's book is missing from the
/// catalog, or any error from [`apply_earnings`].
pub fn apply_record(catalog: &[Book], record: &PurchaseRecord) -> Result<Vec<Book>, LedgerError> {
    let mut books = catalog.to_vec();

    for line in record.lines() {
        let book = books
            .iter_mut()
            .find(|book| book.id == line.book_id)
            .ok_or(LedgerError::UnknownBook(line.book_id))?;

        *book = apply_earnings(book, line.quantity, line.author_earnings)?;
    }

    Ok(books)
}

/// Sum purchase records. The result does not depend on record order.
///
/// # Errors
///
/// Returns [`LedgerError::Money`] if a record is in a different currency.
pub fn aggregate(
    records: &[PurchaseRecord],
    currency: &'static Currency,
) -> Result<LedgerSummary, LedgerError> {
    let sum = |field: fn(&PurchaseRecord) -> Amount| total_price(records.iter().map(field), currency);

    Ok(LedgerSummary {
        order_count: records.len(),
        total_revenue: sum(PurchaseRecord::subtotal)?,
        total_platform_commission: sum(PurchaseRecord::platform_commission)?,
        total_author_earnings: sum(PurchaseRecord::author_earnings)?,
        total_tax: sum(PurchaseRecord::tax)?,
        total_collected: sum(PurchaseRecord::total)?,
    })
}

/// Records with at least one line for one of the given books.
pub fn filter_by_author<'r>(
    records: &'r [PurchaseRecord],
    authored_book_ids: &FxHashSet<BookId>,
) -> Vec<&'r PurchaseRecord> {
    records
        .iter()
        .filter(|record| {
            record
                .lines()
                .iter()
                .any(|line| authored_book_ids.contains(&line.book_id))
        })
        .collect()
}

/// The author earnings in one record from the given books only.
///
/// # Errors
///
/// Returns [`LedgerError::Money`] on a currency mismatch.
pub fn author_share(
    record: &PurchaseRecord,
    authored_book_ids: &FxHashSet<BookId>,
) -> Result<Amount, LedgerError> {
    let share = total_price(
        record
            .lines()
            .iter()
            .filter(|line| authored_book_ids.contains(&line.book_id))
            .map(|line| line.author_earnings),
        record.currency(),
    )?;

    Ok(share)
}
