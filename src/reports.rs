//! Reports
//!
//! Author and admin dashboards built from a catalog snapshot and the purchase
//! history. Authors only ever see purchases containing their own books, and
//! only their share of them.

use std::{collections::BTreeMap, io};

use jiff::Timestamp;
use rustc_hash::FxHashSet;
use rusty_money::iso::Currency;
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;

use crate::{
    books::{Book, BookId, Category},
    ledger::{LedgerError, LedgerSummary, aggregate, author_share, filter_by_author},
    pricing::{Amount, total_price},
    receipt::{PurchaseId, PurchaseRecord, ReceiptError},
    users::{Role, User},
};

/// How many recent sales the author dashboard lists.
pub const RECENT_SALES: usize = 5;

/// How many books the admin dashboard ranks.
pub const TOP_SELLERS: usize = 5;

/// Report errors
#[derive(Debug, Error)]
pub enum ReportError {
    /// The user's role may not see this report.
    #[error("{0:?} users cannot view this report")]
    Forbidden(Role),

    /// Money arithmetic failed while summing.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Ids of the books a user wrote.
pub fn authored_book_ids(user: &User, catalog: &[Book]) -> FxHashSet<BookId> {
    catalog
        .iter()
        .filter(|book| book.is_authored_by(user))
        .map(|book| book.id)
        .collect()
}

/// One purchase as an author sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorSale {
    /// Purchase
    pub purchase_id: PurchaseId,

    /// When it was made
    pub created_at: Timestamp,

    /// Buyer's name
    pub customer_name: String,

    /// Copies of the author's books in the purchase
    pub copies: u32,

    /// The author's share of the purchase
    pub earnings: Amount,
}

/// Author dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorDashboard {
    /// Books by the author, retired ones included
    pub books: Vec<Book>,

    /// Lifetime copies sold across the author's books
    pub total_sales: u64,

    /// Lifetime earnings across the author's books
    pub total_earnings: Amount,

    /// Purchases containing at least one of the author's books
    pub order_count: usize,

    /// Most recent of those purchases, newest first
    pub recent_sales: Vec<AuthorSale>,
}

impl AuthorDashboard {
    /// Build the dashboard for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Forbidden`] for readers, or a ledger error if
    /// amounts are not in `currency`.
    pub fn build(
        user: &User,
        catalog: &[Book],
        purchases: &[PurchaseRecord],
        currency: &'static Currency,
    ) -> Result<Self, ReportError> {
        if !user.role.can_publish() {
            return Err(ReportError::Forbidden(user.role));
        }

        let ids = authored_book_ids(user, catalog);

        let books: Vec<Book> = catalog
            .iter()
            .filter(|book| ids.contains(&book.id))
            .cloned()
            .collect();

        let total_sales = books.iter().map(|book| book.sales).sum();
        let total_earnings = total_price(books.iter().map(|book| book.author_earnings), currency)
            .map_err(LedgerError::from)?;

        let mut matching = filter_by_author(purchases, &ids);

        matching.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        let recent_sales = matching
            .iter()
            .take(RECENT_SALES)
            .map(|record| {
                Ok(AuthorSale {
                    purchase_id: record.id(),
                    created_at: record.created_at(),
                    customer_name: record.customer().name.clone(),
                    copies: record
                        .lines()
                        .iter()
                        .filter(|line| ids.contains(&line.book_id))
                        .map(|line| line.quantity)
                        .sum(),
                    earnings: author_share(record, &ids)?,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        Ok(Self {
            books,
            total_sales,
            total_earnings,
            order_count: matching.len(),
            recent_sales,
        })
    }

    /// Writes the author's books and recent sales as tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut books = Builder::default();

        books.push_record(["Title", "Price", "Sales", "Earnings"]);

        for book in &self.books {
            books.push_record([
                book.title.clone(),
                book.price.to_string(),
                book.sales.to_string(),
                book.author_earnings.to_string(),
            ]);
        }

        let mut sales = Builder::default();

        sales.push_record(["Purchase", "Date", "Customer", "Copies", "Earnings"]);

        for sale in &self.recent_sales {
            sales.push_record([
                sale.purchase_id.to_string(),
                sale.created_at.to_string(),
                sale.customer_name.clone(),
                sale.copies.to_string(),
                sale.earnings.to_string(),
            ]);
        }

        let mut books = books.build();
        books.with(Style::modern_rounded());
        books.modify(Columns::new(1..4), Alignment::right());

        let mut sales = sales.build();
        sales.with(Style::modern_rounded());
        sales.modify(Columns::new(3..5), Alignment::right());

        writeln!(out, "{books}").map_err(|_err| ReceiptError::IO)?;
        writeln!(
            out,
            " Copies sold: {}  Earnings: {}  Orders: {}",
            self.total_sales, self.total_earnings, self.order_count
        )
        .map_err(|_err| ReceiptError::IO)?;
        writeln!(out, "{sales}").map_err(|_err| ReceiptError::IO)
    }
}

/// Number of users per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleCounts {
    /// Readers
    pub readers: usize,

    /// Authors
    pub authors: usize,

    /// Admins
    pub admins: usize,
}

impl RoleCounts {
    /// Count users by role.
    pub fn of(users: &[User]) -> Self {
        users.iter().fold(Self::default(), |mut counts, user| {
            match user.role {
                Role::Reader => counts.readers += 1,
                Role::Author => counts.authors += 1,
                Role::Admin => counts.admins += 1,
            }

            counts
        })
    }
}

/// Admin dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct AdminDashboard {
    /// Users per role
    pub users: RoleCounts,

    /// Books on sale
    pub available_books: usize,

    /// Books taken off sale
    pub retired_books: usize,

    /// Platform-wide ledger totals
    pub summary: LedgerSummary,

    /// Best selling books, most sales first
    pub top_sellers: Vec<Book>,

    /// Books per category
    pub categories: Vec<(Category, usize)>,
}

impl AdminDashboard {
    /// Build the dashboard for `viewer`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Forbidden`] unless the viewer is an admin, or a
    /// ledger error if records are not in `currency`.
    pub fn build(
        viewer: &User,
        users: &[User],
        catalog: &[Book],
        purchases: &[PurchaseRecord],
        currency: &'static Currency,
    ) -> Result<Self, ReportError> {
        if !viewer.role.can_view_platform_sales() {
            return Err(ReportError::Forbidden(viewer.role));
        }

        let retired_books = catalog.iter().filter(|book| !book.is_available()).count();

        Ok(Self {
            users: RoleCounts::of(users),
            available_books: catalog.len() - retired_books,
            retired_books,
            summary: aggregate(purchases, currency)?,
            top_sellers: top_sellers(catalog, TOP_SELLERS).into_iter().cloned().collect(),
            categories: category_counts(catalog),
        })
    }

    /// Writes the platform totals and top sellers.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let summary = &self.summary;

        let mut totals = Builder::default();

        totals.push_record(["Orders", "Revenue", "Commission", "Author Earnings", "Tax"]);
        totals.push_record([
            summary.order_count.to_string(),
            summary.total_revenue.to_string(),
            summary.total_platform_commission.to_string(),
            summary.total_author_earnings.to_string(),
            summary.total_tax.to_string(),
        ]);

        let mut sellers = Builder::default();

        sellers.push_record(["", "Title", "Author", "Sales"]);

        for (idx, book) in self.top_sellers.iter().enumerate() {
            sellers.push_record([
                format!("#{}", idx + 1),
                book.title.clone(),
                book.author.clone(),
                book.sales.to_string(),
            ]);
        }

        let mut totals = totals.build();
        totals.with(Style::modern_rounded());
        totals.modify(Columns::new(0..5), Alignment::right());

        let mut sellers = sellers.build();
        sellers.with(Style::modern_rounded());
        sellers.modify(Columns::new(3..4), Alignment::right());

        writeln!(
            out,
            " Users: {} readers, {} authors, {} admins  Books: {} on sale, {} retired",
            self.users.readers,
            self.users.authors,
            self.users.admins,
            self.available_books,
            self.retired_books
        )
        .map_err(|_err| ReceiptError::IO)?;
        writeln!(out, "{totals}").map_err(|_err| ReceiptError::IO)?;
        writeln!(out, "{sellers}").map_err(|_err| ReceiptError::IO)
    }
}

/// Books per category, in category order. Categories with no books are
/// left out.
pub fn category_counts(books: &[Book]) -> Vec<(Category, usize)> {
    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();

    for book in books {
        *counts.entry(book.category).or_default() += 1;
    }

    counts.into_iter().collect()
}

/// Up to `n` books with the most sales; ties go to the lower id.
pub fn top_sellers(books: &[Book], n: usize) -> Vec<&Book> {
    let mut ranked: Vec<&Book> = books.iter().collect();

    ranked.sort_by(|a, b| b.sales.cmp(&a.sales).then(a.id.cmp(&b.id)));
    ranked.truncate(n);

    ranked
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rust_decimal::Decimal;
    use rusty_money::{Money, iso::USD};
    use testresult::TestResult;

    use crate::{
        cart::CartLine,
        fixtures::Fixture,
        ledger::{Rates, apply_record, finalize_order_at},
        receipt::PaymentReference,
        users::{Customer, UserId},
    };

    use super::*;

    fn rates() -> Rates {
        Rates {
            tax: Percentage::from(Decimal::new(8, 2)),
            commission: Percentage::from(Decimal::new(30, 2)),
        }
    }

    fn sell(
        catalog: &mut Vec<Book>,
        buyer: &User,
        lines: &[CartLine],
        second: i64,
    ) -> TestResult<PurchaseRecord> {
        let record = finalize_order_at(
            lines,
            catalog,
            Customer::from(buyer),
            &rates(),
            PaymentReference {
                payment_id: format!("pi_{second}"),
                receipt_url: String::new(),
            },
            PurchaseId::new(),
            Timestamp::from_second(second)?,
        )?;

        *catalog = apply_record(catalog, &record)?;

        Ok(record)
    }

    #[test]
    fn author_dashboard_sees_only_their_share() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let reader = fixture.user(UserId(1))?;
        let ada = fixture.user(UserId(2))?;
        let mut catalog = fixture.books().to_vec();

        // Ada wrote books 1 and 3; Grace wrote book 2.
        let mixed = sell(
            &mut catalog,
            reader,
            &[CartLine::new(BookId(1), 1), CartLine::new(BookId(2), 1)],
            100,
        )?;
        let grace_only = sell(&mut catalog, reader, &[CartLine::new(BookId(2), 1)], 200)?;
        let ada_only = sell(&mut catalog, reader, &[CartLine::new(BookId(3), 2)], 300)?;

        let purchases = [mixed.clone(), grace_only, ada_only.clone()];
        let dashboard = AuthorDashboard::build(ada, &catalog, &purchases, USD)?;

        assert_eq!(dashboard.books.len(), 2);
        assert_eq!(dashboard.total_sales, 3);
        assert_eq!(dashboard.order_count, 2);

        let ids: Vec<PurchaseId> = dashboard.recent_sales.iter().map(|s| s.purchase_id).collect();
        assert_eq!(ids, vec![ada_only.id(), mixed.id()]);

        let mixed_sale = dashboard.recent_sales.get(1).ok_or("missing sale")?;
        let ada_line = mixed
            .lines()
            .iter()
            .find(|line| line.book_id == BookId(1))
            .ok_or("missing line")?;

        assert_eq!(mixed_sale.copies, 1);
        assert_eq!(mixed_sale.earnings, ada_line.author_earnings);

        let expected_total = total_price(
            dashboard.recent_sales.iter().map(|sale| sale.earnings),
            USD,
        )?;

        assert_eq!(dashboard.total_earnings, expected_total);

        Ok(())
    }

    #[test]
    fn author_dashboard_lists_five_most_recent() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let reader = fixture.user(UserId(1))?;
        let ada = fixture.user(UserId(2))?;
        let mut catalog = fixture.books().to_vec();

        let mut purchases = Vec::new();

        for second in 1..=7 {
            purchases.push(sell(&mut catalog, reader, &[CartLine::new(BookId(1), 1)], second)?);
        }

        let dashboard = AuthorDashboard::build(ada, &catalog, &purchases, USD)?;

        assert_eq!(dashboard.order_count, 7);
        assert_eq!(dashboard.recent_sales.len(), RECENT_SALES);
        assert_eq!(
            dashboard.recent_sales.first().map(|sale| sale.created_at),
            Some(Timestamp::from_second(7)?)
        );

        Ok(())
    }

    #[test]
    fn readers_cannot_open_author_dashboard() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let reader = fixture.user(UserId(1))?;

        let result = AuthorDashboard::build(reader, fixture.books(), &[], USD);

        assert!(matches!(result, Err(ReportError::Forbidden(Role::Reader))));

        Ok(())
    }

    #[test]
    fn admin_dashboard_totals_platform() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let reader = fixture.user(UserId(1))?;
        let admin = fixture.user(UserId(4))?;
        let mut catalog = fixture.books().to_vec();

        let a = sell(&mut catalog, reader, &[CartLine::new(BookId(1), 1)], 1)?;
        let b = sell(&mut catalog, reader, &[CartLine::new(BookId(2), 3)], 2)?;

        let dashboard =
            AdminDashboard::build(admin, fixture.users(), &catalog, &[a, b], USD)?;

        assert_eq!(
            dashboard.users,
            RoleCounts {
                readers: 1,
                authors: 2,
                admins: 1
            }
        );
        assert_eq!(dashboard.retired_books, 1);
        assert_eq!(dashboard.available_books, catalog.len() - 1);
        assert_eq!(dashboard.summary.order_count, 2);
        assert_eq!(
            dashboard.summary.total_revenue,
            Money::from_minor(12_99 + 3 * 24_50, USD)
        );
        assert_eq!(
            dashboard.top_sellers.first().map(|book| book.id),
            Some(BookId(2))
        );

        Ok(())
    }

    #[test]
    fn authors_cannot_open_admin_dashboard() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let ada = fixture.user(UserId(2))?;

        let result = AdminDashboard::build(ada, fixture.users(), fixture.books(), &[], USD);

        assert!(matches!(result, Err(ReportError::Forbidden(Role::Author))));

        Ok(())
    }

    #[test]
    fn category_counts_group_unknown_as_uncategorized() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;

        let counts = category_counts(fixture.books());

        assert!(counts.contains(&(Category::Uncategorized, 1)));
        assert!(counts.contains(&(Category::Fiction, 1)));
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), fixture.books().len());

        Ok(())
    }

    #[test]
    fn top_sellers_breaks_ties_by_id() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let mut catalog = fixture.books().to_vec();

        for book in &mut catalog {
            book.sales = if book.id == BookId(4) { 9 } else { 2 };
        }

        let ranked: Vec<BookId> = top_sellers(&catalog, 3).iter().map(|b| b.id).collect();

        assert_eq!(ranked, vec![BookId(4), BookId(1), BookId(2)]);

        Ok(())
    }

    #[test]
    fn dashboards_render() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let reader = fixture.user(UserId(1))?;
        let ada = fixture.user(UserId(2))?;
        let admin = fixture.user(UserId(4))?;
        let mut catalog = fixture.books().to_vec();

        let record = sell(&mut catalog, reader, &[CartLine::new(BookId(1), 1)], 1)?;
        let purchases = [record];

        let mut out = Vec::new();

        AuthorDashboard::build(ada, &catalog, &purchases, USD)?.write_to(&mut out)?;
        AdminDashboard::build(admin, fixture.users(), &catalog, &purchases, USD)?
            .write_to(&mut out)?;

        let text = String::from_utf8(out)?;

        assert!(text.contains("The Quiet Ledger"), "missing title in {text}");
        assert!(text.contains("$9.09"), "missing author earnings in {text}");

        Ok(())
    }
}
