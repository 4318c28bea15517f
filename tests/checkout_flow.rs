//! End-to-end checkout against a JSON document store.
//!
//! The `authors` cart holds books by two authors:
//!
//! | Book | Author | Qty | Line total |
//! |------|--------|-----|------------|
//! | 1    | Ada    | 1   | $12.99     |
//! | 3    | Ada    | 3   | $29.97     |
//! | 4    | Emily  | 1   | $5.00      |
//! | 6    | Emily  | 7   | $23.31     |
//!
//! Subtotal $71.27, tax (8%) $5.70, total $76.97. Commission (30%) is $21.38,
//! leaving $49.89 for authors, split by line total as $9.09, $20.98, $3.50
//! and $16.32.

use jiff::{Timestamp, civil::date};
use rusty_money::{Money, iso::USD};
use tempfile::TempDir;
use testresult::TestResult;

use bookledger::{
    books::BookId,
    checkout::{Checkout, CheckoutError},
    config::LedgerConfig,
    downloads::record_download,
    fixtures::Fixture,
    payments::{CardDetails, DeclineCode, SimulatedProcessor, test_cards},
    pricing::Amount,
    reports::{AdminDashboard, AuthorDashboard},
    store::{JsonFileStore, Store},
    users::{Customer, UserId},
};

fn usd(minor: i64) -> Amount {
    Money::from_minor(minor, USD)
}

fn seeded_store(dir: &TempDir, fixture: &Fixture, cart: &str) -> TestResult<JsonFileStore> {
    let mut store = JsonFileStore::open(dir.path())?;

    store.save_books(fixture.books())?;
    store.save_users(fixture.users())?;
    store.save_cart(&fixture.cart(cart)?)?;

    Ok(store)
}

fn card(number: &str) -> CardDetails {
    CardDetails::new(number, "12/30", "123")
}

#[tokio::test(start_paused = true)]
async fn order_is_persisted_and_reported() -> TestResult {
    let dir = TempDir::new()?;
    let fixture = Fixture::from_set("bookstore")?;
    let store = seeded_store(&dir, &fixture, "authors")?;
    let customer = Customer::from(fixture.user(UserId(1))?);

    let mut checkout = Checkout::with_config(
        store,
        SimulatedProcessor::default(),
        &LedgerConfig::default(),
    );

    let record = checkout
        .place_order_on(customer, &card(test_cards::SUCCESS), date(2026, 1, 15))
        .await?;

    assert_eq!(record.subtotal(), usd(71_27));
    assert_eq!(record.tax(), usd(5_70));
    assert_eq!(record.total(), usd(76_97));
    assert_eq!(record.platform_commission(), usd(21_38));
    assert_eq!(record.author_earnings(), usd(49_89));

    let shares: Vec<Amount> = record.lines().iter().map(|line| line.author_earnings).collect();

    assert_eq!(shares, vec![usd(9_09), usd(20_98), usd(3_50), usd(16_32)]);

    // Everything survives a reopen.
    let mut reopened = JsonFileStore::open(dir.path())?;

    assert_eq!(reopened.get_purchases()?, vec![record.clone()]);
    assert!(reopened.get_cart()?.is_empty());
    assert_eq!(reopened.get_book(BookId(6))?.sales, 7);
    assert_eq!(reopened.get_book(BookId(6))?.author_earnings, usd(16_32));
    assert_eq!(reopened.get_book(BookId(2))?.sales, 0);

    let mut entitlements = reopened.get_entitlements()?;

    assert_eq!(entitlements.len(), 4);
    assert_eq!(
        record_download(&mut entitlements, UserId(1), BookId(3), Timestamp::now())?,
        1
    );

    reopened.save_entitlements(&entitlements)?;

    let books = reopened.get_books()?;
    let users = reopened.get_users()?;
    let purchases = reopened.get_purchases()?;

    let ada = AuthorDashboard::build(fixture.user(UserId(2))?, &books, &purchases, USD)?;

    assert_eq!(ada.total_sales, 4);
    assert_eq!(ada.total_earnings, usd(30_07));
    assert_eq!(
        ada.recent_sales.first().map(|sale| sale.earnings),
        Some(usd(30_07))
    );

    // Grace wrote nothing in this order.
    let grace = AuthorDashboard::build(fixture.user(UserId(3))?, &books, &purchases, USD)?;

    assert_eq!(grace.order_count, 0);
    assert_eq!(grace.total_earnings, usd(0));

    let admin = AdminDashboard::build(fixture.user(UserId(4))?, &users, &books, &purchases, USD)?;

    assert_eq!(admin.summary.order_count, 1);
    assert_eq!(admin.summary.total_collected, usd(76_97));
    assert_eq!(
        admin.top_sellers.first().map(|book| book.id),
        Some(BookId(6))
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn declined_order_leaves_documents_alone() -> TestResult {
    let dir = TempDir::new()?;
    let fixture = Fixture::from_set("bookstore")?;
    let store = seeded_store(&dir, &fixture, "mixed")?;
    let customer = Customer::from(fixture.user(UserId(1))?);

    let mut checkout = Checkout::with_config(
        store,
        SimulatedProcessor::default(),
        &LedgerConfig::default(),
    );

    let result = checkout
        .place_order_on(
            customer,
            &card(test_cards::REQUIRES_AUTHENTICATION),
            date(2026, 1, 15),
        )
        .await;

    assert!(matches!(
        result,
        Err(CheckoutError::PaymentDeclined {
            code: DeclineCode::CardRequiresAuthentication,
            ..
        })
    ));

    let reopened = JsonFileStore::open(dir.path())?;

    assert_eq!(reopened.get_cart()?, fixture.cart("mixed")?);
    assert_eq!(reopened.get_books()?, fixture.books());
    assert!(reopened.get_purchases()?.is_empty());
    assert!(reopened.get_entitlements()?.is_empty());

    Ok(())
}
