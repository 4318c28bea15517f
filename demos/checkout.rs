//! Checkout Example
//!
//! Loads a fixture set, puts one of its carts in the session and pays for it
//! through the simulated card gateway, then prints the receipt.
//!
//! Use `-f` to load a fixture set by name
//! Use `-c` to pick a cart from the set
//! Use `--card 4000000000000002` to see a declined payment
//! Use `--persist` to keep state as JSON documents in the data directory
//! Use `--dashboards` to print the author and admin dashboards afterwards

use std::io;

use anyhow::Result;
use bookledger::{
    checkout::{Checkout, CheckoutError},
    config::LedgerConfig,
    fixtures::Fixture,
    payments::{CardDetails, SimulatedProcessor},
    reports::{AdminDashboard, AuthorDashboard},
    store::{InMemoryStore, JsonFileStore, Store},
    users::{Customer, Role, UserId},
    utils::{DemoArgs, LogFormat},
};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Registry,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

fn init_logging(args: &DemoArgs) -> Result<()> {
    match args.log_format {
        LogFormat::Compact => init_with_layer(
            args,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(io::stderr),
        ),
        LogFormat::Json => init_with_layer(
            args,
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(io::stderr),
        ),
    }
}

fn init_with_layer<L>(args: &DemoArgs, fmt_layer: L) -> Result<()>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_err| EnvFilter::new(args.log_level.as_str()));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()?;

    Ok(())
}

/// Seed the store from the fixture set, keeping any catalog it already has.
fn seed(store: &mut impl Store, fixture: &Fixture, args: &DemoArgs) -> Result<Customer> {
    if store.get_books()?.is_empty() {
        store.save_books(fixture.books())?;
    }

    if store.get_users()?.is_empty() {
        store.save_users(fixture.users())?;
    }

    let user = fixture.user(UserId(args.user))?;

    store.set_current_user(Some(user))?;
    store.save_cart(&fixture.cart(&args.cart)?)?;

    Ok(Customer::from(user))
}

#[expect(clippy::print_stdout, reason = "Example code")]
async fn run<S: Store>(mut store: S, args: &DemoArgs, config: &LedgerConfig) -> Result<()> {
    let fixture = Fixture::from_set(&args.fixture)?;
    let customer = seed(&mut store, &fixture, args)?;

    let mut checkout = Checkout::with_config(
        store,
        SimulatedProcessor::new(config.payment_latency),
        config,
    );

    let quoted = checkout.quote()?;

    info!(total = %quoted.total, "charging card");

    let card = CardDetails::new(&args.card, &args.expiry, &args.cvc);

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match checkout.place_order(customer, &card).await {
        Ok(record) => record.write_to(&mut handle)?,
        Err(CheckoutError::PaymentDeclined { code, message }) => {
            warn!(%code, "order not placed");
            println!("\nPayment failed: {message}");
        }
        Err(err) => return Err(err.into()),
    }

    if args.dashboards {
        let store = checkout.store();
        let users = store.get_users()?;
        let books = store.get_books()?;
        let purchases = store.get_purchases()?;

        for author in users.iter().filter(|user| user.role == Role::Author) {
            println!("\n{}", author.name);
            AuthorDashboard::build(author, &books, &purchases, config.currency)?
                .write_to(&mut handle)?;
        }

        if let Some(admin) = users.iter().find(|user| user.role == Role::Admin) {
            println!("\nPlatform");
            AdminDashboard::build(admin, &users, &books, &purchases, config.currency)?
                .write_to(&mut handle)?;
        }
    }

    Ok(())
}

/// Checkout Example
#[tokio::main]
pub async fn main() -> Result<()> {
    let args = DemoArgs::parse();

    init_logging(&args)?;

    let config = match &args.config {
        Some(path) => LedgerConfig::from_file(path)?,
        None => LedgerConfig::default(),
    };

    if args.persist {
        run(JsonFileStore::open(config.data_dir.clone())?, &args, &config).await
    } else {
        run(InMemoryStore::new(), &args, &config).await
    }
}
