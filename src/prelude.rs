//! Bookledger prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    books::{Book, BookError, BookId, Category, NewBook},
    cart::{Cart, CartError, CartLine, MAX_QUANTITY},
    checkout::{Checkout, CheckoutError},
    config::{ConfigError, LedgerConfig},
    downloads::{DownloadError, Entitlement},
    ledger::{
        LedgerError, LedgerSummary, Rates, Split, aggregate, apply_earnings, apply_record,
        compute_split, filter_by_author, finalize_order, quote, quote_in,
    },
    payments::{
        CardDetails, DeclineCode, PaymentError, PaymentProcessor, PaymentRequest,
        SimulatedProcessor,
    },
    pricing::{Amount, PricingError, Rate},
    receipt::{PaymentReference, PurchaseId, PurchaseRecord, PurchaseTotals, ReceiptError},
    reports::{AdminDashboard, AuthorDashboard, ReportError},
    store::{InMemoryStore, JsonFileStore, Store, StoreError},
    users::{Customer, Role, User, UserId},
};
