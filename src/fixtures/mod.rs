//! Fixtures
//!
//! YAML fixture sets for tests and the demo. A set named `bookstore` is made
//! of `books/bookstore.yml`, `carts/bookstore.yml` and `users/bookstore.yml`
//! under the fixtures directory.

use std::{fs, path::PathBuf};

use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    books::{Book, BookError, BookId},
    cart::Cart,
    fixtures::{books::BooksFixture, carts::CartsFixture, users::UsersFixture},
    pricing::PricingError,
    users::{User, UserId},
};

pub mod books;
pub mod carts;
pub mod users;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price, percentage or currency
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Book failed publish validation
    #[error("Invalid book {0}: {1}")]
    Book(BookId, BookError),

    /// Two books share an id
    #[error("Duplicate book id: {0}")]
    DuplicateBook(BookId),

    /// Currency mismatch between books
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// No books loaded yet
    #[error("No books loaded yet; currency unknown")]
    NoCurrency,

    /// Cart not found
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(UserId),
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Catalog in file order
    books: Vec<Book>,

    /// Named carts
    carts: FxHashMap<String, Cart>,

    /// Registered users
    users: Vec<User>,

    /// Currency for the fixture set
    currency: Option<&'static Currency>,
}

impl Fixture {
    /// Create a new empty fixture with the crate's `fixtures/` directory as base path
    pub fn new() -> Self {
        Self::with_base_path(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            books: Vec::new(),
            carts: FxHashMap::default(),
            users: Vec::new(),
            currency: None,
        }
    }

    fn read(&self, category: &str, name: &str) -> Result<String, FixtureError> {
        let file_path = self.base_path.join(category).join(format!("{name}.yml"));

        Ok(fs::read_to_string(&file_path)?)
    }

    /// Load books from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if a book fails
    /// validation, or if books are priced in different currencies.
    pub fn load_books(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: BooksFixture = serde_norway::from_str(&self.read("books", name)?)?;

        for book_fixture in fixture.books {
            let book = Book::try_from(book_fixture)?;

            if let Some(existing_currency) = self.currency {
                if existing_currency != book.currency() {
                    return Err(FixtureError::CurrencyMismatch(
                        existing_currency.iso_alpha_code.to_string(),
                        book.currency().iso_alpha_code.to_string(),
                    ));
                }
            } else {
                self.currency = Some(book.currency());
            }

            if self.books.iter().any(|existing| existing.id == book.id) {
                return Err(FixtureError::DuplicateBook(book.id));
            }

            self.books.push(book);
        }

        Ok(self)
    }

    /// Load named carts from a YAML fixture file
    ///
    /// Quantities are not checked, so fixtures can hold carts that checkout
    /// must reject.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_carts(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: CartsFixture = serde_norway::from_str(&self.read("carts", name)?)?;

        for (key, lines) in fixture.carts {
            self.carts.insert(key, carts::into_cart(lines));
        }

        Ok(self)
    }

    /// Load users from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_users(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: UsersFixture = serde_norway::from_str(&self.read("users", name)?)?;

        self.users.extend(fixture.users.into_iter().map(User::from));

        Ok(self)
    }

    /// Load a complete fixture set (books, carts and users with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture
            .load_books(name)?
            .load_carts(name)?
            .load_users(name)?;

        Ok(fixture)
    }

    /// Get all books
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Get a named cart
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is not found.
    pub fn cart(&self, key: &str) -> Result<Cart, FixtureError> {
        self.carts
            .get(key)
            .cloned()
            .ok_or_else(|| FixtureError::CartNotFound(key.to_string()))
    }

    /// Get all users
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Get a user by id
    ///
    /// # Errors
    ///
    /// Returns an error if the user is not found.
    pub fn user(&self, id: UserId) -> Result<&User, FixtureError> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .ok_or(FixtureError::UserNotFound(id))
    }

    /// Get the currency
    ///
    /// # Errors
    ///
    /// Returns an error if no books have been loaded yet.
    pub fn currency(&self) -> Result<&'static Currency, FixtureError> {
        self.currency.ok_or(FixtureError::NoCurrency)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
