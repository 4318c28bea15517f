//! Store
//!
//! The catalog, users, cart, purchases and download entitlements live behind
//! the [`Store`] trait. The ledger never touches it; checkout and reporting
//! read from it and write back explicitly.

use thiserror::Error;

use crate::{
    books::{Book, BookId},
    cart::Cart,
    downloads::Entitlement,
    receipt::PurchaseRecord,
    users::User,
};

pub mod documents;
pub mod in_memory;
pub mod json_file;

pub use documents::DocumentError;
pub use in_memory::InMemoryStore;
pub use json_file::JsonFileStore;

/// Storage keys, one document per key.
pub mod keys {
    /// Catalog
    pub const BOOKS: &str = "bookstore_books";

    /// Registered users
    pub const USERS: &str = "bookstore_users";

    /// Signed-in user
    pub const CURRENT_USER: &str = "bookstore_current_user";

    /// Session cart
    pub const CART: &str = "bookstore_cart";

    /// Append-only purchase records
    pub const PURCHASES: &str = "bookstore_purchases";

    /// Download entitlements
    pub const USER_PURCHASES: &str = "bookstore_user_purchases";
}

/// Errors returned by stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Book missing from the catalog
    #[error("Book {0} not found")]
    NotFound(BookId),

    /// Reading or writing a document failed
    #[error("Failed to access {key}: {source}")]
    Io {
        /// Storage key
        key: &'static str,
        /// Underlying error
        source: std::io::Error,
    },

    /// A document is not valid JSON for its key
    #[error("Failed to parse {key}: {source}")]
    Json {
        /// Storage key
        key: &'static str,
        /// Underlying error
        source: serde_json::Error,
    },

    /// A document parsed but holds an invalid value
    #[error("Invalid document in {key}: {source}")]
    Document {
        /// Storage key
        key: &'static str,
        /// Underlying error
        source: DocumentError,
    },
}

/// Key/value document store for bookstore state.
pub trait Store {
    /// The whole catalog, retired books included.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the catalog cannot be read.
    fn get_books(&self) -> Result<Vec<Book>, StoreError>;

    /// One book by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no book has the id.
    fn get_book(&self, id: BookId) -> Result<Book, StoreError> {
        self.get_books()?
            .into_iter()
            .find(|book| book.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    /// Replace the catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the catalog cannot be written.
    fn save_books(&mut self, books: &[Book]) -> Result<(), StoreError>;

    /// The signed-in user, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the session cannot be read.
    fn get_current_user(&self) -> Result<Option<User>, StoreError>;

    /// Sign a user in, or out with `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the session cannot be written.
    fn set_current_user(&mut self, user: Option<&User>) -> Result<(), StoreError>;

    /// Registered users
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if users cannot be read.
    fn get_users(&self) -> Result<Vec<User>, StoreError>;

    /// Replace registered users.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if users cannot be written.
    fn save_users(&mut self, users: &[User]) -> Result<(), StoreError>;

    /// The session cart; empty if none was saved.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the cart cannot be read.
    fn get_cart(&self) -> Result<Cart, StoreError>;

    /// Replace the session cart.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the cart cannot be written.
    fn save_cart(&mut self, cart: &Cart) -> Result<(), StoreError>;

    /// Every purchase record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if purchases cannot be read.
    fn get_purchases(&self) -> Result<Vec<PurchaseRecord>, StoreError>;

    /// Append a purchase record.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the record cannot be written.
    fn save_purchase(&mut self, record: &PurchaseRecord) -> Result<(), StoreError>;

    /// Download entitlements for all users.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if entitlements cannot be read.
    fn get_entitlements(&self) -> Result<Vec<Entitlement>, StoreError>;

    /// Replace download entitlements.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if entitlements cannot be written.
    fn save_entitlements(&mut self, entitlements: &[Entitlement]) -> Result<(), StoreError>;
}
