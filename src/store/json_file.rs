//! JSON file store
//!
//! One JSON document per storage key in a directory, e.g.
//! `data/bookstore_books.json`. A missing file reads as the empty value.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    books::Book,
    cart::Cart,
    downloads::Entitlement,
    receipt::PurchaseRecord,
    store::{
        Store, StoreError,
        documents::{BookDocument, DocumentError, PurchaseDocument},
        keys,
    },
    users::User,
};

/// Store backed by a directory of JSON documents.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store in `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();

        fs::create_dir_all(&dir).map_err(|source| StoreError::Io { key: "data directory", source })?;

        Ok(Self { dir })
    }

    /// Directory holding the documents
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, StoreError> {
        let contents = match fs::read_to_string(self.path(key)) {
            Ok(contents) => contents,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { key, source }),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Json { key, source })
    }

    fn write<T: Serialize + ?Sized>(&self, key: &'static str, value: &T) -> Result<(), StoreError> {
        let json =
            serde_json::to_string_pretty(value).map_err(|source| StoreError::Json { key, source })?;

        let path = self.path(key);
        let staging = path.with_extension("json.tmp");

        fs::write(&staging, &json).map_err(|source| StoreError::Io { key, source })?;
        fs::rename(&staging, &path).map_err(|source| StoreError::Io { key, source })?;

        debug!(key, bytes = json.len(), "wrote document");

        Ok(())
    }

    fn remove(&self, key: &'static str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { key, source }),
        }
    }

    fn read_purchase_documents(&self) -> Result<Vec<PurchaseDocument>, StoreError> {
        Ok(self.read(keys::PURCHASES)?.unwrap_or_default())
    }
}

fn invalid(key: &'static str) -> impl Fn(DocumentError) -> StoreError {
    move |source| StoreError::Document { key, source }
}

impl Store for JsonFileStore {
    fn get_books(&self) -> Result<Vec<Book>, StoreError> {
        let documents: Vec<BookDocument> = self.read(keys::BOOKS)?.unwrap_or_default();

        documents
            .into_iter()
            .map(|doc| Book::try_from(doc).map_err(invalid(keys::BOOKS)))
            .collect()
    }

    fn save_books(&mut self, books: &[Book]) -> Result<(), StoreError> {
        let documents: Vec<BookDocument> = books.iter().map(BookDocument::from).collect();

        self.write(keys::BOOKS, &documents)
    }

    fn get_current_user(&self) -> Result<Option<User>, StoreError> {
        self.read(keys::CURRENT_USER)
    }

    fn set_current_user(&mut self, user: Option<&User>) -> Result<(), StoreError> {
        match user {
            Some(user) => self.write(keys::CURRENT_USER, user),
            None => self.remove(keys::CURRENT_USER),
        }
    }

    fn get_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read(keys::USERS)?.unwrap_or_default())
    }

    fn save_users(&mut self, users: &[User]) -> Result<(), StoreError> {
        self.write(keys::USERS, users)
    }

    fn get_cart(&self) -> Result<Cart, StoreError> {
        Ok(self.read(keys::CART)?.unwrap_or_default())
    }

    fn save_cart(&mut self, cart: &Cart) -> Result<(), StoreError> {
        if cart.is_empty() {
            return self.remove(keys::CART);
        }

        self.write(keys::CART, cart)
    }

    fn get_purchases(&self) -> Result<Vec<PurchaseRecord>, StoreError> {
        self.read_purchase_documents()?
            .into_iter()
            .map(|doc| PurchaseRecord::try_from(doc).map_err(invalid(keys::PURCHASES)))
            .collect()
    }

    fn save_purchase(&mut self, record: &PurchaseRecord) -> Result<(), StoreError> {
        let mut documents = self.read_purchase_documents()?;

        documents.push(PurchaseDocument::from(record));

        self.write(keys::PURCHASES, &documents)
    }

    fn get_entitlements(&self) -> Result<Vec<Entitlement>, StoreError> {
        Ok(self.read(keys::USER_PURCHASES)?.unwrap_or_default())
    }

    fn save_entitlements(&mut self, entitlements: &[Entitlement]) -> Result<(), StoreError> {
        self.write(keys::USER_PURCHASES, entitlements)
    }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use jiff::Timestamp;
    use rust_decimal::Decimal;
    use tempfile::TempDir;
    use testresult::TestResult;

    use crate::{
        books::BookId,
        cart::CartLine,
        fixtures::Fixture,
        ledger::{Rates, finalize_order},
        receipt::PaymentReference,
        users::{Customer, Role, UserId},
    };

    use super::*;

    fn rates() -> Rates {
        Rates {
            tax: Percentage::from(Decimal::new(8, 2)),
            commission: Percentage::from(Decimal::new(30, 2)),
        }
    }

    fn payment() -> PaymentReference {
        PaymentReference {
            payment_id: "pi_test".to_string(),
            receipt_url: "https://example.com/receipt".to_string(),
        }
    }

    #[test]
    fn missing_documents_read_as_empty() -> TestResult {
        let dir = TempDir::new()?;
        let store = JsonFileStore::open(dir.path())?;

        assert!(store.get_books()?.is_empty());
        assert!(store.get_purchases()?.is_empty());
        assert!(store.get_cart()?.is_empty());
        assert_eq!(store.get_current_user()?, None);

        Ok(())
    }

    #[test]
    fn books_round_trip_through_disk() -> TestResult {
        let dir = TempDir::new()?;
        let fixture = Fixture::from_set("bookstore")?;
        let mut store = JsonFileStore::open(dir.path())?;

        store.save_books(fixture.books())?;

        assert_eq!(store.get_books()?, fixture.books());
        assert!(dir.path().join("bookstore_books.json").exists());

        Ok(())
    }

    #[test]
    fn purchases_are_appended_and_restored() -> TestResult {
        let dir = TempDir::new()?;
        let fixture = Fixture::from_set("bookstore")?;
        let mut store = JsonFileStore::open(dir.path())?;

        let customer = Customer {
            user_id: UserId(1),
            name: "Jo Reader".to_string(),
            email: "jo@example.com".to_string(),
        };

        let first = finalize_order(
            &[CartLine::new(BookId(1), 1)],
            fixture.books(),
            customer.clone(),
            &rates(),
            payment(),
        )?;

        let second = finalize_order(
            &[CartLine::new(BookId(1), 2), CartLine::new(BookId(2), 1)],
            fixture.books(),
            customer,
            &rates(),
            payment(),
        )?;

        store.save_purchase(&first)?;
        store.save_purchase(&second)?;

        // Reopen to make sure nothing is cached.
        let reopened = JsonFileStore::open(dir.path())?;

        assert_eq!(reopened.get_purchases()?, vec![first, second]);

        Ok(())
    }

    #[test]
    fn amounts_are_stored_as_minor_units() -> TestResult {
        let dir = TempDir::new()?;
        let fixture = Fixture::from_set("bookstore")?;
        let mut store = JsonFileStore::open(dir.path())?;

        store.save_books(fixture.books())?;

        let raw = fs::read_to_string(dir.path().join("bookstore_books.json"))?;

        assert!(raw.contains("\"minor\": 1299"), "unexpected layout: {raw}");
        assert!(raw.contains("\"currency\": \"USD\""), "unexpected layout: {raw}");

        Ok(())
    }

    #[test]
    fn tampered_purchase_is_rejected() -> TestResult {
        let dir = TempDir::new()?;
        let fixture = Fixture::from_set("bookstore")?;
        let mut store = JsonFileStore::open(dir.path())?;

        let record = finalize_order(
            &[CartLine::new(BookId(1), 1)],
            fixture.books(),
            Customer {
                user_id: UserId(1),
                name: "Jo Reader".to_string(),
                email: "jo@example.com".to_string(),
            },
            &rates(),
            payment(),
        )?;

        store.save_purchase(&record)?;

        let mut documents = store.read_purchase_documents()?;

        if let Some(doc) = documents.first_mut() {
            doc.total.minor += 1;
        }

        store.write(keys::PURCHASES, &documents)?;

        assert!(matches!(
            store.get_purchases(),
            Err(StoreError::Document {
                key: keys::PURCHASES,
                ..
            })
        ));

        Ok(())
    }

    #[test]
    fn malformed_json_reports_key() -> TestResult {
        let dir = TempDir::new()?;
        let store = JsonFileStore::open(dir.path())?;

        fs::write(dir.path().join("bookstore_cart.json"), "{not json")?;

        assert!(matches!(
            store.get_cart(),
            Err(StoreError::Json {
                key: keys::CART,
                ..
            })
        ));

        Ok(())
    }

    #[test]
    fn signing_out_removes_current_user() -> TestResult {
        let dir = TempDir::new()?;
        let mut store = JsonFileStore::open(dir.path())?;
        let user = User::new(UserId(3), "Ada Byron", "ada@example.com", Role::Author);

        store.set_current_user(Some(&user))?;
        assert_eq!(store.get_current_user()?.map(|u| u.id), Some(UserId(3)));

        store.set_current_user(None)?;
        assert_eq!(store.get_current_user()?, None);

        Ok(())
    }

    #[test]
    fn entitlements_round_trip() -> TestResult {
        let dir = TempDir::new()?;
        let mut store = JsonFileStore::open(dir.path())?;

        let entitlement = Entitlement {
            user_id: UserId(1),
            book_id: BookId(2),
            purchase_id: crate::receipt::PurchaseId::new(),
            granted_at: Timestamp::UNIX_EPOCH,
            downloads: 3,
            last_download: None,
        };

        store.save_entitlements(std::slice::from_ref(&entitlement))?;

        assert_eq!(store.get_entitlements()?, vec![entitlement]);

        Ok(())
    }
}
