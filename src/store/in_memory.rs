//! In-memory store

use crate::{
    books::Book,
    cart::Cart,
    downloads::Entitlement,
    receipt::PurchaseRecord,
    store::{Store, StoreError},
    users::User,
};

/// Keeps typed values in memory. Used by tests and the demo.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    books: Vec<Book>,
    users: Vec<User>,
    current_user: Option<User>,
    cart: Cart,
    purchases: Vec<PurchaseRecord>,
    entitlements: Vec<Entitlement>,
}

impl InMemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with a catalog.
    pub fn with_books(books: impl Into<Vec<Book>>) -> Self {
        Self {
            books: books.into(),
            ..Self::default()
        }
    }
}

impl Store for InMemoryStore {
    fn get_books(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.books.clone())
    }

    fn save_books(&mut self, books: &[Book]) -> Result<(), StoreError> {
        self.books = books.to_vec();

        Ok(())
    }

    fn get_current_user(&self) -> Result<Option<User>, StoreError> {
        Ok(self.current_user.clone())
    }

    fn set_current_user(&mut self, user: Option<&User>) -> Result<(), StoreError> {
        self.current_user = user.cloned();

        Ok(())
    }

    fn get_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.clone())
    }

    fn save_users(&mut self, users: &[User]) -> Result<(), StoreError> {
        self.users = users.to_vec();

        Ok(())
    }

    fn get_cart(&self) -> Result<Cart, StoreError> {
        Ok(self.cart.clone())
    }

    fn save_cart(&mut self, cart: &Cart) -> Result<(), StoreError> {
        self.cart = cart.clone();

        Ok(())
    }

    fn get_purchases(&self) -> Result<Vec<PurchaseRecord>, StoreError> {
        Ok(self.purchases.clone())
    }

    fn save_purchase(&mut self, record: &PurchaseRecord) -> Result<(), StoreError> {
        self.purchases.push(record.clone());

        Ok(())
    }

    fn get_entitlements(&self) -> Result<Vec<Entitlement>, StoreError> {
        Ok(self.entitlements.clone())
    }

    fn save_entitlements(&mut self, entitlements: &[Entitlement]) -> Result<(), StoreError> {
        self.entitlements = entitlements.to_vec();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        books::BookId,
        fixtures::Fixture,
        users::{Role, UserId},
    };

    use super::*;

    #[test]
    fn get_book_finds_by_id() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let store = InMemoryStore::with_books(fixture.books().to_vec());

        assert_eq!(store.get_book(BookId(2))?.id, BookId(2));
        assert!(matches!(
            store.get_book(BookId(404)),
            Err(StoreError::NotFound(BookId(404)))
        ));

        Ok(())
    }

    #[test]
    fn current_user_can_sign_in_and_out() -> TestResult {
        let mut store = InMemoryStore::new();
        let user = User::new(UserId(1), "Jo Reader", "jo@example.com", Role::Reader);

        store.set_current_user(Some(&user))?;
        assert_eq!(store.get_current_user()?, Some(user));

        store.set_current_user(None)?;
        assert_eq!(store.get_current_user()?, None);

        Ok(())
    }

    #[test]
    fn cart_starts_empty() -> TestResult {
        assert!(InMemoryStore::new().get_cart()?.is_empty());

        Ok(())
    }
}
