//! Books

use std::fmt;

use jiff::Timestamp;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{pricing::Amount, users::User};

/// Cheapest price a book may be published at, in minor units.
pub const MIN_PRICE_MINOR: i64 = 99;

/// Most expensive price a book may be published at, in minor units.
pub const MAX_PRICE_MINOR: i64 = 99_99;

/// Errors raised when publishing a book.
#[derive(Debug, Error, PartialEq)]
pub enum BookError {
    /// A required text field was blank.
    #[error("{0} must not be empty")]
    MissingField(&'static str),

    /// The price is outside the publishable range.
    #[error("price {0} must be between {1} and {2}")]
    PriceOutOfRange(String, String, String),
}

/// Book identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub u64);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog category
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Fiction
    Fiction,
    /// Non-fiction
    NonFiction,
    /// Science
    Science,
    /// Technology
    Technology,
    /// Business
    Business,
    /// Self-help
    SelfHelp,
    /// Children's books
    Children,
    /// Poetry
    Poetry,
    /// Anything without a recognised category.
    #[default]
    #[serde(other)]
    Uncategorized,
}

impl Category {
    /// Display label, e.g. "non fiction".
    pub fn label(self) -> &'static str {
        match self {
            Category::Fiction => "fiction",
            Category::NonFiction => "non fiction",
            Category::Science => "science",
            Category::Technology => "technology",
            Category::Business => "business",
            Category::SelfHelp => "self help",
            Category::Children => "children",
            Category::Poetry => "poetry",
            Category::Uncategorized => "uncategorized",
        }
    }
}

/// Details an author submits when publishing.
#[derive(Debug, Clone)]
pub struct NewBook {
    /// Title
    pub title: String,

    /// Author display name
    pub author: String,

    /// Author contact email
    pub author_email: String,

    /// Blurb
    pub description: String,

    /// Category
    pub category: Category,

    /// Unit price
    pub price: Amount,
}

/// A book in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    /// Book identifier
    pub id: BookId,

    /// Title
    pub title: String,

    /// Author display name
    pub author: String,

    /// Author contact email
    pub author_email: String,

    /// Blurb
    pub description: String,

    /// Category
    pub category: Category,

    /// Current unit price
    pub price: Amount,

    /// Copies sold over the book's lifetime
    pub sales: u64,

    /// Author earnings over the book's lifetime
    pub author_earnings: Amount,

    /// When the book was published
    pub published_at: Timestamp,

    /// Soft-deleted books stay in the catalog for history but cannot be sold.
    pub retired: bool,
}

impl Book {
    /// Publish a new book with zeroed sales counters.
    ///
    /// # Errors
    ///
    /// - [`BookError::MissingField`]: title, author or description is blank.
    /// - [`BookError::PriceOutOfRange`]: price outside `0.99..=99.99`.
    pub fn publish(new: NewBook, id: BookId, now: Timestamp) -> Result<Self, BookError> {
        for (field, value) in [
            ("title", &new.title),
            ("author", &new.author),
            ("description", &new.description),
        ] {
            if value.trim().is_empty() {
                return Err(BookError::MissingField(field));
            }
        }

        let currency = new.price.currency();
        let minor = new.price.to_minor_units();

        if !(MIN_PRICE_MINOR..=MAX_PRICE_MINOR).contains(&minor) {
            return Err(BookError::PriceOutOfRange(
                new.price.to_string(),
                Money::from_minor(MIN_PRICE_MINOR, currency).to_string(),
                Money::from_minor(MAX_PRICE_MINOR, currency).to_string(),
            ));
        }

        Ok(Book {
            id,
            title: new.title.trim().to_string(),
            author: new.author.trim().to_string(),
            author_email: new.author_email.trim().to_string(),
            description: new.description.trim().to_string(),
            category: new.category,
            price: new.price,
            sales: 0,
            author_earnings: Money::from_minor(0, currency),
            published_at: now,
            retired: false,
        })
    }

    /// Take the book off sale without deleting it.
    pub fn retire(&mut self) {
        self.retired = true;
    }

    /// Whether the book can currently be bought.
    pub fn is_available(&self) -> bool {
        !self.retired
    }

    /// Currency the book is priced in.
    pub fn currency(&self) -> &'static Currency {
        self.price.currency()
    }

    /// Whether the user wrote this book, matched by name or email.
    pub fn is_authored_by(&self, user: &User) -> bool {
        self.author == user.name || self.author_email.eq_ignore_ascii_case(&user.email)
    }

    /// `needle` must already be lowercase.
    fn mentions(&self, needle: &str) -> bool {
        [
            self.title.as_str(),
            self.author.as_str(),
            self.description.as_str(),
            self.category.label(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Find a book by id in a catalog snapshot.
pub fn find_book(books: &[Book], id: BookId) -> Option<&Book> {
    books.iter().find(|book| book.id == id)
}

/// Books on sale matching a query, optionally within one category.
///
/// The query is trimmed and matched case-insensitively against the title,
/// author, description and category label. A blank query matches every book
/// and `None` matches every category. Retired books never match. Results keep
/// catalog order.
pub fn search<'a>(books: &'a [Book], query: &str, category: Option<Category>) -> Vec<&'a Book> {
    let needle = query.trim().to_lowercase();

    books
        .iter()
        .filter(|book| book.is_available())
        .filter(|book| category.is_none_or(|category| book.category == category))
        .filter(|book| needle.is_empty() || book.mentions(&needle))
        .collect()
}

/// Next free id for a catalog snapshot.
pub fn next_book_id(books: &[Book]) -> BookId {
    BookId(books.iter().map(|book| book.id.0).max().map_or(1, |max| max + 1))
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::{
        fixtures::Fixture,
        users::{Role, UserId},
    };

    use super::*;

    fn new_book(price_minor: i64) -> NewBook {
        NewBook {
            title: "  The Quiet Ledger ".to_string(),
            author: "Ada Byron".to_string(),
            author_email: "ada@example.com".to_string(),
            description: "Numbers, mostly.".to_string(),
            category: Category::NonFiction,
            price: Money::from_minor(price_minor, USD),
        }
    }

    #[test]
    fn publish_starts_with_zero_counters() -> TestResult {
        let book = Book::publish(new_book(12_99), BookId(7), Timestamp::UNIX_EPOCH)?;

        assert_eq!(book.title, "The Quiet Ledger");
        assert_eq!(book.sales, 0);
        assert_eq!(book.author_earnings, Money::from_minor(0, USD));
        assert!(book.is_available());

        Ok(())
    }

    #[test]
    fn publish_rejects_prices_outside_range() {
        let cheap = Book::publish(new_book(98), BookId(1), Timestamp::UNIX_EPOCH);
        let dear = Book::publish(new_book(100_00), BookId(1), Timestamp::UNIX_EPOCH);

        assert!(matches!(cheap, Err(BookError::PriceOutOfRange(..))));
        assert!(matches!(dear, Err(BookError::PriceOutOfRange(..))));
    }

    #[test]
    fn publish_accepts_range_bounds() {
        assert!(Book::publish(new_book(99), BookId(1), Timestamp::UNIX_EPOCH).is_ok());
        assert!(Book::publish(new_book(99_99), BookId(1), Timestamp::UNIX_EPOCH).is_ok());
    }

    #[test]
    fn publish_rejects_blank_title() {
        let mut new = new_book(5_00);
        new.title = "   ".to_string();

        assert_eq!(
            Book::publish(new, BookId(1), Timestamp::UNIX_EPOCH),
            Err(BookError::MissingField("title"))
        );
    }

    #[test]
    fn retire_marks_book_unavailable() -> TestResult {
        let mut book = Book::publish(new_book(5_00), BookId(1), Timestamp::UNIX_EPOCH)?;

        book.retire();

        assert!(!book.is_available());

        Ok(())
    }

    #[test]
    fn authorship_matches_name_or_email() -> TestResult {
        let book = Book::publish(new_book(5_00), BookId(1), Timestamp::UNIX_EPOCH)?;

        let by_name = User::new(UserId(1), "Ada Byron", "other@example.com", Role::Author);
        let by_email = User::new(UserId(2), "A. Byron", "ADA@example.com", Role::Author);
        let stranger = User::new(UserId(3), "Someone", "someone@example.com", Role::Author);

        assert!(book.is_authored_by(&by_name));
        assert!(book.is_authored_by(&by_email));
        assert!(!book.is_authored_by(&stranger));

        Ok(())
    }

    #[test]
    fn unknown_category_deserializes_as_uncategorized() -> TestResult {
        let category: Category = serde_json::from_str("\"cookery\"")?;
        let known: Category = serde_json::from_str("\"non-fiction\"")?;

        assert_eq!(category, Category::Uncategorized);
        assert_eq!(known, Category::NonFiction);

        Ok(())
    }

    #[test]
    fn next_book_id_follows_the_highest() -> TestResult {
        let a = Book::publish(new_book(5_00), BookId(3), Timestamp::UNIX_EPOCH)?;
        let b = Book::publish(new_book(5_00), BookId(9), Timestamp::UNIX_EPOCH)?;

        assert_eq!(next_book_id(&[a, b]), BookId(10));
        assert_eq!(next_book_id(&[]), BookId(1));

        Ok(())
    }

    fn ids(books: &[&Book]) -> Vec<u64> {
        books.iter().map(|book| book.id.0).collect()
    }

    #[test]
    fn blank_search_lists_every_book_on_sale() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;

        assert_eq!(ids(&search(fixture.books(), "", None)), vec![1, 2, 3, 4, 6]);
        assert_eq!(ids(&search(fixture.books(), "   ", None)), vec![1, 2, 3, 4, 6]);

        Ok(())
    }

    #[test]
    fn search_matches_each_field_ignoring_case() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let books = fixture.books();

        // title, author, description, category
        assert_eq!(ids(&search(books, "QUIET", None)), vec![1]);
        assert_eq!(ids(&search(books, " emily ", None)), vec![4, 6]);
        assert_eq!(ids(&search(books, "teacup", None)), vec![6]);
        assert_eq!(ids(&search(books, "Poetry", None)), vec![4]);
        assert!(search(books, "nothing like this", None).is_empty());

        Ok(())
    }

    #[test]
    fn search_filters_by_category() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let books = fixture.books();

        assert_eq!(ids(&search(books, "", Some(Category::Science))), vec![3]);
        assert_eq!(ids(&search(books, "ada", None)), vec![1, 3]);
        assert_eq!(ids(&search(books, "ada", Some(Category::Fiction))), vec![1]);
        assert!(search(books, "", Some(Category::Business)).is_empty());

        Ok(())
    }

    #[test]
    fn search_skips_retired_books() -> TestResult {
        let fixture = Fixture::from_set("bookstore")?;
        let books = fixture.books();

        assert!(search(books, "cookbook", None).is_empty());
        assert!(search(books, "", Some(Category::Uncategorized)).is_empty());
        assert_eq!(ids(&search(books, "grace", None)), vec![2]);

        Ok(())
    }
}
