//! Book Fixtures

use jiff::Timestamp;
use serde::Deserialize;

use crate::{
    books::{Book, BookId, Category, NewBook},
    fixtures::FixtureError,
    pricing::parse_price,
};

/// Wrapper for books in YAML
#[derive(Debug, Deserialize)]
pub struct BooksFixture {
    /// Books in catalog order
    pub books: Vec<BookFixture>,
}

/// Book fixture from YAML
#[derive(Debug, Deserialize)]
pub struct BookFixture {
    /// Book identifier
    pub id: u64,

    /// Title
    pub title: String,

    /// Author display name
    pub author: String,

    /// Author contact email
    #[serde(default)]
    pub author_email: String,

    /// Blurb
    pub description: String,

    /// Category, `uncategorized` if missing
    #[serde(default)]
    pub category: Category,

    /// Price string (e.g., "12.99 USD")
    pub price: String,

    /// Copies already sold
    #[serde(default)]
    pub sales: u64,

    /// Earnings already paid to the author (e.g., "9.09 USD")
    #[serde(default)]
    pub author_earnings: Option<String>,

    /// Publish time, the Unix epoch if missing
    #[serde(default)]
    pub published_at: Option<Timestamp>,

    /// Whether the book has been taken off sale
    #[serde(default)]
    pub retired: bool,
}

impl TryFrom<BookFixture> for Book {
    type Error = FixtureError;

    fn try_from(fixture: BookFixture) -> Result<Self, Self::Error> {
        let id = BookId(fixture.id);

        let new = NewBook {
            title: fixture.title,
            author: fixture.author,
            author_email: fixture.author_email,
            description: fixture.description,
            category: fixture.category,
            price: parse_price(&fixture.price)?,
        };

        let published_at = fixture.published_at.unwrap_or(Timestamp::UNIX_EPOCH);

        let mut book =
            Book::publish(new, id, published_at).map_err(|err| FixtureError::Book(id, err))?;

        book.sales = fixture.sales;
        book.retired = fixture.retired;

        if let Some(earnings) = fixture.author_earnings {
            book.author_earnings = parse_price(&earnings)?;
        }

        Ok(book)
    }
}
