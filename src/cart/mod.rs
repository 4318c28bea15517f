//! Cart

use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    books::{Book, BookId},
    ledger::{LedgerError, price_lines},
    pricing::Amount,
};

/// Most copies of a single book one order may contain.
pub const MAX_QUANTITY: u32 = 10;

/// Errors related to cart mutation.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// Adding more copies would exceed [`MAX_QUANTITY`].
    #[error("Book {0} is limited to {MAX_QUANTITY} copies per order")]
    QuantityLimit(BookId),

    /// The book is not in the cart.
    #[error("Book {0} not found in cart")]
    LineNotFound(BookId),
}

/// One book in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// The book being bought
    pub book_id: BookId,

    /// Copies, `1..=MAX_QUANTITY`
    pub quantity: u32,
}

impl CartLine {
    /// Creates a new line.
    pub fn new(book_id: BookId, quantity: u32) -> Self {
        Self { book_id, quantity }
    }
}

/// Cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create a new, empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cart from previously stored lines.
    ///
    /// Lines are taken as-is; quantities are checked again when the order is
    /// finalized.
    pub fn with_lines(lines: impl Into<Vec<CartLine>>) -> Self {
        Self {
            lines: lines.into(),
        }
    }

    /// Add one copy of a book.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityLimit`] if the book is already at [`MAX_QUANTITY`].
    pub fn add(&mut self, book_id: BookId) -> Result<u32, CartError> {
        if let Some(line) = self.line_mut(book_id) {
            if line.quantity >= MAX_QUANTITY {
                return Err(CartError::QuantityLimit(book_id));
            }

            line.quantity += 1;

            return Ok(line.quantity);
        }

        self.lines.push(CartLine::new(book_id, 1));

        Ok(1)
    }

    /// Set the number of copies of a book already in the cart. Zero removes it.
    ///
    /// # Errors
    ///
    /// - [`CartError::QuantityLimit`]: `quantity` is above [`MAX_QUANTITY`].
    /// - [`CartError::LineNotFound`]: the book is not in the cart.
    pub fn set_quantity(&mut self, book_id: BookId, quantity: u32) -> Result<(), CartError> {
        if quantity > MAX_QUANTITY {
            return Err(CartError::QuantityLimit(book_id));
        }

        if quantity == 0 {
            return self.remove(book_id);
        }

        let line = self
            .line_mut(book_id)
            .ok_or(CartError::LineNotFound(book_id))?;

        line.quantity = quantity;

        Ok(())
    }

    /// Remove a book from the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the book is not in the cart.
    pub fn remove(&mut self, book_id: BookId) -> Result<(), CartError> {
        let before = self.lines.len();

        self.lines.retain(|line| line.book_id != book_id);

        if self.lines.len() == before {
            return Err(CartError::LineNotFound(book_id));
        }

        Ok(())
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in the order they were added.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Get the number of distinct books in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total copies across all lines.
    pub fn total_copies(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Subtotal priced against the current catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] for unknown books, out-of-range quantities or
    /// money arithmetic failures.
    pub fn subtotal(
        &self,
        catalog: &[Book],
        currency: &'static Currency,
    ) -> Result<Amount, LedgerError> {
        if self.is_empty() {
            return Ok(crate::pricing::zero(currency));
        }

        Ok(price_lines(&self.lines, catalog, currency)?.subtotal)
    }

    fn line_mut(&mut self, book_id: BookId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.book_id == book_id)
    }
}
