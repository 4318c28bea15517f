//! Cart Fixtures

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{
    books::BookId,
    cart::{Cart, CartLine},
};

/// Wrapper for carts in YAML
#[derive(Debug, Deserialize)]
pub struct CartsFixture {
    /// Map of cart key -> lines
    pub carts: FxHashMap<String, Vec<CartLineFixture>>,
}

/// Cart line fixture from YAML
#[derive(Debug, Deserialize)]
pub struct CartLineFixture {
    /// Book id
    pub book: u64,

    /// Copies, 1 if missing
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

pub(super) fn into_cart(lines: Vec<CartLineFixture>) -> Cart {
    Cart::with_lines(
        lines
            .into_iter()
            .map(|line| CartLine::new(BookId(line.book), line.quantity))
            .collect::<Vec<_>>(),
    )
}
