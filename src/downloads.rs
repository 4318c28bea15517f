//! Downloads
//!
//! Buying a book entitles the buyer to download it. Entitlements are granted
//! per purchase line and count how often the file was fetched.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    books::{Book, BookId},
    receipt::{PurchaseId, PurchaseRecord},
    users::UserId,
};

/// Download errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DownloadError {
    /// The user has not bought the book.
    #[error("User {user_id} has not purchased book {book_id}")]
    NotEntitled {
        /// Requesting user
        user_id: UserId,
        /// Requested book
        book_id: BookId,
    },
}

/// The right of one user to download one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    /// Buyer
    pub user_id: UserId,

    /// Book bought
    pub book_id: BookId,

    /// Purchase that granted the entitlement
    pub purchase_id: PurchaseId,

    /// When it was granted
    pub granted_at: Timestamp,

    /// Times downloaded
    #[serde(default)]
    pub downloads: u32,

    /// Most recent download
    #[serde(default)]
    pub last_download: Option<Timestamp>,
}

/// One entitlement for each line of a purchase.
pub fn entitlements_for(record: &PurchaseRecord) -> Vec<Entitlement> {
    record
        .lines()
        .iter()
        .map(|line| Entitlement {
            user_id: record.customer().user_id,
            book_id: line.book_id,
            purchase_id: record.id(),
            granted_at: record.created_at(),
            downloads: 0,
            last_download: None,
        })
        .collect()
}

/// Add new entitlements, skipping books the user can already download.
///
/// Returns how many were added.
pub fn merge_entitlements(existing: &mut Vec<Entitlement>, granted: Vec<Entitlement>) -> usize {
    let before = existing.len();

    for entitlement in granted {
        if can_download(existing, entitlement.user_id, entitlement.book_id).is_none() {
            existing.push(entitlement);
        }
    }

    existing.len() - before
}

/// The user's entitlement to a book, if they bought it.
pub fn can_download(
    entitlements: &[Entitlement],
    user_id: UserId,
    book_id: BookId,
) -> Option<&Entitlement> {
    entitlements
        .iter()
        .find(|e| e.user_id == user_id && e.book_id == book_id)
}

/// Count a download and return the new total.
///
/// # Errors
///
/// Returns [`DownloadError::NotEntitled`] if the user has not bought the book.
pub fn record_download(
    entitlements: &mut [Entitlement],
    user_id: UserId,
    book_id: BookId,
    now: Timestamp,
) -> Result<u32, DownloadError> {
    let entitlement = entitlements
        .iter_mut()
        .find(|e| e.user_id == user_id && e.book_id == book_id)
        .ok_or(DownloadError::NotEntitled { user_id, book_id })?;

    entitlement.downloads = entitlement.downloads.saturating_add(1);
    entitlement.last_download = Some(now);

    Ok(entitlement.downloads)
}

/// Title with every non-alphanumeric replaced by `_`.
fn slug(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `the_quiet_ledger_7.txt`
pub fn download_filename(book: &Book) -> String {
    format!("{}_{}.txt", slug(&book.title).to_ascii_lowercase(), book.id)
}

/// `Sample_The_Quiet_Ledger.txt`
pub fn sample_filename(book: &Book) -> String {
    format!("Sample_{}.txt", slug(&book.title))
}

/// Plain-text stand-in for the purchased book file.
pub fn book_file_contents(book: &Book) -> String {
    format!(
        "{title}\nby {author}\n\nCategory: {category}\nPrice: {price}\n\n{description}\n",
        title = book.title,
        author = book.author,
        category = book.category.label(),
        price = book.price,
        description = book.description,
    )
}

/// Plain-text sample chapter offered before purchase.
pub fn sample_contents(book: &Book) -> String {
    let blurb: String = book.description.chars().take(100).collect();

    format!(
        "SAMPLE CHAPTER\n==============\n\n{title}\nby {author}\n\nPrice: {price}\n\
         Category: {category}\n{blurb}...\n\nPurchase the full version to continue reading!\n",
        title = book.title,
        author = book.author,
        price = book.price,
        category = book.category.label(),
    )
}
