//! Listing availability guard.

use common::ListingId;
use ledger::LedgerTx;

use crate::error::{CommerceError, Result};

/// Flips every named listing from available to sold within the caller's
/// transaction.
///
/// The underlying update is conditional on each row still being available,
/// so a short count means a concurrent checkout (or an earlier sale) claimed
/// at least one listing first. The caller must then abort the whole
/// transaction; a partial sale is never acceptable. Nothing outside this
/// guard may treat an `available` status read as authoritative for a sale.
pub async fn reserve<T: LedgerTx>(tx: &mut T, listing_ids: &[ListingId]) -> Result<()> {
    let flipped = tx.reserve_listings(listing_ids).await?;
    if flipped != listing_ids.len() as u64 {
        return Err(CommerceError::ListingUnavailable);
    }
    Ok(())
}
