//! Transaction history paging.

use super::amounts::format_coins;
use shared_types::{HistoryEntry, HistoryPage, TransactionMetadata, TransactionRecord};
use std::cmp::Ordering;
use std::collections::HashSet;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Which transactions a history query covers.
#[derive(Debug, Clone, Default)]
pub struct HistoryScope {
    /// Empty means every indexed address.
    pub addresses: HashSet<String>,
    pub symbol: Option<String>,
}

impl HistoryScope {
    fn covers(&self, row: &TransactionMetadata) -> bool {
        (self.addresses.is_empty() || self.addresses.contains(&row.address))
            && self.symbol.as_ref().map_or(true, |symbol| &row.asset == symbol)
    }
}

/// Newest first; unconfirmed transactions (no block time) lead.
fn newest_first(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    match (a.block_time, b.block_time) {
        (None, None) => a.tx_hash.cmp(&b.tx_hash),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.tx_hash.cmp(&b.tx_hash)),
    }
}

/// Page `transactions` (each with its metadata rows) for `scope`.
///
/// A transaction is listed when at least one metadata row falls in scope;
/// `received`/`sent` sum the in-scope rows only.
pub fn build_history_page(
    transactions: Vec<(TransactionRecord, Vec<TransactionMetadata>)>,
    scope: &HistoryScope,
    limit: usize,
    offset: usize,
) -> HistoryPage {
    let mut matching: Vec<(TransactionRecord, u64, u64)> = transactions
        .into_iter()
        .filter_map(|(record, metadata)| {
            let rows: Vec<&TransactionMetadata> = metadata.iter().filter(|row| scope.covers(row)).collect();
            if rows.is_empty() {
                return None;
            }
            let received = rows.iter().map(|row| row.received).sum();
            let sent = rows.iter().map(|row| row.sent).sum();
            Some((record, received, sent))
        })
        .collect();
    matching.sort_by(|a, b| newest_first(&a.0, &b.0));

    let total = matching.len();
    let data = matching
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(transaction, received, sent)| HistoryEntry {
            transaction,
            received: format_coins(received),
            sent: format_coins(sent),
        })
        .collect();

    HistoryPage { total, data }
}
