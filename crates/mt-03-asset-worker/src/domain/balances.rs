//! # Balance Reports
//!
//! Folds a data-source [`BalanceReport`] into the stored per-asset rows of
//! one derived address.
//!
//! - A native-only report sets the native row and zeroes every other asset.
//! - A per-asset map sets the assets it names and zeroes the stored ones it
//!   omits. Its native entry arrives under the lowercase ticker.

use shared_types::{AssetBalance, BalanceReport, ChainId, DerivedBalance, DerivedId};
use std::collections::BTreeMap;

/// Stored asset name for a report key.
pub fn normalize_asset(chain: ChainId, key: &str) -> String {
    if chain.is_native(Some(key)) {
        chain.native_symbol().to_string()
    } else {
        key.to_string()
    }
}

/// Rows to upsert for `derived_id` after `report`, sorted by asset.
pub fn apply_balance_report(
    chain: ChainId,
    derived_id: DerivedId,
    existing: &[DerivedBalance],
    report: &BalanceReport,
) -> Vec<DerivedBalance> {
    let reported: BTreeMap<String, AssetBalance> = match report {
        BalanceReport::Native(pair) => BTreeMap::from([(chain.native_symbol().to_string(), *pair)]),
        BalanceReport::PerAsset(map) => map
            .iter()
            .map(|(key, pair)| (normalize_asset(chain, key), *pair))
            .collect(),
    };

    let mut rows: BTreeMap<String, AssetBalance> = existing
        .iter()
        .filter(|row| row.derived_id == derived_id)
        .map(|row| (row.asset.clone(), AssetBalance::default()))
        .collect();
    rows.extend(reported);

    rows.into_iter()
        .map(|(asset, pair)| DerivedBalance {
            derived_id,
            asset,
            sats_confirmed: pair.confirmed,
            sats_unconfirmed: pair.unconfirmed,
        })
        .collect()
}

/// Per-asset totals over `rows`.
pub fn sum_balances<'a>(rows: impl IntoIterator<Item = &'a DerivedBalance>) -> BTreeMap<String, AssetBalance> {
    let mut totals: BTreeMap<String, AssetBalance> = BTreeMap::new();
    for row in rows {
        let total = totals.entry(row.asset.clone()).or_default();
        total.confirmed += row.sats_confirmed;
        total.unconfirmed += row.sats_unconfirmed;
    }
    totals
}
