// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The append-only stock ledger.
//!
//! Every stock movement is one immutable [`StockEntry`]: positive amounts
//! add stock (purchases, completed assemblies, disassembly credits),
//! negative amounts consume it. Entries are never updated or deleted;
//! corrections are made by appending offsetting entries. Current stock is
//! always derived by summation, never stored.

use crate::base::{EntryId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One signed stock movement, immutable once appended.
///
/// `piece_price` is present only on entries that represent a priced lot,
/// typically positive entries from purchases or completed assemblies.
/// Consumption entries carry no price; their cost is accounted for on the
/// entry of whatever they were consumed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: EntryId,
    pub product: ProductId,
    pub amount: i64,
    pub piece_price: Option<Decimal>,
    pub reference: String,
    pub lot: Option<String>,
}

/// A stock movement that has not been appended yet.
///
/// [`StockRepository::append_entry`](crate::store::StockRepository::append_entry)
/// assigns the [`EntryId`] and turns this into a [`StockEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockEntry {
    pub product: ProductId,
    pub amount: i64,
    pub piece_price: Option<Decimal>,
    pub reference: String,
    pub lot: Option<String>,
}

impl NewStockEntry {
    /// An unpriced movement, used for part consumption and corrections.
    pub fn unpriced(product: ProductId, amount: i64, reference: impl Into<String>) -> Self {
        Self {
            product,
            amount,
            piece_price: None,
            reference: reference.into(),
            lot: None,
        }
    }

    /// A priced lot, used for purchases and produced assemblies.
    pub fn priced(
        product: ProductId,
        amount: i64,
        piece_price: Decimal,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            product,
            amount,
            piece_price: Some(piece_price),
            reference: reference.into(),
            lot: None,
        }
    }

    pub fn with_lot(mut self, lot: Option<String>) -> Self {
        self.lot = lot;
        self
    }
}

/// Sums all movements for one product. Exact, O(n) over the entries.
pub fn current_stock(entries: &[StockEntry]) -> i64 {
    entries.iter().map(|entry| entry.amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(id: u64, amount: i64, piece_price: Option<Decimal>) -> StockEntry {
        StockEntry {
            id: EntryId(id),
            product: ProductId(1),
            amount,
            piece_price,
            reference: String::new(),
            lot: None,
        }
    }

    #[test]
    fn current_stock_sums_signed_amounts() {
        let entries = vec![
            entry(1, 10, Some(dec!(1.00))),
            entry(2, -4, None),
            entry(3, 5, Some(dec!(1.50))),
        ];
        assert_eq!(current_stock(&entries), 11);
    }

    #[test]
    fn current_stock_empty_ledger_is_zero() {
        assert_eq!(current_stock(&[]), 0);
    }

    #[test]
    fn current_stock_can_go_negative() {
        // The engine never writes an overdraw, but the surrounding sales
        // flow can. Summation must report it faithfully.
        let entries = vec![entry(1, 3, None), entry(2, -5, None)];
        assert_eq!(current_stock(&entries), -2);
    }

    #[test]
    fn piece_price_serializes_as_exact_string() {
        // Prices must survive serialization without float drift.
        let mut movement = entry(1, 10, Some(dec!(2.50)));
        movement.reference = "Purchase".to_string();
        let json = serde_json::to_string(&movement).unwrap();
        assert!(json.contains("\"piece_price\":\"2.50\""), "{json}");

        let back: StockEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, movement);
    }
}
