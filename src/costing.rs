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

//! First-in-first-out cost allocation over historical stock lots.
//!
//! Priced ledger entries form cost layers. Later consumption (negative and
//! unpriced movements) eats the oldest layer first, so the layers carry a
//! *remaining* quantity that can differ from the entry's original amount.
//! Allocation walks the open layers oldest-first, consuming partial lots as
//! needed, and prices the consumed pieces at each layer's purchase price.
//!
//! Layer mutations are bookkeeping for a single computation. They are never
//! written back; the ledger stays append-only and the only durable effect
//! is the new entry the transaction writes.

use crate::base::EntryId;
use crate::ledger::StockEntry;
use rust_decimal::{Decimal, RoundingStrategy};

/// A priced ledger entry and how much of it is still unconsumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostLayer {
    /// The ledger entry this layer came from.
    pub entry: EntryId,
    /// Unit price the lot was acquired at.
    pub piece_price: Decimal,
    /// Pieces of this lot not yet consumed by later movements.
    pub remaining: i64,
}

/// The outcome of one FIFO allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoCost {
    /// Total cost of all consumed pieces.
    pub total: Decimal,
    /// `total / pieces`, exact decimal division. Rounding happens only at
    /// the monetary boundary, when a piece price is persisted.
    pub unit: Decimal,
}

/// Derives the open cost layers from a product's ledger, oldest first.
///
/// For each priced entry, the leftover is the running sum of priced amounts
/// up to and including it, plus the total of all unpriced movements. Entries
/// whose leftover has dropped below one piece are fully consumed and drop
/// out; an entry's remaining quantity is its leftover minus the previous
/// open layer's leftover.
///
/// `entries` must be in insertion order, as returned by the repository.
pub fn cost_layers(entries: &[StockEntry]) -> Vec<CostLayer> {
    let unpriced: i64 = entries
        .iter()
        .filter(|entry| entry.piece_price.is_none())
        .map(|entry| entry.amount)
        .sum();

    let mut layers = Vec::new();
    let mut running = 0i64;
    let mut previous = 0i64;
    for entry in entries {
        let Some(piece_price) = entry.piece_price else {
            continue;
        };
        running += entry.amount;
        let leftover = running + unpriced;
        if leftover < 1 {
            continue;
        }
        layers.push(CostLayer {
            entry: entry.id,
            piece_price,
            remaining: leftover - previous,
        });
        previous = leftover;
    }
    layers
}

/// Consumes `pieces` from the open layers, oldest first.
///
/// A layer smaller than the outstanding need is consumed fully and zeroed;
/// the last layer touched is consumed partially. Pieces beyond the total
/// priced coverage cost nothing: legacy stock predating price tracking is
/// allocated at zero rather than failing the operation.
pub fn allocate_cost(layers: &mut [CostLayer], pieces: i64) -> FifoCost {
    let mut total = Decimal::ZERO;
    let mut used = 0i64;
    for layer in layers.iter_mut() {
        if used >= pieces {
            break;
        }
        if used + layer.remaining <= pieces {
            used += layer.remaining;
            total += layer.piece_price * Decimal::from(layer.remaining);
            layer.remaining = 0;
        } else {
            let need = pieces - used;
            total += layer.piece_price * Decimal::from(need);
            layer.remaining -= need;
            used = pieces;
        }
    }
    let unit = if pieces > 0 {
        total / Decimal::from(pieces)
    } else {
        Decimal::ZERO
    };
    FifoCost { total, unit }
}

/// Unit price of the most recent priced entry, or zero if none exists.
///
/// This is the whole disassembly pricing policy: the finished product's
/// latest lot price, not a FIFO weighting over its layers. Swapping the
/// policy means swapping this function, nothing in the transaction path.
pub fn latest_unit_price(entries: &[StockEntry]) -> Decimal {
    entries
        .iter()
        .rev()
        .find_map(|entry| entry.piece_price)
        .unwrap_or(Decimal::ZERO)
}

/// Rounds to the smallest currency unit, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
