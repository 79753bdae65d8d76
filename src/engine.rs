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

//! Assembly and disassembly transactions.
//!
//! The [`Engine`] is the only writer of the stock ledger. Each operation
//! (feasibility check, cost allocation, ledger appends) runs inside a
//! single [`Store`] transaction, so a failure at any point leaves no
//! partial entries and concurrent operations against a shared bottleneck
//! part cannot both succeed when only one could.
//!
//! # Costing
//!
//! - **Assembly** prices the produced entry by FIFO-consuming each part's
//!   historical cost layers, plus the per-unit `assembly_costs` surcharge
//!   of every edge.
//! - **Disassembly** credits parts at the finished product's latest lot
//!   price (see [`latest_unit_price`]), intentionally simpler than the
//!   assembly side.

use crate::base::ProductId;
use crate::costing::{allocate_cost, cost_layers, latest_unit_price, round_money};
use crate::error::EngineError;
use crate::ledger::{NewStockEntry, StockEntry, current_stock};
use crate::possible::{PossibleStock, possible_stock};
use crate::product::BomEdge;
use crate::store::{StockRepository, Store};
use rust_decimal::Decimal;

/// Reference recorded on an assembly's produced entry when the caller
/// supplies none.
pub const ASSEMBLED_REFERENCE: &str = "Assembled from parts";

/// Reference recorded on a disassembly's consumed entry when the caller
/// supplies none.
pub const DISASSEMBLED_REFERENCE: &str = "Disassembled for parts";

/// The inventory assembly engine.
///
/// Generic over the persistence collaborator; reads and writes happen
/// through [`Store::transaction`] only. The engine holds no locks and no
/// caches of its own.
pub struct Engine<S> {
    store: S,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S) -> Self {
        Engine { store }
    }

    /// The underlying store, e.g. for catalog authoring.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Current stock of a product: the exact sum of its ledger.
    pub fn current_stock(&self, product: ProductId) -> Result<i64, EngineError> {
        self.store
            .transaction(|repo| Ok(current_stock(&repo.stock_entries(product)?)))
    }

    /// How many additional units could be assembled right now, and which
    /// part limits that.
    pub fn possible_stock(&self, product: ProductId) -> Result<PossibleStock, EngineError> {
        self.store.transaction(|repo| possible_stock(repo, product))
    }

    /// Current sale cost of one unit: the latest lot price, zero if the
    /// product has no priced stock.
    pub fn product_cost(&self, product: ProductId) -> Result<Decimal, EngineError> {
        self.store
            .transaction(|repo| Ok(latest_unit_price(&repo.stock_entries(product)?)))
    }

    /// Checks whether `qty` units could be assembled, without writing.
    ///
    /// Returns the BOM edges that an assembly would consume.
    pub fn assembly_possible(
        &self,
        product: ProductId,
        qty: i64,
    ) -> Result<Vec<BomEdge>, EngineError> {
        self.store
            .transaction(|repo| assembly_possible(repo, product, qty))
    }

    /// Checks whether `qty` units could be disassembled, without writing.
    pub fn disassembly_possible(
        &self,
        product: ProductId,
        qty: i64,
    ) -> Result<Vec<BomEdge>, EngineError> {
        self.store
            .transaction(|repo| disassembly_possible(repo, product, qty))
    }

    /// Assembles `qty` units, consuming parts and producing priced stock.
    ///
    /// Appends one negative unpriced entry per part and one positive entry
    /// for the product carrying the FIFO-derived piece price. Returns the
    /// produced entry.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidQuantity`] for `qty <= 0`.
    /// - [`EngineError::NotAnAssembly`] if the product has no BOM.
    /// - [`EngineError::InsufficientParts`] naming the limiting part.
    /// - [`EngineError::Storage`] on persistence failure; in every error
    ///   case the ledger is left untouched.
    pub fn assemble(
        &self,
        product: ProductId,
        qty: i64,
        reference: Option<&str>,
        lot: Option<&str>,
    ) -> Result<StockEntry, EngineError> {
        self.store.transaction(|repo| {
            run_assemble(
                repo,
                product,
                qty,
                reference.unwrap_or(ASSEMBLED_REFERENCE),
                lot,
            )
        })
    }

    /// Disassembles `qty` units back into their parts.
    ///
    /// Appends one positive entry per part priced at the product's latest
    /// lot price, and one negative unpriced entry for the product itself.
    /// Returns the product's consumption entry.
    pub fn disassemble(
        &self,
        product: ProductId,
        qty: i64,
        reference: Option<&str>,
        lot: Option<&str>,
    ) -> Result<StockEntry, EngineError> {
        self.store.transaction(|repo| {
            run_disassemble(
                repo,
                product,
                qty,
                reference.unwrap_or(DISASSEMBLED_REFERENCE),
                lot,
            )
        })
    }
}

/// Feasibility for assembly; returns the edges to consume.
pub fn assembly_possible(
    repo: &dyn StockRepository,
    product: ProductId,
    qty: i64,
) -> Result<Vec<BomEdge>, EngineError> {
    if qty <= 0 {
        return Err(EngineError::InvalidQuantity);
    }
    let record = repo.product(product)?;
    let possible = possible_stock(repo, product)?;
    let Some(limited_by) = possible.limited_by else {
        return Err(EngineError::NotAnAssembly { sku: record.sku });
    };
    if possible.available < qty {
        let part = repo.product(limited_by.part)?;
        return Err(EngineError::InsufficientParts {
            sku: record.sku,
            limited_by: part.sku,
        });
    }
    Ok(possible.parts.into_iter().map(|part| part.edge).collect())
}

/// Feasibility for disassembly; returns the edges to credit.
pub fn disassembly_possible(
    repo: &dyn StockRepository,
    product: ProductId,
    qty: i64,
) -> Result<Vec<BomEdge>, EngineError> {
    if qty <= 0 {
        return Err(EngineError::InvalidQuantity);
    }
    let record = repo.product(product)?;
    if current_stock(&repo.stock_entries(product)?) < qty {
        return Err(EngineError::InsufficientStock { sku: record.sku });
    }
    let edges = repo.bom_edges(product)?;
    if edges.is_empty() {
        return Err(EngineError::NotAnAssembly { sku: record.sku });
    }
    Ok(edges)
}

fn run_assemble(
    repo: &mut dyn StockRepository,
    product: ProductId,
    qty: i64,
    reference: &str,
    lot: Option<&str>,
) -> Result<StockEntry, EngineError> {
    let record = repo.product(product)?;
    let edges = assembly_possible(&*repo, product, qty)?;

    let mut total = Decimal::ZERO;
    for edge in &edges {
        let pieces = edge.amount * qty;
        let entries = repo.stock_entries(edge.part)?;
        let mut layers = cost_layers(&entries);
        let cost = allocate_cost(&mut layers, pieces);
        total += cost.total + edge.assembly_costs * Decimal::from(qty);

        repo.append_entry(NewStockEntry::unpriced(
            edge.part,
            -pieces,
            format!("Assembly: {}, amount: {}", record.name, qty),
        ))?;
    }

    let piece_price = round_money(total / Decimal::from(qty));
    let entry = repo.append_entry(
        NewStockEntry::priced(product, qty, piece_price, reference)
            .with_lot(lot.map(str::to_string)),
    )?;
    Ok(entry)
}

fn run_disassemble(
    repo: &mut dyn StockRepository,
    product: ProductId,
    qty: i64,
    reference: &str,
    lot: Option<&str>,
) -> Result<StockEntry, EngineError> {
    let record = repo.product(product)?;
    let edges = disassembly_possible(&*repo, product, qty)?;

    // The finished product's cost flows down to its parts unchanged.
    let unit_price = latest_unit_price(&repo.stock_entries(product)?);
    for edge in &edges {
        repo.append_entry(NewStockEntry::priced(
            edge.part,
            edge.amount * qty,
            unit_price,
            format!("Disassembly: {}, amount: {}", record.name, qty),
        ))?;
    }

    let entry = repo.append_entry(
        NewStockEntry::unpriced(product, -qty, reference).with_lot(lot.map(str::to_string)),
    )?;
    Ok(entry)
}
