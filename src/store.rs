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

//! Persistence contract and the in-memory reference store.
//!
//! The engine never talks to storage directly; it runs inside a
//! [`Store::transaction`] closure and sees one [`StockRepository`]. Commit
//! on `Ok`, roll back on `Err`. The closure owns the whole
//! check-feasibility / allocate-cost / write sequence, so two concurrent
//! operations against the same bottleneck part cannot both pass the check
//! and both write.
//!
//! [`MemoryStore`] backs the CLI and the test suite. Its catalog lives in a
//! [`DashMap`] for concurrent lookup; the ledger sits behind one
//! [`Mutex`], which makes every transaction trivially serializable. A SQL
//! implementation would map the same contract onto database transactions
//! with row-level locking instead.

use crate::base::{EntryId, ProductId, Sku};
use crate::error::{EngineError, StorageError};
use crate::ledger::{NewStockEntry, StockEntry};
use crate::product::{BomEdge, Product};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// What the engine reads and writes within one transaction.
///
/// `stock_entries` returns a product's movements in insertion order; that
/// order is the FIFO ordering key. `append_entry` assigns the next global
/// [`EntryId`] and must only be called inside a managed transaction.
pub trait StockRepository {
    fn product(&self, id: ProductId) -> Result<Product, StorageError>;
    fn product_by_sku(&self, sku: &Sku) -> Result<Product, StorageError>;
    fn bom_edges(&self, product: ProductId) -> Result<Vec<BomEdge>, StorageError>;
    fn stock_entries(&self, product: ProductId) -> Result<Vec<StockEntry>, StorageError>;
    fn append_entry(&mut self, entry: NewStockEntry) -> Result<StockEntry, StorageError>;
}

/// Transaction boundary the persistence collaborator must provide.
pub trait Store {
    /// Runs `f` inside one transaction: all appends become durable on
    /// `Ok`, none of them on `Err`.
    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut dyn StockRepository) -> Result<T, EngineError>,
    ) -> Result<T, EngineError>;
}

#[derive(Debug, Clone)]
struct CatalogRecord {
    product: Product,
    edges: Vec<BomEdge>,
}

#[derive(Debug, Default)]
struct LedgerData {
    next_entry: u64,
    entries: HashMap<ProductId, Vec<StockEntry>>,
}

/// In-memory store: catalog, BOM graph, and stock ledger.
///
/// Catalog authoring (products and BOM edges) lives here rather than in the
/// engine; the cycle check runs at edge-creation time so the read-side
/// recursion can assume an acyclic graph.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: DashMap<ProductId, CatalogRecord>,
    sku_index: DashMap<Sku, ProductId>,
    ledger: Mutex<LedgerData>,
    next_product: AtomicU64,
    /// Serializes catalog writes so the reachability check and the edge
    /// insert happen atomically.
    authoring: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a product under a fresh ID.
    ///
    /// # Errors
    ///
    /// [`StorageError::DuplicateSku`] if the SKU is already taken.
    pub fn add_product(
        &self,
        sku: impl Into<Sku>,
        name: impl Into<String>,
    ) -> Result<Product, StorageError> {
        let _guard = self.authoring.lock();
        let sku = sku.into();
        if self.sku_index.contains_key(&sku) {
            return Err(StorageError::DuplicateSku(sku.0));
        }
        let id = ProductId(self.next_product.fetch_add(1, Ordering::Relaxed) + 1);
        let product = Product {
            id,
            sku: sku.clone(),
            name: name.into(),
            deleted: false,
        };
        self.catalog.insert(
            id,
            CatalogRecord {
                product: product.clone(),
                edges: Vec::new(),
            },
        );
        self.sku_index.insert(sku, id);
        Ok(product)
    }

    /// Soft-retires a product: it disappears from lookups but keeps its
    /// ledger history and its SKU becomes reusable.
    pub fn retire_product(&self, id: ProductId) -> Result<(), StorageError> {
        let _guard = self.authoring.lock();
        let mut record = self
            .catalog
            .get_mut(&id)
            .ok_or(StorageError::UnknownProduct(id))?;
        if record.product.deleted {
            return Err(StorageError::UnknownProduct(id));
        }
        record.product.deleted = true;
        self.sku_index.remove(&record.product.sku);
        Ok(())
    }

    /// Adds a BOM edge: `amount` units of `part` per unit of `product`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidBomAmount`] for `amount <= 0`.
    /// - [`EngineError::BomCycle`] if `product` is reachable from `part`
    ///   (including `product == part`); a product must never be its own
    ///   ancestor.
    pub fn add_bom_edge(
        &self,
        product: ProductId,
        part: ProductId,
        amount: i64,
        assembly_costs: Decimal,
    ) -> Result<BomEdge, EngineError> {
        let _guard = self.authoring.lock();
        let sku = self.live_product(product)?.sku;
        self.live_product(part)?;
        if amount <= 0 {
            return Err(EngineError::InvalidBomAmount { sku });
        }
        if product == part || self.reaches(part, product) {
            return Err(EngineError::BomCycle { sku });
        }
        let edge = BomEdge {
            product,
            part,
            amount,
            assembly_costs,
        };
        self.catalog
            .get_mut(&product)
            .ok_or(StorageError::UnknownProduct(product))?
            .edges
            .push(edge.clone());
        Ok(edge)
    }

    /// All live (non-retired) products, in creation order.
    pub fn products(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .catalog
            .iter()
            .filter(|record| !record.product.deleted)
            .map(|record| record.product.clone())
            .collect();
        products.sort_by_key(|product| product.id);
        products
    }

    /// The whole ledger in insertion order, across all products.
    pub fn all_entries(&self) -> Vec<StockEntry> {
        let ledger = self.ledger.lock();
        let mut entries: Vec<StockEntry> =
            ledger.entries.values().flatten().cloned().collect();
        entries.sort_by_key(|entry| entry.id);
        entries
    }

    fn live_product(&self, id: ProductId) -> Result<Product, StorageError> {
        let record = self
            .catalog
            .get(&id)
            .ok_or(StorageError::UnknownProduct(id))?;
        if record.product.deleted {
            return Err(StorageError::UnknownProduct(id));
        }
        Ok(record.product.clone())
    }

    /// Depth-first reachability over BOM edges.
    fn reaches(&self, from: ProductId, target: ProductId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![from];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if let Some(record) = self.catalog.get(&current) {
                for edge in &record.edges {
                    if !seen.contains(&edge.part) {
                        seen.push(edge.part);
                        stack.push(edge.part);
                    }
                }
            }
        }
        false
    }
}

struct MemoryTx<'a> {
    store: &'a MemoryStore,
    ledger: &'a mut LedgerData,
    /// Products appended to during this transaction, in order, so a
    /// rollback can pop exactly the staged entries off their tails.
    staged: Vec<ProductId>,
}

impl StockRepository for MemoryTx<'_> {
    fn product(&self, id: ProductId) -> Result<Product, StorageError> {
        self.store.live_product(id)
    }

    fn product_by_sku(&self, sku: &Sku) -> Result<Product, StorageError> {
        let id = self
            .store
            .sku_index
            .get(sku)
            .map(|entry| *entry.value())
            .ok_or_else(|| StorageError::UnknownSku(sku.0.clone()))?;
        self.store.live_product(id)
    }

    fn bom_edges(&self, product: ProductId) -> Result<Vec<BomEdge>, StorageError> {
        let record = self
            .store
            .catalog
            .get(&product)
            .ok_or(StorageError::UnknownProduct(product))?;
        Ok(record.edges.clone())
    }

    fn stock_entries(&self, product: ProductId) -> Result<Vec<StockEntry>, StorageError> {
        // Retired products keep readable ledger history.
        if !self.store.catalog.contains_key(&product) {
            return Err(StorageError::UnknownProduct(product));
        }
        Ok(self
            .ledger
            .entries
            .get(&product)
            .cloned()
            .unwrap_or_default())
    }

    fn append_entry(&mut self, entry: NewStockEntry) -> Result<StockEntry, StorageError> {
        if !self.store.catalog.contains_key(&entry.product) {
            return Err(StorageError::UnknownProduct(entry.product));
        }
        self.ledger.next_entry += 1;
        let stored = StockEntry {
            id: EntryId(self.ledger.next_entry),
            product: entry.product,
            amount: entry.amount,
            piece_price: entry.piece_price,
            reference: entry.reference,
            lot: entry.lot,
        };
        self.ledger
            .entries
            .entry(entry.product)
            .or_default()
            .push(stored.clone());
        self.staged.push(entry.product);
        Ok(stored)
    }
}

impl Store for MemoryStore {
    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut dyn StockRepository) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut ledger = self.ledger.lock();
        let checkpoint = ledger.next_entry;
        let mut tx = MemoryTx {
            store: self,
            ledger: &mut ledger,
            staged: Vec::new(),
        };
        match f(&mut tx) {
            Ok(value) => Ok(value),
            Err(error) => {
                for product in tx.staged.into_iter().rev() {
                    if let Some(entries) = tx.ledger.entries.get_mut(&product) {
                        entries.pop();
                    }
                }
                tx.ledger.next_entry = checkpoint;
                Err(error)
            }
        }
    }
}
