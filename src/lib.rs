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

//! # Stock Engine
//!
//! This library provides an inventory assembly engine: products composed of
//! other products (a bill of materials), stock tracked as an append-only
//! ledger, possible-stock calculation bottlenecked by the scarcest part,
//! and first-in-first-out cost allocation over historical stock lots.
//!
//! ## Core Components
//!
//! - [`Engine`]: assembly/disassembly transactions and the read API
//! - [`MemoryStore`]: in-memory [`Store`] used by the CLI and tests
//! - [`PossibleStock`]: how many units are buildable, and what limits them
//! - [`EngineError`]: feasibility and integrity failures
//!
//! ## Example
//!
//! ```
//! use stock_engine_rs::{Engine, MemoryStore, NewStockEntry, Store};
//! use rust_decimal_macros::dec;
//!
//! let store = MemoryStore::new();
//! let bolt = store.add_product("BOLT-M4", "M4 bolt").unwrap();
//! let widget = store.add_product("WIDGET", "Widget").unwrap();
//! store.add_bom_edge(widget.id, bolt.id, 2, dec!(0)).unwrap();
//!
//! let engine = Engine::new(store);
//!
//! // Receive a priced lot of bolts.
//! engine
//!     .store()
//!     .transaction(|repo| {
//!         repo.append_entry(NewStockEntry::priced(bolt.id, 10, dec!(0.10), "Purchase"))?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! // Ten bolts at two per widget: five widgets are buildable.
//! assert_eq!(engine.possible_stock(widget.id).unwrap().available, 5);
//!
//! let produced = engine.assemble(widget.id, 3, None, None).unwrap();
//! assert_eq!(produced.amount, 3);
//! assert_eq!(engine.current_stock(bolt.id).unwrap(), 4);
//! ```
//!
//! ## Concurrency
//!
//! The engine is a synchronous library; every operation runs to completion
//! inside one [`Store::transaction`]. Correctness under concurrent callers
//! is delegated entirely to that boundary: [`MemoryStore`] serializes
//! transactions, a SQL store would use its own transaction isolation.

mod base;
pub mod costing;
mod engine;
pub mod error;
mod ledger;
mod possible;
mod product;
pub mod store;

pub use base::{EntryId, ProductId, Sku};
pub use costing::{CostLayer, FifoCost, allocate_cost, cost_layers, latest_unit_price, round_money};
pub use engine::{
    ASSEMBLED_REFERENCE, DISASSEMBLED_REFERENCE, Engine, assembly_possible, disassembly_possible,
};
pub use error::{EngineError, StorageError};
pub use ledger::{NewStockEntry, StockEntry, current_stock};
pub use possible::{PartCapacity, PossibleStock, possible_stock};
pub use product::{BomEdge, Product};
pub use store::{MemoryStore, StockRepository, Store};
