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

//! Error types for the assembly engine.
//!
//! Feasibility errors ([`EngineError::NotAnAssembly`],
//! [`EngineError::InsufficientParts`], [`EngineError::InsufficientStock`])
//! are expected and recoverable; callers display them and may re-submit.
//! Storage errors are opaque, always abort the surrounding transaction, and
//! are never retried by the engine.

use crate::base::{ProductId, Sku};
use thiserror::Error;

/// Errors from the persistence collaborator.
///
/// The engine does not interpret these beyond rolling back the transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Referenced product ID does not exist (or is retired)
    #[error("unknown product {0}")]
    UnknownProduct(ProductId),

    /// Referenced SKU does not exist (or is retired)
    #[error("no product with SKU {0}")]
    UnknownSku(String),

    /// Attempt to create a product under an existing SKU
    #[error("a product with SKU {0} already exists")]
    DuplicateSku(String),

    /// Anything else the backend reports (connection failure, constraint)
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Assembly engine errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Requested quantity is zero or negative
    #[error("quantity must be positive")]
    InvalidQuantity,

    /// Assemble/disassemble requested on a product without a BOM
    #[error("cannot assemble or disassemble {sku}: not an assembled product")]
    NotAnAssembly { sku: Sku },

    /// Not enough parts on hand; names the scarcest part
    #[error("cannot assemble {sku}: not enough parts, limited by {limited_by}")]
    InsufficientParts { sku: Sku, limited_by: Sku },

    /// Not enough finished stock to disassemble
    #[error("cannot disassemble {sku}: not enough stock available")]
    InsufficientStock { sku: Sku },

    /// BOM edge authored with a non-positive per-assembly amount
    #[error("BOM edge on {sku} must consume a positive amount of its part")]
    InvalidBomAmount { sku: Sku },

    /// BOM edge would make a product its own ancestor
    #[error("BOM edge on {sku} would close a cycle")]
    BomCycle { sku: Sku },

    /// Propagated unchanged from the persistence collaborator
    #[error(transparent)]
    Storage(#[from] StorageError),
}
