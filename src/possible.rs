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

//! Possible-stock calculation: how many additional units of an assembly
//! could be built right now.
//!
//! For every BOM edge, the part contributes its on-hand stock plus whatever
//! the part itself could still be assembled into existence (sub-assemblies
//! recurse). Each edge caps the buildable quantity at
//! `(stock + buildable) / amount`; the assembly is bottlenecked by the
//! scarcest part.
//!
//! The computation is pure and read-only. Memoization lives in a map scoped
//! to one call, never on shared state, so the answer always reflects the
//! ledger as seen by the current transaction.

use crate::base::ProductId;
use crate::error::EngineError;
use crate::ledger::current_stock;
use crate::product::BomEdge;
use crate::store::StockRepository;
use std::collections::HashMap;

/// Per-part breakdown of one possible-stock computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartCapacity {
    pub edge: BomEdge,
    /// On-hand stock of the part.
    pub stock: i64,
    /// Additional units of the part buildable from its own BOM.
    pub buildable: i64,
    /// Assemblies this edge alone would allow.
    pub capacity: i64,
}

/// Result of a possible-stock computation.
///
/// `available` is the possible *addition* to the stock, not the total:
/// on-hand assemblies are not counted again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PossibleStock {
    pub available: i64,
    /// The edge whose part constrains `available`; `None` exactly when the
    /// product has no BOM edges. First edge wins ties.
    pub limited_by: Option<BomEdge>,
    pub parts: Vec<PartCapacity>,
}

impl PossibleStock {
    fn raw() -> Self {
        PossibleStock {
            available: 0,
            limited_by: None,
            parts: Vec::new(),
        }
    }
}

/// Computes the possible stock for `product`.
///
/// Recursion terminates because BOM authoring keeps the graph acyclic; a
/// malformed graph surfaces as [`EngineError::BomCycle`] instead of
/// recursing forever.
pub fn possible_stock(
    repo: &dyn StockRepository,
    product: ProductId,
) -> Result<PossibleStock, EngineError> {
    let mut memo = HashMap::new();
    let mut visiting = Vec::new();
    compute(repo, product, &mut memo, &mut visiting)
}

fn compute(
    repo: &dyn StockRepository,
    product: ProductId,
    memo: &mut HashMap<ProductId, i64>,
    visiting: &mut Vec<ProductId>,
) -> Result<PossibleStock, EngineError> {
    if visiting.contains(&product) {
        let sku = repo.product(product)?.sku;
        return Err(EngineError::BomCycle { sku });
    }
    let edges = repo.bom_edges(product)?;
    if edges.is_empty() {
        return Ok(PossibleStock::raw());
    }

    visiting.push(product);
    let mut limited_by = edges[0].clone();
    let mut available = i64::MAX;
    let mut parts = Vec::with_capacity(edges.len());
    for edge in edges {
        let stock = current_stock(&repo.stock_entries(edge.part)?);
        let buildable = buildable(repo, edge.part, memo, visiting)?;
        // Truncating division; a part ledger driven negative by the
        // surrounding sales flow clamps at the end, not per edge. Authoring
        // rejects non-positive amounts, but never divide by zero.
        let capacity = if edge.amount > 0 {
            (stock + buildable) / edge.amount
        } else {
            0
        };
        if capacity < available {
            limited_by = edge.clone();
            available = capacity;
        }
        parts.push(PartCapacity {
            edge,
            stock,
            buildable,
            capacity,
        });
    }
    visiting.pop();

    Ok(PossibleStock {
        available: available.max(0),
        limited_by: Some(limited_by),
        parts,
    })
}

/// Memoized `available` for a part, shared across one top-level call.
fn buildable(
    repo: &dyn StockRepository,
    product: ProductId,
    memo: &mut HashMap<ProductId, i64>,
    visiting: &mut Vec<ProductId>,
) -> Result<i64, EngineError> {
    if let Some(&available) = memo.get(&product) {
        return Ok(available);
    }
    let result = compute(repo, product, memo, visiting)?;
    memo.insert(product, result.available);
    Ok(result.available)
}
