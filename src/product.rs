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

//! Catalog value types: products and the bill-of-materials relation.
//!
//! A product with no [`BomEdge`]s is a raw (purchased) product; a product
//! with edges is an assembly built from other products. The BOM graph must
//! stay acyclic; edge authoring enforces this so the recursive calculators
//! never have to.

use crate::base::{ProductId, Sku};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog product.
///
/// Products are never hard-deleted; `deleted` marks a soft-retired product
/// which is excluded from catalog lookups but keeps its ledger history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub deleted: bool,
}

/// One directed edge in the bill-of-materials graph.
///
/// `amount` units of `part` are consumed per unit of `product` assembled.
/// `assembly_costs` is a fixed surcharge per assembled unit, independent of
/// what the parts themselves cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomEdge {
    pub product: ProductId,
    pub part: ProductId,
    pub amount: i64,
    pub assembly_costs: Decimal,
}
