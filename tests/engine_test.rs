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

//! Engine public API integration tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stock_engine_rs::{
    Engine, EngineError, MemoryStore, NewStockEntry, Product, ProductId, Sku, Store,
};

// === Helper Functions ===

fn engine() -> Engine<MemoryStore> {
    Engine::new(MemoryStore::new())
}

fn add_product(engine: &Engine<MemoryStore>, sku: &str) -> Product {
    engine.store().add_product(sku, sku).unwrap()
}

fn add_edge(engine: &Engine<MemoryStore>, product: ProductId, part: ProductId, amount: i64) {
    engine
        .store()
        .add_bom_edge(product, part, amount, Decimal::ZERO)
        .unwrap();
}

fn receive(engine: &Engine<MemoryStore>, product: ProductId, amount: i64, price: Decimal) {
    engine
        .store()
        .transaction(|repo| {
            repo.append_entry(NewStockEntry::priced(product, amount, price, "Purchase"))?;
            Ok(())
        })
        .unwrap();
}

/// Widget built from two bolts each, ten priced bolts on hand.
fn widget_and_bolt(engine: &Engine<MemoryStore>) -> (Product, Product) {
    let widget = add_product(engine, "WIDGET");
    let bolt = add_product(engine, "BOLT-M4");
    add_edge(engine, widget.id, bolt.id, 2);
    receive(engine, bolt.id, 10, dec!(1.00));
    (widget, bolt)
}

// === Possible Stock ===

#[test]
fn possible_stock_of_raw_product_is_zero() {
    let engine = engine();
    let bolt = add_product(&engine, "BOLT-M4");
    receive(&engine, bolt.id, 10, dec!(1.00));

    let possible = engine.possible_stock(bolt.id).unwrap();
    assert_eq!(possible.available, 0);
    assert!(possible.limited_by.is_none());
    assert!(possible.parts.is_empty());
}

#[test]
fn possible_stock_floors_by_edge_amount() {
    let engine = engine();
    let (widget, bolt) = widget_and_bolt(&engine);

    let possible = engine.possible_stock(widget.id).unwrap();
    assert_eq!(possible.available, 5);
    assert_eq!(possible.limited_by.unwrap().part, bolt.id);
}

#[test]
fn possible_stock_picks_the_scarcest_part() {
    let engine = engine();
    let widget = add_product(&engine, "WIDGET");
    let bolt = add_product(&engine, "BOLT-M4");
    let nut = add_product(&engine, "NUT-M4");
    add_edge(&engine, widget.id, bolt.id, 2);
    add_edge(&engine, widget.id, nut.id, 1);
    receive(&engine, bolt.id, 10, dec!(1.00));
    receive(&engine, nut.id, 3, dec!(0.10));

    let possible = engine.possible_stock(widget.id).unwrap();
    assert_eq!(possible.available, 3);
    assert_eq!(possible.limited_by.unwrap().part, nut.id);

    // Per-part capacities are reported alongside the bottleneck.
    let capacities: Vec<i64> = possible.parts.iter().map(|part| part.capacity).collect();
    assert_eq!(capacities, vec![5, 3]);
}

#[test]
fn possible_stock_ties_go_to_the_first_edge() {
    let engine = engine();
    let widget = add_product(&engine, "WIDGET");
    let bolt = add_product(&engine, "BOLT-M4");
    let nut = add_product(&engine, "NUT-M4");
    add_edge(&engine, widget.id, bolt.id, 1);
    add_edge(&engine, widget.id, nut.id, 1);
    receive(&engine, bolt.id, 4, dec!(1.00));
    receive(&engine, nut.id, 4, dec!(0.10));

    let possible = engine.possible_stock(widget.id).unwrap();
    assert_eq!(possible.available, 4);
    assert_eq!(possible.limited_by.unwrap().part, bolt.id);
}

#[test]
fn possible_stock_counts_buildable_sub_assemblies() {
    let engine = engine();
    let gadget = add_product(&engine, "GADGET");
    let widget = add_product(&engine, "WIDGET");
    let bolt = add_product(&engine, "BOLT-M4");
    add_edge(&engine, gadget.id, widget.id, 1);
    add_edge(&engine, widget.id, bolt.id, 2);
    receive(&engine, bolt.id, 10, dec!(1.00));

    // No widgets on hand, but five could be built from bolts.
    assert_eq!(engine.possible_stock(gadget.id).unwrap().available, 5);

    // An assembled widget shifts capacity without creating any.
    engine.assemble(widget.id, 2, None, None).unwrap();
    assert_eq!(engine.possible_stock(gadget.id).unwrap().available, 5);
}

#[test]
fn possible_stock_clamps_negative_part_stock() {
    let engine = engine();
    let (widget, bolt) = widget_and_bolt(&engine);

    // The surrounding sales flow can overdraw a part.
    engine
        .store()
        .transaction(|repo| {
            repo.append_entry(NewStockEntry::unpriced(bolt.id, -14, "Oversold"))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(engine.possible_stock(widget.id).unwrap().available, 0);
}

#[test]
fn possible_stock_is_idempotent() {
    let engine = engine();
    let (widget, _) = widget_and_bolt(&engine);

    let first = engine.possible_stock(widget.id).unwrap();
    let second = engine.possible_stock(widget.id).unwrap();
    assert_eq!(first, second);
}

// === Assembly ===

#[test]
fn assemble_widget_from_bolts() {
    let engine = engine();
    let (widget, bolt) = widget_and_bolt(&engine);

    let produced = engine.assemble(widget.id, 3, None, None).unwrap();
    assert_eq!(produced.product, widget.id);
    assert_eq!(produced.amount, 3);
    assert_eq!(produced.reference, "Assembled from parts");

    assert_eq!(engine.current_stock(widget.id).unwrap(), 3);
    assert_eq!(engine.current_stock(bolt.id).unwrap(), 4);
}

#[test]
fn assemble_conserves_stock_across_parts() {
    let engine = engine();
    let widget = add_product(&engine, "WIDGET");
    let bolt = add_product(&engine, "BOLT-M4");
    let nut = add_product(&engine, "NUT-M4");
    add_edge(&engine, widget.id, bolt.id, 2);
    add_edge(&engine, widget.id, nut.id, 3);
    receive(&engine, bolt.id, 20, dec!(1.00));
    receive(&engine, nut.id, 30, dec!(0.10));

    engine.assemble(widget.id, 4, None, None).unwrap();

    assert_eq!(engine.current_stock(widget.id).unwrap(), 4);
    assert_eq!(engine.current_stock(bolt.id).unwrap(), 12);
    assert_eq!(engine.current_stock(nut.id).unwrap(), 18);
}

#[test]
fn assemble_prices_by_fifo_lots() {
    let engine = engine();
    let (widget, bolt) = widget_and_bolt(&engine);
    // Second, dearer lot on top of the ten at 1.00.
    receive(&engine, bolt.id, 5, dec!(1.50));

    // Six widgets need twelve bolts: ten at 1.00, two at 1.50.
    let produced = engine.assemble(widget.id, 6, None, None).unwrap();
    let expected = (dec!(10.00) + dec!(3.00)) / dec!(6);
    assert_eq!(produced.piece_price, Some(expected.round_dp(2)));
    assert_eq!(produced.piece_price, Some(dec!(2.17)));
}

#[test]
fn assemble_adds_the_per_unit_surcharge() {
    let engine = engine();
    let widget = add_product(&engine, "WIDGET");
    let bolt = add_product(&engine, "BOLT-M4");
    engine
        .store()
        .add_bom_edge(widget.id, bolt.id, 1, dec!(0.50))
        .unwrap();
    receive(&engine, bolt.id, 10, dec!(1.00));

    let produced = engine.assemble(widget.id, 2, None, None).unwrap();
    // Two bolts at 1.00 plus 0.50 surcharge per unit.
    assert_eq!(produced.piece_price, Some(dec!(1.50)));
}

#[test]
fn assemble_consumption_entries_are_unpriced() {
    let engine = engine();
    let (widget, bolt) = widget_and_bolt(&engine);

    engine.assemble(widget.id, 2, None, None).unwrap();

    let entries = engine.store().all_entries();
    let consumption = entries
        .iter()
        .find(|entry| entry.product == bolt.id && entry.amount < 0)
        .unwrap();
    assert_eq!(consumption.amount, -4);
    assert_eq!(consumption.piece_price, None);
    assert_eq!(consumption.reference, "Assembly: WIDGET, amount: 2");
    assert_eq!(entries.last().unwrap().product, widget.id);
}

#[test]
fn assemble_records_reference_and_lot() {
    let engine = engine();
    let (widget, _) = widget_and_bolt(&engine);

    let produced = engine
        .assemble(widget.id, 1, Some("Work order 42"), Some("LOT-9"))
        .unwrap();
    assert_eq!(produced.reference, "Work order 42");
    assert_eq!(produced.lot.as_deref(), Some("LOT-9"));
}

#[test]
fn assemble_beyond_possible_is_rejected_before_any_write() {
    let engine = engine();
    let (widget, bolt) = widget_and_bolt(&engine);
    receive(&engine, bolt.id, 5, dec!(1.50));
    let before = engine.store().all_entries().len();

    // Twelve widgets need twenty-four bolts; fifteen exist.
    let result = engine.assemble(widget.id, 12, None, None);
    assert_eq!(
        result,
        Err(EngineError::InsufficientParts {
            sku: Sku::from("WIDGET"),
            limited_by: Sku::from("BOLT-M4"),
        })
    );
    assert_eq!(engine.store().all_entries().len(), before);
    assert_eq!(engine.current_stock(bolt.id).unwrap(), 15);
}

#[test]
fn assemble_raw_product_is_rejected() {
    let engine = engine();
    let bolt = add_product(&engine, "BOLT-M4");
    receive(&engine, bolt.id, 10, dec!(1.00));

    let result = engine.assemble(bolt.id, 1, None, None);
    assert_eq!(
        result,
        Err(EngineError::NotAnAssembly { sku: Sku::from("BOLT-M4") })
    );
}

#[test]
fn assemble_rejects_non_positive_quantities() {
    let engine = engine();
    let (widget, _) = widget_and_bolt(&engine);

    assert_eq!(
        engine.assemble(widget.id, 0, None, None),
        Err(EngineError::InvalidQuantity)
    );
    assert_eq!(
        engine.assemble(widget.id, -3, None, None),
        Err(EngineError::InvalidQuantity)
    );
}

#[test]
fn assemble_uncovered_stock_costs_nothing() {
    let engine = engine();
    let widget = add_product(&engine, "WIDGET");
    let bolt = add_product(&engine, "BOLT-M4");
    add_edge(&engine, widget.id, bolt.id, 1);
    receive(&engine, bolt.id, 2, dec!(3.00));
    // Legacy stock without price tracking.
    engine
        .store()
        .transaction(|repo| {
            repo.append_entry(NewStockEntry::unpriced(bolt.id, 4, "Initial count"))?;
            Ok(())
        })
        .unwrap();

    let produced = engine.assemble(widget.id, 6, None, None).unwrap();
    // Only two of six pieces carry cost: 6.00 / 6.
    assert_eq!(produced.piece_price, Some(dec!(1.00)));
}

// === Disassembly ===

#[test]
fn disassemble_restores_part_stock() {
    let engine = engine();
    let (widget, bolt) = widget_and_bolt(&engine);

    engine.assemble(widget.id, 3, None, None).unwrap();
    let consumed = engine.disassemble(widget.id, 3, None, None).unwrap();

    assert_eq!(consumed.product, widget.id);
    assert_eq!(consumed.amount, -3);
    assert_eq!(consumed.reference, "Disassembled for parts");
    assert_eq!(engine.current_stock(widget.id).unwrap(), 0);
    assert_eq!(engine.current_stock(bolt.id).unwrap(), 10);
}

#[test]
fn disassemble_credits_parts_at_latest_lot_price() {
    let engine = engine();
    let (widget, bolt) = widget_and_bolt(&engine);

    // Two finished lots at different unit costs; the later one rules.
    engine
        .store()
        .transaction(|repo| {
            repo.append_entry(NewStockEntry::priced(widget.id, 5, dec!(2.00), "Purchase"))?;
            repo.append_entry(NewStockEntry::priced(widget.id, 5, dec!(3.00), "Purchase"))?;
            Ok(())
        })
        .unwrap();

    engine.disassemble(widget.id, 2, None, None).unwrap();

    let credit = engine
        .store()
        .all_entries()
        .into_iter()
        .filter(|entry| entry.product == bolt.id)
        .next_back()
        .unwrap();
    assert_eq!(credit.amount, 4);
    assert_eq!(credit.piece_price, Some(dec!(3.00)));
    assert_eq!(credit.reference, "Disassembly: WIDGET, amount: 2");
}

#[test]
fn disassemble_without_stock_is_rejected() {
    let engine = engine();
    let (widget, _) = widget_and_bolt(&engine);

    let result = engine.disassemble(widget.id, 1, None, None);
    assert_eq!(
        result,
        Err(EngineError::InsufficientStock { sku: Sku::from("WIDGET") })
    );
}

#[test]
fn disassemble_raw_product_is_rejected() {
    let engine = engine();
    let bolt = add_product(&engine, "BOLT-M4");
    receive(&engine, bolt.id, 10, dec!(1.00));

    let result = engine.disassemble(bolt.id, 1, None, None);
    assert_eq!(
        result,
        Err(EngineError::NotAnAssembly { sku: Sku::from("BOLT-M4") })
    );
}

// === Feasibility Probes ===

#[test]
fn assembly_possible_returns_the_edges_to_consume() {
    let engine = engine();
    let (widget, bolt) = widget_and_bolt(&engine);

    let edges = engine.assembly_possible(widget.id, 5).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].part, bolt.id);
    assert_eq!(edges[0].amount, 2);

    // Probing writes nothing.
    assert_eq!(engine.store().all_entries().len(), 1);
}

#[test]
fn disassembly_possible_requires_stock_first() {
    let engine = engine();
    let (widget, _) = widget_and_bolt(&engine);

    assert!(engine.disassembly_possible(widget.id, 1).is_err());
    engine.assemble(widget.id, 2, None, None).unwrap();
    assert_eq!(engine.disassembly_possible(widget.id, 2).unwrap().len(), 1);
}

// === Read API ===

#[test]
fn product_cost_tracks_the_latest_lot() {
    let engine = engine();
    let (widget, bolt) = widget_and_bolt(&engine);

    assert_eq!(engine.product_cost(widget.id).unwrap(), Decimal::ZERO);
    assert_eq!(engine.product_cost(bolt.id).unwrap(), dec!(1.00));

    engine.assemble(widget.id, 2, None, None).unwrap();
    assert_eq!(engine.product_cost(widget.id).unwrap(), dec!(2.00));
}

#[test]
fn unknown_product_surfaces_a_storage_error() {
    let engine = engine();
    let result = engine.current_stock(ProductId(99));
    assert!(matches!(result, Err(EngineError::Storage(_))));
}
