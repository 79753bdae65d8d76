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

use clap::{Parser, Subcommand};
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use stock_engine_rs::{
    Engine, MemoryStore, NewStockEntry, ProductId, StorageError, Store,
};

/// Stock Engine - assemble and cost products from CSV inventory files
///
/// Loads a stock ledger (and optionally a bill of materials) from CSV,
/// runs one command against it, and writes the result as CSV to stdout.
#[derive(Parser, Debug)]
#[command(name = "stock-engine-rs")]
#[command(about = "An assembly engine over CSV stock ledgers", long_about = None)]
struct Args {
    /// CSV file with stock movements
    ///
    /// Expected format: sku,amount,piece_price,reference,lot
    /// (blank piece_price means an unpriced movement)
    #[arg(long, value_name = "FILE")]
    stock: PathBuf,

    /// CSV file with BOM edges
    ///
    /// Expected format: product,part,amount,assembly_costs
    #[arg(long, value_name = "FILE")]
    bom: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stock, possible stock and current cost for every product
    Report,
    /// Possible stock of one product
    Possible { sku: String },
    /// Assemble units, then print the resulting ledger
    Assemble {
        sku: String,
        qty: i64,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        lot: Option<String>,
    },
    /// Disassemble units, then print the resulting ledger
    Disassemble {
        sku: String,
        qty: i64,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        lot: Option<String>,
    },
}

fn main() {
    let args = Args::parse();

    let store = MemoryStore::new();
    let mut index = HashMap::new();

    if let Some(path) = &args.bom {
        if let Err(e) = load_file(path, |reader| load_bom(&store, &mut index, reader)) {
            eprintln!("Error loading BOM file '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
    if let Err(e) = load_file(&args.stock, |reader| load_stock(&store, &mut index, reader)) {
        eprintln!("Error loading stock file '{}': {}", args.stock.display(), e);
        process::exit(1);
    }

    let engine = Engine::new(store);
    if let Err(e) = run(&engine, &index, &args.command, std::io::stdout()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_file<T>(
    path: &PathBuf,
    load: impl FnOnce(BufReader<File>) -> Result<T, Box<dyn Error>>,
) -> Result<T, Box<dyn Error>> {
    let file = File::open(path)?;
    load(BufReader::new(file))
}

/// Raw CSV record for one stock movement.
#[derive(Debug, Deserialize)]
struct StockRecord {
    sku: String,
    amount: i64,
    #[serde(deserialize_with = "csv::invalid_option")]
    piece_price: Option<Decimal>,
    reference: Option<String>,
    lot: Option<String>,
}

/// Raw CSV record for one BOM edge.
#[derive(Debug, Deserialize)]
struct BomRecord {
    product: String,
    part: String,
    amount: i64,
    #[serde(deserialize_with = "csv::invalid_option")]
    assembly_costs: Option<Decimal>,
}

/// Looks a SKU up, creating the product on first mention.
fn ensure_product(
    store: &MemoryStore,
    index: &mut HashMap<String, ProductId>,
    sku: &str,
) -> Result<ProductId, StorageError> {
    if let Some(&id) = index.get(sku) {
        return Ok(id);
    }
    let product = store.add_product(sku, sku)?;
    index.insert(sku.to_string(), product.id);
    Ok(product.id)
}

/// Loads BOM edges; malformed rows are skipped.
fn load_bom<R: Read>(
    store: &MemoryStore,
    index: &mut HashMap<String, ProductId>,
    reader: R,
) -> Result<(), Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    for result in rdr.deserialize::<BomRecord>() {
        let Ok(record) = result else {
            continue;
        };
        let product = ensure_product(store, index, &record.product)?;
        let part = ensure_product(store, index, &record.part)?;
        store.add_bom_edge(
            product,
            part,
            record.amount,
            record.assembly_costs.unwrap_or(Decimal::ZERO),
        )?;
    }
    Ok(())
}

/// Loads stock movements in one transaction; malformed rows are skipped.
fn load_stock<R: Read>(
    store: &MemoryStore,
    index: &mut HashMap<String, ProductId>,
    reader: R,
) -> Result<(), Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut movements = Vec::new();
    for result in rdr.deserialize::<StockRecord>() {
        let Ok(record) = result else {
            continue;
        };
        let product = ensure_product(store, index, &record.sku)?;
        let mut entry = NewStockEntry::unpriced(
            product,
            record.amount,
            record.reference.unwrap_or_else(|| "Stock import".to_string()),
        )
        .with_lot(record.lot);
        entry.piece_price = record.piece_price;
        movements.push(entry);
    }
    store.transaction(|repo| {
        for movement in movements {
            repo.append_entry(movement)?;
        }
        Ok(())
    })?;
    Ok(())
}

/// One line of the `report` output.
#[derive(Debug, Serialize)]
struct ReportRow {
    sku: String,
    stock: i64,
    possible: i64,
    limited_by: Option<String>,
    cost: Decimal,
}

/// One line of the ledger dump printed after a mutation.
#[derive(Debug, Serialize)]
struct LedgerRow {
    sku: String,
    amount: i64,
    piece_price: Option<Decimal>,
    reference: String,
    lot: Option<String>,
}

fn run<W: Write>(
    engine: &Engine<MemoryStore>,
    index: &HashMap<String, ProductId>,
    command: &Command,
    writer: W,
) -> Result<(), Box<dyn Error>> {
    let skus: HashMap<ProductId, String> = engine
        .store()
        .products()
        .into_iter()
        .map(|product| (product.id, product.sku.0))
        .collect();
    let resolve = |sku: &str| -> Result<ProductId, Box<dyn Error>> {
        index
            .get(sku)
            .copied()
            .ok_or_else(|| StorageError::UnknownSku(sku.to_string()).into())
    };

    match command {
        Command::Report => {
            let mut wtr = Writer::from_writer(writer);
            for product in engine.store().products() {
                let possible = engine.possible_stock(product.id)?;
                wtr.serialize(ReportRow {
                    sku: product.sku.0.clone(),
                    stock: engine.current_stock(product.id)?,
                    possible: possible.available,
                    limited_by: possible
                        .limited_by
                        .and_then(|edge| skus.get(&edge.part).cloned()),
                    cost: engine.product_cost(product.id)?,
                })?;
            }
            wtr.flush()?;
        }
        Command::Possible { sku } => {
            let product = resolve(sku)?;
            let possible = engine.possible_stock(product)?;
            let mut wtr = Writer::from_writer(writer);
            wtr.serialize(ReportRow {
                sku: sku.clone(),
                stock: engine.current_stock(product)?,
                possible: possible.available,
                limited_by: possible
                    .limited_by
                    .and_then(|edge| skus.get(&edge.part).cloned()),
                cost: engine.product_cost(product)?,
            })?;
            wtr.flush()?;
        }
        Command::Assemble { sku, qty, reference, lot } => {
            let product = resolve(sku)?;
            engine.assemble(product, *qty, reference.as_deref(), lot.as_deref())?;
            write_ledger(engine, &skus, writer)?;
        }
        Command::Disassemble { sku, qty, reference, lot } => {
            let product = resolve(sku)?;
            engine.disassemble(product, *qty, reference.as_deref(), lot.as_deref())?;
            write_ledger(engine, &skus, writer)?;
        }
    }
    Ok(())
}

/// Dumps the whole ledger in insertion order.
fn write_ledger<W: Write>(
    engine: &Engine<MemoryStore>,
    skus: &HashMap<ProductId, String>,
    writer: W,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(writer);
    for entry in engine.store().all_entries() {
        wtr.serialize(LedgerRow {
            sku: skus.get(&entry.product).cloned().unwrap_or_default(),
            amount: entry.amount,
            piece_price: entry.piece_price,
            reference: entry.reference,
            lot: entry.lot,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
