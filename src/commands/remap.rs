//! Remap Command
//!
//! Resolves the instrument keys of an extracted key file against the
//! exchange master list and writes mapped and unmapped rows to one CSV.

use std::path::PathBuf;
use tracing::info;

use crate::constants::{column, files, UNMAPPED_SAMPLE_SIZE};
use crate::error::Error;
use crate::models::load_master_list;
use crate::services::{remap_table, write_remap_csv, CsvTable};
use crate::utils::data_file;

/// Run the remap command
pub fn run(csv: Option<PathBuf>, json: Option<PathBuf>, out: Option<PathBuf>) -> Result<(), Error> {
    let csv_path = csv.unwrap_or_else(|| data_file(files::INSTRUMENT_KEYS_CSV));
    let json_path = json.unwrap_or_else(|| data_file(files::MASTER_JSON));
    let out_path = out.unwrap_or_else(|| data_file(files::REMAPPED_CSV));

    println!("📁 Instrument keys: {}", csv_path.display());
    println!("📁 Master list:     {}", json_path.display());

    let table = CsvTable::read(&csv_path)?;
    table.require_columns(&[column::INSTRUMENT_KEY], &csv_path)?;

    let instruments = load_master_list(&json_path)?;
    info!("Loaded {} master instruments", instruments.len());

    let outcome = remap_table(&table, &instruments);
    write_remap_csv(&out_path, &outcome)?;

    println!(
        "✅ Remapped {} instrument keys. {} unmapped. Saved to: {}",
        outcome.mapped.len(),
        outcome.unmapped.len(),
        out_path.display()
    );

    if !outcome.unmapped.is_empty() {
        println!("\nSample unmapped instrument keys:");
        for record in outcome.unmapped.iter().take(UNMAPPED_SAMPLE_SIZE) {
            println!(
                "  {} -> None  trading_symbol: {}",
                record.source_instrument_key, record.trading_symbol
            );
        }
    }

    Ok(())
}
