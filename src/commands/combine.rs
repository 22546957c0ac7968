//! Combine Command
//!
//! Merges the latest intraday CSV over the historical CSV and splits the
//! result into one file per symbol.

use std::path::PathBuf;

use crate::constants::files;
use crate::error::Error;
use crate::services::combine_files;
use crate::utils::data_file;

/// Run the combine command
pub fn run(
    a: Option<PathBuf>,
    b: Option<PathBuf>,
    out: Option<PathBuf>,
    out_dir: Option<PathBuf>,
) -> Result<(), Error> {
    let a = a.unwrap_or_else(|| data_file(files::INTRADAY_LATEST_CSV));
    let b = b.unwrap_or_else(|| data_file(files::HISTORICAL_CSV));
    let out = out.unwrap_or_else(|| data_file(files::COMBINED_CSV));
    let out_dir = out_dir.unwrap_or_else(|| data_file(files::COMBINED_BY_SYMBOL_DIR));

    println!("🔀 Combining {} over {}", a.display(), b.display());

    let stats = combine_files(&a, &b, &out, &out_dir)?;
    stats.print_summary();

    println!("\n✅ Wrote combined file: {}", out.display());
    println!("✅ Wrote per-symbol files to: {}", out_dir.display());

    Ok(())
}
