use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::bse::screener::collect::{BseSource, CollectReport, collect};
use crate::bse::screener::config::ScreenerConfig;
use crate::bse::screener::error::{Result, ScreenerError};
use crate::bse::screener::flatten::{FlattenedTable, flatten_entities};
use crate::bse::screener::io::cache::RecordCache;
use crate::bse::screener::io::{codes, excel_write};
use crate::bse::screener::model::EntityId;
use crate::bse::screener::screen::{ScreenReport, screen_cache};

/// Flattens a record cache into a workbook.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output.display())
)]
pub fn cache_to_excel(input: &Path, output: &Path) -> Result<FlattenedTable> {
    let cache = load_existing_cache(input)?;
    info!(entity_count = cache.len(), "loaded record cache");
    let table = flatten_entities(cache.iter());
    debug!(
        column_count = table.layout.column_count(),
        row_count = table.rows.len(),
        failure_count = table.failures.len(),
        "table flattened"
    );
    excel_write::write_flattened(output, &table)?;
    Ok(table)
}

/// Screens a record cache. `.json` outputs receive the stock items as JSON;
/// anything else is written as a workbook.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output.display(), %as_of)
)]
pub fn cache_to_screen(
    input: &Path,
    output: &Path,
    exchange: &str,
    as_of: NaiveDate,
) -> Result<ScreenReport> {
    let cache = load_existing_cache(input)?;
    info!(entity_count = cache.len(), "loaded record cache");
    let report = screen_cache(&cache, exchange, as_of);

    let wants_json = output
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if wants_json {
        let json_string = serde_json::to_string_pretty(&report.items)?;
        fs::write(output, json_string)?;
    } else {
        excel_write::write_screen(output, &report)?;
    }
    Ok(report)
}

/// Reads the scrip codes of an equity listing.
#[instrument(level = "info", skip_all, fields(input = %input.display(), column = column))]
pub fn list_codes(input: &Path, column: usize) -> Result<Vec<EntityId>> {
    let codes = codes::read_codes(input, column)?;
    info!(code_count = codes.len(), "read equity listing");
    Ok(codes)
}

/// Fetches every listed company missing from the configured cache, resuming
/// from whatever the cache already holds and checkpointing as configured.
#[instrument(
    level = "info",
    skip_all,
    fields(list = %config.stock_list.display(), cache = %config.cache_file.display())
)]
pub fn collect_listing<S: BseSource + ?Sized>(
    source: &S,
    config: &ScreenerConfig,
) -> Result<CollectReport> {
    config.validate()?;
    let codes = list_codes(&config.stock_list, config.code_column)?;
    let mut cache = RecordCache::load(&config.cache_file)?;
    debug!(cached = cache.len(), "resuming from record cache");
    collect(
        source,
        &codes,
        &mut cache,
        &config.cache_file,
        config.checkpoint_every,
    )
}

fn load_existing_cache(input: &Path) -> Result<RecordCache> {
    if !input.exists() {
        return Err(ScreenerError::MissingInput(input.to_path_buf()));
    }
    RecordCache::load(input)
}
