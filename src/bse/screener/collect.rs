use std::path::Path;

use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::bse::screener::error::{Result, ScreenerError};
use crate::bse::screener::io::cache::RecordCache;
use crate::bse::screener::model::{EntityId, Section};

/// Source of per-company reference data, one call per record section.
///
/// Implementations wrap whatever client talks to the exchange; each call
/// returns the section's nested JSON as delivered.
pub trait BseSource {
    fn quote(&self, code: &EntityId) -> Result<Value>;
    fn analysis(&self, code: &EntityId) -> Result<Value>;
    fn ratios(&self, code: &EntityId) -> Result<Value>;
    fn peers(&self, code: &EntityId) -> Result<Value>;
    fn corporate_actions(&self, code: &EntityId) -> Result<Value>;
    fn holdings(&self, code: &EntityId) -> Result<Value>;

    /// Dispatches to the method backing `section`.
    fn fetch(&self, code: &EntityId, section: Section) -> Result<Value> {
        match section {
            Section::Quote => self.quote(code),
            Section::PerformanceAnalysis => self.analysis(code),
            Section::FinancialRatios => self.ratios(code),
            Section::PeerComparison => self.peers(code),
            Section::CorporateActions => self.corporate_actions(code),
            Section::Holdings => self.holdings(code),
        }
    }
}

/// Summary of a collection run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectReport {
    /// Codes fetched and added to the cache during this run.
    pub fetched: Vec<EntityId>,
    /// Codes skipped because the cache already held them.
    pub cached: usize,
    /// Codes whose fetch failed, with the error message.
    pub failed: Vec<(EntityId, String)>,
}

/// Fetches every code missing from `cache` and stores it. A company is only
/// added once all of its sections were fetched. The cache is checkpointed to
/// `cache_path` after every `checkpoint_every` new companies and at the end.
#[instrument(
    level = "info",
    skip_all,
    fields(cache = %cache_path.display(), codes = codes.len())
)]
pub fn collect<S: BseSource + ?Sized>(
    source: &S,
    codes: &[EntityId],
    cache: &mut RecordCache,
    cache_path: &Path,
    checkpoint_every: usize,
) -> Result<CollectReport> {
    if checkpoint_every == 0 {
        return Err(ScreenerError::InvalidConfig(
            "checkpoint_every must be at least 1".into(),
        ));
    }

    let mut report = CollectReport::default();
    let mut since_checkpoint = 0;

    for code in codes {
        if cache.contains(code) {
            report.cached += 1;
            continue;
        }

        match fetch_record(source, code) {
            Ok(record) => {
                cache.insert(code.clone(), record);
                report.fetched.push(code.clone());
                since_checkpoint += 1;
                if since_checkpoint == checkpoint_every {
                    cache.save(cache_path)?;
                    since_checkpoint = 0;
                }
            }
            Err(error) => {
                warn!(code = %code, %error, "failed to fetch company");
                report.failed.push((code.clone(), error.to_string()));
            }
        }
    }

    cache.save(cache_path)?;
    info!(
        fetched = report.fetched.len(),
        cached = report.cached,
        failed = report.failed.len(),
        "collection finished"
    );
    Ok(report)
}

/// Fetches all sections of one company into a single record.
pub fn fetch_record<S: BseSource + ?Sized>(source: &S, code: &EntityId) -> Result<Value> {
    let mut record = Map::new();
    for section in Section::ALL {
        let value = source.fetch(code, section)?;
        record.insert(section.key().to_string(), value);
    }
    Ok(Value::Object(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use tempfile::tempdir;

    struct FakeSource {
        broken: &'static str,
        calls: Cell<usize>,
    }

    impl FakeSource {
        fn section(&self, code: &EntityId, section: Section) -> Result<Value> {
            self.calls.set(self.calls.get() + 1);
            if code.as_str() == self.broken && section == Section::PeerComparison {
                return Err(ScreenerError::Fetch {
                    code: code.to_string(),
                    section: section.to_string(),
                    message: "timed out".into(),
                });
            }
            Ok(json!({"code": code.as_str(), "section": section.key()}))
        }
    }

    impl BseSource for FakeSource {
        fn quote(&self, code: &EntityId) -> Result<Value> {
            self.section(code, Section::Quote)
        }
        fn analysis(&self, code: &EntityId) -> Result<Value> {
            self.section(code, Section::PerformanceAnalysis)
        }
        fn ratios(&self, code: &EntityId) -> Result<Value> {
            self.section(code, Section::FinancialRatios)
        }
        fn peers(&self, code: &EntityId) -> Result<Value> {
            self.section(code, Section::PeerComparison)
        }
        fn corporate_actions(&self, code: &EntityId) -> Result<Value> {
            self.section(code, Section::CorporateActions)
        }
        fn holdings(&self, code: &EntityId) -> Result<Value> {
            self.section(code, Section::Holdings)
        }
    }

    fn codes(raw: &[&str]) -> Vec<EntityId> {
        raw.iter().copied().map(EntityId::new).collect()
    }

    #[test]
    fn record_holds_every_section() {
        let source = FakeSource { broken: "", calls: Cell::new(0) };
        let record = fetch_record(&source, &EntityId::new("500325")).expect("record fetched");

        let keys: Vec<&str> = record
            .as_object()
            .expect("object record")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec![
                "quote",
                "performance_analysis",
                "financial_ratios",
                "peer_comparison",
                "corporate_actions",
                "shareholding_info_and_analysis"
            ]
        );
    }

    #[test]
    fn cached_codes_are_skipped_and_failures_continue() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("result.json");
        let source = FakeSource { broken: "500470", calls: Cell::new(0) };

        let mut cache = RecordCache::new();
        cache.insert(EntityId::new("500325"), json!({"quote": {}}));

        let report = collect(
            &source,
            &codes(&["500325", "500470", "532540"]),
            &mut cache,
            &path,
            10,
        )
        .expect("collection ran");

        assert_eq!(report.cached, 1);
        assert_eq!(report.fetched, codes(&["532540"]));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.as_str(), "500470");
        assert!(!cache.contains(&EntityId::new("500470")));

        let persisted = RecordCache::load(&path).expect("checkpoint loaded");
        assert_eq!(persisted, cache);
    }

    #[test]
    fn checkpoints_are_written_periodically() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("result.json");
        let source = FakeSource { broken: "", calls: Cell::new(0) };
        let mut cache = RecordCache::new();

        collect(&source, &codes(&["500001", "500002", "500003"]), &mut cache, &path, 2)
            .expect("collection ran");

        assert_eq!(source.calls.get(), 3 * Section::ALL.len());
        assert_eq!(RecordCache::load(&path).expect("checkpoint loaded").len(), 3);
    }

    #[test]
    fn zero_checkpoint_frequency_is_rejected() {
        let dir = tempdir().expect("temporary directory");
        let source = FakeSource { broken: "", calls: Cell::new(0) };
        let error = collect(
            &source,
            &[],
            &mut RecordCache::new(),
            &dir.path().join("result.json"),
            0,
        )
        .expect_err("zero rejected");
        assert!(matches!(error, ScreenerError::InvalidConfig(_)));
    }
}
