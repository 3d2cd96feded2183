//! Extraction of the screening attributes of each cached company.
//!
//! Every attribute is read with [`resolve`], so a field that is absent or has
//! an unexpected shape simply comes out missing.

pub mod dividend;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::bse::screener::flatten::{EntityFailure, resolve};
use crate::bse::screener::io::cache::RecordCache;
use crate::bse::screener::model::{EntityId, HeaderPath, Record, Scalar, Section};

pub use dividend::{DividendYields, dividend_yields, trailing_totals};

/// Column names of a screened stock, in [`StockItem::cells`] order.
pub const STOCK_COLUMNS: [&str; 15] = [
    "IDENTIFIER",
    "STOCKEXCHANGE",
    "CHANGE",
    "FACEVALUE",
    "FIFTYTWOWEEKHIGH",
    "FIFTYTWOWEEKLOW",
    "STOCKPRICE",
    "MARKETCAP",
    "STOCKNAME",
    "INDUSTRY",
    "EPS",
    "PE",
    "DIVIDENDYIELD",
    "FIVEYEARAVGDIVIDENDYIELD",
    "ROE",
];

const CRORE: &str = "Cr";
const LAKH: &str = "Lakh";
const CRORE_MULTIPLIER: f64 = 10_000_000.0;
const LAKH_MULTIPLIER: f64 = 100_000.0;

/// Screening attributes of one company. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockItem {
    /// Scrip code.
    pub identifier: EntityId,
    /// Exchange the code is listed on.
    pub exchange: String,
    /// Price change reported with the quote.
    pub change: Option<f64>,
    /// Face value per share.
    pub face_value: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    /// Last traded price.
    pub stock_price: Option<f64>,
    /// Market capitalisation in rupees, scaled from the Cr/Lakh unit.
    pub market_cap: Option<f64>,
    pub stock_name: Option<String>,
    pub industry: Option<String>,
    /// Earnings per share, falling back to the company's own peer row.
    pub eps: Option<f64>,
    /// Price to earnings, falling back to the company's own peer row.
    pub pe: Option<f64>,
    /// Latest trailing year's dividend as a fraction of price.
    pub dividend_yield: Option<f64>,
    /// Average yield over the last five trailing years.
    pub five_year_dividend_yield: Option<f64>,
    /// Return on equity.
    pub roe: Option<f64>,
}

impl StockItem {
    /// Cells in [`STOCK_COLUMNS`] order.
    pub fn cells(&self) -> Vec<Option<Scalar>> {
        let text = |value: &str| Some(Scalar::String(value.to_string()));
        let number =
            |value: Option<f64>| value.and_then(serde_json::Number::from_f64).map(Scalar::Number);
        vec![
            text(self.identifier.as_str()),
            text(&self.exchange),
            number(self.change),
            number(self.face_value),
            number(self.fifty_two_week_high),
            number(self.fifty_two_week_low),
            number(self.stock_price),
            number(self.market_cap),
            self.stock_name.as_deref().and_then(text),
            self.industry.as_deref().and_then(text),
            number(self.eps),
            number(self.pe),
            number(self.dividend_yield),
            number(self.five_year_dividend_yield),
            number(self.roe),
        ]
    }
}

/// Counts of missing values across a screening run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MissingInfoStats {
    pub total_companies: usize,
    /// Companies with at least one missing attribute.
    pub companies_with_missing_info: usize,
    pub missing_fields: usize,
    /// Missing count per attribute, in [`STOCK_COLUMNS`] order.
    pub per_field: [usize; STOCK_COLUMNS.len()],
}

impl MissingInfoStats {
    pub fn observe(&mut self, item: &StockItem) {
        self.total_companies += 1;
        let mut missing_here = 0;
        for (position, cell) in item.cells().iter().enumerate() {
            if cell.is_none() {
                self.per_field[position] += 1;
                missing_here += 1;
            }
        }
        if missing_here > 0 {
            self.companies_with_missing_info += 1;
            self.missing_fields += missing_here;
        }
    }
}

/// Outcome of screening a whole cache.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenReport {
    pub items: Vec<StockItem>,
    pub stats: MissingInfoStats,
    pub failures: Vec<EntityFailure>,
}

/// Screens every cached company. Companies whose record cannot be read are
/// reported in [`ScreenReport::failures`] and the run continues.
pub fn screen_cache(cache: &RecordCache, exchange: &str, as_of: NaiveDate) -> ScreenReport {
    let mut report = ScreenReport::default();
    for (entity, value) in cache.iter() {
        match Record::from_json(entity.as_str(), value) {
            Ok(record) => {
                let item = screen_record(entity, &record, exchange, as_of);
                report.stats.observe(&item);
                report.items.push(item);
            }
            Err(error) => {
                warn!(entity = %entity, %error, "skipping entity");
                report.failures.push(EntityFailure {
                    entity: entity.clone(),
                    message: error.to_string(),
                });
            }
        }
    }
    debug!(
        screened = report.items.len(),
        with_missing_info = report.stats.companies_with_missing_info,
        "screening finished"
    );
    report
}

/// Extracts the screening attributes of one company record.
pub fn screen_record(
    entity: &EntityId,
    record: &Record,
    exchange: &str,
    as_of: NaiveDate,
) -> StockItem {
    let quote = Section::Quote.key();
    let ratios = Section::FinancialRatios.key();

    let face_value = decimal(record, &[quote, "faceValue"]);
    let stock_price = decimal(record, &[quote, "stockPrice"]);

    let yields = match (stock_price, face_value) {
        (Some(price), Some(face)) => {
            let dividends = record
                .get(Section::CorporateActions.key())
                .and_then(|actions| actions.get("dividends"));
            dividend_yields(dividends, price, face, as_of)
        }
        _ => None,
    };

    let peer = own_peer_row(entity, record);
    let eps = decimal(record, &[ratios, "profit_ratio", "EPS"])
        .or_else(|| peer.and_then(|row| scalar_decimal(row.get("EPS"))));
    let pe = decimal(record, &[ratios, "profit_ratio", "PE"])
        .or_else(|| peer.and_then(|row| scalar_decimal(row.get("PE"))));

    StockItem {
        identifier: entity.clone(),
        exchange: exchange.to_string(),
        change: decimal(record, &[quote, "change"]),
        face_value,
        fifty_two_week_high: decimal(record, &[quote, "fiftytwo_WeekHigh"]),
        fifty_two_week_low: decimal(record, &[quote, "fiftytwo_WeekLow"]),
        stock_price,
        market_cap: market_cap(record),
        stock_name: text(record, &[quote, "stockName"]),
        industry: text(record, &[ratios, "value_ratio", "Industry"]),
        eps,
        pe,
        dividend_yield: yields.map(|yields| yields.current),
        five_year_dividend_yield: yields.map(|yields| yields.five_year),
        roe: decimal(record, &[ratios, "value_ratio", "ROE"]),
    }
}

fn market_cap(record: &Record) -> Option<f64> {
    let quote = Section::Quote.key();
    let value = decimal(record, &[quote, "mktCap", "value"])?;
    let unit = text(record, &[quote, "mktCap", "in"]).unwrap_or_default();
    let scaled = if unit.contains(CRORE) {
        value * CRORE_MULTIPLIER
    } else if unit.contains(LAKH) {
        value * LAKH_MULTIPLIER
    } else {
        value
    };
    Some(scaled)
}

// The first peer row describes the company itself only when its scrip code
// matches; otherwise it belongs to a peer and must not be used.
fn own_peer_row<'a>(entity: &EntityId, record: &'a Record) -> Option<&'a Record> {
    let row = record
        .get(Section::PeerComparison.key())?
        .get("Table")?
        .at(0)?;
    let own_code = entity.as_str().parse::<f64>().ok()?;
    let listed_code = scalar_decimal(row.get("scrip_cd"))?;
    (listed_code == own_code).then_some(row)
}

fn path(keys: &[&str]) -> HeaderPath {
    keys.iter().copied().collect()
}

fn decimal(record: &Record, keys: &[&str]) -> Option<f64> {
    resolve(record, &path(keys)).and_then(Scalar::as_decimal)
}

fn text(record: &Record, keys: &[&str]) -> Option<String> {
    resolve(record, &path(keys))
        .map(ToString::to_string)
        .filter(|value| !value.trim().is_empty())
}

fn scalar_decimal(cell: Option<&Record>) -> Option<f64> {
    cell?.as_scalar()?.as_decimal()
}
