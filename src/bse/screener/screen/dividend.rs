use chrono::{Months, NaiveDate};

use crate::bse::screener::model::{Record, Scalar};

/// Number of trailing one-year windows the average yield is taken over.
pub const TRAILING_YEARS: usize = 5;

const RECORD_DATE: &str = "Record Date";
const DIVIDEND_PERCENTAGE: &str = "Dividend Percentage";
const DATE_FORMAT: &str = "%d-%m-%Y";

/// Dividend yields in percent of the current price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DividendYields {
    /// Yield of dividends recorded in the last year.
    pub current: f64,
    /// Average yearly yield over the last [`TRAILING_YEARS`] years.
    pub five_year: f64,
}

/// Sums declared dividend percentages into trailing one-year windows ending
/// at `as_of`. Window `k` covers `(as_of - (k + 1) years, as_of - k years]`.
///
/// `dividends` is the `corporate_actions.dividends` table: a `header` list
/// naming the columns and a `data` list of rows. Rows with an unparsable date
/// or percentage are skipped.
pub fn trailing_totals(dividends: &Record, as_of: NaiveDate) -> [f64; TRAILING_YEARS] {
    let mut totals = [0.0; TRAILING_YEARS];

    let Some((date_column, percent_column)) = dividends.get("header").and_then(header_columns)
    else {
        return totals;
    };
    let Some(Record::Sequence(rows)) = dividends.get("data") else {
        return totals;
    };

    let boundaries: Vec<NaiveDate> = (0..=TRAILING_YEARS)
        .map_while(|years| as_of.checked_sub_months(Months::new(12 * years as u32)))
        .collect();

    for row in rows {
        let Some(date) = row.at(date_column).and_then(parse_date) else {
            continue;
        };
        let Some(percent) = row.at(percent_column).and_then(parse_percent) else {
            continue;
        };

        let window = boundaries
            .windows(2)
            .position(|bounds| date <= bounds[0] && date > bounds[1]);
        if let Some(window) = window {
            totals[window] += percent;
        }
    }

    totals
}

/// Current and five-year average yields for a stock priced at `price` with
/// the given face value. Without any dividend rows both yields are zero.
pub fn dividend_yields(
    dividends: Option<&Record>,
    price: f64,
    face_value: f64,
    as_of: NaiveDate,
) -> Option<DividendYields> {
    if price <= 0.0 || !price.is_finite() || !face_value.is_finite() {
        return None;
    }

    let totals = dividends
        .map(|table| trailing_totals(table, as_of))
        .unwrap_or([0.0; TRAILING_YEARS]);
    let sum: f64 = totals.iter().sum();

    Some(DividendYields {
        current: totals[0] * face_value / price,
        five_year: sum * face_value / (TRAILING_YEARS as f64 * price),
    })
}

fn header_columns(header: &Record) -> Option<(usize, usize)> {
    let Record::Sequence(names) = header else {
        return None;
    };
    let position = |wanted: &str| {
        names.iter().position(|name| {
            name.as_scalar()
                .and_then(Scalar::as_str)
                .is_some_and(|name| name.trim() == wanted)
        })
    };
    Some((position(RECORD_DATE)?, position(DIVIDEND_PERCENTAGE)?))
}

fn parse_date(cell: &Record) -> Option<NaiveDate> {
    let text = cell.as_scalar()?.as_str()?;
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

fn parse_percent(cell: &Record) -> Option<f64> {
    match cell.as_scalar()? {
        Scalar::String(text) => text.trim().trim_end_matches('%').trim().parse().ok(),
        other => other.as_decimal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").expect("valid date")
    }

    fn table(rows: serde_json::Value) -> Record {
        Record::from_json(
            "test",
            &json!({
                "header": ["Purpose", "Record Date", "Dividend Percentage"],
                "data": rows
            }),
        )
        .expect("record converted")
    }

    #[test]
    fn dividends_fall_into_trailing_windows() {
        let dividends = table(json!([
            ["Final", "15-07-2024", "80%"],
            ["Interim", "20-01-2024", "20%"],
            ["Final", "18-10-2023", "50%"],
            ["Final", "17-10-2023", "60%"],
            ["Final", "10-07-2019", "10%"],
            ["Final", "10-07-2018", "999%"]
        ]));

        let totals = trailing_totals(&dividends, date("2024-10-18"));
        assert_eq!(totals, [100.0, 110.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn window_boundaries_are_half_open() {
        let dividends = table(json!([
            ["Final", "18-10-2024", "10%"],
            ["Final", "18-10-2023", "20%"],
            ["Final", "19-10-2019", "30%"],
            ["Final", "18-10-2019", "40%"]
        ]));

        let totals = trailing_totals(&dividends, date("2024-10-18"));
        assert_eq!(totals, [10.0, 20.0, 0.0, 0.0, 30.0]);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let dividends = table(json!([
            ["Final", "2024/07/15", "80%"],
            ["Final", "15-07-2024", "n/a"],
            ["Final"],
            "not a row",
            ["Final", "16-07-2024", 25]
        ]));

        let totals = trailing_totals(&dividends, date("2024-10-18"));
        assert_eq!(totals, [25.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn yields_scale_by_face_value_and_price() {
        let dividends = table(json!([
            ["Final", "15-07-2024", "100%"],
            ["Final", "15-07-2023", "150%"]
        ]));

        let yields = dividend_yields(Some(&dividends), 200.0, 10.0, date("2024-10-18"))
            .expect("yields computed");
        assert_eq!(yields.current, 5.0);
        assert_eq!(yields.five_year, 2.5);
    }

    #[test]
    fn no_dividend_table_means_zero_yield() {
        let yields =
            dividend_yields(None, 100.0, 1.0, date("2024-10-18")).expect("yields computed");
        assert_eq!(yields, DividendYields { current: 0.0, five_year: 0.0 });
        assert!(dividend_yields(None, 0.0, 1.0, date("2024-10-18")).is_none());
    }
}
