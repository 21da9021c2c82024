use crate::error::LoadError;
use crate::table::{HeaderStyle, RawTable, SourceRow, Table};
use crate::types::{
    col, CampaignRecord, HourlyRecord, ProductRecord, RawCampaignRow, RawHourlyRow,
    RawProductRow, RawSearchTermRow, SearchTermRecord,
};
use crate::util::{parse_count, parse_currency, parse_datetime, parse_f64_safe, parse_ratio, ratio};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

impl SourceRow for RawCampaignRow {
    const REQUIRED: &'static [&'static str] = &[
        col::CAMPAIGN_NAME,
        col::SPEND,
        col::SALES,
        col::IMPRESSIONS,
        col::CLICKS,
        col::ORDERS,
    ];
    const KNOWN: &'static [&'static str] = &[
        col::CAMPAIGN_NAME,
        col::SPEND,
        col::SALES,
        col::IMPRESSIONS,
        col::CLICKS,
        col::ORDERS,
        col::ROAS,
        col::ACOS,
        col::CTR,
    ];
}

impl SourceRow for RawHourlyRow {
    const REQUIRED: &'static [&'static str] = &[
        col::CAMPAIGN_NAME,
        col::START_TIME,
        col::SPEND,
        col::SALES,
        col::IMPRESSIONS,
        col::CLICKS,
        col::ORDERS,
    ];
    const KNOWN: &'static [&'static str] = &[
        col::CAMPAIGN_NAME,
        col::START_TIME,
        col::START_DATE,
        col::SPEND,
        col::SALES,
        col::IMPRESSIONS,
        col::CLICKS,
        col::ORDERS,
    ];
}

impl SourceRow for RawSearchTermRow {
    const REQUIRED: &'static [&'static str] = &[
        col::SEARCH_TERM,
        col::IMPRESSION_SHARE,
        col::IMPRESSION_RANK,
        col::SALES,
        col::CLICKS,
        col::ORDERS,
    ];
    const KNOWN: &'static [&'static str] = &[
        col::CAMPAIGN_NAME,
        col::SEARCH_TERM,
        col::IMPRESSION_SHARE,
        col::IMPRESSION_RANK,
        col::SPEND,
        col::SALES,
        col::IMPRESSIONS,
        col::CLICKS,
        col::ORDERS,
    ];
}

impl SourceRow for RawProductRow {
    const REQUIRED: &'static [&'static str] = &[
        col::ASIN,
        col::SPEND,
        col::SALES,
        col::IMPRESSIONS,
        col::CLICKS,
        col::ORDERS,
    ];
    const KNOWN: &'static [&'static str] = &[
        col::CAMPAIGN_NAME,
        col::ASIN,
        col::SPEND,
        col::SALES,
        col::IMPRESSIONS,
        col::CLICKS,
        col::ORDERS,
    ];
}

/// What happened while loading one source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub source: PathBuf,
    pub total_rows: usize,
    /// Rows dropped because they could not be decoded at all.
    pub skipped_rows: usize,
    /// Non-empty cells that failed to parse and became missing values.
    pub recovered_cells: usize,
}

/// Tracks cells that were present in the file but did not parse.
#[derive(Default)]
struct Recovery(usize);

impl Recovery {
    fn keep<T>(&mut self, raw: &Option<String>, parsed: Option<T>) -> Option<T> {
        if parsed.is_none() && raw.as_deref().is_some_and(|s| !s.trim().is_empty()) {
            self.0 += 1;
        }
        parsed
    }

    fn currency(&mut self, raw: &Option<String>) -> Option<f64> {
        self.keep(raw, parse_currency(raw.as_deref()))
    }

    fn count(&mut self, raw: &Option<String>) -> Option<u64> {
        self.keep(raw, parse_count(raw.as_deref()))
    }

    fn ratio(&mut self, raw: &Option<String>) -> Option<f64> {
        self.keep(raw, parse_ratio(raw.as_deref()))
    }
}

fn text(raw: Option<String>) -> String {
    raw.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Read, normalize and validate a source, then decode its rows.
fn read_source<R: SourceRow>(path: &Path) -> Result<(Vec<String>, Vec<R>, usize), LoadError> {
    let mut raw = RawTable::read(path)?;
    raw.normalize_headers(HeaderStyle::Trimmed);
    raw.align_headers(R::KNOWN);
    raw.require(R::REQUIRED)?;
    let (rows, skipped) = raw.deserialize::<R>();
    Ok((raw.columns(), rows, skipped))
}

fn finish<R>(
    label: &str,
    path: &Path,
    columns: Vec<String>,
    rows: Vec<R>,
    skipped_rows: usize,
    recovery: Recovery,
) -> (Table<R>, LoadReport) {
    let report = LoadReport {
        source: path.to_path_buf(),
        total_rows: rows.len() + skipped_rows,
        skipped_rows,
        recovered_cells: recovery.0,
    };
    if report.recovered_cells > 0 {
        warn!(
            source = label,
            path = %path.display(),
            cells = report.recovered_cells,
            "unparsable cells treated as missing"
        );
    }
    info!(source = label, path = %path.display(), rows = rows.len(), "loaded report");
    let table = Table {
        source: path.to_path_buf(),
        columns,
        rows,
    };
    (table, report)
}

/// Clean one campaign row. Ratios reported in the file win; when absent
/// they are derived from the additive columns.
fn clean_campaign(row: RawCampaignRow, rec: &mut Recovery) -> CampaignRecord {
    let spend = rec.currency(&row.spend);
    let sales = rec.currency(&row.sales);
    let impressions = rec.count(&row.impressions);
    let clicks = rec.count(&row.clicks);
    let orders = rec.count(&row.orders);
    let as_f64 = |v: Option<u64>| v.map(|v| v as f64);
    CampaignRecord {
        campaign_name: text(row.campaign_name),
        roas: rec.ratio(&row.roas).or_else(|| ratio(sales, spend)),
        acos: rec.ratio(&row.acos).or_else(|| ratio(spend, sales)),
        ctr: rec.ratio(&row.ctr).or_else(|| ratio(as_f64(clicks), as_f64(impressions))),
        conversion_rate: ratio(as_f64(orders), as_f64(clicks)),
        spend,
        sales,
        impressions,
        clicks,
        orders,
    }
}

pub fn load_campaigns(path: &Path) -> Result<(Table<CampaignRecord>, LoadReport), LoadError> {
    let (columns, raw, skipped) = read_source::<RawCampaignRow>(path)?;
    let mut rec = Recovery::default();
    let rows: Vec<CampaignRecord> = raw.into_iter().map(|r| clean_campaign(r, &mut rec)).collect();
    Ok(finish("campaign", path, columns, rows, skipped, rec))
}

pub fn load_hourly(path: &Path) -> Result<(Table<HourlyRecord>, LoadReport), LoadError> {
    let (columns, raw, skipped) = read_source::<RawHourlyRow>(path)?;
    let mut rec = Recovery::default();
    let rows: Vec<HourlyRecord> = raw
        .into_iter()
        .map(|r| {
            let hour = rec
                .keep(&r.start_time, parse_datetime(r.start_time.as_deref()))
                .map(|t| t.hour());
            let date = rec
                .keep(&r.start_date, parse_datetime(r.start_date.as_deref()))
                .and_then(|t| t.date());
            HourlyRecord {
                campaign_name: text(r.campaign_name),
                hour,
                date,
                spend: rec.currency(&r.spend),
                sales: rec.currency(&r.sales),
                impressions: rec.count(&r.impressions),
                clicks: rec.count(&r.clicks),
                orders: rec.count(&r.orders),
            }
        })
        .collect();
    Ok(finish("hourly", path, columns, rows, skipped, rec))
}

/// Loads both the search-term summary and the daily search-term report;
/// they share a layout.
pub fn load_search_terms(path: &Path) -> Result<(Table<SearchTermRecord>, LoadReport), LoadError> {
    let (columns, raw, skipped) = read_source::<RawSearchTermRow>(path)?;
    let mut rec = Recovery::default();
    let rows: Vec<SearchTermRecord> = raw
        .into_iter()
        .map(|r| SearchTermRecord {
            campaign_name: text(r.campaign_name),
            search_term: text(r.search_term),
            impression_share: rec.ratio(&r.impression_share),
            impression_rank: rec.keep(
                &r.impression_rank,
                parse_f64_safe(r.impression_rank.as_deref()),
            ),
            spend: rec.currency(&r.spend),
            sales: rec.currency(&r.sales),
            impressions: rec.count(&r.impressions),
            clicks: rec.count(&r.clicks),
            orders: rec.count(&r.orders),
        })
        .collect();
    Ok(finish("search terms", path, columns, rows, skipped, rec))
}

pub fn load_products(path: &Path) -> Result<(Table<ProductRecord>, LoadReport), LoadError> {
    let (columns, raw, skipped) = read_source::<RawProductRow>(path)?;
    let mut rec = Recovery::default();
    let rows: Vec<ProductRecord> = raw
        .into_iter()
        .map(|r| ProductRecord {
            campaign_name: r
                .campaign_name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            asin: text(r.asin),
            spend: rec.currency(&r.spend),
            sales: rec.currency(&r.sales),
            impressions: rec.count(&r.impressions),
            clicks: rec.count(&r.clicks),
            orders: rec.count(&r.orders),
        })
        .collect();
    Ok(finish("products", path, columns, rows, skipped, rec))
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
