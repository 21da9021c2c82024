// Aggregations over the joined report tables.
//
// Every function here is pure: it reads rows and returns new rows. Rows are
// accepted as anything that borrows as the record type, so callers can pass
// joined rows or plain records alike.
use crate::error::ComputationError;
use crate::table::Table;
use crate::types::{
    col, AggregateMetrics, CampaignRecord, CampaignSummaryRow, DailyRow, Highlights, HourlyRecord,
    HourlyRow, OpportunityTier, PerformanceTier, ProductRecord, ProductRow, SearchTermRecord,
    SearchTermRow, TrendAnalysis, TrendRow,
};
use crate::util::{mean, ratio, round_to, sum_present};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// How many rows each highlight list keeps.
const HIGHLIGHT_LIMIT: usize = 5;

/// Running sums of the additive report columns.
#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    spend: f64,
    sales: f64,
    impressions: u64,
    clicks: u64,
    orders: u64,
}

impl Totals {
    fn add(
        &mut self,
        spend: Option<f64>,
        sales: Option<f64>,
        impressions: Option<u64>,
        clicks: Option<u64>,
        orders: Option<u64>,
    ) {
        self.spend += spend.unwrap_or(0.0);
        self.sales += sales.unwrap_or(0.0);
        self.impressions += impressions.unwrap_or(0);
        self.clicks += clicks.unwrap_or(0);
        self.orders += orders.unwrap_or(0);
    }

    fn rounded_money(self, places: i32) -> Self {
        Self {
            spend: round_to(self.spend, places),
            sales: round_to(self.sales, places),
            ..self
        }
    }

    fn roas(&self) -> Option<f64> {
        ratio(Some(self.sales), Some(self.spend))
    }

    fn conversion_rate(&self) -> Option<f64> {
        ratio(Some(self.orders as f64), Some(self.clicks as f64))
    }
}

/// Totals and averages over the whole campaign table.
///
/// The averages of ROAS, ACOS and CTR are means of the per-row values. The
/// conversion rate is sum(orders) / sum(clicks).
pub fn aggregate_metrics<B: Borrow<CampaignRecord>>(rows: &[B]) -> AggregateMetrics {
    let records: Vec<&CampaignRecord> = rows.iter().map(<B as Borrow<CampaignRecord>>::borrow).collect();
    let mut totals = Totals::default();
    for r in &records {
        totals.add(r.spend, r.sales, r.impressions, r.clicks, r.orders);
    }
    AggregateMetrics {
        total_spend: totals.spend,
        total_sales: totals.sales,
        total_impressions: totals.impressions,
        total_clicks: totals.clicks,
        total_orders: totals.orders,
        average_roas: mean(records.iter().map(|r| r.roas)),
        average_acos: mean(records.iter().map(|r| r.acos)),
        average_ctr: mean(records.iter().map(|r| r.ctr)),
        conversion_rate: totals.conversion_rate(),
    }
}

/// Per-campaign sums and mean ratios, ordered by campaign name.
pub fn campaign_breakdown<B: Borrow<CampaignRecord>>(rows: &[B]) -> Vec<CampaignSummaryRow> {
    let mut groups: BTreeMap<&str, Vec<&CampaignRecord>> = BTreeMap::new();
    for r in rows.iter().map(<B as Borrow<CampaignRecord>>::borrow) {
        if !r.campaign_name.is_empty() {
            groups.entry(r.campaign_name.as_str()).or_default().push(r);
        }
    }
    groups
        .into_iter()
        .map(|(name, group)| {
            let mut totals = Totals::default();
            for r in &group {
                totals.add(r.spend, r.sales, r.impressions, r.clicks, r.orders);
            }
            let totals = totals.rounded_money(2);
            let avg = |f: fn(&CampaignRecord) -> Option<f64>, places| {
                mean(group.iter().map(|r| f(r))).map(|v| round_to(v, places))
            };
            CampaignSummaryRow {
                campaign_name: name.to_string(),
                spend: totals.spend,
                sales: totals.sales,
                impressions: totals.impressions,
                clicks: totals.clicks,
                orders: totals.orders,
                roas: avg(|r| r.roas, 2),
                acos: avg(|r| r.acos, 4),
                ctr: avg(|r| r.ctr, 4),
                conversion_rate: avg(|r| r.conversion_rate, 4),
            }
        })
        .collect()
}

fn trend_rollup<K, B, F>(rows: &[B], key: F, money_places: Option<i32>) -> Vec<TrendRow<K>>
where
    K: Ord + Copy,
    B: Borrow<HourlyRecord>,
    F: Fn(&HourlyRecord) -> Option<K>,
{
    let mut buckets: BTreeMap<K, Totals> = BTreeMap::new();
    for r in rows.iter().map(<B as Borrow<HourlyRecord>>::borrow) {
        // Rows without a usable key sit outside every bucket.
        if let Some(k) = key(r) {
            buckets
                .entry(k)
                .or_default()
                .add(r.spend, r.sales, r.impressions, r.clicks, r.orders);
        }
    }
    buckets
        .into_iter()
        .map(|(k, totals)| {
            let totals = match money_places {
                Some(p) => totals.rounded_money(p),
                None => totals,
            };
            TrendRow {
                key: k,
                spend: totals.spend,
                sales: totals.sales,
                impressions: totals.impressions,
                clicks: totals.clicks,
                orders: totals.orders,
                roas: totals.roas().map(|v| round_to(v, 2)),
                conversion_rate: totals.conversion_rate().map(|v| round_to(v, 3)),
            }
        })
        .collect()
}

fn require_column<R>(table: &Table<R>, name: &str, column: &str) -> Result<(), ComputationError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(ComputationError::MissingColumn {
            table: name.to_string(),
            column: column.to_string(),
        })
    }
}

/// Hour-of-day rollup (0..=23), ordered by hour.
pub fn hourly_rollup<B: Borrow<HourlyRecord>>(
    table: &Table<B>,
) -> Result<Vec<HourlyRow>, ComputationError> {
    require_column(table, "hourly", col::START_TIME)?;
    Ok(trend_rollup(&table.rows, |r| r.hour, None))
}

/// Calendar-date rollup, ordered by date. Money sums are rounded to cents
/// before ROAS is derived.
pub fn daily_rollup<B: Borrow<HourlyRecord>>(
    table: &Table<B>,
) -> Result<Vec<DailyRow>, ComputationError> {
    require_column(table, "hourly", col::START_DATE)?;
    Ok(trend_rollup(&table.rows, |r| r.date, Some(2)))
}

/// ROAS <= 1 under-performs, (1, 2] is moderate, above 2 over-performs.
pub fn performance_tier(roas: Option<f64>) -> Option<PerformanceTier> {
    let roas = roas?;
    Some(if roas <= 1.0 {
        PerformanceTier::UnderPerforming
    } else if roas <= 2.0 {
        PerformanceTier::Moderate
    } else {
        PerformanceTier::OverPerforming
    })
}

/// Right-inclusive bins (0, 0.3], (0.3, 0.7], (0.7, 1]. Anything outside
/// gets no tier.
pub fn opportunity_tier(share: Option<f64>) -> Option<OpportunityTier> {
    match share? {
        s if s > 0.0 && s <= 0.3 => Some(OpportunityTier::LowShare),
        s if s > 0.3 && s <= 0.7 => Some(OpportunityTier::ModerateShare),
        s if s > 0.7 && s <= 1.0 => Some(OpportunityTier::HighShare),
        _ => None,
    }
}

pub const NO_ISSUES: &str = "No issues";
pub const LOW_SHARE: &str = "Low impression share";
pub const POOR_RANKING: &str = "Poor ranking";
pub const CLICKS_WITHOUT_SALES: &str = "No sales despite clicks";

/// Every condition that applies, joined with `" | "`.
pub fn opportunity_details(share: Option<f64>, rank: Option<f64>, clicks: u64, sales: f64) -> String {
    let mut details = Vec::new();
    if share.is_some_and(|s| s < 0.3) {
        details.push(LOW_SHARE);
    }
    if rank.is_some_and(|r| r > 3.0) {
        details.push(POOR_RANKING);
    }
    if clicks > 0 && sales == 0.0 {
        details.push(CLICKS_WITHOUT_SALES);
    }
    if details.is_empty() {
        NO_ISSUES.to_string()
    } else {
        details.join(" | ")
    }
}

/// Per-ASIN sums with ROAS and performance tier, ordered by ASIN.
pub fn product_rollup<B: Borrow<ProductRecord>>(rows: &[B]) -> Vec<ProductRow> {
    let mut groups: BTreeMap<&str, Totals> = BTreeMap::new();
    for r in rows.iter().map(<B as Borrow<ProductRecord>>::borrow) {
        if !r.asin.is_empty() {
            groups
                .entry(r.asin.as_str())
                .or_default()
                .add(r.spend, r.sales, r.impressions, r.clicks, r.orders);
        }
    }
    groups
        .into_iter()
        .map(|(asin, totals)| {
            let totals = totals.rounded_money(2);
            let roas = totals.roas().map(|v| round_to(v, 2));
            ProductRow {
                asin: asin.to_string(),
                spend: totals.spend,
                sales: totals.sales,
                impressions: totals.impressions,
                clicks: totals.clicks,
                orders: totals.orders,
                roas,
                tier: performance_tier(roas),
            }
        })
        .collect()
}

/// Per-term rollup with mean share/rank (two places), tier and diagnostics,
/// ordered by term.
pub fn search_term_rollup<B: Borrow<SearchTermRecord>>(rows: &[B]) -> Vec<SearchTermRow> {
    let mut groups: BTreeMap<&str, Vec<&SearchTermRecord>> = BTreeMap::new();
    for r in rows.iter().map(<B as Borrow<SearchTermRecord>>::borrow) {
        if !r.search_term.is_empty() {
            groups.entry(r.search_term.as_str()).or_default().push(r);
        }
    }
    groups
        .into_iter()
        .map(|(term, group)| {
            // Tier and diagnostics see the same two-place values the report shows.
            let impression_share = mean(group.iter().map(|r| r.impression_share)).map(|v| round_to(v, 2));
            let impression_rank = mean(group.iter().map(|r| r.impression_rank)).map(|v| round_to(v, 2));
            let clicks: u64 = group.iter().filter_map(|r| r.clicks).sum();
            let orders: u64 = group.iter().filter_map(|r| r.orders).sum();
            let sales = round_to(sum_present(group.iter().map(|r| r.sales)), 2);
            SearchTermRow {
                search_term: term.to_string(),
                impression_share,
                impression_rank,
                clicks,
                orders,
                sales,
                tier: opportunity_tier(impression_share),
                details: opportunity_details(impression_share, impression_rank, clicks, sales),
            }
        })
        .collect()
}

/// The `n` rows with the largest impression share. Equal shares keep their
/// input order; rows without a share are never selected.
pub fn top_search_terms<B: Borrow<SearchTermRecord>>(rows: &[B], n: usize) -> Vec<SearchTermRecord> {
    let mut candidates: Vec<&SearchTermRecord> = rows
        .iter()
        .map(<B as Borrow<SearchTermRecord>>::borrow)
        .filter(|r| r.impression_share.is_some())
        .collect();
    candidates.sort_by(|a, b| {
        b.impression_share
            .partial_cmp(&a.impression_share)
            .unwrap_or(Ordering::Equal)
    });
    candidates.into_iter().take(n).cloned().collect()
}

/// The digest shown at the top of a report run.
pub fn highlights(
    aggregate: &AggregateMetrics,
    products: &[ProductRow],
    search_terms: &[SearchTermRow],
    daily: &[DailyRow],
) -> Highlights {
    let products_in = |tier: PerformanceTier| -> Vec<ProductRow> {
        products
            .iter()
            .filter(|p| p.tier == Some(tier))
            .take(HIGHLIGHT_LIMIT)
            .cloned()
            .collect()
    };
    Highlights {
        total_spend: aggregate.total_spend,
        total_sales: aggregate.total_sales,
        average_roas: aggregate.average_roas,
        average_acos: aggregate.average_acos,
        top_products: products_in(PerformanceTier::OverPerforming),
        underperforming_products: products_in(PerformanceTier::UnderPerforming),
        high_share_terms: search_terms
            .iter()
            .filter(|t| t.tier == Some(OpportunityTier::HighShare))
            .take(HIGHLIGHT_LIMIT)
            .cloned()
            .collect(),
        trends: TrendAnalysis {
            roas_trend: mean(daily.iter().map(|d| d.roas)),
            spend_trend: mean(daily.iter().map(|d| Some(d.spend))),
            sales_trend: mean(daily.iter().map(|d| Some(d.sales))),
        },
    }
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod tests;
