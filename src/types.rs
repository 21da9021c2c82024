use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Header names as they appear in the Amazon Sponsored Products exports
/// (after trimming).
pub mod col {
    pub const CAMPAIGN_NAME: &str = "Campaign Name";
    pub const SPEND: &str = "Spend";
    pub const SALES: &str = "7 Day Total Sales (₹)";
    pub const IMPRESSIONS: &str = "Impressions";
    pub const CLICKS: &str = "Clicks";
    pub const ORDERS: &str = "7 Day Total Orders (#)";
    pub const ROAS: &str = "Total Return on Advertising Spend (ROAS)";
    pub const ACOS: &str = "Total Advertising Cost of Sales (ACOS)";
    pub const CTR: &str = "Click-Thru Rate (CTR)";
    pub const START_TIME: &str = "Start Time";
    pub const START_DATE: &str = "Start Date";
    pub const SEARCH_TERM: &str = "Customer Search Term";
    pub const IMPRESSION_SHARE: &str = "Search Term Impression Share";
    pub const IMPRESSION_RANK: &str = "Search Term Impression Rank";
    pub const ASIN: &str = "Advertised ASIN";
    pub const MSKU: &str = "msku";
    pub const SKU: &str = "sku";
    pub const STATUS: &str = "status";
}

#[derive(Debug, Deserialize)]
pub struct RawMappingRow {
    #[serde(rename = "msku")]
    pub msku: Option<String>,
    #[serde(rename = "sku")]
    pub sku: Option<String>,
    #[serde(rename = "status")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCampaignRow {
    #[serde(rename = "Campaign Name")]
    pub campaign_name: Option<String>,
    #[serde(rename = "Spend")]
    pub spend: Option<String>,
    #[serde(rename = "7 Day Total Sales (₹)")]
    pub sales: Option<String>,
    #[serde(rename = "Impressions")]
    pub impressions: Option<String>,
    #[serde(rename = "Clicks")]
    pub clicks: Option<String>,
    #[serde(rename = "7 Day Total Orders (#)")]
    pub orders: Option<String>,
    #[serde(rename = "Total Return on Advertising Spend (ROAS)")]
    pub roas: Option<String>,
    #[serde(rename = "Total Advertising Cost of Sales (ACOS)")]
    pub acos: Option<String>,
    #[serde(rename = "Click-Thru Rate (CTR)")]
    pub ctr: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawHourlyRow {
    #[serde(rename = "Campaign Name")]
    pub campaign_name: Option<String>,
    #[serde(rename = "Start Time")]
    pub start_time: Option<String>,
    #[serde(rename = "Start Date")]
    pub start_date: Option<String>,
    #[serde(rename = "Spend")]
    pub spend: Option<String>,
    #[serde(rename = "7 Day Total Sales (₹)")]
    pub sales: Option<String>,
    #[serde(rename = "Impressions")]
    pub impressions: Option<String>,
    #[serde(rename = "Clicks")]
    pub clicks: Option<String>,
    #[serde(rename = "7 Day Total Orders (#)")]
    pub orders: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawSearchTermRow {
    #[serde(rename = "Campaign Name")]
    pub campaign_name: Option<String>,
    #[serde(rename = "Customer Search Term")]
    pub search_term: Option<String>,
    #[serde(rename = "Search Term Impression Share")]
    pub impression_share: Option<String>,
    #[serde(rename = "Search Term Impression Rank")]
    pub impression_rank: Option<String>,
    #[serde(rename = "Spend")]
    pub spend: Option<String>,
    #[serde(rename = "7 Day Total Sales (₹)")]
    pub sales: Option<String>,
    #[serde(rename = "Impressions")]
    pub impressions: Option<String>,
    #[serde(rename = "Clicks")]
    pub clicks: Option<String>,
    #[serde(rename = "7 Day Total Orders (#)")]
    pub orders: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawProductRow {
    #[serde(rename = "Campaign Name")]
    pub campaign_name: Option<String>,
    #[serde(rename = "Advertised ASIN")]
    pub asin: Option<String>,
    #[serde(rename = "Spend")]
    pub spend: Option<String>,
    #[serde(rename = "7 Day Total Sales (₹)")]
    pub sales: Option<String>,
    #[serde(rename = "Impressions")]
    pub impressions: Option<String>,
    #[serde(rename = "Clicks")]
    pub clicks: Option<String>,
    #[serde(rename = "7 Day Total Orders (#)")]
    pub orders: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingEntry {
    pub merchant_sku: String,
    pub sku: String,
    pub status: String,
}

/// One cleaned row of the campaign summary report.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CampaignRecord {
    pub campaign_name: String,
    pub spend: Option<f64>,
    pub sales: Option<f64>,
    pub impressions: Option<u64>,
    pub clicks: Option<u64>,
    pub orders: Option<u64>,
    pub roas: Option<f64>,
    pub acos: Option<f64>,
    pub ctr: Option<f64>,
    pub conversion_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HourlyRecord {
    pub campaign_name: String,
    pub hour: Option<u32>,
    pub date: Option<NaiveDate>,
    pub spend: Option<f64>,
    pub sales: Option<f64>,
    pub impressions: Option<u64>,
    pub clicks: Option<u64>,
    pub orders: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchTermRecord {
    pub campaign_name: String,
    pub search_term: String,
    pub impression_share: Option<f64>,
    pub impression_rank: Option<f64>,
    pub spend: Option<f64>,
    pub sales: Option<f64>,
    pub impressions: Option<u64>,
    pub clicks: Option<u64>,
    pub orders: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProductRecord {
    pub campaign_name: Option<String>,
    pub asin: String,
    pub spend: Option<f64>,
    pub sales: Option<f64>,
    pub impressions: Option<u64>,
    pub clicks: Option<u64>,
    pub orders: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerformanceTier {
    #[serde(rename = "Under-performing")]
    UnderPerforming,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "Over-performing")]
    OverPerforming,
}

impl PerformanceTier {
    pub fn label(self) -> &'static str {
        match self {
            PerformanceTier::UnderPerforming => "Under-performing",
            PerformanceTier::Moderate => "Moderate",
            PerformanceTier::OverPerforming => "Over-performing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpportunityTier {
    #[serde(rename = "Low Share")]
    LowShare,
    #[serde(rename = "Moderate Share")]
    ModerateShare,
    #[serde(rename = "High Share")]
    HighShare,
}

impl OpportunityTier {
    pub fn label(self) -> &'static str {
        match self {
            OpportunityTier::LowShare => "Low Share",
            OpportunityTier::ModerateShare => "Moderate Share",
            OpportunityTier::HighShare => "High Share",
        }
    }
}

/// Whole-table totals and averages for the campaign report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateMetrics {
    pub total_spend: f64,
    pub total_sales: f64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_orders: u64,
    pub average_roas: Option<f64>,
    pub average_acos: Option<f64>,
    pub average_ctr: Option<f64>,
    /// sum(orders) / sum(clicks), not the mean of per-row rates.
    pub conversion_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSummaryRow {
    pub campaign_name: String,
    pub spend: f64,
    pub sales: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub orders: u64,
    pub roas: Option<f64>,
    pub acos: Option<f64>,
    pub ctr: Option<f64>,
    pub conversion_rate: Option<f64>,
}

/// A time-bucketed rollup; `K` is the hour of day or the calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow<K> {
    pub key: K,
    pub spend: f64,
    pub sales: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub orders: u64,
    pub roas: Option<f64>,
    pub conversion_rate: Option<f64>,
}

pub type HourlyRow = TrendRow<u32>;
pub type DailyRow = TrendRow<NaiveDate>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub asin: String,
    pub spend: f64,
    pub sales: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub orders: u64,
    pub roas: Option<f64>,
    pub tier: Option<PerformanceTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchTermRow {
    pub search_term: String,
    pub impression_share: Option<f64>,
    pub impression_rank: Option<f64>,
    pub clicks: u64,
    pub orders: u64,
    pub sales: f64,
    pub tier: Option<OpportunityTier>,
    pub details: String,
}

/// Identifiers flagged by the insight rules. Recomputed on every run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InsightSet {
    pub high_impression_low_sales: Vec<String>,
    pub overspending: Vec<String>,
    pub low_conversion: Vec<String>,
    pub opportunities: Vec<String>,
}

impl InsightSet {
    /// (category label, identifiers) in presentation order.
    pub fn categories(&self) -> [(&'static str, &[String]); 4] {
        [
            ("High Impression, Low Sales", &self.high_impression_low_sales),
            ("Overspending", &self.overspending),
            ("Low Conversion", &self.low_conversion),
            ("Opportunities", &self.opportunities),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub roas_trend: Option<f64>,
    pub spend_trend: Option<f64>,
    pub sales_trend: Option<f64>,
}

/// The short digest shown at the top of the console report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlights {
    pub total_spend: f64,
    pub total_sales: f64,
    pub average_roas: Option<f64>,
    pub average_acos: Option<f64>,
    pub top_products: Vec<ProductRow>,
    pub underperforming_products: Vec<ProductRow>,
    pub high_share_terms: Vec<SearchTermRow>,
    pub trends: TrendAnalysis,
}
