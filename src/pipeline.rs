// load -> join -> analyze, each step a plain function of the previous
// step's output.
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, ComputationError, LoadError};
use crate::insights::generate_insights;
use crate::join::{left_join, Joined, JoinKey};
use crate::loader::{load_campaigns, load_hourly, load_products, load_search_terms, LoadReport};
use crate::mapping::{load_mapping, MappingTable};
use crate::metrics;
use crate::table::Table;
use crate::types::{
    AggregateMetrics, CampaignRecord, CampaignSummaryRow, DailyRow, Highlights, HourlyRecord,
    HourlyRow, InsightSet, ProductRecord, ProductRow, SearchTermRecord, SearchTermRow,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// How many search terms the top-N list keeps.
pub const TOP_SEARCH_TERMS: usize = 10;

/// A loaded report together with its load diagnostics.
#[derive(Debug, Clone)]
pub struct Loaded<R> {
    pub table: Table<R>,
    pub report: LoadReport,
}

impl<R> From<(Table<R>, LoadReport)> for Loaded<R> {
    fn from((table, report): (Table<R>, LoadReport)) -> Self {
        Self { table, report }
    }
}

/// Every source file, cleaned but not yet joined.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub mapping: MappingTable,
    pub campaigns: Loaded<CampaignRecord>,
    pub hourly: Loaded<HourlyRecord>,
    pub search_summary: Loaded<SearchTermRecord>,
    pub search_daily: Loaded<SearchTermRecord>,
    pub products: Loaded<ProductRecord>,
}

/// Per-source counts carried through to the finished analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub name: &'static str,
    pub path: PathBuf,
    pub rows_loaded: usize,
    pub skipped_rows: usize,
    pub recovered_cells: usize,
    pub joined_rows: usize,
    pub mapped_rows: usize,
}

/// Every report left-joined against the mapping table.
#[derive(Debug, Clone)]
pub struct JoinedTables {
    pub campaigns: Table<Joined<CampaignRecord>>,
    pub hourly: Table<Joined<HourlyRecord>>,
    pub search_summary: Table<Joined<SearchTermRecord>>,
    pub products: Table<Joined<ProductRecord>>,
    pub sources: Vec<SourceSummary>,
}

/// Everything the exporter and the dashboards render. Plain data, built
/// fresh on every run.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub aggregate: AggregateMetrics,
    pub campaigns: Vec<CampaignSummaryRow>,
    pub hourly: Vec<HourlyRow>,
    pub daily: Vec<DailyRow>,
    pub products: Vec<ProductRow>,
    pub search_terms: Vec<SearchTermRow>,
    pub top_search_terms: Vec<SearchTermRecord>,
    pub insights: InsightSet,
    pub highlights: Highlights,
    pub sources: Vec<SourceSummary>,
}

/// Read every source in order. The first failure aborts the load.
pub fn load_sources(config: &AnalysisConfig) -> Result<SourceTables, LoadError> {
    let mapping = load_mapping(&config.mapping_path())?;
    Ok(SourceTables {
        mapping,
        campaigns: load_campaigns(&config.campaign_path())?.into(),
        hourly: load_hourly(&config.hourly_path())?.into(),
        search_summary: load_search_terms(&config.search_summary_path())?.into(),
        search_daily: load_search_terms(&config.search_daily_path())?.into(),
        products: load_products(&config.product_path())?.into(),
    })
}

fn join_one<R: JoinKey + Clone>(
    name: &'static str,
    loaded: &Loaded<R>,
    mapping: &MappingTable,
    sources: &mut Vec<SourceSummary>,
) -> Table<Joined<R>> {
    let joined = left_join(&loaded.table, mapping);
    let mapped_rows = joined.rows.iter().filter(|r| r.is_matched()).count();
    info!(source = name, rows = joined.len(), mapped = mapped_rows, "joined report");
    sources.push(SourceSummary {
        name,
        path: loaded.report.source.clone(),
        rows_loaded: loaded.table.len(),
        skipped_rows: loaded.report.skipped_rows,
        recovered_cells: loaded.report.recovered_cells,
        joined_rows: joined.len(),
        mapped_rows,
    });
    joined
}

pub fn join_sources(sources: &SourceTables) -> JoinedTables {
    let mut summaries = Vec::with_capacity(5);
    let mapping = &sources.mapping;
    let campaigns = join_one("campaign", &sources.campaigns, mapping, &mut summaries);
    let hourly = join_one("hourly", &sources.hourly, mapping, &mut summaries);
    let search_summary = join_one("search terms", &sources.search_summary, mapping, &mut summaries);
    // The daily search-term report only contributes its load and match counts.
    join_one("search terms daily", &sources.search_daily, mapping, &mut summaries);
    let products = join_one("products", &sources.products, mapping, &mut summaries);
    JoinedTables {
        campaigns,
        hourly,
        search_summary,
        products,
        sources: summaries,
    }
}

/// Compute every rollup, the insight lists and the highlights digest.
pub fn analyze(tables: &JoinedTables) -> Result<Analysis, ComputationError> {
    let campaign_rows = &tables.campaigns.rows;
    let aggregate = metrics::aggregate_metrics(campaign_rows);
    let hourly = metrics::hourly_rollup(&tables.hourly)?;
    let daily = metrics::daily_rollup(&tables.hourly)?;
    let products = metrics::product_rollup(&tables.products.rows);
    let search_terms = metrics::search_term_rollup(&tables.search_summary.rows);
    let top_search_terms = metrics::top_search_terms(&tables.search_summary.rows, TOP_SEARCH_TERMS);
    let insights = generate_insights(campaign_rows, &tables.search_summary.rows);
    let highlights = metrics::highlights(&aggregate, &products, &search_terms, &daily);
    info!(
        campaigns = campaign_rows.len(),
        hours = hourly.len(),
        days = daily.len(),
        products = products.len(),
        search_terms = search_terms.len(),
        "analysis complete"
    );
    Ok(Analysis {
        campaigns: metrics::campaign_breakdown(campaign_rows),
        aggregate,
        hourly,
        daily,
        products,
        search_terms,
        top_search_terms,
        insights,
        highlights,
        sources: tables.sources.clone(),
    })
}

/// Load, join and analyze in one go.
pub fn run(config: &AnalysisConfig) -> Result<Analysis, AnalysisError> {
    let sources = load_sources(config)?;
    let joined = join_sources(&sources);
    Ok(analyze(&joined)?)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
