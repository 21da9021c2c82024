// Interactive dashboard over one analysis run.
//
// The pipeline runs once when the session opens. Each menu choice renders
// one view through the selected `Presenter`; option [7] writes the Excel
// report on demand.
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, ExportError};
use crate::export::export_report;
use crate::pipeline::{self, Analysis, SourceSummary};
use crate::types::{CampaignSummaryRow, ProductRow, SearchTermRecord, SearchTermRow, TrendRow};
use crate::util::{format_currency, format_int, format_opt, format_percent};
use chrono::{Local, NaiveDateTime};
use serde_json::json;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};
use tracing::{error, info};

/// Rows shown per table before the console presenter truncates.
const PREVIEW_ROWS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Summary,
    Campaigns,
    Products,
    SearchTerms,
    Trends,
    Insights,
}

/// A front end that can render every dashboard view.
pub trait Presenter {
    fn render(&self, view: View, analysis: &Analysis, out: &mut dyn Write) -> io::Result<()>;
}

#[derive(Tabled, Clone)]
struct MetricCard {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn card(metric: &str, value: String) -> MetricCard {
    MetricCard {
        metric: metric.to_string(),
        value,
    }
}

#[derive(Tabled, Clone)]
struct SourceView {
    #[tabled(rename = "Source")]
    name: String,
    #[tabled(rename = "Rows")]
    rows: String,
    #[tabled(rename = "Skipped")]
    skipped: String,
    #[tabled(rename = "Recovered Cells")]
    recovered: String,
    #[tabled(rename = "Mapped")]
    mapped: String,
}

impl From<&SourceSummary> for SourceView {
    fn from(s: &SourceSummary) -> Self {
        Self {
            name: s.name.to_string(),
            rows: format_int(s.rows_loaded as u64),
            skipped: format_int(s.skipped_rows as u64),
            recovered: format_int(s.recovered_cells as u64),
            mapped: format!("{} / {}", format_int(s.mapped_rows as u64), format_int(s.joined_rows as u64)),
        }
    }
}

#[derive(Tabled, Clone)]
struct CampaignView {
    #[tabled(rename = "Campaign")]
    name: String,
    #[tabled(rename = "Spend")]
    spend: String,
    #[tabled(rename = "Sales")]
    sales: String,
    #[tabled(rename = "Orders")]
    orders: String,
    #[tabled(rename = "ROAS")]
    roas: String,
    #[tabled(rename = "ACOS")]
    acos: String,
    #[tabled(rename = "CTR")]
    ctr: String,
    #[tabled(rename = "Conv. Rate")]
    conversion_rate: String,
}

impl From<&CampaignSummaryRow> for CampaignView {
    fn from(r: &CampaignSummaryRow) -> Self {
        Self {
            name: r.campaign_name.clone(),
            spend: format_currency(r.spend),
            sales: format_currency(r.sales),
            orders: format_int(r.orders),
            roas: format_opt(r.roas, 2),
            acos: format_percent(r.acos),
            ctr: format_percent(r.ctr),
            conversion_rate: format_percent(r.conversion_rate),
        }
    }
}

#[derive(Tabled, Clone)]
struct ProductView {
    #[tabled(rename = "ASIN")]
    asin: String,
    #[tabled(rename = "Spend")]
    spend: String,
    #[tabled(rename = "Sales")]
    sales: String,
    #[tabled(rename = "ROAS")]
    roas: String,
    #[tabled(rename = "Tier")]
    tier: String,
}

impl From<&ProductRow> for ProductView {
    fn from(r: &ProductRow) -> Self {
        Self {
            asin: r.asin.clone(),
            spend: format_currency(r.spend),
            sales: format_currency(r.sales),
            roas: format_opt(r.roas, 2),
            tier: r.tier.map(|t| t.label()).unwrap_or("n/a").to_string(),
        }
    }
}

fn asin_list(rows: &[ProductRow]) -> String {
    if rows.is_empty() {
        return "none".to_string();
    }
    rows.iter().map(|p| p.asin.as_str()).collect::<Vec<_>>().join(", ")
}

#[derive(Tabled, Clone)]
struct SearchTermView {
    #[tabled(rename = "Search Term")]
    term: String,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Rank")]
    rank: String,
    #[tabled(rename = "Clicks")]
    clicks: String,
    #[tabled(rename = "Sales")]
    sales: String,
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Details")]
    details: String,
}

impl From<&SearchTermRow> for SearchTermView {
    fn from(r: &SearchTermRow) -> Self {
        Self {
            term: r.search_term.clone(),
            share: format_percent(r.impression_share),
            rank: format_opt(r.impression_rank, 1),
            clicks: format_int(r.clicks),
            sales: format_currency(r.sales),
            tier: r.tier.map(|t| t.label()).unwrap_or("n/a").to_string(),
            details: r.details.clone(),
        }
    }
}

#[derive(Tabled, Clone)]
struct TopTermView {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Search Term")]
    term: String,
    #[tabled(rename = "Campaign")]
    campaign: String,
    #[tabled(rename = "Share")]
    share: String,
}

fn top_term_views(terms: &[SearchTermRecord]) -> Vec<TopTermView> {
    terms
        .iter()
        .enumerate()
        .map(|(i, t)| TopTermView {
            rank: i + 1,
            term: t.search_term.clone(),
            campaign: t.campaign_name.clone(),
            share: format_percent(t.impression_share),
        })
        .collect()
}

#[derive(Tabled, Clone)]
struct TrendView {
    #[tabled(rename = "Bucket")]
    key: String,
    #[tabled(rename = "Spend")]
    spend: String,
    #[tabled(rename = "Sales")]
    sales: String,
    #[tabled(rename = "ROAS")]
    roas: String,
    #[tabled(rename = "Conv. Rate")]
    conversion_rate: String,
}

fn trend_views<K, F>(rows: &[TrendRow<K>], key: F) -> Vec<TrendView>
where
    F: Fn(&K) -> String,
{
    rows.iter()
        .map(|r| TrendView {
            key: key(&r.key),
            spend: format_currency(r.spend),
            sales: format_currency(r.sales),
            roas: format_opt(r.roas, 2),
            conversion_rate: format_percent(r.conversion_rate),
        })
        .collect()
}

#[derive(Tabled, Clone)]
struct InsightView {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Items")]
    items: String,
}

/// Markdown tables, the way the reports are previewed in a terminal.
#[derive(Debug, Clone, Copy)]
pub struct ConsolePresenter {
    pub max_rows: usize,
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self {
            max_rows: PREVIEW_ROWS,
        }
    }

    fn table<T>(&self, out: &mut dyn Write, title: impl Display, rows: Vec<T>) -> io::Result<()>
    where
        T: Tabled,
    {
        writeln!(out, "\n{title}\n")?;
        if rows.is_empty() {
            return writeln!(out, "(no rows)\n");
        }
        let total = rows.len();
        let shown: Vec<T> = rows.into_iter().take(self.max_rows).collect();
        let shown_len = shown.len();
        let rendered = Table::new(shown).with(Style::markdown()).to_string();
        writeln!(out, "{rendered}")?;
        if total > shown_len {
            writeln!(out, "(showing {shown_len} of {total} rows)")?;
        }
        writeln!(out)
    }

    fn summary(&self, a: &Analysis, out: &mut dyn Write) -> io::Result<()> {
        let m = &a.aggregate;
        let cards = vec![
            card("Total Spend", format_currency(m.total_spend)),
            card("Total Sales", format_currency(m.total_sales)),
            card("Total Impressions", format_int(m.total_impressions)),
            card("Total Clicks", format_int(m.total_clicks)),
            card("Total Orders", format_int(m.total_orders)),
            card("Average ROAS", format_opt(m.average_roas, 2)),
            card("Average ACOS", format_percent(m.average_acos)),
            card("Average CTR", format_percent(m.average_ctr)),
            card("Conversion Rate", format_percent(m.conversion_rate)),
        ];
        self.table(out, "Campaign Performance Summary", cards)?;

        let h = &a.highlights;
        let trends = vec![
            card("Top products", asin_list(&h.top_products)),
            card("Under-performing products", asin_list(&h.underperforming_products)),
            card("High share search terms", format_int(h.high_share_terms.len() as u64)),
            card("Mean daily ROAS", format_opt(h.trends.roas_trend, 2)),
            card("Mean daily spend", h.trends.spend_trend.map(format_currency).unwrap_or_else(|| "n/a".to_string())),
            card("Mean daily sales", h.trends.sales_trend.map(format_currency).unwrap_or_else(|| "n/a".to_string())),
        ];
        self.table(out, "Highlights", trends)?;
        self.table(out, "Sources", a.sources.iter().map(SourceView::from).collect())
    }
}

impl Presenter for ConsolePresenter {
    fn render(&self, view: View, a: &Analysis, out: &mut dyn Write) -> io::Result<()> {
        match view {
            View::Summary => self.summary(a, out),
            View::Campaigns => self.table(
                out,
                "Campaign Performance",
                a.campaigns.iter().map(CampaignView::from).collect(),
            ),
            View::Products => self.table(
                out,
                "Product Performance",
                a.products.iter().map(ProductView::from).collect(),
            ),
            View::SearchTerms => {
                self.table(
                    out,
                    "Search Term Performance",
                    a.search_terms.iter().map(SearchTermView::from).collect(),
                )?;
                self.table(
                    out,
                    format!("Top {} Search Terms by Impression Share", a.top_search_terms.len()),
                    top_term_views(&a.top_search_terms),
                )
            }
            View::Trends => {
                self.table(
                    out,
                    "Daily Trends",
                    trend_views(&a.daily, |d| d.format("%d/%m/%Y").to_string()),
                )?;
                self.table(
                    out,
                    "Hourly Performance",
                    trend_views(&a.hourly, |h| format!("{h:02}:00")),
                )
            }
            View::Insights => {
                let rows: Vec<InsightView> = a
                    .insights
                    .categories()
                    .into_iter()
                    .map(|(label, items)| InsightView {
                        category: label.to_string(),
                        count: items.len(),
                        items: if items.is_empty() {
                            "-".to_string()
                        } else {
                            items.join(", ")
                        },
                    })
                    .collect();
                self.table(out, "Key Insights", rows)
            }
        }
    }
}

/// Pretty-printed JSON per view, for piping into other tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPresenter;

impl Presenter for JsonPresenter {
    fn render(&self, view: View, a: &Analysis, out: &mut dyn Write) -> io::Result<()> {
        let value = match view {
            View::Summary => json!({
                "aggregate": a.aggregate,
                "highlights": a.highlights,
                "sources": a.sources,
            }),
            View::Campaigns => json!(a.campaigns),
            View::Products => json!(a.products),
            View::SearchTerms => json!({
                "search_terms": a.search_terms,
                "top_search_terms": a.top_search_terms,
            }),
            View::Trends => json!({
                "daily": a.daily,
                "hourly": a.hourly,
            }),
            View::Insights => json!(a.insights),
        };
        serde_json::to_writer_pretty(&mut *out, &value)?;
        writeln!(out)
    }
}

/// One dashboard session: the analysis is computed once and reused.
pub struct Dashboard {
    config: AnalysisConfig,
    analysis: Analysis,
    presenter: Box<dyn Presenter>,
}

impl Dashboard {
    /// Run the pipeline and open a session on its result.
    pub fn open(config: AnalysisConfig, presenter: Box<dyn Presenter>) -> Result<Self, AnalysisError> {
        let analysis = pipeline::run(&config)?;
        Ok(Self::with_analysis(config, analysis, presenter))
    }

    pub fn with_analysis(config: AnalysisConfig, analysis: Analysis, presenter: Box<dyn Presenter>) -> Self {
        Self {
            config,
            analysis,
            presenter,
        }
    }

    pub fn show(&self, view: View, out: &mut dyn Write) -> io::Result<()> {
        self.presenter.render(view, &self.analysis, out)
    }

    /// Write the Excel report stamped with `at`.
    pub fn generate_report(&self, at: NaiveDateTime) -> Result<PathBuf, ExportError> {
        export_report(&self.analysis, &self.config.report_path(at))
    }

    /// Menu loop. Ends on `0` or end of input.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut out: W) -> io::Result<()> {
        loop {
            print_menu(&mut out)?;
            let Some(choice) = read_choice(&mut input, &mut out)? else {
                writeln!(out, "\nExiting the dashboard.")?;
                return Ok(());
            };
            let view = match choice.as_str() {
                "1" => View::Summary,
                "2" => View::Campaigns,
                "3" => View::Products,
                "4" => View::SearchTerms,
                "5" => View::Trends,
                "6" => View::Insights,
                "7" => {
                    self.report_on_demand(&mut out)?;
                    continue;
                }
                "0" => {
                    writeln!(out, "Exiting the dashboard.")?;
                    return Ok(());
                }
                _ => {
                    writeln!(out, "Invalid choice. Please enter 0-7.\n")?;
                    continue;
                }
            };
            self.show(view, &mut out)?;
        }
    }

    fn report_on_demand(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Generating Excel report...")?;
        match self.generate_report(Local::now().naive_local()) {
            Ok(path) => {
                info!(path = %path.display(), "report generated from dashboard");
                writeln!(out, "Report saved to {}\n", path.display())
            }
            Err(e) => {
                error!(error = %e, "report generation failed");
                writeln!(out, "Error generating report: {e}\n")
            }
        }
    }
}

fn print_menu(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "Amazon Ads Dashboard")?;
    writeln!(out, "[1] Summary")?;
    writeln!(out, "[2] Campaigns")?;
    writeln!(out, "[3] Products")?;
    writeln!(out, "[4] Search Terms")?;
    writeln!(out, "[5] Trends")?;
    writeln!(out, "[6] Insights")?;
    writeln!(out, "[7] Generate Excel Report")?;
    writeln!(out, "[0] Exit\n")
}

/// Prompt and read one trimmed line; `None` at end of input.
fn read_choice(input: &mut dyn BufRead, out: &mut dyn Write) -> io::Result<Option<String>> {
    write!(out, "Enter choice: ")?;
    out.flush()?;
    let mut buf = String::new();
    if input.read_line(&mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(buf.trim().to_string()))
}

/// One-line overview logged after a run.
pub fn headline(analysis: &Analysis) -> String {
    let m = &analysis.aggregate;
    format!(
        "spend {} | sales {} | ROAS {} | ACOS {}",
        format_currency(m.total_spend),
        format_currency(m.total_sales),
        format_opt(m.average_roas, 2),
        format_percent(m.average_acos),
    )
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
