// Multi-sheet workbook export.
//
// Every sheet is described by a list of `Column`s; each column names its
// cell kind explicitly and the kind picks a format from `FORMATS`.
use crate::error::ExportError;
use crate::pipeline::Analysis;
use crate::types::{
    AggregateMetrics, CampaignSummaryRow, DailyRow, HourlyRow, InsightSet, ProductRow,
    SearchTermRow, TrendRow,
};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use rust_xlsxwriter::{
    Chart, ChartType, Color, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook,
    Worksheet, XlsxError,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SUMMARY_SHEET: &str = "Summary";
pub const CAMPAIGN_SHEET: &str = "Campaign Performance";
pub const PRODUCT_SHEET: &str = "Product Performance";
pub const SEARCH_TERM_SHEET: &str = "Search Term Performance";
pub const DAILY_SHEET: &str = "Daily Trends";
pub const HOURLY_SHEET: &str = "Hourly Performance";
pub const INSIGHTS_SHEET: &str = "Insights";
pub const CHARTS_SHEET: &str = "Charts";

/// Longest string Excel accepts in one cell, in characters.
const MAX_CELL_CHARS: usize = 32_767;

const COLUMN_WIDTH: f64 = 15.0;
const DATE_COLUMN_WIDTH: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Currency,
    Number,
    Integer,
    Percent,
    Date,
    Text,
}

static FORMATS: Lazy<HashMap<CellKind, Format>> = Lazy::new(|| {
    let bordered = || Format::new().set_border(FormatBorder::Thin);
    HashMap::from([
        (CellKind::Currency, bordered().set_num_format("₹#,##0.00")),
        (CellKind::Number, bordered().set_num_format("#,##0.00")),
        (CellKind::Integer, bordered().set_num_format("#,##0")),
        (CellKind::Percent, bordered().set_num_format("0.00%")),
        (CellKind::Date, bordered().set_num_format("dd/mm/yyyy")),
        (CellKind::Text, bordered()),
    ])
});

static HEADER: Lazy<Format> = Lazy::new(|| {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD9E1F2))
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
});

fn format_for(kind: CellKind) -> &'static Format {
    &FORMATS[&kind]
}

/// One cell value. Missing numbers are written as formatted blanks.
enum Cell {
    Number(Option<f64>),
    Text(String),
    Date(NaiveDate),
}

struct Column<T> {
    header: &'static str,
    kind: CellKind,
    value: fn(&T) -> Cell,
}

fn column<T>(header: &'static str, kind: CellKind, value: fn(&T) -> Cell) -> Column<T> {
    Column {
        header,
        kind,
        value,
    }
}

fn num(v: f64) -> Cell {
    Cell::Number(Some(v))
}

fn count(v: u64) -> Cell {
    Cell::Number(Some(v as f64))
}

fn campaign_columns() -> Vec<Column<CampaignSummaryRow>> {
    let column = column::<CampaignSummaryRow>;
    vec![
        column("Campaign Name", CellKind::Text, |r| Cell::Text(r.campaign_name.clone())),
        column("Spend", CellKind::Currency, |r| num(r.spend)),
        column("Sales", CellKind::Currency, |r| num(r.sales)),
        column("Impressions", CellKind::Integer, |r| count(r.impressions)),
        column("Clicks", CellKind::Integer, |r| count(r.clicks)),
        column("Orders", CellKind::Integer, |r| count(r.orders)),
        column("ROAS", CellKind::Number, |r| Cell::Number(r.roas)),
        column("ACOS", CellKind::Percent, |r| Cell::Number(r.acos)),
        column("CTR", CellKind::Percent, |r| Cell::Number(r.ctr)),
        column("Conversion Rate", CellKind::Percent, |r| Cell::Number(r.conversion_rate)),
    ]
}

fn product_columns() -> Vec<Column<ProductRow>> {
    let column = column::<ProductRow>;
    vec![
        column("Advertised ASIN", CellKind::Text, |r| Cell::Text(r.asin.clone())),
        column("Spend", CellKind::Currency, |r| num(r.spend)),
        column("Sales", CellKind::Currency, |r| num(r.sales)),
        column("Impressions", CellKind::Integer, |r| count(r.impressions)),
        column("Clicks", CellKind::Integer, |r| count(r.clicks)),
        column("Orders", CellKind::Integer, |r| count(r.orders)),
        column("ROAS", CellKind::Number, |r| Cell::Number(r.roas)),
        column("Performance Tier", CellKind::Text, |r| {
            Cell::Text(r.tier.map(|t| t.label()).unwrap_or_default().to_string())
        }),
    ]
}

fn search_term_columns() -> Vec<Column<SearchTermRow>> {
    let column = column::<SearchTermRow>;
    vec![
        column("Customer Search Term", CellKind::Text, |r| Cell::Text(r.search_term.clone())),
        column("Impression Share", CellKind::Percent, |r| Cell::Number(r.impression_share)),
        column("Impression Rank", CellKind::Number, |r| Cell::Number(r.impression_rank)),
        column("Clicks", CellKind::Integer, |r| count(r.clicks)),
        column("Orders", CellKind::Integer, |r| count(r.orders)),
        column("Sales", CellKind::Currency, |r| num(r.sales)),
        column("Opportunity Tier", CellKind::Text, |r| {
            Cell::Text(r.tier.map(|t| t.label()).unwrap_or_default().to_string())
        }),
        column("Details", CellKind::Text, |r| Cell::Text(r.details.clone())),
    ]
}

/// The metric columns shared by the hourly and daily sheets.
fn trend_columns<K>(key: Column<TrendRow<K>>) -> Vec<Column<TrendRow<K>>> {
    let column = column::<TrendRow<K>>;
    vec![
        key,
        column("Spend", CellKind::Currency, |r| num(r.spend)),
        column("Sales", CellKind::Currency, |r| num(r.sales)),
        column("Impressions", CellKind::Integer, |r| count(r.impressions)),
        column("Clicks", CellKind::Integer, |r| count(r.clicks)),
        column("Orders", CellKind::Integer, |r| count(r.orders)),
        column("ROAS", CellKind::Number, |r| Cell::Number(r.roas)),
        column("Conversion Rate", CellKind::Percent, |r| Cell::Number(r.conversion_rate)),
    ]
}

fn daily_columns() -> Vec<Column<DailyRow>> {
    trend_columns(column::<DailyRow>("Start Date", CellKind::Date, |r| Cell::Date(r.key)))
}

fn hourly_columns() -> Vec<Column<HourlyRow>> {
    trend_columns(column::<HourlyRow>("Hour", CellKind::Integer, |r| num(f64::from(r.key))))
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: Cell, kind: CellKind) -> Result<(), XlsxError> {
    let format = format_for(kind);
    match cell {
        Cell::Number(Some(v)) => {
            sheet.write_number_with_format(row, col, v, format)?;
        }
        Cell::Number(None) => {
            sheet.write_blank(row, col, format)?;
        }
        Cell::Text(s) if s.is_empty() => {
            sheet.write_blank(row, col, format)?;
        }
        Cell::Text(s) => {
            sheet.write_string_with_format(row, col, s, format)?;
        }
        Cell::Date(d) => {
            let ymd = (u16::try_from(d.year()), u8::try_from(d.month()), u8::try_from(d.day()));
            match ymd {
                (Ok(y), Ok(m), Ok(day)) => {
                    let date = ExcelDateTime::from_ymd(y, m, day)?;
                    sheet.write_datetime_with_format(row, col, &date, format)?;
                }
                _ => {
                    sheet.write_string_with_format(row, col, d.to_string(), format)?;
                }
            }
        }
    }
    Ok(())
}

/// Header row plus one row per record. Returns the number of data rows.
fn write_table<T>(sheet: &mut Worksheet, columns: &[Column<T>], rows: &[T]) -> Result<u32, XlsxError> {
    for (c, column) in columns.iter().enumerate() {
        let c = c as u16;
        sheet.write_string_with_format(0, c, column.header, &HEADER)?;
        let width = match column.kind {
            CellKind::Date => DATE_COLUMN_WIDTH,
            _ => COLUMN_WIDTH,
        };
        sheet.set_column_width(c, width)?;
    }
    for (r, record) in rows.iter().enumerate() {
        let r = r as u32 + 1;
        for (c, column) in columns.iter().enumerate() {
            write_cell(sheet, r, c as u16, (column.value)(record), column.kind)?;
        }
    }
    Ok(rows.len() as u32)
}

fn summary_metrics(m: &AggregateMetrics) -> [(&'static str, Option<f64>, CellKind); 9] {
    [
        ("Total Spend", Some(m.total_spend), CellKind::Currency),
        ("Total Sales", Some(m.total_sales), CellKind::Currency),
        ("Total Impressions", Some(m.total_impressions as f64), CellKind::Integer),
        ("Total Clicks", Some(m.total_clicks as f64), CellKind::Integer),
        ("Total Orders", Some(m.total_orders as f64), CellKind::Integer),
        ("Average ROAS", m.average_roas, CellKind::Number),
        ("Average ACOS", m.average_acos, CellKind::Percent),
        ("Average CTR", m.average_ctr, CellKind::Percent),
        ("Conversion Rate", m.conversion_rate, CellKind::Percent),
    ]
}

/// `items` joined with `", "`, stopping at the last whole item that fits in
/// one cell. A single oversized item is cut to the limit.
fn cell_list(items: &[String]) -> String {
    let mut text = String::new();
    let mut chars = 0;
    for item in items {
        let sep = if text.is_empty() { 0 } else { 2 };
        let len = item.chars().count();
        if chars + sep + len > MAX_CELL_CHARS {
            if text.is_empty() {
                text.extend(item.chars().take(MAX_CELL_CHARS));
            }
            break;
        }
        if sep > 0 {
            text.push_str(", ");
        }
        text.push_str(item);
        chars += sep + len;
    }
    text
}

/// Title, key metrics from row 4, then the insight lists as joined text.
fn write_summary(sheet: &mut Worksheet, metrics: &AggregateMetrics, insights: &InsightSet) -> Result<(), XlsxError> {
    sheet.merge_range(0, 0, 0, 3, "Campaign Performance Summary", &HEADER)?;
    for c in 0..4 {
        sheet.set_column_width(c, 20)?;
    }
    sheet.write_string_with_format(2, 0, "Metric", &HEADER)?;
    sheet.write_string_with_format(2, 1, "Value", &HEADER)?;
    let mut row = 3;
    for (label, value, kind) in summary_metrics(metrics) {
        sheet.write_string_with_format(row, 0, label, &HEADER)?;
        write_cell(sheet, row, 1, Cell::Number(value), kind)?;
        row += 1;
    }

    row += 1;
    sheet.write_string_with_format(row, 0, "Key Insights", &HEADER)?;
    for (label, items) in insights.categories() {
        row += 1;
        sheet.write_string_with_format(row, 0, format!("{label}:"), &HEADER)?;
        row += 1;
        if !items.is_empty() {
            sheet.write_string(row, 0, cell_list(items))?;
        }
    }
    Ok(())
}

/// One row per flagged identifier, grouped by category.
fn write_insights(sheet: &mut Worksheet, insights: &InsightSet) -> Result<(), XlsxError> {
    sheet.write_string_with_format(0, 0, "Category", &HEADER)?;
    sheet.write_string_with_format(0, 1, "Item", &HEADER)?;
    sheet.set_column_width(0, 28)?;
    sheet.set_column_width(1, 40)?;
    let mut row = 1;
    for (label, items) in insights.categories() {
        for item in items {
            sheet.write_string(row, 0, label)?;
            sheet.write_string(row, 1, item)?;
            row += 1;
        }
    }
    Ok(())
}

fn sized(mut chart: Chart, title: &str) -> Chart {
    chart.title().set_name(title);
    chart.set_width(720).set_height(480);
    chart
}

/// Charts reference the data sheets by name; a chart over an empty table is
/// left out.
fn write_charts(sheet: &mut Worksheet, rows: &SheetRows) -> Result<(), XlsxError> {
    if rows.campaigns > 0 {
        let n = rows.campaigns;
        let mut chart = Chart::new(ChartType::Column);
        for (col, name) in [(1, "Spend"), (2, "Sales")] {
            chart
                .add_series()
                .set_name(name)
                .set_categories((CAMPAIGN_SHEET, 1, 0, n, 0))
                .set_values((CAMPAIGN_SHEET, 1, col, n, col));
        }
        chart.x_axis().set_name("Campaign");
        chart.y_axis().set_name("Amount (₹)");
        sheet.insert_chart(1, 1, &sized(chart, "Campaign Spend vs Sales"))?;
    }
    if rows.products > 0 {
        let n = rows.products;
        let mut chart = Chart::new(ChartType::Scatter);
        chart
            .add_series()
            .set_name("Products")
            .set_categories((PRODUCT_SHEET, 1, 1, n, 1))
            .set_values((PRODUCT_SHEET, 1, 2, n, 2));
        chart.x_axis().set_name("Total Spend (₹)");
        chart.y_axis().set_name("Total Sales (₹)");
        sheet.insert_chart(1, 13, &sized(chart, "Product Performance Analysis"))?;
    }
    if rows.daily > 0 {
        let n = rows.daily;
        let mut chart = Chart::new(ChartType::Line);
        for (col, name) in [(1, "Spend"), (2, "Sales")] {
            chart
                .add_series()
                .set_name(name)
                .set_categories((DAILY_SHEET, 1, 0, n, 0))
                .set_values((DAILY_SHEET, 1, col, n, col));
        }
        chart.x_axis().set_name("Date");
        chart.y_axis().set_name("Amount (₹)");
        sheet.insert_chart(26, 1, &sized(chart, "Daily Performance Trends"))?;
    }
    if rows.search_terms > 0 {
        let n = rows.search_terms;
        let mut chart = Chart::new(ChartType::Scatter);
        chart
            .add_series()
            .set_name("Search terms")
            .set_categories((SEARCH_TERM_SHEET, 1, 1, n, 1))
            .set_values((SEARCH_TERM_SHEET, 1, 5, n, 5));
        chart.x_axis().set_name("Impression Share");
        chart.y_axis().set_name("Sales (₹)");
        sheet.insert_chart(26, 13, &sized(chart, "Search Term Performance Analysis"))?;
    }
    Ok(())
}

#[derive(Default)]
struct SheetRows {
    campaigns: u32,
    products: u32,
    search_terms: u32,
    daily: u32,
}

/// Lay out every sheet of the report.
pub fn build_workbook(analysis: &Analysis) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let mut rows = SheetRows::default();

    let sheet = workbook.add_worksheet().set_name(SUMMARY_SHEET)?;
    write_summary(sheet, &analysis.aggregate, &analysis.insights)?;

    let sheet = workbook.add_worksheet().set_name(CAMPAIGN_SHEET)?;
    rows.campaigns = write_table(sheet, &campaign_columns(), &analysis.campaigns)?;

    let sheet = workbook.add_worksheet().set_name(PRODUCT_SHEET)?;
    rows.products = write_table(sheet, &product_columns(), &analysis.products)?;

    let sheet = workbook.add_worksheet().set_name(SEARCH_TERM_SHEET)?;
    rows.search_terms = write_table(sheet, &search_term_columns(), &analysis.search_terms)?;

    let sheet = workbook.add_worksheet().set_name(DAILY_SHEET)?;
    rows.daily = write_table(sheet, &daily_columns(), &analysis.daily)?;

    let sheet = workbook.add_worksheet().set_name(HOURLY_SHEET)?;
    write_table(sheet, &hourly_columns(), &analysis.hourly)?;

    let sheet = workbook.add_worksheet().set_name(INSIGHTS_SHEET)?;
    write_insights(sheet, &analysis.insights)?;

    let sheet = workbook.add_worksheet().set_name(CHARTS_SHEET)?;
    write_charts(sheet, &rows)?;

    Ok(workbook)
}

/// The finished workbook as bytes.
pub fn render(analysis: &Analysis) -> Result<Vec<u8>, ExportError> {
    let mut workbook = build_workbook(analysis)?;
    Ok(workbook.save_to_buffer()?)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Write the report to `path`.
///
/// The bytes land in a temporary sibling first and are renamed into place,
/// so an existing file at `path` is either replaced whole or left as it was.
pub fn export_report(analysis: &Analysis, path: &Path) -> Result<PathBuf, ExportError> {
    let bytes = render(analysis)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| ExportError::from_io(dir.to_path_buf(), e))?;
    }
    let tmp = temp_sibling(path);
    let written = fs::write(&tmp, &bytes).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = written {
        if tmp.exists() {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                warn!(path = %tmp.display(), error = %cleanup, "could not remove partial report");
            }
        }
        return Err(ExportError::from_io(path.to_path_buf(), e));
    }
    info!(path = %path.display(), bytes = bytes.len(), "report written");
    Ok(path.to_path_buf())
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
