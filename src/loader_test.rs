use super::*;
use chrono::NaiveDate;
use rust_xlsxwriter::Workbook;
use std::fs;
use tempfile::tempdir;

const CAMPAIGN_HEADER: &str = "Campaign Name,Spend,7 Day Total Sales (₹),Impressions,Clicks,7 Day Total Orders (#),Total Return on Advertising Spend (ROAS),Total Advertising Cost of Sales (ACOS) ,Click-Thru Rate (CTR)";

#[test]
fn campaign_currency_and_ratios_are_parsed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("campaign.csv");
    fs::write(
        &path,
        format!(
            "{CAMPAIGN_HEADER}\nAlpha,\"₹1,000.00\",\"₹2,500.50\",\"10,000\",200,8,2.5,40.00%,2.00%\n"
        ),
    )
    .unwrap();

    let (table, report) = load_campaigns(&path).unwrap();
    assert_eq!(report.total_rows, 1);
    assert_eq!(report.recovered_cells, 0);
    let row = &table.rows[0];
    assert_eq!(row.campaign_name, "Alpha");
    assert_eq!(row.spend, Some(1000.0));
    assert_eq!(row.sales, Some(2500.5));
    assert_eq!(row.impressions, Some(10_000));
    assert_eq!(row.roas, Some(2.5));
    assert_eq!(row.acos, Some(0.4));
    assert_eq!(row.ctr, Some(0.02));
    assert_eq!(row.conversion_rate, Some(8.0 / 200.0));
}

#[test]
fn missing_ratio_columns_are_derived() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("campaign.csv");
    fs::write(
        &path,
        "Campaign Name,Spend,7 Day Total Sales (₹),Impressions,Clicks,7 Day Total Orders (#)\nA,100,300,1000,50,5\n",
    )
    .unwrap();

    let (table, _) = load_campaigns(&path).unwrap();
    let row = &table.rows[0];
    assert_eq!(row.roas, Some(3.0));
    assert_eq!(row.acos, Some(100.0 / 300.0));
    assert_eq!(row.ctr, Some(0.05));
}

#[test]
fn bad_cells_become_missing_and_are_counted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("campaign.csv");
    fs::write(
        &path,
        format!("{CAMPAIGN_HEADER}\nAlpha,oops,0,,0,0,,,\n"),
    )
    .unwrap();

    let (table, report) = load_campaigns(&path).unwrap();
    let row = &table.rows[0];
    assert_eq!(row.spend, None);
    assert_eq!(row.impressions, None);
    assert_eq!(row.roas, None, "sales/spend with missing spend");
    assert_eq!(row.acos, None, "spend/sales with missing spend");
    assert_eq!(row.conversion_rate, None, "orders/clicks with zero clicks");
    assert_eq!(report.recovered_cells, 1);
}

#[test]
fn absent_campaign_column_is_a_shape_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("campaign.csv");
    fs::write(&path, "Campaign Name,Spend\nA,1\n").unwrap();

    match load_campaigns(&path) {
        Err(LoadError::MissingColumn { column, .. }) => assert_eq!(column, col::SALES),
        other => panic!("expected missing column, got {other:?}"),
    }
}

#[test]
fn absent_campaign_file_is_not_found() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        load_campaigns(&dir.path().join("campaign.xlsx")),
        Err(LoadError::NotFound { .. })
    ));
}

#[test]
fn hourly_rows_extract_hour_and_date() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hourly.csv");
    fs::write(
        &path,
        "Campaign Name,Start Date,Start Time,Spend,7 Day Total Sales (₹),Impressions,Clicks,7 Day Total Orders (#)\n\
         A,2024-02-18,2024-02-18 13:00:00,₹10,₹30,100,5,1\n\
         A,18/02/2024,07:00,₹5,₹0,50,2,0\n\
         A,,garbage,₹1,₹1,1,1,1\n",
    )
    .unwrap();

    let (table, report) = load_hourly(&path).unwrap();
    assert!(table.has_column(col::START_DATE));
    let hours: Vec<Option<u32>> = table.rows.iter().map(|r| r.hour).collect();
    assert_eq!(hours, vec![Some(13), Some(7), None]);
    let feb18 = NaiveDate::from_ymd_opt(2024, 2, 18);
    assert_eq!(table.rows[0].date, feb18);
    assert_eq!(table.rows[1].date, feb18);
    assert_eq!(table.rows[2].date, None);
    assert_eq!(report.recovered_cells, 1);
}

#[test]
fn hourly_without_start_date_still_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hourly.csv");
    fs::write(
        &path,
        "Campaign Name,Start Time,Spend,7 Day Total Sales (₹),Impressions,Clicks,7 Day Total Orders (#)\nA,09:00,1,2,3,4,5\n",
    )
    .unwrap();

    let (table, _) = load_hourly(&path).unwrap();
    assert!(!table.has_column(col::START_DATE));
    assert_eq!(table.rows[0].hour, Some(9));
}

#[test]
fn search_terms_parse_share_and_rank() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("terms.csv");
    fs::write(
        &path,
        "Campaign Name,Customer Search Term,Search Term Impression Share,Search Term Impression Rank,Clicks,7 Day Total Orders (#),7 Day Total Sales (₹)\n\
         A,water bottle,5.50%,2,10,1,₹499\n\
         A,steel bottle,0.8,7,3,0,\n",
    )
    .unwrap();

    let (table, _) = load_search_terms(&path).unwrap();
    assert_eq!(table.rows[0].impression_share, Some(0.055));
    assert_eq!(table.rows[0].impression_rank, Some(2.0));
    assert_eq!(table.rows[0].sales, Some(499.0));
    assert_eq!(table.rows[1].impression_share, Some(0.8));
    assert_eq!(table.rows[1].sales, None);
    assert_eq!(table.rows[1].spend, None, "optional column absent");
}

#[test]
fn products_load_from_workbook() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("products.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let headers = [
        "Campaign Name",
        "Advertised ASIN",
        "Spend",
        "7 Day Total Sales (₹)",
        "Impressions",
        "Clicks",
        "7 Day Total Orders (#)",
    ];
    for (c, h) in headers.iter().enumerate() {
        sheet.write_string(0, c as u16, *h).unwrap();
    }
    sheet.write_string(1, 0, "Alpha").unwrap();
    sheet.write_string(1, 1, "B0ASIN0001").unwrap();
    sheet.write_string(1, 2, "₹120.50").unwrap();
    sheet.write_number(1, 3, 480.0).unwrap();
    sheet.write_number(1, 4, 900.0).unwrap();
    sheet.write_number(1, 5, 30.0).unwrap();
    sheet.write_number(1, 6, 4.0).unwrap();
    workbook.save(&path).unwrap();

    let (table, report) = load_products(&path).unwrap();
    assert_eq!(report.total_rows, 1);
    let row = &table.rows[0];
    assert_eq!(row.campaign_name.as_deref(), Some("Alpha"));
    assert_eq!(row.asin, "B0ASIN0001");
    assert_eq!(row.spend, Some(120.5));
    assert_eq!(row.sales, Some(480.0));
    assert_eq!(row.impressions, Some(900));
    assert_eq!(row.orders, Some(4));
}
