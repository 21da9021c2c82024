use super::*;
use crate::join::Joined;
use chrono::NaiveDate;
use std::path::PathBuf;

fn campaign(name: &str, spend: f64, sales: f64, impressions: u64, clicks: u64, orders: u64) -> CampaignRecord {
    CampaignRecord {
        campaign_name: name.to_string(),
        spend: Some(spend),
        sales: Some(sales),
        impressions: Some(impressions),
        clicks: Some(clicks),
        orders: Some(orders),
        roas: ratio(Some(sales), Some(spend)),
        acos: ratio(Some(spend), Some(sales)),
        ctr: ratio(Some(clicks as f64), Some(impressions as f64)),
        conversion_rate: ratio(Some(orders as f64), Some(clicks as f64)),
    }
}

fn hourly(hour: Option<u32>, date: Option<NaiveDate>, spend: f64, sales: f64, clicks: u64, orders: u64) -> HourlyRecord {
    HourlyRecord {
        campaign_name: "A".to_string(),
        hour,
        date,
        spend: Some(spend),
        sales: Some(sales),
        impressions: Some(100),
        clicks: Some(clicks),
        orders: Some(orders),
    }
}

fn hourly_table(rows: Vec<HourlyRecord>, columns: &[&str]) -> Table<HourlyRecord> {
    Table {
        source: PathBuf::from("hourly.csv"),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

fn term(text: &str, share: Option<f64>, rank: Option<f64>, clicks: u64, sales: Option<f64>) -> SearchTermRecord {
    SearchTermRecord {
        campaign_name: "A".to_string(),
        search_term: text.to_string(),
        impression_share: share,
        impression_rank: rank,
        clicks: Some(clicks),
        orders: Some(0),
        sales,
        ..Default::default()
    }
}

fn day(d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 3, d)
}

#[test]
fn aggregate_totals_and_means() {
    let rows = vec![
        campaign("A", 100.0, 300.0, 1000, 50, 5),
        campaign("B", 200.0, 100.0, 2000, 20, 1),
    ];
    let m = aggregate_metrics(&rows);
    assert_eq!(m.total_spend, 300.0);
    assert_eq!(m.total_sales, 400.0);
    assert_eq!(m.total_impressions, 3000);
    assert_eq!(m.total_clicks, 70);
    assert_eq!(m.total_orders, 6);
    assert_eq!(m.average_roas, Some((3.0 + 0.5) / 2.0));
    assert_eq!(m.conversion_rate, Some(6.0 / 70.0));
}

#[test]
fn conversion_rate_is_ratio_of_sums_not_mean_of_rates() {
    let rows = vec![
        campaign("A", 1.0, 1.0, 10, 1, 1),
        campaign("B", 1.0, 1.0, 10, 99, 0),
    ];
    let m = aggregate_metrics(&rows);
    assert_eq!(m.conversion_rate, Some(0.01));
    let mean_of_rates = mean(rows.iter().map(|r| r.conversion_rate)).unwrap();
    assert_eq!(mean_of_rates, 0.5);
    assert_ne!(m.conversion_rate, Some(mean_of_rates));
}

#[test]
fn aggregate_accepts_joined_rows() {
    let rows = vec![Joined::unmatched(campaign("A", 10.0, 20.0, 1, 1, 1))];
    assert_eq!(aggregate_metrics(&rows).total_sales, 20.0);
}

#[test]
fn empty_table_has_zero_totals_and_missing_ratios() {
    let m = aggregate_metrics::<CampaignRecord>(&[]);
    assert_eq!(m.total_spend, 0.0);
    assert_eq!(m.average_roas, None);
    assert_eq!(m.conversion_rate, None);
}

#[test]
fn campaign_breakdown_groups_by_name() {
    let rows = vec![
        campaign("Beta", 10.0, 5.0, 100, 10, 1),
        campaign("Alpha", 10.0, 40.0, 100, 10, 2),
        campaign("Beta", 30.0, 15.0, 300, 30, 3),
        campaign("", 99.0, 99.0, 1, 1, 1),
    ];
    let breakdown = campaign_breakdown(&rows);
    let names: Vec<&str> = breakdown.iter().map(|r| r.campaign_name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    assert_eq!(breakdown[1].spend, 40.0);
    assert_eq!(breakdown[1].clicks, 40);
    assert_eq!(breakdown[1].roas, Some(0.5));
}

#[test]
fn hourly_rollup_groups_by_hour_and_derives_ratios() {
    let table = hourly_table(
        vec![
            hourly(Some(13), None, 10.0, 30.0, 3, 1),
            hourly(Some(9), None, 10.0, 5.0, 6, 1),
            hourly(Some(13), None, 20.0, 10.0, 3, 1),
            hourly(None, None, 999.0, 999.0, 9, 9),
        ],
        &[col::START_TIME],
    );
    let rows = hourly_rollup(&table).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key, 9);
    assert_eq!(rows[1].key, 13);
    assert_eq!(rows[1].spend, 30.0);
    assert_eq!(rows[1].roas, Some(1.33));
    assert_eq!(rows[1].conversion_rate, Some(0.333));
}

#[test]
fn zero_spend_bucket_has_undefined_roas() {
    let table = hourly_table(vec![hourly(Some(2), None, 0.0, 0.0, 0, 0)], &[col::START_TIME]);
    let rows = hourly_rollup(&table).unwrap();
    assert_eq!(rows[0].roas, None);
    assert_eq!(rows[0].conversion_rate, None);
}

#[test]
fn daily_rollup_orders_by_date() {
    let table = hourly_table(
        vec![
            hourly(Some(1), day(3), 10.005, 20.0, 4, 1),
            hourly(Some(1), day(1), 10.0, 10.0, 4, 2),
            hourly(Some(2), day(3), 10.0, 20.0, 4, 1),
        ],
        &[col::START_TIME, col::START_DATE],
    );
    let rows = daily_rollup(&table).unwrap();
    assert_eq!(rows.iter().map(|r| r.key).collect::<Vec<_>>(), vec![day(1).unwrap(), day(3).unwrap()]);
    assert_eq!(rows[0].roas, Some(1.0));
    assert_eq!(rows[0].conversion_rate, Some(0.5));
    assert_eq!(rows[1].orders, 2);
}

#[test]
fn daily_rollup_without_date_column_is_a_computation_error() {
    let table = hourly_table(vec![hourly(Some(1), None, 1.0, 1.0, 1, 1)], &[col::START_TIME]);
    match daily_rollup(&table) {
        Err(ComputationError::MissingColumn { column, .. }) => assert_eq!(column, col::START_DATE),
        other => panic!("expected missing column, got {other:?}"),
    }
}

#[test]
fn performance_tier_boundaries() {
    assert_eq!(performance_tier(Some(0.2)), Some(PerformanceTier::UnderPerforming));
    assert_eq!(performance_tier(Some(1.0)), Some(PerformanceTier::UnderPerforming));
    assert_eq!(performance_tier(Some(1.01)), Some(PerformanceTier::Moderate));
    assert_eq!(performance_tier(Some(2.0)), Some(PerformanceTier::Moderate));
    assert_eq!(performance_tier(Some(2.01)), Some(PerformanceTier::OverPerforming));
    assert_eq!(performance_tier(None), None);
}

#[test]
fn opportunity_tier_boundaries() {
    assert_eq!(opportunity_tier(Some(0.0)), None);
    assert_eq!(opportunity_tier(Some(0.3)), Some(OpportunityTier::LowShare));
    assert_eq!(opportunity_tier(Some(0.31)), Some(OpportunityTier::ModerateShare));
    assert_eq!(opportunity_tier(Some(0.7)), Some(OpportunityTier::ModerateShare));
    assert_eq!(opportunity_tier(Some(1.0)), Some(OpportunityTier::HighShare));
    assert_eq!(opportunity_tier(Some(1.5)), None);
    assert_eq!(opportunity_tier(None), None);
}

#[test]
fn diagnostics_are_independent_and_joined() {
    assert_eq!(opportunity_details(Some(0.8), Some(1.0), 0, 0.0), NO_ISSUES);
    assert_eq!(
        opportunity_details(Some(0.1), Some(5.0), 3, 0.0),
        "Low impression share | Poor ranking | No sales despite clicks"
    );
    assert_eq!(opportunity_details(Some(0.5), Some(4.0), 3, 10.0), POOR_RANKING);
    assert_eq!(opportunity_details(None, None, 1, 0.0), CLICKS_WITHOUT_SALES);
}

#[test]
fn product_rollup_assigns_tiers() {
    let product = |asin: &str, spend: f64, sales: f64| ProductRecord {
        asin: asin.to_string(),
        spend: Some(spend),
        sales: Some(sales),
        impressions: Some(10),
        clicks: Some(1),
        orders: Some(1),
        ..Default::default()
    };
    let rows = product_rollup(&[
        product("B2", 10.0, 10.0),
        product("B1", 10.0, 30.0),
        product("B2", 10.0, 10.0),
        product("B3", 0.0, 0.0),
    ]);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].asin, "B1");
    assert_eq!(rows[0].tier, Some(PerformanceTier::OverPerforming));
    assert_eq!(rows[1].spend, 20.0);
    assert_eq!(rows[1].roas, Some(1.0));
    assert_eq!(rows[1].tier, Some(PerformanceTier::UnderPerforming));
    assert_eq!(rows[2].roas, None);
    assert_eq!(rows[2].tier, None);
}

#[test]
fn search_term_tiers_use_two_place_share_and_rank() {
    let rows = search_term_rollup(&[
        term("x", Some(0.301), Some(3.004), 1, Some(10.0)),
        term("x", Some(0.303), Some(3.004), 1, Some(10.0)),
    ]);
    assert_eq!(rows[0].impression_share, Some(0.3));
    assert_eq!(rows[0].impression_rank, Some(3.0));
    assert_eq!(rows[0].tier, Some(OpportunityTier::LowShare));
    assert_eq!(rows[0].details, NO_ISSUES);
}

#[test]
fn search_term_rollup_averages_share_and_rank() {
    let rows = search_term_rollup(&[
        term("bottle", Some(0.25), Some(2.0), 4, Some(0.0)),
        term("bottle", Some(0.75), Some(6.0), 1, None),
        term("flask", Some(0.9), Some(1.0), 2, Some(150.0)),
    ]);
    assert_eq!(rows.len(), 2);
    let bottle = &rows[0];
    assert_eq!(bottle.impression_share, Some(0.5));
    assert_eq!(bottle.tier, Some(OpportunityTier::ModerateShare));
    assert_eq!(bottle.impression_rank, Some(4.0));
    assert_eq!(bottle.clicks, 5);
    assert_eq!(bottle.sales, 0.0);
    assert_eq!(bottle.details, "Poor ranking | No sales despite clicks");
    assert_eq!(rows[1].tier, Some(OpportunityTier::HighShare));
    assert_eq!(rows[1].details, NO_ISSUES);
}

#[test]
fn top_terms_are_stable_on_ties() {
    let rows = vec![
        term("a", Some(0.5), None, 0, None),
        term("b", Some(0.9), None, 0, None),
        term("c", None, None, 0, None),
        term("d", Some(0.5), None, 0, None),
        term("e", Some(0.1), None, 0, None),
    ];
    let top: Vec<String> = top_search_terms(&rows, 3).into_iter().map(|t| t.search_term).collect();
    assert_eq!(top, vec!["b", "a", "d"]);
    assert_eq!(top_search_terms(&rows, 10).len(), 4);
}

#[test]
fn highlights_cap_lists_and_average_trends() {
    let product = |asin: &str, roas: f64| ProductRow {
        asin: asin.to_string(),
        spend: 1.0,
        sales: roas,
        impressions: 0,
        clicks: 0,
        orders: 0,
        roas: Some(roas),
        tier: performance_tier(Some(roas)),
    };
    let products: Vec<ProductRow> = (0..7).map(|i| product(&format!("P{i}"), 3.0)).chain([product("U", 0.5)]).collect();
    let daily = vec![
        TrendRow { key: day(1).unwrap(), spend: 10.0, sales: 20.0, impressions: 0, clicks: 0, orders: 0, roas: Some(2.0), conversion_rate: None },
        TrendRow { key: day(2).unwrap(), spend: 30.0, sales: 20.0, impressions: 0, clicks: 0, orders: 0, roas: None, conversion_rate: None },
    ];
    let agg = aggregate_metrics::<CampaignRecord>(&[]);
    let h = highlights(&agg, &products, &[], &daily);
    assert_eq!(h.top_products.len(), 5);
    assert_eq!(h.underperforming_products.len(), 1);
    assert!(h.high_share_terms.is_empty());
    assert_eq!(h.trends.roas_trend, Some(2.0));
    assert_eq!(h.trends.spend_trend, Some(20.0));
}
