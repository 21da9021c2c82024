// Threshold rules that flag campaigns and search terms for attention.
use crate::types::{CampaignRecord, InsightSet, SearchTermRecord};
use crate::util::mean;
use std::borrow::Borrow;
use std::collections::HashSet;
use tracing::debug;

/// ACOS above this means the campaign spends more than it sells.
pub const OVERSPEND_ACOS: f64 = 1.0;
/// Search terms ranked at or above this position...
pub const OPPORTUNITY_MAX_RANK: f64 = 3.0;
/// ...while winning less than this share of impressions.
pub const OPPORTUNITY_MAX_SHARE: f64 = 0.1;

/// Collect non-empty identifiers once each, in first-seen order.
fn distinct<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|n| !n.is_empty() && seen.insert(*n))
        .map(str::to_string)
        .collect()
}

/// Campaigns with above-average impressions whose sales sit below the mean
/// sales of that high-impression group.
pub fn high_impression_low_sales<B: Borrow<CampaignRecord>>(rows: &[B]) -> Vec<String> {
    let records: Vec<&CampaignRecord> = rows.iter().map(<B as Borrow<CampaignRecord>>::borrow).collect();
    let Some(mean_impressions) = mean(records.iter().map(|r| r.impressions.map(|v| v as f64))) else {
        return Vec::new();
    };
    let high: Vec<&CampaignRecord> = records
        .into_iter()
        .filter(|r| r.impressions.is_some_and(|v| v as f64 > mean_impressions))
        .collect();
    let Some(mean_sales) = mean(high.iter().map(|r| r.sales)) else {
        return Vec::new();
    };
    distinct(
        high.iter()
            .filter(|r| r.sales.is_some_and(|s| s < mean_sales))
            .map(|r| r.campaign_name.as_str()),
    )
}

/// Campaigns whose ACOS is strictly above 100%.
pub fn overspending<B: Borrow<CampaignRecord>>(rows: &[B]) -> Vec<String> {
    distinct(
        rows.iter()
            .map(<B as Borrow<CampaignRecord>>::borrow)
            .filter(|r| r.acos.is_some_and(|a| a > OVERSPEND_ACOS))
            .map(|r| r.campaign_name.as_str()),
    )
}

/// Campaigns converting below the mean per-row conversion rate.
pub fn low_conversion<B: Borrow<CampaignRecord>>(rows: &[B]) -> Vec<String> {
    let records: Vec<&CampaignRecord> = rows.iter().map(<B as Borrow<CampaignRecord>>::borrow).collect();
    let Some(threshold) = mean(records.iter().map(|r| r.conversion_rate)) else {
        return Vec::new();
    };
    distinct(
        records
            .into_iter()
            .filter(|r| r.conversion_rate.is_some_and(|c| c < threshold))
            .map(|r| r.campaign_name.as_str()),
    )
}

/// Search terms that rank well but win little of the available impressions.
pub fn opportunities<B: Borrow<SearchTermRecord>>(rows: &[B]) -> Vec<String> {
    distinct(
        rows.iter()
            .map(<B as Borrow<SearchTermRecord>>::borrow)
            .filter(|r| {
                r.impression_rank.is_some_and(|rank| rank <= OPPORTUNITY_MAX_RANK)
                    && r.impression_share.is_some_and(|s| s < OPPORTUNITY_MAX_SHARE)
            })
            .map(|r| r.search_term.as_str()),
    )
}

pub fn generate_insights<C, S>(campaigns: &[C], search_terms: &[S]) -> InsightSet
where
    C: Borrow<CampaignRecord>,
    S: Borrow<SearchTermRecord>,
{
    let insights = InsightSet {
        high_impression_low_sales: high_impression_low_sales(campaigns),
        overspending: overspending(campaigns),
        low_conversion: low_conversion(campaigns),
        opportunities: opportunities(search_terms),
    };
    debug!(
        high_impression_low_sales = insights.high_impression_low_sales.len(),
        overspending = insights.overspending.len(),
        low_conversion = insights.low_conversion.len(),
        opportunities = insights.opportunities.len(),
        "insight rules evaluated"
    );
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::Joined;
    use crate::util::ratio;

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
            ctr: None,
            conversion_rate: ratio(Some(orders as f64), Some(clicks as f64)),
        }
    }

    fn with_acos(name: &str, acos: f64) -> CampaignRecord {
        CampaignRecord {
            campaign_name: name.to_string(),
            acos: Some(acos),
            ..Default::default()
        }
    }

    fn term(text: &str, rank: f64, share: f64) -> SearchTermRecord {
        SearchTermRecord {
            search_term: text.to_string(),
            impression_rank: Some(rank),
            impression_share: Some(share),
            ..Default::default()
        }
    }

    #[test]
    fn overspending_is_strictly_above_one() {
        let rows = vec![with_acos("even", 1.0), with_acos("over", 1.0001), with_acos("under", 0.4)];
        assert_eq!(overspending(&rows), vec!["over"]);
    }

    #[test]
    fn high_impression_low_sales_uses_subset_mean() {
        // Mean impressions 2525: only B, C and D are above it. Their mean
        // sales is 200, so only B and D qualify. A has low sales but too few
        // impressions.
        let rows = vec![
            campaign("A", 10.0, 1.0, 100, 1, 1),
            campaign("B", 10.0, 100.0, 3000, 1, 1),
            campaign("C", 10.0, 400.0, 3000, 1, 1),
            campaign("D", 10.0, 100.0, 4000, 1, 1),
        ];
        assert_eq!(high_impression_low_sales(&rows), vec!["B", "D"]);
    }

    #[test]
    fn low_conversion_compares_against_mean_rate() {
        let rows = vec![
            campaign("A", 1.0, 1.0, 10, 10, 5),
            campaign("B", 1.0, 1.0, 10, 10, 1),
            campaign("C", 1.0, 1.0, 10, 0, 0),
        ];
        // C has no clicks, so no rate, and is neither flagged nor counted.
        assert_eq!(low_conversion(&rows), vec!["B"]);
    }

    #[test]
    fn opportunities_need_good_rank_and_low_share() {
        let rows = vec![
            term("good rank low share", 3.0, 0.05),
            term("poor rank", 4.0, 0.05),
            term("high share", 1.0, 0.1),
            term("good rank low share", 1.0, 0.01),
        ];
        assert_eq!(opportunities(&rows), vec!["good rank low share"]);
    }

    #[test]
    fn duplicates_from_the_join_are_reported_once() {
        let rows = vec![
            Joined::unmatched(with_acos("X", 2.0)),
            Joined::unmatched(with_acos("X", 3.0)),
            Joined::unmatched(with_acos("", 5.0)),
        ];
        assert_eq!(overspending(&rows), vec!["X"]);
    }

    #[test]
    fn empty_inputs_give_empty_lists() {
        let insights = generate_insights::<CampaignRecord, SearchTermRecord>(&[], &[]);
        assert_eq!(insights, InsightSet::default());
    }

    #[test]
    fn end_to_end_two_campaigns() {
        let rows = vec![
            campaign("first", 100.0, 300.0, 1000, 50, 5),
            campaign("second", 200.0, 100.0, 2000, 20, 1),
        ];
        let insights = generate_insights::<_, SearchTermRecord>(&rows, &[]);
        assert_eq!(insights.overspending, vec!["second"]);
        assert!(insights.opportunities.is_empty());
    }
}
