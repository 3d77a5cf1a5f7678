use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::domain::Domain;
use crate::payload::{DomainKpis, Insight, PreviewRecord, Segmentation};
use crate::session::DashboardData;

/// Semantic type of a KPI value. Drives both the fixed formatting rule and
/// downstream icon/color selection, so the renderer never inspects raw
/// domain fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiKind {
    Count,
    Ratio,
    Currency,
    Decimal,
    Label,
}

#[derive(Debug, Clone, Serialize)]
pub struct KpiEntry {
    pub label: &'static str,
    pub value: String,
    pub kind: KpiKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesPoint {
    pub category: String,
    /// Named numeric fields, in the series' declared field order. Fields the
    /// record did not carry are omitted, never zero-filled.
    pub values: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub label: &'static str,
    pub category_key: &'static str,
    pub fields: Vec<&'static str>,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainSection {
    pub domain: Domain,
    pub title: &'static str,
    pub kpis: Vec<KpiEntry>,
    /// Present only when both the KPI and the preview fetch succeeded.
    pub series: Option<ChartSeries>,
}

/// Presentation-agnostic result of one dashboard load. Sections appear only
/// for available domains; `empty` is the single empty-state signal when
/// nothing at all came back.
#[derive(Debug, Clone, Serialize)]
pub struct ViewModel {
    pub sections: Vec<DomainSection>,
    pub selected: Option<Domain>,
    pub segmentation: Option<Segmentation>,
    pub insights: Vec<Insight>,
    pub empty: bool,
    pub generated_at: DateTime<Utc>,
}

pub fn assemble(data: &DashboardData, currency_prefix: &str) -> ViewModel {
    let mut sections = Vec::new();
    for (domain, snapshot) in data.snapshots.iter() {
        if !snapshot.available {
            continue;
        }
        let Some(kpis) = &snapshot.kpis else { continue };
        let series = snapshot
            .preview
            .as_ref()
            .and_then(|records| chart_series(domain, records));
        sections.push(DomainSection {
            domain,
            title: domain.title(),
            kpis: kpi_entries(kpis, currency_prefix),
            series,
        });
    }

    ViewModel {
        empty: sections.is_empty(),
        sections,
        selected: data.selected,
        segmentation: data.segmentation.clone(),
        insights: data.insights.clone().unwrap_or_default(),
        generated_at: Utc::now(),
    }
}

/// The fixed, ordered KPI display list per domain.
pub fn kpi_entries(kpis: &DomainKpis, currency_prefix: &str) -> Vec<KpiEntry> {
    match kpis {
        DomainKpis::Video(v) => vec![
            entry("Total Views", format_count(v.total_views), KpiKind::Count),
            entry(
                "Avg Engagement Rate",
                format_ratio(v.avg_engagement_rate),
                KpiKind::Ratio,
            ),
            entry("Top Category", v.top_category.clone(), KpiKind::Label),
        ],
        DomainKpis::Ads(a) => vec![
            entry("Impressions", format_count(a.total_impressions), KpiKind::Count),
            entry("CTR", format_ratio(a.avg_ctr), KpiKind::Ratio),
            entry(
                "Conversion Rate",
                format_ratio(a.avg_conversion_rate),
                KpiKind::Ratio,
            ),
            entry(
                "Total Cost",
                format_currency(a.total_cost, currency_prefix),
                KpiKind::Currency,
            ),
        ],
        DomainKpis::Banking(b) => vec![
            entry(
                "Avg Balance",
                format_currency(b.avg_balance, currency_prefix),
                KpiKind::Currency,
            ),
            entry("Churn Rate", format_ratio(b.churn_rate), KpiKind::Ratio),
            entry("Avg Products", format_decimal(b.avg_products), KpiKind::Decimal),
        ],
    }
}

fn entry(label: &'static str, value: String, kind: KpiKind) -> KpiEntry {
    KpiEntry { label, value, kind }
}

fn chart_series(domain: Domain, records: &[PreviewRecord]) -> Option<ChartSeries> {
    let (label, category_key, fields): (_, _, Vec<&'static str>) = match domain {
        Domain::Video => ("Views vs Likes (Sample)", "video_id", vec!["views", "likes"]),
        Domain::Advertising => (
            "Cost vs Conversions (Sample)",
            "campaign_id",
            vec!["cost", "conversions"],
        ),
        // Banking carries no trend chart.
        Domain::Banking => return None,
    };

    let points = records
        .iter()
        .filter_map(|record| {
            let category = category_label(record.get(category_key)?)?;
            let values: Vec<(String, f64)> = fields
                .iter()
                .filter_map(|field| {
                    let value = record.get(*field)?.as_f64()?;
                    Some((field.to_string(), value))
                })
                .collect();
            if values.is_empty() {
                return None;
            }
            Some(SeriesPoint { category, values })
        })
        .collect::<Vec<_>>();

    Some(ChartSeries {
        label,
        category_key,
        fields,
        points,
    })
}

fn category_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Counts get thousands separators: 1234567 -> "1,234,567".
pub fn format_count(value: u64) -> String {
    group_digits(&value.to_string())
}

/// Ratios are shown as percentages with two decimals: 0.1234 -> "12.34%".
pub fn format_ratio(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Currency keeps two decimals below 10,000 and drops to whole units above,
/// grouped either way: 1500 -> "$1,500.00", 2540000 -> "$2,540,000".
pub fn format_currency(value: f64, prefix: &str) -> String {
    let negative = value < 0.0;
    let magnitude = value.abs();
    let body = if magnitude >= 10_000.0 {
        group_digits(&format!("{:.0}", magnitude))
    } else {
        let fixed = format!("{:.2}", magnitude);
        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        format!("{}.{}", group_digits(int_part), frac_part)
    };
    if negative {
        format!("-{prefix}{body}")
    } else {
        format!("{prefix}{body}")
    }
}

/// Plain averages keep one decimal: 2.35 -> "2.4".
pub fn format_decimal(value: f64) -> String {
    format!("{:.1}", value)
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let len = digits.len();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::payload::BankingKpis;

    #[test]
    fn ratio_formatting() {
        assert_eq!(format_ratio(0.1234), "12.34%");
        assert_eq!(format_ratio(0.0), "0.00%");
        assert_eq!(format_ratio(1.0), "100.00%");
    }

    #[test]
    fn count_formatting() {
        assert_eq!(format_count(1_234_567), "1,234,567");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(1500.0, "$"), "$1,500.00");
        assert_eq!(format_currency(12.5, "$"), "$12.50");
        assert_eq!(format_currency(2_540_000.0, "$"), "$2,540,000");
        assert_eq!(format_currency(-42.0, "€"), "-€42.00");
    }

    #[test]
    fn banking_entry_order_is_fixed() {
        let kpis = DomainKpis::Banking(BankingKpis {
            avg_balance: 1500.0,
            churn_rate: 0.1234,
            avg_products: 2.35,
        });
        let entries = kpi_entries(&kpis, "$");
        let labels: Vec<_> = entries.iter().map(|e| e.label).collect();
        assert_eq!(labels, ["Avg Balance", "Churn Rate", "Avg Products"]);
        assert_eq!(entries[0].value, "$1,500.00");
        assert_eq!(entries[1].value, "12.34%");
    }

    #[test]
    fn series_skips_malformed_records() {
        let records: Vec<PreviewRecord> = vec![
            json!({"campaign_id": "C1", "cost": 10.0, "conversions": 3})
                .as_object()
                .unwrap()
                .clone(),
            // No category key: skipped.
            json!({"cost": 99.0}).as_object().unwrap().clone(),
            // Missing one numeric field: that field is omitted.
            json!({"campaign_id": "C2", "cost": 5.5}).as_object().unwrap().clone(),
        ];
        let series = chart_series(Domain::Advertising, &records).unwrap();
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].values.len(), 2);
        assert_eq!(series.points[1].values, vec![("cost".to_string(), 5.5)]);
    }

    #[test]
    fn banking_has_no_series() {
        assert!(chart_series(Domain::Banking, &[]).is_none());
    }
}
