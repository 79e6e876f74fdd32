use chrono::DateTime;
use core_logic::{ReportSchema, WalletRecord};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

pub const REPORT_HEADERS: [&str; 10] = [
    "wallet_address",
    "top_percent",
    "transaction_count",
    "interacted_contracts",
    "wallet_balance",
    "active_days",
    "active_weeks",
    "active_months",
    "last_updated",
    "one_million_nads",
];

/// The slice of the LayerHub wallet document the report reads. Every leaf is
/// optional so one missing field only blanks its own column.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletStats {
    wallet_performance: Option<WalletPerformance>,
    widget: Option<Widget>,
    cards_list: Option<Vec<Card>>,
    last_updated: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletPerformance {
    top_percent: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Widget {
    data: Option<StatList>,
}

#[derive(Debug, Deserialize)]
struct StatList {
    stats: Option<Vec<Stat>>,
}

#[derive(Debug, Deserialize)]
struct Card {
    data: Option<CardData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardData {
    stats: Option<Vec<Stat>>,
    active_days: Option<Stat>,
    active_weeks: Option<Stat>,
    active_months: Option<Stat>,
}

#[derive(Debug, Deserialize)]
struct Stat {
    value: Option<Value>,
}

impl WalletStats {
    fn widget_stat(&self, idx: usize) -> Option<&Value> {
        self.widget
            .as_ref()?
            .data
            .as_ref()?
            .stats
            .as_ref()?
            .get(idx)?
            .value
            .as_ref()
    }

    fn card(&self, idx: usize) -> Option<&CardData> {
        self.cards_list.as_ref()?.get(idx)?.data.as_ref()
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn stat_cell(stat: Option<&Stat>) -> String {
    cell(stat.and_then(|s| s.value.as_ref()))
}

/// Unix seconds (integer or float) as UTC `%Y-%m-%d %H:%M:%S`.
fn timestamp_cell(value: Option<&Value>) -> String {
    let secs = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Report columns for the LayerHub `monad_testnet` wallet page.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonadStatsSchema;

impl ReportSchema for MonadStatsSchema {
    fn headers(&self) -> Vec<&'static str> {
        REPORT_HEADERS.to_vec()
    }

    fn row(&self, record: &WalletRecord) -> Vec<String> {
        let stats = match WalletStats::deserialize(&record.payload) {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Error parsing response for {}: {}", record.wallet, e);
                WalletStats::default()
            }
        };
        let activity = stats.card(1);

        vec![
            record.wallet.to_string(),
            cell(
                stats
                    .wallet_performance
                    .as_ref()
                    .and_then(|p| p.top_percent.as_ref()),
            ),
            cell(stats.widget_stat(0)),
            cell(stats.widget_stat(1)),
            stat_cell(
                stats
                    .card(0)
                    .and_then(|c| c.stats.as_ref())
                    .and_then(|s| s.first()),
            ),
            stat_cell(activity.and_then(|c| c.active_days.as_ref())),
            stat_cell(activity.and_then(|c| c.active_weeks.as_ref())),
            stat_cell(activity.and_then(|c| c.active_months.as_ref())),
            timestamp_cell(stats.last_updated.as_ref()),
            cell(stats.widget_stat(2)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_logic::Wallet;
    use serde_json::json;

    fn full_payload() -> Value {
        json!({
            "wallet_address": "0xAAA",
            "walletPerformance": {"topPercent": 4.5},
            "widget": {"data": {"stats": [
                {"value": 120},
                {"value": 33},
                {"value": "yes"}
            ]}},
            "cardsList": [
                {"data": {"stats": [{"value": "1.25 MON"}]}},
                {"data": {
                    "activeDays": {"value": 12},
                    "activeWeeks": {"value": 4},
                    "activeMonths": {"value": 2}
                }}
            ],
            "lastUpdated": 1700000000
        })
    }

    #[test]
    fn test_full_row() {
        let record = WalletRecord::new(Wallet::from("0xAAA"), full_payload());
        assert_eq!(
            MonadStatsSchema.row(&record),
            vec![
                "0xAAA",
                "4.5",
                "120",
                "33",
                "1.25 MON",
                "12",
                "4",
                "2",
                "2023-11-14 22:13:20",
                "yes"
            ]
        );
    }

    #[test]
    fn test_missing_fields_blank_only_their_column() {
        let mut payload = full_payload();
        payload["cardsList"][1] = json!({"data": {}});
        payload["widget"]["data"]["stats"] = json!([{"value": 7}]);
        let row = MonadStatsSchema.row(&WalletRecord::new(Wallet::from("0xAAA"), payload));

        assert_eq!(row[1], "4.5");
        assert_eq!(row[2], "7");
        assert_eq!(row[3], "");
        assert_eq!(row[5], "");
        assert_eq!(row[8], "2023-11-14 22:13:20");
        assert_eq!(row[9], "");
    }

    #[test]
    fn test_raw_text_payload_exports_address_only() {
        let record = WalletRecord::new(
            Wallet::from("0xBBB"),
            json!({"wallet_address": "0xBBB", "response": "<html>"}),
        );
        let row = MonadStatsSchema.row(&record);
        assert_eq!(row.len(), REPORT_HEADERS.len());
        assert_eq!(row[0], "0xBBB");
        assert!(row[1..].iter().all(|c| c.is_empty()));
    }
}
