use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Buy,
    Sell,
    Hold,
    Wait,
}

/// One item of an LLM's parsed decision list, before validation against market/account rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub decision: DecisionAction,
    #[serde(default)]
    pub stock_code: Option<String>,
    #[serde(default)]
    pub quantity: Option<u64>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub reason: String,
}

/// Parses an LLM response body as a JSON array of decisions, skipping malformed entries.
///
/// The LLM is free-text by nature; one bad item should not discard an otherwise-usable
/// response, so each array element is decoded independently and failures are logged and
/// dropped rather than failing the whole batch.
pub fn parse_decisions(raw: &str) -> Vec<Decision> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(err) => {
            warn!(error = %err, "llm response is not a json array; no decisions parsed");
            return Vec::new();
        }
    };

    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<Decision>(value) {
            Ok(decision) => Some(decision),
            Err(err) => {
                warn!(index, error = %err, "skipping malformed decision item");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_decision_kinds() {
        let raw = r#"[
            {"decision": "buy", "stock_code": "600519", "quantity": 100, "price": 1680.5, "reason": "strong momentum"},
            {"decision": "hold", "reason": "no change warranted"}
        ]"#;

        let decisions = parse_decisions(raw);
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].decision, DecisionAction::Buy);
        assert_eq!(decisions[0].stock_code.as_deref(), Some("600519"));
        assert_eq!(decisions[1].decision, DecisionAction::Hold);
        assert!(decisions[1].stock_code.is_none());
    }

    #[test]
    fn skips_malformed_items_and_keeps_the_rest() {
        let raw = r#"[
            {"decision": "not-a-real-action"},
            {"decision": "wait", "reason": "waiting for confirmation"}
        ]"#;

        let decisions = parse_decisions(raw);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].decision, DecisionAction::Wait);
    }

    #[test]
    fn non_array_response_yields_no_decisions() {
        let decisions = parse_decisions("not json at all");
        assert!(decisions.is_empty());
    }
}
