use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::domain::quote::StockQuote;
use crate::domain::repositories::TemplateRepository;
use crate::domain::template::PromptTemplate;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("template is not valid: {0}")]
    InvalidTemplate(String),
    #[error("missing required placeholder: {0}")]
    MissingPlaceholder(String),
}

/// The fixed placeholder vocabulary a template may reference. Grouped by category purely for
/// `list_placeholders()`-style introspection; substitution treats every name identically.
pub const PLACEHOLDER_CATALOG: &[(&str, &str)] = &[
    ("cash", "account"),
    ("market_value", "account"),
    ("return_rate", "account"),
    ("positions", "account"),
    ("ma", "technical"),
    ("macd", "technical"),
    ("kdj", "technical"),
    ("rsi", "technical"),
    ("boll", "technical"),
    ("individual_flow", "capital_flow"),
    ("flow_ranking", "capital_flow"),
    ("north_bound_flow", "capital_flow"),
    ("financial_metrics", "fundamentals"),
    ("balance_sheet", "fundamentals"),
    ("cash_flow_statement", "fundamentals"),
    ("news_sentiment", "sentiment"),
    ("market_sentiment", "sentiment"),
    ("sentiment_score", "sentiment"),
    ("quote_history", "history"),
    ("decision_history", "history"),
    ("stock_list", "overview"),
    ("market_overview", "overview"),
    ("sector_flow", "overview"),
    ("hot_stocks", "overview"),
    ("limit_up_down", "overview"),
    ("current_time", "system_time"),
    ("current_date", "system_time"),
    ("current_weekday", "system_time"),
    ("is_trading_day", "system_time"),
    ("hot_stocks_quotes", "derived"),
    ("positions_quotes", "derived"),
];

/// Syntax check only: unclosed `{{`, a stray `}}`, or an empty `{{}}` fail. Whether a named
/// placeholder exists in `PLACEHOLDER_CATALOG` is not enforced here — templates may carry
/// caller-supplied context keys the catalog doesn't know about.
pub fn validate_template(content: &str) -> Result<(), PromptError> {
    let mut rest = content;
    loop {
        match rest.find("{{") {
            None => {
                if rest.contains("}}") {
                    return Err(PromptError::InvalidTemplate("unmatched `}}`".to_string()));
                }
                return Ok(());
            }
            Some(start) => {
                let after = &rest[start + 2..];
                match after.find("}}") {
                    None => return Err(PromptError::InvalidTemplate("unclosed `{{`".to_string())),
                    Some(end) => {
                        let name = after[..end].trim();
                        if name.is_empty() {
                            return Err(PromptError::InvalidTemplate("empty placeholder name".to_string()));
                        }
                        rest = &after[end + 2..];
                    }
                }
            }
        }
    }
}

/// Substitutes every `{{name}}` marker in `template.content` from `context`. A missing key
/// renders as an empty string unless `template.strict`, in which case it fails the render.
pub fn render(template: &PromptTemplate, context: &HashMap<String, String>) -> Result<String, PromptError> {
    validate_template(&template.content)?;

    let mut output = String::with_capacity(template.content.len());
    let mut rest = template.content.as_str();
    loop {
        match rest.find("{{") {
            None => {
                output.push_str(rest);
                return Ok(output);
            }
            Some(start) => {
                output.push_str(&rest[..start]);
                let after = &rest[start + 2..];
                let end = after.find("}}").expect("validate_template already confirmed a closing marker");
                let name = after[..end].trim();
                match context.get(name) {
                    Some(value) => output.push_str(value),
                    None if template.strict => return Err(PromptError::MissingPlaceholder(name.to_string())),
                    None => {
                        warn!(placeholder = name, template_id = %template.template_id, "missing placeholder rendered empty");
                    }
                }
                rest = &after[end + 2..];
            }
        }
    }
}

/// One held stock's history for the `positions_quotes` Markdown block.
pub struct PositionHistory {
    pub stock_code: String,
    pub stock_name: String,
    pub shares: u64,
    pub avg_cost: Decimal,
    pub rows: Vec<StockQuote>,
}

/// One hot-list stock's history for the `hot_stocks_quotes` Markdown block.
pub struct HotStockHistory {
    pub stock_code: String,
    pub stock_name: String,
    pub rows: Vec<StockQuote>,
}

fn format_price(value: Decimal) -> String {
    format!("{:.2}", value)
}

fn format_change_pct(value: Decimal) -> String {
    if value >= Decimal::ZERO {
        format!("+{:.2}%", value)
    } else {
        format!("{:.2}%", value)
    }
}

fn format_volume_wan_shou(shares: u64) -> String {
    format!("{:.1}", Decimal::from(shares) / Decimal::from(10_000))
}

fn ascending_tail(rows: &[StockQuote], n: usize) -> Vec<&StockQuote> {
    let mut sorted: Vec<&StockQuote> = rows.iter().collect();
    sorted.sort_by_key(|q| q.trade_date);
    let skip = sorted.len().saturating_sub(n);
    sorted.into_iter().skip(skip).collect()
}

/// Up to 20 symbols, most recent 3 daily rows each, ascending by date.
pub fn format_hot_stocks_quotes(stocks: &[HotStockHistory]) -> String {
    let mut out = String::from("## 热门股票近3日行情\n");
    out.push_str("| 股票代码 | 股票名称 | 日期 | 开盘 | 最高 | 最低 | 收盘 | 涨跌幅 | 成交量(万手) |\n");
    out.push_str("|---|---|---|---|---|---|---|---|---|\n");
    for stock in stocks.iter().take(20) {
        for row in ascending_tail(&stock.rows, 3) {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                stock.stock_code,
                stock.stock_name,
                row.trade_date,
                format_price(row.open),
                format_price(row.high),
                format_price(row.low),
                format_price(row.close),
                format_change_pct(row.change_pct()),
                format_volume_wan_shou(row.volume),
            ));
        }
    }
    out
}

/// One `###` section per held stock, up to 30 daily rows ascending.
pub fn format_positions_quotes(positions: &[PositionHistory]) -> String {
    let mut out = String::new();
    for position in positions {
        out.push_str(&format!("### {} {}\n", position.stock_code, position.stock_name));
        out.push_str(&format!(
            "持仓: {}股, 成本价: {}\n",
            position.shares,
            format_price(position.avg_cost)
        ));
        out.push_str("| 日期 | 开盘 | 最高 | 最低 | 收盘 | 涨跌幅 | 成交量(万手) |\n");
        out.push_str("|---|---|---|---|---|---|---|\n");
        for row in ascending_tail(&position.rows, 30) {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                row.trade_date,
                format_price(row.open),
                format_price(row.high),
                format_price(row.low),
                format_price(row.close),
                format_change_pct(row.change_pct()),
                format_volume_wan_shou(row.volume),
            ));
        }
    }
    out
}

/// Template CRUD, delegating persistence to `TemplateRepository` and enforcing
/// `validate_template` on every write.
pub struct PromptManager {
    templates: Arc<dyn TemplateRepository>,
}

impl PromptManager {
    pub fn new(templates: Arc<dyn TemplateRepository>) -> Self {
        Self { templates }
    }

    pub async fn get(&self, template_id: &str) -> Result<Option<PromptTemplate>> {
        self.templates.get(template_id).await
    }

    pub async fn list(&self) -> Result<Vec<PromptTemplate>> {
        self.templates.list().await
    }

    pub async fn save(&self, template: &PromptTemplate) -> Result<()> {
        validate_template(&template.content)?;
        self.templates.save(template).await
    }

    pub async fn delete(&self, template_id: &str) -> Result<()> {
        self.templates.delete(template_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn validate_template_rejects_unclosed_marker() {
        assert_eq!(
            validate_template("hello {{cash"),
            Err(PromptError::InvalidTemplate("unclosed `{{`".to_string()))
        );
    }

    #[test]
    fn validate_template_rejects_empty_name() {
        assert_eq!(
            validate_template("hello {{}}"),
            Err(PromptError::InvalidTemplate("empty placeholder name".to_string()))
        );
    }

    #[test]
    fn validate_template_accepts_well_formed_markers() {
        assert!(validate_template("cash is {{cash}}, date is {{current_date}}").is_ok());
    }

    fn template(content: &str, strict: bool) -> PromptTemplate {
        PromptTemplate {
            template_id: "t1".into(),
            name: "test".into(),
            content: content.to_string(),
            strict,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn render_substitutes_known_placeholders() {
        let t = template("cash: {{cash}}", false);
        let mut ctx = HashMap::new();
        ctx.insert("cash".to_string(), "100000.00".to_string());
        assert_eq!(render(&t, &ctx).unwrap(), "cash: 100000.00");
    }

    #[test]
    fn render_leaves_missing_placeholder_empty_when_not_strict() {
        let t = template("cash: {{cash}}", false);
        let ctx = HashMap::new();
        assert_eq!(render(&t, &ctx).unwrap(), "cash: ");
    }

    #[test]
    fn render_fails_on_missing_placeholder_when_strict() {
        let t = template("cash: {{cash}}", true);
        let ctx = HashMap::new();
        assert_eq!(render(&t, &ctx), Err(PromptError::MissingPlaceholder("cash".to_string())));
    }

    #[test]
    fn hot_stocks_quotes_keeps_only_the_three_most_recent_rows_ascending() {
        let rows = vec![
            StockQuote {
                stock_code: "600519".into(),
                trade_date: date(2026, 1, 2),
                open: dec!(1) , high: dec!(1), low: dec!(1), close: dec!(1), prev_close: dec!(1),
                volume: 100_000, amount: dec!(1), stock_name: None,
            },
            StockQuote {
                stock_code: "600519".into(),
                trade_date: date(2026, 1, 5),
                open: dec!(1680.0), high: dec!(1700.0), low: dec!(1670.0), close: dec!(1690.0),
                prev_close: dec!(1680.0), volume: 200_000, amount: dec!(1), stock_name: None,
            },
            StockQuote {
                stock_code: "600519".into(),
                trade_date: date(2026, 1, 6),
                open: dec!(1690.0), high: dec!(1710.0), low: dec!(1680.0), close: dec!(1700.0),
                prev_close: dec!(1690.0), volume: 150_000, amount: dec!(1), stock_name: None,
            },
            StockQuote {
                stock_code: "600519".into(),
                trade_date: date(2026, 1, 7),
                open: dec!(1700.0), high: dec!(1720.0), low: dec!(1690.0), close: dec!(1715.0),
                prev_close: dec!(1700.0), volume: 180_000, amount: dec!(1), stock_name: None,
            },
        ];
        let history = vec![HotStockHistory {
            stock_code: "600519".into(),
            stock_name: "贵州茅台".into(),
            rows,
        }];

        let rendered = format_hot_stocks_quotes(&history);
        assert!(rendered.contains("2026-01-05"));
        assert!(rendered.contains("2026-01-06"));
        assert!(rendered.contains("2026-01-07"));
        assert!(!rendered.contains("2026-01-02"));
    }
}
