use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{instrument, warn};

use crate::domain::calendar;
use crate::domain::decision::{Decision, DecisionAction};
use crate::domain::errors::RejectReason;
use crate::domain::fees::FeeSchedule;
use crate::domain::order::{Order, OrderSide};
use crate::domain::portfolio::{Portfolio, Position};
use crate::domain::quote::StockQuote;
use crate::domain::transaction::Transaction;

/// What the caller must do to the position repository after a settled buy/sell; `hold`/`wait`
/// and rejected decisions never touch positions.
pub enum PositionChange {
    None,
    Upsert(Position),
    Delete { agent_id: String, stock_code: String },
}

pub enum Settlement {
    Filled {
        order: Order,
        transaction: Transaction,
        position_change: PositionChange,
    },
    Rejected {
        order: Order,
    },
}

impl Settlement {
    pub fn order(&self) -> &Order {
        match self {
            Settlement::Filled { order, .. } => order,
            Settlement::Rejected { order } => order,
        }
    }
}

/// Validation + settlement state machine for one parsed `Decision` against one agent's
/// in-memory `Portfolio`. `hold`/`wait` bypass validation entirely and settle as a synthetic
/// filled order with no portfolio mutation.
pub struct OrderProcessor {
    fees: FeeSchedule,
}

impl OrderProcessor {
    pub fn new(fees: FeeSchedule) -> Self {
        Self { fees }
    }

    /// `latest_quote` is the most recent daily row for `decision.stock_code`, used for the
    /// price-band check; `enforce_trading_hours` lets a manual trigger bypass the trading-time
    /// gate while a scheduled run does not.
    #[instrument(skip(self, portfolio, latest_quote, decision), fields(agent_id = %agent_id))]
    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &self,
        agent_id: &str,
        decision: &Decision,
        portfolio: &mut Portfolio,
        latest_quote: Option<&StockQuote>,
        enforce_trading_hours: bool,
        now: DateTime<Utc>,
        today: NaiveDate,
        llm_request_log_id: Option<i64>,
    ) -> Settlement {
        match decision.decision {
            DecisionAction::Hold | DecisionAction::Wait => {
                let order =
                    Order::synthetic_hold(agent_id, decision.reason.clone(), llm_request_log_id, now);
                let transaction =
                    Transaction::synthetic_hold(order.order_id.clone(), agent_id, now);
                Settlement::Filled {
                    order,
                    transaction,
                    position_change: PositionChange::None,
                }
            }
            DecisionAction::Buy => self.process_trade(
                agent_id,
                OrderSide::Buy,
                decision,
                portfolio,
                latest_quote,
                enforce_trading_hours,
                now,
                today,
                llm_request_log_id,
            ),
            DecisionAction::Sell => self.process_trade(
                agent_id,
                OrderSide::Sell,
                decision,
                portfolio,
                latest_quote,
                enforce_trading_hours,
                now,
                today,
                llm_request_log_id,
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_trade(
        &self,
        agent_id: &str,
        side: OrderSide,
        decision: &Decision,
        portfolio: &mut Portfolio,
        latest_quote: Option<&StockQuote>,
        enforce_trading_hours: bool,
        now: DateTime<Utc>,
        today: NaiveDate,
        llm_request_log_id: Option<i64>,
    ) -> Settlement {
        let raw_stock_code = decision.stock_code.clone();
        let raw_price = decision.price;
        let raw_quantity = decision.quantity;

        macro_rules! reject {
            ($code:expr, $qty:expr, $px:expr, $reason:expr) => {
                return Settlement::Rejected {
                    order: Order::rejected(
                        agent_id,
                        side,
                        $code,
                        $qty,
                        $px,
                        decision.reason.clone(),
                        $reason,
                        llm_request_log_id,
                        now,
                    ),
                }
            };
        }

        // 1. field presence
        let (Some(stock_code), Some(mut quantity), Some(price)) =
            (raw_stock_code.clone(), raw_quantity, raw_price)
        else {
            reject!(raw_stock_code, raw_quantity, raw_price, RejectReason::LotSizeZero);
        };
        if quantity == 0 || price <= Decimal::ZERO {
            reject!(Some(stock_code), Some(quantity), Some(price), RejectReason::LotSizeZero);
        }

        // 2. lot rounding (buy only)
        if side == OrderSide::Buy {
            quantity -= quantity % 100;
            if quantity == 0 {
                reject!(Some(stock_code), Some(quantity), Some(price), RejectReason::LotSizeZero);
            }
        }

        // 3. trading time
        if enforce_trading_hours {
            let local = calendar::now_shanghai();
            let within_hours = calendar::is_trading_day(today)
                && calendar::is_within_trading_hours(local.time());
            if !within_hours {
                reject!(
                    Some(stock_code),
                    Some(quantity),
                    Some(price),
                    RejectReason::MarketClosed
                );
            }
        }

        // 4. price band
        let Some(quote) = latest_quote else {
            reject!(
                Some(stock_code),
                Some(quantity),
                Some(price),
                RejectReason::PriceOutOfBand
            );
        };
        let band = (price - quote.prev_close).abs() / quote.prev_close;
        if band > Decimal::new(10, 2) {
            reject!(
                Some(stock_code),
                Some(quantity),
                Some(price),
                RejectReason::PriceOutOfBand
            );
        }

        // 5. T+1 / shares (sell only)
        let existing_position = portfolio.positions.get(&stock_code).cloned();
        if side == OrderSide::Sell {
            match &existing_position {
                Some(position) if position.buy_date < today => {
                    if quantity > position.shares {
                        reject!(
                            Some(stock_code),
                            Some(quantity),
                            Some(price),
                            RejectReason::InsufficientShares
                        );
                    }
                }
                _ => reject!(
                    Some(stock_code),
                    Some(quantity),
                    Some(price),
                    RejectReason::T1Violation
                ),
            }
        }

        // 6. fees / cash
        let fees = self.fees.compute(&stock_code, side, quantity, price);
        let notional = Decimal::from(quantity) * price;
        match side {
            OrderSide::Buy => {
                if portfolio.cash < notional + fees.total() {
                    reject!(
                        Some(stock_code),
                        Some(quantity),
                        Some(price),
                        RejectReason::InsufficientCash
                    );
                }
            }
            OrderSide::Sell => {
                if notional < fees.total() {
                    reject!(
                        Some(stock_code),
                        Some(quantity),
                        Some(price),
                        RejectReason::FeesExceedProceeds
                    );
                }
            }
            OrderSide::Hold => unreachable!("hold/wait never reaches process_trade"),
        }

        // settle
        let order = Order::filled(
            agent_id,
            side,
            stock_code.clone(),
            quantity,
            price,
            decision.reason.clone(),
            llm_request_log_id,
            now,
        );
        let transaction = Transaction::filled(
            order.order_id.clone(),
            agent_id,
            stock_code.clone(),
            side,
            quantity,
            price,
            fees,
            now,
        );

        let position_change = match side {
            OrderSide::Buy => {
                portfolio.apply_buy(&stock_code, quantity, price, fees.total(), today);
                let position = portfolio
                    .positions
                    .get(&stock_code)
                    .cloned()
                    .expect("apply_buy always leaves a position behind");
                PositionChange::Upsert(position)
            }
            OrderSide::Sell => {
                let proceeds = notional - fees.total();
                portfolio.apply_sell(&stock_code, quantity, proceeds);
                match portfolio.positions.get(&stock_code) {
                    Some(position) => PositionChange::Upsert(position.clone()),
                    None => PositionChange::Delete {
                        agent_id: agent_id.to_string(),
                        stock_code: stock_code.clone(),
                    },
                }
            }
            OrderSide::Hold => unreachable!("hold/wait never reaches process_trade"),
        };

        Settlement::Filled {
            order,
            transaction,
            position_change,
        }
    }
}

/// Logs and drops a `Decision` that failed to make it through processing for a reason outside
/// the order state machine (e.g. an agent-manager level error before settlement was attempted).
pub fn log_skip(agent_id: &str, reason: &str) {
    warn!(agent_id, reason, "skipping decision");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn quote(prev_close: Decimal) -> StockQuote {
        StockQuote {
            stock_code: "600000".into(),
            trade_date: date(2026, 1, 5),
            open: prev_close,
            high: prev_close,
            low: prev_close,
            close: prev_close,
            prev_close,
            volume: 1_000_000,
            amount: dec!(10_000_000),
            stock_name: None,
        }
    }

    fn buy_decision(stock_code: &str, quantity: u64, price: Decimal) -> Decision {
        Decision {
            decision: DecisionAction::Buy,
            stock_code: Some(stock_code.to_string()),
            quantity: Some(quantity),
            price: Some(price),
            reason: "test".into(),
        }
    }

    #[test]
    fn buy_within_rules_fills_and_debits_cash() {
        let processor = OrderProcessor::new(FeeSchedule::default());
        let mut portfolio = Portfolio::new("a1", dec!(100000.00));
        let decision = buy_decision("600000", 100, dec!(10.00));
        let q = quote(dec!(10.00));

        let settlement = processor.process(
            "a1",
            &decision,
            &mut portfolio,
            Some(&q),
            false,
            Utc::now(),
            date(2026, 1, 5),
            None,
        );

        match settlement {
            Settlement::Filled { order, .. } => {
                assert!(order.status == crate::domain::order::OrderStatus::Filled);
            }
            Settlement::Rejected { order } => panic!("unexpected rejection: {:?}", order.reject_reason),
        }
        assert_eq!(portfolio.cash, dec!(98994.00));
        let pos = portfolio.positions.get("600000").unwrap();
        assert_eq!(pos.shares, 100);
    }

    #[test]
    fn lot_size_rounds_down_to_nearest_hundred() {
        let processor = OrderProcessor::new(FeeSchedule::default());
        let mut portfolio = Portfolio::new("a1", dec!(100000.00));
        let decision = buy_decision("600000", 150, dec!(15.00));
        let q = quote(dec!(15.00));

        let settlement = processor.process(
            "a1", &decision, &mut portfolio, Some(&q), false, Utc::now(), date(2026, 1, 5), None,
        );

        match settlement {
            Settlement::Filled { order, .. } => assert_eq!(order.quantity, Some(100)),
            Settlement::Rejected { order } => panic!("unexpected rejection: {:?}", order.reject_reason),
        }
    }

    #[test]
    fn same_day_position_rejects_sell_under_t_plus_one() {
        let processor = OrderProcessor::new(FeeSchedule::default());
        let mut portfolio = Portfolio::new("a1", dec!(0));
        portfolio.positions.insert(
            "000001".into(),
            Position {
                agent_id: "a1".into(),
                stock_code: "000001".into(),
                shares: 200,
                avg_cost: dec!(15.00),
                buy_date: date(2026, 1, 5),
            },
        );
        let decision = Decision {
            decision: DecisionAction::Sell,
            stock_code: Some("000001".into()),
            quantity: Some(100),
            price: Some(dec!(15.00)),
            reason: "test".into(),
        };
        let q = quote(dec!(15.00));

        let settlement = processor.process(
            "a1", &decision, &mut portfolio, Some(&q), false, Utc::now(), date(2026, 1, 5), None,
        );

        match settlement {
            Settlement::Rejected { order } => {
                assert_eq!(order.reject_reason, Some(RejectReason::T1Violation));
            }
            Settlement::Filled { .. } => panic!("expected rejection"),
        }
        assert_eq!(portfolio.cash, dec!(0));
    }

    #[test]
    fn price_outside_band_is_rejected() {
        let processor = OrderProcessor::new(FeeSchedule::default());
        let mut portfolio = Portfolio::new("a1", dec!(100000.00));
        let decision = buy_decision("600000", 100, dec!(11.05));
        let q = quote(dec!(10.00));

        let settlement = processor.process(
            "a1", &decision, &mut portfolio, Some(&q), false, Utc::now(), date(2026, 1, 5), None,
        );

        match settlement {
            Settlement::Rejected { order } => {
                assert_eq!(order.reject_reason, Some(RejectReason::PriceOutOfBand));
            }
            Settlement::Filled { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn hold_produces_a_synthetic_filled_order_with_no_mutation() {
        let processor = OrderProcessor::new(FeeSchedule::default());
        let mut portfolio = Portfolio::new("a1", dec!(100000.00));
        let decision = Decision {
            decision: DecisionAction::Hold,
            stock_code: None,
            quantity: None,
            price: None,
            reason: "no clear signal".into(),
        };

        let settlement = processor.process(
            "a1", &decision, &mut portfolio, None, false, Utc::now(), date(2026, 1, 5), None,
        );

        match settlement {
            Settlement::Filled { order, transaction, .. } => {
                assert!(order.stock_code.is_none());
                assert!(transaction.stock_code.is_none());
                assert_eq!(transaction.fees.total(), Decimal::ZERO);
            }
            Settlement::Rejected { .. } => panic!("hold must not reject"),
        }
        assert_eq!(portfolio.cash, dec!(100000.00));
    }
}
