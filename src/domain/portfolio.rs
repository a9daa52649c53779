use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Unique on `(agent_id, stock_code)`. `avg_cost` is the weighted-average cost across all
/// buys into the current holding; `buy_date` is the most recent buy date, for T+1 checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub agent_id: String,
    pub stock_code: String,
    pub shares: u64,
    pub avg_cost: Decimal,
    pub buy_date: NaiveDate,
}

/// Rebuilt from the repository at the start of every decision cycle (never a persistent
/// mutable graph) — cash is authoritative, positions are the non-zero holdings.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub agent_id: String,
    pub cash: Decimal,
    pub positions: HashMap<String, Position>,
}

impl Portfolio {
    pub fn new(agent_id: impl Into<String>, cash: Decimal) -> Self {
        Self {
            agent_id: agent_id.into(),
            cash,
            positions: HashMap::new(),
        }
    }

    pub fn market_value(&self, last_prices: &HashMap<String, Decimal>) -> Decimal {
        self.positions.values().fold(Decimal::ZERO, |acc, p| {
            let price = last_prices
                .get(&p.stock_code)
                .copied()
                .unwrap_or(p.avg_cost);
            acc + price * Decimal::from(p.shares)
        })
    }

    pub fn total_equity(&self, last_prices: &HashMap<String, Decimal>) -> Decimal {
        self.cash + self.market_value(last_prices)
    }

    /// Applies a filled buy: debits cash by `quantity*price + fees` and folds the fill into
    /// the position's weighted-average cost (invariant: new position starts at this cost).
    pub fn apply_buy(
        &mut self,
        stock_code: &str,
        quantity: u64,
        price: Decimal,
        fees: Decimal,
        today: NaiveDate,
    ) {
        let cost = Decimal::from(quantity) * price + fees;
        self.cash -= cost;
        match self.positions.entry(stock_code.to_string()) {
            Entry::Occupied(mut existing) => {
                let pos = existing.get_mut();
                let total_shares = pos.shares + quantity;
                let total_cost = pos.avg_cost * Decimal::from(pos.shares) + cost;
                pos.avg_cost = total_cost / Decimal::from(total_shares);
                pos.shares = total_shares;
                pos.buy_date = today;
            }
            Entry::Vacant(slot) => {
                slot.insert(Position {
                    agent_id: self.agent_id.clone(),
                    stock_code: stock_code.to_string(),
                    shares: quantity,
                    avg_cost: cost / Decimal::from(quantity),
                    buy_date: today,
                });
            }
        }
    }

    /// Applies a filled sell: credits cash by the net proceeds and removes the position once
    /// shares reach zero (a position is never left at zero shares).
    pub fn apply_sell(&mut self, stock_code: &str, quantity: u64, proceeds: Decimal) {
        self.cash += proceeds;
        if let Entry::Occupied(mut existing) = self.positions.entry(stock_code.to_string()) {
            let pos = existing.get_mut();
            pos.shares = pos.shares.saturating_sub(quantity);
            if pos.shares == 0 {
                existing.remove();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn apply_buy_opens_a_new_position_at_fill_plus_fee_cost() {
        let mut portfolio = Portfolio::new("a1", dec!(100000.00));
        portfolio.apply_buy("600000", 100, dec!(10.00), dec!(5.01), date(2026, 1, 5));

        let pos = portfolio.positions.get("600000").unwrap();
        assert_eq!(pos.shares, 100);
        assert_eq!(pos.avg_cost, dec!(10.0501));
        assert_eq!(portfolio.cash, dec!(98994.99));
    }

    #[test]
    fn apply_buy_folds_into_existing_position_as_weighted_average() {
        let mut portfolio = Portfolio::new("a1", dec!(100000.00));
        portfolio.apply_buy("600000", 100, dec!(10.00), dec!(5.00), date(2026, 1, 5));
        portfolio.apply_buy("600000", 100, dec!(12.00), dec!(5.00), date(2026, 1, 6));

        let pos = portfolio.positions.get("600000").unwrap();
        assert_eq!(pos.shares, 200);
        // (100*10.00 + 5.00 + 100*12.00 + 5.00) / 200 = 2210 / 200
        assert_eq!(pos.avg_cost, dec!(11.05));
        assert_eq!(pos.buy_date, date(2026, 1, 6));
    }

    #[test]
    fn apply_sell_deletes_the_position_once_shares_reach_zero() {
        let mut portfolio = Portfolio::new("a1", dec!(0));
        portfolio.positions.insert(
            "600000".to_string(),
            Position {
                agent_id: "a1".into(),
                stock_code: "600000".into(),
                shares: 100,
                avg_cost: dec!(10.00),
                buy_date: date(2026, 1, 5),
            },
        );

        portfolio.apply_sell("600000", 100, dec!(994.99));

        assert!(!portfolio.positions.contains_key("600000"));
        assert_eq!(portfolio.cash, dec!(994.99));
    }

    #[test]
    fn apply_sell_partial_keeps_position_with_unchanged_avg_cost() {
        let mut portfolio = Portfolio::new("a1", dec!(0));
        portfolio.positions.insert(
            "600000".to_string(),
            Position {
                agent_id: "a1".into(),
                stock_code: "600000".into(),
                shares: 200,
                avg_cost: dec!(10.00),
                buy_date: date(2026, 1, 5),
            },
        );

        portfolio.apply_sell("600000", 100, dec!(994.99));

        let pos = portfolio.positions.get("600000").unwrap();
        assert_eq!(pos.shares, 100);
        assert_eq!(pos.avg_cost, dec!(10.00));
    }
}
