use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::order::OrderSide;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingFees {
    pub commission: Decimal,
    pub stamp_tax: Decimal,
    pub transfer_fee: Decimal,
}

impl TradingFees {
    pub fn total(&self) -> Decimal {
        self.commission + self.stamp_tax + self.transfer_fee
    }
}

/// A-share simulation fee schedule, per side unless noted.
#[derive(Debug, Clone, Copy)]
pub struct FeeSchedule {
    pub commission_rate: Decimal,
    pub commission_min: Decimal,
    pub stamp_tax_rate: Decimal,
    pub transfer_fee_rate: Decimal,
    pub transfer_fee_min: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            commission_rate: dec!(0.0003),
            commission_min: dec!(5.00),
            stamp_tax_rate: dec!(0.0005),
            transfer_fee_rate: dec!(0.00001),
            transfer_fee_min: dec!(1.00),
        }
    }
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Shanghai-listed codes (prefix 60/68/9) pay the transfer fee; Shenzhen (00/30/20) pays none.
pub fn is_shanghai_listed(stock_code: &str) -> bool {
    stock_code.starts_with("60") || stock_code.starts_with("68") || stock_code.starts_with('9')
}

impl FeeSchedule {
    pub fn compute(
        &self,
        stock_code: &str,
        side: OrderSide,
        quantity: u64,
        price: Decimal,
    ) -> TradingFees {
        let notional = Decimal::from(quantity) * price;
        let commission = round2((notional * self.commission_rate).max(self.commission_min));
        let stamp_tax = if side == OrderSide::Sell {
            round2(notional * self.stamp_tax_rate)
        } else {
            Decimal::ZERO
        };
        let transfer_fee = if is_shanghai_listed(stock_code) {
            round2(notional * self.transfer_fee_rate).max(self.transfer_fee_min)
        } else {
            Decimal::ZERO
        };
        TradingFees {
            commission,
            stamp_tax,
            transfer_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_commission_floors_at_the_minimum_for_small_notional() {
        let schedule = FeeSchedule::default();
        let fees = schedule.compute("600000", OrderSide::Buy, 100, dec!(10.00));
        assert_eq!(fees.commission, dec!(5.00));
        assert_eq!(fees.stamp_tax, Decimal::ZERO);
        assert_eq!(fees.transfer_fee, dec!(1.00));
    }

    #[test]
    fn transfer_fee_floors_at_the_minimum_for_small_notional() {
        let schedule = FeeSchedule::default();
        let fees = schedule.compute("600000", OrderSide::Buy, 100, dec!(10.00));
        assert_eq!(fees.transfer_fee, dec!(1.00));
    }

    #[test]
    fn transfer_fee_scales_above_the_minimum_for_large_notional() {
        let schedule = FeeSchedule::default();
        let fees = schedule.compute("600000", OrderSide::Buy, 10_000, dec!(100.00));
        // notional = 1,000,000; 0.00001 * 1,000,000 = 10.00, above the 1.00 floor
        assert_eq!(fees.transfer_fee, dec!(10.00));
    }

    #[test]
    fn sell_pays_stamp_tax_but_buy_does_not() {
        let schedule = FeeSchedule::default();
        let sell = schedule.compute("600000", OrderSide::Sell, 1000, dec!(20.00));
        let buy = schedule.compute("600000", OrderSide::Buy, 1000, dec!(20.00));
        assert_eq!(sell.stamp_tax, dec!(10.00));
        assert_eq!(buy.stamp_tax, Decimal::ZERO);
    }

    #[test]
    fn shenzhen_listed_symbols_pay_no_transfer_fee() {
        let schedule = FeeSchedule::default();
        let fees = schedule.compute("000001", OrderSide::Buy, 1000, dec!(15.00));
        assert_eq!(fees.transfer_fee, Decimal::ZERO);
    }

    #[test]
    fn commission_scales_above_the_minimum_for_large_notional() {
        let schedule = FeeSchedule::default();
        let fees = schedule.compute("600000", OrderSide::Buy, 10_000, dec!(100.00));
        // notional = 1,000,000; 0.0003 * 1,000,000 = 300.00
        assert_eq!(fees.commission, dec!(300.00));
    }
}
