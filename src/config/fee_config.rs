use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::domain::fees::FeeSchedule;

/// Loads the A-share fee schedule from the environment, falling back to the default
/// commission/stamp-tax/transfer-fee constants when unset.
pub fn fee_schedule_from_env() -> FeeSchedule {
    let default = FeeSchedule::default();
    FeeSchedule {
        commission_rate: env_decimal("FEE_COMMISSION_RATE", default.commission_rate),
        commission_min: env_decimal("FEE_COMMISSION_MIN", default.commission_min),
        stamp_tax_rate: env_decimal("FEE_STAMP_TAX_RATE", default.stamp_tax_rate),
        transfer_fee_rate: env_decimal("FEE_TRANSFER_FEE_RATE", default.transfer_fee_rate),
        transfer_fee_min: env_decimal("FEE_TRANSFER_FEE_MIN", default.transfer_fee_min),
    }
}

fn env_decimal(key: &str, fallback: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| Decimal::from_str(&v).ok())
        .unwrap_or(fallback)
}
