pub mod agent;
pub mod calendar;
pub mod decision;
pub mod decision_log;
pub mod errors;
pub mod fees;
pub mod llm_log;
pub mod market_data;
pub mod order;
pub mod portfolio;
pub mod ports;
pub mod provider;
pub mod quote;
pub mod repositories;
pub mod task;
pub mod template;
pub mod transaction;
