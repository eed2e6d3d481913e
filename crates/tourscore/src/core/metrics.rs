//! Metrics collection for the bot using Prometheus
//!
//! Tracks command usage and the pending-transaction lifecycle:
//! built → hash relayed → confirmed/failed. Exposed as text on GET /metrics.

use lazy_static::lazy_static;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec, TextEncoder};

lazy_static! {
    /// Commands received, by command name
    pub static ref COMMANDS_TOTAL: CounterVec = register_counter_vec!(
        "empowertours_commands_total",
        "Total number of bot commands received",
        &["command"]
    )
    .unwrap();

    /// Unsigned transactions built, by type
    pub static ref TX_BUILT_TOTAL: CounterVec = register_counter_vec!(
        "empowertours_tx_built_total",
        "Total number of unsigned transactions built",
        &["tx_type"]
    )
    .unwrap();

    /// Receipts observed, by type and status (success/reverted)
    pub static ref TX_CONFIRMED_TOTAL: CounterVec = register_counter_vec!(
        "empowertours_tx_confirmed_total",
        "Total number of transaction receipts observed",
        &["tx_type", "status"]
    )
    .unwrap();

    /// Two-phase flows where the follow-up transaction was re-emitted
    /// after an approval confirmed
    pub static ref APPROVALS_CHAINED_TOTAL: Counter = register_counter!(
        "empowertours_approvals_chained_total",
        "Total number of follow-up transactions emitted after a confirmed approval"
    )
    .unwrap();
}

/// Render the default registry in the Prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_render() {
        COMMANDS_TOTAL.with_label_values(&["start"]).inc();
        TX_BUILT_TOTAL.with_label_values(&["approve"]).inc();
        let text = gather();
        assert!(text.contains("empowertours_commands_total"));
        assert!(text.contains("empowertours_tx_built_total"));
    }
}
