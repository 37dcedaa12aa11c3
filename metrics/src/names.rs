pub const GAUGE_NAMES: [&str; 4] =
    [consensus::OPEN_WINDOWS, p2p::CONNECTED_PEERS, probe::LAST_RESPONSE_TIME_MS, webhooks::INFLIGHT_DELIVERIES];
pub const COUNTER_NAMES: [&str; 6] = [
    reports::ACCEPTED,
    reports::REJECTED,
    consensus::ALERTS_CREATED,
    consensus::WINDOWS_CANCELLED,
    consensus::WINDOWS_AGED_OUT,
    webhooks::DELIVERED,
];
pub const HISTOGRAM_NAMES: [&str; 1] = [probe::CYCLE_DURATION_SECS];

pub mod reports {
    pub const ACCEPTED: &str = "sentinel_reports_accepted_total";
    pub const REJECTED: &str = "sentinel_reports_rejected_total";

    pub mod labels {
        pub const VALIDATOR_ID: &str = "validator_id";
        pub const REASON: &str = "reason";
    }
}

pub mod consensus {
    pub const OPEN_WINDOWS: &str = "sentinel_consensus_open_windows";
    pub const ALERTS_CREATED: &str = "sentinel_consensus_alerts_created_total";
    pub const WINDOWS_CANCELLED: &str = "sentinel_consensus_windows_cancelled_total";
    pub const WINDOWS_AGED_OUT: &str = "sentinel_consensus_windows_aged_out_total";

    pub mod labels {
        pub const VALIDATOR_ID: &str = "validator_id";
    }
}

pub mod probe {
    pub const LAST_RESPONSE_TIME_MS: &str = "sentinel_probe_last_response_time_ms";
    pub const CYCLE_DURATION_SECS: &str = "sentinel_probe_cycle_duration_secs";

    pub mod labels {
        pub const VALIDATOR_ID: &str = "validator_id";
    }
}

pub mod p2p {
    pub const CONNECTED_PEERS: &str = "sentinel_p2p_connected_peers";
}

pub mod webhooks {
    pub const DELIVERED: &str = "sentinel_webhooks_delivered_total";
    pub const INFLIGHT_DELIVERIES: &str = "sentinel_webhooks_inflight_deliveries";

    pub mod labels {
        pub const STATUS: &str = "status";
    }
}
