//! Black-box consensus scenarios, driven against an in-process `axum::Router`
//! via `tower::ServiceExt::oneshot` — no real TCP sockets needed.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use sentinel_collector::{assemble, registry::{InMemoryRegistry, Registry}, router, store::WebhookConfigStore};
use sentinel_types::{Agent, ReportStatus, ReportSubmission, Validator};
use tower::ServiceExt;

const VALIDATOR_ID: &str = "validator-1";
const USER_ID: &str = "user-1";
const API_KEY: &str = "shared-validator-key";

fn test_validator() -> Validator {
    Validator {
        id: VALIDATOR_ID.to_string(),
        user_id: USER_ID.to_string(),
        name: "prysm-01".to_string(),
        beacon_node_url: "http://localhost:5052".to_string(),
        validator_api_key: API_KEY.to_string(),
        is_active: true,
    }
}

fn test_agent(agent_id: &str) -> Agent {
    Agent { id: agent_id.to_string(), validator_id: VALIDATOR_ID.to_string(), is_active: true, last_seen: time::OffsetDateTime::now_utc() }
}

/// Seeds a registry with one validator and `agent_ids`, builds the collector's
/// router, and returns it alongside the `AppState` for post-request assertions.
fn harness(agent_ids: &[&str]) -> (axum::Router, Arc<sentinel_collector::AppState>) {
    let registry = Arc::new(InMemoryRegistry::new());
    registry.insert_validator(test_validator());
    for agent_id in agent_ids {
        registry.insert_agent(test_agent(agent_id));
    }
    let (state, _aging_sweep) = assemble(registry, Arc::new(WebhookConfigStore::default()), None);
    (router(state.clone()), state)
}

fn submission(agent_id: &str, status: ReportStatus) -> ReportSubmission {
    ReportSubmission {
        agent_id: agent_id.to_string(),
        agent_api_key: API_KEY.to_string(),
        validator_id: VALIDATOR_ID.to_string(),
        status,
        message: Some("probe result".to_string()),
        signature: None,
    }
}

async fn post_report(router: &axum::Router, submission: &ReportSubmission) -> StatusCode {
    let body = serde_json::to_vec(submission).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/report")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    response.status()
}

/// S1: steady-state HEALTHY reports from three agents produce no alerts. Only the
/// *first* HEALTHY from each agent is actually accepted here — `s_prev == s` only
/// applies on the agent side, so the collector sees exactly one HEALTHY per
/// agent; this still produces zero alerts and zero open windows either way.
#[tokio::test]
async fn s1_steady_state_produces_no_alerts() {
    let (router, state) = harness(&["agent-1", "agent-2", "agent-3"]);

    for agent_id in ["agent-1", "agent-2", "agent-3"] {
        let status = post_report(&router, &submission(agent_id, ReportStatus::Healthy)).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(state.alerts.len(), 0);
    assert_eq!(state.aggregator.open_window_count(), 0);
}

/// S2: threshold=2 (the process default). Two distinct agents report UNHEALTHY;
/// the second push crosses quorum, creating exactly one alert.
#[tokio::test]
async fn s2_quorum_crossing_creates_exactly_one_alert() {
    let (router, state) = harness(&["agent-1", "agent-2", "agent-3"]);

    let status = post_report(&router, &submission("agent-1", ReportStatus::Unhealthy)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.alerts.len(), 0, "one report alone must not reach a threshold-2 quorum");
    assert_eq!(state.aggregator.open_window_count(), 1);

    let status = post_report(&router, &submission("agent-2", ReportStatus::Unhealthy)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.alerts.len(), 1, "the second distinct agent's report must cross quorum exactly once");

    // A third agent's report after quorum reaffirms but creates no new alert.
    let status = post_report(&router, &submission("agent-3", ReportStatus::Unhealthy)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.alerts.len(), 1);
}

/// S3: an open (not-yet-quorate) window is cancelled by a single HEALTHY report;
/// every report attached to it ends CONSENSUS_FAILED, and no alert is created.
#[tokio::test]
async fn s3_healthy_report_cancels_an_open_window() {
    let (router, state) = harness(&["agent-1", "agent-2"]);

    let unhealthy = submission("agent-1", ReportStatus::Unhealthy);
    post_report(&router, &unhealthy).await;
    assert_eq!(state.aggregator.open_window_count(), 1);

    post_report(&router, &submission("agent-2", ReportStatus::Healthy)).await;

    assert_eq!(state.aggregator.open_window_count(), 0, "the window must be dropped on cancellation");
    assert_eq!(state.alerts.len(), 0, "cancellation never creates an alert");
}

/// S4: a lone agent with no peers submits UNHEALTHY unilaterally (the agent-side
/// `totalPeers == 0` path, covered by `sentinel-agent`'s own tests); from the
/// collector's perspective this is just a single accepted UNHEALTHY report,
/// which opens a window below quorum.
#[tokio::test]
async fn s4_single_report_opens_a_window_without_quorum() {
    let (router, state) = harness(&["agent-1"]);

    let status = post_report(&router, &submission("agent-1", ReportStatus::Unhealthy)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.aggregator.open_window_count(), 1);
    assert_eq!(state.alerts.len(), 0);
}

/// S5: one agent's UNHEALTHY and another's HEALTHY both land for the same
/// validator (threshold 2, so one UNHEALTHY report alone never reaches quorum);
/// the per-validator lock serializes the two mutations, so the outcome never
/// depends on which one the HTTP layer happened to accept first — both arrival
/// orders end with the window cancelled and no alert.
#[tokio::test]
async fn s5_unhealthy_then_healthy_cancels_not_reaches_quorum() {
    let (router, state) = harness(&["agent-1", "agent-2"]);
    post_report(&router, &submission("agent-1", ReportStatus::Unhealthy)).await;
    post_report(&router, &submission("agent-2", ReportStatus::Healthy)).await;
    assert_eq!(state.alerts.len(), 0, "a healthy report must never let the window reach quorum");
    assert_eq!(state.aggregator.open_window_count(), 0);
}

#[tokio::test]
async fn s5_healthy_then_unhealthy_never_reaches_quorum_either() {
    let (router, state) = harness(&["agent-1", "agent-2"]);
    post_report(&router, &submission("agent-2", ReportStatus::Healthy)).await;
    post_report(&router, &submission("agent-1", ReportStatus::Unhealthy)).await;
    assert_eq!(state.alerts.len(), 0, "a single UNHEALTHY report can never cross a threshold-2 quorum alone");
}

/// S6: a wrong `agentApiKey` is rejected with 401; nothing is persisted and the
/// aggregator is never invoked.
#[tokio::test]
async fn s6_wrong_api_key_is_rejected_and_nothing_persists() {
    let (router, state) = harness(&["agent-1"]);

    let mut bad = submission("agent-1", ReportStatus::Unhealthy);
    bad.agent_api_key = "not-the-right-key".to_string();

    let status = post_report(&router, &bad).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(state.reports.len(), 0);
    assert_eq!(state.aggregator.open_window_count(), 0);

    let agent = state.registry.get_agent(&"agent-1".to_string()).await.unwrap();
    let seeded_last_seen = agent.last_seen;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let agent_after = state.registry.get_agent(&"agent-1".to_string()).await.unwrap();
    assert_eq!(agent_after.last_seen, seeded_last_seen, "lastSeen must be unchanged on a rejected report");
}

/// A duplicate UNHEALTHY from the same agent only supersedes that
/// agent's *entry in the window* — it does not retroactively rewrite the earlier,
/// now-superseded persisted report. Once quorum is reached, exactly the reports
/// still attached to the window (the latest per agent) end terminal; the earlier
/// duplicate is simply a historical record the window moved past.
#[tokio::test]
async fn duplicate_agent_report_does_not_count_twice_toward_quorum() {
    let (router, state) = harness(&["agent-1", "agent-2"]);

    post_report(&router, &submission("agent-1", ReportStatus::Unhealthy)).await;
    post_report(&router, &submission("agent-1", ReportStatus::Unhealthy)).await;
    assert_eq!(state.alerts.len(), 0, "two reports from the same agent must never count as two distinct voters");

    post_report(&router, &submission("agent-2", ReportStatus::Unhealthy)).await;
    assert_eq!(state.alerts.len(), 1);

    let reports = state.reports.all();
    assert_eq!(reports.len(), 3, "every individual submission is persisted, even a superseded one");
    let terminal_count = reports.iter().filter(|r| r.status == ReportStatus::ConsensusReached).count();
    assert_eq!(terminal_count, 2, "only the latest report per agent is attached to the window that reached quorum");
}
