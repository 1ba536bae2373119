//! End-to-end conversation tests against a mock assistant backend

use std::sync::Arc;
use std::time::Duration;

use camplab_core::archive::ConversationArchive;
use camplab_core::config::{ArchiveConfig, GatewayConfig, IdentityConfig};
use camplab_core::gateway::{AssistantGateway, HttpGateway, RetryingGateway};
use camplab_core::{
    Error, KnowledgeBase, LabSession, Persona, RiskLevel, Role, SendOutcome, SendRejected,
    Session, SessionMode,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FUNCTION_PATH: &str = "/functions/v1/lab-ai-coaching";

fn gateway_config(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        endpoint: Some(format!("{}{}", server.uri(), FUNCTION_PATH)),
        api_key: Some("test-key".to_string()),
        timeout_secs: 5,
        max_retries: 0,
    }
}

fn partner_session() -> Session {
    camplab_core::logging::init_test();
    Session::new(
        Persona::Partner,
        Arc::new(KnowledgeBase::builtin().expect("builtin knowledge")),
    )
}

fn lab(server: &MockServer) -> LabSession<HttpGateway> {
    let gateway = HttpGateway::new(&gateway_config(server)).expect("gateway");
    LabSession::new(partner_session(), gateway)
}

fn reply_body(text: &str) -> Value {
    json!({ "response": text })
}

#[tokio::test]
async fn reply_is_parsed_from_data_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "message": "Let's optimize my yield strategy.",
            "context": { "mode": "camp_collaborative_partnership" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "response": "I'm analyzing your current strategy. **Step 1:** rebalance.",
                "analysis": {
                    "riskLevel": "medium",
                    "confidence": 85,
                    "responseType": "strategy"
                },
                "recommendations": ["Diversify across 3 protocols"],
                "followUp": "Shall we draft a plan?"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lab = lab(&server);
    let outcome = lab.send("  Let's optimize my yield strategy.  ").await;

    let SendOutcome::Replied(message) = &outcome else {
        panic!("expected a reply, got {:?}", outcome);
    };
    assert_eq!(message.role, Role::Assistant);
    let analysis = message.analysis.as_ref().expect("analysis");
    assert_eq!(analysis.risk_level, RiskLevel::Medium);
    assert_eq!(analysis.confidence, 85);
    assert_eq!(
        analysis.collaboration_kind.as_deref(),
        Some("active_collaboration")
    );
    assert_eq!(message.follow_up.as_deref(), Some("Shall we draft a plan?"));

    let progress = message.solution_progress.as_ref().expect("progress");
    assert_eq!(progress.phase, "Problem Analysis");
    assert_eq!(progress.progress, 0);
    assert!(progress.artifacts.contains("Strategy Framework"));

    let messages = lab.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].content, "Let's optimize my yield strategy.");
}

#[tokio::test]
async fn bare_reply_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("Plain answer.")))
        .mount(&server)
        .await;

    let lab = lab(&server);
    let outcome = lab.send("hello").await;
    assert_eq!(
        outcome.message().map(|m| m.content.as_str()),
        Some("Plain answer.")
    );
    assert!(matches!(outcome, SendOutcome::Replied(_)));
}

#[tokio::test]
async fn each_round_trip_adds_two_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(reply_body("Let's build this together.")),
        )
        .expect(3)
        .mount(&server)
        .await;

    let lab = lab(&server);
    let mut progress = Vec::new();
    for text in ["one", "two", "three"] {
        let outcome = lab.send(text).await;
        let message = outcome.message().expect("assistant message");
        progress.push(message.solution_progress.as_ref().map(|p| p.progress));
    }

    let messages = lab.messages().await;
    assert_eq!(messages.len(), 1 + 2 * 3);
    assert!(messages.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(progress, vec![Some(0), Some(30), Some(60)]);
    assert_eq!(lab.mode().await, SessionMode::Collaborating);
}

#[tokio::test]
async fn concurrent_send_makes_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(reply_body("First answer."))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let lab = lab(&server);
    let (first, second) = tokio::join!(lab.send("first"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        lab.send("second").await
    });

    assert!(matches!(first, SendOutcome::Replied(_)));
    assert_eq!(second, SendOutcome::Rejected(SendRejected::InFlight));

    let messages = lab.messages().await;
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| m.content != "second"));
}

#[tokio::test]
async fn server_error_becomes_failure_entry_and_session_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("Back online.")))
        .mount(&server)
        .await;

    let lab = lab(&server);

    let failed = lab.send("hello").await;
    let SendOutcome::Failed(message) = &failed else {
        panic!("expected failure entry, got {:?}", failed);
    };
    assert_eq!(message.content, Persona::Partner.failure_content());
    assert_eq!(message.confidence(), Some(0));
    assert!(lab.inspect(|s| !s.is_awaiting_reply()).await);

    let retried = lab.send("hello again").await;
    assert!(matches!(retried, SendOutcome::Replied(_)));
    assert_eq!(lab.messages().await.len(), 5);
}

#[tokio::test]
async fn null_data_is_a_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .mount(&server)
        .await;

    let gateway = HttpGateway::new(&gateway_config(&server)).expect("gateway");
    let err = gateway
        .ask(&partner_session().append_user_message("hi").expect("accepted").request)
        .await
        .expect_err("null data must not decode");
    assert!(matches!(err, Error::Gateway { status: Some(200), .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(reply_body("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = GatewayConfig {
        timeout_secs: 1,
        ..gateway_config(&server)
    };
    let gateway = HttpGateway::new(&config).expect("gateway");
    let err = gateway
        .ask(&partner_session().append_user_message("hi").expect("accepted").request)
        .await
        .expect_err("request should time out");
    assert!(matches!(err, Error::GatewayTimeout(1)));
}

#[tokio::test]
async fn retrying_gateway_recovers_from_transient_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("Recovered.")))
        .mount(&server)
        .await;

    let gateway = RetryingGateway::new(
        HttpGateway::new(&gateway_config(&server)).expect("gateway"),
        2,
    )
    .with_initial_delay(Duration::ZERO);
    let lab = LabSession::new(partner_session(), gateway);

    assert!(matches!(lab.send("hello").await, SendOutcome::Replied(_)));
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = RetryingGateway::new(
        HttpGateway::new(&gateway_config(&server)).expect("gateway"),
        3,
    )
    .with_initial_delay(Duration::ZERO);
    let lab = LabSession::new(partner_session(), gateway);

    assert!(matches!(lab.send("hello").await, SendOutcome::Failed(_)));
}

fn archive_config(server: &MockServer) -> ArchiveConfig {
    ArchiveConfig {
        enabled: true,
        base_url: Some(server.uri()),
        api_key: Some("anon-key".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn completed_exchanges_are_archived() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .and(body_partial_json(json!({ "userId": "u-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("Noted.")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/lab_conversations"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpGateway::new(&gateway_config(&server)).expect("gateway");
    let session = partner_session().with_identity(IdentityConfig {
        user_id: Some("u-1".to_string()),
        wallet_address: None,
    });
    let archive = ConversationArchive::new(&archive_config(&server)).expect("archive");
    let lab = LabSession::new(session, gateway).with_archive(Some(archive));

    assert!(matches!(lab.send("remember this").await, SendOutcome::Replied(_)));
    assert_eq!(lab.archive_stats().saved, 1);

    let requests = server.received_requests().await.expect("recording enabled");
    let archived = requests
        .iter()
        .find(|r| r.url.path() == "/rest/v1/lab_conversations")
        .expect("archive request");
    let rows: Value = serde_json::from_slice(&archived.body).expect("json body");
    assert_eq!(rows[0]["user_id"], "u-1");
    assert_eq!(rows[0]["message"], "remember this");
    assert_eq!(rows[0]["response"], "Noted.");
}

#[tokio::test]
async fn archive_failure_does_not_affect_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("Noted.")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/lab_conversations"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gateway = HttpGateway::new(&gateway_config(&server)).expect("gateway");
    let session = partner_session().with_identity(IdentityConfig {
        user_id: Some("u-1".to_string()),
        wallet_address: None,
    });
    let archive = ConversationArchive::new(&archive_config(&server)).expect("archive");
    let lab = LabSession::new(session, gateway).with_archive(Some(archive));

    assert!(matches!(lab.send("hello").await, SendOutcome::Replied(_)));
    assert_eq!(lab.archive_stats().failed, 1);
    assert_eq!(lab.messages().await.len(), 3);
}

#[tokio::test]
async fn recent_history_is_listed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/lab_conversations"))
        .and(query_param("user_id", "eq.u-1"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "r-2",
                "user_id": "u-1",
                "session_id": "camp-lab-b",
                "message": "second",
                "response": "answer two",
                "created_at": "2026-10-02T10:00:00Z"
            },
            {
                "id": "r-1",
                "user_id": "u-1",
                "session_id": "camp-lab-a",
                "message": "first",
                "response": "answer one",
                "created_at": "2026-10-01T10:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    let archive = ConversationArchive::new(&archive_config(&server)).expect("archive");
    let records = archive.recent("u-1", 2).await.expect("records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].message, "second");
    assert_eq!(records[1].id.as_deref(), Some("r-1"));
    assert!(records[0].created_at > records[1].created_at);
}
