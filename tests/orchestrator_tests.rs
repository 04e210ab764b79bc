//! Conversational turns against a stubbed agents platform

mod common;

use common::{memory_tracer, orchestrator, StubAgentsClient};
use quip::agent::{ReplyExtractor, TurnOutcome, JOKE_SYSTEM_PROMPT, REPLY_PAGE_SIZE};
use quip::telemetry::genai::{attrs, events};
use quip::telemetry::{with_span, SpanKind, SpanStatus};
use quip::types::{ListOrder, MessageRole, ThreadMessage};
use quip::QuipError;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_new_joke_returns_reply_and_created_thread() {
    let client = Arc::new(StubAgentsClient::completing("Why did..."));
    let orchestrator = orchestrator(Arc::clone(&client));
    let (tracer, exporter) = memory_tracer();

    let outcome = with_span(&tracer, "joke-request", SpanKind::Server, |span| async move {
        orchestrator.new_joke(&span).await
    })
    .await
    .unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Reply {
            text: "Why did...".to_string(),
            thread_id: "t1".to_string(),
        }
    );

    let appended = client.appended.lock().unwrap().clone();
    assert_eq!(
        appended,
        vec![("t1".to_string(), MessageRole::System, JOKE_SYSTEM_PROMPT.to_string())]
    );
    assert_eq!(
        client.runs_started.lock().unwrap().clone(),
        vec![("t1".to_string(), "asst_joke".to_string())]
    );
    assert_eq!(
        client.listings.lock().unwrap().clone(),
        vec![(ListOrder::Desc, REPLY_PAGE_SIZE)]
    );

    tracer.flush().await.unwrap();
    let spans = exporter.spans();
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.status, SpanStatus::Ok);

    let attr = |key: &str| span.attribute(key).cloned();
    assert_eq!(attr(attrs::SYSTEM).unwrap().as_str(), Some("az.ai.agents"));
    assert_eq!(attr(attrs::PROVIDER_NAME).unwrap().as_str(), Some("azure.ai.agents"));
    assert_eq!(attr(attrs::THREAD_ID).unwrap().as_str(), Some("t1"));
    assert_eq!(attr(attrs::AGENT_ID).unwrap().as_str(), Some("asst_joke"));
    assert_eq!(attr(attrs::RUN_ID).unwrap().as_str(), Some("run_1"));
    assert_eq!(attr(attrs::RESPONSE_ID).unwrap().as_str(), Some("t1/run_1"));
    assert_eq!(attr(attrs::USAGE_INPUT_TOKENS).unwrap().as_i64(), Some(10));
    assert_eq!(attr(attrs::USAGE_OUTPUT_TOKENS).unwrap().as_i64(), Some(4));

    let system = span.event(events::SYSTEM_MESSAGE).unwrap();
    let payload: serde_json::Value = serde_json::from_str(
        system.attribute(attrs::EVENT_CONTENT).unwrap().as_str().unwrap(),
    )
    .unwrap();
    assert_eq!(payload, json!({ "message": JOKE_SYSTEM_PROMPT, "role": "system" }));

    let choice = span.event(events::CHOICE).unwrap();
    let payload: serde_json::Value = serde_json::from_str(
        choice.attribute(attrs::EVENT_CONTENT).unwrap().as_str().unwrap(),
    )
    .unwrap();
    assert_eq!(payload, json!({ "message": "Why did...", "role": "assistant" }));
    assert_eq!(choice.attribute(attrs::THREAD_ID).unwrap().as_str(), Some("t1"));
    assert_eq!(choice.attribute(attrs::RUN_ID).unwrap().as_str(), Some("run_1"));
    assert_eq!(choice.attribute(attrs::RESPONSE_ID).unwrap().as_str(), Some("t1/run_1"));

    let system_index = span.events.iter().position(|e| e.name == events::SYSTEM_MESSAGE);
    let choice_index = span.events.iter().position(|e| e.name == events::CHOICE);
    assert!(system_index < choice_index);
}

#[tokio::test]
async fn test_failed_run_is_an_outcome_and_span_stays_ok() {
    let client = Arc::new(StubAgentsClient::failing_run(json!({ "code": "X" })));
    let orchestrator = orchestrator(Arc::clone(&client));
    let (tracer, exporter) = memory_tracer();

    let outcome = with_span(&tracer, "joke-request", SpanKind::Server, |span| async move {
        orchestrator.new_joke(&span).await
    })
    .await
    .unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::RunFailed {
            thread_id: "t1".to_string(),
            run_id: "run_1".to_string(),
            details: json!({ "code": "X" }),
        }
    );
    assert_eq!(client.calls.list_messages.load(Ordering::SeqCst), 0);

    tracer.flush().await.unwrap();
    let spans = exporter.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status, SpanStatus::Ok);
    assert!(spans[0].event(events::CHOICE).is_none());
    assert!(spans[0].event(events::EXCEPTION).is_none());
    assert_eq!(
        spans[0].attribute(attrs::RUN_ID).and_then(|v| v.as_str()),
        Some("run_1")
    );
}

#[tokio::test]
async fn test_remote_unavailable_marks_span_error() {
    let client = Arc::new(StubAgentsClient::unreachable());
    let orchestrator = orchestrator(client);
    let (tracer, exporter) = memory_tracer();

    let result = with_span(&tracer, "joke-request", SpanKind::Server, |span| async move {
        orchestrator.new_joke(&span).await
    })
    .await;

    assert!(matches!(result, Err(QuipError::RemoteUnavailable { .. })));

    tracer.flush().await.unwrap();
    let spans = exporter.spans();
    assert_eq!(spans.len(), 1);
    assert!(matches!(spans[0].status, SpanStatus::Error { .. }));
    let exception = spans[0].event(events::EXCEPTION).unwrap();
    assert_eq!(
        exception.attribute(attrs::EXCEPTION_TYPE).and_then(|v| v.as_str()),
        Some("RemoteUnavailable")
    );
}

#[tokio::test]
async fn test_no_assistant_reply_is_an_error() {
    let mut stub = StubAgentsClient::completing("unused");
    stub.messages = (0..REPLY_PAGE_SIZE)
        .map(|i| ThreadMessage::text(format!("m{}", i), MessageRole::User, "like"))
        .collect();
    let orchestrator = orchestrator(Arc::new(stub));
    let (tracer, exporter) = memory_tracer();

    let result = with_span(&tracer, "joke-request", SpanKind::Server, |span| async move {
        orchestrator.new_joke(&span).await
    })
    .await;

    assert!(matches!(
        result,
        Err(QuipError::NoAssistantReply { ref thread_id }) if thread_id == "t1"
    ));
    tracer.flush().await.unwrap();
    assert!(matches!(exporter.spans()[0].status, SpanStatus::Error { .. }));
}

#[tokio::test]
async fn test_feedback_reuses_thread_and_falls_back_to_joke_agent() {
    let client = Arc::new(StubAgentsClient::completing("A better one"));
    let orchestrator = orchestrator(Arc::clone(&client));
    let (tracer, exporter) = memory_tracer();

    let outcome = with_span(&tracer, "feedback-request", SpanKind::Server, |span| async move {
        orchestrator.feedback(&span, "dislike", "t1").await
    })
    .await
    .unwrap();

    assert_eq!(outcome.thread_id(), "t1");
    assert_eq!(client.calls.create_thread.load(Ordering::SeqCst), 0);

    let appended = client.appended.lock().unwrap().clone();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].0, "t1");
    assert_eq!(appended[0].1, MessageRole::User);
    assert!(appended[0].2.contains("dislike"));
    assert_eq!(
        client.runs_started.lock().unwrap().clone(),
        vec![("t1".to_string(), "asst_joke".to_string())]
    );

    tracer.flush().await.unwrap();
    let span = &exporter.spans()[0];
    assert_eq!(span.name, "feedback-request");
    assert!(span.event(events::USER_MESSAGE).is_some());
    assert!(span.event(events::CHOICE).is_some());
}

#[tokio::test]
async fn test_feedback_uses_distinct_feedback_agent() {
    let client = Arc::new(StubAgentsClient::completing("ok"));
    let mut config = common::agents_config();
    config.feedback_agent_id = Some("asst_feedback".to_string());
    let orchestrator = quip::agent::AgentRunOrchestrator::new(client.clone(), config);

    let span = quip::telemetry::AgentSpan::noop();
    orchestrator.feedback(&span, "like", "t1").await.unwrap();

    assert_eq!(
        client.runs_started.lock().unwrap()[0].1,
        "asst_feedback".to_string()
    );
}

#[tokio::test]
async fn test_feedback_on_unknown_thread() {
    let client = Arc::new(StubAgentsClient::completing("ok"));
    let orchestrator = orchestrator(client);
    let span = quip::telemetry::AgentSpan::noop();

    let result = orchestrator.feedback(&span, "like", "t404").await;

    assert!(matches!(
        result,
        Err(QuipError::InvalidThread { ref thread_id }) if thread_id == "t404"
    ));
}

#[tokio::test]
async fn test_feedback_rejects_missing_input_without_remote_calls() {
    let client = Arc::new(StubAgentsClient::completing("ok"));
    let orchestrator = orchestrator(Arc::clone(&client));
    let span = quip::telemetry::AgentSpan::noop();

    let missing_reaction = orchestrator.feedback(&span, "", "t1").await;
    let missing_thread = orchestrator.feedback(&span, "like", "  ").await;

    assert!(matches!(missing_reaction, Err(QuipError::InvalidInput { .. })));
    assert!(matches!(missing_thread, Err(QuipError::InvalidInput { .. })));
    assert_eq!(client.calls.total(), 0);
}

#[tokio::test]
async fn test_reply_extraction_is_idempotent() {
    let mut stub = StubAgentsClient::completing("unused");
    stub.messages = vec![
        ThreadMessage::text("m5", MessageRole::User, "like"),
        ThreadMessage::text("m4", MessageRole::User, "again"),
        ThreadMessage::text("m3", MessageRole::Assistant, "Knock knock"),
    ];
    let extractor = ReplyExtractor::new(Arc::new(stub));

    let first = extractor.latest_assistant_text("t1").await.unwrap();
    let second = extractor.latest_assistant_text("t1").await.unwrap();

    assert_eq!(first, "Knock knock");
    assert_eq!(first, second);
}
