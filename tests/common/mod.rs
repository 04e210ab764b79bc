//! Shared test doubles for the agents platform

#![allow(dead_code)]

use async_trait::async_trait;
use quip::agent::AgentRunOrchestrator;
use quip::config::AgentsConfig;
use quip::remote::AgentsClient;
use quip::telemetry::{AgentTracer, InMemoryExporter};
use quip::types::{
    AgentDescriptor, ListOrder, MessagePage, MessageRole, Run, RunStatus, RunUsage, ThreadHandle,
    ThreadMessage,
};
use quip::{QuipError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Per-operation call counters
#[derive(Debug, Default)]
pub struct CallCounts {
    pub get_agent: AtomicUsize,
    pub create_thread: AtomicUsize,
    pub create_message: AtomicUsize,
    pub create_and_poll_run: AtomicUsize,
    pub list_messages: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.get_agent.load(Ordering::SeqCst)
            + self.create_thread.load(Ordering::SeqCst)
            + self.create_message.load(Ordering::SeqCst)
            + self.create_and_poll_run.load(Ordering::SeqCst)
            + self.list_messages.load(Ordering::SeqCst)
    }
}

/// Scripted agents platform
pub struct StubAgentsClient {
    pub thread_id: String,
    pub run: Run,
    pub messages: Vec<ThreadMessage>,
    /// Error returned by every call, when set
    pub failure: Option<QuipError>,
    /// Thread ids the platform knows besides `thread_id`
    pub known_threads: Vec<String>,
    pub calls: CallCounts,
    /// (thread id, role, text) of every appended message
    pub appended: Mutex<Vec<(String, MessageRole, String)>>,
    /// (thread id, agent id) of every run
    pub runs_started: Mutex<Vec<(String, String)>>,
    /// (order, limit) of every listing
    pub listings: Mutex<Vec<(ListOrder, usize)>>,
}

impl StubAgentsClient {
    /// Platform that creates thread `t1` and completes runs with a reply
    pub fn completing(reply: &str) -> Self {
        Self {
            thread_id: "t1".to_string(),
            run: run("run_1", RunStatus::Completed, Some((10, 4)), None),
            messages: vec![ThreadMessage::text("msg_2", MessageRole::Assistant, reply)],
            failure: None,
            known_threads: Vec::new(),
            calls: CallCounts::default(),
            appended: Mutex::new(Vec::new()),
            runs_started: Mutex::new(Vec::new()),
            listings: Mutex::new(Vec::new()),
        }
    }

    /// Platform whose runs end in `failed` with the given detail
    pub fn failing_run(last_error: serde_json::Value) -> Self {
        Self {
            run: run("run_1", RunStatus::Failed, None, Some(last_error)),
            ..Self::completing("unused")
        }
    }

    /// Platform that cannot be reached
    pub fn unreachable() -> Self {
        Self {
            failure: Some(QuipError::remote_unavailable("connection refused")),
            ..Self::completing("unused")
        }
    }

    fn check(&self, thread_id: &str) -> Result<()> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        if thread_id != self.thread_id && !self.known_threads.iter().any(|t| t == thread_id) {
            return Err(QuipError::invalid_thread(thread_id));
        }
        Ok(())
    }
}

pub fn run(
    id: &str,
    status: RunStatus,
    usage: Option<(u64, u64)>,
    last_error: Option<serde_json::Value>,
) -> Run {
    Run {
        id: id.to_string(),
        thread_id: Some("t1".to_string()),
        assistant_id: Some("asst_joke".to_string()),
        status,
        usage: usage.map(|(input, output)| RunUsage {
            input_tokens: Some(input),
            output_tokens: Some(output),
        }),
        last_error,
    }
}

#[async_trait]
impl AgentsClient for StubAgentsClient {
    async fn get_agent(&self, agent_id: &str) -> Result<AgentDescriptor> {
        self.calls.get_agent.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(AgentDescriptor::with_id(agent_id))
    }

    async fn create_thread(&self) -> Result<ThreadHandle> {
        self.calls.create_thread.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(ThreadHandle::new(self.thread_id.clone()))
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage> {
        self.calls.create_message.fetch_add(1, Ordering::SeqCst);
        self.check(thread_id)?;
        self.appended
            .lock()
            .unwrap()
            .push((thread_id.to_string(), role, content.to_string()));
        Ok(ThreadMessage::text("msg_1", role, content))
    }

    async fn create_run(&self, thread_id: &str, _agent_id: &str) -> Result<Run> {
        self.check(thread_id)?;
        Ok(run(&self.run.id, RunStatus::Queued, None, None))
    }

    async fn get_run(&self, thread_id: &str, _run_id: &str) -> Result<Run> {
        self.check(thread_id)?;
        Ok(self.run.clone())
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
        limit: usize,
    ) -> Result<MessagePage> {
        self.calls.list_messages.fetch_add(1, Ordering::SeqCst);
        self.check(thread_id)?;
        self.listings.lock().unwrap().push((order, limit));
        Ok(MessagePage {
            data: self.messages.iter().take(limit).cloned().collect(),
            has_more: self.messages.len() > limit,
        })
    }

    async fn create_and_poll_run(&self, thread_id: &str, agent_id: &str) -> Result<Run> {
        self.calls.create_and_poll_run.fetch_add(1, Ordering::SeqCst);
        self.check(thread_id)?;
        self.runs_started
            .lock()
            .unwrap()
            .push((thread_id.to_string(), agent_id.to_string()));
        Ok(self.run.clone())
    }
}

pub fn agents_config() -> AgentsConfig {
    AgentsConfig {
        endpoint: "https://agents.example.com/api/projects/jokes".to_string(),
        joke_agent_id: "asst_joke".to_string(),
        ..Default::default()
    }
}

pub fn orchestrator(client: Arc<StubAgentsClient>) -> AgentRunOrchestrator {
    AgentRunOrchestrator::new(client, agents_config())
}

pub fn memory_tracer() -> (AgentTracer, InMemoryExporter) {
    let exporter = InMemoryExporter::new();
    (AgentTracer::new(Arc::new(exporter.clone())), exporter)
}
