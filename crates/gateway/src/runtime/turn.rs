//! Turn execution loop — streams the model response, dispatches tool
//! calls, and checkpoints the conversation.

use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use fd_domain::config::LlmConfig;
use fd_domain::stream::{StreamEvent, Usage};
use fd_domain::tool::{ContentPart, Message, MessageContent, Role, ToolCall};
use fd_mcp_client::McpManager;
use fd_providers::ProviderRegistry;
use fd_sessions::{ConversationStore, SessionStore};

use super::{prompt, tools, AgentHandle};

/// Maximum number of tool-call loops before we force-stop.
const MAX_TOOL_LOOPS: usize = 25;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TurnEvent / TurnInput
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Events emitted during a single agent turn.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TurnEvent {
    /// Incremental text from the assistant.
    #[serde(rename = "assistant_delta")]
    AssistantDelta { text: String },

    /// The model is invoking a tool.
    #[serde(rename = "tool_call")]
    ToolCallEvent {
        call_id: String,
        tool_name: String,
        arguments: Value,
    },

    /// Tool execution result.
    #[serde(rename = "tool_result")]
    ToolResult {
        call_id: String,
        tool_name: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },

    /// The final assistant message (full text).
    #[serde(rename = "final")]
    Final { content: String },

    /// An error occurred.
    #[serde(rename = "error")]
    Error { message: String },

    /// Provider-reported token usage for the turn.
    #[serde(rename = "usage")]
    UsageEvent {
        input_tokens: u32,
        output_tokens: u32,
        total_tokens: u32,
    },
}

/// Input to a single turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub session_id: String,
    pub user_message: String,
    /// Model override (e.g. "openai/gpt-4o"). None = provider default.
    pub model: Option<String>,
    /// Sampling temperature override.
    pub temperature: Option<f32>,
    /// Completion token cap override.
    pub max_tokens: Option<u32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TurnRunner
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The production agent: provider + MCP tools + conversation checkpoints,
/// guided by the reservation system prompt.
#[derive(Clone)]
pub struct TurnRunner {
    providers: Arc<ProviderRegistry>,
    mcp: Arc<McpManager>,
    sessions: Arc<SessionStore>,
    conversations: Arc<ConversationStore>,
    llm: LlmConfig,
}

impl TurnRunner {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        mcp: Arc<McpManager>,
        sessions: Arc<SessionStore>,
        conversations: Arc<ConversationStore>,
        llm: LlmConfig,
    ) -> Self {
        Self {
            providers,
            mcp,
            sessions,
            conversations,
            llm,
        }
    }
}

impl AgentHandle for TurnRunner {
    fn run_turn(&self, input: TurnInput) -> mpsc::Receiver<TurnEvent> {
        let (tx, rx) = mpsc::channel::<TurnEvent>(64);
        let runner = self.clone();

        let turn_span = tracing::info_span!("turn", session_id = %input.session_id);
        tokio::spawn(tracing::Instrument::instrument(
            async move {
                tracing::debug!("turn started");
                if let Err(e) = run_turn_inner(&runner, input, tx.clone()).await {
                    let _ = tx
                        .send(TurnEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                }
            },
            turn_span,
        ));

        rx
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// run_turn_inner — the tool loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn run_turn_inner(
    runner: &TurnRunner,
    input: TurnInput,
    tx: mpsc::Sender<TurnEvent>,
) -> fd_domain::Result<()> {
    // 1. Resolve the LLM provider.
    let provider = runner
        .providers
        .resolve(input.model.as_deref())
        .ok_or_else(|| fd_domain::Error::Config("no LLM provider available".into()))?;

    // 2. Replay the checkpointed history for this session.
    let history = runner.conversations.history(&input.session_id);

    // 3. Build the tool definitions from the MCP tool set.
    let tool_defs = tools::build_tool_definitions(&runner.mcp);

    // 4. Assemble conversation messages.
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(prompt::SYSTEM_PROMPT));
    messages.extend(history);
    messages.push(Message::user(&input.user_message));

    // 5. Tool loop.
    let mut total_usage = Usage {
        prompt_tokens: 0,
        completion_tokens: 0,
        total_tokens: 0,
    };

    for loop_idx in 0..MAX_TOOL_LOOPS {
        tracing::debug!(loop_idx, "tool loop iteration");

        let req = fd_providers::ChatRequest {
            messages: messages.clone(),
            tools: tool_defs.clone(),
            temperature: Some(input.temperature.unwrap_or(runner.llm.default_temperature)),
            max_tokens: Some(input.max_tokens.unwrap_or(runner.llm.default_max_tokens)),
            model: input.model.clone(),
        };

        let mut stream = provider.chat_stream(&req).await?;

        // Accumulate the response.
        let mut text_buf = String::new();
        let mut pending_tool_calls: Vec<ToolCall> = Vec::new();
        let mut turn_usage: Option<Usage> = None;

        // Tool call assembly state: call_id -> (name, args_json).
        let mut tc_bufs: std::collections::HashMap<String, (String, String)> =
            std::collections::HashMap::new();

        while let Some(event_result) = stream.next().await {
            let event = event_result?;
            match event {
                StreamEvent::Token { text } => {
                    let _ = tx
                        .send(TurnEvent::AssistantDelta { text: text.clone() })
                        .await;
                    text_buf.push_str(&text);
                }
                StreamEvent::ToolCallStarted { call_id, tool_name } => {
                    tc_bufs.insert(call_id, (tool_name, String::new()));
                }
                StreamEvent::ToolCallDelta { call_id, delta } => {
                    if let Some((_, args)) = tc_bufs.get_mut(&call_id) {
                        args.push_str(&delta);
                    }
                }
                StreamEvent::ToolCallFinished {
                    call_id,
                    tool_name,
                    arguments,
                } => {
                    tc_bufs.remove(&call_id);
                    pending_tool_calls.push(ToolCall {
                        call_id,
                        tool_name,
                        arguments,
                    });
                }
                StreamEvent::Done {
                    usage,
                    finish_reason: _,
                } => {
                    turn_usage = usage;
                }
                StreamEvent::Error { message } => {
                    let _ = tx.send(TurnEvent::Error { message }).await;
                    return Ok(());
                }
            }
        }

        // Assemble tool calls that only came through start/delta events.
        // OpenAI-compatible streams key argument deltas by choice index, so
        // a single in-flight call also matches by position.
        for (call_id, (name, args_str)) in tc_bufs.drain() {
            let arguments = if args_str.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                match serde_json::from_str(&args_str) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(
                            call_id = %call_id,
                            tool = %name,
                            error = %e,
                            "tool call arguments are not valid JSON, defaulting to empty object"
                        );
                        Value::Object(Default::default())
                    }
                }
            };
            pending_tool_calls.push(ToolCall {
                call_id,
                tool_name: name,
                arguments,
            });
        }

        // Accumulate usage.
        if let Some(u) = &turn_usage {
            total_usage.prompt_tokens += u.prompt_tokens;
            total_usage.completion_tokens += u.completion_tokens;
            total_usage.total_tokens += u.total_tokens;
        }

        // If no tool calls, this is the final answer.
        if pending_tool_calls.is_empty() {
            finish_turn(runner, &input, &tx, &text_buf, &total_usage).await;
            return Ok(());
        }

        // ── Tool dispatch ──────────────────────────────────────────
        messages.push(build_assistant_tool_message(&text_buf, &pending_tool_calls));

        for tc in &pending_tool_calls {
            let _ = tx
                .send(TurnEvent::ToolCallEvent {
                    call_id: tc.call_id.clone(),
                    tool_name: tc.tool_name.clone(),
                    arguments: tc.arguments.clone(),
                })
                .await;

            let (result_content, is_error) =
                tools::dispatch_tool(&runner.mcp, &tc.tool_name, &tc.arguments).await;

            let _ = tx
                .send(TurnEvent::ToolResult {
                    call_id: tc.call_id.clone(),
                    tool_name: tc.tool_name.clone(),
                    content: result_content.clone(),
                    is_error,
                })
                .await;

            messages.push(Message::tool_result(&tc.call_id, &result_content));
        }

        if loop_idx == MAX_TOOL_LOOPS - 1 {
            let _ = tx
                .send(TurnEvent::Error {
                    message: format!("tool loop limit reached ({MAX_TOOL_LOOPS} iterations)"),
                })
                .await;
        }
    }

    Ok(())
}

/// Finalize a successful turn: checkpoint the exchange, emit Final and
/// Usage events, and update the session counters.
async fn finish_turn(
    runner: &TurnRunner,
    input: &TurnInput,
    tx: &mpsc::Sender<TurnEvent>,
    text_buf: &str,
    total_usage: &Usage,
) {
    runner.conversations.append(
        &input.session_id,
        [
            Message::user(&input.user_message),
            Message::assistant(text_buf),
        ],
    );

    let _ = tx
        .send(TurnEvent::Final {
            content: text_buf.to_string(),
        })
        .await;

    let _ = tx
        .send(TurnEvent::UsageEvent {
            input_tokens: total_usage.prompt_tokens,
            output_tokens: total_usage.completion_tokens,
            total_tokens: total_usage.total_tokens,
        })
        .await;

    runner.sessions.record_usage(
        &input.session_id,
        total_usage.prompt_tokens as u64,
        total_usage.completion_tokens as u64,
    );
}

/// Build the assistant message carrying the emitted text plus tool-use parts.
fn build_assistant_tool_message(text: &str, tool_calls: &[ToolCall]) -> Message {
    let mut parts = Vec::with_capacity(tool_calls.len() + 1);
    if !text.is_empty() {
        parts.push(ContentPart::Text { text: text.into() });
    }
    for tc in tool_calls {
        parts.push(ContentPart::ToolUse {
            id: tc.call_id.clone(),
            name: tc.tool_name.clone(),
            input: tc.arguments.clone(),
        });
    }
    Message {
        role: Role::Assistant,
        content: MessageContent::Parts(parts),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fd_domain::stream::BoxStream;
    use fd_providers::{ChatRequest, ChatResponse, LlmProvider};
    use parking_lot::Mutex;

    /// A provider that replays scripted event streams and records every
    /// request it receives.
    struct ScriptedProvider {
        scripts: Mutex<Vec<Vec<StreamEvent>>>,
        requests: Arc<Mutex<Vec<ChatRequest>>>,
    }

    impl ScriptedProvider {
        fn new(scripts: Vec<Vec<StreamEvent>>) -> (Arc<Self>, Arc<Mutex<Vec<ChatRequest>>>) {
            let requests = Arc::new(Mutex::new(Vec::new()));
            let provider = Arc::new(Self {
                scripts: Mutex::new(scripts),
                requests: requests.clone(),
            });
            (provider, requests)
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn chat(&self, _req: &ChatRequest) -> fd_domain::Result<ChatResponse> {
            Err(fd_domain::Error::Other("not used in tests".into()))
        }

        async fn chat_stream(
            &self,
            req: &ChatRequest,
        ) -> fd_domain::Result<BoxStream<'static, fd_domain::Result<StreamEvent>>> {
            self.requests.lock().push(req.clone());
            let mut scripts = self.scripts.lock();
            let events = if scripts.is_empty() {
                vec![StreamEvent::Done {
                    usage: None,
                    finish_reason: Some("stop".into()),
                }]
            } else {
                scripts.remove(0)
            };
            Ok(Box::pin(futures_util::stream::iter(
                events.into_iter().map(Ok),
            )))
        }

        fn provider_id(&self) -> &str {
            "scripted"
        }
    }

    async fn runner_with(scripts: Vec<Vec<StreamEvent>>) -> (TurnRunner, Arc<Mutex<Vec<ChatRequest>>>) {
        let (provider, requests) = ScriptedProvider::new(scripts);
        let runner = TurnRunner::new(
            Arc::new(ProviderRegistry::from_provider(provider)),
            Arc::new(McpManager::connect(&[]).await.unwrap()),
            Arc::new(SessionStore::new(16, Duration::hours(1))),
            Arc::new(ConversationStore::new()),
            LlmConfig::default(),
        );
        (runner, requests)
    }

    fn token(text: &str) -> StreamEvent {
        StreamEvent::Token { text: text.into() }
    }

    fn done(usage: Option<Usage>) -> StreamEvent {
        StreamEvent::Done {
            usage,
            finish_reason: Some("stop".into()),
        }
    }

    async fn drain(mut rx: mpsc::Receiver<TurnEvent>) -> Vec<TurnEvent> {
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        events
    }

    #[tokio::test]
    async fn plain_answer_emits_deltas_then_final() {
        let (runner, _) = runner_with(vec![vec![
            token("Your reservation "),
            token("is confirmed."),
            done(Some(Usage {
                prompt_tokens: 40,
                completion_tokens: 6,
                total_tokens: 46,
            })),
        ]])
        .await;

        let events = drain(runner.run_turn(TurnInput {
            session_id: "s1".into(),
            user_message: "book Tuesday 14:00".into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }))
        .await;

        assert!(matches!(&events[0], TurnEvent::AssistantDelta { text } if text == "Your reservation "));
        assert!(matches!(&events[2], TurnEvent::Final { content } if content == "Your reservation is confirmed."));
        assert!(matches!(
            &events[3],
            TurnEvent::UsageEvent { total_tokens: 46, .. }
        ));
    }

    #[tokio::test]
    async fn second_turn_replays_checkpointed_history() {
        let (runner, requests) = runner_with(vec![
            vec![token("May I have your name?"), done(None)],
            vec![token("Thank you, Kim Minji."), done(None)],
        ])
        .await;

        drain(runner.run_turn(TurnInput {
            session_id: "s1".into(),
            user_message: "I'd like to book Tuesday at 14:00".into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }))
        .await;
        drain(runner.run_turn(TurnInput {
            session_id: "s1".into(),
            user_message: "Kim Minji, 1990-03-02".into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }))
        .await;

        let reqs = requests.lock();
        // First request: system + user.
        assert_eq!(reqs[0].messages.len(), 2);
        // Second request: system + prior user/assistant pair + new user.
        assert_eq!(reqs[1].messages.len(), 4);
        assert_eq!(
            reqs[1].messages[1].content.text(),
            Some("I'd like to book Tuesday at 14:00")
        );
        assert_eq!(
            reqs[1].messages[2].content.text(),
            Some("May I have your name?")
        );
    }

    #[tokio::test]
    async fn sessions_do_not_share_history() {
        let (runner, requests) = runner_with(vec![
            vec![token("hello a"), done(None)],
            vec![token("hello b"), done(None)],
        ])
        .await;

        drain(runner.run_turn(TurnInput {
            session_id: "a".into(),
            user_message: "first".into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }))
        .await;
        drain(runner.run_turn(TurnInput {
            session_id: "b".into(),
            user_message: "second".into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }))
        .await;

        let reqs = requests.lock();
        // Both turns start fresh: system + user only.
        assert_eq!(reqs[0].messages.len(), 2);
        assert_eq!(reqs[1].messages.len(), 2);
    }

    #[tokio::test]
    async fn tool_call_round_trips_through_the_loop() {
        let (runner, requests) = runner_with(vec![
            vec![
                StreamEvent::ToolCallStarted {
                    call_id: "call_1".into(),
                    tool_name: "get_sheet_data".into(),
                },
                StreamEvent::ToolCallDelta {
                    call_id: "call_1".into(),
                    delta: r#"{"range":"A1:E100"}"#.into(),
                },
                done(None),
            ],
            vec![token("No duplicate found."), done(None)],
        ])
        .await;

        let events = drain(runner.run_turn(TurnInput {
            session_id: "s1".into(),
            user_message: "book Tuesday 14:00".into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }))
        .await;

        // Tool call surfaced, tool result errored (no MCP servers), and the
        // model still produced a final answer on the second iteration.
        assert!(events.iter().any(|e| matches!(
            e,
            TurnEvent::ToolCallEvent { tool_name, arguments, .. }
                if tool_name == "get_sheet_data" && arguments["range"] == "A1:E100"
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, TurnEvent::ToolResult { is_error: true, .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, TurnEvent::Final { content } if content == "No duplicate found.")));

        // The second LLM request carries the tool exchange.
        let reqs = requests.lock();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[1].messages.len(), 4); // system, user, assistant tool-use, tool result
        assert_eq!(reqs[1].messages[3].role, Role::Tool);
    }

    #[tokio::test]
    async fn checkpoint_skips_intra_turn_tool_messages() {
        let (runner, _) = runner_with(vec![
            vec![
                StreamEvent::ToolCallStarted {
                    call_id: "call_1".into(),
                    tool_name: "get_sheet_data".into(),
                },
                done(None),
            ],
            vec![token("done"), done(None)],
        ])
        .await;

        drain(runner.run_turn(TurnInput {
            session_id: "s1".into(),
            user_message: "check the sheet".into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }))
        .await;

        // Only the user/assistant pair is checkpointed.
        assert_eq!(runner.conversations.message_count("s1"), 2);
    }

    #[tokio::test]
    async fn assistant_tool_message_carries_text_and_calls() {
        let msg = build_assistant_tool_message(
            "Checking.",
            &[ToolCall {
                call_id: "call_1".into(),
                tool_name: "update_cells".into(),
                arguments: serde_json::json!({"range": "A5:D5"}),
            }],
        );
        match msg.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[0], ContentPart::Text { text } if text == "Checking."));
                assert!(
                    matches!(&parts[1], ContentPart::ToolUse { name, .. } if name == "update_cells")
                );
            }
            _ => panic!("expected parts"),
        }
    }
}
