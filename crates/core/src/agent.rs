//! The decision-making side of the loop.

use crate::error::{OrganizeError, Result};
use crate::models::DirectoryState;
use crate::prompts;
use crate::tools::Toolbox;
use providers::{ChatMessage, ChatProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What an agent hands back after one decision.
#[derive(Debug, Clone, Default)]
pub struct AgentReport {
    pub summary: String,
    /// Folders the agent declares final without having hashed them itself.
    /// The LLM agent hashes through its tool instead; this is the hook for
    /// agents that do not call tools.
    pub finished_folders: Vec<PathBuf>,
}

/// Chooses and performs file actions for one snapshot. All filesystem effects
/// must go through `tools`; an `Err` aborts the run.
#[async_trait::async_trait]
pub trait DecisionAgent: Send + Sync {
    async fn decide(&self, state: &DirectoryState, tools: &mut Toolbox) -> Result<AgentReport>;
}

/// Tool-calling chat agent.
pub struct LlmAgent {
    chat: Arc<dyn ChatProvider>,
    max_steps: usize,
}

impl LlmAgent {
    pub fn new(chat: Arc<dyn ChatProvider>, max_steps: usize) -> Self {
        Self {
            chat,
            max_steps: max_steps.max(1),
        }
    }
}

fn initial_request(state: &DirectoryState) -> Result<String> {
    let rendered = serde_json::to_string_pretty(state)
        .map_err(|e| OrganizeError::AgentFailure(format!("could not encode state: {}", e)))?;
    Ok(format!(
        "Please organize the files in this {} directory. Current state: {}",
        state.media_type, rendered
    ))
}

#[async_trait::async_trait]
impl DecisionAgent for LlmAgent {
    async fn decide(&self, state: &DirectoryState, tools: &mut Toolbox) -> Result<AgentReport> {
        let definitions = Toolbox::definitions();
        let mut messages = vec![
            ChatMessage::system(prompts::system_prompt(state.media_type)),
            ChatMessage::user(initial_request(state)?),
        ];

        for step in 0..self.max_steps {
            let reply = self.chat.complete(&messages, &definitions).await?;
            if reply.tool_calls.is_empty() {
                let summary = reply.content.unwrap_or_default();
                info!(steps = step + 1, "agent finished: {}", summary.trim());
                return Ok(AgentReport {
                    summary,
                    finished_folders: Vec::new(),
                });
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in calls {
                debug!(tool = %call.function.name, args = %call.function.arguments, "tool call");
                let output = tools.call(&call.function.name, &call.function.arguments).await;
                debug!(tool = %call.function.name, %output, "tool result");
                messages.push(ChatMessage::tool_result(&call.id, output));
            }
        }

        warn!(max_steps = self.max_steps, "agent hit the step limit");
        Ok(AgentReport {
            summary: format!("stopped after {} tool rounds", self.max_steps),
            finished_folders: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mover::MoveOptions;
    use providers::noop::NoopProvider;
    use providers::{FunctionCall, MediaKind, ProviderError, ToolCall, ToolDefinition};
    use std::fs;
    use std::sync::Mutex;

    /// Replays canned assistant messages and remembers what it was sent.
    struct ScriptedChat {
        replies: Mutex<Vec<ChatMessage>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedChat {
        fn new(mut replies: Vec<ChatMessage>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatProvider for ScriptedChat {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> std::result::Result<ChatMessage, ProviderError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ProviderError::MalformedResponse("script exhausted".into()))
        }
    }

    fn assistant_calls(calls: Vec<(&str, &str, serde_json::Value)>) -> ChatMessage {
        ChatMessage {
            role: "assistant".into(),
            content: None,
            tool_calls: calls
                .into_iter()
                .map(|(id, name, args)| ToolCall {
                    id: id.into(),
                    kind: "function".into(),
                    function: FunctionCall {
                        name: name.into(),
                        arguments: args.to_string(),
                    },
                })
                .collect(),
            tool_call_id: None,
        }
    }

    fn assistant_text(text: &str) -> ChatMessage {
        ChatMessage {
            role: "assistant".into(),
            content: Some(text.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    fn setup() -> (tempfile::TempDir, Toolbox, DirectoryState) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad_rip.mkv"), b"m").unwrap();
        let tools = Toolbox::new(
            dir.path(),
            MediaKind::Movie,
            Arc::new(NoopProvider),
            MoveOptions::default(),
        );
        let state = crate::snapshot::snapshot(
            dir.path(),
            MediaKind::Movie,
            &crate::tracker::CompletionTracker::new(),
            &crate::snapshot::SnapshotOptions::default(),
        );
        (dir, tools, state)
    }

    #[tokio::test]
    async fn executes_tool_calls_until_the_model_stops() {
        let (dir, mut tools, state) = setup();
        let src = dir.path().join("bad_rip.mkv");
        let chat = Arc::new(ScriptedChat::new(vec![
            assistant_calls(vec![(
                "call_1",
                "move_rename_file",
                serde_json::json!({"old_path": src, "new_path": "Film (2012)/Film (2012).mkv"}),
            )]),
            assistant_calls(vec![(
                "call_2",
                "calculate_folder_hashes",
                serde_json::json!({"folder_path": "Film (2012)"}),
            )]),
            assistant_text("Organized 1 file."),
        ]));
        let agent = LlmAgent::new(chat.clone(), 10);

        let report = agent.decide(&state, &mut tools).await.unwrap();
        assert_eq!(report.summary, "Organized 1 file.");
        assert_eq!(tools.log().entries().len(), 2);
        assert!(dir.path().join("Film (2012)").join("Film (2012).mkv").exists());

        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0][0].role, "system");
        assert!(seen[0][1]
            .content
            .as_deref()
            .unwrap()
            .contains("bad_rip.mkv"));
        let last = seen[2].last().unwrap();
        assert_eq!(last.role, "tool");
        assert_eq!(last.tool_call_id.as_deref(), Some("call_2"));
    }

    #[tokio::test]
    async fn transport_errors_become_agent_failures() {
        let (_dir, mut tools, state) = setup();
        let agent = LlmAgent::new(Arc::new(NoopProvider), 5);
        let err = agent.decide(&state, &mut tools).await.unwrap_err();
        assert!(matches!(err, OrganizeError::AgentFailure(_)));
    }

    #[tokio::test]
    async fn step_limit_ends_the_decision() {
        let (_dir, mut tools, state) = setup();
        let looping = (0..3)
            .map(|i| {
                assistant_calls(vec![(
                    "c",
                    "search_metadata",
                    serde_json::json!({"query": format!("try {i}")}),
                )])
            })
            .collect();
        let agent = LlmAgent::new(Arc::new(ScriptedChat::new(looping)), 2);
        let report = agent.decide(&state, &mut tools).await.unwrap();
        assert!(report.summary.contains("2 tool rounds"));
        assert!(tools.log().is_empty());
    }
}
