//! The tool-calling loop: enrich once, call the backend, execute any
//! requested tools, fold the results back in, and call the backend again
//! until it produces a final assistant message.

use std::sync::Arc;

use serde_json::Value;

use crate::context;
use crate::errors::OrchestratorError;
use crate::knowledge::KnowledgeBase;
use crate::models::request::ChatRequest;
use crate::providers::base::{ChunkStream, Provider};
use crate::providers::utils::response_message;
use crate::tools::ToolRegistry;

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

pub struct Orchestrator {
    provider: Box<dyn Provider>,
    tools: ToolRegistry,
    knowledge: Arc<KnowledgeBase>,
    max_tool_rounds: usize,
}

impl Orchestrator {
    pub fn new(provider: Box<dyn Provider>, knowledge: Arc<KnowledgeBase>) -> Self {
        Self {
            provider,
            tools: ToolRegistry::new(knowledge.clone()),
            knowledge,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Non-streaming completion. When the final backend response carries no
    /// tool calls its raw body is returned unmodified.
    ///
    /// The conversation is append-only: each tool round pushes the assistant
    /// message plus one tool result per call, in backend order, and the full
    /// accumulated history is resent on the next backend call. Tool failures
    /// never abort the loop; only backend failures and the round cap do.
    pub async fn respond(&self, request: &ChatRequest) -> Result<Value, OrchestratorError> {
        let mut messages = context::enrich(&self.knowledge, &request.messages)
            .map_err(|e| OrchestratorError::Internal(format!("system context: {e}")))?;
        let tools = request.tools.clone().unwrap_or_default();

        let mut rounds = 0;
        loop {
            let body = self
                .provider
                .complete(
                    &request.model,
                    &messages,
                    &tools,
                    request.temperature,
                    request.max_tokens,
                )
                .await?;

            let assistant = response_message(&body)?;
            let calls = assistant.requested_calls().to_vec();
            if calls.is_empty() {
                return Ok(body);
            }

            if rounds == self.max_tool_rounds {
                return Err(OrchestratorError::ToolLoopExceeded(self.max_tool_rounds));
            }
            rounds += 1;

            messages.push(assistant);
            let results = self.tools.dispatch_all(&calls).await;
            messages.extend(results);
        }
    }

    /// Streaming completion: enrich once, then a pure relay of the backend
    /// stream.
    ///
    /// Known limitation: tool-call fragments observed mid-stream are relayed
    /// to the client as-is, not executed or looped back. Only the
    /// non-streaming path runs the dispatch loop.
    pub async fn respond_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<ChunkStream, OrchestratorError> {
        let messages = context::enrich(&self.knowledge, &request.messages)
            .map_err(|e| OrchestratorError::Internal(format!("system context: {e}")))?;
        let tools = request.tools.clone().unwrap_or_default();

        let stream = self
            .provider
            .complete_stream(
                &request.model,
                &messages,
                &tools,
                request.temperature,
                request.max_tokens,
            )
            .await?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::models::chunk::StreamChunk;
    use crate::models::message::{Message, Role};
    use crate::providers::mock::MockProvider;
    use futures::StreamExt;
    use serde_json::json;

    fn request(messages: Vec<Message>) -> ChatRequest {
        ChatRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages,
            tools: None,
            stream: false,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    fn final_body(content: &str) -> Value {
        json!({
            "id": "chatcmpl-final",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-3.5-turbo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    fn tool_call_body(calls: Vec<(&str, &str, Value)>) -> Value {
        let tool_calls: Vec<Value> = calls
            .into_iter()
            .map(|(id, name, args)| {
                json!({
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": args.to_string()}
                })
            })
            .collect();
        json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": null, "tool_calls": tool_calls},
                "finish_reason": "tool_calls"
            }]
        })
    }

    fn orchestrator(responses: Vec<Value>) -> (Orchestrator, Arc<MockProvider>) {
        let provider = Arc::new(MockProvider::new(responses));
        let orchestrator = Orchestrator::new(
            Box::new(ProviderHandle(provider.clone())),
            Arc::new(KnowledgeBase::builtin()),
        );
        (orchestrator, provider)
    }

    // Lets tests keep a handle on the mock while the orchestrator owns the box.
    struct ProviderHandle(Arc<MockProvider>);

    #[async_trait::async_trait]
    impl Provider for ProviderHandle {
        async fn complete(
            &self,
            model: &str,
            messages: &[Message],
            tools: &[Value],
            temperature: f32,
            max_tokens: Option<u32>,
        ) -> Result<Value, ProviderError> {
            self.0
                .complete(model, messages, tools, temperature, max_tokens)
                .await
        }

        async fn complete_stream(
            &self,
            model: &str,
            messages: &[Message],
            tools: &[Value],
            temperature: f32,
            max_tokens: Option<u32>,
        ) -> Result<ChunkStream, ProviderError> {
            self.0
                .complete_stream(model, messages, tools, temperature, max_tokens)
                .await
        }
    }

    #[tokio::test]
    async fn test_no_tool_calls_returns_raw_body() {
        let body = final_body("Hello!");
        let (orchestrator, provider) = orchestrator(vec![body.clone()]);

        let result = orchestrator
            .respond(&request(vec![Message::user("hi")]))
            .await
            .unwrap();

        assert_eq!(result, body);
        // One call, with the enriched history: system message plus the input.
        let histories = provider.call_histories();
        assert_eq!(histories.len(), 1);
        assert_eq!(histories[0].len(), 2);
        assert_eq!(histories[0][0].role, Role::System);
    }

    #[tokio::test]
    async fn test_tool_round_appends_and_resends_full_history() {
        let (orchestrator, provider) = orchestrator(vec![
            tool_call_body(vec![
                ("call_1", "calculate", json!({"expression": "25 * 4 + 10"})),
                ("call_2", "search_company_info", json!({"query": "founded"})),
            ]),
            final_body("The answer is 110."),
        ]);

        let result = orchestrator
            .respond(&request(vec![Message::user("what is 25*4+10?")]))
            .await
            .unwrap();
        assert_eq!(
            result["choices"][0]["message"]["content"],
            "The answer is 110."
        );

        let histories = provider.call_histories();
        assert_eq!(histories.len(), 2);
        // Round one: enriched length 2. Round two adds 1 assistant + 2 tool
        // results, and resends everything from round one unchanged.
        assert_eq!(histories[0].len(), 2);
        assert_eq!(histories[1].len(), 5);
        assert_eq!(&histories[1][..2], &histories[0][..]);

        let assistant = &histories[1][2];
        assert_eq!(assistant.requested_calls().len(), 2);

        let first_result = &histories[1][3];
        assert_eq!(first_result.role, Role::Tool);
        assert_eq!(first_result.tool_call_id.as_deref(), Some("call_1"));
        let content: Value =
            serde_json::from_str(first_result.content.as_deref().unwrap()).unwrap();
        assert_eq!(content["result"], 110);

        let second_result = &histories[1][4];
        assert_eq!(second_result.tool_call_id.as_deref(), Some("call_2"));
    }

    #[tokio::test]
    async fn test_unknown_tool_keeps_loop_alive() {
        let (orchestrator, provider) = orchestrator(vec![
            tool_call_body(vec![("call_1", "launch_rockets", json!({}))]),
            final_body("I could not do that."),
        ]);

        let result = orchestrator
            .respond(&request(vec![Message::user("fire!")]))
            .await
            .unwrap();
        assert_eq!(
            result["choices"][0]["message"]["content"],
            "I could not do that."
        );

        let histories = provider.call_histories();
        let tool_result = &histories[1][3];
        let content: Value = serde_json::from_str(tool_result.content.as_deref().unwrap()).unwrap();
        assert_eq!(content["error"], "Unknown function: launch_rockets");
        assert_eq!(content["success"], false);
    }

    #[tokio::test]
    async fn test_tool_loop_cap_is_distinguishable() {
        let responses = (0..4)
            .map(|i| {
                let id = format!("call_{i}");
                tool_call_body(vec![(id.as_str(), "calculate", json!({"expression": "1"}))])
            })
            .collect();
        let (orchestrator, _) = orchestrator(responses);
        let orchestrator = orchestrator.with_max_tool_rounds(2);

        let err = orchestrator
            .respond(&request(vec![Message::user("loop forever")]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ToolLoopExceeded(2)));
    }

    #[tokio::test]
    async fn test_backend_failure_terminates_loop() {
        // Empty response list makes the mock fail on the first call.
        let (orchestrator, _) = orchestrator(vec![]);
        let err = orchestrator
            .respond(&request(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Backend(_)));
    }

    #[tokio::test]
    async fn test_stream_is_pure_relay_with_enrichment() {
        let chunks = vec![
            Ok(serde_json::from_value::<StreamChunk>(
                json!({"choices": [{"delta": {"content": "Hel"}}]}),
            )
            .unwrap()),
            Ok(serde_json::from_value::<StreamChunk>(
                json!({"choices": [{"delta": {"tool_calls": [{"index": 0}]}}]}),
            )
            .unwrap()),
        ];
        let provider = Arc::new(MockProvider::streaming(chunks));
        let orchestrator = Orchestrator::new(
            Box::new(ProviderHandle(provider.clone())),
            Arc::new(KnowledgeBase::builtin()),
        );

        let mut request = request(vec![Message::user("hi")]);
        request.stream = true;
        let mut stream = orchestrator.respond_stream(&request).await.unwrap();

        let mut received = Vec::new();
        while let Some(chunk) = stream.next().await {
            received.push(chunk.unwrap());
        }
        // Both chunks relayed in order, including the tool-call fragment.
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].delta().unwrap().content.as_deref(), Some("Hel"));
        assert!(received[1].delta().unwrap().tool_calls.is_some());

        // Enrichment applied exactly once before the stream opened.
        let histories = provider.call_histories();
        assert_eq!(histories[0].len(), 2);
        assert_eq!(histories[0][0].role, Role::System);
    }
}
