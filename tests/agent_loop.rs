use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sandbox_agent::agent::{Agent, AgentError, AgentEvent, AgentOutcome};
use sandbox_agent::conversation::Conversation;
use sandbox_agent::llm::{
    Content, FunctionCall, FunctionResponse, GenerateRequest, LlmClient, LlmError, ModelResponse,
    Part, Role, UsageMetadata,
};
use sandbox_agent::tools::{Sandbox, ScriptRunner, Toolbox};
use serde_json::{json, Value};

/// Replays canned responses and records every request it receives.
struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<ModelResponse, LlmError>>>,
    fallback: Option<ModelResponse>,
    requests: Mutex<Vec<Vec<Content>>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn repeating(response: ModelResponse) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(error: LlmError) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(error)])),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<Vec<Content>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelResponse, LlmError> {
        assert_eq!(request.tools.len(), 4);
        assert!(!request.system_instruction.is_empty());
        self.requests
            .lock()
            .unwrap()
            .push(request.contents.to_vec());

        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))
    }
}

fn call(name: &str, args: Value) -> Part {
    Part::FunctionCall(FunctionCall {
        name: name.to_string(),
        args: args.as_object().cloned().unwrap_or_default(),
    })
}

fn calls(parts: Vec<Part>) -> ModelResponse {
    ModelResponse {
        candidates: vec![Content {
            role: Role::Model,
            parts,
        }],
        usage: Some(UsageMetadata {
            prompt_token_count: 10,
            candidates_token_count: 2,
            total_token_count: 12,
        }),
    }
}

fn answer(text: &str) -> ModelResponse {
    ModelResponse {
        candidates: vec![Content::model_text(text)],
        usage: Some(UsageMetadata {
            prompt_token_count: 20,
            candidates_token_count: 5,
            total_token_count: 25,
        }),
    }
}

fn agent(llm: Arc<ScriptedLlm>) -> (tempfile::TempDir, Agent) {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("main.py"), "print('calc')\n").unwrap();
    let tools = Toolbox::new(
        Sandbox::new(dir.path()).expect("sandbox"),
        ScriptRunner::default(),
    );
    (dir, Agent::new(llm, tools))
}

fn responses(turn: &Content) -> Vec<FunctionResponse> {
    turn.parts
        .iter()
        .map(|part| match part {
            Part::FunctionResponse(response) => response.clone(),
            other => panic!("expected function response, got {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn text_only_response_finishes_immediately() {
    let llm = Arc::new(ScriptedLlm::new(vec![answer("Nothing to do.")]));
    let (_dir, agent) = agent(llm.clone());

    let run = agent
        .run(Conversation::from_prompt("hello"))
        .await
        .expect("run");

    assert_eq!(
        run.outcome,
        AgentOutcome::Completed {
            text: Some("Nothing to do.".to_string())
        }
    );
    assert_eq!(run.iterations, 1);
    assert_eq!(llm.requests().len(), 1);
    assert_eq!(llm.requests()[0], vec![Content::user("hello")]);
    assert_eq!(run.conversation.len(), 2);
}

#[tokio::test]
async fn tool_round_trip_then_answer() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        calls(vec![call("get_files_info", json!({}))]),
        calls(vec![call(
            "write_file",
            json!({"file_path": "out/result.txt", "content": "42"}),
        )]),
        answer("Wrote the result."),
    ]));
    let (dir, agent) = agent(llm.clone());

    let run = agent
        .run(Conversation::from_prompt("compute"))
        .await
        .expect("run");

    assert_eq!(
        run.outcome,
        AgentOutcome::Completed {
            text: Some("Wrote the result.".to_string())
        }
    );
    assert_eq!(run.iterations, 3);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("out/result.txt")).unwrap(),
        "42"
    );

    let roles: Vec<_> = run.conversation.turns().iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::User,
            Role::Model,
            Role::Tool,
            Role::Model,
            Role::Tool,
            Role::Model
        ]
    );

    let listing = responses(&run.conversation.turns()[2]);
    assert_eq!(
        listing,
        vec![FunctionResponse {
            name: "get_files_info".to_string(),
            response: json!({"result": "- main.py: file_size=14 bytes, is_dir=False"}),
        }]
    );

    // Each request carries the whole history so far.
    let requests = llm.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].len(), 3);
    assert_eq!(requests[2].len(), 5);
    assert_eq!(requests[2][..], run.conversation.turns()[..5]);

    assert_eq!(run.usage.prompt_token_count, 40);
    assert_eq!(run.usage.candidates_token_count, 9);
}

#[tokio::test]
async fn every_call_in_a_round_gets_one_result_in_order() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        calls(vec![
            call("get_file_content", json!({"file_path": "main.py"})),
            call("launch_missiles", json!({})),
            call("get_file_content", json!({"file_path": "../outside.txt"})),
            call("get_file_content", json!({})),
        ]),
        answer("done"),
    ]));
    let (_dir, agent) = agent(llm.clone());

    let run = agent
        .run(Conversation::from_prompt("inspect"))
        .await
        .expect("run");

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    let tool_turn = requests[1].last().expect("tool turn");
    assert_eq!(tool_turn.role, Role::Tool);

    let results = responses(tool_turn);
    assert_eq!(results.len(), 4);
    let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "get_file_content",
            "launch_missiles",
            "get_file_content",
            "get_file_content"
        ]
    );
    assert_eq!(results[0].response, json!({"result": "print('calc')\n"}));
    assert_eq!(
        results[1].response,
        json!({"error": "Error: Unknown function: launch_missiles"})
    );
    assert_eq!(
        results[2].response,
        json!({"error": "Error: Cannot read \"../outside.txt\" as it is outside the permitted working directory"})
    );
    assert!(results[3].response["error"]
        .as_str()
        .unwrap()
        .starts_with("Error: invalid arguments for get_file_content"));

    assert!(matches!(run.outcome, AgentOutcome::Completed { .. }));
}

#[tokio::test]
async fn stops_exactly_at_iteration_cap() {
    let llm = Arc::new(ScriptedLlm::repeating(calls(vec![call(
        "get_files_info",
        json!({}),
    )])));
    let (_dir, agent) = agent(llm.clone());
    let agent = agent.with_max_iterations(3);

    let run = agent
        .run(Conversation::from_prompt("loop forever"))
        .await
        .expect("run");

    assert_eq!(
        run.outcome,
        AgentOutcome::IterationLimit { max_iterations: 3 }
    );
    assert_eq!(run.iterations, 3);
    assert_eq!(llm.requests().len(), 3);
    assert_eq!(run.conversation.len(), 1 + 3 * 2);
    assert_eq!(run.conversation.count_role(Role::Tool), 3);
}

#[tokio::test]
async fn default_cap_is_twenty_requests() {
    let llm = Arc::new(ScriptedLlm::repeating(calls(vec![call(
        "get_files_info",
        json!({}),
    )])));
    let (_dir, agent) = agent(llm.clone());

    let run = agent
        .run(Conversation::from_prompt("loop forever"))
        .await
        .expect("run");

    assert_eq!(
        run.outcome,
        AgentOutcome::IterationLimit { max_iterations: 20 }
    );
    assert_eq!(llm.requests().len(), 20);
}

#[tokio::test]
async fn model_failure_aborts_the_run() {
    let llm = Arc::new(ScriptedLlm::failing(LlmError::Api {
        status: 500,
        body: "boom".to_string(),
    }));
    let (_dir, agent) = agent(llm);

    let err = agent
        .run(Conversation::from_prompt("hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Model(LlmError::Api { status: 500, .. })));
}

#[tokio::test]
async fn events_follow_the_loop() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        calls(vec![
            call("get_files_info", json!({})),
            call("get_file_content", json!({"file_path": "main.py"})),
        ]),
        answer("ok"),
    ]));
    let (_dir, agent) = agent(llm);

    let mut seen = Vec::new();
    agent
        .run_with_events(Conversation::from_prompt("go"), |event| {
            seen.push(match event {
                AgentEvent::Iteration(n) => format!("iteration {n}"),
                AgentEvent::Usage(usage) => format!("usage {}", usage.total_token_count),
                AgentEvent::ToolCall(call) => format!("call {}", call.name),
                AgentEvent::ToolResult(result) => {
                    format!("result {} error={}", result.name, result.is_error())
                }
            })
        })
        .await
        .expect("run");

    assert_eq!(
        seen,
        vec![
            "iteration 1",
            "usage 12",
            "call get_files_info",
            "result get_files_info error=false",
            "call get_file_content",
            "result get_file_content error=false",
            "iteration 2",
            "usage 25",
        ]
    );
}

#[tokio::test]
async fn empty_response_completes_without_text() {
    let llm = Arc::new(ScriptedLlm::new(vec![ModelResponse::default()]));
    let (_dir, agent) = agent(llm);

    let run = agent
        .run(Conversation::from_prompt("hello"))
        .await
        .expect("run");

    assert_eq!(run.outcome, AgentOutcome::Completed { text: None });
    assert_eq!(run.conversation.len(), 1);
}
