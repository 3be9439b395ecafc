use std::sync::{Arc, Mutex};

use atomic_agents::{
    calculator_toolkit, Agent, BasicChatInput, BasicChatOutput, ChatContent, ChatHistory,
    ContentPart, ContextProvider, IoSchema, Media, MediaKind, Message, Role, StubModel,
    SystemPromptGenerator, ToolCall,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

fn reply(text: &str) -> String {
    json!({ "chat_message": text }).to_string()
}

struct Clock {
    now: Mutex<String>,
}

impl ContextProvider for Clock {
    fn title(&self) -> &str {
        "Current time"
    }

    fn info(&self) -> String {
        self.now.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn provider_changes_show_up_on_the_next_run() {
    let model = StubModel::new(vec![reply("a"), reply("b")]);
    let clock = Arc::new(Clock {
        now: Mutex::new("09:00".into()),
    });
    let prompt = SystemPromptGenerator::new()
        .with_steps(["Read the time", "Answer"])
        .with_context_provider("clock", clock.clone());
    let mut agent: Agent<BasicChatInput, BasicChatOutput, StubModel> =
        Agent::new(model.clone()).with_system_prompt(prompt);

    agent.run(Some(BasicChatInput::new("time?"))).await.unwrap();
    *clock.now.lock().unwrap() = "09:05".into();
    agent.run(Some(BasicChatInput::new("and now?"))).await.unwrap();

    let requests = model.requests();
    let first = requests[0].messages[0].text().unwrap().to_string();
    let second = requests[1].messages[0].text().unwrap().to_string();
    assert!(first.contains("## Current time\n09:00"));
    assert!(second.contains("## Current time\n09:05"));
    assert!(second.contains("# INTERNAL ASSISTANT STEPS\n- Read the time\n- Answer"));
}

#[tokio::test]
async fn history_survives_a_dump_into_a_new_agent() {
    let model = StubModel::new(vec![reply("noted"), reply("you said blue")]);
    let mut first: Agent<BasicChatInput, BasicChatOutput, StubModel> = Agent::new(model.clone());
    first.run(Some(BasicChatInput::new("my colour is blue"))).await.unwrap();

    let saved = first.history().dump_json().unwrap();
    let mut restored = ChatHistory::with_max_turns(10);
    restored.load_json(&saved).unwrap();

    let mut second: Agent<BasicChatInput, BasicChatOutput, StubModel> =
        Agent::new(model.clone()).with_history(restored);
    let output = second.run(Some(BasicChatInput::new("what colour?"))).await.unwrap();

    assert_eq!(output.chat_message, "you said blue");
    let requests = model.requests();
    let request = &requests[1];
    // system prompt plus three history messages
    assert_eq!(request.messages.len(), 4);
    assert_eq!(second.history().message_count(), 4);
}

#[tokio::test]
async fn tool_round_trip_stays_in_one_turn() {
    let tools = calculator_toolkit();
    let model = StubModel::new(vec![reply("42")]);
    let mut agent: Agent<BasicChatInput, BasicChatOutput, StubModel> =
        Agent::new(model).with_history(ChatHistory::with_max_turns(1));

    let history = agent.history_mut();
    history.begin_turn();
    history.add_message(Role::User, "what is 6*7?");
    let call = ToolCall::new("calculator", json!({"expression": "6*7"}));
    let id = call.id.clone().unwrap();
    history.add(Message::assistant("").with_tool_calls(vec![call.clone()]));
    let result = tools.call(&call.name, call.arguments.clone()).await.unwrap();
    history.add(Message::tool(id, atomic_agents::Content::from_value(result).unwrap()));

    let output = agent.run(None).await.unwrap();

    assert_eq!(output.chat_message, "42");
    assert_eq!(agent.history().message_count(), 4);
    assert_eq!(agent.history().turn_count(), 1);
}

/// Describe the attached recording.
#[derive(Serialize, Deserialize, JsonSchema)]
struct ListenInput {
    prompt: String,
    clip: Media,
}

impl IoSchema for ListenInput {}

#[tokio::test]
async fn file_media_is_attached_after_the_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    std::fs::write(&path, b"RIFF0000WAVE").unwrap();
    let clip = Media::read_file(MediaKind::Audio, &path).await.unwrap();

    let model = StubModel::new(vec![reply("a short beep")]);
    let mut agent: Agent<ListenInput, BasicChatOutput, StubModel> =
        Agent::new(model.clone()).without_system_prompt();

    agent
        .run(Some(ListenInput {
            prompt: "what is this?".into(),
            clip: clip.clone(),
        }))
        .await
        .unwrap();

    let requests = model.requests();
    let request = &requests[0];
    match &request.messages[0].content {
        ChatContent::Parts(parts) => {
            assert_eq!(parts[0], ContentPart::Text(r#"{"prompt":"what is this?"}"#.into()));
            assert_eq!(parts[1], ContentPart::Media(clip));
        }
        other => panic!("expected parts, got {other:?}"),
    }
    assert_eq!(request.messages[0].role, Role::User);
}
