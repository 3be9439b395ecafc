use atomic_agents::{AtomicError, ChatHistory, Content, Media, MediaKind, Message, Node, Role, Structure};
use serde_json::json;

fn texts(history: &ChatHistory) -> Vec<String> {
    history.iter().map(|m| m.content.to_string()).collect()
}

#[test]
fn keeps_the_two_most_recent_turns() {
    let mut history = ChatHistory::with_max_turns(2);
    history.add_message(Role::User, "A");
    history.add_message(Role::Assistant, "B");
    history.add_message(Role::User, "C");
    assert_eq!(texts(&history), ["B", "C"]);

    history.add_message(Role::Assistant, "D");
    assert_eq!(texts(&history), ["C", "D"]);
}

#[test]
fn eviction_is_fifo_for_every_bound() {
    for max_turns in 1..=6 {
        for total in 0usize..=15 {
            let mut history = ChatHistory::with_max_turns(max_turns);
            for i in 0..total {
                history.add_message(Role::User, format!("m{i}"));
            }

            let expected: Vec<String> = (total.saturating_sub(max_turns)..total)
                .map(|i| format!("m{i}"))
                .collect();
            assert_eq!(texts(&history), expected, "max_turns={max_turns} total={total}");
            assert!(history.turn_count() <= max_turns);
        }
    }
}

#[test]
fn multi_message_turns_are_evicted_whole() {
    let mut history = ChatHistory::with_max_turns(2);
    for turn in 0..4 {
        history.begin_turn();
        history.add_message(Role::User, format!("q{turn}"));
        history.add_message(Role::Assistant, format!("a{turn}"));
        history.end_turn();
    }
    assert_eq!(texts(&history), ["q2", "a2", "q3", "a3"]);
}

#[test]
fn dump_and_load_restore_a_text_history() {
    let mut original = ChatHistory::new();
    original.add_message(Role::System, "be brief");
    original.add_message(Role::User, "hi");
    original.add_message(Role::Assistant, Content::from_value(json!({"chat_message": "hello"})).unwrap());

    let dump = original.dump().unwrap();
    let mut restored = ChatHistory::new();
    restored.load(dump).unwrap();

    assert_eq!(restored.message_count(), 3);
    assert_eq!(restored.history(), original.history());
    let roles: Vec<Role> = restored.iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::System, Role::User, Role::Assistant]);
}

#[test]
fn content_built_from_nodes_survives_a_round_trip() {
    let mut original = ChatHistory::new();
    original.add_message(Role::User, Content::from_node(Node::String("hi".into())).unwrap());
    let record = Node::Record(vec![("count".into(), Node::Number(7.into()))]);
    original.add_message(Role::Assistant, Content::Structured(Structure::new(record).unwrap()));
    original.add_message(Role::Assistant, Content::from_node(Node::List(Vec::new())).unwrap());
    assert!(Content::from_node(Node::Number(7.into())).is_err());

    let mut restored = ChatHistory::new();
    restored.load(original.dump().unwrap()).unwrap();

    assert_eq!(restored.history(), original.history());
    assert_eq!(restored.history()[0].content, Content::Text("hi".into()));
}

#[test]
fn dump_keeps_media_inline() {
    let mut original = ChatHistory::new();
    let photo = Media::from_bytes(MediaKind::Image, "image/png", b"\x89PNG");
    original.add_message(
        Role::User,
        Content::from_value(json!({
            "question": "what is this?",
            "photo": serde_json::to_value(&photo).unwrap(),
        }))
        .unwrap(),
    );
    original.add_message(Role::User, Media::image_url("https://example.com/cat.jpg"));

    let raw = original.dump_json().unwrap();
    let mut restored = ChatHistory::new();
    restored.load_json(&raw).unwrap();

    assert_eq!(restored.history(), original.history());
    assert_eq!(restored.history()[0].content.media_count(), 1);
    assert!(matches!(restored.history()[1].content, Content::Media(_)));
}

#[test]
fn malformed_entry_fails_the_whole_load() {
    let mut history = ChatHistory::new();
    history.add_message(Role::User, "keep me");

    let err = history
        .load(vec![
            json!({"role": "user", "content": "fine"}),
            json!({"role": "narrator", "content": "bad role"}),
        ])
        .unwrap_err();

    match err {
        AtomicError::Validation { path, .. } => assert_eq!(path, "$[1]"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(texts(&history), ["keep me"]);
}

#[test]
fn load_applies_the_bound_and_regroups_tool_results() {
    let call = atomic_agents::ToolCall {
        id: Some("call_1".into()),
        name: "calculator".into(),
        arguments: json!({"expression": "1+1"}),
    };
    let mut source = ChatHistory::new();
    source.add_message(Role::User, "old");
    source.add(Message::assistant("checking").with_tool_calls(vec![call]));
    source.add(Message::tool("call_1", Content::from_value(json!({"result": 2.0})).unwrap()));

    let mut bounded = ChatHistory::with_max_turns(1);
    bounded.load(source.dump().unwrap()).unwrap();

    assert_eq!(bounded.message_count(), 2);
    assert_eq!(bounded.turn_count(), 1);
    assert_eq!(bounded.history()[1].tool_call_id.as_deref(), Some("call_1"));
}

#[test]
fn copies_are_independent() {
    let mut original = ChatHistory::new();
    original.add_message(Role::User, "shared");

    let mut copy = original.copy();
    original.add_message(Role::Assistant, "only original");
    copy.add_message(Role::Assistant, "only copy");
    copy.add_message(Role::User, "copy again");

    assert_eq!(texts(&original), ["shared", "only original"]);
    assert_eq!(texts(&copy), ["shared", "only copy", "copy again"]);

    let first_turn = original.turn_of(0).unwrap();
    original.delete_turn(first_turn).unwrap();
    assert_eq!(copy.message_count(), 3);
}
