use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::content::Content;
use crate::error::{AtomicError, Result};
use crate::message::{ChatMessage, Message, Role};

pub type TurnId = u64;

/// Ordered, bounded conversation log.
///
/// Messages are grouped into turns. Every message starts a new turn unless a
/// turn was opened with [`ChatHistory::begin_turn`], or it answers a tool call
/// (matching `tool_call_id`) held by an earlier message, in which case it joins
/// that message's turn. When `max_turns` is set, the oldest whole turns are
/// dropped after each append until the bound holds again.
#[derive(Default, Clone, Debug)]
pub struct ChatHistory {
    messages: Vec<Message>,
    turns: Vec<TurnId>,
    max_turns: Option<usize>,
    current_turn: Option<TurnId>,
    next_turn: TurnId,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            max_turns: Some(max_turns.max(1)),
            ..Self::default()
        }
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        let mut history = Self::default();
        for message in messages {
            history.append(message);
        }
        history
    }

    pub fn max_turns(&self) -> Option<usize> {
        self.max_turns
    }

    /// Open a turn; messages added until [`ChatHistory::end_turn`] share it.
    pub fn begin_turn(&mut self) -> TurnId {
        let turn = self.allocate_turn();
        self.current_turn = Some(turn);
        turn
    }

    pub fn end_turn(&mut self) {
        self.current_turn = None;
    }

    pub fn current_turn(&self) -> Option<TurnId> {
        self.current_turn
    }

    /// Append a plain `role`/`content` message. Messages that carry tool
    /// metadata go through [`ChatHistory::add`] with [`Message::tool`] or
    /// [`Message::with_tool_calls`], so results join the calling turn.
    pub fn add_message(&mut self, role: Role, content: impl Into<Content>) -> TurnId {
        self.add(Message::new(role, content))
    }

    /// Append a message and return the turn it was filed under.
    pub fn add(&mut self, message: Message) -> TurnId {
        let turn = self.append(message);
        self.evict_overflow();
        turn
    }

    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> + '_ {
        self.messages.iter()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.iter().collect::<HashSet<_>>().len()
    }

    /// Turn of the message at `index`.
    pub fn turn_of(&self, index: usize) -> Option<TurnId> {
        self.turns.get(index).copied()
    }

    /// Remove every message of `turn`.
    pub fn delete_turn(&mut self, turn: TurnId) -> Result<()> {
        if !self.turns.contains(&turn) {
            return Err(AtomicError::TurnNotFound(turn));
        }
        let removed = self.remove_turn(turn);
        if self.current_turn == Some(turn) {
            self.current_turn = None;
        }
        debug!(turn, removed, "deleted turn from chat history");
        Ok(())
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.turns.clear();
        self.current_turn = None;
    }

    /// One JSON object per message. Media stays inline in its tagged form, so
    /// `load(dump())` restores multimodal content as well as text.
    pub fn dump(&self) -> Result<Vec<Value>> {
        self.messages
            .iter()
            .map(|message| serde_json::to_value(message).map_err(AtomicError::from))
            .collect()
    }

    pub fn dump_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.dump()?)?)
    }

    /// Replace the whole history with `entries`.
    ///
    /// Every entry is validated before anything changes; the first malformed
    /// entry fails the load and leaves the current state untouched. Turns are
    /// rebuilt from tool-call correlation and the retention bound is applied.
    pub fn load(&mut self, entries: Vec<Value>) -> Result<()> {
        let messages = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                serde_json::from_value::<Message>(entry)
                    .map_err(|err| AtomicError::validation(format!("$[{index}]"), err))
            })
            .collect::<Result<Vec<_>>>()?;

        let loaded = messages.len();
        let mut restored = Self {
            max_turns: self.max_turns,
            ..Self::default()
        };
        for message in messages {
            restored.append(message);
        }
        restored.evict_overflow();
        debug!(
            loaded,
            retained = restored.messages.len(),
            "loaded chat history"
        );
        *self = restored;
        Ok(())
    }

    pub fn load_json(&mut self, raw: &str) -> Result<()> {
        let entries: Vec<Value> =
            serde_json::from_str(raw).map_err(|err| AtomicError::validation("$", err))?;
        self.load(entries)
    }

    /// Independent duplicate; later appends to either side are not shared.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Render the history for a chat-completion request.
    pub fn to_chat_messages(&self) -> Result<Vec<ChatMessage>> {
        self.messages.iter().map(ChatMessage::from_message).collect()
    }

    fn allocate_turn(&mut self) -> TurnId {
        let turn = self.next_turn;
        self.next_turn += 1;
        turn
    }

    fn append(&mut self, message: Message) -> TurnId {
        let turn = self.assign_turn(&message);
        self.messages.push(message);
        self.turns.push(turn);
        turn
    }

    fn assign_turn(&mut self, message: &Message) -> TurnId {
        if let Some(id) = &message.tool_call_id {
            if let Some(index) = self.messages.iter().rposition(|m| m.has_tool_call(id)) {
                return self.turns[index];
            }
        }
        match self.current_turn {
            Some(turn) => turn,
            None => self.allocate_turn(),
        }
    }

    fn evict_overflow(&mut self) {
        let Some(max_turns) = self.max_turns else {
            return;
        };
        let mut evicted = 0;
        while self.turn_count() > max_turns {
            let oldest = self.turns[0];
            evicted += self.remove_turn(oldest);
        }
        if evicted > 0 {
            debug!(
                evicted,
                retained = self.messages.len(),
                max_turns,
                "evicted oldest turns from chat history"
            );
        }
    }

    fn remove_turn(&mut self, turn: TurnId) -> usize {
        let before = self.messages.len();
        let (messages, turns): (Vec<Message>, Vec<TurnId>) = std::mem::take(&mut self.messages)
            .into_iter()
            .zip(std::mem::take(&mut self.turns))
            .filter(|(_, owner)| *owner != turn)
            .unzip();
        self.messages = messages;
        self.turns = turns;
        before - self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;
    use serde_json::json;

    fn texts(history: &ChatHistory) -> Vec<String> {
        history.iter().map(|m| m.content.to_string()).collect()
    }

    #[test]
    fn tool_results_join_the_calling_turn() {
        let mut history = ChatHistory::with_max_turns(2);
        let call = ToolCall {
            id: Some("call_7".into()),
            name: "calculator".into(),
            arguments: json!({"expression": "2*3"}),
        };

        history.add_message(Role::User, "first");
        let calling = history.add(Message::assistant("").with_tool_calls(vec![call]));
        let answered = history.add(Message::tool("call_7", "6"));

        assert_eq!(calling, answered);
        assert_eq!(history.turn_count(), 2);
        assert_eq!(history.message_count(), 3);

        history.add_message(Role::User, "next");

        assert_eq!(texts(&history), vec!["", "6", "next"]);
    }

    #[test]
    fn open_turn_groups_messages() {
        let mut history = ChatHistory::with_max_turns(1);
        history.add_message(Role::User, "old");

        let turn = history.begin_turn();
        history.add_message(Role::User, "question");
        history.add_message(Role::Assistant, "answer");
        history.end_turn();

        assert_eq!(texts(&history), vec!["question", "answer"]);
        assert_eq!(history.turn_of(0), Some(turn));
        assert_eq!(history.turn_of(1), Some(turn));
        assert_eq!(history.current_turn(), None);
    }

    #[test]
    fn zero_bound_is_clamped_to_one_turn() {
        let mut history = ChatHistory::with_max_turns(0);
        history.add_message(Role::User, "a");
        history.add_message(Role::User, "b");

        assert_eq!(history.max_turns(), Some(1));
        assert_eq!(texts(&history), vec!["b"]);
    }

    #[test]
    fn deletes_whole_turns() {
        let mut history = ChatHistory::new();
        let first = history.add_message(Role::User, "a");
        let turn = history.begin_turn();
        history.add_message(Role::User, "b");
        history.add_message(Role::Assistant, "c");

        history.delete_turn(turn).unwrap();

        assert_eq!(texts(&history), vec!["a"]);
        assert_eq!(history.current_turn(), None);
        assert!(matches!(
            history.delete_turn(turn),
            Err(AtomicError::TurnNotFound(id)) if id == turn
        ));
        assert!(history.delete_turn(first).is_ok());
        assert!(history.is_empty());
    }

    #[test]
    fn failed_load_keeps_existing_state() {
        let mut history = ChatHistory::new();
        history.add_message(Role::User, "kept");

        let err = history
            .load(vec![
                json!({"role": "user", "content": "fine"}),
                json!({"role": "user", "content": 17}),
            ])
            .unwrap_err();

        match err {
            AtomicError::Validation { path, .. } => assert_eq!(path, "$[1]"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(texts(&history), vec!["kept"]);
    }

    #[test]
    fn load_applies_the_retention_bound() {
        let mut history = ChatHistory::with_max_turns(2);
        history
            .load(vec![
                json!({"role": "user", "content": "a"}),
                json!({"role": "assistant", "content": "b"}),
                json!({"role": "user", "content": "c"}),
            ])
            .unwrap();

        assert_eq!(texts(&history), vec!["b", "c"]);
    }
}
