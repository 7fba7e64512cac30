use serde::{Deserialize, Serialize};

/// Instruction sent with a continuation request after a cut-off reply.
pub const CONTINUE_INSTRUCTION: &str =
    "Continue exactly where you stopped. Do not repeat what you already wrote.";

/// Who wrote a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Assistant,
}

impl Role {
    /// Role name in chat-completion APIs.
    pub fn api_role(&self) -> &'static str {
        match self {
            Self::Customer => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Label used in human-readable transcripts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Assistant => "Assistant",
        }
    }
}

/// A single entry in a contact's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn customer(text: impl Into<String>) -> Self {
        Self {
            role: Role::Customer,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A structured message for chat-completion APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// Everything the responder needs to produce one reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// System prompt prepended to every request.
    pub system_prompt: String,
    /// Conversation history (oldest first).
    pub history: Vec<Turn>,
    /// The new inbound text being answered.
    pub current_message: String,
}

impl Context {
    pub fn new(system_prompt: &str, history: Vec<Turn>, current_message: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            history,
            current_message: current_message.to_string(),
        }
    }

    /// Build the follow-up request asking the responder to finish `partial`.
    ///
    /// The original inbound text and the partial reply become regular turns,
    /// and the continue instruction takes the place of the current message.
    pub fn continuation(&self, partial: &str) -> Self {
        let mut history = self.history.clone();
        history.push(Turn::customer(self.current_message.clone()));
        history.push(Turn::assistant(partial));
        Self {
            system_prompt: self.system_prompt.clone(),
            history,
            current_message: CONTINUE_INSTRUCTION.to_string(),
        }
    }

    /// Convert context to structured API messages.
    ///
    /// Returns `(system_prompt, messages)`; the system prompt is kept apart
    /// so each provider can place it where its API expects it.
    pub fn to_api_messages(&self) -> (String, Vec<ApiMessage>) {
        let mut messages = Vec::with_capacity(self.history.len() + 1);

        for turn in &self.history {
            messages.push(ApiMessage {
                role: turn.role.api_role().to_string(),
                content: turn.text.clone(),
            });
        }

        messages.push(ApiMessage {
            role: "user".to_string(),
            content: self.current_message.clone(),
        });

        (self.system_prompt.clone(), messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_api_messages_basic() {
        let ctx = Context::new("Be helpful.", Vec::new(), "hello");
        let (system, messages) = ctx.to_api_messages();
        assert_eq!(system, "Be helpful.");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "hello");
    }

    #[test]
    fn test_to_api_messages_with_history() {
        let ctx = Context::new(
            "Be helpful.",
            vec![Turn::assistant("Offer: 3-pack for 149"), Turn::customer("Hi")],
            "How much is delivery?",
        );
        let (_, messages) = ctx.to_api_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "assistant");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].content, "How much is delivery?");
    }

    #[test]
    fn test_continuation_appends_partial() {
        let ctx = Context::new("sys", vec![Turn::assistant("offer")], "which one?");
        let cont = ctx.continuation("We have two options: 1");
        assert_eq!(cont.history.len(), 3);
        assert_eq!(cont.history[1], Turn::customer("which one?"));
        assert_eq!(cont.history[2], Turn::assistant("We have two options: 1"));
        assert_eq!(cont.current_message, CONTINUE_INSTRUCTION);
        assert_eq!(cont.system_prompt, "sys");
    }
}
