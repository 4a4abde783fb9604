use anyhow::Result;
use tracing::debug;

use crate::model::Message;
use crate::model_gateway::{ModelGateway, ModelGatewayRequest};

/// Conversation state shared by every chat user: a transcript that only grows
/// and the personality injected as a system message on each request.
pub struct AiSession<G> {
    gateway: G,
    history: Vec<Message>,
    personality: String,
    max_history: Option<usize>,
}

impl<G: ModelGateway> AiSession<G> {
    pub fn new(gateway: G, personality: impl Into<String>) -> Self {
        Self {
            gateway,
            history: Vec::new(),
            personality: personality.into(),
            max_history: None,
        }
    }

    pub fn with_max_history(mut self, max_history: Option<usize>) -> Self {
        self.max_history = max_history.filter(|limit| *limit > 0);
        self
    }

    pub fn personality(&self) -> &str {
        &self.personality
    }

    pub fn set_personality(&mut self, personality: impl Into<String>) {
        self.personality = personality.into();
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Appends the current personality and `prompt`, then sends the whole
    /// history. Both messages stay in the history even if the call fails.
    pub async fn respond(&mut self, prompt: &str) -> Result<String> {
        self.history.push(Message::system(self.personality.clone()));
        self.history.push(Message::user(prompt));
        self.trim_history();

        debug!(
            history_len = self.history.len(),
            prompt_len = prompt.len(),
            "requesting AI response"
        );
        let response = self
            .gateway
            .chat(ModelGatewayRequest {
                messages: self.history.clone(),
            })
            .await?;
        Ok(response.content)
    }

    fn trim_history(&mut self) {
        let Some(limit) = self.max_history else {
            return;
        };
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use anyhow::anyhow;
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::AiSession;
    use crate::model::{Message, MessageRole};
    use crate::model_gateway::{
        ModelGateway, ModelGatewayFuture, ModelGatewayRequest, ModelGatewayResponse,
    };

    /// Records every request and answers with a fixed reply or error.
    #[derive(Clone, Default)]
    pub(crate) struct StubGateway {
        pub calls: Rc<RefCell<Vec<Vec<Message>>>>,
        pub reply: Option<String>,
    }

    impl StubGateway {
        pub fn ok(reply: impl Into<String>) -> Self {
            Self {
                calls: Rc::default(),
                reply: Some(reply.into()),
            }
        }

        pub fn failing() -> Self {
            Self::default()
        }
    }

    impl ModelGateway for StubGateway {
        fn chat<'a>(&'a self, request: ModelGatewayRequest) -> ModelGatewayFuture<'a> {
            self.calls.borrow_mut().push(request.messages);
            let result = match &self.reply {
                Some(content) => Ok(ModelGatewayResponse {
                    content: content.clone(),
                }),
                None => Err(anyhow!("AI service unavailable")),
            };
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn respond_sends_personality_then_prompt() {
        let gateway = StubGateway::ok("hello there");
        let calls = gateway.calls.clone();
        let mut session = AiSession::new(gateway, "grumpy");

        let answer = session.respond("hi").await.expect("respond should succeed");

        assert_eq!(answer, "hello there");
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![Message::system("grumpy"), Message::user("hi")]
        );
    }

    #[tokio::test]
    async fn history_grows_by_two_per_call_and_is_resent() {
        let gateway = StubGateway::ok("ok");
        let calls = gateway.calls.clone();
        let mut session = AiSession::new(gateway, "grumpy");

        for round in 1..=3 {
            session.respond("again").await.expect("respond should succeed");
            assert_eq!(session.history().len(), round * 2);
        }

        let calls = calls.borrow();
        assert_eq!(calls[2].len(), 6);
        assert_eq!(calls[2][0], Message::system("grumpy"));
    }

    #[tokio::test]
    async fn personality_change_applies_to_next_call_only() {
        let gateway = StubGateway::ok("ok");
        let mut session = AiSession::new(gateway, "grumpy");

        session.respond("one").await.expect("respond should succeed");
        session.set_personality("cheerful");
        session.respond("two").await.expect("respond should succeed");

        let roles: Vec<(MessageRole, &str)> = session
            .history()
            .iter()
            .map(|msg| (msg.role, msg.content.as_str()))
            .collect();
        assert_eq!(
            roles,
            vec![
                (MessageRole::System, "grumpy"),
                (MessageRole::User, "one"),
                (MessageRole::System, "cheerful"),
                (MessageRole::User, "two"),
            ]
        );
    }

    #[tokio::test]
    async fn failed_call_still_records_messages() {
        let mut session = AiSession::new(StubGateway::failing(), "grumpy");

        let err = session.respond("hi").await.expect_err("respond should fail");

        assert!(err.to_string().contains("unavailable"));
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn max_history_keeps_newest_messages() {
        let mut session =
            AiSession::new(StubGateway::ok("ok"), "grumpy").with_max_history(Some(3));

        session.respond("one").await.expect("respond should succeed");
        session.respond("two").await.expect("respond should succeed");

        assert_eq!(session.history().len(), 3);
        assert_eq!(session.history()[2], Message::user("two"));
    }
}
