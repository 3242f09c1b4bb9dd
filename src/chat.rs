//! 對話小助手 Orchestrator：append-only 的訊息串，開場白由助理起頭。
//! 對話還沒開始 (只有開場白) 時切換變體，開場白原地換掉，不新增。

use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::models::{ChatMessage, ChatRole, ScriptVariant};
use crate::scholar::ScholarApi;

fn greeting(variant: ScriptVariant) -> &'static str {
    variant.pick(
        "您好，后学。我是兰台学术助理。关于中国历史、古籍或人物典故，有什么我可以为您解答的吗？",
        "您好，後學。我是蘭台學術助理。關於中國歷史、古籍或人物典故，有什麼我可以為您解答的嗎？",
    )
}

/// AI 回了空字串時的替代訊息
fn empty_reply_fallback(variant: ScriptVariant) -> &'static str {
    variant.pick(
        "抱歉，无法生成回应。请再试一次。",
        "抱歉，無法生成回應。請再試一次。",
    )
}

/// 呼叫失敗時給使用者看的致歉訊息
fn apology(variant: ScriptVariant) -> &'static str {
    variant.pick(
        "目前连线不稳定，请稍后再试。",
        "目前連線不穩定，請稍後再試。",
    )
}

struct ChatInner {
    messages: Vec<ChatMessage>,
    loading: bool,
    variant: ScriptVariant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub messages: Vec<ChatMessage>,
    pub loading: bool,
    pub variant: ScriptVariant,
}

pub struct ChatOrchestrator<S> {
    scholar: Arc<S>,
    inner: Mutex<ChatInner>,
}

impl<S: ScholarApi> ChatOrchestrator<S> {
    pub fn new(scholar: Arc<S>, variant: ScriptVariant) -> Self {
        Self {
            scholar,
            inner: Mutex::new(ChatInner {
                messages: vec![ChatMessage::new(ChatRole::Model, greeting(variant))],
                loading: false,
                variant,
            }),
        }
    }

    /// 輸入框該不該收 (載入中或空輸入都不收)
    pub fn can_send(&self, input: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        !inner.loading && !input.trim().is_empty()
    }

    pub async fn send(&self, input: &str) {
        let input = input.trim().to_string();

        let (history, variant) = {
            let mut inner = self.inner.lock().unwrap();
            if input.is_empty() || inner.loading {
                return;
            }
            inner.loading = true;
            inner
                .messages
                .push(ChatMessage::new(ChatRole::User, input.clone()));

            let history: Vec<(String, String)> = inner
                .messages
                .iter()
                .map(|m| {
                    let role = match m.role {
                        ChatRole::User => "user",
                        ChatRole::Model => "model",
                    };
                    (role.to_string(), m.content.clone())
                })
                .collect();
            (history, inner.variant)
        };

        let result = self.scholar.chat(&history, variant).await;

        let mut inner = self.inner.lock().unwrap();
        let reply = match result {
            Ok(text) if text.is_empty() => empty_reply_fallback(variant).to_string(),
            Ok(text) => text,
            Err(e) => {
                eprintln!("❌ [Chat] 對話失敗: {}", e);
                apology(variant).to_string()
            }
        };
        inner.messages.push(ChatMessage::new(ChatRole::Model, reply));
        inner.loading = false;
    }

    /// 只剩開場白時原地重生開場白；對話開始後不動既有訊息
    pub fn set_variant(&self, variant: ScriptVariant) {
        let mut inner = self.inner.lock().unwrap();
        inner.variant = variant;
        if inner.messages.len() == 1 {
            inner.messages[0] = ChatMessage::new(ChatRole::Model, greeting(variant));
        }
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let inner = self.inner.lock().unwrap();
        ChatSnapshot {
            messages: inner.messages.clone(),
            loading: inner.loading,
            variant: inner.variant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Biography, InlineImage, ScriptVariant};
    use crate::ClientError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubScholar {
        reply: String,
        fail: AtomicBool,
        slow: bool,
        chat_calls: AtomicUsize,
        histories: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl StubScholar {
        fn with_reply(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                fail: AtomicBool::new(false),
                slow: false,
                chat_calls: AtomicUsize::new(0),
                histories: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ScholarApi for StubScholar {
        async fn fetch_biography(
            &self,
            _query: &str,
            _variant: ScriptVariant,
        ) -> Result<Option<Biography>, ClientError> {
            Ok(None)
        }

        async fn interpret_text(
            &self,
            _passage: &str,
            _question: &str,
            _variant: ScriptVariant,
        ) -> Result<String, ClientError> {
            Ok(String::new())
        }

        async fn chat(
            &self,
            history: &[(String, String)],
            _variant: ScriptVariant,
        ) -> Result<String, ClientError> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            self.histories.lock().unwrap().push(history.to_vec());
            if self.slow {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::Remote("stub 故障".to_string()));
            }
            Ok(self.reply.clone())
        }

        async fn edit_image(
            &self,
            _image: &InlineImage,
            _instruction: &str,
        ) -> Result<Option<InlineImage>, ClientError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn seeds_greeting_for_variant() {
        let scholar = Arc::new(StubScholar::with_reply(""));
        let orch = ChatOrchestrator::new(scholar, ScriptVariant::Traditional);

        let snap = orch.snapshot();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].role, ChatRole::Model);
        assert_eq!(snap.messages[0].content, greeting(ScriptVariant::Traditional));
    }

    #[tokio::test]
    async fn variant_toggle_replaces_lone_greeting_in_place() {
        let scholar = Arc::new(StubScholar::with_reply(""));
        let orch = ChatOrchestrator::new(scholar, ScriptVariant::Simplified);

        orch.set_variant(ScriptVariant::Traditional);

        let snap = orch.snapshot();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].content, greeting(ScriptVariant::Traditional));
    }

    #[tokio::test]
    async fn variant_toggle_after_conversation_keeps_messages() {
        let scholar = Arc::new(StubScholar::with_reply("回覆"));
        let orch = ChatOrchestrator::new(scholar, ScriptVariant::Simplified);

        orch.send("汲黯是誰？").await;
        let before = orch.snapshot().messages.clone();

        orch.set_variant(ScriptVariant::Traditional);

        let after = orch.snapshot().messages;
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].content, before[0].content);
    }

    #[tokio::test]
    async fn send_appends_user_and_model_turns() {
        let scholar = Arc::new(StubScholar::with_reply("汲黯，西漢名臣。"));
        let orch = ChatOrchestrator::new(scholar.clone(), ScriptVariant::Simplified);

        orch.send("汲黯是誰？").await;

        let snap = orch.snapshot();
        assert!(!snap.loading);
        assert_eq!(snap.messages.len(), 3);
        assert_eq!(snap.messages[1].role, ChatRole::User);
        assert_eq!(snap.messages[1].content, "汲黯是誰？");
        assert_eq!(snap.messages[2].content, "汲黯，西漢名臣。");

        // 送出去的 history 含開場白與最新一則使用者訊息
        let histories = scholar.histories.lock().unwrap();
        let last = histories.last().unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last.last().unwrap().0, "user");
        assert_eq!(last.last().unwrap().1, "汲黯是誰？");
    }

    #[tokio::test]
    async fn failure_appends_apology_in_active_variant() {
        let scholar = Arc::new(StubScholar::with_reply(""));
        scholar.fail.store(true, Ordering::SeqCst);
        let orch = ChatOrchestrator::new(scholar, ScriptVariant::Traditional);

        orch.send("問題").await;

        let snap = orch.snapshot();
        assert!(!snap.loading);
        assert_eq!(
            snap.messages.last().unwrap().content,
            apology(ScriptVariant::Traditional)
        );
    }

    #[tokio::test]
    async fn empty_reply_gets_fallback_text() {
        let scholar = Arc::new(StubScholar::with_reply(""));
        let orch = ChatOrchestrator::new(scholar, ScriptVariant::Simplified);

        orch.send("問題").await;

        assert_eq!(
            orch.snapshot().messages.last().unwrap().content,
            empty_reply_fallback(ScriptVariant::Simplified)
        );
    }

    #[tokio::test]
    async fn blank_input_is_refused() {
        let scholar = Arc::new(StubScholar::with_reply("回覆"));
        let orch = ChatOrchestrator::new(scholar.clone(), ScriptVariant::Simplified);

        assert!(!orch.can_send("   "));
        orch.send("   ").await;

        assert_eq!(orch.snapshot().messages.len(), 1);
        assert_eq!(scholar.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_while_loading_is_refused() {
        let scholar = Arc::new(StubScholar {
            reply: "回覆".to_string(),
            fail: AtomicBool::new(false),
            slow: true,
            chat_calls: AtomicUsize::new(0),
            histories: Mutex::new(Vec::new()),
        });
        let orch = Arc::new(ChatOrchestrator::new(
            scholar.clone(),
            ScriptVariant::Simplified,
        ));

        let first = tokio::spawn({
            let orch = orch.clone();
            async move { orch.send("第一則").await }
        });
        tokio::task::yield_now().await;
        assert!(!orch.can_send("第二則"));
        orch.send("第二則").await;
        first.await.unwrap();

        // 第二則在載入中被拒絕，最後只有 開場白 + 第一則 + 回覆
        let snap = orch.snapshot();
        assert_eq!(snap.messages.len(), 3);
        assert_eq!(scholar.chat_calls.load(Ordering::SeqCst), 1);
    }
}
