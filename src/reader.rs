//! 閱讀頁 Orchestrator：開卷載入全文，外加一條獨立的「解析全文」子流程。
//! 變體切換只重載頁面本身；已生成的解讀文字保留，換到新的卷才清掉。

use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::archive::ArchiveApi;
use crate::flow::{Replay, RequestGuard};
use crate::models::{PageContent, ScriptVariant};
use crate::scholar::ScholarApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderState {
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpretState {
    Idle,
    Interpreting,
    Ready,
    Failed,
}

/// 「解析全文」的固定指令，措辭跟著變體走
fn interpret_instruction(variant: ScriptVariant) -> &'static str {
    variant.pick(
        "请解释这段文字的核心意义，并将其翻译为现代汉语。如果有生僻字或历史背景，请一并说明。",
        "請解釋這段文字的核心意義，並將其翻譯為現代漢語。如果有生僻字或歷史背景，請一併說明。",
    )
}

struct ReaderInner {
    state: ReaderState,
    title: String,
    variant: ScriptVariant,
    page: Option<PageContent>,
    interpret_state: InterpretState,
    interpretation: Option<String>,
    load_guard: RequestGuard,
    interp_guard: RequestGuard,
    replay: Replay<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReaderSnapshot {
    pub state: ReaderState,
    pub title: String,
    pub variant: ScriptVariant,
    pub page: Option<PageContent>,
    pub interpret_state: InterpretState,
    pub interpretation: Option<String>,
}

pub struct ReaderOrchestrator<A, S> {
    archive: Arc<A>,
    scholar: Arc<S>,
    inner: Mutex<ReaderInner>,
}

impl<A: ArchiveApi, S: ScholarApi> ReaderOrchestrator<A, S> {
    pub fn new(archive: Arc<A>, scholar: Arc<S>, variant: ScriptVariant) -> Self {
        Self {
            archive,
            scholar,
            inner: Mutex::new(ReaderInner {
                state: ReaderState::Idle,
                title: String::new(),
                variant,
                page: None,
                interpret_state: InterpretState::Idle,
                interpretation: None,
                load_guard: RequestGuard::new(),
                interp_guard: RequestGuard::new(),
                replay: Replay::new(),
            }),
        }
    }

    /// 換到新的卷：清掉解讀子流程，重新載入。
    /// title 必須已解碼 (不帶 URL encoding)。
    pub async fn open(&self, title: &str) {
        let title = title.trim().to_string();
        if title.is_empty() {
            return;
        }
        {
            let mut inner = self.inner.lock().unwrap();
            inner.interpret_state = InterpretState::Idle;
            inner.interpretation = None;
            // 進行中的解讀跟著作廢
            inner.interp_guard.begin();
        }
        self.load(title).await;
    }

    /// 變體切換只重載頁面；解讀結果不動
    pub async fn set_variant(&self, variant: ScriptVariant) {
        let rerun = {
            let mut inner = self.inner.lock().unwrap();
            inner.variant = variant;
            inner.replay.last()
        };
        if let Some(title) = rerun {
            println!("🈶 [Reader] 變體切換，重載頁面: '{}'", title);
            self.load(title).await;
        }
    }

    async fn load(&self, title: String) {
        let (token, variant) = {
            let mut inner = self.inner.lock().unwrap();
            let token = inner.load_guard.begin();
            inner.state = ReaderState::Loading;
            inner.title = title.clone();
            inner.replay.record(title.clone());
            (token, inner.variant)
        };

        let result = self.archive.fetch_page(&title, variant).await;

        let mut inner = self.inner.lock().unwrap();
        if !inner.load_guard.is_current(token) {
            println!("⏭️ [Reader] 較舊的載入已被取代，丟棄: '{}'", title);
            return;
        }

        match result {
            Ok(page) => {
                inner.state = ReaderState::Loaded;
                inner.page = Some(page);
            }
            Err(e) => {
                eprintln!("❌ [Reader] 頁面載入失敗: {}", e);
                inner.state = ReaderState::Failed;
                inner.page = None;
            }
        }
    }

    /// 使用者按下「解析全文」。只在有已載入頁面時有事做；
    /// 把目前頁面的全文連同固定指令送給 AI。
    pub async fn interpret(&self) {
        let (token, passage, variant) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.interpret_state == InterpretState::Interpreting {
                return;
            }
            let Some(page) = &inner.page else {
                return;
            };
            let passage = page.content.clone();
            let token = inner.interp_guard.begin();
            inner.interpret_state = InterpretState::Interpreting;
            (token, passage, inner.variant)
        };

        let result = self
            .scholar
            .interpret_text(&passage, interpret_instruction(variant), variant)
            .await;

        let mut inner = self.inner.lock().unwrap();
        if !inner.interp_guard.is_current(token) {
            println!("⏭️ [Reader] 解讀完成前已換卷，丟棄結果");
            return;
        }

        match result {
            Ok(text) => {
                inner.interpret_state = InterpretState::Ready;
                inner.interpretation = Some(text);
            }
            Err(e) => {
                eprintln!("❌ [Reader] 解讀失敗: {}", e);
                inner.interpret_state = InterpretState::Failed;
            }
        }
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        let inner = self.inner.lock().unwrap();
        ReaderSnapshot {
            state: inner.state,
            title: inner.title.clone(),
            variant: inner.variant,
            page: inner.page.clone(),
            interpret_state: inner.interpret_state,
            interpretation: inner.interpretation.clone(),
        }
    }
}
