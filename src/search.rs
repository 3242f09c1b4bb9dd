//! 搜尋頁 Orchestrator：同一組 (query, variant) 同時打 Wikisource 搜尋
//! 與人物小傳，兩邊都落地後才更新狀態。任一邊失敗就保留畫面上最後的
//! 結果 (不顯示錯誤橫幅)，這是刻意的取捨，不是 bug。

use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::archive::ArchiveApi;
use crate::flow::{Replay, RequestGuard};
use crate::models::{Biography, ScriptVariant, SearchResult};
use crate::scholar::ScholarApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchState {
    Idle,
    Searching,
    Populated,
    Empty,
    Failed,
}

struct SearchInner {
    state: SearchState,
    query: String,
    variant: ScriptVariant,
    results: Vec<SearchResult>,
    biography: Option<Biography>,
    guard: RequestGuard,
    replay: Replay<String>,
}

/// 給呈現層的唯讀快照
#[derive(Debug, Clone, Serialize)]
pub struct SearchSnapshot {
    pub state: SearchState,
    pub query: String,
    pub variant: ScriptVariant,
    pub results: Vec<SearchResult>,
    pub biography: Option<Biography>,
}

pub struct SearchOrchestrator<A, S> {
    archive: Arc<A>,
    scholar: Arc<S>,
    inner: Mutex<SearchInner>,
}

impl<A: ArchiveApi, S: ScholarApi> SearchOrchestrator<A, S> {
    pub fn new(archive: Arc<A>, scholar: Arc<S>, variant: ScriptVariant) -> Self {
        Self {
            archive,
            scholar,
            inner: Mutex::new(SearchInner {
                state: SearchState::Idle,
                query: String::new(),
                variant,
                results: Vec::new(),
                biography: None,
                guard: RequestGuard::new(),
                replay: Replay::new(),
            }),
        }
    }

    /// 使用者主動送出新查詢：立即清掉舊的小傳，再發起查詢
    pub async fn submit(&self, query: &str) {
        let query = query.trim().to_string();
        if query.is_empty() {
            return;
        }
        self.run(query, true).await;
    }

    /// 變體切換：畫面上有結果就用同一個 query 重跑，
    /// 且不清掉現有結果 (新結果到之前沿用舊畫面，避免閃爍)
    pub async fn set_variant(&self, variant: ScriptVariant) {
        let rerun = {
            let mut inner = self.inner.lock().unwrap();
            inner.variant = variant;
            if inner.results.is_empty() {
                None
            } else {
                inner.replay.last()
            }
        };
        if let Some(query) = rerun {
            println!("🈶 [Search] 變體切換，重跑查詢: '{}'", query);
            self.run(query, false).await;
        }
    }

    async fn run(&self, query: String, new_submission: bool) {
        let (token, variant) = {
            let mut inner = self.inner.lock().unwrap();
            let token = inner.guard.begin();
            inner.state = SearchState::Searching;
            inner.query = query.clone();
            if new_submission {
                inner.biography = None;
            }
            inner.replay.record(query.clone());
            (token, inner.variant)
        };

        // 兩個請求並行，等兩邊都落地 (all-complete join)
        let (hits, bio) = futures::join!(
            self.archive.search(&query, variant),
            self.scholar.fetch_biography(&query, variant)
        );

        let mut inner = self.inner.lock().unwrap();
        if !inner.guard.is_current(token) {
            println!("⏭️ [Search] 較舊的請求已被取代，丟棄回應: '{}'", query);
            return;
        }

        match (hits, bio) {
            (Ok(results), Ok(biography)) => {
                inner.state = if results.is_empty() {
                    SearchState::Empty
                } else {
                    SearchState::Populated
                };
                inner.results = results;
                inner.biography = biography;
            }
            (hits, bio) => {
                if let Err(e) = &hits {
                    eprintln!("❌ [Search] 搜尋失敗: {}", e);
                }
                if let Err(e) = &bio {
                    eprintln!("❌ [Search] 小傳查詢失敗: {}", e);
                }
                // 不做部分覆寫：結果與小傳都停在最後已知的值
                inner.state = SearchState::Failed;
            }
        }
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        let inner = self.inner.lock().unwrap();
        SearchSnapshot {
            state: inner.state,
            query: inner.query.clone(),
            variant: inner.variant,
            results: inner.results.clone(),
            biography: inner.biography.clone(),
        }
    }
}
