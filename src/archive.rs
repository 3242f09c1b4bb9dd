//! Wikisource 查詢 Client：全文搜尋 + 單頁 extract。
//! 兩個操作都是單純 request/response，不做快取、不重試、不分頁。

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{PageContent, ScriptVariant, SearchResult, NO_CONTENT_PLACEHOLDER};
use crate::ClientError;

/// 固定上限：主命名空間、依相關性排序、最多 20 筆
const SEARCH_LIMIT: usize = 20;

#[async_trait]
pub trait ArchiveApi: Send + Sync {
    async fn search(
        &self,
        query: &str,
        variant: ScriptVariant,
    ) -> Result<Vec<SearchResult>, ClientError>;

    /// title 必須是已解碼的原始標題 (不要帶 URL encoding)
    async fn fetch_page(
        &self,
        title: &str,
        variant: ScriptVariant,
    ) -> Result<PageContent, ClientError>;
}

pub struct ArchiveClient {
    client: reqwest::Client,
    api_base: String,
}

impl ArchiveClient {
    pub fn new(api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
        }
    }
}

#[async_trait]
impl ArchiveApi for ArchiveClient {
    async fn search(
        &self,
        query: &str,
        variant: ScriptVariant,
    ) -> Result<Vec<SearchResult>, ClientError> {
        println!("🔍 [Archive] 全文搜尋: '{}' ({})", query, variant.code());

        let limit = SEARCH_LIMIT.to_string();
        let resp = self
            .client
            .get(&self.api_base)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("format", "json"),
                ("origin", "*"),
                ("srnamespace", "0"),
                ("srlimit", limit.as_str()),
                ("uselang", variant.code()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Remote(format!(
                "Wikisource 搜尋回應錯誤: {}",
                resp.status()
            )));
        }

        let json: Value = resp.json().await?;
        parse_search_response(&json)
    }

    async fn fetch_page(
        &self,
        title: &str,
        variant: ScriptVariant,
    ) -> Result<PageContent, ClientError> {
        println!("📖 [Archive] 抓取頁面: '{}' ({})", title, variant.code());

        let resp = self
            .client
            .get(&self.api_base)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("titles", title),
                ("format", "json"),
                ("origin", "*"),
                ("explaintext", "true"),
                ("uselang", variant.code()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Remote(format!(
                "Wikisource 頁面回應錯誤: {}",
                resp.status()
            )));
        }

        let json: Value = resp.json().await?;
        parse_page_response(&json, title)
    }
}

/// 把 query.search[] 轉成結果列表，順序 = 遠端的相關性排序。
/// 缺 query.search 視為格式錯誤；單筆缺 title/pageid 也是。
fn parse_search_response(json: &Value) -> Result<Vec<SearchResult>, ClientError> {
    let hits = json["query"]["search"]
        .as_array()
        .ok_or_else(|| ClientError::ResponseFormat("缺少 query.search 欄位".to_string()))?;

    let mut results = Vec::with_capacity(hits.len().min(SEARCH_LIMIT));
    for hit in hits.iter().take(SEARCH_LIMIT) {
        let result: SearchResult = serde_json::from_value(hit.clone())
            .map_err(|e| ClientError::ResponseFormat(format!("搜尋結果欄位不完整: {}", e)))?;
        results.push(result);
    }
    Ok(results)
}

/// query.pages 是以 pageid 為 key 的物件，取第一個。
/// 沒有 extract (查無此頁或空頁) 不是錯誤，填固定內容。
fn parse_page_response(json: &Value, requested_title: &str) -> Result<PageContent, ClientError> {
    let pages = json["query"]["pages"]
        .as_object()
        .ok_or_else(|| ClientError::ResponseFormat("缺少 query.pages 欄位".to_string()))?;

    let page = pages
        .values()
        .next()
        .ok_or_else(|| ClientError::ResponseFormat("query.pages 是空的".to_string()))?;

    let title = page["title"]
        .as_str()
        .unwrap_or(requested_title)
        .to_string();
    let pageid = page["pageid"].as_u64().unwrap_or(0);
    let content = match page["extract"].as_str() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NO_CONTENT_PLACEHOLDER.to_string(),
    };

    Ok(PageContent {
        title,
        content,
        pageid,
    })
}
