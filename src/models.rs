use regex::Regex;
use serde::{Deserialize, Serialize};

// --- 語言變體 (簡體 / 繁體) ---
// 不放全域狀態，由各 Orchestrator 的建構子明確傳入與保存。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptVariant {
    #[serde(rename = "zh-hans")]
    Simplified,
    #[serde(rename = "zh-hant")]
    Traditional,
}

impl ScriptVariant {
    /// Wikisource / Gemini 請求用的語言代碼
    pub fn code(&self) -> &'static str {
        match self {
            ScriptVariant::Simplified => "zh-hans",
            ScriptVariant::Traditional => "zh-hant",
        }
    }

    /// 依變體挑選字串 (對應前端的 t() helper)
    pub fn pick<'a>(&self, hans: &'a str, hant: &'a str) -> &'a str {
        match self {
            ScriptVariant::Simplified => hans,
            ScriptVariant::Traditional => hant,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "zh-hans" => Some(ScriptVariant::Simplified),
            "zh-hant" => Some(ScriptVariant::Traditional),
            _ => None,
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            ScriptVariant::Simplified => ScriptVariant::Traditional,
            ScriptVariant::Traditional => ScriptVariant::Simplified,
        }
    }
}

// --- Wikisource 搜尋結果 ---
// snippet 內含 Wikisource 的 <span class="searchmatch"> 標記，照原樣保留，
// 要純文字顯示時用 snippet_text()。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub pageid: u64,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub timestamp: String,
}

impl SearchResult {
    /// 去掉 snippet 裡的 HTML 標記 (CLI 顯示用)
    pub fn snippet_text(&self) -> String {
        let re = Regex::new(r"<[^>]+>").unwrap();
        re.replace_all(&self.snippet, "").to_string()
    }
}

// --- 單頁全文 ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub title: String,
    pub content: String,
    pub pageid: u64,
}

/// 遠端沒有 extract 時填入的固定內容 (非錯誤)
pub const NO_CONTENT_PLACEHOLDER: &str = "No content found.";

// --- 人物小傳 (Gemini 結構化輸出) ---
// 欄位名對齊 responseSchema，wire 格式是 camelCase。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Biography {
    pub is_person: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courtesy_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_significance: Option<String>,
}

// --- 對話訊息 ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    /// Unix 毫秒
    pub timestamp: u64,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: now,
        }
    }
}

// --- 行內圖片 (影像編輯介面用) ---
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    /// base64 編碼的原始位元組
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_codes_round_trip() {
        assert_eq!(ScriptVariant::Simplified.code(), "zh-hans");
        assert_eq!(ScriptVariant::Traditional.code(), "zh-hant");
        assert_eq!(
            ScriptVariant::from_code("zh-hant"),
            Some(ScriptVariant::Traditional)
        );
        assert_eq!(ScriptVariant::from_code("en"), None);
        assert_eq!(ScriptVariant::Simplified.toggle(), ScriptVariant::Traditional);
    }

    #[test]
    fn pick_follows_variant() {
        let v = ScriptVariant::Traditional;
        assert_eq!(v.pick("简", "繁"), "繁");
        assert_eq!(v.toggle().pick("简", "繁"), "简");
    }

    #[test]
    fn snippet_text_strips_markup() {
        let r = SearchResult {
            title: "史記".to_string(),
            pageid: 42,
            snippet: "<span class=\"searchmatch\">汲黯</span>字長孺".to_string(),
            timestamp: String::new(),
        };
        assert_eq!(r.snippet_text(), "汲黯字長孺");
    }

    #[test]
    fn biography_parses_camel_case_wire_format() {
        let json = r#"{
            "isPerson": true,
            "name": "汲黯",
            "courtesyName": "長孺",
            "years": "?-前112年",
            "bio": "西漢名臣。",
            "historicalSignificance": "以直諫聞名。"
        }"#;
        let bio: Biography = serde_json::from_str(json).unwrap();
        assert!(bio.is_person);
        assert_eq!(bio.name, "汲黯");
        assert_eq!(bio.courtesy_name.as_deref(), Some("長孺"));
    }

    #[test]
    fn biography_optional_fields_default_to_none() {
        let bio: Biography = serde_json::from_str(r#"{"isPerson": false}"#).unwrap();
        assert!(!bio.is_person);
        assert!(bio.courtesy_name.is_none());
        assert!(bio.bio.is_none());
    }
}
