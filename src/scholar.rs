//! Gemini generateContent Client：人物小傳 (結構化 JSON)、古文解讀、
//! 多輪對話，以及影像編輯介面。輸出語言一律由 ScriptVariant 釘死。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::{Biography, InlineImage, ScriptVariant};
use crate::ClientError;

/// 解讀用的文本硬截斷上限 (字元數，不是 byte)
const PASSAGE_LIMIT: usize = 2000;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[async_trait]
pub trait ScholarApi: Send + Sync {
    /// 查無此人、或 AI 輸出解析失敗 → Ok(None)，不是錯誤
    async fn fetch_biography(
        &self,
        query: &str,
        variant: ScriptVariant,
    ) -> Result<Option<Biography>, ClientError>;

    async fn interpret_text(
        &self,
        passage: &str,
        question: &str,
        variant: ScriptVariant,
    ) -> Result<String, ClientError>;

    /// history 必須已含最新的一則使用者訊息；實際只送最後一則
    async fn chat(
        &self,
        history: &[(String, String)],
        variant: ScriptVariant,
    ) -> Result<String, ClientError>;

    /// 回傳 None 表示回應裡沒有圖片 part
    async fn edit_image(
        &self,
        image: &InlineImage,
        instruction: &str,
    ) -> Result<Option<InlineImage>, ClientError>;
}

pub struct ScholarClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    image_model: String,
}

impl ScholarClient {
    pub fn new(api_key: String, model: String, image_model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            image_model,
        }
    }

    /// 共用的 generateContent 呼叫；Key 沒設時在這裡擋下 (Remote)。
    async fn generate(&self, model: &str, body: Value) -> Result<Value, ClientError> {
        if self.api_key.is_empty() {
            return Err(ClientError::Remote("缺少 GOOGLE_API_KEY".to_string()));
        }

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE, model, self.api_key
        );

        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(ClientError::Remote(format!(
                "Gemini API 回應錯誤: {}",
                status
            )));
        }

        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl ScholarApi for ScholarClient {
    async fn fetch_biography(
        &self,
        query: &str,
        variant: ScriptVariant,
    ) -> Result<Option<Biography>, ClientError> {
        println!("🏛️ [Scholar] 查詢人物小傳: '{}' ({})", query, variant.code());

        let body = biography_request(query, variant);
        let json = self.generate(&self.model, body).await?;
        let text = extract_text(&json)?;

        // 解析失敗或 isPerson=false 都收斂成 None，收斂點只有這裡
        Ok(collapse_biography(parse_biography(&text)))
    }

    async fn interpret_text(
        &self,
        passage: &str,
        question: &str,
        variant: ScriptVariant,
    ) -> Result<String, ClientError> {
        println!("📜 [Scholar] 解讀文本 ({} 字)", passage.chars().count());

        let body = json!({
            "contents": [{ "parts": [{ "text": interpret_prompt(passage, question) }] }],
            "systemInstruction": {
                "parts": [{ "text": scholar_system_instruction(variant) }]
            }
        });

        let json = self.generate(&self.model, body).await?;
        extract_text(&json)
    }

    async fn chat(
        &self,
        history: &[(String, String)],
        variant: ScriptVariant,
    ) -> Result<String, ClientError> {
        let (_, last_message) = history
            .last()
            .ok_or_else(|| ClientError::Remote("對話歷史是空的".to_string()))?;

        println!("💬 [Scholar] 對話回合 ({} 則歷史)", history.len());

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": last_message }] }],
            "systemInstruction": {
                "parts": [{ "text": chat_system_instruction(variant) }]
            }
        });

        let json = self.generate(&self.model, body).await?;
        extract_text(&json)
    }

    async fn edit_image(
        &self,
        image: &InlineImage,
        instruction: &str,
    ) -> Result<Option<InlineImage>, ClientError> {
        println!("🖼️ [Scholar] 影像編輯 ({})", image.mime_type);

        let body = json!({
            "contents": [{
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": image.data
                        }
                    },
                    { "text": instruction }
                ]
            }]
        });

        let json = self.generate(&self.image_model, body).await?;
        Ok(extract_image(&json))
    }
}

/// AI 輸出要用哪種文字，指令裡講白話講清楚
fn script_name(variant: ScriptVariant) -> &'static str {
    variant.pick(
        "Simplified Chinese (简体中文)",
        "Traditional Chinese (繁體中文)",
    )
}

fn scholar_system_instruction(variant: ScriptVariant) -> String {
    format!(
        "You are a Master Scholar of Chinese History and Classical Literature. \
         Your goal is to help users understand classical texts (Wenyanwen). \
         ALWAYS output in {}. \
         Provide translations into modern Chinese, explain historical context, \
         define archaic terms, and identify allusions. \
         Keep your tone respectful, scholarly, and insightful.",
        script_name(variant)
    )
}

fn chat_system_instruction(variant: ScriptVariant) -> String {
    format!(
        "You are a Master Scholar of Chinese History. You help researchers find \
         information in classical texts. ALWAYS respond in {}. \
         Your name is Lantai Assistant (蘭台助手/兰台助手).",
        script_name(variant)
    )
}

/// 超過 2000 字的部分對 prompt 沒有額外價值，硬截斷 (不是摘要)
fn truncate_passage(passage: &str) -> String {
    passage.chars().take(PASSAGE_LIMIT).collect()
}

fn interpret_prompt(passage: &str, question: &str) -> String {
    format!(
        "Text context: \"{}...\" \n\n User Question: \"{}\"",
        truncate_passage(passage),
        question
    )
}

fn biography_request(query: &str, variant: ScriptVariant) -> Value {
    let prompt = format!(
        "Analyze if \"{}\" is a historical Chinese figure. If so, provide their \
         biographical details in JSON format. Strictly ensure all field values \
         (name, courtesyName, bio, historicalSignificance) are in {}.",
        query,
        script_name(variant)
    );

    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "isPerson": {
                        "type": "BOOLEAN",
                        "description": "Whether the query refers to a specific historical person"
                    },
                    "name": { "type": "STRING" },
                    "courtesyName": {
                        "type": "STRING",
                        "description": "Courtesy name (字) or Art name (號/号)"
                    },
                    "years": { "type": "STRING", "description": "Birth and death years" },
                    "bio": { "type": "STRING", "description": "Biographical overview in Chinese" },
                    "historicalSignificance": {
                        "type": "STRING",
                        "description": "Key contribution to history in Chinese"
                    }
                },
                "required": ["isPerson"]
            }
        }
    })
}

/// 結構化輸出的解析本身是型別化的 Result，方便單測
fn parse_biography(text: &str) -> Result<Biography, ClientError> {
    serde_json::from_str::<Biography>(text)
        .map_err(|e| ClientError::ResponseFormat(format!("人物小傳 JSON 解析失敗: {}", e)))
}

/// 收斂規則：解析失敗 → None；isPerson=false → None
fn collapse_biography(parsed: Result<Biography, ClientError>) -> Option<Biography> {
    match parsed {
        Ok(bio) if bio.is_person => Some(bio),
        Ok(_) => None,
        Err(e) => {
            eprintln!("⚠️ [Scholar] 小傳輸出無法解析，視為查無此人: {}", e);
            None
        }
    }
}

/// 抓 candidates[0].content.parts[0].text
fn extract_text(json: &Value) -> Result<String, ClientError> {
    json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ClientError::ResponseFormat("Gemini 回應缺少文字內容".to_string()))
}

/// 掃 candidates[0].content.parts 找第一個 inlineData
fn extract_image(json: &Value) -> Option<InlineImage> {
    let parts = json["candidates"][0]["content"]["parts"].as_array()?;
    for part in parts {
        let inline = &part["inlineData"];
        if let (Some(mime), Some(data)) = (inline["mimeType"].as_str(), inline["data"].as_str()) {
            return Some(InlineImage {
                mime_type: mime.to_string(),
                data: data.to_string(),
            });
        }
    }
    None
}
