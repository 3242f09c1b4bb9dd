pub mod archive;
pub mod chat;
pub mod flow;
pub mod models;
pub mod reader;
pub mod scholar;
pub mod search;

use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use thiserror::Error;

use archive::ArchiveClient;
use chat::ChatOrchestrator;
use models::ScriptVariant;
use reader::ReaderOrchestrator;
use scholar::ScholarClient;
use search::SearchOrchestrator;

// --- 設定區 ---
const WIKISOURCE_API: &str = "https://zh.wikisource.org/w/api.php";
const GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

// --- 錯誤分類 ---
// Network: 連不上後端 / 傳輸層失敗
// Remote:  後端有回應但回報應用層錯誤 (含缺 API Key、HTTP 非 2xx)
// ResponseFormat: 後端有回應但長得不是預期形狀
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("網路連線失敗: {0}")]
    Network(#[from] reqwest::Error),

    #[error("遠端服務錯誤: {0}")]
    Remote(String),

    #[error("回應格式不符: {0}")]
    ResponseFormat(String),
}

/// 全站共用狀態：兩個 Client + 三個頁面 Orchestrator。
/// Orchestrator 自己管自己的狀態，這裡只負責組裝與變體切換的扇出。
pub struct AppState {
    pub archive: Arc<ArchiveClient>,
    pub scholar: Arc<ScholarClient>,
    pub search: SearchOrchestrator<ArchiveClient, ScholarClient>,
    pub reader: ReaderOrchestrator<ArchiveClient, ScholarClient>,
    pub chat: ChatOrchestrator<ScholarClient>,
}

impl AppState {
    /// 切換語言變體：三個 Orchestrator 各自決定要不要重跑上一次動作。
    pub async fn set_variant(&self, variant: ScriptVariant) {
        self.chat.set_variant(variant);
        self.search.set_variant(variant).await;
        self.reader.set_variant(variant).await;
    }
}

pub async fn init_system() -> Result<Arc<AppState>, Box<dyn std::error::Error>> {
    dotenv().ok();

    let api_base = env::var("WIKISOURCE_API").unwrap_or(WIKISOURCE_API.to_string());
    println!("📚 Wikisource API: {}", api_base);

    // 注意：缺 Key 不是啟動錯誤，第一次呼叫 AI 時才會以 Remote 錯誤浮現
    let google_api_key = env::var("GOOGLE_API_KEY").unwrap_or_default();
    if google_api_key.is_empty() {
        println!("⚠️ 未設定 GOOGLE_API_KEY，AI 相關功能將在呼叫時回報錯誤");
    }

    let model = env::var("GEMINI_MODEL").unwrap_or(GEMINI_MODEL.to_string());
    let image_model = env::var("GEMINI_IMAGE_MODEL").unwrap_or(GEMINI_IMAGE_MODEL.to_string());
    println!("🤖 Gemini 模型: {} / {}", model, image_model);

    let variant = env::var("DEFAULT_VARIANT")
        .ok()
        .and_then(|v| ScriptVariant::from_code(&v))
        .unwrap_or(ScriptVariant::Simplified);
    println!("🈶 預設語言變體: {}", variant.code());

    let archive = Arc::new(ArchiveClient::new(api_base));
    let scholar = Arc::new(ScholarClient::new(google_api_key, model, image_model));

    Ok(Arc::new(AppState {
        search: SearchOrchestrator::new(archive.clone(), scholar.clone(), variant),
        reader: ReaderOrchestrator::new(archive.clone(), scholar.clone(), variant),
        chat: ChatOrchestrator::new(scholar.clone(), variant),
        archive,
        scholar,
    }))
}
