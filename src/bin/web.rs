use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lantai::chat::ChatSnapshot;
use lantai::init_system;
use lantai::models::ScriptVariant;
use lantai::reader::ReaderSnapshot;
use lantai::search::SearchSnapshot;
use lantai::AppState;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Deserialize)]
struct OpenRequest {
    title: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Deserialize)]
struct VariantRequest {
    variant: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    println!("🌐 啟動 Web Server 初始化...");

    let state = match init_system().await {
        Ok(s) => s,
        Err(e) => panic!("❌ 系統初始化失敗: {}", e),
    };

    let app = Router::new()
        // API 路由優先
        .route("/api/search", post(search_handler).get(search_snapshot_handler))
        .route("/api/reader/open", post(reader_open_handler))
        .route("/api/reader/interpret", post(interpret_handler))
        .route("/api/chat", post(chat_handler).get(chat_snapshot_handler))
        .route("/api/variant", post(variant_handler))
        .route("/api/health", get(|| async { "ok" }))
        // 靜態檔案路由 (Fallback)：沒對應到的 URL 都去 frontend 找
        .fallback_service(ServeDir::new("frontend"))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let port_str = std::env::var("PORT").unwrap_or("8080".to_string());
    let port = port_str.parse::<u16>().unwrap_or(8080);

    println!("✅ 系統就緒，Web Server 監聽中: http://localhost:{}", port);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

// 錯誤不往外丟：Orchestrator 已經把失敗收斂成狀態 (Failed / 致歉訊息)，
// handler 一律回快照，前端照狀態呈現。

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> Json<SearchSnapshot> {
    println!("📩 收到搜尋請求: {}", payload.query);
    state.search.submit(&payload.query).await;
    Json(state.search.snapshot())
}

async fn search_snapshot_handler(State(state): State<Arc<AppState>>) -> Json<SearchSnapshot> {
    Json(state.search.snapshot())
}

async fn reader_open_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OpenRequest>,
) -> Json<ReaderSnapshot> {
    println!("📩 收到開卷請求: {}", payload.title);
    state.reader.open(&payload.title).await;
    Json(state.reader.snapshot())
}

async fn interpret_handler(State(state): State<Arc<AppState>>) -> Json<ReaderSnapshot> {
    state.reader.interpret().await;
    Json(state.reader.snapshot())
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Json<ChatSnapshot> {
    println!("📩 收到對話請求: {}", payload.message);
    state.chat.send(&payload.message).await;
    Json(state.chat.snapshot())
}

async fn chat_snapshot_handler(State(state): State<Arc<AppState>>) -> Json<ChatSnapshot> {
    Json(state.chat.snapshot())
}

async fn variant_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VariantRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let Some(variant) = ScriptVariant::from_code(&payload.variant) else {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("未知的語言變體: {}", payload.variant),
        ));
    };
    println!("🈶 切換語言變體: {}", variant.code());
    state.set_variant(variant).await;
    Ok(StatusCode::NO_CONTENT)
}
