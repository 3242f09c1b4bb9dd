// src/bin/cli.rs

use lantai::init_system;
use lantai::search::SearchState;
use std::error::Error;
use std::io::{self, Write};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("🔥 初始化系統中...");

    let state = init_system().await?;
    let mut variant = state.search.snapshot().variant;

    println!("\n📜 蘭台 CLI 已就緒 ({})", variant.code());
    println!("💡 直接輸入關鍵字搜尋 (例如: '汲黯')，或使用指令:");
    println!("   :read <編號>   開啟搜尋結果中的某一卷");
    println!("   :interpret     解析目前開啟的卷");
    println!("   :chat <訊息>   詢問蘭台助手");
    println!("   :variant       切換簡體/繁體");
    println!("   exit           離開");

    loop {
        print!("\nUser > ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            continue;
        }
        let line = input.trim();
        if line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(":read") {
            let idx: usize = match rest.trim().parse() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!("❌ 用法: :read <編號>");
                    continue;
                }
            };
            let results = state.search.snapshot().results;
            let Some(hit) = results.get(idx.saturating_sub(1)) else {
                eprintln!("❌ 沒有第 {} 筆搜尋結果", idx);
                continue;
            };
            state.reader.open(&hit.title).await;
            let snap = state.reader.snapshot();
            match snap.page {
                Some(page) => {
                    println!("\n📖 {}", page.title);
                    println!("=========================");
                    println!("{}", page.content);
                    println!("=========================");
                }
                None => eprintln!("❌ 頁面載入失敗，請稍後再試"),
            }
        } else if line == ":interpret" {
            state.reader.interpret().await;
            let snap = state.reader.snapshot();
            match snap.interpretation {
                Some(text) => {
                    println!("\n✨ AI 解讀：\n=========================");
                    println!("{}", text);
                    println!("=========================");
                }
                None => eprintln!("❌ 解讀失敗或尚未開啟任何一卷 (:read <編號>)"),
            }
        } else if let Some(message) = line.strip_prefix(":chat") {
            if !state.chat.can_send(message) {
                eprintln!("❌ 用法: :chat <訊息>");
                continue;
            }
            state.chat.send(message).await;
            if let Some(reply) = state.chat.snapshot().messages.last() {
                println!("\n💬 蘭台助手：{}", reply.content);
            }
        } else if line == ":variant" {
            variant = variant.toggle();
            state.set_variant(variant).await;
            println!("🈶 已切換語言變體: {}", variant.code());
            print_search(&state.search.snapshot());
        } else {
            state.search.submit(line).await;
            print_search(&state.search.snapshot());
        }
    }

    Ok(())
}

fn print_search(snap: &lantai::search::SearchSnapshot) {
    match snap.state {
        SearchState::Failed => {
            eprintln!("⚠️ 查詢失敗，以下是最後一次成功的結果");
        }
        SearchState::Empty => {
            let msg = snap.variant.pick(
                "兰台未藏此卷，请更换关键字再行检索。",
                "蘭台未藏此卷，請更換關鍵字再行檢索。",
            );
            println!("🪶 {}", msg);
            return;
        }
        _ => {}
    }

    if let Some(bio) = &snap.biography {
        println!("\n🏛️ 人物小傳：{}", bio.name);
        if let Some(courtesy) = &bio.courtesy_name {
            println!("   字/號: {}", courtesy);
        }
        if let Some(years) = &bio.years {
            println!("   生卒: {}", years);
        }
        if let Some(text) = &bio.bio {
            println!("   {}", text);
        }
        if let Some(sig) = &bio.historical_significance {
            println!("   {}{}", snap.variant.pick("历史定位：", "歷史定位："), sig);
        }
    }

    println!("\n📚 相關典籍文獻：");
    for (i, hit) in snap.results.iter().enumerate() {
        println!(" {}. {} (pageid {})", i + 1, hit.title, hit.pageid);
        let snippet = hit.snippet_text();
        if !snippet.is_empty() {
            println!("    {}", snippet);
        }
    }
}
