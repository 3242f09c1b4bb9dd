//! 三個頁面共用的兩個小工具：
//! - RequestGuard: 單調遞增的請求序號，晚到的舊回應直接丟棄，
//!   避免連續送出時舊結果蓋掉新結果。
//! - Replay: 記住上一次抓取的參數，語言變體切換時重跑同一個動作。

/// 每次發起請求前 begin() 拿一個 token，回應落地時用 is_current()
/// 確認自己還是最新的一次；不是就不要動狀態。
#[derive(Debug, Default)]
pub struct RequestGuard {
    seq: u64,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self { seq: 0 }
    }

    pub fn begin(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.seq == token
    }
}

/// 記錄最後一次成功發起的抓取參數。
/// 變體切換時 last() 有值就重跑，沒有就什麼都不做。
#[derive(Debug, Default)]
pub struct Replay<P: Clone> {
    last: Option<P>,
}

impl<P: Clone> Replay<P> {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn record(&mut self, params: P) {
        self.last = Some(params);
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    pub fn last(&self) -> Option<P> {
        self.last.clone()
    }
}
