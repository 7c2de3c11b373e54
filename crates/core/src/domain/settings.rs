use serde::{Deserialize, Serialize};

use super::backend::TranscribeOptions;

// ─── AppSettings ─────────────────────────────────────────────────

/// アプリケーション設定。UI の設定フォームから保存される値のうち、
/// コアが消費するものだけを持つ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// 文字起こしバックエンドのベース URL
    pub backend_url: String,
    /// 話者分離を有効にするか
    pub enable_diarization: bool,
    /// ダイアライゼーション用 Hugging Face トークン
    pub hf_token: Option<String>,
    /// 進捗推定の更新間隔 (ミリ秒)
    pub progress_tick_ms: u64,
}

impl AppSettings {
    /// リクエストに載せるオプションへ射影する。
    pub fn transcribe_options(&self) -> TranscribeOptions {
        TranscribeOptions {
            enable_diarization: self.enable_diarization,
            hf_token: self.hf_token.clone(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000".to_string(),
            enable_diarization: false,
            hf_token: None,
            progress_tick_ms: 500,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────
