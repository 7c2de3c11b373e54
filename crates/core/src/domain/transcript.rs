use serde::{Deserialize, Serialize};

// ─── Segment ─────────────────────────────────────────────────────

/// タイムスタンプ付きの文字起こしスパン。話者は任意。
///
/// バックエンドのセグメント形式
/// `{start: 秒, end: 秒, text, speaker?}` と 1:1 で対応する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// 開始位置 (秒)
    pub start: f64,
    /// 終了位置 (秒)
    pub end: f64,
    pub text: String,
    /// 話者ラベル。ダイアライゼーション無効時はバックエンドが
    /// "Unknown" を入れるか、フィールド自体を省略する。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

// ─── TranscriptResult ────────────────────────────────────────────

/// 文字起こしエンドポイントの成功レスポンス。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// 全文テキスト
    pub text: String,
    /// セグメント列。セグメント出力を持たないレスポンスでは省略される。
    #[serde(default)]
    pub segments: Option<Vec<Segment>>,
}

// ─── Tests ───────────────────────────────────────────────────────
