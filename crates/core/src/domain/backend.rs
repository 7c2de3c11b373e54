use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::transcript::{Segment, TranscriptResult};

// ─── TranscribeOptions ───────────────────────────────────────────

/// 文字起こしリクエストに付与するオプション。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscribeOptions {
    /// 話者分離 (ダイアライゼーション) を有効にするか
    pub enable_diarization: bool,
    /// ダイアライゼーション用の Hugging Face トークン
    pub hf_token: Option<String>,
}

// ─── ExportFormat ────────────────────────────────────────────────

/// 書き出しフォーマット。txt / json はローカル変換、
/// srt / vtt はバックエンドに委譲する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Txt,
    Json,
    Srt,
    Vtt,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Json => "json",
            Self::Srt => "srt",
            Self::Vtt => "vtt",
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────

/// 文字起こし呼び出しの失敗。
///
/// キャンセルは構造上トランスポート失敗と区別される。
#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("Transcription cancelled")]
    Cancelled,
    #[error("Server returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Request failed: {0}")]
    Network(String),
    #[error("Response parse error: {0}")]
    Parse(String),
}

impl TranscribeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// 書き出しの失敗。NoSegments は前提条件違反で、
/// ジョブ状態には一切影響せず呼び出し元へ同期的に返る。
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No segment data available for this transcript")]
    NoSegments,
    #[error("Server returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Request failed: {0}")]
    Network(String),
}

// ─── TranscriptionService trait ──────────────────────────────────

/// アップロードフェーズ完了時に 1 度だけ呼ばれるフック。
/// コントローラが中間進捗 (50%) の記録に使う。
pub type UploadedHook = Box<dyn FnOnce() + Send>;

/// 外部文字起こしサービスへの境界コントラクト。
///
/// どちらの transcribe もキャンセルトークンを受け取り、トークンが
/// 決着前に発火した場合は進行中のリクエストを中断して
/// `TranscribeError::Cancelled` で解決する。
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// path モード: 音声がローカルファイルとして参照可能な場合。
    async fn transcribe_path(
        &self,
        path: &Path,
        options: &TranscribeOptions,
        cancel: CancellationToken,
    ) -> Result<TranscriptResult, TranscribeError>;

    /// upload モード: インメモリの音声データを multipart で送る場合。
    /// `on_uploaded` はアップロードフェーズ完了後、結果の解析前に呼ばれる。
    async fn transcribe_upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        options: &TranscribeOptions,
        on_uploaded: UploadedHook,
        cancel: CancellationToken,
    ) -> Result<TranscriptResult, TranscribeError>;

    /// セグメント列を srt / vtt 文書へ変換する (バックエンド委譲)。
    /// レスポンスボディをそのまま返す。
    async fn export_segments(
        &self,
        segments: &[Segment],
        format: ExportFormat,
    ) -> Result<String, ExportError>;

    /// サービス名 (例: "http")。
    fn name(&self) -> &str;
}

// ─── Tests ───────────────────────────────────────────────────────
