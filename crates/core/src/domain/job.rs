use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::transcript::Segment;

// ─── SourceRef ───────────────────────────────────────────────────

/// 音声ソースへの参照。ジョブ作成後は不変。
#[derive(Debug, Clone)]
pub enum SourceRef {
    /// ローカルファイルパス (ドロップ元からパスが取得できた場合)
    Path(PathBuf),
    /// インメモリ音声データ (パスが取得できないドロップ用)
    Memory {
        file_name: String,
        bytes: Arc<Vec<u8>>,
    },
}

impl SourceRef {
    /// 表示用のファイル名。
    pub fn file_name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            Self::Memory { file_name, .. } => file_name.clone(),
        }
    }

    /// ソースのバイトサイズ。進捗推定の入力に使う。
    /// Path はファイルメタデータを参照し、失敗時は 0 を返す
    /// (推定器側が最小処理時間にフォールバックする)。
    pub fn size_bytes(&self) -> u64 {
        match self {
            Self::Path(path) => std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            Self::Memory { bytes, .. } => bytes.len() as u64,
        }
    }
}

// ─── JobStatus ───────────────────────────────────────────────────

/// ジョブ状態。
///
/// pending → processing → {completed, error, cancelled}、
/// リトライで {error, cancelled} → processing。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    /// 文字起こしが進行中かどうか。
    pub fn is_active(self) -> bool {
        self == Self::Processing
    }

    /// これ以上自動遷移しない状態かどうか。
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    /// リトライで processing に戻れる状態かどうか。
    pub fn can_retry(self) -> bool {
        matches!(self, Self::Error | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

// ─── Job ─────────────────────────────────────────────────────────

/// 1 つの音声ファイルの文字起こしライフサイクル。
///
/// 作成時に pending、以降は JobController だけが状態を書き換える。
/// 明示的な削除まで JobStore に残る。
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    /// 投入時に採番される固有 ID (UUID v4)
    pub id: Uuid,
    /// 表示用ファイル名 (投入時に確定)
    pub file_name: String,
    /// ソースサイズ (投入時に確定、進捗推定の入力)
    pub size_bytes: u64,
    /// 音声ソース参照
    #[serde(skip)]
    pub source: SourceRef,
    pub status: JobStatus,
    /// 文字起こし全文。completed 到達後のみ Some。
    pub transcript: Option<String>,
    /// セグメント列。バックエンドがセグメント出力を返した場合のみ Some。
    pub segments: Option<Vec<Segment>>,
    /// 推定進捗 (0..=100)。processing 中のみ意味を持つ。
    pub progress: f64,
    /// 状態メッセージ。completed でクリアされる。
    pub progress_message: Option<String>,
    /// 現在または直近の試行の開始時刻 (UTC)
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 直近の試行の所要時間 (ミリ秒)
    pub elapsed_ms: Option<u64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Job {
    /// ソース参照から pending 状態のジョブを作る。ネットワークには触れない。
    pub fn new(source: SourceRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: source.file_name(),
            size_bytes: source.size_bytes(),
            source,
            status: JobStatus::Pending,
            transcript: None,
            segments: None,
            progress: 0.0,
            progress_message: None,
            start_time: None,
            elapsed_ms: None,
            created_at: chrono::Utc::now(),
        }
    }
}

// ─── JobEvent ────────────────────────────────────────────────────

/// コントローラから UI 側へ通知するライフサイクルイベント。
/// 描画の真実は常に JobStore 側にあり、イベントは再読込のトリガー。
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobEvent {
    StatusChanged {
        job_id: Uuid,
        prev: JobStatus,
        new: JobStatus,
    },
    Progress {
        job_id: Uuid,
        progress: f64,
    },
}

// ─── Tests ───────────────────────────────────────────────────────
