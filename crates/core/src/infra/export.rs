use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::backend::{ExportError, ExportFormat, TranscriptionService};
use crate::domain::job::Job;
use crate::domain::transcript::Segment;
use crate::infra::metrics::Metrics;

// ─── ExportFormatter ─────────────────────────────────────────────

/// 完了ジョブのトランスクリプトを出力文書へ変換する。
///
/// txt / json はローカル変換、srt / vtt はバックエンドの
/// `/export/{format}` に委譲する。ファイルへの書き込みは呼び出し元の責務。
pub struct ExportFormatter {
    service: Arc<dyn TranscriptionService>,
    metrics: Arc<Metrics>,
}

/// json フォーマットの文書本体。ジョブの保存値をそのまま写す。
#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    text: Option<String>,
    segments: Option<Vec<Segment>>,
}

impl ExportFormatter {
    pub fn new(service: Arc<dyn TranscriptionService>, metrics: Arc<Metrics>) -> Self {
        Self { service, metrics }
    }

    /// ジョブを指定フォーマットの文書へ変換する。
    ///
    /// セグメントを持たないジョブへの srt / vtt 要求は
    /// `ExportError::NoSegments` を同期的に返し、ジョブ状態には触れない。
    pub async fn format(&self, job: &Job, format: ExportFormat) -> Result<String, ExportError> {
        let result = match format {
            ExportFormat::Txt => Ok(render_txt(job)),
            ExportFormat::Json => Ok(render_json(job)),
            ExportFormat::Srt | ExportFormat::Vtt => match job.segments.as_deref() {
                Some(segments) if !segments.is_empty() => {
                    self.service.export_segments(segments, format).await
                }
                _ => Err(ExportError::NoSegments),
            },
        };

        match &result {
            Ok(_) => self.metrics.inc_exports_rendered(),
            Err(e) => {
                log::warn!("書き出し失敗 [{}]: {e}", format.as_str());
                self.metrics.inc_export_failures();
            }
        }
        result
    }
}

/// 書き出しファイル名。元のファイル名の最終拡張子を差し替える。
pub fn export_file_name(source_name: &str, format: ExportFormat) -> String {
    let stem = match source_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => source_name,
    };
    format!("{stem}.{}", format.as_str())
}

/// セグメントがあれば 1 行 1 セグメント、なければ全文テキスト。
fn render_txt(job: &Job) -> String {
    match job.segments.as_deref() {
        Some(segments) if !segments.is_empty() => segments
            .iter()
            .map(|s| {
                format!(
                    "[{} - {}] {}: {}",
                    format_time(s.start),
                    format_time(s.end),
                    s.speaker.as_deref().unwrap_or("Unknown"),
                    s.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => job.transcript.clone().unwrap_or_default(),
    }
}

fn render_json(job: &Job) -> String {
    let doc = JsonDocument {
        text: job.transcript.clone(),
        segments: job.segments.clone(),
    };
    // 保存値をそのまま写した構造体なので直列化は失敗しない
    serde_json::to_string_pretty(&doc).unwrap_or_default()
}

/// 秒を MM:SS 表記にする。
fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

// ─── Tests ───────────────────────────────────────────────────────
