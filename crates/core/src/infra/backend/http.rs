use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::domain::backend::{
    ExportError, ExportFormat, TranscribeError, TranscribeOptions, TranscriptionService,
    UploadedHook,
};
use crate::domain::transcript::{Segment, TranscriptResult};

// ─── HttpBackend ─────────────────────────────────────────────────

/// ローカル文字起こしバックエンドへの HTTP アダプタ。
///
/// リクエスト形状は 2 種類:
/// - path モード: `POST /transcribe` (JSON)
/// - upload モード: `POST /transcribe/upload` (multipart)
/// srt / vtt 変換は `POST /export/{format}` に委譲する。
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct TranscribeRequestBody<'a> {
    file_path: &'a str,
    enable_diarization: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    hf_token: Option<&'a str>,
}

#[derive(Serialize)]
struct ExportRequestBody<'a> {
    segments: &'a [Segment],
    format: ExportFormat,
}

impl HttpBackend {
    /// ベース URL からアダプタを作る。
    /// 処理時間は音声長に依存して上限がないため、クライアント側の
    /// タイムアウトは設定しない。中断はキャンセルトークンで行う。
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// ステータス確認と成功レスポンスの解析。非 2xx はボディを診断詳細として返す。
async fn read_transcript(response: reqwest::Response) -> Result<TranscriptResult, TranscribeError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TranscribeError::Api {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<TranscriptResult>()
        .await
        .map_err(|e| TranscribeError::Parse(e.to_string()))
}

#[async_trait]
impl TranscriptionService for HttpBackend {
    async fn transcribe_path(
        &self,
        path: &Path,
        options: &TranscribeOptions,
        cancel: CancellationToken,
    ) -> Result<TranscriptResult, TranscribeError> {
        let file_path = path.to_string_lossy();
        let body = TranscribeRequestBody {
            file_path: file_path.as_ref(),
            enable_diarization: options.enable_diarization,
            hf_token: options.hf_token.as_deref(),
        };
        let request = self.client.post(self.endpoint("/transcribe")).json(&body);

        let call = async {
            let response = request
                .send()
                .await
                .map_err(|e| TranscribeError::Network(e.to_string()))?;
            read_transcript(response).await
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(TranscribeError::Cancelled),
            result = call => result,
        }
    }

    async fn transcribe_upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        options: &TranscribeOptions,
        on_uploaded: UploadedHook,
        cancel: CancellationToken,
    ) -> Result<TranscriptResult, TranscribeError> {
        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()),
            )
            .text(
                "enable_diarization",
                options.enable_diarization.to_string(),
            );
        if let Some(token) = &options.hf_token {
            form = form.text("hf_token", token.clone());
        }
        let request = self
            .client
            .post(self.endpoint("/transcribe/upload"))
            .multipart(form);

        let call = async {
            let response = request
                .send()
                .await
                .map_err(|e| TranscribeError::Network(e.to_string()))?;
            // レスポンス受信 = アップロードフェーズは完了している
            on_uploaded();
            read_transcript(response).await
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(TranscribeError::Cancelled),
            result = call => result,
        }
    }

    async fn export_segments(
        &self,
        segments: &[Segment],
        format: ExportFormat,
    ) -> Result<String, ExportError> {
        let url = self.endpoint(&format!("/export/{}", format.as_str()));
        let body = ExportRequestBody { segments, format };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Api {
                status: status.as_u16(),
                body,
            });
        }
        response
            .text()
            .await
            .map_err(|e| ExportError::Network(e.to_string()))
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ─── Tests ───────────────────────────────────────────────────────
