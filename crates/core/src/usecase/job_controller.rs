use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::backend::{TranscriptionService, UploadedHook};
use crate::domain::job::{Job, JobEvent, JobStatus, SourceRef};
use crate::domain::progress;
use crate::domain::settings::AppSettings;
use crate::infra::metrics::Metrics;
use crate::usecase::job_store::JobStore;

const MSG_TRANSCRIBING: &str = "Transcribing audio with Whisper AI...";
const MSG_PREPARING: &str = "Preparing audio for transcription...";
const MSG_CANCELLED: &str = "Transcription cancelled";

/// upload モードでアップロードフェーズ完了時に入れる中間進捗。
const UPLOAD_DONE_PROGRESS: f64 = 50.0;

// ─── JobController ───────────────────────────────────────────────

/// processing 中のジョブ 1 件分のアクティブハンドル。
///
/// キャンセルトークンと進捗ティッカーはここに集約し、終端遷移と
/// 同時にレジストリから除去する。processing のジョブにつき常に
/// ちょうど 1 エントリ。
struct ActiveAttempt {
    cancel: CancellationToken,
    ticker: JoinHandle<()>,
}

/// ジョブライフサイクルのオーケストレータ。
///
/// submit / start / cancel / retry / remove / start_all を提供し、
/// TranscriptionService の決着を JobStore の終端状態へ書き下ろす。
/// サービス呼び出しの失敗がここより外へ伝播することはない。
#[derive(Clone)]
pub struct JobController {
    store: Arc<JobStore>,
    service: Arc<dyn TranscriptionService>,
    metrics: Arc<Metrics>,
    settings: AppSettings,
    event_tx: mpsc::UnboundedSender<JobEvent>,
    active: Arc<Mutex<HashMap<Uuid, ActiveAttempt>>>,
}

impl JobController {
    pub fn new(
        service: Arc<dyn TranscriptionService>,
        settings: AppSettings,
        event_tx: mpsc::UnboundedSender<JobEvent>,
    ) -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            service,
            metrics: Arc::new(Metrics::new()),
            settings,
            event_tx,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> Arc<JobStore> {
        self.store.clone()
    }

    pub fn service(&self) -> Arc<dyn TranscriptionService> {
        self.service.clone()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    // ─── Operations ──────────────────────────────────────────────

    /// pending ジョブを作成して末尾に追加する。ネットワークには触れない。
    pub fn submit(&self, source: SourceRef) -> Uuid {
        let job = Job::new(source);
        let job_id = job.id;
        log::info!("ジョブ投入: {} ({} bytes)", job.file_name, job.size_bytes);
        self.store.insert(job);
        self.metrics.inc_jobs_submitted();
        job_id
    }

    /// ジョブの文字起こしを開始し、決着まで面倒を見る。
    ///
    /// pending、またはリトライ経路の error / cancelled からのみ開始する。
    /// 欠損・実行中・完了済みは黙って no-op。
    pub async fn start(&self, job_id: Uuid) {
        let job = match self.store.get(job_id) {
            Some(job) => job,
            None => {
                log::debug!("start: 未知のジョブ {job_id}");
                return;
            }
        };
        if job.status != JobStatus::Pending && !job.status.can_retry() {
            log::debug!(
                "start: {} 状態のジョブ {job_id} は開始できない",
                job.status.as_str()
            );
            return;
        }

        let attempt_started = tokio::time::Instant::now();
        let cancel = CancellationToken::new();
        {
            let mut active = self.active.lock();
            if active.contains_key(&job_id) {
                log::debug!("start: ジョブ {job_id} はすでに実行中");
                return;
            }
            let ticker = self.spawn_ticker(job_id, attempt_started);
            active.insert(
                job_id,
                ActiveAttempt {
                    cancel: cancel.clone(),
                    ticker,
                },
            );
        }

        let message = match &job.source {
            SourceRef::Path(_) => MSG_TRANSCRIBING,
            SourceRef::Memory { .. } => MSG_PREPARING,
        };
        self.write_status(job_id, JobStatus::Processing, |j| {
            j.progress = 0.0;
            j.progress_message = Some(message.to_string());
            j.start_time = Some(chrono::Utc::now());
            j.elapsed_ms = None;
        });

        let options = self.settings.transcribe_options();
        let result = match &job.source {
            SourceRef::Path(path) => {
                self.service
                    .transcribe_path(path, &options, cancel.clone())
                    .await
            }
            SourceRef::Memory { file_name, bytes } => {
                let store = self.store.clone();
                let event_tx = self.event_tx.clone();
                let on_uploaded: UploadedHook = Box::new(move || {
                    // アップロード完了 = 中間進捗 50%。レースガードは store 側。
                    if store.set_progress(job_id, UPLOAD_DONE_PROGRESS) {
                        let _ = event_tx.send(JobEvent::Progress {
                            job_id,
                            progress: UPLOAD_DONE_PROGRESS,
                        });
                    }
                    store.update(job_id, |j| {
                        if j.status.is_active() {
                            j.progress_message = Some(MSG_TRANSCRIBING.to_string());
                            j.elapsed_ms = Some(attempt_started.elapsed().as_millis() as u64);
                        }
                    });
                });
                self.service
                    .transcribe_upload(
                        file_name,
                        bytes.as_ref().clone(),
                        &options,
                        on_uploaded,
                        cancel.clone(),
                    )
                    .await
            }
        };

        // 決着。ハンドルとティッカーを先に外してから終端状態を書く。
        if let Some(attempt) = self.active.lock().remove(&job_id) {
            attempt.ticker.abort();
        }
        let elapsed_ms = attempt_started.elapsed().as_millis() as u64;

        match result {
            Ok(result) => {
                let wrote = self.write_status(job_id, JobStatus::Completed, move |j| {
                    j.progress = 100.0;
                    j.transcript = Some(result.text);
                    j.segments = result.segments;
                    j.progress_message = None;
                    j.elapsed_ms = Some(elapsed_ms);
                });
                if wrote {
                    log::info!("文字起こし完了: {job_id} ({elapsed_ms} ms)");
                    self.metrics.inc_jobs_completed();
                    self.metrics.record_latency("transcribe", elapsed_ms);
                }
            }
            // 決着前にキャンセルが発火していれば、並行するトランスポート
            // 失敗よりキャンセルの結果を優先する
            Err(e) if e.is_cancelled() || cancel.is_cancelled() => {
                let wrote = self.write_status(job_id, JobStatus::Cancelled, |j| {
                    j.progress_message = Some(MSG_CANCELLED.to_string());
                    j.elapsed_ms = Some(elapsed_ms);
                });
                if wrote {
                    log::info!("文字起こしキャンセル: {job_id} ({elapsed_ms} ms)");
                    self.metrics.inc_jobs_cancelled();
                }
            }
            Err(e) => {
                let wrote = self.write_status(job_id, JobStatus::Error, |j| {
                    j.progress_message = Some(format!("Error: {e}"));
                    j.elapsed_ms = Some(elapsed_ms);
                });
                if wrote {
                    log::warn!("文字起こし失敗: {job_id}: {e}");
                    self.metrics.inc_jobs_errored();
                }
            }
        }
    }

    /// 実行中のジョブへキャンセルを要求する。
    ///
    /// トークンへの通知のみで、状態はここでは変えない。cancelled への
    /// 遷移は start 側が決着を観測した時点で行う。非アクティブなら no-op。
    pub fn cancel(&self, job_id: Uuid) {
        let active = self.active.lock();
        match active.get(&job_id) {
            Some(attempt) => {
                log::info!("キャンセル要求: {job_id}");
                attempt.cancel.cancel();
            }
            None => log::debug!("cancel: ジョブ {job_id} は実行中ではない"),
        }
    }

    /// error / cancelled のジョブを再実行する。start と同じ経路で
    /// 試行フィールドをリセットし processing へ戻る。
    pub async fn retry(&self, job_id: Uuid) {
        match self.store.get(job_id) {
            Some(job) if job.status.can_retry() => self.start(job_id).await,
            _ => log::debug!("retry: 対象外のジョブ {job_id}"),
        }
    }

    /// ジョブを削除する。実行中ならまずキャンセルし、ハンドルを
    /// 残さず、ストアからは無条件に消す。
    pub fn remove(&self, job_id: Uuid) -> Option<Job> {
        if let Some(attempt) = self.active.lock().remove(&job_id) {
            attempt.cancel.cancel();
            attempt.ticker.abort();
        }
        self.store.remove(job_id)
    }

    /// pending のジョブを投入順に 1 件ずつ処理する。
    ///
    /// バックエンドは単一キャパシティの前提なので意図的な逐次実行。
    /// 各ジョブの終端を待ってから次を開始し、同時ディスパッチはしない。
    pub async fn start_all(&self) {
        for job_id in self.store.pending_ids() {
            self.start(job_id).await;
        }
    }

    // ─── Internal ────────────────────────────────────────────────

    /// 進捗ティッカーを起動する。
    ///
    /// 発火ごとにジョブの生存と processing 継続を確認し、どちらかが
    /// 崩れていたら自前で停止する。遅延発火が終端後のジョブの進捗を
    /// 蘇らせることはない (加えて store 側のレースガードが効く)。
    fn spawn_ticker(&self, job_id: Uuid, attempt_started: tokio::time::Instant) -> JoinHandle<()> {
        let store = self.store.clone();
        let event_tx = self.event_tx.clone();
        let tick = Duration::from_millis(self.settings.progress_tick_ms.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            // interval は生成直後に 1 回発火するので読み捨てる
            interval.tick().await;
            loop {
                interval.tick().await;
                let job = match store.get(job_id) {
                    Some(job) if job.status.is_active() => job,
                    _ => break,
                };
                let elapsed_ms = attempt_started.elapsed().as_millis() as u64;
                let estimated = progress::estimate(elapsed_ms, job.size_bytes);
                if store.set_progress(job_id, estimated) {
                    let _ = event_tx.send(JobEvent::Progress {
                        job_id,
                        progress: estimated,
                    });
                }
            }
        })
    }

    /// 状態遷移をストアへ一括で書き、StatusChanged を発行する。
    fn write_status(
        &self,
        job_id: Uuid,
        new_status: JobStatus,
        mutate: impl FnOnce(&mut Job),
    ) -> bool {
        let mut prev = None;
        let updated = self.store.update(job_id, |job| {
            prev = Some(job.status);
            job.status = new_status;
            mutate(job);
        });
        if updated {
            if let Some(prev) = prev {
                let _ = self.event_tx.send(JobEvent::StatusChanged {
                    job_id,
                    prev,
                    new: new_status,
                });
            }
        }
        updated
    }
}

// ─── Tests ───────────────────────────────────────────────────────
