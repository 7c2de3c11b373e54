// ─── 進捗推定 ────────────────────────────────────────────────────
//
// バックエンドは処理中の進捗を通知しないため、経過時間と入力サイズ
// から表示用の推定値を作る。完了はレスポンス到着でのみ確定するので、
// 推定値は上限 95% で頭打ちにする。

/// 1 MiB あたりの想定処理時間 (ミリ秒)。base モデルでおよそ 1〜2 秒/MB。
pub const MS_PER_MEBIBYTE: f64 = 1500.0;

/// 推定値の上限。100 に見せるのはレスポンス到着時だけ。
pub const PROGRESS_CEILING: f64 = 95.0;

/// サイズ 0 のソース用の最小想定時間 (ミリ秒)。ゼロ除算を排除する。
const MIN_ESTIMATED_MS: f64 = 1500.0;

/// 経過時間と入力サイズから表示用の進捗率を推定する。
///
/// 純関数。戻り値は 0.0..=95.0。
pub fn estimate(elapsed_ms: u64, file_size_bytes: u64) -> f64 {
    let size_mib = file_size_bytes as f64 / 1_048_576.0;
    let estimated_total_ms = (size_mib * MS_PER_MEBIBYTE).max(MIN_ESTIMATED_MS);
    ((elapsed_ms as f64 / estimated_total_ms) * 100.0).min(PROGRESS_CEILING)
}

// ─── Tests ───────────────────────────────────────────────────────
