//! Whisper Vibe デスクトップアプリのコアライブラリ。
//!
//! ジョブキュー制御・進捗推定・文字起こしバックエンド境界・
//! エクスポート整形を提供する。UI シェルはこのクレートの
//! JobStore を描画し、JobController の操作を呼び出すだけでよい。

pub mod domain;
pub mod infra;
pub mod usecase;
