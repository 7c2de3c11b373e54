use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::job::{Job, JobStatus};

// ─── JobStore ────────────────────────────────────────────────────

/// ジョブの順序付きコレクション。投入順 = キュー順で、
/// UI が描画する唯一の真実。
///
/// 変更はすべて書き込みロック下での一括書き換えで行い、読み手は
/// クローンを受け取る。中途半端な状態が観測されることはない。
pub struct JobStore {
    jobs: RwLock<Vec<Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(Vec::new()),
        }
    }

    /// 末尾に追加する。
    pub fn insert(&self, job: Job) {
        self.jobs.write().push(job);
    }

    /// ジョブのスナップショットを取得する。
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().iter().find(|j| j.id == id).cloned()
    }

    /// 全ジョブを投入順で返す。
    pub fn list(&self) -> Vec<Job> {
        self.jobs.read().clone()
    }

    /// ジョブを削除して返す。存在しなければ None。
    pub fn remove(&self, id: Uuid) -> Option<Job> {
        let mut jobs = self.jobs.write();
        let index = jobs.iter().position(|j| j.id == id)?;
        Some(jobs.remove(index))
    }

    /// pending 状態のジョブ ID を投入順で返す。
    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.jobs
            .read()
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .map(|j| j.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// ジョブをロック下で書き換える。欠損時は false。
    pub fn update(&self, id: Uuid, mutate: impl FnOnce(&mut Job)) -> bool {
        let mut jobs = self.jobs.write();
        match jobs.iter_mut().find(|j| j.id == id) {
            Some(job) => {
                mutate(job);
                true
            }
            None => false,
        }
    }

    /// 進捗値を書き込む。レースガード: ジョブが存在し、かつ
    /// processing 中の場合のみ、単調増加方向にだけ反映する。
    /// processing を抜けた後の遅延書き込みは no-op。
    pub fn set_progress(&self, id: Uuid, value: f64) -> bool {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            if job.status == JobStatus::Processing && value > job.progress {
                job.progress = value;
                return true;
            }
        }
        false
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::job::SourceRef;

    fn make_job(name: &str) -> Job {
        Job::new(SourceRef::Memory {
            file_name: name.to_string(),
            bytes: Arc::new(vec![0u8; 16]),
        })
    }

    #[test]
    fn test_insert_preserves_order() {
        let store = JobStore::new();
        let a = make_job("a.wav");
        let b = make_job("b.wav");
        let (id_a, id_b) = (a.id, b.id);
        store.insert(a);
        store.insert(b);

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, id_a);
        assert_eq!(listed[1].id, id_b);
        assert_eq!(store.pending_ids(), vec![id_a, id_b]);
    }

    #[test]
    fn test_get_and_remove() {
        let store = JobStore::new();
        let job = make_job("a.wav");
        let id = job.id;
        store.insert(job);

        assert!(store.get(id).is_some());
        let removed = store.remove(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(store.get(id).is_none());
        assert!(store.remove(id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_missing_job() {
        let store = JobStore::new();
        assert!(!store.update(Uuid::new_v4(), |j| j.progress = 10.0));
    }

    #[test]
    fn test_set_progress_requires_processing() {
        let store = JobStore::new();
        let job = make_job("a.wav");
        let id = job.id;
        store.insert(job);

        // pending では書けない
        assert!(!store.set_progress(id, 10.0));
        assert_eq!(store.get(id).unwrap().progress, 0.0);

        store.update(id, |j| j.status = JobStatus::Processing);
        assert!(store.set_progress(id, 10.0));
        assert_eq!(store.get(id).unwrap().progress, 10.0);
    }

    #[test]
    fn test_set_progress_is_monotone() {
        let store = JobStore::new();
        let job = make_job("a.wav");
        let id = job.id;
        store.insert(job);
        store.update(id, |j| j.status = JobStatus::Processing);

        assert!(store.set_progress(id, 50.0));
        // 低い推定値は巻き戻さない
        assert!(!store.set_progress(id, 30.0));
        assert_eq!(store.get(id).unwrap().progress, 50.0);
    }

    #[test]
    fn test_late_progress_write_after_terminal_state() {
        let store = JobStore::new();
        let job = make_job("a.wav");
        let id = job.id;
        store.insert(job);
        store.update(id, |j| {
            j.status = JobStatus::Completed;
            j.progress = 100.0;
        });

        // 遅れて発火したティックの書き込みは無視される
        assert!(!store.set_progress(id, 60.0));
        assert_eq!(store.get(id).unwrap().progress, 100.0);

        // 削除後も同様
        store.remove(id);
        assert!(!store.set_progress(id, 60.0));
    }
}
