// ==========================================
// 课程权限与成绩汇总引擎 - 课次解锁闸门
// ==========================================
// 规则: 带视频的课次，在同 (科目, 课程类型, 范围) 内顺序号更小的
//       全部带视频课次完成前保持锁定；无视频课次从不锁定
// 完成: 通过专注检查次数 ≥ 阈值（默认 3），完成时间只记录一次，不回退
// ==========================================

use crate::config::EngineConfigReader;
use crate::domain::content::Lesson;
use crate::domain::lesson_view::{LessonState, LessonView};
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{LessonRepository, LessonViewRepository};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// UnlockCore - 纯函数
// ==========================================
pub struct UnlockCore;

impl UnlockCore {
    /// 找出阻塞目标课次的第一节未完成课次
    ///
    /// `sequence` 为同 (科目, 范围, 类型) 的课次
    pub fn blocking_lesson(
        sequence: &[Lesson],
        target: &Lesson,
        completed: &HashSet<i64>,
    ) -> Option<i64> {
        if !target.has_video() {
            return None;
        }

        sequence
            .iter()
            .filter(|l| {
                l.id != target.id
                    && l.subject_id == target.subject_id
                    && l.scope == target.scope
                    && l.lesson_type == target.lesson_type
                    && l.order < target.order
                    && l.has_video()
            })
            .filter(|l| !completed.contains(&l.id))
            .min_by_key(|l| l.order)
            .map(|l| l.id)
    }

    /// 应用一次专注检查
    ///
    /// `checkpoint` 为从 1 开始的检查序号：
    /// - ≤ 已通过次数: 重放，不变
    /// - = 已通过次数 + 1: 计数加一
    /// - 其它: 输入无效
    ///
    /// # 返回
    /// - (更新后的进度, 是否本次新完成)
    pub fn apply_attention_check(
        current: Option<&LessonView>,
        student_id: i64,
        lesson_id: i64,
        checkpoint: i32,
        required: i32,
        now: DateTime<Utc>,
    ) -> EngineResult<(LessonView, bool)> {
        let mut view = current.cloned().unwrap_or(LessonView {
            student_id,
            lesson_id,
            watched_seconds: 0,
            attention_checks_passed: 0,
            is_completed: false,
            completed_at: None,
            updated_at: now,
        });

        if checkpoint < 1 {
            return Err(EngineError::InvalidInput(format!("检查序号必须从 1 开始: {}", checkpoint)));
        }
        if checkpoint <= view.attention_checks_passed {
            return Ok((view, false));
        }
        if checkpoint != view.attention_checks_passed + 1 {
            return Err(EngineError::InvalidInput(format!(
                "检查序号跳跃: passed={}, checkpoint={}",
                view.attention_checks_passed, checkpoint
            )));
        }

        view.attention_checks_passed = checkpoint;
        view.updated_at = now;

        let newly_completed = !view.is_completed && view.attention_checks_passed >= required;
        if newly_completed {
            view.is_completed = true;
            view.completed_at = Some(now);
        }
        Ok((view, newly_completed))
    }
}

/// 专注检查结果
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionOutcome {
    pub view: LessonView,
    pub newly_completed: bool,
}

// ==========================================
// LessonUnlockGate - 课次解锁闸门
// ==========================================
pub struct LessonUnlockGate<C>
where
    C: EngineConfigReader,
{
    lesson_repo: Arc<LessonRepository>,
    lesson_view_repo: Arc<LessonViewRepository>,
    config: Arc<C>,
}

impl<C> LessonUnlockGate<C>
where
    C: EngineConfigReader,
{
    pub fn new(
        lesson_repo: Arc<LessonRepository>,
        lesson_view_repo: Arc<LessonViewRepository>,
        config: Arc<C>,
    ) -> Self {
        Self {
            lesson_repo,
            lesson_view_repo,
            config,
        }
    }

    fn load_lesson(&self, lesson_id: i64) -> EngineResult<Lesson> {
        self.lesson_repo
            .find_by_id(lesson_id)?
            .ok_or_else(|| EngineError::ScopeNotFound(format!("lesson_id={}", lesson_id)))
    }

    /// 目标课次的阻塞课次（None = 未锁定）
    pub fn blocked_by(&self, student_id: i64, lesson: &Lesson) -> EngineResult<Option<i64>> {
        if !lesson.has_video() {
            return Ok(None);
        }
        let sequence = self
            .lesson_repo
            .find_in_scope(lesson.subject_id, lesson.scope, lesson.lesson_type)?;
        let ids: Vec<i64> = sequence.iter().map(|l| l.id).collect();
        let completed = self.completed_set(student_id, &ids)?;
        Ok(UnlockCore::blocking_lesson(&sequence, lesson, &completed))
    }

    fn completed_set(&self, student_id: i64, lesson_ids: &[i64]) -> EngineResult<HashSet<i64>> {
        if lesson_ids.is_empty() {
            return Ok(HashSet::new());
        }
        Ok(self
            .lesson_view_repo
            .find_for_lessons(student_id, lesson_ids)?
            .into_values()
            .filter(|v| v.is_completed)
            .map(|v| v.lesson_id)
            .collect())
    }

    /// 批量计算课次状态（列表展示）
    #[instrument(skip(self, lessons), fields(count = lessons.len()))]
    pub fn lesson_states(&self, student_id: i64, lessons: &[Lesson]) -> EngineResult<Vec<LessonState>> {
        // 每个 (科目, 范围, 类型) 只查一次序列
        let mut sequences: BTreeMap<(i64, Option<i64>, Option<i64>, &'static str), Vec<Lesson>> =
            BTreeMap::new();
        for lesson in lessons {
            let key = (
                lesson.subject_id,
                lesson.scope.direction_id(),
                lesson.scope.group_id(),
                lesson.lesson_type.to_db_str(),
            );
            if !sequences.contains_key(&key) {
                let seq = self
                    .lesson_repo
                    .find_in_scope(lesson.subject_id, lesson.scope, lesson.lesson_type)?;
                sequences.insert(key, seq);
            }
        }

        let mut all_ids: Vec<i64> = sequences.values().flatten().map(|l| l.id).collect();
        all_ids.extend(lessons.iter().map(|l| l.id));
        all_ids.sort_unstable();
        all_ids.dedup();

        let views: HashMap<i64, LessonView> = if all_ids.is_empty() {
            HashMap::new()
        } else {
            self.lesson_view_repo.find_for_lessons(student_id, &all_ids)?
        };
        let completed: HashSet<i64> = views
            .values()
            .filter(|v| v.is_completed)
            .map(|v| v.lesson_id)
            .collect();

        let states = lessons
            .iter()
            .map(|lesson| {
                let key = (
                    lesson.subject_id,
                    lesson.scope.direction_id(),
                    lesson.scope.group_id(),
                    lesson.lesson_type.to_db_str(),
                );
                let sequence = sequences.get(&key).map(Vec::as_slice).unwrap_or(&[]);
                let blocked_by = UnlockCore::blocking_lesson(sequence, lesson, &completed);
                LessonState {
                    lesson_id: lesson.id,
                    locked: blocked_by.is_some(),
                    completed: completed.contains(&lesson.id),
                    blocked_by,
                }
            })
            .collect();
        Ok(states)
    }

    /// 记录一次专注检查
    ///
    /// 锁定中的课次拒绝记录
    #[instrument(skip(self))]
    pub fn record_attention_check(
        &self,
        student_id: i64,
        lesson_id: i64,
        checkpoint: i32,
        now: DateTime<Utc>,
    ) -> EngineResult<AttentionOutcome> {
        let lesson = self.load_lesson(lesson_id)?;
        if let Some(blocked_by) = self.blocked_by(student_id, &lesson)? {
            return Err(EngineError::LessonLocked { lesson_id, blocked_by });
        }

        let required = self
            .config
            .get_attention_checks_required()
            .map_err(EngineError::config)?;
        let current = self.lesson_view_repo.find(student_id, lesson_id)?;
        let (view, newly_completed) = UnlockCore::apply_attention_check(
            current.as_ref(),
            student_id,
            lesson_id,
            checkpoint,
            required,
            now,
        )?;

        let view = if current.as_ref() != Some(&view) {
            self.lesson_view_repo.upsert(&view)?;
            // 并发累加的观看时长以库中为准
            self.lesson_view_repo.find(student_id, lesson_id)?.unwrap_or(view)
        } else {
            view
        };
        if newly_completed {
            tracing::info!(student_id, lesson_id, "课次已完成");
        }

        Ok(AttentionOutcome { view, newly_completed })
    }

    /// 累加观看时长
    pub fn record_watch_time(
        &self,
        student_id: i64,
        lesson_id: i64,
        seconds: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<LessonView> {
        if seconds <= 0 {
            return Err(EngineError::InvalidInput(format!("观看时长必须为正数: {}", seconds)));
        }
        let lesson = self.load_lesson(lesson_id)?;
        if let Some(blocked_by) = self.blocked_by(student_id, &lesson)? {
            return Err(EngineError::LessonLocked { lesson_id, blocked_by });
        }

        self.lesson_view_repo
            .add_watch_time(student_id, lesson_id, seconds, now)?;
        self.lesson_view_repo
            .find(student_id, lesson_id)?
            .ok_or_else(|| EngineError::InvariantViolation(format!(
                "观看记录写入后不存在: student_id={}, lesson_id={}",
                student_id, lesson_id
            )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::ScopeUnit;
    use crate::domain::types::LessonType;
    use chrono::TimeZone;

    fn lesson(id: i64, order: i32, video: bool) -> Lesson {
        let t = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        Lesson {
            id,
            subject_id: 10,
            scope: ScopeUnit::Direction(1),
            lesson_type: LessonType::Lecture,
            order,
            title: format!("Lesson {}", order),
            semester: Some(3),
            video_ref: video.then(|| format!("video/{}.mp4", id)),
            file_refs: vec![],
            created_by: None,
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn test_first_video_lesson_unlocked() {
        let seq = vec![lesson(1, 1, true), lesson(2, 2, true)];
        assert_eq!(UnlockCore::blocking_lesson(&seq, &seq[0], &HashSet::new()), None);
        assert_eq!(UnlockCore::blocking_lesson(&seq, &seq[1], &HashSet::new()), Some(1));
    }

    #[test]
    fn test_lessons_without_video_never_block_or_lock() {
        let seq = vec![lesson(1, 1, false), lesson(2, 2, true), lesson(3, 3, false)];
        assert_eq!(UnlockCore::blocking_lesson(&seq, &seq[1], &HashSet::new()), None);
        assert_eq!(UnlockCore::blocking_lesson(&seq, &seq[2], &HashSet::new()), None);
    }

    #[test]
    fn test_unlocked_once_all_earlier_video_lessons_completed() {
        let seq = vec![lesson(1, 1, true), lesson(2, 2, true), lesson(3, 3, true)];
        let completed: HashSet<i64> = [1].into_iter().collect();
        assert_eq!(UnlockCore::blocking_lesson(&seq, &seq[2], &completed), Some(2));

        let completed: HashSet<i64> = [1, 2].into_iter().collect();
        assert_eq!(UnlockCore::blocking_lesson(&seq, &seq[2], &completed), None);
    }

    #[test]
    fn test_other_lesson_types_do_not_block() {
        let mut practicum = lesson(1, 1, true);
        practicum.lesson_type = LessonType::Practicum;
        let target = lesson(2, 2, true);
        let seq = vec![practicum, target.clone()];
        assert_eq!(UnlockCore::blocking_lesson(&seq, &target, &HashSet::new()), None);
    }

    #[test]
    fn test_attention_checks_complete_once() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let (v1, done) = UnlockCore::apply_attention_check(None, 100, 1, 1, 3, t0).unwrap();
        assert!(!done);
        let (v2, _) = UnlockCore::apply_attention_check(Some(&v1), 100, 1, 2, 3, t0).unwrap();
        let (v3, done) = UnlockCore::apply_attention_check(Some(&v2), 100, 1, 3, 3, t0).unwrap();
        assert!(done);
        assert_eq!(v3.completed_at, Some(t0));

        // 重放不改变任何字段
        let later = t0 + chrono::Duration::minutes(5);
        let (v3b, done) = UnlockCore::apply_attention_check(Some(&v3), 100, 1, 2, 3, later).unwrap();
        assert!(!done);
        assert_eq!(v3b, v3);

        // 继续计数不会改写完成时间
        let (v4, done) = UnlockCore::apply_attention_check(Some(&v3), 100, 1, 4, 3, later).unwrap();
        assert!(!done);
        assert_eq!(v4.completed_at, Some(t0));
    }

    #[test]
    fn test_attention_check_gap_rejected() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        assert!(UnlockCore::apply_attention_check(None, 100, 1, 2, 3, t0).is_err());
        assert!(UnlockCore::apply_attention_check(None, 100, 1, 0, 3, t0).is_err());
    }
}
