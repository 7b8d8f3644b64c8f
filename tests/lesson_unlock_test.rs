// ==========================================
// 课次解锁集成测试
// ==========================================
// 规则: 有视频的课次，须完成同一 (科目, 范围, 类型) 内所有更早的课次才解锁
// ==========================================

mod helpers;
mod test_helpers;

use chrono::Utc;
use course_policy_engine::api::ApiError;
use course_policy_engine::app::AppState;
use course_policy_engine::domain::action_log::ActionType;
use course_policy_engine::domain::types::{LessonType, TargetKind};
use course_policy_engine::domain::{Lesson, ScopeUnit};
use course_policy_engine::engine::UnlockCore;
use helpers::test_data_builder::*;
use tempfile::NamedTempFile;
use test_helpers::create_test_db;

fn setup() -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    seed_university(&state.repositories);
    (temp_file, state)
}

fn video_lesson(state: &AppState, scope: ScopeUnit, lesson_type: LessonType, order: i32) -> Lesson {
    state
        .content_api
        .create_lesson(
            &admin(),
            LessonDraftBuilder::new(SUBJECT_ALGO, scope, lesson_type, order)
                .video(&format!("video/{}-{}.mp4", lesson_type, order))
                .build(),
        )
        .unwrap()
}

fn complete(state: &AppState, student_id: i64, lesson_id: i64) {
    let me = student(student_id);
    for checkpoint in 1..=3 {
        state
            .progress_api
            .record_attention_check(&me, lesson_id, checkpoint)
            .unwrap();
    }
}

#[test]
fn test_lessons_unlock_in_order() {
    let (_tmp, state) = setup();
    let scope = ScopeUnit::Group(GROUP_A);
    let first = video_lesson(&state, scope, LessonType::Lecture, 1);
    let second = video_lesson(&state, scope, LessonType::Lecture, 2);
    let third = video_lesson(&state, scope, LessonType::Lecture, 3);
    let me = student(STUDENT_A);

    assert!(state.progress_api.open_lesson(&me, first.id).is_ok());
    match state.progress_api.open_lesson(&me, third.id).unwrap_err() {
        ApiError::LessonLocked { blocked_by, .. } => assert_eq!(blocked_by, first.id),
        other => panic!("期望 LessonLocked，实际: {:?}", other),
    }

    complete(&state, STUDENT_A, first.id);
    assert!(state.progress_api.open_lesson(&me, second.id).is_ok());
    match state.progress_api.open_lesson(&me, third.id).unwrap_err() {
        ApiError::LessonLocked { blocked_by, .. } => assert_eq!(blocked_by, second.id),
        other => panic!("期望 LessonLocked，实际: {:?}", other),
    }

    // 其他学生的进度互不影响
    assert!(state.progress_api.open_lesson(&student(STUDENT_A2), second.id).is_err());
}

#[test]
fn test_sequences_are_independent_per_lesson_type() {
    let (_tmp, state) = setup();
    let scope = ScopeUnit::Group(GROUP_A);
    video_lesson(&state, scope, LessonType::Lecture, 1);
    let lecture_2 = video_lesson(&state, scope, LessonType::Lecture, 2);
    let practicum_1 = video_lesson(&state, scope, LessonType::Practicum, 1);
    let me = student(STUDENT_A);

    assert!(state.progress_api.open_lesson(&me, lecture_2.id).is_err());
    assert!(state.progress_api.open_lesson(&me, practicum_1.id).is_ok());
}

#[test]
fn test_lesson_without_video_is_never_locked() {
    let (_tmp, state) = setup();
    let scope = ScopeUnit::Group(GROUP_A);
    video_lesson(&state, scope, LessonType::Lecture, 1);
    let reading = state
        .content_api
        .create_lesson(
            &admin(),
            LessonDraftBuilder::new(SUBJECT_ALGO, scope, LessonType::Lecture, 2).build(),
        )
        .unwrap();

    assert!(state.progress_api.open_lesson(&student(STUDENT_A), reading.id).is_ok());
}

#[test]
fn test_lesson_list_reports_states() {
    let (_tmp, state) = setup();
    let first = video_lesson(&state, ScopeUnit::Direction(DIRECTION_CS), LessonType::Lecture, 1);
    let second = video_lesson(&state, ScopeUnit::Direction(DIRECTION_CS), LessonType::Lecture, 2);
    // B 班专属课次对 A 班学生不可见
    video_lesson(&state, ScopeUnit::Group(GROUP_B), LessonType::Lecture, 1);

    complete(&state, STUDENT_A, first.id);
    let listed = state
        .progress_api
        .lessons_for_student(&student(STUDENT_A), SUBJECT_ALGO)
        .unwrap();

    assert_eq!(listed.len(), 2);
    let first_state = &listed.iter().find(|l| l.lesson.id == first.id).unwrap().state;
    assert!(first_state.completed);
    assert!(!first_state.locked);
    let second_state = &listed.iter().find(|l| l.lesson.id == second.id).unwrap().state;
    assert!(!second_state.completed);
    assert!(!second_state.locked);
}

#[test]
fn test_attention_checks_are_idempotent_and_sequential() {
    let (_tmp, state) = setup();
    let lesson = video_lesson(&state, ScopeUnit::Group(GROUP_A), LessonType::Lecture, 1);
    let me = student(STUDENT_A);

    let view = state.progress_api.record_attention_check(&me, lesson.id, 1).unwrap();
    assert_eq!(view.attention_checks_passed, 1);

    // 重放不改变计数
    let view = state.progress_api.record_attention_check(&me, lesson.id, 1).unwrap();
    assert_eq!(view.attention_checks_passed, 1);

    // 跳号无效
    let err = state
        .progress_api
        .record_attention_check(&me, lesson.id, 3)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    state.progress_api.record_attention_check(&me, lesson.id, 2).unwrap();
    let view = state.progress_api.record_attention_check(&me, lesson.id, 3).unwrap();
    assert!(view.is_completed);
    let completed_at = view.completed_at;
    assert!(completed_at.is_some());

    // 完成时间只写一次，完成日志只记一次
    let view = state.progress_api.record_attention_check(&me, lesson.id, 3).unwrap();
    assert_eq!(view.completed_at, completed_at);

    let logs = state
        .repositories
        .action_log_repo
        .find_by_target(TargetKind::Lesson, lesson.id)
        .unwrap();
    let completions = logs
        .iter()
        .filter(|l| l.action_type == ActionType::LessonCompleted)
        .count();
    assert_eq!(completions, 1);
}

#[test]
fn test_locked_lesson_rejects_progress() {
    let (_tmp, state) = setup();
    let scope = ScopeUnit::Group(GROUP_A);
    video_lesson(&state, scope, LessonType::Lecture, 1);
    let second = video_lesson(&state, scope, LessonType::Lecture, 2);
    let me = student(STUDENT_A);

    assert!(matches!(
        state.progress_api.record_attention_check(&me, second.id, 1),
        Err(ApiError::LessonLocked { .. })
    ));
    assert!(matches!(
        state.progress_api.record_watch_time(&me, second.id, 60),
        Err(ApiError::LessonLocked { .. })
    ));
}

#[test]
fn test_watch_time_accumulates() {
    let (_tmp, state) = setup();
    let lesson = video_lesson(&state, ScopeUnit::Group(GROUP_A), LessonType::Lecture, 1);
    let me = student(STUDENT_A);

    state.progress_api.record_watch_time(&me, lesson.id, 120).unwrap();
    let view = state.progress_api.record_watch_time(&me, lesson.id, 45).unwrap();
    assert_eq!(view.watched_seconds, 165);

    assert!(matches!(
        state.progress_api.record_watch_time(&me, lesson.id, 0),
        Err(ApiError::InvalidInput(_))
    ));
}

#[test]
fn test_attention_check_keeps_watch_time_written_in_between() {
    let (_tmp, state) = setup();
    let lesson = video_lesson(&state, ScopeUnit::Group(GROUP_A), LessonType::Lecture, 1);
    let views = &state.repositories.lesson_view_repo;
    let now = Utc::now();

    views.add_watch_time(STUDENT_A, lesson.id, 100, now).unwrap();
    let snapshot = views.find(STUDENT_A, lesson.id).unwrap();
    // 读取快照之后、写回之前又累加了一段时长
    views.add_watch_time(STUDENT_A, lesson.id, 50, now).unwrap();

    let (checked, _) =
        UnlockCore::apply_attention_check(snapshot.as_ref(), STUDENT_A, lesson.id, 1, 3, now).unwrap();
    views.upsert(&checked).unwrap();

    let stored = views.find(STUDENT_A, lesson.id).unwrap().unwrap();
    assert_eq!(stored.watched_seconds, 150);
    assert_eq!(stored.attention_checks_passed, 1);

    // 过期快照不能把专注检查次数改小
    let mut stale = stored.clone();
    stale.attention_checks_passed = 0;
    views.upsert(&stale).unwrap();
    assert_eq!(views.find(STUDENT_A, lesson.id).unwrap().unwrap().attention_checks_passed, 1);
}

#[test]
fn test_attention_check_returns_accumulated_watch_time() {
    let (_tmp, state) = setup();
    let lesson = video_lesson(&state, ScopeUnit::Group(GROUP_A), LessonType::Lecture, 1);
    let me = student(STUDENT_A);

    state.progress_api.record_watch_time(&me, lesson.id, 90).unwrap();
    let view = state
        .progress_api
        .record_attention_check(&me, lesson.id, 1)
        .unwrap();
    assert_eq!(view.watched_seconds, 90);
    assert_eq!(view.attention_checks_passed, 1);
}

#[test]
fn test_only_students_record_progress() {
    let (_tmp, state) = setup();
    let lesson = video_lesson(&state, ScopeUnit::Group(GROUP_A), LessonType::Lecture, 1);

    for actor in [teacher(LECTURER), admin(), dean()] {
        match state
            .progress_api
            .record_attention_check(&actor, lesson.id, 1)
            .unwrap_err()
        {
            ApiError::PermissionDenied { code, .. } => assert_eq!(code, "ACTION_NOT_APPLICABLE"),
            other => panic!("期望权限拒绝，实际: {:?}", other),
        }
        assert!(matches!(
            state.progress_api.record_watch_time(&actor, lesson.id, 30),
            Err(ApiError::PermissionDenied { .. })
        ));
        assert!(state
            .repositories
            .lesson_view_repo
            .find(actor.user_id, lesson.id)
            .unwrap()
            .is_none());
    }
}

#[test]
fn test_teacher_opens_lessons_without_gate() {
    let (_tmp, state) = setup();
    let scope = ScopeUnit::Group(GROUP_A);
    video_lesson(&state, scope, LessonType::Lecture, 1);
    let second = video_lesson(&state, scope, LessonType::Lecture, 2);

    assert!(state.progress_api.open_lesson(&teacher(LECTURER), second.id).is_ok());
}
