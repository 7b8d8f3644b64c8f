// ==========================================
// 教学大纲解析与任课绑定集成测试
// ==========================================

mod helpers;
mod test_helpers;

use course_policy_engine::domain::types::LessonType;
use course_policy_engine::domain::{
    BindingScope, CurriculumEntry, CurriculumQuery, LessonHours, ScopeUnit, StudyGroup,
    TeachingAssignment,
};
use course_policy_engine::config::StaticEngineConfig;
use course_policy_engine::engine::{CurriculumResolver, EngineError, EngineRepositories, TeachingIndex};
use course_policy_engine::logging;
use helpers::test_data_builder::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::NamedTempFile;
use test_helpers::create_test_db;

struct Fixture {
    _tmp: NamedTempFile,
    repos: EngineRepositories,
    curriculum: Arc<CurriculumResolver<StaticEngineConfig>>,
    teaching: TeachingIndex<StaticEngineConfig>,
}

fn setup() -> Fixture {
    logging::init_test();
    let (tmp, db_path) = create_test_db().unwrap();
    let conn = course_policy_engine::db::open_shared_connection(&db_path).unwrap();
    let repos = EngineRepositories::from_connection(conn);
    seed_university(&repos);

    let curriculum = Arc::new(CurriculumResolver::new(
        repos.curriculum_repo.clone(),
        repos.organization_repo.clone(),
        Arc::new(StaticEngineConfig::default()),
    ));
    let teaching = TeachingIndex::new(
        repos.teaching_repo.clone(),
        repos.organization_repo.clone(),
        curriculum.clone(),
    );
    Fixture {
        _tmp: tmp,
        repos,
        curriculum,
        teaching,
    }
}

fn types(items: &[LessonType]) -> BTreeSet<LessonType> {
    items.iter().copied().collect()
}

// ==========================================
// 教学大纲
// ==========================================

#[test]
fn test_credit_scenario_from_seeded_curriculum() {
    let f = setup();
    let view = f
        .curriculum
        .resolve(&CurriculumQuery::new(DIRECTION_CS, SUBJECT_ALGO, SEMESTER))
        .unwrap()
        .unwrap();

    // (60 + 30 + 30) / 30 = 4，课程设计开设但不计学分
    assert_eq!(view.credits, 4.0);
    assert!(view.offers(LessonType::Coursework));
    assert!(!view.offers(LessonType::Seminar));
    assert_eq!(
        view.offered_types(),
        types(&[LessonType::Lecture, LessonType::Practicum, LessonType::Lab, LessonType::Coursework])
    );
}

#[test]
fn test_missing_curriculum_resolves_to_none() {
    let f = setup();
    assert!(f
        .curriculum
        .resolve(&CurriculumQuery::new(DIRECTION_MATH, SUBJECT_ALGO, SEMESTER))
        .unwrap()
        .is_none());
    assert!(f
        .curriculum
        .resolve(&CurriculumQuery::new(DIRECTION_CS, SUBJECT_ALGO, SEMESTER + 1))
        .unwrap()
        .is_none());
}

#[test]
fn test_zero_hours_fall_back_to_subject_credits() {
    let f = setup();
    f.repos
        .curriculum_repo
        .insert(&CurriculumEntry {
            id: 0,
            direction_id: DIRECTION_MATH,
            subject_id: SUBJECT_DB,
            semester: SEMESTER,
            enrollment_year: None,
            education_type: None,
            hours: LessonHours {
                coursework: 20,
                ..Default::default()
            },
        })
        .unwrap();

    let view = f
        .curriculum
        .resolve_for_scope(ScopeUnit::Group(GROUP_MATH), SUBJECT_DB, SEMESTER)
        .unwrap()
        .unwrap();
    assert_eq!(view.credits, 5.0);
}

#[test]
fn test_specific_enrollment_year_preferred_over_generic() {
    let f = setup();
    let specific = f
        .repos
        .curriculum_repo
        .insert(&CurriculumEntry {
            id: 0,
            direction_id: DIRECTION_CS,
            subject_id: SUBJECT_DB,
            semester: SEMESTER,
            enrollment_year: Some(2023),
            education_type: None,
            hours: LessonHours {
                lecture: 90,
                ..Default::default()
            },
        })
        .unwrap();

    let view = f
        .curriculum
        .resolve(&CurriculumQuery::new(DIRECTION_CS, SUBJECT_DB, SEMESTER).with_enrollment_year(Some(2023)))
        .unwrap()
        .unwrap();
    assert_eq!(view.entry_id, specific);
    assert_eq!(view.credits, 3.0);

    // 其他入学年份不匹配该条目，落回通用条目
    let view = f
        .curriculum
        .resolve(&CurriculumQuery::new(DIRECTION_CS, SUBJECT_DB, SEMESTER).with_enrollment_year(Some(2024)))
        .unwrap()
        .unwrap();
    assert_ne!(view.entry_id, specific);
    assert_eq!(view.credits, 2.0);
}

#[test]
fn test_group_without_direction_has_no_curriculum() {
    let f = setup();
    f.repos
        .organization_repo
        .insert_group(&StudyGroup {
            id: 99,
            name: "Sirtqi".to_string(),
            direction_id: None,
            course_year: 1,
            semester: SEMESTER,
            education_type: None,
            enrollment_year: None,
        })
        .unwrap();

    assert!(f
        .curriculum
        .resolve_for_scope(ScopeUnit::Group(99), SUBJECT_ALGO, SEMESTER)
        .unwrap()
        .is_none());
    assert!(matches!(
        f.curriculum.resolve_for_scope(ScopeUnit::Group(404), SUBJECT_ALGO, SEMESTER),
        Err(EngineError::ScopeNotFound(_))
    ));
}

#[test]
fn test_offered_subjects_lists_semester_plan() {
    let f = setup();
    let views = f
        .curriculum
        .offered_subjects(DIRECTION_CS, SEMESTER, None, None)
        .unwrap();
    let subjects: Vec<i64> = views.iter().map(|v| v.subject_id).collect();
    assert_eq!(subjects, vec![SUBJECT_ALGO, SUBJECT_DB]);
}

// ==========================================
// 任课绑定
// ==========================================

#[test]
fn test_direction_scope_expands_to_all_groups() {
    let f = setup();
    let groups = f.teaching.expand_scope(&BindingScope::Direction(DIRECTION_CS)).unwrap();
    assert_eq!(groups, vec![GROUP_A, GROUP_B]);
}

#[test]
fn test_bindings_without_fallback() {
    let f = setup();
    let scope = BindingScope::Groups(vec![GROUP_A]);
    assert_eq!(
        f.teaching
            .bindings_for(PRACTICUM_TEACHER, SUBJECT_ALGO, &scope, Some(SEMESTER))
            .unwrap(),
        types(&[LessonType::Practicum])
    );
    assert!(f
        .teaching
        .bindings_for(PRACTICUM_TEACHER, SUBJECT_DB, &scope, Some(SEMESTER))
        .unwrap()
        .is_empty());
}

#[test]
fn test_practicum_fallback_adds_lab_and_coursework() {
    let f = setup();
    let effective = f
        .teaching
        .effective_bindings_with_fallback(
            PRACTICUM_TEACHER,
            SUBJECT_ALGO,
            &BindingScope::Groups(vec![GROUP_A]),
            Some(SEMESTER),
        )
        .unwrap();
    assert_eq!(
        effective,
        types(&[LessonType::Practicum, LessonType::Lab, LessonType::Coursework])
    );
}

#[test]
fn test_fallback_needs_a_resolved_semester() {
    let f = setup();
    // 学期未知 → 大纲视为缺失（Restricted），不兜底
    let effective = f
        .teaching
        .effective_bindings_with_fallback(
            PRACTICUM_TEACHER,
            SUBJECT_ALGO,
            &BindingScope::Groups(vec![GROUP_A]),
            None,
        )
        .unwrap();
    assert_eq!(effective, types(&[LessonType::Practicum]));
}

#[test]
fn test_reassignment_replaces_binding() {
    let f = setup();
    f.teaching
        .assign(&TeachingAssignment {
            id: 0,
            teacher_id: 777,
            subject_id: SUBJECT_ALGO,
            group_id: GROUP_B,
            lesson_type: LessonType::Practicum,
            academic_year: None,
            semester: None,
        })
        .unwrap();

    let scope_b = BindingScope::Groups(vec![GROUP_B]);
    assert!(f
        .teaching
        .bindings_for(PRACTICUM_TEACHER, SUBJECT_ALGO, &scope_b, Some(SEMESTER))
        .unwrap()
        .is_empty());
    assert_eq!(
        f.teaching
            .bindings_for(777, SUBJECT_ALGO, &scope_b, Some(SEMESTER))
            .unwrap(),
        types(&[LessonType::Practicum])
    );
    let group_b: Vec<(i64, LessonType)> = f
        .repos
        .teaching_repo
        .find_by_group(GROUP_B)
        .unwrap()
        .into_iter()
        .filter(|b| b.subject_id == SUBJECT_ALGO)
        .map(|b| (b.teacher_id, b.lesson_type))
        .collect();
    assert_eq!(group_b.len(), 2);
    assert!(group_b.contains(&(777, LessonType::Practicum)));
    assert!(group_b.contains(&(LECTURER, LessonType::Lecture)));

    // A 班的绑定不受影响
    assert_eq!(
        f.teaching
            .bindings_for(PRACTICUM_TEACHER, SUBJECT_ALGO, &BindingScope::Groups(vec![GROUP_A]), Some(SEMESTER))
            .unwrap(),
        types(&[LessonType::Practicum])
    );
}

#[test]
fn test_semester_limited_binding() {
    let f = setup();
    f.teaching
        .assign(&TeachingAssignment {
            id: 0,
            teacher_id: 778,
            subject_id: SUBJECT_DB,
            group_id: GROUP_B,
            lesson_type: LessonType::Seminar,
            academic_year: Some("2025-2026".to_string()),
            semester: Some(SEMESTER + 1),
        })
        .unwrap();

    let scope = BindingScope::Groups(vec![GROUP_B]);
    assert!(f
        .teaching
        .bindings_for(778, SUBJECT_DB, &scope, Some(SEMESTER))
        .unwrap()
        .is_empty());
    assert_eq!(
        f.teaching
            .bindings_for(778, SUBJECT_DB, &scope, Some(SEMESTER + 1))
            .unwrap(),
        types(&[LessonType::Seminar])
    );
}
