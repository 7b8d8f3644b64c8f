// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
// 标准种子: 一个方向两个班级 + 另一方向一个班级，两门科目，
// 讲授教师/实践教师/单班教师各一位，管理员与院长各一位
// ==========================================

use chrono::NaiveDate;
use course_policy_engine::domain::{
    AssignmentDraft, CurriculumEntry, Direction, GradeBand, LessonDraft, LessonHours, ScopeUnit,
    Student, StudyGroup, Subject, TeachingAssignment,
};
use course_policy_engine::domain::types::{LessonType, Role};
use course_policy_engine::domain::Actor;
use course_policy_engine::engine::EngineRepositories;

// ==========================================
// 标准种子数据的 ID
// ==========================================

pub const DIRECTION_CS: i64 = 1;
pub const DIRECTION_MATH: i64 = 2;

pub const GROUP_A: i64 = 11;
pub const GROUP_B: i64 = 12;
pub const GROUP_MATH: i64 = 21;

pub const SEMESTER: i32 = 3;

pub const SUBJECT_ALGO: i64 = 100;
pub const SUBJECT_DB: i64 = 200;

pub const STUDENT_A: i64 = 1001;
pub const STUDENT_B: i64 = 1002;
pub const STUDENT_A2: i64 = 1003;
pub const STUDENT_MATH: i64 = 1004;

/// 算法: 两个班级的讲授
pub const LECTURER: i64 = 501;
/// 算法: 两个班级的实践（实验无人绑定，走兜底）
pub const PRACTICUM_TEACHER: i64 = 502;
/// 数据库: 仅 A 班的讲授与实践
pub const DB_TEACHER: i64 = 503;

pub const ADMIN: i64 = 900;
pub const DEAN: i64 = 901;

pub fn teacher(id: i64) -> Actor {
    Actor::single(id, Role::Teacher)
}

pub fn student(id: i64) -> Actor {
    Actor::single(id, Role::Student)
}

pub fn admin() -> Actor {
    Actor::single(ADMIN, Role::Admin)
}

pub fn dean() -> Actor {
    Actor::single(DEAN, Role::Dean)
}

fn hours(entries: &[(LessonType, u32)]) -> LessonHours {
    let mut h = LessonHours::default();
    for (t, v) in entries {
        h.set(*t, *v);
    }
    h
}

fn group(id: i64, name: &str, direction_id: i64) -> StudyGroup {
    StudyGroup {
        id,
        name: name.to_string(),
        direction_id: Some(direction_id),
        course_year: 2,
        semester: SEMESTER,
        education_type: None,
        enrollment_year: None,
    }
}

fn binding(teacher_id: i64, subject_id: i64, group_id: i64, lesson_type: LessonType) -> TeachingAssignment {
    TeachingAssignment {
        id: 0,
        teacher_id,
        subject_id,
        group_id,
        lesson_type,
        academic_year: None,
        semester: None,
    }
}

/// 写入标准种子数据
pub fn seed_university(repos: &EngineRepositories) {
    let org = &repos.organization_repo;

    for (id, code) in [(DIRECTION_CS, "CS"), (DIRECTION_MATH, "MATH")] {
        org.insert_direction(&Direction {
            id,
            code: code.to_string(),
            name: format!("{} direction", code),
            faculty_id: None,
            enrollment_year: None,
            education_type: None,
        })
        .unwrap();
    }

    org.insert_group(&group(GROUP_A, "CS-21A", DIRECTION_CS)).unwrap();
    org.insert_group(&group(GROUP_B, "CS-21B", DIRECTION_CS)).unwrap();
    org.insert_group(&group(GROUP_MATH, "MATH-21", DIRECTION_MATH)).unwrap();

    for (user_id, group_id) in [
        (STUDENT_A, GROUP_A),
        (STUDENT_B, GROUP_B),
        (STUDENT_A2, GROUP_A),
        (STUDENT_MATH, GROUP_MATH),
    ] {
        org.insert_student(&Student {
            user_id,
            group_id,
            full_name: format!("Student {}", user_id),
        })
        .unwrap();
    }

    org.insert_subject(&Subject {
        id: SUBJECT_ALGO,
        name: "Algoritmlar".to_string(),
        credits: 6.0,
    })
    .unwrap();
    org.insert_subject(&Subject {
        id: SUBJECT_DB,
        name: "Ma'lumotlar bazasi".to_string(),
        credits: 5.0,
    })
    .unwrap();

    // 算法: 60+30+30 学时 = 4 学分，另开课程设计
    repos
        .curriculum_repo
        .insert(&CurriculumEntry {
            id: 0,
            direction_id: DIRECTION_CS,
            subject_id: SUBJECT_ALGO,
            semester: SEMESTER,
            enrollment_year: None,
            education_type: None,
            hours: hours(&[
                (LessonType::Lecture, 60),
                (LessonType::Practicum, 30),
                (LessonType::Lab, 30),
                (LessonType::Coursework, 10),
            ]),
        })
        .unwrap();
    // 数据库: 30+30 学时 = 2 学分
    repos
        .curriculum_repo
        .insert(&CurriculumEntry {
            id: 0,
            direction_id: DIRECTION_CS,
            subject_id: SUBJECT_DB,
            semester: SEMESTER,
            enrollment_year: None,
            education_type: None,
            hours: hours(&[(LessonType::Lecture, 30), (LessonType::Practicum, 30)]),
        })
        .unwrap();

    let teaching = &repos.teaching_repo;
    for group_id in [GROUP_A, GROUP_B] {
        teaching
            .assign(&binding(LECTURER, SUBJECT_ALGO, group_id, LessonType::Lecture))
            .unwrap();
        teaching
            .assign(&binding(PRACTICUM_TEACHER, SUBJECT_ALGO, group_id, LessonType::Practicum))
            .unwrap();
    }
    teaching
        .assign(&binding(DB_TEACHER, SUBJECT_DB, GROUP_A, LessonType::Lecture))
        .unwrap();
    teaching
        .assign(&binding(DB_TEACHER, SUBJECT_DB, GROUP_A, LessonType::Practicum))
        .unwrap();

    repos
        .grade_scale_repo
        .replace_all(&[
            GradeBand { min_percent: 0.0, letter: "F".to_string(), color: "red".to_string() },
            GradeBand { min_percent: 55.0, letter: "C".to_string(), color: "yellow".to_string() },
            GradeBand { min_percent: 71.0, letter: "B".to_string(), color: "blue".to_string() },
            GradeBand { min_percent: 86.0, letter: "A".to_string(), color: "green".to_string() },
        ])
        .unwrap();
}

// ==========================================
// LessonDraft 构建器
// ==========================================

pub struct LessonDraftBuilder {
    draft: LessonDraft,
}

impl LessonDraftBuilder {
    pub fn new(subject_id: i64, scope: ScopeUnit, lesson_type: LessonType, order: i32) -> Self {
        Self {
            draft: LessonDraft {
                subject_id,
                scope,
                lesson_type,
                order,
                title: format!("{} #{}", lesson_type, order),
                semester: match scope {
                    ScopeUnit::Direction(_) => Some(SEMESTER),
                    ScopeUnit::Group(_) => None,
                },
                video_ref: None,
                file_refs: vec![],
            },
        }
    }

    pub fn video(mut self, video_ref: &str) -> Self {
        self.draft.video_ref = Some(video_ref.to_string());
        self
    }

    pub fn semester(mut self, semester: Option<i32>) -> Self {
        self.draft.semester = semester;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.draft.title = title.to_string();
        self
    }

    pub fn build(self) -> LessonDraft {
        self.draft
    }
}

// ==========================================
// AssignmentDraft 构建器
// ==========================================

pub struct AssignmentDraftBuilder {
    draft: AssignmentDraft,
}

impl AssignmentDraftBuilder {
    pub fn new(subject_id: i64, scope: ScopeUnit, lesson_type: LessonType) -> Self {
        Self {
            draft: AssignmentDraft {
                subject_id,
                scope,
                lesson_type,
                title: format!("{} task", lesson_type),
                max_score: 20.0,
                due_date: None,
                file_required: false,
                semester: match scope {
                    ScopeUnit::Direction(_) => Some(SEMESTER),
                    ScopeUnit::Group(_) => None,
                },
                related_lesson_ids: vec![],
            },
        }
    }

    pub fn max_score(mut self, max_score: f64) -> Self {
        self.draft.max_score = max_score;
        self
    }

    pub fn due(mut self, due_date: NaiveDate) -> Self {
        self.draft.due_date = Some(due_date);
        self
    }

    pub fn file_required(mut self) -> Self {
        self.draft.file_required = true;
        self
    }

    pub fn build(self) -> AssignmentDraft {
        self.draft
    }
}
