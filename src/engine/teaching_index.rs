// ==========================================
// 课程权限与成绩汇总引擎 - 任课绑定索引
// ==========================================
// 职责: (教师, 科目, 方向|班级集合) → 绑定的课程类型集合
// 兜底规则: 实践课教师在无人负责时接管实验/课程设计
// 红线: 兜底规则只在此处计算，所有调用点共用
// ==========================================

use crate::config::EngineConfigReader;
use crate::domain::content::ScopeUnit;
use crate::domain::curriculum::MissingCurriculum;
use crate::domain::teaching::{BindingScope, TeachingAssignment};
use crate::domain::types::LessonType;
use crate::engine::curriculum_resolver::CurriculumResolver;
use crate::engine::error::EngineResult;
use crate::repository::{OrganizationRepository, TeachingAssignmentRepository};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// TeachingCore - 纯函数
// ==========================================
pub struct TeachingCore;

impl TeachingCore {
    /// 叠加实践课兜底
    ///
    /// # 规则
    /// 对实验、课程设计逐一判断，同时满足时加入：
    /// 1. 本范围大纲开设该类型（学时 > 0）
    /// 2. 范围内任何教师都未绑定该类型
    /// 3. 该教师持有实践课绑定
    pub fn apply_practicum_fallback(
        own: &BTreeSet<LessonType>,
        offered: &BTreeSet<LessonType>,
        bound_by_anyone: &BTreeSet<LessonType>,
    ) -> BTreeSet<LessonType> {
        let mut effective = own.clone();
        if !own.contains(&LessonType::Practicum) {
            return effective;
        }

        for lesson_type in LessonType::PRACTICUM_FALLBACK {
            if offered.contains(&lesson_type) && !bound_by_anyone.contains(&lesson_type) {
                effective.insert(lesson_type);
            }
        }
        effective
    }
}

impl From<ScopeUnit> for BindingScope {
    fn from(scope: ScopeUnit) -> Self {
        match scope {
            ScopeUnit::Direction(d) => BindingScope::Direction(d),
            ScopeUnit::Group(g) => BindingScope::Groups(vec![g]),
        }
    }
}

// ==========================================
// TeachingIndex - 任课绑定索引
// ==========================================
pub struct TeachingIndex<C>
where
    C: EngineConfigReader,
{
    teaching_repo: Arc<TeachingAssignmentRepository>,
    organization_repo: Arc<OrganizationRepository>,
    curriculum: Arc<CurriculumResolver<C>>,
}

impl<C> TeachingIndex<C>
where
    C: EngineConfigReader,
{
    pub fn new(
        teaching_repo: Arc<TeachingAssignmentRepository>,
        organization_repo: Arc<OrganizationRepository>,
        curriculum: Arc<CurriculumResolver<C>>,
    ) -> Self {
        Self {
            teaching_repo,
            organization_repo,
            curriculum,
        }
    }

    /// 写入绑定（同键改派）
    pub fn assign(&self, binding: &TeachingAssignment) -> EngineResult<i64> {
        Ok(self.teaching_repo.assign(binding)?)
    }

    /// 将范围展开为班级集合（方向 → 该方向全部班级）
    pub fn expand_scope(&self, scope: &BindingScope) -> EngineResult<Vec<i64>> {
        let mut group_ids = match scope {
            BindingScope::Direction(direction_id) => self
                .organization_repo
                .find_groups_by_direction(*direction_id)?
                .into_iter()
                .map(|g| g.id)
                .collect::<Vec<_>>(),
            BindingScope::Groups(ids) => ids.clone(),
        };
        group_ids.sort_unstable();
        group_ids.dedup();
        Ok(group_ids)
    }

    /// 教师在范围内直接绑定的课程类型
    ///
    /// `semester` 为 Some 时，限定学期的绑定只在该学期生效；未限定学期的绑定始终生效
    #[instrument(skip(self))]
    pub fn bindings_for(
        &self,
        teacher_id: i64,
        subject_id: i64,
        scope: &BindingScope,
        semester: Option<i32>,
    ) -> EngineResult<BTreeSet<LessonType>> {
        let group_ids = self.expand_scope(scope)?;
        if group_ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let bindings = self
            .teaching_repo
            .find_for_teacher(teacher_id, subject_id, &group_ids, semester)?;
        Ok(bindings.into_iter().map(|b| b.lesson_type).collect())
    }

    /// 直接绑定 + 实践课兜底
    ///
    /// 大纲缺失按 Restricted 处理（不开设任何类型 → 不触发兜底）
    #[instrument(skip(self))]
    pub fn effective_bindings_with_fallback(
        &self,
        teacher_id: i64,
        subject_id: i64,
        scope: &BindingScope,
        semester: Option<i32>,
    ) -> EngineResult<BTreeSet<LessonType>> {
        let group_ids = self.expand_scope(scope)?;
        if group_ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let own: BTreeSet<LessonType> = self
            .teaching_repo
            .find_for_teacher(teacher_id, subject_id, &group_ids, semester)?
            .into_iter()
            .map(|b| b.lesson_type)
            .collect();
        if !own.contains(&LessonType::Practicum) {
            return Ok(own);
        }

        let offered = self.offered_types(scope, &group_ids, subject_id, semester)?;
        let bound_by_anyone = self
            .teaching_repo
            .bound_lesson_types(subject_id, &group_ids, semester)?;

        let effective = TeachingCore::apply_practicum_fallback(&own, &offered, &bound_by_anyone);
        if effective.len() > own.len() {
            tracing::debug!(
                teacher_id,
                subject_id,
                added = ?effective.difference(&own).collect::<Vec<_>>(),
                "实践课兜底生效"
            );
        }
        Ok(effective)
    }

    /// 范围内开设的课程类型（缺失口径: Restricted）
    ///
    /// 班级集合可能跨多个方向，取各班级大纲的并集
    fn offered_types(
        &self,
        scope: &BindingScope,
        group_ids: &[i64],
        subject_id: i64,
        semester: Option<i32>,
    ) -> EngineResult<BTreeSet<LessonType>> {
        let Some(semester) = semester else {
            return Ok(MissingCurriculum::Restricted.offered_types(None));
        };

        match scope {
            BindingScope::Direction(direction_id) => {
                let view = self.curriculum.resolve_for_scope(
                    ScopeUnit::Direction(*direction_id),
                    subject_id,
                    semester,
                )?;
                Ok(MissingCurriculum::Restricted.offered_types(view.as_ref()))
            }
            BindingScope::Groups(_) => {
                let mut offered = BTreeSet::new();
                for group_id in group_ids {
                    let view =
                        self.curriculum
                            .resolve_for_scope(ScopeUnit::Group(*group_id), subject_id, semester)?;
                    offered.extend(MissingCurriculum::Restricted.offered_types(view.as_ref()));
                }
                Ok(offered)
            }
        }
    }
}
