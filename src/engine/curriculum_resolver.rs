// ==========================================
// 课程权限与成绩汇总引擎 - 教学大纲解析器
// ==========================================
// 职责: (方向, 科目, 学期[, 入学年份, 培养形式]) → 各类型学时 + 学分
// 红线: 无副作用；找不到条目返回 None，由调用方声明缺失口径
// ==========================================

use crate::config::EngineConfigReader;
use crate::domain::content::ScopeUnit;
use crate::domain::curriculum::{CurriculumEntry, CurriculumQuery, CurriculumView, LessonHours};
use crate::domain::types::LessonType;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{CurriculumRepository, OrganizationRepository};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// CurriculumCore - 纯函数
// ==========================================
pub struct CurriculumCore;

impl CurriculumCore {
    /// 从候选条目中选出最匹配查询的一条
    ///
    /// # 规则
    /// - 条目的入学年份/培养形式已设置且与查询值不同 → 排除
    /// - 匹配字段多者优先；并列时通用条目（字段为空）优先；再按 id 升序
    pub fn select_entry<'a>(
        candidates: &'a [CurriculumEntry],
        query: &CurriculumQuery,
    ) -> Option<&'a CurriculumEntry> {
        candidates
            .iter()
            .filter(|e| {
                e.direction_id == query.direction_id
                    && e.subject_id == query.subject_id
                    && e.semester == query.semester
            })
            .filter(|e| Self::is_compatible(e, query))
            .min_by_key(|e| {
                (
                    Reverse(Self::matched_fields(e, query)),
                    Self::specific_fields(e),
                    e.id,
                )
            })
    }

    fn is_compatible(entry: &CurriculumEntry, query: &CurriculumQuery) -> bool {
        let year_ok = match (entry.enrollment_year, query.enrollment_year) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        let edu_ok = match (&entry.education_type, &query.education_type) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => true,
        };
        year_ok && edu_ok
    }

    fn matched_fields(entry: &CurriculumEntry, query: &CurriculumQuery) -> u8 {
        let mut n = 0;
        if entry.enrollment_year.is_some() && entry.enrollment_year == query.enrollment_year {
            n += 1;
        }
        if entry.education_type.is_some() && query.education_type.is_some() {
            n += 1;
        }
        n
    }

    fn specific_fields(entry: &CurriculumEntry) -> u8 {
        entry.enrollment_year.is_some() as u8 + entry.education_type.is_some() as u8
    }

    /// 计算学分
    ///
    /// (讲授+实践+实验+研讨+自学) / hours_per_credit；合计为 0 时回退到科目学分。
    /// 课程设计学时不计入学分。结果不做舍入，展示精度由调用方决定。
    pub fn compute_credits(hours: &LessonHours, fallback_credits: f64, hours_per_credit: f64) -> f64 {
        let sum = hours.credit_hours();
        if sum == 0 || hours_per_credit <= 0.0 {
            return fallback_credits;
        }
        sum as f64 / hours_per_credit
    }

    /// 由存储行构建解析视图
    pub fn build_view(entry: &CurriculumEntry, fallback_credits: f64, hours_per_credit: f64) -> CurriculumView {
        let hours: BTreeMap<LessonType, u32> = LessonType::ALL
            .iter()
            .map(|t| (*t, entry.hours.get(*t)))
            .collect();

        CurriculumView {
            entry_id: entry.id,
            direction_id: entry.direction_id,
            subject_id: entry.subject_id,
            semester: entry.semester,
            hours,
            credits: Self::compute_credits(&entry.hours, fallback_credits, hours_per_credit),
        }
    }
}

// ==========================================
// CurriculumResolver - 大纲解析器
// ==========================================
pub struct CurriculumResolver<C>
where
    C: EngineConfigReader,
{
    curriculum_repo: Arc<CurriculumRepository>,
    organization_repo: Arc<OrganizationRepository>,
    config: Arc<C>,
}

impl<C> CurriculumResolver<C>
where
    C: EngineConfigReader,
{
    pub fn new(
        curriculum_repo: Arc<CurriculumRepository>,
        organization_repo: Arc<OrganizationRepository>,
        config: Arc<C>,
    ) -> Self {
        Self {
            curriculum_repo,
            organization_repo,
            config,
        }
    }

    /// 解析单个 (方向, 科目, 学期) 的大纲
    ///
    /// # 返回
    /// - Ok(Some(view)): 找到条目
    /// - Ok(None): 无条目（缺失口径由调用方决定）
    #[instrument(skip(self), fields(direction_id = query.direction_id, subject_id = query.subject_id, semester = query.semester))]
    pub fn resolve(&self, query: &CurriculumQuery) -> EngineResult<Option<CurriculumView>> {
        let candidates = self.curriculum_repo.find_candidates(
            query.direction_id,
            query.subject_id,
            query.semester,
        )?;

        let Some(entry) = CurriculumCore::select_entry(&candidates, query) else {
            tracing::debug!(candidates = candidates.len(), "未找到匹配的大纲条目");
            return Ok(None);
        };

        let fallback = self.subject_credits(entry.subject_id)?;
        let hours_per_credit = self.config.get_hours_per_credit().map_err(EngineError::config)?;
        Ok(Some(CurriculumCore::build_view(entry, fallback, hours_per_credit)))
    }

    /// 按内容范围解析大纲
    ///
    /// 方向范围使用方向记录的入学年份/培养形式；班级范围使用班级的。
    /// 班级未归属方向时返回 None。
    pub fn resolve_for_scope(
        &self,
        scope: ScopeUnit,
        subject_id: i64,
        semester: i32,
    ) -> EngineResult<Option<CurriculumView>> {
        let query = match scope {
            ScopeUnit::Direction(direction_id) => {
                let direction = self
                    .organization_repo
                    .find_direction(direction_id)?
                    .ok_or_else(|| EngineError::ScopeNotFound(format!("direction_id={}", direction_id)))?;
                CurriculumQuery::new(direction.id, subject_id, semester)
                    .with_enrollment_year(direction.enrollment_year)
                    .with_education_type(direction.education_type)
            }
            ScopeUnit::Group(group_id) => {
                let group = self
                    .organization_repo
                    .find_group(group_id)?
                    .ok_or_else(|| EngineError::ScopeNotFound(format!("group_id={}", group_id)))?;
                let Some(direction_id) = group.direction_id else {
                    return Ok(None);
                };
                CurriculumQuery::new(direction_id, subject_id, semester)
                    .with_enrollment_year(group.enrollment_year)
                    .with_education_type(group.education_type)
            }
        };
        self.resolve(&query)
    }

    /// 某方向某学期开设的全部科目（学期汇总使用）
    #[instrument(skip(self))]
    pub fn offered_subjects(
        &self,
        direction_id: i64,
        semester: i32,
        enrollment_year: Option<i32>,
        education_type: Option<String>,
    ) -> EngineResult<Vec<CurriculumView>> {
        let entries = self
            .curriculum_repo
            .find_by_direction_semester(direction_id, semester)?;

        let mut by_subject: BTreeMap<i64, Vec<CurriculumEntry>> = BTreeMap::new();
        for entry in entries {
            by_subject.entry(entry.subject_id).or_default().push(entry);
        }

        let hours_per_credit = self.config.get_hours_per_credit().map_err(EngineError::config)?;
        let mut views = Vec::with_capacity(by_subject.len());
        for (subject_id, candidates) in by_subject {
            let query = CurriculumQuery::new(direction_id, subject_id, semester)
                .with_enrollment_year(enrollment_year)
                .with_education_type(education_type.clone());
            if let Some(entry) = CurriculumCore::select_entry(&candidates, &query) {
                let fallback = self.subject_credits(subject_id)?;
                views.push(CurriculumCore::build_view(entry, fallback, hours_per_credit));
            }
        }
        Ok(views)
    }

    fn subject_credits(&self, subject_id: i64) -> EngineResult<f64> {
        Ok(self
            .organization_repo
            .find_subject(subject_id)?
            .map(|s| s.credits)
            .unwrap_or(0.0))
    }
}
