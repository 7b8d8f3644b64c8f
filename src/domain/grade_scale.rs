// ==========================================
// 课程权限与成绩汇总引擎 - 评分等级
// ==========================================
// 规则: 取 "阈值 ≤ 百分比" 中阈值最高的一档
// ==========================================

use serde::{Deserialize, Serialize};

/// 评分等级档位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub min_percent: f64,
    pub letter: String,
    pub color: String,
}

/// 评分等级表（按阈值升序保存）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeScale {
    bands: Vec<GradeBand>,
}

impl GradeScale {
    pub fn new(mut bands: Vec<GradeBand>) -> Self {
        bands.sort_by(|a, b| a.min_percent.total_cmp(&b.min_percent));
        Self { bands }
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// 百分比对应的等级；低于所有阈值时返回 None
    pub fn band_for(&self, percent: f64) -> Option<&GradeBand> {
        self.bands
            .iter()
            .rev()
            .find(|band| band.min_percent <= percent)
    }
}
