// ==========================================
// 课程权限与成绩汇总引擎 - 仓储层公共工具
// ==========================================
// 职责: IN 子句构建、封闭枚举列解析、JSON 列读写
// ==========================================

use crate::domain::types::LessonType;
use rusqlite::types::Type;
use serde::{de::DeserializeOwned, Serialize};

/// 构建 IN 子句的 SQL 片段
///
/// 空列表返回永假条件，确保 SQL 语法正确
///
/// ```
/// use course_policy_engine::repository::sql_utils::build_in_clause;
///
/// assert_eq!(build_in_clause("group_id", 2), "group_id IN (?, ?)");
/// assert_eq!(build_in_clause("group_id", 0), "1 = 0");
/// ```
pub fn build_in_clause(column_name: &str, count: usize) -> String {
    if count == 0 {
        return "1 = 0".to_string();
    }

    let placeholders = vec!["?"; count].join(", ");
    format!("{} IN ({})", column_name, placeholders)
}

/// 解析课程类型列；未知编码作为转换错误上抛，不静默降级
pub fn parse_lesson_type(idx: usize, raw: &str) -> rusqlite::Result<LessonType> {
    raw.parse::<LessonType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

/// 读取 JSON 数组列（解析失败时返回空向量）
pub fn deserialize_json_array<T: DeserializeOwned>(json: &str) -> Vec<T> {
    serde_json::from_str(json).unwrap_or_default()
}

/// 序列化为 JSON 列
pub fn serialize_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lesson_type_rejects_unknown() {
        assert_eq!(parse_lesson_type(0, "amaliyot").unwrap(), LessonType::Practicum);
        assert!(parse_lesson_type(3, "practice").is_err());
    }

    #[test]
    fn test_json_array_roundtrip_and_fallback() {
        let ids = vec![3_i64, 5, 8];
        let json = serialize_json(&ids);
        assert_eq!(deserialize_json_array::<i64>(&json), ids);
        assert!(deserialize_json_array::<i64>("not json").is_empty());
    }
}
