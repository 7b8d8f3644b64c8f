// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、标准组织结构种子数据
// ==========================================

#![allow(dead_code)]

use course_policy_engine::db::{apply_schema, open_sqlite_connection};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是合法 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    apply_schema(&conn)?;

    Ok((temp_file, db_path))
}
