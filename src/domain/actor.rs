// ==========================================
// 课程权限与成绩汇总引擎 - 操作者
// ==========================================
// 红线: 当前角色是每次调用的显式输入，引擎内部不读会话状态
// ==========================================

use crate::domain::types::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    /// 用户持有的全部角色
    pub roles: BTreeSet<Role>,
    /// 本次请求所使用的角色
    pub active_role: Role,
}

impl Actor {
    pub fn new(user_id: i64, roles: impl IntoIterator<Item = Role>, active_role: Role) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
            active_role,
        }
    }

    /// 只持有一个角色的用户
    pub fn single(user_id: i64, role: Role) -> Self {
        Self::new(user_id, [role], role)
    }

    pub fn holds_active_role(&self) -> bool {
        self.roles.contains(&self.active_role)
    }
}
