//! RoleDepartment entity - 角色部门关系表
//!
//! 表名: org_role_department
//!
//! 角色的数据权限范围通过该表绑定到部门。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "org_role_department")]
pub struct Model {
    /// 角色ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub role_id: i64,

    /// 部门ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub dept_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// 跨模块关系通过手动查询处理

impl ActiveModelBehavior for ActiveModel {}
