//! User entity - 用户表
//!
//! 表名: org_user
//!
//! 本 crate 只关心用户与部门的归属关系, 字段裁剪到部门侧查询所需的最小集合。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "org_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 用户名 (唯一)
    #[sea_orm(column_type = "String(Some(32))", unique)]
    pub username: String,

    /// 全名
    #[sea_orm(column_type = "String(Some(64))")]
    pub full_name: String,

    /// 部门ID
    pub department_id: i64,

    /// 用户状态: 0=未激活, 1=正常, 2=禁用
    pub status: i32,

    /// 删除标志: 0=存在, 2=已删除
    pub del_flag: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// 跨模块关系通过手动查询处理, 避免循环依赖

impl ActiveModelBehavior for ActiveModel {}
