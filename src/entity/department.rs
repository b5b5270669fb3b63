//! Department entity - 部门表
//!
//! 表名: org_department

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 部门状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeptStatus {
    /// 正常
    Normal = 0,
    /// 停用
    Disabled = 1,
}

impl From<i32> for DeptStatus {
    fn from(value: i32) -> Self {
        match value {
            1 => DeptStatus::Disabled,
            _ => DeptStatus::Normal,
        }
    }
}

impl From<DeptStatus> for i32 {
    fn from(status: DeptStatus) -> Self {
        status as i32
    }
}

/// 删除标志
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelFlag {
    /// 存在
    Present = 0,
    /// 已删除
    Deleted = 2,
}

impl From<i32> for DelFlag {
    fn from(value: i32) -> Self {
        match value {
            2 => DelFlag::Deleted,
            _ => DelFlag::Present,
        }
    }
}

impl From<DelFlag> for i32 {
    fn from(flag: DelFlag) -> Self {
        flag as i32
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "org_department")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 父部门ID (0 表示顶级部门)
    pub parent_id: i64,

    /// 祖级列表, 逗号分隔的祖先ID链, 顶级部门为 "0"
    #[sea_orm(column_type = "String(Some(255))")]
    pub ancestors: String,

    /// 部门名称
    #[sea_orm(column_type = "String(Some(64))")]
    pub name: String,

    /// 显示顺序
    pub order_num: i32,

    /// 负责人
    #[sea_orm(column_type = "String(Some(32))", nullable)]
    pub leader: Option<String>,

    /// 联系电话
    #[sea_orm(column_type = "String(Some(20))", nullable)]
    pub phone: Option<String>,

    /// 邮箱
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub email: Option<String>,

    /// 部门状态: 0=正常, 1=停用
    pub status: i32,

    /// 删除标志: 0=存在, 2=已删除
    pub del_flag: i32,

    /// 创建者
    #[sea_orm(column_type = "String(Some(32))")]
    pub create_by: String,

    /// 创建时间
    pub create_time: DateTimeUtc,

    /// 更新者
    #[sea_orm(column_type = "String(Some(32))", nullable)]
    pub update_by: Option<String>,

    /// 更新时间
    #[sea_orm(nullable)]
    pub update_time: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// 自引用和跨模块关系通过手动查询处理

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 是否已被软删除
    pub fn is_deleted(&self) -> bool {
        DelFlag::from(self.del_flag) == DelFlag::Deleted
    }

    /// 是否处于停用状态
    pub fn is_disabled(&self) -> bool {
        DeptStatus::from(self.status) == DeptStatus::Disabled
    }
}

/// 部门树节点 (用于API响应)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepartmentTree {
    pub id: i64,
    #[serde(rename = "parentId")]
    pub parent_id: i64,
    pub name: String,
    #[serde(rename = "orderNum")]
    pub order_num: i32,
    pub status: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DepartmentTree>,
}

impl From<Model> for DepartmentTree {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            parent_id: model.parent_id,
            name: model.name,
            order_num: model.order_num,
            status: model.status,
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(DeptStatus::from(0), DeptStatus::Normal);
        assert_eq!(DeptStatus::from(1), DeptStatus::Disabled);
        // Unknown codes fall back to Normal
        assert_eq!(DeptStatus::from(9), DeptStatus::Normal);
        assert_eq!(i32::from(DeptStatus::Disabled), 1);
    }

    #[test]
    fn test_del_flag_roundtrip() {
        assert_eq!(DelFlag::from(0), DelFlag::Present);
        assert_eq!(DelFlag::from(2), DelFlag::Deleted);
        assert_eq!(i32::from(DelFlag::Deleted), 2);
    }

    #[test]
    fn test_tree_node_serializes_camel_case() {
        let node = DepartmentTree {
            id: 101,
            parent_id: 100,
            name: "研发部".to_string(),
            order_num: 1,
            status: 0,
            children: Vec::new(),
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["parentId"], 100);
        assert_eq!(json["orderNum"], 1);
        // Empty children are omitted from the wire form
        assert!(json.get("children").is_none());
    }
}
