//! Department service
//!
//! Implements department CRUD, tree assembly, and ancestry maintenance
//! on top of the entity layer. Callers (the web layer) own permission
//! checks and HTTP mapping.

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::ancestry::AncestorPath;
use crate::entity::department::{self, DelFlag, DepartmentTree, DeptStatus};
use crate::entity::{role_department, user};
use crate::error::{AppError, AppResult, OptionExt};

/// Maximum department name length (matches the column width)
const MAX_NAME_LEN: usize = 64;

/// Filter parameters for the flat department listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentQuery {
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
    #[serde(rename = "deptName")]
    pub name: Option<String>,
    pub status: Option<i32>,
}

/// Query parameters for the paginated department listing
#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentPageQuery {
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
    #[serde(rename = "deptName")]
    pub name: Option<String>,
    pub status: Option<i32>,
    /// Creation-time window start, `YYYY-MM-DD`
    #[serde(rename = "beginTime")]
    pub begin_time: Option<String>,
    /// Creation-time window end, `YYYY-MM-DD`, inclusive
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    #[serde(rename = "pageNum", default = "default_page")]
    pub page: u64,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u64,
    #[serde(rename = "orderByColumn")]
    pub sort_by: Option<String>,
    /// "asc" or "desc"
    #[serde(rename = "isAsc")]
    pub sort_order: Option<String>,
}

impl Default for DepartmentPageQuery {
    fn default() -> Self {
        Self {
            parent_id: None,
            name: None,
            status: None,
            begin_time: None,
            end_time: None,
            page: default_page(),
            page_size: default_page_size(),
            sort_by: None,
            sort_order: None,
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    10
}

/// Create department request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDepartmentRequest {
    #[serde(rename = "parentId")]
    pub parent_id: i64,
    #[serde(rename = "deptName")]
    pub name: String,
    #[serde(rename = "orderNum")]
    pub order_num: i32,
    pub leader: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: Option<i32>,
}

/// Update department request
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDepartmentRequest {
    #[serde(rename = "deptId")]
    pub id: i64,
    #[serde(rename = "parentId")]
    pub parent_id: i64,
    #[serde(rename = "deptName")]
    pub name: String,
    #[serde(rename = "orderNum")]
    pub order_num: i32,
    pub leader: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: Option<i32>,
}

/// Department response
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentResponse {
    pub id: i64,
    #[serde(rename = "parentId")]
    pub parent_id: i64,
    pub ancestors: String,
    #[serde(rename = "deptName")]
    pub name: String,
    #[serde(rename = "orderNum")]
    pub order_num: i32,
    pub leader: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: i32,
    #[serde(rename = "parentName")]
    pub parent_name: Option<String>,
    #[serde(rename = "createTime")]
    pub create_time: chrono::DateTime<Utc>,
}

impl From<department::Model> for DepartmentResponse {
    fn from(m: department::Model) -> Self {
        Self {
            id: m.id,
            parent_id: m.parent_id,
            ancestors: m.ancestors,
            name: m.name,
            order_num: m.order_num,
            leader: m.leader,
            phone: m.phone,
            email: m.email,
            status: m.status,
            parent_name: None, // Filled in by get_department
            create_time: m.create_time,
        }
    }
}

impl DepartmentResponse {
    pub fn with_parent_name(mut self, parent_name: Option<String>) -> Self {
        self.parent_name = parent_name;
        self
    }
}

/// Paginated department listing
#[derive(Debug, Serialize)]
pub struct DepartmentPage {
    pub departments: Vec<DepartmentResponse>,
    pub total: u64,
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("department name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "department name must not exceed {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Map a client-supplied sort column to an entity column.
/// Unknown names fall back to the default `parent_id, order_num` order.
fn sort_column(name: &str) -> Option<department::Column> {
    match name {
        "deptName" => Some(department::Column::Name),
        "orderNum" => Some(department::Column::OrderNum),
        "createTime" => Some(department::Column::CreateTime),
        _ => None,
    }
}

fn parse_day(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {:?}", value)))
}

fn parse_stored_path(dept_id: i64, ancestors: &str) -> AppResult<AncestorPath> {
    ancestors
        .parse::<AncestorPath>()
        .map_err(|_| AppError::Internal(format!("corrupt ancestors on department {}", dept_id)))
}

/// Fetch one department, resolving the parent's name alongside.
pub async fn get_department(db: &DatabaseConnection, id: i64) -> AppResult<DepartmentResponse> {
    let dept = department::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found(format!("department {}", id))?;

    let parent_name = if dept.parent_id > 0 {
        department::Entity::find_by_id(dept.parent_id)
            .one(db)
            .await?
            .map(|p| p.name)
    } else {
        None
    };

    Ok(DepartmentResponse::from(dept).with_parent_name(parent_name))
}

/// List non-deleted departments with optional filters,
/// ordered by `parent_id, order_num` for tree assembly.
pub async fn list_departments(
    db: &DatabaseConnection,
    query: &DepartmentQuery,
) -> AppResult<Vec<department::Model>> {
    let mut find = department::Entity::find()
        .filter(department::Column::DelFlag.eq(i32::from(DelFlag::Present)));

    // parent_id 0 means "no parent filter", not "top-level only"
    if let Some(parent_id) = query.parent_id.filter(|id| *id > 0) {
        find = find.filter(department::Column::ParentId.eq(parent_id));
    }
    if let Some(name) = query.name.as_deref() {
        if !name.is_empty() {
            find = find.filter(department::Column::Name.contains(name));
        }
    }
    if let Some(status) = query.status {
        find = find.filter(department::Column::Status.eq(status));
    }

    Ok(find
        .order_by_asc(department::Column::ParentId)
        .order_by_asc(department::Column::OrderNum)
        .all(db)
        .await?)
}

/// Paginated department listing with filters, time window and sorting.
pub async fn page_departments(
    db: &DatabaseConnection,
    query: &DepartmentPageQuery,
) -> AppResult<DepartmentPage> {
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, 100);
    let offset = (page - 1) * page_size;

    let mut find = department::Entity::find()
        .filter(department::Column::DelFlag.eq(i32::from(DelFlag::Present)));

    if let Some(parent_id) = query.parent_id.filter(|id| *id > 0) {
        find = find.filter(department::Column::ParentId.eq(parent_id));
    }
    if let Some(name) = query.name.as_deref() {
        if !name.is_empty() {
            find = find.filter(department::Column::Name.contains(name));
        }
    }
    if let Some(status) = query.status {
        find = find.filter(department::Column::Status.eq(status));
    }
    if let Some(begin) = query.begin_time.as_deref() {
        let day = parse_day(begin)?;
        find = find.filter(
            department::Column::CreateTime.gte(day.and_time(NaiveTime::MIN).and_utc()),
        );
    }
    if let Some(end) = query.end_time.as_deref() {
        // Inclusive end: compare against the start of the following day
        let day = parse_day(end)?
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::Validation(format!("date out of range: {:?}", end)))?;
        find = find.filter(
            department::Column::CreateTime.lt(day.and_time(NaiveTime::MIN).and_utc()),
        );
    }

    let ordered = match query.sort_by.as_deref().and_then(sort_column) {
        Some(column) => {
            let order = if matches!(query.sort_order.as_deref(), Some("desc")) {
                Order::Desc
            } else {
                Order::Asc
            };
            find.clone().order_by(column, order)
        }
        None => find
            .clone()
            .order_by_asc(department::Column::ParentId)
            .order_by_asc(department::Column::OrderNum),
    };

    let departments = ordered
        .offset(offset)
        .limit(page_size)
        .all(db)
        .await?
        .into_iter()
        .map(DepartmentResponse::from)
        .collect();

    // Total over the filtered set, not the page
    let total = find.count(db).await?;

    Ok(DepartmentPage { departments, total })
}

/// All departments below `id`, at any depth, via ancestors membership.
///
/// Soft-deleted rows are included on purpose: a move must rebase them too,
/// or their paths go stale.
pub async fn descendants<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> AppResult<Vec<department::Model>> {
    Ok(department::Entity::find()
        .filter(Expr::cust_with_values(
            "? = ANY(string_to_array(ancestors, ','))",
            [id.to_string()],
        ))
        .all(conn)
        .await?)
}

/// Whether `name` is free among the non-deleted children of `parent_id`,
/// optionally ignoring one department (the row being edited).
pub async fn department_name_unique(
    db: &DatabaseConnection,
    name: &str,
    parent_id: i64,
    exclude_id: Option<i64>,
) -> AppResult<bool> {
    let mut find = department::Entity::find()
        .filter(department::Column::Name.eq(name))
        .filter(department::Column::ParentId.eq(parent_id))
        .filter(department::Column::DelFlag.eq(i32::from(DelFlag::Present)));

    if let Some(id) = exclude_id {
        find = find.filter(department::Column::Id.ne(id));
    }

    Ok(find.count(db).await? == 0)
}

/// Whether any non-deleted user is still assigned to the department.
pub async fn department_has_users(db: &DatabaseConnection, dept_id: i64) -> AppResult<bool> {
    let count = user::Entity::find()
        .filter(user::Column::DepartmentId.eq(dept_id))
        .filter(user::Column::DelFlag.eq(i32::from(DelFlag::Present)))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Count non-deleted departments by optional id and/or parent filters.
pub async fn count_departments(
    db: &DatabaseConnection,
    id: Option<i64>,
    parent_id: Option<i64>,
) -> AppResult<u64> {
    let mut find = department::Entity::find()
        .filter(department::Column::DelFlag.eq(i32::from(DelFlag::Present)));

    if let Some(id) = id.filter(|id| *id > 0) {
        find = find.filter(department::Column::Id.eq(id));
    }
    if let Some(parent_id) = parent_id.filter(|id| *id > 0) {
        find = find.filter(department::Column::ParentId.eq(parent_id));
    }

    Ok(find.count(db).await?)
}

/// Departments bound to a role through `org_role_department`,
/// rendered as `"{id}{name}"` labels for the role's data-scope picker.
pub async fn role_department_labels(
    db: &DatabaseConnection,
    role_id: i64,
) -> AppResult<Vec<String>> {
    let bindings = role_department::Entity::find()
        .filter(role_department::Column::RoleId.eq(role_id))
        .all(db)
        .await?;

    if bindings.is_empty() {
        return Ok(Vec::new());
    }

    let dept_ids: Vec<i64> = bindings.iter().map(|b| b.dept_id).collect();

    let departments = department::Entity::find()
        .filter(department::Column::Id.is_in(dept_ids))
        .filter(department::Column::DelFlag.eq(i32::from(DelFlag::Present)))
        .order_by_asc(department::Column::ParentId)
        .order_by_asc(department::Column::OrderNum)
        .all(db)
        .await?;

    Ok(departments
        .into_iter()
        .map(|d| format!("{}{}", d.id, d.name))
        .collect())
}

/// Assemble tree roots from a flat `parent_id, order_num` ordered list.
/// Nodes whose parent is absent from the list surface as roots.
pub fn build_department_tree(models: Vec<department::Model>) -> Vec<DepartmentTree> {
    use std::collections::{HashMap, HashSet};

    let ids: HashSet<i64> = models.iter().map(|m| m.id).collect();

    let mut roots: Vec<department::Model> = Vec::new();
    let mut by_parent: HashMap<i64, Vec<department::Model>> = HashMap::new();
    for model in models {
        if ids.contains(&model.parent_id) {
            by_parent.entry(model.parent_id).or_default().push(model);
        } else {
            roots.push(model);
        }
    }

    fn attach(
        model: department::Model,
        by_parent: &mut std::collections::HashMap<i64, Vec<department::Model>>,
    ) -> DepartmentTree {
        let children = by_parent.remove(&model.id).unwrap_or_default();
        let mut node = DepartmentTree::from(model);
        node.children = children
            .into_iter()
            .map(|child| attach(child, by_parent))
            .collect();
        node
    }

    roots
        .into_iter()
        .map(|root| attach(root, &mut by_parent))
        .collect()
}

/// Create a department under an existing, non-disabled parent.
/// The ancestors path is derived from the parent, never caller-supplied.
pub async fn create_department(
    db: &DatabaseConnection,
    req: &CreateDepartmentRequest,
    operator: &str,
) -> AppResult<department::Model> {
    validate_name(&req.name)?;

    let ancestors = if req.parent_id == 0 {
        AncestorPath::root()
    } else {
        let parent = department::Entity::find_by_id(req.parent_id)
            .one(db)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_not_found(format!("parent department {}", req.parent_id))?;
        if parent.is_disabled() {
            return Err(AppError::Conflict(format!(
                "parent department is disabled: {}",
                parent.name
            )));
        }
        parse_stored_path(parent.id, &parent.ancestors)?.child(parent.id)
    };

    if !department_name_unique(db, &req.name, req.parent_id, None).await? {
        return Err(AppError::Conflict(format!(
            "department name already exists: {}",
            req.name
        )));
    }

    let model = department::ActiveModel {
        parent_id: Set(req.parent_id),
        ancestors: Set(ancestors.to_string()),
        name: Set(req.name.clone()),
        order_num: Set(req.order_num),
        leader: Set(req.leader.clone()),
        phone: Set(req.phone.clone()),
        email: Set(req.email.clone()),
        status: Set(req.status.unwrap_or_else(|| i32::from(DeptStatus::Normal))),
        del_flag: Set(i32::from(DelFlag::Present)),
        create_by: Set(operator.to_string()),
        create_time: Set(Utc::now()),
        ..Default::default()
    };

    let dept = model.insert(db).await?;
    tracing::info!(id = dept.id, name = %dept.name, "department created");
    Ok(dept)
}

/// Update a department. A changed `parent_id` is a move: the department's
/// path is recomputed and every descendant is rebased inside one transaction.
pub async fn update_department(
    db: &DatabaseConnection,
    req: &UpdateDepartmentRequest,
    operator: &str,
) -> AppResult<department::Model> {
    validate_name(&req.name)?;
    if req.id == req.parent_id {
        return Err(AppError::Validation(
            "a department can not be its own parent".to_string(),
        ));
    }

    let existing = department::Entity::find_by_id(req.id)
        .one(db)
        .await?
        .filter(|d| !d.is_deleted())
        .ok_or_not_found(format!("department {}", req.id))?;

    if !department_name_unique(db, &req.name, req.parent_id, Some(req.id)).await? {
        return Err(AppError::Conflict(format!(
            "department name already exists: {}",
            req.name
        )));
    }

    if req.parent_id == existing.parent_id {
        let model = department::ActiveModel {
            id: Set(req.id),
            name: Set(req.name.clone()),
            order_num: Set(req.order_num),
            leader: Set(req.leader.clone()),
            phone: Set(req.phone.clone()),
            email: Set(req.email.clone()),
            status: Set(req.status.unwrap_or(existing.status)),
            update_by: Set(Some(operator.to_string())),
            update_time: Set(Some(Utc::now())),
            ..Default::default()
        };
        let dept = model.update(db).await?;
        tracing::info!(id = dept.id, name = %dept.name, "department updated");
        return Ok(dept);
    }

    move_department(db, &existing, req, operator).await
}

/// Re-parent a department, rebasing all descendant paths atomically.
async fn move_department(
    db: &DatabaseConnection,
    existing: &department::Model,
    req: &UpdateDepartmentRequest,
    operator: &str,
) -> AppResult<department::Model> {
    let new_path = if req.parent_id == 0 {
        AncestorPath::root()
    } else {
        let parent = department::Entity::find_by_id(req.parent_id)
            .one(db)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_not_found(format!("parent department {}", req.parent_id))?;
        let parent_path = parse_stored_path(parent.id, &parent.ancestors)?;
        if parent_path.contains(existing.id) {
            return Err(AppError::Validation(
                "a department can not be moved under its own descendant".to_string(),
            ));
        }
        parent_path.child(parent.id)
    };

    let old_path = parse_stored_path(existing.id, &existing.ancestors)?;

    let txn = db.begin().await?;

    let updated = department::ActiveModel {
        id: Set(existing.id),
        parent_id: Set(req.parent_id),
        ancestors: Set(new_path.to_string()),
        name: Set(req.name.clone()),
        order_num: Set(req.order_num),
        leader: Set(req.leader.clone()),
        phone: Set(req.phone.clone()),
        email: Set(req.email.clone()),
        status: Set(req.status.unwrap_or(existing.status)),
        update_by: Set(Some(operator.to_string())),
        update_time: Set(Some(Utc::now())),
        ..Default::default()
    }
    .update(&txn)
    .await?;

    rebase_descendants(&txn, existing.id, &old_path, &new_path).await?;

    txn.commit().await?;

    tracing::info!(
        id = existing.id,
        from = %old_path,
        to = %new_path,
        "department moved"
    );
    Ok(updated)
}

/// Rewrite descendant ancestor paths from `old_prefix` to `new_prefix`.
/// Rows whose stored path does not start with the old prefix on whole
/// segments are left untouched.
async fn rebase_descendants(
    txn: &DatabaseTransaction,
    dept_id: i64,
    old_prefix: &AncestorPath,
    new_prefix: &AncestorPath,
) -> AppResult<()> {
    let children = descendants(txn, dept_id).await?;

    for child in children {
        let path = match child.ancestors.parse::<AncestorPath>() {
            Ok(path) => path,
            Err(_) => {
                tracing::warn!(
                    id = child.id,
                    ancestors = %child.ancestors,
                    "skipping descendant with corrupt ancestors"
                );
                continue;
            }
        };

        let rebased = match path.rebase(old_prefix, new_prefix) {
            Some(rebased) => rebased,
            None => {
                tracing::warn!(
                    id = child.id,
                    ancestors = %child.ancestors,
                    "descendant path does not start with the old prefix, skipping"
                );
                continue;
            }
        };

        department::ActiveModel {
            id: Set(child.id),
            ancestors: Set(rebased.to_string()),
            ..Default::default()
        }
        .update(txn)
        .await?;
    }

    Ok(())
}

/// Soft-delete a department. Refused while non-deleted children remain
/// or users are still assigned.
pub async fn delete_department(
    db: &DatabaseConnection,
    id: i64,
    operator: &str,
) -> AppResult<()> {
    let dept = department::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|d| !d.is_deleted())
        .ok_or_not_found(format!("department {}", id))?;

    let child_count = department::Entity::find()
        .filter(department::Column::ParentId.eq(id))
        .filter(department::Column::DelFlag.eq(i32::from(DelFlag::Present)))
        .count(db)
        .await?;
    if child_count > 0 {
        return Err(AppError::Conflict(
            "department has child departments".to_string(),
        ));
    }

    if department_has_users(db, id).await? {
        return Err(AppError::Conflict(
            "department still has users assigned".to_string(),
        ));
    }

    department::ActiveModel {
        id: Set(id),
        del_flag: Set(i32::from(DelFlag::Deleted)),
        update_by: Set(Some(operator.to_string())),
        update_time: Set(Some(Utc::now())),
        ..Default::default()
    }
    .update(db)
    .await?;

    tracing::info!(id, name = %dept.name, "department deleted");
    Ok(())
}
