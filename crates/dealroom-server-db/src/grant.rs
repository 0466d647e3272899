// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Grant repository for database operations.
//!
//! Two tables live here:
//! - `project_access_grants`: blanket per-project access rows
//! - `permissions`: per-resource override rows keyed by (resource_id, user_id)

use async_trait::async_trait;
use chrono::Utc;
use dealroom_access_core::{
	grant::{PermissionOverride, ProjectAccessGrant},
	OrgId, Permission, ProjectId, ResourceId, UserId,
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait GrantStore: Send + Sync {
	async fn upsert_grant(&self, grant: &ProjectAccessGrant) -> Result<(), DbError>;
	async fn get_grant(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<Option<ProjectAccessGrant>, DbError>;
	async fn list_grants_for_project(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<ProjectAccessGrant>, DbError>;
	async fn delete_grant(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<bool, DbError>;
	async fn delete_grants_for_user_in_org(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<u64, DbError>;
	async fn delete_grants_for_project(&self, project_id: &ProjectId) -> Result<u64, DbError>;
	async fn upsert_override(&self, permission_override: &PermissionOverride) -> Result<(), DbError>;
	async fn get_override(
		&self,
		resource_id: &ResourceId,
		user_id: &UserId,
	) -> Result<Option<PermissionOverride>, DbError>;
	async fn list_overrides_for_project(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<PermissionOverride>, DbError>;
	async fn delete_overrides_for_user_in_org(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<u64, DbError>;
	async fn delete_overrides_for_user_in_project(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<u64, DbError>;
}

/// Repository for access grant and permission override database operations.
#[derive(Clone)]
pub struct GrantRepository {
	pool: SqlitePool,
}

impl GrantRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Project access grants
	// =========================================================================

	/// Insert or refresh a blanket access grant.
	///
	/// Re-granting keeps the row keyed by (project_id, user_id) and updates
	/// the grantor and timestamp. Last write wins.
	#[tracing::instrument(skip(self, grant), fields(project_id = %grant.project_id, user_id = %grant.user_id))]
	pub async fn upsert_grant(&self, grant: &ProjectAccessGrant) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO project_access_grants (project_id, user_id, org_id, granted_by, created_at)
			VALUES (?, ?, ?, ?, ?)
			ON CONFLICT (project_id, user_id) DO UPDATE SET
				granted_by = excluded.granted_by,
				created_at = excluded.created_at
			"#,
		)
		.bind(grant.project_id.to_string())
		.bind(grant.user_id.to_string())
		.bind(grant.org_id.to_string())
		.bind(grant.granted_by.to_string())
		.bind(grant.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(project_id = %grant.project_id, user_id = %grant.user_id, "access grant upserted");
		Ok(())
	}

	/// Get the access grant for a user on a project.
	///
	/// # Returns
	/// `None` if the user holds no grant for this project.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, user_id = %user_id))]
	pub async fn get_grant(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<Option<ProjectAccessGrant>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT project_id, user_id, org_id, granted_by, created_at
			FROM project_access_grants
			WHERE project_id = ? AND user_id = ?
			"#,
		)
		.bind(project_id.to_string())
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_grant(&r)).transpose()
	}

	/// List every access grant on a project.
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn list_grants_for_project(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<ProjectAccessGrant>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT project_id, user_id, org_id, granted_by, created_at
			FROM project_access_grants
			WHERE project_id = ?
			ORDER BY created_at ASC
			"#,
		)
		.bind(project_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut result = Vec::with_capacity(rows.len());
		for row in &rows {
			result.push(self.row_to_grant(row)?);
		}
		tracing::debug!(project_id = %project_id, count = result.len(), "listed project access grants");
		Ok(result)
	}

	/// Delete the access grant for a user on a project.
	///
	/// # Returns
	/// `true` if a grant was deleted, `false` if not found.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, user_id = %user_id))]
	pub async fn delete_grant(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM project_access_grants
			WHERE project_id = ? AND user_id = ?
			"#,
		)
		.bind(project_id.to_string())
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	/// Delete every access grant a user holds through an organization.
	///
	/// # Returns
	/// Number of grants deleted.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id))]
	pub async fn delete_grants_for_user_in_org(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<u64, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM project_access_grants
			WHERE org_id = ? AND user_id = ?
			"#,
		)
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected();
		if deleted > 0 {
			tracing::debug!(org_id = %org_id, user_id = %user_id, deleted, "removed user access grants in org");
		}
		Ok(deleted)
	}

	/// Delete every access grant on a project.
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn delete_grants_for_project(&self, project_id: &ProjectId) -> Result<u64, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM project_access_grants
			WHERE project_id = ?
			"#,
		)
		.bind(project_id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected())
	}

	// =========================================================================
	// Permission overrides
	// =========================================================================

	/// Insert or replace a per-resource override.
	///
	/// Keyed by (resource_id, user_id); a repeated set replaces the level.
	/// Last write wins.
	#[tracing::instrument(skip(self, permission_override), fields(resource_id = %permission_override.resource_id, user_id = %permission_override.user_id, permission = %permission_override.permission))]
	pub async fn upsert_override(
		&self,
		permission_override: &PermissionOverride,
	) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO permissions (resource_id, user_id, permission, granted_by, updated_at)
			VALUES (?, ?, ?, ?, ?)
			ON CONFLICT (resource_id, user_id) DO UPDATE SET
				permission = excluded.permission,
				granted_by = excluded.granted_by,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(permission_override.resource_id.to_string())
		.bind(permission_override.user_id.to_string())
		.bind(permission_override.permission.to_string())
		.bind(permission_override.granted_by.to_string())
		.bind(permission_override.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(
			resource_id = %permission_override.resource_id,
			user_id = %permission_override.user_id,
			permission = %permission_override.permission,
			"permission override upserted"
		);
		Ok(())
	}

	/// Get the override row for a user on a resource.
	///
	/// # Returns
	/// `None` if no override is recorded.
	#[tracing::instrument(skip(self), fields(resource_id = %resource_id, user_id = %user_id))]
	pub async fn get_override(
		&self,
		resource_id: &ResourceId,
		user_id: &UserId,
	) -> Result<Option<PermissionOverride>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT resource_id, user_id, permission, granted_by, updated_at
			FROM permissions
			WHERE resource_id = ? AND user_id = ?
			"#,
		)
		.bind(resource_id.to_string())
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_override(&r)).transpose()
	}

	/// List every override on a project's resources.
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn list_overrides_for_project(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<PermissionOverride>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT p.resource_id, p.user_id, p.permission, p.granted_by, p.updated_at
			FROM permissions p
			INNER JOIN resources r ON p.resource_id = r.id
			WHERE r.project_id = ?
			"#,
		)
		.bind(project_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut result = Vec::with_capacity(rows.len());
		for row in &rows {
			result.push(self.row_to_override(row)?);
		}
		tracing::debug!(project_id = %project_id, count = result.len(), "listed project overrides");
		Ok(result)
	}

	/// Delete every override a user holds on an organization's resources.
	///
	/// # Returns
	/// Number of overrides deleted.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id))]
	pub async fn delete_overrides_for_user_in_org(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<u64, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM permissions
			WHERE user_id = ?
				AND resource_id IN (SELECT id FROM resources WHERE org_id = ?)
			"#,
		)
		.bind(user_id.to_string())
		.bind(org_id.to_string())
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected();
		if deleted > 0 {
			tracing::debug!(org_id = %org_id, user_id = %user_id, deleted, "removed user overrides in org");
		}
		Ok(deleted)
	}

	/// Delete every override a user holds on a single project's resources.
	///
	/// # Returns
	/// Number of overrides deleted.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, user_id = %user_id))]
	pub async fn delete_overrides_for_user_in_project(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<u64, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM permissions
			WHERE user_id = ?
				AND resource_id IN (SELECT id FROM resources WHERE project_id = ?)
			"#,
		)
		.bind(user_id.to_string())
		.bind(project_id.to_string())
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected();
		if deleted > 0 {
			tracing::debug!(project_id = %project_id, user_id = %user_id, deleted, "removed user overrides in project");
		}
		Ok(deleted)
	}

	// =========================================================================
	// Row mappers
	// =========================================================================

	fn row_to_grant(&self, row: &sqlx::sqlite::SqliteRow) -> Result<ProjectAccessGrant, DbError> {
		let project_id_str: String = row.get("project_id");
		let user_id_str: String = row.get("user_id");
		let org_id_str: String = row.get("org_id");
		let granted_by_str: String = row.get("granted_by");
		let created_at: String = row.get("created_at");

		let project_id = Uuid::parse_str(&project_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid project_id: {e}")))?;
		let user_id = Uuid::parse_str(&user_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid user_id: {e}")))?;
		let org_id = Uuid::parse_str(&org_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid org_id: {e}")))?;
		let granted_by = Uuid::parse_str(&granted_by_str)
			.map_err(|e| DbError::Internal(format!("Invalid granted_by: {e}")))?;

		Ok(ProjectAccessGrant {
			project_id: ProjectId::new(project_id),
			user_id: UserId::new(user_id),
			org_id: OrgId::new(org_id),
			granted_by: UserId::new(granted_by),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}

	fn row_to_override(&self, row: &sqlx::sqlite::SqliteRow) -> Result<PermissionOverride, DbError> {
		let resource_id_str: String = row.get("resource_id");
		let user_id_str: String = row.get("user_id");
		let permission_str: String = row.get("permission");
		let granted_by_str: String = row.get("granted_by");
		let updated_at: String = row.get("updated_at");

		let resource_id = Uuid::parse_str(&resource_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid resource_id: {e}")))?;
		let user_id = Uuid::parse_str(&user_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid user_id: {e}")))?;
		let granted_by = Uuid::parse_str(&granted_by_str)
			.map_err(|e| DbError::Internal(format!("Invalid granted_by: {e}")))?;
		let permission = match permission_str.as_str() {
			"view" => Permission::View,
			"edit" => Permission::Edit,
			_ => Permission::None,
		};

		Ok(PermissionOverride {
			resource_id: ResourceId::new(resource_id),
			user_id: UserId::new(user_id),
			permission,
			granted_by: UserId::new(granted_by),
			updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
				.map_err(|e| DbError::Internal(format!("Invalid updated_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl GrantStore for GrantRepository {
	async fn upsert_grant(&self, grant: &ProjectAccessGrant) -> Result<(), DbError> {
		self.upsert_grant(grant).await
	}

	async fn get_grant(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<Option<ProjectAccessGrant>, DbError> {
		self.get_grant(project_id, user_id).await
	}

	async fn list_grants_for_project(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<ProjectAccessGrant>, DbError> {
		self.list_grants_for_project(project_id).await
	}

	async fn delete_grant(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<bool, DbError> {
		self.delete_grant(project_id, user_id).await
	}

	async fn delete_grants_for_user_in_org(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<u64, DbError> {
		self.delete_grants_for_user_in_org(org_id, user_id).await
	}

	async fn delete_grants_for_project(&self, project_id: &ProjectId) -> Result<u64, DbError> {
		self.delete_grants_for_project(project_id).await
	}

	async fn upsert_override(&self, permission_override: &PermissionOverride) -> Result<(), DbError> {
		self.upsert_override(permission_override).await
	}

	async fn get_override(
		&self,
		resource_id: &ResourceId,
		user_id: &UserId,
	) -> Result<Option<PermissionOverride>, DbError> {
		self.get_override(resource_id, user_id).await
	}

	async fn list_overrides_for_project(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<PermissionOverride>, DbError> {
		self.list_overrides_for_project(project_id).await
	}

	async fn delete_overrides_for_user_in_org(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<u64, DbError> {
		self.delete_overrides_for_user_in_org(org_id, user_id).await
	}

	async fn delete_overrides_for_user_in_project(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<u64, DbError> {
		self
			.delete_overrides_for_user_in_project(project_id, user_id)
			.await
	}
}
