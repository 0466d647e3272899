// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Resource repository for database operations.
//!
//! Resources form the per-project document tree: fixed root containers
//! (docs roots, resumes, OM) plus user-created folders and files hanging
//! off them.

use async_trait::async_trait;
use chrono::Utc;
use dealroom_access_core::{
	project::Project, resource::Resource, OrgId, ProjectId, ResourceId, ResourceType,
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait ResourceStore: Send + Sync {
	async fn create_resource(&self, resource: &Resource) -> Result<(), DbError>;
	async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>, DbError>;
	async fn list_resources_for_project(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<Resource>, DbError>;
	async fn ensure_project_roots(&self, project: &Project) -> Result<Vec<Resource>, DbError>;
	async fn delete_resource_subtree(&self, id: &ResourceId) -> Result<u64, DbError>;
	async fn delete_resources_for_project(&self, project_id: &ProjectId) -> Result<u64, DbError>;
}

/// Repository for resource database operations.
#[derive(Clone)]
pub struct ResourceRepository {
	pool: SqlitePool,
}

impl ResourceRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a new resource.
	///
	/// # Errors
	/// Returns `DbError::Sqlx` if insert fails (e.g., duplicate ID).
	#[tracing::instrument(skip(self, resource), fields(resource_id = %resource.id, project_id = %resource.project_id, resource_type = %resource.resource_type))]
	pub async fn create_resource(&self, resource: &Resource) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO resources (id, org_id, project_id, resource_type, parent_id, name, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(resource.id.to_string())
		.bind(resource.org_id.to_string())
		.bind(resource.project_id.to_string())
		.bind(resource.resource_type.to_string())
		.bind(resource.parent_id.map(|p| p.to_string()))
		.bind(&resource.name)
		.bind(resource.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(resource_id = %resource.id, "resource created");
		Ok(())
	}

	/// Get a resource by ID.
	///
	/// # Returns
	/// `None` if no resource exists with this ID.
	#[tracing::instrument(skip(self), fields(resource_id = %id))]
	pub async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, org_id, project_id, resource_type, parent_id, name, created_at
			FROM resources
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_resource(&r)).transpose()
	}

	/// List every resource in a project.
	///
	/// The full set feeds the in-memory tree, so no pagination.
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn list_resources_for_project(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<Resource>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, org_id, project_id, resource_type, parent_id, name, created_at
			FROM resources
			WHERE project_id = ?
			ORDER BY created_at ASC
			"#,
		)
		.bind(project_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut result = Vec::with_capacity(rows.len());
		for row in &rows {
			result.push(self.row_to_resource(row)?);
		}
		tracing::debug!(project_id = %project_id, count = result.len(), "listed project resources");
		Ok(result)
	}

	/// Ensure the fixed root containers exist for a project.
	///
	/// Creates any missing roots and leaves existing ones untouched, so the
	/// call is safe to repeat. Returns the full set of root resources after
	/// the fill-in.
	#[tracing::instrument(skip(self, project), fields(project_id = %project.id))]
	pub async fn ensure_project_roots(&self, project: &Project) -> Result<Vec<Resource>, DbError> {
		let existing = sqlx::query(
			r#"
			SELECT id, org_id, project_id, resource_type, parent_id, name, created_at
			FROM resources
			WHERE project_id = ? AND parent_id IS NULL
			"#,
		)
		.bind(project.id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut roots = Vec::with_capacity(ResourceType::roots().len());
		for row in &existing {
			roots.push(self.row_to_resource(row)?);
		}

		let mut created = 0u32;
		for root_type in ResourceType::roots() {
			if roots.iter().any(|r| r.resource_type == *root_type) {
				continue;
			}
			let root = Resource::new_root(project.owner_org_id, project.id, *root_type);
			self.create_resource(&root).await?;
			roots.push(root);
			created += 1;
		}

		if created > 0 {
			tracing::debug!(project_id = %project.id, created, "created missing project roots");
		}
		Ok(roots)
	}

	/// Delete a resource and every descendant, along with their permission rows.
	///
	/// # Returns
	/// Number of resources deleted (0 if the ID does not exist).
	#[tracing::instrument(skip(self), fields(resource_id = %id))]
	pub async fn delete_resource_subtree(&self, id: &ResourceId) -> Result<u64, DbError> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			DELETE FROM permissions
			WHERE resource_id IN (
				WITH RECURSIVE subtree(id) AS (
					SELECT id FROM resources WHERE id = ?
					UNION ALL
					SELECT r.id FROM resources r
					INNER JOIN subtree s ON r.parent_id = s.id
				)
				SELECT id FROM subtree
			)
			"#,
		)
		.bind(id.to_string())
		.execute(&mut *tx)
		.await?;

		let result = sqlx::query(
			r#"
			DELETE FROM resources
			WHERE id IN (
				WITH RECURSIVE subtree(id) AS (
					SELECT id FROM resources WHERE id = ?
					UNION ALL
					SELECT r.id FROM resources r
					INNER JOIN subtree s ON r.parent_id = s.id
				)
				SELECT id FROM subtree
			)
			"#,
		)
		.bind(id.to_string())
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		let deleted = result.rows_affected();
		tracing::debug!(resource_id = %id, deleted, "resource subtree deleted");
		Ok(deleted)
	}

	/// Delete every resource in a project, along with their permission rows.
	///
	/// # Returns
	/// Number of resources deleted.
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn delete_resources_for_project(
		&self,
		project_id: &ProjectId,
	) -> Result<u64, DbError> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			DELETE FROM permissions
			WHERE resource_id IN (SELECT id FROM resources WHERE project_id = ?)
			"#,
		)
		.bind(project_id.to_string())
		.execute(&mut *tx)
		.await?;

		let result = sqlx::query(
			r#"
			DELETE FROM resources
			WHERE project_id = ?
			"#,
		)
		.bind(project_id.to_string())
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(result.rows_affected())
	}

	fn row_to_resource(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Resource, DbError> {
		let id_str: String = row.get("id");
		let org_id_str: String = row.get("org_id");
		let project_id_str: String = row.get("project_id");
		let type_str: String = row.get("resource_type");
		let parent_str: Option<String> = row.get("parent_id");
		let created_at: String = row.get("created_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid resource ID: {e}")))?;
		let org_id = Uuid::parse_str(&org_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid org_id: {e}")))?;
		let project_id = Uuid::parse_str(&project_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid project_id: {e}")))?;
		let parent_id = parent_str
			.map(|s| {
				Uuid::parse_str(&s)
					.map(ResourceId::new)
					.map_err(|e| DbError::Internal(format!("Invalid parent_id: {e}")))
			})
			.transpose()?;
		let resource_type = Self::parse_resource_type(&type_str)?;

		Ok(Resource {
			id: ResourceId::new(id),
			org_id: OrgId::new(org_id),
			project_id: ProjectId::new(project_id),
			resource_type,
			parent_id,
			name: row.get("name"),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}

	fn parse_resource_type(value: &str) -> Result<ResourceType, DbError> {
		match value {
			"PROJECT_DOCS_ROOT" => Ok(ResourceType::ProjectDocsRoot),
			"BORROWER_DOCS_ROOT" => Ok(ResourceType::BorrowerDocsRoot),
			"PROJECT_RESUME" => Ok(ResourceType::ProjectResume),
			"BORROWER_RESUME" => Ok(ResourceType::BorrowerResume),
			"OM" => Ok(ResourceType::Om),
			"FOLDER" => Ok(ResourceType::Folder),
			"FILE" => Ok(ResourceType::File),
			other => Err(DbError::Internal(format!(
				"Unknown resource type: {other}"
			))),
		}
	}
}

#[async_trait]
impl ResourceStore for ResourceRepository {
	async fn create_resource(&self, resource: &Resource) -> Result<(), DbError> {
		self.create_resource(resource).await
	}

	async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>, DbError> {
		self.get_resource(id).await
	}

	async fn list_resources_for_project(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<Resource>, DbError> {
		self.list_resources_for_project(project_id).await
	}

	async fn ensure_project_roots(&self, project: &Project) -> Result<Vec<Resource>, DbError> {
		self.ensure_project_roots(project).await
	}

	async fn delete_resource_subtree(&self, id: &ResourceId) -> Result<u64, DbError> {
		self.delete_resource_subtree(id).await
	}

	async fn delete_resources_for_project(&self, project_id: &ProjectId) -> Result<u64, DbError> {
		self.delete_resources_for_project(project_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_project_test_pool;
	use dealroom_access_core::org::Organization;
	use dealroom_access_core::{EntityType, Permission, UserId};

	async fn seed_project(pool: &SqlitePool) -> Project {
		let org = Organization::new("Resource Test Org", EntityType::Borrower);
		sqlx::query("INSERT INTO orgs (id, name, entity_type, created_at) VALUES (?, ?, ?, ?)")
			.bind(org.id.to_string())
			.bind(&org.name)
			.bind(org.entity_type.to_string())
			.bind(org.created_at.to_rfc3339())
			.execute(pool)
			.await
			.unwrap();

		let project = Project::new("Resource Test Project", org.id);
		sqlx::query(
			"INSERT INTO projects (id, name, owner_org_id, assigned_advisor_id, created_at) VALUES (?, ?, ?, NULL, ?)",
		)
		.bind(project.id.to_string())
		.bind(&project.name)
		.bind(project.owner_org_id.to_string())
		.bind(project.created_at.to_rfc3339())
		.execute(pool)
		.await
		.unwrap();

		project
	}

	async fn insert_permission_row(pool: &SqlitePool, resource_id: &ResourceId, user_id: &UserId) {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			"INSERT INTO permissions (resource_id, user_id, permission, granted_by, updated_at) VALUES (?, ?, ?, ?, ?)",
		)
		.bind(resource_id.to_string())
		.bind(user_id.to_string())
		.bind(Permission::View.to_string())
		.bind(user_id.to_string())
		.bind(&now)
		.execute(pool)
		.await
		.unwrap();
	}

	async fn count_permission_rows(pool: &SqlitePool) -> i64 {
		let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM permissions")
			.fetch_one(pool)
			.await
			.unwrap();
		row.0
	}

	#[tokio::test]
	async fn test_create_and_get_resource() {
		let pool = create_project_test_pool().await;
		let repo = ResourceRepository::new(pool.clone());
		let project = seed_project(&pool).await;

		let root = Resource::new_root(project.owner_org_id, project.id, ResourceType::ProjectDocsRoot);
		repo.create_resource(&root).await.unwrap();

		let folder = Resource::new_child(
			project.owner_org_id,
			project.id,
			ResourceType::Folder,
			root.id,
			"Financials",
		);
		repo.create_resource(&folder).await.unwrap();

		let fetched = repo.get_resource(&folder.id).await.unwrap().unwrap();
		assert_eq!(fetched.id, folder.id);
		assert_eq!(fetched.resource_type, ResourceType::Folder);
		assert_eq!(fetched.parent_id, Some(root.id));
		assert_eq!(fetched.name, "Financials");

		let fetched_root = repo.get_resource(&root.id).await.unwrap().unwrap();
		assert!(fetched_root.parent_id.is_none());
	}

	#[tokio::test]
	async fn test_get_resource_not_found() {
		let pool = create_project_test_pool().await;
		let repo = ResourceRepository::new(pool);

		let result = repo.get_resource(&ResourceId::generate()).await.unwrap();
		assert!(result.is_none());
	}

	#[tokio::test]
	async fn test_ensure_project_roots_creates_all_five() {
		let pool = create_project_test_pool().await;
		let repo = ResourceRepository::new(pool.clone());
		let project = seed_project(&pool).await;

		let roots = repo.ensure_project_roots(&project).await.unwrap();
		assert_eq!(roots.len(), ResourceType::roots().len());
		for root_type in ResourceType::roots() {
			assert!(roots.iter().any(|r| r.resource_type == *root_type));
		}
		assert!(roots.iter().all(|r| r.parent_id.is_none()));
	}

	#[tokio::test]
	async fn test_ensure_project_roots_is_idempotent() {
		let pool = create_project_test_pool().await;
		let repo = ResourceRepository::new(pool.clone());
		let project = seed_project(&pool).await;

		let first = repo.ensure_project_roots(&project).await.unwrap();
		let second = repo.ensure_project_roots(&project).await.unwrap();

		assert_eq!(first.len(), second.len());
		let mut first_ids: Vec<String> = first.iter().map(|r| r.id.to_string()).collect();
		let mut second_ids: Vec<String> = second.iter().map(|r| r.id.to_string()).collect();
		first_ids.sort();
		second_ids.sort();
		assert_eq!(first_ids, second_ids);

		let all = repo.list_resources_for_project(&project.id).await.unwrap();
		assert_eq!(all.len(), ResourceType::roots().len());
	}

	#[tokio::test]
	async fn test_ensure_project_roots_fills_in_missing() {
		let pool = create_project_test_pool().await;
		let repo = ResourceRepository::new(pool.clone());
		let project = seed_project(&pool).await;

		let om = Resource::new_root(project.owner_org_id, project.id, ResourceType::Om);
		repo.create_resource(&om).await.unwrap();

		let roots = repo.ensure_project_roots(&project).await.unwrap();
		assert_eq!(roots.len(), ResourceType::roots().len());

		let kept = roots
			.iter()
			.find(|r| r.resource_type == ResourceType::Om)
			.unwrap();
		assert_eq!(kept.id, om.id);
	}

	#[tokio::test]
	async fn test_delete_resource_subtree() {
		let pool = create_project_test_pool().await;
		let repo = ResourceRepository::new(pool.clone());
		let project = seed_project(&pool).await;

		let root = Resource::new_root(project.owner_org_id, project.id, ResourceType::ProjectDocsRoot);
		let folder = Resource::new_child(
			project.owner_org_id,
			project.id,
			ResourceType::Folder,
			root.id,
			"Leases",
		);
		let nested = Resource::new_child(
			project.owner_org_id,
			project.id,
			ResourceType::Folder,
			folder.id,
			"2024",
		);
		let file = Resource::new_child(
			project.owner_org_id,
			project.id,
			ResourceType::File,
			nested.id,
			"lease.pdf",
		);
		for r in [&root, &folder, &nested, &file] {
			repo.create_resource(r).await.unwrap();
		}

		let user = UserId::generate();
		insert_permission_row(&pool, &file.id, &user).await;
		insert_permission_row(&pool, &root.id, &user).await;

		let deleted = repo.delete_resource_subtree(&folder.id).await.unwrap();
		assert_eq!(deleted, 3);

		assert!(repo.get_resource(&folder.id).await.unwrap().is_none());
		assert!(repo.get_resource(&nested.id).await.unwrap().is_none());
		assert!(repo.get_resource(&file.id).await.unwrap().is_none());
		assert!(repo.get_resource(&root.id).await.unwrap().is_some());

		// The file's permission row goes with the subtree; the root's stays.
		assert_eq!(count_permission_rows(&pool).await, 1);
	}

	#[tokio::test]
	async fn test_delete_resource_subtree_missing_id() {
		let pool = create_project_test_pool().await;
		let repo = ResourceRepository::new(pool);

		let deleted = repo
			.delete_resource_subtree(&ResourceId::generate())
			.await
			.unwrap();
		assert_eq!(deleted, 0);
	}

	#[tokio::test]
	async fn test_delete_resources_for_project() {
		let pool = create_project_test_pool().await;
		let repo = ResourceRepository::new(pool.clone());
		let project = seed_project(&pool).await;

		let roots = repo.ensure_project_roots(&project).await.unwrap();
		let user = UserId::generate();
		insert_permission_row(&pool, &roots[0].id, &user).await;

		let deleted = repo.delete_resources_for_project(&project.id).await.unwrap();
		assert_eq!(deleted, roots.len() as u64);
		assert_eq!(count_permission_rows(&pool).await, 0);

		let remaining = repo.list_resources_for_project(&project.id).await.unwrap();
		assert!(remaining.is_empty());
	}
}
