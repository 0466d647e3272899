// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Project repository for database operations.

use async_trait::async_trait;
use chrono::Utc;
use dealroom_access_core::{project::Project, OrgId, ProjectId, UserId};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait ProjectStore: Send + Sync {
	async fn create_project(&self, project: &Project) -> Result<(), DbError>;
	async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, DbError>;
	async fn list_projects_for_org(&self, org_id: &OrgId) -> Result<Vec<Project>, DbError>;
	async fn set_assigned_advisor(
		&self,
		id: &ProjectId,
		advisor_id: Option<&UserId>,
	) -> Result<(), DbError>;
	async fn delete_project(&self, id: &ProjectId) -> Result<bool, DbError>;
}

/// Repository for project database operations.
///
/// Projects belong to exactly one owner organization and optionally carry
/// an assigned advisor.
#[derive(Clone)]
pub struct ProjectRepository {
	pool: SqlitePool,
}

impl ProjectRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a new project.
	///
	/// # Errors
	/// Returns `DbError::Sqlx` if insert fails (e.g., duplicate ID).
	#[tracing::instrument(skip(self, project), fields(project_id = %project.id, owner_org_id = %project.owner_org_id))]
	pub async fn create_project(&self, project: &Project) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO projects (id, name, owner_org_id, assigned_advisor_id, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(project.id.to_string())
		.bind(&project.name)
		.bind(project.owner_org_id.to_string())
		.bind(project.assigned_advisor_id.map(|a| a.to_string()))
		.bind(project.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(project_id = %project.id, "project created");
		Ok(())
	}

	/// Get a project by ID.
	///
	/// # Returns
	/// `None` if no project exists with this ID.
	#[tracing::instrument(skip(self), fields(project_id = %id))]
	pub async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, owner_org_id, assigned_advisor_id, created_at
			FROM projects
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_project(&r)).transpose()
	}

	/// List all projects owned by an organization.
	///
	/// # Returns
	/// Projects ordered by creation date.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	pub async fn list_projects_for_org(&self, org_id: &OrgId) -> Result<Vec<Project>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, name, owner_org_id, assigned_advisor_id, created_at
			FROM projects
			WHERE owner_org_id = ?
			ORDER BY created_at ASC
			"#,
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut result = Vec::with_capacity(rows.len());
		for row in &rows {
			result.push(self.row_to_project(row)?);
		}
		Ok(result)
	}

	/// Set or clear the assigned advisor on a project.
	#[tracing::instrument(skip(self), fields(project_id = %id, advisor_id = ?advisor_id.map(|a| a.to_string())))]
	pub async fn set_assigned_advisor(
		&self,
		id: &ProjectId,
		advisor_id: Option<&UserId>,
	) -> Result<(), DbError> {
		sqlx::query(
			r#"
			UPDATE projects
			SET assigned_advisor_id = ?
			WHERE id = ?
			"#,
		)
		.bind(advisor_id.map(|a| a.to_string()))
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(project_id = %id, "assigned advisor updated");
		Ok(())
	}

	/// Delete a project row.
	///
	/// Dependent rows (resources, permissions, grants) are removed by the
	/// caller before this runs, in reverse dependency order.
	///
	/// # Returns
	/// `true` if a project was deleted, `false` if not found.
	#[tracing::instrument(skip(self), fields(project_id = %id))]
	pub async fn delete_project(&self, id: &ProjectId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM projects
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(project_id = %id, "project deleted");
		}
		Ok(deleted)
	}

	fn row_to_project(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Project, DbError> {
		let id_str: String = row.get("id");
		let owner_org_id_str: String = row.get("owner_org_id");
		let advisor_str: Option<String> = row.get("assigned_advisor_id");
		let created_at: String = row.get("created_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid project ID: {e}")))?;
		let owner_org_id = Uuid::parse_str(&owner_org_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid owner_org_id: {e}")))?;
		let assigned_advisor_id = advisor_str
			.map(|s| {
				Uuid::parse_str(&s)
					.map(UserId::new)
					.map_err(|e| DbError::Internal(format!("Invalid assigned_advisor_id: {e}")))
			})
			.transpose()?;

		Ok(Project {
			id: ProjectId::new(id),
			name: row.get("name"),
			owner_org_id: OrgId::new(owner_org_id),
			assigned_advisor_id,
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl ProjectStore for ProjectRepository {
	async fn create_project(&self, project: &Project) -> Result<(), DbError> {
		self.create_project(project).await
	}

	async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, DbError> {
		self.get_project(id).await
	}

	async fn list_projects_for_org(&self, org_id: &OrgId) -> Result<Vec<Project>, DbError> {
		self.list_projects_for_org(org_id).await
	}

	async fn set_assigned_advisor(
		&self,
		id: &ProjectId,
		advisor_id: Option<&UserId>,
	) -> Result<(), DbError> {
		self.set_assigned_advisor(id, advisor_id).await
	}

	async fn delete_project(&self, id: &ProjectId) -> Result<bool, DbError> {
		self.delete_project(id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_project_test_pool;
	use dealroom_access_core::org::Organization;
	use dealroom_access_core::EntityType;

	async fn seed_org(pool: &SqlitePool) -> Organization {
		let org = Organization::new("Project Test Org", EntityType::Borrower);
		sqlx::query("INSERT INTO orgs (id, name, entity_type, created_at) VALUES (?, ?, ?, ?)")
			.bind(org.id.to_string())
			.bind(&org.name)
			.bind(org.entity_type.to_string())
			.bind(org.created_at.to_rfc3339())
			.execute(pool)
			.await
			.unwrap();
		org
	}

	#[tokio::test]
	async fn test_create_and_get_project() {
		let pool = create_project_test_pool().await;
		let repo = ProjectRepository::new(pool.clone());
		let org = seed_org(&pool).await;

		let project = Project::new("125 King St", org.id);
		repo.create_project(&project).await.unwrap();

		let fetched = repo.get_project(&project.id).await.unwrap().unwrap();
		assert_eq!(fetched.id, project.id);
		assert_eq!(fetched.name, "125 King St");
		assert_eq!(fetched.owner_org_id, org.id);
		assert!(fetched.assigned_advisor_id.is_none());
	}

	#[tokio::test]
	async fn test_get_project_not_found() {
		let pool = create_project_test_pool().await;
		let repo = ProjectRepository::new(pool);

		let result = repo.get_project(&ProjectId::generate()).await.unwrap();
		assert!(result.is_none());
	}

	#[tokio::test]
	async fn test_project_with_advisor_roundtrip() {
		let pool = create_project_test_pool().await;
		let repo = ProjectRepository::new(pool.clone());
		let org = seed_org(&pool).await;

		let advisor = UserId::generate();
		let project = Project::new("88 Pitt St", org.id).with_advisor(advisor);
		repo.create_project(&project).await.unwrap();

		let fetched = repo.get_project(&project.id).await.unwrap().unwrap();
		assert_eq!(fetched.assigned_advisor_id, Some(advisor));
	}

	#[tokio::test]
	async fn test_set_and_clear_assigned_advisor() {
		let pool = create_project_test_pool().await;
		let repo = ProjectRepository::new(pool.clone());
		let org = seed_org(&pool).await;

		let project = Project::new("Advisor Swap", org.id);
		repo.create_project(&project).await.unwrap();

		let advisor = UserId::generate();
		repo
			.set_assigned_advisor(&project.id, Some(&advisor))
			.await
			.unwrap();
		let fetched = repo.get_project(&project.id).await.unwrap().unwrap();
		assert_eq!(fetched.assigned_advisor_id, Some(advisor));

		repo.set_assigned_advisor(&project.id, None).await.unwrap();
		let fetched = repo.get_project(&project.id).await.unwrap().unwrap();
		assert!(fetched.assigned_advisor_id.is_none());
	}

	#[tokio::test]
	async fn test_list_projects_for_org() {
		let pool = create_project_test_pool().await;
		let repo = ProjectRepository::new(pool.clone());
		let org = seed_org(&pool).await;
		let other_org = seed_org(&pool).await;

		repo
			.create_project(&Project::new("First", org.id))
			.await
			.unwrap();
		repo
			.create_project(&Project::new("Second", org.id))
			.await
			.unwrap();
		repo
			.create_project(&Project::new("Elsewhere", other_org.id))
			.await
			.unwrap();

		let projects = repo.list_projects_for_org(&org.id).await.unwrap();
		assert_eq!(projects.len(), 2);
		assert!(projects.iter().all(|p| p.owner_org_id == org.id));
	}

	#[tokio::test]
	async fn test_delete_project() {
		let pool = create_project_test_pool().await;
		let repo = ProjectRepository::new(pool.clone());
		let org = seed_org(&pool).await;

		let project = Project::new("Doomed", org.id);
		repo.create_project(&project).await.unwrap();

		assert!(repo.delete_project(&project.id).await.unwrap());
		assert!(repo.get_project(&project.id).await.unwrap().is_none());
		assert!(!repo.delete_project(&project.id).await.unwrap());
	}
}
