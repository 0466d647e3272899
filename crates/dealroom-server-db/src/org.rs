// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Organization repository for database operations.
//!
//! This module provides database access for organization management including:
//! - Organization and user CRUD operations
//! - Membership management (owners and members)
//! - Owner counting for last-owner protection

use async_trait::async_trait;
use chrono::Utc;
use dealroom_access_core::{
	org::{OrgMembership, Organization, User},
	EntityType, OrgId, OrgRole, UserId,
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait OrgStore: Send + Sync {
	async fn create_org(&self, org: &Organization) -> Result<(), DbError>;
	async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError>;
	async fn create_user(&self, user: &User) -> Result<(), DbError>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError>;
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
	async fn add_member(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		role: OrgRole,
	) -> Result<(), DbError>;
	async fn get_membership(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<Option<OrgMembership>, DbError>;
	async fn update_member_role(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		role: OrgRole,
	) -> Result<(), DbError>;
	async fn remove_member(&self, org_id: &OrgId, user_id: &UserId) -> Result<bool, DbError>;
	async fn list_members(&self, org_id: &OrgId) -> Result<Vec<(OrgMembership, User)>, DbError>;
	async fn count_owners(&self, org_id: &OrgId) -> Result<i64, DbError>;
}

/// Repository for organization database operations.
///
/// Manages organizations, their users, and memberships.
/// All IDs are UUIDs stored as strings in SQLite.
#[derive(Clone)]
pub struct OrgRepository {
	pool: SqlitePool,
}

impl OrgRepository {
	/// Create a new repository with the given pool.
	///
	/// # Arguments
	/// * `pool` - SQLite connection pool
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Organization CRUD
	// =========================================================================

	/// Create a new organization.
	///
	/// # Arguments
	/// * `org` - The organization to create
	///
	/// # Errors
	/// Returns `DbError::Sqlx` if insert fails (e.g., duplicate ID).
	#[tracing::instrument(skip(self, org), fields(org_id = %org.id, entity_type = %org.entity_type))]
	pub async fn create_org(&self, org: &Organization) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO orgs (id, name, entity_type, created_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(org.id.to_string())
		.bind(&org.name)
		.bind(org.entity_type.to_string())
		.bind(org.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(org_id = %org.id, "organization created");
		Ok(())
	}

	/// Get an organization by ID.
	///
	/// # Arguments
	/// * `id` - The organization's UUID
	///
	/// # Returns
	/// `None` if no organization exists with this ID.
	#[tracing::instrument(skip(self), fields(org_id = %id))]
	pub async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, entity_type, created_at
			FROM orgs
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_org(&r)).transpose()
	}

	// =========================================================================
	// Users
	// =========================================================================

	/// Create a new user.
	///
	/// # Arguments
	/// * `user` - The user to create
	///
	/// # Errors
	/// Returns `DbError::Sqlx` if insert fails (e.g., duplicate email).
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
	pub async fn create_user(&self, user: &User) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO users (id, email, display_name, created_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(user.id.to_string())
		.bind(&user.email)
		.bind(&user.display_name)
		.bind(user.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_id = %user.id, "user created");
		Ok(())
	}

	/// Get a user by ID.
	///
	/// # Returns
	/// `None` if no user exists with this ID.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, display_name, created_at
			FROM users
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_user(&r)).transpose()
	}

	/// Get a user by email address.
	///
	/// Emails are unique, so at most one user matches.
	///
	/// # Returns
	/// `None` if no user exists with this email.
	#[tracing::instrument(skip(self, email))]
	pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, display_name, created_at
			FROM users
			WHERE email = ?
			"#,
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_user(&r)).transpose()
	}

	// =========================================================================
	// Memberships
	// =========================================================================

	/// Add a member to an organization.
	///
	/// # Arguments
	/// * `org_id` - The organization's UUID
	/// * `user_id` - The user's UUID
	/// * `role` - The member's role (owner, member)
	///
	/// # Database Constraints
	/// - (`org_id`, `user_id`) must be unique
	/// - `org_id` must reference an existing organization
	/// - `user_id` must reference an existing user
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id, role = %role))]
	pub async fn add_member(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		role: OrgRole,
	) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			INSERT INTO org_members (org_id, user_id, role, created_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.bind(role.to_string())
		.bind(&now)
		.execute(&self.pool)
		.await?;

		tracing::debug!(org_id = %org_id, user_id = %user_id, role = %role, "member added to organization");
		Ok(())
	}

	/// Get a membership for a user in an organization.
	///
	/// # Returns
	/// `None` if the user is not a member.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id))]
	pub async fn get_membership(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<Option<OrgMembership>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT org_id, user_id, role, created_at
			FROM org_members
			WHERE org_id = ? AND user_id = ?
			"#,
		)
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_membership(&r)).transpose()
	}

	/// Update a member's role.
	///
	/// # Arguments
	/// * `org_id` - The organization's UUID
	/// * `user_id` - The user's UUID
	/// * `role` - The new role
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id, role = %role))]
	pub async fn update_member_role(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		role: OrgRole,
	) -> Result<(), DbError> {
		sqlx::query(
			r#"
			UPDATE org_members
			SET role = ?
			WHERE org_id = ? AND user_id = ?
			"#,
		)
		.bind(role.to_string())
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(org_id = %org_id, user_id = %user_id, role = %role, "member role updated");
		Ok(())
	}

	/// Remove a member from an organization.
	///
	/// # Returns
	/// `true` if a member was removed, `false` if not found.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id))]
	pub async fn remove_member(&self, org_id: &OrgId, user_id: &UserId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM org_members
			WHERE org_id = ? AND user_id = ?
			"#,
		)
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		let removed = result.rows_affected() > 0;
		if removed {
			tracing::debug!(org_id = %org_id, user_id = %user_id, "member removed from organization");
		}
		Ok(removed)
	}

	/// List all members of an organization with their user info.
	///
	/// # Returns
	/// List of (membership, user) tuples ordered by join date.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	pub async fn list_members(&self, org_id: &OrgId) -> Result<Vec<(OrgMembership, User)>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT
				m.org_id, m.user_id, m.role, m.created_at,
				u.id as u_id, u.email as u_email, u.display_name as u_display_name,
				u.created_at as u_created_at
			FROM org_members m
			INNER JOIN users u ON m.user_id = u.id
			WHERE m.org_id = ?
			ORDER BY m.created_at ASC
			"#,
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut result = Vec::with_capacity(rows.len());
		for row in &rows {
			let membership = self.row_to_membership(row)?;
			let user = self.row_to_user_prefixed(row)?;
			result.push((membership, user));
		}
		tracing::debug!(org_id = %org_id, count = result.len(), "listed organization members");
		Ok(result)
	}

	/// Count owners of an organization.
	///
	/// # Returns
	/// Number of users with the "owner" role.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	pub async fn count_owners(&self, org_id: &OrgId) -> Result<i64, DbError> {
		let row: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM org_members
			WHERE org_id = ? AND role = 'owner'
			"#,
		)
		.bind(org_id.to_string())
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0)
	}

	// =========================================================================
	// Row mappers
	// =========================================================================

	fn row_to_org(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Organization, DbError> {
		let id_str: String = row.get("id");
		let entity_type_str: String = row.get("entity_type");
		let created_at: String = row.get("created_at");

		let id =
			Uuid::parse_str(&id_str).map_err(|e| DbError::Internal(format!("Invalid org ID: {e}")))?;
		let entity_type = match entity_type_str.as_str() {
			"advisor" => EntityType::Advisor,
			_ => EntityType::Borrower,
		};

		Ok(Organization {
			id: OrgId::new(id),
			name: row.get("name"),
			entity_type,
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}

	fn row_to_user(&self, row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
		let id_str: String = row.get("id");
		let created_at: String = row.get("created_at");

		let id =
			Uuid::parse_str(&id_str).map_err(|e| DbError::Internal(format!("Invalid user ID: {e}")))?;

		Ok(User {
			id: UserId::new(id),
			email: row.get("email"),
			display_name: row.get("display_name"),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}

	fn row_to_user_prefixed(&self, row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
		let id_str: String = row.get("u_id");
		let created_at: String = row.get("u_created_at");

		let id =
			Uuid::parse_str(&id_str).map_err(|e| DbError::Internal(format!("Invalid user ID: {e}")))?;

		Ok(User {
			id: UserId::new(id),
			email: row.get("u_email"),
			display_name: row.get("u_display_name"),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}

	fn row_to_membership(&self, row: &sqlx::sqlite::SqliteRow) -> Result<OrgMembership, DbError> {
		let org_id_str: String = row.get("org_id");
		let user_id_str: String = row.get("user_id");
		let role_str: String = row.get("role");
		let created_at: String = row.get("created_at");

		let org_id = Uuid::parse_str(&org_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid org_id: {e}")))?;
		let user_id = Uuid::parse_str(&user_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid user_id: {e}")))?;
		let role = match role_str.as_str() {
			"owner" => OrgRole::Owner,
			_ => OrgRole::Member,
		};

		Ok(OrgMembership {
			org_id: OrgId::new(org_id),
			user_id: UserId::new(user_id),
			role,
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl OrgStore for OrgRepository {
	async fn create_org(&self, org: &Organization) -> Result<(), DbError> {
		self.create_org(org).await
	}

	async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError> {
		self.get_org_by_id(id).await
	}

	async fn create_user(&self, user: &User) -> Result<(), DbError> {
		self.create_user(user).await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		self.get_user_by_id(id).await
	}

	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		self.get_user_by_email(email).await
	}

	async fn add_member(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		role: OrgRole,
	) -> Result<(), DbError> {
		self.add_member(org_id, user_id, role).await
	}

	async fn get_membership(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<Option<OrgMembership>, DbError> {
		self.get_membership(org_id, user_id).await
	}

	async fn update_member_role(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		role: OrgRole,
	) -> Result<(), DbError> {
		self.update_member_role(org_id, user_id, role).await
	}

	async fn remove_member(&self, org_id: &OrgId, user_id: &UserId) -> Result<bool, DbError> {
		self.remove_member(org_id, user_id).await
	}

	async fn list_members(&self, org_id: &OrgId) -> Result<Vec<(OrgMembership, User)>, DbError> {
		self.list_members(org_id).await
	}

	async fn count_owners(&self, org_id: &OrgId) -> Result<i64, DbError> {
		self.count_owners(org_id).await
	}
}
