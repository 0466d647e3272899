// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Invite repository for database operations.
//!
//! Grant payloads (project and org scoped) are stored as JSON text columns
//! and deserialized on read.

use async_trait::async_trait;
use chrono::Utc;
use dealroom_access_core::{
	grant::{Invite, OrgGrantSpec, ProjectGrantSpec},
	InviteId, InviteStatus, OrgId, OrgRole, UserId,
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait InviteStore: Send + Sync {
	async fn create_invite(&self, invite: &Invite) -> Result<(), DbError>;
	async fn get_invite_by_id(&self, id: &InviteId) -> Result<Option<Invite>, DbError>;
	async fn get_invite_by_token(&self, token: &str) -> Result<Option<Invite>, DbError>;
	async fn has_pending_invite(&self, org_id: &OrgId, email: &str) -> Result<bool, DbError>;
	async fn list_pending_for_org(&self, org_id: &OrgId) -> Result<Vec<Invite>, DbError>;
	async fn mark_accepted(&self, id: &InviteId) -> Result<(), DbError>;
	async fn mark_revoked(&self, id: &InviteId) -> Result<bool, DbError>;
}

/// Repository for invite database operations.
#[derive(Clone)]
pub struct InviteRepository {
	pool: SqlitePool,
}

impl InviteRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a new invite.
	///
	/// # Errors
	/// Returns `DbError::Sqlx` if insert fails (e.g., duplicate token) and
	/// `DbError::Serialization` if a grant payload fails to serialize.
	#[tracing::instrument(skip(self, invite), fields(invite_id = %invite.id, org_id = %invite.org_id))]
	pub async fn create_invite(&self, invite: &Invite) -> Result<(), DbError> {
		let project_grants_json = serde_json::to_string(&invite.project_grants)?;
		let org_grants_json = invite
			.org_grants
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		sqlx::query(
			r#"
			INSERT INTO invites (id, org_id, invited_by, invited_email, role, project_grants, org_grants, status, token, expires_at, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(invite.id.to_string())
		.bind(invite.org_id.to_string())
		.bind(invite.invited_by.to_string())
		.bind(&invite.invited_email)
		.bind(invite.role.to_string())
		.bind(project_grants_json)
		.bind(org_grants_json)
		.bind(invite.status.to_string())
		.bind(&invite.token)
		.bind(invite.expires_at.to_rfc3339())
		.bind(invite.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(invite_id = %invite.id, org_id = %invite.org_id, "invite created");
		Ok(())
	}

	/// Get an invite by ID.
	///
	/// # Returns
	/// `None` if no invite exists with this ID.
	#[tracing::instrument(skip(self), fields(invite_id = %id))]
	pub async fn get_invite_by_id(&self, id: &InviteId) -> Result<Option<Invite>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, org_id, invited_by, invited_email, role, project_grants, org_grants, status, token, expires_at, created_at
			FROM invites
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_invite(&r)).transpose()
	}

	/// Get an invite by its acceptance token.
	///
	/// # Returns
	/// `None` if no invite carries this token.
	#[tracing::instrument(skip(self, token))]
	pub async fn get_invite_by_token(&self, token: &str) -> Result<Option<Invite>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, org_id, invited_by, invited_email, role, project_grants, org_grants, status, token, expires_at, created_at
			FROM invites
			WHERE token = ?
			"#,
		)
		.bind(token)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_invite(&r)).transpose()
	}

	/// Check whether a pending invite already exists for an email in an org.
	#[tracing::instrument(skip(self, email), fields(org_id = %org_id))]
	pub async fn has_pending_invite(&self, org_id: &OrgId, email: &str) -> Result<bool, DbError> {
		let row: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM invites
			WHERE org_id = ? AND invited_email = ? AND status = 'pending'
			"#,
		)
		.bind(org_id.to_string())
		.bind(email)
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0 > 0)
	}

	/// List pending invites for an organization.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	pub async fn list_pending_for_org(&self, org_id: &OrgId) -> Result<Vec<Invite>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, org_id, invited_by, invited_email, role, project_grants, org_grants, status, token, expires_at, created_at
			FROM invites
			WHERE org_id = ? AND status = 'pending'
			ORDER BY created_at ASC
			"#,
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut result = Vec::with_capacity(rows.len());
		for row in &rows {
			result.push(self.row_to_invite(row)?);
		}
		Ok(result)
	}

	/// Mark an invite as accepted.
	#[tracing::instrument(skip(self), fields(invite_id = %id))]
	pub async fn mark_accepted(&self, id: &InviteId) -> Result<(), DbError> {
		sqlx::query(
			r#"
			UPDATE invites
			SET status = 'accepted'
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(invite_id = %id, "invite accepted");
		Ok(())
	}

	/// Mark a pending invite as revoked.
	///
	/// # Returns
	/// `true` if a pending invite was revoked, `false` otherwise.
	#[tracing::instrument(skip(self), fields(invite_id = %id))]
	pub async fn mark_revoked(&self, id: &InviteId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE invites
			SET status = 'revoked'
			WHERE id = ? AND status = 'pending'
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let revoked = result.rows_affected() > 0;
		if revoked {
			tracing::debug!(invite_id = %id, "invite revoked");
		}
		Ok(revoked)
	}

	fn row_to_invite(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Invite, DbError> {
		let id_str: String = row.get("id");
		let org_id_str: String = row.get("org_id");
		let invited_by_str: String = row.get("invited_by");
		let role_str: String = row.get("role");
		let project_grants_json: String = row.get("project_grants");
		let org_grants_json: Option<String> = row.get("org_grants");
		let status_str: String = row.get("status");
		let expires_at: String = row.get("expires_at");
		let created_at: String = row.get("created_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid invite ID: {e}")))?;
		let org_id = Uuid::parse_str(&org_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid org_id: {e}")))?;
		let invited_by = Uuid::parse_str(&invited_by_str)
			.map_err(|e| DbError::Internal(format!("Invalid invited_by: {e}")))?;

		let role = match role_str.as_str() {
			"owner" => OrgRole::Owner,
			_ => OrgRole::Member,
		};
		let status = match status_str.as_str() {
			"accepted" => InviteStatus::Accepted,
			"revoked" => InviteStatus::Revoked,
			_ => InviteStatus::Pending,
		};

		let project_grants: Vec<ProjectGrantSpec> = serde_json::from_str(&project_grants_json)?;
		let org_grants: Option<OrgGrantSpec> = org_grants_json
			.map(|json| serde_json::from_str(&json))
			.transpose()?;

		Ok(Invite {
			id: InviteId::new(id),
			org_id: OrgId::new(org_id),
			invited_by: UserId::new(invited_by),
			invited_email: row.get("invited_email"),
			role,
			project_grants,
			org_grants,
			status,
			token: row.get("token"),
			expires_at: chrono::DateTime::parse_from_rfc3339(&expires_at)
				.map_err(|e| DbError::Internal(format!("Invalid expires_at: {e}")))?
				.with_timezone(&Utc),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl InviteStore for InviteRepository {
	async fn create_invite(&self, invite: &Invite) -> Result<(), DbError> {
		self.create_invite(invite).await
	}

	async fn get_invite_by_id(&self, id: &InviteId) -> Result<Option<Invite>, DbError> {
		self.get_invite_by_id(id).await
	}

	async fn get_invite_by_token(&self, token: &str) -> Result<Option<Invite>, DbError> {
		self.get_invite_by_token(token).await
	}

	async fn has_pending_invite(&self, org_id: &OrgId, email: &str) -> Result<bool, DbError> {
		self.has_pending_invite(org_id, email).await
	}

	async fn list_pending_for_org(&self, org_id: &OrgId) -> Result<Vec<Invite>, DbError> {
		self.list_pending_for_org(org_id).await
	}

	async fn mark_accepted(&self, id: &InviteId) -> Result<(), DbError> {
		self.mark_accepted(id).await
	}

	async fn mark_revoked(&self, id: &InviteId) -> Result<bool, DbError> {
		self.mark_revoked(id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_access_test_pool;
	use chrono::Duration;
	use dealroom_access_core::org::Organization;
	use dealroom_access_core::{EntityType, Permission, ProjectId, ResourceType};

	async fn seed_org(pool: &SqlitePool) -> Organization {
		let org = Organization::new("Invite Test Org", EntityType::Borrower);
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

	fn make_invite(org_id: OrgId, email: &str, token: &str) -> Invite {
		let now = Utc::now();
		Invite {
			id: InviteId::generate(),
			org_id,
			invited_by: UserId::generate(),
			invited_email: email.to_string(),
			role: OrgRole::Member,
			project_grants: Vec::new(),
			org_grants: None,
			status: InviteStatus::Pending,
			token: token.to_string(),
			expires_at: now + Duration::days(7),
			created_at: now,
		}
	}

	#[tokio::test]
	async fn test_create_and_get_invite() {
		let pool = create_access_test_pool().await;
		let repo = InviteRepository::new(pool.clone());
		let org = seed_org(&pool).await;

		let invite = make_invite(org.id, "newbie@example.com", "tok-1");
		repo.create_invite(&invite).await.unwrap();

		let by_id = repo.get_invite_by_id(&invite.id).await.unwrap().unwrap();
		assert_eq!(by_id.invited_email, "newbie@example.com");
		assert_eq!(by_id.status, InviteStatus::Pending);

		let by_token = repo.get_invite_by_token("tok-1").await.unwrap().unwrap();
		assert_eq!(by_token.id, invite.id);
	}

	#[tokio::test]
	async fn test_get_invite_by_token_not_found() {
		let pool = create_access_test_pool().await;
		let repo = InviteRepository::new(pool);

		let result = repo.get_invite_by_token("missing").await.unwrap();
		assert!(result.is_none());
	}

	#[tokio::test]
	async fn test_grant_payloads_roundtrip() {
		let pool = create_access_test_pool().await;
		let repo = InviteRepository::new(pool.clone());
		let org = seed_org(&pool).await;

		let project_id = ProjectId::generate();
		let mut invite = make_invite(org.id, "payload@example.com", "tok-2");
		invite.project_grants = vec![ProjectGrantSpec::new(project_id)
			.with_permission(ResourceType::ProjectDocsRoot, Permission::Edit)];
		invite.org_grants = Some(OrgGrantSpec {
			permissions: vec![],
			file_overrides: vec![],
		});

		repo.create_invite(&invite).await.unwrap();

		let fetched = repo.get_invite_by_token("tok-2").await.unwrap().unwrap();
		assert_eq!(fetched.project_grants.len(), 1);
		assert_eq!(fetched.project_grants[0].project_id, project_id);
		assert_eq!(
			fetched.project_grants[0].permissions[0].permission,
			Permission::Edit
		);
		assert!(fetched.org_grants.is_some());
	}

	#[tokio::test]
	async fn test_has_pending_invite() {
		let pool = create_access_test_pool().await;
		let repo = InviteRepository::new(pool.clone());
		let org = seed_org(&pool).await;

		assert!(!repo
			.has_pending_invite(&org.id, "pending@example.com")
			.await
			.unwrap());

		let invite = make_invite(org.id, "pending@example.com", "tok-3");
		repo.create_invite(&invite).await.unwrap();

		assert!(repo
			.has_pending_invite(&org.id, "pending@example.com")
			.await
			.unwrap());

		repo.mark_accepted(&invite.id).await.unwrap();
		assert!(!repo
			.has_pending_invite(&org.id, "pending@example.com")
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn test_list_pending_for_org() {
		let pool = create_access_test_pool().await;
		let repo = InviteRepository::new(pool.clone());
		let org = seed_org(&pool).await;

		let first = make_invite(org.id, "a@example.com", "tok-a");
		let second = make_invite(org.id, "b@example.com", "tok-b");
		repo.create_invite(&first).await.unwrap();
		repo.create_invite(&second).await.unwrap();
		repo.mark_revoked(&second.id).await.unwrap();

		let pending = repo.list_pending_for_org(&org.id).await.unwrap();
		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].id, first.id);
	}

	#[tokio::test]
	async fn test_mark_revoked_only_pending() {
		let pool = create_access_test_pool().await;
		let repo = InviteRepository::new(pool.clone());
		let org = seed_org(&pool).await;

		let invite = make_invite(org.id, "revoke@example.com", "tok-4");
		repo.create_invite(&invite).await.unwrap();

		assert!(repo.mark_revoked(&invite.id).await.unwrap());
		assert!(!repo.mark_revoked(&invite.id).await.unwrap());

		let fetched = repo.get_invite_by_id(&invite.id).await.unwrap().unwrap();
		assert_eq!(fetched.status, InviteStatus::Revoked);
	}

	#[tokio::test]
	async fn test_duplicate_token_rejected() {
		let pool = create_access_test_pool().await;
		let repo = InviteRepository::new(pool.clone());
		let org = seed_org(&pool).await;

		let first = make_invite(org.id, "one@example.com", "same-token");
		let second = make_invite(org.id, "two@example.com", "same-token");

		repo.create_invite(&first).await.unwrap();
		assert!(repo.create_invite(&second).await.is_err());
	}
}
