// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mutation surface for permission facts and the records they hang off.
//!
//! [`AccessService`] is the only sanctioned writer for overrides, access
//! grants, memberships, projects, resources, and invites. Reads still go
//! through the directory and cache; after a mutation the caller reloads the
//! affected project to observe the new state.
//!
//! Every operation authorizes the acting user before touching the store:
//! owner-only calls reject non-owners with `Unauthorized`, calls targeting
//! missing ids fail with `NotFound`, and structural rules (last owner, root
//! containers) fail with `InvariantViolation` before anything is written.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, warn};

use dealroom_access_core::{
	resolve_all, Invite, InviteId, InviteStatus, OrgGrantSpec, OrgId, OrgRole, Permission,
	PermissionChangeReport, PermissionGrant, PermissionOverride, Project, ProjectAccessGrant,
	ProjectGrantSpec, ProjectId, Resource, ResourceId, ResourceType, UserId,
};
use dealroom_server_db::{GrantStore, InviteStore, OrgStore, ProjectStore, ResourceStore};

use crate::config::AccessConfig;
use crate::directory::GrantDirectory;
use crate::error::{AccessError, Result};

/// Length of the opaque invite acceptance token.
const INVITE_TOKEN_LENGTH: usize = 32;

/// Outcome of a bulk permission selection applied to one resource.
///
/// Failed rows are reported next to the users that were applied; one bad
/// entry does not abort the remainder.
#[derive(Debug, Default)]
pub struct BulkGrantOutcome {
	/// Users whose override row was written.
	pub succeeded: Vec<UserId>,

	/// Users whose write failed, with the classified error.
	pub failed: Vec<(UserId, AccessError)>,
}

impl BulkGrantOutcome {
	/// True when every selection was applied.
	pub fn is_fully_applied(&self) -> bool {
		self.failed.is_empty()
	}
}

/// Write-side service over the access stores.
pub struct AccessService {
	orgs: Arc<dyn OrgStore>,
	projects: Arc<dyn ProjectStore>,
	resources: Arc<dyn ResourceStore>,
	grants: Arc<dyn GrantStore>,
	invites: Arc<dyn InviteStore>,
	directory: Arc<GrantDirectory>,
	config: AccessConfig,
}

impl AccessService {
	pub fn new(
		orgs: Arc<dyn OrgStore>,
		projects: Arc<dyn ProjectStore>,
		resources: Arc<dyn ResourceStore>,
		grants: Arc<dyn GrantStore>,
		invites: Arc<dyn InviteStore>,
		directory: Arc<GrantDirectory>,
		config: AccessConfig,
	) -> Self {
		Self {
			orgs,
			projects,
			resources,
			grants,
			invites,
			directory,
			config,
		}
	}

	// =========================================================================
	// Overrides and grants
	// =========================================================================

	/// Record an explicit per-resource permission for a user.
	///
	/// `Permission::None` records a deliberate hide; there is no way to clear
	/// a row back to inherited behavior, a new level must be written instead.
	/// Only owners of the resource's organization may call this.
	#[tracing::instrument(skip(self), fields(resource_id = %resource_id, user_id = %user_id, permission = %permission, granted_by = %granted_by))]
	pub async fn set_override(
		&self,
		resource_id: &ResourceId,
		user_id: &UserId,
		permission: Permission,
		granted_by: &UserId,
	) -> Result<()> {
		let resource = self
			.resources
			.get_resource(resource_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("Resource {resource_id} not found")))?;
		self.require_owner(&resource.org_id, granted_by).await?;

		self
			.grants
			.upsert_override(&PermissionOverride::new(
				*resource_id,
				*user_id,
				permission,
				*granted_by,
			))
			.await?;
		Ok(())
	}

	/// Apply a per-user permission selection to one freshly uploaded resource.
	///
	/// One override row per (user, permission) pair. A failed write is logged
	/// and reported in the outcome while the remaining pairs still run; the
	/// uploader was already authorized by the upload pipeline, so no owner
	/// check is repeated here.
	#[tracing::instrument(skip(self, selections), fields(resource_id = %resource_id, granted_by = %granted_by, selections = selections.len()))]
	pub async fn bulk_grant_on_upload(
		&self,
		resource_id: &ResourceId,
		granted_by: &UserId,
		selections: &[(UserId, Permission)],
	) -> Result<BulkGrantOutcome> {
		if self.resources.get_resource(resource_id).await?.is_none() {
			return Err(AccessError::NotFound(format!(
				"Resource {resource_id} not found"
			)));
		}

		let mut outcome = BulkGrantOutcome::default();
		for (user_id, permission) in selections {
			let write = self
				.grants
				.upsert_override(&PermissionOverride::new(
					*resource_id,
					*user_id,
					*permission,
					*granted_by,
				))
				.await;
			match write {
				Ok(()) => outcome.succeeded.push(*user_id),
				Err(e) => {
					warn!(resource_id = %resource_id, user_id = %user_id, error = %e, "bulk grant entry failed");
					outcome.failed.push((*user_id, e.into()));
				}
			}
		}

		debug!(
			resource_id = %resource_id,
			succeeded = outcome.succeeded.len(),
			failed = outcome.failed.len(),
			"bulk grant applied"
		);
		Ok(outcome)
	}

	/// Grant a user baseline access to a project.
	///
	/// Upserts the grant row and records the requested levels on the
	/// project's root containers. Re-granting refreshes the existing row.
	#[tracing::instrument(skip(self, permissions), fields(project_id = %project_id, user_id = %user_id, granted_by = %granted_by))]
	pub async fn grant_project_access(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
		granted_by: &UserId,
		permissions: &[PermissionGrant],
	) -> Result<()> {
		let project = self
			.projects
			.get_project(project_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("Project {project_id} not found")))?;

		self
			.apply_baseline_with_roots(user_id, granted_by, &project, permissions)
			.await
	}

	/// Remove a user's baseline access to a project.
	///
	/// Deletes the grant row and every override the user holds on the
	/// project's resources, so no root or file row keeps granting after the
	/// unshare. Owner-only.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, user_id = %user_id, actor = %actor))]
	pub async fn revoke_project_access(
		&self,
		actor: &UserId,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<()> {
		let project = self
			.projects
			.get_project(project_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("Project {project_id} not found")))?;
		self.require_owner(&project.owner_org_id, actor).await?;

		self.grants.delete_grant(project_id, user_id).await?;
		let overrides_removed = self
			.grants
			.delete_overrides_for_user_in_project(project_id, user_id)
			.await?;
		debug!(project_id = %project_id, user_id = %user_id, overrides_removed, "project access revoked");
		Ok(())
	}

	// =========================================================================
	// Memberships
	// =========================================================================

	/// Remove a member from an organization.
	///
	/// Rejected when the target is the organization's last owner. On success
	/// the user's grants and overrides across the org's projects are removed
	/// with the membership. Owner-only.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id, actor = %actor))]
	pub async fn remove_org_member(
		&self,
		actor: &UserId,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<()> {
		self.require_owner(org_id, actor).await?;
		let membership = self
			.orgs
			.get_membership(org_id, user_id)
			.await?
			.ok_or_else(|| {
				AccessError::NotFound(format!("User {user_id} is not a member of org {org_id}"))
			})?;

		if membership.is_owner() && self.orgs.count_owners(org_id).await? <= 1 {
			return Err(AccessError::InvariantViolation(format!(
				"Cannot remove the last owner of org {org_id}"
			)));
		}

		self.orgs.remove_member(org_id, user_id).await?;
		let grants_removed = self
			.grants
			.delete_grants_for_user_in_org(org_id, user_id)
			.await?;
		let overrides_removed = self
			.grants
			.delete_overrides_for_user_in_org(org_id, user_id)
			.await?;
		debug!(org_id = %org_id, user_id = %user_id, grants_removed, overrides_removed, "org member removed");
		Ok(())
	}

	/// Change a member's role.
	///
	/// Demoting the organization's last owner is rejected. Owner-only.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id, role = %role, actor = %actor))]
	pub async fn update_member_role(
		&self,
		actor: &UserId,
		org_id: &OrgId,
		user_id: &UserId,
		role: OrgRole,
	) -> Result<()> {
		self.require_owner(org_id, actor).await?;
		let membership = self
			.orgs
			.get_membership(org_id, user_id)
			.await?
			.ok_or_else(|| {
				AccessError::NotFound(format!("User {user_id} is not a member of org {org_id}"))
			})?;

		if membership.is_owner()
			&& role != OrgRole::Owner
			&& self.orgs.count_owners(org_id).await? <= 1
		{
			return Err(AccessError::InvariantViolation(format!(
				"Cannot demote the last owner of org {org_id}"
			)));
		}

		self.orgs.update_member_role(org_id, user_id, role).await?;
		Ok(())
	}

	/// Replace a member's access across the organization.
	///
	/// Wipe-and-reapply: the member's grants and overrides in the org are
	/// deleted, the requested payloads are applied from scratch, and the
	/// returned report diffs the member's effective permissions before and
	/// after. Owners cannot be edited this way; their access is implicit.
	#[tracing::instrument(skip(self, project_grants, org_grants), fields(org_id = %org_id, user_id = %user_id, actor = %actor))]
	pub async fn update_member_permissions(
		&self,
		actor: &UserId,
		org_id: &OrgId,
		user_id: &UserId,
		project_grants: &[ProjectGrantSpec],
		org_grants: Option<&OrgGrantSpec>,
	) -> Result<PermissionChangeReport> {
		self.require_owner(org_id, actor).await?;
		let membership = self
			.orgs
			.get_membership(org_id, user_id)
			.await?
			.ok_or_else(|| {
				AccessError::NotFound(format!("User {user_id} is not a member of org {org_id}"))
			})?;
		if membership.is_owner() {
			return Err(AccessError::InvariantViolation(format!(
				"Access of org owners is implicit and cannot be edited for org {org_id}"
			)));
		}

		// Validate the payload before the destructive phase.
		let mut validated: Vec<(Project, &ProjectGrantSpec)> =
			Vec::with_capacity(project_grants.len());
		for spec in project_grants {
			let project = self
				.projects
				.get_project(&spec.project_id)
				.await?
				.ok_or_else(|| {
					AccessError::NotFound(format!("Project {} not found", spec.project_id))
				})?;
			if project.owner_org_id != *org_id {
				return Err(AccessError::InvariantViolation(format!(
					"Project {} does not belong to org {org_id}",
					spec.project_id
				)));
			}
			validated.push((project, spec));
		}

		let before = self.effective_permissions_in_org(org_id, user_id).await?;

		self
			.grants
			.delete_grants_for_user_in_org(org_id, user_id)
			.await?;
		self
			.grants
			.delete_overrides_for_user_in_org(org_id, user_id)
			.await?;

		for (project, spec) in &validated {
			self
				.apply_project_grant(user_id, actor, project, spec)
				.await?;
		}
		if let Some(org_spec) = org_grants {
			self
				.apply_org_grant(org_id, user_id, actor, org_spec)
				.await?;
		}

		let after = self.effective_permissions_in_org(org_id, user_id).await?;
		let report = PermissionChangeReport::diff(*user_id, &before, &after);
		debug!(org_id = %org_id, user_id = %user_id, changes = report.changes.len(), "member permissions replaced");
		Ok(report)
	}

	// =========================================================================
	// Projects and resources
	// =========================================================================

	/// Create a project with its fixed root containers.
	///
	/// Any member of the owning org may create. Every other org owner
	/// receives a baseline grant so the deal is visible to them immediately.
	/// If provisioning fails after the project row was written, the partial
	/// project is deleted and the original error is returned.
	#[tracing::instrument(skip(self, assigned_advisor), fields(name = %name, owner_org_id = %owner_org_id, actor = %actor))]
	pub async fn create_project(
		&self,
		actor: &UserId,
		name: &str,
		owner_org_id: &OrgId,
		assigned_advisor: Option<&UserId>,
	) -> Result<Project> {
		if self.orgs.get_membership(owner_org_id, actor).await?.is_none() {
			return Err(AccessError::Unauthorized(format!(
				"User {actor} is not a member of org {owner_org_id}"
			)));
		}
		if let Some(advisor) = assigned_advisor {
			if self.orgs.get_user_by_id(advisor).await?.is_none() {
				return Err(AccessError::NotFound(format!("User {advisor} not found")));
			}
		}

		let mut project = Project::new(name, *owner_org_id);
		if let Some(advisor) = assigned_advisor {
			project = project.with_advisor(*advisor);
		}
		self.projects.create_project(&project).await?;

		if let Err(e) = self.bootstrap_project(&project, actor).await {
			warn!(project_id = %project.id, error = %e, "project bootstrap failed, rolling back");
			self.rollback_project_creation(&project.id).await;
			return Err(e);
		}

		debug!(project_id = %project.id, org_id = %owner_org_id, "project created");
		Ok(project)
	}

	/// Assign or clear the advisor on a project. Owner-only.
	#[tracing::instrument(skip(self, advisor), fields(project_id = %project_id, actor = %actor))]
	pub async fn assign_advisor(
		&self,
		actor: &UserId,
		project_id: &ProjectId,
		advisor: Option<&UserId>,
	) -> Result<()> {
		let project = self
			.projects
			.get_project(project_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("Project {project_id} not found")))?;
		self.require_owner(&project.owner_org_id, actor).await?;
		if let Some(advisor_id) = advisor {
			if self.orgs.get_user_by_id(advisor_id).await?.is_none() {
				return Err(AccessError::NotFound(format!("User {advisor_id} not found")));
			}
		}

		self.projects.set_assigned_advisor(project_id, advisor).await?;
		Ok(())
	}

	/// Delete a project and everything hanging off it.
	///
	/// Cascades to grants, resources, and override rows. Owner-only.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, actor = %actor))]
	pub async fn delete_project(&self, actor: &UserId, project_id: &ProjectId) -> Result<()> {
		let project = self
			.projects
			.get_project(project_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("Project {project_id} not found")))?;
		self.require_owner(&project.owner_org_id, actor).await?;

		self.grants.delete_grants_for_project(project_id).await?;
		self
			.resources
			.delete_resources_for_project(project_id)
			.await?;
		self.projects.delete_project(project_id).await?;
		debug!(project_id = %project_id, "project deleted");
		Ok(())
	}

	/// Create a folder or file under an existing parent node.
	///
	/// Root container types are provisioned with the project and cannot be
	/// created here. Files are leaves; the parent must be a container in the
	/// same project. Org members and grant holders may create.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, parent_id = %parent_id, name = %name, resource_type = %resource_type, actor = %actor))]
	pub async fn create_resource(
		&self,
		actor: &UserId,
		project_id: &ProjectId,
		parent_id: &ResourceId,
		name: &str,
		resource_type: ResourceType,
	) -> Result<Resource> {
		if resource_type.is_root() {
			return Err(AccessError::InvariantViolation(format!(
				"Root container {resource_type} is provisioned with the project"
			)));
		}

		let project = self
			.projects
			.get_project(project_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("Project {project_id} not found")))?;
		let parent = self
			.resources
			.get_resource(parent_id)
			.await?
			.ok_or_else(|| {
				AccessError::NotFound(format!("Parent resource {parent_id} not found"))
			})?;
		if parent.project_id != *project_id {
			return Err(AccessError::InvariantViolation(format!(
				"Parent resource {parent_id} belongs to a different project"
			)));
		}
		if parent.resource_type == ResourceType::File {
			return Err(AccessError::InvariantViolation(format!(
				"Parent resource {parent_id} is a file and cannot contain children"
			)));
		}
		self.require_project_participant(&project, actor).await?;

		let resource = Resource::new_child(
			project.owner_org_id,
			*project_id,
			resource_type,
			*parent_id,
			name,
		);
		self.resources.create_resource(&resource).await?;
		Ok(resource)
	}

	/// Delete a folder or file, including its descendants and their override
	/// rows.
	///
	/// Root containers cannot be deleted directly; they go with the project.
	///
	/// # Returns
	/// Number of resources removed.
	#[tracing::instrument(skip(self), fields(resource_id = %resource_id, actor = %actor))]
	pub async fn delete_resource(&self, actor: &UserId, resource_id: &ResourceId) -> Result<u64> {
		let resource = self
			.resources
			.get_resource(resource_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("Resource {resource_id} not found")))?;
		if resource.resource_type.is_root() {
			return Err(AccessError::InvariantViolation(format!(
				"Root container {resource_id} cannot be deleted directly"
			)));
		}

		let project = self
			.projects
			.get_project(&resource.project_id)
			.await?
			.ok_or_else(|| {
				AccessError::NotFound(format!("Project {} not found", resource.project_id))
			})?;
		self.require_project_participant(&project, actor).await?;

		let deleted = self.resources.delete_resource_subtree(resource_id).await?;
		debug!(resource_id = %resource_id, deleted, "resource subtree deleted");
		Ok(deleted)
	}

	/// Create any missing root containers for a project.
	///
	/// Idempotent; existing roots are kept as they are.
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn ensure_project_roots(&self, project_id: &ProjectId) -> Result<Vec<Resource>> {
		let project = self
			.projects
			.get_project(project_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("Project {project_id} not found")))?;
		Ok(self.resources.ensure_project_roots(&project).await?)
	}

	// =========================================================================
	// Invites
	// =========================================================================

	/// Create a pending invite carrying the access the member should receive.
	///
	/// Owner-only. One pending invite per email per org; inviting an existing
	/// member is rejected.
	#[tracing::instrument(skip(self, project_grants, org_grants), fields(org_id = %org_id, email = %email, role = %role, actor = %actor))]
	pub async fn invite_user(
		&self,
		actor: &UserId,
		org_id: &OrgId,
		email: &str,
		role: OrgRole,
		project_grants: Vec<ProjectGrantSpec>,
		org_grants: Option<OrgGrantSpec>,
	) -> Result<Invite> {
		if self.orgs.get_org_by_id(org_id).await?.is_none() {
			return Err(AccessError::NotFound(format!("Org {org_id} not found")));
		}
		self.require_owner(org_id, actor).await?;

		if self.invites.has_pending_invite(org_id, email).await? {
			return Err(AccessError::InvariantViolation(format!(
				"A pending invite for {email} already exists"
			)));
		}
		if let Some(user) = self.orgs.get_user_by_email(email).await? {
			if self.orgs.get_membership(org_id, &user.id).await?.is_some() {
				return Err(AccessError::InvariantViolation(format!(
					"{email} is already a member of org {org_id}"
				)));
			}
		}

		let now = Utc::now();
		let invite = Invite {
			id: InviteId::generate(),
			org_id: *org_id,
			invited_by: *actor,
			invited_email: email.to_string(),
			role,
			project_grants,
			org_grants,
			status: InviteStatus::Pending,
			token: generate_invite_token(),
			expires_at: now + self.config.invite_expiry,
			created_at: now,
		};
		self.invites.create_invite(&invite).await?;

		debug!(invite_id = %invite.id, org_id = %org_id, "invite created");
		Ok(invite)
	}

	/// Accept an invite by token.
	///
	/// Creates the membership, applies the carried grant payloads with the
	/// issuing owner recorded as grantor, and marks the invite accepted.
	/// The accepting user's email must match the invited address. Payload
	/// rows that already exist are refreshed rather than rejected; payload
	/// projects that no longer exist are skipped.
	#[tracing::instrument(skip(self, token), fields(user_id = %user_id))]
	pub async fn accept_invite(&self, token: &str, user_id: &UserId) -> Result<()> {
		let invite = self
			.invites
			.get_invite_by_token(token)
			.await?
			.ok_or_else(|| AccessError::NotFound("Invite not found".to_string()))?;

		let now = Utc::now();
		if !invite.is_acceptable(now) {
			let reason = if invite.status == InviteStatus::Pending {
				format!("Invite {} expired at {}", invite.id, invite.expires_at)
			} else {
				format!("Invite {} is {}", invite.id, invite.status)
			};
			return Err(AccessError::InvariantViolation(reason));
		}

		let user = self
			.orgs
			.get_user_by_id(user_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("User {user_id} not found")))?;
		if !user.email.eq_ignore_ascii_case(&invite.invited_email) {
			return Err(AccessError::Unauthorized(
				"Invite was issued to a different email address".to_string(),
			));
		}

		if self
			.orgs
			.get_membership(&invite.org_id, user_id)
			.await?
			.is_none()
		{
			self
				.orgs
				.add_member(&invite.org_id, user_id, invite.role)
				.await?;
		}

		for spec in &invite.project_grants {
			match self.projects.get_project(&spec.project_id).await? {
				Some(project) => {
					self
						.apply_project_grant(user_id, &invite.invited_by, &project, spec)
						.await?;
				}
				None => {
					warn!(project_id = %spec.project_id, "invited project no longer exists, skipping");
				}
			}
		}
		if let Some(org_spec) = &invite.org_grants {
			self
				.apply_org_grant(&invite.org_id, user_id, &invite.invited_by, org_spec)
				.await?;
		}

		self.invites.mark_accepted(&invite.id).await?;
		debug!(invite_id = %invite.id, org_id = %invite.org_id, user_id = %user_id, "invite accepted");
		Ok(())
	}

	/// Revoke a pending invite. Owner-only.
	#[tracing::instrument(skip(self), fields(invite_id = %invite_id, actor = %actor))]
	pub async fn revoke_invite(&self, actor: &UserId, invite_id: &InviteId) -> Result<()> {
		let invite = self
			.invites
			.get_invite_by_id(invite_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("Invite {invite_id} not found")))?;
		self.require_owner(&invite.org_id, actor).await?;

		if !self.invites.mark_revoked(invite_id).await? {
			return Err(AccessError::InvariantViolation(format!(
				"Invite {invite_id} is not pending"
			)));
		}
		Ok(())
	}

	/// List an organization's pending invites. Owner-only.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, actor = %actor))]
	pub async fn list_pending_invites(
		&self,
		actor: &UserId,
		org_id: &OrgId,
	) -> Result<Vec<Invite>> {
		self.require_owner(org_id, actor).await?;
		Ok(self.invites.list_pending_for_org(org_id).await?)
	}

	// =========================================================================
	// Internal helpers
	// =========================================================================

	/// Reject unless the user is an owner of the org.
	async fn require_owner(&self, org_id: &OrgId, user_id: &UserId) -> Result<()> {
		let membership = self
			.orgs
			.get_membership(org_id, user_id)
			.await?
			.ok_or_else(|| {
				AccessError::Unauthorized(format!(
					"User {user_id} is not a member of org {org_id}"
				))
			})?;
		if !membership.is_owner() {
			return Err(AccessError::Unauthorized(format!(
				"User {user_id} is not an owner of org {org_id}"
			)));
		}
		Ok(())
	}

	/// Reject unless the user is an org member or holds a grant on the
	/// project.
	async fn require_project_participant(&self, project: &Project, user_id: &UserId) -> Result<()> {
		if self
			.orgs
			.get_membership(&project.owner_org_id, user_id)
			.await?
			.is_some()
		{
			return Ok(());
		}
		if self.grants.get_grant(&project.id, user_id).await?.is_some() {
			return Ok(());
		}
		Err(AccessError::Unauthorized(format!(
			"User {user_id} has no access to project {}",
			project.id
		)))
	}

	/// Baseline grant plus root-container rows for one project.
	async fn apply_baseline_with_roots(
		&self,
		user_id: &UserId,
		granted_by: &UserId,
		project: &Project,
		levels: &[PermissionGrant],
	) -> Result<()> {
		self
			.grants
			.upsert_grant(&ProjectAccessGrant::new(
				project.id,
				*user_id,
				project.owner_org_id,
				*granted_by,
			))
			.await?;

		let roots = self.resources.ensure_project_roots(project).await?;
		for level in levels {
			let Some(root) = roots
				.iter()
				.find(|r| r.resource_type == level.resource_type)
			else {
				warn!(project_id = %project.id, resource_type = %level.resource_type, "no root container for requested level");
				continue;
			};
			self
				.grants
				.upsert_override(&PermissionOverride::new(
					root.id,
					*user_id,
					level.permission,
					*granted_by,
				))
				.await?;
		}
		Ok(())
	}

	/// Apply one project-scoped grant payload.
	async fn apply_project_grant(
		&self,
		user_id: &UserId,
		granted_by: &UserId,
		project: &Project,
		spec: &ProjectGrantSpec,
	) -> Result<()> {
		self
			.apply_baseline_with_roots(user_id, granted_by, project, &spec.permissions)
			.await?;

		let mut rows: Vec<(ResourceId, Permission)> = spec
			.file_overrides
			.iter()
			.map(|fo| (fo.resource_id, fo.permission))
			.collect();
		rows.extend(spec.exclusions.iter().map(|id| (*id, Permission::None)));
		self.apply_file_overrides(user_id, granted_by, &rows).await
	}

	/// Apply an org-wide grant payload across every project of the org.
	async fn apply_org_grant(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		granted_by: &UserId,
		spec: &OrgGrantSpec,
	) -> Result<()> {
		for project in self.projects.list_projects_for_org(org_id).await? {
			self
				.apply_baseline_with_roots(user_id, granted_by, &project, &spec.permissions)
				.await?;
		}

		let rows: Vec<(ResourceId, Permission)> = spec
			.file_overrides
			.iter()
			.map(|fo| (fo.resource_id, fo.permission))
			.collect();
		self.apply_file_overrides(user_id, granted_by, &rows).await
	}

	/// Upsert override rows, skipping resources that no longer exist.
	async fn apply_file_overrides(
		&self,
		user_id: &UserId,
		granted_by: &UserId,
		rows: &[(ResourceId, Permission)],
	) -> Result<()> {
		for (resource_id, permission) in rows {
			if self.resources.get_resource(resource_id).await?.is_none() {
				warn!(resource_id = %resource_id, "skipping override for missing resource");
				continue;
			}
			self
				.grants
				.upsert_override(&PermissionOverride::new(
					*resource_id,
					*user_id,
					*permission,
					*granted_by,
				))
				.await?;
		}
		Ok(())
	}

	/// Resolve the user's effective permission on every resource of every
	/// project in the org.
	async fn effective_permissions_in_org(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<HashMap<ResourceId, Permission>> {
		let mut effective = HashMap::new();
		for project in self.projects.list_projects_for_org(org_id).await? {
			let snapshot = self.directory.load(&project.id).await?;
			effective.extend(resolve_all(user_id, &snapshot));
		}
		Ok(effective)
	}

	/// Root containers plus owner baseline grants for a new project.
	async fn bootstrap_project(&self, project: &Project, created_by: &UserId) -> Result<()> {
		self.resources.ensure_project_roots(project).await?;

		let members = self.orgs.list_members(&project.owner_org_id).await?;
		for (membership, _) in members {
			if !membership.is_owner() || membership.user_id == *created_by {
				continue;
			}
			self
				.grants
				.upsert_grant(&ProjectAccessGrant::new(
					project.id,
					membership.user_id,
					project.owner_org_id,
					*created_by,
				))
				.await?;
		}
		Ok(())
	}

	/// Best-effort removal of a partially created project.
	async fn rollback_project_creation(&self, project_id: &ProjectId) {
		if let Err(e) = self.grants.delete_grants_for_project(project_id).await {
			warn!(project_id = %project_id, error = %e, "rollback failed to delete grants");
		}
		if let Err(e) = self.resources.delete_resources_for_project(project_id).await {
			warn!(project_id = %project_id, error = %e, "rollback failed to delete resources");
		}
		if let Err(e) = self.projects.delete_project(project_id).await {
			warn!(project_id = %project_id, error = %e, "rollback failed to delete project row");
		}
	}
}

/// Opaque single-use token for invite acceptance.
fn generate_invite_token() -> String {
	rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(INVITE_TOKEN_LENGTH)
		.map(char::from)
		.collect()
}
