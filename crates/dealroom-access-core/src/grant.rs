// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stored permission facts and grant payloads.
//!
//! This module provides:
//! - [`PermissionOverride`] - explicit (resource, user) permission fact
//! - [`ProjectAccessGrant`] - baseline project access fact
//! - [`Invite`] - pending membership offer with grants to apply on acceptance
//! - [`ProjectGrantSpec`] / [`OrgGrantSpec`] - payload shapes describing the
//!   access a member should receive

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
	InviteId, InviteStatus, OrgId, OrgRole, Permission, ProjectId, ResourceId, ResourceType,
	UserId,
};

/// An explicit per-resource permission fact.
///
/// Present means authoritative for non-owners: `Permission::None` here is a
/// deliberate hide, not the same as no override being recorded. Unique per
/// (resource, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionOverride {
	/// The resource the override applies to.
	pub resource_id: ResourceId,

	/// The user the override applies to.
	pub user_id: UserId,

	/// The overriding level.
	pub permission: Permission,

	/// The user who recorded the override.
	pub granted_by: UserId,

	/// When the override was last written.
	pub updated_at: DateTime<Utc>,
}

impl PermissionOverride {
	/// Creates a new override with updated_at set to now.
	pub fn new(
		resource_id: ResourceId,
		user_id: UserId,
		permission: Permission,
		granted_by: UserId,
	) -> Self {
		Self {
			resource_id,
			user_id,
			permission,
			granted_by,
			updated_at: Utc::now(),
		}
	}
}

/// Baseline access to a project.
///
/// Grant holders see every non-overridden resource in the project at the
/// blanket level (at least view). Unique per (project, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAccessGrant {
	/// The project access is granted to.
	pub project_id: ProjectId,

	/// The grantee.
	pub user_id: UserId,

	/// The organization that owns the project.
	pub org_id: OrgId,

	/// The user who issued the grant.
	pub granted_by: UserId,

	/// When the grant was created.
	pub created_at: DateTime<Utc>,
}

impl ProjectAccessGrant {
	/// Creates a new grant with created_at set to now.
	pub fn new(project_id: ProjectId, user_id: UserId, org_id: OrgId, granted_by: UserId) -> Self {
		Self {
			project_id,
			user_id,
			org_id,
			granted_by,
			created_at: Utc::now(),
		}
	}
}

/// Requested level for one root container type.
///
/// Carried in grant payloads; applied as a permission row on the project's
/// root container of that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
	/// Which root container the level applies to.
	pub resource_type: ResourceType,

	/// Requested level; `view` or `edit` in well-formed payloads.
	pub permission: Permission,
}

/// A per-file override carried in a grant payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOverride {
	/// The file or folder the override targets.
	pub resource_id: ResourceId,

	/// The level to record.
	pub permission: Permission,
}

/// Project-scoped portion of a grant payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectGrantSpec {
	/// The project the payload applies to.
	pub project_id: ProjectId,

	/// Root-container levels to record.
	#[serde(default)]
	pub permissions: Vec<PermissionGrant>,

	/// Per-file overrides to record.
	#[serde(default)]
	pub file_overrides: Vec<FileOverride>,

	/// Legacy exclusion lists; each id is recorded as an explicit `none`.
	#[serde(default)]
	pub exclusions: Vec<ResourceId>,
}

impl ProjectGrantSpec {
	/// Creates an empty spec for a project.
	pub fn new(project_id: ProjectId) -> Self {
		Self {
			project_id,
			permissions: Vec::new(),
			file_overrides: Vec::new(),
			exclusions: Vec::new(),
		}
	}

	/// Adds a root-container level (builder style).
	pub fn with_permission(mut self, resource_type: ResourceType, permission: Permission) -> Self {
		self.permissions.push(PermissionGrant {
			resource_type,
			permission,
		});
		self
	}

	/// Adds a per-file override (builder style).
	pub fn with_file_override(mut self, resource_id: ResourceId, permission: Permission) -> Self {
		self.file_overrides.push(FileOverride {
			resource_id,
			permission,
		});
		self
	}
}

/// Org-scoped portion of a grant payload, applied across every project of
/// the organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgGrantSpec {
	/// Root-container levels to record on each project.
	#[serde(default)]
	pub permissions: Vec<PermissionGrant>,

	/// Per-file overrides to record.
	#[serde(default)]
	pub file_overrides: Vec<FileOverride>,
}

/// A pending membership offer.
///
/// Created by an org owner; accepting creates the membership and applies the
/// carried grant payloads. The token is opaque and single-use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
	/// Unique identifier for this invite.
	pub id: InviteId,

	/// The organization the invite joins.
	pub org_id: OrgId,

	/// The owner who issued the invite.
	pub invited_by: UserId,

	/// Email the invite was sent to; matched against the accepting user.
	pub invited_email: String,

	/// Role the accepting user will receive.
	pub role: OrgRole,

	/// Project-scoped grants to apply on acceptance.
	pub project_grants: Vec<ProjectGrantSpec>,

	/// Org-wide grants to apply on acceptance.
	pub org_grants: Option<OrgGrantSpec>,

	/// Lifecycle state.
	pub status: InviteStatus,

	/// Opaque acceptance token.
	pub token: String,

	/// When the invite stops being acceptable.
	pub expires_at: DateTime<Utc>,

	/// When the invite was created.
	pub created_at: DateTime<Utc>,
}

impl Invite {
	/// Returns true if the invite has passed its expiry.
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		now > self.expires_at
	}

	/// Returns true if the invite can still be accepted at the given time.
	pub fn is_acceptable(&self, now: DateTime<Utc>) -> bool {
		self.status == InviteStatus::Pending && !self.is_expired(now)
	}
}
