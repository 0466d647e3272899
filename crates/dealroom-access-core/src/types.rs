// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for the document permission system.
//!
//! This module defines the foundational types used throughout the access
//! subsystem:
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs for different entity
//!   types ([`UserId`], [`OrgId`], [`ProjectId`], [`ResourceId`], [`InviteId`])
//!   preventing accidental mixing
//! - **Permission levels**: The totally ordered access ladder ([`Permission`])
//! - **Role enums**: Organization-scoped roles ([`OrgRole`]) and tenant
//!   classification ([`EntityType`])
//! - **Resource types**: Fixed root containers and child node kinds
//!   ([`ResourceType`])
//! - **Invite states**: Lifecycle of a pending membership offer
//!   ([`InviteStatus`])
//!
//! All ID types implement transparent serde serialization (as UUID strings)
//! and provide conversion to/from [`uuid::Uuid`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(OrgId, "Unique identifier for an organization.");
define_id_type!(ProjectId, "Unique identifier for a project (deal).");
define_id_type!(ResourceId, "Unique identifier for a document-tree resource.");
define_id_type!(InviteId, "Unique identifier for a membership invite.");

// =============================================================================
// Permission Levels
// =============================================================================

/// Access level for a (user, resource) pair.
///
/// Totally ordered: `None < View < Edit`. The ordering drives both precedence
/// ("most permissive wins" when aggregating facts at the same tier) and the
/// blanket floor applied to project grant holders.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
	/// No access. As an explicit override this is a deliberate hide,
	/// distinct from the absence of any recorded override.
	#[default]
	None,
	/// Read-only access.
	View,
	/// Full read/write access.
	Edit,
}

impl Permission {
	/// Returns all permission levels, least to most permissive.
	pub fn all() -> &'static [Permission] {
		&[Permission::None, Permission::View, Permission::Edit]
	}

	/// Returns the more permissive of the two levels.
	pub fn most_permissive(self, other: Permission) -> Permission {
		self.max(other)
	}

	/// Returns true if this level allows reading the resource.
	pub fn allows_view(&self) -> bool {
		matches!(self, Permission::View | Permission::Edit)
	}

	/// Returns true if this level allows modifying the resource.
	pub fn allows_edit(&self) -> bool {
		matches!(self, Permission::Edit)
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Permission::None => write!(f, "none"),
			Permission::View => write!(f, "view"),
			Permission::Edit => write!(f, "edit"),
		}
	}
}

// =============================================================================
// Organization Roles
// =============================================================================

/// Roles within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
	/// Full org control; implicit edit on every resource of the org's
	/// projects. Each org keeps at least one owner at all times.
	Owner,
	/// Standard member; access comes from grants and overrides.
	Member,
}

impl OrgRole {
	/// Returns all available organization roles.
	pub fn all() -> &'static [OrgRole] {
		&[OrgRole::Owner, OrgRole::Member]
	}

	/// Returns true if this role has at least the permissions of the given role.
	pub fn has_permission_of(&self, other: &OrgRole) -> bool {
		matches!(
			(self, other),
			(OrgRole::Owner, _) | (OrgRole::Member, OrgRole::Member)
		)
	}
}

impl fmt::Display for OrgRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrgRole::Owner => write!(f, "owner"),
			OrgRole::Member => write!(f, "member"),
		}
	}
}

// =============================================================================
// Entity Types
// =============================================================================

/// Tenant classification for an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
	/// A borrower organization that owns deals.
	Borrower,
	/// An advisory firm whose users are assigned to deals.
	Advisor,
}

impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EntityType::Borrower => write!(f, "borrower"),
			EntityType::Advisor => write!(f, "advisor"),
		}
	}
}

// =============================================================================
// Resource Types
// =============================================================================

/// Kind of a node in a project's document tree.
///
/// The first five are fixed root containers: created once per project with
/// `parent_id = NULL`, never deletable on their own. `Folder` and `File`
/// nodes nest beneath them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
	/// Root container for deal documents.
	ProjectDocsRoot,
	/// Root container for borrower-side documents.
	BorrowerDocsRoot,
	/// Root container holding the project resume.
	ProjectResume,
	/// Root container holding the borrower resume.
	BorrowerResume,
	/// Root container for the generated offering memorandum.
	Om,
	/// User-created folder.
	Folder,
	/// Uploaded file.
	File,
}

impl ResourceType {
	/// Returns the fixed root container types provisioned for every project.
	pub fn roots() -> &'static [ResourceType] {
		&[
			ResourceType::ProjectDocsRoot,
			ResourceType::BorrowerDocsRoot,
			ResourceType::ProjectResume,
			ResourceType::BorrowerResume,
			ResourceType::Om,
		]
	}

	/// Returns true for the fixed root container types.
	pub fn is_root(&self) -> bool {
		matches!(
			self,
			ResourceType::ProjectDocsRoot
				| ResourceType::BorrowerDocsRoot
				| ResourceType::ProjectResume
				| ResourceType::BorrowerResume
				| ResourceType::Om
		)
	}

	/// Returns true for the two docs roots that act as inheritance sources
	/// for the blanket permission of grant holders.
	pub fn is_docs_root(&self) -> bool {
		matches!(
			self,
			ResourceType::ProjectDocsRoot | ResourceType::BorrowerDocsRoot
		)
	}
}

impl fmt::Display for ResourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResourceType::ProjectDocsRoot => write!(f, "PROJECT_DOCS_ROOT"),
			ResourceType::BorrowerDocsRoot => write!(f, "BORROWER_DOCS_ROOT"),
			ResourceType::ProjectResume => write!(f, "PROJECT_RESUME"),
			ResourceType::BorrowerResume => write!(f, "BORROWER_RESUME"),
			ResourceType::Om => write!(f, "OM"),
			ResourceType::Folder => write!(f, "FOLDER"),
			ResourceType::File => write!(f, "FILE"),
		}
	}
}

// =============================================================================
// Invite Status
// =============================================================================

/// Lifecycle state of a membership invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
	/// Created, not yet accepted or revoked.
	Pending,
	/// Accepted; the membership and its grants were applied.
	Accepted,
	/// Withdrawn by an org owner before acceptance.
	Revoked,
}

impl fmt::Display for InviteStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			InviteStatus::Pending => write!(f, "pending"),
			InviteStatus::Accepted => write!(f, "accepted"),
			InviteStatus::Revoked => write!(f, "revoked"),
		}
	}
}
