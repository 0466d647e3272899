// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization and membership types.
//!
//! This module provides:
//! - [`Organization`] - a tenant (borrower org or advisory firm)
//! - [`User`] - a platform identity
//! - [`OrgMembership`] - links users to organizations with roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EntityType, OrgId, OrgRole, UserId};

/// A tenant organization.
///
/// Organizations own projects (deals). Borrower orgs create deals;
/// advisor orgs supply the users assigned to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
	/// Unique identifier for this organization.
	pub id: OrgId,

	/// Display name of the organization.
	pub name: String,

	/// Whether this tenant is a borrower or an advisory firm.
	pub entity_type: EntityType,

	/// When the organization was created.
	pub created_at: DateTime<Utc>,
}

impl Organization {
	/// Creates a new organization with the given name and entity type.
	///
	/// Generates a new org ID and sets created_at to now.
	pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
		Self {
			id: OrgId::generate(),
			name: name.into(),
			entity_type,
			created_at: Utc::now(),
		}
	}
}

/// A platform identity.
///
/// Org role lives on the membership record, not here; a user can belong
/// to several organizations with different roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	/// Unique identifier for this user.
	pub id: UserId,

	/// Login email; unique across the platform and matched against
	/// invite records at acceptance time.
	pub email: String,

	/// Display name shown in member lists.
	pub display_name: String,

	/// When the user was created.
	pub created_at: DateTime<Utc>,
}

impl User {
	/// Creates a new user with the given email and display name.
	///
	/// Generates a new user ID and sets created_at to now.
	pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
		Self {
			id: UserId::generate(),
			email: email.into(),
			display_name: display_name.into(),
			created_at: Utc::now(),
		}
	}
}

/// A user's membership in an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgMembership {
	/// The organization this membership is for.
	pub org_id: OrgId,

	/// The user who is a member.
	pub user_id: UserId,

	/// The user's role within the organization.
	pub role: OrgRole,

	/// When this membership was created.
	pub created_at: DateTime<Utc>,
}

impl OrgMembership {
	/// Creates a new membership with created_at set to now.
	pub fn new(org_id: OrgId, user_id: UserId, role: OrgRole) -> Self {
		Self {
			org_id,
			user_id,
			role,
			created_at: Utc::now(),
		}
	}

	/// Returns true if this membership carries the owner role.
	pub fn is_owner(&self) -> bool {
		self.role == OrgRole::Owner
	}
}
