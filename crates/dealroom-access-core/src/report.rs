// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Effective-permission change reports.
//!
//! Member permission updates capture the member's effective permissions
//! before and after the write and return the diff, so callers can show or
//! record what actually changed rather than what was requested.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Permission, ResourceId, UserId};

/// How a resource's effective permission moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
	/// From no access to view or edit.
	Granted,
	/// Between view and edit.
	Changed,
	/// From view or edit to no access.
	Revoked,
}

/// One resource whose effective permission moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChange {
	/// The resource affected.
	pub resource_id: ResourceId,

	/// Effective permission before the update.
	pub before: Permission,

	/// Effective permission after the update.
	pub after: Permission,
}

impl PermissionChange {
	/// Classifies the movement.
	pub fn kind(&self) -> ChangeKind {
		match (self.before.allows_view(), self.after.allows_view()) {
			(false, true) => ChangeKind::Granted,
			(true, false) => ChangeKind::Revoked,
			_ => ChangeKind::Changed,
		}
	}
}

/// Diff of a member's effective permissions across an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionChangeReport {
	/// The member whose permissions were updated.
	pub user_id: UserId,

	/// Every resource whose effective permission moved.
	pub changes: Vec<PermissionChange>,
}

impl PermissionChangeReport {
	/// Diffs two effective-permission maps for a user.
	///
	/// Resources absent from a map count as no access. Unchanged resources
	/// are dropped; the rest are ordered by resource id for stable output.
	pub fn diff(
		user_id: UserId,
		before: &HashMap<ResourceId, Permission>,
		after: &HashMap<ResourceId, Permission>,
	) -> Self {
		let mut ids: Vec<ResourceId> = before.keys().chain(after.keys()).copied().collect();
		ids.sort_by_key(|id| id.to_string());
		ids.dedup();

		let lookup = |map: &HashMap<ResourceId, Permission>, id: &ResourceId| {
			map.get(id).copied().unwrap_or(Permission::None)
		};

		let mut changes = Vec::new();
		for resource_id in ids {
			let before_level = lookup(before, &resource_id);
			let after_level = lookup(after, &resource_id);
			if before_level != after_level {
				changes.push(PermissionChange {
					resource_id,
					before: before_level,
					after: after_level,
				});
			}
		}

		Self { user_id, changes }
	}

	/// Returns true if nothing moved.
	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	/// Changes of the given kind.
	pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &PermissionChange> {
		self.changes.iter().filter(move |c| c.kind() == kind)
	}
}
