// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Directory snapshot: the loaded fact set the resolver runs against.
//!
//! A [`DirectorySnapshot`] is the consistent unit produced by one directory
//! load: the project row, the owning org's memberships, the project's access
//! grants, every resource in the project, and every override on those
//! resources. [`DirectorySnapshot::effective_facts_for`] extracts the raw
//! fact tuple for one (user, resource) pair; it never decides precedence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::grant::ProjectAccessGrant;
use crate::project::Project;
use crate::resource::ResourceTree;
use crate::types::{OrgRole, Permission, ProjectId, ResourceId, UserId};

/// Raw facts for one (user, resource) pair, consumed by the resolver.
///
/// Extraction only: whether a fact wins is the resolver's call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFacts {
	/// The user's role in the project's owning org, if a member.
	pub org_role: Option<OrgRole>,

	/// Explicit override recorded for this exact (user, resource) pair.
	pub override_level: Option<Permission>,

	/// Whether the user holds a ProjectAccessGrant on this project.
	pub has_grant: bool,

	/// Whether the user is the project's assigned advisor.
	pub is_assigned_advisor: bool,

	/// The governing docs root's recorded row for this user, if both the
	/// root and the row exist. Feeds the blanket level for grant holders.
	pub root_level: Option<Permission>,
}

/// One consistent directory load for a single project.
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
	/// The project the snapshot covers.
	pub project: Project,

	/// Role by user for the owning organization's members.
	pub members: HashMap<UserId, OrgRole>,

	/// Users holding a ProjectAccessGrant on this project.
	pub grantees: HashMap<UserId, ProjectAccessGrant>,

	/// Explicit overrides on the project's resources.
	pub overrides: HashMap<(ResourceId, UserId), Permission>,

	/// The project's resource tree.
	pub tree: ResourceTree,

	/// When the snapshot was loaded.
	pub loaded_at: DateTime<Utc>,
}

impl DirectorySnapshot {
	/// The project id this snapshot covers.
	pub fn project_id(&self) -> ProjectId {
		self.project.id
	}

	/// The user's role in the owning org, if any.
	pub fn org_role(&self, user_id: &UserId) -> Option<OrgRole> {
		self.members.get(user_id).copied()
	}

	/// Returns true if the user is an owner of the owning org.
	pub fn is_org_owner(&self, user_id: &UserId) -> bool {
		self.org_role(user_id) == Some(OrgRole::Owner)
	}

	/// Returns true if the user holds a grant on this project.
	pub fn has_grant(&self, user_id: &UserId) -> bool {
		self.grantees.contains_key(user_id)
	}

	/// Returns true if the user is the project's assigned advisor.
	pub fn is_assigned_advisor(&self, user_id: &UserId) -> bool {
		self.project.assigned_advisor_id.as_ref() == Some(user_id)
	}

	/// The override recorded for (resource, user), if any.
	pub fn override_for(&self, resource_id: &ResourceId, user_id: &UserId) -> Option<Permission> {
		self.overrides.get(&(*resource_id, *user_id)).copied()
	}

	/// Extracts the raw fact tuple for one (user, resource) pair.
	///
	/// Returns `None` when the resource is not part of this snapshot
	/// (deleted, foreign, or never existed); the resolver maps that to no
	/// access.
	pub fn effective_facts_for(
		&self,
		user_id: &UserId,
		resource_id: &ResourceId,
	) -> Option<AccessFacts> {
		if !self.tree.contains(resource_id) {
			return None;
		}

		let root_level = self
			.tree
			.governing_docs_root(resource_id)
			.and_then(|root| self.override_for(&root.id, user_id));

		Some(AccessFacts {
			org_role: self.org_role(user_id),
			override_level: self.override_for(resource_id, user_id),
			has_grant: self.has_grant(user_id),
			is_assigned_advisor: self.is_assigned_advisor(user_id),
			root_level,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::grant::ProjectAccessGrant;
	use crate::resource::Resource;
	use crate::types::{OrgId, ResourceType};

	fn snapshot_with_tree() -> (DirectorySnapshot, Resource, Resource) {
		let org_id = OrgId::generate();
		let project = Project::new("Test Deal", org_id);
		let root = Resource::new_root(org_id, project.id, ResourceType::ProjectDocsRoot);
		let file = Resource::new_child(
			org_id,
			project.id,
			ResourceType::File,
			root.id,
			"t12.pdf",
		);

		let snapshot = DirectorySnapshot {
			project,
			members: HashMap::new(),
			grantees: HashMap::new(),
			overrides: HashMap::new(),
			tree: ResourceTree::from_resources(vec![root.clone(), file.clone()]),
			loaded_at: Utc::now(),
		};
		(snapshot, root, file)
	}

	#[test]
	fn facts_for_unknown_resource_is_none() {
		let (snapshot, _root, _file) = snapshot_with_tree();
		let user = UserId::generate();
		assert!(snapshot
			.effective_facts_for(&user, &ResourceId::generate())
			.is_none());
	}

	#[test]
	fn facts_reflect_membership_and_grants() {
		let (mut snapshot, _root, file) = snapshot_with_tree();
		let user = UserId::generate();
		snapshot.members.insert(user, OrgRole::Member);
		snapshot.grantees.insert(
			user,
			ProjectAccessGrant::new(
				snapshot.project.id,
				user,
				snapshot.project.owner_org_id,
				UserId::generate(),
			),
		);

		let facts = snapshot.effective_facts_for(&user, &file.id).unwrap();
		assert_eq!(facts.org_role, Some(OrgRole::Member));
		assert!(facts.has_grant);
		assert!(!facts.is_assigned_advisor);
		assert!(facts.override_level.is_none());
		assert!(facts.root_level.is_none());
	}

	#[test]
	fn root_level_comes_from_governing_root_row() {
		let (mut snapshot, root, file) = snapshot_with_tree();
		let user = UserId::generate();
		snapshot
			.overrides
			.insert((root.id, user), Permission::Edit);

		let facts = snapshot.effective_facts_for(&user, &file.id).unwrap();
		assert_eq!(facts.root_level, Some(Permission::Edit));
		// The file's own override slot stays empty.
		assert!(facts.override_level.is_none());
	}

	#[test]
	fn advisor_flag_follows_project_assignment() {
		let (mut snapshot, _root, file) = snapshot_with_tree();
		let advisor = UserId::generate();
		snapshot.project.assigned_advisor_id = Some(advisor);

		let facts = snapshot.effective_facts_for(&advisor, &file.id).unwrap();
		assert!(facts.is_assigned_advisor);
		assert!(!facts.has_grant);
	}
}
