// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project-scoped snapshot loading.
//!
//! The directory reads everything permission resolution needs for one
//! project (membership, grants, overrides, resource tree) in a single
//! all-or-nothing pass and exposes the result as an immutable snapshot.
//! A failed load never replaces the last good snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dealroom_access_core::{
	resource::ResourceTree, snapshot::DirectorySnapshot, ProjectId, UserId,
};
use dealroom_server_db::{GrantStore, OrgStore, ProjectStore, ResourceStore};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{AccessError, Result};

/// Loads and holds directory snapshots for permission resolution.
pub struct GrantDirectory {
	orgs: Arc<dyn OrgStore>,
	projects: Arc<dyn ProjectStore>,
	resources: Arc<dyn ResourceStore>,
	grants: Arc<dyn GrantStore>,
	last_good: RwLock<Option<Arc<DirectorySnapshot>>>,
}

impl GrantDirectory {
	pub fn new(
		orgs: Arc<dyn OrgStore>,
		projects: Arc<dyn ProjectStore>,
		resources: Arc<dyn ResourceStore>,
		grants: Arc<dyn GrantStore>,
	) -> Self {
		Self {
			orgs,
			projects,
			resources,
			grants,
			last_good: RwLock::new(None),
		}
	}

	/// Load a fresh snapshot for a project.
	///
	/// Reads run concurrently and the snapshot is built only if every read
	/// succeeds. On success the snapshot also becomes the directory's last
	/// good snapshot; on failure the previous one stays in place.
	///
	/// # Errors
	/// `AccessError::NotFound` if the project does not exist, otherwise the
	/// classified database error.
	#[tracing::instrument(level = "debug", skip(self), fields(project_id = %project_id))]
	pub async fn load(&self, project_id: &ProjectId) -> Result<Arc<DirectorySnapshot>> {
		let project = self
			.projects
			.get_project(project_id)
			.await?
			.ok_or_else(|| AccessError::NotFound(format!("Project {project_id} not found")))?;

		let load_result = tokio::try_join!(
			self.orgs.list_members(&project.owner_org_id),
			self.grants.list_grants_for_project(project_id),
			self.grants.list_overrides_for_project(project_id),
			self.resources.list_resources_for_project(project_id),
		);

		let (members, grants, overrides, resources) = match load_result {
			Ok(parts) => parts,
			Err(e) => {
				warn!(project_id = %project_id, error = %e, "directory load failed");
				return Err(e.into());
			}
		};

		let members: HashMap<_, _> = members
			.into_iter()
			.map(|(membership, _)| (membership.user_id, membership.role))
			.collect();
		let grantees: HashMap<_, _> = grants
			.into_iter()
			.map(|grant| (grant.user_id, grant))
			.collect();
		let overrides: HashMap<_, _> = overrides
			.into_iter()
			.map(|o| ((o.resource_id, o.user_id), o.permission))
			.collect();
		let tree = ResourceTree::from_resources(resources);

		let snapshot = Arc::new(DirectorySnapshot {
			project,
			members,
			grantees,
			overrides,
			tree,
			loaded_at: Utc::now(),
		});

		debug!(
			project_id = %project_id,
			members = snapshot.members.len(),
			grantees = snapshot.grantees.len(),
			overrides = snapshot.overrides.len(),
			resources = snapshot.tree.len(),
			"directory snapshot loaded"
		);

		*self.last_good.write().await = Some(snapshot.clone());
		Ok(snapshot)
	}

	/// The most recent successfully loaded snapshot, if any.
	pub async fn snapshot(&self) -> Option<Arc<DirectorySnapshot>> {
		self.last_good.read().await.clone()
	}

	/// Effective permission facts for a user on a resource, from the last
	/// good snapshot.
	pub async fn effective_facts_for(
		&self,
		user_id: &UserId,
		resource_id: &dealroom_access_core::ResourceId,
	) -> Option<dealroom_access_core::snapshot::AccessFacts> {
		let snapshot = self.snapshot().await?;
		snapshot.effective_facts_for(user_id, resource_id)
	}
}
