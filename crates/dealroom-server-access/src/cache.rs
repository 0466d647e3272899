// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-project permission cache for the signed-in user.
//!
//! Activating a project loads the directory and resolves every resource
//! once, materializing a resource-to-permission map that render paths can
//! query synchronously. The cache is a snapshot: after a mutation the
//! caller re-triggers a load.
//!
//! Overlapping loads for the same project collapse to one in-flight load;
//! later callers await the first call's outcome. A reset during a load
//! bumps the generation counter, and the load discards its result instead
//! of committing stale state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dealroom_access_core::{resolver, Permission, ProjectId, ResourceId, UserId};
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::directory::GrantDirectory;
use crate::error::{AccessError, Result};

type LoadOutcome = std::result::Result<(), AccessError>;

struct CacheState {
	active_project: Option<ProjectId>,
	permissions: HashMap<ResourceId, Permission>,
}

/// Materialized permissions for the current user on the active project.
pub struct PermissionCache {
	user_id: UserId,
	directory: Arc<GrantDirectory>,
	state: RwLock<CacheState>,
	generation: AtomicU64,
	in_flight: Mutex<HashMap<ProjectId, watch::Receiver<Option<LoadOutcome>>>>,
}

impl PermissionCache {
	pub fn new(user_id: UserId, directory: Arc<GrantDirectory>) -> Self {
		Self {
			user_id,
			directory,
			state: RwLock::new(CacheState {
				active_project: None,
				permissions: HashMap::new(),
			}),
			generation: AtomicU64::new(0),
			in_flight: Mutex::new(HashMap::new()),
		}
	}

	/// Load the directory for a project and resolve every resource for the
	/// current user.
	///
	/// Safe to call repeatedly; a call that arrives while a load for the
	/// same project is outstanding awaits that load's outcome instead of
	/// starting another.
	#[tracing::instrument(level = "debug", skip(self), fields(user_id = %self.user_id, project_id = %project_id))]
	pub async fn load_permissions_for_project(&self, project_id: &ProjectId) -> Result<()> {
		let mut leader_tx = None;
		let mut rx = {
			let mut in_flight = self.in_flight.lock().await;
			match in_flight.get(project_id) {
				Some(rx) => rx.clone(),
				None => {
					let (tx, rx) = watch::channel(None);
					in_flight.insert(*project_id, rx.clone());
					leader_tx = Some(tx);
					rx
				}
			}
		};

		let Some(tx) = leader_tx else {
			debug!(project_id = %project_id, "joining in-flight permission load");
			loop {
				if let Some(outcome) = rx.borrow_and_update().clone() {
					return outcome;
				}
				if rx.changed().await.is_err() {
					return Err(AccessError::Transient(
						"Shared permission load abandoned".to_string(),
					));
				}
			}
		};

		let started_generation = self.generation.load(Ordering::Acquire);
		let outcome = self.run_load(project_id, started_generation).await;

		self.in_flight.lock().await.remove(project_id);
		let _ = tx.send(Some(outcome.clone()));
		outcome
	}

	async fn run_load(&self, project_id: &ProjectId, started_generation: u64) -> LoadOutcome {
		let snapshot = self.directory.load(project_id).await?;
		let permissions = resolver::resolve_all(&self.user_id, &snapshot);

		let mut state = self.write_state();
		if self.generation.load(Ordering::Acquire) != started_generation {
			debug!(project_id = %project_id, "discarding superseded permission load");
			return Ok(());
		}

		debug!(
			project_id = %project_id,
			resources = permissions.len(),
			"permission cache populated"
		);
		state.active_project = Some(*project_id);
		state.permissions = permissions;
		Ok(())
	}

	/// Cached permission for a resource.
	///
	/// `None` means "unknown": nothing loaded yet, or the resource is not
	/// part of the active project. Callers must treat that as undecided
	/// rather than as denied; a known-but-forbidden resource comes back as
	/// `Some(Permission::None)`.
	pub fn get_permission(&self, resource_id: &ResourceId) -> Option<Permission> {
		self.read_state().permissions.get(resource_id).copied()
	}

	/// The project the cache currently holds permissions for.
	pub fn active_project(&self) -> Option<ProjectId> {
		self.read_state().active_project
	}

	/// Clear the cache, called on project deactivation or sign-out.
	///
	/// Any load still in flight observes the generation bump and discards
	/// its result.
	pub fn reset_permissions(&self) {
		self.generation.fetch_add(1, Ordering::AcqRel);
		let mut state = self.write_state();
		state.active_project = None;
		state.permissions.clear();
		debug!(user_id = %self.user_id, "permission cache reset");
	}

	fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
		self.state.read().unwrap_or_else(|e| e.into_inner())
	}

	fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
		self.state.write().unwrap_or_else(|e| e.into_inner())
	}
}
