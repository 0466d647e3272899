// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission resolution engine.
//!
//! This module contains the core [`resolve`] function that computes the
//! effective permission for a (user, resource) pair over a loaded
//! [`DirectorySnapshot`]. It implements a strict precedence chain:
//!
//! 1. **Owner supremacy**: org owners hold edit on everything in their org's
//!    projects; nothing can reduce it
//! 2. **Override authority**: an explicit (user, resource) override is
//!    authoritative, including an explicit `none` hide
//! 3. **Baseline fallthrough**: grant holders and the assigned advisor see
//!    non-overridden resources at the blanket level derived from the
//!    governing docs root (at least view)
//! 4. **No fact**: no access
//!
//! Root containers carry no intrinsic default: their own effective permission
//! follows the same chain, with the container acting as its own governing
//! root. Within the baseline tier the most permissive applicable fact wins;
//! between tiers precedence is strict.
//!
//! All decisions are pure functions with no side effects and no I/O.

use std::collections::HashMap;

use tracing::instrument;

use crate::snapshot::{AccessFacts, DirectorySnapshot};
use crate::types::{OrgRole, Permission, ResourceId, UserId};

/// One applicable fact source for a (user, resource) pair.
///
/// Variants are ordered by precedence tier; the resolver folds the applicable
/// facts by tier first, then by permissiveness within the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFact {
	/// The user owns the resource's organization.
	Owner,
	/// An explicit override is recorded for the pair.
	Override(Permission),
	/// Baseline project access (grant row or advisor assignment) at the
	/// given blanket level.
	Grant(Permission),
	/// Nothing applies.
	NoFact,
}

impl AccessFact {
	/// Precedence tier; lower wins before higher.
	fn tier(&self) -> u8 {
		match self {
			AccessFact::Owner => 0,
			AccessFact::Override(_) => 1,
			AccessFact::Grant(_) => 2,
			AccessFact::NoFact => 3,
		}
	}

	/// The permission this fact yields when it wins.
	fn level(&self) -> Permission {
		match self {
			AccessFact::Owner => Permission::Edit,
			AccessFact::Override(level) => *level,
			AccessFact::Grant(level) => *level,
			AccessFact::NoFact => Permission::None,
		}
	}
}

/// Computes the effective permission for a user on a resource.
///
/// This is the main entry point for permission resolution. Missing or
/// foreign resource ids resolve to [`Permission::None`] rather than
/// erroring, so callers can gate rendering decisions without special-casing
/// deletions.
///
/// # Tracing
///
/// Instrumented at debug level; the decision and the pair's ids are logged
/// for audit purposes.
#[instrument(
	level = "debug",
	skip(snapshot),
	fields(
		user_id = %user_id,
		resource_id = %resource_id,
	)
)]
pub fn resolve(
	user_id: &UserId,
	resource_id: &ResourceId,
	snapshot: &DirectorySnapshot,
) -> Permission {
	let Some(facts) = snapshot.effective_facts_for(user_id, resource_id) else {
		return Permission::None;
	};
	resolve_facts(&facts)
}

/// Folds an extracted fact tuple into the effective permission.
///
/// Pure precedence logic; see the module docs for the chain.
pub fn resolve_facts(facts: &AccessFacts) -> Permission {
	let mut applicable: Vec<AccessFact> = Vec::with_capacity(3);

	if facts.org_role == Some(OrgRole::Owner) {
		applicable.push(AccessFact::Owner);
	}
	if let Some(level) = facts.override_level {
		applicable.push(AccessFact::Override(level));
	}
	if facts.has_grant {
		applicable.push(AccessFact::Grant(blanket_level(facts.root_level)));
	}
	if facts.is_assigned_advisor {
		applicable.push(AccessFact::Grant(blanket_level(facts.root_level)));
	}

	let Some(best_tier) = applicable.iter().map(AccessFact::tier).min() else {
		return AccessFact::NoFact.level();
	};

	applicable
		.iter()
		.filter(|fact| fact.tier() == best_tier)
		.map(AccessFact::level)
		.fold(Permission::None, Permission::most_permissive)
}

/// Runs the resolver over every resource in the snapshot for one user.
///
/// Produces the materialized map the permission cache stores.
pub fn resolve_all(
	user_id: &UserId,
	snapshot: &DirectorySnapshot,
) -> HashMap<ResourceId, Permission> {
	snapshot
		.tree
		.ids()
		.map(|resource_id| (*resource_id, resolve(user_id, resource_id, snapshot)))
		.collect()
}

/// Blanket level for baseline access holders.
///
/// The governing root's recorded row elevates into {view, edit}: an `edit`
/// row widens the blanket, anything else floors to `view`. Absent row or
/// absent governing root also floor to `view`.
fn blanket_level(root_level: Option<Permission>) -> Permission {
	match root_level {
		Some(level) => level.most_permissive(Permission::View),
		None => Permission::View,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::grant::ProjectAccessGrant;
	use crate::project::Project;
	use crate::resource::{Resource, ResourceTree};
	use crate::types::{OrgId, ProjectId, ResourceType};
	use chrono::Utc;
	use proptest::prelude::*;

	/// Test fixture: one org, one project, docs root with folder and file,
	/// plus a borrower docs root.
	struct Fixture {
		snapshot: DirectorySnapshot,
		owner: UserId,
		member: UserId,
		outsider: UserId,
		project_root: ResourceId,
		borrower_root: ResourceId,
		folder: ResourceId,
		file: ResourceId,
	}

	impl Fixture {
		fn new() -> Self {
			let org_id = OrgId::generate();
			let owner = UserId::generate();
			let member = UserId::generate();
			let outsider = UserId::generate();

			let project = Project::new("Warehouse Acquisition", org_id);
			let project_root = Resource::new_root(org_id, project.id, ResourceType::ProjectDocsRoot);
			let borrower_root =
				Resource::new_root(org_id, project.id, ResourceType::BorrowerDocsRoot);
			let folder = Resource::new_child(
				org_id,
				project.id,
				ResourceType::Folder,
				project_root.id,
				"Diligence",
			);
			let file = Resource::new_child(
				org_id,
				project.id,
				ResourceType::File,
				folder.id,
				"appraisal.pdf",
			);

			let mut members = HashMap::new();
			members.insert(owner, OrgRole::Owner);
			members.insert(member, OrgRole::Member);

			let snapshot = DirectorySnapshot {
				project,
				members,
				grantees: HashMap::new(),
				overrides: HashMap::new(),
				tree: ResourceTree::from_resources(vec![
					project_root.clone(),
					borrower_root.clone(),
					folder.clone(),
					file.clone(),
				]),
				loaded_at: Utc::now(),
			};

			Self {
				snapshot,
				owner,
				member,
				outsider,
				project_root: project_root.id,
				borrower_root: borrower_root.id,
				folder: folder.id,
				file: file.id,
			}
		}

		fn grant(&mut self, user: UserId) {
			let grant = ProjectAccessGrant::new(
				self.snapshot.project.id,
				user,
				self.snapshot.project.owner_org_id,
				self.owner,
			);
			self.snapshot.grantees.insert(user, grant);
		}

		fn set_override(&mut self, resource: ResourceId, user: UserId, level: Permission) {
			self.snapshot.overrides.insert((resource, user), level);
		}
	}

	mod owner_supremacy {
		use super::*;

		#[test]
		fn owner_edits_everything() {
			let f = Fixture::new();
			for resource in [f.project_root, f.borrower_root, f.folder, f.file] {
				assert_eq!(
					resolve(&f.owner, &resource, &f.snapshot),
					Permission::Edit
				);
			}
		}

		#[test]
		fn override_cannot_reduce_owner_access() {
			let mut f = Fixture::new();
			f.set_override(f.file, f.owner, Permission::None);
			assert_eq!(resolve(&f.owner, &f.file, &f.snapshot), Permission::Edit);
		}

		#[test]
		fn owner_needs_no_grant() {
			let f = Fixture::new();
			assert!(!f.snapshot.has_grant(&f.owner));
			assert_eq!(resolve(&f.owner, &f.file, &f.snapshot), Permission::Edit);
		}
	}

	mod override_authority {
		use super::*;

		#[test]
		fn explicit_none_suppresses_grant() {
			let mut f = Fixture::new();
			let member = f.member;
			f.grant(member);
			f.set_override(f.file, member, Permission::None);

			assert_eq!(resolve(&member, &f.file, &f.snapshot), Permission::None);
			// Sibling resources keep the blanket.
			assert_eq!(resolve(&member, &f.folder, &f.snapshot), Permission::View);
		}

		#[test]
		fn override_grants_more_than_blanket() {
			let mut f = Fixture::new();
			let member = f.member;
			f.grant(member);
			f.set_override(f.file, member, Permission::Edit);

			assert_eq!(resolve(&member, &f.file, &f.snapshot), Permission::Edit);
		}

		#[test]
		fn override_works_without_any_grant() {
			let mut f = Fixture::new();
			let member = f.member;
			f.set_override(f.file, member, Permission::View);

			assert_eq!(resolve(&member, &f.file, &f.snapshot), Permission::View);
			// No baseline: the rest of the tree stays closed.
			assert_eq!(resolve(&member, &f.folder, &f.snapshot), Permission::None);
		}

		#[test]
		fn root_container_hide_applies_to_the_root_itself() {
			let mut f = Fixture::new();
			let member = f.member;
			f.grant(member);
			f.set_override(f.project_root, member, Permission::None);

			assert_eq!(
				resolve(&member, &f.project_root, &f.snapshot),
				Permission::None
			);
			// Children keep the grant floor; the root row never lowers below view.
			assert_eq!(resolve(&member, &f.file, &f.snapshot), Permission::View);
		}
	}

	mod grant_fallthrough {
		use super::*;

		#[test]
		fn grant_yields_view_floor() {
			let mut f = Fixture::new();
			let member = f.member;
			f.grant(member);

			for resource in [f.project_root, f.borrower_root, f.folder, f.file] {
				assert_eq!(resolve(&member, &resource, &f.snapshot), Permission::View);
			}
		}

		#[test]
		fn edit_root_row_widens_the_blanket() {
			let mut f = Fixture::new();
			let member = f.member;
			f.grant(member);
			f.set_override(f.project_root, member, Permission::Edit);

			assert_eq!(resolve(&member, &f.folder, &f.snapshot), Permission::Edit);
			assert_eq!(resolve(&member, &f.file, &f.snapshot), Permission::Edit);
			// The root row is also the root's own override.
			assert_eq!(
				resolve(&member, &f.project_root, &f.snapshot),
				Permission::Edit
			);
			// The borrower tree is governed by its own root.
			assert_eq!(
				resolve(&member, &f.borrower_root, &f.snapshot),
				Permission::View
			);
		}

		#[test]
		fn advisor_assignment_is_baseline_access() {
			let mut f = Fixture::new();
			let advisor = UserId::generate();
			f.snapshot.project.assigned_advisor_id = Some(advisor);

			assert_eq!(resolve(&advisor, &f.file, &f.snapshot), Permission::View);
		}

		#[test]
		fn advisor_and_grant_merge_most_permissive() {
			let mut f = Fixture::new();
			let advisor = UserId::generate();
			f.snapshot.project.assigned_advisor_id = Some(advisor);
			f.grant(advisor);
			f.set_override(f.project_root, advisor, Permission::Edit);

			assert_eq!(resolve(&advisor, &f.file, &f.snapshot), Permission::Edit);
		}

		#[test]
		fn grant_applies_only_to_resources_in_the_project() {
			let mut f = Fixture::new();
			let member = f.member;
			f.grant(member);

			let foreign = ResourceId::generate();
			assert_eq!(resolve(&member, &foreign, &f.snapshot), Permission::None);
		}
	}

	mod no_fact_default {
		use super::*;

		#[test]
		fn member_without_grant_sees_nothing() {
			let f = Fixture::new();
			for resource in [f.project_root, f.borrower_root, f.folder, f.file] {
				assert_eq!(
					resolve(&f.member, &resource, &f.snapshot),
					Permission::None
				);
			}
		}

		#[test]
		fn outsider_sees_nothing() {
			let f = Fixture::new();
			assert!(f.snapshot.org_role(&f.outsider).is_none());
			assert_eq!(resolve(&f.outsider, &f.file, &f.snapshot), Permission::None);
		}

		#[test]
		fn missing_resource_resolves_to_none() {
			let f = Fixture::new();
			assert_eq!(
				resolve(&f.owner, &ResourceId::generate(), &f.snapshot),
				Permission::None
			);
		}
	}

	mod resolve_all_map {
		use super::*;

		#[test]
		fn covers_every_resource_once() {
			let mut f = Fixture::new();
			let member = f.member;
			f.grant(member);

			let map = resolve_all(&member, &f.snapshot);
			assert_eq!(map.len(), f.snapshot.tree.len());
			assert_eq!(map[&f.file], Permission::View);
			assert_eq!(map[&f.project_root], Permission::View);
		}

		#[test]
		fn matches_pointwise_resolution() {
			let mut f = Fixture::new();
			let member = f.member;
			f.grant(member);
			f.set_override(f.file, member, Permission::Edit);
			f.set_override(f.borrower_root, member, Permission::None);

			let map = resolve_all(&member, &f.snapshot);
			for id in f.snapshot.tree.ids() {
				assert_eq!(map[id], resolve(&member, id, &f.snapshot));
			}
		}
	}

	mod activation_scenario {
		use super::*;

		/// The full lifecycle from the product flow: a member gains project
		/// access, gets hidden from one file, then promoted on it.
		#[test]
		fn member_grant_then_hide_then_promote() {
			let mut f = Fixture::new();
			let member = f.member;

			assert_eq!(resolve(&member, &f.file, &f.snapshot), Permission::None);

			f.grant(member);
			assert_eq!(resolve(&member, &f.file, &f.snapshot), Permission::View);

			f.set_override(f.file, member, Permission::None);
			assert_eq!(resolve(&member, &f.file, &f.snapshot), Permission::None);

			f.set_override(f.file, member, Permission::Edit);
			assert_eq!(resolve(&member, &f.file, &f.snapshot), Permission::Edit);
		}
	}

	mod property_tests {
		use super::*;

		fn arb_permission() -> impl Strategy<Value = Permission> {
			prop_oneof![
				Just(Permission::None),
				Just(Permission::View),
				Just(Permission::Edit),
			]
		}

		fn arb_role() -> impl Strategy<Value = Option<OrgRole>> {
			prop_oneof![
				Just(None),
				Just(Some(OrgRole::Owner)),
				Just(Some(OrgRole::Member)),
			]
		}

		fn arb_facts() -> impl Strategy<Value = AccessFacts> {
			(
				arb_role(),
				proptest::option::of(arb_permission()),
				any::<bool>(),
				any::<bool>(),
				proptest::option::of(arb_permission()),
			)
				.prop_map(
					|(org_role, override_level, has_grant, is_assigned_advisor, root_level)| {
						AccessFacts {
							org_role,
							override_level,
							has_grant,
							is_assigned_advisor,
							root_level,
						}
					},
				)
		}

		proptest! {
			#[test]
			fn owner_always_resolves_to_edit(facts in arb_facts()) {
				let facts = AccessFacts { org_role: Some(OrgRole::Owner), ..facts };
				prop_assert_eq!(resolve_facts(&facts), Permission::Edit);
			}

			#[test]
			fn override_is_authoritative_for_non_owners(
				facts in arb_facts(),
				level in arb_permission(),
			) {
				let facts = AccessFacts {
					org_role: None,
					override_level: Some(level),
					..facts
				};
				prop_assert_eq!(resolve_facts(&facts), level);
			}

			#[test]
			fn baseline_access_is_at_least_view(facts in arb_facts()) {
				let facts = AccessFacts {
					org_role: None,
					override_level: None,
					has_grant: true,
					..facts
				};
				prop_assert!(resolve_facts(&facts) >= Permission::View);
			}

			#[test]
			fn no_fact_resolves_to_none(root_level in proptest::option::of(arb_permission())) {
				let facts = AccessFacts {
					org_role: None,
					override_level: None,
					has_grant: false,
					is_assigned_advisor: false,
					root_level,
				};
				prop_assert_eq!(resolve_facts(&facts), Permission::None);
			}

			#[test]
			fn member_role_alone_confers_nothing(facts in arb_facts()) {
				let facts = AccessFacts {
					org_role: Some(OrgRole::Member),
					override_level: None,
					has_grant: false,
					is_assigned_advisor: false,
					..facts
				};
				prop_assert_eq!(resolve_facts(&facts), Permission::None);
			}
		}
	}
}
