// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Dealroom document permission system.
//!
//! This crate provides the pure domain model shared by the persistence layer
//! (`dealroom-server-db`) and the service layer (`dealroom-server-access`):
//! typed ids, the permission ladder, the resource tree, directory snapshots,
//! and the precedence resolver.
//!
//! # Overview
//!
//! The permission model combines four fact sources, strictly ordered:
//! - Org owners hold implicit edit on everything their org's projects contain
//! - Explicit per-resource overrides, including deliberate `none` hides
//! - Baseline project access (grants and advisor assignment) with a blanket
//!   level inherited from the governing docs root
//! - No applicable fact: no access
//!
//! Resolution is a pure function over a loaded [`DirectorySnapshot`]; all
//! I/O lives in the other crates.
//!
//! # Example
//!
//! ```
//! use dealroom_access_core::{resolve, Permission, UserId};
//! # use dealroom_access_core::{
//! #     DirectorySnapshot, Organization, EntityType, Project, Resource, ResourceTree,
//! #     ResourceType,
//! # };
//! # use std::collections::HashMap;
//!
//! # let org = Organization::new("Acme Capital", EntityType::Borrower);
//! # let project = Project::new("Main St Refi", org.id);
//! # let root = Resource::new_root(org.id, project.id, ResourceType::ProjectDocsRoot);
//! # let file = Resource::new_child(org.id, project.id, ResourceType::File, root.id, "t12.pdf");
//! # let file_id = file.id;
//! # let snapshot = DirectorySnapshot {
//! #     project,
//! #     members: HashMap::new(),
//! #     grantees: HashMap::new(),
//! #     overrides: HashMap::new(),
//! #     tree: ResourceTree::from_resources(vec![root, file]),
//! #     loaded_at: chrono::Utc::now(),
//! # };
//! let stranger = UserId::generate();
//! assert_eq!(resolve(&stranger, &file_id, &snapshot), Permission::None);
//! ```

pub mod grant;
pub mod org;
pub mod project;
pub mod report;
pub mod resolver;
pub mod resource;
pub mod snapshot;
pub mod types;

pub use grant::{
	FileOverride, Invite, OrgGrantSpec, PermissionGrant, PermissionOverride, ProjectAccessGrant,
	ProjectGrantSpec,
};
pub use org::{OrgMembership, Organization, User};
pub use project::Project;
pub use report::{ChangeKind, PermissionChange, PermissionChangeReport};
pub use resolver::{resolve, resolve_all, resolve_facts, AccessFact};
pub use resource::{Resource, ResourceTree};
pub use snapshot::{AccessFacts, DirectorySnapshot};
pub use types::{
	EntityType, InviteId, InviteStatus, OrgId, OrgRole, Permission, ProjectId, ResourceId,
	ResourceType, UserId,
};
