// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Document access control for Dealroom.
//!
//! This crate wires the pure resolver from `dealroom-access-core` to the
//! SQLite stores in `dealroom-server-db`: loading consistent per-project
//! snapshots, caching resolved permissions for a signed-in user, and applying
//! every sanctioned mutation of the underlying facts.
//!
//! # Architecture
//!
//! - `directory` - Per-project snapshot loading over the store traits
//! - `cache` - Materialized permission map for one user with single-flight
//!   loads and a reset generation guard
//! - `service` - Mutations: overrides, grants, memberships, projects,
//!   resources, invites
//! - `error` - Classified error taxonomy shared by all of the above
//!
//! # Example
//!
//! ```ignore
//! use dealroom_server_access::{AccessService, GrantDirectory, PermissionCache};
//!
//! let directory = Arc::new(GrantDirectory::new(orgs, projects, resources, grants));
//! let cache = PermissionCache::new(current_user, directory.clone());
//!
//! // Resolve and pin the user's permissions for one deal.
//! cache.load_permissions_for_project(&project_id).await?;
//! let level = cache.get_permission(&file_id);
//!
//! // Mutate, then reload to observe the change.
//! service.set_override(&file_id, &member_id, Permission::Edit, &owner_id).await?;
//! cache.load_permissions_for_project(&project_id).await?;
//! ```

pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod service;

pub use cache::PermissionCache;
pub use config::{AccessConfig, AccessConfigLayer};
pub use directory::GrantDirectory;
pub use error::{AccessError, Result};
pub use service::{AccessService, BulkGrantOutcome};

// Re-export core types for convenience
pub use dealroom_access_core::*;
