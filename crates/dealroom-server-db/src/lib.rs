// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence layer for the Dealroom server.
//!
//! This crate provides repositories over the access-control schema: orgs and
//! their members, projects, document resources, access grants, permission
//! overrides, and invites.
//!
//! # Architecture
//!
//! - `pool` - WAL-mode connection pool setup
//! - `org` - Organizations, users, and memberships
//! - `project` - Projects and advisor assignment
//! - `resource` - Document trees and root containers
//! - `grant` - Blanket access grants and per-resource overrides
//! - `invite` - Membership invites with carried grant payloads
//!
//! Each repository exposes an async store trait (`OrgStore`, `GrantStore`,
//! ...) so callers can depend on the interface rather than SQLite.
//!
//! # Example
//!
//! ```ignore
//! use dealroom_server_db::{create_pool, OrgRepository, OrgStore};
//!
//! let pool = create_pool("sqlite:./dealroom.db").await?;
//! let orgs = OrgRepository::new(pool.clone());
//! let owners = orgs.count_owners(&org_id).await?;
//! ```

pub mod config;
pub mod error;
pub mod grant;
pub mod invite;
pub mod org;
pub mod pool;
pub mod project;
pub mod resource;
pub mod testing;

pub use config::{DatabaseConfig, DatabaseConfigLayer};
pub use error::{DbError, Result};
pub use grant::{GrantRepository, GrantStore};
pub use invite::{InviteRepository, InviteStore};
pub use org::{OrgRepository, OrgStore};
pub use pool::create_pool;
pub use project::{ProjectRepository, ProjectStore};
pub use resource::{ResourceRepository, ResourceStore};
