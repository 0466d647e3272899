// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project (deal) type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{OrgId, ProjectId, UserId};

/// A single real-estate deal owned by an organization.
///
/// Every project carries a document subtree rooted at the five fixed root
/// containers (provisioned at creation). Deleting a project cascades to all
/// of its resources, grants, and overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
	/// Unique identifier for this project.
	pub id: ProjectId,

	/// Display name of the deal.
	pub name: String,

	/// The organization that owns this project.
	pub owner_org_id: OrgId,

	/// Advisor user assigned to this deal, if any. The assigned advisor
	/// holds baseline access without an explicit grant row.
	pub assigned_advisor_id: Option<UserId>,

	/// When the project was created.
	pub created_at: DateTime<Utc>,
}

impl Project {
	/// Creates a new project owned by the given organization.
	///
	/// Generates a new project ID and sets created_at to now.
	pub fn new(name: impl Into<String>, owner_org_id: OrgId) -> Self {
		Self {
			id: ProjectId::generate(),
			name: name.into(),
			owner_org_id,
			assigned_advisor_id: None,
			created_at: Utc::now(),
		}
	}

	/// Sets the assigned advisor (builder style).
	pub fn with_advisor(mut self, advisor: UserId) -> Self {
		self.assigned_advisor_id = Some(advisor);
		self
	}
}
