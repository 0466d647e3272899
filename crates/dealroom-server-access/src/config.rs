// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access service configuration.

use chrono::Duration;
use serde::Deserialize;

/// Service configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct AccessConfig {
	/// How long an invite stays acceptable after creation.
	pub invite_expiry: Duration,
}

impl Default for AccessConfig {
	fn default() -> Self {
		Self {
			invite_expiry: Duration::days(7),
		}
	}
}

/// Service configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessConfigLayer {
	#[serde(default)]
	pub invite_expiry_days: Option<i64>,
}

impl AccessConfigLayer {
	pub fn merge(&mut self, other: AccessConfigLayer) {
		if other.invite_expiry_days.is_some() {
			self.invite_expiry_days = other.invite_expiry_days;
		}
	}

	pub fn finalize(self) -> AccessConfig {
		AccessConfig {
			invite_expiry: Duration::days(self.invite_expiry_days.unwrap_or(7)),
		}
	}
}
