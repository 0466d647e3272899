// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.create_if_missing(true);

	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool")
}

pub async fn create_orgs_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS orgs (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL,
			entity_type TEXT NOT NULL,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn create_users_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS users (
			id TEXT PRIMARY KEY,
			email TEXT UNIQUE NOT NULL,
			display_name TEXT NOT NULL,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn create_org_members_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS org_members (
			org_id TEXT NOT NULL REFERENCES orgs(id) ON DELETE CASCADE,
			user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
			role TEXT NOT NULL,
			created_at TEXT NOT NULL,
			PRIMARY KEY (org_id, user_id)
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn create_projects_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS projects (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL,
			owner_org_id TEXT NOT NULL REFERENCES orgs(id) ON DELETE CASCADE,
			assigned_advisor_id TEXT,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn create_resources_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS resources (
			id TEXT PRIMARY KEY,
			org_id TEXT NOT NULL,
			project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
			resource_type TEXT NOT NULL,
			parent_id TEXT,
			name TEXT NOT NULL,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_resources_project_id ON resources(project_id)")
		.execute(pool)
		.await
		.unwrap();
}

pub async fn create_permissions_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS permissions (
			resource_id TEXT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
			user_id TEXT NOT NULL,
			permission TEXT NOT NULL,
			granted_by TEXT NOT NULL,
			updated_at TEXT NOT NULL,
			PRIMARY KEY (resource_id, user_id)
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_permissions_user_id ON permissions(user_id)")
		.execute(pool)
		.await
		.unwrap();
}

pub async fn create_project_access_grants_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS project_access_grants (
			project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
			user_id TEXT NOT NULL,
			org_id TEXT NOT NULL,
			granted_by TEXT NOT NULL,
			created_at TEXT NOT NULL,
			PRIMARY KEY (project_id, user_id)
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_project_access_grants_user_id ON project_access_grants(user_id)",
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn create_invites_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS invites (
			id TEXT PRIMARY KEY,
			org_id TEXT NOT NULL REFERENCES orgs(id) ON DELETE CASCADE,
			invited_by TEXT NOT NULL,
			invited_email TEXT NOT NULL,
			role TEXT NOT NULL,
			project_grants TEXT NOT NULL,
			org_grants TEXT,
			status TEXT NOT NULL,
			token TEXT UNIQUE NOT NULL,
			expires_at TEXT NOT NULL,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_invites_org_id ON invites(org_id)")
		.execute(pool)
		.await
		.unwrap();
}

/// Pool with every table the access subsystem touches. Most integration-style
/// tests want this one.
pub async fn create_access_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_orgs_table(&pool).await;
	create_users_table(&pool).await;
	create_org_members_table(&pool).await;
	create_projects_table(&pool).await;
	create_resources_table(&pool).await;
	create_permissions_table(&pool).await;
	create_project_access_grants_table(&pool).await;
	create_invites_table(&pool).await;
	pool
}

pub async fn create_org_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_orgs_table(&pool).await;
	create_users_table(&pool).await;
	create_org_members_table(&pool).await;
	pool
}

pub async fn create_project_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_orgs_table(&pool).await;
	create_users_table(&pool).await;
	create_projects_table(&pool).await;
	create_resources_table(&pool).await;
	create_permissions_table(&pool).await;
	create_project_access_grants_table(&pool).await;
	pool
}
