// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource tree: the document hierarchy of a project.
//!
//! A [`Resource`] is one addressable node (root container, folder, or file).
//! [`ResourceTree`] indexes a project's resources for parent/child lookups
//! and the governing-docs-root walk used by the resolver. Pure data; all
//! loading happens elsewhere.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{OrgId, ProjectId, ResourceId, ResourceType};

/// An addressable node in a project's document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
	/// Unique identifier for this resource.
	pub id: ResourceId,

	/// The organization that owns the surrounding project.
	pub org_id: OrgId,

	/// The project this resource belongs to.
	pub project_id: ProjectId,

	/// Node kind; fixed root containers have `parent_id = None`.
	pub resource_type: ResourceType,

	/// Parent node, `None` for root containers.
	pub parent_id: Option<ResourceId>,

	/// Display name (file or folder name; root containers use their type name).
	pub name: String,

	/// When the resource was created.
	pub created_at: DateTime<Utc>,
}

impl Resource {
	/// Creates a new child node (folder or file) under the given parent.
	pub fn new_child(
		org_id: OrgId,
		project_id: ProjectId,
		resource_type: ResourceType,
		parent_id: ResourceId,
		name: impl Into<String>,
	) -> Self {
		Self {
			id: ResourceId::generate(),
			org_id,
			project_id,
			resource_type,
			parent_id: Some(parent_id),
			name: name.into(),
			created_at: Utc::now(),
		}
	}

	/// Creates a root container of the given type for a project.
	pub fn new_root(org_id: OrgId, project_id: ProjectId, resource_type: ResourceType) -> Self {
		Self {
			id: ResourceId::generate(),
			org_id,
			project_id,
			resource_type,
			parent_id: None,
			name: resource_type.to_string(),
			created_at: Utc::now(),
		}
	}

	/// Returns true if this node is one of the fixed root containers.
	pub fn is_root(&self) -> bool {
		self.resource_type.is_root()
	}
}

/// Indexed view over a project's resources.
///
/// Built once per directory load from the full resource listing; lookups are
/// O(1) by id and the child index is precomputed.
#[derive(Debug, Clone, Default)]
pub struct ResourceTree {
	nodes: HashMap<ResourceId, Resource>,
	children: HashMap<ResourceId, Vec<ResourceId>>,
}

impl ResourceTree {
	/// Builds a tree from a flat resource listing.
	pub fn from_resources(resources: Vec<Resource>) -> Self {
		let mut nodes = HashMap::with_capacity(resources.len());
		let mut children: HashMap<ResourceId, Vec<ResourceId>> = HashMap::new();

		for resource in resources {
			if let Some(parent) = resource.parent_id {
				children.entry(parent).or_default().push(resource.id);
			}
			nodes.insert(resource.id, resource);
		}

		Self { nodes, children }
	}

	/// Looks up a resource by id.
	pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
		self.nodes.get(id)
	}

	/// Returns true if the tree contains the given id.
	pub fn contains(&self, id: &ResourceId) -> bool {
		self.nodes.contains_key(id)
	}

	/// Direct children of a node.
	pub fn children_of(&self, id: &ResourceId) -> &[ResourceId] {
		self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
	}

	/// All node ids in the tree, in no particular order.
	pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
		self.nodes.keys()
	}

	/// All nodes in the tree, in no particular order.
	pub fn resources(&self) -> impl Iterator<Item = &Resource> {
		self.nodes.values()
	}

	/// The root container of the given type, if the project has one.
	pub fn root_of_type(&self, resource_type: ResourceType) -> Option<&Resource> {
		self.nodes
			.values()
			.find(|r| r.parent_id.is_none() && r.resource_type == resource_type)
	}

	/// Number of nodes in the tree.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Returns true if the tree holds no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Walks the parent chain to the docs root that governs inheritance for
	/// this node.
	///
	/// Starts at the node itself, so a docs root governs itself. Nodes of any
	/// other type, including the resume containers, are passed through. A
	/// visited set guards against parent cycles in corrupt data; a dangling
	/// `parent_id` or a chain that never reaches a docs root yields `None`.
	pub fn governing_docs_root(&self, id: &ResourceId) -> Option<&Resource> {
		let mut visited = HashSet::new();
		let mut current = self.nodes.get(id)?;

		loop {
			if current.resource_type.is_docs_root() {
				return Some(current);
			}
			if !visited.insert(current.id) {
				return None;
			}
			current = self.nodes.get(&current.parent_id?)?;
		}
	}

	/// All descendant ids of a node, excluding the node itself.
	pub fn descendants_of(&self, id: &ResourceId) -> Vec<ResourceId> {
		let mut result = Vec::new();
		let mut queue: Vec<ResourceId> = self.children_of(id).to_vec();
		let mut seen: HashSet<ResourceId> = queue.iter().copied().collect();

		while let Some(next) = queue.pop() {
			result.push(next);
			for child in self.children_of(&next) {
				if seen.insert(*child) {
					queue.push(*child);
				}
			}
		}

		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn project_context() -> (OrgId, ProjectId) {
		(OrgId::generate(), ProjectId::generate())
	}

	fn sample_tree() -> (ResourceTree, Resource, Resource, Resource) {
		let (org_id, project_id) = project_context();
		let root = Resource::new_root(org_id, project_id, ResourceType::ProjectDocsRoot);
		let folder = Resource::new_child(
			org_id,
			project_id,
			ResourceType::Folder,
			root.id,
			"Financials",
		);
		let file = Resource::new_child(
			org_id,
			project_id,
			ResourceType::File,
			folder.id,
			"rent-roll.xlsx",
		);

		let tree = ResourceTree::from_resources(vec![root.clone(), folder.clone(), file.clone()]);
		(tree, root, folder, file)
	}

	mod lookups {
		use super::*;

		#[test]
		fn get_and_contains() {
			let (tree, root, _folder, file) = sample_tree();
			assert!(tree.contains(&root.id));
			assert_eq!(tree.get(&file.id).unwrap().name, "rent-roll.xlsx");
			assert!(tree.get(&ResourceId::generate()).is_none());
		}

		#[test]
		fn children_are_indexed() {
			let (tree, root, folder, file) = sample_tree();
			assert_eq!(tree.children_of(&root.id), &[folder.id]);
			assert_eq!(tree.children_of(&folder.id), &[file.id]);
			assert!(tree.children_of(&file.id).is_empty());
		}

		#[test]
		fn root_of_type_finds_container() {
			let (tree, root, _folder, _file) = sample_tree();
			let found = tree.root_of_type(ResourceType::ProjectDocsRoot).unwrap();
			assert_eq!(found.id, root.id);
			assert!(tree.root_of_type(ResourceType::BorrowerDocsRoot).is_none());
		}

		#[test]
		fn descendants_cover_the_subtree() {
			let (tree, root, folder, file) = sample_tree();
			let mut descendants = tree.descendants_of(&root.id);
			descendants.sort_by_key(|id| id.to_string());
			let mut expected = vec![folder.id, file.id];
			expected.sort_by_key(|id| id.to_string());
			assert_eq!(descendants, expected);
		}
	}

	mod governing_root {
		use super::*;

		#[test]
		fn file_resolves_through_folder_to_docs_root() {
			let (tree, root, _folder, file) = sample_tree();
			let governing = tree.governing_docs_root(&file.id).unwrap();
			assert_eq!(governing.id, root.id);
		}

		#[test]
		fn docs_root_governs_itself() {
			let (tree, root, _folder, _file) = sample_tree();
			let governing = tree.governing_docs_root(&root.id).unwrap();
			assert_eq!(governing.id, root.id);
		}

		#[test]
		fn resume_container_is_passed_through() {
			let (org_id, project_id) = project_context();
			let docs_root = Resource::new_root(org_id, project_id, ResourceType::BorrowerDocsRoot);
			let resume = Resource {
				parent_id: Some(docs_root.id),
				..Resource::new_root(org_id, project_id, ResourceType::BorrowerResume)
			};
			let file = Resource::new_child(
				org_id,
				project_id,
				ResourceType::File,
				resume.id,
				"resume.pdf",
			);

			let tree =
				ResourceTree::from_resources(vec![docs_root.clone(), resume, file.clone()]);
			let governing = tree.governing_docs_root(&file.id).unwrap();
			assert_eq!(governing.id, docs_root.id);
		}

		#[test]
		fn standalone_root_has_no_governing_docs_root() {
			let (org_id, project_id) = project_context();
			let om_root = Resource::new_root(org_id, project_id, ResourceType::Om);
			let file = Resource::new_child(
				org_id,
				project_id,
				ResourceType::File,
				om_root.id,
				"om.pdf",
			);

			let tree = ResourceTree::from_resources(vec![om_root, file.clone()]);
			assert!(tree.governing_docs_root(&file.id).is_none());
		}

		#[test]
		fn dangling_parent_yields_none() {
			let (org_id, project_id) = project_context();
			let orphan = Resource::new_child(
				org_id,
				project_id,
				ResourceType::File,
				ResourceId::generate(),
				"lost.pdf",
			);
			let tree = ResourceTree::from_resources(vec![orphan.clone()]);
			assert!(tree.governing_docs_root(&orphan.id).is_none());
		}

		#[test]
		fn parent_cycle_terminates() {
			let (org_id, project_id) = project_context();
			let mut a = Resource::new_child(
				org_id,
				project_id,
				ResourceType::Folder,
				ResourceId::generate(),
				"a",
			);
			let mut b = Resource::new_child(
				org_id,
				project_id,
				ResourceType::Folder,
				ResourceId::generate(),
				"b",
			);
			a.parent_id = Some(b.id);
			b.parent_id = Some(a.id);

			let tree = ResourceTree::from_resources(vec![a.clone(), b]);
			assert!(tree.governing_docs_root(&a.id).is_none());
		}

		#[test]
		fn missing_id_yields_none() {
			let (tree, _root, _folder, _file) = sample_tree();
			assert!(tree.governing_docs_root(&ResourceId::generate()).is_none());
		}
	}
}
