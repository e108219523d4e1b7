//! Containers
//!
//! A container is a hierarchical configuration scope: it holds installed
//! beans, activated extensions, and ordered child containers. The tree is
//! acyclic by construction since children are only ever attached through
//! [`ContainerTree::add_child`], which links one direction at build time.
//!
//! Containers exist only during the build phase; the graph resolver
//! consumes their wiring and the tree is discarded afterwards.

use crate::bean::{Bean, BeanId};
use crate::error::{Error, Result};

/// Identifier of a container within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(usize);

impl ContainerId {
    /// The underlying tree index
    pub fn index(self) -> usize {
        self.0
    }
}

/// One configuration scope in the tree
#[derive(Debug)]
pub struct Container {
    name: String,
    parent: Option<ContainerId>,
    children: Vec<ContainerId>,
    beans: Vec<BeanId>,
    extensions: Vec<String>,
}

impl Container {
    fn new(name: String, parent: Option<ContainerId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            beans: Vec::new(),
            extensions: Vec::new(),
        }
    }

    /// Container name, used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent container, `None` for the root
    pub fn parent(&self) -> Option<ContainerId> {
        self.parent
    }

    /// Ordered child containers
    pub fn children(&self) -> &[ContainerId] {
        &self.children
    }

    /// Installed beans, in declaration order
    pub fn beans(&self) -> &[BeanId] {
        &self.beans
    }

    /// Activated extension names
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether an extension is active in this scope
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e == name)
    }
}

/// The container forest for one application build
///
/// Owns every container and every installed bean. Beans are stored here so
/// the whole build-time model travels as one value into the resolver.
#[derive(Debug)]
pub struct ContainerTree {
    containers: Vec<Container>,
    beans: Vec<Bean>,
    root: ContainerId,
}

impl ContainerTree {
    /// Create a tree with a single root container
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            containers: vec![Container::new(root_name.into(), None)],
            beans: Vec::new(),
            root: ContainerId(0),
        }
    }

    /// The root container
    pub fn root(&self) -> ContainerId {
        self.root
    }

    /// Attach a new child container under `parent`
    pub fn add_child(
        &mut self,
        parent: ContainerId,
        name: impl Into<String>,
    ) -> Result<ContainerId> {
        self.container(parent)?;
        let id = ContainerId(self.containers.len());
        self.containers.push(Container::new(name.into(), Some(parent)));
        self.containers[parent.index()].children.push(id);
        Ok(id)
    }

    /// Borrow a container
    pub fn container(&self, id: ContainerId) -> Result<&Container> {
        self.containers
            .get(id.index())
            .ok_or_else(|| Error::internal(format!("unknown container id {}", id.index())))
    }

    /// Install a bean into a container, in declaration order
    pub fn install_bean(&mut self, container: ContainerId, bean: Bean) -> Result<BeanId> {
        self.container(container)?;
        let id = BeanId::new(self.beans.len());
        self.beans.push(bean);
        self.containers[container.index()].beans.push(id);
        Ok(id)
    }

    /// Activate an extension in a container's scope
    pub fn activate_extension(
        &mut self,
        container: ContainerId,
        name: impl Into<String>,
    ) -> Result<()> {
        self.container(container)?;
        self.containers[container.index()].extensions.push(name.into());
        Ok(())
    }

    /// Borrow a bean
    pub fn bean(&self, id: BeanId) -> Result<&Bean> {
        self.beans
            .get(id.index())
            .ok_or_else(|| Error::internal(format!("unknown bean id {}", id.index())))
    }

    /// Mutably borrow a bean
    pub fn bean_mut(&mut self, id: BeanId) -> Result<&mut Bean> {
        self.beans
            .get_mut(id.index())
            .ok_or_else(|| Error::internal(format!("unknown bean id {}", id.index())))
    }

    /// Number of installed beans across all containers
    pub fn bean_count(&self) -> usize {
        self.beans.len()
    }

    /// Depth-first walk of the tree: each container before its children,
    /// siblings in declaration order
    pub fn walk(&self) -> Vec<ContainerId> {
        let mut order = Vec::with_capacity(self.containers.len());
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            order.push(id);
            for &child in self.containers[id.index()].children.iter().rev() {
                pending.push(child);
            }
        }
        order
    }

    /// All beans across the tree in walk order
    pub fn beans_in_walk_order(&self) -> Vec<BeanId> {
        self.walk()
            .into_iter()
            .flat_map(|c| self.containers[c.index()].beans.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::{Bean, BeanSource, Instantiation};
    use crate::key::BindingKey;
    use std::sync::Arc;

    fn stub_bean() -> Bean {
        Bean::new(
            BindingKey::named("stub"),
            Instantiation::Unmanaged,
            BeanSource::Instance(Arc::new(())),
        )
    }

    #[test]
    fn test_walk_is_depth_first_declaration_order() {
        let mut tree = ContainerTree::new("root");
        let a = tree.add_child(tree.root(), "a").unwrap();
        let b = tree.add_child(tree.root(), "b").unwrap();
        let a1 = tree.add_child(a, "a1").unwrap();

        let names: Vec<&str> = tree
            .walk()
            .into_iter()
            .map(|id| tree.container(id).unwrap().name())
            .collect();
        assert_eq!(names, vec!["root", "a", "a1", "b"]);
        assert_eq!(tree.container(a1).unwrap().parent(), Some(a));
        assert_eq!(tree.container(b).unwrap().parent(), Some(tree.root()));
    }

    #[test]
    fn test_beans_keep_declaration_order() {
        let mut tree = ContainerTree::new("root");
        let child = tree.add_child(tree.root(), "child").unwrap();
        let first = tree.install_bean(tree.root(), stub_bean()).unwrap();
        let second = tree.install_bean(child, stub_bean()).unwrap();
        let third = tree.install_bean(tree.root(), stub_bean()).unwrap();

        assert_eq!(tree.beans_in_walk_order(), vec![first, third, second]);
    }

    #[test]
    fn test_extension_activation_is_scoped() {
        let mut tree = ContainerTree::new("root");
        let child = tree.add_child(tree.root(), "child").unwrap();
        tree.activate_extension(child, "lifecycle").unwrap();

        assert!(tree.container(child).unwrap().has_extension("lifecycle"));
        assert!(!tree.container(tree.root()).unwrap().has_extension("lifecycle"));
    }
}
