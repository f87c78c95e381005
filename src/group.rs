//! Groups.
//!
//! A group is a named node of a hierarchy which may contain child groups and arrays.
//! Groups share ownership of the container's store and carry their own path; a group and an
//! array may not share a name at the same parent.
//!
//! Every mutating operation is checked against the container's open
//! [`FileMode`](crate::file::FileMode) before any store I/O.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    array::{Array, ArrayBuilder, ArrayCreateError, ArrayError},
    attributes::{
        read_attributes, remove_attribute, set_attribute, AttributeCodec, AttributeError,
        AttributeMap,
    },
    file::{FileMode, Format},
    metadata::zarr::ZarrGroupMetadata,
    node::{NodePath, NodePathError},
    storage::{
        meta_key_n5_attributes, meta_key_zarr_array, meta_key_zarr_group,
        ReadableWritableListableStorageTraits, StorageError, StorePrefix,
    },
};

/// The shared state of a container, owned by the [`File`](crate::file::File) and borrowed by
/// every [`Group`] and [`Array`] opened through it.
#[derive(Debug)]
pub(crate) struct ContainerContext<TStorage: ?Sized> {
    pub(crate) format: Format,
    pub(crate) mode: FileMode,
    pub(crate) attribute_codec: Arc<dyn AttributeCodec>,
    pub(crate) storage: Arc<TStorage>,
}

/// The kind of a hierarchy node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// A group.
    Group,
    /// An array.
    Array,
}

/// A hierarchy node: a group or an array.
#[derive(Debug)]
pub enum Node<TStorage: ?Sized> {
    /// A group.
    Group(Group<TStorage>),
    /// An array.
    Array(Array<TStorage>),
}

/// A hierarchy operation error.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// A mutating operation on a container opened without write permission.
    #[error("the container was opened without write permission")]
    PermissionDenied,
    /// The named node does not exist.
    #[error("node {0} does not exist")]
    NotFound(String),
    /// A node with the name already exists.
    #[error("node {0} already exists")]
    AlreadyExists(String),
    /// The existing node is incompatible with the request.
    #[error("incompatible node: {0}")]
    NodeMismatch(String),
    /// An invalid node name or path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An array creation error.
    #[error(transparent)]
    ArrayCreateError(#[from] ArrayCreateError),
    /// An array operation error.
    #[error(transparent)]
    ArrayError(#[from] ArrayError),
    /// An attribute error.
    #[error(transparent)]
    AttributeError(#[from] AttributeError),
}

/// A group of a container.
#[derive(Debug)]
pub struct Group<TStorage: ?Sized> {
    context: Arc<ContainerContext<TStorage>>,
    path: NodePath,
}

impl<TStorage: ?Sized> Group<TStorage> {
    pub(crate) fn new_in(context: Arc<ContainerContext<TStorage>>, path: NodePath) -> Self {
        Self { context, path }
    }

    /// Get the node path of the group.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Get the name of the group (empty for the root group).
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Get the format of the container.
    #[must_use]
    pub fn format(&self) -> Format {
        self.context.format
    }

    /// Get the open mode of the container.
    #[must_use]
    pub fn mode(&self) -> FileMode {
        self.context.mode
    }

    fn check_writable(&self) -> Result<(), HierarchyError> {
        if self.context.mode.can_write() {
            Ok(())
        } else {
            Err(HierarchyError::PermissionDenied)
        }
    }

    /// Resolve a (possibly nested, `/`-separated) child `name` to a node path.
    fn child_path(&self, name: &str) -> Result<NodePath, NodePathError> {
        let mut path = self.path.clone();
        let mut any = false;
        for segment in name.split('/').filter(|segment| !segment.is_empty()) {
            path = path.child(segment)?;
            any = true;
        }
        if any {
            Ok(path)
        } else {
            Err(NodePathError::from_name(name))
        }
    }
}

impl<TStorage: ?Sized + ReadableWritableListableStorageTraits> Group<TStorage> {
    /// Return the kind of the child node `name`, or [`None`] if no such node exists.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if `name` is invalid or on an underlying store error.
    pub fn node_kind(&self, name: &str) -> Result<Option<NodeKind>, HierarchyError> {
        let path = self.child_path(name)?;
        self.node_kind_at(&path)
    }

    fn node_kind_at(&self, path: &NodePath) -> Result<Option<NodeKind>, HierarchyError> {
        let storage = &self.context.storage;
        match self.context.format {
            Format::Zarr => {
                if storage.size_key(&meta_key_zarr_array(path))?.is_some() {
                    return Ok(Some(NodeKind::Array));
                }
                if storage.size_key(&meta_key_zarr_group(path))?.is_some() {
                    return Ok(Some(NodeKind::Group));
                }
            }
            Format::N5 => {
                if let Some(bytes) = storage.get(&meta_key_n5_attributes(path))? {
                    // an array's attributes.json carries the dimensions and dataType keys;
                    // anything else (including an unparseable document) marks a group
                    let kind = serde_json::from_slice::<serde_json::Value>(&bytes)
                        .ok()
                        .filter(|attributes| {
                            attributes.get("dimensions").is_some()
                                && attributes.get("dataType").is_some()
                        })
                        .map_or(NodeKind::Group, |_| NodeKind::Array);
                    return Ok(Some(kind));
                }
            }
        }
        // a directory without metadata is a group in both formats
        let prefix = StorePrefix::try_from(path).map_err(StorageError::from)?;
        let children = storage.list_dir(&prefix)?;
        if children.keys().is_empty() && children.prefixes().is_empty() {
            Ok(None)
        } else {
            Ok(Some(NodeKind::Group))
        }
    }

    /// Returns true if a child node called `name` exists.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if `name` is invalid or on an underlying store error.
    pub fn contains_key(&self, name: &str) -> Result<bool, HierarchyError> {
        Ok(self.node_kind(name)?.is_some())
    }

    /// Return the sorted names of the immediate children of the group.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] on an underlying store error.
    pub fn keys(&self) -> Result<Vec<String>, HierarchyError> {
        let prefix = StorePrefix::try_from(&self.path).map_err(StorageError::from)?;
        let mut names: Vec<String> = self
            .context
            .storage
            .list_dir(&prefix)?
            .prefixes()
            .iter()
            .map(|prefix| prefix.name().to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Visit all descendant nodes recursively, depth first.
    ///
    /// Returns `(relative path, kind)` pairs, sorted within each group.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] on an underlying store error.
    pub fn visit_items(&self) -> Result<Vec<(String, NodeKind)>, HierarchyError> {
        let mut items = Vec::new();
        self.visit_items_into("", &mut items)?;
        Ok(items)
    }

    fn visit_items_into(
        &self,
        prefix: &str,
        items: &mut Vec<(String, NodeKind)>,
    ) -> Result<(), HierarchyError> {
        for name in self.keys()? {
            let Some(kind) = self.node_kind(&name)? else {
                continue;
            };
            let relative_path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            items.push((relative_path.clone(), kind));
            if kind == NodeKind::Group {
                let child = Group::new_in(self.context.clone(), self.child_path(&name)?);
                child.visit_items_into(&relative_path, items)?;
            }
        }
        Ok(())
    }

    /// Open the child node called `name`.
    ///
    /// # Errors
    /// Returns [`HierarchyError::NotFound`] if no such node exists, or a [`HierarchyError`] on
    /// an invalid name or store error.
    pub fn open(&self, name: &str) -> Result<Node<TStorage>, HierarchyError> {
        match self.node_kind(name)? {
            Some(NodeKind::Group) => Ok(Node::Group(self.open_group(name)?)),
            Some(NodeKind::Array) => Ok(Node::Array(self.open_array(name)?)),
            None => Err(HierarchyError::NotFound(name.to_string())),
        }
    }

    /// Open the child group called `name`.
    ///
    /// # Errors
    /// Returns [`HierarchyError::NotFound`] if no such node exists,
    /// [`HierarchyError::NodeMismatch`] if it is an array, or a [`HierarchyError`] on an invalid
    /// name or store error.
    pub fn open_group(&self, name: &str) -> Result<Group<TStorage>, HierarchyError> {
        match self.node_kind(name)? {
            Some(NodeKind::Group) => Ok(Group::new_in(self.context.clone(), self.child_path(name)?)),
            Some(NodeKind::Array) => Err(HierarchyError::NodeMismatch(format!(
                "{name} is an array, not a group"
            ))),
            None => Err(HierarchyError::NotFound(name.to_string())),
        }
    }

    /// Open the child array called `name`.
    ///
    /// # Errors
    /// Returns [`HierarchyError::NotFound`] if no such node exists,
    /// [`HierarchyError::NodeMismatch`] if it is a group, or a [`HierarchyError`] on an invalid
    /// name, invalid metadata, or store error.
    pub fn open_array(&self, name: &str) -> Result<Array<TStorage>, HierarchyError> {
        match self.node_kind(name)? {
            Some(NodeKind::Array) => {
                let path = self.child_path(name)?;
                Ok(Array::open(
                    self.context.storage.clone(),
                    path.as_str(),
                    self.context.format,
                    self.context.mode,
                )?
                .with_attribute_codec(self.context.attribute_codec.clone()))
            }
            Some(NodeKind::Group) => Err(HierarchyError::NodeMismatch(format!(
                "{name} is a group, not an array"
            ))),
            None => Err(HierarchyError::NotFound(name.to_string())),
        }
    }

    /// Create a child group called `name`.
    ///
    /// # Errors
    /// Returns [`HierarchyError::PermissionDenied`] before any store I/O if the container was
    /// opened without write permission, [`HierarchyError::AlreadyExists`] if a node with the
    /// name exists, or a [`HierarchyError`] on an invalid name or store error.
    pub fn create_group(&self, name: &str) -> Result<Group<TStorage>, HierarchyError> {
        self.check_writable()?;
        if self.node_kind(name)?.is_some() {
            return Err(HierarchyError::AlreadyExists(name.to_string()));
        }
        let path = self.child_path(name)?;
        match self.context.format {
            Format::Zarr => {
                let metadata = serde_json::to_vec(&ZarrGroupMetadata::default())
                    .map_err(|err| StorageError::from(err.to_string()))?;
                self.context
                    .storage
                    .set(&meta_key_zarr_group(&path), &metadata)?;
            }
            Format::N5 => {
                // an empty attributes document marks the directory
                self.context
                    .storage
                    .set(&meta_key_n5_attributes(&path), b"{}")?;
            }
        }
        Ok(Group::new_in(self.context.clone(), path))
    }

    /// Open the child group called `name`, creating it if it does not exist.
    ///
    /// # Errors
    /// Returns [`HierarchyError::NodeMismatch`] if the name is held by an array, and the
    /// [`create_group`](Group::create_group) error conditions when creation is needed.
    pub fn require_group(&self, name: &str) -> Result<Group<TStorage>, HierarchyError> {
        match self.node_kind(name)? {
            Some(NodeKind::Group) => self.open_group(name),
            Some(NodeKind::Array) => Err(HierarchyError::NodeMismatch(format!(
                "{name} is an array, not a group"
            ))),
            None => self.create_group(name),
        }
    }

    /// Create a child array called `name` from `builder` and store its metadata.
    ///
    /// # Errors
    /// Returns [`HierarchyError::PermissionDenied`] before any store I/O if the container was
    /// opened without write permission, [`HierarchyError::AlreadyExists`] if a node with the
    /// name exists, or a [`HierarchyError`] on an invalid configuration or store error.
    pub fn create_array(
        &self,
        name: &str,
        builder: ArrayBuilder,
    ) -> Result<Array<TStorage>, HierarchyError> {
        self.check_writable()?;
        if self.node_kind(name)?.is_some() {
            return Err(HierarchyError::AlreadyExists(name.to_string()));
        }
        let path = self.child_path(name)?;
        let array = builder
            .build(
                self.context.storage.clone(),
                path.as_str(),
                self.context.format,
                self.context.mode,
            )?
            .with_attribute_codec(self.context.attribute_codec.clone());
        array.store_metadata()?;
        Ok(array)
    }

    /// Open the child array called `name`, creating it from `builder` if it does not exist.
    ///
    /// When the array exists, its shape is compared against the builder, along with the data
    /// type and (if configured) the chunk shape; a mismatch is a
    /// [`HierarchyError::NodeMismatch`].
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] on a mismatch with an existing node, or the
    /// [`create_array`](Group::create_array) error conditions when creation is needed.
    pub fn require_array(
        &self,
        name: &str,
        builder: ArrayBuilder,
    ) -> Result<Array<TStorage>, HierarchyError> {
        match self.node_kind(name)? {
            Some(NodeKind::Array) => {
                let array = self.open_array(name)?;
                if array.shape() != builder.array_shape() {
                    return Err(HierarchyError::NodeMismatch(format!(
                        "array {name} has shape {:?}, requested {:?}",
                        array.shape(),
                        builder.array_shape()
                    )));
                }
                if *array.data_type() != builder.data_type() {
                    return Err(HierarchyError::NodeMismatch(format!(
                        "array {name} has data type {}, requested {}",
                        array.data_type(),
                        builder.data_type()
                    )));
                }
                if builder.configured_chunk_shape().is_some()
                    && array.chunk_shape() != builder.effective_chunk_shape()
                {
                    return Err(HierarchyError::NodeMismatch(format!(
                        "array {name} has chunk shape {:?}, requested {:?}",
                        array.chunk_shape(),
                        builder.effective_chunk_shape()
                    )));
                }
                Ok(array)
            }
            Some(NodeKind::Group) => Err(HierarchyError::NodeMismatch(format!(
                "{name} is a group, not an array"
            ))),
            None => self.create_array(name, builder),
        }
    }

    /// Delete the child node called `name` recursively.
    ///
    /// Returns true if the node existed.
    ///
    /// # Errors
    /// Returns [`HierarchyError::PermissionDenied`] before any store I/O if the container was
    /// opened without write permission, or a [`HierarchyError`] on an invalid name or store
    /// error.
    pub fn delete(&self, name: &str) -> Result<bool, HierarchyError> {
        self.check_writable()?;
        if self.node_kind(name)?.is_none() {
            return Ok(false);
        }
        let path = self.child_path(name)?;
        let prefix = StorePrefix::try_from(&path).map_err(StorageError::from)?;
        self.context.storage.erase_prefix(&prefix)?;
        Ok(true)
    }

    /// Read the user attributes of the group.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the attribute document is invalid or on an underlying
    /// store error.
    pub fn attributes(&self) -> Result<AttributeMap, HierarchyError> {
        Ok(read_attributes(
            &*self.context.storage,
            self.context.attribute_codec.as_ref(),
            self.context.format,
            &self.path,
        )?)
    }

    /// Set one user attribute of the group.
    ///
    /// # Errors
    /// Returns [`HierarchyError::PermissionDenied`] if the container was opened without write
    /// permission, an [`AttributeError`] for a reserved N5 key, or a [`HierarchyError`] on an
    /// underlying store error.
    pub fn set_attribute(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), HierarchyError> {
        self.check_writable()?;
        Ok(set_attribute(
            &*self.context.storage,
            self.context.attribute_codec.as_ref(),
            self.context.format,
            &self.path,
            key,
            value,
        )?)
    }

    /// Remove one user attribute of the group. Returns true if the attribute existed.
    ///
    /// # Errors
    /// See [`set_attribute`](Group::set_attribute).
    pub fn remove_attribute(&self, key: &str) -> Result<bool, HierarchyError> {
        self.check_writable()?;
        Ok(remove_attribute(
            &*self.context.storage,
            self.context.attribute_codec.as_ref(),
            self.context.format,
            &self.path,
            key,
        )?)
    }
}
