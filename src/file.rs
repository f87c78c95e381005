//! File containers.
//!
//! A [`File`] is the root of a hierarchy of groups and arrays backed by a store.
//! Its format ([`Format::Zarr`] or [`Format::N5`]) is fixed when it is opened and never changes;
//! its open [`FileMode`] governs every subsequent mutating operation on the hierarchy.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use z5::file::File;
//!
//! // create or open, inferring the format from markers or the path extension
//! let file = File::open("data.n5", "a")?;
//! let group = file.require_group("volumes")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use derive_more::{Deref, Display};
use thiserror::Error;

use crate::{
    attributes::{AttributeCodec, JsonAttributeCodec},
    group::{ContainerContext, Group},
    metadata::{
        n5::{n5_major_version, N5_VERSION},
        zarr::ZarrGroupMetadata,
    },
    node::NodePath,
    storage::{
        meta_key_n5_attributes, meta_key_zarr_array, meta_key_zarr_group,
        store::{FilesystemStore, FilesystemStoreCreateError},
        ReadableWritableListableStorageTraits, StorageError, StorePrefix,
    },
};

/// An on-disk format.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Format {
    /// The Zarr V2 format.
    #[display("Zarr")]
    Zarr,
    /// The N5 format.
    #[display("N5")]
    N5,
}

/// An unknown file mode string.
#[derive(Debug, Error)]
#[error("unknown file mode {0}, must be one of r, r+, a, w, w-, x")]
pub struct UnknownFileModeError(String);

/// A file open mode, following the h5py conventions.
///
/// | Mode       | Open existing | Create new | Mutate |
/// |------------|---------------|------------|--------|
/// | `r`        | yes           | no         | no     |
/// | `r+`       | yes           | no         | yes    |
/// | `a`        | yes           | yes        | yes    |
/// | `w`        | yes (truncate)| yes        | yes    |
/// | `w-` / `x` | no            | yes        | yes    |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileMode {
    /// `r`: read only; the file must exist.
    Read,
    /// `r+`: read and write; the file must exist.
    ReadWrite,
    /// `a`: read and write; the file is created if it does not exist.
    Append,
    /// `w`: read and write; an existing file is truncated.
    Truncate,
    /// `w-` / `x`: read and write; the file must not exist.
    Exclusive,
}

impl FileMode {
    /// Parse a mode string (`r`, `r+`, `a`, `w`, `w-`, or `x`).
    ///
    /// # Errors
    /// Returns an [`UnknownFileModeError`] for any other string.
    pub fn new(mode: &str) -> Result<Self, UnknownFileModeError> {
        match mode {
            "r" => Ok(Self::Read),
            "r+" => Ok(Self::ReadWrite),
            "a" => Ok(Self::Append),
            "w" => Ok(Self::Truncate),
            "w-" | "x" => Ok(Self::Exclusive),
            _ => Err(UnknownFileModeError(mode.to_string())),
        }
    }

    /// Returns true if the mode permits mutation.
    #[must_use]
    pub const fn can_write(self) -> bool {
        !matches!(self, Self::Read)
    }

    /// Returns true if the mode requires the file to exist.
    #[must_use]
    pub const fn must_exist(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Returns true if the mode requires the file to not exist.
    #[must_use]
    pub const fn must_not_exist(self) -> bool {
        matches!(self, Self::Exclusive)
    }

    /// Returns true if the mode truncates an existing file.
    #[must_use]
    pub const fn should_truncate(self) -> bool {
        matches!(self, Self::Truncate)
    }
}

impl std::str::FromStr for FileMode {
    type Err = UnknownFileModeError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        Self::new(mode)
    }
}

/// A file creation or open error.
#[derive(Debug, Error)]
pub enum FileCreateError {
    /// An unknown mode string.
    #[error(transparent)]
    UnknownFileModeError(#[from] UnknownFileModeError),
    /// The file does not exist and the mode requires it to.
    #[error("file {0} does not exist")]
    NotFound(String),
    /// The file exists and the mode requires it to not.
    #[error("file {0} already exists")]
    AlreadyExists(String),
    /// The format was not given and cannot be inferred.
    #[error("cannot infer the file format; none of the format markers are present")]
    CannotInferFormat,
    /// The requested format does not match the existing file.
    #[error("the file is in the {existing} format, not the requested {requested} format")]
    FormatMismatch {
        /// The format of the existing file.
        existing: Format,
        /// The requested format.
        requested: Format,
    },
    /// The format version of the existing file is unsupported.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(String),
    /// A filesystem store creation error.
    #[error(transparent)]
    FilesystemStoreCreateError(#[from] FilesystemStoreCreateError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// A [`File`] builder.
///
/// Configures the open mode, an explicit format, and the attribute codec before opening a
/// container.
#[derive(Debug)]
pub struct FileBuilder {
    mode: FileMode,
    format: Option<Format>,
    attribute_codec: Arc<dyn AttributeCodec>,
}

impl Default for FileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FileBuilder {
    /// Create a new file builder with mode `a` and format inference.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: FileMode::Append,
            format: None,
            attribute_codec: Arc::new(JsonAttributeCodec),
        }
    }

    /// Set the open mode. Defaults to `a`.
    #[must_use]
    pub fn mode(mut self, mode: FileMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the format explicitly.
    ///
    /// Without this, the format is inferred from the existing format markers, or (for
    /// filesystem paths) from a `.zarr`/`.n5` path extension.
    #[must_use]
    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the codec used to encode and decode user attribute documents.
    #[must_use]
    pub fn attribute_codec(mut self, attribute_codec: Arc<dyn AttributeCodec>) -> Self {
        self.attribute_codec = attribute_codec;
        self
    }

    /// Open a container on the filesystem at `path`.
    ///
    /// # Errors
    /// Returns a [`FileCreateError`] if the mode and the state of `path` are incompatible, the
    /// format cannot be inferred, or the store cannot be created.
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<File<FilesystemStore>, FileCreateError> {
        let path = path.as_ref();
        // check the path against the mode before the store touches the filesystem
        if path.exists() && self.mode.must_not_exist() {
            return Err(FileCreateError::AlreadyExists(
                path.to_string_lossy().to_string(),
            ));
        }
        if !path.exists() && self.mode.must_exist() {
            return Err(FileCreateError::NotFound(path.to_string_lossy().to_string()));
        }
        let mut format = self.format;
        if format.is_none() {
            format = match path.extension().and_then(|ext| ext.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("zarr") => Some(Format::Zarr),
                Some(ext) if ext.eq_ignore_ascii_case("n5") => Some(Format::N5),
                _ => None,
            };
        }
        let store = Arc::new(FilesystemStore::new(path)?);
        Self {
            mode: self.mode,
            format,
            attribute_codec: self.attribute_codec,
        }
        .open_store(store)
    }

    /// Open a container over an arbitrary store.
    ///
    /// # Errors
    /// Returns a [`FileCreateError`] if the mode and the state of the store are incompatible or
    /// the format cannot be inferred.
    pub fn open_store<TStorage: ?Sized + ReadableWritableListableStorageTraits>(
        self,
        storage: Arc<TStorage>,
    ) -> Result<File<TStorage>, FileCreateError> {
        let root = NodePath::root();
        let mode = self.mode;

        let existing_format = existing_format(&*storage)?;
        let root_children = storage.list_dir(&StorePrefix::root())?;
        let mut exists = existing_format.is_some()
            || !root_children.prefixes().is_empty()
            || !root_children.keys().is_empty();

        if exists {
            if mode.must_not_exist() {
                return Err(FileCreateError::AlreadyExists(describe_storage(&root)));
            }
            if mode.should_truncate() {
                storage.erase_prefix(&StorePrefix::root())?;
                exists = false;
            }
        }
        if !exists && mode.must_exist() {
            return Err(FileCreateError::NotFound(describe_storage(&root)));
        }

        let format = match (existing_format.filter(|_| exists), self.format) {
            (Some(existing), Some(requested)) if existing != requested => {
                return Err(FileCreateError::FormatMismatch {
                    existing,
                    requested,
                })
            }
            (Some(existing), _) => existing,
            (None, Some(requested)) => requested,
            // an existing container without format markers can only be N5, whose
            // attributes.json may be missing entirely
            (None, None) if exists => Format::N5,
            (None, None) => return Err(FileCreateError::CannotInferFormat),
        };

        if exists && format == Format::N5 {
            check_n5_version(&*storage)?;
        }

        if !exists {
            // write the root marker
            match format {
                Format::Zarr => {
                    let metadata = serde_json::to_vec(&ZarrGroupMetadata::default())
                        .map_err(|err| StorageError::from(err.to_string()))?;
                    storage.set(&meta_key_zarr_group(&root), &metadata)?;
                }
                Format::N5 => {
                    let metadata = serde_json::json!({ "n5": N5_VERSION });
                    let metadata = serde_json::to_vec(&metadata)
                        .map_err(|err| StorageError::from(err.to_string()))?;
                    storage.set(&meta_key_n5_attributes(&root), &metadata)?;
                }
            }
        }

        let context = Arc::new(ContainerContext {
            storage,
            format,
            mode,
            attribute_codec: self.attribute_codec,
        });
        Ok(File {
            root: Group::new_in(context, root),
        })
    }
}

/// Probe the root format markers of a store.
fn existing_format<TStorage: ?Sized + crate::storage::ReadableStorageTraits>(
    storage: &TStorage,
) -> Result<Option<Format>, StorageError> {
    let root = NodePath::root();
    if storage.size_key(&meta_key_zarr_group(&root))?.is_some()
        || storage.size_key(&meta_key_zarr_array(&root))?.is_some()
    {
        Ok(Some(Format::Zarr))
    } else if storage.size_key(&meta_key_n5_attributes(&root))?.is_some() {
        Ok(Some(Format::N5))
    } else {
        Ok(None)
    }
}

/// Reject N5 hierarchies with an unsupported major version.
fn check_n5_version<TStorage: ?Sized + crate::storage::ReadableStorageTraits>(
    storage: &TStorage,
) -> Result<(), FileCreateError> {
    let root = NodePath::root();
    let Some(bytes) = storage.get(&meta_key_n5_attributes(&root))? else {
        return Ok(());
    };
    let Ok(attributes) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        // an empty attributes document carries no version tag
        return Ok(());
    };
    if let Some(tag) = attributes.get("n5").and_then(serde_json::Value::as_str) {
        match n5_major_version(tag) {
            Some(major) if major <= 2 => {}
            _ => return Err(FileCreateError::UnsupportedVersion(tag.to_string())),
        }
    }
    Ok(())
}

fn describe_storage(path: &NodePath) -> String {
    path.as_str().to_string()
}

/// The root of a hierarchy of groups and arrays.
///
/// Dereferences to its root [`Group`], so all group operations are available directly on the
/// file.
#[derive(Debug, Deref)]
pub struct File<TStorage: ?Sized> {
    #[deref]
    root: Group<TStorage>,
}

impl File<FilesystemStore> {
    /// Open a container on the filesystem at `path` with a mode string.
    ///
    /// The format is inferred from the existing format markers or from a `.zarr`/`.n5` path
    /// extension; use [`FileBuilder`] to set it explicitly.
    ///
    /// # Errors
    /// Returns a [`FileCreateError`] if the mode string is unknown, the mode and the state of
    /// `path` are incompatible, or the format cannot be inferred.
    pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> Result<Self, FileCreateError> {
        FileBuilder::new().mode(FileMode::new(mode)?).open(path)
    }
}

impl<TStorage: ?Sized> File<TStorage> {
    /// Get the format of the container.
    #[must_use]
    pub fn format(&self) -> Format {
        self.root.format()
    }

    /// Get the open mode of the container.
    #[must_use]
    pub fn mode(&self) -> FileMode {
        self.root.mode()
    }

    /// Get the root group of the container.
    #[must_use]
    pub const fn root(&self) -> &Group<TStorage> {
        &self.root
    }
}
