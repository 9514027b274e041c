//! The group hierarchy (spec §4.9): a tree of groups and arrays addressed by slash-delimited
//! paths sharing a single store, each group a bare `.zgroup` prefix whose children are
//! discovered by prefix-scanning rather than an explicit child list.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::array::{Array, OpenMode};
use crate::attributes::Attributes;
use crate::config::ZarrConfig;
use crate::error::{ZarrError, ZarrResult};
use crate::metadata::array::ArrayMetadata;
use crate::metadata::group::GroupMetadata;
use crate::metadata::{encode_metadata, DataType};
use crate::paths::{immediate_child, join, node_key, normalize_path, ARRAY_DESCRIPTOR_KEY, GROUP_DESCRIPTOR_KEY};
use crate::storage::Store;
use crate::sync::Synchroniser;

/// Whether an immediate child discovered during enumeration is an array or a group.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum NodeKind {
    /// The child has a `.zarray` descriptor.
    Array,
    /// The child has a `.zgroup` descriptor.
    Group,
}

/// A node resolved by [`Group::get`]: an array or a nested group.
#[derive(Debug)]
pub enum Node {
    /// A child array.
    Array(Array),
    /// A child group.
    Group(Group),
}

/// A group: a namespace node in the hierarchy, holding arrays and sub-groups.
#[derive(Debug)]
pub struct Group {
    store: Arc<dyn Store>,
    path: String,
    read_only: bool,
    synchroniser: Option<Arc<dyn Synchroniser>>,
    config: ZarrConfig,
}

fn ensure_path_available(store: &Arc<dyn Store>, path: &str) -> ZarrResult<()> {
    let mut prefix = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        prefix = if prefix.is_empty() { segment.to_string() } else { format!("{prefix}/{segment}") };
        if prefix != path && store.contains(&node_key(&prefix, ARRAY_DESCRIPTOR_KEY)?)? {
            return Err(ZarrError::ContainerExists(path.to_string()));
        }
    }
    if store.contains(&node_key(path, ARRAY_DESCRIPTOR_KEY)?)? || store.contains(&node_key(path, GROUP_DESCRIPTOR_KEY)?)? {
        return Err(ZarrError::ContainerExists(path.to_string()));
    }
    Ok(())
}

impl Group {
    /// Create a new group at `path`, writing its descriptor and empty attributes.
    ///
    /// # Errors
    /// Returns [`ZarrError::ContainerExists`] if a group or array already occupies `path`
    /// or any of its ancestors, or a storage error.
    pub fn create(store: Arc<dyn Store>, path: impl Into<String>, config: ZarrConfig) -> ZarrResult<Self> {
        let path = normalize_path(&path.into())?;
        ensure_path_available(&store, &path)?;
        store.set(&node_key(&path, GROUP_DESCRIPTOR_KEY)?, &encode_metadata(&GroupMetadata::default())?)?;
        let attrs_key = node_key(&path, crate::paths::ATTRIBUTES_KEY)?;
        if store.get(&attrs_key)?.is_none() {
            store.set(&attrs_key, b"{}")?;
        }
        Ok(Self {
            store,
            path,
            read_only: false,
            synchroniser: None,
            config,
        })
    }

    /// Open an existing group at `path`.
    ///
    /// # Errors
    /// Returns [`ZarrError::KeyNotFound`] if no `.zgroup` descriptor exists at `path`.
    pub fn open(store: Arc<dyn Store>, path: impl Into<String>, read_only: bool, config: ZarrConfig) -> ZarrResult<Self> {
        let path = normalize_path(&path.into())?;
        if !store.contains(&node_key(&path, GROUP_DESCRIPTOR_KEY)?)? {
            return Err(ZarrError::KeyNotFound(path));
        }
        Ok(Self {
            store,
            path,
            read_only,
            synchroniser: None,
            config,
        })
    }

    /// Attach a synchroniser for per-chunk and per-attributes mutual exclusion (spec §4.11).
    #[must_use]
    pub fn with_synchroniser(mut self, synchroniser: Arc<dyn Synchroniser>) -> Self {
        self.synchroniser = Some(synchroniser);
        self
    }

    /// The path this group is bound to (`""` for the root group).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true if this handle was opened read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// This group's attributes document.
    #[must_use]
    pub fn attributes(&self) -> Attributes {
        let attrs = Attributes::new(self.store.clone(), self.path.clone(), self.read_only, false);
        match &self.synchroniser {
            Some(s) => attrs.with_synchroniser(s.clone()),
            None => attrs,
        }
    }

    /// Create a sub-group named `name`.
    ///
    /// # Errors
    /// Returns [`ZarrError::ContainerExists`] if a group or array already occupies the
    /// resulting path or any of its ancestors, or [`ZarrError::InvalidPath`] if `name` is
    /// malformed.
    pub fn create_group(&self, name: &str) -> ZarrResult<Self> {
        let path = join(&self.path, name)?;
        let mut group = Self::create(self.store.clone(), path, self.config.clone())?;
        group.read_only = self.read_only;
        if let Some(s) = &self.synchroniser {
            group = group.with_synchroniser(s.clone());
        }
        Ok(group)
    }

    /// Return the sub-group named `name`, creating it (and any missing intermediate
    /// sub-groups along the way) if it does not already exist.
    ///
    /// # Errors
    /// Returns [`ZarrError::ContainerExists`] if an array occupies any segment of the
    /// resulting path, or [`ZarrError::InvalidPath`] if `name` is malformed.
    pub fn require_group(&self, name: &str) -> ZarrResult<Self> {
        let target = join(&self.path, name)?;
        let mut built = String::new();
        for segment in target.split('/').filter(|s| !s.is_empty()) {
            built = if built.is_empty() { segment.to_string() } else { format!("{built}/{segment}") };
            if self.store.contains(&node_key(&built, GROUP_DESCRIPTOR_KEY)?)? {
                continue;
            }
            if self.store.contains(&node_key(&built, ARRAY_DESCRIPTOR_KEY)?)? {
                return Err(ZarrError::ContainerExists(built));
            }
            log::debug!("implicitly creating group {built:?} via require_group");
            self.store.set(&node_key(&built, GROUP_DESCRIPTOR_KEY)?, &encode_metadata(&GroupMetadata::default())?)?;
        }
        let mut group = Self {
            store: self.store.clone(),
            path: target,
            read_only: self.read_only,
            synchroniser: self.synchroniser.clone(),
            config: self.config.clone(),
        };
        if let Some(s) = &self.synchroniser {
            group = group.with_synchroniser(s.clone());
        }
        Ok(group)
    }

    /// Create an array named `name` with the supplied descriptor.
    ///
    /// # Errors
    /// Returns [`ZarrError::ContainerExists`] if a group or array already occupies the
    /// resulting path or any of its ancestors, or any error [`Array::create`] can return.
    pub fn create_dataset(&self, name: &str, metadata: ArrayMetadata) -> ZarrResult<Array> {
        let path = join(&self.path, name)?;
        ensure_path_available(&self.store, &path)?;
        let mut array = Array::create(self.store.clone(), path, metadata, self.config.clone())?;
        if let Some(s) = &self.synchroniser {
            array = array.with_synchroniser(s.clone());
        }
        Ok(array)
    }

    /// Return the array named `name`, creating it with `shape`/`chunks`/`dtype` if it does
    /// not already exist.
    ///
    /// If it does exist, its shape must equal `shape` and its dtype must equal `dtype`
    /// (when `exact`) or be [`DataType::is_castable_to`] `dtype` (otherwise).
    ///
    /// # Errors
    /// Returns [`ZarrError::TypeError`] if an existing array's shape or dtype is
    /// incompatible, or any error [`Group::create_dataset`] can return.
    pub fn require_dataset(
        &self,
        name: &str,
        shape: Vec<u64>,
        chunks: Vec<u64>,
        dtype: DataType,
        exact: bool,
    ) -> ZarrResult<Array> {
        let path = join(&self.path, name)?;
        if self.store.contains(&node_key(&path, ARRAY_DESCRIPTOR_KEY)?)? {
            let mode = if self.read_only { OpenMode::ReadOnly } else { OpenMode::ReadWrite };
            let mut array = Array::open(self.store.clone(), path.clone(), mode, None, self.config.clone())?;
            if let Some(s) = &self.synchroniser {
                array = array.with_synchroniser(s.clone());
            }
            let existing_dtype = array.metadata().dtype.clone();
            let compatible = array.shape() == shape.as_slice()
                && if exact { existing_dtype == dtype } else { existing_dtype.is_castable_to(&dtype) };
            if !compatible {
                return Err(ZarrError::TypeError {
                    path,
                    existing_shape: array.shape().to_vec(),
                    existing_dtype: existing_dtype.to_string(),
                    expected_shape: shape,
                    expected_dtype: dtype.to_string(),
                });
            }
            Ok(array)
        } else {
            log::debug!("implicitly creating dataset {path:?} via require_dataset");
            let metadata = ArrayMetadata {
                zarr_format: crate::metadata::array::ZARR_FORMAT,
                shape,
                chunks,
                dtype,
                order: crate::array_subset::Order::default(),
                compressor: None,
                fill_value: None,
                filters: None,
            };
            self.create_dataset(name, metadata)
        }
    }

    /// Resolve `name` to the array or group it names.
    ///
    /// # Errors
    /// Returns [`ZarrError::KeyNotFound`] if neither a `.zarray` nor a `.zgroup` descriptor
    /// exists at the resulting path.
    pub fn get(&self, name: &str) -> ZarrResult<Node> {
        let path = join(&self.path, name)?;
        if self.store.contains(&node_key(&path, ARRAY_DESCRIPTOR_KEY)?)? {
            let mode = if self.read_only { OpenMode::ReadOnly } else { OpenMode::ReadWrite };
            let mut array = Array::open(self.store.clone(), path, mode, None, self.config.clone())?;
            if let Some(s) = &self.synchroniser {
                array = array.with_synchroniser(s.clone());
            }
            return Ok(Node::Array(array));
        }
        if self.store.contains(&node_key(&path, GROUP_DESCRIPTOR_KEY)?)? {
            let mut group = Self {
                store: self.store.clone(),
                path,
                read_only: self.read_only,
                synchroniser: self.synchroniser.clone(),
                config: self.config.clone(),
            };
            if let Some(s) = &self.synchroniser {
                group = group.with_synchroniser(s.clone());
            }
            return Ok(Node::Group(group));
        }
        log::warn!("path {path:?} is neither an array nor a group");
        Err(ZarrError::KeyNotFound(path))
    }

    /// List this group's immediate children, in path order.
    ///
    /// # Errors
    /// Returns a storage error if the underlying prefix scan fails.
    pub fn children(&self) -> ZarrResult<Vec<(String, NodeKind)>> {
        let prefix = if self.path.is_empty() { String::new() } else { format!("{}/", self.path) };
        let mut found: BTreeMap<String, NodeKind> = BTreeMap::new();
        for key in self.store.iter_keys(&prefix)? {
            let Some(child) = immediate_child(&self.path, key.as_str()) else {
                continue;
            };
            let rest = key.as_str().strip_prefix(prefix.as_str()).unwrap_or(key.as_str());
            if rest == format!("{child}/{ARRAY_DESCRIPTOR_KEY}") {
                found.insert(child.to_string(), NodeKind::Array);
            } else if rest == format!("{child}/{GROUP_DESCRIPTOR_KEY}") {
                found.insert(child.to_string(), NodeKind::Group);
            }
        }
        Ok(found.into_iter().collect())
    }

    /// The number of immediate children.
    ///
    /// # Errors
    /// Returns a storage error if the underlying prefix scan fails.
    pub fn len(&self) -> ZarrResult<usize> {
        Ok(self.children()?.len())
    }

    /// Returns true if this group has no immediate children.
    ///
    /// # Errors
    /// Returns a storage error if the underlying prefix scan fails.
    pub fn is_empty(&self) -> ZarrResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array_subset::Order;
    use crate::metadata::array::ZARR_FORMAT;
    use crate::metadata::data_type::SimpleDType;
    use crate::storage::store::MemoryStore;

    fn int64_metadata(shape: Vec<u64>, chunks: Vec<u64>) -> ArrayMetadata {
        ArrayMetadata {
            zarr_format: ZARR_FORMAT,
            shape,
            chunks,
            dtype: DataType::Simple(SimpleDType::from_dtype_string("<i8").unwrap()),
            order: Order::C,
            compressor: None,
            fill_value: None,
            filters: None,
        }
    }

    #[test]
    fn create_group_under_array_path_fails_with_container_exists() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let root = Group::create(store.clone(), "", ZarrConfig::default()).unwrap();
        root.create_dataset("foo", int64_metadata(vec![10], vec![5])).unwrap();
        let result = root.create_group("foo/bar");
        assert!(matches!(result, Err(ZarrError::ContainerExists(_))));
    }

    #[test]
    fn require_group_creates_missing_intermediate_groups() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let root = Group::create(store, "", ZarrConfig::default()).unwrap();
        let leaf = root.require_group("a/b/c").unwrap();
        assert_eq!(leaf.path(), "a/b/c");
        assert!(Group::open(root.store.clone(), "a/b", false, ZarrConfig::default()).is_ok());
    }

    #[test]
    fn require_group_is_idempotent_on_existing_group() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let root = Group::create(store, "", ZarrConfig::default()).unwrap();
        root.require_group("a").unwrap();
        let again = root.require_group("a").unwrap();
        assert_eq!(again.path(), "a");
    }

    #[test]
    fn get_resolves_array_and_group_children() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let root = Group::create(store, "", ZarrConfig::default()).unwrap();
        root.create_dataset("arr", int64_metadata(vec![10], vec![5])).unwrap();
        root.create_group("grp").unwrap();
        assert!(matches!(root.get("arr").unwrap(), Node::Array(_)));
        assert!(matches!(root.get("grp").unwrap(), Node::Group(_)));
        assert!(matches!(root.get("missing"), Err(ZarrError::KeyNotFound(_))));
    }

    #[test]
    fn children_lists_immediate_descendants_only() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let root = Group::create(store, "", ZarrConfig::default()).unwrap();
        root.create_dataset("arr", int64_metadata(vec![10], vec![5])).unwrap();
        let grp = root.create_group("grp").unwrap();
        grp.create_dataset("nested", int64_metadata(vec![4], vec![2])).unwrap();

        let children = root.children().unwrap();
        assert_eq!(children, vec![("arr".to_string(), NodeKind::Array), ("grp".to_string(), NodeKind::Group)]);
        assert_eq!(root.len().unwrap(), 2);
    }

    #[test]
    fn require_dataset_returns_existing_compatible_array() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let root = Group::create(store, "", ZarrConfig::default()).unwrap();
        root.create_dataset("arr", int64_metadata(vec![10], vec![5])).unwrap();
        let dtype = DataType::Simple(SimpleDType::from_dtype_string("<i8").unwrap());
        let array = root.require_dataset("arr", vec![10], vec![5], dtype, true).unwrap();
        assert_eq!(array.shape(), &[10]);
    }

    #[test]
    fn require_dataset_rejects_incompatible_existing_array() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let root = Group::create(store, "", ZarrConfig::default()).unwrap();
        root.create_dataset("arr", int64_metadata(vec![10], vec![5])).unwrap();
        let dtype = DataType::Simple(SimpleDType::from_dtype_string("<i8").unwrap());
        let result = root.require_dataset("arr", vec![20], vec![5], dtype, true);
        assert!(matches!(result, Err(ZarrError::TypeError { .. })));
    }

    #[test]
    fn require_dataset_creates_when_absent() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let root = Group::create(store, "", ZarrConfig::default()).unwrap();
        let dtype = DataType::Simple(SimpleDType::from_dtype_string("<f4").unwrap());
        let array = root.require_dataset("new", vec![8], vec![4], dtype, false).unwrap();
        assert_eq!(array.shape(), &[8]);
    }
}
