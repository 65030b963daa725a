//! Logical device meshes.
//!
//! A [`DeviceMesh`] organizes the devices participating in a distributed computation into a named,
//! multi-dimensional logical grid, mirroring the mesh abstraction of
//! [PyTorch's DTensor](https://docs.pytorch.org/docs/stable/distributed.tensor.html) and
//! [JAX's `Mesh`](https://docs.jax.dev/en/latest/jax.sharding.html#jax.sharding.Mesh). Each mesh axis may host an
//! independent sharding decision: a tensor placement tuple has exactly one entry per mesh axis (see
//! [`DTensorSpec`][crate::placement::DTensorSpec]).
//!
//! Strategy propagation never performs communication, so the mesh here is topology only: axis names, axis sizes, and
//! the lookups needed to size communication volumes. Binding mesh coordinates to physical devices and running
//! collectives over them is the runtime's concern.

use std::collections::HashMap;
use std::fmt::Display;

use thiserror::Error;

/// Error type for mesh construction.
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MeshError {
    /// Error returned when a mesh axis name is empty.
    #[error("mesh axis names must be non-empty")]
    EmptyAxisName,

    /// Error returned when a mesh axis has size `0`.
    #[error("mesh axis '{axis_name}' must have size > 0")]
    InvalidAxisSize { axis_name: String },

    /// Error returned when mesh axis names are not unique.
    #[error("mesh axis '{axis_name}' appears more than once")]
    DuplicateAxisName { axis_name: String },
}

/// A named axis in a logical device mesh.
///
/// Each axis represents one dimension of the device grid with a human-readable name (e.g., `"data"`, `"model"`) and
/// a size (the number of ranks along that dimension).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeshAxis {
    name: String,
    size: usize,
}

impl MeshAxis {
    /// Creates a mesh axis, rejecting empty names and zero sizes.
    pub fn new<N: Into<String>>(name: N, size: usize) -> Result<Self, MeshError> {
        let name = name.into();
        if name.is_empty() {
            return Err(MeshError::EmptyAxisName);
        }
        if size == 0 {
            return Err(MeshError::InvalidAxisSize { axis_name: name });
        }
        Ok(Self { name, size })
    }

    /// Name of this axis.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Number of ranks along this axis.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Logical mesh topology: an ordered list of named axes.
///
/// Axis order is significant — placement tuples correspond 1:1 to mesh axes by position. Construction validates that
/// axis names are unique so that name-based lookups are unambiguous.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceMesh {
    axes: Vec<MeshAxis>,
    axis_index_by_name: HashMap<String, usize>,
}

impl DeviceMesh {
    /// Creates a mesh from named axes.
    pub fn new(axes: Vec<MeshAxis>) -> Result<Self, MeshError> {
        let mut axis_index_by_name = HashMap::with_capacity(axes.len());
        for (axis_index, axis) in axes.iter().enumerate() {
            if axis_index_by_name.insert(axis.name.clone(), axis_index).is_some() {
                return Err(MeshError::DuplicateAxisName { axis_name: axis.name.clone() });
            }
        }
        Ok(Self { axes, axis_index_by_name })
    }

    /// Returns the axes of this mesh.
    pub fn axes(&self) -> &[MeshAxis] {
        self.axes.as_slice()
    }

    /// Number of mesh dimensions.
    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// Returns the size of the axis at `axis_index`, if valid.
    pub fn axis_size(&self, axis_index: usize) -> Option<usize> {
        self.axes.get(axis_index).map(MeshAxis::size)
    }

    /// Returns the index of `axis_name` in this mesh, if present.
    pub fn axis_index<S: AsRef<str>>(&self, axis_name: S) -> Option<usize> {
        self.axis_index_by_name.get(axis_name.as_ref()).copied()
    }

    /// Total number of ranks implied by the axis sizes.
    pub fn device_count(&self) -> usize {
        self.axes.iter().map(MeshAxis::size).product()
    }
}

impl Display for DeviceMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mesh[")?;
        for (axis_index, axis) in self.axes.iter().enumerate() {
            if axis_index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", axis.name(), axis.size())?;
        }
        write!(f, "]")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
