//! A library for chunked, compressed, N-dimensional array storage in the Zarr V2 format.
//!
//! A [`storage::Store`] maps opaque keys to byte strings; an [`array::Array`] lays out a
//! shaped, chunked, typed array over one, persisting one descriptor (`.zarray`) and one
//! chunk per store key under a dot-joined chunk coordinate (e.g. `"3.0.12"`). A
//! [`group::Group`] nests arrays and sub-groups under a path hierarchy, each directory
//! carrying its own descriptor (`.zgroup`) and [`attributes::Attributes`] (`.zattrs`).
//!
//! ## Features
//!  - `gzip`, `zstd`, `crc32c` are enabled by default.
//!  - `blosc` adds the `blosc` compressor via FFI bindings to the C library.
//!
//! ## Overview
//!  - [`storage`]: the [`storage::Store`] trait and the `memory`/`filesystem` adapters.
//!  - [`array::codec`]: the [`array::codec::Codec`] trait and the compile-time codec
//!    registry codecs register into with `inventory::submit!`.
//!  - [`metadata`]: canonical JSON encoding of array/group descriptors, dtype strings, and
//!    fill-value materialisation.
//!  - [`selection`]: normalising a user-supplied selection and decomposing it per chunk.
//!  - [`array`]: the array engine built from the above — create/open, `retrieve`/`store`,
//!    `resize`/`append`.
//!  - [`group`]: the path hierarchy above arrays.
//!  - [`attributes`]: the mutable `.zattrs` mapping shared by arrays and groups.
//!  - [`sync`]: per-chunk and per-attributes mutual exclusion for concurrent callers.
//!  - [`config`]: crate-wide and per-array checksum-validation/concurrency configuration.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]

pub mod array;
pub mod array_subset;
pub mod attributes;
pub mod config;
pub mod error;
pub mod group;
pub mod metadata;
pub mod paths;
pub mod selection;
pub mod storage;
pub mod sync;

pub use array::Array;
pub use error::{ZarrError, ZarrResult};
pub use group::Group;
