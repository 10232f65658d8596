#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// A key-value map built on the probing hash table.
///
/// This module provides a `HashMap` that hashes keys with a configurable
/// hasher builder, stores `(key, value)` pairs in a [`HashTable`], and
/// reports missing keys as [`Error::KeyNotFound`].
pub mod hash_map;

pub mod dump;
/// The raw table: values addressed by a precomputed hash and an equality
/// predicate.
pub mod hash_table;
pub mod probe;

mod error;

pub use error::Error;
pub use error::Result;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder a [`HashMap`] uses when none is given.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder a [`HashMap`] uses when none is given.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder hasher builder when neither `foldhash` nor `std` is
        /// enabled.
        ///
        /// It cannot be constructed, so maps must be created with an explicit
        /// hasher builder through [`HashMap::with_hasher`].
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}
