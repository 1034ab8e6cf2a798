//! Versioned channel containers backing [`VersionedState`](crate::state::VersionedState).
//!
//! Each channel pairs its content with a version counter. Versions start at 1
//! and are bumped by the update barrier only when an applied update actually
//! changed channel content, so persisted versions reflect real state
//! evolution rather than node activity.

pub mod errors;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::message::Message;
use errors::ErrorEvent;

/// Common surface of a versioned channel.
pub trait Channel {
    /// The cloned content type returned by [`snapshot`](Self::snapshot).
    type Snapshot;

    /// Current version of the channel. Starts at 1.
    fn version(&self) -> u32;

    /// Deep-clone the channel content.
    fn snapshot(&self) -> Self::Snapshot;
}

macro_rules! vec_channel {
    ($(#[$meta:meta])* $name:ident, $item:ty) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name {
            items: Vec<$item>,
            version: u32,
        }

        impl $name {
            /// Creates a channel with explicit content and version.
            #[must_use]
            pub fn new(items: Vec<$item>, version: u32) -> Self {
                Self { items, version }
            }

            /// Read-only view of the content.
            #[must_use]
            pub fn get(&self) -> &[$item] {
                &self.items
            }

            /// Mutable access to the content. Version bumps are the
            /// barrier's responsibility, not the caller's.
            pub fn get_mut(&mut self) -> &mut Vec<$item> {
                &mut self.items
            }

            /// Number of items in the channel.
            #[must_use]
            pub fn len(&self) -> usize {
                self.items.len()
            }

            /// Whether the channel is empty.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.items.is_empty()
            }

            /// Increment the version, saturating at `u32::MAX`.
            pub fn bump_version(&mut self) {
                self.version = self.version.saturating_add(1);
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(Vec::new(), 1)
            }
        }

        impl Channel for $name {
            type Snapshot = Vec<$item>;

            fn version(&self) -> u32 {
                self.version
            }

            fn snapshot(&self) -> Vec<$item> {
                self.items.clone()
            }
        }
    };
}

vec_channel!(
    /// Versioned conversation transcript.
    MessagesChannel,
    Message
);

vec_channel!(
    /// Versioned collection of absorbed fault events.
    ErrorsChannel,
    ErrorEvent
);

/// Versioned key/value store for workflow domain data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtrasChannel {
    map: FxHashMap<String, Value>,
    version: u32,
}

impl ExtrasChannel {
    /// Creates a channel with explicit content and version.
    #[must_use]
    pub fn new(map: FxHashMap<String, Value>, version: u32) -> Self {
        Self { map, version }
    }

    /// Read-only view of the map.
    #[must_use]
    pub fn get(&self) -> &FxHashMap<String, Value> {
        &self.map
    }

    /// Mutable access to the map. Version bumps are the barrier's
    /// responsibility, not the caller's.
    pub fn get_mut(&mut self) -> &mut FxHashMap<String, Value> {
        &mut self.map
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Increment the version, saturating at `u32::MAX`.
    pub fn bump_version(&mut self) {
        self.version = self.version.saturating_add(1);
    }
}

impl Default for ExtrasChannel {
    fn default() -> Self {
        Self::new(FxHashMap::default(), 1)
    }
}

impl Channel for ExtrasChannel {
    type Snapshot = FxHashMap<String, Value>;

    fn version(&self) -> u32 {
        self.version
    }

    fn snapshot(&self) -> FxHashMap<String, Value> {
        self.map.clone()
    }
}
