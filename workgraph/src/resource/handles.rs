//! GPU resource handles.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::{AccelerationStructureDescriptor, BufferDescriptor, ImageDescriptor};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a GPU allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

macro_rules! resource_handle {
    ($(#[$meta:meta])* $name:ident, $descriptor:ty) => {
        $(#[$meta])*
        ///
        /// Handles are cheap to clone and compare by identity: two handles are
        /// equal only when they refer to the same allocation.
        #[derive(Clone)]
        pub struct $name {
            id: ResourceId,
            descriptor: Arc<$descriptor>,
        }

        impl $name {
            /// Create a handle with a fresh identity. Called by execution
            /// contexts when they allocate the backing object.
            pub fn new(descriptor: $descriptor) -> Self {
                Self {
                    id: ResourceId::next(),
                    descriptor: Arc::new(descriptor),
                }
            }

            pub fn id(&self) -> ResourceId {
                self.id
            }

            pub fn descriptor(&self) -> &$descriptor {
                &self.descriptor
            }

            pub fn label(&self) -> Option<&str> {
                self.descriptor.label.as_deref()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("id", &self.id)
                    .field("label", &self.descriptor.label)
                    .finish()
            }
        }

        static_assertions::assert_impl_all!($name: Send, Sync);
    };
}

resource_handle!(
    /// Handle to a GPU buffer.
    BufferResource,
    BufferDescriptor
);

resource_handle!(
    /// Handle to a GPU image.
    ImageResource,
    ImageDescriptor
);

resource_handle!(
    /// Handle to a ray tracing acceleration structure.
    AccelerationStructureResource,
    AccelerationStructureDescriptor
);

impl BufferResource {
    /// Buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }
}
