//! Dynamic object pooling
//!
//! Short-lived scene objects are recycled through handle-based pools instead
//! of being rebuilt every time one is needed.

pub mod pooled_node;
pub mod resource_pool;

pub use pooled_node::*;
pub use resource_pool::*;
