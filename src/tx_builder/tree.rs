//! Membership tree sizing
//!
//! A concurrent merkle tree account is sized once, at creation. The layout
//! is a fixed header, the tree metadata, a ring buffer of `max_buffer_size`
//! change logs, the rightmost proof and the optional canopy.

use super::errors::MinterError;
use serde::{Deserialize, Serialize};

/// Largest canopy depth the ledger accepts
pub const MAX_CANOPY_DEPTH: u32 = 17;

const HEADER_BYTES: u64 = 56;
const TREE_META_BYTES: u64 = 24;
const PATH_NODE_BYTES: u64 = 32;
// root (32) + index (4) + padding (4)
const CHANGE_LOG_OVERHEAD: u64 = 40;
// leaf (32) + index (4) + padding (4)
const RIGHTMOST_PROOF_OVERHEAD: u64 = 40;

/// Depth / buffer combinations the compression program accepts
pub const VALID_DEPTH_SIZE_PAIRS: &[(u32, u32)] = &[
    (3, 8),
    (5, 8),
    (14, 64),
    (14, 256),
    (14, 1024),
    (14, 2048),
    (15, 64),
    (16, 64),
    (17, 64),
    (18, 64),
    (19, 64),
    (20, 64),
    (20, 256),
    (20, 1024),
    (20, 2048),
    (24, 64),
    (24, 256),
    (24, 512),
    (24, 1024),
    (24, 2048),
    (26, 512),
    (26, 1024),
    (26, 2048),
    (30, 512),
    (30, 1024),
    (30, 2048),
];

/// Tree depth and concurrent change buffer width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSizePair {
    pub max_depth: u32,
    pub max_buffer_size: u32,
}

/// A validated tree shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeShape {
    pub pair: DepthSizePair,
    pub canopy_depth: u32,
}

impl DepthSizePair {
    pub const fn new(max_depth: u32, max_buffer_size: u32) -> Self {
        Self {
            max_depth,
            max_buffer_size,
        }
    }

    pub fn is_supported(&self) -> bool {
        VALID_DEPTH_SIZE_PAIRS.contains(&(self.max_depth, self.max_buffer_size))
    }
}

impl TreeShape {
    /// Validate a tree shape
    ///
    /// # Errors
    ///
    /// `InvalidTreeParameters` when the pair is not supported by the
    /// compression program, or the canopy is deeper than the tree or than
    /// [`MAX_CANOPY_DEPTH`].
    pub fn new(pair: DepthSizePair, canopy_depth: u32) -> Result<Self, MinterError> {
        if !pair.is_supported() {
            return Err(MinterError::InvalidTreeParameters(format!(
                "unsupported depth/buffer pair ({}, {})",
                pair.max_depth, pair.max_buffer_size
            )));
        }
        if canopy_depth > MAX_CANOPY_DEPTH {
            return Err(MinterError::InvalidTreeParameters(format!(
                "canopy depth {} exceeds maximum {}",
                canopy_depth, MAX_CANOPY_DEPTH
            )));
        }
        if canopy_depth > pair.max_depth {
            return Err(MinterError::InvalidTreeParameters(format!(
                "canopy depth {} exceeds tree depth {}",
                canopy_depth, pair.max_depth
            )));
        }
        Ok(Self { pair, canopy_depth })
    }

    /// Number of leaves the tree can ever hold
    pub fn capacity(&self) -> u64 {
        1u64 << self.pair.max_depth
    }

    /// Bytes to allocate for the tree account
    pub fn account_size(&self) -> u64 {
        account_size(
            self.pair.max_depth,
            self.pair.max_buffer_size,
            self.canopy_depth,
        )
    }
}

/// Raw size formula, without pair validation
pub fn account_size(max_depth: u32, max_buffer_size: u32, canopy_depth: u32) -> u64 {
    let depth = u64::from(max_depth);
    let path_bytes = PATH_NODE_BYTES * depth;
    let change_log = CHANGE_LOG_OVERHEAD + path_bytes;
    let rightmost_proof = RIGHTMOST_PROOF_OVERHEAD + path_bytes;
    let canopy_nodes = (1u64 << (canopy_depth + 1)).saturating_sub(2);

    HEADER_BYTES
        + TREE_META_BYTES
        + u64::from(max_buffer_size) * change_log
        + rightmost_proof
        + PATH_NODE_BYTES * canopy_nodes
}
