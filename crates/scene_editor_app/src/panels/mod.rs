// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor panel implementations.

mod hierarchy;
mod status;

pub use hierarchy::HierarchyPanel;
pub use status::StatusPanel;
