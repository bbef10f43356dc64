mod github;
pub mod registry;

pub use github::GitHubTool;
pub use registry::{SnapshotField, ToolDescriptor, ToolRegistry, DESCRIPTORS};
