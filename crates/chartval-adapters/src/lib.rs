//! Concrete collaborators for chart-val.
//!
//! Every external process the system runs lives in this crate:
//! - [`HelmRenderer`]: `helm template` per environment
//! - [`DyffDiffer`]: `dyff between` semantic YAML diffs
//! - [`FsEnvironmentDiscovery`]: environments from files in the chart directory
//! - [`GitSource`] / [`DirectorySource`]: chart trees at a revision
//! - [`git_changed_files`]: changed paths between two revisions

pub mod directory;
pub mod discovery;
pub mod dyff;
pub mod git;
pub mod helm;
mod process;

pub use directory::DirectorySource;
pub use discovery::{FsEnvironmentDiscovery, ENVIRONMENTS_FILE};
pub use dyff::DyffDiffer;
pub use git::{git_changed_files, GitSource};
pub use helm::HelmRenderer;
