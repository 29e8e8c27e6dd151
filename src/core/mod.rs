pub mod intake;
pub mod layout;
pub mod stability;
pub mod stages;
pub mod watch;

pub use crate::domain::model::{ProjectLayout, RoleAssignment, RunReport, Stage, StageOutcome};
pub use crate::domain::ports::{ArchiveExtractor, SizeProbe, Toolchain};
pub use crate::utils::error::Result;
