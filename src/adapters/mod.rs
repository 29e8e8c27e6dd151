// Adapters layer: concrete implementations of the domain ports.

pub mod archive;
pub mod fs_probe;
pub mod shell;

pub use archive::ZipExtractor;
pub use fs_probe::FsSizeProbe;
pub use shell::ShellToolchain;
