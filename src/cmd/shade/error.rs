use {std::path::PathBuf, thiserror::Error};

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort the pipeline. Diagnostics that do not block artifact
/// production are collected separately, see [`crate::cmd::shade::report`].
#[derive(Debug, Error)]
pub enum Error {
    /// A declared module could not be located in the store, or its content
    /// is malformed or unreadable.
    #[error("failed to resolve module {module}: {reason}")]
    Resolution {
        /// Name of the module that could not be resolved.
        module: String,
        /// Description of what went wrong.
        reason: String,
    },

    /// Two members with differing content would end up under the same
    /// relocated name.
    #[error("relocation conflict on {target}: {first} and {second} differ in content")]
    RelocationConflict {
        /// The post-relocation name both members claimed.
        target: String,
        /// The member that claimed the name first.
        first: String,
        /// The member that collided with it.
        second: String,
    },

    /// The artifact could not be written. Nothing is left at the final
    /// destination path.
    #[error("failed to write archive at {path}: {source}")]
    Write {
        /// Destination path of the artifact.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The build descriptor is malformed or incomplete.
    #[error("invalid build descriptor: {message}")]
    Config {
        /// Description of the descriptor problem.
        message: String,
    },
}
