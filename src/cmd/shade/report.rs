use std::fmt;

/// A non-fatal finding recorded during a build. Diagnostics never block
/// artifact production; they are accumulated on the context and reported
/// once at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A traversed member references a name no loaded module defines.
    DanglingReference { from: String, to: String },
    /// Two entries claimed the same archive path; precedence picked one.
    ResourceCollision {
        path: String,
        kept: String,
        dropped: String,
    },
    /// A pinned entry names a member the store does not define.
    UnknownPinnedEntry { name: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingReference { from, to } => {
                write!(f, "dangling reference: {from} uses undefined {to}")
            }
            Self::ResourceCollision {
                path,
                kept,
                dropped,
            } => {
                write!(
                    f,
                    "collision at {path:?}: kept entry from {kept}, dropped entry from {dropped}"
                )
            }
            Self::UnknownPinnedEntry { name } => {
                write!(f, "pinned entry {name:?} is not defined by any loaded module")
            }
        }
    }
}

/// Print accumulated diagnostics, if any.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!("{} diagnostic(s):", diagnostics.len());
    for diagnostic in diagnostics {
        println!("- {diagnostic}");
    }
}
