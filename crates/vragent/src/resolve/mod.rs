mod cache;
mod resolver;

use std::fmt;
use std::str::FromStr;

pub use cache::ResolutionCache;
pub use resolver::IdentifierResolver;

/// Which stable identifier a plan uses to name scene objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdKind {
    #[default]
    FileId,
    Guid,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdKind::FileId => f.write_str("file_id"),
            IdKind::Guid => f.write_str("guid"),
        }
    }
}

impl FromStr for IdKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file_id" | "fileid" => Ok(IdKind::FileId),
            "guid" => Ok(IdKind::Guid),
            other => Err(format!("unknown id kind '{other}' (expected file_id or guid)")),
        }
    }
}
