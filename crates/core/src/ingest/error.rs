use std::fmt;

/// Why a fetch produced no dataset. Callers degrade either case to "empty",
/// but keep the distinction for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Every attempt failed at the transport or HTTP-status level.
    Unavailable { attempts: u32, detail: String },

    /// The page arrived but the listing table or a required column was missing.
    Shape { detail: String },
}

impl FetchError {
    pub fn stage(&self) -> &'static str {
        match self {
            FetchError::Unavailable { .. } => "http",
            FetchError::Shape { .. } => "parse",
        }
    }

    pub(crate) fn shape(detail: impl Into<String>) -> Self {
        FetchError::Shape {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Unavailable { attempts, detail } => write!(
                f,
                "listing fetch unavailable (stage={}, attempts={attempts}): {detail}",
                self.stage()
            ),
            FetchError::Shape { detail } => {
                write!(f, "listing page shape mismatch (stage={}): {detail}", self.stage())
            }
        }
    }
}

impl std::error::Error for FetchError {}
