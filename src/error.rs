pub type SketchResult<T> = Result<T, SketchError>;

#[derive(thiserror::Error, Debug)]
pub enum SketchError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SketchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for SketchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SketchError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(SketchError::storage("x").to_string().contains("storage error:"));
        assert!(SketchError::capture("x").to_string().contains("capture error:"));
        assert!(
            SketchError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = SketchError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn json_errors_map_to_serde_variant() {
        let err: SketchError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, SketchError::Serde(_)));
    }
}
