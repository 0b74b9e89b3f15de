pub type StoryReelResult<T> = Result<T, StoryReelError>;

#[derive(thiserror::Error, Debug)]
pub enum StoryReelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("asset missing: {0}")]
    AssetMissing(String),

    #[error("external process failure: {0}")]
    Process(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoryReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn asset_missing(msg: impl Into<String>) -> Self {
        Self::AssetMissing(msg.into())
    }

    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}
