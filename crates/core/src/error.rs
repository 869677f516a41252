use thiserror::Error;

/// Failure while establishing the external dependencies.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("missing required configuration: {}", missing.join(", "))]
    ConfigMissing { missing: Vec<String> },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("vector database connection failed: {0}")]
    Connection(#[source] StoreError),

    #[error("failed to build client: {0}")]
    Client(String),
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("document could not be read as a pdf: {0}")]
    MalformedDocument(String),

    #[error("no readable text in document")]
    ExtractionEmpty,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("system not initialized: {0}")]
    NotInitialized(#[source] InitError),

    #[error("document could not be read as a pdf: {0}")]
    MalformedDocument(String),

    #[error("no readable text in document")]
    ExtractionEmpty,

    #[error("no text chunks created")]
    NoChunks,

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("failed to store chunks: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("document is {size} bytes, limit is {limit}")]
    DocumentTooLarge { size: u64, limit: u64 },
}

impl From<ExtractionError> for IngestError {
    fn from(value: ExtractionError) -> Self {
        match value {
            ExtractionError::MalformedDocument(reason) => IngestError::MalformedDocument(reason),
            ExtractionError::ExtractionEmpty => IngestError::ExtractionEmpty,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("question cannot be empty")]
    EmptyQuestion,

    #[error("system not initialized: {0}")]
    NotInitialized(#[source] InitError),

    #[error("answer generation failed: {0}")]
    Generation(#[from] UpstreamError),

    #[error("similarity search failed: {0}")]
    Store(#[from] StoreError),
}

/// Failure talking to the embedding or generation provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Response {
        service: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {service}: {details}")]
    Decode { service: String, details: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store request failed: {0}")]
    Request(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] UpstreamError),
}
