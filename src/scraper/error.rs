#[derive(thiserror::Error, Debug)]
pub enum ScraperError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("No search result for `{0}`")]
    NoSearchResult(String),
    #[error("No mirror host configured")]
    NoHosts,
}

impl ScraperError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScraperError::Status { status: 404, .. })
    }
}
