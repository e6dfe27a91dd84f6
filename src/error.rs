use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Not authenticated, log in at {login_url}")]
    Unauthorized { login_url: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error (status {status})")]
    Server { status: u16 },

    #[error("API request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Could not parse server response: {0}")]
    Parse(String),

    #[error("Malformed server response: {0}")]
    MalformedResponse(String),

    #[error("Invalid job locator '{0}', expected pipeline/counter/stage/counter/job")]
    InvalidLocator(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    /// Message shown to the user in place of the console when a request fails.
    pub fn flash_message(&self) -> String {
        match self {
            ConsoleError::Unauthorized { login_url } => {
                format!("Your session has expired. Please log in again: {login_url}")
            }
            ConsoleError::NotFound(what) => {
                format!("The requested resource could not be found ({what}). It may have been deleted or never existed.")
            }
            ConsoleError::Server { status } => {
                format!("The server encountered an internal error (HTTP {status}). Try again later.")
            }
            ConsoleError::Parse(_) | ConsoleError::MalformedResponse(_) | ConsoleError::Json(_) => {
                "The server returned a response that could not be understood.".to_string()
            }
            other => format!("Something went wrong: {other}"),
        }
    }

    /// Whether polling should stop instead of retrying on the next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConsoleError::Unauthorized { .. }
                | ConsoleError::NotFound(_)
                | ConsoleError::InvalidLocator(_)
                | ConsoleError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
