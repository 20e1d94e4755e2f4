use thiserror::Error;

/// Problems with the capture database itself.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Input file not found: {0}")]
    NotFound(String),

    #[error("Not a readable Kismet capture ({path}): {reason}")]
    NotACapture { path: String, reason: String },

    #[error("Capture is missing the '{0}' table")]
    MissingTable(&'static str),

    #[error("Capture table '{table}' is missing column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
}

/// Unparsable or contradictory filter values.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid band '{0}'. Valid bands: 2.4, 5, 6")]
    InvalidBand(String),

    #[error("Invalid MAC address '{0}': expected six hex octets (AA:BB:CC:DD:EE:FF)")]
    InvalidMac(String),

    #[error("ESSID filter values must not be empty")]
    EmptyEssid,

    #[error("Minimum signal {0} dBm is out of range: signal strength is never positive")]
    InvalidMinSignal(i32),

    #[error("Contradictory filters: {0}")]
    Contradictory(String),
}

#[derive(Error, Debug)]
pub enum KismapError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Output paths {first} and {second} name the same file")]
    OutputConflict { first: String, second: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render map: {0}")]
    Render(String),
}

impl KismapError {
    pub fn write(path: impl Into<String>, source: std::io::Error) -> Self {
        KismapError::Write {
            path: path.into(),
            source,
        }
    }
}

impl From<tera::Error> for KismapError {
    fn from(e: tera::Error) -> Self {
        // tera nests the useful message in its source chain
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(inner) = source {
            message = format!("{}: {}", message, inner);
            source = inner.source();
        }
        KismapError::Render(message)
    }
}

pub type Result<T> = std::result::Result<T, KismapError>;
