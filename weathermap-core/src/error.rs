use thiserror::Error;

/// A marker the patcher relies on is missing or malformed.
///
/// The patch is purely textual, so any of these means the document was not
/// produced by the expected map generator and nothing is written back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("marker `{0}` not found in map document")]
    MarkerNotFound(String),

    #[error("variable `{0}` is not followed by ` =`")]
    UnterminatedVariable(String),

    #[error("handler at byte {0} has no balanced brace group")]
    UnbalancedBraces(usize),

    #[error("click handler at byte {handler} precedes `</head>` at byte {head}")]
    HandlerBeforeHead { head: usize, handler: usize },
}

/// Failure of a reverse geocoding call.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder timed out: {0}")]
    Timeout(String),

    #[error("geocoder service error: {0}")]
    Service(String),

    #[error("malformed geocoder response: {0}")]
    Malformed(String),

    #[error("invalid geocoder query `{0}`")]
    InvalidQuery(String),
}

impl GeocodeError {
    /// Timeouts and service errors mark the location invalid; everything else
    /// aborts the lookup.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GeocodeError::Timeout(_) | GeocodeError::Service(_))
    }
}

impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GeocodeError::Timeout(err.to_string())
        } else if err.is_decode() {
            GeocodeError::Malformed(err.to_string())
        } else {
            GeocodeError::Service(err.to_string())
        }
    }
}

/// Failure of a current-conditions call.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather provider timed out: {0}")]
    Timeout(String),

    #[error("weather provider error: {0}")]
    Service(String),

    #[error("malformed weather response: {0}")]
    Malformed(String),
}

impl WeatherError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WeatherError::Timeout(_) | WeatherError::Service(_))
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WeatherError::Timeout(err.to_string())
        } else if err.is_decode() {
            WeatherError::Malformed(err.to_string())
        } else {
            WeatherError::Service(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_and_service_errors_are_recoverable() {
        assert!(GeocodeError::Timeout("t".into()).is_recoverable());
        assert!(GeocodeError::Service("s".into()).is_recoverable());
        assert!(!GeocodeError::Malformed("m".into()).is_recoverable());
        assert!(!GeocodeError::InvalidQuery("q".into()).is_recoverable());

        assert!(WeatherError::Timeout("t".into()).is_recoverable());
        assert!(WeatherError::Service("s".into()).is_recoverable());
        assert!(!WeatherError::Malformed("m".into()).is_recoverable());
    }

    #[test]
    fn patch_error_names_the_marker() {
        let err = PatchError::MarkerNotFound("</head>".into());
        assert_eq!(err.to_string(), "marker `</head>` not found in map document");
    }
}
