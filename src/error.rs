use std::fmt;

use chrono::NaiveDate;

/// Errors surfaced by the core engagement operations.
///
/// Glue code (tasks, CLI, HTTP) wraps these in `anyhow`; callers that need to
/// react to a specific case can `downcast_ref::<EngagementError>()`.
#[derive(Debug)]
pub enum EngagementError {
    InvalidActivityType(String),
    MalformedDate(String),
    OutOfOrderCheckIn {
        last_check_in: NaiveDate,
        attempted: NaiveDate,
    },
    UnknownUser(String),
    Database(rusqlite::Error),
}

impl EngagementError {
    pub fn code(&self) -> &'static str {
        match self {
            EngagementError::InvalidActivityType(_) => "E001",
            EngagementError::MalformedDate(_) => "E002",
            EngagementError::OutOfOrderCheckIn { .. } => "E003",
            EngagementError::UnknownUser(_) => "E004",
            EngagementError::Database(_) => "E005",
        }
    }

    /// Validation-class errors are rejected before anything is written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngagementError::InvalidActivityType(_) | EngagementError::MalformedDate(_)
        )
    }
}

impl fmt::Display for EngagementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngagementError::InvalidActivityType(kind) => {
                write!(f, "[{}] Unknown activity type: {kind}", self.code())
            }
            EngagementError::MalformedDate(input) => {
                write!(f, "[{}] Malformed date '{input}', expected YYYY-MM-DD", self.code())
            }
            EngagementError::OutOfOrderCheckIn { last_check_in, attempted } => write!(
                f,
                "[{}] Check-in dated {attempted} is before the last recorded check-in ({last_check_in})",
                self.code()
            ),
            EngagementError::UnknownUser(user) => {
                write!(f, "[{}] No such user: {user}", self.code())
            }
            EngagementError::Database(err) => write!(f, "[{}] Database error: {err}", self.code()),
        }
    }
}

impl std::error::Error for EngagementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngagementError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for EngagementError {
    fn from(err: rusqlite::Error) -> Self {
        EngagementError::Database(err)
    }
}

pub type EngagementResult<T> = Result<T, EngagementError>;

/// Parses a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(input: &str) -> EngagementResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| EngagementError::MalformedDate(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates() {
        assert_eq!(
            parse_date("2024-01-02").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_dates() {
        let err = parse_date("02/01/2024").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.code(), "E002");
    }
}
