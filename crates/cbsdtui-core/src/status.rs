//! Container status codes as stored by cbsd

use std::fmt;

/// Cached status of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Off,
    On,
    Slave,
    /// Any other code cbsd may record (3..5 in practice)
    Unknown(i64),
}

impl Status {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Status::Off,
            1 => Status::On,
            2 => Status::Slave,
            other => Status::Unknown(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Status::Off => 0,
            Status::On => 1,
            Status::Slave => 2,
            Status::Unknown(code) => code,
        }
    }

    pub fn label(self) -> String {
        match self {
            Status::Off => "Off".to_string(),
            Status::On => "On".to_string(),
            Status::Slave => "Slave".to_string(),
            Status::Unknown(code) => format!("Unknown({})", code),
        }
    }

    pub fn is_running(self) -> bool {
        self == Status::On
    }

    /// Only a stopped container can be started
    pub fn is_runnable(self) -> bool {
        self == Status::Off
    }

    /// Cached values worth reconciling against a live poll
    pub fn is_trusted(self) -> bool {
        matches!(self, Status::Off | Status::On)
    }

    /// Interpret `jstatus invert=true` output: a positive id means running,
    /// zero means stopped, anything else is unknown.
    pub fn from_poll_output(output: &str) -> Option<Status> {
        match output.trim().parse::<i64>() {
            Ok(n) if n > 0 => Some(Status::On),
            Ok(0) => Some(Status::Off),
            Ok(n) => {
                tracing::debug!("Unexpected status poll result {}", n);
                None
            }
            Err(e) => {
                tracing::debug!("Cannot parse status poll output {:?}: {}", output, e);
                None
            }
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Code printed for a poll that could not determine the status
pub const UNKNOWN_POLL_CODE: i64 = -1;

/// Numeric form of a live poll result, `-1` when unknown
pub fn poll_code(polled: Option<Status>) -> i64 {
    polled.map(Status::code).unwrap_or(UNKNOWN_POLL_CODE)
}

pub fn autostart_label(autostart: bool) -> &'static str {
    if autostart {
        "On"
    } else {
        "Off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_cbsd_codes() {
        let labels: Vec<String> = (0..6).map(|c| Status::from_code(c).label()).collect();
        assert_eq!(
            labels,
            ["Off", "On", "Slave", "Unknown(3)", "Unknown(4)", "Unknown(5)"]
        );
    }

    #[test]
    fn test_code_round_trip_for_odd_values() {
        assert_eq!(Status::from_code(7).code(), 7);
        assert_eq!(Status::from_code(-2), Status::Unknown(-2));
    }

    #[test]
    fn test_poll_output() {
        assert_eq!(Status::from_poll_output("4231\n"), Some(Status::On));
        assert_eq!(Status::from_poll_output("0"), Some(Status::Off));
        assert_eq!(Status::from_poll_output(""), None);
        assert_eq!(Status::from_poll_output("jail not found"), None);
        assert_eq!(Status::from_poll_output("-3"), None);
    }

    #[test]
    fn test_poll_code_sentinel() {
        assert_eq!(poll_code(None), -1);
        assert_eq!(poll_code(Some(Status::On)), 1);
        assert_eq!(poll_code(Some(Status::Off)), 0);
    }

    #[test]
    fn test_transitions_allowed_by_status() {
        assert!(Status::On.is_running());
        assert!(!Status::On.is_runnable());
        assert!(Status::Off.is_runnable());
        assert!(!Status::Slave.is_runnable());
        assert!(!Status::Unknown(4).is_trusted());
        assert!(Status::Off.is_trusted() && Status::On.is_trusted());
    }

    #[test]
    fn test_autostart_label() {
        assert_eq!(autostart_label(true), "On");
        assert_eq!(autostart_label(false), "Off");
    }
}
