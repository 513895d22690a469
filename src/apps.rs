//! Supported applications.

use std::fmt;
use std::str::FromStr;

/// One of the two applications whose profiles this tool manages.
///
/// The ordering is used for display: Firefox sorts ahead of Thunderbird.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MozApp {
    Firefox,
    Thunderbird,
}

impl MozApp {
    pub fn all() -> [MozApp; 2] {
        [MozApp::Firefox, MozApp::Thunderbird]
    }

    /// Short lowercase tag, used on the command line.
    pub fn tag(self) -> &'static str {
        match self {
            MozApp::Firefox => "firefox",
            MozApp::Thunderbird => "thunderbird",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            MozApp::Firefox => "Firefox",
            MozApp::Thunderbird => "Thunderbird",
        }
    }

    /// Needle matched against running process names, case-insensitively.
    ///
    /// Substring matching can over-match (any process whose name merely
    /// contains the needle is targeted); known precision limitation.
    pub fn process_name(self) -> &'static str {
        match self {
            MozApp::Firefox => "firefox",
            MozApp::Thunderbird => "thunderbird",
        }
    }
}

impl fmt::Display for MozApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for MozApp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(MozApp::Firefox),
            "thunderbird" => Ok(MozApp::Thunderbird),
            other => Err(format!(
                "unknown application '{}' (expected 'firefox' or 'thunderbird')",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_lists_every_app() {
        assert_eq!(MozApp::all(), [MozApp::Firefox, MozApp::Thunderbird]);
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!("firefox".parse::<MozApp>().unwrap(), MozApp::Firefox);
        assert_eq!("Thunderbird".parse::<MozApp>().unwrap(), MozApp::Thunderbird);
        assert!("chrome".parse::<MozApp>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for app in MozApp::all() {
            assert_eq!(app.to_string().parse::<MozApp>().unwrap(), app);
        }
    }

    #[test]
    fn test_firefox_sorts_first() {
        let mut apps = [MozApp::Thunderbird, MozApp::Firefox];
        apps.sort();
        assert_eq!(apps[0], MozApp::Firefox);
    }
}
