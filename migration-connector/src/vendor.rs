use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A supported relational database kind.
///
/// The lowercase string form (`sqlserver | postgres | mysql | oracle`) is
/// the one exposed at spec §6's programmatic boundary; external front-ends
/// parse user input through [`Vendor::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    SqlServer,
    Postgres,
    MySql,
    Oracle,
}

impl Vendor {
    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::SqlServer => "sqlserver",
            Vendor::Postgres => "postgres",
            Vendor::MySql => "mysql",
            Vendor::Oracle => "oracle",
        }
    }

    /// The vendor's default maximum identifier length, used by the
    /// identifier converter when the request does not override it.
    pub fn default_max_identifier_length(self) -> usize {
        match self {
            Vendor::SqlServer => 128,
            Vendor::Postgres => 63,
            Vendor::MySql => 64,
            Vendor::Oracle => 30,
        }
    }

    /// The opening/closing quote characters this vendor uses around
    /// identifiers, e.g. `("[", "]")` for SQL Server.
    pub fn quote_chars(self) -> (char, char) {
        match self {
            Vendor::SqlServer => ('[', ']'),
            Vendor::Postgres | Vendor::Oracle => ('"', '"'),
            Vendor::MySql => ('`', '`'),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(Vendor::SqlServer),
            "postgres" | "postgresql" => Ok(Vendor::Postgres),
            "mysql" => Ok(Vendor::MySql),
            "oracle" => Ok(Vendor::Oracle),
            other => Err(format!("unknown vendor `{other}`, expected one of sqlserver|postgres|mysql|oracle")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonical_strings() {
        for vendor in [Vendor::SqlServer, Vendor::Postgres, Vendor::MySql, Vendor::Oracle] {
            assert_eq!(Vendor::from_str(vendor.as_str()).unwrap(), vendor);
        }
    }

    #[test]
    fn rejects_unknown_vendor() {
        assert!(Vendor::from_str("db2").is_err());
    }
}
