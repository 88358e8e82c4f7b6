//! Connection options.

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Connection options for PostgreSQL.
#[derive(Debug, Clone)]
pub struct Opts {
    /// Hostname or IP address.
    ///
    /// Default: `"localhost"`
    pub host: String,

    /// Port number for the PostgreSQL server.
    ///
    /// Default: `5432`
    pub port: u16,

    /// Username for authentication.
    ///
    /// Default: `""`
    pub user: String,

    /// Database name to use. Defaults to the user name when unset.
    ///
    /// Default: `None`
    pub database: Option<String>,

    /// Password for authentication.
    ///
    /// Default: `None`
    pub password: Option<String>,

    /// Socket read deadline. `None` disables the deadline.
    ///
    /// Default: `None`
    pub timeout: Option<Duration>,

    /// Additional startup parameters sent to the server.
    ///
    /// Default: `[]`
    pub params: Vec<(String, String)>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: String::new(),
            database: None,
            password: None,
            timeout: None,
            params: Vec::new(),
        }
    }
}

impl Opts {
    /// The database to request at startup: the configured one, or the user
    /// name when none was given.
    pub fn database_or_user(&self) -> &str {
        self.database.as_deref().unwrap_or(&self.user)
    }

    fn set_timeout_secs(&mut self, value: &str) -> Result<()> {
        let seconds: u64 = value
            .parse()
            .map_err(|_| Error::Usage(format!("invalid timeout: {value}")))?;
        self.timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        Ok(())
    }
}

/// Split a libpq-style connection string into `(keyword, value)` pairs.
///
/// Tokens are whitespace-separated `keyword=value` with optional spaces
/// around the `=`. A single-quoted value may contain spaces and equal
/// signs. A keyword with no `=` and no value is a parse error. Duplicate
/// keywords are last-write-wins.
fn split_keyword_value(input: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .ok_or_else(|| {
                Error::Usage(format!("unpaired keyword '{rest}' in connection string"))
            })?;
        let key = &rest[..key_end];
        if key.is_empty() {
            return Err(Error::Usage(
                "empty keyword in connection string".to_string(),
            ));
        }

        rest = rest[key_end..].trim_start();
        let Some(after_eq) = rest.strip_prefix('=') else {
            return Err(Error::Usage(format!(
                "unpaired keyword '{key}' in connection string"
            )));
        };
        rest = after_eq.trim_start();

        let value = if let Some(quoted) = rest.strip_prefix('\'') {
            let close = quoted.find('\'').ok_or_else(|| {
                Error::Usage(format!("unterminated quoted value for '{key}'"))
            })?;
            let value = quoted[..close].to_string();
            rest = &quoted[close + 1..];
            value
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let value = rest[..end].to_string();
            rest = &rest[end..];
            value
        };

        pairs.push((key.to_string(), value));
    }

    Ok(pairs)
}

impl Opts {
    /// Parse a libpq-style `keyword=value` connection string.
    ///
    /// Recognized keywords: `host`, `port`, `dbname`, `user`, `password`,
    /// `timeout` (seconds, 0 disables). Unknown keywords are ignored.
    pub fn from_keyword_value(input: &str) -> Result<Self> {
        let mut opts = Opts::default();

        for (key, value) in split_keyword_value(input)? {
            match key.as_str() {
                "host" => opts.host = value,
                "port" => {
                    opts.port = value
                        .parse()
                        .map_err(|_| Error::Usage(format!("invalid port: {value}")))?;
                }
                "dbname" => opts.database = Some(value),
                "user" => opts.user = value,
                "password" => opts.password = Some(value),
                "timeout" => opts.set_timeout_secs(&value)?,
                _ => {
                    tracing::debug!("ignoring unknown connection keyword: {key}");
                }
            }
        }

        Ok(opts)
    }
}

impl TryFrom<&Url> for Opts {
    type Error = Error;

    /// Parse a PostgreSQL connection URL.
    ///
    /// Format: `postgres://[user[:password]@]host[:port][/database][?param=value&..]`
    ///
    /// The `timeout` query parameter (seconds, 0 disables) configures the
    /// read deadline; any other query parameter is forwarded to the server
    /// as a startup parameter.
    fn try_from(url: &Url) -> Result<Self> {
        if !["postgres", "pg"].contains(&url.scheme()) {
            return Err(Error::Usage(format!(
                "invalid scheme: expected 'postgres://' or 'pg://', got '{}://'",
                url.scheme()
            )));
        }

        let mut opts = Opts {
            host: url.host_str().unwrap_or("localhost").to_string(),
            port: url.port().unwrap_or(5432),
            user: url.username().to_string(),
            password: url.password().map(|s| s.to_string()),
            database: url.path().strip_prefix('/').and_then(|s| {
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            }),
            ..Opts::default()
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "timeout" => opts.set_timeout_secs(&value)?,
                _ => opts.params.push((key.to_string(), value.to_string())),
            }
        }

        Ok(opts)
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        if s.contains("://") {
            let url = Url::parse(s).map_err(|e| Error::Usage(format!("invalid URL: {e}")))?;
            Self::try_from(&url)
        } else {
            Self::from_keyword_value(s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_after_parsing() {
        let opts = Opts::try_from("user=alice dbname=test").unwrap();
        assert_eq!(opts.host, "localhost");
        assert_eq!(opts.port, 5432);
        assert_eq!(opts.user, "alice");
        assert_eq!(opts.database_or_user(), "test");
        assert_eq!(opts.timeout, None);
    }

    #[test]
    fn database_defaults_to_user() {
        let opts = Opts::try_from("user=alice").unwrap();
        assert_eq!(opts.database_or_user(), "alice");
    }

    #[test]
    fn spaces_around_equals() {
        let opts = Opts::try_from("host = db.example.com port= 5433 user =bob").unwrap();
        assert_eq!(opts.host, "db.example.com");
        assert_eq!(opts.port, 5433);
        assert_eq!(opts.user, "bob");
    }

    #[test]
    fn quoted_values_keep_spaces_and_equals() {
        let opts = Opts::try_from("user=alice password='p w=d' dbname=test").unwrap();
        assert_eq!(opts.password.as_deref(), Some("p w=d"));
        assert_eq!(opts.database.as_deref(), Some("test"));
    }

    #[test]
    fn duplicate_keywords_last_write_wins() {
        let opts = Opts::try_from("host=a host=b").unwrap();
        assert_eq!(opts.host, "b");
    }

    #[test]
    fn unpaired_keyword_is_an_error() {
        assert!(Opts::try_from("user=alice dangling").is_err());
        assert!(Opts::try_from("user").is_err());
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(Opts::try_from("password='oops").is_err());
    }

    #[test]
    fn unknown_keywords_are_ignored() {
        let opts = Opts::try_from("user=alice sslmode=disable").unwrap();
        assert_eq!(opts.user, "alice");
    }

    #[test]
    fn timeout_zero_disables() {
        let opts = Opts::try_from("user=alice timeout=0").unwrap();
        assert_eq!(opts.timeout, None);
        let opts = Opts::try_from("user=alice timeout=30").unwrap();
        assert_eq!(opts.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn url_form() {
        let opts = Opts::try_from("postgres://alice:secret@db:5433/test?timeout=5").unwrap();
        assert_eq!(opts.host, "db");
        assert_eq!(opts.port, 5433);
        assert_eq!(opts.user, "alice");
        assert_eq!(opts.password.as_deref(), Some("secret"));
        assert_eq!(opts.database.as_deref(), Some("test"));
        assert_eq!(opts.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn url_scheme_is_checked() {
        assert!(Opts::try_from("mysql://localhost/test").is_err());
    }
}
