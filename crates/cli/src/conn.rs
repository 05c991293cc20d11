use crate::error::CliError;
use connectors::sql::postgres::adapter::PgAdapter;
use planner::query::dialect::{self, Dialect};
use std::str::FromStr;
use tracing::info;

/// Database flavour a plan is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    MySql,
    Postgres,
}

impl FromStr for ConnectionKind {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(ConnectionKind::MySql),
            "pg" | "postgres" | "postgresql" => Ok(ConnectionKind::Postgres),
            other => Err(CliError::InvalidConnectionFormat(other.to_string())),
        }
    }
}

impl ConnectionKind {
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            ConnectionKind::MySql => &dialect::MySql,
            ConnectionKind::Postgres => &dialect::Postgres,
        }
    }
}

pub async fn connect(kind: ConnectionKind, url: &str) -> Result<PgAdapter, CliError> {
    match kind {
        ConnectionKind::Postgres => {
            info!("Connecting to {}", kind.dialect().name());
            Ok(PgAdapter::connect(url).await?)
        }
        ConnectionKind::MySql => Err(CliError::UnsupportedConnectionKind(
            kind.dialect().name(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_kind_aliases() {
        assert_eq!("PG".parse::<ConnectionKind>().unwrap(), ConnectionKind::Postgres);
        assert_eq!("mariadb".parse::<ConnectionKind>().unwrap(), ConnectionKind::MySql);
        assert!(matches!(
            "ftp".parse::<ConnectionKind>(),
            Err(CliError::InvalidConnectionFormat(_))
        ));
        assert_eq!(ConnectionKind::MySql.dialect().get_placeholder(3), "?");
    }
}
