// ABOUTME: Concrete ProbeRunner that borrows a pool connection and runs the fixed capability probe set.
// ABOUTME: The only place v$version/v$instance/v$database/v$option/v$pdbs are queried directly.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pool-backed capability probe (§4.2 step 1: "borrow a pool connection and
//! run a fixed probe set: version view, option view, container view").

use std::sync::Arc;

use oracle_driver::Row;

use crate::config::Edition;
use crate::errors::{AppError, AppResult};
use crate::oracle::capability::{CapabilityTag, ProbeResult};
use crate::oracle::pool::ConnectionPool;

/// Runs the fixed probe set against a connection borrowed from the pool.
pub struct PoolProbeRunner {
    pool: Arc<ConnectionPool>,
}

impl PoolProbeRunner {
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl crate::oracle::capability::ProbeRunner for PoolProbeRunner {
    async fn probe(&self) -> AppResult<ProbeResult> {
        let mut connection = self.pool.acquire().await?;
        let result = connection.with_connection(|conn| run_probe_queries(conn)).await;
        if result.is_err() {
            connection.mark_broken();
        }
        result
    }
}

fn run_probe_queries(conn: &oracle_driver::Connection) -> AppResult<ProbeResult> {
    let version = probe_version(conn)?;
    let edition = edition_from_banner(&version);
    let is_cdb = probe_is_cdb(conn)?;
    let mut options = probe_options(conn)?;
    if is_cdb {
        options.push(CapabilityTag::Pdb);
    }
    Ok(ProbeResult {
        version,
        edition,
        is_cdb,
        options,
    })
}

fn edition_from_banner(banner: &str) -> Edition {
    if banner.contains("Express Edition") {
        Edition::Express
    } else if banner.contains("Enterprise Edition") {
        Edition::Enterprise
    } else {
        Edition::Standard
    }
}

fn first_text_column(conn: &oracle_driver::Connection, sql: &str, view: &str) -> AppResult<String> {
    let result_set = conn.query(sql, &[]).map_err(|error| translate_probe_error(&error, view))?;
    let row = result_set
        .into_iter()
        .next()
        .ok_or_else(|| AppError::driver("ORA-01403", format!("{view} returned no rows during capability probe")))?
        .map_err(|error| translate_probe_error(&error, view))?;
    extract_text(&row, 0)
}

fn probe_version(conn: &oracle_driver::Connection) -> AppResult<String> {
    first_text_column(
        conn,
        "SELECT banner FROM v$version WHERE banner LIKE 'Oracle%' FETCH FIRST 1 ROWS ONLY",
        "v$version",
    )
}

fn probe_is_cdb(conn: &oracle_driver::Connection) -> AppResult<bool> {
    let cdb = first_text_column(conn, "SELECT cdb FROM v$database", "v$database")?;
    Ok(cdb.eq_ignore_ascii_case("YES"))
}

fn probe_options(conn: &oracle_driver::Connection) -> AppResult<Vec<CapabilityTag>> {
    let sql = "SELECT parameter, value FROM v$option WHERE value = 'TRUE'";
    let rows = conn.query(sql, &[]).map_err(|error| translate_probe_error(&error, "v$option"))?;
    let mut tags = Vec::new();
    for row in rows {
        let row = row.map_err(|error| translate_probe_error(&error, "v$option"))?;
        let parameter: String = extract_text(&row, 0)?;
        if let Some(tag) = map_option_name(&parameter) {
            tags.push(tag);
        }
    }
    if awr_views_exist(conn)? {
        tags.push(CapabilityTag::Awr);
    }
    if vector_type_exists(conn)? {
        tags.push(CapabilityTag::Vector);
    }
    Ok(tags)
}

fn map_option_name(parameter: &str) -> Option<CapabilityTag> {
    match parameter {
        "Partitioning" => Some(CapabilityTag::Partitioning),
        "Oracle Advanced Security" => Some(CapabilityTag::Tde),
        "Oracle Database Vault" => Some(CapabilityTag::Vault),
        "Parallel execution" | "Parallel Query" => Some(CapabilityTag::Parallel),
        "Oracle JSON" | "JSON Developer's Kit" => Some(CapabilityTag::Json),
        _ => None,
    }
}

fn count_query(conn: &oracle_driver::Connection, sql: &str, view: &str) -> AppResult<i64> {
    let result_set = conn.query(sql, &[]).map_err(|error| translate_probe_error(&error, view))?;
    let row = result_set
        .into_iter()
        .next()
        .ok_or_else(|| AppError::driver("ORA-01403", format!("{view} count query returned no rows")))?
        .map_err(|error| translate_probe_error(&error, view))?;
    row.get(0)
        .map_err(|error| AppError::driver("ORA-00000", format!("malformed probe row from {view}: {error}")))
}

fn awr_views_exist(conn: &oracle_driver::Connection) -> AppResult<bool> {
    let count = count_query(
        conn,
        "SELECT COUNT(*) FROM dba_views WHERE view_name = 'DBA_HIST_SNAPSHOT'",
        "dba_views",
    )?;
    Ok(count > 0)
}

fn vector_type_exists(conn: &oracle_driver::Connection) -> AppResult<bool> {
    let count = count_query(
        conn,
        "SELECT COUNT(*) FROM all_synonyms WHERE synonym_name = 'VECTOR'",
        "all_synonyms",
    )?;
    Ok(count > 0)
}

fn extract_text(row: &Row, index: usize) -> AppResult<String> {
    row.get(index)
        .map_err(|error| AppError::driver("ORA-00000", format!("malformed probe row: {error}")))
}

fn translate_probe_error(error: &oracle_driver::Error, view: &str) -> AppError {
    AppError::driver("ORA-00942", format!("capability probe against {view} failed: {error}"))
        .with_hint("confirm the pool user has SELECT on the queried fixed/dynamic views")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_option_names_map_to_tags() {
        assert_eq!(map_option_name("Partitioning"), Some(CapabilityTag::Partitioning));
        assert_eq!(map_option_name("Parallel Query"), Some(CapabilityTag::Parallel));
        assert_eq!(map_option_name("totally unknown"), None);
    }

    #[test]
    fn edition_inferred_from_banner_text() {
        assert_eq!(edition_from_banner("Oracle Database 19c Express Edition"), Edition::Express);
        assert_eq!(edition_from_banner("Oracle Database 19c Enterprise Edition"), Edition::Enterprise);
        assert_eq!(edition_from_banner("Oracle Database 19c Standard Edition 2"), Edition::Standard);
    }
}
