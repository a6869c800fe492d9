//! Move plans as SQL
//!
//! Each shift step becomes one range `UPDATE` over a scope, followed by the
//! element's own relocation. Callers run this inside their transaction.

use kanban_core::{MovePlan, Position, ShiftStep};
use rusqlite::{params, Connection, OptionalExtension};

use super::db::store_err;
use crate::domain::{DomainError, DomainResult};

/// Positioned table and the column naming its scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionTable {
    /// Lists ordered within a board
    Lists,
    /// Cards ordered within a list
    Cards,
}

impl PositionTable {
    fn table(&self) -> &'static str {
        match self {
            PositionTable::Lists => "lists",
            PositionTable::Cards => "cards",
        }
    }

    fn scope_column(&self) -> &'static str {
        match self {
            PositionTable::Lists => "board_id",
            PositionTable::Cards => "list_id",
        }
    }
}

/// Apply one shift step; returns the number of rows moved.
pub fn execute_shift(conn: &Connection, table: PositionTable, step: &ShiftStep) -> DomainResult<usize> {
    let sql = format!(
        "UPDATE {} SET position = position + ?1
         WHERE {} = ?2 AND position > ?3 AND position < ?4 AND (?5 IS NULL OR id != ?5)",
        table.table(),
        table.scope_column()
    );
    conn.execute(
        &sql,
        params![step.delta, step.scope, step.above, step.below, step.except],
    )
    .map_err(store_err)
}

/// Apply every step, then relocate the element. A relocation that matches
/// no row fails, which aborts the enclosing transaction.
pub fn execute_plan(conn: &Connection, table: PositionTable, plan: &MovePlan) -> DomainResult<()> {
    for step in &plan.shifts {
        let moved = execute_shift(conn, table, step)?;
        tracing::debug!(
            table = table.table(),
            scope = %step.scope,
            delta = step.delta,
            "shifted {} rows in ({}, {})",
            moved,
            step.above,
            step.below
        );
    }

    let sql = format!(
        "UPDATE {} SET {} = ?1, position = ?2 WHERE id = ?3",
        table.table(),
        table.scope_column()
    );
    let updated = conn
        .execute(
            &sql,
            params![plan.relocation.scope, plan.relocation.position, plan.relocation.key],
        )
        .map_err(store_err)?;

    if updated == 0 {
        return Err(DomainError::not_found(format!(
            "{} {} not found",
            table.table(),
            plan.relocation.key
        )));
    }
    Ok(())
}

/// Number of children in a scope, i.e. the position a new child gets
pub fn count_in_scope(conn: &Connection, table: PositionTable, scope: &str) -> DomainResult<Position> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?1",
        table.table(),
        table.scope_column()
    );
    conn.query_row(&sql, params![scope], |row| row.get(0))
        .map_err(store_err)
}

/// Scope and position of one element
pub fn locate(conn: &Connection, table: PositionTable, id: &str) -> DomainResult<Option<(String, Position)>> {
    let sql = format!(
        "SELECT {}, position FROM {} WHERE id = ?1",
        table.scope_column(),
        table.table()
    );
    conn.query_row(&sql, params![id], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()
        .map_err(store_err)
}

/// Rewrite a scope's positions to `0..n` keeping the current order.
///
/// Ties (which only exist after a lost race) are broken by creation time.
pub fn reindex_scope(conn: &Connection, table: PositionTable, scope: &str) -> DomainResult<usize> {
    let ids: Vec<String> = {
        let sql = format!(
            "SELECT id FROM {} WHERE {} = ?1 ORDER BY position, created_at, id",
            table.table(),
            table.scope_column()
        );
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let rows = stmt
            .query_map(params![scope], |row| row.get(0))
            .map_err(store_err)?;
        rows.collect::<Result<_, _>>().map_err(store_err)?
    };

    let sql = format!("UPDATE {} SET position = ?1 WHERE id = ?2", table.table());
    let mut changed = 0;
    for (new_pos, id) in ids.iter().enumerate() {
        changed += conn
            .execute(&sql, params![new_pos as Position, id])
            .map_err(store_err)?;
    }
    Ok(changed)
}
