use super::FactStore;
use crate::{error::MetricsResult, event::PassEvent};
use chrono::{DateTime, Utc};
use rusqlite::params;

/// A persisted pass log row.
#[derive(Debug, Clone)]
pub struct PassLogEntry {
    pub id:         i64,
    pub pass_id:    String,
    pub classifier: String,
    pub event_type: String,
    pub payload:    String,
    pub created_at: DateTime<Utc>,
}

impl PassLogEntry {
    pub fn event(&self) -> MetricsResult<PassEvent> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

impl FactStore {
    pub fn append_pass_event(&self, event: &PassEvent) -> MetricsResult<()> {
        self.conn.execute(
            "INSERT INTO pass_log (pass_id, classifier, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.pass_id(),
                event.classifier(),
                event.type_name(),
                serde_json::to_string(event)?,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    pub fn pass_events(&self, classifier: &str) -> MetricsResult<Vec<PassLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, pass_id, classifier, event_type, payload, created_at
             FROM pass_log WHERE classifier = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![classifier], |row| {
                Ok(PassLogEntry {
                    id:         row.get(0)?,
                    pass_id:    row.get(1)?,
                    classifier: row.get(2)?,
                    event_type: row.get(3)?,
                    payload:    row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn pass_event_count(&self, event_type: &str) -> MetricsResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM pass_log WHERE event_type = ?1",
                params![event_type],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
