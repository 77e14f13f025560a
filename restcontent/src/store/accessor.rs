//! Generic record access used by the export and import jobs.

use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};
use std::marker::PhantomData;

use super::record::{Entity, Record};
use crate::error::{Error, Result};

/// A JSON object as written to `<group>.json`.
pub type FieldMap = Map<String, Value>;

/// List, marshal, unmarshal and insert records of one table.
///
/// Connection-taking methods run inside whatever transaction the caller
/// holds on that connection.
pub trait EntityAccessor: Send + Sync {
    /// Table this accessor is bound to.
    fn table(&self) -> &'static str;

    /// All rows in insertion order.
    fn list(&self, conn: &Connection) -> Result<Vec<Record>>;

    fn marshal_one(&self, record: &Record) -> Result<FieldMap>;

    /// Build a record from one archived field map.
    ///
    /// Fails with [`Error::Marshal`] when the map does not fit the record type.
    fn unmarshal(&self, fields: Value) -> Result<Record>;

    /// Insert unless a row with the same natural key exists.
    ///
    /// Returns `false` when the insert was skipped.
    fn insert_conflict_free(&self, conn: &Connection, record: &Record) -> Result<bool>;
}

/// [`EntityAccessor`] for any [`Entity`] stored by [`super::Store`].
pub struct TableAccessor<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> TableAccessor<E> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    fn downcast<'a>(&self, record: &'a Record) -> Result<&'a E> {
        E::from_record(record).ok_or_else(|| {
            Error::Marshal(format!(
                "expected {} record, got {}",
                E::TABLE,
                record.table()
            ))
        })
    }
}

impl<E: Entity> Default for TableAccessor<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityAccessor for TableAccessor<E> {
    fn table(&self) -> &'static str {
        E::TABLE
    }

    fn list(&self, conn: &Connection) -> Result<Vec<Record>> {
        Ok(list_rows::<E>(conn)?
            .into_iter()
            .map(Entity::into_record)
            .collect())
    }

    fn marshal_one(&self, record: &Record) -> Result<FieldMap> {
        match serde_json::to_value(self.downcast(record)?)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::Marshal(format!(
                "{} serialized to non-object {}",
                E::TABLE,
                other
            ))),
        }
    }

    fn unmarshal(&self, fields: Value) -> Result<Record> {
        serde_json::from_value::<E>(fields)
            .map(Entity::into_record)
            .map_err(|e| Error::Marshal(format!("{}: {}", E::TABLE, e)))
    }

    fn insert_conflict_free(&self, conn: &Connection, record: &Record) -> Result<bool> {
        insert_row(conn, self.downcast(record)?)
    }
}

pub(crate) fn list_rows<E: Entity>(conn: &Connection) -> Result<Vec<E>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT data FROM \"{}\" ORDER BY seq",
        E::TABLE
    ))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for data in rows {
        out.push(serde_json::from_str(&data?)?);
    }
    Ok(out)
}

pub(crate) fn insert_row<E: Entity>(conn: &Connection, entity: &E) -> Result<bool> {
    let columns: Vec<String> = E::KEY_COLUMNS.iter().map(|c| format!("\"{c}\"")).collect();
    let placeholders: Vec<String> = (1..=E::KEY_COLUMNS.len() + 1)
        .map(|i| format!("?{i}"))
        .collect();
    let sql = format!(
        "INSERT INTO \"{}\" ({}, data) VALUES ({}) ON CONFLICT DO NOTHING",
        E::TABLE,
        columns.join(", "),
        placeholders.join(", ")
    );

    let mut values = entity.natural_key();
    values.push(serde_json::to_string(entity)?);

    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Page, Site};
    use crate::store::Store;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_conflict_free_skips_duplicates() {
        let store = Store::in_memory().unwrap();
        let accessor = TableAccessor::<Site>::new();
        let conn = store.conn().await;

        let site = Site {
            domain: "example.com".into(),
            name: "Example".into(),
            ..Default::default()
        };
        let record = site.clone().into_record();
        assert!(accessor.insert_conflict_free(&conn, &record).unwrap());

        let renamed = Site {
            name: "Other".into(),
            ..site
        }
        .into_record();
        assert!(!accessor.insert_conflict_free(&conn, &renamed).unwrap());

        let rows = accessor.list(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        match &rows[0] {
            Record::Site(s) => assert_eq!(s.name, "Example"),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let store = Store::in_memory().unwrap();
        let accessor = TableAccessor::<Site>::new();
        let conn = store.conn().await;

        for domain in ["c.example", "a.example", "b.example"] {
            let site = Site {
                domain: domain.into(),
                ..Default::default()
            };
            accessor
                .insert_conflict_free(&conn, &site.into_record())
                .unwrap();
        }

        let domains: Vec<String> = accessor
            .list(&conn)
            .unwrap()
            .into_iter()
            .map(|r| match r {
                Record::Site(s) => s.domain,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(domains, vec!["c.example", "a.example", "b.example"]);
    }

    #[test]
    fn test_marshal_and_unmarshal() {
        let accessor = TableAccessor::<Page>::new();
        let record = accessor
            .unmarshal(json!({"siteId": "example.com", "id": "about-us", "body": "hi"}))
            .unwrap();

        let fields = accessor.marshal_one(&record).unwrap();
        assert_eq!(fields["id"], "about-us");
        assert_eq!(fields["siteId"], "example.com");

        let err = accessor.unmarshal(json!({"id": 42})).unwrap_err();
        assert!(matches!(err, Error::Marshal(_)));
    }

    #[test]
    fn test_marshal_rejects_foreign_record() {
        let accessor = TableAccessor::<Page>::new();
        let err = accessor
            .marshal_one(&Site::default().into_record())
            .unwrap_err();
        assert!(matches!(err, Error::Marshal(_)));
    }
}
