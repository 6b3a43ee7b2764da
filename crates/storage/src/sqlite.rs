use rusqlite::{Connection, OptionalExtension, params};

use looks_core::{
    FieldDefinition, FieldKind, FieldValue, LookFields, LookId, LookNode, LookRevision, LookUuid,
    NewLook, RevisionId, TreeRow, TreeUpdate, UserId,
};

use crate::error::StorageError;
use crate::settings::{KEY_DEFAULT, KEY_DEFAULT_ADMIN, KEY_MAPPING, LookSettings};
use crate::traits::{LookStorage, NameMatch};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn serialization(e: impl std::fmt::Display) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Case-insensitive identity of a look name. SQLite's NOCASE folds ASCII
/// only, so the key is computed here.
fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Unique-index failures on `looks.name_key` become `DuplicateName`; other
/// constraint failures keep their message.
fn map_write_error(err: rusqlite::Error, name: &str) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StorageError::DuplicateName {
                name: name.to_string(),
            }
        }
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(
                message.unwrap_or_else(|| format!("invalid look {name:?}")),
            )
        }
        other => StorageError::Sqlite(other),
    }
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn hydrate_all(&self, rows: Vec<LookRow>) -> Result<Vec<LookNode>, StorageError> {
        let definitions = self.field_definitions()?;
        rows.into_iter()
            .map(|row| hydrate(&self.conn, row, &definitions))
            .collect()
    }
}

const LOOK_COLUMNS: &str =
    "id, uuid, revision_id, name, parent, weight, published, owner, created_at, changed_at";

struct LookRow {
    id: i64,
    uuid: Vec<u8>,
    revision_id: i64,
    name: String,
    parent: Option<i64>,
    weight: i64,
    published: bool,
    owner: Option<i64>,
    created_at: i64,
    changed_at: i64,
}

fn read_look_row(row: &rusqlite::Row) -> rusqlite::Result<LookRow> {
    Ok(LookRow {
        id: row.get(0)?,
        uuid: row.get(1)?,
        revision_id: row.get(2)?,
        name: row.get(3)?,
        parent: row.get(4)?,
        weight: row.get(5)?,
        published: row.get(6)?,
        owner: row.get(7)?,
        created_at: row.get(8)?,
        changed_at: row.get(9)?,
    })
}

fn hydrate(
    conn: &Connection,
    row: LookRow,
    definitions: &[FieldDefinition],
) -> Result<LookNode, StorageError> {
    let id = LookId::new(row.id);
    let mut fields: LookFields = definitions
        .iter()
        .map(|d| (d.name.clone(), FieldValue::Null))
        .collect();
    fields.extend(stored_fields(conn, id)?);

    Ok(LookNode {
        id,
        uuid: LookUuid::from_bytes(to_array::<16>(row.uuid, "uuid")?),
        revision_id: RevisionId::new(row.revision_id),
        name: row.name,
        parent: row.parent.and_then(LookId::from_raw),
        weight: row.weight,
        published: row.published,
        owner: row.owner.and_then(UserId::from_raw),
        created_at: row.created_at,
        changed_at: row.changed_at,
        fields,
    })
}

fn stored_fields(conn: &Connection, id: LookId) -> Result<LookFields, StorageError> {
    let mut stmt = conn.prepare("SELECT field_name, value FROM look_fields WHERE look_id = ?1")?;
    let rows = stmt.query_map(params![id.get()], |row| {
        let key: String = row.get(0)?;
        let val_bytes: Vec<u8> = row.get(1)?;
        Ok((key, val_bytes))
    })?;

    let mut fields = LookFields::new();
    for row in rows {
        let (key, val_bytes) = row?;
        let value = FieldValue::from_msgpack(&val_bytes).map_err(serialization)?;
        fields.insert(key, value);
    }
    Ok(fields)
}

/// Null values are not stored; a missing row reads back as `Null`.
fn write_fields(conn: &Connection, id: LookId, fields: &LookFields) -> Result<(), StorageError> {
    for (key, value) in fields.iter().filter(|(_, v)| !v.is_null()) {
        let bytes = value.to_msgpack().map_err(serialization)?;
        conn.execute(
            "INSERT INTO look_fields (look_id, field_name, value) VALUES (?1, ?2, ?3)",
            params![id.get(), key, bytes],
        )?;
    }
    Ok(())
}

/// Snapshot the look's current row and fields as a new revision and point
/// the look at it.
fn record_revision(
    conn: &Connection,
    id: LookId,
    log_message: Option<&str>,
) -> Result<RevisionId, StorageError> {
    let fields = stored_fields(conn, id)?;
    let fields_bytes = rmp_serde::to_vec(&fields).map_err(serialization)?;
    conn.execute(
        "INSERT INTO look_revisions (look_id, name, parent, weight, published, fields, author, log_message)
         SELECT id, name, parent, weight, published, ?2, owner, ?3 FROM looks WHERE id = ?1",
        params![id.get(), fields_bytes, log_message],
    )?;
    let revision_id = RevisionId::new(conn.last_insert_rowid());
    conn.execute(
        "UPDATE looks SET revision_id = ?1 WHERE id = ?2",
        params![revision_id.get(), id.get()],
    )?;
    Ok(revision_id)
}

fn decode_setting<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    rmp_serde::from_slice(bytes).map_err(serialization)
}

impl LookStorage for SqliteStorage {
    fn create_look(
        &mut self,
        look: &NewLook,
        log_message: Option<&str>,
    ) -> Result<LookNode, StorageError> {
        let tx = self.conn.transaction()?;
        let uuid = LookUuid::new();
        tx.execute(
            "INSERT INTO looks (uuid, name, name_key, parent, weight, published, owner) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uuid.as_bytes().as_slice(),
                look.name,
                name_key(&look.name),
                look.parent.map(i64::from),
                look.weight,
                look.published,
                look.owner.map(i64::from),
            ],
        )
        .map_err(|e| map_write_error(e, &look.name))?;
        let id = LookId::new(tx.last_insert_rowid());
        write_fields(&tx, id, &look.fields)?;
        record_revision(&tx, id, log_message)?;
        tx.commit()?;

        tracing::debug!(look_id = %id, name = %look.name, "stored new look");
        self.load_look(id)?
            .ok_or_else(|| StorageError::NotFound(format!("look {id}")))
    }

    fn update_look(
        &mut self,
        look: &LookNode,
        log_message: Option<&str>,
    ) -> Result<RevisionId, StorageError> {
        let tx = self.conn.transaction()?;
        let changed = tx
            .execute(
                "UPDATE looks SET name = ?1, name_key = ?2, parent = ?3, weight = ?4, published = ?5, owner = ?6, changed_at = unixepoch() WHERE id = ?7",
                params![
                    look.name,
                    name_key(&look.name),
                    look.parent.map(i64::from),
                    look.weight,
                    look.published,
                    look.owner.map(i64::from),
                    look.id.get(),
                ],
            )
            .map_err(|e| map_write_error(e, &look.name))?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("look {}", look.id)));
        }
        tx.execute(
            "DELETE FROM look_fields WHERE look_id = ?1",
            params![look.id.get()],
        )?;
        write_fields(&tx, look.id, &look.fields)?;
        let revision_id = record_revision(&tx, look.id, log_message)?;
        tx.commit()?;

        tracing::debug!(look_id = %look.id, revision_id = %revision_id, "stored look revision");
        Ok(revision_id)
    }

    fn load_look(&self, id: LookId) -> Result<Option<LookNode>, StorageError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {LOOK_COLUMNS} FROM looks WHERE id = ?1"),
                params![id.get()],
                read_look_row,
            )
            .optional()?;
        match row {
            Some(row) => Ok(self.hydrate_all(vec![row])?.pop()),
            None => Ok(None),
        }
    }

    fn find_by_name(&self, name: &str) -> Result<Option<NameMatch>, StorageError> {
        let found = self
            .conn
            .query_row(
                "SELECT id, published FROM looks WHERE name_key = ?1",
                params![name_key(name)],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()?;
        Ok(found.map(|(id, published)| NameMatch {
            id: LookId::new(id),
            published,
        }))
    }

    fn load_children(&self, parent: LookId) -> Result<Vec<LookNode>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOOK_COLUMNS} FROM looks WHERE parent = ?1 ORDER BY weight, name_key"
        ))?;
        let rows = stmt
            .query_map(params![parent.get()], read_look_row)?
            .collect::<Result<Vec<_>, _>>()?;
        self.hydrate_all(rows)
    }

    fn tree_rows(&self) -> Result<Vec<TreeRow>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, parent, weight FROM looks ORDER BY weight, name_key")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TreeRow {
                    id: LookId::new(row.get(0)?),
                    name: row.get(1)?,
                    parent: row.get::<_, Option<i64>>(2)?.and_then(LookId::from_raw),
                    weight: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn names(&self) -> Result<Vec<(LookId, String)>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM looks ORDER BY name_key")?;
        let rows = stmt
            .query_map([], |row| Ok((LookId::new(row.get(0)?), row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn text_field_rules(&self, field_name: &str) -> Result<Vec<(LookId, String)>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT look_id, value FROM look_fields WHERE field_name = ?1 ORDER BY look_id",
        )?;
        let rows = stmt
            .query_map(params![field_name], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rules = Vec::new();
        for (id, bytes) in rows {
            let value = FieldValue::from_msgpack(&bytes).map_err(serialization)?;
            if let Some(text) = value.as_text().filter(|t| !t.trim().is_empty()) {
                rules.push((LookId::new(id), text.to_string()));
            }
        }
        Ok(rules)
    }

    fn reparent_and_reweight(&mut self, updates: &[TreeUpdate]) -> Result<Vec<LookId>, StorageError> {
        let tx = self.conn.transaction()?;
        let mut written = Vec::new();
        for update in updates {
            let current = tx
                .query_row(
                    "SELECT parent, weight FROM looks WHERE id = ?1",
                    params![update.id.get()],
                    |row| Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;
            let Some((parent, weight)) = current else {
                return Err(StorageError::NotFound(format!("look {}", update.id)));
            };
            if parent.and_then(LookId::from_raw) == update.parent && weight == update.weight {
                continue;
            }
            tx.execute(
                "UPDATE looks SET parent = ?1, weight = ?2, changed_at = unixepoch() WHERE id = ?3",
                params![update.parent.map(i64::from), update.weight, update.id.get()],
            )?;
            written.push(update.id);
        }
        tx.commit()?;
        Ok(written)
    }

    fn delete_look(&mut self, id: LookId) -> Result<Vec<LookId>, StorageError> {
        let tx = self.conn.transaction()?;
        let parent = tx
            .query_row(
                "SELECT parent FROM looks WHERE id = ?1",
                params![id.get()],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?;
        let Some(parent) = parent else {
            return Err(StorageError::NotFound(format!("look {id}")));
        };
        let children = {
            let mut stmt = tx.prepare(
                "SELECT id FROM looks WHERE parent = ?1 AND id != ?1 ORDER BY weight, name_key",
            )?;
            stmt.query_map(params![id.get()], |row| row.get::<_, i64>(0))?
                .map(|r| r.map(LookId::new))
                .collect::<Result<Vec<_>, _>>()?
        };

        tx.execute(
            "UPDATE looks SET parent = ?1, changed_at = unixepoch() WHERE parent = ?2 AND id != ?2",
            params![parent, id.get()],
        )?;
        tx.execute("DELETE FROM look_fields WHERE look_id = ?1", params![id.get()])?;
        tx.execute("DELETE FROM look_revisions WHERE look_id = ?1", params![id.get()])?;
        tx.execute("DELETE FROM looks WHERE id = ?1", params![id.get()])?;
        tx.commit()?;

        tracing::debug!(look_id = %id, reassigned = children.len(), "deleted look");
        Ok(children)
    }

    fn revision_ids(&self, id: LookId) -> Result<Vec<RevisionId>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT revision_id FROM look_revisions WHERE look_id = ?1 ORDER BY revision_id",
        )?;
        let ids = stmt
            .query_map(params![id.get()], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(RevisionId::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn author_revision_ids(&self, author: UserId) -> Result<Vec<RevisionId>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT revision_id FROM look_revisions WHERE author = ?1 ORDER BY revision_id",
        )?;
        let ids = stmt
            .query_map(params![author.get()], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(RevisionId::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn load_revision(&self, revision_id: RevisionId) -> Result<Option<LookRevision>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT look_id, name, parent, weight, published, fields, author, log_message, created_at
                 FROM look_revisions WHERE revision_id = ?1",
                params![revision_id.get()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, i64>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((look_id, name, parent, weight, published, fields, author, log_message, created_at)) =
            row
        else {
            return Ok(None);
        };
        Ok(Some(LookRevision {
            revision_id,
            look_id: LookId::new(look_id),
            name,
            parent: parent.and_then(LookId::from_raw),
            weight,
            published,
            fields: rmp_serde::from_slice(&fields).map_err(serialization)?,
            author: author.and_then(UserId::from_raw),
            log_message,
            created_at,
        }))
    }

    fn delete_revision(&mut self, revision_id: RevisionId) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        let current = tx
            .query_row(
                "SELECT l.revision_id FROM look_revisions r JOIN looks l ON l.id = r.look_id WHERE r.revision_id = ?1",
                params![revision_id.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        match current {
            None => return Err(StorageError::NotFound(format!("revision {revision_id}"))),
            Some(current) if current == revision_id.get() => {
                return Err(StorageError::ConstraintViolation(format!(
                    "revision {revision_id} is the current revision"
                )));
            }
            Some(_) => {}
        }
        tx.execute(
            "DELETE FROM look_revisions WHERE revision_id = ?1",
            params![revision_id.get()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn field_definitions(&self) -> Result<Vec<FieldDefinition>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT field_name, label, kind FROM field_definitions ORDER BY field_name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut definitions = Vec::with_capacity(rows.len());
        for (name, label, kind) in rows {
            definitions.push(FieldDefinition {
                name,
                label,
                kind: FieldKind::parse(&kind)?,
            });
        }
        Ok(definitions)
    }

    fn save_field_definition(&mut self, definition: &FieldDefinition) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO field_definitions (field_name, label, kind) VALUES (?1, ?2, ?3)
             ON CONFLICT(field_name) DO UPDATE SET label = excluded.label, kind = excluded.kind",
            params![definition.name, definition.label, definition.kind.as_str()],
        )?;
        Ok(())
    }

    fn load_settings(&self) -> Result<LookSettings, StorageError> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut settings = LookSettings::default();
        for (key, value) in rows {
            match key.as_str() {
                KEY_DEFAULT => settings.default = decode_setting(&value)?,
                KEY_DEFAULT_ADMIN => settings.default_admin = decode_setting(&value)?,
                KEY_MAPPING => settings.mapping = decode_setting(&value)?,
                other => tracing::debug!(key = other, "ignoring unknown setting"),
            }
        }
        Ok(settings)
    }

    fn save_settings(&mut self, settings: &LookSettings) -> Result<(), StorageError> {
        let entries = [
            (KEY_DEFAULT, rmp_serde::to_vec(&settings.default).map_err(serialization)?),
            (
                KEY_DEFAULT_ADMIN,
                rmp_serde::to_vec(&settings.default_admin).map_err(serialization)?,
            ),
            (KEY_MAPPING, rmp_serde::to_vec(&settings.mapping).map_err(serialization)?),
        ];
        let tx = self.conn.transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SqliteStorage {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .save_field_definition(&FieldDefinition::new("look_theme", "Theme", FieldKind::Text))
            .unwrap();
        storage
            .save_field_definition(&FieldDefinition::new("look_path", "Paths", FieldKind::Text))
            .unwrap();
        storage
    }

    #[test]
    fn create_and_load() {
        let mut storage = storage();
        let created = storage
            .create_look(
                &NewLook::named("Main").with_field("look_theme", FieldValue::Text("olivero".into())),
                Some("initial"),
            )
            .unwrap();

        let loaded = storage.load_look(created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.weight, looks_core::DEFAULT_WEIGHT);
        assert_eq!(loaded.fields.get("look_path"), Some(&FieldValue::Null));
        assert_eq!(loaded.field("look_theme"), Some(&FieldValue::Text("olivero".into())));
        assert_eq!(storage.revision_ids(created.id).unwrap(), vec![loaded.revision_id]);
    }

    #[test]
    fn duplicate_name_ignores_case() {
        let mut storage = storage();
        storage.create_look(&NewLook::named("Main"), None).unwrap();
        let err = storage.create_look(&NewLook::named("MAIN"), None).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateName { .. }), "got {err:?}");
    }

    #[test]
    fn empty_name_is_a_constraint_violation() {
        let mut storage = storage();
        let err = storage.create_look(&NewLook::named(""), None).unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation(_)), "got {err:?}");
    }

    #[test]
    fn find_by_name_is_case_insensitive_and_exact() {
        let mut storage = storage();
        let main = storage.create_look(&NewLook::named("Main"), None).unwrap();
        let hit = storage.find_by_name("main").unwrap().unwrap();
        assert_eq!(hit.id, main.id);
        assert!(hit.published);
        assert!(storage.find_by_name("Mai").unwrap().is_none());
        assert!(storage.find_by_name("Ma%").unwrap().is_none());
    }

    #[test]
    fn non_ascii_names_ignore_case() {
        let mut storage = storage();
        let summer = storage.create_look(&NewLook::named("Été"), None).unwrap();
        assert_eq!(storage.find_by_name("été").unwrap().unwrap().id, summer.id);
        assert_eq!(storage.find_by_name("ÉTÉ").unwrap().unwrap().id, summer.id);
        assert!(storage.find_by_name("ete").unwrap().is_none());

        let err = storage.create_look(&NewLook::named("été"), None).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateName { .. }), "got {err:?}");
        storage.create_look(&NewLook::named("ΣΟΦΙΑ"), None).unwrap();
        let err = storage.create_look(&NewLook::named("σοφια"), None).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateName { .. }), "got {err:?}");
    }

    #[test]
    fn children_ordered_by_weight_then_name() {
        let mut storage = storage();
        let root = storage.create_look(&NewLook::named("root"), None).unwrap();
        storage
            .create_look(&NewLook::named("b").with_parent(root.id).with_weight(1), None)
            .unwrap();
        storage
            .create_look(&NewLook::named("a").with_parent(root.id).with_weight(1), None)
            .unwrap();
        storage
            .create_look(&NewLook::named("z").with_parent(root.id).with_weight(-1), None)
            .unwrap();

        let names: Vec<String> = storage
            .load_children(root.id)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["z", "a", "b"]);
    }

    #[test]
    fn ancestors_stop_at_broken_link() {
        let mut storage = storage();
        let orphan = storage
            .create_look(&NewLook::named("orphan").with_parent(LookId::new(999)), None)
            .unwrap();
        let chain = storage.load_ancestors(orphan.id).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].id, orphan.id);
    }

    #[test]
    fn ancestors_terminate_on_cycle() {
        let mut storage = storage();
        let a = storage.create_look(&NewLook::named("a"), None).unwrap();
        let b = storage
            .create_look(&NewLook::named("b").with_parent(a.id), None)
            .unwrap();
        let mut a = storage.load_look(a.id).unwrap().unwrap();
        a.parent = Some(b.id);
        storage.update_look(&a, None).unwrap();

        let chain: Vec<LookId> = storage
            .load_ancestors(b.id)
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(chain, vec![b.id, a.id]);
    }

    #[test]
    fn reparent_writes_only_changed_rows() {
        let mut storage = storage();
        let a = storage.create_look(&NewLook::named("a").with_weight(1), None).unwrap();
        let b = storage.create_look(&NewLook::named("b").with_weight(2), None).unwrap();
        let written = storage
            .reparent_and_reweight(&[
                TreeUpdate { id: a.id, parent: None, weight: 1 },
                TreeUpdate { id: b.id, parent: Some(a.id), weight: 2 },
            ])
            .unwrap();
        assert_eq!(written, vec![b.id]);
        assert_eq!(storage.load_look(b.id).unwrap().unwrap().parent, Some(a.id));
    }

    #[test]
    fn reparent_with_unknown_id_rolls_back() {
        let mut storage = storage();
        let a = storage.create_look(&NewLook::named("a").with_weight(1), None).unwrap();
        let err = storage
            .reparent_and_reweight(&[
                TreeUpdate { id: a.id, parent: None, weight: 5 },
                TreeUpdate { id: LookId::new(404), parent: None, weight: 6 },
            ])
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(storage.load_look(a.id).unwrap().unwrap().weight, 1);
    }

    #[test]
    fn delete_reassigns_children_to_grandparent() {
        let mut storage = storage();
        let g = storage.create_look(&NewLook::named("g"), None).unwrap();
        let p = storage.create_look(&NewLook::named("p").with_parent(g.id), None).unwrap();
        let c1 = storage.create_look(&NewLook::named("c1").with_parent(p.id), None).unwrap();
        let c2 = storage.create_look(&NewLook::named("c2").with_parent(p.id), None).unwrap();

        let reassigned = storage.delete_look(p.id).unwrap();
        assert_eq!(reassigned, vec![c1.id, c2.id]);
        assert!(storage.load_look(p.id).unwrap().is_none());
        assert!(storage.revision_ids(p.id).unwrap().is_empty());
        assert_eq!(storage.load_look(c1.id).unwrap().unwrap().parent, Some(g.id));
        assert_eq!(storage.load_look(c2.id).unwrap().unwrap().parent, Some(g.id));
    }

    #[test]
    fn delete_root_makes_children_roots() {
        let mut storage = storage();
        let root = storage.create_look(&NewLook::named("root"), None).unwrap();
        let child = storage
            .create_look(&NewLook::named("child").with_parent(root.id), None)
            .unwrap();
        storage.delete_look(root.id).unwrap();
        assert!(storage.load_look(child.id).unwrap().unwrap().is_root());
    }

    #[test]
    fn delete_missing_look_is_not_found() {
        let mut storage = storage();
        assert!(matches!(
            storage.delete_look(LookId::new(3)),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn revisions_snapshot_and_current_is_protected() {
        let mut storage = storage();
        let mut look = storage
            .create_look(
                &NewLook::named("main")
                    .with_owner(UserId::new(7))
                    .with_field("look_theme", FieldValue::Text("one".into())),
                Some("first"),
            )
            .unwrap();
        let first = look.revision_id;
        look.fields
            .insert("look_theme".into(), FieldValue::Text("two".into()));
        let second = storage.update_look(&look, Some("second")).unwrap();

        let old = storage.load_revision(first).unwrap().unwrap();
        assert_eq!(old.fields.get("look_theme"), Some(&FieldValue::Text("one".into())));
        assert_eq!(old.log_message.as_deref(), Some("first"));
        assert_eq!(old.author, Some(UserId::new(7)));
        assert_eq!(
            storage.author_revision_ids(UserId::new(7)).unwrap(),
            vec![first, second]
        );

        assert!(matches!(
            storage.delete_revision(second),
            Err(StorageError::ConstraintViolation(_))
        ));
        storage.delete_revision(first).unwrap();
        assert_eq!(storage.revision_ids(look.id).unwrap(), vec![second]);
    }

    #[test]
    fn text_field_rules_skip_empty_values() {
        let mut storage = storage();
        let a = storage
            .create_look(
                &NewLook::named("a").with_field("look_path", FieldValue::Text("/blog/*".into())),
                None,
            )
            .unwrap();
        storage
            .create_look(
                &NewLook::named("b").with_field("look_path", FieldValue::Text("  ".into())),
                None,
            )
            .unwrap();
        storage.create_look(&NewLook::named("c"), None).unwrap();
        assert_eq!(
            storage.text_field_rules("look_path").unwrap(),
            vec![(a.id, "/blog/*".to_string())]
        );
    }

    #[test]
    fn settings_roundtrip() {
        let mut storage = storage();
        assert_eq!(storage.load_settings().unwrap(), LookSettings::default());

        let mut settings = LookSettings {
            default: Some(LookId::new(3)),
            default_admin: None,
            ..Default::default()
        };
        settings.mapping.entry("olivero".into()).or_default().insert(
            "field_header".into(),
            crate::FieldMapping::new(".site-header"),
        );
        storage.save_settings(&settings).unwrap();
        assert_eq!(storage.load_settings().unwrap(), settings);
    }

    #[test]
    fn file_backed_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("looks.db");
        let path = path.to_str().unwrap();
        let id = {
            let mut storage = SqliteStorage::open(path).unwrap();
            storage.create_look(&NewLook::named("kept"), None).unwrap().id
        };
        let storage = SqliteStorage::open(path).unwrap();
        assert_eq!(storage.load_look(id).unwrap().unwrap().name, "kept");
    }
}
