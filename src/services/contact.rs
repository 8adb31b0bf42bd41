use crate::db::now_timestamp;
use crate::models::{ContactMessage, NewContactMessage};
use crate::services::error::ServiceResult;
use crate::Database;

pub fn record_contact_message(
    db: &Database,
    input: &NewContactMessage,
) -> ServiceResult<ContactMessage> {
    let conn = db.get()?;
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO contact_messages (name, email, body, created_at) VALUES (?, ?, ?, ?)",
        (&input.name, &input.email, &input.body, &created_at),
    )?;

    Ok(ContactMessage {
        id: conn.last_insert_rowid(),
        name: input.name.clone(),
        email: input.email.clone(),
        body: input.body.clone(),
        created_at,
    })
}

pub fn list_contact_messages(db: &Database) -> ServiceResult<Vec<ContactMessage>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, name, email, body, created_at FROM contact_messages ORDER BY created_at DESC, id DESC",
    )?;
    let messages = stmt
        .query_map([], |row| {
            Ok(ContactMessage {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                body: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}
