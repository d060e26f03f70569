use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{Category, TransactionKind};

pub fn insert_category(conn: &Connection, category: &Category) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO categories (id, user_id, name, kind, color)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            category.id.to_string(),
            category.user_id.to_string(),
            category.name,
            category.kind.as_str(),
            category.color,
        ],
    )?;
    Ok(())
}

pub fn list_categories(conn: &Connection, user_id: &Uuid) -> Result<Vec<Category>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, kind, color FROM categories
         WHERE user_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![user_id.to_string()], category_row)?;
    collect_categories(rows)
}

/// Case-insensitive substring match on the category name, in store order.
/// No tie-break beyond insertion order is defined when several names match.
pub fn find_categories_by_name_like(
    conn: &Connection,
    user_id: &Uuid,
    fragment: &str,
) -> Result<Vec<Category>, DatabaseError> {
    let pattern = format!("%{fragment}%");
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, kind, color FROM categories
         WHERE user_id = ?1 AND LOWER(name) LIKE LOWER(?2) ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![user_id.to_string(), pattern], category_row)?;
    collect_categories(rows)
}

/// First category of the given kind, in store order.
pub fn find_first_category_by_kind(
    conn: &Connection,
    user_id: &Uuid,
    kind: TransactionKind,
) -> Result<Option<Category>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, kind, color FROM categories
         WHERE user_id = ?1 AND kind = ?2 ORDER BY rowid LIMIT 1",
    )?;
    let rows = stmt.query_map(params![user_id.to_string(), kind.as_str()], category_row)?;
    Ok(collect_categories(rows)?.into_iter().next())
}

type CategoryRow = (String, String, String, String, Option<String>);

fn category_row(row: &rusqlite::Row) -> rusqlite::Result<CategoryRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn category_from_row(row: CategoryRow) -> Result<Category, DatabaseError> {
    Ok(Category {
        id: parse_uuid("categories.id", &row.0)?,
        user_id: parse_uuid("categories.user_id", &row.1)?,
        name: row.2,
        kind: TransactionKind::from_str(&row.3)?,
        color: row.4,
    })
}

fn collect_categories(
    rows: impl Iterator<Item = rusqlite::Result<CategoryRow>>,
) -> Result<Vec<Category>, DatabaseError> {
    let mut categories = Vec::new();
    for row in rows {
        categories.push(category_from_row(row?)?);
    }
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::users::insert_user;
    use crate::models::User;

    fn seeded_user(conn: &Connection) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password_hash: "hash".into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        insert_user(conn, &user).unwrap();
        user.id
    }

    fn seed_category(conn: &Connection, user_id: &Uuid, name: &str, kind: TransactionKind) -> Uuid {
        let category = Category {
            id: Uuid::new_v4(),
            user_id: *user_id,
            name: name.into(),
            kind,
            color: None,
        };
        insert_category(conn, &category).unwrap();
        category.id
    }

    #[test]
    fn list_is_scoped_to_owner() {
        let conn = open_memory_database().unwrap();
        let owner = seeded_user(&conn);
        seed_category(&conn, &owner, "Alimentação", TransactionKind::Expense);

        let other = Uuid::new_v4();
        assert!(list_categories(&conn, &other).unwrap().is_empty());
        assert_eq!(list_categories(&conn, &owner).unwrap().len(), 1);
    }

    #[test]
    fn name_match_is_case_insensitive_substring() {
        let conn = open_memory_database().unwrap();
        let owner = seeded_user(&conn);
        seed_category(&conn, &owner, "Alimentação", TransactionKind::Expense);
        seed_category(&conn, &owner, "Transporte", TransactionKind::Expense);

        let found = find_categories_by_name_like(&conn, &owner, "aliment").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Alimentação");
    }

    #[test]
    fn name_matches_come_back_in_store_order() {
        let conn = open_memory_database().unwrap();
        let owner = seeded_user(&conn);
        let first = seed_category(&conn, &owner, "Lazer", TransactionKind::Expense);
        seed_category(&conn, &owner, "Lazer e Viagens", TransactionKind::Expense);

        let found = find_categories_by_name_like(&conn, &owner, "lazer").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, first);
    }

    #[test]
    fn first_by_kind_respects_insertion_order() {
        let conn = open_memory_database().unwrap();
        let owner = seeded_user(&conn);
        let first = seed_category(&conn, &owner, "Moradia", TransactionKind::Expense);
        seed_category(&conn, &owner, "Saúde", TransactionKind::Expense);
        seed_category(&conn, &owner, "Salário", TransactionKind::Income);

        let found = find_first_category_by_kind(&conn, &owner, TransactionKind::Expense)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first);

        let income = find_first_category_by_kind(&conn, &owner, TransactionKind::Income)
            .unwrap()
            .unwrap();
        assert_eq!(income.name, "Salário");
    }

    #[test]
    fn no_category_of_kind_is_none() {
        let conn = open_memory_database().unwrap();
        let owner = seeded_user(&conn);
        seed_category(&conn, &owner, "Moradia", TransactionKind::Expense);

        assert!(find_first_category_by_kind(&conn, &owner, TransactionKind::Income)
            .unwrap()
            .is_none());
    }
}
