//! Users and departments.

use log::{info, warn};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{PortalError, ValidationError, ValidationIssue, is_constraint_violation},
    types::{ActingUser, Role},
    validators::is_valid_email,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub scholar_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

/// Registration request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// `admin`, `user` or `faculty`.
    pub role: String,
    /// Department id or name; unknown names are created.
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub scholar_link: Option<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role: role.into(),
            ..Default::default()
        }
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn scholar_link(mut self, link: impl Into<String>) -> Self {
        self.scholar_link = Some(link.into());
        self
    }

    fn validate(&self) -> Result<Role, ValidationError> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::new("name", "validation.required", "name is required"));
        }
        if !is_valid_email(self.email.trim()) {
            issues.push(ValidationIssue::new(
                "email",
                "validation.email",
                format!("`{}` is not a valid email address", self.email),
            ));
        }
        let role = Role::parse(self.role.trim());
        if role.is_none() {
            issues.push(ValidationIssue::new(
                "role",
                "validation.role",
                format!("unknown role `{}`", self.role),
            ));
        }
        match role {
            Some(role) if issues.is_empty() => Ok(role),
            _ => Err(ValidationError::new(issues)),
        }
    }
}

const USER_COLUMNS: &str = "u.id, u.name, u.email, u.role, d.name, u.scholar_link";

fn read_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        // The column carries a CHECK over the same three values.
        role: Role::parse(&role).unwrap_or(Role::User),
        department: row.get(4)?,
        scholar_link: row.get(5)?,
    })
}

pub fn register_user(conn: &mut Connection, new: &NewUser) -> Result<User, PortalError> {
    let role = new.validate()?;
    let name = new.name.trim();
    let email = new.email.trim();
    let scholar_link = new
        .scholar_link
        .as_deref()
        .map(str::trim)
        .filter(|link| !link.is_empty());

    let tx = conn.transaction()?;
    let department_id = match new.department.as_deref().map(str::trim) {
        Some(department) if !department.is_empty() => Some(resolve_department(&tx, department)?),
        _ => None,
    };
    let inserted = tx.execute(
        "INSERT INTO users (name, email, role, department_id, scholar_link) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, email, role.as_str(), department_id, scholar_link],
    );
    match inserted {
        Ok(_) => {}
        Err(err) if is_constraint_violation(&err) => {
            warn!("registration rejected: {email} is already registered");
            return Err(PortalError::already_exists("user", email));
        }
        Err(err) => return Err(err.into()),
    }
    let id = tx.last_insert_rowid();
    let user = fetch_user(&tx, id)?.ok_or_else(|| PortalError::not_found("user", Some(id)))?;
    tx.commit()?;

    info!("registered {role} {email} as user {id}");
    Ok(user)
}

/// Department id for an id or a name, creating the department when the name is new.
fn resolve_department(conn: &Connection, department: &str) -> Result<i64, PortalError> {
    if let Ok(id) = department.parse::<i64>() {
        let found: Option<i64> = conn
            .query_row("SELECT id FROM departments WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        if let Some(id) = found {
            return Ok(id);
        }
    }
    let found: Option<i64> = conn
        .query_row("SELECT id FROM departments WHERE name = ?1", params![department], |row| {
            row.get(0)
        })
        .optional()?;
    if let Some(id) = found {
        return Ok(id);
    }
    conn.execute("INSERT INTO departments (name) VALUES (?1)", params![department])?;
    info!("created department {department}");
    Ok(conn.last_insert_rowid())
}

fn fetch_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users u LEFT JOIN departments d ON d.id = u.department_id WHERE u.id = ?1"),
        params![id],
        read_user,
    )
    .optional()
}

pub fn get_user(conn: &Connection, id: i64) -> Result<User, PortalError> {
    fetch_user(conn, id)?.ok_or_else(|| PortalError::not_found("user", Some(id)))
}

/// A user with the number of rows they own in each record table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    pub publication_count: i64,
    pub patent_count: i64,
    pub commercialization_count: i64,
}

/// Users ordered by name, each with per-table counts. Admin only.
///
/// `search` matches a substring of the name or the email, case-insensitively. `%` and `_`
/// in it are matched literally.
pub fn list_users(conn: &Connection, actor: &ActingUser, search: Option<&str>) -> Result<Vec<UserSummary>, PortalError> {
    if !actor.is_admin() {
        return Err(PortalError::Unauthorized);
    }
    let pattern = search
        .map(str::trim)
        .filter(|search| !search.is_empty())
        .map(like_pattern);

    let mut sql = format!(
        "SELECT {USER_COLUMNS},
            (SELECT COUNT(*) FROM publications p WHERE p.user_id = u.id),
            (SELECT COUNT(*) FROM patents t WHERE t.user_id = u.id),
            (SELECT COUNT(*) FROM commercializations c WHERE c.user_id = u.id)
         FROM users u LEFT JOIN departments d ON d.id = u.department_id"
    );
    if pattern.is_some() {
        sql.push_str(" WHERE u.name LIKE ?1 ESCAPE '\\' OR u.email LIKE ?1 ESCAPE '\\'");
    }
    sql.push_str(" ORDER BY u.name, u.id");

    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map(params_from_iter(pattern.iter()), |row| {
            Ok(UserSummary {
                user: read_user(row)?,
                publication_count: row.get(6)?,
                patent_count: row.get(7)?,
                commercialization_count: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Deletes a user; their publications and records go with them. Admin only.
pub fn delete_user(conn: &Connection, actor: &ActingUser, id: i64) -> Result<(), PortalError> {
    if !actor.is_admin() {
        return Err(PortalError::Unauthorized);
    }
    let removed = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    if removed == 0 {
        return Err(PortalError::not_found("user", Some(id)));
    }
    info!("user {} deleted user {id}", actor.id);
    Ok(())
}

pub fn list_departments(conn: &Connection) -> Result<Vec<Department>, PortalError> {
    let mut stmt = conn.prepare("SELECT id, name FROM departments ORDER BY name")?;
    let departments = stmt
        .query_map([], |row| {
            Ok(Department {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(departments)
}

/// Stores the caller's bibliographic profile link.
pub fn set_scholar_link(conn: &Connection, actor: &ActingUser, link: &str) -> Result<(), PortalError> {
    let link = link.trim();
    if link.is_empty() {
        return Err(ValidationError::single("scholar_link", "validation.required", "a profile link is required").into());
    }
    let updated = conn.execute(
        "UPDATE users SET scholar_link = ?1 WHERE id = ?2",
        params![link, actor.id],
    )?;
    if updated == 0 {
        return Err(PortalError::not_found("user", Some(actor.id)));
    }
    Ok(())
}

impl ActingUser {
    /// Loads the role of a stored user.
    pub fn resolve(conn: &Connection, user_id: i64) -> Result<Self, PortalError> {
        let user = get_user(conn, user_id)?;
        Ok(ActingUser::new(user.id, user.role))
    }
}
