//! Admin reports with one column per registered dynamic field.

use std::{fmt, io};

use chrono::NaiveDate;
use rusqlite::{Connection, types::Value as SqlValue};
use serde::Serialize;

use crate::{
    errors::PortalError,
    registry::FieldRegistry,
    sql::Identifier,
    store::{has_column, table_columns},
    types::{ActingUser, EntityTable, TypedValue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Publications,
    Patents,
    Commercializations,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Publications, ReportKind::Patents, ReportKind::Commercializations];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Publications => "publications",
            ReportKind::Patents => "patents",
            ReportKind::Commercializations => "commercializations",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    fn entity_table(&self) -> Option<EntityTable> {
        match self {
            ReportKind::Publications => None,
            ReportKind::Patents => Some(EntityTable::Patents),
            ReportKind::Commercializations => Some(EntityTable::Commercializations),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tabular report: display headers, the column keys behind them, and text cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    pub headers: Vec<String>,
    pub keys: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Report {
    /// Writes the header row and every data row as CSV with CRLF line endings.
    pub fn write_csv<W: io::Write>(&self, out: W) -> Result<(), PortalError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(out);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String, PortalError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|err| PortalError::Other {
            message: format!("report is not valid UTF-8: {err}").into(),
        })
    }
}

/// `<kind>_report_<YYYY-MM-DD>.csv`
pub fn report_filename(kind: ReportKind, date: NaiveDate) -> String {
    format!("{kind}_report_{}.csv", date.format("%Y-%m-%d"))
}

const OWNER_HEADERS: [&str; 2] = ["User Name", "User Email"];
const OWNER_KEYS: [&str; 2] = ["user_name", "user_email"];

/// Builds a report over every owner's rows. Admin only.
pub fn build_report(conn: &Connection, actor: &ActingUser, kind: ReportKind) -> Result<Report, PortalError> {
    if !actor.is_admin() {
        return Err(PortalError::Unauthorized);
    }
    match kind.entity_table() {
        None => publications_report(conn),
        Some(table) => entity_report(conn, kind, table),
    }
}

fn publications_report(conn: &Connection) -> Result<Report, PortalError> {
    let headers = OWNER_HEADERS.iter().chain(&["Title", "Authors", "Year", "Citations"]);
    let keys = OWNER_KEYS.iter().chain(&["title", "authors", "year", "citations"]);
    let sql = "SELECT u.name, u.email, p.title, p.authors, p.year, p.citations
               FROM publications p JOIN users u ON p.user_id = u.id
               ORDER BY u.name, p.year DESC, p.id";
    Ok(Report {
        kind: ReportKind::Publications,
        headers: headers.map(|header| header.to_string()).collect(),
        keys: keys.map(|key| key.to_string()).collect(),
        rows: select_cells(conn, sql)?,
    })
}

/// Owner columns, then writable base columns, then registered fields in declaration order.
///
/// Every report column is projected explicitly by position, so a dynamic field whose name
/// matches an owner column still reads its own value. Registered fields with no physical
/// column are projected as `NULL`.
fn entity_report(conn: &Connection, kind: ReportKind, table: EntityTable) -> Result<Report, PortalError> {
    let fields = FieldRegistry::new(conn).list_fields(table, false)?;
    let table_ident = Identifier::table(table);
    let stored = table_columns(conn, &table_ident)?;

    let mut headers: Vec<String> = OWNER_HEADERS.iter().map(|header| header.to_string()).collect();
    let mut keys: Vec<String> = OWNER_KEYS.iter().map(|key| key.to_string()).collect();
    let mut projections = vec!["u.name".to_string(), "u.email".to_string()];
    for column in table.writable_columns() {
        headers.push(column.label.to_string());
        keys.push(column.name.to_string());
        projections.push(format!("t.{}", Identifier::from_static(column.name).quoted()));
    }
    for field in &fields {
        headers.push(field.field_label.clone());
        keys.push(field.field_name.clone());
        let projection = match Identifier::parse(&field.field_name) {
            Some(column) if has_column(&stored, column.as_str()) => format!("t.{}", column.quoted()),
            _ => "NULL".to_string(),
        };
        projections.push(projection);
    }

    let sql = format!(
        "SELECT {} FROM {} t JOIN users u ON t.user_id = u.id ORDER BY u.name, t.id",
        projections.join(", "),
        table_ident.quoted()
    );
    Ok(Report {
        kind,
        headers,
        keys,
        rows: select_cells(conn, &sql)?,
    })
}

/// Runs `sql` and renders every result column as text; null becomes the empty string.
fn select_cells(conn: &Connection, sql: &str) -> Result<Vec<Vec<String>>, PortalError> {
    let mut stmt = conn.prepare(sql)?;
    let width = stmt.column_count();
    let rows = stmt.query_map([], |row| {
        (0..width)
            .map(|index| {
                row.get::<_, SqlValue>(index)
                    .map(|value| TypedValue::from(value).to_display_string())
            })
            .collect::<rusqlite::Result<Vec<_>>>()
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::ensure_base_tables, types::Role};

    #[test]
    fn csv_quotes_only_when_needed() {
        let report = Report {
            kind: ReportKind::Patents,
            headers: vec!["Title".into(), "Notes".into()],
            keys: vec!["title".into(), "notes".into()],
            rows: vec![vec!["Widget, v2".into(), "said \"hi\"\nbye".into()], vec!["Plain".into(), String::new()]],
        };
        assert_eq!(
            report.to_csv().unwrap(),
            "Title,Notes\r\n\"Widget, v2\",\"said \"\"hi\"\"\nbye\"\r\nPlain,\r\n"
        );
    }

    #[test]
    fn registered_fields_without_a_column_export_empty_cells() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_base_tables(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, name, email, role) VALUES (1, 'Amy', 'amy@example.com', 'user');
             INSERT INTO patents (user_id, title) VALUES (1, 'Widget');
             INSERT INTO dynamic_fields (table_name, field_name, field_label, field_type)
                 VALUES ('patents', 'ghost', 'Ghost', 'text');",
        )
        .unwrap();

        let admin = ActingUser::new(9, Role::Admin);
        let report = build_report(&conn, &admin, ReportKind::Patents).unwrap();
        assert_eq!(report.keys.last().map(String::as_str), Some("ghost"));
        assert_eq!(report.rows, vec![vec!["Amy", "amy@example.com", "Widget", "", ""]]);
    }

    #[test]
    fn filename_carries_kind_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(report_filename(ReportKind::Commercializations, date), "commercializations_report_2024-03-09.csv");
    }

    #[test]
    fn reports_are_admin_only_and_ordered_by_owner() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_base_tables(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, name, email, role) VALUES (1, 'Zed', 'zed@example.com', 'faculty');
             INSERT INTO users (id, name, email, role) VALUES (2, 'Amy', 'amy@example.com', 'user');
             INSERT INTO publications (user_id, title, year) VALUES (1, 'Late', '2020');
             INSERT INTO publications (user_id, title, year, citations) VALUES (2, 'Early', '2019', '5');",
        )
        .unwrap();

        let user = ActingUser::new(2, Role::User);
        assert!(matches!(
            build_report(&conn, &user, ReportKind::Publications),
            Err(PortalError::Unauthorized)
        ));

        let admin = ActingUser::new(9, Role::Admin);
        let report = build_report(&conn, &admin, ReportKind::Publications).unwrap();
        assert_eq!(report.headers[..3], ["User Name", "User Email", "Title"]);
        assert_eq!(report.rows[0][..3], ["Amy", "amy@example.com", "Early"]);
        assert_eq!(report.rows[1][4..], ["2020", ""]);
    }
}
