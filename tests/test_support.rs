use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

#[allow(dead_code)]
pub fn temp_workspace(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp workspace");
    p
}

/// Opens the workspace database and lays down the course store schema so a
/// test can seed the world the tool will run against. Matches the schema
/// the binary itself creates.
#[allow(dead_code)]
pub fn seed_db(workspace: &Path) -> Connection {
    let conn = Connection::open(workspace.join("courses.sqlite3")).expect("open workspace db");
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS course_categories(
             id TEXT PRIMARY KEY,
             name TEXT NOT NULL,
             parent TEXT,
             sort_order INTEGER NOT NULL,
             FOREIGN KEY(parent) REFERENCES course_categories(id)
         );
         CREATE TABLE IF NOT EXISTS courses(
             id TEXT PRIMARY KEY,
             fullname TEXT NOT NULL,
             shortname TEXT NOT NULL UNIQUE,
             idnumber TEXT UNIQUE,
             category_id TEXT NOT NULL,
             start_date INTEGER NOT NULL,
             visible INTEGER NOT NULL,
             sort_order INTEGER NOT NULL,
             FOREIGN KEY(category_id) REFERENCES course_categories(id)
         );
         CREATE TABLE IF NOT EXISTS course_sections(
             id TEXT PRIMARY KEY,
             course_id TEXT NOT NULL,
             position INTEGER NOT NULL,
             name TEXT NOT NULL,
             summary TEXT,
             FOREIGN KEY(course_id) REFERENCES courses(id)
         );
         CREATE TABLE IF NOT EXISTS users(
             id TEXT PRIMARY KEY,
             username TEXT NOT NULL UNIQUE
         );
         CREATE TABLE IF NOT EXISTS roles(
             id TEXT PRIMARY KEY,
             shortname TEXT NOT NULL UNIQUE
         );
         CREATE TABLE IF NOT EXISTS contexts(
             id TEXT PRIMARY KEY,
             course_id TEXT NOT NULL UNIQUE,
             FOREIGN KEY(course_id) REFERENCES courses(id)
         );
         CREATE TABLE IF NOT EXISTS role_assignments(
             id TEXT PRIMARY KEY,
             context_id TEXT NOT NULL,
             user_id TEXT NOT NULL,
             role_id TEXT NOT NULL,
             FOREIGN KEY(context_id) REFERENCES contexts(id),
             FOREIGN KEY(user_id) REFERENCES users(id),
             FOREIGN KEY(role_id) REFERENCES roles(id)
         );
         CREATE TABLE IF NOT EXISTS enrol_instances(
             id TEXT PRIMARY KEY,
             course_id TEXT NOT NULL,
             method TEXT NOT NULL,
             FOREIGN KEY(course_id) REFERENCES courses(id)
         );
         CREATE TABLE IF NOT EXISTS user_enrolments(
             id TEXT PRIMARY KEY,
             instance_id TEXT NOT NULL,
             user_id TEXT NOT NULL,
             time_start INTEGER NOT NULL,
             time_end INTEGER,
             modifier TEXT,
             FOREIGN KEY(instance_id) REFERENCES enrol_instances(id),
             FOREIGN KEY(user_id) REFERENCES users(id)
         );",
    )
    .expect("create schema");
    conn
}

#[allow(dead_code)]
pub fn run_tool(workspace: &Path, args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_coursemig");
    Command::new(exe)
        .arg("--workspace")
        .arg(workspace)
        .args(args)
        .output()
        .expect("run coursemig")
}

#[allow(dead_code)]
pub fn run_tool_ok(workspace: &Path, args: &[&str]) -> String {
    let out = run_tool(workspace, args);
    assert!(
        out.status.success(),
        "coursemig failed: {}\n{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).to_string()
}

#[allow(dead_code)]
pub fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |r| r.get(0)).expect("count query")
}

#[allow(dead_code)]
pub fn category_id_by_name(conn: &Connection, name: &str) -> Option<String> {
    conn.query_row(
        "SELECT id FROM course_categories WHERE name = ?",
        [name],
        |r| r.get(0),
    )
    .ok()
}
