use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("courses.sqlite3");
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS course_categories(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            parent TEXT,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(parent) REFERENCES course_categories(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_course_categories_parent ON course_categories(parent)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            fullname TEXT NOT NULL,
            shortname TEXT NOT NULL UNIQUE,
            idnumber TEXT UNIQUE,
            category_id TEXT NOT NULL,
            start_date INTEGER NOT NULL,
            visible INTEGER NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(category_id) REFERENCES course_categories(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_category ON courses(category_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_category_sort ON courses(category_id, sort_order)",
        [],
    )?;

    // Per-course content rows copied by the duplication service.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS course_sections(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            summary TEXT,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_course_sections_course ON course_sections(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS roles(
            id TEXT PRIMARY KEY,
            shortname TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    // One permission scope per course.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS contexts(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL UNIQUE,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS role_assignments(
            id TEXT PRIMARY KEY,
            context_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            role_id TEXT NOT NULL,
            FOREIGN KEY(context_id) REFERENCES contexts(id),
            FOREIGN KEY(user_id) REFERENCES users(id),
            FOREIGN KEY(role_id) REFERENCES roles(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_role_assignments_context ON role_assignments(context_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrol_instances(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            method TEXT NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrol_instances_course ON enrol_instances(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_enrolments(
            id TEXT PRIMARY KEY,
            instance_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            time_start INTEGER NOT NULL,
            time_end INTEGER,
            modifier TEXT,
            FOREIGN KEY(instance_id) REFERENCES enrol_instances(id),
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_user_enrolments_instance ON user_enrolments(instance_id)",
        [],
    )?;

    Ok(())
}
