use anyhow::Context as _;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

/// Execution context threaded into every store call. Nothing in this tool
/// reads ambient global state; the connection and the acting user travel
/// together as one value.
pub struct Ctx<'a> {
    pub conn: &'a Connection,
    pub acting_user: Option<String>,
}

/// The engine only ever needs a category's identity and display name; the
/// parent link and sibling position live in the store and stay there.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Course {
    pub id: String,
    pub fullname: String,
    pub shortname: String,
    pub idnumber: Option<String>,
    pub category_id: String,
    pub start_date: i64,
    pub visible: bool,
    pub sort_order: i64,
}

/// A course row about to be inserted. Deliberately has no id field: "insert
/// as new" is expressed by the type, not by nulling out a copied id.
#[derive(Debug, Clone)]
pub struct NewCourseDraft {
    pub fullname: String,
    pub shortname: String,
    pub idnumber: Option<String>,
    pub category_id: String,
    pub start_date: i64,
    pub visible: bool,
}

impl NewCourseDraft {
    /// Working copy of a source course, reparented into `target_category`.
    /// Visibility is forced on: a migrated course must not stay hidden
    /// because the source happened to be.
    pub fn from_source(source: &Course, target_category: &str) -> Self {
        NewCourseDraft {
            fullname: source.fullname.clone(),
            shortname: source.shortname.clone(),
            idnumber: source.idnumber.clone(),
            category_id: target_category.to_string(),
            start_date: source.start_date,
            visible: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub user_id: String,
    pub role_id: String,
}

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn row_to_course(row: &rusqlite::Row) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        fullname: row.get(1)?,
        shortname: row.get(2)?,
        idnumber: row.get(3)?,
        category_id: row.get(4)?,
        start_date: row.get(5)?,
        visible: row.get::<_, i64>(6)? != 0,
        sort_order: row.get(7)?,
    })
}

/// Immediate children of `parent` in display order. `None` means the root.
pub fn child_categories(ctx: &Ctx, parent: Option<&str>) -> anyhow::Result<Vec<Category>> {
    let sql = match parent {
        Some(_) => {
            "SELECT id, name FROM course_categories
             WHERE parent = ? ORDER BY sort_order, name"
        }
        None => {
            "SELECT id, name FROM course_categories
             WHERE parent IS NULL ORDER BY sort_order, name"
        }
    };
    let mut stmt = ctx.conn.prepare(sql)?;
    let rows = match parent {
        Some(p) => stmt.query_map([p], row_to_category)?.collect::<Result<Vec<_>, _>>()?,
        None => stmt.query_map([], row_to_category)?.collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

pub fn create_category(ctx: &Ctx, name: &str, parent: Option<&str>) -> anyhow::Result<Category> {
    // Place the new category after its current siblings.
    let next_sort: i64 = match parent {
        Some(p) => ctx.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM course_categories WHERE parent = ?",
            [p],
            |r| r.get(0),
        )?,
        None => ctx.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM course_categories WHERE parent IS NULL",
            [],
            |r| r.get(0),
        )?,
    };

    let id = Uuid::new_v4().to_string();
    ctx.conn
        .execute(
            "INSERT INTO course_categories(id, name, parent, sort_order) VALUES(?, ?, ?, ?)",
            (&id, name, parent, next_sort),
        )
        .with_context(|| format!("failed to create category \"{}\"", name))?;

    Ok(Category {
        id,
        name: name.to_string(),
    })
}

pub fn category_by_name(ctx: &Ctx, name: &str) -> anyhow::Result<Option<Category>> {
    let found = ctx
        .conn
        .query_row(
            "SELECT id, name FROM course_categories WHERE name = ?",
            [name],
            row_to_category,
        )
        .optional()?;
    Ok(found)
}

/// Courses in a category, descending sort order. Matches the display order
/// the source system uses, so the progress log lines up with what an
/// operator sees in the category view.
pub fn courses_in_category(ctx: &Ctx, category_id: &str) -> anyhow::Result<Vec<Course>> {
    let mut stmt = ctx.conn.prepare(
        "SELECT id, fullname, shortname, idnumber, category_id, start_date, visible, sort_order
         FROM courses WHERE category_id = ? ORDER BY sort_order DESC",
    )?;
    let rows = stmt
        .query_map([category_id], row_to_course)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn course_by_id(ctx: &Ctx, course_id: &str) -> anyhow::Result<Option<Course>> {
    let found = ctx
        .conn
        .query_row(
            "SELECT id, fullname, shortname, idnumber, category_id, start_date, visible, sort_order
             FROM courses WHERE id = ?",
            [course_id],
            row_to_course,
        )
        .optional()?;
    Ok(found)
}

/// Exact-fullname lookup for the reserve list. Names without a matching
/// course are simply absent from the result.
pub fn courses_by_fullnames(ctx: &Ctx, fullnames: &[String]) -> anyhow::Result<Vec<Course>> {
    if fullnames.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; fullnames.len()].join(", ");
    let sql = format!(
        "SELECT id, fullname, shortname, idnumber, category_id, start_date, visible, sort_order
         FROM courses WHERE fullname IN ({}) ORDER BY sort_order DESC",
        placeholders
    );
    let mut stmt = ctx.conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(fullnames.iter()), row_to_course)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Bulk-move courses into a category in one statement.
pub fn move_courses(ctx: &Ctx, course_ids: &[String], target_category_id: &str) -> anyhow::Result<usize> {
    if course_ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; course_ids.len()].join(", ");
    let sql = format!(
        "UPDATE courses SET category_id = ? WHERE id IN ({})",
        placeholders
    );
    let mut params: Vec<&str> = vec![target_category_id];
    params.extend(course_ids.iter().map(|s| s.as_str()));
    let changed = ctx.conn.execute(&sql, params_from_iter(params))?;
    Ok(changed)
}

pub fn shortname_taken(ctx: &Ctx, shortname: &str) -> anyhow::Result<bool> {
    let found: Option<i64> = ctx
        .conn
        .query_row("SELECT 1 FROM courses WHERE shortname = ?", [shortname], |r| r.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub fn course_context(ctx: &Ctx, course_id: &str) -> anyhow::Result<Option<String>> {
    let found = ctx
        .conn
        .query_row("SELECT id FROM contexts WHERE course_id = ?", [course_id], |r| r.get(0))
        .optional()?;
    Ok(found)
}

/// Privileged (user, role) pairs in a context. Students, parents and guests
/// are never carried over to a duplicated course.
pub fn privileged_assignments(ctx: &Ctx, context_id: &str) -> anyhow::Result<Vec<Assignment>> {
    let mut stmt = ctx.conn.prepare(
        "SELECT ra.user_id, ra.role_id
         FROM roles r JOIN role_assignments ra ON r.id = ra.role_id
         WHERE r.shortname NOT IN ('student', 'parent', 'guest') AND ra.context_id = ?",
    )?;
    let rows = stmt
        .query_map([context_id], |row| {
            Ok(Assignment {
                user_id: row.get(0)?,
                role_id: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn manual_enrol_instance(ctx: &Ctx, course_id: &str) -> anyhow::Result<Option<String>> {
    let found = ctx
        .conn
        .query_row(
            "SELECT id FROM enrol_instances WHERE course_id = ? AND method = 'manual'",
            [course_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found)
}

/// Open-ended manual enrolment: start now, no end time.
pub fn create_grant(
    ctx: &Ctx,
    instance_id: &str,
    user_id: &str,
    time_start: i64,
) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    ctx.conn.execute(
        "INSERT INTO user_enrolments(id, instance_id, user_id, time_start, time_end, modifier)
         VALUES(?, ?, ?, ?, NULL, ?)",
        (&id, instance_id, user_id, time_start, ctx.acting_user.as_deref()),
    )?;
    Ok(id)
}

pub fn assign_role(
    ctx: &Ctx,
    context_id: &str,
    user_id: &str,
    role_id: &str,
) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    ctx.conn.execute(
        "INSERT INTO role_assignments(id, context_id, user_id, role_id) VALUES(?, ?, ?, ?)",
        (&id, context_id, user_id, role_id),
    )?;
    Ok(id)
}
