use crate::store::{self, Ctx, NewCourseDraft};
use anyhow::{anyhow, Context as _};
use uuid::Uuid;

pub struct DuplicateOptions {
    /// Copy the source course's enrolments onto the duplicate. The year
    /// migration never sets this; it re-creates privileged enrolments
    /// itself so students are left behind.
    pub copy_enrolments: bool,
}

/// Duplicates `source_id` as a new course described by `draft`: inserts the
/// course row, copies its section content (shifted by `section_offset`),
/// provisions the course context and a default manual enrolment instance,
/// and returns the freshly assigned course id.
///
/// Uniqueness violations (shortname, idnumber) surface as errors; the
/// caller records them per course and moves on.
pub fn duplicate_course(
    ctx: &Ctx,
    source_id: &str,
    draft: &NewCourseDraft,
    section_offset: i64,
    opts: &DuplicateOptions,
) -> anyhow::Result<String> {
    let source = store::course_by_id(ctx, source_id)?
        .ok_or_else(|| anyhow!("source course {} not found", source_id))?;

    let new_id = Uuid::new_v4().to_string();
    ctx.conn
        .execute(
            "INSERT INTO courses(id, fullname, shortname, idnumber, category_id, start_date, visible, sort_order)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            (
                &new_id,
                &draft.fullname,
                &draft.shortname,
                &draft.idnumber,
                &draft.category_id,
                draft.start_date,
                draft.visible as i64,
                source.sort_order,
            ),
        )
        .with_context(|| format!("failed to insert duplicate of course {}", source_id))?;

    // Every course owns exactly one permission scope.
    let context_id = Uuid::new_v4().to_string();
    ctx.conn.execute(
        "INSERT INTO contexts(id, course_id) VALUES(?, ?)",
        (&context_id, &new_id),
    )?;

    copy_sections(ctx, source_id, &new_id, section_offset)?;

    // The duplicate always gets a default manual enrolment instance; the
    // enrolment carrier targets it afterwards.
    let instance_id = Uuid::new_v4().to_string();
    ctx.conn.execute(
        "INSERT INTO enrol_instances(id, course_id, method) VALUES(?, ?, 'manual')",
        (&instance_id, &new_id),
    )?;

    if opts.copy_enrolments {
        copy_enrolments(ctx, source_id, &instance_id)?;
    }

    Ok(new_id)
}

fn copy_sections(
    ctx: &Ctx,
    source_id: &str,
    new_course_id: &str,
    section_offset: i64,
) -> anyhow::Result<()> {
    let mut stmt = ctx.conn.prepare(
        "SELECT position, name, summary FROM course_sections
         WHERE course_id = ? ORDER BY position",
    )?;
    let sections = stmt
        .query_map([source_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (position, name, summary) in sections {
        ctx.conn.execute(
            "INSERT INTO course_sections(id, course_id, position, name, summary)
             VALUES(?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                new_course_id,
                position + section_offset,
                name,
                summary,
            ),
        )?;
    }
    Ok(())
}

fn copy_enrolments(ctx: &Ctx, source_id: &str, new_instance_id: &str) -> anyhow::Result<()> {
    let mut stmt = ctx.conn.prepare(
        "SELECT ue.user_id, ue.time_start, ue.time_end
         FROM user_enrolments ue
         JOIN enrol_instances ei ON ei.id = ue.instance_id
         WHERE ei.course_id = ?",
    )?;
    let enrolments = stmt
        .query_map([source_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (user_id, time_start, time_end) in enrolments {
        ctx.conn.execute(
            "INSERT INTO user_enrolments(id, instance_id, user_id, time_start, time_end, modifier)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                new_instance_id,
                user_id,
                time_start,
                time_end,
                ctx.acting_user.as_deref(),
            ),
        )?;
    }
    Ok(())
}
