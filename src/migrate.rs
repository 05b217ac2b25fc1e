use crate::duplicate::{self, DuplicateOptions};
use crate::enrol;
use crate::report::RunReport;
use crate::rewrite;
use crate::store::{self, Category, Ctx, NewCourseDraft};

pub struct MigrationPlan<'a> {
    pub current_year: &'a str,
    pub new_year: &'a str,
    /// Holding category for reserved courses. When unset, no reserved
    /// lookup happens anywhere in the walk.
    pub reserved_category: Option<String>,
}

impl MigrationPlan<'_> {
    fn is_reserved(&self, category_id: &str) -> bool {
        self.reserved_category.as_deref() == Some(category_id)
    }
}

/// Walks every top-level category, creates its new-year subtree and
/// duplicates the matching current-year courses into it. A category
/// creation failure abandons that top-level branch; everything already
/// created stays (failures are recorded, never rolled back), and the
/// remaining branches still run.
pub fn run(ctx: &Ctx, plan: &MigrationPlan, report: &mut RunReport) -> anyhow::Result<()> {
    let top_level = store::child_categories(ctx, None)?;
    for parent in &top_level {
        if plan.is_reserved(&parent.id) {
            continue;
        }
        if let Err(e) = migrate_branch(ctx, plan, parent, report) {
            println!("error: abandoned category {}: {:#}", parent.name, e);
        }
    }
    Ok(())
}

fn migrate_branch(
    ctx: &Ctx,
    plan: &MigrationPlan,
    parent: &Category,
    report: &mut RunReport,
) -> anyhow::Result<()> {
    let new_year_cat = store::create_category(ctx, plan.new_year, Some(&parent.id))?;
    println!("created category {} in {}", new_year_cat.name, parent.name);

    for child in store::child_categories(ctx, Some(&parent.id))? {
        if child.name != plan.current_year || plan.is_reserved(&child.id) {
            continue;
        }

        // Courses sitting directly in the current-year node land directly
        // in the new-year category.
        migrate_courses(ctx, plan, &child, &new_year_cat, report)?;

        for subject in store::child_categories(ctx, Some(&child.id))? {
            if plan.is_reserved(&subject.id) {
                continue;
            }
            let mirror = store::create_category(ctx, &subject.name, Some(&new_year_cat.id))?;
            println!(
                "created category {} in {} - {}",
                mirror.name, parent.name, new_year_cat.name
            );
            migrate_courses(ctx, plan, &subject, &mirror, report)?;
        }
    }
    Ok(())
}

fn migrate_courses(
    ctx: &Ctx,
    plan: &MigrationPlan,
    source: &Category,
    target: &Category,
    report: &mut RunReport,
) -> anyhow::Result<()> {
    for course in store::courses_in_category(ctx, &source.id)? {
        if !course.visible {
            // Stale hidden state on the source never carries over; say so
            // in the audit log.
            println!(
                "source course {} is hidden; its duplicate will be visible",
                course.shortname
            );
        }
        let mut draft = NewCourseDraft::from_source(&course, &target.id);
        rewrite::rewrite(&mut draft, plan.current_year, plan.new_year)?;
        draft.shortname = resolve_unique_shortname(ctx, &draft.shortname)?;

        println!("creating course {} in {}", draft.shortname, target.name);
        let new_id = match duplicate::duplicate_course(
            ctx,
            &course.id,
            &draft,
            0,
            &DuplicateOptions { copy_enrolments: false },
        ) {
            Ok(id) => id,
            Err(e) => {
                println!("error: could not duplicate course {}: {:#}", course.id, e);
                report.record_failure(&course.id, format!("{:#}", e));
                continue;
            }
        };

        match enrol::carry(ctx, &course.id, &new_id) {
            Ok(count) => {
                println!("carried {} enrolments to course {}", count, draft.shortname);
                report.record_success(&course.id, &new_id);
            }
            Err(e) => {
                // The duplicate stays; only the enrolment step is reported.
                println!(
                    "error: could not carry enrolments to course {}: {:#}",
                    new_id, e
                );
                report.record_partial(&course.id, &new_id, format!("{:#}", e));
            }
        }
    }
    Ok(())
}

/// Counter-suffixes the candidate until no existing course claims it. The
/// candidate has already been year-rewritten, so "taken" here means a real
/// conflict, typically a course migrated by hand ahead of the batch.
fn resolve_unique_shortname(ctx: &Ctx, candidate: &str) -> anyhow::Result<String> {
    if !store::shortname_taken(ctx, candidate)? {
        return Ok(candidate.to_string());
    }
    let mut n = 2;
    loop {
        let attempt = format!("{}_{}", candidate, n);
        if !store::shortname_taken(ctx, &attempt)? {
            return Ok(attempt);
        }
        n += 1;
    }
}
