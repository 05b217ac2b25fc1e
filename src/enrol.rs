use crate::store::{self, Ctx};
use anyhow::anyhow;

/// Re-creates the source course's privileged (non-student) enrolments on the
/// duplicate. Returns the number of grants created. Not idempotent: the tool
/// runs once per migration cycle, so a rerun would stack duplicate grants.
pub fn carry(ctx: &Ctx, source_course_id: &str, new_course_id: &str) -> anyhow::Result<usize> {
    let source_context = store::course_context(ctx, source_course_id)?
        .ok_or_else(|| anyhow!("course {} has no context", source_course_id))?;

    let assignments = store::privileged_assignments(ctx, &source_context)?;

    // Duplication provisions a default manual instance; a missing one means
    // the duplicate is broken and the failure gets recorded upstream.
    let instance_id = store::manual_enrol_instance(ctx, new_course_id)?
        .ok_or_else(|| anyhow!("course {} has no manual enrol instance", new_course_id))?;
    let new_context = store::course_context(ctx, new_course_id)?
        .ok_or_else(|| anyhow!("course {} has no context", new_course_id))?;

    let now = chrono::Utc::now().timestamp();
    let mut created = 0;
    for a in &assignments {
        // Enrolment first, role second: listeners that react to the role
        // assignment must already see the user enrolled.
        store::create_grant(ctx, &instance_id, &a.user_id, now)?;
        println!("enrolled user {} in course {}", a.user_id, new_course_id);
        store::assign_role(ctx, &new_context, &a.user_id, &a.role_id)?;
        println!(
            "assigned role {} to user {} in course {}",
            a.role_id, a.user_id, new_course_id
        );
        created += 1;
    }
    Ok(created)
}
