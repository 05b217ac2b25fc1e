use crate::store::{self, Ctx};
use anyhow::{anyhow, Context as _};
use std::collections::HashSet;
use std::path::Path;

/// Moves the listed courses into the reserved holding category before the
/// main migration runs, and returns that category's id so the tree walk can
/// skip it everywhere. A missing target category fails the whole run; list
/// lines that match no course are logged and dropped.
pub fn relocate(
    ctx: &Ctx,
    workspace: &Path,
    list_rel_path: &str,
    target_category_name: &str,
) -> anyhow::Result<String> {
    let list_path = workspace.join(list_rel_path);
    let text = std::fs::read_to_string(&list_path)
        .with_context(|| format!("failed to read reserve list {}", list_path.to_string_lossy()))?;

    let names: Vec<String> = text
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    // A reserved holding category is a precondition, not data this tool
    // creates; resolve it before touching anything.
    let target = store::category_by_name(ctx, target_category_name)?.ok_or_else(|| {
        anyhow!("reserved category \"{}\" not found", target_category_name)
    })?;

    let courses = store::courses_by_fullnames(ctx, &names)?;
    let matched: HashSet<&str> = courses.iter().map(|c| c.fullname.as_str()).collect();
    for name in &names {
        if !matched.contains(name.as_str()) {
            println!("no course matches reserved fullname \"{}\"", name);
        }
    }

    // Courses already sitting in the holding category need no move.
    let ids: Vec<String> = courses
        .iter()
        .filter(|c| c.category_id != target.id)
        .map(|c| c.id.clone())
        .collect();
    let moved = store::move_courses(ctx, &ids, &target.id)?;
    println!("moved {} reserved courses into {}", moved, target.name);
    Ok(target.id)
}
