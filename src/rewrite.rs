use crate::store::NewCourseDraft;
use anyhow::{anyhow, bail};
use chrono::NaiveDate;

/// The closed set of identifying fields the year rewrite touches. Keeping
/// this as a table means every field goes through exactly the same rule.
struct FieldRule {
    name: &'static str,
    get: fn(&NewCourseDraft) -> Option<String>,
    set: fn(&mut NewCourseDraft, String),
}

const FIELD_RULES: [FieldRule; 3] = [
    FieldRule {
        name: "fullname",
        get: |d| Some(d.fullname.clone()),
        set: |d, v| d.fullname = v,
    },
    FieldRule {
        name: "shortname",
        get: |d| Some(d.shortname.clone()),
        set: |d, v| d.shortname = v,
    },
    FieldRule {
        name: "idnumber",
        get: |d| d.idnumber.clone(),
        set: |d, v| d.idnumber = Some(v),
    },
];

/// New value for one identifying field, or `None` when the field stays as
/// it is. Re-running against an already-migrated value is a no-op: a field
/// that already carries the replacement token is left alone.
fn apply_token(value: &str, search: &str, replace: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    if value.contains(replace) {
        return None;
    }
    if value.contains(search) {
        return Some(value.replacen(search, replace, 1));
    }
    Some(format!("{} {}", value, replace))
}

/// Rewrites the draft's identifying fields from the `search` year to the
/// `replace` year and resets its start date to the first moment of the new
/// year. One audit line per changed field; this runs exactly once per
/// course in a destructive batch, so the old values must end up in the log.
pub fn rewrite(draft: &mut NewCourseDraft, search: &str, replace: &str) -> anyhow::Result<()> {
    let label = draft.fullname.clone();
    for rule in &FIELD_RULES {
        let current = match (rule.get)(draft) {
            Some(v) if !v.is_empty() => v,
            _ => continue, // idnumber is legitimately optional
        };
        if let Some(updated) = apply_token(&current, search, replace) {
            println!(
                "updating {} in course \"{}\" from \"{}\" to \"{}\"",
                rule.name, label, current, updated
            );
            (rule.set)(draft, updated);
        }
    }
    draft.start_date = year_start_timestamp(replace)?;
    Ok(())
}

/// Unix timestamp of 00:00:00 UTC on Jan 1 of the year the token names.
/// The token must be a four-digit year; anything else is operator input
/// error and fails the run before any write happens.
pub fn year_start_timestamp(token: &str) -> anyhow::Result<i64> {
    let year: i32 = token
        .trim()
        .parse()
        .map_err(|_| anyhow!("year token \"{}\" is not numeric", token))?;
    if !(1000..=9999).contains(&year) {
        bail!("year token \"{}\" is not a four-digit year", token);
    }
    let date = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow!("year token \"{}\" has no calendar start", token))?;
    Ok(date.and_utc().timestamp())
}
