mod test_support;

use test_support::{category_id_by_name, run_tool, run_tool_ok, seed_db, temp_workspace};

#[test]
fn reserved_courses_are_moved_and_excluded_from_migration() {
    let workspace = temp_workspace("coursemig-reserved");
    let conn = seed_db(&workspace);
    conn.execute_batch(
        "INSERT INTO course_categories VALUES('top', 'Programs', NULL, 1);
         INSERT INTO course_categories VALUES('hold', 'Reserved', NULL, 2);
         INSERT INTO course_categories VALUES('y2012', '2012', 'top', 1);
         INSERT INTO courses VALUES('c-keep', 'Special Course', 'SPEC', NULL, 'y2012', 0, 1, 2);
         INSERT INTO courses VALUES('c-mig', 'Ordinary Course', 'ORD', NULL, 'y2012', 0, 1, 1);
         INSERT INTO contexts VALUES('ctx-keep', 'c-keep');
         INSERT INTO contexts VALUES('ctx-mig', 'c-mig');",
    )
    .expect("seed");
    std::fs::write(
        workspace.join("reserved.txt"),
        "Special Course\n\n  No Such Course  \n",
    )
    .expect("write reserve list");

    let stdout = run_tool_ok(
        &workspace,
        &[
            "--currentyear",
            "2012",
            "--newyear",
            "2013",
            "--reservelist",
            "reserved.txt",
            "--reservecat",
            "Reserved",
        ],
    );

    // The miss is logged, not fatal.
    assert!(stdout.contains("no course matches reserved fullname \"No Such Course\""));
    assert!(stdout.contains("moved 1 reserved courses into Reserved"));

    // Special Course lives in the holding category now and was not migrated.
    let keep_cat: String = conn
        .query_row("SELECT category_id FROM courses WHERE id = 'c-keep'", [], |r| r.get(0))
        .expect("kept course");
    assert_eq!(keep_cat, "hold");
    let special_copies: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM courses WHERE fullname LIKE 'Special Course%'",
            [],
            |r| r.get(0),
        )
        .expect("copies");
    assert_eq!(special_copies, 1);

    // The ordinary course still migrated.
    let new_year = category_id_by_name(&conn, "2013").expect("2013 category");
    let migrated: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM courses WHERE fullname = 'Ordinary Course 2013' AND category_id = ?",
            [&new_year],
            |r| r.get(0),
        )
        .expect("migrated");
    assert_eq!(migrated, 1);
}

#[test]
fn current_year_node_matching_reserved_category_is_skipped() {
    let workspace = temp_workspace("coursemig-reserved-year-node");
    let conn = seed_db(&workspace);
    // The holding category is itself a current-year node under a top-level
    // category. It must never be traversed.
    conn.execute_batch(
        "INSERT INTO course_categories VALUES('top', 'Programs', NULL, 1);
         INSERT INTO course_categories VALUES('hold', '2012', 'top', 1);
         INSERT INTO courses VALUES('c-held', 'Held Course', 'HELD', NULL, 'hold', 0, 1, 1);
         INSERT INTO contexts VALUES('ctx-held', 'c-held');",
    )
    .expect("seed");
    std::fs::write(workspace.join("reserved.txt"), "Held Course\n").expect("write list");

    let stdout = run_tool_ok(
        &workspace,
        &[
            "--currentyear",
            "2012",
            "--newyear",
            "2013",
            "--reservelist",
            "reserved.txt",
            "--reservecat",
            "2012",
        ],
    );
    assert!(stdout.contains("course migration complete: 0 migrated, 0 failed"));
    // Already in the holding category, so nothing needed moving.
    assert!(stdout.contains("moved 0 reserved courses into 2012"));

    let courses: i64 = conn
        .query_row("SELECT COUNT(*) FROM courses", [], |r| r.get(0))
        .expect("count");
    assert_eq!(courses, 1, "nothing under the reserved node may be duplicated");
}

#[test]
fn unresolvable_reserved_category_fails_before_any_mutation() {
    let workspace = temp_workspace("coursemig-reserved-missing");
    let conn = seed_db(&workspace);
    conn.execute_batch(
        "INSERT INTO course_categories VALUES('top', 'Programs', NULL, 1);
         INSERT INTO course_categories VALUES('y2012', '2012', 'top', 1);
         INSERT INTO courses VALUES('c1', 'Some Course', 'SOME', NULL, 'y2012', 0, 1, 1);
         INSERT INTO contexts VALUES('ctx1', 'c1');",
    )
    .expect("seed");
    std::fs::write(workspace.join("reserved.txt"), "Some Course\n").expect("write list");

    let out = run_tool(
        &workspace,
        &[
            "--currentyear",
            "2012",
            "--newyear",
            "2013",
            "--reservelist",
            "reserved.txt",
            "--reservecat",
            "Nowhere",
        ],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("reserved category \"Nowhere\" not found"));

    // No categories created, no courses moved or duplicated.
    let categories: i64 = conn
        .query_row("SELECT COUNT(*) FROM course_categories", [], |r| r.get(0))
        .expect("count categories");
    assert_eq!(categories, 2);
    let courses: i64 = conn
        .query_row("SELECT COUNT(*) FROM courses WHERE category_id = 'y2012'", [], |r| r.get(0))
        .expect("count courses");
    assert_eq!(courses, 1);
}
