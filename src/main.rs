mod db;
mod duplicate;
mod enrol;
mod migrate;
mod report;
mod reserve;
mod rewrite;
mod store;

use clap::{CommandFactory, Parser};
use report::RunReport;
use std::path::PathBuf;
use store::Ctx;

const LONG_ABOUT: &str = "\
Move course categories and their child courses into a new year tree.

For every top-level category this creates a category named after the new
year, mirrors the subject categories found under the matching current-year
node, duplicates each course into the mirror with year-rewritten names and
a collision-safe shortname, and re-creates the privileged (non-student)
enrolments on each duplicate. An optional reserve list is moved into a
holding category first and excluded from the migration.

Run this as the same user that owns the workspace database.

Example:
  coursemig --workspace /srv/courses --currentyear 2012 --newyear 2013 \\
      --reservelist reserved.txt --reservecat Reserved";

/// Year migration for the course category tree.
#[derive(Parser, Debug)]
#[command(name = "coursemig", version, about, long_about = LONG_ABOUT)]
struct Cli {
    /// The new year; duplicates current courses into a category with this name
    #[arg(long)]
    newyear: Option<String>,

    /// The current year; names the source subtree to migrate
    #[arg(long)]
    currentyear: Option<String>,

    /// Newline-delimited list of course fullnames to set aside first,
    /// relative to the workspace
    #[arg(long, requires = "reservecat")]
    reservelist: Option<String>,

    /// Existing category that receives reserved courses and is excluded
    /// from the migration
    #[arg(long)]
    reservecat: Option<String>,

    /// Workspace directory holding the course database
    #[arg(long, default_value = ".")]
    workspace: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Both year tokens are required; without them print the help and leave
    // the store untouched.
    let (Some(new_year), Some(current_year)) = (cli.newyear.clone(), cli.currentyear.clone())
    else {
        let _ = Cli::command().print_long_help();
        std::process::exit(1);
    };

    match run(&cli, &current_year, &new_year) {
        Ok(report) => {
            // Per-course failures are summarized, not turned into an exit
            // code; only precondition failures exit non-zero.
            report.print_summary();
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli, current_year: &str, new_year: &str) -> anyhow::Result<RunReport> {
    // Validate the year tokens before anything is written anywhere.
    rewrite::year_start_timestamp(new_year)?;

    let conn = db::open_db(&cli.workspace)?;
    let ctx = Ctx {
        conn: &conn,
        acting_user: std::env::var("USER").ok(),
    };

    let reserved_category = match (&cli.reservelist, &cli.reservecat) {
        (Some(list), Some(cat)) => {
            println!("moving reserved courses");
            Some(reserve::relocate(&ctx, &cli.workspace, list, cat)?)
        }
        _ => None,
    };

    let plan = migrate::MigrationPlan {
        current_year,
        new_year,
        reserved_category,
    };
    let mut report = RunReport::new();
    migrate::run(&ctx, &plan, &mut report)?;
    Ok(report)
}
