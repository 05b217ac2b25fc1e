/// Outcome of one attempted course duplication. A record can carry both a
/// new course id and errors: the duplicate exists but enrolment carry-over
/// failed on it.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub source_course_id: String,
    pub new_course_id: Option<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<MigrationOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        RunReport::default()
    }

    pub fn record_success(&mut self, source_course_id: &str, new_course_id: &str) {
        self.outcomes.push(MigrationOutcome {
            source_course_id: source_course_id.to_string(),
            new_course_id: Some(new_course_id.to_string()),
            errors: Vec::new(),
        });
    }

    pub fn record_failure(&mut self, source_course_id: &str, error: String) {
        self.outcomes.push(MigrationOutcome {
            source_course_id: source_course_id.to_string(),
            new_course_id: None,
            errors: vec![error],
        });
    }

    /// Duplication worked but a later step on the new course did not.
    pub fn record_partial(&mut self, source_course_id: &str, new_course_id: &str, error: String) {
        self.outcomes.push(MigrationOutcome {
            source_course_id: source_course_id.to_string(),
            new_course_id: Some(new_course_id.to_string()),
            errors: vec![error],
        });
    }

    pub fn migrated_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.new_course_id.is_some()).count()
    }

    pub fn failed(&self) -> Vec<&MigrationOutcome> {
        self.outcomes.iter().filter(|o| !o.errors.is_empty()).collect()
    }

    /// Final operator summary. Every failed source course id appears here
    /// exactly once; this printed list is the only retry input an operator
    /// gets.
    pub fn print_summary(&self) {
        let failed = self.failed();
        println!(
            "course migration complete: {} migrated, {} failed",
            self.migrated_count(),
            failed.len()
        );
        if !failed.is_empty() {
            println!("failed courses:");
            for outcome in failed {
                println!(
                    "  {}: {}",
                    outcome.source_course_id,
                    outcome.errors.join("; ")
                );
            }
        }
    }
}
