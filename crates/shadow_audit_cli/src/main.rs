//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open a student store and run one create/update cycle through it.
//! - Print the stored audit fields so stamping can be checked by eye.
//!
//! Connection string: first argument, else `SHADOW_AUDIT_CONNECTION`, else
//! an in-memory store. `SHADOW_AUDIT_LOG_DIR` (absolute) enables file logs.

use log::info;
use shadow_audit_core::{
    core_version, create_students_context, default_log_level, init_logging, Actor, AuditFields,
    StudentService,
};
use std::process::ExitCode;

const DEFAULT_CONNECTION: &str = "Data Source=:memory:";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("shadow_audit error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(log_dir) = std::env::var("SHADOW_AUDIT_LOG_DIR") {
        init_logging(default_log_level(), &log_dir)?;
    }

    let connection = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SHADOW_AUDIT_CONNECTION").ok())
        .unwrap_or_else(|| DEFAULT_CONNECTION.to_string());

    println!("shadow_audit_core version={}", core_version());
    let mut context = create_students_context(&connection)?;
    let mut students = StudentService::new(&mut context);

    let id = students.enroll(&Actor::new("alice"), "Ada", "Lovelace")?;
    print_audit("created", id, students.audit_fields(id)?);

    students.rename(&Actor::new("bob"), id, "Ada", "Byron")?;
    print_audit("updated", id, students.audit_fields(id)?);

    info!("event=cli_demo module=cli status=ok student_id={id}");
    Ok(())
}

fn print_audit(step: &str, id: i64, audit: Option<AuditFields>) {
    let audit = audit.unwrap_or_default();
    println!(
        "{step} id={id} created_by={} created_at={} updated_by={} updated_at={}",
        audit.created_by.as_deref().unwrap_or("-"),
        display_ms(audit.created_at),
        audit.updated_by.as_deref().unwrap_or("-"),
        display_ms(audit.updated_at),
    );
}

fn display_ms(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |ms| ms.to_string())
}
