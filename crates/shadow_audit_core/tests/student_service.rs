mod support;

use shadow_audit_core::{Actor, ContextError, EntityState, ManualClock, Student, StudentService};
use std::sync::Arc;
use support::memory_context;

#[test]
fn enroll_get_and_list_roundtrip() {
    let clock = Arc::new(ManualClock::new(10));
    let mut ctx = memory_context(&clock);
    let mut service = StudentService::new(&mut ctx);
    let actor = Actor::new("registrar");

    let ada = service.enroll(&actor, "Ada", "Lovelace").unwrap();
    let grace = service.enroll(&actor, "Grace", "Hopper").unwrap();
    assert_ne!(ada, grace);

    let loaded = service.get(ada).unwrap().unwrap();
    assert_eq!(loaded, Student::new("Ada", "Lovelace").with_id(ada));

    let names: Vec<_> = service
        .list()
        .unwrap()
        .into_iter()
        .map(|student| student.name)
        .collect();
    assert_eq!(names, vec!["Ada", "Grace"]);
}

#[test]
fn rename_stamps_update_fields() {
    let clock = Arc::new(ManualClock::new(10));
    let mut ctx = memory_context(&clock);
    let mut service = StudentService::new(&mut ctx);

    let id = service.enroll(&Actor::new("alice"), "Ada", "Lovelace").unwrap();
    clock.set(20);
    let renamed = service
        .rename(&Actor::new("bob"), id, "Ada", "Byron")
        .unwrap();
    assert_eq!(renamed.last_name, "Byron");

    let audit = service.audit_fields(id).unwrap().unwrap();
    assert_eq!(audit.created_by.as_deref(), Some("alice"));
    assert_eq!(audit.created_at, Some(10));
    assert_eq!(audit.updated_by.as_deref(), Some("bob"));
    assert_eq!(audit.updated_at, Some(20));
}

#[test]
fn rename_and_withdraw_missing_student_return_not_found() {
    let clock = Arc::new(ManualClock::new(10));
    let mut ctx = memory_context(&clock);
    let mut service = StudentService::new(&mut ctx);
    let actor = Actor::new("alice");

    let err = service.rename(&actor, 404, "A", "B").unwrap_err();
    assert!(matches!(err, ContextError::NotFound { key: 404, .. }));
    let err = service.withdraw(&actor, 404).unwrap_err();
    assert!(matches!(err, ContextError::NotFound { key: 404, .. }));
}

#[test]
fn withdraw_deletes_row() {
    let clock = Arc::new(ManualClock::new(10));
    let mut ctx = memory_context(&clock);
    let mut service = StudentService::new(&mut ctx);
    let actor = Actor::new("alice");

    let id = service.enroll(&actor, "Ada", "Lovelace").unwrap();
    service.withdraw(&actor, id).unwrap();
    assert!(service.get(id).unwrap().is_none());
}

#[test]
fn removing_an_unsaved_added_row_detaches_it() {
    let clock = Arc::new(ManualClock::new(10));
    let mut ctx = memory_context(&clock);

    let student = Student::new("Ada", "Lovelace").with_id(5);
    let entry = ctx.add(&student).unwrap();
    ctx.remove(&student).unwrap();

    assert!(ctx.entry(entry).is_none());
    assert_eq!(ctx.save_changes(&Actor::new("alice")).unwrap(), 0);
    assert!(ctx.find::<Student>(5).unwrap().is_none());
}

#[test]
fn tracking_rules_reject_duplicates_and_missing_keys() {
    let clock = Arc::new(ManualClock::new(10));
    let mut ctx = memory_context(&clock);

    let keyed = Student::new("Ada", "Lovelace").with_id(1);
    ctx.add(&keyed).unwrap();
    assert!(matches!(
        ctx.add(&keyed).unwrap_err(),
        ContextError::AlreadyTracked {
            kind: "Students",
            key: 1
        }
    ));

    let unkeyed = Student::new("Grace", "Hopper");
    assert!(matches!(
        ctx.update(&unkeyed).unwrap_err(),
        ContextError::MissingKey("Students")
    ));
    assert!(matches!(
        ctx.remove(&unkeyed).unwrap_err(),
        ContextError::MissingKey("Students")
    ));
    assert!(matches!(
        ctx.attach(&unkeyed).unwrap_err(),
        ContextError::MissingKey("Students")
    ));
}

#[test]
fn update_of_added_row_keeps_added_state() {
    let clock = Arc::new(ManualClock::new(10));
    let mut ctx = memory_context(&clock);

    let entry = ctx.add(&Student::new("Ada", "Lovelace").with_id(3)).unwrap();
    ctx.update(&Student::new("Ada", "Byron").with_id(3)).unwrap();
    assert_eq!(ctx.entry(entry).unwrap().state(), EntityState::Added);

    ctx.save_changes(&Actor::new("alice")).unwrap();
    let audit = ctx.audit_fields::<Student>(3).unwrap().unwrap();
    assert_eq!(audit.created_by.as_deref(), Some("alice"));
    assert_eq!(audit.updated_by, None);
    assert_eq!(ctx.find::<Student>(3).unwrap().unwrap().last_name, "Byron");
}

#[test]
fn student_serializes_without_audit_members() {
    let json = serde_json::to_value(Student::new("Ada", "Lovelace").with_id(1)).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "id": 1, "name": "Ada", "last_name": "Lovelace" })
    );
}
