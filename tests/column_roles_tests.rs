use week_sync::{Board, Column, ColumnRole, ColumnRoleNames, resolve_roles};

fn board(columns: &[(&str, &str)]) -> Board {
    Board {
        id: "77".to_string(),
        name: "Roadmap".to_string(),
        columns: columns
            .iter()
            .map(|(id, title)| Column::new(*id, *title, "status"))
            .collect(),
    }
}

#[test]
fn all_roles_resolve_by_exact_title() {
    let board = board(&[
        ("date4", "Internal Deadline"),
        ("status", "Status"),
        ("week", "Week Assigned"),
        ("text", "Notes"),
    ]);
    let roles = resolve_roles(&board, &ColumnRoleNames::default()).unwrap();
    assert_eq!(roles.target.id, "week");
    assert_eq!(roles.deadline_id(), Some("date4"));
    assert_eq!(roles.status_id(), Some("status"));
    assert!(roles.missing.is_empty());
    assert_eq!(roles.role_of_column("date4"), Some(ColumnRole::Deadline));
    assert_eq!(roles.role_of_column("week"), Some(ColumnRole::Target));
    assert_eq!(roles.role_of_column("text"), None);
}

#[test]
fn titles_are_case_sensitive() {
    let board = board(&[("week", "week assigned"), ("status", "Status")]);
    let err = resolve_roles(&board, &ColumnRoleNames::default()).unwrap_err();
    assert_eq!(err.board_id, "77");
    assert_eq!(
        err.missing,
        vec!["Internal Deadline".to_string(), "Week Assigned".to_string()]
    );
    assert!(err.to_string().contains("Internal Deadline, Week Assigned"));
}

#[test]
fn missing_optional_roles_are_listed_but_not_fatal() {
    let board = board(&[("week", "Week Assigned")]);
    let roles = resolve_roles(&board, &ColumnRoleNames::default()).unwrap();
    assert_eq!(roles.deadline_id(), None);
    assert_eq!(roles.status_id(), None);
    assert_eq!(
        roles.missing,
        vec!["Internal Deadline".to_string(), "Status".to_string()]
    );
}

#[test]
fn target_title_is_configurable() {
    let names = ColumnRoleNames {
        target: "Sprint Bucket".to_string(),
        ..ColumnRoleNames::default()
    };
    let board = board(&[("bucket", "Sprint Bucket"), ("week", "Week Assigned")]);
    let roles = resolve_roles(&board, &names).unwrap();
    assert_eq!(roles.target.id, "bucket");
    assert_eq!(names.role_of("Week Assigned"), None);
    assert_eq!(names.role_of("Sprint Bucket"), Some(ColumnRole::Target));
}
