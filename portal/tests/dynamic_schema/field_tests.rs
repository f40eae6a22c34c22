use crate::support::*;

#[test]
fn added_field_is_listed_and_accepted_on_insert() {
    let t = TestPortal::new();
    let outcome = t.add_field(FieldSpec::new("patents", "claims", "number").label("Claims").required(true));
    let AddColumnOutcome::Added(field) = outcome else {
        panic!("expected Added, got {outcome:?}");
    };
    assert_eq!(field.field_type, AbstractType::Integer);
    assert_eq!(field.field_label, "Claims");

    let listed = t.portal.fields(EntityTable::Patents, true).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].field_name, "claims");
    assert_eq!(listed[0].input_kind.map(|kind| kind.as_str()), Some("number"));
    assert!(listed[0].is_required);

    let patents = t.portal.records(EntityTable::Patents);
    let id = patents
        .insert(&t.faculty, &form([("title", "Widget"), ("claims", "42")]))
        .unwrap();
    let record = patents.get(&t.faculty, id).unwrap();
    assert_eq!(record.get("claims"), Some(&TypedValue::Integer(42)));
}

#[test]
fn existing_columns_are_rejected_before_any_alter() {
    let t = TestPortal::new();
    for name in ["id", "user_id", "title", "created_at"] {
        let outcome = t.add_field(FieldSpec::new("patents", name, "int"));
        assert_eq!(outcome, AddColumnOutcome::Rejected(RejectReason::AlreadyExists), "{name}");
    }
    assert!(t.portal.fields(EntityTable::Patents, false).unwrap().is_empty());

    assert!(t.add_field(FieldSpec::new("patents", "office", "text")).is_added());
    assert_eq!(
        t.add_field(FieldSpec::new("patents", "Office", "longtext")),
        AddColumnOutcome::Rejected(RejectReason::AlreadyExists)
    );
}

#[test]
fn invalid_requests_are_rejected_with_distinct_reasons() {
    let t = TestPortal::new();
    let cases = [
        (FieldSpec::new("users", "bio", "text"), RejectReason::InvalidTable),
        (FieldSpec::new("patents", "bad name", "text"), RejectReason::InvalidIdentifier),
        (FieldSpec::new("patents", "x\"; DROP TABLE users; --", "text"), RejectReason::InvalidIdentifier),
        (FieldSpec::new("patents", &"a".repeat(65), "text"), RejectReason::InvalidIdentifier),
        (FieldSpec::new("patents", "budget", "money"), RejectReason::InvalidType),
        (FieldSpec::new("patents", "budget", ""), RejectReason::MissingInput),
    ];
    for (spec, reason) in cases {
        assert_eq!(t.add_field(spec.clone()), AddColumnOutcome::Rejected(reason), "{spec:?}");
    }

    let denied = t
        .portal
        .add_field(&t.faculty, &FieldSpec::new("patents", "budget", "float"))
        .unwrap();
    assert_eq!(denied, AddColumnOutcome::Rejected(RejectReason::Unauthorized));
}

#[test]
fn protected_columns_cannot_be_dropped() {
    let t = TestPortal::new();
    for (table, column) in [
        ("patents", "id"),
        ("patents", "user_id"),
        ("patents", "created_at"),
        ("patents", "updated_at"),
        ("patents", "title"),
        ("commercializations", "project_name"),
    ] {
        let outcome = t.portal.drop_field(&t.admin, table, column).unwrap();
        assert_eq!(outcome, DropColumnOutcome::Rejected(RejectReason::ProtectedColumn), "{table}.{column}");
    }
}

#[test]
fn dropping_twice_reports_not_found() {
    let t = TestPortal::new();
    assert!(t.add_field(FieldSpec::new("commercializations", "stage", "select").options("seed, exit")).is_added());

    assert_eq!(
        t.portal.drop_field(&t.user, "commercializations", "stage").unwrap(),
        DropColumnOutcome::Rejected(RejectReason::Unauthorized)
    );
    assert_eq!(
        t.portal.drop_field(&t.admin, "commercializations", "stage").unwrap(),
        DropColumnOutcome::Dropped
    );
    assert_eq!(
        t.portal.drop_field(&t.admin, "commercializations", "stage").unwrap(),
        DropColumnOutcome::Rejected(RejectReason::NotFound)
    );
    assert!(t.portal.fields(EntityTable::Commercializations, false).unwrap().is_empty());
    assert!(t.portal.reconcile(EntityTable::Commercializations).unwrap().is_consistent());
}

#[test]
fn declaration_order_survives_drops() {
    let t = TestPortal::new();
    for name in ["alpha", "beta", "gamma"] {
        assert!(t.add_field(FieldSpec::new("patents", name, "text")).is_added());
    }
    t.portal.drop_field(&t.admin, "patents", "beta").unwrap();
    assert!(t.add_field(FieldSpec::new("patents", "beta", "bool")).is_added());

    let names: Vec<_> = t
        .portal
        .fields(EntityTable::Patents, false)
        .unwrap()
        .into_iter()
        .map(|field| field.field_name)
        .collect();
    assert_eq!(names, vec!["alpha", "gamma", "beta"]);
}
