use crate::support::*;

#[test]
fn coercion_applies_per_declared_type() {
    let t = TestPortal::new();
    for (name, kind) in [("granted", "checkbox"), ("claims", "int"), ("royalty", "float"), ("filed_on", "date")] {
        assert!(t.add_field(FieldSpec::new("patents", name, kind)).is_added());
    }
    let patents = t.portal.records(EntityTable::Patents);

    let id = patents
        .insert(
            &t.user,
            &form([
                ("title", "Widget"),
                ("granted", "on"),
                ("claims", "abc"),
                ("royalty", "2.5"),
                ("filed_on", ""),
            ]),
        )
        .unwrap();
    let record = patents.get(&t.user, id).unwrap();
    assert_eq!(record.get("granted"), Some(&TypedValue::Integer(1)));
    assert_eq!(record.get("claims"), Some(&TypedValue::Null));
    assert_eq!(record.get("royalty"), Some(&TypedValue::Real(2.5)));
    assert_eq!(record.get("filed_on"), Some(&TypedValue::Null));

    // Full-form update: absent checkbox means unchecked.
    patents
        .update(&t.user, id, &form([("title", "Widget"), ("claims", "7")]))
        .unwrap();
    let record = patents.get(&t.user, id).unwrap();
    assert_eq!(record.get("granted"), Some(&TypedValue::Integer(0)));
    assert_eq!(record.get("claims"), Some(&TypedValue::Integer(7)));
    assert_eq!(record.get("royalty"), Some(&TypedValue::Null));
}

#[test]
fn non_owners_get_a_uniform_unauthorized() {
    let t = TestPortal::new();
    let patents = t.portal.records(EntityTable::Patents);
    let id = patents.insert(&t.faculty, &form([("title", "Mine")])).unwrap();
    let edit = form([("title", "Stolen")]);

    for target in [id, id + 1000] {
        assert!(matches!(patents.update(&t.user, target, &edit), Err(PortalError::Unauthorized)));
        assert!(matches!(patents.get(&t.user, target), Err(PortalError::Unauthorized)));
        assert!(matches!(patents.delete(&t.user, target), Err(PortalError::Unauthorized)));
    }
    assert!(matches!(
        patents.update(&t.admin, id + 1000, &edit),
        Err(PortalError::NotFound { .. })
    ));

    let record = patents.get(&t.faculty, id).unwrap();
    assert_eq!(record.get("title"), Some(&TypedValue::Text("Mine".into())));

    patents.update(&t.admin, id, &edit).unwrap();
    assert_eq!(
        patents.get(&t.faculty, id).unwrap().get("title"),
        Some(&TypedValue::Text("Stolen".into()))
    );
    assert_eq!(patents.get(&t.faculty, id).unwrap().user_id, t.faculty.id);
}

#[test]
fn malformed_dates_fail_the_whole_save() {
    let t = TestPortal::new();
    assert!(t.add_field(FieldSpec::new("commercializations", "launched", "date")).is_added());
    let projects = t.portal.records(EntityTable::Commercializations);

    let err = projects
        .insert(&t.user, &form([("project_name", "Spinout"), ("launched", "next spring")]))
        .unwrap_err();
    assert!(matches!(err, PortalError::SaveFailed { .. }), "{err:?}");
    assert!(projects.list(&t.admin).unwrap().is_empty());

    let id = projects
        .insert(&t.user, &form([("project_name", "Spinout"), ("launched", "2024-05-01")]))
        .unwrap();
    assert_eq!(
        projects.get(&t.user, id).unwrap().get("launched"),
        Some(&TypedValue::Text("2024-05-01".into()))
    );
}

#[test]
fn over_long_bounded_strings_fail_the_whole_save() {
    let t = TestPortal::new();
    assert!(t.add_field(FieldSpec::new("patents", "patent_office", "text")).is_added());
    assert!(t.add_field(FieldSpec::new("patents", "status", "select").options("filed, granted")).is_added());
    let patents = t.portal.records(EntityTable::Patents);

    let long = "x".repeat(300);
    let long_title = "t".repeat(1000);
    for values in [
        [("title", "Widget"), ("patent_office", long.as_str())],
        [("title", "Widget"), ("status", long.as_str())],
        [("title", long_title.as_str()), ("patent_office", "USPTO")],
    ] {
        let err = patents.insert(&t.user, &form(values)).unwrap_err();
        assert!(matches!(err, PortalError::SaveFailed { .. }), "{err:?}");
    }
    assert!(patents.list(&t.admin).unwrap().is_empty());

    let exact = "y".repeat(255);
    let id = patents
        .insert(&t.user, &form([("title", exact.as_str()), ("patent_office", exact.as_str())]))
        .unwrap();
    let err = patents
        .update(&t.user, id, &form([("title", "Widget"), ("patent_office", long.as_str())]))
        .unwrap_err();
    assert!(matches!(err, PortalError::SaveFailed { .. }), "{err:?}");
    assert_eq!(
        patents.get(&t.user, id).unwrap().get("patent_office"),
        Some(&TypedValue::Text(exact))
    );
}

#[test]
fn listings_are_owner_scoped_unless_admin() {
    let t = TestPortal::new();
    let patents = t.portal.records(EntityTable::Patents);
    patents.insert(&t.faculty, &form([("title", "A")])).unwrap();
    patents.insert(&t.user, &form([("title", "B")])).unwrap();
    patents.insert(&t.user, &form([("title", "C")])).unwrap();

    assert_eq!(patents.list(&t.faculty).unwrap().len(), 1);
    assert_eq!(patents.list(&t.user).unwrap().len(), 2);
    assert_eq!(patents.list(&t.admin).unwrap().len(), 3);
}

#[test]
fn dropped_fields_stop_appearing_in_records() {
    let t = TestPortal::new();
    assert!(t.add_field(FieldSpec::new("patents", "office", "text")).is_added());
    let patents = t.portal.records(EntityTable::Patents);
    let id = patents
        .insert(&t.user, &form([("title", "Widget"), ("office", "EPO")]))
        .unwrap();

    t.portal.drop_field(&t.admin, "patents", "office").unwrap();
    let record = patents.get(&t.user, id).unwrap();
    assert!(record.get("office").is_none());

    // Stale keys from an old form are ignored.
    patents
        .update(&t.user, id, &form([("title", "Widget"), ("office", "USPTO")]))
        .unwrap();
}
