use crate::support::*;

#[test]
fn patent_office_scenario_flows_into_the_export() {
    let t = TestPortal::new();
    let patents = t.portal.records(EntityTable::Patents);

    // Created before the field exists.
    patents
        .insert(&t.faculty, &form([("title", "Early Widget"), ("inventors", "B. Chen")]))
        .unwrap();

    let outcome = t.add_field(FieldSpec::new("patents", "patent_office", "text").label("Patent Office"));
    assert!(outcome.is_added(), "{outcome:?}");

    let id = patents
        .insert(&t.user, &form([("title", "Flux Capacitor"), ("patent_office", "USPTO")]))
        .unwrap();
    assert_eq!(
        patents.get(&t.user, id).unwrap().get("patent_office"),
        Some(&TypedValue::Text("USPTO".into()))
    );

    let report = t.portal.report(&t.admin, ReportKind::Patents).unwrap();
    assert_eq!(
        report.headers,
        vec!["User Name", "User Email", "Title", "Inventors", "Patent Office"]
    );
    assert_eq!(report.keys.last().map(String::as_str), Some("patent_office"));
    // Owners sort by name: Bo before Cy.
    assert_eq!(report.rows[0], vec!["Bo", "bo@example.edu", "Early Widget", "B. Chen", ""]);
    assert_eq!(report.rows[1], vec!["Cy", "cy@example.edu", "Flux Capacitor", "", "USPTO"]);

    let csv = report.to_csv().unwrap();
    assert!(csv.starts_with("User Name,User Email,Title,Inventors,Patent Office\r\n"));
    assert!(csv.contains("Cy,cy@example.edu,Flux Capacitor,,USPTO\r\n"));
}

#[test]
fn reports_are_admin_only() {
    let t = TestPortal::new();
    for kind in ReportKind::ALL {
        assert!(matches!(t.portal.report(&t.faculty, kind), Err(PortalError::Unauthorized)));
        assert!(t.portal.report(&t.admin, kind).unwrap().rows.is_empty());
    }
}

#[test]
fn commercialization_report_follows_registry_order() {
    let t = TestPortal::new();
    assert!(t.add_field(FieldSpec::new("commercializations", "stage", "select").label("Stage")).is_added());
    assert!(t.add_field(FieldSpec::new("commercializations", "revenue", "float").label("Revenue")).is_added());

    t.portal
        .records(EntityTable::Commercializations)
        .insert(&t.user, &form([("project_name", "Spinout, Inc."), ("revenue", "1.5"), ("stage", "seed")]))
        .unwrap();

    let report = t.portal.report(&t.admin, ReportKind::Commercializations).unwrap();
    assert_eq!(report.headers[2..], ["Project Name", "Stage", "Revenue"]);
    assert_eq!(report.rows[0][2..], ["Spinout, Inc.", "seed", "1.5"]);
    assert!(report.to_csv().unwrap().contains("\"Spinout, Inc.\",seed,1.5\r\n"));
}

#[test]
fn fields_named_like_owner_columns_report_their_own_values() {
    let t = TestPortal::new();
    assert!(t.add_field(FieldSpec::new("patents", "user_name", "text").label("Applicant")).is_added());
    assert!(t.add_field(FieldSpec::new("patents", "user_email", "text").label("Applicant Email")).is_added());

    t.portal
        .records(EntityTable::Patents)
        .insert(
            &t.user,
            &form([("title", "T"), ("user_name", "ACME Corp"), ("user_email", "legal@acme.test")]),
        )
        .unwrap();

    let report = t.portal.report(&t.admin, ReportKind::Patents).unwrap();
    assert_eq!(report.headers[4..], ["Applicant", "Applicant Email"]);
    assert_eq!(
        report.rows[0],
        vec!["Cy", "cy@example.edu", "T", "", "ACME Corp", "legal@acme.test"]
    );
}
