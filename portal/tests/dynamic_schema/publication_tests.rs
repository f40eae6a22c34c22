use portal::{FetchedPublication, JsonFileSource, PublicationInput};

use crate::support::*;

#[test]
fn import_amends_idempotently_from_a_profile_export() {
    let t = TestPortal::new();
    let profiles = t.dir.path().join("profiles");
    std::fs::create_dir_all(&profiles).unwrap();
    std::fs::write(
        profiles.join("q9Z-x_1.json"),
        r#"[
            {"title": "On Widgets", "authors": "B. Chen", "year": 2021, "citations": 3},
            {"title": "", "authors": "Nobody"},
            {"title": "On Gadgets", "year": "2019"}
        ]"#,
    )
    .unwrap();
    let source = JsonFileSource::new(&profiles);
    let link = "https://scholar.google.com/citations?hl=en&user=q9Z-x_1";

    let first = t.portal.import_publications(&t.faculty, &source, link).unwrap();
    assert_eq!((first.fetched, first.saved, first.skipped), (3, 2, 1));
    let second = t.portal.import_publications(&t.faculty, &source, link).unwrap();
    assert_eq!((second.saved, second.skipped), (0, 3));

    let stored = t.portal.publications(&t.faculty, t.faculty.id).unwrap();
    let titles: Vec<_> = stored.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["On Widgets", "On Gadgets"]);
    assert_eq!(stored[0].citations, "3");

    let user = t.portal.user(t.faculty.id).unwrap();
    assert_eq!(user.scholar_link.as_deref(), Some(link));
}

#[test]
fn publications_report_lists_every_owner() {
    let t = TestPortal::new();
    t.portal
        .add_publication(&t.user, &PublicationInput::new("Cy's Paper").year("2020"))
        .unwrap();
    t.portal
        .amend_publications(&t.faculty, &[FetchedPublication::new("Bo's Paper")])
        .unwrap();

    let report = t.portal.report(&t.admin, ReportKind::Publications).unwrap();
    let titles: Vec<_> = report.rows.iter().map(|row| row[2].as_str()).collect();
    assert_eq!(titles, vec!["Bo's Paper", "Cy's Paper"]);
}

#[test]
fn deleting_a_user_removes_their_publications_and_records() {
    let t = TestPortal::new();
    t.portal
        .add_publication(&t.user, &PublicationInput::new("Gone Soon"))
        .unwrap();
    t.portal
        .records(EntityTable::Patents)
        .insert(&t.user, &form([("title", "Gone Too")]))
        .unwrap();

    let found = t.portal.users(&t.admin, Some("cy@")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!((found[0].publication_count, found[0].patent_count), (1, 1));
    assert!(matches!(t.portal.users(&t.user, None), Err(PortalError::Unauthorized)));

    t.portal.delete_user(&t.admin, t.user.id).unwrap();
    assert_eq!(t.portal.users(&t.admin, None).unwrap().len(), 2);
    assert!(t.portal.publications(&t.admin, t.user.id).unwrap().is_empty());
    assert!(t.portal.records(EntityTable::Patents).list(&t.admin).unwrap().is_empty());
    assert!(matches!(t.portal.user(t.user.id), Err(PortalError::NotFound { .. })));
}
