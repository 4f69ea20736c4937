use nova_maven_workspace::{load_workspace, LoadOptions, WorkspaceError};

use super::{pom_xml, Fixture};

const BROKEN: &str = "<project><artifactId>broken</artifactId>";

#[test]
fn unparsable_start_pom_is_fatal() {
    let fx = Fixture::new();
    let pom = fx.pom("", BROKEN);

    let err = load_workspace(&pom, &LoadOptions::default()).unwrap_err();
    assert!(err.is_parse_error(), "unexpected error: {err}");
    assert!(err.to_string().contains(&pom.display().to_string()));
}

#[test]
fn non_project_root_element_is_rejected() {
    let fx = Fixture::new();
    fx.pom("", "<settings/>");

    let err = load_workspace(&fx.root, &LoadOptions::default()).unwrap_err();
    assert!(
        matches!(err, WorkspaceError::InvalidPom { .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn unparsable_module_is_omitted() {
    let fx = Fixture::new();
    fx.pom("", &pom_xml("org.acme:root:1.0", None, &["good", "bad"]));
    fx.pom("good", &pom_xml(":good:", Some("org.acme:root:1.0"), &[]));
    fx.pom("bad", BROKEN);

    let workspace = load_workspace(&fx.root, &LoadOptions::default()).unwrap();
    assert_eq!(workspace.len(), 2);
    assert!(workspace.lookup("org.acme", "good").is_some());
}

#[test]
fn unparsable_enclosing_pom_is_ignored() {
    let fx = Fixture::new();
    fx.pom("", BROKEN);
    fx.pom("core", &pom_xml("org.acme:core:1.0", None, &[]));

    let workspace = load_workspace(fx.path("core"), &LoadOptions::default()).unwrap();
    assert_eq!(workspace.len(), 1);
    assert!(workspace.current_project().unwrap().parent().is_none());
}

#[test]
fn unparsable_explicit_parent_is_fatal() {
    let fx = Fixture::new();
    fx.pom("parent", BROKEN);
    fx.pom(
        "core",
        &pom_xml(":core:", Some("org.acme:parent:1.0:../parent/pom.xml"), &[]),
    );

    let err = load_workspace(fx.path("core"), &LoadOptions::default()).unwrap_err();
    match err {
        WorkspaceError::Xml { path, .. } => assert_eq!(path, fx.path("parent/pom.xml")),
        other => panic!("expected an XML error, got {other}"),
    }
}

#[test]
fn explicit_parent_skipped_as_a_module_still_fails_the_effective_build() {
    let fx = Fixture::new();
    fx.pom("", &pom_xml("org.acme:root:1.0", None, &["bad", "app"]));
    fx.pom("bad", BROKEN);
    fx.pom(
        "app",
        &pom_xml(":app:", Some("org.acme:bad:1.0:../bad/pom.xml"), &[]),
    );

    let options = LoadOptions::default().with_effective_model(true);
    let err = load_workspace(&fx.root, &options).unwrap_err();
    match err {
        WorkspaceError::InvalidPom { path, .. } => assert_eq!(path, fx.path("bad/pom.xml")),
        other => panic!("expected the recorded parse failure, got {other}"),
    }
}
