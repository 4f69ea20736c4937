use nova_maven_workspace::{
    load_workspace, LoadOptions, ModelBuildError, WorkspaceError, WorkspaceModelResolver,
};

use super::{pom_xml, Fixture};

fn effective() -> LoadOptions {
    LoadOptions::default().with_effective_model(true)
}

#[test]
fn inherits_coordinates_properties_and_managed_versions() {
    let fx = Fixture::new();
    fx.pom(
        "",
        r#"<project>
  <groupId>org.acme</groupId>
  <artifactId>root</artifactId>
  <version>1.0</version>
  <packaging>pom</packaging>
  <modules><module>core</module></modules>
  <properties><guava.version>33.0.0-jre</guava.version></properties>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.google.guava</groupId>
        <artifactId>guava</artifactId>
        <version>${guava.version}</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>"#,
    );
    fx.pom(
        "core",
        r#"<project>
  <parent>
    <groupId>org.acme</groupId>
    <artifactId>root</artifactId>
    <version>1.0</version>
  </parent>
  <artifactId>core</artifactId>
  <dependencies>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
    </dependency>
    <dependency>
      <groupId>${project.groupId}</groupId>
      <artifactId>util</artifactId>
      <version>${project.version}</version>
    </dependency>
  </dependencies>
</project>"#,
    );

    let workspace = load_workspace(fx.path("core"), &effective()).unwrap();
    let core = workspace.current_project().unwrap();
    let model = core.effective().unwrap();

    assert_eq!(model.group_id, "org.acme");
    assert_eq!(model.version, "1.0");
    assert_eq!(model.packaging, "jar");
    assert_eq!(model.properties["guava.version"], "33.0.0-jre");

    assert_eq!(model.dependencies.len(), 2);
    assert_eq!(model.dependencies[0].version.as_deref(), Some("33.0.0-jre"));
    assert_eq!(model.dependencies[1].group_id, "org.acme");
    assert_eq!(model.dependencies[1].version.as_deref(), Some("1.0"));
}

#[test]
fn ci_friendly_versions_resolve_through_the_parent() {
    let fx = Fixture::new();
    fx.pom(
        "",
        r#"<project>
  <groupId>org.acme</groupId>
  <artifactId>root</artifactId>
  <version>${revision}</version>
  <packaging>pom</packaging>
  <modules><module>core</module></modules>
  <properties><revision>2.0.0-SNAPSHOT</revision></properties>
</project>"#,
    );
    fx.pom(
        "core",
        &pom_xml(":core:", Some("org.acme:root:${revision}"), &[]),
    );

    let workspace = load_workspace(&fx.root, &effective()).unwrap();

    assert!(workspace
        .resolve_raw_model("org.acme", "core", "${revision}")
        .is_some());
    let core = workspace
        .resolve_effective_model("org.acme", "core", "2.0.0-SNAPSHOT")
        .unwrap();
    assert_eq!(core.version, "2.0.0-SNAPSHOT");
    assert!(workspace
        .resolve_effective_model("org.acme", "core", "${revision}")
        .is_none());
}

#[test]
fn user_properties_override_the_model() {
    let fx = Fixture::new();
    fx.pom(
        "",
        r#"<project>
  <groupId>org.acme</groupId>
  <artifactId>root</artifactId>
  <version>${revision}</version>
  <properties><revision>1.0-SNAPSHOT</revision></properties>
</project>"#,
    );

    let options = effective().with_user_property("revision", "1.0.0");
    let workspace = load_workspace(&fx.root, &options).unwrap();
    assert_eq!(workspace.current_project().unwrap().version(), Some("1.0.0"));
}

#[test]
fn profile_modules_join_the_workspace_when_active() {
    let fx = Fixture::new();
    fx.pom(
        "",
        r#"<project>
  <groupId>org.acme</groupId>
  <artifactId>root</artifactId>
  <version>1.0</version>
  <packaging>pom</packaging>
  <modules><module>core</module></modules>
  <profiles>
    <profile>
      <id>extras</id>
      <modules><module>extra</module></modules>
    </profile>
  </profiles>
</project>"#,
    );
    fx.pom("core", &pom_xml(":core:", Some("org.acme:root:1.0"), &[]));
    fx.pom("extra", &pom_xml(":extra:", Some("org.acme:root:1.0"), &[]));

    let without = load_workspace(&fx.root, &effective()).unwrap();
    assert!(without.lookup("org.acme", "extra").is_none());

    let with = load_workspace(&fx.root, &effective().with_active_profile("extras")).unwrap();
    assert!(with.lookup("org.acme", "extra").is_some());
    assert_eq!(
        with.current_project().unwrap().effective().unwrap().active_profiles,
        vec!["extras".to_string()]
    );

    // Raw mode only sees the modules declared outside profiles.
    let raw = load_workspace(&fx.root, &LoadOptions::default().with_active_profile("extras"))
        .unwrap();
    assert!(raw.lookup("org.acme", "extra").is_none());
}

#[test]
fn bom_imports_are_served_by_workspace_members() {
    let fx = Fixture::new();
    fx.pom("", &pom_xml("org.acme:root:1.0", None, &["bom", "app"]));
    fx.pom(
        "bom",
        r#"<project>
  <parent><groupId>org.acme</groupId><artifactId>root</artifactId><version>1.0</version></parent>
  <artifactId>bom</artifactId>
  <packaging>pom</packaging>
  <dependencyManagement>
    <dependencies>
      <dependency><groupId>org.lib</groupId><artifactId>lib</artifactId><version>3.1</version></dependency>
      <dependency><groupId>org.lib</groupId><artifactId>other</artifactId><version>3.1</version></dependency>
    </dependencies>
  </dependencyManagement>
</project>"#,
    );
    fx.pom(
        "app",
        r#"<project>
  <parent><groupId>org.acme</groupId><artifactId>root</artifactId><version>1.0</version></parent>
  <artifactId>app</artifactId>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.acme</groupId><artifactId>bom</artifactId><version>${project.version}</version>
        <type>pom</type><scope>import</scope>
      </dependency>
      <dependency>
        <groupId>org.external</groupId><artifactId>platform</artifactId><version>9</version>
        <type>pom</type><scope>import</scope>
      </dependency>
      <dependency><groupId>org.lib</groupId><artifactId>other</artifactId><version>4.0</version></dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency><groupId>org.lib</groupId><artifactId>lib</artifactId></dependency>
    <dependency><groupId>org.lib</groupId><artifactId>other</artifactId></dependency>
  </dependencies>
</project>"#,
    );

    let workspace = load_workspace(&fx.root, &effective()).unwrap();
    let app = workspace.lookup("org.acme", "app").unwrap().effective().unwrap();

    assert_eq!(app.dependencies[0].version.as_deref(), Some("3.1"));
    assert_eq!(app.dependencies[1].version.as_deref(), Some("4.0"));
}

#[test]
fn unrelated_enclosing_pom_is_not_used_as_parent() {
    let fx = Fixture::new();
    fx.pom(
        "",
        r#"<project>
  <groupId>org.acme</groupId>
  <artifactId>aggregator</artifactId>
  <version>1.0</version>
  <packaging>pom</packaging>
  <modules><module>core</module></modules>
  <properties><only.in.aggregator>yes</only.in.aggregator></properties>
</project>"#,
    );
    fx.pom("core", &pom_xml(":core:", Some("org.external:parent:5"), &[]));

    let workspace = load_workspace(fx.path("core"), &effective()).unwrap();
    let core = workspace.current_project().unwrap().effective().unwrap();

    assert_eq!(core.group_id, "org.external");
    assert_eq!(core.version, "5");
    assert!(!core.properties.contains_key("only.in.aggregator"));
    assert!(workspace.lookup("org.acme", "aggregator").is_some());
}

#[test]
fn parent_cycle_is_reported() {
    let fx = Fixture::new();
    fx.pom("a", &pom_xml("org.acme:a:1", Some("org.acme:b:1:../b"), &[]));
    fx.pom("b", &pom_xml("org.acme:b:1", Some("org.acme:a:1:../a"), &[]));

    let err = load_workspace(fx.path("a"), &effective()).unwrap_err();
    match err {
        WorkspaceError::AncestorCycle { chain, .. } => {
            assert!(chain.len() >= 3, "chain too short: {chain:?}");
            assert_eq!(chain.first(), chain.last());
        }
        other => panic!("expected AncestorCycle, got {other}"),
    }

    // Without effective models the walk still terminates.
    let workspace = load_workspace(fx.path("a"), &LoadOptions::default()).unwrap();
    assert_eq!(workspace.len(), 2);
}

#[test]
fn model_build_failures_name_the_pom() {
    let fx = Fixture::new();
    let pom = fx.pom("", "<project><artifactId>orphan</artifactId></project>");

    let err = load_workspace(&fx.root, &effective()).unwrap_err();
    match err {
        WorkspaceError::ModelBuild { path, source } => {
            assert_eq!(path, pom);
            assert_eq!(source, ModelBuildError::MissingCoordinate { field: "groupId" });
        }
        other => panic!("expected ModelBuild, got {other}"),
    }

    // Raw mode tolerates incomplete coordinates.
    let workspace = load_workspace(&fx.root, &LoadOptions::default()).unwrap();
    assert!(workspace.current_project().unwrap().key().is_none());
}
