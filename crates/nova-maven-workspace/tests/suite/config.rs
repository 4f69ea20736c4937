use nova_maven_workspace::{
    load_for_workspace, load_workspace, LoadOptions, WorkspaceConfig,
};

use super::{pom_xml, Fixture};

fn root_with_profile(fx: &Fixture) {
    fx.pom(
        "",
        r#"<project>
  <groupId>org.acme</groupId>
  <artifactId>root</artifactId>
  <version>${revision}</version>
  <packaging>pom</packaging>
  <properties><revision>1.0-SNAPSHOT</revision></properties>
  <profiles>
    <profile>
      <id>extras</id>
      <modules><module>extra</module></modules>
    </profile>
  </profiles>
</project>"#,
    );
    fx.pom("extra", &pom_xml(":extra:", Some("org.acme:root:${revision}"), &[]));
}

#[test]
fn maven_config_supplies_profiles_and_properties() {
    let fx = Fixture::new();
    root_with_profile(&fx);
    fx.write(".mvn/maven.config", "-Pextras\n-Drevision=3.0.0\n");

    let options = LoadOptions::default()
        .with_effective_model(true)
        .with_maven_config(&fx.root)
        .unwrap();
    assert_eq!(options.active_profiles, vec!["extras".to_string()]);

    let workspace = load_workspace(&fx.root, &options).unwrap();
    let extra = workspace.lookup("org.acme", "extra").unwrap();
    assert_eq!(extra.version(), Some("3.0.0"));
}

#[test]
fn explicit_options_win_over_maven_config() {
    let fx = Fixture::new();
    root_with_profile(&fx);
    fx.write(".mvn/maven.config", "-Pextras -Drevision=3.0.0");

    let options = LoadOptions::default()
        .with_effective_model(true)
        .with_inactive_profile("extras")
        .with_user_property("revision", "4.0.0")
        .with_maven_config(&fx.root)
        .unwrap();

    let workspace = load_workspace(&fx.root, &options).unwrap();
    assert!(workspace.lookup("org.acme", "extra").is_none());
    assert_eq!(workspace.current_project().unwrap().version(), Some("4.0.0"));
}

#[test]
fn nova_toml_drives_load_options() {
    let fx = Fixture::new();
    fx.write(
        "nova.toml",
        r#"
[logging]
level = "debug"

[maven]
workspace_root = "lib"
effective_model = true
active_profiles = ["extras"]

[maven.properties]
revision = "5.0.0"
"#,
    );

    let (config, path) = load_for_workspace(&fx.root).unwrap();
    let path = path.unwrap();
    assert_eq!(path, fx.path("nova.toml"));
    assert_eq!(config.logging.level, "debug");

    let options = LoadOptions::default().with_config(&config.maven, path.parent());
    assert!(options.effective_model);
    assert_eq!(options.workspace_root, Some(fx.path("lib")));
    assert_eq!(options.active_profiles, vec!["extras".to_string()]);
    assert_eq!(options.user_properties["revision"], "5.0.0");
}

#[test]
fn missing_config_falls_back_to_defaults() {
    let fx = Fixture::new();
    let (config, path) = load_for_workspace(&fx.root).unwrap();
    assert!(path.is_none());
    assert_eq!(config, WorkspaceConfig::default());
}
