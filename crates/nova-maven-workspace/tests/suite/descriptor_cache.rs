use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use nova_maven_workspace::{
    FsPomReader, LoadOptions, PomReader, RawPom, WorkspaceError, WorkspaceLoader,
};

use super::{pom_xml, Fixture};

/// Counts reads per POM so tests can assert that nothing is parsed twice.
#[derive(Clone, Default)]
struct CountingReader {
    reads: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl CountingReader {
    fn counts(&self) -> HashMap<PathBuf, usize> {
        self.reads.lock().unwrap().clone()
    }
}

impl PomReader for CountingReader {
    fn read(&self, pom_file: &Path) -> Result<RawPom, WorkspaceError> {
        *self
            .reads
            .lock()
            .unwrap()
            .entry(pom_file.to_path_buf())
            .or_default() += 1;
        FsPomReader.read(pom_file)
    }
}

fn diamond(fx: &Fixture) {
    fx.pom("", &pom_xml("org.acme:root:1.0", None, &["a", "b", "missing"]));
    fx.pom("a", &pom_xml(":a:", Some("org.acme:root:1.0"), &["../shared", "../missing"]));
    fx.pom("b", &pom_xml(":b:", Some("org.acme:root:1.0"), &["../shared"]));
    fx.pom("shared", &pom_xml(":shared:", Some("org.acme:root:1.0"), &[]));
}

#[test]
fn each_pom_is_read_at_most_once_per_session() {
    let fx = Fixture::new();
    diamond(&fx);
    let reader = CountingReader::default();

    let workspace = WorkspaceLoader::new(fx.path("shared"), LoadOptions::default())
        .with_reader(reader.clone())
        .load()
        .unwrap();
    assert_eq!(workspace.len(), 4);

    let counts = reader.counts();
    assert!(
        counts.values().all(|&count| count == 1),
        "some POMs were read more than once: {counts:?}"
    );
    assert_eq!(counts.get(&fx.path("missing/pom.xml")), Some(&1));
    assert_eq!(counts.len(), 5);
}

#[test]
fn effective_models_reuse_the_walk_cache() {
    let fx = Fixture::new();
    diamond(&fx);
    let reader = CountingReader::default();

    let options = LoadOptions::default().with_effective_model(true);
    let workspace = WorkspaceLoader::new(fx.path("b"), options)
        .with_reader(reader.clone())
        .load()
        .unwrap();

    assert!(workspace.projects().all(|node| node.effective().is_some()));
    let counts = reader.counts();
    assert!(
        counts.values().all(|&count| count == 1),
        "some POMs were read more than once: {counts:?}"
    );
}

#[test]
fn sessions_do_not_share_caches() {
    let fx = Fixture::new();
    diamond(&fx);
    let reader = CountingReader::default();

    for _ in 0..2 {
        WorkspaceLoader::new(fx.path("a"), LoadOptions::default())
            .with_reader(reader.clone())
            .load()
            .unwrap();
    }

    assert_eq!(reader.counts().get(&fx.path("pom.xml")), Some(&2));
}

#[test]
fn unparsable_poms_are_read_once() {
    let fx = Fixture::new();
    fx.pom("", "<project><artifactId>broken</artifactId>");
    fx.pom("core", &pom_xml(":core:", Some("org.acme:root:1.0"), &["../a", "../b"]));
    fx.pom("a", &pom_xml("org.acme:a:1.0", None, &["../bad"]));
    fx.pom("b", &pom_xml("org.acme:b:1.0", None, &["../bad"]));
    fx.pom("bad", "<project><artifactId>bad</artifactId>");
    let reader = CountingReader::default();

    let options = LoadOptions::default().with_effective_model(true);
    let workspace = WorkspaceLoader::new(fx.path("core"), options)
        .with_reader(reader.clone())
        .load()
        .unwrap();

    assert_eq!(workspace.len(), 3);
    let core = workspace.current_project().unwrap();
    assert_eq!(core.effective().unwrap().group_id, "org.acme");

    let counts = reader.counts();
    assert_eq!(counts.get(&fx.path("pom.xml")), Some(&1));
    assert_eq!(counts.get(&fx.path("bad/pom.xml")), Some(&1));
}
