use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use nova_maven_workspace::{
    discover_config_path, init_tracing, load_for_workspace, locate_project_pom, ArtifactKey,
    EffectivePom, LoadOptions, ProjectId, ProjectNode, Workspace, WorkspaceLoader,
};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "nova-mvn",
    version,
    about = "Inspect the Maven workspace around a project"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the project graph (parents and modules)
    Graph(GraphArgs),
    /// Print the effective model of the project owning a path
    Effective(EffectiveArgs),
    /// Find a workspace member by `groupId:artifactId`
    Lookup(LookupArgs),
}

#[derive(Args)]
struct LoadArgs {
    /// Project directory, a file inside it, or a `pom.xml` (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
    /// Aggregator to load before the project
    #[arg(long)]
    workspace_root: Option<PathBuf>,
    /// Profiles to activate; prefix with `!` or `-` to deactivate (comma separated)
    #[arg(short = 'P', long = "activate-profiles", value_delimiter = ',')]
    profiles: Vec<String>,
    /// User properties (`key=value`, or `key` for `true`)
    #[arg(short = 'D', long = "define")]
    properties: Vec<String>,
    /// Ignore `.mvn/maven.config`
    #[arg(long)]
    no_maven_config: bool,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct GraphArgs {
    #[command(flatten)]
    load: LoadArgs,
    /// Build effective models while loading
    #[arg(long)]
    effective: bool,
}

#[derive(Args)]
struct EffectiveArgs {
    #[command(flatten)]
    load: LoadArgs,
}

#[derive(Args)]
struct LookupArgs {
    /// Coordinates as `groupId:artifactId`
    key: String,
    /// Only match this version
    #[arg(long)]
    version: Option<String>,
    #[command(flatten)]
    load: LoadArgs,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Graph(args) => {
            let workspace = load(&args.load, args.effective)?;
            if args.load.json {
                print_json(&workspace.summary())?;
            } else {
                print_graph(&workspace);
            }
            Ok(0)
        }
        Command::Effective(args) => {
            let workspace = load(&args.load, true)?;
            let current = workspace
                .current_project()
                .context("no current project was loaded")?;
            let model = current
                .effective()
                .with_context(|| format!("no effective model for {}", current.pom_file().display()))?;
            if args.load.json {
                print_json(model.as_ref())?;
            } else {
                print_effective(current.pom_file(), model);
            }
            Ok(0)
        }
        Command::Lookup(args) => {
            let key = ArtifactKey::try_from(args.key.clone()).map_err(anyhow::Error::msg)?;
            let workspace = load(&args.load, false)?;
            let found = workspace
                .lookup(&key.group_id, &key.artifact_id)
                .filter(|node| match &args.version {
                    Some(version) => node.version() == Some(version.as_str()),
                    None => true,
                });

            let result = LookupResult {
                key: key.to_string(),
                found: found.is_some(),
                version: found.and_then(ProjectNode::version).map(str::to_string),
                pom: found.map(|node| node.pom_file().to_path_buf()),
            };
            if args.load.json {
                print_json(&result)?;
            } else if let Some(pom) = &result.pom {
                println!("{}: {}", result.key, pom.display());
            } else {
                println!("{}: not a workspace member", result.key);
            }
            Ok(if result.found { 0 } else { 1 })
        }
    }
}

fn load(args: &LoadArgs, effective_model: bool) -> Result<Workspace> {
    let config_root = config_root(&args.path)?;
    let (config, config_path) = load_for_workspace(&config_root)?;
    init_tracing(&config.logging);
    if let Some(path) = &config_path {
        tracing::debug!(target = "nova.maven", config = %path.display(), "loaded nova config");
    }

    let mut options = LoadOptions::default().with_effective_model(effective_model);
    if let Some(root) = &args.workspace_root {
        options = options.with_workspace_root(root);
    }
    for profile in &args.profiles {
        let profile = profile.trim();
        if let Some(id) = profile.strip_prefix('!').or_else(|| profile.strip_prefix('-')) {
            options = options.with_inactive_profile(id);
        } else if !profile.is_empty() {
            options = options.with_active_profile(profile.trim_start_matches('+'));
        }
    }
    for property in &args.properties {
        options = match property.split_once('=') {
            Some((key, value)) => options.with_user_property(key, value),
            None => options.with_user_property(property.as_str(), "true"),
        };
    }
    options = options.with_config(
        &config.maven,
        config_path.as_deref().and_then(Path::parent),
    );
    if !args.no_maven_config {
        options = options.with_maven_config(&config_root)?;
    }

    let workspace = WorkspaceLoader::new(&args.path, options)
        .load()
        .with_context(|| format!("failed to load Maven workspace at {}", args.path.display()))?;
    if workspace.is_empty() {
        bail!("no projects found at {}", args.path.display());
    }
    Ok(workspace)
}

/// Directory whose `nova.toml` and `.mvn` apply to `path`.
///
/// Starts at the directory of the project owning `path` and picks the nearest ancestor holding
/// a `nova.toml`, or the project directory itself when there is none.
fn config_root(path: &Path) -> Result<PathBuf> {
    let path = std::path::absolute(path)
        .with_context(|| format!("failed to resolve {}", path.display()))?;
    let search_from = if path.is_file() {
        path.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        path
    };
    let project_dir = locate_project_pom(&search_from)
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or(search_from);

    let root = project_dir
        .ancestors()
        .find(|dir| discover_config_path(dir).is_some_and(|config| config.is_file()))
        .map(Path::to_path_buf)
        .unwrap_or(project_dir);
    Ok(root)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupResult {
    key: String,
    found: bool,
    version: Option<String>,
    pom: Option<PathBuf>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}

fn print_graph(workspace: &Workspace) {
    let current = workspace.current_project().map(ProjectNode::id);
    let mut printed = HashSet::new();
    let roots: Vec<ProjectId> = workspace
        .projects()
        .filter(|node| node.parent().is_none())
        .map(ProjectNode::id)
        .collect();
    for root in roots {
        print_node(workspace, root, 0, current, &mut printed);
    }
    // Projects whose parent does not list them as a module.
    let ids: Vec<ProjectId> = workspace.projects().map(ProjectNode::id).collect();
    for id in ids {
        if !printed.contains(&id) {
            print_node(workspace, id, 0, current, &mut printed);
        }
    }
}

fn print_node(
    workspace: &Workspace,
    id: ProjectId,
    depth: usize,
    current: Option<ProjectId>,
    printed: &mut HashSet<ProjectId>,
) {
    let node = workspace.project(id);
    let marker = if Some(id) == current { "* " } else { "" };
    let coords = format!(
        "{}:{}:{}",
        node.group_id().unwrap_or("?"),
        node.artifact_id().unwrap_or("?"),
        node.version().unwrap_or("?")
    );
    if !printed.insert(id) {
        println!("{:indent$}{marker}{coords} (see above)", "", indent = depth * 2);
        return;
    }
    println!(
        "{:indent$}{marker}{coords} ({})",
        "",
        node.dir().display(),
        indent = depth * 2
    );
    for module in node.modules() {
        print_node(workspace, *module, depth + 1, current, printed);
    }
}

fn print_effective(pom: &Path, model: &EffectivePom) {
    println!("{}", pom.display());
    println!("  coordinates: {}:{}", model.key(), model.version);
    println!("  packaging: {}", model.packaging);
    if !model.active_profiles.is_empty() {
        println!("  active profiles: {}", model.active_profiles.join(", "));
    }
    if !model.modules.is_empty() {
        println!("  modules:");
        for module in &model.modules {
            println!("    {module}");
        }
    }
    if !model.dependencies.is_empty() {
        println!("  dependencies:");
        for dep in &model.dependencies {
            println!(
                "    {}:{}{}",
                dep.key(),
                dep.version.as_deref().unwrap_or("(unversioned)"),
                dep.scope
                    .as_deref()
                    .map(|scope| format!(" [{scope}]"))
                    .unwrap_or_default()
            );
        }
    }
}
