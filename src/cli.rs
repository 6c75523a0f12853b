//! Minimal CLI: JSON → (dart | inspect)
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::{json, Value};

use crate::codegen::Codegen;
use crate::config::{Config, DEFAULT_OUTPUT_FOLDER};
use crate::convert::{convert, infer_classes, join_units, CodeUnit};
use crate::naming;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate Dart model classes (fields, constructor, fromJson/toJson) from sample JSON
#[derive(Parser, Debug)]
#[command(name = "json2dart", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// infer and emit Dart classes
    Dart(DartOut),
    /// infer and print the class table as JSON (debug view)
    Inspect(InspectOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is converted separately
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// root class name; `pkg.sub.Class` also places the file under `pkg/sub/`
    /// (default: derived from the file name, `Root` for stdin)
    #[arg(long, short = 'c')]
    class_name: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct ConfigSettings {
    /// YAML config: bare options or a pubspec.yaml with a `jsonToDart:` section
    #[arg(long)]
    config: Option<PathBuf>,

    /// spaces per indentation level
    #[arg(long)]
    indent: Option<usize>,

    /// emit legacy (pre null-safety) Dart
    #[arg(long, default_value_t = false)]
    no_null_safety: bool,

    /// use only the first element of each array instead of merging all of them
    #[arg(long, default_value_t = false)]
    no_merge_arrays: bool,

    /// emit a copyWith method
    #[arg(long, default_value_t = false)]
    copy_with: bool,

    /// Dart type for null-only and conflicting fields
    #[arg(long)]
    null_type: Option<String>,

    /// nesting limit
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(clap::Parser, Debug)]
struct DartOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    config_settings: ConfigSettings,

    /// output .dart file holding every class (stdout if omitted)
    #[arg(short, long, conflicts_with = "out_dir")]
    out: Option<PathBuf>,

    /// write one `<snake_case>.dart` file per document into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct InspectOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    config_settings: ConfigSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One JSON document ready for conversion.
#[derive(Debug, Clone)]
struct Document {
    origin: String,
    // subfolders from a `pkg.sub.Class` name
    package: Vec<String>,
    class_name: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ConfigSettings {
    fn resolve(&self) -> Result<Config> {
        let mut config = match self.config.as_ref() {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        if let Some(indent) = self.indent {
            config.indent = indent;
        }
        if self.no_null_safety {
            config.null_safety = false;
        }
        if self.no_merge_arrays {
            config.merge_arrays = false;
        }
        if self.copy_with {
            config.copy_with = true;
        }
        if let Some(null_type) = self.null_type.as_ref() {
            config.null_type = null_type.clone();
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        Ok(config)
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for source in resolve_sources(&self.input)? {
            let (origin, text, stem) = match &source {
                Source::Stdin => {
                    let mut text = String::new();
                    std::io::stdin()
                        .read_to_string(&mut text)
                        .context("failed to read stdin")?;
                    ("<stdin>".to_string(), text, None)
                }
                Source::File(path) => {
                    let text = std::fs::read_to_string(path)
                        .with_context(|| format!("failed to read source file {}", path.display()))?;
                    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string());
                    (path.display().to_string(), text, stem)
                }
            };
            if text.trim().is_empty() {
                bail!("{origin} is empty; expected a JSON document");
            }
            let value = serde_json::from_str::<Value>(&text)
                .with_context(|| format!("failed to parse JSON source ({origin})"))?;
            let value = match self.json_pointer.as_ref() {
                Some(pointer) => crate::jq_exec::select_pointer(pointer, value)
                    .with_context(|| format!("in {origin}"))?,
                None => value,
            };
            let values = match self.jq_expr.as_ref() {
                Some(jq_expr) => crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {origin}"))?,
                None => vec![value],
            };

            let (package, base) = match (&self.class_name, &stem) {
                (Some(name), _) => split_qualified_name(name)?,
                (None, Some(stem)) => (Vec::new(), naming::class_name(stem, "Root")),
                (None, None) => (Vec::new(), "Root".to_string()),
            };
            for value in values {
                documents.push(Document {
                    origin: origin.clone(),
                    package: package.clone(),
                    class_name: base.clone(),
                    value,
                });
            }
        }
        dedupe_class_names(&mut documents);
        Ok(documents)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Dart(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                // 1) settle config and inputs
                let config = target.config_settings.resolve()?;
                let documents = target.input_settings.load_documents()?;

                // 2) convert, one registry per document
                let converted: Vec<(Document, Vec<CodeUnit>)> = documents
                    .into_par_iter()
                    .map(|doc| -> Result<(Document, Vec<CodeUnit>)> {
                        let units = convert(&doc.class_name, &doc.value, &config)
                            .with_context(|| format!("conversion of {} failed", doc.origin))?;
                        Ok((doc, units))
                    })
                    .collect::<Result<_>>()?;

                // 3) write
                let qualified = converted.iter().any(|(doc, _)| !doc.package.is_empty());
                let out_dir = target
                    .out_dir
                    .clone()
                    .or_else(|| match target.out {
                        None => config
                            .output_folder
                            .as_ref()
                            .map(PathBuf::from)
                            .or_else(|| qualified.then(|| PathBuf::from(DEFAULT_OUTPUT_FOLDER))),
                        Some(_) => None,
                    });
                if let Some(dir) = out_dir {
                    for (doc, units) in &converted {
                        let path = document_path(&dir, doc);
                        write_output(&path, &join_units(units))?;
                        report_written(&path, units.len());
                    }
                    return Ok(());
                }

                let dart_src = converted
                    .iter()
                    .map(|(_, units)| join_units(units))
                    .collect::<Vec<_>>()
                    .join("\n");
                match target.out.as_ref() {
                    Some(out) => {
                        if converted.len() > 1 {
                            tracing::warn!(
                                documents = converted.len(),
                                "several documents written to one file; class names may repeat"
                            );
                        }
                        write_output(out, &dart_src)?;
                        report_written(out, converted.iter().map(|(_, u)| u.len()).sum());
                    }
                    None => print!("{dart_src}"),
                }
                Ok(())
            }
            Command::Inspect(target) => {
                let config = target.config_settings.resolve()?;
                let documents = target.input_settings.load_documents()?;
                let mut views = Vec::with_capacity(documents.len());
                for doc in &documents {
                    let lowered = infer_classes(&doc.class_name, &doc.value, &config)
                        .with_context(|| format!("inference of {} failed", doc.origin))?;
                    let cg = Codegen::new(&config, &lowered);
                    let classes = lowered
                        .classes()
                        .map(|class| {
                            let fields = class
                                .fields
                                .iter()
                                .map(|f| json!({
                                    "name": f.name,
                                    "jsonKey": f.json_key,
                                    "type": cg.slot_type(&f.slot()),
                                    "nullable": f.nullable,
                                }))
                                .collect::<Vec<_>>();
                            json!({ "name": class.name, "fields": fields })
                        })
                        .collect::<Vec<_>>();
                    views.push(json!({ "source": doc.origin, "root": doc.class_name, "classes": classes }));
                }
                let view_src = serde_json::to_string_pretty(&views)?;
                match target.out.as_ref() {
                    Some(out) => write_output(out, &view_src)?,
                    None => println!("{view_src}"),
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Stdin,
    File(PathBuf),
}

fn resolve_sources<I>(patterns: I) -> Result<Vec<Source>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<Source>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if pattern == "-" {
            out.push(Source::Stdin);
        } else if has_glob_chars(pattern) {
            // Treat as a glob pattern
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                matched_any = true;
                out.push(Source::File(entry?));
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(anyhow!("glob pattern matched no files: {pattern}"));
            }
        } else {
            // Treat as a literal path
            out.push(Source::File(PathBuf::from(pattern)));
        }
    }

    Ok(out)
}

/// `models.user.User` → (`[models, user]`, `User`).
fn split_qualified_name(name: &str) -> Result<(Vec<String>, String)> {
    let mut parts: Vec<String> = name.split('.').map(str::to_string).collect();
    if parts.iter().any(|p| p.trim().is_empty()) {
        bail!("invalid class name `{name}`: empty segment");
    }
    let class_name = parts.pop().unwrap_or_default();
    Ok((parts, class_name))
}

/// `<dir>/<package…>/<snake_case>.dart`
fn document_path(dir: &Path, doc: &Document) -> PathBuf {
    let mut path = dir.to_path_buf();
    path.extend(&doc.package);
    path.push(format!("{}.dart", naming::snake_case(&doc.class_name)));
    path
}

/// `User`, `User` → `User`, `User2` so per-document files never collide.
fn dedupe_class_names(documents: &mut [Document]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for doc in documents.iter_mut() {
        let count = seen.entry(doc.class_name.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            doc.class_name = format!("{}{}", doc.class_name, count);
        }
    }
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn report_written(path: &Path, classes: usize) {
    eprintln!(
        "{} {} ({} class{})",
        "✓ generated".green(),
        path.display(),
        classes,
        if classes == 1 { "" } else { "es" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> Document {
        Document { origin: "t".into(), package: Vec::new(), class_name: name.into(), value: Value::Null }
    }

    #[test]
    fn duplicate_document_names_are_suffixed() {
        let mut docs = vec![doc("User"), doc("User"), doc("Post"), doc("User")];
        dedupe_class_names(&mut docs);
        let names: Vec<&str> = docs.iter().map(|d| d.class_name.as_str()).collect();
        assert_eq!(names, ["User", "User2", "Post", "User3"]);
    }

    #[test]
    fn dash_means_stdin() {
        let sources = resolve_sources(["-", "a.json"]).unwrap();
        assert_eq!(sources, vec![Source::Stdin, Source::File(PathBuf::from("a.json"))]);
    }

    #[test]
    fn empty_glob_is_an_error() {
        assert!(resolve_sources(["/definitely/not/here/*.json"]).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pubspec.yaml");
        std::fs::write(&path, "name: app\njsonToDart:\n  copyWithMethod: false\n  tabSize: 4\n").unwrap();
        let settings = ConfigSettings {
            config: Some(path),
            indent: None,
            no_null_safety: true,
            no_merge_arrays: false,
            copy_with: true,
            null_type: Some("Object".into()),
            max_depth: None,
        };
        let config = settings.resolve().unwrap();
        assert_eq!(config.indent, 4);
        assert!(!config.null_safety);
        assert!(config.copy_with);
        assert_eq!(config.null_type, "Object");
    }

    #[test]
    fn file_inputs_become_documents_named_after_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_profile.json");
        std::fs::write(&path, r#"{"data": [{"id": 1}, {"id": 2}]}"#).unwrap();
        let settings = InputSettings {
            json_pointer: Some("/data".into()),
            jq_expr: Some(".[]".into()),
            input: vec![path.display().to_string()],
            class_name: None,
        };
        let docs = settings.load_documents().unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.class_name.as_str()).collect();
        assert_eq!(names, ["UserProfile", "UserProfile2"]);
        assert_eq!(docs[1].value, json!({"id": 2}));
    }

    #[test]
    fn qualified_names_split_into_package_and_class() {
        let (package, class) = split_qualified_name("models.user.UserProfile").unwrap();
        assert_eq!(package, ["models", "user"]);
        assert_eq!(class, "UserProfile");

        let (package, class) = split_qualified_name("User").unwrap();
        assert!(package.is_empty());
        assert_eq!(class, "User");

        assert!(split_qualified_name("models..User").is_err());
        assert!(split_qualified_name("models.").is_err());
    }

    #[test]
    fn package_becomes_subfolders_of_the_output_dir() {
        let mut d = doc("UserProfile");
        d.package = vec!["models".into(), "user".into()];
        assert_eq!(
            document_path(Path::new("lib"), &d),
            PathBuf::from("lib").join("models").join("user").join("user_profile.dart"),
        );
        assert_eq!(document_path(Path::new("out"), &doc("Root")), PathBuf::from("out").join("root.dart"));
    }

    #[test]
    fn qualified_class_name_is_applied_to_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        std::fs::write(&path, r#"{"id": 1}"#).unwrap();
        let settings = InputSettings {
            json_pointer: None,
            jq_expr: None,
            input: vec![path.display().to_string()],
            class_name: Some("api.v1.Account".into()),
        };
        let docs = settings.load_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].class_name, "Account");
        assert_eq!(docs[0].package, ["api", "v1"]);
    }
}
