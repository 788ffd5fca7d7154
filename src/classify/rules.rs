//! Default rule table and JSON ingestion for the pattern/configuration
//! format described by the classification engine's external interface.
//!
//! The engine itself never reads a file: [`parse_ruleset`] only turns a
//! JSON value a caller already has in hand into [`PatternRule`]s. Loading
//! that JSON from disk, a network config service, or a CLI flag is a
//! collaborator's job.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::model::{ApplyTo, Category, PatternRule};

/// One rule as it appears in the JSON configuration format.
#[derive(Debug, Deserialize)]
struct RuleConfigEntry {
    name: String,
    pattern: String,
    category: Category,
    apply_to: ApplyTo,
    #[serde(default)]
    stop_recursion: bool,
}

impl From<RuleConfigEntry> for PatternRule {
    fn from(entry: RuleConfigEntry) -> Self {
        Self {
            name: entry.name,
            pattern: entry.pattern,
            category: entry.category,
            apply_to: entry.apply_to,
            stop_recursion: entry.stop_recursion,
        }
    }
}

/// The full JSON configuration document: a rule list plus optional
/// additional, caller-specific absolute paths per category.
#[derive(Debug, Deserialize)]
struct RuleSetConfig {
    rules: Vec<RuleConfigEntry>,
    #[serde(default)]
    additional_paths: HashMap<Category, Vec<PathBuf>>,
}

/// Parse a JSON document in the pattern/configuration format into a rule
/// list and an additional-paths map, ready for [`crate::classify::compile_ruleset`].
///
/// # Errors
/// Returns a [`serde_json::Error`] if `json` is not valid JSON or does not
/// match the expected shape.
pub fn parse_ruleset(json: &str) -> Result<(Vec<PatternRule>, HashMap<Category, Vec<PathBuf>>), serde_json::Error> {
    let config: RuleSetConfig = serde_json::from_str(json)?;
    let rules = config.rules.into_iter().map(PatternRule::from).collect();
    Ok((rules, config.additional_paths))
}

macro_rules! rule {
    ($name:expr, $pattern:expr, $category:expr, $apply_to:expr) => {
        PatternRule {
            name: $name.to_owned(),
            pattern: $pattern.to_owned(),
            category: $category,
            apply_to: $apply_to,
            stop_recursion: false,
        }
    };
    ($name:expr, $pattern:expr, $category:expr, $apply_to:expr, stop) => {
        PatternRule {
            name: $name.to_owned(),
            pattern: $pattern.to_owned(),
            category: $category,
            apply_to: $apply_to,
            stop_recursion: true,
        }
    };
}

/// The engine's built-in rule table, covering the most common temp, cache
/// and build-artifact locations across macOS, Linux and the major language
/// toolchains. Callers needing something narrower or broader should build
/// their own list from [`crate::model::PatternRule`] directly.
#[must_use]
pub fn default_rules() -> Vec<PatternRule> {
    use ApplyTo::{Both, Dir, File};
    use Category::{BuildArtifact, Cache, Temp};

    vec![
        // --- TEMP ---
        rule!("tmp_dir", "**/tmp/**", Temp, Both),
        rule!("var_tmp_dir", "**/var/tmp/**", Temp, Both),
        rule!("log_files", "**/*.log", Temp, File),
        rule!("tmp_files", "**/*.tmp", Temp, File),
        rule!("temp_files", "**/*.temp", Temp, File),
        rule!("swap_files", "**/*.swp", Temp, File),
        rule!("bak_files", "**/*.bak", Temp, File),
        rule!("old_files", "**/*.old", Temp, File),
        rule!("core_dumps", "**/core.*", Temp, File),
        rule!("ds_store", "**/.DS_Store", Temp, File),
        rule!("thumbs_db", "**/Thumbs.db", Temp, File),
        rule!("crash_reports", "**/*.crash", Temp, File),
        rule!("pycache_dir", "**/__pycache__/**", Temp, Dir, stop),
        rule!("pyc_files", "**/*.pyc", Temp, File),
        rule!("trash_dir", "**/.Trash/**", Temp, Both),
        rule!("lock_files", "**/*.lock", Temp, File),
        rule!("editor_backup", "**/*~", Temp, File),
        rule!("crdownload_files", "**/*.crdownload", Temp, File),
        rule!("partial_downloads", "**/*.part", Temp, File),

        // --- CACHE ---
        rule!("npm_cache", "**/.npm/**", Cache, Both, stop),
        rule!("pip_cache", "**/.cache/pip/**", Cache, Both, stop),
        rule!("yarn_cache", "**/.cache/yarn/**", Cache, Both, stop),
        rule!("gradle_cache", "**/.gradle/**", Cache, Both, stop),
        rule!("cargo_registry_cache", "**/.cargo/registry/**", Cache, Both, stop),
        rule!("go_build_cache", "**/go-build/**", Cache, Both, stop),
        rule!("generic_cache_dir", "**/.cache/**", Cache, Both, stop),
        rule!("xcode_deriveddata", "**/DerivedData/**", Cache, Both, stop),
        rule!("brew_cache", "**/Library/Caches/Homebrew/**", Cache, Both, stop),
        rule!("jest_cache", "**/.jest-cache/**", Cache, Both, stop),
        rule!("webpack_cache", "**/.cache/webpack/**", Cache, Both, stop),
        rule!("sass_cache", "**/.sass-cache/**", Cache, Both, stop),
        rule!("nuget_cache", "**/.nuget/packages/**", Cache, Both, stop),
        rule!("composer_cache", "**/.composer/cache/**", Cache, Both, stop),
        rule!("pub_cache", "**/.pub-cache/**", Cache, Both, stop),
        rule!("electron_cache", "**/.electron-gyp/**", Cache, Both, stop),
        rule!("docker_buildcache", "**/.docker/buildx/**", Cache, Both, stop),
        rule!("thumbnail_cache", "**/.thumbnails/**", Cache, Both, stop),

        // --- BUILD_ARTIFACT ---
        rule!("node_modules", "**/node_modules/**", BuildArtifact, Dir, stop),
        rule!("python_venv", "**/{venv,.venv}/**", BuildArtifact, Dir, stop),
        rule!("rust_target", "**/target/**", BuildArtifact, Dir, stop),
        rule!("generic_build_dir", "**/build/**", BuildArtifact, Dir, stop),
        rule!("dist_dir", "**/dist/**", BuildArtifact, Dir, stop),
        rule!("out_dir", "**/out/**", BuildArtifact, Dir, stop),
        rule!("cmake_build", "**/cmake-build-*/**", BuildArtifact, Dir, stop),
        rule!("gradle_build", "**/.gradle/build/**", BuildArtifact, Dir, stop),
        rule!("maven_target", "**/target/classes/**", BuildArtifact, Dir, stop),
        rule!("dotnet_bin", "**/bin/Debug/**", BuildArtifact, Dir, stop),
        rule!("dotnet_obj", "**/obj/Debug/**", BuildArtifact, Dir, stop),
        rule!("xcode_build", "**/build/Release/**", BuildArtifact, Dir, stop),
        rule!("android_build", "**/app/build/**", BuildArtifact, Dir, stop),
        rule!("webpack_dist", "**/.next/**", BuildArtifact, Dir, stop),
        rule!("nuxt_build", "**/.nuxt/**", BuildArtifact, Dir, stop),
        rule!("vite_build", "**/.vite/**", BuildArtifact, Dir, stop),
        rule!("terraform_dir", "**/.terraform/**", BuildArtifact, Dir, stop),
        rule!("vendor_dir", "**/vendor/**", BuildArtifact, Dir, stop),
        rule!("bower_components", "**/bower_components/**", BuildArtifact, Dir, stop),
        rule!("egg_info", "**/*.egg-info/**", BuildArtifact, Dir, stop),
        rule!("class_files", "**/*.class", BuildArtifact, File),
        rule!("object_files", "**/*.o", BuildArtifact, File),
        rule!("shared_objects", "**/*.so", BuildArtifact, File),
        rule!("static_libs", "**/*.a", BuildArtifact, File),
        rule!("wasm_artifacts", "**/*.wasm", BuildArtifact, File),
        rule!("jar_files", "**/*.jar", BuildArtifact, File),
        rule!("whl_files", "**/*.whl", BuildArtifact, File),
        rule!("pdb_files", "**/*.pdb", BuildArtifact, File),
        rule!("dsym_dirs", "**/*.dSYM/**", BuildArtifact, Dir, stop),
        rule!("coverage_dir", "**/coverage/**", BuildArtifact, Dir, stop),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    #[test]
    fn default_rules_has_roughly_sixty_entries() {
        let rules = default_rules();
        assert!(rules.len() >= 55, "expected ~60 default rules, got {}", rules.len());
    }

    #[test]
    fn build_artifact_rules_default_to_stop_recursion() {
        let rules = default_rules();
        let build_artifacts: Vec<_> = rules
            .iter()
            .filter(|r| matches!(r.category, Category::BuildArtifact) && r.apply_to == ApplyTo::Dir)
            .collect();
        assert!(build_artifacts.iter().all(|r| r.stop_recursion));
    }

    #[test]
    fn parse_ruleset_round_trips_json() {
        let json = r#"{
            "rules": [
                {"name": "tmp", "pattern": "**/tmp/**", "category": "temp", "apply_to": "both"}
            ],
            "additional_paths": {
                "cache": ["/mnt/shared-cache"]
            }
        }"#;
        let (rules, additional) = parse_ruleset(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].category, Category::Temp);
        assert!(!rules[0].stop_recursion);

        let mut expected: StdHashMap<Category, Vec<PathBuf>> = StdHashMap::new();
        expected.insert(Category::Cache, vec![PathBuf::from("/mnt/shared-cache")]);
        assert_eq!(additional, expected);
    }
}
