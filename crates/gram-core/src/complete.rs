//! Completion providers for the built-in commands.
//!
//! Everything here runs on the completion worker, so it only reads the
//! filesystem and the [`CompletionEnv`] snapshot.

use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::cache;
use crate::command::CompletionEnv;
use crate::key::{expand_tilde, normalize, resolve, slashed};

/// Characters that make an argument a glob pattern.
const GLOB_META: &[char] = &['*', '?', '['];

/// Completions offered for `cache` before a sub-command is typed.
const CACHE_OPS: [&str; 3] = ["load ", "save ", "clear"];

/// Glob expansions, cleared whenever a file is opened.
#[derive(Debug, Default)]
pub struct GlobCache {
    map: Mutex<HashMap<String, Vec<String>>>,
}

impl GlobCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pattern: &str) -> Option<Vec<String>> {
        self.map.lock().get(pattern).cloned()
    }

    pub fn insert(&self, pattern: &str, paths: Vec<String>) {
        self.map.lock().insert(pattern.to_string(), paths);
    }

    pub fn clear(&self) {
        self.map.lock().clear();
    }
}

pub fn has_wildcard(text: &str) -> bool {
    text.contains(GLOB_META)
}

// ==================== Path shortening ====================

/// Shortest trailing component sequence of each path that is unique
/// among all of them. All paths grow by the same number of components.
pub fn shorten_paths(paths: &[PathBuf]) -> Vec<String> {
    let parts: Vec<Vec<String>> = paths
        .iter()
        .map(|p| {
            slashed(p)
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect();
    let max_depth = parts.iter().map(Vec::len).max().unwrap_or(0);

    let mut depth = 1;
    loop {
        let shorts: Vec<String> = parts
            .iter()
            .map(|p| p[p.len().saturating_sub(depth)..].join("/"))
            .collect();
        let unique: HashSet<&String> = shorts.iter().collect();
        // Identical paths never become unique
        if unique.len() == shorts.len() || depth >= max_depth {
            return shorts;
        }
        depth += 1;
    }
}

// ==================== Fuzzy filtering ====================

/// Splits at the last `/` like a path: (`dir`, `base`).
fn split_query(query: &str) -> (&str, &str) {
    match query.rfind('/') {
        Some(0) => ("/", &query[1..]),
        Some(idx) => (&query[..idx], &query[idx + 1..]),
        None => ("", query),
    }
}

/// Shell-style matcher for a lowercased query; `*` also matches `/`.
fn wildcard(query: &str) -> Option<GlobMatcher> {
    GlobBuilder::new(query)
        .literal_separator(false)
        .build()
        .ok()
        .map(|g| g.compile_matcher())
}

/// Keeps candidates longer than `query` that contain its base name (once
/// the query's directory is removed) or match it as a wildcard pattern.
/// Earlier base-name positions rank first.
pub fn fuzzy_filter(query: &str, candidates: Vec<String>) -> Vec<String> {
    let low = query.to_lowercase();
    let (dir, base) = split_query(&low);
    let matcher = wildcard(&low);
    let query_len = low.chars().count();

    let mut kept: Vec<String> = candidates
        .into_iter()
        .filter(|word| {
            if query_len >= word.chars().count() {
                return false;
            }
            let low_word = word.to_lowercase();
            let base_word = if dir.is_empty() {
                low_word.clone()
            } else {
                low_word.replace(dir, "")
            };
            base_word.contains(base) || matcher.as_ref().is_some_and(|m| m.is_match(&low_word))
        })
        .collect();
    kept.sort_by_key(|word| word.to_lowercase().find(base).unwrap_or(usize::MAX));
    kept
}

// ==================== Providers ====================

/// Entries of a directory, directories suffixed with `/`.
///
/// When `shown` is empty the names are bare; otherwise each is prefixed
/// with `shown` so the result can replace the whole argument.
pub fn list_dir(dir: &Path, shown: &str) -> Vec<String> {
    WalkBuilder::new(dir)
        .hidden(false)
        .follow_links(false)
        .git_ignore(false)
        .ignore(false)
        .parents(false)
        .max_depth(Some(1))
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.depth() > 0)
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            let mut shown = match shown {
                "" => name,
                s if s.ends_with('/') => format!("{}{}", s, name),
                s => format!("{}/{}", s, name),
            };
            if is_dir {
                shown.push('/');
            }
            Some(shown)
        })
        .collect()
}

/// Directory-listing matches for `text`: lists the typed directory if it
/// exists, the working directory otherwise, and filters by `text`.
pub fn open_matches(env: &CompletionEnv, text: &str) -> Vec<String> {
    let (dir, _) = split_query(text);
    let shown = slashed(&expand_tilde(dir));
    let resolved = resolve(&env.workdir, &shown);
    let entries = if !dir.is_empty() && resolved.is_dir() {
        list_dir(&resolved, &shown)
    } else {
        list_dir(&env.workdir, "")
    };
    fuzzy_filter(text, entries)
}

/// Glob expansion of `text`, cached per pattern, falling back to
/// [`open_matches`] when it finds nothing or only `text` itself.
pub fn glob_matches(env: &CompletionEnv, text: &str) -> Vec<String> {
    let expanded = match env.globs.get(text) {
        Some(paths) => paths,
        None => {
            let paths = expand_glob(&env.workdir, text);
            env.globs.insert(text, paths.clone());
            paths
        }
    };
    if expanded.is_empty() || (expanded.len() == 1 && expanded[0] == text) {
        return open_matches(env, text);
    }
    expanded
}

/// Paths matching a glob pattern. Relative patterns give paths relative
/// to `workdir`; hidden entries are skipped.
pub fn expand_glob(workdir: &Path, text: &str) -> Vec<String> {
    if !has_wildcard(text) {
        return if resolve(workdir, text).exists() {
            vec![text.to_string()]
        } else {
            Vec::new()
        };
    }

    let expanded = expand_tilde(text.trim());
    let absolute = expanded.is_absolute();
    let full = slashed(&normalize(&workdir.join(expanded)));
    let prefix = format!("{}/", slashed(&normalize(workdir)));

    let components: Vec<&str> = full.split('/').collect();
    let first_meta = components
        .iter()
        .position(|c| has_wildcard(c))
        .unwrap_or(components.len());
    let root = match components[..first_meta].join("/") {
        r if r.is_empty() => "/".to_string(),
        r => r,
    };
    let depth = if components[first_meta..].iter().any(|c| c.contains("**")) {
        None
    } else {
        Some(components.len() - first_meta)
    };

    let Ok(glob) = GlobBuilder::new(&full).literal_separator(true).build() else {
        return Vec::new();
    };
    let matcher = glob.compile_matcher();

    let mut paths: Vec<String> = WalkBuilder::new(&root)
        .hidden(true)
        .follow_links(false)
        .git_ignore(false)
        .ignore(false)
        .parents(false)
        .max_depth(depth)
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.depth() > 0)
        .map(|entry| slashed(entry.path()))
        .filter(|path| matcher.is_match(path))
        .map(|path| match path.strip_prefix(&prefix) {
            Some(relative) if !absolute => relative.to_string(),
            _ => path,
        })
        .collect();
    paths.sort();
    paths
}

/// Open buffers by shortened path.
pub fn tab_matches(env: &CompletionEnv, text: &str) -> Vec<String> {
    if env.open_paths.is_empty() {
        return Vec::new();
    }
    fuzzy_filter(text, shorten_paths(&env.open_paths))
}

/// `load `/`save `/`clear`, then blob names for `load` and `save`.
pub fn cache_matches(env: &CompletionEnv, text: &str) -> Vec<String> {
    let low = text.to_lowercase();
    let mut words = low.split(' ');
    let op = words.next().unwrap_or("");
    let args: Vec<&str> = words.collect();
    let needle = if args.is_empty() {
        op.to_string()
    } else {
        cache::blob_name(&args)
    };

    if op == "load" || op == "save" {
        let mut names: Vec<String> = cache::names(&env.data_dir)
            .into_iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .collect();
        if !names.is_empty() {
            names.sort_by_key(|name| name.to_lowercase().find(&needle).unwrap_or(usize::MAX));
            return names.into_iter().map(|name| format!("{} {}", op, name)).collect();
        }
    } else if CACHE_OPS.iter().any(|o| o.contains(needle.as_str())) {
        let mut ops: Vec<&str> = CACHE_OPS
            .iter()
            .copied()
            .filter(|o| o.contains(needle.as_str()))
            .collect();
        ops.sort_by_key(|o| o.find(needle.as_str()).unwrap_or(usize::MAX));
        return ops.into_iter().map(str::to_string).collect();
    }
    CACHE_OPS.iter().map(|o| o.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    fn env(workdir: &Path) -> CompletionEnv {
        CompletionEnv {
            workdir: workdir.to_path_buf(),
            data_dir: workdir.join(".data"),
            open_paths: Vec::new(),
            globs: Arc::new(GlobCache::new()),
        }
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "").unwrap();
        fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        fs::write(dir.path().join("src/nested/deep.rs"), "").unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();
        fs::write(dir.path().join("main.py"), "").unwrap();
        dir
    }

    #[test]
    fn test_shorten_paths() {
        let paths = vec![
            PathBuf::from("/a/x/main.rs"),
            PathBuf::from("/b/x/main.rs"),
            PathBuf::from("/a/lib.rs"),
        ];
        assert_eq!(
            shorten_paths(&paths),
            vec!["a/x/main.rs", "b/x/main.rs", "a/lib.rs"]
        );
        let unique = vec![PathBuf::from("/a/one.rs"), PathBuf::from("/b/two.rs")];
        assert_eq!(shorten_paths(&unique), vec!["one.rs", "two.rs"]);
    }

    #[test]
    fn test_shorten_identical_paths_terminates() {
        let paths = vec![PathBuf::from("/a/b.rs"), PathBuf::from("/a/b.rs")];
        assert_eq!(shorten_paths(&paths), vec!["a/b.rs", "a/b.rs"]);
    }

    #[test]
    fn test_fuzzy_filter_ranks_by_position() {
        let candidates = vec![
            "xmain.rs".to_string(),
            "main.rs".to_string(),
            "other".to_string(),
            "ma".to_string(),
        ];
        assert_eq!(
            fuzzy_filter("ma", candidates),
            vec!["main.rs".to_string(), "xmain.rs".to_string()]
        );
    }

    #[test]
    fn test_fuzzy_filter_wildcard() {
        let candidates = vec!["src/main.rs".to_string(), "src/lib.py".to_string()];
        assert_eq!(fuzzy_filter("*.RS", candidates), vec!["src/main.rs".to_string()]);
    }

    #[test]
    fn test_open_matches_lists_typed_dir() {
        let dir = fixture();
        let matches = open_matches(&env(dir.path()), "src/ma");
        assert_eq!(matches, vec!["src/main.rs".to_string()]);

        let matches = open_matches(&env(dir.path()), "src/n");
        assert_eq!(
            matches,
            vec!["src/nested/".to_string(), "src/main.rs".to_string()]
        );
    }

    #[test]
    fn test_open_matches_falls_back_to_workdir() {
        let dir = fixture();
        let matches = open_matches(&env(dir.path()), "mai");
        assert_eq!(matches, vec!["main.py".to_string()]);
    }

    #[test]
    fn test_glob_expansion() {
        let dir = fixture();
        assert_eq!(
            expand_glob(dir.path(), "src/*.rs"),
            vec!["src/lib.rs".to_string(), "src/main.rs".to_string()]
        );
        assert_eq!(
            expand_glob(dir.path(), "src/**/*.rs"),
            vec![
                "src/lib.rs".to_string(),
                "src/main.rs".to_string(),
                "src/nested/deep.rs".to_string()
            ]
        );
    }

    #[test]
    fn test_glob_falls_back_when_literal() {
        let dir = fixture();
        let env = env(dir.path());
        // A plain existing path only globs to itself
        assert_eq!(expand_glob(dir.path(), "main.py"), vec!["main.py".to_string()]);
        assert!(glob_matches(&env, "main.py").is_empty());
        // Nothing matches the glob: directory listing instead
        assert_eq!(glob_matches(&env, "src/*.zz"), Vec::<String>::new());
        assert!(env.globs.get("src/*.zz").is_some());
    }

    #[test]
    fn test_tab_matches() {
        let mut env = env(Path::new("/"));
        env.open_paths = vec![
            PathBuf::from("/w/src/main.rs"),
            PathBuf::from("/w/tests/main.rs"),
            PathBuf::from("/w/readme.md"),
        ];
        assert_eq!(
            tab_matches(&env, "main"),
            vec!["src/main.rs".to_string(), "tests/main.rs".to_string()]
        );
    }

    #[test]
    fn test_cache_matches() {
        let dir = tempfile::tempdir().unwrap();
        let env = env(dir.path());
        assert_eq!(cache_matches(&env, ""), vec!["load ", "save ", "clear"]);
        assert_eq!(cache_matches(&env, "lo"), vec!["load "]);

        cache::save(&env.data_dir, "project_one", Vec::new()).unwrap();
        assert_eq!(cache_matches(&env, "load proj"), vec!["load project_one"]);
        assert_eq!(cache_matches(&env, "load zzz"), vec!["load ", "save ", "clear"]);
    }
}
