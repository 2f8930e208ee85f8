// src/reconcile/extensions.rs

//! Mapping between source file names and the output names a build emits
//! for them.

/// Source extensions (without the dot) that the build compiles.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx"];

/// Output suffixes (without the leading dot) produced per source file:
/// compiled modules, declarations and their source maps.
pub const OUTPUT_SUFFIXES: &[&str] = &[
    "js",
    "cjs",
    "mjs",
    "js.map",
    "cjs.map",
    "mjs.map",
    "d.ts",
    "d.cts",
    "d.mts",
    "d.ts.map",
    "d.cts.map",
    "d.mts.map",
];

/// Bidirectional source ⇄ output name mapping.
#[derive(Debug, Clone)]
pub struct ExtensionMap {
    source: Vec<String>,
    /// Sorted longest first so `a.d.ts.map` strips as `d.ts.map`, not `map`.
    outputs: Vec<String>,
}

impl Default for ExtensionMap {
    fn default() -> Self {
        Self::new(
            SOURCE_EXTENSIONS.iter().map(|s| s.to_string()),
            OUTPUT_SUFFIXES.iter().map(|s| s.to_string()),
        )
    }
}

impl ExtensionMap {
    pub fn new(
        source: impl IntoIterator<Item = String>,
        outputs: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut outputs: Vec<String> = outputs.into_iter().collect();
        outputs.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        outputs.dedup();
        Self {
            source: source.into_iter().collect(),
            outputs,
        }
    }

    /// Strip the longest known output suffix, e.g. `"a.d.ts.map"` → `"a"`.
    pub fn output_stem<'a>(&self, output_name: &'a str) -> Option<&'a str> {
        self.outputs.iter().find_map(|suffix| {
            let stem = output_name.strip_suffix(suffix.as_str())?.strip_suffix('.')?;
            (!stem.is_empty()).then_some(stem)
        })
    }

    /// Strip a source extension, e.g. `"button.tsx"` → `"button"`.
    pub fn source_stem<'a>(&self, source_name: &'a str) -> Option<&'a str> {
        self.source.iter().find_map(|ext| {
            let stem = source_name.strip_suffix(ext.as_str())?.strip_suffix('.')?;
            (!stem.is_empty()).then_some(stem)
        })
    }

    /// Source names whose presence keeps `output_name` alive.
    ///
    /// A recognised output maps back to every source extension; any output
    /// (recognised or not) is also kept by a source of the very same name,
    /// which covers copied assets.
    pub fn source_candidates(&self, output_name: &str) -> Vec<String> {
        let mut candidates = Vec::with_capacity(self.source.len() + 1);
        if let Some(stem) = self.output_stem(output_name) {
            for ext in &self.source {
                candidates.push(format!("{stem}.{ext}"));
            }
        }
        candidates.push(output_name.to_string());
        candidates
    }

    /// Output names a source file may have produced.
    pub fn output_names(&self, source_name: &str) -> Vec<String> {
        let mut names = Vec::with_capacity(self.outputs.len() + 1);
        if let Some(stem) = self.source_stem(source_name) {
            for suffix in &self.outputs {
                names.push(format!("{stem}.{suffix}"));
            }
        }
        names.push(source_name.to_string());
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_suffix_wins() {
        let map = ExtensionMap::default();
        assert_eq!(map.output_stem("a.d.ts.map"), Some("a"));
        assert_eq!(map.output_stem("a.js.map"), Some("a"));
        assert_eq!(map.output_stem("a.cjs"), Some("a"));
        assert_eq!(map.output_stem("styles.css"), None);
    }

    #[test]
    fn dotted_stems_are_kept_whole() {
        let map = ExtensionMap::default();
        assert_eq!(map.output_stem("button.stories.js"), Some("button.stories"));
        assert_eq!(
            map.source_candidates("button.stories.d.ts"),
            vec![
                "button.stories.ts".to_string(),
                "button.stories.tsx".to_string(),
                "button.stories.d.ts".to_string(),
            ]
        );
    }

    #[test]
    fn unknown_outputs_only_mirror_same_name() {
        let map = ExtensionMap::default();
        assert_eq!(map.source_candidates("logo.svg"), vec!["logo.svg".to_string()]);
    }

    #[test]
    fn source_expands_to_all_outputs() {
        let map = ExtensionMap::default();
        let names = map.output_names("b.ts");
        for expected in ["b.js", "b.cjs", "b.js.map", "b.d.ts", "b.d.ts.map", "b.ts"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    fn bare_suffix_is_not_a_stem() {
        let map = ExtensionMap::default();
        assert_eq!(map.output_stem(".js"), None);
        assert_eq!(map.source_stem(".ts"), None);
    }
}
