use std::path::Path;

use regex::Regex;

/// A single predicate in a [`FileFilter`]'s rule chain.
enum FilterRule {
    Name(String),
    Pattern(Regex),
}

impl FilterRule {
    fn matches(&self, path: &Path) -> bool {
        match self {
            Self::Name(name) => path
                .file_name()
                .map(|f| f.to_string_lossy() == name.as_str())
                .unwrap_or(false),
            Self::Pattern(regex) => regex.is_match(&path.to_string_lossy()),
        }
    }
}

/// An ordered sequence of `(predicate, allow|deny)` rules, evaluated in
/// order with last-match-wins semantics, as specified in `spec.md` §3/§4.A.
///
/// Thread-safe for concurrent reads once built — `filter()` takes `&self`
/// and touches no interior mutability.
pub struct FileFilter {
    rules: Vec<(FilterRule, bool)>,
    has_include_rules: bool,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FileFilter {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            has_include_rules: false,
        }
    }

    /// Build a filter from CLI-style options, installing the PHP/HTML/JS
    /// defaults when no include rule is configured, matching
    /// `ScanCommand._initialize_file_filter` in the original scanner.
    pub fn from_config(config: &FileFilterConfig) -> Result<Self, regex::Error> {
        let mut filter = Self::new();
        let mut has_include_overrides = false;

        for name in &config.include_files {
            has_include_overrides = true;
            filter.add_name(name, true);
        }
        for pattern in &config.include_files_pattern {
            has_include_overrides = true;
            filter.add_pattern(pattern, true)?;
        }
        for name in &config.exclude_files {
            filter.add_name(name, false);
        }
        for pattern in &config.exclude_files_pattern {
            filter.add_pattern(pattern, false)?;
        }

        if !has_include_overrides {
            filter.add_pattern(DEFAULT_PHP_PATTERN, true)?;
            filter.add_pattern(DEFAULT_HTML_PATTERN, true)?;
            filter.add_pattern(DEFAULT_JS_PATTERN, true)?;
            if let Some(images) = &config.images {
                filter.add_pattern(images, true)?;
            }
        }

        Ok(filter)
    }

    pub fn add_name(&mut self, name: impl Into<String>, allow: bool) {
        self.rules.push((FilterRule::Name(name.into()), allow));
        self.has_include_rules |= allow;
    }

    pub fn add_pattern(&mut self, pattern: &str, allow: bool) -> Result<(), regex::Error> {
        let regex = Regex::new(pattern)?;
        self.rules.push((FilterRule::Pattern(regex), allow));
        self.has_include_rules |= allow;
        Ok(())
    }

    /// Evaluate the rule chain against `path`. Last matching rule wins; if
    /// none matches, the default is deny when include rules exist, allow
    /// otherwise.
    pub fn filter(&self, path: &Path) -> bool {
        let mut outcome = None;
        for (rule, allow) in &self.rules {
            if rule.matches(path) {
                outcome = Some(*allow);
            }
        }
        outcome.unwrap_or(!self.has_include_rules)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileFilterConfig {
    pub include_files: Vec<String>,
    pub include_files_pattern: Vec<String>,
    pub exclude_files: Vec<String>,
    pub exclude_files_pattern: Vec<String>,
    /// Extra pattern enabling image extensions when no include override is set.
    pub images: Option<String>,
}

const DEFAULT_PHP_PATTERN: &str = r"(?i)\.php[0-9]?$|\.phtml$";
const DEFAULT_HTML_PATTERN: &str = r"(?i)\.html?$";
const DEFAULT_JS_PATTERN: &str = r"(?i)\.js$";

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_rules_allow_php_html_js_only() {
        let filter = FileFilter::from_config(&FileFilterConfig::default()).unwrap();
        assert!(filter.filter(&PathBuf::from("a.php")));
        assert!(filter.filter(&PathBuf::from("index.html")));
        assert!(filter.filter(&PathBuf::from("app.js")));
        assert!(!filter.filter(&PathBuf::from("b.png")));
    }

    #[test]
    fn images_pattern_opts_in_when_configured() {
        let config = FileFilterConfig {
            images: Some(r"(?i)\.(png|jpe?g|gif)$".to_string()),
            ..Default::default()
        };
        let filter = FileFilter::from_config(&config).unwrap();
        assert!(filter.filter(&PathBuf::from("b.png")));
    }

    #[test]
    fn exclude_wins_when_it_is_last_matching_rule() {
        let mut filter = FileFilter::new();
        filter.add_pattern(r"\.php$", true).unwrap();
        filter.add_name("secret.php", false);
        assert!(filter.filter(&PathBuf::from("a.php")));
        assert!(!filter.filter(&PathBuf::from("secret.php")));
    }

    #[test]
    fn no_rules_allows_everything() {
        let filter = FileFilter::new();
        assert!(filter.filter(&PathBuf::from("anything.xyz")));
    }

    #[test]
    fn include_only_denies_unmatched_paths() {
        let mut filter = FileFilter::new();
        filter.add_name("only-this.txt", true);
        assert!(filter.filter(&PathBuf::from("only-this.txt")));
        assert!(!filter.filter(&PathBuf::from("other.txt")));
    }

    #[test]
    fn filtering_same_path_twice_is_deterministic() {
        let filter = FileFilter::from_config(&FileFilterConfig::default()).unwrap();
        let path = PathBuf::from("a.php");
        assert_eq!(filter.filter(&path), filter.filter(&path));
    }
}
