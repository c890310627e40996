use regex::Regex;

/// Immutable snapshot of valid application names.
///
/// Names keep the spelling they were loaded with; matching against query text
/// is case-insensitive and word-bounded.
#[derive(Debug, Default)]
pub struct KnownApps {
    apps: Vec<KnownApp>,
}

#[derive(Debug)]
struct KnownApp {
    name: String,
    pattern: Regex,
}

impl KnownApps {
    /// Builds the snapshot, dropping blanks and case-insensitive duplicates
    /// (the first spelling wins).
    pub fn new<I, S>(names: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut apps: Vec<KnownApp> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || apps.iter().any(|app| app.name.eq_ignore_ascii_case(name)) {
                continue;
            }
            // Names may begin or end with symbols ("c++"), where `\b` never matches.
            let pattern = Regex::new(&format!(r"(?i)(?:^|\W)({})(?:\W|$)", regex::escape(name)))?;
            apps.push(KnownApp {
                name: name.to_string(),
                pattern,
            });
        }
        Ok(Self { apps })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.apps.iter().map(|app| app.name.as_str())
    }

    /// The known app mentioned in `query`.
    ///
    /// When several appear, the one mentioned first wins; on a tie at the same
    /// position the longer name wins ("api-gateway" over "api").
    pub fn find_in(&self, query: &str) -> Option<&str> {
        self.apps
            .iter()
            .filter_map(|app| {
                app.pattern
                    .captures(query)
                    .and_then(|caps| caps.get(1))
                    .map(|hit| (hit.start(), app.name.len(), app.name.as_str()))
            })
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, _, name)| name)
    }
}
