use std::collections::HashSet;

/// Usernames already claimed, used to suggest a free one at login.
#[derive(Debug, Clone, Default)]
pub struct UsernameRegistry {
    names: HashSet<String>,
}

impl UsernameRegistry {
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// `base` if it is free, otherwise the first free `base1`, `base2`, ...
    pub fn suggest(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        (1u32..)
            .map(|n| format!("{}{}", base, n))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    pub fn register(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }
}
