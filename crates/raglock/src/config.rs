/// Tunables for a [`LockSystem`](crate::LockSystem).
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Thread nodes to reserve room for up front.
    pub thread_capacity: usize,
    /// Resource nodes to reserve room for up front.
    pub resource_capacity: usize,
    /// Log predicted deadlocks at `debug` instead of `warn`.
    pub quiet_rejections: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            thread_capacity: 16,
            resource_capacity: 16,
            quiet_rejections: false,
        }
    }
}

impl LockConfig {
    pub fn with_thread_capacity(mut self, capacity: usize) -> Self {
        self.thread_capacity = capacity;
        self
    }

    pub fn with_resource_capacity(mut self, capacity: usize) -> Self {
        self.resource_capacity = capacity;
        self
    }

    pub fn with_quiet_rejections(mut self, quiet: bool) -> Self {
        self.quiet_rejections = quiet;
        self
    }

    /// Defaults, overridden by `RAGLOCK_THREAD_CAPACITY`,
    /// `RAGLOCK_RESOURCE_CAPACITY` and `RAGLOCK_QUIET_REJECTIONS` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            thread_capacity: capacity_var(
                &lookup,
                "RAGLOCK_THREAD_CAPACITY",
                defaults.thread_capacity,
            ),
            resource_capacity: capacity_var(
                &lookup,
                "RAGLOCK_RESOURCE_CAPACITY",
                defaults.resource_capacity,
            ),
            quiet_rejections: lookup("RAGLOCK_QUIET_REJECTIONS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.quiet_rejections),
        }
    }
}

fn capacity_var(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: usize) -> usize {
    match lookup(name) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(%name, value = %raw, fallback = default, "invalid capacity, using default");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        let cfg = LockConfig::from_lookup(|name| match name {
            "RAGLOCK_THREAD_CAPACITY" => Some("64".to_string()),
            "RAGLOCK_QUIET_REJECTIONS" => Some("true".to_string()),
            _ => None,
        });
        assert_eq!(cfg.thread_capacity, 64);
        assert_eq!(cfg.resource_capacity, 16);
        assert!(cfg.quiet_rejections);
    }

    #[test]
    fn invalid_capacity_falls_back() {
        let cfg = LockConfig::from_lookup(|name| {
            (name == "RAGLOCK_RESOURCE_CAPACITY").then(|| "lots".to_string())
        });
        assert_eq!(cfg.resource_capacity, 16);
        assert!(!cfg.quiet_rejections);
    }
}
