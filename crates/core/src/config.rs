//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services. Nothing in
//! this crate reads environment variables while handling an operation.

use crate::constants::{DEFAULT_DATA_DIR, ENTRIES_DIR_NAME, TEMPLATES_DIR_NAME};
use crate::{CoreError, CoreResult};
use rehab_forms::TransitionPolicy;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    transition_policy: TransitionPolicy,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if `data_dir` is empty.
    pub fn new(data_dir: PathBuf, transition_policy: TransitionPolicy) -> CoreResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput("data_dir cannot be empty".into()));
        }

        Ok(Self {
            data_dir,
            transition_policy,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir.join(TEMPLATES_DIR_NAME)
    }

    pub fn entries_dir(&self) -> PathBuf {
        self.data_dir.join(ENTRIES_DIR_NAME)
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        self.transition_policy
    }
}

/// Resolve the data directory from an optional raw value.
///
/// `None` or a blank value falls back to [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Parse the transition policy from an optional raw value.
///
/// `None` or a blank value gives [`TransitionPolicy::Permissive`].
pub fn transition_policy_from_env_value(value: Option<String>) -> CoreResult<TransitionPolicy> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value
        .map(|v| TransitionPolicy::parse(&v))
        .transpose()?;

    Ok(parsed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_data_dir() {
        let err = CoreConfig::new(PathBuf::new(), TransitionPolicy::Permissive)
            .expect_err("empty dir");
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn derives_record_dirs() {
        let cfg = CoreConfig::new(PathBuf::from("/srv/rehab"), TransitionPolicy::Guarded).unwrap();
        assert_eq!(cfg.templates_dir(), PathBuf::from("/srv/rehab/templates"));
        assert_eq!(cfg.entries_dir(), PathBuf::from("/srv/rehab/entries"));
        assert_eq!(cfg.transition_policy(), TransitionPolicy::Guarded);
    }

    #[test]
    fn env_value_defaults() {
        assert_eq!(data_dir_from_env_value(None), PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(
            data_dir_from_env_value(Some("  ".into())),
            PathBuf::from(DEFAULT_DATA_DIR)
        );
        assert_eq!(
            data_dir_from_env_value(Some("/tmp/x".into())),
            PathBuf::from("/tmp/x")
        );

        assert_eq!(
            transition_policy_from_env_value(None).unwrap(),
            TransitionPolicy::Permissive
        );
        assert_eq!(
            transition_policy_from_env_value(Some(" guarded ".into())).unwrap(),
            TransitionPolicy::Guarded
        );
        assert!(transition_policy_from_env_value(Some("strict".into())).is_err());
    }
}
