//! In-memory page location.

use std::sync::{PoisonError, RwLock};

use taxlab_core::auth::Location;
use url::Url;

/// Page location kept in memory.
///
/// Records every navigation so callers (and tests) can see where a logout
/// sent the user. Used by the CLI, which has no browser to drive.
#[derive(Debug)]
pub struct MemoryLocation {
    current: RwLock<Url>,
    navigations: RwLock<Vec<Url>>,
}

impl MemoryLocation {
    pub fn new(url: Url) -> Self {
        Self {
            current: RwLock::new(url),
            navigations: RwLock::new(Vec::new()),
        }
    }

    /// URLs passed to [`Location::assign`], oldest first.
    pub fn navigations(&self) -> Vec<Url> {
        self.navigations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Location for MemoryLocation {
    fn href(&self) -> Url {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, url: Url) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = url;
    }

    fn assign(&self, url: Url) {
        self.navigations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_does_not_record_navigation() {
        let location = MemoryLocation::new(Url::parse("https://tax.example/?token=x").unwrap());
        location.replace(Url::parse("https://tax.example/").unwrap());

        assert_eq!(location.href().as_str(), "https://tax.example/");
        assert!(location.navigations().is_empty());
    }

    #[test]
    fn assign_records_navigation() {
        let location = MemoryLocation::new(Url::parse("https://tax.example/").unwrap());
        let shell = Url::parse("https://bcombuddy.netlify.app").unwrap();
        location.assign(shell.clone());

        assert_eq!(location.href(), shell);
        assert_eq!(location.navigations(), vec![shell]);
    }
}
