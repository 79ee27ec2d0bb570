//! Cache result type

use super::entry::CacheEntry;

/// Result of a cache lookup operation
#[derive(Debug, Clone)]
pub enum CacheResult<T> {
    /// Cache hit
    Hit(CacheEntry<T>),
    /// Cache miss
    Miss,
}

impl<T> CacheResult<T> {
    /// Check if this is a hit
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheResult::Hit(_))
    }

    /// Check if this is a miss
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheResult::Miss)
    }

    /// Extract the value, consuming the result
    pub fn value(self) -> Option<T> {
        match self {
            CacheResult::Hit(entry) => Some(entry.value),
            CacheResult::Miss => None,
        }
    }

    /// Extract the full entry, consuming the result
    pub fn entry(self) -> Option<CacheEntry<T>> {
        match self {
            CacheResult::Hit(entry) => Some(entry),
            CacheResult::Miss => None,
        }
    }

    /// Map the value if present
    pub fn map<U, F>(self, f: F) -> CacheResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            CacheResult::Hit(entry) => CacheResult::Hit(entry.map(f)),
            CacheResult::Miss => CacheResult::Miss,
        }
    }
}

impl<T> From<Option<CacheEntry<T>>> for CacheResult<T> {
    fn from(entry: Option<CacheEntry<T>>) -> Self {
        match entry {
            Some(entry) => CacheResult::Hit(entry),
            None => CacheResult::Miss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit() {
        let result = CacheResult::Hit(CacheEntry::new(42, 4));
        assert!(result.is_hit());
        assert!(!result.is_miss());
        assert_eq!(result.value(), Some(42));
    }

    #[test]
    fn test_miss() {
        let result: CacheResult<i32> = CacheResult::Miss;
        assert!(result.is_miss());
        assert!(result.value().is_none());
    }

    #[test]
    fn test_map() {
        let result = CacheResult::Hit(CacheEntry::new(42, 4));
        assert_eq!(result.map(|v| v * 2).value(), Some(84));
    }

    #[test]
    fn test_from_option() {
        let result: CacheResult<i32> = None.into();
        assert!(result.is_miss());
    }
}
