//! Driver name matching and the trailer-backed driver index
//!
//! Names are compared after lower-casing and trimming. A query matches a candidate when the
//! two are equal, or when either contains the other. When several candidates qualify the
//! first one in car-slot order wins; there is no uniqueness or minimum-length guard, so a
//! short query such as `"al"` matches the first name containing it.

/// Normalize a driver name for comparison.
pub fn normalize_driver_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Whether two already-normalized names refer to the same driver.
pub fn names_match(candidate: &str, target: &str) -> bool {
    candidate == target || candidate.contains(target) || target.contains(candidate)
}

/// Driver names in car-slot order, used to find a car without walking frame data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverIndex {
    names: Vec<String>,
    normalized: Vec<String>,
}

impl DriverIndex {
    pub fn new(names: Vec<String>) -> Self {
        let normalized = names.iter().map(|n| normalize_driver_name(n)).collect();
        Self { names, normalized }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Names as they appear in the metadata.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Car slot of the driver matching `target`.
    ///
    /// An exact (case-insensitive) match anywhere in the index takes precedence over a
    /// substring match earlier in the index.
    pub fn find(&self, target: &str) -> Option<usize> {
        let target = normalize_driver_name(target);
        self.normalized
            .iter()
            .position(|name| *name == target)
            .or_else(|| self.normalized.iter().position(|name| names_match(name, &target)))
    }
}
