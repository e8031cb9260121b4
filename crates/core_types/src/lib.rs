/// Handle for one materialized document on a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Monotonic counter of patch batches applied to a surface.
///
/// Every render cycle moves the live surface from version `N` to `N + 1`.
/// A surface rejects batches whose `from` does not match its current version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomVersion(pub u64);

impl DomVersion {
    pub const INITIAL: DomVersion = DomVersion(0);

    pub fn next(self) -> Self {
        DomVersion(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for DomVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_advance_by_one() {
        let v = DomVersion::INITIAL;
        assert_eq!(v.next(), DomVersion(1));
        assert_eq!(v.next().next(), DomVersion(2));
        assert!(v < v.next());
    }

    #[test]
    fn version_display() {
        assert_eq!(DomVersion(7).to_string(), "v7");
    }
}
