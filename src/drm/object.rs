//! Per-object property catalogs
//!
//! KMS property ids are assigned by the driver at runtime; the only
//! stable key is the property name. Each display object therefore gets
//! a short-lived catalog mapping names to ids, consulted once while
//! building the reset batch and then dropped.

use std::io;

use drm::control::{property, Device as ControlDevice, ResourceHandle};

/// Name-to-id mapping for one display object, in kernel report order.
pub struct ObjectProperties {
    props: Vec<(String, property::Handle)>,
}

impl ObjectProperties {
    /// Fetch the current property list of `handle`.
    ///
    /// Fails when the object vanished between enumeration and this query
    /// or the kernel rejected it; callers skip the object and move on.
    pub fn resolve<T: ResourceHandle>(
        device: &impl ControlDevice,
        handle: T,
    ) -> io::Result<Self> {
        let set = device.get_properties(handle)?;
        let (ids, _values) = set.as_props_and_values();

        let mut props = Vec::with_capacity(ids.len());
        for &id in ids {
            let info = device.get_property(id)?;
            // Property names are fixed-size C strings; a non-UTF-8 name
            // cannot match any name we look up.
            if let Ok(name) = info.name().to_str() {
                props.push((name.to_owned(), id));
            }
        }

        Ok(Self { props })
    }

    /// Look up a property id by exact, case-sensitive name.
    ///
    /// `None` is a normal outcome: vendors expose different optional
    /// property sets.
    pub fn find(&self, name: &str) -> Option<property::Handle> {
        self.props
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|&(_, id)| id)
    }
}

impl FromIterator<(String, property::Handle)> for ObjectProperties {
    fn from_iter<I: IntoIterator<Item = (String, property::Handle)>>(iter: I) -> Self {
        Self {
            props: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;

    fn catalog(names: &[&str]) -> ObjectProperties {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let id = NonZeroU32::new(i as u32 + 1).unwrap();
                (name.to_string(), property::Handle::from(id))
            })
            .collect()
    }

    #[test]
    fn test_find_exact_match() {
        let props = catalog(&["CRTC_ID", "alpha", "rotation"]);
        assert!(props.find("CRTC_ID").is_some());
        assert!(props.find("alpha").is_some());
        assert!(props.find("rotation").is_some());
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let props = catalog(&["CRTC_ID", "alpha"]);
        assert!(props.find("crtc_id").is_none());
        assert!(props.find("Alpha").is_none());
    }

    #[test]
    fn test_find_rejects_partial_names() {
        let props = catalog(&["CRTC_ID"]);
        assert!(props.find("CRTC").is_none());
        assert!(props.find("CRTC_ID ").is_none());
        assert!(props.find("").is_none());
    }

    #[test]
    fn test_empty_catalog() {
        let props = catalog(&[]);
        assert!(props.find("ACTIVE").is_none());
    }
}
