//! Default device discovery
//!
//! Picks the primary node (/dev/dri/cardN) to reset when no device path
//! is given. Render nodes cannot modeset and are never candidates.

use std::path::{Path, PathBuf};

use log::debug;

const DRI_DIR: &str = "/dev/dri";

/// Find the lowest-numbered primary node, if the machine has one.
///
/// `None` means there is nothing to reset (no GPU, or no DRM support);
/// callers treat that as a benign no-op, not an error.
pub fn find_primary_node() -> Option<PathBuf> {
    let entries = std::fs::read_dir(DRI_DIR).ok()?;
    let names: Vec<String> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();

    let name = pick_primary(&names)?;
    debug!("Default DRM device: {}/{}", DRI_DIR, name);
    Some(Path::new(DRI_DIR).join(name))
}

/// Lowest-numbered `cardN` entry from a directory listing.
fn pick_primary(names: &[String]) -> Option<&str> {
    names
        .iter()
        .filter_map(|name| card_number(name).map(|num| (num, name.as_str())))
        .min_by_key(|&(num, _)| num)
        .map(|(_, name)| name)
}

fn card_number(name: &str) -> Option<u32> {
    name.strip_prefix("card")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_card_number() {
        assert_eq!(card_number("card0"), Some(0));
        assert_eq!(card_number("card12"), Some(12));
        assert_eq!(card_number("card"), None);
        assert_eq!(card_number("renderD128"), None);
        assert_eq!(card_number("by-path"), None);
    }

    #[test]
    fn test_pick_lowest_card() {
        let listing = names(&["renderD129", "card1", "card0", "renderD128"]);
        assert_eq!(pick_primary(&listing), Some("card0"));
    }

    #[test]
    fn test_pick_ignores_render_nodes() {
        let listing = names(&["renderD128", "renderD129"]);
        assert_eq!(pick_primary(&listing), None);
    }

    #[test]
    fn test_pick_empty_listing() {
        assert_eq!(pick_primary(&[]), None);
    }
}
