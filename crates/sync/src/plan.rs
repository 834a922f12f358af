//! Three-way diff between the catalog and the device tree.

use shelfsync_catalog::RemoteItem;
use shelfsync_device::DeviceItem;
use std::collections::{HashMap, HashSet};

/// What a sync run has to do, matched by item identity alone.
///
/// The plan borrows from the catalog listing and the device scan; nothing is
/// copied. Every device item ends up in exactly one of `to_remove` or
/// `to_reconcile`, and every remote item in exactly one of `to_download` or
/// `to_reconcile`.
#[derive(Debug, Default)]
pub struct Plan<'a> {
    /// Device items the catalog no longer lists, in scan order.
    pub to_remove: Vec<&'a DeviceItem>,
    /// Catalog items missing from the device, in catalog order.
    pub to_download: Vec<&'a RemoteItem>,
    /// Items on both sides, in catalog order.
    pub to_reconcile: Vec<(&'a RemoteItem, &'a DeviceItem)>,
}

impl<'a> Plan<'a> {
    pub fn new(remote: &'a [RemoteItem], device: &'a [DeviceItem]) -> Self {
        let remote_ids: HashSet<&str> = remote.iter().map(|item| item.id.as_str()).collect();
        // Two directories claiming the same identity are both kept in sync
        // rather than one of them being picked at random.
        let mut on_device: HashMap<&str, Vec<&DeviceItem>> = HashMap::new();
        for item in device {
            on_device.entry(item.id.as_str()).or_default().push(item);
        }

        let mut plan = Self {
            to_remove: device.iter().filter(|item| !remote_ids.contains(item.id.as_str())).collect(),
            ..Self::default()
        };
        for item in remote {
            match on_device.get(item.id.as_str()) {
                Some(matches) => plan.to_reconcile.extend(matches.iter().map(|found| (item, *found))),
                None => plan.to_download.push(item),
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::PathBuf;

    fn remote(ids: &[&str]) -> Vec<RemoteItem> {
        ids.iter().map(|id| RemoteItem::new(*id, format!("Author/{id}"))).collect()
    }

    fn device(ids: &[&str]) -> Vec<DeviceItem> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| DeviceItem { id: id.to_string(), dir: PathBuf::from(format!("/device/abs-library/lib/{i}")) })
            .collect()
    }

    #[test]
    fn test_download_when_device_empty() {
        let remote = vec![RemoteItem::new("a1", "author/seriesA/01")];
        let device = device(&[]);
        let plan = Plan::new(&remote, &device);
        assert_eq!(plan.to_download.len(), 1);
        assert_eq!(plan.to_download[0].id, "a1");
        assert!(plan.to_remove.is_empty());
        assert!(plan.to_reconcile.is_empty());
    }

    #[test]
    fn test_remove_when_catalog_empty() {
        let remote = remote(&[]);
        let device = device(&["z9"]);
        let plan = Plan::new(&remote, &device);
        assert_eq!(plan.to_remove.len(), 1);
        assert_eq!(plan.to_remove[0].id, "z9");
        assert!(plan.to_download.is_empty());
        assert!(plan.to_reconcile.is_empty());
    }

    #[test]
    fn test_identity_is_exact() {
        let remote = remote(&["li_1"]);
        let device = device(&["LI_1", " li_1"]);
        let plan = Plan::new(&remote, &device);
        assert_eq!(plan.to_download.len(), 1);
        assert_eq!(plan.to_remove.len(), 2);
    }

    #[test]
    fn test_duplicate_device_identities_are_all_reconciled() {
        let remote = remote(&["a"]);
        let device = device(&["a", "a"]);
        let plan = Plan::new(&remote, &device);
        assert_eq!(plan.to_reconcile.len(), 2);
        assert_ne!(plan.to_reconcile[0].1.dir, plan.to_reconcile[1].1.dir);
        assert!(plan.to_remove.is_empty());
    }

    #[test]
    fn test_catalog_order_is_kept() {
        let remote = remote(&["c", "a", "b", "d"]);
        let device = device(&["b", "c"]);
        let plan = Plan::new(&remote, &device);
        let downloads: Vec<_> = plan.to_download.iter().map(|item| item.id.as_str()).collect();
        let pairs: Vec<_> = plan.to_reconcile.iter().map(|(item, _)| item.id.as_str()).collect();
        assert_eq!(downloads, ["a", "d"]);
        assert_eq!(pairs, ["c", "b"]);
    }

    #[rstest]
    #[case(&[], &[])]
    #[case(&["a", "b", "c"], &[])]
    #[case(&[], &["x", "y"])]
    #[case(&["a", "b", "c"], &["a", "b", "c"])]
    #[case(&["a", "b", "c"], &["b", "x", "c", "y"])]
    #[case(&["a"], &["a", "a", "b"])]
    fn test_partition(#[case] remote_ids: &[&str], #[case] device_ids: &[&str]) {
        let remote = remote(remote_ids);
        let device = device(device_ids);
        let plan = Plan::new(&remote, &device);

        // Device side: to_remove and the reconciled device items cover D exactly once.
        let mut device_side: Vec<&PathBuf> = plan.to_remove.iter().map(|item| &item.dir).collect();
        device_side.extend(plan.to_reconcile.iter().map(|(_, item)| &item.dir));
        device_side.sort();
        let mut expected: Vec<&PathBuf> = device.iter().map(|item| &item.dir).collect();
        expected.sort();
        assert_eq!(device_side, expected);

        // Remote side: to_download and the reconciled remote items cover R.
        let mut remote_side: HashSet<&str> = plan.to_download.iter().map(|item| item.id.as_str()).collect();
        for (item, _) in &plan.to_reconcile {
            assert!(!plan.to_download.iter().any(|download| download.id == item.id));
            remote_side.insert(item.id.as_str());
        }
        assert_eq!(remote_side, remote_ids.iter().copied().collect::<HashSet<_>>());

        for removed in &plan.to_remove {
            assert!(!plan.to_reconcile.iter().any(|(_, item)| item.id == removed.id));
        }
    }
}
