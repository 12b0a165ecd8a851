//! DRM device session
//!
//! Opens a DRM node, negotiates the atomic client capability and
//! snapshots the available connectors, CRTCs, and planes once.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};

use drm::control::{plane, Device as ControlDevice, ResourceHandles};
use drm::{ClientCapability, Device as BasicDevice};
use log::{debug, info};
use thiserror::Error;

/// Failures while bringing up the device session.
///
/// All of these happen before the first property is resolved; nothing
/// useful can proceed afterwards, so every variant aborts the run.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("cannot open DRM device {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("{path:?} is not a KMS device: {source}")]
    NotKms { path: PathBuf, source: io::Error },
    #[error("atomic modesetting is not supported: {source}")]
    AtomicUnsupported { source: io::Error },
    #[error("failed to query plane resources: {source}")]
    Planes { source: io::Error },
}

/// DRM device wrapper
///
/// Holds the open node plus the object snapshot taken at open time.
/// Hot-plug after this point is not observed; a single-shot reset runs
/// against the snapshot. The fd closes when the wrapper drops.
pub struct Device {
    file: File,
    resources: ResourceHandles,
    planes: Vec<plane::Handle>,
}

// Trait implementations required by drm crate
impl AsFd for Device {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl BasicDevice for Device {}
impl ControlDevice for Device {}

impl Device {
    /// Open a DRM device and snapshot its display objects.
    ///
    /// # Arguments
    /// * `path` - Device path (e.g., "/dev/dri/card0")
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenError> {
        let path = path.as_ref();
        info!("Opening DRM device: {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| OpenError::Open {
                path: path.to_owned(),
                source,
            })?;

        // Temporary device wrapper so the drm traits are usable before
        // `Device` itself exists.
        struct TempDevice<'a>(&'a File);
        impl AsFd for TempDevice<'_> {
            fn as_fd(&self) -> BorrowedFd<'_> {
                self.0.as_fd()
            }
        }
        impl BasicDevice for TempDevice<'_> {}
        impl ControlDevice for TempDevice<'_> {}

        let temp = TempDevice(&file);

        if let Ok(driver) = temp.get_driver() {
            debug!("Driver: {}", driver.name().to_string_lossy());
        }

        // GETRESOURCES doubles as the KMS probe: render nodes and plain
        // character devices reject it.
        let resources = temp
            .resource_handles()
            .map_err(|source| OpenError::NotKms {
                path: path.to_owned(),
                source,
            })?;

        // The atomic capability must be negotiated, never assumed. This
        // also exposes the full plane list (universal planes).
        temp.set_client_capability(ClientCapability::Atomic, true)
            .map_err(|source| OpenError::AtomicUnsupported { source })?;

        let planes = temp
            .plane_handles()
            .map_err(|source| OpenError::Planes { source })?;

        info!(
            "DRM resources: connectors={}, crtcs={}, planes={}",
            resources.connectors().len(),
            resources.crtcs().len(),
            planes.len()
        );

        Ok(Self {
            file,
            resources,
            planes,
        })
    }

    /// Connector and CRTC handles captured at open time
    pub fn resources(&self) -> &ResourceHandles {
        &self.resources
    }

    /// Plane handles captured at open time
    pub fn planes(&self) -> &[plane::Handle] {
        &self.planes
    }
}
