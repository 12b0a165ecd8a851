//! Display pipeline reset
//!
//! The "what to reset" policy is three declarative tables, one per
//! object type, consumed by a single resolve-and-append routine. Every
//! value is a disabling/neutral/identity value: the next consumer of the
//! display hardware configures from a known-clean baseline instead of
//! inheriting whatever the firmware or a dead compositor left behind.
//!
//! All entries from all three passes land in one shared request and are
//! committed together. The kernel validates cross-object consistency
//! (e.g. a plane referencing a CRTC) over the whole transaction, so
//! splitting the reset into per-type commits could be rejected as
//! transiently inconsistent.

use std::fmt::Debug;
use std::time::Duration;

use drm::control::atomic::AtomicModeReq;
use drm::control::{property, AtomicCommitFlags, Device as ControlDevice, ResourceHandle};
use log::{debug, info, warn};

use super::device::Device;
use super::object::ObjectProperties;

/// One property write in the reset batch.
pub struct PropertyReset {
    pub name: &'static str,
    pub value: property::Value<'static>,
}

const fn reset(name: &'static str, value: property::Value<'static>) -> PropertyReset {
    PropertyReset { name, value }
}

/// Fully opaque in the 16-bit range of the `alpha` property.
const ALPHA_OPAQUE: u64 = 0xffff;

/// 1.0 in the 32.32 fixed-point encoding of `AMD_PLANE_HDR_MULT`.
const HDR_MULT_IDENTITY: u64 = 1 << 32;

/// `DRM_MODE_ROTATE_0`: the identity rotation bit.
const ROTATE_0: u64 = 1 << 0;

/// Connector resets: unlink from the CRTC, default output color state.
pub const CONNECTOR_RESETS: &[PropertyReset] = &[
    reset("CRTC_ID", property::Value::CRTC(None)),
    reset("Colorspace", property::Value::Unknown(0)),
    reset("HDR_OUTPUT_METADATA", property::Value::Blob(0)),
];

/// CRTC resets: scan-out off, no mode, neutral color pipeline.
pub const CRTC_RESETS: &[PropertyReset] = &[
    reset("ACTIVE", property::Value::Boolean(false)),
    reset("MODE_ID", property::Value::Blob(0)),
    reset("GAMMA_LUT", property::Value::Blob(0)),
    reset("DEGAMMA_LUT", property::Value::Blob(0)),
    reset("CTM", property::Value::Blob(0)),
    reset("VRR_ENABLED", property::Value::Boolean(false)),
    reset("OUT_FENCE_PTR", property::Value::Unknown(0)),
    reset("AMD_CRTC_REGAMMA_TF", property::Value::Unknown(0)),
];

/// Plane resets: detach from CRTC and framebuffer, zero the source and
/// destination rectangles, identity rotation/blending, and default AMD
/// color-management state where the driver exposes it.
pub const PLANE_RESETS: &[PropertyReset] = &[
    reset("FB_ID", property::Value::Framebuffer(None)),
    // -1 is the kernel's "no fence" sentinel for IN_FENCE_FD.
    reset("IN_FENCE_FD", property::Value::SignedRange(-1)),
    reset("CRTC_ID", property::Value::CRTC(None)),
    reset("SRC_X", property::Value::UnsignedRange(0)),
    reset("SRC_Y", property::Value::UnsignedRange(0)),
    reset("SRC_W", property::Value::UnsignedRange(0)),
    reset("SRC_H", property::Value::UnsignedRange(0)),
    reset("CRTC_X", property::Value::SignedRange(0)),
    reset("CRTC_Y", property::Value::SignedRange(0)),
    reset("CRTC_W", property::Value::UnsignedRange(0)),
    reset("CRTC_H", property::Value::UnsignedRange(0)),
    reset("rotation", property::Value::Bitmask(ROTATE_0)),
    reset("alpha", property::Value::UnsignedRange(ALPHA_OPAQUE)),
    reset("AMD_PLANE_DEGAMMA_TF", property::Value::Unknown(0)),
    reset("AMD_PLANE_DEGAMMA_LUT", property::Value::Blob(0)),
    reset("AMD_PLANE_CTM", property::Value::Blob(0)),
    reset(
        "AMD_PLANE_HDR_MULT",
        property::Value::UnsignedRange(HDR_MULT_IDENTITY),
    ),
    reset("AMD_PLANE_SHAPER_TF", property::Value::Unknown(0)),
    reset("AMD_PLANE_SHAPER_LUT", property::Value::Blob(0)),
    reset("AMD_PLANE_LUT3D", property::Value::Blob(0)),
    reset("AMD_PLANE_BLEND_TF", property::Value::Unknown(0)),
    reset("AMD_PLANE_BLEND_LUT", property::Value::Blob(0)),
];

/// Hold the process after the commit; a display server started the
/// instant we exit can still scan out the pre-reset state before the
/// kernel change is observable system-wide.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Accumulates disable writes for every display object into one atomic
/// transaction, committed exactly once.
pub struct ResetRequest {
    req: AtomicModeReq,
    entries: usize,
}

impl ResetRequest {
    pub fn new() -> Self {
        Self {
            req: AtomicModeReq::new(),
            entries: 0,
        }
    }

    /// Number of property writes queued so far
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Queue every resolvable property from `table` for one object.
    ///
    /// Names missing from the catalog contribute nothing: drivers differ
    /// in which optional properties they expose, and the reset must not
    /// fail over an absent vendor property. Returns the number of
    /// entries queued for this object.
    pub fn disable<T: ResourceHandle + Copy>(
        &mut self,
        handle: T,
        catalog: &ObjectProperties,
        table: &[PropertyReset],
    ) -> usize {
        let mut added = 0;
        for entry in table {
            if let Some(prop) = catalog.find(entry.name) {
                self.req.add_property(handle, prop, entry.value);
                added += 1;
            }
        }
        self.entries += added;
        added
    }

    /// Submit the whole batch as one all-or-nothing transaction, then
    /// hold for [`SETTLE_DELAY`].
    ///
    /// A rejected commit is reported but not escalated: the reset is
    /// best-effort, and the boot must still proceed to a display server
    /// when a driver refuses part of the batch.
    pub fn commit(self, device: &Device) {
        info!("Committing reset: {} property writes", self.entries());
        if let Err(err) = device.atomic_commit(AtomicCommitFlags::ALLOW_MODESET, self.req) {
            warn!("Atomic commit failed: {}", err);
        }
        std::thread::sleep(SETTLE_DELAY);
    }
}

impl Default for ResetRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the reset batch for every object the device reported.
///
/// Passes run in a fixed order (connectors, then CRTCs, then planes)
/// regardless of how enumeration ordered the ids.
pub fn build_reset(device: &Device) -> ResetRequest {
    let mut request = ResetRequest::new();

    for &connector in device.resources().connectors() {
        disable_object(device, &mut request, connector, CONNECTOR_RESETS, "connector");
    }
    for &crtc in device.resources().crtcs() {
        disable_object(device, &mut request, crtc, CRTC_RESETS, "crtc");
    }
    for &plane in device.planes() {
        disable_object(device, &mut request, plane, PLANE_RESETS, "plane");
    }

    request
}

fn disable_object<T: ResourceHandle + Copy + Debug>(
    device: &Device,
    request: &mut ResetRequest,
    handle: T,
    table: &[PropertyReset],
    kind: &str,
) {
    // An object can vanish between the open-time snapshot and this
    // query; skip it and keep going with the rest.
    let catalog = match ObjectProperties::resolve(device, handle) {
        Ok(catalog) => catalog,
        Err(err) => {
            debug!("Skipping {} {:?}: {}", kind, handle, err);
            return;
        }
    };

    let added = request.disable(handle, &catalog, table);
    debug!(
        "{} {:?}: queued {}/{} properties",
        kind,
        handle,
        added,
        table.len()
    );
}
