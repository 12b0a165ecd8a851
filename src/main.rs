//! kmsreset - one-shot display pipeline reset for Linux
//!
//! Disables every connector, CRTC, and plane of a DRM device through a
//! single atomic commit, so whatever display server starts next
//! configures the hardware from a known-clean baseline instead of
//! inheriting stale boot or crashed-compositor state.
//!
//! ```text
//! Device open ─→ property catalogs (per object) ─→ one atomic request
//!                                                        ↓
//!                                            single ALLOW_MODESET commit
//! ```

mod drm;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;

use crate::drm::{build_reset, find_primary_node, Device};

const USAGE: &str = "\
Usage: kmsreset [options...]

  -d <path>       DRM device to reset (default: first /dev/dri/cardN).
  -h, --help      Show this help and quit.
  -V, --version   Show version and quit.
";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut device_path: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print!("{}", USAGE);
                return Ok(());
            }
            "-V" | "--version" => {
                println!("kmsreset {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "-d" => {
                let path = args.next().context("-d requires a device path")?;
                device_path = Some(PathBuf::from(path));
            }
            other => {
                eprint!("{}", USAGE);
                bail!("unrecognized argument: {}", other);
            }
        }
    }

    let path = match device_path.or_else(find_primary_node) {
        Some(path) => path,
        None => {
            // A machine without a KMS-capable GPU has nothing to reset;
            // that is not a failure.
            info!("No DRM primary node found, nothing to do");
            return Ok(());
        }
    };

    let device = Device::open(&path)?;
    build_reset(&device).commit(&device);

    Ok(())
}
