//! V4L2 control ioctls used to turn off auto-gain before a brightness reading

use std::fs::OpenOptions;
use std::os::unix::io::AsRawFd;

use tracing::{debug, instrument};

use crate::error::ControlError;

const V4L2_CID_BASE: u32 = 0x0098_0900;
pub const V4L2_CID_AUTOGAIN: u32 = V4L2_CID_BASE + 18;

/// `struct v4l2_control` from videodev2.h
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct V4l2Control {
    pub id: u32,
    pub value: i32,
}

nix::ioctl_readwrite!(vidioc_g_ctrl, b'V', 27, V4l2Control);
nix::ioctl_readwrite!(vidioc_s_ctrl, b'V', 28, V4l2Control);

/// Read a control, set it to `value` and write it back.
///
/// The device is opened for the duration of the call and closed on every path.
#[instrument]
pub fn set_control(device: &str, id: u32, value: i32) -> Result<V4l2Control, ControlError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(device)
        .map_err(|source| ControlError::DeviceUnavailable {
            path: device.to_string(),
            source,
        })?;
    let fd = file.as_raw_fd();

    let mut control = V4l2Control { id, value: 0 };

    // SAFETY: `fd` is open for the lifetime of `file` and `control` matches the kernel layout.
    unsafe { vidioc_g_ctrl(fd, &mut control) }.map_err(|errno| ControlError::Ioctl {
        request: "VIDIOC_G_CTRL",
        id,
        errno,
    })?;
    debug!(previous = control.value, "read control {:#x}", id);

    control.value = value;
    // SAFETY: as above.
    unsafe { vidioc_s_ctrl(fd, &mut control) }.map_err(|errno| ControlError::Ioctl {
        request: "VIDIOC_S_CTRL",
        id,
        errno,
    })?;

    Ok(control)
}

pub fn disable_auto_gain(device: &str) -> Result<(), ControlError> {
    set_control(device, V4L2_CID_AUTOGAIN, 0).map(|_| ())
}
