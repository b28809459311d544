use std::collections::HashSet;

use rusb::{Device, DeviceHandle, UsbContext};

use crate::error::PrintError;
use crate::printer::models::DeviceDescriptor;

/// Source of fresh device snapshots. Never cached: USB topology can change
/// between calls.
pub trait DeviceSource: Send + Sync {
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, PrintError>;
}

/// Enumerates devices through libusb.
///
/// Every device is opened once to read its string descriptors and closed
/// again before the next one is touched. Devices that cannot be opened are
/// skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct RusbDevices;

impl DeviceSource for RusbDevices {
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, PrintError> {
        let devices = rusb::devices().map_err(|e| PrintError::AccessDenied(e.to_string()))?;
        let found = snapshot(devices.iter().filter_map(|device| describe(&device)));
        tracing::debug!("USB enumeration found {} accessible device(s)", found.len());
        Ok(found)
    }
}

/// One entry per bus/address; a repeated location keeps the first device
/// reported there.
fn snapshot(described: impl IntoIterator<Item = DeviceDescriptor>) -> Vec<DeviceDescriptor> {
    let mut seen = HashSet::new();
    described
        .into_iter()
        .filter(|d| {
            let fresh = seen.insert((d.bus_number, d.device_address));
            if !fresh {
                tracing::debug!("Ignoring repeated device at bus {} addr {}", d.bus_number, d.device_address);
            }
            fresh
        })
        .collect()
}

fn describe<T: UsbContext>(device: &Device<T>) -> Option<DeviceDescriptor> {
    let bus_number = device.bus_number();
    let device_address = device.address();

    let desc = match device.device_descriptor() {
        Ok(d) => d,
        Err(e) => {
            tracing::debug!("Skip device bus {bus_number} addr {device_address}: descriptor: {e}");
            return None;
        }
    };

    let handle = match device.open() {
        Ok(h) => h,
        Err(e) => {
            tracing::debug!(
                "Skip device {:04x}:{:04x} bus {bus_number} addr {device_address}: open: {e}",
                desc.vendor_id(),
                desc.product_id()
            );
            return None;
        }
    };

    let manufacturer = read_string(&handle, desc.manufacturer_string_index());
    let product = read_string(&handle, desc.product_string_index());
    let serial = read_string(&handle, desc.serial_number_string_index());
    drop(handle);

    Some(DeviceDescriptor {
        vendor_id: desc.vendor_id(),
        product_id: desc.product_id(),
        manufacturer,
        product,
        serial,
        bus_number,
        device_address,
        interface_class: first_interface_class(device),
    })
}

/// `None` index means the device has no such string.
fn read_string<T: UsbContext>(handle: &DeviceHandle<T>, index: Option<u8>) -> Option<String> {
    let index = index?;
    match handle.read_string_descriptor_ascii(index) {
        Ok(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Err(e) => {
            tracing::trace!("String descriptor {index} unreadable: {e}");
            None
        }
    }
}

/// Class of the first interface of the active configuration, falling back
/// to configuration 0 when the device is unconfigured.
fn first_interface_class<T: UsbContext>(device: &Device<T>) -> Option<u8> {
    let config = device
        .active_config_descriptor()
        .or_else(|_| device.config_descriptor(0))
        .ok()?;
    let interface = config.interfaces().next()?;
    let alt = interface.descriptors().next()?;
    Some(alt.class_code())
}
