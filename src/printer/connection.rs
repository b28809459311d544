use std::time::Duration;

use rusb::{Device, DeviceHandle, Direction, GlobalContext, TransferType, UsbContext};

use crate::error::PrintError;
use crate::printer::models::DeviceDescriptor;

/// Interface every supported printer exposes its print pipe on.
pub const PRINTER_INTERFACE: u8 = 0;

/// A claimed printer interface with a resolved OUT endpoint.
pub trait PrinterLink: Send {
    /// Send the whole buffer. A partial transfer is an error.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), PrintError>;

    /// Release the interface and close the device.
    fn close(&mut self);
}

pub trait Transport: Send + Sync {
    fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn PrinterLink>, PrintError>;
}

/// Scoped handle for one print operation.
///
/// The underlying link is closed exactly once: by [`OpenPrinter::close`] or,
/// on any early return, by `Drop`.
pub struct OpenPrinter {
    link: Option<Box<dyn PrinterLink>>,
    label: String,
}

impl OpenPrinter {
    pub fn open(transport: &dyn Transport, device: &DeviceDescriptor) -> Result<Self, PrintError> {
        let link = transport.open(device)?;
        tracing::debug!("Opened printer {}", device.label());
        Ok(Self {
            link: Some(link),
            label: device.label(),
        })
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), PrintError> {
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| PrintError::Transfer("printer already closed".into()))?;
        link.write_all(bytes)
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
            tracing::debug!("Closed printer {}", self.label);
        }
    }
}

impl Drop for OpenPrinter {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointInfo {
    pub address: u8,
    pub direction_out: bool,
    pub bulk: bool,
}

/// Pick the endpoint to print on: the first bulk OUT endpoint, otherwise
/// the first OUT endpoint of any type.
pub fn select_out_endpoint(endpoints: &[EndpointInfo]) -> Option<u8> {
    endpoints
        .iter()
        .find(|e| e.direction_out && e.bulk)
        .or_else(|| endpoints.iter().find(|e| e.direction_out))
        .map(|e| e.address)
}

/// Device-handle operations a print session needs. Implemented for
/// libusb handles; the in-memory test bus has its own.
pub trait UsbHandle: Send {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, String>;
    fn detach_kernel_driver(&self, interface: u8) -> Result<(), String>;
    fn attach_kernel_driver(&self, interface: u8) -> Result<(), String>;
    fn claim_interface(&self, interface: u8) -> Result<(), String>;
    fn release_interface(&self, interface: u8) -> Result<(), String>;
    fn endpoints(&self, interface: u8) -> Vec<EndpointInfo>;
    fn write_bulk(&self, endpoint: u8, bytes: &[u8], timeout: Duration) -> Result<usize, String>;
}

impl UsbHandle for DeviceHandle<GlobalContext> {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, String> {
        DeviceHandle::kernel_driver_active(self, interface).map_err(|e| e.to_string())
    }

    fn detach_kernel_driver(&self, interface: u8) -> Result<(), String> {
        DeviceHandle::detach_kernel_driver(self, interface).map_err(|e| e.to_string())
    }

    fn attach_kernel_driver(&self, interface: u8) -> Result<(), String> {
        DeviceHandle::attach_kernel_driver(self, interface).map_err(|e| e.to_string())
    }

    fn claim_interface(&self, interface: u8) -> Result<(), String> {
        DeviceHandle::claim_interface(self, interface).map_err(|e| e.to_string())
    }

    fn release_interface(&self, interface: u8) -> Result<(), String> {
        DeviceHandle::release_interface(self, interface).map_err(|e| e.to_string())
    }

    fn endpoints(&self, interface: u8) -> Vec<EndpointInfo> {
        interface_endpoints(&self.device(), interface)
    }

    fn write_bulk(&self, endpoint: u8, bytes: &[u8], timeout: Duration) -> Result<usize, String> {
        DeviceHandle::write_bulk(self, endpoint, bytes, timeout).map_err(|e| e.to_string())
    }
}

/// libusb transport: open, detach kernel driver, claim interface 0, find
/// the OUT endpoint, bulk write.
#[derive(Debug, Clone)]
pub struct RusbTransport {
    write_timeout: Duration,
}

impl RusbTransport {
    pub fn new(write_timeout: Duration) -> Self {
        Self { write_timeout }
    }
}

impl Transport for RusbTransport {
    fn open(&self, target: &DeviceDescriptor) -> Result<Box<dyn PrinterLink>, PrintError> {
        let label = target.label();
        let open_err = |reason: String| PrintError::Open {
            device: label.clone(),
            reason,
        };

        let devices = rusb::devices().map_err(|e| open_err(e.to_string()))?;
        let device = devices
            .iter()
            .find(|d| {
                d.bus_number() == target.bus_number
                    && d.address() == target.device_address
                    && d.device_descriptor().is_ok_and(|desc| {
                        desc.vendor_id() == target.vendor_id
                            && desc.product_id() == target.product_id
                    })
            })
            .ok_or_else(|| open_err("device no longer attached".into()))?;

        let handle = device.open().map_err(|e| open_err(e.to_string()))?;
        let link = UsbLink::start(handle, &label, self.write_timeout)?;
        Ok(Box::new(link))
    }
}

/// Endpoints of the first alternate setting of `number` in the active
/// configuration.
fn interface_endpoints<T: UsbContext>(device: &Device<T>, number: u8) -> Vec<EndpointInfo> {
    let config = match device.active_config_descriptor() {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!("No active configuration: {e}");
            return Vec::new();
        }
    };

    let mut endpoints = Vec::new();
    for interface in config.interfaces() {
        if interface.number() != number {
            continue;
        }
        if let Some(alt) = interface.descriptors().next() {
            for ep in alt.endpoint_descriptors() {
                endpoints.push(EndpointInfo {
                    address: ep.address(),
                    direction_out: ep.direction() == Direction::Out,
                    bulk: ep.transfer_type() == TransferType::Bulk,
                });
            }
        }
    }
    endpoints
}

#[cfg(target_os = "macos")]
fn claim_hint(reason: String) -> String {
    crate::platform::macos::cups_conflict_hint(&reason)
}

#[cfg(not(target_os = "macos"))]
fn claim_hint(reason: String) -> String {
    reason
}

/// Owns an open handle for the length of one print session.
///
/// Built before the claim, so every exit path releases what was claimed
/// and reattaches a kernel driver that was detached. The handle itself is
/// closed when this drops.
struct ClaimedInterface<H: UsbHandle> {
    handle: H,
    interface: u8,
    claimed: bool,
    reattach_driver: bool,
}

impl<H: UsbHandle> Drop for ClaimedInterface<H> {
    fn drop(&mut self) {
        if self.claimed {
            if let Err(e) = self.handle.release_interface(self.interface) {
                tracing::warn!("Failed to release interface {}: {e}", self.interface);
            }
        }
        if self.reattach_driver {
            if let Err(e) = self.handle.attach_kernel_driver(self.interface) {
                tracing::debug!("Could not reattach kernel driver to interface {}: {e}", self.interface);
            }
        }
    }
}

/// A claimed printer interface over any [`UsbHandle`].
pub struct UsbLink<H: UsbHandle> {
    session: Option<ClaimedInterface<H>>,
    endpoint: u8,
    timeout: Duration,
}

impl<H: UsbHandle> UsbLink<H> {
    /// Detach the kernel driver if one is bound, claim the printer
    /// interface and pick its OUT endpoint. On failure the handle is
    /// released and closed before returning.
    pub fn start(handle: H, label: &str, timeout: Duration) -> Result<Self, PrintError> {
        // Some platforms report "not active" or refuse detach spuriously;
        // the claim below is the real check.
        let detached = match handle.kernel_driver_active(PRINTER_INTERFACE) {
            Ok(true) => match handle.detach_kernel_driver(PRINTER_INTERFACE) {
                Ok(()) => {
                    tracing::debug!("Detached kernel driver from {label}");
                    true
                }
                Err(e) => {
                    tracing::debug!("Kernel driver detach on {label} failed (ignored): {e}");
                    false
                }
            },
            Ok(false) => false,
            Err(e) => {
                tracing::debug!("Kernel driver state on {label} unknown (ignored): {e}");
                false
            }
        };

        let mut session = ClaimedInterface {
            handle,
            interface: PRINTER_INTERFACE,
            claimed: false,
            reattach_driver: detached,
        };

        session
            .handle
            .claim_interface(PRINTER_INTERFACE)
            .map_err(|reason| PrintError::Claim {
                device: label.to_string(),
                interface: PRINTER_INTERFACE,
                reason: claim_hint(reason),
            })?;
        session.claimed = true;

        let endpoint = select_out_endpoint(&session.handle.endpoints(PRINTER_INTERFACE)).ok_or_else(|| {
            PrintError::OutEndpointNotFound {
                device: label.to_string(),
                interface: PRINTER_INTERFACE,
            }
        })?;

        tracing::debug!("Using OUT endpoint {endpoint:#04x} on {label}");
        Ok(Self {
            session: Some(session),
            endpoint,
            timeout,
        })
    }
}

impl<H: UsbHandle> PrinterLink for UsbLink<H> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), PrintError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| PrintError::Transfer("interface released".into()))?;

        let written = session
            .handle
            .write_bulk(self.endpoint, bytes, self.timeout)
            .map_err(PrintError::Transfer)?;

        if written != bytes.len() {
            return Err(PrintError::Transfer(format!(
                "short write: {written} of {} bytes",
                bytes.len()
            )));
        }
        tracing::debug!("Wrote {written} bytes to endpoint {:#04x}", self.endpoint);
        Ok(())
    }

    fn close(&mut self) {
        self.session.take();
    }
}
