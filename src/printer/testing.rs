//! In-memory USB bus for tests.
//!
//! `FakeUsb` is both a [`DeviceSource`] and a [`Transport`]. Opening a
//! device runs the real claim sequence in [`UsbLink::start`] against a fake
//! handle, and every enumeration, open, claim, write and close is recorded
//! so tests can assert on device access.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::PrintError;
use crate::printer::connection::{EndpointInfo, PrinterLink, Transport, UsbHandle, UsbLink};
use crate::printer::discovery::DeviceSource;
use crate::printer::models::DeviceDescriptor;

#[derive(Debug, Default)]
struct Recorder {
    lists: usize,
    opens: usize,
    closes: usize,
    open_now: usize,
    max_open: usize,
    claims: usize,
    releases: usize,
    reattaches: usize,
    written: Vec<Vec<u8>>,
    kernel_driver: bool,
    fail_enumeration: bool,
    fail_claim: bool,
    fail_writes: bool,
    short_writes: bool,
    no_out_endpoint: bool,
    write_delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct FakeUsb {
    devices: Arc<Mutex<Vec<DeviceDescriptor>>>,
    recorder: Arc<Mutex<Recorder>>,
}

impl FakeUsb {
    pub fn with_devices(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices: Arc::new(Mutex::new(devices)),
            recorder: Arc::default(),
        }
    }

    /// Printer-class device (interface class 7) from Epson.
    pub fn printer(bus: u8, address: u8) -> DeviceDescriptor {
        DeviceDescriptor {
            vendor_id: 0x04b8,
            product_id: 0x0e15,
            manufacturer: Some("EPSON".into()),
            product: Some("TM-T88VI".into()),
            serial: Some(format!("SN{bus}{address}")),
            bus_number: bus,
            device_address: address,
            interface_class: Some(7),
        }
    }

    /// HID device the classifier rejects.
    pub fn keyboard(bus: u8, address: u8, vendor_id: u16, product_id: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            vendor_id,
            product_id,
            manufacturer: Some("Logitech".into()),
            product: Some("USB Keyboard".into()),
            serial: None,
            bus_number: bus,
            device_address: address,
            interface_class: Some(3),
        }
    }

    pub fn list_now(&self) -> Vec<DeviceDescriptor> {
        self.devices.lock().unwrap().clone()
    }

    pub fn set_devices(&self, devices: Vec<DeviceDescriptor>) {
        *self.devices.lock().unwrap() = devices;
    }

    pub fn fail_enumeration(&self) {
        self.recorder.lock().unwrap().fail_enumeration = true;
    }

    pub fn fail_writes(&self) {
        self.recorder.lock().unwrap().fail_writes = true;
    }

    pub fn without_out_endpoint(&self) {
        self.recorder.lock().unwrap().no_out_endpoint = true;
    }

    /// Every device starts with a kernel printer driver bound.
    pub fn with_kernel_driver(&self) {
        self.recorder.lock().unwrap().kernel_driver = true;
    }

    pub fn fail_claim(&self) {
        self.recorder.lock().unwrap().fail_claim = true;
    }

    /// Bulk writes report one byte fewer than requested.
    pub fn short_writes(&self) {
        self.recorder.lock().unwrap().short_writes = true;
    }

    pub fn slow_writes(&self, delay: Duration) {
        self.recorder.lock().unwrap().write_delay = Some(delay);
    }

    pub fn lists(&self) -> usize {
        self.recorder.lock().unwrap().lists
    }

    pub fn opens(&self) -> usize {
        self.recorder.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.recorder.lock().unwrap().closes
    }

    pub fn claims(&self) -> usize {
        self.recorder.lock().unwrap().claims
    }

    pub fn releases(&self) -> usize {
        self.recorder.lock().unwrap().releases
    }

    pub fn reattaches(&self) -> usize {
        self.recorder.lock().unwrap().reattaches
    }

    /// Most handles ever open at the same time.
    pub fn max_open(&self) -> usize {
        self.recorder.lock().unwrap().max_open
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.recorder.lock().unwrap().written.clone()
    }
}

impl DeviceSource for FakeUsb {
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, PrintError> {
        let mut rec = self.recorder.lock().unwrap();
        rec.lists += 1;
        if rec.fail_enumeration {
            return Err(PrintError::AccessDenied("LIBUSB_ERROR_ACCESS".into()));
        }
        Ok(self.list_now())
    }
}

impl Transport for FakeUsb {
    fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn PrinterLink>, PrintError> {
        {
            let mut rec = self.recorder.lock().unwrap();
            rec.opens += 1;
            rec.open_now += 1;
            rec.max_open = rec.max_open.max(rec.open_now);
        }
        let handle = FakeHandle {
            recorder: Arc::clone(&self.recorder),
        };
        let link = UsbLink::start(handle, &device.label(), Duration::from_secs(1))?;
        Ok(Box::new(link))
    }
}

/// Closing happens on drop, as with a libusb handle.
struct FakeHandle {
    recorder: Arc<Mutex<Recorder>>,
}

impl UsbHandle for FakeHandle {
    fn kernel_driver_active(&self, _interface: u8) -> Result<bool, String> {
        Ok(self.recorder.lock().unwrap().kernel_driver)
    }

    fn detach_kernel_driver(&self, _interface: u8) -> Result<(), String> {
        self.recorder.lock().unwrap().kernel_driver = false;
        Ok(())
    }

    fn attach_kernel_driver(&self, _interface: u8) -> Result<(), String> {
        let mut rec = self.recorder.lock().unwrap();
        rec.kernel_driver = true;
        rec.reattaches += 1;
        Ok(())
    }

    fn claim_interface(&self, _interface: u8) -> Result<(), String> {
        let mut rec = self.recorder.lock().unwrap();
        if rec.fail_claim {
            return Err("LIBUSB_ERROR_BUSY".into());
        }
        rec.claims += 1;
        Ok(())
    }

    fn release_interface(&self, _interface: u8) -> Result<(), String> {
        self.recorder.lock().unwrap().releases += 1;
        Ok(())
    }

    fn endpoints(&self, _interface: u8) -> Vec<EndpointInfo> {
        let inbound = EndpointInfo {
            address: 0x82,
            direction_out: false,
            bulk: true,
        };
        if self.recorder.lock().unwrap().no_out_endpoint {
            return vec![inbound];
        }
        vec![
            inbound,
            EndpointInfo {
                address: 0x01,
                direction_out: true,
                bulk: true,
            },
        ]
    }

    fn write_bulk(&self, _endpoint: u8, bytes: &[u8], _timeout: Duration) -> Result<usize, String> {
        let delay = self.recorder.lock().unwrap().write_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let mut rec = self.recorder.lock().unwrap();
        if rec.fail_writes {
            return Err("LIBUSB_ERROR_PIPE".into());
        }
        if rec.short_writes {
            return Ok(bytes.len().saturating_sub(1));
        }
        rec.written.push(bytes.to_vec());
        Ok(bytes.len())
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        let mut rec = self.recorder.lock().unwrap();
        rec.closes += 1;
        rec.open_now -= 1;
    }
}
