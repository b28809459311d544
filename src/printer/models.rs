use std::fmt;

use serde::Serialize;

use crate::error::PrintError;

/// USB interface class code for printers.
pub const PRINTER_INTERFACE_CLASS: u8 = 0x07;
/// USB interface class code for vendor-specific devices. Most receipt
/// printers that skip the printer class report this instead.
pub const VENDOR_SPECIFIC_INTERFACE_CLASS: u8 = 0xff;

/// Snapshot of one attached USB device, taken during a single enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial: Option<String>,
    pub bus_number: u8,
    pub device_address: u8,
    pub interface_class: Option<u8>,
}

impl DeviceDescriptor {
    pub fn matches(&self, selection: DefaultPrinterSelection) -> bool {
        self.vendor_id == selection.vendor_id() && self.product_id == selection.product_id()
    }

    /// Short label used in logs and error messages.
    pub fn label(&self) -> String {
        format!(
            "{:04x}:{:04x} (bus {} addr {})",
            self.vendor_id, self.product_id, self.bus_number, self.device_address
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedDevice {
    #[serde(flatten)]
    pub descriptor: DeviceDescriptor,
    pub is_thermal_printer: bool,
}

/// Operator-chosen printer identity. Both ids are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultPrinterSelection {
    vendor_id: u16,
    product_id: u16,
}

impl DefaultPrinterSelection {
    pub fn new(vendor_id: u16, product_id: u16) -> Result<Self, PrintError> {
        if vendor_id == 0 || product_id == 0 {
            return Err(PrintError::InvalidDefault(
                "vendorId and productId must be non-zero".into(),
            ));
        }
        Ok(Self {
            vendor_id,
            product_id,
        })
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    /// Validate a JSON body of the form `{vendorId, productId}`.
    ///
    /// Each id may be a number or a numeric string (decimal or `0x` hex).
    pub fn from_json(body: &serde_json::Value) -> Result<Self, PrintError> {
        let vendor_id = id_field(body, "vendorId")?;
        let product_id = id_field(body, "productId")?;
        Self::new(vendor_id, product_id)
    }

    /// Parse the `vvvv:pppp` hex form used in configuration.
    pub fn parse_hex_pair(raw: &str) -> Result<Self, PrintError> {
        let (vid, pid) = raw
            .trim()
            .split_once(':')
            .ok_or_else(|| PrintError::InvalidDefault(format!("expected vvvv:pppp, got {raw:?}")))?;
        let parse = |s: &str| {
            u16::from_str_radix(s.trim().trim_start_matches("0x"), 16)
                .map_err(|e| PrintError::InvalidDefault(format!("{s:?}: {e}")))
        };
        Self::new(parse(vid)?, parse(pid)?)
    }
}

impl fmt::Display for DefaultPrinterSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

fn id_field(body: &serde_json::Value, key: &str) -> Result<u16, PrintError> {
    let value = body
        .get(key)
        .ok_or_else(|| PrintError::InvalidDefault(format!("{key} is required")))?;

    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse::<u64>().ok(),
            }
        }
        _ => None,
    };

    parsed
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(|| PrintError::InvalidDefault(format!("{key} must be a 16-bit id, got {value}")))
}
