use crate::printer::models::{
    ClassifiedDevice, DeviceDescriptor, PRINTER_INTERFACE_CLASS, VENDOR_SPECIFIC_INTERFACE_CLASS,
};

/// Built-in brand and keyword tokens matched against the lower-cased
/// manufacturer and product strings. Extend with `PRINTER_KEYWORDS`.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "epson",
    "star",
    "bixolon",
    "citizen",
    "xprinter",
    "zjiang",
    "rongta",
    "hprt",
    "sewoo",
    "posiflex",
    "snbc",
    "gprinter",
    "sunmi",
    "thermal",
    "printer",
    "receipt",
    "pos",
];

/// Heuristic thermal-printer detector. Pure: no I/O, no interior state.
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Classifier {
    /// Built-in vocabulary plus `extra` tokens (lower-cased, blanks and
    /// duplicates dropped).
    pub fn with_extra_keywords<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classifier = Self::default();
        for keyword in extra {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !classifier.keywords.contains(&keyword) {
                classifier.keywords.push(keyword);
            }
        }
        classifier
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_thermal_printer(&self, device: &DeviceDescriptor) -> bool {
        if matches!(
            device.interface_class,
            Some(PRINTER_INTERFACE_CLASS | VENDOR_SPECIFIC_INTERFACE_CLASS)
        ) {
            return true;
        }

        [device.manufacturer.as_deref(), device.product.as_deref()]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .any(|text| self.keywords.iter().any(|k| text.contains(k.as_str())))
    }

    pub fn classify(&self, device: DeviceDescriptor) -> ClassifiedDevice {
        let is_thermal_printer = self.is_thermal_printer(&device);
        ClassifiedDevice {
            descriptor: device,
            is_thermal_printer,
        }
    }
}
