use crate::error::PrintError;
use crate::printer::classify::Classifier;
use crate::printer::discovery::DeviceSource;
use crate::printer::models::{DefaultPrinterSelection, DeviceDescriptor};

/// Pick the device a print job goes to.
///
/// Order: disabled agent short-circuits without touching USB; an attached
/// default selection wins unconditionally; otherwise the first device the
/// classifier accepts, in enumeration order.
pub fn resolve(
    source: &dyn DeviceSource,
    classifier: &Classifier,
    enabled: bool,
    default: Option<DefaultPrinterSelection>,
) -> Result<DeviceDescriptor, PrintError> {
    if !enabled {
        return Err(PrintError::AgentDisabled);
    }

    let devices = source.list_devices()?;

    if let Some(selection) = default {
        if let Some(device) = devices.iter().find(|d| d.matches(selection)) {
            tracing::debug!("Using default printer {}", device.label());
            return Ok(device.clone());
        }
        tracing::info!("Default printer {selection} not attached, falling back to discovery");
    }

    devices
        .into_iter()
        .find(|d| classifier.is_thermal_printer(d))
        .inspect(|d| tracing::debug!("Discovered printer {}", d.label()))
        .ok_or(PrintError::PrinterNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::testing::FakeUsb;

    #[test]
    fn disabled_agent_never_enumerates() {
        let usb = FakeUsb::with_devices(vec![FakeUsb::printer(1, 2)]);
        let err = resolve(&usb, &Classifier::default(), false, None).unwrap_err();
        assert_eq!(err, PrintError::AgentDisabled);
        assert_eq!(usb.lists(), 0);
    }

    #[test]
    fn default_wins_even_when_not_classified() {
        let keyboard = FakeUsb::keyboard(1, 3, 0x046d, 0xc31c);
        let usb = FakeUsb::with_devices(vec![FakeUsb::printer(1, 2), keyboard.clone()]);
        let selection = DefaultPrinterSelection::new(0x046d, 0xc31c).unwrap();

        let device = resolve(&usb, &Classifier::default(), true, Some(selection)).unwrap();
        assert_eq!(device, keyboard);
        assert_eq!(usb.lists(), 1);
    }

    #[test]
    fn missing_default_falls_back_to_first_printer() {
        let first = FakeUsb::printer(1, 5);
        let usb = FakeUsb::with_devices(vec![
            FakeUsb::keyboard(1, 3, 0x046d, 0xc31c),
            first.clone(),
            FakeUsb::printer(2, 1),
        ]);
        let selection = DefaultPrinterSelection::new(0x0519, 0x0001).unwrap();

        let device = resolve(&usb, &Classifier::default(), true, Some(selection)).unwrap();
        assert_eq!(device, first);
    }

    #[test]
    fn no_candidate_is_not_found() {
        let usb = FakeUsb::with_devices(vec![FakeUsb::keyboard(1, 3, 0x046d, 0xc31c)]);
        assert_eq!(
            resolve(&usb, &Classifier::default(), true, None),
            Err(PrintError::PrinterNotFound)
        );

        let empty = FakeUsb::with_devices(Vec::new());
        assert_eq!(
            resolve(&empty, &Classifier::default(), true, None),
            Err(PrintError::PrinterNotFound)
        );
    }

    #[test]
    fn enumeration_failure_propagates() {
        let usb = FakeUsb::with_devices(vec![FakeUsb::printer(1, 2)]);
        usb.fail_enumeration();
        assert!(matches!(
            resolve(&usb, &Classifier::default(), true, None),
            Err(PrintError::AccessDenied(_))
        ));
    }
}
