use std::path::Path;
use std::process::Command;

pub const UDEV_RULES_PATH: &str = "/etc/udev/rules.d/99-thermal-printer.rules";

/// Groups that commonly grant raw access to USB printers.
const USB_GROUPS: &[&str] = &["plugdev", "lp"];

pub fn check_usb_access() -> Vec<String> {
    let mut warnings = Vec::new();

    if !Path::new(UDEV_RULES_PATH).exists() {
        warnings.push(format!(
            "udev rules not found at {UDEV_RULES_PATH}; enumeration may report \
             USB_ACCESS_DENIED without root. A sample ships in assets/udev/."
        ));
    }

    match Command::new("id").arg("-Gn").output() {
        Ok(output) if output.status.success() => {
            let groups = String::from_utf8_lossy(&output.stdout);
            if let Some(warning) = group_warning(&groups) {
                warnings.push(warning);
            }
        }
        Ok(output) => tracing::debug!("id -Gn exited with {}", output.status),
        Err(e) => tracing::debug!("id not available: {e}"),
    }

    warnings
}

fn group_warning(groups: &str) -> Option<String> {
    let member = groups
        .split_whitespace()
        .any(|g| USB_GROUPS.contains(&g));
    (!member).then(|| {
        format!(
            "Current user is not in any of {USB_GROUPS:?}; claiming the printer \
             interface may fail with a permission error."
        )
    })
}
