//! Startup checks for the OS settings that usually explain USB permission
//! and claim failures. Nothing here is fatal.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
pub mod macos;

fn usb_access_warnings() -> Vec<String> {
    #[cfg(target_os = "linux")]
    return linux::check_usb_access();

    #[cfg(target_os = "macos")]
    return macos::check_usb_access();

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    Vec::new()
}

/// Log every USB access warning for this platform.
pub fn log_usb_access_warnings() {
    let warnings = usb_access_warnings();
    if warnings.is_empty() {
        tracing::debug!("No USB access problems detected");
    }
    for warning in warnings {
        tracing::warn!("{warning}");
    }
}
