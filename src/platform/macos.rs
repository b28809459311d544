use std::process::Command;

/// A CUPS queue bound to a USB printer. While it exists, CUPS may hold the
/// printer interface and our claim fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CupsQueue {
    pub name: String,
    pub uri: String,
}

pub fn check_usb_access() -> Vec<String> {
    usb_queues()
        .into_iter()
        .map(|q| {
            format!(
                "CUPS queue \"{}\" ({}) may hold the printer interface. \
                 Remove it in System Settings > Printers & Scanners or run: lpadmin -x {}",
                q.name, q.uri, q.name
            )
        })
        .collect()
}

/// CUPS queues whose device URI is `usb://`.
pub fn usb_queues() -> Vec<CupsQueue> {
    let output = match Command::new("lpstat").arg("-v").output() {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!("lpstat not available: {e}");
            return Vec::new();
        }
    };

    if !output.status.success() {
        // Exit code 1 with "No destinations added" just means no queues.
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.contains("No destinations") {
            tracing::debug!("lpstat failed: {stderr}");
        }
        return Vec::new();
    }

    parse_lpstat(&String::from_utf8_lossy(&output.stdout))
        .into_iter()
        .filter(|q| q.uri.starts_with("usb://"))
        .collect()
}

/// Message for a failed interface claim, naming any CUPS queue that may be
/// holding the device.
pub fn cups_conflict_hint(original_error: &str) -> String {
    let queues = usb_queues();
    if queues.is_empty() {
        return format!(
            "{original_error}. Check System Settings > Privacy & Security for USB access."
        );
    }
    let names: Vec<&str> = queues.iter().map(|q| q.name.as_str()).collect();
    format!(
        "{original_error}. CUPS may be holding the interface ({}); remove with: {}",
        names.join(", "),
        names
            .iter()
            .map(|n| format!("lpadmin -x {n}"))
            .collect::<Vec<_>>()
            .join("; ")
    )
}

/// Parse `lpstat -v` lines of the form `device for <name>: <uri>`.
fn parse_lpstat(output: &str) -> Vec<CupsQueue> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("device for ")?;
            let (name, uri) = rest.split_once(": ")?;
            Some(CupsQueue {
                name: name.trim().to_string(),
                uri: uri.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_queues() {
        let output = "\
device for EPSON_TM_T20III: usb://EPSON/TM-T20III?serial=X4QF001122
device for Office: ipp://192.168.1.100/ipp/print
device for XP_80C: usb://Xprinter/XP-80C
";
        let queues = parse_lpstat(output);
        assert_eq!(queues.len(), 3);
        assert_eq!(queues[0].name, "EPSON_TM_T20III");
        assert_eq!(queues[2].uri, "usb://Xprinter/XP-80C");
    }

    #[test]
    fn ignores_unrelated_lines() {
        assert!(parse_lpstat("").is_empty());
        assert!(parse_lpstat("system default destination: Office\n").is_empty());
    }
}
