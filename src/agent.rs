//! Print orchestration: shared agent state plus the one place where print
//! jobs meet the USB backends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::AgentConfig;
use crate::error::{PrintError, PrintJob};
use crate::printer::classify::Classifier;
use crate::printer::commands::CommandStream;
use crate::printer::connection::{OpenPrinter, Transport};
use crate::printer::discovery::DeviceSource;
use crate::printer::escpos::EscPosEncoder;
use crate::printer::models::{ClassifiedDevice, DefaultPrinterSelection, DeviceDescriptor};
use crate::printer::resolver::resolve;
use crate::receipt::sale::SaleRequest;
use crate::receipt::{self, ReceiptOptions};

/// Operator-controlled state shared by every request.
#[derive(Debug)]
pub struct AgentState {
    enabled: AtomicBool,
    default_printer: RwLock<Option<DefaultPrinterSelection>>,
}

impl AgentState {
    pub fn new(enabled: bool, default_printer: Option<DefaultPrinterSelection>) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            default_printer: RwLock::new(default_printer),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn default_printer(&self) -> Option<DefaultPrinterSelection> {
        *self
            .default_printer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_default_printer(&self, selection: Option<DefaultPrinterSelection>) {
        *self
            .default_printer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = selection;
    }
}

/// One row of `GET /printers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterEntry {
    #[serde(flatten)]
    pub device: ClassifiedDevice,
    pub is_default: bool,
}

pub struct PrintAgent {
    state: AgentState,
    devices: Arc<dyn DeviceSource>,
    transport: Arc<dyn Transport>,
    classifier: Arc<Classifier>,
    encoder: EscPosEncoder,
    receipt: ReceiptOptions,
    /// Held for the whole blocking USB job, so at most one interface claim
    /// is in flight at a time.
    print_lock: Arc<Mutex<()>>,
    job_timeout: Duration,
}

impl PrintAgent {
    pub fn new(
        config: &AgentConfig,
        devices: Arc<dyn DeviceSource>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let classifier = Classifier::with_extra_keywords(&config.extra_keywords);
        tracing::debug!("Printer keywords: {}", classifier.keywords().join(", "));

        Self {
            state: AgentState::new(config.enabled, config.default_printer),
            devices,
            transport,
            classifier: Arc::new(classifier),
            encoder: EscPosEncoder::new(config.encoding),
            receipt: config.receipt.clone(),
            print_lock: Arc::new(Mutex::new(())),
            job_timeout: config.print_timeout,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.set_enabled(enabled);
        tracing::info!("Print agent {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn default_printer(&self) -> Option<DefaultPrinterSelection> {
        self.state.default_printer()
    }

    pub fn set_default_printer(&self, selection: DefaultPrinterSelection) {
        self.state.set_default_printer(Some(selection));
        tracing::info!("Default printer set to {selection}");
    }

    pub fn clear_default_printer(&self) {
        self.state.set_default_printer(None);
        tracing::info!("Default printer cleared");
    }

    /// Enumerate and classify every attached device.
    pub async fn list_printers(&self) -> Result<Vec<PrinterEntry>, PrintError> {
        let devices = Arc::clone(&self.devices);
        let work = tokio::task::spawn_blocking(move || devices.list_devices());

        let listed = match tokio::time::timeout(self.job_timeout, work).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(PrintError::Worker(e.to_string())),
            Err(_) => return Err(PrintError::Timeout(self.job_timeout)),
        };

        let default = self.default_printer();
        Ok(listed
            .into_iter()
            .map(|d| PrinterEntry {
                is_default: default.is_some_and(|sel| d.matches(sel)),
                device: self.classifier.classify(d),
            })
            .collect())
    }

    pub async fn print_test(&self) -> Result<DeviceDescriptor, PrintError> {
        self.run_job(PrintJob::Test, receipt::test_ticket(&self.receipt)).await
    }

    pub async fn print_sale(&self, sale: &SaleRequest) -> Result<DeviceDescriptor, PrintError> {
        if !self.is_enabled() {
            return Err(PrintError::AgentDisabled);
        }
        let ticket = receipt::sale_ticket(sale, &self.receipt);
        self.run_job(PrintJob::Sale, ticket).await
    }

    /// Resolve, open, write and close under the print lock, bounded by the
    /// job timeout (lock wait included).
    ///
    /// On timeout the blocking job keeps running and keeps the lock until
    /// libusb returns; the next job waits for it.
    async fn run_job(
        &self,
        job: PrintJob,
        ticket: CommandStream,
    ) -> Result<DeviceDescriptor, PrintError> {
        if !self.is_enabled() {
            return Err(PrintError::AgentDisabled);
        }
        let bytes = ticket.encode(&self.encoder);

        let lock = Arc::clone(&self.print_lock);
        let devices = Arc::clone(&self.devices);
        let transport = Arc::clone(&self.transport);
        let classifier = Arc::clone(&self.classifier);

        let work = async {
            let guard = lock.lock_owned().await;
            // Re-read after queueing: the operator may have toggled state.
            let enabled = self.is_enabled();
            let default = self.default_printer();

            tokio::task::spawn_blocking(move || -> Result<DeviceDescriptor, PrintError> {
                let _guard = guard;
                let device = resolve(devices.as_ref(), &classifier, enabled, default)?;
                let mut printer = OpenPrinter::open(transport.as_ref(), &device)?;
                printer.write(&bytes)?;
                printer.close();
                Ok(device)
            })
            .await
        };

        let result = match tokio::time::timeout(self.job_timeout, work).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PrintError::Worker(e.to_string())),
            Err(_) => Err(PrintError::Timeout(self.job_timeout)),
        };

        match &result {
            Ok(device) => tracing::info!("{job:?} ticket printed on {}", device.label()),
            Err(PrintError::AgentDisabled) => tracing::info!("{job:?} ticket rejected: agent off"),
            Err(e) => tracing::warn!("{job:?} ticket failed: {e}"),
        }
        result
    }
}
