use std::str::FromStr;

/// Horizontal justification for following lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CutMode {
    Full,
    #[default]
    Partial,
}

impl FromStr for CutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(CutMode::Full),
            "partial" => Ok(CutMode::Partial),
            other => Err(format!("unknown cut mode {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BarcodeSymbology {
    UpcA,
    Ean13,
    Ean8,
    Code39,
    Itf,
    Codabar,
    #[default]
    Code128,
}

impl FromStr for BarcodeSymbology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match name.as_str() {
            "upca" => Ok(BarcodeSymbology::UpcA),
            "ean13" => Ok(BarcodeSymbology::Ean13),
            "ean8" => Ok(BarcodeSymbology::Ean8),
            "code39" => Ok(BarcodeSymbology::Code39),
            "itf" => Ok(BarcodeSymbology::Itf),
            "codabar" => Ok(BarcodeSymbology::Codabar),
            "code128" => Ok(BarcodeSymbology::Code128),
            _ => Err(format!("unsupported barcode {s:?}")),
        }
    }
}

/// Human-readable digits are always printed below the bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarcodeOptions {
    /// Bar height in dots, 1..=255.
    pub height: u8,
    /// Module width, 1..=5.
    pub width: u8,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            height: 60,
            width: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrModel {
    Model1,
    Model2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QrCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl FromStr for QrCorrection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(QrCorrection::L),
            "M" => Ok(QrCorrection::M),
            "Q" => Ok(QrCorrection::Q),
            "H" => Ok(QrCorrection::H),
            other => Err(format!("unknown QR correction level {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    pub model: QrModel,
    /// Module size in dots, 1..=15.
    pub size: u8,
    pub correction: QrCorrection,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            model: QrModel::Model2,
            size: 6,
            correction: QrCorrection::M,
        }
    }
}

/// A pure, testable representation of one printer directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintCommand {
    Initialize,
    Align(Alignment),
    Bold(bool),
    Size { width: u8, height: u8 },
    Line(String),
    Feed(u8),
    Barcode {
        value: String,
        symbology: BarcodeSymbology,
        options: BarcodeOptions,
    },
    QrCode { value: String, options: QrOptions },
    Cut(CutMode),
}

/// Knows the printer's binary command set. The stream itself never does.
pub trait CommandEncoder: Send + Sync {
    fn encode(&self, commands: &[PrintCommand]) -> Vec<u8>;
}

/// Ordered, append-only list of directives.
///
/// Every builder call appends one command; [`CommandStream::encode`] renders
/// the list without consuming it, so repeated encodes yield identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandStream {
    commands: Vec<PrintCommand>,
}

impl CommandStream {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn commands(&self) -> &[PrintCommand] {
        &self.commands
    }

    fn push(mut self, command: PrintCommand) -> Self {
        self.commands.push(command);
        self
    }

    pub fn initialize(self) -> Self {
        self.push(PrintCommand::Initialize)
    }

    pub fn align(self, alignment: Alignment) -> Self {
        self.push(PrintCommand::Align(alignment))
    }

    pub fn bold(self, on: bool) -> Self {
        self.push(PrintCommand::Bold(on))
    }

    pub fn size(self, width: u8, height: u8) -> Self {
        self.push(PrintCommand::Size { width, height })
    }

    pub fn line(self, text: impl Into<String>) -> Self {
        self.push(PrintCommand::Line(text.into()))
    }

    pub fn newline(self, count: u8) -> Self {
        self.push(PrintCommand::Feed(count))
    }

    pub fn barcode(
        self,
        value: impl Into<String>,
        symbology: BarcodeSymbology,
        options: BarcodeOptions,
    ) -> Self {
        self.push(PrintCommand::Barcode {
            value: value.into(),
            symbology,
            options,
        })
    }

    pub fn qrcode(self, value: impl Into<String>, options: QrOptions) -> Self {
        self.push(PrintCommand::QrCode {
            value: value.into(),
            options,
        })
    }

    pub fn cut(self, mode: CutMode) -> Self {
        self.push(PrintCommand::Cut(mode))
    }

    /// Apply `f` only when `condition` holds, keeping the chain fluent.
    pub fn when(self, condition: bool, f: impl FnOnce(Self) -> Self) -> Self {
        if condition {
            f(self)
        } else {
            self
        }
    }

    pub fn encode(&self, encoder: &dyn CommandEncoder) -> Vec<u8> {
        encoder.encode(&self.commands)
    }
}
