//! ESC/POS rendering of a command list through the `escpos` crate.

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use encoding_rs::WINDOWS_1252;
use escpos::driver::Driver;
use escpos::errors::{PrinterError, Result as EscPosResult};
use escpos::printer::Printer;
use escpos::printer_options::PrinterOptions;
use escpos::utils::{
    BarcodeFont, BarcodeHeight, BarcodeOption, BarcodePosition, BarcodeWidth, JustifyMode, PageCode,
    Protocol, QRCodeCorrectionLevel, QRCodeModel, QRCodeOption, DEFAULT_CHARACTERS_PER_LINE, GS,
};

use crate::printer::commands::{
    Alignment, BarcodeOptions, BarcodeSymbology, CommandEncoder, CutMode, PrintCommand, QrCorrection,
    QrModel, QrOptions,
};

/// `GS k` system number for CODE128, which the crate has no builder for.
const CODE128_SYSTEM: u8 = 73;

/// How line text is turned into bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Windows1252,
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "windows-1252" | "cp1252" | "latin1" => Ok(TextEncoding::Windows1252),
            other => Err(format!("unsupported encoding {other:?}")),
        }
    }
}

/// Collects what would have gone to the printer.
#[derive(Clone, Default)]
struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    fn take(&self) -> Vec<u8> {
        self.0.take()
    }
}

impl Driver for Capture {
    fn name(&self) -> String {
        "capture".to_string()
    }

    fn write(&self, data: &[u8]) -> EscPosResult<()> {
        self.0.borrow_mut().extend_from_slice(data);
        Ok(())
    }

    fn read(&self, _buf: &mut [u8]) -> EscPosResult<usize> {
        Ok(0)
    }

    fn flush(&self) -> EscPosResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EscPosEncoder {
    encoding: TextEncoding,
}

impl EscPosEncoder {
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }

    fn printer(&self, capture: Capture) -> Printer<Capture> {
        let page_code = match self.encoding {
            TextEncoding::Utf8 => None,
            TextEncoding::Windows1252 => Some(PageCode::WPC1252),
        };
        let options = PrinterOptions::new(page_code, None, DEFAULT_CHARACTERS_PER_LINE);
        Printer::new(capture, Protocol::default(), Some(options))
    }

    /// Control characters in payload text would be read as commands, and
    /// characters outside the code page become `?`.
    fn printable(&self, text: &str) -> String {
        let mut tmp = [0u8; 4];
        text.chars()
            .map(|c| {
                if c.is_control() {
                    ' '
                } else if self.encoding == TextEncoding::Windows1252
                    && !c.is_ascii()
                    && WINDOWS_1252.encode(c.encode_utf8(&mut tmp)).2
                {
                    '?'
                } else {
                    c
                }
            })
            .collect()
    }

    fn apply<'p>(
        &self,
        printer: &'p mut Printer<Capture>,
        command: &PrintCommand,
    ) -> EscPosResult<&'p mut Printer<Capture>> {
        match command {
            PrintCommand::Initialize => printer.init(),
            PrintCommand::Align(alignment) => printer.justify(match alignment {
                Alignment::Left => JustifyMode::LEFT,
                Alignment::Center => JustifyMode::CENTER,
                Alignment::Right => JustifyMode::RIGHT,
            }),
            PrintCommand::Bold(on) => printer.bold(*on),
            PrintCommand::Size { width, height } => printer.size((*width).clamp(1, 8), (*height).clamp(1, 8)),
            PrintCommand::Line(text) => printer.writeln(&self.printable(text)),
            PrintCommand::Feed(lines) => printer.feeds(*lines),
            PrintCommand::Barcode {
                value,
                symbology,
                options,
            } => barcode(printer, value, *symbology, options),
            PrintCommand::QrCode { value, options } => printer.qrcode_option(value, qr_option(options)),
            PrintCommand::Cut(CutMode::Full) => printer.cut(),
            PrintCommand::Cut(CutMode::Partial) => printer.partial_cut(),
        }
    }
}

fn barcode<'p>(
    printer: &'p mut Printer<Capture>,
    value: &str,
    symbology: BarcodeSymbology,
    options: &BarcodeOptions,
) -> EscPosResult<&'p mut Printer<Capture>> {
    let option = BarcodeOption::new(
        bar_width(options.width),
        bar_height(options.height),
        BarcodeFont::A,
        BarcodePosition::Below,
    );
    match symbology {
        BarcodeSymbology::UpcA => printer.upca_option(value, option),
        BarcodeSymbology::Ean13 => printer.ean13_option(value, option),
        BarcodeSymbology::Ean8 => printer.ean8_option(value, option),
        BarcodeSymbology::Code39 => printer.code39_option(value, option),
        BarcodeSymbology::Itf => printer.itf_option(value, option),
        BarcodeSymbology::Codabar => printer.codabar_option(value, option),
        BarcodeSymbology::Code128 => printer.custom(&code128_set_b(value, options)?),
    }
}

/// CODE128 in code set B (`GS k` function B). A literal `{` is doubled.
fn code128_set_b(value: &str, options: &BarcodeOptions) -> EscPosResult<Vec<u8>> {
    if let Some(c) = value.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(PrinterError::Input(format!("CODE128 set B cannot encode {c:?}")));
    }

    let mut data = b"{B".to_vec();
    for b in value.bytes() {
        if b == b'{' {
            data.push(b'{');
        }
        data.push(b);
    }
    let len = u8::try_from(data.len())
        .map_err(|_| PrinterError::Input(format!("CODE128 data too long ({} bytes)", data.len())))?;

    let mut cmd = vec![
        GS,
        b'h',
        options.height.max(1),
        GS,
        b'w',
        options.width.clamp(1, 5),
        GS,
        b'H',
        BarcodePosition::Below.into(),
        GS,
        b'k',
        CODE128_SYSTEM,
        len,
    ];
    cmd.extend_from_slice(&data);
    Ok(cmd)
}

fn bar_width(width: u8) -> BarcodeWidth {
    match width {
        0 | 1 => BarcodeWidth::XS,
        2 => BarcodeWidth::S,
        3 => BarcodeWidth::M,
        4 => BarcodeWidth::L,
        _ => BarcodeWidth::XL,
    }
}

/// The crate offers five fixed bar heights (51 to 255 dots); take the
/// closest.
fn bar_height(dots: u8) -> BarcodeHeight {
    match dots {
        0..=76 => BarcodeHeight::XS,
        77..=127 => BarcodeHeight::S,
        128..=178 => BarcodeHeight::M,
        179..=229 => BarcodeHeight::L,
        _ => BarcodeHeight::XL,
    }
}

fn qr_option(options: &QrOptions) -> QRCodeOption {
    let model = match options.model {
        QrModel::Model1 => QRCodeModel::Model1,
        QrModel::Model2 => QRCodeModel::Model2,
    };
    let correction = match options.correction {
        QrCorrection::L => QRCodeCorrectionLevel::L,
        QrCorrection::M => QRCodeCorrectionLevel::M,
        QrCorrection::Q => QRCodeCorrectionLevel::Q,
        QrCorrection::H => QRCodeCorrectionLevel::H,
    };
    QRCodeOption::new(model, options.size.clamp(1, 15), correction)
}

impl CommandEncoder for EscPosEncoder {
    /// A directive the printer cannot express (say, letters in an EAN-13)
    /// is logged and left out; the rest of the ticket still prints.
    fn encode(&self, commands: &[PrintCommand]) -> Vec<u8> {
        let capture = Capture::default();
        let mut printer = self.printer(capture.clone());

        for command in commands {
            if let Err(e) = self.apply(&mut printer, command) {
                tracing::warn!("Skipped {command:?}: {e}");
            }
        }
        if let Err(e) = printer.print() {
            tracing::warn!("ESC/POS render failed: {e}");
        }

        capture.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::commands::CommandStream;

    fn encode(stream: CommandStream) -> Vec<u8> {
        stream.encode(&EscPosEncoder::default())
    }

    #[test]
    fn basic_formatting_bytes() {
        let bytes = encode(
            CommandStream::new()
                .initialize()
                .align(Alignment::Center)
                .bold(true)
                .size(2, 2)
                .line("HI")
                .newline(2)
                .cut(CutMode::Partial),
        );
        assert_eq!(
            bytes,
            vec![
                0x1B, 0x40, // init
                0x1B, 0x61, 0x01, // center
                0x1B, 0x45, 0x01, // bold
                0x1D, 0x21, 0x11, // double size
                b'H', b'I', 0x1B, 0x64, 0x01, // line
                0x1B, 0x64, 0x02, // feed
                0x1D, 0x56, 0x41, 0x01, // partial cut
            ]
        );
    }

    #[test]
    fn size_is_clamped() {
        let bytes = encode(CommandStream::new().size(0, 12));
        assert_eq!(bytes, vec![0x1D, 0x21, 0x07]);
    }

    #[test]
    fn full_cut() {
        assert_eq!(encode(CommandStream::new().cut(CutMode::Full)), vec![0x1D, 0x56, 0x41, 0x00]);
    }

    #[test]
    fn code128_uses_set_b_and_escapes_brace() {
        let bytes = encode(CommandStream::new().barcode(
            "A{1",
            BarcodeSymbology::Code128,
            BarcodeOptions::default(),
        ));
        assert_eq!(&bytes[..9], &[0x1D, b'h', 60, 0x1D, b'w', 3, 0x1D, b'H', 2]);
        assert_eq!(&bytes[9..13], &[0x1D, b'k', 73, 6]);
        assert_eq!(&bytes[13..], b"{BA{{1");
    }

    #[test]
    fn code128_rejects_non_ascii_without_dropping_the_rest() {
        let bytes = encode(
            CommandStream::new()
                .barcode("ñ", BarcodeSymbology::Code128, BarcodeOptions::default())
                .line("ok"),
        );
        assert_eq!(bytes, vec![b'o', b'k', 0x1B, 0x64, 0x01]);
    }

    #[test]
    fn ean13_goes_through_the_crate() {
        let bytes = encode(CommandStream::new().barcode(
            "590123412345",
            BarcodeSymbology::Ean13,
            BarcodeOptions { height: 100, width: 2 },
        ));
        // width S, height S (102 dots), font A, HRI below, then GS k 2 <data> NUL
        assert_eq!(
            &bytes[..12],
            &[0x1D, b'w', 2, 0x1D, b'h', 102, 0x1D, b'f', 0, 0x1D, b'H', 2]
        );
        assert_eq!(&bytes[12..15], &[0x1D, b'k', 2]);
        assert_eq!(&bytes[15..27], b"590123412345");
        assert_eq!(bytes[27], 0x00);
    }

    #[test]
    fn invalid_ean13_is_skipped() {
        let bytes = encode(CommandStream::new().barcode(
            "F-1001",
            BarcodeSymbology::Ean13,
            BarcodeOptions::default(),
        ));
        assert!(bytes.is_empty());
    }

    #[test]
    fn qr_store_length_counts_header() {
        let url = "https://martpos.app/invoice/42";
        let bytes = encode(CommandStream::new().qrcode(
            url,
            QrOptions {
                model: QrModel::Model1,
                size: 6,
                correction: QrCorrection::M,
            },
        ));
        assert_eq!(&bytes[..9], &[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x31, 0x00]);
        assert_eq!(bytes[16], 6);
        assert_eq!(bytes[24], 0x31);
        let store = &bytes[25..33];
        assert_eq!(store[3], (url.len() + 3) as u8);
        assert_eq!(store[4], 0);
        assert_eq!(&bytes[33..33 + url.len()], url.as_bytes());
        assert_eq!(&bytes[bytes.len() - 8..], &[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);
    }

    #[test]
    fn control_characters_are_neutralised() {
        let bytes = encode(CommandStream::new().line("a\x1b@b"));
        assert_eq!(bytes, b"a @b\x1bd\x01");
    }

    #[test]
    fn windows_1252_code_page() {
        let encoder = EscPosEncoder::new(TextEncoding::Windows1252);
        let bytes = CommandStream::new()
            .initialize()
            .line("Método ✓")
            .encode(&encoder);
        assert_eq!(&bytes[..5], &[0x1B, 0x40, 0x1B, b't', 16]);
        assert_eq!(
            &bytes[5..],
            &[b'M', 0xE9, b't', b'o', b'd', b'o', b' ', b'?', 0x1B, 0x64, 0x01]
        );
    }

    #[test]
    fn bar_heights_snap_to_nearest() {
        assert!(matches!(bar_height(60), BarcodeHeight::XS));
        assert!(matches!(bar_height(110), BarcodeHeight::S));
        assert!(matches!(bar_height(255), BarcodeHeight::XL));
    }

    #[test]
    fn parse_encoding_names() {
        assert_eq!("UTF-8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert_eq!("cp1252".parse::<TextEncoding>(), Ok(TextEncoding::Windows1252));
        assert!("shift_jis".parse::<TextEncoding>().is_err());
    }
}
