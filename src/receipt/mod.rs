//! Receipt layouts. Pure: every function here only builds a
//! [`CommandStream`]; nothing touches the printer.

pub mod columns;
pub mod i18n;
pub mod sale;

use crate::printer::commands::{
    Alignment, BarcodeOptions, BarcodeSymbology, CommandStream, CutMode, QrCorrection, QrModel,
    QrOptions,
};
use columns::{money, quantity, table_row};
use sale::{non_blank, scalar_text, SaleRequest};

pub const TEST_TICKET_TITLE: &str = "MART POS";
const FALLBACK_BARCODE: &str = "123456789";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptOptions {
    /// Characters per line on the installed paper.
    pub width: usize,
    /// Prefix of the per-sale lookup URL; the sale id is appended.
    pub invoice_url_base: String,
    pub footer: String,
    /// Symbology of the sale-number barcode.
    pub barcode: BarcodeSymbology,
    pub qr_correction: QrCorrection,
    pub cut: CutMode,
}

impl Default for ReceiptOptions {
    fn default() -> Self {
        Self {
            width: 48,
            invoice_url_base: "https://martpos.app/invoice/".into(),
            footer: "Powered by martpos.app".into(),
            barcode: BarcodeSymbology::Code128,
            qr_correction: QrCorrection::M,
            cut: CutMode::Partial,
        }
    }
}

impl ReceiptOptions {
    pub fn invoice_url(&self, sale_id: &str) -> String {
        format!("{}{}", self.invoice_url_base, sale_id)
    }

    fn rule(&self) -> String {
        "-".repeat(self.width)
    }
}

/// Fixed self-test ticket.
pub fn test_ticket(options: &ReceiptOptions) -> CommandStream {
    CommandStream::new()
        .initialize()
        .align(Alignment::Center)
        .bold(true)
        .size(2, 2)
        .line(TEST_TICKET_TITLE)
        .bold(false)
        .size(1, 1)
        .align(Alignment::Left)
        .line("Ticket de prueba")
        .line("Ticket of proof")
        .newline(4)
        .cut(options.cut)
}

pub fn sale_ticket(req: &SaleRequest, options: &ReceiptOptions) -> CommandStream {
    let labels = i18n::labels_for(req.locale.as_str());
    let sale = &req.sale;
    let store = req.store.clone().unwrap_or_default();
    let seller = req.employee.as_ref().and_then(|e| non_blank(&e.name));
    let sale_id = scalar_text(&sale.id);
    let rule = options.rule();

    // Header
    let mut t = CommandStream::new()
        .initialize()
        .align(Alignment::Center)
        .line("");
    if let Some(name) = non_blank(&store.name) {
        t = t.bold(true).line(name).bold(false);
    }
    if let Some(address) = non_blank(&store.address) {
        t = t.line(address);
    }
    if let Some(phone) = non_blank(&store.phone) {
        t = t.line(format!("Tel: {phone}"));
    }

    // Metadata
    t = t
        .align(Alignment::Left)
        .newline(1)
        .line(rule.as_str())
        .line(format!("{}: {sale_id}", labels.invoice))
        .line(format!("{}: {}", labels.date, labels.format_date(&sale.date)))
        .when(seller.is_some(), |t| {
            t.line(format!("{}: {}", labels.seller, seller.unwrap_or_default()))
        })
        .line(rule.as_str())
        .newline(1);

    // Items
    t = t
        .bold(true)
        .line(table_row(labels.product, labels.qty, labels.price, labels.total))
        .bold(false);
    for item in &req.items {
        t = t.line(table_row(
            &item.name,
            &quantity(item.quantity),
            &money(item.unit_price),
            &money(item.line_total()),
        ));
    }
    t = t.line(rule.as_str());

    // Totals
    t = t
        .align(Alignment::Right)
        .line(format!("{}: ${}", labels.subtotal, money(sale.subtotal)))
        .line(format!("{}: ${}", labels.tax, money(sale.tax_total)))
        .line(format!("{}: ${}", labels.discount, money(sale.discount_total)))
        .bold(true)
        .size(2, 2)
        .line(format!("{}: ${}", labels.grand_total, money(sale.grand_total)))
        .bold(false)
        .size(1, 1)
        .align(Alignment::Left)
        .newline(1);

    if let Some(method) = non_blank(&sale.payment_method) {
        t = t
            .align(Alignment::Center)
            .line(format!("{}: {method}", labels.payment_method));
    }

    t = barcode_block(t, req, options);

    t.newline(1)
        .align(Alignment::Center)
        .bold(true)
        .line(labels.thanks)
        .bold(false)
        .line(options.footer.as_str())
        .newline(3)
        .cut(options.cut)
}

fn barcode_block(t: CommandStream, req: &SaleRequest, options: &ReceiptOptions) -> CommandStream {
    let number = scalar_text(&req.sale.number);
    let barcode = if number.is_empty() {
        FALLBACK_BARCODE.to_string()
    } else {
        number
    };
    let url = options.invoice_url(&scalar_text(&req.sale.id));

    t.newline(1)
        .align(Alignment::Center)
        .bold(true)
        .line("Barcode")
        .bold(false)
        .barcode(
            barcode,
            options.barcode,
            BarcodeOptions {
                height: 60,
                ..BarcodeOptions::default()
            },
        )
        .align(Alignment::Center)
        .bold(true)
        .line("QR")
        .bold(false)
        .qrcode(
            url,
            QrOptions {
                model: QrModel::Model1,
                size: 6,
                correction: options.qr_correction,
            },
        )
}
