//! Receipt
//!
//! Terminal tables for the cart, the checkout summary and created transactions.

use std::io;

use rusty_money::iso::Currency;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    api::records::ProductRecord,
    cart::CartItem,
    checkout::CheckoutSummary,
    pricing::{self, PricingError},
    transactions::CreatedTransactions,
    vouchers::{Voucher, VoucherKind},
};

/// Errors that can occur when rendering a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Pricing a line failed.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// IO error
    #[error("IO error")]
    IO,
}

/// Write the cart lines and subtotal.
///
/// # Errors
///
/// Returns a [`ReceiptError`] if a line cannot be priced or the output cannot be written.
pub fn write_cart(
    mut out: impl io::Write,
    items: &[CartItem<'_>],
    currency: &Currency,
) -> Result<(), ReceiptError> {
    if items.is_empty() {
        return writeln!(out, "The cart is empty.").map_err(|_err| ReceiptError::IO);
    }

    let mut builder = Builder::default();
    builder.push_record(["", "Item", "Product", "Shop", "Price", "Qty", "Total"]);

    for (idx, item) in items.iter().enumerate() {
        builder.push_record([
            format!("#{}", idx + 1),
            item.product().name.clone(),
            item.product_uuid().to_string(),
            item.shop().to_string(),
            item.price().to_string(),
            item.quantity().to_string(),
            item.line_total()?.to_string(),
        ]);
    }

    write_table(&mut out, builder, 4..7)?;

    let subtotal = pricing::subtotal(items, currency)?;

    write_summary_lines(&mut out, &[("Subtotal:", subtotal.to_string())])
}

/// Write the per-shop totals and the grand total.
///
/// # Errors
///
/// Returns [`ReceiptError::IO`] if the output cannot be written.
pub fn write_checkout(
    mut out: impl io::Write,
    summary: &CheckoutSummary<'_>,
    voucher: Option<&Voucher<'_>>,
) -> Result<(), ReceiptError> {
    let mut builder = Builder::default();
    builder.push_record(["Shop", "Subtotal", "Shipment", "Total"]);

    for partition in &summary.partitions {
        builder.push_record([
            partition.shop.to_string(),
            partition.subtotal.to_string(),
            partition.shipment_cost.to_string(),
            partition.total.to_string(),
        ]);
    }

    write_table(&mut out, builder, 1..4)?;

    let discount_label = match voucher {
        Some(voucher) => format!("Discount ({}):", voucher.code),
        None => "Discount:".to_string(),
    };

    write_summary_lines(
        &mut out,
        &[
            ("Subtotal:", summary.subtotal.to_string()),
            ("Shipment:", summary.shipment_cost.to_string()),
            (&discount_label, format!("-{}", summary.discount)),
            ("Grand total:", summary.grand_total.to_string()),
        ],
    )
}

/// Write the transactions created by a submission.
///
/// # Errors
///
/// Returns [`ReceiptError::IO`] if the output cannot be written.
pub fn write_transactions(
    mut out: impl io::Write,
    created: &CreatedTransactions,
) -> Result<(), ReceiptError> {
    if let CreatedTransactions::Unreadable { reason } = created {
        return writeln!(
            out,
            "Order placed, but the confirmation could not be read ({reason}). \
             Check your transaction history before ordering again."
        )
        .map_err(|_err| ReceiptError::IO);
    }

    let mut builder = Builder::default();
    builder.push_record(["Code", "Status", "Grand Total", "Payment Link"]);

    for transaction in created.transactions() {
        builder.push_record([
            transaction.code.clone(),
            transaction.status.clone(),
            transaction.grand_total.to_string(),
            transaction.payment_link.clone().unwrap_or_default(),
        ]);
    }

    write_table(&mut out, builder, 2..3)
}

/// Write a page of products.
///
/// # Errors
///
/// Returns [`ReceiptError::IO`] if the output cannot be written.
pub fn write_products(
    mut out: impl io::Write,
    products: &[ProductRecord],
) -> Result<(), ReceiptError> {
    let mut builder = Builder::default();
    builder.push_record(["Product", "Name", "Shop", "Price", "Weight (g)"]);

    for product in products {
        builder.push_record([
            product.id.to_string(),
            product.name.clone(),
            product.shop_id.to_string(),
            product.price.to_string(),
            product.weight.to_string(),
        ]);
    }

    write_table(&mut out, builder, 3..5)
}

/// Write the selectable vouchers.
///
/// # Errors
///
/// Returns [`ReceiptError::IO`] if the output cannot be written.
pub fn write_vouchers(
    mut out: impl io::Write,
    vouchers: &[Voucher<'_>],
) -> Result<(), ReceiptError> {
    if vouchers.is_empty() {
        return writeln!(out, "No active voucher.").map_err(|_err| ReceiptError::IO);
    }

    let mut builder = Builder::default();
    builder.push_record(["Code", "Name", "Discount", "Valid Until"]);

    for voucher in vouchers {
        let discount = match &voucher.kind {
            VoucherKind::Fixed(amount) => amount.to_string(),
            VoucherKind::Percentage(percent) => format!("{percent}%"),
        };

        builder.push_record([
            voucher.code.clone(),
            voucher.name.clone(),
            discount,
            voucher.ends_at.to_string(),
        ]);
    }

    write_table(&mut out, builder, 2..3)
}

fn write_table(
    out: &mut impl io::Write,
    builder: Builder,
    money_columns: std::ops::Range<usize>,
) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(money_columns), Alignment::right());

    writeln!(out, "\n{table}").map_err(|_err| ReceiptError::IO)
}

fn write_summary_lines(
    out: &mut impl io::Write,
    lines: &[(&str, String)],
) -> Result<(), ReceiptError> {
    let label_width = lines.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let value_width = lines.iter().map(|(_, value)| value.len()).max().unwrap_or(0);

    for (label, value) in lines {
        writeln!(out, " {label:<label_width$} {value:>value_width$}")
            .map_err(|_err| ReceiptError::IO)?;
    }

    writeln!(out).map_err(|_err| ReceiptError::IO)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use jiff::Timestamp;
    use rust_decimal::Decimal;
    use rusty_money::iso::IDR;
    use testresult::TestResult;

    use crate::{
        checkout::PartitionSummary,
        pricing::from_whole_units,
        products::Product,
        uuids::{ProductUuid, ShopUuid, VoucherUuid},
    };

    use super::*;

    #[test]
    fn cart_lists_lines_and_subtotal() -> TestResult {
        let items = [CartItem::with_quantity(
            Product {
                uuid: ProductUuid::now_v7(),
                variant: None,
                name: "Kopi Gayo".to_string(),
                price: from_whole_units(20_000, IDR)?,
                image: None,
                shop: ShopUuid::now_v7(),
                weight_grams: 250,
            },
            NonZeroU32::new(2).ok_or("zero quantity")?,
        )];

        let mut out = Vec::new();
        write_cart(&mut out, &items, IDR)?;

        let output = String::from_utf8(out)?;

        assert!(output.contains("Kopi Gayo"));
        assert!(output.contains("Subtotal:"));
        assert!(output.contains(&from_whole_units(40_000, IDR)?.to_string()));

        Ok(())
    }

    #[test]
    fn empty_cart_message() -> TestResult {
        let mut out = Vec::new();
        write_cart(&mut out, &[], IDR)?;

        assert_eq!(String::from_utf8(out)?, "The cart is empty.\n");

        Ok(())
    }

    #[test]
    fn checkout_shows_discount_with_voucher_code() -> TestResult {
        let shop = ShopUuid::now_v7();
        let summary = CheckoutSummary {
            partitions: vec![PartitionSummary {
                shop,
                subtotal: from_whole_units(100_000, IDR)?,
                shipment_cost: from_whole_units(10_000, IDR)?,
                total: from_whole_units(110_000, IDR)?,
            }],
            subtotal: from_whole_units(100_000, IDR)?,
            shipment_cost: from_whole_units(10_000, IDR)?,
            discount: from_whole_units(10_000, IDR)?,
            grand_total: from_whole_units(100_000, IDR)?,
        };
        let voucher = Voucher {
            uuid: VoucherUuid::now_v7(),
            code: "HEMAT10".to_string(),
            name: "Hemat 10%".to_string(),
            description: None,
            kind: VoucherKind::Percentage(Decimal::TEN),
            starts_at: Timestamp::UNIX_EPOCH,
            ends_at: Timestamp::MAX,
            active: true,
        };

        let mut out = Vec::new();
        write_checkout(&mut out, &summary, Some(&voucher))?;

        let output = String::from_utf8(out)?;

        assert!(output.contains(&shop.to_string()));
        assert!(output.contains("Discount (HEMAT10):"));
        assert!(output.contains("Grand total:"));

        Ok(())
    }

    #[test]
    fn vouchers_empty_message() -> TestResult {
        let mut out = Vec::new();
        write_vouchers(&mut out, &[])?;

        assert_eq!(String::from_utf8(out)?, "No active voucher.\n");

        Ok(())
    }

    #[test]
    fn unreadable_confirmation_warns_against_reordering() -> TestResult {
        let created = CreatedTransactions::Unreadable {
            reason: "missing field `code`".to_string(),
        };

        let mut out = Vec::new();
        write_transactions(&mut out, &created)?;

        let output = String::from_utf8(out)?;

        assert!(output.contains("Order placed"));
        assert!(output.contains("missing field `code`"));

        Ok(())
    }

    #[test]
    fn transactions_list_payment_links() -> TestResult {
        let created: CreatedTransactions = serde_json::from_value(serde_json::json!({
            "id": "0195508a-3c7e-7d3e-9a0b-2f1c4b6d8e50",
            "code": "INV/20250301/0009",
            "shop_id": "0195508a-3c7e-7d3e-9a0b-2f1c4b6d8e51",
            "total": 50_000,
            "grand_total": 60_000,
            "payment_link": "https://pay.example.test/9",
            "status": "pending",
            "recipient_name": "Budi",
            "phone": "0812",
            "address": "Jl. Kenanga 12",
            "province": "Jawa Barat",
            "city": "Bandung",
            "district": "Coblong",
            "postal_code": "40132",
            "created_at": "2025-03-01T12:00:00Z",
            "updated_at": "2025-03-01T12:00:00Z"
        }))?;

        let mut out = Vec::new();
        write_transactions(&mut out, &created)?;

        let output = String::from_utf8(out)?;

        assert!(output.contains("INV/20250301/0009"));
        assert!(output.contains("https://pay.example.test/9"));

        Ok(())
    }
}
