use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::repository::InvoiceRepository;
use hearth_core::CoreResult;
use hearth_folio::{Billing, Invoice, LineItem};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgConnection;
use uuid::Uuid;

use super::{map_db_error, parse_column, PgStore};

const INVOICE_COLUMNS: &str = "id, invoice_number, hotel_id, booking_id, guest_id, room_id, kind, line_items, \
     subtotal, tax_amount, total_amount, billing, issued_at";

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    invoice_number: String,
    hotel_id: Uuid,
    booking_id: Uuid,
    guest_id: Uuid,
    room_id: Uuid,
    kind: String,
    line_items: Json<Vec<LineItem>>,
    subtotal: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    billing: Json<Billing>,
    issued_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self) -> CoreResult<Invoice> {
        Ok(Invoice {
            id: self.id,
            invoice_number: self.invoice_number,
            hotel_id: self.hotel_id,
            booking_id: self.booking_id,
            guest_id: self.guest_id,
            room_id: self.room_id,
            kind: parse_column("invoice kind", &self.kind)?,
            line_items: self.line_items.0,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total_amount: self.total_amount,
            billing: self.billing.0,
            issued_at: self.issued_at,
        })
    }
}

pub(super) async fn insert_invoice(conn: &mut PgConnection, invoice: &Invoice) -> CoreResult<()> {
    sqlx::query(&format!(
        "INSERT INTO invoices ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        INVOICE_COLUMNS
    ))
    .bind(invoice.id)
    .bind(&invoice.invoice_number)
    .bind(invoice.hotel_id)
    .bind(invoice.booking_id)
    .bind(invoice.guest_id)
    .bind(invoice.room_id)
    .bind(invoice.kind.as_str())
    .bind(Json(&invoice.line_items))
    .bind(invoice.subtotal)
    .bind(invoice.tax_amount)
    .bind(invoice.total_amount)
    .bind(Json(&invoice.billing))
    .bind(invoice.issued_at)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

#[async_trait]
impl InvoiceRepository for PgStore {
    async fn get_invoice(&self, id: Uuid) -> CoreResult<Option<Invoice>> {
        let row: Option<InvoiceRow> =
            sqlx::query_as(&format!("SELECT {} FROM invoices WHERE id = $1", INVOICE_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;
        row.map(InvoiceRow::into_invoice).transpose()
    }

    async fn list_invoices_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE booking_id = $1 ORDER BY issued_at",
            INVOICE_COLUMNS
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.into_iter().map(InvoiceRow::into_invoice).collect()
    }

    async fn list_invoices_issued_between(
        &self,
        hotel_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE hotel_id = $1 AND issued_at >= $2 AND issued_at < $3 \
             ORDER BY issued_at",
            INVOICE_COLUMNS
        ))
        .bind(hotel_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.into_iter().map(InvoiceRow::into_invoice).collect()
    }
}
