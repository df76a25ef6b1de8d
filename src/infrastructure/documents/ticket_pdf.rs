//! # PDF Tickets
//!
//! Renders a one-page A6 ticket for a participant: event name, date,
//! venue, attendee name, masked CPF, ticket type and the QR token printed
//! in large type for manual entry at the door.

use crate::domain::entities::{Event, Participant};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use thiserror::Error;

const PAGE_WIDTH: Mm = Mm(105.0);
const PAGE_HEIGHT: Mm = Mm(148.0);
const MARGIN: f32 = 8.0;

/// Error rendering a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// PDF backend failure.
    #[error("pdf rendering failed: {0}")]
    Render(String),
}

impl From<printpdf::Error> for DocumentError {
    fn from(e: printpdf::Error) -> Self {
        Self::Render(e.to_string())
    }
}

/// Text printed on a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketContent {
    /// Event name.
    pub event_name: String,
    /// Start date, `dd/mm/yyyy HH:MM` UTC.
    pub starts_at: String,
    /// Venue.
    pub venue: String,
    /// Attendee name.
    pub attendee: String,
    /// Masked CPF, if any.
    pub cpf: Option<String>,
    /// Ticket type.
    pub ticket_type: String,
    /// QR token.
    pub qr_token: String,
}

impl TicketContent {
    /// Collects the printable fields.
    #[must_use]
    pub fn new(event: &Event, participant: &Participant) -> Self {
        Self {
            event_name: event.name().to_string(),
            starts_at: event
                .starts_at()
                .as_datetime()
                .format("%d/%m/%Y %H:%M UTC")
                .to_string(),
            venue: event.venue().to_string(),
            attendee: participant.name().to_string(),
            cpf: participant.cpf().map(crate::domain::value_objects::Cpf::masked),
            ticket_type: participant.ticket_type().to_string(),
            qr_token: participant.qr_token().to_string(),
        }
    }
}

struct Cursor<'a> {
    layer: &'a PdfLayerReference,
    y: f32,
}

impl Cursor<'_> {
    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef, gap: f32) {
        self.layer.use_text(text, size, Mm(MARGIN), Mm(self.y), font);
        self.y -= gap;
    }
}

/// Renders the ticket and returns the PDF bytes.
///
/// # Errors
///
/// Returns `DocumentError::Render` if a font cannot be embedded or the
/// document cannot be serialized.
pub fn render_ticket(content: &TicketContent) -> Result<Vec<u8>, DocumentError> {
    let title = format!("Ingresso - {}", content.event_name);
    let (doc, page, layer) = PdfDocument::new(&title, PAGE_WIDTH, PAGE_HEIGHT, "ticket");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let mono = doc.add_builtin_font(BuiltinFont::CourierBold)?;

    let layer = doc.get_page(page).get_layer(layer);
    let mut cursor = Cursor {
        layer: &layer,
        y: PAGE_HEIGHT.0 - MARGIN - 6.0,
    };
    cursor.line(&content.event_name, 16.0, &bold, 9.0);
    cursor.line(&content.starts_at, 10.0, &regular, 6.0);
    cursor.line(&content.venue, 10.0, &regular, 14.0);
    cursor.line("Participante", 8.0, &regular, 5.0);
    cursor.line(&content.attendee, 13.0, &bold, 7.0);
    if let Some(cpf) = &content.cpf {
        cursor.line(&format!("CPF {cpf}"), 9.0, &regular, 6.0);
    }
    cursor.line(&content.ticket_type, 10.0, &regular, 16.0);
    cursor.line("Código de acesso", 8.0, &regular, 7.0);
    cursor.line(&content.qr_token, 18.0, &mono, 7.0);

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn renders_pdf_bytes() {
        let content = TicketContent {
            event_name: "Festival de Inverno".to_string(),
            starts_at: "20/07/2026 19:00 UTC".to_string(),
            venue: "Parque Central".to_string(),
            attendee: "Carla Souza".to_string(),
            cpf: Some("***.456.789-**".to_string()),
            ticket_type: "VIP".to_string(),
            qr_token: "EVT-7F3K9Q2M".to_string(),
        };
        let pdf = render_ticket(&content).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert!(pdf.len() > 500);
    }
}
