use crate::scheduling::{Appointment, Patient};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::io::BufWriter;
use thiserror::Error;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const LEFT_MARGIN: Mm = Mm(20.0);
const WRAP_CHARS: usize = 85;
const TOP_Y: f32 = 270.0;
const BOTTOM_Y: f32 = 20.0;
const LINE_HEIGHT: f32 = 5.0;
// lowest baseline a description line may use on the page that carries the signature
const SIGNATURE_CLEARANCE_Y: f32 = 45.0;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("certificate description is empty")]
    EmptyDescription,
    #[error("pdf rendering failed: {0}")]
    Render(String),
}

/// Everything printed on a medical certificate.
#[derive(Debug, Clone)]
pub struct CertificateRequest<'a> {
    pub patient: &'a Patient,
    pub appointment: &'a Appointment,
    pub facility_name: &'a str,
    pub description: &'a str,
    pub signer: &'a str,
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars.max(1)) {
                let piece: String = piece.iter().collect();
                let piece_len = piece.chars().count();
                if !current.is_empty() && current.chars().count() + piece_len + 1 > max_chars {
                    lines.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&piece);
            }
        }
        lines.push(current);
    }
    lines
}

/// Where each description line goes: (page index, baseline in mm).
///
/// Lines flow onto new pages at the bottom margin. The signature block sits on
/// the page after the last line when that line leaves no room for it.
#[derive(Debug, Clone, PartialEq)]
struct Layout {
    lines: Vec<(usize, f32)>,
    signature_page: usize,
}

fn layout_lines(first_y: f32, line_count: usize) -> Layout {
    let mut page = 0;
    let mut y = first_y;
    let mut lines = Vec::with_capacity(line_count);
    for _ in 0..line_count {
        if y < BOTTOM_Y {
            page += 1;
            y = TOP_Y;
        }
        lines.push((page, y));
        y -= LINE_HEIGHT;
    }
    let signature_page = match lines.last() {
        Some(&(last_page, last_y)) if last_y < SIGNATURE_CLEARANCE_Y => last_page + 1,
        Some(&(last_page, _)) => last_page,
        None => 0,
    };
    Layout {
        lines,
        signature_page,
    }
}

/// Renders an A4 certificate and returns the PDF bytes. Long descriptions
/// continue on further pages.
pub fn render_certificate(request: &CertificateRequest<'_>) -> Result<Vec<u8>, CertificateError> {
    let description = request.description.trim();
    if description.is_empty() {
        return Err(CertificateError::EmptyDescription);
    }

    let render = |e: printpdf::Error| CertificateError::Render(e.to_string());
    let title = "Atestado Médico";
    let (doc, page, layer) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(render)?;

    let mut y = Mm(TOP_Y);
    layer.use_text(title, 18.0, LEFT_MARGIN, y, &bold);
    y -= Mm(14.0);

    let patient = request.patient;
    layer.use_text("PACIENTE", 11.0, LEFT_MARGIN, y, &bold);
    y -= Mm(6.0);
    for line in [
        format!("Nome: {}", patient.name),
        format!("Idade: {}", patient.age),
        format!("Endereço: {}", patient.address),
    ] {
        layer.use_text(line, 10.0, LEFT_MARGIN, y, &font);
        y -= Mm(5.0);
    }
    y -= Mm(6.0);

    layer.use_text("CONSULTA", 11.0, LEFT_MARGIN, y, &bold);
    y -= Mm(6.0);
    for line in [
        format!(
            "Data: {}",
            request.appointment.scheduled_at.format("%d/%m/%Y %H:%M")
        ),
        format!("Unidade: {}", request.facility_name),
        format!("Urgência: {}", request.appointment.urgency),
    ] {
        layer.use_text(line, 10.0, LEFT_MARGIN, y, &font);
        y -= Mm(5.0);
    }
    y -= Mm(6.0);

    layer.use_text("DESCRIÇÃO", 11.0, LEFT_MARGIN, y, &bold);
    y -= Mm(6.0);

    let lines = wrap_text(description, WRAP_CHARS);
    let layout = layout_lines(y.0, lines.len());
    let mut layers = vec![layer];
    let mut page_layer = |index: usize| {
        while layers.len() <= index {
            let (page, layer) = doc.add_page(
                PAGE_WIDTH,
                PAGE_HEIGHT,
                format!("Layer {}", layers.len() + 1),
            );
            layers.push(doc.get_page(page).get_layer(layer));
        }
        layers[index].clone()
    };
    for (line, &(page, line_y)) in lines.into_iter().zip(&layout.lines) {
        page_layer(page).use_text(line, 10.0, LEFT_MARGIN, Mm(line_y), &font);
    }

    let signature = page_layer(layout.signature_page);
    signature.use_text("________________________________", 10.0, LEFT_MARGIN, Mm(35.0), &font);
    signature.use_text(request.signer, 10.0, LEFT_MARGIN, Mm(29.0), &bold);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(render)?;
    buf.into_inner()
        .map_err(|e| CertificateError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn fixtures() -> (Patient, Appointment) {
        let patient = Patient {
            id: 1,
            name: "Maria Silva".to_string(),
            age: "42".to_string(),
            address: "Praça da Sé, São Paulo".to_string(),
            phone: None,
            symptoms: None,
            registered_at: Utc::now(),
        };
        let appointment = Appointment {
            id: 9,
            patient_id: 1,
            facility_id: 3,
            scheduled_at: NaiveDate::from_ymd_opt(2026, 10, 20)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            urgency: "alta".to_string(),
            created_at: Utc::now(),
        };
        (patient, appointment)
    }

    #[test]
    fn renders_a_pdf() {
        let (patient, appointment) = fixtures();
        let bytes = render_certificate(&CertificateRequest {
            patient: &patient,
            appointment: &appointment,
            facility_name: "UBS Sé",
            description: "Atesto para os devidos fins que o paciente esteve em consulta.",
            signer: "Dra. Ana Souza",
        })
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn blank_description_is_rejected() {
        let (patient, appointment) = fixtures();
        let result = render_certificate(&CertificateRequest {
            patient: &patient,
            appointment: &appointment,
            facility_name: "UBS Sé",
            description: "  \n ",
            signer: "Dra. Ana Souza",
        });
        assert!(matches!(result, Err(CertificateError::EmptyDescription)));
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("um dois tres quatro\ncinco", 9);
        assert_eq!(lines, vec!["um dois", "tres", "quatro", "cinco"]);
    }

    #[test]
    fn words_longer_than_a_line_are_split() {
        let lines = wrap_text("ab abcdefghijk", 4);
        assert_eq!(lines, vec!["ab", "abcd", "efgh", "ijk"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 4));
    }

    #[test]
    fn every_description_line_is_placed() {
        let layout = layout_lines(180.0, 60);
        assert_eq!(layout.lines.len(), 60);
        assert!(layout.lines.iter().all(|&(_, y)| (BOTTOM_Y..=TOP_Y).contains(&y)));
        // 180 mm down to the bottom margin holds 33 lines
        assert_eq!(layout.lines[32].0, 0);
        assert_eq!(layout.lines[33], (1, TOP_Y));
        assert_eq!(layout.lines[59].0, 1);
        assert_eq!(layout.signature_page, 1);
    }

    #[test]
    fn signature_moves_to_a_new_page_when_crowded() {
        let layout = layout_lines(180.0, 30);
        assert_eq!(layout.lines.last().map(|l| l.0), Some(0));
        assert_eq!(layout.signature_page, 1);
        assert_eq!(layout_lines(180.0, 3).signature_page, 0);
    }

    #[test]
    fn long_description_renders() {
        let (patient, appointment) = fixtures();
        let description: Vec<String> = (0..60).map(|i| format!("LINHA{i:02}")).collect();
        let bytes = render_certificate(&CertificateRequest {
            patient: &patient,
            appointment: &appointment,
            facility_name: "UBS Sé",
            description: &description.join("\n"),
            signer: "Dra. Ana Souza",
        })
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
