//! Byte-exact PDF fixtures shared by the integration tests.
#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Objects `1..=n` with a classic cross-reference table and correct offsets.
///
/// `trailer_extra` is spliced into the trailer after `/Size` and `/Root 1 0 R`.
pub fn build_pdf(objects: &[&str], trailer_extra: &str) -> Vec<u8> {
    let mut out = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R {}>>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            trailer_extra,
            xref
        )
        .as_bytes(),
    );
    out
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("writing to a Vec cannot fail");
    encoder.finish().expect("writing to a Vec cannot fail")
}

/// PDF 1.5 layout: `plain` objects are `1..=p`, `packed` objects `p+1..=p+k`
/// live in a FlateDecode object stream, followed by the object stream itself
/// and a cross-reference stream.
pub fn build_compressed_pdf(plain: &[&str], packed: &[&str]) -> Vec<u8> {
    let objstm_id = plain.len() + packed.len() + 1;
    let xref_id = objstm_id + 1;

    let mut out = b"%PDF-1.5\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in plain.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let mut header = String::new();
    let mut bodies = String::new();
    for (i, body) in packed.iter().enumerate() {
        header.push_str(&format!("{} {} ", plain.len() + 1 + i, bodies.len()));
        bodies.push_str(body);
        bodies.push('\n');
    }
    let first = header.len();
    let compressed = deflate(format!("{}{}", header, bodies).as_bytes());
    let objstm_offset = out.len();
    out.extend_from_slice(
        format!(
            "{} 0 obj\n<< /Type /ObjStm /N {} /First {} /Filter /FlateDecode /Length {} >>\nstream\n",
            objstm_id,
            packed.len(),
            first,
            compressed.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&compressed);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_offset = out.len();
    let mut rows = vec![0u8, 0, 0, 0, 0, 0xFF, 0xFF];
    let mut row = |kind: u8, field2: u32, field3: u16| {
        rows.push(kind);
        rows.extend_from_slice(&field2.to_be_bytes());
        rows.extend_from_slice(&field3.to_be_bytes());
    };
    for offset in &offsets {
        row(1, *offset as u32, 0);
    }
    for index in 0..packed.len() {
        row(2, objstm_id as u32, index as u16);
    }
    row(1, objstm_offset as u32, 0);
    row(1, xref_offset as u32, 0);

    out.extend_from_slice(
        format!(
            "{} 0 obj\n<< /Type /XRef /Size {} /W [1 4 2] /Root 1 0 R /Length {} >>\nstream\n",
            xref_id,
            xref_id + 1,
            rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rows);
    out.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());
    out
}

/// Catalog, page tree and one page whose annotations are `annots`.
fn page_objects(annots: &str, acroform: &str) -> [String; 3] {
    [
        format!("<< /Type /Catalog /Pages 2 0 R /AcroForm {} >>", acroform),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Annots [{}] >>", annots),
    ]
}

/// A form exercising every kind of field.
///
/// | name           | type   | widgets | value   |
/// |----------------|--------|---------|---------|
/// | `address.city` | text   | 1       | `Ndola` |
/// | `address.zip`  | text   | 1       | none    |
/// | `color`        | radio  | 2       | `/Red`  |
/// | `agree`        | check  | 1       | `/Off`  |
/// | `fruit`        | choice | 1       | `Pear`  |
/// | `phone`        | text   | 2       | `555`   |
///
/// Object 14 is the info dictionary and object 13 an empty appearance stream.
pub fn form_pdf() -> Vec<u8> {
    let [catalog, pages, page] = page_objects("6 0 R 7 0 R 9 0 R 10 0 R 11 0 R 12 0 R 16 0 R", "4 0 R");
    build_pdf(
        &[
            &catalog,
            &pages,
            &page,
            "<< /Fields [5 0 R 8 0 R 11 0 R 12 0 R 15 0 R] /DA (/Helv 0 Tf 0 g) >>",
            "<< /T (address) /FT /Tx /Kids [6 0 R 7 0 R] >>",
            "<< /T (city) /TU (City of residence) /Parent 5 0 R /V (Ndola) /Subtype /Widget /Rect [10 10 200 30] >>",
            "<< /T (zip) /Parent 5 0 R /Ff 4096 /Subtype /Widget /Rect [10 40 200 60] >>",
            "<< /T (color) /FT /Btn /Ff 49152 /V /Red /Kids [9 0 R 10 0 R] >>",
            "<< /Parent 8 0 R /Subtype /Widget /AS /Red /AP << /N << /Red 13 0 R /Off 13 0 R >> >> /Rect [10 70 20 80] >>",
            "<< /Parent 8 0 R /Subtype /Widget /AS /Off /AP << /N << /Off 13 0 R /Blue 13 0 R >> >> /Rect [30 70 40 80] >>",
            "<< /T (agree) /FT /Btn /V /Off /AS /Off /Subtype /Widget /AP << /N << /Yes 13 0 R /Off 13 0 R >> >> >>",
            "<< /T (fruit) /FT /Ch /Ff 131072 /V (Pear) /Opt [(Apple) [(p) (Pear)]] /Subtype /Widget >>",
            "<< /Length 0 >>\nstream\n\nendstream",
            "<< /Title (Membership form) /Producer (fixture) >>",
            "<< /T (phone) /FT /Tx /V (555) /Kids [16 0 R 17 0 R] >>",
            "<< /Parent 15 0 R /Subtype /Widget /Rect [10 90 100 110] >>",
            "<< /Parent 15 0 R /Subtype /Widget /Rect [10 120 100 140] /P 3 0 R >>",
        ],
        "/Info 14 0 R ",
    )
}

/// The fields of a small form stored in a compressed object stream.
///
/// Objects 1-4 are plain, 4 being the text field `city`; the field
/// dictionaries 5 (`name`, text) and 6 (`agree`, check box) are packed.
pub fn compressed_form_pdf() -> Vec<u8> {
    let [catalog, pages, page] = page_objects("4 0 R 5 0 R 6 0 R", "<< /Fields [4 0 R 5 0 R 6 0 R] >>");
    build_compressed_pdf(
        &[&catalog, &pages, &page, "<< /T (city) /FT /Tx /V (Ndola) /Subtype /Widget >>"],
        &[
            "<< /T (name) /FT /Tx /V (Ann) /Subtype /Widget >>",
            "<< /T (agree) /FT /Btn /V /Yes /AS /Yes /Subtype /Widget /AP << /N << /Yes 0 /Off 0 >> >> >>",
        ],
    )
}
