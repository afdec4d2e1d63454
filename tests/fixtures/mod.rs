//! Sample inputs for workflow tests

use heirloom_restore::InputCandidate;

/// Start of a JFIF file; enough for magic-byte sniffing.
pub const JPEG_BYTES: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
];

pub const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";

pub fn jpeg_candidate(file_name: &str) -> InputCandidate {
    InputCandidate::new(file_name, "image/jpeg", JPEG_BYTES)
}

pub fn png_candidate(file_name: &str) -> InputCandidate {
    InputCandidate::new(file_name, "image/png", PNG_BYTES)
}

pub fn pdf_candidate() -> InputCandidate {
    InputCandidate::new("scan.pdf", "application/pdf", PDF_BYTES)
}
