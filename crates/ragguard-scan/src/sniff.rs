/// Every PDF starts with this header (ISO 32000-1, 7.5.2).
pub const PDF_MAGIC: &[u8] = b"%PDF-";

pub fn has_pdf_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("pdf"))
}

pub fn looks_like_pdf(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC)
}

/// An upload is accepted as a PDF only when both the name and the content agree.
pub fn is_pdf(file_name: &str, data: &[u8]) -> bool {
    has_pdf_extension(file_name) && looks_like_pdf(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check() {
        assert!(has_pdf_extension("statement.pdf"));
        assert!(has_pdf_extension("STATEMENT.PDF"));
        assert!(has_pdf_extension("archive.tar.pdf"));
        assert!(!has_pdf_extension("statement.docx"));
        assert!(!has_pdf_extension("pdf"));
        assert!(!has_pdf_extension(".pdf"));
    }

    #[test]
    fn content_check() {
        assert!(looks_like_pdf(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3"));
        assert!(!looks_like_pdf(b"MZ\x90\x00"));
        assert!(!looks_like_pdf(b""));
    }

    #[test]
    fn renamed_executable_is_not_a_pdf() {
        assert!(!is_pdf("evidence.pdf", b"MZ\x90\x00\x03"));
        assert!(!is_pdf("evidence.exe", b"%PDF-1.4"));
        assert!(is_pdf("evidence.pdf", b"%PDF-1.4"));
    }
}
