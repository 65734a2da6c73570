//! MIME guesses for the editor's language mode

use std::path::Path;

const DEFAULT_MIME: &str = "text/plain";

/// Extension (lowercase, no dot) to MIME type
const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("rs", "text/x-rust"),
    ("py", "text/x-python"),
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("jsx", "text/javascript-jsx"),
    ("ts", "text/typescript"),
    ("tsx", "text/typescript-jsx"),
    ("go", "text/x-go"),
    ("java", "text/x-java"),
    ("c", "text/x-c"),
    ("h", "text/x-c"),
    ("cpp", "text/x-c++"),
    ("cc", "text/x-c++"),
    ("hpp", "text/x-c++"),
    ("cs", "text/x-csharp"),
    ("rb", "text/x-ruby"),
    ("php", "text/x-php"),
    ("swift", "text/x-swift"),
    ("kt", "text/x-kotlin"),
    ("sh", "text/x-shellscript"),
    ("bash", "text/x-shellscript"),
    ("sql", "text/x-sql"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("scss", "text/x-scss"),
    ("xml", "application/xml"),
    ("json", "application/json"),
    ("yaml", "text/x-yaml"),
    ("yml", "text/x-yaml"),
    ("toml", "text/x-toml"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("svg", "image/svg+xml"),
];

/// Guess MIME type based on file name; unknown names are plain text
pub fn guess_mime_from_name(filename: &str) -> String {
    let lower = filename.to_lowercase();

    match lower.as_str() {
        "dockerfile" => return "text/x-dockerfile".to_string(),
        "makefile" => return "text/x-makefile".to_string(),
        _ => {}
    }
    if lower.starts_with(".env") {
        return "text/x-env".to_string();
    }

    let ext = Path::new(&lower)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    EXTENSION_TABLE
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME)
        .to_string()
}
