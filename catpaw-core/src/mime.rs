// File extension to content type mapping

use std::path::Path;

/// Content type used when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Content type of a file, based on its extension.
///
/// ```
/// use catpaw_core::mime::find_content_type;
///
/// assert_eq!(find_content_type("/index.html"), "text/html");
/// assert_eq!(find_content_type("archive.TAR"), "application/x-tar");
/// assert_eq!(find_content_type("README"), "application/octet-stream");
/// ```
pub fn find_content_type(path: &str) -> &'static str {
    match extension(path).as_str() {
        "wasm" => "application/wasm",
        "mkv" => "video/x-matroska",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "ics" => "text/calendar",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "ttf" => "font/ttf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "aac" => "audio/aac",
        "midi" | "mid" => "audio/midi",
        "oga" => "audio/ogg",
        "wav" => "audio/x-wav",
        "weba" => "audio/webm",
        "mp3" => "audio/mpeg",
        "ico" => "image/x-icon",
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "avi" => "video/x-msvideo",
        "mp4" => "video/mp4",
        "mpeg" => "video/mpeg",
        "ogv" => "video/ogg",
        "webm" => "video/webm",
        "3gp" => "video/3gpp",
        "3g2" => "video/3gpp2",
        "abw" => "application/x-abiword",
        "azw" => "application/vnd.amazon.ebook",
        "bz" => "application/x-bzip",
        "bz2" => "application/x-bzip2",
        "csh" => "application/x-csh",
        "doc" => "application/msword",
        "epub" => "application/epub+zip",
        "jar" => "application/java-archive",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "mpkg" => "application/vnd.apple.installer+xml",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ogx" => "application/ogg",
        "pdf" => "application/pdf",
        "ppt" => "application/vnd.ms-powerpoint",
        "rar" => "application/x-rar-compressed",
        "rtf" => "application/rtf",
        "sh" => "application/x-sh",
        "tar" => "application/x-tar",
        "vsd" => "application/vnd.visio",
        "xhtml" => "application/xhtml+xml",
        "xls" => "application/vnd.ms-excel",
        "xml" => "application/xml",
        "xul" => "application/vnd.mozilla.xul+xml",
        "zip" => "application/zip",
        "7z" => "application/x-7z-compressed",
        "apk" => "application/vnd.android.package-archive",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Whether a file should be served with `Content-Disposition: attachment`.
///
/// Browsers render web assets and common media inline; everything else is
/// offered as a download.
pub fn is_attachment(path: &str) -> bool {
    !matches!(
        extension(path).as_str(),
        "css"
            | "weba"
            | "wav"
            | "mp4"
            | "mp3"
            | "jpeg"
            | "jpg"
            | "png"
            | "gif"
            | "ico"
            | "svg"
            | "xhtml"
            | "xml"
            | "md"
            | "wasm"
            | "js"
            | "mjs"
            | "html"
            | "htm"
            | "txt"
            | "json"
            | "webp"
    )
}
