//! Textual patching of the generated map document.
//!
//! The map generator gives no templating hooks, so the patch works on literal
//! markers in its output: the `</head>` tag, the `var map_…` and
//! `var lat_lng_popup_…` declarations, and the default `latLngPop` click
//! handler. Every lookup is first-occurrence, case- and whitespace-sensitive,
//! and a missing marker is a [`PatchError`] rather than a corrupted document.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::error::PatchError;

pub const HEAD_CLOSE: &str = "</head>";
pub const HANDLER_SIGNATURE: &str = "function latLngPop(e)";
pub const MAP_PREFIX: &str = "map_";
pub const POPUP_PREFIX: &str = "lat_lng_popup_";

const VAR_KEYWORD: &str = "var ";
const ASSIGN: &str = " =";

/// Byte range `[start, end)` inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOptions {
    /// Port the injected buttons post to.
    pub port: u16,
    /// Stylesheet href linked from the document head.
    pub stylesheet: String,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self { port: 3001, stylesheet: "styles.css".to_string() }
    }
}

/// Index of the first `</head>`.
pub fn find_head_close(html: &str) -> Result<usize, PatchError> {
    html.find(HEAD_CLOSE).ok_or_else(|| PatchError::MarkerNotFound(HEAD_CLOSE.to_string()))
}

/// Name declared by the first `var <prefix>…` statement, up to the next ` =`.
pub fn find_variable_name<'a>(html: &'a str, prefix: &str) -> Result<&'a str, PatchError> {
    let pattern = format!("{VAR_KEYWORD}{prefix}");
    let start = html
        .find(&pattern)
        .ok_or_else(|| PatchError::MarkerNotFound(pattern.clone()))?
        + VAR_KEYWORD.len();

    let len = html[start..].find(ASSIGN).ok_or(PatchError::UnterminatedVariable(pattern))?;

    Ok(&html[start..start + len])
}

/// One past the `}` that closes the first brace group in `text`.
///
/// Depth starts at zero and the scan stops the first time it returns to zero
/// after an opening brace. `None` if no group opens or it never closes.
pub fn matching_brace_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut opened = false;

    for (index, byte) in text.bytes().enumerate() {
        match byte {
            b'{' => {
                depth += 1;
                opened = true;
            }
            b'}' if opened => {
                depth -= 1;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Span of the default click handler, from its signature to its closing brace.
pub fn find_handler_span(html: &str) -> Result<Span, PatchError> {
    let start = html
        .find(HANDLER_SIGNATURE)
        .ok_or_else(|| PatchError::MarkerNotFound(HANDLER_SIGNATURE.to_string()))?;

    let len = matching_brace_end(&html[start..]).ok_or(PatchError::UnbalancedBraces(start))?;

    Ok(Span { start, end: start + len })
}

pub fn stylesheet_link(href: &str) -> String {
    format!("    <link href=\"{href}\" rel=\"stylesheet\">\n")
}

const CUSTOM_HANDLER: &str = r#"
            // weathermap click handler
            function latLngPop(e) {
                %POPUP%
                    .setLatLng(e.latlng)
                    .setContent(`
                    <div class="popup-container">
                        <p class="popup-title"> Coordinates: </p>
                        <p class="popup-coordinates">
                            Lat: ${e.latlng.lat.toFixed(5)}, Long: ${e.latlng.lng.toFixed(5)}
                        </p>
                        <button class="popup-button"
                            onClick="
                            fetch('http://localhost:%PORT%', {
                                method: 'POST',
                                mode: 'no-cors',
                                headers: {
                                    'Accept': 'application/json',
                                    'Content-Type': 'application/json'
                                },
                                body: JSON.stringify({
                                    latitude: ${e.latlng.lat},
                                    longitude: ${e.latlng.lng}
                                })
                            });
                            L.marker(
                                [${e.latlng.lat.toFixed(5)}, ${e.latlng.lng.toFixed(5)}],
                                {}
                            ).addTo(%MAP%);
                        "> Get Weather </button>
                        <button class="quit-button"
                            onClick="
                            fetch('http://localhost:%PORT%', {
                                method: 'POST',
                                mode: 'no-cors',
                                headers: {
                                    'Accept': 'application/json',
                                    'Content-Type': 'application/json'
                                },
                                body: 'q'
                            });
                        "> Quit </button>
                    </div>
                    `)
                    .openOn(%MAP%);
            }
            // end weathermap click handler
    "#;

/// Replacement click handler wired to the local callback server.
pub fn custom_handler(popup_name: &str, map_name: &str, port: u16) -> String {
    CUSTOM_HANDLER
        .replace("%POPUP%", popup_name)
        .replace("%MAP%", map_name)
        .replace("%PORT%", &port.to_string())
}

/// Insert the stylesheet link and swap in the custom click handler.
///
/// Everything outside the two patched spots is copied through unchanged.
pub fn patch_document(html: &str, options: &PatchOptions) -> Result<String, PatchError> {
    let map_name = find_variable_name(html, MAP_PREFIX)?;
    let popup_name = find_variable_name(html, POPUP_PREFIX)?;
    let head = find_head_close(html)?;
    let handler = find_handler_span(html)?;

    if handler.start < head {
        return Err(PatchError::HandlerBeforeHead { head, handler: handler.start });
    }

    debug!(map = map_name, popup = popup_name, head, ?handler, "patch points located");

    let link = stylesheet_link(&options.stylesheet);
    let replacement = custom_handler(popup_name, map_name, options.port);

    let mut out = String::with_capacity(html.len() + link.len() + replacement.len());
    out.push_str(&html[..head]);
    out.push_str(&link);
    out.push_str(&html[head..handler.start]);
    out.push_str(&replacement);
    out.push_str(&html[handler.end..]);

    Ok(out)
}

/// Patch the map document at `path` in place.
///
/// The file is left untouched when a marker is missing.
pub fn patch_file(path: &Path, options: &PatchOptions) -> Result<()> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("Failed to read map document: {}", path.display()))?;

    let patched = patch_document(&html, options)
        .with_context(|| format!("Failed to patch map document: {}", path.display()))?;

    fs::write(path, patched)
        .with_context(|| format!("Failed to write map document: {}", path.display()))?;

    info!(path = %path.display(), port = options.port, "map document patched");
    Ok(())
}
