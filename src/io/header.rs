//! Tolerant reader for ENVI-style plain-text headers.
//!
//! Headers are `key = value` lines where a value may be a brace-delimited
//! list spanning several lines. The scanner never fails: malformed entries
//! are skipped, and anything that cannot be interpreted is reported through
//! [`HeaderInfo::issues`] while the corresponding field stays `None`.
use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use crate::types::{NANOMETERS, WavelengthInfo};

/// Marker phrases announcing an onboard rational polynomial geolocation model
const GEOLOCATION_MARKERS: [&str; 2] = ["rpc info", "rational polynomial coefficients"];

/// Fields derived from a header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderInfo {
    pub wavelength: Option<WavelengthInfo>,
    pub has_geolocation_model: bool,
    /// Problems met while interpreting the header
    pub issues: Vec<String>,
}

/// Raw `key = value` entries; keys are lower-cased with single spaces
#[derive(Debug, Clone, Default)]
pub struct HeaderEntries {
    entries: HashMap<String, String>,
}

impl HeaderEntries {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&normalize_key(key)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split header text into entries. Brace values lose their braces.
pub fn scan(text: &str) -> (HeaderEntries, Vec<String>) {
    let mut entries = HashMap::new();
    let mut issues = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = normalize_key(key);
        if key.is_empty() {
            continue;
        }
        let mut value = value.trim().to_string();
        if let Some(rest) = value.strip_prefix('{') {
            let mut body = rest.to_string();
            let mut closed = body.contains('}');
            while !closed {
                match lines.next() {
                    Some(next) => {
                        body.push('\n');
                        body.push_str(next);
                        closed = next.contains('}');
                    }
                    None => break,
                }
            }
            if !closed {
                issues.push(format!("unterminated value for key '{}'", key));
                continue;
            }
            let end = body.find('}').unwrap_or(body.len());
            value = body[..end].trim().to_string();
        }
        entries.insert(key, value);
    }

    (HeaderEntries { entries }, issues)
}

/// Interpret header text. Never fails; see [`HeaderInfo::issues`].
pub fn parse(text: &str) -> HeaderInfo {
    let (entries, mut issues) = scan(text);

    let wavelength = match entries.get("wavelength") {
        Some(raw) => {
            let units = entries.get("wavelength units").unwrap_or(NANOMETERS);
            match parse_list(raw).and_then(|values| normalize_units(values, units)) {
                Ok(info) => {
                    info!("Detected wavelength info: {} bands", info.wavelengths.len());
                    Some(info)
                }
                Err(e) => {
                    issues.push(e);
                    None
                }
            }
        }
        None => None,
    };

    let lowered = text.to_lowercase();
    let has_geolocation_model = GEOLOCATION_MARKERS.iter().any(|m| lowered.contains(m));
    if has_geolocation_model {
        info!("Detected onboard geolocation model");
    }

    for issue in &issues {
        warn!("HeaderError: {}", issue);
    }

    HeaderInfo {
        wavelength,
        has_geolocation_model,
        issues,
    }
}

/// Read and interpret a header file. An unreadable file yields empty info.
pub fn read(path: &Path) -> HeaderInfo {
    match std::fs::read_to_string(path) {
        Ok(text) => parse(&text),
        Err(e) => {
            let issue = format!("cannot read header {}: {}", path.display(), e);
            warn!("HeaderError: {}", issue);
            HeaderInfo {
                issues: vec![issue],
                ..HeaderInfo::default()
            }
        }
    }
}

fn parse_list(raw: &str) -> Result<Vec<f64>, String> {
    let values = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| format!("non-numeric wavelength entry '{}'", s))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Err("empty wavelength list".into());
    }
    Ok(values)
}

/// Convert a wavelength list to nanometers
pub fn normalize_units(values: Vec<f64>, units: &str) -> Result<WavelengthInfo, String> {
    let factor = match units.trim().to_lowercase().as_str() {
        "nanometers" | "nanometer" | "nm" => 1.0,
        "micrometers" | "micrometer" | "microns" | "um" | "µm" => 1000.0,
        other => return Err(format!("unsupported wavelength units '{}'", other)),
    };
    Ok(WavelengthInfo {
        wavelengths: values.into_iter().map(|v| v * factor).collect(),
        units: NANOMETERS.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GF5_HEADER: &str = "ENVI
description = {
  GF5 AHSI scene}
samples = 2048
lines   = 2100
bands   = 3
wavelength units = Micrometers
wavelength = {
 0.39, 0.3943,
 0.3986}
";

    #[test]
    fn micrometers_are_converted() {
        let info = parse(GF5_HEADER);
        let wl = info.wavelength.unwrap();
        assert_eq!(wl.units, "Nanometers");
        assert_eq!(wl.wavelengths.len(), 3);
        assert_relative_eq!(wl.wavelengths[0], 390.0, epsilon = 1e-9);
        assert_relative_eq!(wl.wavelengths[1], 394.3, epsilon = 1e-9);
        assert_relative_eq!(wl.wavelengths[2], 398.6, epsilon = 1e-9);
        assert!(info.issues.is_empty());
    }

    #[test]
    fn nanometers_are_unchanged() {
        let info = parse("wavelength units = Nanometers\nwavelength = {450.5, 550, 650}\n");
        assert_eq!(info.wavelength.unwrap().wavelengths, vec![450.5, 550.0, 650.0]);
    }

    #[test]
    fn units_default_to_nanometers() {
        let info = parse("wavelength = { 443, 490 }");
        let wl = info.wavelength.unwrap();
        assert_eq!(wl.units, NANOMETERS);
        assert_eq!(wl.wavelengths, vec![443.0, 490.0]);
    }

    #[test]
    fn missing_block_gives_no_wavelengths() {
        let info = parse("ENVI\nsamples = 10\nlines = 10\nbands = 4\n");
        assert!(info.wavelength.is_none());
        assert!(!info.has_geolocation_model);
        assert!(info.issues.is_empty());
    }

    #[test]
    fn garbage_entry_is_contained() {
        let info = parse("wavelength = {450, abc, 650}\n");
        assert!(info.wavelength.is_none());
        assert_eq!(info.issues.len(), 1);
    }

    #[test]
    fn unterminated_list_is_contained() {
        let info = parse("wavelength = {450, 550,\n 650\nbands = 3\n");
        assert!(info.wavelength.is_none());
        assert!(!info.issues.is_empty());
    }

    #[test]
    fn unknown_units_are_rejected() {
        let info = parse("wavelength units = Index\nwavelength = {1, 2}\n");
        assert!(info.wavelength.is_none());
    }

    #[test]
    fn geolocation_markers_are_case_insensitive() {
        assert!(parse("RPC Info = {\n LINE_OFF: 1}\n").has_geolocation_model);
        assert!(parse("; Rational Polynomial Coefficients follow\n").has_geolocation_model);
        assert!(!parse("map info = {UTM, 1, 1}\n").has_geolocation_model);
    }

    #[test]
    fn keys_are_normalized() {
        let (entries, _) = scan("Wavelength   Units = um\nmap info = {UTM, 1.0, 1.0}\n");
        assert_eq!(entries.get("wavelength units"), Some("um"));
        assert_eq!(entries.get("MAP INFO"), Some("UTM, 1.0, 1.0"));
    }

    #[test]
    fn unreadable_file_degrades() {
        let info = read(Path::new("/nonexistent/dir/scene.hdr"));
        assert!(info.wavelength.is_none());
        assert_eq!(info.issues.len(), 1);
    }
}
