use semver::Version;
use serde::{Deserialize, Deserializer};

/// Parses a version string the way theme and plugin headers write them.
///
/// A leading `v` is ignored and missing minor/patch components are padded
/// with zeros, so `"2.1"` becomes `2.1.0`. Numeric components past the patch
/// number move into build metadata (`"1.0.0.1"` becomes `1.0.0+1`), which
/// semver orders numerically after the release triple. Anything semver still
/// rejects is an error.
pub fn parse_lenient(raw: &str) -> Result<Version, semver::Error> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);
    let parts: Vec<&str> = core.split('.').collect();

    if parts.len() <= 3 {
        let mut normalized = core.to_string();
        for _ in parts.len()..3 {
            normalized.push_str(".0");
        }
        normalized.push_str(suffix);
        return Version::parse(&normalized);
    }

    let (release, tail) = parts.split_at(3);
    let numeric_tail = tail
        .iter()
        .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    if !numeric_tail {
        return Version::parse(trimmed);
    }

    let (pre, build) = match suffix.split_once('+') {
        Some((pre, build)) => (pre, Some(build)),
        None => (suffix, None),
    };
    let mut normalized = format!("{}{}+{}", release.join("."), pre, tail.join("."));
    if let Some(build) = build {
        normalized.push('.');
        normalized.push_str(build);
    }
    Version::parse(&normalized)
}

/// Manifest versions arrive as strings or as bare JSON numbers (`1.1`).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Text(String),
    Number(serde_json::Number),
}

/// Serde adapter for optional minimum-version fields in the manifest.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<Version>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<RawVersion>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(RawVersion::Text(s)) => s,
        Some(RawVersion::Number(n)) => n.to_string(),
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_lenient(&raw)
        .map(Some)
        .map_err(|e| serde::de::Error::custom(format!("invalid version '{}': {}", raw, e)))
}
