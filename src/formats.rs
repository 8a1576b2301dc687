//! Turns engine format listings into the short, display-ready list exposed by
//! the API.

use std::collections::HashSet;

use crate::engine::{Height, RawFormat};
use crate::metadata::{FormatOption, MAX_FORMATS, UNKNOWN_FILESIZE};

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Renders a byte count as `500 B`, `2.0 KB`, `5.0 MB` or `3.0 GB`.
/// Absent and zero sizes are reported as `Unknown`.
pub fn format_filesize(size: Option<f64>) -> String {
    let size = match size {
        Some(size) if size > 0.0 => size,
        _ => return UNKNOWN_FILESIZE.to_owned(),
    };

    if size < KIB {
        format!("{size} B")
    } else if size < MIB {
        format!("{:.1} KB", size / KIB)
    } else if size < GIB {
        format!("{:.1} MB", size / MIB)
    } else {
        format!("{:.1} GB", size / GIB)
    }
}

/// Dedup key and display label for a format's height.
fn quality_marker(height: Option<&Height>) -> String {
    match height {
        Some(Height::Pixels(px)) => format!("{px}p"),
        Some(Height::Label(label)) => label.clone(),
        None => "Unknown".to_owned(),
    }
}

/// Keeps video-bearing formats, first occurrence per quality, capped at
/// [`MAX_FORMATS`]. Never returns an empty list.
pub fn normalize_formats(raw: &[RawFormat]) -> Vec<FormatOption> {
    let mut seen = HashSet::new();
    let mut options = Vec::new();

    for format in raw {
        // Audio-only streams report the literal codec "none". A missing codec
        // is kept: some extractors never fill it in for muxed files.
        if format.vcodec.as_deref() == Some("none") {
            continue;
        }

        let quality = quality_marker(format.height.as_ref());
        if !seen.insert(quality.clone()) {
            continue;
        }

        let ext = format.ext.clone().unwrap_or_else(|| "mp4".to_owned());
        let filesize = format_filesize(format.filesize.or(format.filesize_approx));
        options.push(FormatOption::new(quality, ext, filesize));
    }

    options.truncate(MAX_FORMATS);
    if options.is_empty() {
        options.push(FormatOption::best_effort());
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(height: u64, ext: &str, size: Option<f64>) -> RawFormat {
        RawFormat {
            height: Some(Height::Pixels(height)),
            vcodec: Some("avc1.64001F".into()),
            ext: Some(ext.into()),
            filesize: size,
            filesize_approx: None,
        }
    }

    fn audio() -> RawFormat {
        RawFormat {
            height: None,
            vcodec: Some("none".into()),
            ext: Some("m4a".into()),
            filesize: Some(4096.0),
            filesize_approx: None,
        }
    }

    #[test]
    fn filesize_thresholds() {
        assert_eq!(format_filesize(None), "Unknown");
        assert_eq!(format_filesize(Some(0.0)), "Unknown");
        assert_eq!(format_filesize(Some(500.0)), "500 B");
        assert_eq!(format_filesize(Some(1023.0)), "1023 B");
        assert_eq!(format_filesize(Some(1024.0)), "1.0 KB");
        assert_eq!(format_filesize(Some(2048.0)), "2.0 KB");
        assert_eq!(format_filesize(Some(5_242_880.0)), "5.0 MB");
        assert_eq!(format_filesize(Some(3_221_225_472.0)), "3.0 GB");
        assert_eq!(format_filesize(Some(1_572_864.0)), "1.5 MB");
    }

    #[test]
    fn audio_only_formats_are_dropped_and_heights_deduplicated() {
        let raw = vec![
            audio(),
            video(360, "mp4", Some(2048.0)),
            video(360, "webm", Some(4096.0)),
            video(720, "webm", None),
        ];

        let options = normalize_formats(&raw);
        assert_eq!(
            options,
            vec![
                FormatOption::new("360p", "mp4", "2.0 KB"),
                FormatOption::new("720p", "webm", "Unknown"),
            ]
        );
    }

    #[test]
    fn list_is_capped_at_five_distinct_qualities() {
        let raw: Vec<RawFormat> = [144, 240, 360, 480, 720, 1080, 1440]
            .into_iter()
            .map(|h| video(h, "mp4", None))
            .collect();

        let options = normalize_formats(&raw);
        assert_eq!(options.len(), MAX_FORMATS);
        assert_eq!(options[0].quality, "144p");
        assert_eq!(options[4].quality, "720p");
        let unique: HashSet<_> = options.iter().map(|o| o.quality.as_str()).collect();
        assert_eq!(unique.len(), options.len());
    }

    #[test]
    fn missing_heights_share_the_unknown_marker() {
        let raw = vec![
            RawFormat {
                vcodec: None,
                ..RawFormat::default()
            },
            RawFormat {
                ext: Some("flv".into()),
                ..RawFormat::default()
            },
            RawFormat {
                height: Some(Height::Label("HD".into())),
                ext: Some("mp4".into()),
                filesize_approx: Some(1536.0),
                ..RawFormat::default()
            },
        ];

        let options = normalize_formats(&raw);
        assert_eq!(
            options,
            vec![
                FormatOption::new("Unknown", "mp4", "Unknown"),
                FormatOption::new("HD", "mp4", "1.5 KB"),
            ]
        );
    }

    #[test]
    fn empty_or_audio_only_listing_yields_synthetic_best() {
        assert_eq!(normalize_formats(&[]), vec![FormatOption::best_effort()]);
        assert_eq!(
            normalize_formats(&[audio(), audio()]),
            vec![FormatOption::best_effort()]
        );
    }
}
