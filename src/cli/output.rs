use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::model::DriveFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_files_table(files: &[DriveFile]) {
    let rule = format!("├{}┼{}┼{}┼{}┤", "─".repeat(6), "─".repeat(46), "─".repeat(18), "─".repeat(36));

    println!("┌{}┬{}┬{}┬{}┐", "─".repeat(6), "─".repeat(46), "─".repeat(18), "─".repeat(36));
    println!("│ {} │ {} │ {} │ {} │", pad("#", 4), pad("Name", 44), pad("Type", 16), pad("ID", 34));
    println!("{}", rule);

    for (i, file) in files.iter().enumerate() {
        println!(
            "│ {} │ {} │ {} │ {} │",
            pad(&(i + 1).to_string(), 4),
            fit(&file.name, 44),
            fit(short_mime(&file.mime_type), 16),
            fit(&file.id, 34)
        );
    }

    println!("└{}┴{}┴{}┴{}┘", "─".repeat(6), "─".repeat(46), "─".repeat(18), "─".repeat(36));
}

/// `application/pdf` → `pdf`, `application/vnd.google-apps.document` → `document`.
fn short_mime(mime: &str) -> &str {
    mime.rsplit(['/', '.']).next().unwrap_or(mime)
}

fn pad(s: &str, width: usize) -> String {
    let visual = s.width();
    format!("{}{}", s, " ".repeat(width.saturating_sub(visual)))
}

/// Truncate to `width` columns with an ellipsis, then pad.
fn fit(s: &str, width: usize) -> String {
    if s.width() <= width {
        return pad(s, width);
    }

    let ellipsis = '…'.width().unwrap_or(1);
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + ellipsis > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    pad(&out, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_pads_short_text() {
        assert_eq!(fit("abc", 5), "abc  ");
    }

    #[test]
    fn test_fit_truncates_by_display_width() {
        let out = fit("主よ御手もて引かせ給え", 9);
        assert_eq!(out.width(), 9);
        assert!(out.contains('…'));
    }

    #[test]
    fn test_short_mime() {
        assert_eq!(short_mime("application/pdf"), "pdf");
        assert_eq!(short_mime("application/vnd.google-apps.document"), "document");
        assert_eq!(short_mime("image/png"), "png");
    }
}
