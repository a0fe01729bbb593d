//! Text rendering of a [WordCountReport](crate::stats::WordCountReport).

use crate::stats::WordCountReport;
use std::fmt::Write;

/// Whether the report is decorated with ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Color,
    Plain,
}

struct Palette {
    header: &'static str,
    total: &'static str,
    arc: &'static str,
    chapter: &'static str,
    percent: &'static str,
    reset: &'static str,
}

const COLOR: Palette = Palette {
    header: "\x1b[1;36m",
    total: "\x1b[1;32m",
    arc: "\x1b[1;33m",
    chapter: "\x1b[0;37m",
    percent: "\x1b[0;36m",
    reset: "\x1b[0m",
};

const PLAIN: Palette = Palette {
    header: "",
    total: "",
    arc: "",
    chapter: "",
    percent: "",
    reset: "",
};

const RULE_WIDTH: usize = 60;

/// Format an integer with comma thousands separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn tree_pipe(i: usize, len: usize) -> &'static str {
    if i + 1 == len {
        "└─"
    } else {
        "├─"
    }
}

/// Render the full report: per-arc breakdown with chapters, then a summary and averages.
pub fn render(report: &WordCountReport, title: &str, style: Style) -> String {
    let p = match style {
        Style::Color => &COLOR,
        Style::Plain => &PLAIN,
    };
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = write_report(&mut out, report, title, p, &heavy, &light);
    out
}

fn write_report(
    out: &mut String,
    report: &WordCountReport,
    title: &str,
    p: &Palette,
    heavy: &str,
    light: &str,
) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "{}", heavy)?;
    writeln!(out, "{}{} Word Count Analysis{}", p.header, title, p.reset)?;
    writeln!(out, "{}", heavy)?;
    writeln!(out)?;
    writeln!(
        out,
        "{}Total Word Count: {}{}",
        p.total,
        group_thousands(report.total_words),
        p.reset
    )?;
    writeln!(out, "{}", light)?;

    for arc in &report.arcs {
        writeln!(out)?;
        writeln!(out, "{}Arc: {}{}", p.arc, arc.label, p.reset)?;
        writeln!(
            out,
            "   ├─ Word Count: {} ({}{:.1}%{})",
            group_thousands(arc.word_count),
            p.percent,
            arc.percentage,
            p.reset
        )?;
        writeln!(out, "   └─ Chapters:")?;
        let width = arc
            .chapters
            .iter()
            .map(|c| c.title.chars().count())
            .max()
            .unwrap_or(0);
        for (i, chapter) in arc.chapters.iter().enumerate() {
            writeln!(
                out,
                "      {} {}{:<width$}{} : {} ({}{:.1}%{})",
                tree_pipe(i, arc.chapters.len()),
                p.chapter,
                chapter.title,
                p.reset,
                group_thousands(chapter.word_count),
                p.percent,
                chapter.percentage_of_arc,
                p.reset,
                width = width
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", heavy)?;
    writeln!(out, "{}Summary{}", p.header, p.reset)?;
    writeln!(out, "{}", light)?;
    writeln!(out)?;
    writeln!(out, "{}Arc Statistics (sorted by word count):{}", p.arc, p.reset)?;
    let sorted = report.arcs_by_word_count();
    for (i, arc) in sorted.iter().enumerate() {
        writeln!(
            out,
            "   {} {}: {} words ({}{:.1}%{})",
            tree_pipe(i, sorted.len()),
            arc.label,
            group_thousands(arc.word_count),
            p.percent,
            arc.percentage,
            p.reset
        )?;
    }

    let avg = &report.averages;
    writeln!(out)?;
    writeln!(out, "{}Average Statistics:{}", p.header, p.reset)?;
    writeln!(
        out,
        "   ├─ Average chapters per arc: {}",
        avg.chapters_per_arc
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "n/a".to_string())
    )?;
    writeln!(
        out,
        "   ├─ Average words per chapter: {}",
        format_rounded(avg.words_per_chapter)
    )?;
    writeln!(
        out,
        "   └─ Average words per arc: {}",
        format_rounded(avg.words_per_arc)
    )?;
    writeln!(out)?;
    writeln!(out, "{}", heavy)?;
    Ok(())
}

fn format_rounded(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => group_thousands(v.round() as u64),
        _ => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Chapter;
    use crate::stats::aggregate;

    fn chapter(index: u32, arc: &str, title: &str, words: usize) -> Chapter {
        Chapter {
            sequence_index: index,
            arc: arc.to_string(),
            title: title.to_string(),
            url: format!("https://seek.example/{}/", index),
            body_text: vec!["w"; words].join(" "),
            body_html: String::new(),
            image_urls: Vec::new(),
        }
    }

    fn sample() -> WordCountReport {
        aggregate(&[
            chapter(0, "HACK", "0.1.O", 4870),
            chapter(1, "HACK", "0.1.1", 4597),
            chapter(2, "HACK", "0.1.2", 6714),
            chapter(3, "HACK", "0.1.3", 5876),
            chapter(4, "MUTE", "0.2.1", 5391),
            chapter(5, "MUTE", "0.2.2", 9344),
            chapter(6, "MUTE", "0.2.3", 6345),
            chapter(7, "MUTE", "0.2.10", 8853),
        ])
    }

    #[test]
    fn group_thousands_inserts_commas() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(51_990), "51,990");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn plain_report_lists_totals_arcs_and_averages() {
        let text = render(&sample(), "SEEK", Style::Plain);
        assert!(text.contains("SEEK Word Count Analysis"));
        assert!(text.contains("Total Word Count: 51,990"));
        assert!(text.contains("Arc: HACK"));
        assert!(text.contains("   ├─ Word Count: 22,057 (42.4%)"));
        assert!(text.contains("   ├─ Word Count: 29,933 (57.6%)"));
        assert!(text.contains("      ├─ 0.1.O : 4,870 (22.1%)"));
        assert!(text.contains("      └─ 0.2.10 : 8,853 (29.6%)"));
        assert!(text.contains("   ├─ MUTE: 29,933 words (57.6%)"));
        assert!(text.contains("   └─ HACK: 22,057 words (42.4%)"));
        assert!(text.contains("Average chapters per arc: 4.0"));
        assert!(text.contains("Average words per chapter: 6,499"));
        assert!(text.contains("Average words per arc: 25,995"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn summary_sorts_arcs_by_word_count() {
        let text = render(&sample(), "SEEK", Style::Plain);
        let mute = text.find("MUTE: 29,933 words").unwrap();
        let hack = text.find("HACK: 22,057 words").unwrap();
        assert!(mute < hack);
    }

    #[test]
    fn color_report_uses_ansi_codes() {
        let text = render(&sample(), "SEEK", Style::Color);
        assert!(text.contains("\x1b[1;32mTotal Word Count: 51,990\x1b[0m"));
    }

    #[test]
    fn empty_report_renders_without_averages() {
        let text = render(&aggregate(&[]), "SEEK", Style::Plain);
        assert!(text.contains("Total Word Count: 0"));
        assert!(text.contains("Average words per arc: n/a"));
    }
}
