//! Word-count aggregation: group chapters by arc and compute totals, percentages, and averages.
//!
//! Everything here is derived from the flat chapter list on demand; nothing is cached
//! on the chapters themselves.

use crate::model::Chapter;
use serde::Serialize;

/// Chapters sharing an arc label, in crawl order.
#[derive(Debug, Clone)]
pub struct ArcGroup<'a> {
    pub label: &'a str,
    pub chapters: Vec<&'a Chapter>,
}

impl ArcGroup<'_> {
    pub fn word_count(&self) -> u64 {
        self.chapters.iter().map(|c| c.word_count()).sum()
    }
}

/// Group chapters by arc label. Arcs appear in the order their label is first seen.
pub fn group_by_arc(chapters: &[Chapter]) -> Vec<ArcGroup<'_>> {
    let mut arcs: Vec<ArcGroup<'_>> = Vec::new();
    for chapter in chapters {
        match arcs.iter_mut().find(|a| a.label == chapter.arc) {
            Some(arc) => arc.chapters.push(chapter),
            None => arcs.push(ArcGroup {
                label: &chapter.arc,
                chapters: vec![chapter],
            }),
        }
    }
    arcs
}

/// Word-count statistics for one crawl.
#[derive(Debug, Clone, Serialize)]
pub struct WordCountReport {
    pub total_words: u64,
    pub chapter_count: usize,
    pub arcs: Vec<ArcSummary>,
    pub averages: Averages,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArcSummary {
    pub label: String,
    pub word_count: u64,
    /// Share of the grand total, 0-100.
    pub percentage: f64,
    pub chapters: Vec<ChapterSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterSummary {
    pub index: u32,
    pub title: String,
    pub word_count: u64,
    /// Share of the chapter's arc, 0-100.
    pub percentage_of_arc: f64,
}

/// `None` when there is nothing to average over.
#[derive(Debug, Clone, Serialize)]
pub struct Averages {
    pub chapters_per_arc: Option<f64>,
    pub words_per_chapter: Option<f64>,
    pub words_per_arc: Option<f64>,
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn average(sum: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

/// Aggregate word counts over the crawled chapters.
pub fn aggregate(chapters: &[Chapter]) -> WordCountReport {
    let arcs = group_by_arc(chapters);
    let total_words: u64 = arcs.iter().map(ArcGroup::word_count).sum();

    let summaries: Vec<ArcSummary> = arcs
        .iter()
        .map(|arc| {
            let arc_words = arc.word_count();
            ArcSummary {
                label: arc.label.to_string(),
                word_count: arc_words,
                percentage: percentage(arc_words, total_words),
                chapters: arc
                    .chapters
                    .iter()
                    .map(|c| ChapterSummary {
                        index: c.sequence_index,
                        title: c.title.clone(),
                        word_count: c.word_count(),
                        percentage_of_arc: percentage(c.word_count(), arc_words),
                    })
                    .collect(),
            }
        })
        .collect();

    let averages = Averages {
        chapters_per_arc: average(chapters.len() as f64, arcs.len()),
        words_per_chapter: average(total_words as f64, chapters.len()),
        words_per_arc: average(total_words as f64, arcs.len()),
    };

    WordCountReport {
        total_words,
        chapter_count: chapters.len(),
        arcs: summaries,
        averages,
    }
}

impl WordCountReport {
    /// Arcs from most to fewest words; ties keep crawl order.
    pub fn arcs_by_word_count(&self) -> Vec<&ArcSummary> {
        let mut arcs: Vec<&ArcSummary> = self.arcs.iter().collect();
        arcs.sort_by(|a, b| b.word_count.cmp(&a.word_count));
        arcs
    }
}
