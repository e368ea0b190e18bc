use std::io::{self, Write};

use anyhow::Result;
use chrono::{DateTime, Utc};
use kanvas_core::{FaqEntry, FaqMatch, MatchDecision, SimilarityResult, Suggestion};
use serde::Serialize;

use crate::cli::OutputFormat;

#[derive(Debug, Serialize)]
pub struct ChatReply<'a> {
    pub response: &'a str,
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub matched_question: Option<&'a str>,
    pub method: &'static str,
    pub confidence: f32,
    pub suggestions: Option<&'a [Suggestion]>,
}

impl<'a> From<&'a MatchDecision> for ChatReply<'a> {
    fn from(decision: &'a MatchDecision) -> Self {
        Self {
            response: decision.response(),
            status: "success",
            timestamp: Utc::now(),
            matched_question: decision.matched_question(),
            method: decision.method(),
            confidence: decision.confidence(),
            suggestions: decision.suggestions(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchHit<'a> {
    text: &'a str,
    similarity: f32,
    index: usize,
}

#[derive(Debug, Serialize)]
struct SearchReply<'a> {
    results: Vec<SearchHit<'a>>,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct FaqList<'a> {
    faqs: &'a [FaqEntry],
    total: usize,
}

#[derive(Debug, Serialize)]
struct FaqSearchReply<'a> {
    results: &'a [FaqMatch],
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub model_type: &'static str,
    pub description: &'static str,
    pub encoder: &'static str,
    pub embedding_dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sequence_length: Option<usize>,
    pub loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct AddedFaq<'a> {
    pub index: usize,
    pub question: &'a str,
    pub total: usize,
    pub path: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut out = io::stdout();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

pub fn print_chat(format: OutputFormat, decision: &MatchDecision) -> Result<()> {
    let reply = ChatReply::from(decision);
    if format == OutputFormat::Json {
        return print_json(&reply);
    }

    let mut out = io::stdout();
    writeln!(out, "{}", reply.response)?;
    writeln!(out)?;
    writeln!(
        out,
        "method={} confidence={:.4}",
        reply.method, reply.confidence
    )?;
    if let Some(question) = reply.matched_question {
        writeln!(out, "matched_question={question}")?;
    }
    for s in reply.suggestions.unwrap_or_default() {
        writeln!(out, "suggestion={:.4} {}", s.similarity, s.question)?;
    }
    Ok(())
}

pub fn print_search(format: OutputFormat, results: &[SimilarityResult]) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&SearchReply {
            results: results
                .iter()
                .map(|r| SearchHit {
                    text: &r.text,
                    similarity: r.score,
                    index: r.index,
                })
                .collect(),
            status: "success",
        });
    }

    let mut out = io::stdout();
    for r in results {
        writeln!(out, "{:.4} [{}] {}", r.score, r.index, r.text)?;
    }
    Ok(())
}

pub fn print_faqs(format: OutputFormat, faqs: &[FaqEntry]) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&FaqList {
            faqs,
            total: faqs.len(),
        });
    }

    let mut out = io::stdout();
    for (i, faq) in faqs.iter().enumerate() {
        writeln!(out, "[{i}] {}", faq.question)?;
        writeln!(out, "    {}", faq.answer)?;
    }
    writeln!(out, "total={}", faqs.len())?;
    Ok(())
}

pub fn print_faq_search(format: OutputFormat, results: &[FaqMatch], store_empty: bool) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&FaqSearchReply {
            results,
            total: results.len(),
            message: store_empty.then_some("Knowledge base kosong"),
        });
    }

    let mut out = io::stdout();
    if store_empty {
        writeln!(out, "Knowledge base kosong")?;
    }
    for r in results {
        writeln!(out, "{:.4} {}", r.similarity, r.question)?;
        writeln!(out, "       {}", r.answer)?;
    }
    Ok(())
}

pub fn print_model_info(format: OutputFormat, info: &ModelInfo) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(info);
    }

    let mut out = io::stdout();
    writeln!(out, "model={} type={}", info.model_name, info.model_type)?;
    writeln!(
        out,
        "encoder={} dimension={} loaded={}",
        info.encoder, info.embedding_dimension, info.loaded
    )?;
    if let Some(max) = info.max_sequence_length {
        writeln!(out, "max_sequence_length={max}")?;
    }
    writeln!(out, "{}", info.description)?;
    Ok(())
}

pub fn print_added(format: OutputFormat, added: &AddedFaq) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(added);
    }

    writeln!(
        io::stdout(),
        "added index={} total={} path={} question={}",
        added.index, added.total, added.path, added.question
    )?;
    Ok(())
}
