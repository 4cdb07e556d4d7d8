//! Question, summary and study-plan commands

use crate::config::Config;
use crate::error::{Error, Result};
use crate::generate::{
    Difficulty, GenerationOutput, GenerationTask, Level, Orchestrator, QuestionType, SummaryStyle,
};
use crate::models::RetrievalResult;
use crate::retrieve::Retriever;
use crate::store::ChromaStore;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

#[derive(Debug, Clone)]
pub struct QuestionOptions {
    pub topic: Option<String>,
    pub count: u32,
    pub difficulty: Difficulty,
    pub question_types: Vec<QuestionType>,
    pub include_visual: bool,
}

#[derive(Debug, Clone)]
pub struct SummaryOptions {
    pub style: SummaryStyle,
    pub max_length: u32,
    pub include_multimedia: bool,
}

#[derive(Debug, Clone)]
pub struct StudyPlanOptions {
    pub hours: u32,
    pub level: Level,
    pub focus_areas: Vec<String>,
}

/// Generated artifact plus where its context came from
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub document_id: String,
    pub task: &'static str,
    pub output: GenerationOutput,
    /// Content types that fed the context
    pub content_sources: BTreeSet<String>,
    /// Record count per content type
    pub content_stats: BTreeMap<String, usize>,
}

pub async fn cmd_questions(
    config: &Config,
    store: &ChromaStore,
    document_id: &str,
    options: QuestionOptions,
) -> Result<GenerationReport> {
    let task = GenerationTask::Questions {
        count: options.count,
        difficulty: options.difficulty,
        question_types: options.question_types,
    };
    task.validate()?;
    let topic = options
        .topic
        .unwrap_or_else(|| config.retrieval.default_topic.clone());
    info!("Generating questions for {} on '{}'", document_id, topic);

    let content = Retriever::new(store, &config.retrieval)
        .relevant_context(document_id, &topic, options.include_visual)
        .await;
    generate(config, document_id, &content, task).await
}

pub async fn cmd_summary(
    config: &Config,
    store: &ChromaStore,
    document_id: &str,
    options: SummaryOptions,
) -> Result<GenerationReport> {
    let task = GenerationTask::Summary {
        style: options.style,
        max_length: options.max_length,
    };
    task.validate()?;
    info!("Summarizing {} ({})", document_id, options.style);

    let content = Retriever::new(store, &config.retrieval)
        .all_document_content(document_id, options.include_multimedia)
        .await;
    generate(config, document_id, &content, task).await
}

pub async fn cmd_study_plan(
    config: &Config,
    store: &ChromaStore,
    document_id: &str,
    options: StudyPlanOptions,
) -> Result<GenerationReport> {
    let task = GenerationTask::StudyPlan {
        hours: options.hours,
        level: options.level,
        focus_areas: options.focus_areas,
    };
    task.validate()?;
    info!("Planning {} hours of study for {}", options.hours, document_id);

    let content = Retriever::new(store, &config.retrieval)
        .all_document_content(document_id, true)
        .await;
    generate(config, document_id, &content, task).await
}

async fn generate(
    config: &Config,
    document_id: &str,
    content: &[RetrievalResult],
    task: GenerationTask,
) -> Result<GenerationReport> {
    if content.is_empty() {
        return Err(Error::Store(format!(
            "No content found for document {}",
            document_id
        )));
    }

    let mut content_stats = BTreeMap::new();
    for item in content {
        let kind = item
            .content_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        *content_stats.entry(kind).or_insert(0) += 1;
    }

    let orchestrator = Orchestrator::from_config(&config.generation)?;
    let output = orchestrator.assemble_and_generate(content, &task).await?;

    Ok(GenerationReport {
        document_id: document_id.to_string(),
        task: task.name(),
        output,
        content_sources: content_stats.keys().cloned().collect(),
        content_stats,
    })
}

pub fn print_generation(report: &GenerationReport) {
    let header = match report.task {
        "questions" => "📝 Questions",
        "summary" => "📚 Summary",
        _ => "🗓 Study Plan",
    };
    println!("\n{} for {}\n", header, report.document_id);

    match &report.output {
        GenerationOutput::Text(text) => println!("{}", text),
        GenerationOutput::Structured(value) => match serde_json::to_string_pretty(value) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", value),
        },
        GenerationOutput::Empty => println!("The model returned nothing usable (see log)."),
    }

    let sources: Vec<&str> = report.content_sources.iter().map(String::as_str).collect();
    println!("\nSources: {}", sources.join(", "));
}
