//! Prompt templates for the study tasks

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    TrueFalse,
    FillBlank,
    ShortAnswer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStyle {
    Brief,
    #[default]
    Detailed,
    KeyPoints,
    VisualSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillBlank => "fill_blank",
            QuestionType::ShortAnswer => "short_answer",
        }
    }
}

impl SummaryStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::Brief => "brief",
            SummaryStyle::Detailed => "detailed",
            SummaryStyle::KeyPoints => "key_points",
            SummaryStyle::VisualSummary => "visual_summary",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            SummaryStyle::Brief => "Provide a brief summary (2-3 paragraphs) of the main points:",
            SummaryStyle::Detailed => {
                "Provide a comprehensive summary covering all major topics and concepts:"
            }
            SummaryStyle::KeyPoints => {
                "Extract and organize the key points and important concepts:"
            }
            SummaryStyle::VisualSummary => {
                "Create a summary that emphasizes visual elements, charts, diagrams, and multimedia content:"
            }
        }
    }
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const VISUAL_NOTE: &str = "Note: This content includes visual elements (images, charts, diagrams) \
that have been described. Pay attention to these visual descriptions when creating the summary.";

pub fn questions(
    context: &str,
    count: u32,
    difficulty: Difficulty,
    types: &[QuestionType],
) -> String {
    let types: Vec<&str> = types.iter().map(QuestionType::as_str).collect();
    format!(
        "Based on the following study material, generate {count} questions at {difficulty} difficulty level. \
Include these question types: {types}.\n\n\
For multiple choice questions, provide 4 options with one correct answer.\n\
Format the response as a JSON array with objects containing: 'question', 'type', 'options' (for multiple choice), 'correct_answer', 'explanation'.\n\n\
Study Material:\n{context}",
        count = count,
        difficulty = difficulty.as_str(),
        types = types.join(", "),
        context = context,
    )
}

pub fn summary(context: &str, style: SummaryStyle, max_length: u32, has_visual: bool) -> String {
    let mut prompt = format!("{}\n\n", style.instruction());
    if has_visual {
        prompt.push_str(VISUAL_NOTE);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "Keep the summary under {} characters.\n\nContent:\n{}",
        max_length, context
    ));
    prompt
}

pub fn study_plan(context: &str, hours: u32, level: Level, focus_areas: &[String]) -> String {
    let focus = if focus_areas.is_empty() {
        String::new()
    } else {
        format!("Focus especially on: {}\n", focus_areas.join(", "))
    };
    format!(
        "Based on this study material, create a {hours}-hour study plan for a {level} learner.\n\
{focus}\n\
Format as JSON with: 'total_hours', 'sessions' array with 'session_number', 'duration_hours', 'topics', 'activities', 'resources_needed'.\n\n\
Study Material:\n{context}",
        hours = hours,
        level = level.as_str(),
        focus = focus,
        context = context,
    )
}
