mod config;
mod export;

use std::io::{BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use feyn_core::{
    AnswerAssessor, AssessmentPipeline, AssessmentResult, KnowledgeRecord, LocalProvider,
    ModelRoster, QuestionGenerator, RecordStore, ReferenceAnswerGenerator, Tag, TagStore,
    MODEL_LIST,
};
use feyn_llm::{FailoverClient, HttpTransport, QianfanProvider};
use feyn_store::SqliteStore;

use config::Config;

#[derive(Parser)]
#[command(
    name = "feyn",
    version,
    about = "Feynman practice - explain it simply, get graded"
)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate probing questions for a knowledge point
    Ask {
        /// Knowledge point (reads stdin if omitted)
        knowledge: Option<String>,

        /// Save a new record with the generated questions
        #[arg(short, long)]
        save: bool,

        /// Tags for the saved record (comma-separated names)
        #[arg(short, long)]
        tags: Option<String>,

        /// Use the offline rule-based provider
        #[arg(long)]
        local: bool,
    },

    /// Assess an explanation against a knowledge point
    Assess {
        /// Knowledge point
        #[arg(short, long)]
        knowledge: Option<String>,

        /// The question being answered
        #[arg(short, long)]
        question: Option<String>,

        /// The explanation (reads stdin if omitted)
        #[arg(short, long)]
        answer: Option<String>,

        /// Assess a saved record instead (uses its knowledge and questions)
        #[arg(short, long)]
        record: Option<String>,

        /// Also generate a reference answer
        #[arg(long)]
        reference: bool,

        /// Save the result (updates --record, otherwise creates a record)
        #[arg(short, long)]
        save: bool,

        /// Use the offline rule-based provider
        #[arg(long)]
        local: bool,
    },

    /// List records, newest first
    List {
        /// Maximum results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one record in full
    Show {
        /// Record id
        id: String,
    },

    /// Full-text search over knowledge points and answers
    Search {
        /// Search query
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Delete a record by id
    Forget {
        /// Record id
        id: String,
    },

    /// Delete all records
    Clear {
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Export records as JSON or Markdown
    Export {
        /// Record id (exports everything if omitted)
        #[arg(short, long)]
        record: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect and reset the model roster
    Models {
        #[command(subcommand)]
        command: ModelCommands,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum TagCommands {
    /// Create a tag
    Add {
        /// Tag name (unique)
        name: String,

        /// Display color, e.g. "#3355ff"
        #[arg(short, long)]
        color: Option<String>,
    },

    /// List all tags
    List,

    /// Rename a tag
    Rename {
        /// Current name
        name: String,

        /// New name
        new_name: String,
    },

    /// Delete a tag (records keep their other tags)
    Delete {
        /// Tag name
        name: String,
    },

    /// Attach a tag to a record
    Attach {
        /// Record id
        record: String,

        /// Tag name (created if missing)
        tag: String,
    },

    /// Detach a tag from a record
    Detach {
        /// Record id
        record: String,

        /// Tag name
        tag: String,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    /// List the roster in priority order
    List,

    /// Show the current model and position
    Status,

    /// Reset the roster back to the first model
    Reset,
}

#[derive(Clone, ValueEnum)]
enum ExportFormat {
    Json,
    Markdown,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "feyn", "feyn")
        .map(|dirs| dirs.data_dir().join("records.db"))
        .unwrap_or_else(|| PathBuf::from("records.db"))
}

fn open_store(db: Option<PathBuf>, config: &Config) -> Result<SqliteStore> {
    let path = db
        .or_else(|| config.store.path.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_db_path);
    SqliteStore::new(&path).context("failed to open database")
}

fn remote_provider(
    store: Arc<SqliteStore>,
    config: &Config,
) -> Result<QianfanProvider<HttpTransport>> {
    let Some(api_key) = config::resolve_api_key(config) else {
        bail!(
            "no API key configured - set QIANFAN_API_KEY or api.key in {}",
            config::show_config_path()
        );
    };

    let transport = HttpTransport::with_options(
        config.api.base_url.clone(),
        api_key,
        config.api.temperature,
        Duration::from_secs(config.api.timeout_secs),
    );
    let roster = ModelRoster::new(store);
    Ok(QianfanProvider::new(FailoverClient::new(transport, roster)))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config()?;
    let store = Arc::new(open_store(cli.db, &config)?);

    match cli.command {
        Commands::Ask {
            knowledge,
            save,
            tags,
            local,
        } => {
            let knowledge = read_arg_or_stdin(knowledge, "knowledge point")?;
            if local {
                cmd_ask(
                    &AssessmentPipeline::new(LocalProvider::new()),
                    &store,
                    knowledge,
                    save,
                    tags,
                )
            } else {
                let provider = remote_provider(store.clone(), &config)?;
                cmd_ask(
                    &AssessmentPipeline::new(provider),
                    &store,
                    knowledge,
                    save,
                    tags,
                )
            }
        }
        Commands::Assess {
            knowledge,
            question,
            answer,
            record,
            reference,
            save,
            local,
        } => {
            if local {
                cmd_assess(
                    &AssessmentPipeline::new(LocalProvider::new()),
                    &store,
                    knowledge,
                    question,
                    answer,
                    record,
                    reference,
                    save,
                )
            } else {
                let provider = remote_provider(store.clone(), &config)?;
                cmd_assess(
                    &AssessmentPipeline::new(provider),
                    &store,
                    knowledge,
                    question,
                    answer,
                    record,
                    reference,
                    save,
                )
            }
        }
        Commands::List { limit } => cmd_list(&store, limit),
        Commands::Show { id } => cmd_show(&store, &id),
        Commands::Search { query, limit } => cmd_search(&store, &query, limit),
        Commands::Forget { id } => cmd_forget(&store, &id),
        Commands::Clear { yes } => cmd_clear(&store, yes),
        Commands::Tag { command } => match command {
            TagCommands::Add { name, color } => cmd_tag_add(&store, &name, color),
            TagCommands::List => cmd_tag_list(&store),
            TagCommands::Rename { name, new_name } => cmd_tag_rename(&store, &name, &new_name),
            TagCommands::Delete { name } => cmd_tag_delete(&store, &name),
            TagCommands::Attach { record, tag } => cmd_tag_attach(&store, &record, &tag),
            TagCommands::Detach { record, tag } => cmd_tag_detach(&store, &record, &tag),
        },
        Commands::Export {
            record,
            format,
            output,
        } => cmd_export(&store, record, format, output),
        Commands::Models { command } => {
            let roster = ModelRoster::new(store.clone());
            match command {
                ModelCommands::List => cmd_models_list(&roster),
                ModelCommands::Status => cmd_models_status(&roster),
                ModelCommands::Reset => cmd_models_reset(&roster),
            }
        }
        Commands::Config => cmd_config(&config),
    }
}

// ---------------------------------------------------------------------------
// Input helpers
// ---------------------------------------------------------------------------

fn read_arg_or_stdin(arg: Option<String>, what: &str) -> Result<String> {
    match arg {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            let text = buf.trim().to_string();
            if text.is_empty() {
                bail!("no {what} provided (pass an argument or pipe text in)");
            }
            Ok(text)
        }
    }
}

/// Comma-separated tag names to tag ids, creating missing tags.
fn resolve_tags(store: &SqliteStore, tags: Option<String>) -> Result<Vec<String>> {
    let Some(raw) = tags else {
        return Ok(Vec::new());
    };

    let mut ids = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let id = match store.find_tag_by_name(name)? {
            Some(tag) => tag.id,
            None => store.create_tag(Tag::new(name))?,
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}…")
    }
}

// ---------------------------------------------------------------------------
// Practice commands
// ---------------------------------------------------------------------------

fn cmd_ask<P>(
    pipeline: &AssessmentPipeline<P>,
    store: &SqliteStore,
    knowledge: String,
    save: bool,
    tags: Option<String>,
) -> Result<()>
where
    P: QuestionGenerator + AnswerAssessor + ReferenceAnswerGenerator,
{
    let questions = pipeline.generate_questions(&knowledge)?;

    for (i, question) in questions.iter().enumerate() {
        println!("{}. {question}", i + 1);
    }

    if save {
        let mut record = KnowledgeRecord::new(knowledge);
        record.questions = questions;
        record.tags = resolve_tags(store, tags)?;
        let id = store.create(record)?;
        println!("\nSaved: {id}");
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_assess<P>(
    pipeline: &AssessmentPipeline<P>,
    store: &SqliteStore,
    knowledge: Option<String>,
    question: Option<String>,
    answer: Option<String>,
    record_id: Option<String>,
    reference: bool,
    save: bool,
) -> Result<()>
where
    P: QuestionGenerator + AnswerAssessor + ReferenceAnswerGenerator,
{
    let mut existing: Option<KnowledgeRecord> = None;

    let (knowledge, question, questions) = if let Some(id) = &record_id {
        let record = store
            .get(id)?
            .with_context(|| format!("no record with id {id}"))?;
        let question = match question {
            Some(q) => q,
            None => record
                .questions
                .first()
                .cloned()
                .context("record has no questions; pass --question")?,
        };
        let knowledge = record.knowledge.clone();
        let questions = record.questions.clone();
        existing = Some(record);
        (knowledge, question, questions)
    } else {
        let knowledge = knowledge.context("pass --knowledge or --record")?;
        let question = question.context("pass --question or --record")?;
        let questions = vec![question.clone()];
        (knowledge, question, questions)
    };

    let answer = read_arg_or_stdin(answer, "answer")?;

    let question_list = if reference {
        Some(questions.as_slice())
    } else {
        None
    };
    let result = pipeline.assess_answer(&knowledge, &question, &answer, question_list)?;

    print_assessment(&result);

    if save {
        match existing.as_mut() {
            Some(record) => {
                record.answer = answer;
                record.assessment = Some(result);
                store.update(record)?;
                println!("\nUpdated: {}", record.id);
            }
            None => {
                let mut record = KnowledgeRecord::new(knowledge);
                record.questions = questions;
                record.answer = answer;
                record.assessment = Some(result);
                let id = store.create(record)?;
                println!("\nSaved: {id}");
            }
        }
    }

    Ok(())
}

fn print_assessment(result: &AssessmentResult) {
    println!("总体评分: {}/10", result.overall);
    println!("  清晰度:   {}/10", result.clarity);
    println!("  逻辑性:   {}/10", result.logic);
    println!("  完整性:   {}/10", result.completeness);
    // displayed inverted: high is good
    println!("  术语使用: {}/10", 11 - result.terminology);

    if !result.terminology_list.is_empty() {
        println!("\n检测到的专业术语:");
        for item in &result.terminology_list {
            println!("  - {} (位置 {})", item.term, item.position);
        }
    }

    if !result.suggestions.is_empty() {
        println!("\n改进建议:");
        for suggestion in &result.suggestions {
            println!("  - {suggestion}");
        }
    }

    if let Some(reference) = &result.reference_answer {
        println!("\n参考讲解:\n{reference}");
    }
}

// ---------------------------------------------------------------------------
// Record commands
// ---------------------------------------------------------------------------

fn print_record_line(record: &KnowledgeRecord) {
    let score = record
        .assessment
        .as_ref()
        .map(|a| format!("{}/10", a.overall))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}  {}  {:>5}  {}",
        record.id,
        record.created_at.format("%Y-%m-%d %H:%M"),
        score,
        truncate(&record.knowledge, 40)
    );
}

fn cmd_list(store: &SqliteStore, limit: usize) -> Result<()> {
    let records = store.list(limit)?;
    if records.is_empty() {
        println!("No records yet.");
        return Ok(());
    }
    for record in &records {
        print_record_line(record);
    }
    Ok(())
}

fn cmd_show(store: &SqliteStore, id: &str) -> Result<()> {
    let record = store
        .get(id)?
        .with_context(|| format!("no record with id {id}"))?;

    println!("id:       {}", record.id);
    println!("created:  {}", record.created_at.format("%Y-%m-%d %H:%M"));
    println!("updated:  {}", record.updated_at.format("%Y-%m-%d %H:%M"));

    let tags = store.get_tags_by_ids(&record.tags)?;
    if !tags.is_empty() {
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        println!("tags:     {}", names.join(", "));
    }

    println!("\n知识点:\n{}", record.knowledge);

    if !record.questions.is_empty() {
        println!("\n问题:");
        for (i, question) in record.questions.iter().enumerate() {
            println!("  {}. {question}", i + 1);
        }
    }

    if !record.answer.is_empty() {
        println!("\n回答:\n{}", record.answer);
    }

    if let Some(assessment) = &record.assessment {
        println!();
        print_assessment(assessment);
    }

    Ok(())
}

fn cmd_search(store: &SqliteStore, query: &str, limit: usize) -> Result<()> {
    let records = store.search(query, limit)?;
    if records.is_empty() {
        println!("No records found.");
        return Ok(());
    }
    for record in &records {
        print_record_line(record);
    }
    Ok(())
}

fn cmd_forget(store: &SqliteStore, id: &str) -> Result<()> {
    store.delete(id)?;
    println!("Deleted: {id}");
    Ok(())
}

fn cmd_clear(store: &SqliteStore, yes: bool) -> Result<()> {
    let count = store.count()?;
    if count == 0 {
        println!("Nothing to delete.");
        return Ok(());
    }

    if !yes {
        print!("Delete all {count} records? [y/N] ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        if !matches!(line.trim(), "y" | "Y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let deleted = store.clear()?;
    println!("Deleted {deleted} records.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tag commands
// ---------------------------------------------------------------------------

fn cmd_tag_add(store: &SqliteStore, name: &str, color: Option<String>) -> Result<()> {
    if store.find_tag_by_name(name)?.is_some() {
        bail!("tag already exists: {name}");
    }
    let id = store.create_tag(Tag::with_color(name, color))?;
    println!("Created tag: {id}");
    Ok(())
}

fn cmd_tag_list(store: &SqliteStore) -> Result<()> {
    let tags = store.list_tags()?;
    if tags.is_empty() {
        println!("No tags yet.");
        return Ok(());
    }
    for tag in &tags {
        match &tag.color {
            Some(color) => println!("{}  {}  {}", tag.id, tag.name, color),
            None => println!("{}  {}", tag.id, tag.name),
        }
    }
    Ok(())
}

fn cmd_tag_rename(store: &SqliteStore, name: &str, new_name: &str) -> Result<()> {
    let mut tag = store
        .find_tag_by_name(name)?
        .with_context(|| format!("no tag named {name}"))?;
    tag.name = new_name.trim().to_string();
    store.update_tag(&tag)?;
    println!("Renamed {name} -> {new_name}");
    Ok(())
}

fn cmd_tag_delete(store: &SqliteStore, name: &str) -> Result<()> {
    let tag = store
        .find_tag_by_name(name)?
        .with_context(|| format!("no tag named {name}"))?;
    store.delete_tag(&tag.id)?;
    println!("Deleted tag: {name}");
    Ok(())
}

fn cmd_tag_attach(store: &SqliteStore, record_id: &str, tag_name: &str) -> Result<()> {
    let mut record = store
        .get(record_id)?
        .with_context(|| format!("no record with id {record_id}"))?;

    let tag_id = match store.find_tag_by_name(tag_name)? {
        Some(tag) => tag.id,
        None => store.create_tag(Tag::new(tag_name))?,
    };

    if record.tags.contains(&tag_id) {
        println!("Already tagged.");
        return Ok(());
    }

    record.tags.push(tag_id);
    store.update(&record)?;
    println!("Tagged {record_id} with {tag_name}");
    Ok(())
}

fn cmd_tag_detach(store: &SqliteStore, record_id: &str, tag_name: &str) -> Result<()> {
    let mut record = store
        .get(record_id)?
        .with_context(|| format!("no record with id {record_id}"))?;

    let tag = store
        .find_tag_by_name(tag_name)?
        .with_context(|| format!("no tag named {tag_name}"))?;

    let before = record.tags.len();
    record.tags.retain(|id| id != &tag.id);
    if record.tags.len() == before {
        println!("Record does not carry that tag.");
        return Ok(());
    }

    store.update(&record)?;
    println!("Untagged {record_id}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Export / models / config commands
// ---------------------------------------------------------------------------

fn cmd_export(
    store: &SqliteStore,
    record_id: Option<String>,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let content = match record_id {
        Some(id) => {
            let record = store
                .get(&id)?
                .with_context(|| format!("no record with id {id}"))?;
            match format {
                ExportFormat::Json => export::record_to_json(&record)?,
                ExportFormat::Markdown => {
                    let tags = store.get_tags_by_ids(&record.tags)?;
                    let names: Vec<String> = tags.into_iter().map(|t| t.name).collect();
                    export::record_to_markdown(&record, &names)
                }
            }
        }
        None => {
            let records = store.list(usize::MAX)?;
            match format {
                ExportFormat::Json => export::records_to_json(&records)?,
                ExportFormat::Markdown => export::records_to_markdown(&records),
            }
        }
    };

    match output {
        Some(path) => {
            std::fs::write(&path, content)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{content}"),
    }

    Ok(())
}

fn cmd_models_list(roster: &ModelRoster) -> Result<()> {
    let current = roster.current_index();
    for (i, model) in roster.models().iter().enumerate() {
        let marker = if i == current { "*" } else { " " };
        match model.description {
            Some(desc) => println!("{marker} {:>2}. {}  ({desc})", i + 1, model.name),
            None => println!("{marker} {:>2}. {}", i + 1, model.name),
        }
    }
    Ok(())
}

fn cmd_models_status(roster: &ModelRoster) -> Result<()> {
    let status = roster.status();
    println!("{} ({}/{})", status.name, status.position, status.total);
    if let Some(desc) = status.description {
        println!("{desc}");
    }
    if !status.can_switch {
        println!("This is the last model; no fallback remains.");
    }
    Ok(())
}

fn cmd_models_reset(roster: &ModelRoster) -> Result<()> {
    roster.reset();
    println!("Reset to {}", MODEL_LIST[0].name);
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("config:      {}", config::show_config_path());
    println!("database:    {}", default_db_path().display());
    println!("base_url:    {}", config.api.base_url);
    println!("temperature: {}", config.api.temperature);
    println!("timeout:     {}s", config.api.timeout_secs);
    let key = match config::resolve_api_key(config) {
        Some(_) => "configured",
        None => "not set",
    };
    println!("api key:     {key}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate("short", 40), "short");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "超文本传输协议的基础知识";
        let cut = truncate(text, 4);
        assert_eq!(cut, "超文本传…");
    }

    #[test]
    fn test_resolve_tags_creates_and_dedups() {
        let store = SqliteStore::in_memory().unwrap();
        let ids = resolve_tags(&store, Some("net, http , net".into())).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(store.find_tag_by_name("net").unwrap().is_some());
        assert!(store.find_tag_by_name("http").unwrap().is_some());

        // second resolve reuses the same tags
        let again = resolve_tags(&store, Some("net".into())).unwrap();
        assert_eq!(again[0], ids[0]);
    }

    #[test]
    fn test_resolve_tags_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(resolve_tags(&store, None).unwrap().is_empty());
    }
}
