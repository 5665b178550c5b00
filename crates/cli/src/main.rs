mod logging;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rehab_core::config::{data_dir_from_env_value, transition_policy_from_env_value};
use rehab_core::{
    CoreConfig, EntryFilter, FileRepository, FormRepository, FormService, TemplateFilter,
};
use rehab_forms::wire::{
    finite_score, CreateFormEntryReq, CreateFormTemplateReq, FormEntryPayload,
    FormTemplatePayload, UpdateFormEntryReq, UpdateFormTemplateReq,
};
use rehab_forms::{
    EntryStatus, FormEntry, FormSchema, FormTemplate, FormType, RecordId, TemplateStatus,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::logging::LoggingHandle;

#[derive(Parser)]
#[command(name = "rehab")]
#[command(about = "Rehabilitation form templates and entries")]
struct Cli {
    /// Data directory (overrides REHAB_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage form templates
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },
    /// Manage form entries
    Entry {
        #[command(subcommand)]
        command: EntryCommand,
    },
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// Create a template
    Create {
        #[arg(long)]
        title: String,
        /// assessment, questionnaire, survey, lfk or fim
        #[arg(long = "type")]
        form_type: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        version: Option<u32>,
        /// YAML or JSON schema file
        #[arg(long)]
        schema: Option<PathBuf>,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        created_by: Option<String>,
    },
    /// Update template fields (schema changes only while draft)
    Update {
        id: RecordId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long = "type")]
        form_type: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        schema: Option<PathBuf>,
        #[arg(long)]
        updated_by: Option<String>,
    },
    /// Create the next version of a template as a draft
    Revise {
        id: RecordId,
        #[arg(long)]
        actor: Option<RecordId>,
    },
    /// Mark a template active
    Publish { id: RecordId },
    /// Mark a template archived
    Archive { id: RecordId },
    /// List templates
    List {
        #[arg(long)]
        title: Option<String>,
        #[arg(long = "type")]
        form_type: Option<FormType>,
        #[arg(long)]
        status: Option<TemplateStatus>,
    },
    /// Show one template
    Show { id: RecordId },
    /// Delete a template no entry references
    Delete { id: RecordId },
}

#[derive(Subcommand)]
enum EntryCommand {
    /// Create an entry for a template
    Create {
        #[arg(long)]
        form_id: String,
        #[command(flatten)]
        refs: EntryRefs,
        #[arg(long)]
        status: Option<String>,
        /// Raw form data as a JSON object
        #[arg(long)]
        data: Option<Value>,
        #[arg(long, value_parser = parse_score)]
        score: Option<f64>,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        created_by: Option<String>,
    },
    /// Validate data against the template schema and store it
    Submit {
        id: RecordId,
        /// Form data as a JSON object
        #[arg(long, conflicts_with = "file")]
        data: Option<Value>,
        /// File holding the form data as JSON
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        actor: Option<RecordId>,
    },
    /// Update entry fields
    Update {
        id: RecordId,
        #[command(flatten)]
        refs: EntryRefs,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        data: Option<Value>,
        #[arg(long, value_parser = parse_score)]
        score: Option<f64>,
        #[arg(long)]
        updated_by: Option<String>,
    },
    /// Mark an entry completed
    Complete {
        id: RecordId,
        #[arg(long, value_parser = parse_score)]
        score: Option<f64>,
    },
    /// Mark an entry cancelled
    Cancel { id: RecordId },
    /// List entries
    List {
        #[arg(long)]
        form_id: Option<RecordId>,
        #[arg(long)]
        patient_id: Option<RecordId>,
        #[arg(long)]
        device_id: Option<RecordId>,
        #[arg(long)]
        clinic_id: Option<RecordId>,
        #[arg(long)]
        status: Option<EntryStatus>,
    },
    /// Show one entry
    Show { id: RecordId },
    /// Delete an entry
    Delete { id: RecordId },
}

#[derive(Args)]
struct EntryRefs {
    #[arg(long)]
    patient_id: Option<String>,
    #[arg(long)]
    device_id: Option<String>,
    #[arg(long)]
    clinic_id: Option<String>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let logging = LoggingHandle::init()?;
    let result = run(cli);
    logging.shutdown();
    result
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = Arc::new(resolve_config(cli.data_dir)?);
    tracing::debug!("using data directory {}", cfg.data_dir().display());

    let repo = Arc::new(FileRepository::open(&cfg)?);
    let service = FormService::new(cfg, repo);

    let output = execute(cli.command, &service)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Resolves configuration once: the `--data-dir` flag wins over `REHAB_DATA_DIR`.
fn resolve_config(data_dir: Option<PathBuf>) -> anyhow::Result<CoreConfig> {
    let data_dir = data_dir
        .unwrap_or_else(|| data_dir_from_env_value(std::env::var("REHAB_DATA_DIR").ok()));
    let policy = transition_policy_from_env_value(std::env::var("REHAB_TRANSITION_POLICY").ok())?;
    Ok(CoreConfig::new(data_dir, policy)?)
}

fn execute<R: FormRepository>(command: Commands, service: &FormService<R>) -> anyhow::Result<Value> {
    match command {
        Commands::Template { command } => execute_template(command, service),
        Commands::Entry { command } => execute_entry(command, service),
    }
}

fn execute_template<R: FormRepository>(
    command: TemplateCommand,
    service: &FormService<R>,
) -> anyhow::Result<Value> {
    let template = match command {
        TemplateCommand::Create {
            title,
            form_type,
            description,
            status,
            version,
            schema,
            id,
            created_by,
        } => {
            let mut input = CreateFormTemplateReq {
                id,
                title,
                description,
                form_type,
                status,
                version,
                schema: None,
                created_by,
            }
            .into_new_template()?;
            input.schema = schema.as_deref().map(read_schema).transpose()?;
            service.create_template(input)?
        }
        TemplateCommand::Update {
            id,
            title,
            form_type,
            description,
            status,
            schema,
            updated_by,
        } => {
            let mut patch = UpdateFormTemplateReq {
                title,
                description,
                form_type,
                status,
                schema: None,
                updated_by,
            }
            .into_patch()?;
            patch.schema = schema.as_deref().map(read_schema).transpose()?;
            service.update_template(&id, patch)?
        }
        TemplateCommand::Revise { id, actor } => service.revise_template(&id, actor)?,
        TemplateCommand::Publish { id } => service.publish_template(&id)?,
        TemplateCommand::Archive { id } => service.archive_template(&id)?,
        TemplateCommand::Show { id } => service.get_template(&id)?,
        TemplateCommand::List {
            title,
            form_type,
            status,
        } => {
            let templates = service.list_templates(&TemplateFilter {
                title,
                form_type,
                status,
            })?;
            let payloads: Vec<FormTemplatePayload> =
                templates.iter().map(FormTemplatePayload::from).collect();
            return Ok(serde_json::to_value(payloads)?);
        }
        TemplateCommand::Delete { id } => {
            service.delete_template(&id)?;
            return Ok(json!({ "deleted": id.as_str() }));
        }
    };

    template_json(&template)
}

fn execute_entry<R: FormRepository>(
    command: EntryCommand,
    service: &FormService<R>,
) -> anyhow::Result<Value> {
    let entry = match command {
        EntryCommand::Create {
            form_id,
            refs,
            status,
            data,
            score,
            id,
            created_by,
        } => {
            let input = CreateFormEntryReq {
                id,
                form_id,
                patient_id: refs.patient_id,
                device_id: refs.device_id,
                clinic_id: refs.clinic_id,
                status,
                data,
                score,
                created_by,
            }
            .into_new_entry()?;
            service.create_entry(input)?
        }
        EntryCommand::Submit {
            id,
            data,
            file,
            actor,
        } => {
            let raw = match (data, file) {
                (Some(raw), _) => raw,
                (None, Some(path)) => read_json(&path)?,
                (None, None) => anyhow::bail!("either --data or --file is required"),
            };
            service.submit_entry_data(&id, &raw, actor)?
        }
        EntryCommand::Update {
            id,
            refs,
            status,
            data,
            score,
            updated_by,
        } => {
            let patch = UpdateFormEntryReq {
                data,
                score,
                status,
                patient_id: refs.patient_id,
                device_id: refs.device_id,
                clinic_id: refs.clinic_id,
                updated_by,
            }
            .into_patch()?;
            service.update_entry(&id, patch)?
        }
        EntryCommand::Complete { id, score } => service.complete_entry(&id, score)?,
        EntryCommand::Cancel { id } => service.cancel_entry(&id)?,
        EntryCommand::Show { id } => service.get_entry(&id)?,
        EntryCommand::List {
            form_id,
            patient_id,
            device_id,
            clinic_id,
            status,
        } => {
            let entries = service.list_entries(&EntryFilter {
                form_id,
                patient_id,
                device_id,
                clinic_id,
                status,
            })?;
            let payloads: Vec<FormEntryPayload> =
                entries.iter().map(FormEntryPayload::from).collect();
            return Ok(serde_json::to_value(payloads)?);
        }
        EntryCommand::Delete { id } => {
            service.delete_entry(&id)?;
            return Ok(json!({ "deleted": id.as_str() }));
        }
    };

    entry_json(&entry)
}

fn template_json(template: &FormTemplate) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(FormTemplatePayload::from(template))?)
}

fn entry_json(entry: &FormEntry) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(FormEntryPayload::from(entry))?)
}

fn parse_score(raw: &str) -> Result<f64, String> {
    let score: f64 = raw.parse().map_err(|e| format!("invalid score '{raw}': {e}"))?;
    finite_score(Some(score)).map_err(|e| e.to_string())?;
    Ok(score)
}

fn read_schema(path: &Path) -> anyhow::Result<FormSchema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    Ok(FormSchema::parse(&text)?)
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rehab_core::InMemoryRepository;
    use rehab_forms::TransitionPolicy;

    fn service() -> FormService<InMemoryRepository> {
        let cfg = CoreConfig::new(PathBuf::from("unused"), TransitionPolicy::Guarded).unwrap();
        FormService::new(Arc::new(cfg), Arc::new(InMemoryRepository::new()))
    }

    fn run_args<R: FormRepository>(svc: &FormService<R>, args: &[&str]) -> anyhow::Result<Value> {
        let cli = Cli::try_parse_from(std::iter::once("rehab").chain(args.iter().copied()))?;
        execute(cli.command, svc)
    }

    #[test]
    fn parses_global_data_dir() {
        let cli = Cli::try_parse_from(["rehab", "template", "list", "--data-dir", "/tmp/forms"])
            .expect("parse");
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/forms")));
    }

    #[test]
    fn flag_overrides_default_data_dir() {
        let cfg = resolve_config(Some(PathBuf::from("elsewhere"))).expect("config");
        assert_eq!(cfg.data_dir(), Path::new("elsewhere"));
    }

    #[test]
    fn template_and_entry_flow() {
        let temp = tempfile::TempDir::new().unwrap();
        let schema_path = temp.path().join("schema.yaml");
        std::fs::write(
            &schema_path,
            "sections:\n  - id: s\n    fields:\n      - id: vas\n        type: rating\n        required: true\n        min: 0\n        max: 10\n",
        )
        .unwrap();

        let svc = service();
        let created = run_args(
            &svc,
            &[
                "template",
                "create",
                "--id",
                "f1",
                "--title",
                "Pain",
                "--type",
                "questionnaire",
                "--schema",
                schema_path.to_str().unwrap(),
            ],
        )
        .expect("create template");
        assert_eq!(created["version"], 1);
        assert_eq!(created["status"], "draft");

        let entry = run_args(&svc, &["entry", "create", "--form-id", "f1", "--id", "e1"])
            .expect("create entry");
        assert_eq!(entry["formId"], "f1");

        assert!(run_args(&svc, &["entry", "submit", "e1", "--data", r#"{"vas": 12}"#]).is_err());
        let submitted = run_args(&svc, &["entry", "submit", "e1", "--data", r#"{"vas": 4}"#])
            .expect("submit");
        assert_eq!(submitted["data"]["vas"], 4.0);

        let completed = run_args(&svc, &["entry", "complete", "e1", "--score", "40"])
            .expect("complete");
        assert_eq!(completed["status"], "completed");
        assert_eq!(completed["score"], 40.0);

        run_args(&svc, &["entry", "cancel", "e1"]).expect("cancel");
        assert!(run_args(&svc, &["entry", "complete", "e1"]).is_err());

        let listed = run_args(&svc, &["entry", "list", "--status", "cancelled"]).expect("list");
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        assert!(run_args(&svc, &["template", "delete", "f1"]).is_err());
        run_args(&svc, &["entry", "delete", "e1"]).expect("delete entry");
        let deleted = run_args(&svc, &["template", "delete", "f1"]).expect("delete template");
        assert_eq!(deleted["deleted"], "f1");
    }

    #[test]
    fn non_finite_score_flags_are_rejected() {
        let svc = service();
        run_args(
            &svc,
            &["template", "create", "--id", "f1", "--title", "Gait", "--type", "lfk"],
        )
        .unwrap();

        assert!(run_args(
            &svc,
            &["entry", "create", "--form-id", "f1", "--score", "NaN"]
        )
        .is_err());

        run_args(&svc, &["entry", "create", "--form-id", "f1", "--id", "e1"]).unwrap();
        assert!(run_args(&svc, &["entry", "complete", "e1", "--score", "inf"]).is_err());
        assert!(run_args(&svc, &["entry", "update", "e1", "--score=-inf"]).is_err());

        let shown = run_args(&svc, &["entry", "show", "e1"]).unwrap();
        assert_eq!(shown["status"], "in_progress");
        assert!(shown.get("score").map_or(true, Value::is_null));
    }

    #[test]
    fn revise_reports_next_version() {
        let svc = service();
        run_args(
            &svc,
            &["template", "create", "--id", "t1", "--title", "FIM", "--type", "fim"],
        )
        .unwrap();
        run_args(&svc, &["template", "publish", "t1"]).unwrap();

        let next = run_args(&svc, &["template", "revise", "t1", "--actor", "admin"]).unwrap();
        assert_eq!(next["version"], 2);
        assert_eq!(next["status"], "draft");
        assert_eq!(next["updatedBy"], "admin");

        let listed = run_args(&svc, &["template", "list", "--title", "FIM"]).unwrap();
        assert_eq!(listed.as_array().map(Vec::len), Some(2));
    }
}
