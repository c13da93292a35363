//! Year-end cutover of a ledger directory
//!
//! Every eligible ledger is split in two: the rows dated before January 1 of
//! the cutoff year go to `Archive<year-1>/<entity><year-1>.xlsx`, and the
//! remaining rows replace the ledger itself, extended with formulas ready for
//! new entries.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::{CutoffDate, RowClassifier, SplitMode};
use crate::config::{CutoverConfig, SplitConfig};
use crate::dispatch::{RunReport, eligible_files, fan_out};
use crate::document::{CellRef, Document, LoadMode};
use crate::instantiate::{HeaderLabel, NameColumn, entity_name_from_path, instantiate, output_path};
use crate::relocate::{
    FillSummary, FormulaTemplate, apply_column_style, capture_templates, extend_formulas,
    restore_companion_formulas,
};
use crate::split::{SplitSummary, split_document};

/// Formula source shared read-only by every cutover job
#[derive(Debug)]
pub struct ReferenceLedger {
    pub document: Document,
    pub templates: Vec<FormulaTemplate>,
}

impl ReferenceLedger {
    pub fn new(document: Document, config: &SplitConfig) -> Result<Self> {
        let sheet = document
            .sheet_at(0)
            .context("Reference workbook has no sheets")?;
        let templates = capture_templates(sheet, config.reference_row, config.scan_columns);
        tracing::debug!(templates = templates.len(), "Captured formula templates");
        Ok(Self { document, templates })
    }

    pub fn open(path: &Path, config: &SplitConfig) -> Result<Self> {
        Self::new(Document::open(path, LoadMode::Formulas)?, config)
    }
}

/// Where one ledger's outputs went
#[derive(Debug, Clone)]
pub struct CutoverOutput {
    pub archive_path: PathBuf,
    pub current_path: PathBuf,
    pub archive: SplitSummary,
    pub current: SplitSummary,
    pub fill: FillSummary,
}

/// Directory name for ledgers archived at `cutoff`
pub fn archive_dir_name(cutoff: &CutoffDate) -> String {
    format!("Archive{}", cutoff.year() - 1)
}

/// Split one ledger. The archive half is written into `archive_dir`; the
/// current half is written into `dest_dir` under the ledger's own file name.
///
/// Without a shared `reference`, formula templates come from the ledger itself.
pub fn cutover_file(
    path: &Path,
    cutoff: CutoffDate,
    archive_dir: &Path,
    dest_dir: &Path,
    reference: Option<&ReferenceLedger>,
    config: &SplitConfig,
) -> Result<CutoverOutput> {
    let entity = ledger_entity(path)?;
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let values = Document::from_bytes(&bytes, LoadMode::ValuesOnly)
        .with_context(|| format!("Failed to load workbook {}", path.display()))?;

    let mut archived = values.clone();
    let classifier = |mode| RowClassifier::new(cutoff, mode, config.date_column, config.blank_run_limit);
    let archive = split_document(&mut archived, classifier(SplitMode::Archive), config.scan_columns)?;
    let archive_path = output_path(archive_dir, &entity, &(cutoff.year() - 1).to_string());
    archived.save(&archive_path)?;
    tracing::info!(ledger = %path.display(), rows = archive.kept, "Archived to {}", archive_path.display());

    let own_reference;
    let reference = match reference {
        Some(reference) => reference,
        None => {
            own_reference = ReferenceLedger::new(Document::from_bytes(&bytes, LoadMode::Formulas)?, config)?;
            &own_reference
        }
    };

    let mut current = values;
    let current_summary = split_document(&mut current, classifier(SplitMode::Current), config.scan_columns)?;
    let fill = prepare_current(&mut current, reference, config)?;

    let file_name = path
        .file_name()
        .with_context(|| format!("No file name in {}", path.display()))?;
    let current_path = dest_dir.join(file_name);
    current.save(&current_path)?;
    tracing::info!(
        ledger = %path.display(),
        rows = current_summary.kept,
        filled = fill.filled,
        "Current ledger written to {}",
        current_path.display()
    );

    Ok(CutoverOutput {
        archive_path,
        current_path,
        archive,
        current: current_summary,
        fill,
    })
}

/// Fill formulas, style the date column and restore formulas the values-only
/// load flattened
fn prepare_current(
    current: &mut Document,
    reference: &ReferenceLedger,
    config: &SplitConfig,
) -> Result<FillSummary> {
    let date_style = match current.styles_mut().add_number_format_style(&config.date_format) {
        Ok(style) => Some(style),
        Err(err) => {
            tracing::warn!("Date column left unstyled: {:#}", err);
            None
        }
    };

    let sheet = current.sheet_at_mut(0).context("Workbook has no sheets")?;
    let fill = extend_formulas(sheet, &reference.templates, config.fill_rows);
    if let Some(style) = date_style {
        let last_row = fill.last_row.max(sheet.max_row());
        apply_column_style(sheet, config.date_column, style, 2, last_row);
    }
    if config.freeze_header {
        sheet.freeze_panes = Some(CellRef::new(2, 1));
    }

    if config.restore_companion_formulas {
        let restored = restore_companion_formulas(current, &reference.document);
        tracing::debug!(restored, "Restored companion sheet formulas");
    }
    Ok(fill)
}

/// Cut over every eligible ledger in `source_dir`.
///
/// Archives land in `dest_dir/Archive<year-1>/`; current ledgers are written
/// to `dest_dir`, which overwrites them in place when it is `source_dir`.
pub fn run_cutover(
    source_dir: &Path,
    dest_dir: &Path,
    template: Option<&Path>,
    cutoff: CutoffDate,
    config: &CutoverConfig,
) -> Result<RunReport<CutoverOutput>> {
    let files = eligible_files(source_dir)?;
    let archive_dir = dest_dir.join(archive_dir_name(&cutoff));
    fs::create_dir_all(&archive_dir)
        .with_context(|| format!("Failed to create {}", archive_dir.display()))?;
    let reference = template
        .map(|path| ReferenceLedger::open(path, &config.split))
        .transpose()?;

    tracing::info!(ledgers = files.len(), cutoff = cutoff.year(), "Starting cutover");
    let ledgers: Vec<_> = files
        .into_iter()
        .map(|path| (job_label(&path), ledger_entity(&path), path))
        .collect();
    let contested = contested_names(
        ledgers
            .iter()
            .filter_map(|(label, entity, _)| Some((entity.as_ref().ok()?.as_str(), label.as_str()))),
    );
    let jobs = ledgers
        .into_iter()
        .map(|(label, entity, path)| {
            let job = entity
                .and_then(|entity| claim_name(&contested, &entity, &label))
                .map(|()| path);
            (label, job)
        })
        .collect();

    Ok(fan_out(jobs, config.run.workers, |job: Result<PathBuf>| {
        let path = job?;
        cutover_file(&path, cutoff, &archive_dir, dest_dir, reference.as_ref(), &config.split)
    }))
}

/// Where one instantiated document went
#[derive(Debug, Clone)]
pub struct InstanceOutput {
    pub path: PathBuf,
    pub name_column: NameColumn,
}

/// Create one document per eligible ledger in `source_dir` from `template`,
/// plus a preview document that keeps the placeholder header.
pub fn run_instantiation(
    source_dir: &Path,
    dest_dir: &Path,
    template: &Path,
    config: &CutoverConfig,
) -> Result<RunReport<InstanceOutput>> {
    let template = Document::open(template, LoadMode::Formulas)?;
    let files = eligible_files(source_dir)?;
    fs::create_dir_all(dest_dir).with_context(|| format!("Failed to create {}", dest_dir.display()))?;
    let settings = &config.instantiate;

    let mut outputs = vec![(settings.preview_name.clone(), Ok(settings.preview_name.clone()), true)];
    for path in files {
        outputs.push((job_label(&path), ledger_entity(&path), false));
    }
    let contested = contested_names(
        outputs
            .iter()
            .filter_map(|(label, entity, _)| Some((entity.as_ref().ok()?.as_str(), label.as_str()))),
    );
    let jobs: Vec<_> = outputs
        .into_iter()
        .map(|(label, entity, preview)| {
            let job = entity.and_then(|entity| {
                claim_name(&contested, &entity, &label)?;
                let header = if preview {
                    HeaderLabel::Placeholder
                } else {
                    HeaderLabel::Entity(entity.clone())
                };
                Ok((entity, header))
            });
            (label, job)
        })
        .collect();

    tracing::info!(documents = jobs.len(), "Starting instantiation");
    Ok(fan_out(jobs, config.run.workers, |job: Result<(String, HeaderLabel)>| {
        let (entity, label) = job?;
        let (document, name_column) = instantiate(&template, &label, &settings.header)?;
        let path = output_path(dest_dir, &entity, &settings.suffix);
        document.save(&path)?;
        Ok(InstanceOutput { path, name_column })
    }))
}

/// Entity name of a ledger file, refusing stems that are nothing but digits
fn ledger_entity(path: &Path) -> Result<String> {
    let entity = entity_name_from_path(path);
    if entity.is_empty() {
        anyhow::bail!(
            "File name {} has no entity name left once digits are removed",
            path.display()
        );
    }
    Ok(entity)
}

/// Output names claimed by more than one job, with the labels of those jobs.
/// Names compare case-insensitively, as they do on common file systems.
fn contested_names<'a>(claims: impl IntoIterator<Item = (&'a str, &'a str)>) -> HashMap<String, Vec<String>> {
    let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
    for (name, label) in claims {
        by_name
            .entry(name.to_lowercase())
            .or_default()
            .push(label.to_string());
    }
    by_name.retain(|_, labels| labels.len() > 1);
    by_name
}

/// Fail the job labelled `label` when another job writes the same output name
fn claim_name(contested: &HashMap<String, Vec<String>>, name: &str, label: &str) -> Result<()> {
    if let Some(labels) = contested.get(&name.to_lowercase()) {
        let others: Vec<&str> = labels
            .iter()
            .map(String::as_str)
            .filter(|other| *other != label)
            .collect();
        anyhow::bail!(
            "Output name '{}' is also derived from {}; nothing was written",
            name,
            others.join(", ")
        );
    }
    Ok(())
}

fn job_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
