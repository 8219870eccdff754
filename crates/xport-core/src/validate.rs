//! Directive conflict checks
//!
//! Advisory only: the resolver ignores the report. Callers decide whether
//! errors block an export (see [`SkipBehavior::Strict`]).

use crate::directive::{parse_name, Directives};
use crate::scene::{CollectionId, Scene};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How `-sk` usage is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipBehavior {
    /// Report conflicting directive combinations
    #[default]
    Basic,
    /// Also reject `-sk` on collections it has no effect on, and block
    /// exports when errors are found
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// What an issue refers to, by clean name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Subject {
    Collection(String),
    Object(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Collection(name) => write!(f, "Collection '{}'", name),
            Subject::Object(name) => write!(f, "Object '{}'", name),
        }
    }
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub subject: Subject,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", tag, self.subject, self.message)
    }
}

/// All findings of one validation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// No issues at all
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, severity: Severity, subject: &Subject, message: &str) {
        self.issues.push(Issue {
            severity,
            subject: subject.clone(),
            message: message.to_string(),
        });
    }
}

/// Check every collection and object name in the scene
pub fn validate(scene: &Scene, behavior: SkipBehavior) -> ValidationReport {
    let mut report = ValidationReport::default();

    for id in scene.collection_ids() {
        let parsed = parse_name(&scene.collection(id).name);
        let subject = Subject::Collection(parsed.clean_name);
        check_collection(scene, id, &parsed.directives, &subject, behavior, &mut report);
    }

    for id in scene.object_ids() {
        let parsed = parse_name(&scene.object(id).name);
        let d = &parsed.directives;
        if d.exclude && d.include_animation {
            let subject = Subject::Object(parsed.clean_name);
            report.push(
                Severity::Warning,
                &subject,
                "-anim is ignored because the object is excluded (-dk)",
            );
        }
    }

    report
}

fn check_collection(
    scene: &Scene,
    id: CollectionId,
    d: &Directives,
    subject: &Subject,
    behavior: SkipBehavior,
    report: &mut ValidationReport,
) {
    if d.skip && d.exclude {
        report.push(Severity::Error, subject, "-sk and -dk conflict (both exclude the collection)");
    }
    if d.skip && d.separate {
        report.push(Severity::Error, subject, "-sk and -sep conflict (a skipped collection cannot be an export root)");
    }
    if d.separate && d.exclude && !d.skip {
        report.push(Severity::Error, subject, "-sep and -dk conflict (-dk wins, nothing is exported)");
    }
    if d.skip && d.directory.is_some() {
        report.push(Severity::Warning, subject, "-dir is ignored because the collection is skipped (-sk)");
    }
    if d.exclude && d.include_animation {
        report.push(Severity::Warning, subject, "-anim is ignored because the collection is excluded (-dk)");
    }

    if behavior == SkipBehavior::Strict && d.skip {
        let collection = scene.collection(id);
        if collection.children.is_empty() && collection.objects.is_empty() {
            report.push(Severity::Error, subject, "-sk used on an empty collection");
        } else if collection.children.is_empty() {
            report.push(Severity::Error, subject, "-sk used on a collection with only objects");
        }
    }
}
