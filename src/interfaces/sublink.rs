//! Build entry point: raw subscription text in, finished configuration out.

use log::{error, info, warn};
use serde_json::Value;

use crate::error::{Diagnostic, DiagnosticKind, SublinkError};
use crate::generator::config::{
    apply_overrides, emitter_for, reserved_group_names, AssembleOptions, EmitOptions,
    GroupAssembler, MergeOutcome, Target,
};
use crate::models::{CustomRule, Group, Lang, Proxy, RuleCategory, RuleSpec};
use crate::parser::node_manip::{explode_candidates, preprocess_nodes};
use crate::parser::ruleset::resolve;
use crate::parser::subparser::{normalize, NormalizeOptions, DEFAULT_MAX_REMOTE_DEPTH};
use crate::settings::Settings;
use crate::utils::http::Fetcher;

/// Everything one build needs.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Raw subscription text
    pub input: String,
    pub target: Target,
    /// Base document; the target's built-in template when `None`
    pub base_config: Option<Value>,
    pub rule_spec: RuleSpec,
    pub custom_rules: Vec<CustomRule>,
    pub group_by_country: bool,
    pub lang: Lang,
    /// Advertised in the Surge managed-config header
    pub subscription_url: Option<String>,
    pub max_remote_depth: usize,
    /// Extra headers sent when fetching remote subscriptions
    pub fetch_headers: Vec<(String, String)>,
    pub test_url: String,
    pub test_interval: u32,
}

impl BuildRequest {
    pub fn new(input: impl Into<String>) -> Self {
        let assemble = AssembleOptions::default();
        BuildRequest {
            input: input.into(),
            target: Target::default(),
            base_config: None,
            rule_spec: RuleSpec::default(),
            custom_rules: Vec::new(),
            group_by_country: assemble.group_by_country,
            lang: assemble.lang,
            subscription_url: None,
            max_remote_depth: DEFAULT_MAX_REMOTE_DEPTH,
            fetch_headers: Vec::new(),
            test_url: assemble.test_url,
            test_interval: assemble.test_interval,
        }
    }

    /// Take the defaults of `settings`.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.rule_spec = RuleSpec::from_param(&settings.default_rule_set);
        self.lang = Lang::from_tag(&settings.lang);
        self.group_by_country = settings.group_by_country;
        self.max_remote_depth = settings.max_remote_depth;
        self.fetch_headers = settings
            .fetch_headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        self.test_url = settings.test_url.clone();
        self.test_interval = settings.test_interval;
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn base_config(mut self, base: Value) -> Self {
        self.base_config = Some(base);
        self
    }

    pub fn rules(mut self, spec: RuleSpec) -> Self {
        self.rule_spec = spec;
        self
    }

    pub fn custom_rules(mut self, rules: Vec<CustomRule>) -> Self {
        self.custom_rules = rules;
        self
    }

    pub fn group_by_country(mut self, enabled: bool) -> Self {
        self.group_by_country = enabled;
        self
    }

    pub fn lang(mut self, lang: Lang) -> Self {
        self.lang = lang;
        self
    }

    pub fn subscription_url(mut self, url: Option<String>) -> Self {
        self.subscription_url = url;
        self
    }

    pub fn max_remote_depth(mut self, depth: usize) -> Self {
        self.max_remote_depth = depth;
        self
    }

    pub fn fetch_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fetch_headers.push((name.into(), value.into()));
        self
    }
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Finished document as structured data.
    pub document: Value,
    /// `document` rendered in the target's text form.
    pub text: String,
    /// Override keys written into the base document.
    pub applied_override_keys: Vec<String>,
    /// Every recovered failure, in the order it was met.
    pub diagnostics: Vec<Diagnostic>,
    /// Canonical proxy records the groups were built over.
    pub proxies: Vec<Proxy>,
    /// Groups in construction order.
    pub groups: Vec<Group>,
}

fn custom_categories(rules: &[CustomRule]) -> Vec<RuleCategory> {
    rules
        .iter()
        .cloned()
        .map(RuleCategory::from)
        .filter(|category| {
            if category.name.is_empty() || category.predicates.is_empty() {
                warn!("Ignoring custom rule '{}' without name or match", category.name);
                false
            } else {
                true
            }
        })
        .collect()
}

fn merge_diagnostics(outcome: &MergeOutcome, lang: Lang) -> Vec<Diagnostic> {
    outcome
        .errors
        .iter()
        .map(|err| {
            let subject = match err {
                SublinkError::Override { key, .. } => key.clone(),
                other => other.to_string(),
            };
            Diagnostic::from_error(err, subject, lang)
        })
        .collect()
}

/// Run one build.
///
/// Per-item failures end up in [`BuildOutput::diagnostics`]. The build only
/// fails when no usable proxy remains, when the base document is not a
/// mapping, or when the result cannot be rendered.
pub async fn build<F: Fetcher>(
    request: &BuildRequest,
    fetcher: &F,
) -> Result<BuildOutput, SublinkError> {
    let lang = request.lang;
    info!("Building {} configuration", request.target);

    let normalized = normalize(
        &request.input,
        fetcher,
        &NormalizeOptions {
            max_remote_depth: request.max_remote_depth,
            lang,
            headers: request.fetch_headers.clone(),
        },
    )
    .await;
    let mut diagnostics = normalized.diagnostics;

    let (proxies, decode_diagnostics) = explode_candidates(&normalized.candidates, lang);
    diagnostics.extend(decode_diagnostics);

    let categories = resolve(&request.rule_spec, &custom_categories(&request.custom_rules), lang);
    let assemble_options = AssembleOptions {
        group_by_country: request.group_by_country,
        lang,
        test_url: request.test_url.clone(),
        test_interval: request.test_interval,
    };
    let proxies = preprocess_nodes(proxies, |proxies| {
        reserved_group_names(proxies, &categories, &assemble_options)
    });
    if proxies.is_empty() {
        error!("No usable proxy found in input ({} failures)", diagnostics.len());
        return Err(SublinkError::exhausted(lang, diagnostics));
    }
    info!("Decoded {} proxies", proxies.len());

    let template;
    let base = match &request.base_config {
        Some(base) => base,
        None => {
            template = request.target.default_template();
            &template
        }
    };
    if !base.is_object() {
        return Err(SublinkError::Template(
            "base configuration must be a mapping".to_string(),
        ));
    }

    let outcome = match &normalized.overrides {
        Some(overrides) => apply_overrides(base, overrides),
        None => MergeOutcome {
            document: base.clone(),
            applied: Vec::new(),
            errors: Vec::new(),
        },
    };
    diagnostics.extend(merge_diagnostics(&outcome, lang));
    if !outcome.applied.is_empty() {
        info!("Applied overrides: {}", outcome.applied.join(", "));
    }

    let mut emitter = emitter_for(
        request.target,
        outcome.document,
        &EmitOptions {
            applied_override_keys: outcome.applied.clone(),
            subscription_url: request.subscription_url.clone(),
        },
    );
    let assembly = GroupAssembler::new(emitter.as_mut(), assemble_options)
        .assemble(&proxies, &categories)
        .map_err(|e| match e {
            SublinkError::Exhausted {
                diagnostics: unemitted,
                ..
            } => {
                let mut all = diagnostics.clone();
                all.extend(unemitted);
                SublinkError::exhausted(lang, all)
            }
            other => other,
        })?;
    diagnostics.extend(assembly.diagnostics);

    let document = emitter.finish(&categories);
    let text = emitter.render(&document)?;

    let emitted: Vec<Proxy> = proxies
        .into_iter()
        .filter(|p| assembly.proxy_names.contains(&p.tag))
        .collect();
    let skipped = diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::Emit)
        .count();
    info!(
        "Built {} configuration: {} proxies, {} groups, {} diagnostics ({} not expressible)",
        request.target,
        emitted.len(),
        assembly.groups.len(),
        diagnostics.len(),
        skipped
    );

    Ok(BuildOutput {
        document,
        text,
        applied_override_keys: outcome.applied,
        diagnostics,
        proxies: emitted,
        groups: assembly.groups,
    })
}
